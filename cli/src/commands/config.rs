//! Config command - show the terminator configuration.

use anyhow::Result;
use dms_procman_core::ConfigStore;

pub async fn show(store: &ConfigStore, json: bool) -> Result<()> {
    let config = store.load().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("Configuration file: {}", store.path().display());
    println!();

    let path_or_unset = |path: Option<&std::path::Path>| {
        path.map_or_else(|| "(not set)".to_string(), |p| p.display().to_string())
    };
    println!("ctrlsender:          {}", path_or_unset(config.ctrl_sender.as_deref()));
    println!(
        "taskkill:            {}",
        path_or_unset(config.resolve_task_kill().as_deref())
    );
    println!("helper timeout:      {} ms", config.helper_timeout_ms);
    println!("SIGALRM pattern:     {}", config.interactive_transcoder_pattern);
    println!("min terminate:       {} ms", config.min_terminate_timeout_ms);
    println!("shutdown terminate:  {} ms", config.shutdown_terminate_timeout_ms);
    println!("final step minimum:  {} ms", config.final_step_min_timeout_ms);
    println!("shutdown stagger:    {} ms", config.shutdown_stagger_ms);

    Ok(())
}
