//! Watch mode: compile once, then rebuild on change until Ctrl+C.

use std::sync::Arc;

use anyhow::{Context, Result};
use crsh::config::CrshConfig;
use crsh::core::BuildMode;
use crsh::log;
use tokio::sync::watch;

pub fn watch_all(config: &CrshConfig) -> Result<()> {
    let mode = BuildMode {
        watch: true,
        ..config.build_mode()
    };
    let registry = Arc::new(config.bundle_registry(mode)?);

    // keep watching even when the first compile fails
    if let Err(e) = super::build::compile_and_report(&registry, false) {
        log!("error"; "{:#}", e);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        log!("watch"; "shutting down...");
        let _ = shutdown_tx.send(true);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move { registry.watch(shutdown_rx).await });
    Ok(())
}
