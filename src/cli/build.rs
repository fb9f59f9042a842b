//! One-shot compile of every bundle.

use anyhow::{Result, bail};
use crsh::config::CrshConfig;
use crsh::core::BuildMode;
use crsh::log;
use crsh::registry::BundleRegistry;

/// Compile all bundles without watchers.
///
/// `quiet` suppresses per-bundle success lines.
pub fn build_all(config: &CrshConfig, quiet: bool) -> Result<BundleRegistry> {
    let mode = BuildMode {
        watch: false,
        ..config.build_mode()
    };
    let registry = config.bundle_registry(mode)?;
    compile_and_report(&registry, quiet)?;
    Ok(registry)
}

/// Compile every bundle, logging each outcome.
///
/// Fails when any bundle failed; the others are still written.
pub fn compile_and_report(registry: &BundleRegistry, quiet: bool) -> Result<()> {
    if registry.is_empty() && !quiet {
        log!("build"; "no bundles declared");
        return Ok(());
    }

    let mut failed = 0;
    for (name, result) in registry.compile_all() {
        match result {
            Ok(stamp) if !quiet => log!("build"; "{} → {}", name, stamp.path.display()),
            Ok(_) => {}
            Err(e) => {
                failed += 1;
                log!("error"; "{}: {:#}", name, anyhow::Error::new(e));
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} bundle(s) failed to compile", registry.len());
    }
    if !quiet {
        log!("build"; "compiled {} bundle(s)", registry.len());
    }
    Ok(())
}
