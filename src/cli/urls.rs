//! Print the template keys exposing bundle URLs.

use anyhow::Result;
use crsh::config::CrshConfig;

/// Compile every bundle, then print `{"crsh_<name>": "<url>"}` to stdout.
pub fn print_urls(config: &CrshConfig, pretty: bool) -> Result<()> {
    let registry = super::build::build_all(config, true)?;
    let vars = registry.template_vars();

    let json = if pretty {
        serde_json::to_string_pretty(&vars)?
    } else {
        serde_json::to_string(&vars)?
    };
    println!("{json}");
    Ok(())
}
