//! `sortbox config` -- display resolved configuration.
//!
//! Shows the configuration after discovery, key normalization and
//! defaults, as formatted JSON.
//!
//! # Example
//!
//! ```text
//! sortbox config
//! sortbox config --config ./sortbox.json
//! ```

use sortbox_types::config::Config;

/// Display the resolved configuration as formatted JSON.
pub fn config_show(config: &Config) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
