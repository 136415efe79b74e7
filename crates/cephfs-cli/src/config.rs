//! Client configuration file support.
//!
//! The file is a TOML rendition of [`ClientOptions`]; command-line flags are
//! applied on top of it.
//!
//! # Example configuration
//!
//! ```toml
//! id = "admin"
//! conffile = { path = "/etc/ceph/ceph.conf" }
//!
//! [conf]
//! client_mount_timeout = "30"
//! log_to_stderr = "false"
//! ```

use std::path::Path;

use anyhow::{Context, Result};

use cephfs_core::ClientOptions;

/// Load client options from a TOML file.
pub fn load(path: &Path) -> Result<ClientOptions> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn parse(content: &str) -> Result<ClientOptions> {
    Ok(toml::from_str(content)?)
}
