use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use cephfs_core::{CephFs, NativeApi};

use super::normalize_path;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// File to remove
    pub path: String,
}

#[instrument(level = "info", name = "cmd::rm", skip_all, fields(path = %args.path))]
pub fn execute<A: NativeApi>(fs: &CephFs<A>, args: &Args) -> Result<()> {
    let path = normalize_path(&args.path);
    fs.unlink(&path)
        .with_context(|| format!("Failed to remove {path}"))
}
