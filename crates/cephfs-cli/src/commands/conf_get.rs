//! Conf-get command - print the effective value of a client option.
//!
//! Reads the configuration before mounting, after the config file and `-o`
//! options have been applied.

use anyhow::{Result, anyhow};
use clap::Args as ClapArgs;
use tracing::instrument;

use cephfs_core::{CephFs, NativeApi};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Option name, e.g. `client_mount_timeout`
    pub option: String,
}

#[instrument(level = "info", name = "cmd::conf_get", skip_all, fields(option = %args.option))]
pub fn execute<A: NativeApi>(fs: &CephFs<A>, args: &Args) -> Result<()> {
    let value = lookup(fs, &args.option)?;
    println!("{value}");
    Ok(())
}

fn lookup<A: NativeApi>(fs: &CephFs<A>, option: &str) -> Result<String> {
    fs.conf_get(option)?.ok_or_else(|| {
        anyhow!(cephfs_core::Error::ObjectNotFound {
            context: format!("no such option: {option}"),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cephfs_core::ClientOptions;
    use cephfs_core::testing::StubNative;

    #[test]
    fn test_lookup() {
        let options = ClientOptions::default().option("client_mount_timeout", "45");
        let fs = CephFs::with_api(Arc::new(StubNative::new()), &options).unwrap();
        assert_eq!(lookup(&fs, "client_mount_timeout").unwrap(), "45");

        let err = lookup(&fs, "no_such_option").unwrap_err();
        assert!(err.to_string().contains("no such option"));
        assert!(matches!(
            err.downcast_ref::<cephfs_core::Error>(),
            Some(cephfs_core::Error::ObjectNotFound { .. })
        ));
    }
}
