//! Admin command - send a command to MDS daemons.
//!
//! # Examples
//!
//! ```bash
//! # List client sessions on every active MDS
//! cephfs admin '*' session ls
//!
//! # Feed a JSON payload to rank 0
//! cephfs admin --input payload.json 0 config set
//! ```
//!
//! Command output goes to stdout and the status text to stderr, so the
//! output can be piped into `jq` directly.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use cephfs_core::{CephFs, MdsCommandOutput, NativeApi};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Target daemons: a rank, a name, or `*` for all
    pub mds_spec: String,

    /// File whose contents are sent as command input
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Command words
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[instrument(level = "info", name = "cmd::admin", skip_all, fields(mds_spec = %args.mds_spec))]
pub fn execute<A: NativeApi>(fs: &CephFs<A>, args: &Args) -> Result<()> {
    let input = match &args.input {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read command input: {}", path.display()))?,
        None => Vec::new(),
    };
    let output = send(fs, args, &input)?;

    io::stdout().write_all(&output.data)?;
    if !output.status_text.is_empty() {
        eprintln!("{}", output.status_str());
    }
    output
        .into_result()
        .with_context(|| format!("MDS command '{}' failed", args.args.join(" ")))?;
    Ok(())
}

fn send<A: NativeApi>(fs: &CephFs<A>, args: &Args, input: &[u8]) -> Result<MdsCommandOutput> {
    let words: Vec<&str> = args.args.iter().map(String::as_str).collect();
    let output = fs
        .mds_command(&args.mds_spec, &words, input)
        .context("Failed to send MDS command")?;
    tracing::debug!(
        status = output.status,
        data_len = output.data.len(),
        "MDS command completed"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support;
    use cephfs_core::testing::MdsResponse;

    fn args(words: &[&str]) -> Args {
        Args {
            mds_spec: "*".to_string(),
            input: None,
            args: words.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_send_returns_output() {
        let (stub, fs) = test_support::mounted();
        stub.set_mds_response(MdsResponse {
            status: 0,
            data: Some(b"[]".to_vec()),
            status_text: Some(Vec::new()),
        });
        let output = send(&fs, &args(&["session", "ls"]), b"").unwrap();
        assert_eq!(output.data, b"[]");
        assert_eq!(stub.live_buffers(), 0);
    }

    #[test]
    fn test_failure_status_becomes_error() {
        let (stub, fs) = test_support::mounted();
        stub.set_mds_response(MdsResponse {
            status: -libc::EPERM,
            data: None,
            status_text: Some(b"access denied".to_vec()),
        });
        let err = execute(&fs, &args(&["session", "evict"])).unwrap_err();
        assert!(format!("{err:#}").contains("access denied"));
        assert!(matches!(
            err.downcast_ref::<cephfs_core::Error>(),
            Some(cephfs_core::Error::Permission { .. })
        ));
    }

    #[test]
    fn test_missing_input_file() {
        let (stub, fs) = test_support::mounted();
        let mut args = args(&["status"]);
        args.input = Some("/nonexistent/input.json".into());
        let err = execute(&fs, &args).unwrap_err();
        assert!(err.to_string().contains("Failed to read command input"));
        assert_eq!(stub.calls("ceph_mds_command"), 0);
    }
}
