use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use cephfs_core::{CephFs, NativeApi};

use super::normalize_path;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Directory path to create
    pub path: String,

    /// Permission bits, in octal
    #[arg(short, long, default_value = "755", value_parser = parse_mode)]
    pub mode: u32,

    /// Create parent directories as needed
    #[arg(short, long)]
    pub parents: bool,
}

/// Parses an octal mode such as `755` or `0o750`.
pub fn parse_mode(s: &str) -> Result<u32, String> {
    let digits = s.strip_prefix("0o").unwrap_or(s);
    let mode = u32::from_str_radix(digits, 8).map_err(|e| format!("invalid octal mode '{s}': {e}"))?;
    if mode > 0o7777 {
        return Err(format!("mode '{s}' has bits outside 07777"));
    }
    Ok(mode)
}

#[instrument(level = "info", name = "cmd::mkdir", skip_all, fields(path = %args.path, parents = args.parents))]
pub fn execute<A: NativeApi>(fs: &CephFs<A>, args: &Args) -> Result<()> {
    let path = normalize_path(&args.path);

    let result = if args.parents {
        fs.mkdirs(&path, args.mode)
    } else {
        fs.mkdir(&path, args.mode)
    };
    result.with_context(|| format!("Failed to create directory {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support;

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("755"), Ok(0o755));
        assert_eq!(parse_mode("0o700"), Ok(0o700));
        assert_eq!(parse_mode("1777"), Ok(0o1777));
        assert!(parse_mode("789").is_err());
        assert!(parse_mode("17777").is_err());
    }

    #[test]
    fn test_parents() {
        let (_stub, fs) = test_support::mounted();
        let args = Args {
            path: "a/b/c".to_string(),
            mode: 0o700,
            parents: true,
        };
        execute(&fs, &args).unwrap();
        let stat = fs.stat("/a/b/c").unwrap();
        assert!(stat.is_dir());
        assert_eq!(stat.permissions(), 0o700);
    }

    #[test]
    fn test_without_parents_fails_on_missing_parent() {
        let (_stub, fs) = test_support::mounted();
        let args = Args {
            path: "/a/b".to_string(),
            mode: 0o755,
            parents: false,
        };
        let err = execute(&fs, &args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<cephfs_core::Error>(),
            Some(cephfs_core::Error::ObjectNotFound { .. })
        ));
    }
}
