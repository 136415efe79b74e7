use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use cephfs_core::{CephFs, NativeApi};

use super::normalize_path;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// File or directory
    pub path: String,

    /// Attribute name, e.g. `ceph.dir.layout.pool` or `user.tag`
    pub name: String,

    /// Attribute value
    pub value: String,

    /// Fail if the attribute already exists
    #[arg(long, conflicts_with = "replace")]
    pub create: bool,

    /// Fail if the attribute does not exist yet
    #[arg(long)]
    pub replace: bool,
}

impl Args {
    fn flags(&self) -> i32 {
        if self.create {
            libc::XATTR_CREATE
        } else if self.replace {
            libc::XATTR_REPLACE
        } else {
            0
        }
    }
}

#[instrument(level = "info", name = "cmd::setxattr", skip_all, fields(path = %args.path, name = %args.name))]
pub fn execute<A: NativeApi>(fs: &CephFs<A>, args: &Args) -> Result<()> {
    let path = normalize_path(&args.path);
    fs.setxattr(&path, &args.name, args.value.as_bytes(), args.flags())
        .with_context(|| format!("Failed to set {} on {path}", args.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support;

    fn args(create: bool, replace: bool) -> Args {
        Args {
            path: "/".to_string(),
            name: "user.tag".to_string(),
            value: "blue".to_string(),
            create,
            replace,
        }
    }

    #[test]
    fn test_flags() {
        assert_eq!(args(false, false).flags(), 0);
        assert_eq!(args(true, false).flags(), libc::XATTR_CREATE);
        assert_eq!(args(false, true).flags(), libc::XATTR_REPLACE);
    }

    #[test]
    fn test_create_then_replace() {
        let (_stub, fs) = test_support::mounted();
        assert!(execute(&fs, &args(false, true)).is_err());
        execute(&fs, &args(true, false)).unwrap();
        assert!(execute(&fs, &args(true, false)).is_err());
        execute(&fs, &args(false, true)).unwrap();
    }
}
