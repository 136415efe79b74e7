#![deny(unsafe_code)]

mod commands;
mod config;
mod exit_code;
mod output;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cephfs_core::{CephFs, ClientOptions, ConfFile, Error as CephError};

use crate::commands::{admin, conf_get, mkdir, rm, setxattr, stat, statfs, version};

/// Command-line client for CephFS
#[derive(Parser)]
#[command(name = "cephfs")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Show metadata for a directory
    cephfs --id admin stat /volumes

    # Create a directory tree with mode 0750
    cephfs mkdir -p -m 750 /volumes/group/sub

    # Pin a directory to MDS rank 1
    cephfs setxattr /volumes/group ceph.dir.pin 1

    # Ask every MDS for its client sessions
    cephfs admin '*' session ls | jq '.[].id'
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Client options file (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// ceph.conf to read (default: the library's search path)
    #[arg(long, value_name = "CEPH_CONF", global = true)]
    conf: Option<PathBuf>,

    /// Client id (`client.<id>`)
    #[arg(long, global = true)]
    id: Option<String>,

    /// Set a client option (repeatable)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value, global = true)]
    options: Vec<(String, String)>,

    /// Load libcephfs from this path instead of the standard lookup
    #[arg(long, value_name = "PATH", global = true)]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the libcephfs version
    Version(version::Args),

    /// Show file or directory metadata
    Stat(stat::Args),

    /// Show filesystem capacity
    Statfs(statfs::Args),

    /// Create a directory
    Mkdir(mkdir::Args),

    /// Remove a file
    Rm(rm::Args),

    /// Set an extended attribute
    Setxattr(setxattr::Args),

    /// Print a client configuration value
    ConfGet(conf_get::Args),

    /// Send a command to MDS daemons
    Admin(admin::Args),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            let code = categorize_error(&e);

            // Only print error if not quiet mode (quiet is parsed separately for this)
            let args: Vec<String> = std::env::args().collect();
            let is_quiet = args.iter().any(|a| a == "-q" || a == "--quiet");

            if !is_quiet {
                eprintln!("Error: {e:#}");
            }

            ExitCode::from(code)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if !cli.quiet {
        setup_tracing(cli.verbose);
    }

    let options = client_options(&cli)?;

    match &cli.command {
        // Configuration-only commands never mount
        Commands::Version(args) => {
            version::execute(&open_session(&without_conffile(&options))?, args)
        }
        Commands::ConfGet(args) => conf_get::execute(&open_session(&options)?, args),

        Commands::Stat(args) => with_mounted(&options, |fs| stat::execute(fs, args)),
        Commands::Statfs(args) => with_mounted(&options, |fs| statfs::execute(fs, args)),
        Commands::Mkdir(args) => with_mounted(&options, |fs| mkdir::execute(fs, args)),
        Commands::Rm(args) => with_mounted(&options, |fs| rm::execute(fs, args)),
        Commands::Setxattr(args) => with_mounted(&options, |fs| setxattr::execute(fs, args)),
        Commands::Admin(args) => with_mounted(&options, |fs| admin::execute(fs, args)),
    }
}

/// Build session options: config file first, then command-line flags.
fn client_options(cli: &Cli) -> Result<ClientOptions> {
    let mut options = match &cli.config {
        Some(path) => config::load(path)?,
        None => ClientOptions::default().conffile(ConfFile::Default),
    };
    if let Some(conf) = &cli.conf {
        options = options.conffile(ConfFile::Path(conf.clone()));
    }
    if let Some(id) = &cli.id {
        options = options.id(id.clone());
    }
    if let Some(library) = &cli.library {
        options = options.library(library.clone());
    }
    options = options.options(cli.options.iter().cloned());
    Ok(options)
}

/// The version query needs no cluster configuration, so no conffile is read.
fn without_conffile(options: &ClientOptions) -> ClientOptions {
    options.clone().conffile(ConfFile::None)
}

fn open_session(options: &ClientOptions) -> Result<CephFs> {
    CephFs::new(options).context("Failed to create CephFS session")
}

/// Context attached when `mount` fails; maps to [`exit_code::MOUNT_FAILED`].
#[derive(Debug)]
struct MountFailed;

impl std::fmt::Display for MountFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Failed to mount CephFS")
    }
}

/// Execute a command that requires a mounted filesystem
fn with_mounted<F>(options: &ClientOptions, f: F) -> Result<()>
where
    F: FnOnce(&CephFs) -> Result<()>,
{
    let mut fs = open_session(options)?;
    fs.mount().context(MountFailed)?;
    let result = f(&fs);
    fs.shutdown();
    result
}

/// Parses a `key=value` option.
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Set up tracing/logging based on verbosity level
fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Categorize an error into an exit code using typed error downcasting
fn categorize_error(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<MountFailed>().is_some() {
        return exit_code::MOUNT_FAILED;
    }

    for cause in e.chain() {
        if let Some(ceph_err) = cause.downcast_ref::<CephError>() {
            return match ceph_err {
                CephError::Environment(_) => exit_code::LIBRARY_UNAVAILABLE,
                CephError::Permission { .. } => exit_code::PERMISSION_DENIED,
                CephError::ObjectNotFound { .. } | CephError::NoData { .. } => {
                    exit_code::NOT_FOUND
                }
                CephError::ObjectExists { .. } => exit_code::ALREADY_EXISTS,
                CephError::InvalidState { .. } => exit_code::MOUNT_FAILED,
                CephError::ArgumentType { .. } => exit_code::USAGE_ERROR,
                CephError::Native { code, .. } if *code == libc::EACCES => {
                    exit_code::PERMISSION_DENIED
                }
                CephError::Io { .. } | CephError::NoSpace { .. } | CephError::Native { .. } => {
                    exit_code::GENERAL_ERROR
                }
            };
        }

        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::PermissionDenied => return exit_code::PERMISSION_DENIED,
                io::ErrorKind::NotFound => return exit_code::NOT_FOUND,
                _ => {}
            }
        }
    }

    exit_code::GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cephfs").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["stat", "/x", "-vv", "--id", "admin", "-o", "a=b", "-o", "c=d=e"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.id.as_deref(), Some("admin"));
        assert_eq!(
            cli.options,
            vec![
                ("a".to_string(), "b".to_string()),
                ("c".to_string(), "d=e".to_string()),
            ]
        );
        assert!(matches!(cli.command, Commands::Stat(ref args) if args.path == "/x" && !args.json));
    }

    #[test]
    fn test_bad_option_syntax_rejected() {
        assert!(Cli::try_parse_from(["cephfs", "-o", "novalue", "version"]).is_err());
        assert!(Cli::try_parse_from(["cephfs", "-o", "=x", "version"]).is_err());
    }

    #[test]
    fn test_subcommand_names() {
        assert!(matches!(parse(&["conf-get", "log_file"]).command, Commands::ConfGet(_)));
        assert!(matches!(parse(&["statfs"]).command, Commands::Statfs(ref a) if a.path == "/"));
        assert!(matches!(
            parse(&["mkdir", "-p", "-m", "0o700", "/a/b"]).command,
            Commands::Mkdir(ref a) if a.parents && a.mode == 0o700
        ));
        assert!(matches!(
            parse(&["mkdir", "/a"]).command,
            Commands::Mkdir(ref a) if !a.parents && a.mode == 0o755
        ));
    }

    #[test]
    fn test_setxattr_flags_conflict() {
        assert!(
            Cli::try_parse_from(["cephfs", "setxattr", "/", "user.a", "1", "--create", "--replace"])
                .is_err()
        );
    }

    #[test]
    fn test_admin_takes_trailing_words() {
        let cli = parse(&["admin", "--input", "in.json", "0", "session", "evict", "--force"]);
        let Commands::Admin(args) = cli.command else {
            panic!("expected admin");
        };
        assert_eq!(args.mds_spec, "0");
        assert_eq!(args.input, Some(PathBuf::from("in.json")));
        assert_eq!(args.args, ["session", "evict", "--force"]);
        assert!(Cli::try_parse_from(["cephfs", "admin", "*"]).is_err());
    }

    #[test]
    fn test_client_options_defaults_to_search_path() {
        let options = client_options(&parse(&["version"])).unwrap();
        assert_eq!(options.conffile, ConfFile::Default);
        assert!(options.conf.is_empty());
        assert_eq!(options.library, None);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            b"id = \"file\"\n[conf]\na = \"1\"\nb = \"2\"\n",
        )
        .unwrap();
        let path = file.path().to_str().unwrap();
        let cli = parse(&[
            "--config", path, "--id", "cli", "--conf", "/etc/ceph/x.conf", "-o", "b=3",
            "--library", "/opt/libcephfs.so", "version",
        ]);
        let options = client_options(&cli).unwrap();
        assert_eq!(options.id.as_deref(), Some("cli"));
        assert_eq!(options.conffile, ConfFile::Path("/etc/ceph/x.conf".into()));
        assert_eq!(options.conf.get("a").map(String::as_str), Some("1"));
        assert_eq!(options.conf.get("b").map(String::as_str), Some("3"));
        assert_eq!(options.library, Some(PathBuf::from("/opt/libcephfs.so")));
    }

    #[test]
    fn test_categorize_error() {
        let not_found = anyhow::Error::new(CephError::ObjectNotFound {
            context: "x".into(),
        })
        .context("Failed to stat /x");
        assert_eq!(categorize_error(&not_found), exit_code::NOT_FOUND);

        let missing_lib = anyhow::Error::new(CephError::Environment("nope".into()));
        assert_eq!(categorize_error(&missing_lib), exit_code::LIBRARY_UNAVAILABLE);

        let exists = anyhow::Error::new(CephError::ObjectExists {
            context: "x".into(),
        });
        assert_eq!(categorize_error(&exists), exit_code::ALREADY_EXISTS);

        let denied = anyhow::Error::new(CephError::Native {
            context: "x".into(),
            code: libc::EACCES,
        });
        assert_eq!(categorize_error(&denied), exit_code::PERMISSION_DENIED);

        assert_eq!(
            categorize_error(&anyhow::anyhow!("something else")),
            exit_code::GENERAL_ERROR
        );
    }

    #[test]
    fn test_mount_failure_maps_to_mount_exit_code() {
        let timed_out = anyhow::Error::new(CephError::Native {
            context: "ceph_mount".into(),
            code: libc::ETIMEDOUT,
        })
        .context(MountFailed);
        assert_eq!(categorize_error(&timed_out), exit_code::MOUNT_FAILED);
        assert_eq!(
            format!("{timed_out:#}"),
            format!("Failed to mount CephFS: ceph_mount: error code {}", libc::ETIMEDOUT)
        );

        // A classified cause does not hide the mount failure
        let missing_root = anyhow::Error::new(CephError::ObjectNotFound {
            context: "ceph_mount".into(),
        })
        .context(MountFailed);
        assert_eq!(categorize_error(&missing_root), exit_code::MOUNT_FAILED);
    }

    #[test]
    fn test_mount_through_stub_failure_is_mount_failed() {
        use cephfs_core::testing::StubNative;

        let stub = std::sync::Arc::new(StubNative::new());
        stub.fail_with("ceph_mount", -libc::ETIMEDOUT);
        let mut fs = CephFs::with_api(stub, &ClientOptions::default()).unwrap();
        let err = fs.mount().context(MountFailed).unwrap_err();
        assert_eq!(categorize_error(&err), exit_code::MOUNT_FAILED);
    }

    #[test]
    fn test_version_skips_conffile() {
        let cli = parse(&["--conf", "/etc/ceph/x.conf", "--id", "admin", "-o", "a=1", "version"]);
        let options = without_conffile(&client_options(&cli).unwrap());
        assert_eq!(options.conffile, ConfFile::None);
        assert_eq!(options.id.as_deref(), Some("admin"));
        assert_eq!(options.conf.get("a").map(String::as_str), Some("1"));

        let options = without_conffile(&client_options(&parse(&["version"])).unwrap());
        assert_eq!(options.conffile, ConfFile::None);
    }
}
