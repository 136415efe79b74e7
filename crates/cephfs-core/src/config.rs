//! Session construction options.
//!
//! [`ClientOptions`] collects everything a [`CephFs`](crate::CephFs) needs
//! before the native handle exists: which library to load, the client id,
//! which ceph.conf to read and which options to set. Options are applied
//! once, in key order, as individual `ceph_conf_set` calls; nothing is cached
//! or reapplied later.
//!
//! The struct deserializes with serde, so front ends can read it from a
//! config file. Option values must be strings there too.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Which ceph.conf to read at construction time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfFile {
    /// Don't read any configuration file.
    #[default]
    None,
    /// Read the library's default search path ($CEPH_CONF, /etc/ceph/ceph.conf, ...).
    Default,
    /// Read a comma-separated list of files.
    Path(PathBuf),
}

/// Options for constructing a [`CephFs`](crate::CephFs) session.
///
/// # Example
///
/// ```
/// use cephfs_core::{ClientOptions, ConfFile};
///
/// let options = ClientOptions::default()
///     .conffile(ConfFile::Default)
///     .option("client_mount_timeout", "30")
///     .id("admin");
/// assert_eq!(options.conf.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientOptions {
    /// Client id passed to `ceph_create` (`client.<id>`); `None` uses the
    /// library default.
    pub id: Option<String>,

    /// Configuration file to read after the handle is created.
    pub conffile: ConfFile,

    /// Option name to value, applied with `ceph_conf_set` after the file.
    pub conf: BTreeMap<String, String>,

    /// Explicit shared library to load instead of the standard lookup.
    pub library: Option<PathBuf>,
}

impl ClientOptions {
    /// Sets the client id.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the configuration file to read.
    #[must_use]
    pub fn conffile(mut self, conffile: ConfFile) -> Self {
        self.conffile = conffile;
        self
    }

    /// Adds one configuration option, replacing an earlier value.
    #[must_use]
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.conf.insert(name.into(), value.into());
        self
    }

    /// Adds several configuration options.
    #[must_use]
    pub fn options<I, K, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.conf
            .extend(options.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Loads the library from `path` instead of the standard lookup.
    #[must_use]
    pub fn library(mut self, path: impl Into<PathBuf>) -> Self {
        self.library = Some(path.into());
        self
    }
}
