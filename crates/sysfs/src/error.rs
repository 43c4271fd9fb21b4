use std::io;

use camino::Utf8PathBuf;
use hwemu_primitives::{DeviceName, Interface, Revision};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// A control file or directory is missing: the module is most likely
    /// not loaded, or is a different revision.
    #[error("{path} does not exist (is the {module} module loaded?)")]
    Environment {
        path: Utf8PathBuf,
        module: &'static str,
        #[source]
        source: io::Error,
    },

    /// The module refused a write.
    #[error("{path} rejected {content:?}")]
    Rejected {
        path: Utf8PathBuf,
        content: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {path}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    /// Read-back content that does not parse.
    #[error("unexpected content in {path}: {reason}")]
    Malformed { path: Utf8PathBuf, reason: String },

    #[error("{iface} already has {count} device(s), erase them before writing")]
    Occupied { iface: Interface, count: usize },

    /// The module did not allocate the device the configuration expects
    /// next; device numbering on both sides no longer agrees.
    #[error("allocating {expected} did not create {path}")]
    Desync {
        expected: DeviceName,
        path: Utf8PathBuf,
    },

    #[error("configuration targets the {found} module, this tree belongs to {expected}")]
    RevisionMismatch { expected: Revision, found: Revision },
}

impl ProtocolError {
    /// Whether reloading the module might help.
    #[must_use]
    pub const fn is_environment(&self) -> bool {
        matches!(self, Self::Environment { .. })
    }

    /// Whether `write` refused before touching the module.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::Occupied { .. } | Self::RevisionMismatch { .. })
    }

    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    pub(crate) fn from_read(path: Utf8PathBuf, module: &'static str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::Environment {
                path,
                module,
                source,
            },
            _ => Self::Io { path, source },
        }
    }

    pub(crate) fn from_write(
        path: Utf8PathBuf,
        module: &'static str,
        content: &str,
        source: io::Error,
    ) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::Environment {
                path,
                module,
                source,
            },
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => Self::Rejected {
                path,
                content: content.to_owned(),
                source,
            },
            _ => Self::Io { path, source },
        }
    }
}
