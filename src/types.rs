use std::fmt::Write as _;

use crate::error::TransportError;
use crate::settings::TestTarget;

/// The one directory entry the user search located.
///
/// Attributes are kept as an explicit ordered list of `(name, values)`
/// pairs so the dump output is deterministic and independent of how the
/// underlying library represents entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub dn: String,
    pub attributes: Vec<(String, Vec<String>)>,
}

impl UserEntry {
    /// Renders the entry in an LDIF-like shape, one line per value.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "dn: {}", self.dn);
        for (name, values) in &self.attributes {
            for value in values {
                let _ = writeln!(out, "{name}: {value}");
            }
        }
        out
    }
}

/// How much protocol detail ends up in the log file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogDetail {
    #[default]
    Basic,
    Extended,
}

/// Protocol logging configuration handed to the transport constructor.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    pub enabled: bool,
    pub detail: LogDetail,
}

impl LogOptions {
    pub fn new(enabled: bool, detail: LogDetail) -> Self {
        Self { enabled, detail }
    }
}

/// An established administrative connection to the directory.
///
/// All administrative operations of a run reuse the one session opened by
/// [`Directory::open_admin`].
pub trait AdSession {
    /// The naming contexts the server advertises in its rootDSE.
    fn naming_contexts(&mut self) -> Result<Vec<String>, TransportError>;

    /// Subtree search below `base_dn`, never dereferencing aliases,
    /// requesting all attributes.
    fn search(&mut self, base_dn: &str, filter: &str) -> Result<Vec<UserEntry>, TransportError>;

    /// Administrative password set on the entry at `dn`.
    fn change_password(&mut self, dn: &str, new_password: &str) -> Result<(), TransportError>;
}

/// Access to one directory server.
///
/// Splitting connection establishment from the session keeps the check
/// sequence testable against a scripted in-memory directory.
pub trait Directory {
    type Session: AdSession;

    /// Connects over LDAPS and binds as the administrative account.
    fn open_admin(&self, target: &TestTarget) -> Result<Self::Session, TransportError>;

    /// Bind check as `dn` on a separate short-lived connection, closed
    /// again before returning.
    fn login(&self, target: &TestTarget, dn: &str, password: &str) -> Result<(), TransportError>;
}
