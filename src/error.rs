use thiserror::Error;

/// Problems detected while loading the command line and config file.
///
/// These are raised before any network activity and never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config file \"{path}\" could not be processed: {reason}")]
    Unreadable { path: String, reason: String },
    #[error("no test was found in this config")]
    NoSections,
    #[error("the test \"{name}\" was not found. Available tests in this config: {available}")]
    UnknownSection { name: String, available: String },
    #[error("the option \"{option}\" is missing in section \"{section}\"")]
    MissingOption { option: String, section: String },
}

/// Raw fault reported by the LDAP layer, before the orchestrator decides
/// whether it means "the rig is broken" or "the server misbehaved".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<ldap3::LdapError> for TransportError {
    fn from(e: ldap3::LdapError) -> Self {
        TransportError(e.to_string())
    }
}

/// Final classification of a finished run.
///
/// `Connection` means the check itself could not run (bind failure, TLS
/// problem, malformed filter). `Failed` means the server under test did
/// not behave as expected. The two are reported differently so an
/// operator does not confuse a broken test rig with a broken AD.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckError {
    #[error("{0}")]
    Connection(String),
    #[error("{0}")]
    Failed(String),
}
