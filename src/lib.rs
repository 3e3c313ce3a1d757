//! # Active Directory password-change check
//!
//! This crate checks that a Microsoft Active Directory server correctly
//! supports the administrative password-change workflow over LDAPS.
//!
//! One run binds as an administrative account, verifies the configured
//! base DN is a naming context of the server, locates exactly one test
//! user by filter, then exercises a login / change-password / login /
//! restore cycle against that user. The outcome distinguishes connection
//! or environment problems from misbehavior of the server under test.
//!
//! ## Example
//!
//! ```rust,no_run
//! use adpwtest::{run_check, CheckError, Ldaps, LogOptions, TestTarget};
//!
//! let target = TestTarget::from_file("tests.conf", None).expect("valid config");
//! let directory = Ldaps::new(LogOptions::default());
//! match run_check(&directory, &target, false) {
//!     Ok(()) => println!("OK"),
//!     Err(CheckError::Connection(e)) => println!("ERROR: {e}"),
//!     Err(CheckError::Failed(e)) => println!("FAILED\n{e}"),
//! }
//! ```
//!
//! The check sequence itself is written against the [`Directory`] and
//! [`AdSession`] traits, so it can run against any transport; [`Ldaps`]
//! is the production implementation on top of [`ldap3`](mod@ldap3).

mod check;
mod error;
mod helpers;
mod ldap;
mod settings;
mod types;

pub use check::run_check;
pub use error::{CheckError, ConfigError, TransportError};
pub use helpers::interpret_certificate_error;
pub use ldap::{encode_password, LdapSession, Ldaps};
pub use settings::{CliArgs, TestTarget};
pub use types::{AdSession, Directory, LogDetail, LogOptions, UserEntry};
