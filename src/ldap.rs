use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use ldap3::{DerefAliases, LdapConn, LdapConnSettings, Mod, Scope, SearchEntry, SearchOptions};
use native_tls::{Certificate, TlsConnector};
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::settings::TestTarget;
use crate::types::{AdSession, Directory, LogDetail, LogOptions, UserEntry};

/// LDAPS transport built on [`ldap3`]'s synchronous connection.
///
/// One instance serves a whole run: the administrative session is opened
/// once and reused, while every login check gets its own short-lived
/// connection.
pub struct Ldaps {
    log: LogOptions,
}

impl Ldaps {
    pub fn new(log: LogOptions) -> Self {
        Self { log }
    }

    fn connect(&self, target: &TestTarget) -> Result<LdapConn, TransportError> {
        let url = connection_url(target);
        debug!(url = %url, "opening connection");

        let validate = target.cacert.is_some() || target.cacert_path.is_some();
        let settings = if validate {
            LdapConnSettings::new().set_connector(build_tls_connector(target)?)
        } else {
            // explicit insecure mode, an accepted configuration
            LdapConnSettings::new().set_no_tls_verify(true)
        };

        Ok(LdapConn::with_settings(settings, &url)?)
    }
}

impl Directory for Ldaps {
    type Session = LdapSession;

    fn open_admin(&self, target: &TestTarget) -> Result<LdapSession, TransportError> {
        let mut conn = self.connect(target)?;
        conn.simple_bind(&target.admin_user, &target.admin_pw)?
            .success()?;
        debug!(user = %target.admin_user, "administrative bind ok");
        Ok(LdapSession {
            conn,
            log: self.log,
        })
    }

    fn login(&self, target: &TestTarget, dn: &str, password: &str) -> Result<(), TransportError> {
        let mut conn = self.connect(target)?;
        conn.simple_bind(dn, password)?.success()?;
        debug!(dn = %dn, "login bind ok");
        if let Err(e) = conn.unbind() {
            debug!(dn = %dn, error = %e, "unbind after login check failed");
        }
        Ok(())
    }
}

fn connection_url(target: &TestTarget) -> String {
    format!("ldaps://{}:636", target.host)
}

fn build_tls_connector(target: &TestTarget) -> Result<TlsConnector, TransportError> {
    let mut builder = TlsConnector::builder();

    if let Some(file) = &target.cacert {
        builder.add_root_certificate(read_pem_root(file)?);
    }
    if let Some(dir) = &target.cacert_path {
        let entries = fs::read_dir(dir)
            .map_err(|e| TransportError(format!("CA certificate path {}: {e}", dir.display())))?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                TransportError(format!("CA certificate path {}: {e}", dir.display()))
            })?;
            let path = entry.path();
            if path.is_file() {
                builder.add_root_certificate(read_pem_root(&path)?);
            }
        }
    }
    if !target.alt_names.is_empty() {
        // the operator vouches for the listed names; the TLS layer has no
        // per-name validation hook
        builder.danger_accept_invalid_hostnames(true);
    }

    builder
        .build()
        .map_err(|e| TransportError(format!("TLS setup failed: {e}")))
}

fn read_pem_root(path: &Path) -> Result<Certificate, TransportError> {
    let pem = fs::read(path)
        .map_err(|e| TransportError(format!("CA certificate {}: {e}", path.display())))?;
    Certificate::from_pem(&pem)
        .map_err(|e| TransportError(format!("CA certificate {}: {e}", path.display())))
}

/// The bound administrative connection of one run.
pub struct LdapSession {
    conn: LdapConn,
    log: LogOptions,
}

impl AdSession for LdapSession {
    fn naming_contexts(&mut self) -> Result<Vec<String>, TransportError> {
        let (rs, _res) = self
            .conn
            .search("", Scope::Base, "(objectClass=*)", vec!["namingContexts"])?
            .success()?;
        let contexts = rs
            .into_iter()
            .next()
            .map(|entry| {
                SearchEntry::construct(entry)
                    .attrs
                    .remove("namingContexts")
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        debug!(count = contexts.len(), "read naming contexts");
        Ok(contexts)
    }

    fn search(&mut self, base_dn: &str, filter: &str) -> Result<Vec<UserEntry>, TransportError> {
        if self.log.detail == LogDetail::Extended {
            trace!(base_dn = %base_dn, filter = %filter, "user search");
        }
        self.conn
            .with_search_options(SearchOptions::new().deref(DerefAliases::Never));
        let (rs, _res) = self
            .conn
            .search(base_dn, Scope::Subtree, filter, vec!["*"])?
            .success()?;
        debug!(count = rs.len(), "user search done");
        Ok(rs.into_iter().map(to_user_entry).collect())
    }

    fn change_password(&mut self, dn: &str, new_password: &str) -> Result<(), TransportError> {
        let encoded = encode_password(new_password)?;
        let mods = vec![Mod::Replace(
            b"unicodePwd".to_vec(),
            HashSet::from([encoded]),
        )];
        self.conn.modify(dn, mods)?.success()?;
        debug!(dn = %dn, "password set");
        Ok(())
    }
}

/// Flattens an `ldap3` result entry into the ordered representation the
/// rest of the crate works with. Attributes are sorted by name; binary
/// values are replaced by a byte-count placeholder.
fn to_user_entry(entry: ldap3::ResultEntry) -> UserEntry {
    let entry = SearchEntry::construct(entry);
    let mut attributes: BTreeMap<String, Vec<String>> = entry.attrs.into_iter().collect();
    for (name, values) in entry.bin_attrs {
        attributes.insert(
            name,
            values
                .into_iter()
                .map(|v| format!("<{} bytes of binary data>", v.len()))
                .collect(),
        );
    }
    UserEntry {
        dn: entry.dn,
        attributes: attributes.into_iter().collect(),
    }
}

/// Encodes a plaintext password for AD's `unicodePwd` attribute: the
/// value is surrounded with double quotes and encoded as UTF-16LE.
pub fn encode_password(password: &str) -> Result<Vec<u8>, TransportError> {
    if password.is_empty() {
        return Err(TransportError(
            "the new password must not be empty".to_string(),
        ));
    }
    let quoted = format!("\"{password}\"");
    Ok(quoted.encode_utf16().flat_map(u16::to_le_bytes).collect())
}

#[cfg(test)]
mod password_tests {
    use super::encode_password;

    #[test]
    fn quotes_and_encodes_utf16le() {
        let encoded = encode_password("Test123!").expect("non-empty password");
        let expected: Vec<u8> = "\"Test123!\""
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();
        assert_eq!(encoded, expected);
    }

    #[test]
    fn starts_and_ends_with_a_quote() {
        let encoded = encode_password("P@ssw0rd").expect("non-empty password");
        // '"' is 0x22 0x00 in UTF-16LE
        assert_eq!(&encoded[..2], &[0x22, 0x00]);
        assert_eq!(&encoded[encoded.len() - 2..], &[0x22, 0x00]);
    }

    #[test]
    fn length_accounts_for_the_quotes() {
        // "abc" plus quotes is 5 UTF-16 code units
        let encoded = encode_password("abc").expect("non-empty password");
        assert_eq!(encoded.len(), 10);
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(encode_password("").is_err());
    }
}

#[cfg(test)]
mod url_tests {
    use super::connection_url;
    use crate::settings::TestTarget;

    fn target(host: &str) -> TestTarget {
        TestTarget {
            host: host.to_string(),
            admin_user: "CN=Administrator,DC=example,DC=com".to_string(),
            admin_pw: "secret".to_string(),
            cacert: None,
            cacert_path: None,
            alt_names: Vec::new(),
            base_dn: "DC=example,DC=com".to_string(),
            filter: "(cn=Test User)".to_string(),
            user_pw: "old".to_string(),
            change_pw: "new".to_string(),
        }
    }

    #[test]
    fn always_ldaps_on_636() {
        assert_eq!(
            connection_url(&target("dc1.example.com")),
            "ldaps://dc1.example.com:636"
        );
    }
}
