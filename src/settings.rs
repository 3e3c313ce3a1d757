use std::path::{Path, PathBuf};

use clap::Parser;
use configparser::ini::Ini;

use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(name = "adpwtest")]
#[command(about = "Test the password change workflow of a Microsoft AD over LDAPS")]
#[command(version)]
pub struct CliArgs {
    /// Test config file
    #[arg(
        short = 'c',
        long = "conf",
        value_name = "FILE",
        default_value = "tests.conf"
    )]
    pub conf: PathBuf,

    /// Selects the test in case more than one is defined in the config file
    #[arg(short, long)]
    pub test: Option<String>,

    /// Write an LDAP protocol log to the file "ldap.log"
    #[arg(short, long)]
    pub log: bool,

    /// Print the located user entry
    #[arg(short, long)]
    pub dump_entry: bool,
}

/// One named test section from the config file, validated and immutable.
#[derive(Clone)]
pub struct TestTarget {
    /// AD server FQDN; the connection always uses ldaps:// on port 636.
    pub host: String,
    /// Bind identity for all administrative operations.
    pub admin_user: String,
    pub admin_pw: String,
    /// PEM file with the CA certificate to validate the server against.
    pub cacert: Option<PathBuf>,
    /// Directory of PEM files, all loaded as trust roots.
    pub cacert_path: Option<PathBuf>,
    /// Hostnames accepted in the server certificate besides `host`.
    pub alt_names: Vec<String>,
    pub base_dn: String,
    /// LDAP filter expected to match exactly one user entry.
    pub filter: String,
    /// The test user's current password.
    pub user_pw: String,
    /// The temporary password set during the check.
    pub change_pw: String,
}

impl std::fmt::Debug for TestTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestTarget")
            .field("host", &self.host)
            .field("admin_user", &self.admin_user)
            .field("admin_pw", &"***REDACTED***")
            .field("cacert", &self.cacert)
            .field("cacert_path", &self.cacert_path)
            .field("alt_names", &self.alt_names)
            .field("base_dn", &self.base_dn)
            .field("filter", &self.filter)
            .field("user_pw", &"***REDACTED***")
            .field("change_pw", &"***REDACTED***")
            .finish()
    }
}

impl TestTarget {
    /// Loads the selected test section from `path`.
    ///
    /// With no explicit `test_name` the first section in the file is
    /// used. All validation happens here, before any network activity.
    pub fn from_file(path: impl AsRef<Path>, test_name: Option<&str>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut ini = Ini::new_cs();
        ini.load(path).map_err(|reason| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason,
        })?;

        let sections = ini.sections();
        if sections.is_empty() {
            return Err(ConfigError::NoSections);
        }

        let section = match test_name {
            Some(name) => {
                if sections.iter().any(|s| s == name) {
                    name.to_string()
                } else {
                    return Err(ConfigError::UnknownSection {
                        name: name.to_string(),
                        available: sections.join(","),
                    });
                }
            }
            None => sections[0].clone(),
        };

        Self::from_section(&ini, &section)
    }

    fn from_section(ini: &Ini, section: &str) -> Result<Self, ConfigError> {
        let required = |option: &str| {
            ini.get(section, option)
                .ok_or_else(|| ConfigError::MissingOption {
                    option: option.to_string(),
                    section: section.to_string(),
                })
        };

        let alt_names = ini
            .get(section, "AltNames")
            .map(|txt| {
                txt.split(',')
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host: required("Host")?,
            admin_user: required("AdminUser")?,
            admin_pw: required("AdminPw")?,
            cacert: ini.get(section, "Cacert").map(PathBuf::from),
            cacert_path: ini.get(section, "CacertPath").map(PathBuf::from),
            alt_names,
            base_dn: required("BaseDn")?,
            filter: required("Filter")?,
            user_pw: required("UserPw")?,
            change_pw: required("ChangePw")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(content.as_bytes()).expect("write config");
        file
    }

    const FULL_SECTION: &str = "\
[ad1]
Host = dc1.example.com
AdminUser = CN=Administrator,CN=Users,DC=example,DC=com
AdminPw = admin-secret
BaseDn = DC=example,DC=com
Filter = (&(objectClass=person)(cn=Test User))
UserPw = user-secret
ChangePw = temp-secret
";

    #[test]
    fn loads_first_section_by_default() {
        let file = config_file(FULL_SECTION);
        let target = TestTarget::from_file(file.path(), None).expect("valid config");
        assert_eq!(target.host, "dc1.example.com");
        assert_eq!(target.base_dn, "DC=example,DC=com");
        assert_eq!(target.user_pw, "user-secret");
        assert_eq!(target.change_pw, "temp-secret");
        assert!(target.cacert.is_none());
        assert!(target.alt_names.is_empty());
    }

    #[test]
    fn selects_named_section() {
        let content = format!("{FULL_SECTION}\n[ad2]\nHost = dc2.example.com\n");
        let file = config_file(&content);
        let err = TestTarget::from_file(file.path(), Some("ad2")).unwrap_err();
        // ad2 exists but is incomplete, proving selection happened
        assert!(matches!(err, ConfigError::MissingOption { .. }));

        let target = TestTarget::from_file(file.path(), Some("ad1")).expect("valid section");
        assert_eq!(target.host, "dc1.example.com");
    }

    #[test]
    fn missing_required_option_names_it() {
        let content = FULL_SECTION.replace("AdminPw = admin-secret\n", "");
        let file = config_file(&content);
        let err = TestTarget::from_file(file.path(), None).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingOption {
                option: "AdminPw".to_string(),
                section: "ad1".to_string(),
            }
        );
    }

    #[test]
    fn empty_file_has_no_sections() {
        let file = config_file("");
        let err = TestTarget::from_file(file.path(), None).unwrap_err();
        assert_eq!(err, ConfigError::NoSections);
    }

    #[test]
    fn unknown_section_lists_available_ones() {
        let content = format!("{FULL_SECTION}\n[ad2]\nHost = dc2.example.com\n");
        let file = config_file(&content);
        let err = TestTarget::from_file(file.path(), Some("nope")).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownSection {
                name: "nope".to_string(),
                available: "ad1,ad2".to_string(),
            }
        );
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let err = TestTarget::from_file("/does/not/exist.conf", None).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn alt_names_are_split_and_trimmed() {
        let content = format!("{FULL_SECTION}AltNames = dc1.example.com , ad.example.com,\n");
        let file = config_file(&content);
        let target = TestTarget::from_file(file.path(), None).expect("valid config");
        assert_eq!(target.alt_names, vec!["dc1.example.com", "ad.example.com"]);
    }

    #[test]
    fn optional_certificate_keys() {
        let content =
            format!("{FULL_SECTION}Cacert = /etc/ssl/ad-ca.pem\nCacertPath = /etc/ssl/ad-cas\n");
        let file = config_file(&content);
        let target = TestTarget::from_file(file.path(), None).expect("valid config");
        assert_eq!(target.cacert, Some(PathBuf::from("/etc/ssl/ad-ca.pem")));
        assert_eq!(target.cacert_path, Some(PathBuf::from("/etc/ssl/ad-cas")));
    }

    #[test]
    fn debug_redacts_passwords() {
        let file = config_file(FULL_SECTION);
        let target = TestTarget::from_file(file.path(), None).expect("valid config");
        let debug = format!("{target:?}");
        assert!(!debug.contains("admin-secret"));
        assert!(!debug.contains("user-secret"));
        assert!(!debug.contains("temp-secret"));
        assert!(debug.contains("***REDACTED***"));
    }

    #[test]
    fn cli_args_defaults() {
        let args = CliArgs::parse_from(["adpwtest"]);
        assert_eq!(args.conf, PathBuf::from("tests.conf"));
        assert_eq!(args.test, None);
        assert!(!args.log);
        assert!(!args.dump_entry);
    }

    #[test]
    fn cli_args_custom_values() {
        let args = CliArgs::parse_from(["adpwtest", "-c", "my.conf", "-t", "ad2", "-l", "-d"]);
        assert_eq!(args.conf, PathBuf::from("my.conf"));
        assert_eq!(args.test.as_deref(), Some("ad2"));
        assert!(args.log);
        assert!(args.dump_entry);
    }
}
