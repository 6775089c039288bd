//! Configuration file loading

use super::model::Config;
use super::schema::ConfigFile;
use super::validator::ConfigValidator;
use crate::error::{AclError, Result, ValidationError};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "/etc/socks-acl.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        // Priority order:
        // 1. $SOCKS_ACL_CONFIG
        // 2. /etc/socks-acl.toml
        if let Ok(path) = env::var("SOCKS_ACL_CONFIG") {
            return PathBuf::from(path);
        }

        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    /// Load config from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| AclError::ConfigLoad {
            path: path.to_path_buf(),
            source: e,
        })?;

        tracing::debug!("Loading config from {:?}", path);
        Self::load_from_str(&contents)
    }

    /// Parse and validate a config document
    ///
    /// Syntax errors are reported as [`AclError::ConfigParse`]; a well-formed
    /// document with a mistyped or unknown field is a validation error.
    pub fn load_from_str(contents: &str) -> Result<Config> {
        contents.parse::<toml::Table>()?;

        // The rendered error quotes the offending line, which names the key
        let file: ConfigFile = toml::from_str(contents).map_err(|e| ValidationError::Schema {
            message: e.to_string().trim_end().to_string(),
        })?;

        ConfigValidator::validate(file)
    }

    /// Load config from an explicit path, or the default path if it exists
    ///
    /// An explicit path must be loadable. A missing default file yields
    /// built-in defaults.
    pub fn load_or_default(path: Option<PathBuf>) -> Result<Config> {
        if let Some(p) = path {
            return Self::load_from_file(&p);
        }

        let path = Self::default_config_path();
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::IpAddr;
    use tempfile::NamedTempFile;

    fn testdata(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
    }

    #[test]
    fn test_load_test1() {
        let config = ConfigLoader::load_from_file(testdata("test1.toml")).unwrap();

        assert_eq!(config.incoming.port, 1080);
        assert_eq!(
            config.incoming.addresses,
            vec!["127.0.0.1".parse::<IpAddr>().unwrap()]
        );
        assert_eq!(config.incoming.allow_from.len(), 2);
        assert_eq!(config.outgoing.addresses.len(), 3);
        assert_eq!(config.outgoing.addresses[0], "12.34.56.78");
        assert_eq!(config.outgoing.allowed_ports, Some(vec![22, 80, 443]));
        assert_eq!(config.outgoing.dnsbl_domain.as_deref(), Some("zen.spamhaus.org"));
        assert_eq!(config.outgoing.timed_deny_sites.len(), 1);
    }

    #[test]
    fn test_syntax_error() {
        let err = ConfigLoader::load_from_file(testdata("test2.toml")).unwrap_err();
        assert!(matches!(err, AclError::ConfigParse(_)), "{err}");
    }

    #[test]
    fn test_type_mismatch() {
        let err = ConfigLoader::load_from_file(testdata("test3.toml")).unwrap_err();
        match err {
            AclError::Validation(ValidationError::Schema { message }) => {
                assert!(message.contains("allow_from"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scalar_where_time_expected() {
        let err = ConfigLoader::load_from_str(
            r#"
[[outgoing.timed_deny_sites]]
begin = "noon"
end = 13:00:00
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AclError::Validation(ValidationError::Schema { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::load_from_file("/nonexistent/socks-acl.toml").unwrap_err();
        assert!(matches!(err, AclError::ConfigLoad { .. }));
    }

    #[test]
    fn test_load_or_default_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[incoming]\nport = 1081").unwrap();

        let config = ConfigLoader::load_or_default(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.incoming.port, 1081);

        assert!(ConfigLoader::load_or_default(Some(PathBuf::from("/nonexistent.toml"))).is_err());
    }

    #[test]
    fn test_update_from_file_keeps_previous_on_error() {
        let mut config = ConfigLoader::load_from_file(testdata("test1.toml")).unwrap();
        let before = config.clone();

        assert!(config.update_from_file(testdata("test3.toml")).is_err());
        assert_eq!(config, before);

        assert!(config.update_from_file(testdata("test2.toml")).is_err());
        assert_eq!(config, before);

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[incoming]\nport = 9050").unwrap();
        config.update_from_file(file.path()).unwrap();
        assert_eq!(config.incoming.port, 9050);
        assert!(config.outgoing.addresses.is_empty());
    }

    #[test]
    fn test_load_is_deterministic() {
        let a = ConfigLoader::load_from_file(testdata("test1.toml")).unwrap();
        let b = ConfigLoader::load_from_file(testdata("test1.toml")).unwrap();
        assert_eq!(a, b);
    }
}
