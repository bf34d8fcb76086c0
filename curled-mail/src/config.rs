use crate::error::{MailError, Result};
use crate::templates::TemplateDefinition;
use crate::transport::ConnectionOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub transport: ConnectionOptions,
    pub logging: LoggingConfig,
    pub templates: BTreeMap<String, TemplateDefinition>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "pretty" or "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MailError::Config(format!("{}: {}", path.display(), e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MailError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TlsOption;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[transport]
host = "smtp.example.com"
port = 587
tls = true
user = "me"
password = "secret"
timeout = 15000

[logging]
level = "debug"
format = "json"

[templates.welcome]
subject = "Hi {{name}}"
from = "noreply@example.com"
to = "{{email}}"
html = "<b>{{name}}</b>"
attachments = [{ filename = "hello.txt", data = "Hello {{name}}" }]
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.transport.host(), "localhost");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.templates.is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.transport.host(), "smtp.example.com");
        assert_eq!(config.transport.port(), 587);
        assert_eq!(config.transport.tls, TlsOption::Flag(true));
        assert_eq!(config.transport.credentials(), Some(("me", "secret")));
        assert_eq!(config.transport.timeout, 15000);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");

        let welcome = &config.templates["welcome"];
        let keys: Vec<&str> = welcome.as_map().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["subject", "from", "to", "html", "attachments"]);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_toml("[logging]\nlevel = \"warn\"\n").unwrap();

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.transport.port(), 25);
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/curled-mail.toml");
        assert!(matches!(result, Err(MailError::Config(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml("[transport\nhost = 1");
        assert!(matches!(result, Err(MailError::Config(_))));
    }
}
