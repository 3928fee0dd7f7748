//! Server configuration
//!
//! Loaded from TOML. Every field is optional:
//!
//! ```toml
//! bind = "127.0.0.1"
//! port = 7331
//! description = "Friday night Quarto"
//! game = "quarto"
//! extensions = ["NAMEDQUEUES", "RANK", "CHAT"]
//! default_queue = "DEFAULT"
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use quarto_core::GameKind;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::{Extension, Extensions, SEPARATOR};
use crate::DEFAULT_PORT;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: IpAddr,
    /// Port 0 picks an ephemeral port
    pub port: u16,
    /// Greeting sent in the server HELLO. Defaults to the game's greeting.
    pub description: Option<String>,
    pub game: GameKind,
    /// Extensions this server offers
    pub extensions: Vec<Extension>,
    /// Queue joined by a bare QUEUE
    pub default_queue: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            description: None,
            game: GameKind::default(),
            extensions: Extension::ALL.to_vec(),
            default_queue: "DEFAULT".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: ServerConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Values that would not survive the trip onto the wire are rejected
    pub fn validate(&self) -> Result<()> {
        if let Some(description) = &self.description {
            check_wire_token("description", description)?;
        }
        check_wire_token("default_queue", &self.default_queue)
    }

    pub fn greeting(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| self.game.greeting().to_string())
    }

    pub fn extension_set(&self) -> Extensions {
        self.extensions.iter().copied().collect()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

fn check_wire_token(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidConfig(format!("{field} must not be empty")));
    }
    if value.contains(SEPARATOR) || value.contains('\n') {
        return Err(Error::InvalidConfig(format!(
            "{field} must not contain '{SEPARATOR}' or line breaks"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 7331);
        assert_eq!(config.greeting(), "Hello from Quarto server");
        assert_eq!(config.extension_set(), Extensions::all());
    }

    #[test]
    fn test_partial_override() {
        let config = ServerConfig::from_toml_str(
            r#"
            port = 0
            description = "Friday night Quarto"
            extensions = ["CHAT"]
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 0);
        assert_eq!(config.greeting(), "Friday night Quarto");
        assert!(config.extension_set().contains(Extension::Chat));
        assert!(!config.extension_set().contains(Extension::Rank));
        assert_eq!(config.default_queue, "DEFAULT");
    }

    #[test]
    fn test_rejects_separator() {
        let err = ServerConfig::from_toml_str(r#"default_queue = "a~b""#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = ServerConfig::from_toml_str(r#"extensions = ["ENCRYPTION"]"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind = \"127.0.0.1\"\nport = 9000\ngame = \"quarto\"").unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.socket_addr(), "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn test_missing_file() {
        let err = ServerConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
