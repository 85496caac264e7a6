//! Server configuration

use crate::cli::Cli;
use modelhub_backends::DeviceSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Server configuration, from YAML with CLI overrides
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub listen: String,

    /// Listen port
    pub port: u16,

    /// HuggingFace access token
    #[serde(skip_serializing)]
    pub hf_token: Option<String>,

    /// Allowed CORS origins; "*" allows any
    pub allowed_origins: Vec<String>,

    /// Inference device
    pub device: DeviceSpec,

    /// Model download cache directory
    pub cache_dir: Option<PathBuf>,

    /// YAML model catalog replacing the built-in models
    pub catalog: Option<PathBuf>,

    /// Maximum request body size in bytes
    pub request_body_limit: usize,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        config.apply_cli(cli);
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.listen = listen.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if cli.hf_token.is_some() {
            self.hf_token = cli.hf_token.clone();
        }
        if !cli.allowed_origins.is_empty() {
            self.allowed_origins = cli.allowed_origins.clone();
        }
        if let Some(catalog) = &cli.catalog {
            self.catalog = Some(catalog.clone());
        }
        if let Some(device) = cli.device {
            self.device = device;
        }
        if let Some(cache_dir) = &cli.cache_dir {
            self.cache_dir = Some(cache_dir.clone());
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.listen, self.port).parse()?)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0".to_string(),
            port: 8000,
            hf_token: None,
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            device: DeviceSpec::Auto,
            cache_dir: None,
            catalog: None,
            request_body_limit: 1024 * 1024,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen", &self.listen)
            .field("port", &self.port)
            .field("hf_token", &self.hf_token.as_ref().map(|_| "<redacted>"))
            .field("allowed_origins", &self.allowed_origins)
            .field("device", &self.device)
            .field("cache_dir", &self.cache_dir)
            .field("catalog", &self.catalog)
            .field("request_body_limit", &self.request_body_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServerConfig::load("/nonexistent/modelhub.yaml", &Cli::default()).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.device, DeviceSpec::Auto);
        assert_eq!(config.allowed_origins.len(), 2);
        assert!(config.hf_token.is_none());
    }

    #[test]
    fn test_file_values_and_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modelhub.yaml");
        std::fs::write(
            &path,
            r#"
port: 9001
hf_token: hf_from_file
allowed_origins: ["*"]
device: cpu
catalog: ./models.yaml
"#,
        )
        .unwrap();

        let cli = Cli {
            port: Some(9100),
            device: Some(DeviceSpec::Cuda(0)),
            ..Cli::default()
        };
        let config = ServerConfig::load(path.to_str().unwrap(), &cli).unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.device, DeviceSpec::Cuda(0));
        assert_eq!(config.hf_token.as_deref(), Some("hf_from_file"));
        assert_eq!(config.allowed_origins, vec!["*"]);
        assert_eq!(config.catalog, Some(PathBuf::from("./models.yaml")));
        assert_eq!(config.listen, "0.0.0.0");
    }

    #[test]
    fn test_token_never_leaks() {
        let config = ServerConfig {
            hf_token: Some("hf_secret".to_string()),
            ..ServerConfig::default()
        };

        assert!(!format!("{:?}", config).contains("hf_secret"));
        assert!(!serde_yaml::to_string(&config).unwrap().contains("hf_secret"));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().port(), 8000);

        let bad = ServerConfig {
            listen: "not an address".to_string(),
            ..ServerConfig::default()
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "port: not-a-number").unwrap();
        assert!(ServerConfig::from_file(&path).is_err());
    }
}
