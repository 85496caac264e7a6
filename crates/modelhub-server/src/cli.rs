use clap::{Parser, ValueEnum};
use modelhub_backends::DeviceSpec;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "modelhub-server")]
#[command(
    author,
    version,
    about = "Serve HuggingFace inference models behind stable keys",
    long_about = None
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "modelhub.yaml")]
    pub config: String,

    /// Listen address
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// HuggingFace access token for gated or private models
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    /// Allowed CORS origin (repeatable; "*" allows any)
    #[arg(long = "allowed-origin", env = "MODELHUB_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// YAML model catalog replacing the built-in models
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Inference device: auto, cpu, cuda[:N] or metal[:N]
    #[arg(long)]
    pub device: Option<DeviceSpec>,

    /// Model download cache directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "modelhub-server",
            "--port",
            "9000",
            "--allowed-origin",
            "http://a.test,http://b.test",
            "--device",
            "cuda:1",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.config, "modelhub.yaml");
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.allowed_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(cli.device, Some(DeviceSpec::Cuda(1)));
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_device_is_rejected() {
        assert!(Cli::try_parse_from(["modelhub-server", "--device", "tpu"]).is_err());
    }
}
