use std::env;
use std::path::PathBuf;

use recipebox_server::ServerBuilder;
use recipebox_server::config::loader::{DEFAULT_PATH, load_config};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From RECIPEBOX_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (recipebox.toml), optional
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (RECIPEBOX_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    let (config_path, source) = resolve_config_path();
    let explicit = match source {
        ConfigSource::Default => None,
        _ => Some(config_path.as_path()),
    };

    let cfg = match load_config(explicit) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    if env::args().any(|arg| arg == "--print-config") {
        let mut shown = cfg.clone();
        shown.auth.jwt_secret = "<redacted>".to_string();
        match toml::to_string_pretty(&shown) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => eprintln!("Failed to render configuration: {e}"),
        }
        return;
    }

    recipebox_server::init_tracing(&cfg.logging);
    tracing::info!(
        path = %config_path.display(),
        source = %source,
        "Configuration loaded"
    );

    let server = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e}");
            std::process::exit(2);
        }
    };

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: RECIPEBOX_CONFIG
/// 3. Default: recipebox.toml
fn resolve_config_path() -> (PathBuf, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (PathBuf::from(path), ConfigSource::CliArgument);
            }
        }
    }

    if let Ok(path) = env::var("RECIPEBOX_CONFIG") {
        if !path.is_empty() {
            return (PathBuf::from(path), ConfigSource::EnvironmentVariable);
        }
    }

    (PathBuf::from(DEFAULT_PATH), ConfigSource::Default)
}
