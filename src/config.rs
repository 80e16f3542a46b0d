use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Listen port when PORT is unset.
pub const DEFAULT_PORT: u16 = 5000;

/// Classification timeout when CLASSIFY_TIMEOUT_SECS is unset.
pub const DEFAULT_CLASSIFY_TIMEOUT_SECS: u64 = 30;

/// Which classifier backend to use.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierBackend {
    /// Local ONNX model (default) — no API key needed, no rate limits
    Onnx,
    /// Google Perspective API — requires PERSPECTIVE_API_KEY, 1 QPS limit
    Perspective,
}

/// Central configuration loaded once at startup from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind (BIND_ADDR, default 0.0.0.0 — all interfaces)
    pub bind_addr: IpAddr,
    /// Listen port (PORT, default 5000)
    pub port: u16,
    /// Which classifier to use (GUARD_SCORER, default onnx)
    pub classifier_backend: ClassifierBackend,
    /// Directory containing the ONNX model files (GUARD_MODEL_DIR)
    pub model_dir: PathBuf,
    pub perspective_api_key: String,
    /// Upper bound on a single classification (CLASSIFY_TIMEOUT_SECS, default 30)
    pub classify_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup. Empty values
    /// are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = match var("BIND_ADDR") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("BIND_ADDR is not a valid IP address: {raw}"))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {raw}"))?,
            None => DEFAULT_PORT,
        };

        let classifier_backend = match var("GUARD_SCORER").as_deref().map(str::trim) {
            None | Some("onnx") => ClassifierBackend::Onnx,
            Some("perspective") => ClassifierBackend::Perspective,
            Some(other) => anyhow::bail!(
                "GUARD_SCORER must be \"onnx\" or \"perspective\", got \"{other}\""
            ),
        };

        let model_dir = var("GUARD_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(crate::classifier::download::default_model_dir);

        let timeout_secs: u64 = match var("CLASSIFY_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().with_context(|| {
                format!("CLASSIFY_TIMEOUT_SECS is not a whole number of seconds: {raw}")
            })?,
            None => DEFAULT_CLASSIFY_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            anyhow::bail!("CLASSIFY_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            bind_addr,
            port,
            classifier_backend,
            model_dir,
            perspective_api_key: var("PERSPECTIVE_API_KEY").unwrap_or_default(),
            classify_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Validate that the chosen classifier backend has what it needs.
    /// For ONNX: model files must exist (or the user should run download-model).
    /// For Perspective: API key must be set.
    pub fn require_classifier(&self) -> Result<()> {
        match self.classifier_backend {
            ClassifierBackend::Onnx => {
                if !crate::classifier::download::model_files_present(&self.model_dir) {
                    anyhow::bail!(
                        "ONNX model files not found in {}\n\
                         Run `feedback-guard download-model` to download them.\n\
                         Or set GUARD_SCORER=perspective to use the Perspective API instead.",
                        self.model_dir.display()
                    );
                }
                Ok(())
            }
            ClassifierBackend::Perspective => {
                if self.perspective_api_key.is_empty() {
                    anyhow::bail!(
                        "PERSPECTIVE_API_KEY not set. Add it to your .env file \
                         or set GUARD_SCORER=onnx."
                    );
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.bind_addr, IpAddr::from([0, 0, 0, 0]));
        assert_eq!(config.classifier_backend, ClassifierBackend::Onnx);
        assert_eq!(config.classify_timeout, Duration::from_secs(30));
        assert!(config.perspective_api_key.is_empty());
    }

    #[test]
    fn test_port_from_env() {
        let config = config_from(&[("PORT", "8080")]).unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_empty_port_uses_default() {
        let config = config_from(&[("PORT", "")]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let err = config_from(&[("PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("PORT"), "got: {err}");
        assert!(config_from(&[("PORT", "70000")]).is_err());
    }

    #[test]
    fn test_perspective_backend() {
        let config =
            config_from(&[("GUARD_SCORER", "perspective"), ("PERSPECTIVE_API_KEY", "k")]).unwrap();
        assert_eq!(config.classifier_backend, ClassifierBackend::Perspective);
        assert!(config.require_classifier().is_ok());
    }

    #[test]
    fn test_unknown_backend_is_an_error() {
        assert!(config_from(&[("GUARD_SCORER", "bert")]).is_err());
    }

    #[test]
    fn test_perspective_requires_key() {
        let config = config_from(&[("GUARD_SCORER", "perspective")]).unwrap();
        let err = config.require_classifier().unwrap_err();
        assert!(err.to_string().contains("PERSPECTIVE_API_KEY"), "got: {err}");
    }

    #[test]
    fn test_onnx_requires_model_files() {
        let config =
            config_from(&[("GUARD_MODEL_DIR", "/nonexistent/feedback-guard-models")]).unwrap();
        let err = config.require_classifier().unwrap_err();
        assert!(err.to_string().contains("download-model"), "got: {err}");
    }

    #[test]
    fn test_zero_timeout_is_an_error() {
        assert!(config_from(&[("CLASSIFY_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn test_custom_timeout_and_bind() {
        let config =
            config_from(&[("CLASSIFY_TIMEOUT_SECS", "5"), ("BIND_ADDR", "127.0.0.1")]).unwrap();
        assert_eq!(config.classify_timeout, Duration::from_secs(5));
        assert_eq!(config.bind_addr, IpAddr::from([127, 0, 0, 1]));
    }
}
