use crate::adapters::outbound::KubeApiConfig;
use serde::Deserialize;
use std::time::Duration;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const DEFAULT_KUBE_API_URL: &str = "https://kubernetes.default.svc";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // HTTP surface
    pub listen_addr: String,
    pub debug: bool,

    // Kubernetes API settings
    pub kube_api_url: String,
    pub kube_token_path: Option<String>,
    pub kube_ca_path: Option<String>,
    pub kube_insecure: bool,

    // Backend collectors
    pub postgres_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:56790".to_string(),
            debug: false,
            kube_api_url: DEFAULT_KUBE_API_URL.to_string(),
            kube_token_path: Some(format!("{}/token", SERVICE_ACCOUNT_DIR)),
            kube_ca_path: Some(format!("{}/ca.crt", SERVICE_ACCOUNT_DIR)),
            kube_insecure: false,
            postgres_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn kube_api(&self) -> KubeApiConfig {
        KubeApiConfig {
            api_url: self.kube_api_url.clone(),
            token_path: self.kube_token_path.clone(),
            ca_path: self.kube_ca_path.clone(),
            insecure: self.kube_insecure,
        }
    }

    pub fn postgres_timeout(&self) -> Duration {
        Duration::from_secs(self.postgres_timeout_secs)
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Build the configuration from an arbitrary variable source.
pub fn load_config_from<F>(var: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    let listen_addr = var("GATEWAY_LISTEN_ADDR").unwrap_or(defaults.listen_addr);

    let debug = var("DEBUG").is_some();

    // In-cluster the API server address comes from the service environment
    let kube_api_url = var("GATEWAY_KUBE_API_URL").unwrap_or_else(|| {
        match (var("KUBERNETES_SERVICE_HOST"), var("KUBERNETES_SERVICE_PORT")) {
            (Some(host), Some(port)) if host.contains(':') => format!("https://[{}]:{}", host, port),
            (Some(host), Some(port)) => format!("https://{}:{}", host, port),
            _ => defaults.kube_api_url.clone(),
        }
    });

    // An empty path disables the file
    let kube_token_path = match var("GATEWAY_KUBE_TOKEN_PATH") {
        Some(path) if path.is_empty() => None,
        Some(path) => Some(path),
        None => defaults.kube_token_path,
    };

    let kube_ca_path = match var("GATEWAY_KUBE_CA_PATH") {
        Some(path) if path.is_empty() => None,
        Some(path) => Some(path),
        None => defaults.kube_ca_path,
    };

    let kube_insecure = var("GATEWAY_KUBE_INSECURE")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);

    let postgres_timeout_secs = var("GATEWAY_POSTGRES_TIMEOUT_SECS")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.postgres_timeout_secs);

    if listen_addr.is_empty() {
        anyhow::bail!("GATEWAY_LISTEN_ADDR must not be empty");
    }

    Ok(Config {
        listen_addr,
        debug,
        kube_api_url,
        kube_token_path,
        kube_ca_path,
        kube_insecure,
        postgres_timeout_secs,
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_config_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:56790");
        assert_eq!(cfg.postgres_timeout_secs, 10);
        assert!(!cfg.debug);
        assert!(!cfg.kube_insecure);
    }

    #[test]
    fn test_load_config_defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:56790");
        assert_eq!(cfg.kube_api_url, "https://kubernetes.default.svc");
        assert_eq!(
            cfg.kube_token_path.as_deref(),
            Some("/var/run/secrets/kubernetes.io/serviceaccount/token")
        );
        assert_eq!(
            cfg.kube_ca_path.as_deref(),
            Some("/var/run/secrets/kubernetes.io/serviceaccount/ca.crt")
        );
        assert_eq!(cfg.postgres_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_config_with_custom_listen_addr() {
        let cfg = load(&[("GATEWAY_LISTEN_ADDR", "127.0.0.1:9000")]).unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_load_config_rejects_empty_listen_addr() {
        assert!(load(&[("GATEWAY_LISTEN_ADDR", "")]).is_err());
    }

    #[test]
    fn test_load_config_with_debug() {
        let cfg = load(&[("DEBUG", "1")]).unwrap();
        assert!(cfg.debug);
    }

    #[test]
    fn test_kube_api_url_from_service_env() {
        let cfg = load(&[
            ("KUBERNETES_SERVICE_HOST", "10.96.0.1"),
            ("KUBERNETES_SERVICE_PORT", "443"),
        ])
        .unwrap();
        assert_eq!(cfg.kube_api_url, "https://10.96.0.1:443");

        let cfg = load(&[
            ("KUBERNETES_SERVICE_HOST", "fd00::1"),
            ("KUBERNETES_SERVICE_PORT", "443"),
        ])
        .unwrap();
        assert_eq!(cfg.kube_api_url, "https://[fd00::1]:443");
    }

    #[test]
    fn test_explicit_kube_api_url_wins() {
        let cfg = load(&[
            ("GATEWAY_KUBE_API_URL", "http://127.0.0.1:8001"),
            ("KUBERNETES_SERVICE_HOST", "10.96.0.1"),
            ("KUBERNETES_SERVICE_PORT", "443"),
        ])
        .unwrap();
        assert_eq!(cfg.kube_api_url, "http://127.0.0.1:8001");
    }

    #[test]
    fn test_empty_paths_disable_files() {
        let cfg = load(&[("GATEWAY_KUBE_TOKEN_PATH", ""), ("GATEWAY_KUBE_CA_PATH", "")]).unwrap();
        assert!(cfg.kube_token_path.is_none());
        assert!(cfg.kube_ca_path.is_none());
    }

    #[test]
    fn test_load_config_with_insecure() {
        assert!(load(&[("GATEWAY_KUBE_INSECURE", "TRUE")]).unwrap().kube_insecure);
        assert!(load(&[("GATEWAY_KUBE_INSECURE", "1")]).unwrap().kube_insecure);
        assert!(!load(&[("GATEWAY_KUBE_INSECURE", "no")]).unwrap().kube_insecure);
    }

    #[test]
    fn test_load_config_parse_error_uses_default() {
        let cfg = load(&[("GATEWAY_POSTGRES_TIMEOUT_SECS", "soon")]).unwrap();
        assert_eq!(cfg.postgres_timeout_secs, 10);

        let cfg = load(&[("GATEWAY_POSTGRES_TIMEOUT_SECS", "3")]).unwrap();
        assert_eq!(cfg.postgres_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_kube_api_config() {
        let cfg = load(&[("GATEWAY_KUBE_API_URL", "http://127.0.0.1:8001")]).unwrap();
        let kube = cfg.kube_api();
        assert_eq!(kube.api_url, "http://127.0.0.1:8001");
        assert_eq!(kube.token_path, cfg.kube_token_path);
        assert!(!kube.insecure);
    }
}
