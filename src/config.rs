use std::env;

// ============================================================================
// Runtime Configuration
// ============================================================================
//
// Everything comes from the environment with sensible defaults. A present
// DATABASE_URL selects the durable Postgres store; otherwise the in-memory
// reference store is used.
//
// ============================================================================

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0";
const DEFAULT_HTTP_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub http_port: u16,
    pub database_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(
            env::var("ENROLLMENT_HTTP_ADDR").ok(),
            env::var("ENROLLMENT_HTTP_PORT").ok(),
            env::var("DATABASE_URL").ok(),
        )
    }

    fn from_vars(
        http_addr: Option<String>,
        http_port: Option<String>,
        database_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let http_addr = http_addr.unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());

        let http_port = match http_port {
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("ENROLLMENT_HTTP_PORT is not a port: {raw}"))?,
            None => DEFAULT_HTTP_PORT,
        };

        let database_url = database_url.filter(|s| !s.is_empty());

        Ok(Self {
            http_addr,
            http_port,
            database_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_when_nothing_is_set() {
        let config = AppConfig::from_vars(None, None, None).unwrap();
        assert_eq!(config.http_addr, "0.0.0.0");
        assert_eq!(config.http_port, 8080);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let config = AppConfig::from_vars(
            Some("127.0.0.1".to_string()),
            Some("9000".to_string()),
            Some("postgres://localhost/enrollments".to_string()),
        )
        .unwrap();
        assert_eq!(config.http_addr, "127.0.0.1");
        assert_eq!(config.http_port, 9000);
        assert!(config.database_url.is_some());
    }

    #[test]
    fn test_bad_port_is_an_error() {
        assert!(AppConfig::from_vars(None, Some("not-a-port".to_string()), None).is_err());
    }

    #[test]
    fn test_empty_database_url_means_memory_store() {
        let config = AppConfig::from_vars(None, None, Some(String::new())).unwrap();
        assert!(config.database_url.is_none());
    }
}
