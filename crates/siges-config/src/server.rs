use std::env;

use crate::env_or;

/// Browser origins the API answers cross-origin requests for.
///
/// Authentication travels in the `Authorization` header, never in cookies,
/// so credentials are not part of the CORS contract and `*` is usable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    /// `*` allows every origin; anything else is a comma-separated list.
    /// Blank entries are skipped, so an empty value allows none.
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == "*" {
            return AllowedOrigins::Any;
        }
        AllowedOrigins::List(
            raw.split(',')
                .map(|origin| origin.trim().trim_end_matches('/').to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        )
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_dir: String,
    /// `ALLOWED_ORIGINS`; every origin when unset.
    pub allowed_origins: AllowedOrigins,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("SERVER_PORT", 8000),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "storage/logs".to_string()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|raw| AllowedOrigins::parse(&raw))
                .unwrap_or(AllowedOrigins::Any),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_address_joins_host_and_port() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 9000,
            log_dir: "logs".to_string(),
            allowed_origins: AllowedOrigins::Any,
        };
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
    }

    #[test]
    fn origin_lists_are_trimmed() {
        assert_eq!(AllowedOrigins::parse(" * "), AllowedOrigins::Any);
        assert_eq!(
            AllowedOrigins::parse("https://siges.ci/, http://localhost:5173,,"),
            AllowedOrigins::List(vec![
                "https://siges.ci".to_string(),
                "http://localhost:5173".to_string(),
            ])
        );
        assert_eq!(AllowedOrigins::parse(""), AllowedOrigins::List(Vec::new()));
    }

    // The only test in this crate touching the process environment.
    #[test]
    fn from_env_reads_server_variables() {
        unsafe {
            env::set_var("SERVER_PORT", "not-a-port");
            env::set_var("ALLOWED_ORIGINS", "https://ecole.example");
        }
        let config = ServerConfig::from_env();
        assert_eq!(config.port, 8000);
        assert_eq!(
            config.allowed_origins,
            AllowedOrigins::List(vec!["https://ecole.example".to_string()])
        );

        unsafe {
            env::remove_var("ALLOWED_ORIGINS");
            env::set_var("SERVER_PORT", "8081");
        }
        let config = ServerConfig::from_env();
        assert_eq!(config.port, 8081);
        assert_eq!(config.allowed_origins, AllowedOrigins::Any);

        unsafe {
            env::remove_var("SERVER_PORT");
        }
    }
}
