use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub cors_origin: Option<String>,
    /// When false, order status may be set to any value from any value.
    pub strict_status_transitions: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(5 * 1024 * 1024);
        let cors_origin = env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty());
        let strict_status_transitions = env::var("ORDER_STATUS_STRICT")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            upload_dir,
            max_upload_bytes,
            cors_origin,
            strict_status_transitions,
        })
    }

    /// Config for tests and tools that only need a database.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            upload_dir: env::temp_dir()
                .join("packaging-store-uploads")
                .to_string_lossy()
                .into_owned(),
            max_upload_bytes: 5 * 1024 * 1024,
            cors_origin: None,
            strict_status_transitions: true,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn flag_parsing_defaults_to_on() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(" OFF "));
        assert!(!parse_flag("0"));
    }
}
