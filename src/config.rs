use std::env;

/// Settings for the external storage collaborators (object store + queue).
///
/// Read once at process start; there is no runtime reconfiguration.
pub struct StorageConfig {
    /// Region override for the storage vendor. When `None`, the SDK's
    /// default resolution chain applies.
    pub region: Option<String>,
    pub bucket: String,
    pub queue_name: String,
    pub queue_url: String,
}

pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub storage: StorageConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            storage: StorageConfig {
                region: env::var("AWS_REGION").ok(),
                bucket: env::var("STORAGE_BUCKET").expect("STORAGE_BUCKET must be set"),
                queue_name: env::var("QUEUE_NAME").expect("QUEUE_NAME must be set"),
                queue_url: env::var("QUEUE_URL").expect("QUEUE_URL must be set"),
            },
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required environment variables
        env::set_var("DATABASE_URL", "postgres://test");
        env::set_var("STORAGE_BUCKET", "test-bucket");
        env::set_var("QUEUE_NAME", "test-queue");
        env::set_var("QUEUE_URL", "https://queue.example/test-queue");

        let config = Config::from_env();

        assert_eq!(config.database_url, "postgres://test");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.storage.bucket, "test-bucket");
        assert_eq!(config.storage.queue_name, "test-queue");

        // Test custom values
        env::set_var("SERVER_PORT", "3000");
        env::set_var("SERVER_HOST", "0.0.0.0");
        env::set_var("AWS_REGION", "eu-west-1");

        let config = Config::from_env();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.storage.region.as_deref(), Some("eu-west-1"));
    }
}
