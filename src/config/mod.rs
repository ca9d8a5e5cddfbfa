//! Configuration management for the visit manager
//!
//! This module handles loading and validating configuration from environment
//! variables. All external collaborators (Postgres, Kafka, the payment
//! processor, the identity provider) are configured here and nowhere else.

use std::env;

use jsonwebtoken::Algorithm;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Kafka authentication scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KafkaAuthScheme {
    Oauth,
    None,
}

impl KafkaAuthScheme {
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "oauth" => Ok(KafkaAuthScheme::Oauth),
            "none" => Ok(KafkaAuthScheme::None),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid Kafka authentication scheme: '{}'. Expected: oauth or none",
                s
            ))),
        }
    }
}

/// Kafka connection settings
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Bootstrap broker address; empty disables the event relay
    pub bootstrap_url: String,

    /// Inbound topic for externally scheduled visits
    pub topic: String,

    /// Consumer group id for the background listener
    pub group_id: String,

    /// Broker authentication scheme
    pub authentication_scheme: KafkaAuthScheme,
}

impl KafkaConfig {
    pub fn is_configured(&self) -> bool {
        !self.bootstrap_url.is_empty()
    }
}

/// Postgres connection settings
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Log level (RUST_LOG style filter)
    pub log_level: String,

    /// JWT signing secret
    pub jwt_secret: String,

    /// JWT signing algorithm
    pub jwt_algorithm: Algorithm,

    /// Access token TTL in minutes
    pub access_token_ttl_minutes: i64,

    /// Payment processor API key; empty logs a warning and fails at call time
    pub stripe_api_key: String,

    /// Google OAuth client id, the expected audience of inbound id tokens
    pub google_client_id: String,

    /// Maximum database connections
    pub db_max_connections: u32,

    pub postgres: PostgresConfig,

    pub kafka: KafkaConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8082".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let log_level = env::var("RUST_LOG")
            .or_else(|_| env::var("LOG_LEVEL"))
            .unwrap_or_else(|_| "info".to_string());

        let jwt_secret =
            env::var("JWT_SECRET_KEY").unwrap_or_else(|_| "dev-secret-key".to_string());

        let jwt_algorithm = env::var("JWT_ALGORITHM")
            .unwrap_or_else(|_| "HS256".to_string())
            .parse::<Algorithm>()
            .map_err(|_| {
                ConfigError::InvalidValue("JWT_ALGORITHM is not a known algorithm".to_string())
            })?;

        let access_token_ttl_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<i64>()
            .unwrap_or(60);

        let stripe_api_key = env::var("STRIPE_API_KEY").unwrap_or_default();

        let google_client_id = env::var("GOOGLE_CLIENT_ID")
            .map_err(|_| ConfigError::MissingEnvVar("GOOGLE_CLIENT_ID".to_string()))?;

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .unwrap_or(5);

        let postgres = PostgresConfig {
            user: env::var("POSTGRES_USER").unwrap_or_default(),
            password: env::var("POSTGRES_PASSWORD").unwrap_or_default(),
            host: env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("POSTGRES_PORT")
                .unwrap_or_else(|_| "5432".to_string())
                .parse::<u16>()
                .map_err(|_| {
                    ConfigError::InvalidPort("POSTGRES_PORT must be a valid number".to_string())
                })?,
            database: env::var("POSTGRES_DB").unwrap_or_else(|_| "visit_manager".to_string()),
        };

        let kafka = KafkaConfig {
            bootstrap_url: env::var("KAFKA_BOOTSTRAP_URL").unwrap_or_default(),
            topic: env::var("KAFKA_TOPIC").unwrap_or_else(|_| "visits.scheduled".to_string()),
            group_id: env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| "visit_manager".to_string()),
            authentication_scheme: env::var("KAFKA_AUTHENTICATION_SCHEME")
                .map(|s| KafkaAuthScheme::from_str(&s))
                .unwrap_or(Ok(KafkaAuthScheme::None))?,
        };

        Ok(Config {
            port,
            log_level,
            jwt_secret,
            jwt_algorithm,
            access_token_ttl_minutes,
            stripe_api_key,
            google_client_id,
            db_max_connections,
            postgres,
            kafka,
        })
    }

    /// Postgres connection URL assembled from the individual settings
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.postgres.user,
            self.postgres.password,
            self.postgres.host,
            self.postgres.port,
            self.postgres.database
        )
    }

    /// Connection URL with the password masked, for logging
    pub fn database_url_masked(&self) -> String {
        format!(
            "postgres://{}:****@{}:{}/{}",
            self.postgres.user, self.postgres.host, self.postgres.port, self.postgres.database
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_postgres() -> PostgresConfig {
        PostgresConfig {
            user: "vm".to_string(),
            password: "secret_password".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            database: "visit_manager".to_string(),
        }
    }

    #[test]
    fn test_kafka_auth_scheme_from_str() {
        assert_eq!(
            KafkaAuthScheme::from_str("oauth").unwrap(),
            KafkaAuthScheme::Oauth
        );
        assert_eq!(
            KafkaAuthScheme::from_str("none").unwrap(),
            KafkaAuthScheme::None
        );
        assert_eq!(
            KafkaAuthScheme::from_str("NONE").unwrap(),
            KafkaAuthScheme::None
        );
        assert!(KafkaAuthScheme::from_str("plaintext").is_err());
    }

    #[test]
    fn test_database_url_masked() {
        let config = Config {
            port: 8082,
            log_level: "info".to_string(),
            jwt_secret: "dev-secret-key".to_string(),
            jwt_algorithm: Algorithm::HS256,
            access_token_ttl_minutes: 60,
            stripe_api_key: String::new(),
            google_client_id: "client-id".to_string(),
            db_max_connections: 5,
            postgres: test_postgres(),
            kafka: KafkaConfig {
                bootstrap_url: String::new(),
                topic: "visits.scheduled".to_string(),
                group_id: "visit_manager".to_string(),
                authentication_scheme: KafkaAuthScheme::None,
            },
        };

        let masked = config.database_url_masked();
        assert!(masked.contains("****"));
        assert!(!masked.contains("secret_password"));

        let full = config.database_url();
        assert!(full.contains("secret_password"));
        assert!(full.ends_with("/visit_manager"));
    }

    #[test]
    fn test_kafka_is_configured() {
        let mut kafka = KafkaConfig {
            bootstrap_url: String::new(),
            topic: "visits.scheduled".to_string(),
            group_id: "visit_manager".to_string(),
            authentication_scheme: KafkaAuthScheme::None,
        };
        assert!(!kafka.is_configured());
        kafka.bootstrap_url = "broker:9092".to_string();
        assert!(kafka.is_configured());
    }
}
