use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use fileserver_core::fingerprint::FingerprintMode;
use fileserver_core::service::{ServiceSettings, DEFAULT_BUCKET, DEFAULT_MAX_UPLOAD_BYTES};
use fileserver_core::staging::StagingDir;
use fileserver_core::store::{BucketLookup, S3Config};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("profile {0:?} is not valid (expected dev, test or prod)")]
    InvalidProfile(String),
    #[error("failed to read {file}: {source}")]
    EnvFile {
        file: String,
        #[source]
        source: dotenvy::Error,
    },
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Deployment profile; selects which dotenv file seeds the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Test,
    Prod,
}

impl Profile {
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var("APP_PROFILE").ok().filter(|p| !p.is_empty()) {
            None => Ok(Profile::Prod),
            Some(p) => p.parse(),
        }
    }

    pub fn env_file(&self) -> &'static str {
        match self {
            Profile::Dev => ".env.dev",
            Profile::Test => ".env.test",
            Profile::Prod => ".env",
        }
    }

    /// Load the profile's dotenv file if present. Real environment wins.
    pub fn load_env_file(&self) -> Result<(), ConfigError> {
        match dotenvy::from_filename(self.env_file()) {
            Ok(_) => Ok(()),
            Err(err) if err.not_found() => Ok(()),
            Err(source) => Err(ConfigError::EnvFile {
                file: self.env_file().to_string(),
                source,
            }),
        }
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Profile::Dev),
            "test" => Ok(Profile::Test),
            "prod" => Ok(Profile::Prod),
            other => Err(ConfigError::InvalidProfile(other.to_string())),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// PostgreSQL connection URL.
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub s3: S3Config,
    pub bucket: String,
    /// Local staging directory for uploads and downloads.
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub fingerprint_mode: FingerprintMode,
    pub delete_blob_on_delete: bool,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.is_empty()))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        Ok(Self {
            host: vars.string("HOST", "0.0.0.0"),
            port: vars.parse("PORT", 8080)?,
            database_url: vars.database_url()?,
            db_max_connections: vars.parse("DB_MAX_CONNECTIONS", 10)?,
            db_min_connections: vars.parse("DB_MIN_CONNECTIONS", 1)?,
            s3: S3Config {
                endpoint: lookup("S3_ENDPOINT"),
                access_key: lookup("S3_ACCESS_KEY"),
                secret_key: lookup("S3_SECRET_KEY"),
                session_token: lookup("S3_SESSION_TOKEN"),
                region: vars.string("S3_REGION", "us-east-1"),
                bucket_lookup: vars.parse("S3_BUCKET_LOOKUP", BucketLookup::Auto)?,
            },
            bucket: vars.string("S3_BUCKET", DEFAULT_BUCKET),
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(StagingDir::default_location),
            max_upload_bytes: vars.parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            fingerprint_mode: vars.parse("FINGERPRINT_MODE", FingerprintMode::Content)?,
            delete_blob_on_delete: vars.parse("DELETE_BLOB_ON_DELETE", false)?,
            log_level: vars.string("LOG_LEVEL", "info"),
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            bucket: self.bucket.clone(),
            max_upload_bytes: self.max_upload_bytes,
            fingerprint_mode: self.fingerprint_mode,
            delete_blob_on_delete: self.delete_blob_on_delete,
        }
    }
}

struct Vars<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Vars<'_> {
    fn string(&self, key: &str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.0)(key) {
            None => Ok(default),
            Some(value) => match value.trim().parse() {
                Ok(parsed) => Ok(parsed),
                Err(e) => Err(ConfigError::Invalid {
                    key,
                    reason: e.to_string(),
                    value,
                }),
            },
        }
    }

    /// `DATABASE_URL`, or a URL assembled from the `DB_*` parts.
    fn database_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = (self.0)("DATABASE_URL") {
            return Ok(url);
        }
        let host = (self.0)("DB_HOST").ok_or(ConfigError::Missing("DATABASE_URL or DB_HOST"))?;
        let port: u16 = self.parse("DB_PORT", 5432)?;
        let name = self.string("DB_NAME", "postgres");
        let user = self.string("DB_USERNAME", "postgres");
        let password = self.string("DB_PASSWORD", "");
        let ssl: bool = self.parse("DB_SSL_MODE", false)?;
        let timezone = self.string("DB_TIMEZONE", "UTC");

        let credentials = if password.is_empty() {
            user
        } else {
            format!("{user}:{password}")
        };
        let ssl_mode = if ssl { "require" } else { "disable" };
        Ok(format!(
            "postgres://{credentials}@{host}:{port}/{name}?sslmode={ssl_mode}&options=-c%20TimeZone%3D{timezone}"
        ))
    }
}
