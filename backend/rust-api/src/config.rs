use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub jwt_secret: String,
    /// Window after enrollment during which unenrolling (with a refund
    /// notice for paid courses) is still allowed.
    pub unenroll_grace_hours: i64,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "edukendra".to_string());

        let jwt_secret = settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: JWT_SECRET must be set in production!");
                }
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            });

        let unenroll_grace_hours = settings
            .get_int("enrollment.grace_hours")
            .ok()
            .or_else(|| {
                env::var("UNENROLL_GRACE_HOURS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok())
            })
            .unwrap_or(48);

        let admin_email = settings
            .get_string("admin.email")
            .ok()
            .or_else(|| env::var("ADMIN_EMAIL").ok());

        let admin_password = settings
            .get_string("admin.password")
            .ok()
            .or_else(|| env::var("ADMIN_PASSWORD").ok());

        Ok(Config {
            mongo_uri,
            mongo_database,
            jwt_secret,
            unenroll_grace_hours,
            admin_email,
            admin_password,
        })
    }

    /// Fixed configuration for tests: no files, no env, no external services.
    pub fn for_tests() -> Self {
        Config {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "edukendra_test".to_string(),
            jwt_secret: "test-secret-not-for-production".to_string(),
            unenroll_grace_hours: 48,
            admin_email: Some("admin@test.local".to_string()),
            admin_password: Some("AdminPassw0rd!".to_string()),
        }
    }
}
