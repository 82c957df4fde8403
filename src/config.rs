use std::env;
use uuid::Uuid;

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and pulled
/// into handlers and extractors via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` only in local mode, which then runs on the in-memory store.
    pub db_url: Option<String>,
    // Upper bound on pooled Postgres connections.
    pub db_max_connections: u32,
    // TCP port the HTTP server binds to on 0.0.0.0.
    pub port: u16,
    // Runtime environment marker. Controls the log format and the `x-user-id` bypass.
    pub env: Env,
    // Secret used to validate incoming JWTs (HS256).
    pub jwt_secret: String,
    // Id of the ADMIN user seeded into the in-memory store. Local only; random when unset.
    pub dev_admin_id: Option<Uuid>,
}

/// Env
///
/// The runtime context: local development or hardened production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test state setup.
    fn default() -> Self {
        Self {
            db_url: None,
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
            port: DEFAULT_PORT,
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            dev_admin_id: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment and fails fast.
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL` or `JWT_SECRET` is missing, and in any
    /// environment when `PORT` or `DATABASE_MAX_CONNECTIONS` is not a number, and locally
    /// when `DEV_ADMIN_ID` is not a UUID.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let port = env::var("PORT")
            .map(|p| p.parse().expect("FATAL: PORT must be a valid port number"))
            .unwrap_or(DEFAULT_PORT);

        let db_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .map(|n| {
                n.parse()
                    .expect("FATAL: DATABASE_MAX_CONNECTIONS must be a positive integer")
            })
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL").ok(),
                db_max_connections,
                port,
                jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                dev_admin_id: env::var("DEV_ADMIN_ID").ok().map(|id| {
                    Uuid::parse_str(&id).expect("FATAL: DEV_ADMIN_ID must be a UUID")
                }),
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                ),
                db_max_connections,
                port,
                jwt_secret: env::var("JWT_SECRET")
                    .expect("FATAL: JWT_SECRET must be set in production."),
                dev_admin_id: None,
            },
        }
    }
}
