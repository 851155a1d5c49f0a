//! Process configuration from environment variables.
//!
//! A `.env` file in the working directory is loaded first when present
//! (`dotenvy`), so local development needs no exported variables. Every knob
//! has a default except `DATABASE_URL`, whose absence selects the in-memory
//! document store.

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ROOM_CLIENT_QUEUE: usize = 256;
const DEFAULT_CASCADE_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Outbound queue depth per websocket client. Full queues drop events.
    pub room_client_queue: usize,
    /// Pending whiteboard ids awaiting shared-element resync.
    pub cascade_queue_capacity: usize,
    /// Allowed CORS origin. `None` allows any origin.
    pub cors_allow_origin: Option<String>,
    /// Bearer token for a seeded development user. Only honored by the
    /// in-memory store.
    pub dev_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            room_client_queue: DEFAULT_ROOM_CLIENT_QUEUE,
            cascade_queue_capacity: DEFAULT_CASCADE_QUEUE_CAPACITY,
            cors_allow_origin: None,
            dev_token: None,
        }
    }
}

impl Config {
    /// Load `.env` (if any) and read the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "failed to load .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unparseable values fall
    /// back to their defaults; blank strings count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        Self {
            port: parse_or(get("PORT"), DEFAULT_PORT),
            database_url: get("DATABASE_URL"),
            db_max_connections: parse_or(get("DB_MAX_CONNECTIONS"), DEFAULT_DB_MAX_CONNECTIONS),
            room_client_queue: parse_or(get("ROOM_CLIENT_QUEUE"), DEFAULT_ROOM_CLIENT_QUEUE).max(1),
            cascade_queue_capacity: parse_or(get("CASCADE_QUEUE_CAPACITY"), DEFAULT_CASCADE_QUEUE_CAPACITY).max(1),
            cors_allow_origin: get("CORS_ALLOW_ORIGIN").filter(|v| v != "*"),
            dev_token: get("DEV_TOKEN"),
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
