//! Global parameters.
//!
//! Compile-time constants live here together with the [`Configurables`], the small set
//! of values that can be tuned at runtime through environment variables.

use std::sync::OnceLock;

/// Environment variable holding the connection uri
pub const ENV_DATABASE_URL: &str = "MAM_DATABASE_URL";
/// Environment variable holding the maximum number of database connections
pub const ENV_MAX_DB_CONNECTIONS: &str = "MAM_MAX_DB_CONNECTIONS";

/// Connection uri used when nothing is configured
pub const DEFAULT_DATABASE_URL: &str = "memory://mam";
/// A single logical connection per process
pub const DEFAULT_MAX_DB_CONNECTIONS: u32 = 1;

/// Name of the document field holding the generated identifier
pub const DOCUMENT_ID_FIELD: &str = "_id";

/// Field receiving auto-increment values unless configured otherwise
pub const DEFAULT_SEQUENCE_FIELD: &str = "idx";
pub const DEFAULT_SEQUENCE_START: i64 = 1;
pub const DEFAULT_SEQUENCE_INCREMENT: i64 = 1;

/// Connection uri schemes understood by the repository
pub mod scheme {
    pub const MEMORY: &str = "memory";
    pub const FILE: &str = "file";
    pub const POSTGRES: &str = "postgres";
    pub const POSTGRESQL: &str = "postgresql";
}

/// Runtime tunables, loaded once from the environment.
#[derive(Debug, Clone)]
pub struct Configurables {
    pub database_url: String,
    pub max_db_connections: u32,
}

impl Configurables {
    fn from_env() -> Self {
        let database_url =
            std::env::var(ENV_DATABASE_URL).unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());

        let max_db_connections = std::env::var(ENV_MAX_DB_CONNECTIONS)
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_DB_CONNECTIONS);

        Self {
            database_url,
            max_db_connections,
        }
    }
}

static CONFIGURABLES: OnceLock<Configurables> = OnceLock::new();

/// Returns the process wide configurables, reading the environment on first access.
pub fn configurables() -> &'static Configurables {
    CONFIGURABLES.get_or_init(Configurables::from_env)
}
