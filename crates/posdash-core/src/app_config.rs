use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Where the Postgres pool connects.
#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// A complete `postgres://` URL from `DATABASE_URL`.
    Url(String),
    /// Individual connection parts; SSL is always required for these.
    Parts {
        host: String,
        port: u16,
        database: String,
        user: String,
        password: Option<String>,
    },
}

impl std::fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseTarget::Url(_) => f.debug_tuple("Url").field(&"[redacted]").finish(),
            DatabaseTarget::Parts {
                host,
                port,
                database,
                user,
                password,
            } => f
                .debug_struct("Parts")
                .field("host", host)
                .field("port", port)
                .field("database", database)
                .field("user", user)
                .field("password", &password.as_ref().map(|_| "[redacted]"))
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub target: DatabaseTarget,
    /// Applied as the connection `search_path`.
    pub schema: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

/// Embedded BI dashboard settings handed to the frontend.
#[derive(Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub instance_url: String,
    pub workspace_id: String,
    pub dashboard_id: String,
    pub token: String,
}

impl DashboardConfig {
    #[must_use]
    pub fn embed_url(&self) -> String {
        format!(
            "{}/embed/dashboardsv3/{}?o={}",
            self.instance_url.trim_end_matches('/'),
            self.dashboard_id,
            self.workspace_id
        )
    }
}

impl std::fmt::Debug for DashboardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardConfig")
            .field("instance_url", &self.instance_url)
            .field("workspace_id", &self.workspace_id)
            .field("dashboard_id", &self.dashboard_id)
            .field("token", &"[redacted]")
            .finish()
    }
}

/// Genie conversation space settings.
#[derive(Clone, PartialEq, Eq)]
pub struct GenieConfig {
    pub instance_url: String,
    pub space_id: String,
    pub token: String,
}

impl GenieConfig {
    #[must_use]
    pub fn space_url(&self) -> String {
        format!(
            "{}/genie/rooms/{}",
            self.instance_url.trim_end_matches('/'),
            self.space_id
        )
    }
}

impl std::fmt::Debug for GenieConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenieConfig")
            .field("instance_url", &self.instance_url)
            .field("space_id", &self.space_id)
            .field("token", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub static_root: PathBuf,
    /// `None` when no database is configured; the service then serves sample data.
    pub database: Option<DatabaseConfig>,
    pub dashboard: Option<DashboardConfig>,
    pub genie: Option<GenieConfig>,
    pub claude_endpoint: Option<String>,
    pub http_timeout_secs: u64,
}
