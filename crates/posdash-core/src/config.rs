use crate::app_config::{
    AppConfig, DashboardConfig, DatabaseConfig, DatabaseTarget, Environment, GenieConfig,
};
use crate::ConfigError;

const CLAUDE_SERVING_PATH: &str = "/serving-endpoints/databricks-claude-sonnet-4/invocations";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Empty values are treated the same as unset ones so that a blank line in a
/// `.env` file does not half-configure an integration.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default =
        |var: &str, default: &str| -> String { optional(var).unwrap_or_else(|| default.to_string()) };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let env = parse_environment(&or_default("ENV", "development"))?;

    let bind_addr = or_default("BIND_ADDR", "0.0.0.0:8000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("BIND_ADDR", e.to_string()))?;
    let log_level = or_default("LOG_LEVEL", "info").to_lowercase();
    let static_root = PathBuf::from(or_default("STATIC_ROOT", "./static"));

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };
    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let target = if let Some(url) = optional("DATABASE_URL") {
        Some(DatabaseTarget::Url(url))
    } else if let Some(host) = optional("DB_HOST") {
        let port = or_default("DB_PORT", "5432")
            .parse::<u16>()
            .map_err(|e| invalid("DB_PORT", e.to_string()))?;
        let database =
            optional("DB_NAME").ok_or_else(|| ConfigError::MissingEnvVar("DB_NAME".to_string()))?;
        let user =
            optional("DB_USER").ok_or_else(|| ConfigError::MissingEnvVar("DB_USER".to_string()))?;
        Some(DatabaseTarget::Parts {
            host,
            port,
            database,
            user,
            password: optional("DB_PASSWORD"),
        })
    } else {
        None
    };

    let database = match target {
        Some(target) => {
            let schema = or_default("DB_SCHEMA", "public");
            if !is_valid_schema_name(&schema) {
                return Err(invalid(
                    "DB_SCHEMA",
                    format!("'{schema}' is not a plain SQL identifier"),
                ));
            }
            Some(DatabaseConfig {
                target,
                schema,
                max_connections: parse_u32("DB_MAX_CONNECTIONS", "5")?,
                min_connections: parse_u32("DB_MIN_CONNECTIONS", "1")?,
                acquire_timeout_secs: parse_u64("DB_ACQUIRE_TIMEOUT_SECS", "10")?,
                run_migrations: parse_bool(&or_default("DB_RUN_MIGRATIONS", "false"))
                    .ok_or_else(|| {
                        invalid("DB_RUN_MIGRATIONS", "expected true or false".to_string())
                    })?,
            })
        }
        None => None,
    };

    let instance_url = optional("DATABRICKS_INSTANCE_URL");

    let dashboard = match (
        instance_url.clone(),
        optional("DATABRICKS_WORKSPACE_ID"),
        optional("DATABRICKS_DASHBOARD_ID"),
        optional("DATABRICKS_DASHBOARD_TOKEN"),
    ) {
        (Some(instance_url), Some(workspace_id), Some(dashboard_id), Some(token)) => {
            Some(DashboardConfig {
                instance_url,
                workspace_id,
                dashboard_id,
                token,
            })
        }
        _ => None,
    };

    let genie = match (
        optional("DATABRICKS_GENIE_INSTANCE_URL"),
        optional("DATABRICKS_GENIE_SPACE_ID"),
        optional("DATABRICKS_GENIE_TOKEN"),
    ) {
        (Some(instance_url), Some(space_id), Some(token)) => Some(GenieConfig {
            instance_url,
            space_id,
            token,
        }),
        _ => None,
    };

    let claude_endpoint = optional("CLAUDE_ENDPOINT_URL").or_else(|| {
        instance_url.map(|url| format!("{}{CLAUDE_SERVING_PATH}", url.trim_end_matches('/')))
    });

    let http_timeout_secs = parse_u64("HTTP_TIMEOUT_SECS", "30")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        static_root,
        database,
        dashboard,
        genie,
        claude_endpoint,
        http_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.to_lowercase().as_str() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// The schema is spliced into a connection option, so only bare identifiers pass.
fn is_valid_schema_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
