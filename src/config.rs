use crate::error::{Result, TransferError};
use serde::{Deserialize, Serialize};

const DEFAULT_MYSQL_PORT: u16 = 3306;
const DEFAULT_SSH_BIND_PORT: u16 = 13306;

/// Connection parameters for a networked database, materialized from the
/// environment once at session start. No component reads the environment
/// after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ConnectionProfile {
    pub fn display_target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

/// SSH tunnel parameters, present only when `SSH_HOST` is configured.
#[derive(Debug, Clone)]
pub struct TunnelSettings {
    pub host: String,
    pub user: String,
    pub password: Option<String>,
    pub key_path: Option<String>,
    pub bind_port: u16,
}

fn env_getter(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Builds a MySQL connection profile from environment variables. The
/// production toggle switches to the `PROD_`-prefixed variable set.
pub fn mysql_profile(database: &str, use_prod: bool) -> Result<ConnectionProfile> {
    mysql_profile_with(database, use_prod, env_getter)
}

pub fn mysql_profile_with(
    database: &str,
    use_prod: bool,
    get: impl Fn(&str) -> Option<String>,
) -> Result<ConnectionProfile> {
    if database.trim().is_empty() {
        return Err(TransferError::ValidationError(
            "database name is required".to_string(),
        ));
    }

    let prefix = if use_prod { "PROD_" } else { "" };
    let mut missing = Vec::new();
    let mut want = |suffix: &str| {
        let key = format!("{prefix}MYSQL_{suffix}");
        match get(&key) {
            Some(value) => value,
            None => {
                missing.push(key);
                String::new()
            }
        }
    };

    let host = want("HOST");
    let user = want("USER");
    let password = want("PASSWORD");
    let port = get(&format!("{prefix}MYSQL_PORT"))
        .map(|raw| {
            raw.parse::<u16>().map_err(|e| {
                TransferError::ConfigurationMissing(format!(
                    "{prefix}MYSQL_PORT is not a valid port: {e}"
                ))
            })
        })
        .transpose()?
        .unwrap_or(DEFAULT_MYSQL_PORT);

    if !missing.is_empty() {
        return Err(TransferError::ConfigurationMissing(missing.join(", ")));
    }

    Ok(ConnectionProfile {
        host,
        port,
        user,
        password,
        database: database.trim().to_string(),
    })
}

/// Reads tunnel settings; `None` when no `SSH_HOST` is configured.
pub fn tunnel_settings() -> Result<Option<TunnelSettings>> {
    tunnel_settings_with(env_getter)
}

pub fn tunnel_settings_with(
    get: impl Fn(&str) -> Option<String>,
) -> Result<Option<TunnelSettings>> {
    let Some(host) = get("SSH_HOST") else {
        return Ok(None);
    };

    let user = get("SSH_USER").ok_or_else(|| {
        TransferError::ConfigurationMissing("SSH_USER is required when SSH_HOST is set".to_string())
    })?;
    let bind_port = get("SSH_BIND_PORT")
        .map(|raw| {
            raw.parse::<u16>().map_err(|e| {
                TransferError::ConfigurationMissing(format!("SSH_BIND_PORT is invalid: {e}"))
            })
        })
        .transpose()?
        .unwrap_or(DEFAULT_SSH_BIND_PORT);

    Ok(Some(TunnelSettings {
        host,
        user,
        password: get("SSH_PASSWORD"),
        key_path: get("SSH_KEY_PATH"),
        bind_port,
    }))
}

#[cfg(test)]
mod tests;
