use crate::error::{BadEnvVarSnafu, ParseIntSnafu, RosterResult};
use dotenvy::var;
use secrecy::{ExposeSecret, SecretString};
use snafu::ResultExt;
use std::sync::Arc;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug)]
pub struct RuntimeConfiguration {
    db_config: Arc<DbConfig>,
}

impl RuntimeConfiguration {
    pub fn new() -> RosterResult<Self> {
        Ok(Self {
            db_config: Arc::new(DbConfig::new()?),
        })
    }

    pub fn db_config(&self) -> Arc<DbConfig> {
        self.db_config.clone()
    }
}

#[derive(Debug)]
pub struct DbConfig {
    user: String,
    password: SecretString,
    path: String,
    port: u16,
    database: String,
    max_connections: u32,
}

impl DbConfig {
    pub fn new() -> RosterResult<Self> {
        Self::from_lookup(
            |name| var(name).context(BadEnvVarSnafu { name }),
            |name| var(name).ok(),
        )
    }

    fn from_lookup(
        get_env_var: impl Fn(&'static str) -> RosterResult<String>,
        optional: impl Fn(&'static str) -> Option<String>,
    ) -> RosterResult<Self> {
        let max_connections = match optional("ROSTER_DB_MAX_CONNECTIONS") {
            Some(n) => n.parse().context(ParseIntSnafu {
                name: "ROSTER_DB_MAX_CONNECTIONS",
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            user: get_env_var("DB_USER")?,
            password: SecretString::from(get_env_var("DB_PASSWORD")?),
            path: get_env_var("DB_PATH")?,
            port: get_env_var("DB_PORT")?
                .parse()
                .context(ParseIntSnafu { name: "DB_PORT" })?,
            database: get_env_var("DB_NAME")?,
            max_connections,
        })
    }

    pub const fn max_connections(&self) -> u32 {
        self.max_connections
    }

    pub fn get_db_path(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user,
            self.password.expose_secret(),
            self.path,
            self.port,
            self.database
        )
    }
}
