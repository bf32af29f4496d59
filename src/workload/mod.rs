//! Database workload drivers.
//!
//! A driver connects to one database instance, runs pre-generated statement
//! sets against it, and can keep injecting rows in the background while a
//! resiliency scenario runs ([`ApplicationDriver::start_data`]).

pub mod mysql;
pub mod postgres;
pub mod sql;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use sql::{create_table_query, generate_sql_command_pair, random_string, Engine, SqlCommands};

pub use mysql::MySqlDriver;
pub use postgres::PostgresDriver;

/// Interval between two injected rows.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(2);

/// How long a statement waits for a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub hostname: String,
    pub user: String,
    pub password: String,
    /// Engine default when unset.
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub db_name: Option<String>,
}

impl ConnectionParams {
    pub fn port_or_default(&self, engine: Engine) -> u16 {
        self.port.unwrap_or_else(|| engine.default_port())
    }

    pub fn db_name_or_default(&self, engine: Engine) -> String {
        self.db_name
            .clone()
            .filter(|db| !db.is_empty())
            .unwrap_or_else(|| engine.default_db_name().to_string())
    }
}

/// Control messages for [`ApplicationDriver::start_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataCommand {
    Start,
    Pause,
    Stop,
}

impl From<&str> for DataCommand {
    /// Anything other than `Pause` or `Stop` means `Start`.
    fn from(s: &str) -> Self {
        match s {
            "Stop" => DataCommand::Stop,
            "Pause" => DataCommand::Pause,
            _ => DataCommand::Start,
        }
    }
}

impl fmt::Display for DataCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataCommand::Start => "Start",
            DataCommand::Pause => "Pause",
            DataCommand::Stop => "Stop",
        })
    }
}

#[async_trait]
pub trait ApplicationDriver: Send + Sync {
    fn engine(&self) -> Engine;

    fn hostname(&self) -> &str;

    /// Statement sets for the backup-data operations.
    fn sql_commands(&self) -> &SqlCommands;

    fn default_port(&self) -> u16 {
        self.engine().default_port()
    }

    fn default_db_name(&self) -> &'static str {
        self.engine().default_db_name()
    }

    fn tick_interval(&self) -> Duration {
        DEFAULT_TICK_INTERVAL
    }

    /// When true, a failed insert during [`start_data`](Self::start_data) is
    /// recorded and reported at Stop instead of ending the injection.
    fn accumulates_insert_errors(&self) -> bool {
        false
    }

    /// Run one statement.
    async fn execute(&self, statement: &str) -> Result<()>;

    /// Whether `query` returns at least one row.
    async fn row_exists(&self, query: &str) -> Result<bool>;

    /// Run `commands` in order, stopping at the first failure.
    async fn execute_command(&self, commands: &[String]) -> Result<()> {
        for command in commands {
            self.execute(command).await?;
        }
        Ok(())
    }

    /// Fail with every query in `queries` that finds no row.
    async fn check_data_present(&self, queries: &[String]) -> Result<()> {
        info!(host = self.hostname(), count = queries.len(), "running select queries");
        let mut missing = Vec::new();
        for query in queries {
            match self.row_exists(query).await {
                Ok(true) => {}
                Ok(false) => {
                    info!(%query, "select query returned no rows");
                    missing.push(query.clone());
                }
                Err(e) => {
                    info!(%query, "select query failed: {e}");
                    missing.push(query.clone());
                }
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::DataNotFound(missing))
        }
    }

    async fn insert_backup_data(&self) -> Result<()> {
        info!(host = self.hostname(), "inserting data");
        self.execute_command(commands_for(self.sql_commands(), sql::INSERT))
            .await
    }

    async fn update_backup_data(&self) -> Result<()> {
        info!(host = self.hostname(), "running update queries");
        self.execute_command(commands_for(self.sql_commands(), sql::UPDATE))
            .await
    }

    async fn delete_backup_data(&self) -> Result<()> {
        info!(host = self.hostname(), "running delete queries");
        self.execute_command(commands_for(self.sql_commands(), sql::DELETE))
            .await
    }

    /// Inject one row per tick into a fresh `table_<rand>` until told to stop,
    /// then verify every injected row is still there.
    ///
    /// `Pause` halts injection until the next command; `Start` resumes it.
    /// A closed channel counts as `Stop`.
    async fn start_data(&self, mut commands: mpsc::Receiver<DataCommand>) -> Result<()> {
        let engine = self.engine();
        let table = format!("table_{}", random_string(4));
        self.execute(&create_table_query(engine, &table)).await?;
        info!(host = self.hostname(), %table, "started data injection");

        let mut state = DataCommand::Start;
        let mut selects = Vec::new();
        let mut insert_errors = Vec::new();
        loop {
            let next = match state {
                DataCommand::Pause => Some(commands.recv().await.unwrap_or(DataCommand::Stop)),
                _ => match commands.try_recv() {
                    Ok(cmd) => Some(cmd),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => Some(DataCommand::Stop),
                },
            };
            if let Some(cmd) = next {
                debug!(%cmd, "data injection command");
                if cmd == DataCommand::Stop {
                    break;
                }
                state = cmd;
                continue;
            }

            let (insert, select) = generate_sql_command_pair(&table, engine);
            match self.execute(&insert).await {
                Ok(()) => selects.push(select),
                Err(e) if self.accumulates_insert_errors() => {
                    warn!(%insert, "insert failed: {e}");
                    insert_errors.push(e);
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(self.tick_interval()).await;
        }

        info!(host = self.hostname(), rows = selects.len(), "stopping data injection");
        let check = self.check_data_present(&selects).await;
        if insert_errors.is_empty() {
            return check;
        }
        if let Err(e) = check {
            insert_errors.push(e);
        }
        Error::aggregate(insert_errors)
    }
}

fn commands_for<'a>(commands: &'a SqlCommands, op: &str) -> &'a [String] {
    commands.get(op).map(Vec::as_slice).unwrap_or_default()
}

/// Any failure to obtain a connection, server-side rejections such as a bad
/// password or unknown database included.
pub(crate) fn connect_error(err: sqlx::Error, conn: &str) -> Error {
    Error::Connect {
        conn: conn.to_string(),
        source: err,
    }
}

/// Split an error raised while running a statement on an acquired connection
/// into connectivity (the link dropped) and statement failures.
pub(crate) fn sql_error(err: sqlx::Error, conn: &str, statement: &str) -> Error {
    if matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_)
    ) {
        connect_error(err, conn)
    } else {
        Error::Query {
            query: statement.to_string(),
            source: err,
        }
    }
}
