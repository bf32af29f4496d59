//! SQL statement generation for the workload drivers.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const INSERT: &str = "insert";
pub const SELECT: &str = "select";
pub const UPDATE: &str = "update";
pub const DELETE: &str = "delete";

/// Generated statements keyed by operation (`insert`, `select`, ...).
pub type SqlCommands = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Postgres,
    #[value(name = "mysql")]
    MySql,
}

impl Engine {
    pub fn default_port(self) -> u16 {
        match self {
            Engine::Postgres => 5432,
            Engine::MySql => 3306,
        }
    }

    pub fn default_db_name(self) -> &'static str {
        match self {
            Engine::Postgres => "postgres",
            Engine::MySql => "mysql",
        }
    }

    /// `key` is reserved in MySQL and has to be quoted there.
    pub fn key_column(self) -> &'static str {
        match self {
            Engine::Postgres => "key",
            Engine::MySql => "`key`",
        }
    }

    fn validation_table_prefix(self) -> &'static str {
        match self {
            Engine::Postgres => "pg_validation_",
            Engine::MySql => "mysql_validation_",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Engine::Postgres => "postgres",
            Engine::MySql => "mysql",
        })
    }
}

/// `len` random lowercase ASCII letters.
pub fn random_string(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect()
}

/// Key/value table used by the continuous data injection.
pub fn create_table_query(engine: Engine, table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} ({} varchar(45) NOT NULL, value varchar(45) NOT NULL)",
        engine.key_column()
    )
}

fn create_validation_table_query(engine: Engine, table: &str) -> String {
    match engine {
        Engine::Postgres => format!(
            "CREATE TABLE IF NOT EXISTS {table} (key varchar(45) NOT NULL, value varchar(45) NOT NULL)"
        ),
        Engine::MySql => format!(
            "CREATE TABLE IF NOT EXISTS {table} (`key` VARCHAR(45) NOT NULL, value VARCHAR(255))"
        ),
    }
}

/// `count` rows worth of insert/select/update/delete statements against a
/// fresh table. `insert` starts with the CREATE TABLE statement, so it holds
/// `count + 1` entries; the others hold `count`. Row keys are `0..count`.
pub fn generate_random_sql_commands(count: usize, engine: Engine) -> SqlCommands {
    let table = format!("{}{}", engine.validation_table_prefix(), random_string(5));
    let key = engine.key_column();

    let mut inserts = Vec::with_capacity(count + 1);
    let mut selects = Vec::with_capacity(count);
    let mut updates = Vec::with_capacity(count);
    let mut deletes = Vec::with_capacity(count);
    inserts.push(create_validation_table_query(engine, &table));

    for i in 0..count {
        let value = format!("Value-{}", random_string(10));
        let updated = format!("Value-Updated-{}", random_string(10));
        inserts.push(format!("INSERT INTO {table} VALUES('{i}', '{value}')"));
        selects.push(format!("SELECT * FROM {table} WHERE {key}='{i}'"));
        updates.push(format!("UPDATE {table} SET value='{updated}' WHERE {key}='{i}'"));
        deletes.push(format!("DELETE FROM {table} WHERE {key}='{i}'"));
    }

    SqlCommands::from([
        (INSERT.to_string(), inserts),
        (SELECT.to_string(), selects),
        (UPDATE.to_string(), updates),
        (DELETE.to_string(), deletes),
    ])
}

/// One insert and the select that finds it again, against `table`.
pub fn generate_sql_command_pair(table: &str, engine: Engine) -> (String, String) {
    let key = format!("key-{}", random_string(10));
    let value = format!("value-{}", random_string(10));
    (
        format!("INSERT INTO {table} VALUES('{key}', '{value}')"),
        format!("SELECT * FROM {table} WHERE {}='{key}'", engine.key_column()),
    )
}
