//! Crate-wide error type.
//!
//! Library code returns [`Result`]; the binary and the kube-facing helpers
//! keep using `anyhow` and convert at the edge through [`Error::Other`].

use std::panic::Location;
use std::time::Duration;

use serde::Serialize;

use crate::cluster::request::RequestKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Message carried by [`Error::ConditionNotMet`].
pub const CONDITION_NOT_MET: &str = "Resiliency Condition did not meet. Failing this test case.";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cluster '{0}' is not registered")]
    ClusterNotRegistered(String),

    #[error("{kind} '{uid}' is not recorded")]
    NotRecorded { kind: &'static str, uid: String },

    #[error("{kind} '{uid}' is already recorded")]
    AlreadyRecorded { kind: &'static str, uid: String },

    #[error("torpedo-test [name: {name}] has the same test ID [{uid}] and has already started")]
    TestAlreadyStarted { name: String, uid: String },

    #[error("torpedo-test [name: {name}] has the same TestRail ID [{testrail_id}] and has already started")]
    TestRailIdInUse { name: String, testrail_id: u32 },

    #[error("torpedo-test [{0}] has not started yet")]
    TestNotStarted(String),

    #[error("no processor registered for request kind {0}")]
    UnknownRequest(RequestKind),

    #[error("failed to switch context to '{path}'")]
    ContextSwitch {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to connect to {conn}")]
    Connect {
        conn: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("query failed: {query}")]
    Query {
        query: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Below results not found in the table:\n {}", .0.join("\n"))]
    DataNotFound(Vec<String>),

    #[error("{}", CONDITION_NOT_MET)]
    ConditionNotMet,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("{}", join_errors(.0))]
    Aggregate(Vec<Error>),

    #[error("{source}\n  at {location} <-> {debug}")]
    Processed {
        #[source]
        source: Box<Error>,
        location: String,
        debug: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Fold a list of collected errors into one. Empty means success.
    pub fn aggregate(mut errors: Vec<Error>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Error::Aggregate(errors)),
        }
    }

    /// Wrap an external collaborator failure as a context switch error.
    pub fn context_switch(path: impl Into<String>, source: anyhow::Error) -> Self {
        Error::ContextSwitch {
            path: path.into(),
            source: source.into(),
        }
    }

    /// True for the resiliency sentinel, also when it sits inside a wrapper.
    pub fn is_condition_not_met(&self) -> bool {
        match self {
            Error::ConditionNotMet => true,
            Error::Processed { source, .. } => source.is_condition_not_met(),
            Error::Aggregate(errors) => errors.iter().any(Error::is_condition_not_met),
            _ => false,
        }
    }
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" : ")
}

/// Attach the caller's location and an optional debug message to `err`.
#[track_caller]
pub fn process_error(err: impl Into<Error>, debug: Option<String>) -> Error {
    let caller = Location::caller();
    Error::Processed {
        source: Box::new(err.into()),
        location: format!("{}:{}", caller.file(), caller.line()),
        debug: match debug {
            Some(msg) => format!("debug message: {msg}"),
            None => "no debug message".to_string(),
        },
    }
}

/// Render any serialisable value for error context and logs.
pub fn debug_string<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserialisable: {e}>"))
}
