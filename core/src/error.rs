use reqwest::StatusCode;
use std::io;
use thiserror::Error;

use crate::state::TransitionError;

pub type Result<T> = std::result::Result<T, DockErr>;

#[derive(Error, Debug)]
pub enum DockErr {
    /// The daemon could not be reached at all (host down, wrong port). The
    /// payload is the underlying transport error text, surfaced verbatim.
    #[error("could not reach the model daemon: {0}")]
    Network(String),

    /// Both loopback spellings of the daemon host failed at the transport
    /// level. The daemon is likely up but the origin policy in front of it is
    /// rejecting us, which needs a different fix than "start the daemon".
    #[error("the model daemon at {host} appears to be blocking cross-origin requests")]
    CorsBlocked { host: String },

    /// Non-2xx from a listing call. Equivalent to `Network` for UI purposes
    /// but keeps the original status text for diagnostics.
    #[error("model registry unavailable: status {0}: {1}")]
    RegistryUnavailable(StatusCode, String),

    /// Daemon-reported `error` record while pulling a model.
    #[error("pull failed: {0}")]
    PullFailed(String),

    /// Daemon-reported `error` record while creating a model.
    #[error("create failed: {0}")]
    CreateFailed(String),

    /// Non-2xx response to a delete request.
    #[error("delete failed: {0}")]
    DeleteFailed(String),

    /// Illegal connection state transition.
    #[error("state error: {0}")]
    State(#[from] TransitionError),

    #[error("{0}")]
    EnvVar(EnvVarError),

    // -----------------------------------------------------------------
    // Automatic conversions for common external error types
    // -----------------------------------------------------------------
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct EnvVarError {
    /// Name of the environment variable that is missing.
    pub var: String,

    /// Optional instructions to help the user get a valid value for the
    /// variable and set it.
    pub instructions: Option<String>,
}

impl std::fmt::Display for EnvVarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Missing environment variable: `{}`.", self.var)?;
        if let Some(instructions) = &self.instructions {
            write!(f, " {instructions}")?;
        }
        Ok(())
    }
}

/// Map an error onto the message shown to the user. "Can't find your daemon"
/// and "something is blocking your daemon" get distinct remediation text
/// because the fix differs materially.
pub fn user_facing_message(e: &DockErr) -> String {
    match e {
        DockErr::Network(_) => format!(
            "{e}. Check that the daemon is running (e.g. `ollama serve`) and that the configured base URL is correct."
        ),
        DockErr::CorsBlocked { .. } => format!(
            "{e}. Allow this origin on the daemon, e.g. restart it with `OLLAMA_ORIGINS=\"*\"`."
        ),
        DockErr::RegistryUnavailable(status, _) => {
            format!("the daemon answered {status} while listing models; it may still be starting up")
        }
        _ => e.to_string(),
    }
}
