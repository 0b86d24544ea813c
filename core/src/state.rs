//! Connection and install state machines observed by the UI layer.
//!
//! The connection machine tracks reachability of one daemon; install
//! sub-states are independent per operation and keyed by a caller-generated
//! operation id. No transition is retried automatically: every retry is an
//! explicit re-invocation by the owner of the machine.

use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::models::PullProgress;

/// Why the last connection check failed. The two variants require different
/// user remediation (start the daemon vs. reconfigure its origin allow-list),
/// so they are kept distinct all the way to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The daemon could not be reached at all. Carries the transport error
    /// text for display.
    Unreachable(String),
    /// Both loopback spellings failed, which points at origin policy rather
    /// than a down daemon.
    CorsBlocked,
}

impl ConnectionError {
    /// Classify a failed connection check. `RegistryUnavailable` counts as
    /// unreachable for UI purposes; its status text is kept for display.
    pub fn classify(err: &crate::error::DockErr) -> Self {
        match err {
            crate::error::DockErr::CorsBlocked { .. } => ConnectionError::CorsBlocked,
            other => ConnectionError::Unreachable(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Idle,
    Checking,
    Connected,
    Error(ConnectionError),
}

impl ConnectionState {
    fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Checking => "checking",
            ConnectionState::Connected => "connected",
            ConnectionState::Error(ConnectionError::Unreachable(_)) => "error(unreachable)",
            ConnectionState::Error(ConnectionError::CorsBlocked) => "error(cors-blocked)",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("illegal connection state transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

/// State machine for one daemon connection.
///
/// `idle -> checking -> {connected | error}`; a new check may be started from
/// any settled state, but check outcomes are only accepted while checking.
#[derive(Debug, Default)]
pub struct DaemonConnection {
    state: ConnectionState,
}

impl DaemonConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Start a connection check (user action or mount-time auto-check).
    pub fn begin_check(&mut self) -> Result<(), TransitionError> {
        match self.state {
            ConnectionState::Checking => Err(self.illegal("checking")),
            _ => {
                self.state = ConnectionState::Checking;
                Ok(())
            }
        }
    }

    /// Record a successful registry-list call.
    pub fn check_succeeded(&mut self) -> Result<(), TransitionError> {
        match self.state {
            ConnectionState::Checking => {
                self.state = ConnectionState::Connected;
                Ok(())
            }
            _ => Err(self.illegal("connected")),
        }
    }

    /// Record a failed registry-list call with its classified cause.
    pub fn check_failed(&mut self, cause: ConnectionError) -> Result<(), TransitionError> {
        match self.state {
            ConnectionState::Checking => {
                let to = ConnectionState::Error(cause);
                self.state = to;
                Ok(())
            }
            _ => Err(self.illegal("error")),
        }
    }

    /// Explicit user choice to abandon this daemon for a cloud provider.
    /// Terminal: consumes the machine. Only legal from an error state; other
    /// providers' machines are unaffected.
    pub fn fall_back(self) -> Result<(), TransitionError> {
        match self.state {
            ConnectionState::Error(_) => Ok(()),
            _ => Err(TransitionError {
                from: self.state.label(),
                to: "fallen-back",
            }),
        }
    }

    fn illegal(&self, to: &'static str) -> TransitionError {
        TransitionError {
            from: self.state.label(),
            to,
        }
    }
}

/// Sub-state of one pull/create/delete operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallPhase {
    Starting,
    Downloading { completed: u64, total: u64 },
    Verifying,
    Done,
    Failed(String),
}

impl InstallPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstallPhase::Done | InstallPhase::Failed(_))
    }

    /// Derive a phase from a streamed progress record. Byte counters mean we
    /// are downloading; otherwise the daemon's status strings are matched.
    /// Free-text statuses with no phase signal return `None` and leave the
    /// last known phase in place.
    pub fn from_progress(progress: &PullProgress) -> Option<InstallPhase> {
        if progress.status == "success" {
            return Some(InstallPhase::Done);
        }
        if let (Some(completed), Some(total)) = (progress.completed, progress.total) {
            return Some(InstallPhase::Downloading { completed, total });
        }
        if progress.status.contains("verifying") {
            return Some(InstallPhase::Verifying);
        }
        None
    }
}

/// Install sub-states keyed by operation id. Each operation owns its own
/// phase; concurrent pulls for different models never interfere.
#[derive(Debug, Default)]
pub struct InstallTracker {
    ops: HashMap<Uuid, InstallPhase>,
}

impl InstallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new operation in the `Starting` phase and return its id.
    pub fn begin(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.ops.insert(id, InstallPhase::Starting);
        id
    }

    pub fn phase(&self, id: Uuid) -> Option<&InstallPhase> {
        self.ops.get(&id)
    }

    /// Apply a streamed progress record. Terminal phases are sticky; records
    /// arriving after them are ignored.
    pub fn update(&mut self, id: Uuid, progress: &PullProgress) {
        let Some(phase) = self.ops.get_mut(&id) else {
            return;
        };
        if phase.is_terminal() {
            return;
        }
        if let Some(next) = InstallPhase::from_progress(progress) {
            *phase = next;
        }
    }

    /// Mark an operation done (e.g. the stream ended without an explicit
    /// success record). Terminal phases are left alone.
    pub fn complete(&mut self, id: Uuid) {
        if let Some(phase) = self.ops.get_mut(&id)
            && !phase.is_terminal()
        {
            *phase = InstallPhase::Done;
        }
    }

    pub fn fail(&mut self, id: Uuid, message: impl Into<String>) {
        if let Some(phase) = self.ops.get_mut(&id)
            && !phase.is_terminal()
        {
            *phase = InstallPhase::Failed(message.into());
        }
    }
}
