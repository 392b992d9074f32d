//! Observable phases of an [`EmbeddedPostgres`](crate::EmbeddedPostgres).

use std::fmt;

/// Phase of the coordinator.
///
/// ```text
/// Idle -> Initializing -> Starting -> Ready -> Stopping -> Stopped
///              |              |
///              +----> Failed <+
/// ```
///
/// `Stopped` and `Failed` accept a fresh `start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Constructed and never started.
    Idle,
    /// Checking the port, fetching binaries, or running `initdb`.
    Initializing,
    /// Server spawned; waiting for readiness.
    Starting,
    /// Server accepts connections.
    Ready,
    /// Shutdown requested; waiting for the server to exit.
    Stopping,
    /// Server stopped after a successful start.
    Stopped,
    /// The last `start()` failed; no server is running.
    Failed,
}

impl LifecycleState {
    /// Whether `start()` may be called in this state.
    #[must_use]
    pub const fn can_start(self) -> bool {
        matches!(self, Self::Idle | Self::Stopped | Self::Failed)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
