use crate::control::OperatorControl;
use crate::session::Phase;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared application state for the operator surface
#[derive(Clone)]
pub struct AppState {
    /// Signal surface written by the handlers, polled by the session task
    pub control: Arc<OperatorControl>,

    /// Phase hint published by the orchestrator at state boundaries
    pub phase: watch::Receiver<Phase>,

    /// Identifier of the running session
    pub session_id: String,
}

impl AppState {
    pub fn new(
        control: Arc<OperatorControl>,
        phase: watch::Receiver<Phase>,
        session_id: String,
    ) -> Self {
        Self {
            control,
            phase,
            session_id,
        }
    }
}
