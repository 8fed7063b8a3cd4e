//! Observability hooks for session state transitions.
//!
//! The session manager reports every committed status change through the
//! [`SessionObserver`] seam. Hooks run outside the state machine and are not
//! part of its functional contract; an implementation must not block.

use chrono::{DateTime, Utc};
use rsim_session_core::SessionStatus;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Which session operation caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionOperation {
    /// The startup credential check.
    Check,
    Login,
    Logout,
}

impl std::fmt::Display for SessionOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionOperation::Check => write!(f, "check"),
            SessionOperation::Login => write!(f, "login"),
            SessionOperation::Logout => write!(f, "logout"),
        }
    }
}

/// A committed status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTransition {
    pub from: SessionStatus,
    pub to: SessionStatus,
    pub operation: SessionOperation,
    pub at: DateTime<Utc>,
}

impl SessionTransition {
    pub fn new(from: SessionStatus, to: SessionStatus, operation: SessionOperation) -> Self {
        Self {
            from,
            to,
            operation,
            at: Utc::now(),
        }
    }
}

/// Receives state-transition events after the state write has committed.
pub trait SessionObserver: Send + Sync {
    fn on_transition(&self, transition: &SessionTransition);
}

/// Type alias for closure-backed transition hooks.
pub type TransitionHookFn = Box<dyn Fn(&SessionTransition) + Send + Sync>;

/// A default implementation that drops every event.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_transition(&self, _transition: &SessionTransition) {}
}

/// Emits each transition as a structured `tracing` event.
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_transition(&self, transition: &SessionTransition) {
        info!(
            from = %transition.from,
            to = %transition.to,
            operation = %transition.operation,
            "session transition"
        );
    }
}

/// Bridges a plain closure into the observer seam.
pub struct FnObserver {
    hook: TransitionHookFn,
}

impl FnObserver {
    pub fn new(hook: impl Fn(&SessionTransition) + Send + Sync + 'static) -> Self {
        Self {
            hook: Box::new(hook),
        }
    }
}

impl SessionObserver for FnObserver {
    fn on_transition(&self, transition: &SessionTransition) {
        (self.hook)(transition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_fn_observer_forwards_transitions() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer = FnObserver::new(move |transition: &SessionTransition| {
            sink.lock().unwrap().push((transition.from, transition.to));
        });

        observer.on_transition(&SessionTransition::new(
            SessionStatus::Unknown,
            SessionStatus::Checking,
            SessionOperation::Check,
        ));
        observer.on_transition(&SessionTransition::new(
            SessionStatus::Checking,
            SessionStatus::Unauthenticated,
            SessionOperation::Check,
        ));

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (SessionStatus::Unknown, SessionStatus::Checking),
                (SessionStatus::Checking, SessionStatus::Unauthenticated),
            ]
        );
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(SessionOperation::Check.to_string(), "check");
        assert_eq!(SessionOperation::Login.to_string(), "login");
        assert_eq!(SessionOperation::Logout.to_string(), "logout");
    }
}
