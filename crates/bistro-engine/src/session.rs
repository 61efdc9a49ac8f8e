//! # Session Signal
//!
//! Who the engine is acting for, and whether that session is still
//! authorized.
//!
//! ## Session States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Active ──(collaborator reports unauthorized)──► Invalidated{reason}  │
//! │     ▲                                                   │               │
//! │     └──────────────(re-authenticated: reactivate)───────┘               │
//! │                                                                         │
//! │   While Invalidated every operation fails fast with Authentication,    │
//! │   before touching any collaborator.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session root (terminal shell) subscribes to the watch channel and
//! sends the operator back to login when the status flips.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Identity of the terminal session the engine acts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub terminal_id: String,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, terminal_id: impl Into<String>) -> Self {
        SessionContext {
            session_id: session_id.into(),
            terminal_id: terminal_id.into(),
        }
    }

    /// Starts a fresh session on a terminal.
    pub fn generate(terminal_id: impl Into<String>) -> Self {
        SessionContext::new(Uuid::new_v4().to_string(), terminal_id)
    }
}

/// Authorization status of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Invalidated { reason: String },
}

impl SessionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Active)
    }
}

/// Publishes [`SessionStatus`] to every subscriber.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    status_tx: watch::Sender<SessionStatus>,
}

impl SessionGuard {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Active);
        SessionGuard { status_tx }
    }

    /// Returns a receiver that observes every status change.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.status_tx.borrow().clone()
    }

    /// Fails with `Authentication` once the session was invalidated.
    pub fn ensure_active(&self) -> EngineResult<()> {
        match &*self.status_tx.borrow() {
            SessionStatus::Active => Ok(()),
            SessionStatus::Invalidated { reason } => Err(EngineError::Authentication(reason.clone())),
        }
    }

    /// Flips the session to invalidated. Later calls keep the first reason.
    pub fn invalidate(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let changed = self.status_tx.send_if_modified(|status| {
            if status.is_active() {
                *status = SessionStatus::Invalidated {
                    reason: reason.clone(),
                };
                true
            } else {
                false
            }
        });
        if changed {
            warn!(reason = %reason, "Session invalidated");
        }
    }

    /// Marks the session active again after re-authentication.
    pub fn reactivate(&self) {
        let changed = self.status_tx.send_if_modified(|status| {
            if status.is_active() {
                false
            } else {
                *status = SessionStatus::Active;
                true
            }
        });
        if changed {
            info!("Session reactivated");
        }
    }
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new()
    }
}
