//! Presence is the remote-facing half of the plugin. The monitor only talks to
//! [PresenceGateway]; [connections::ConnectionGateway] maps that onto the host's
//! list of live server connections.

pub mod connections;
pub mod local;

use std::{fmt::Display, ops::Not, sync::Arc};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceState {
    Active,
    Away,
}

impl Not for PresenceState {
    type Output = PresenceState;

    fn not(self) -> Self::Output {
        match self {
            PresenceState::Active => PresenceState::Away,
            PresenceState::Away => PresenceState::Active,
        }
    }
}

impl Display for PresenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresenceState::Active => write!(f, "active"),
            PresenceState::Away => write!(f, "away"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Some connections accepted the status, the rest did not. Successes are kept.
    #[error("status applied to {} of {attempted} connections", .attempted - .failed)]
    Partial { failed: usize, attempted: usize },
    #[error("status could not be applied to any of {attempted} connections")]
    AllFailed { attempted: usize },
}

impl GatewayError {
    /// Whether at least one connection ended up with the requested status.
    pub fn is_partial(&self) -> bool {
        matches!(self, GatewayError::Partial { .. })
    }
}

/// Aggregate view over the connections whose presence the plugin manages.
#[cfg_attr(test, mockall::automock)]
pub trait PresenceGateway {
    /// [PresenceState::Active] if any connection is active, [PresenceState::Away] only when
    /// every connection is away.
    fn get_status(&self) -> PresenceState;

    /// Applies the status to every connection, continuing past failures.
    fn set_status(&self, status: PresenceState) -> Result<(), GatewayError>;
}

pub type SharedGateway = Arc<dyn PresenceGateway + Send + Sync>;
