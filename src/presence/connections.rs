use std::ops::Deref;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{GatewayError, PresenceGateway, PresenceState};

pub type ConnectionId = u64;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("connection {0} is not connected")]
    NotConnected(ConnectionId),
}

/// Host side of the presence seam. The host owns the connections, the plugin only issues
/// per-connection requests through this trait.
pub trait ServerConnections: Send + Sync {
    /// Handles of every currently live connection.
    fn connections(&self) -> Vec<ConnectionId>;

    fn away_status(&self, id: ConnectionId) -> Result<PresenceState, ConnectionError>;

    /// Stages a new away status. Takes effect after [ServerConnections::flush_updates].
    fn set_away_status(&self, id: ConnectionId, status: PresenceState)
        -> Result<(), ConnectionError>;

    fn flush_updates(&self, id: ConnectionId) -> Result<(), ConnectionError>;
}

impl<T> ServerConnections for T
where
    T: Deref + Send + Sync,
    T::Target: ServerConnections,
{
    fn connections(&self) -> Vec<ConnectionId> {
        self.deref().connections()
    }

    fn away_status(&self, id: ConnectionId) -> Result<PresenceState, ConnectionError> {
        self.deref().away_status(id)
    }

    fn set_away_status(
        &self,
        id: ConnectionId,
        status: PresenceState,
    ) -> Result<(), ConnectionError> {
        self.deref().set_away_status(id, status)
    }

    fn flush_updates(&self, id: ConnectionId) -> Result<(), ConnectionError> {
        self.deref().flush_updates(id)
    }
}

/// [PresenceGateway] over every connection the host reports.
pub struct ConnectionGateway<C: ServerConnections> {
    connections: C,
}

impl<C: ServerConnections> ConnectionGateway<C> {
    pub fn new(connections: C) -> Self {
        Self { connections }
    }

    fn apply(&self, id: ConnectionId, status: PresenceState) -> Result<(), ConnectionError> {
        self.connections.set_away_status(id, status)?;
        self.connections.flush_updates(id)
    }
}

impl<C: ServerConnections> PresenceGateway for ConnectionGateway<C> {
    #[instrument(skip(self))]
    fn get_status(&self) -> PresenceState {
        for id in self.connections.connections() {
            match self.connections.away_status(id) {
                Ok(PresenceState::Active) => return PresenceState::Active,
                Ok(PresenceState::Away) => (),
                Err(e) => warn!("Skipping connection {id} while reading status: {e}"),
            }
        }
        PresenceState::Away
    }

    #[instrument(skip(self))]
    fn set_status(&self, status: PresenceState) -> Result<(), GatewayError> {
        let ids = self.connections.connections();
        let attempted = ids.len();
        let mut failed = 0;
        for id in ids {
            match self.apply(id, status) {
                Ok(()) => debug!("Connection {id} is now {status}"),
                Err(e) => {
                    warn!("Failed to set connection {id} {status}: {e}");
                    failed += 1;
                }
            }
        }

        match failed {
            0 => Ok(()),
            f if f == attempted => Err(GatewayError::AllFailed { attempted }),
            failed => Err(GatewayError::Partial { failed, attempted }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Mutex};

    use super::*;

    /// Connections with fixed statuses. Ids listed in `broken` fail on every write.
    struct FakeConnections {
        statuses: Mutex<Vec<Result<PresenceState, ConnectionError>>>,
        broken: HashSet<ConnectionId>,
        flushed: Mutex<Vec<ConnectionId>>,
    }

    impl FakeConnections {
        fn new(statuses: Vec<PresenceState>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into_iter().map(Ok).collect()),
                broken: HashSet::new(),
                flushed: Mutex::new(vec![]),
            }
        }

        fn with_broken(mut self, ids: &[ConnectionId]) -> Self {
            self.broken = ids.iter().copied().collect();
            self
        }
    }

    impl ServerConnections for FakeConnections {
        fn connections(&self) -> Vec<ConnectionId> {
            (0..self.statuses.lock().unwrap().len() as ConnectionId).collect()
        }

        fn away_status(&self, id: ConnectionId) -> Result<PresenceState, ConnectionError> {
            self.statuses.lock().unwrap()[id as usize].clone()
        }

        fn set_away_status(
            &self,
            id: ConnectionId,
            status: PresenceState,
        ) -> Result<(), ConnectionError> {
            if self.broken.contains(&id) {
                return Err(ConnectionError::NotConnected(id));
            }
            self.statuses.lock().unwrap()[id as usize] = Ok(status);
            Ok(())
        }

        fn flush_updates(&self, id: ConnectionId) -> Result<(), ConnectionError> {
            self.flushed.lock().unwrap().push(id);
            Ok(())
        }
    }

    use PresenceState::{Active, Away};

    #[test]
    fn any_active_connection_keeps_presence_active() {
        let gateway = ConnectionGateway::new(FakeConnections::new(vec![Away, Active, Away]));
        assert_eq!(gateway.get_status(), Active);
    }

    #[test]
    fn all_away_connections_report_away() {
        let gateway = ConnectionGateway::new(FakeConnections::new(vec![Away, Away]));
        assert_eq!(gateway.get_status(), Away);
    }

    #[test]
    fn no_connections_report_away() {
        let gateway = ConnectionGateway::new(FakeConnections::new(vec![]));
        assert_eq!(gateway.get_status(), Away);
    }

    #[test]
    fn unreadable_connections_are_skipped() {
        let connections = FakeConnections::new(vec![Away, Away]);
        connections.statuses.lock().unwrap()[0] = Err(ConnectionError::NotConnected(0));
        let gateway = ConnectionGateway::new(connections);
        assert_eq!(gateway.get_status(), Away);

        gateway.connections.statuses.lock().unwrap()[1] = Ok(Active);
        assert_eq!(gateway.get_status(), Active);
    }

    #[test]
    fn set_status_applies_and_flushes_every_connection() {
        let gateway = ConnectionGateway::new(FakeConnections::new(vec![Active, Active, Active]));
        assert_eq!(gateway.set_status(Away), Ok(()));
        assert_eq!(gateway.get_status(), Away);
        assert_eq!(*gateway.connections.flushed.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn set_status_continues_past_failures() {
        let gateway = ConnectionGateway::new(
            FakeConnections::new(vec![Active, Active, Active]).with_broken(&[1]),
        );
        assert_eq!(
            gateway.set_status(Away),
            Err(GatewayError::Partial {
                failed: 1,
                attempted: 3
            })
        );
        let statuses = gateway.connections.statuses.lock().unwrap();
        assert_eq!(statuses[0], Ok(Away));
        assert_eq!(statuses[1], Ok(Active));
        assert_eq!(statuses[2], Ok(Away));
    }

    #[test]
    fn set_status_reports_total_failure() {
        let gateway =
            ConnectionGateway::new(FakeConnections::new(vec![Active, Active]).with_broken(&[0, 1]));
        assert_eq!(
            gateway.set_status(Away),
            Err(GatewayError::AllFailed { attempted: 2 })
        );
    }

    #[test]
    fn set_status_without_connections_succeeds() {
        let gateway = ConnectionGateway::new(FakeConnections::new(vec![]));
        assert_eq!(gateway.set_status(Active), Ok(()));
    }
}
