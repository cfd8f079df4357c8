use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

use super::{
    connections::{ConnectionError, ConnectionId, ServerConnections},
    PresenceState,
};

#[derive(Debug, Clone, Copy)]
struct Slot {
    committed: PresenceState,
    staged: Option<PresenceState>,
}

/// In-process connections used by the console host. Ids start at 1, the same way host
/// connection handlers are numbered.
pub struct LocalConnections {
    slots: Mutex<Vec<Slot>>,
}

impl LocalConnections {
    pub fn new(count: usize) -> Self {
        Self {
            slots: Mutex::new(vec![
                Slot {
                    committed: PresenceState::Active,
                    staged: None,
                };
                count
            ]),
        }
    }

    /// Committed status of every connection, ordered by id.
    pub fn statuses(&self) -> Vec<(ConnectionId, PresenceState)> {
        self.lock()
            .iter()
            .enumerate()
            .map(|(index, slot)| (index as ConnectionId + 1, slot.committed))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_slot<T>(
        &self,
        id: ConnectionId,
        f: impl FnOnce(&mut Slot) -> T,
    ) -> Result<T, ConnectionError> {
        let mut slots = self.lock();
        let index = usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .ok_or(ConnectionError::NotConnected(id))?;
        slots
            .get_mut(index)
            .map(f)
            .ok_or(ConnectionError::NotConnected(id))
    }
}

impl ServerConnections for LocalConnections {
    fn connections(&self) -> Vec<ConnectionId> {
        (1..=self.lock().len() as ConnectionId).collect()
    }

    fn away_status(&self, id: ConnectionId) -> Result<PresenceState, ConnectionError> {
        self.with_slot(id, |slot| slot.committed)
    }

    fn set_away_status(
        &self,
        id: ConnectionId,
        status: PresenceState,
    ) -> Result<(), ConnectionError> {
        self.with_slot(id, |slot| slot.staged = Some(status))
    }

    fn flush_updates(&self, id: ConnectionId) -> Result<(), ConnectionError> {
        self.with_slot(id, |slot| {
            if let Some(status) = slot.staged.take() {
                info!("Connection {id} is now {status}");
                slot.committed = status;
            }
        })
    }
}
