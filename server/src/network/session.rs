// zone_engine_core/server/src/network/session.rs
use crate::core::error::{ServerError, ServerResult};
use crate::core::types::{EntityId, EntityKind};
use crate::server::simulation::{Request, SimulationLoop};
use tracing::{debug, info};

/// Where a client connection is in the login sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Handshake,
    Version,
    Login,
    InWorld,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    HandshakeCompleted,
    VersionAccepted,
    LoggedIn { player_id: EntityId },
    LeftWorld,
}

impl ConnectionState {
    /// Next state for `event`. Anything out of order is rejected and leaves
    /// the caller's state untouched.
    pub fn advance(self, event: SessionEvent) -> ServerResult<ConnectionState> {
        use ConnectionState::*;
        match (self, event) {
            (Handshake, SessionEvent::HandshakeCompleted) => Ok(Version),
            (Version, SessionEvent::VersionAccepted) => Ok(Login),
            (Login, SessionEvent::LoggedIn { .. }) => Ok(InWorld),
            (InWorld, SessionEvent::LeftWorld) => Ok(Login),
            (state, event) => Err(ServerError::InvalidTransition(format!("{:?} in state {:?}", event, state))),
        }
    }

    pub fn can_submit(self) -> bool {
        self == ConnectionState::InWorld
    }
}

/// One client connection as seen by the world.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: u64,
    state: ConnectionState,
    player_id: Option<EntityId>,
}

impl Session {
    pub fn new(id: u64) -> Self {
        Session { id, state: ConnectionState::Handshake, player_id: None }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player_id
    }

    pub fn handle(&mut self, event: SessionEvent) -> ServerResult<ConnectionState> {
        let next = self.state.advance(event)?;
        match event {
            SessionEvent::LoggedIn { player_id } => {
                self.player_id = Some(player_id);
                info!("[Session {}] Player {} entered the world", self.id, player_id);
            }
            SessionEvent::LeftWorld => self.player_id = None,
            _ => debug!("[Session {}] {:?} -> {:?}", self.id, self.state, next),
        }
        self.state = next;
        Ok(next)
    }

    /// Forwards a request to the simulation. Only in-world sessions may
    /// submit, and only for their own player.
    pub fn submit(&self, simulation: &SimulationLoop, request: Request) -> ServerResult<()> {
        if !self.state.can_submit() {
            return Err(ServerError::InvalidTransition(format!(
                "session {} cannot submit in state {:?}",
                self.id, self.state
            )));
        }
        let target = match &request {
            Request::SpawnPlayer(player) => Some(player.id),
            Request::Despawn(handle) | Request::Move { handle, .. } if handle.kind == EntityKind::Player => {
                Some(handle.id)
            }
            _ => None,
        };
        match target {
            Some(id) if Some(id) == self.player_id => {
                simulation.submit(request);
                Ok(())
            }
            _ => Err(ServerError::InvalidTransition(format!(
                "session {} may only act on its own player",
                self.id
            ))),
        }
    }
}
