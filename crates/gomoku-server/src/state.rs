use std::time::Instant;

use dashmap::mapref::one::{Ref, RefMut};
use dashmap::DashMap;

use gomoku_core::{Board, Symbol, BOARD_SIZE};

use crate::broadcast::{ConnId, Hub};
use crate::config::ServerConfig;

/// Room state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Waiting,
    Active,
    Finished,
}

/// A pending draw offer or rematch request. The timestamp lets the cleanup
/// task expire offers that were never answered.
#[derive(Debug, Clone, Copy)]
pub struct PendingOffer {
    pub by: ConnId,
    pub at: Instant,
}

impl PendingOffer {
    pub fn new(by: ConnId) -> PendingOffer {
        PendingOffer {
            by,
            at: Instant::now(),
        }
    }
}

/// One paired (or pairing) match.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    /// Seat order: at most two connection ids. Seat index + `x_player_index`
    /// determine symbol ownership.
    pub players: Vec<ConnId>,
    pub board: Board,
    pub current_player: Symbol,
    /// The connection that created the room; notified when a peer joins.
    pub host: ConnId,
    /// Which seat holds X. Reassigned every time the room fills.
    pub x_player_index: usize,
    pub phase: RoomPhase,
    pub pending_draw: Option<PendingOffer>,
    pub pending_rematch: Option<PendingOffer>,
    pub created_at: Instant,
    pub last_activity: Instant,
}

impl Room {
    fn new(id: String, host: ConnId) -> Room {
        Room {
            id,
            players: vec![host],
            board: Board::new(BOARD_SIZE),
            current_player: Symbol::X,
            host,
            x_player_index: 0,
            phase: RoomPhase::Waiting,
            pending_draw: None,
            pending_rematch: None,
            created_at: Instant::now(),
            last_activity: Instant::now(),
        }
    }

    pub fn seat_of(&self, conn: ConnId) -> Option<usize> {
        self.players.iter().position(|&p| p == conn)
    }

    /// Symbol owned by `conn`, derived through `x_player_index` so it stays
    /// correct under randomized assignment.
    pub fn symbol_of(&self, conn: ConnId) -> Option<Symbol> {
        let seat = self.seat_of(conn)?;
        if seat == self.x_player_index {
            Some(Symbol::X)
        } else {
            Some(Symbol::O)
        }
    }

    pub fn opponent_of(&self, conn: ConnId) -> Option<ConnId> {
        self.players.iter().copied().find(|&p| p != conn)
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Clear the board and negotiation flags for an accepted rematch.
    pub fn reset_for_rematch(&mut self, starting_player: Symbol) {
        self.board = Board::new(BOARD_SIZE);
        self.current_player = starting_player;
        self.phase = RoomPhase::Active;
        self.pending_draw = None;
        self.pending_rematch = None;
        self.touch();
    }
}

/// Owns all rooms. Constructor-injected via `AppState`; no module globals.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, Room>,
}

impl RoomRegistry {
    pub fn new() -> RoomRegistry {
        RoomRegistry {
            rooms: DashMap::new(),
        }
    }

    /// Allocate a room with the creator already seated. Returns the room id.
    pub fn create_room(&self, creator: ConnId) -> String {
        let id = self.generate_room_id();
        self.rooms.insert(id.clone(), Room::new(id.clone(), creator));
        id
    }

    /// 6-digit numeric id, regenerated until it misses every live room.
    /// Isolated here so the scheme can be swapped without touching the
    /// coordinator.
    fn generate_room_id(&self) -> String {
        use rand::RngExt;
        let mut rng = rand::rng();
        loop {
            let id = format!("{}", rng.random_range(100_000..1_000_000));
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }

    /// Any room with a free seat, in arbitrary map-iteration order. Not a
    /// skill-based pairing.
    pub fn find_joinable(&self) -> Option<String> {
        self.rooms
            .iter()
            .find(|entry| entry.value().players.len() < 2 && entry.value().phase == RoomPhase::Waiting)
            .map(|entry| entry.key().clone())
    }

    pub fn get(&self, id: &str) -> Option<Ref<'_, String, Room>> {
        self.rooms.get(id)
    }

    pub fn get_mut(&self, id: &str) -> Option<RefMut<'_, String, Room>> {
        self.rooms.get_mut(id)
    }

    pub fn delete(&self, id: &str) {
        self.rooms.remove(id);
    }

    /// Mutable walk over every room, used by the periodic cleanup pass.
    pub fn iter_mut(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMutMulti<'_, String, Room>> {
        self.rooms.iter_mut()
    }
}

/// Shared application state.
pub struct AppState {
    pub registry: RoomRegistry,
    pub hub: Hub,
    pub config: ServerConfig,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: ServerConfig) -> AppState {
        AppState {
            registry: RoomRegistry::new(),
            hub: Hub::new(),
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_room_seats_creator_and_yields_six_digit_id() {
        let registry = RoomRegistry::new();
        let id = registry.create_room(1);
        assert_eq!(id.len(), 6);
        assert!(id.chars().all(|c| c.is_ascii_digit()));

        let room = registry.get(&id).unwrap();
        assert_eq!(room.players, vec![1]);
        assert_eq!(room.phase, RoomPhase::Waiting);
        assert_eq!(room.current_player, Symbol::X);
        assert_eq!(room.host, 1);
    }

    #[test]
    fn find_joinable_skips_full_rooms() {
        let registry = RoomRegistry::new();
        let full = registry.create_room(1);
        {
            let mut room = registry.get_mut(&full).unwrap();
            room.players.push(2);
            room.phase = RoomPhase::Active;
        }
        assert_eq!(registry.find_joinable(), None);

        let open = registry.create_room(3);
        assert_eq!(registry.find_joinable(), Some(open));
    }

    #[test]
    fn symbol_assignment_follows_x_player_index() {
        let registry = RoomRegistry::new();
        let id = registry.create_room(1);
        let mut room = registry.get_mut(&id).unwrap();
        room.players.push(2);

        room.x_player_index = 0;
        assert_eq!(room.symbol_of(1), Some(Symbol::X));
        assert_eq!(room.symbol_of(2), Some(Symbol::O));

        room.x_player_index = 1;
        assert_eq!(room.symbol_of(1), Some(Symbol::O));
        assert_eq!(room.symbol_of(2), Some(Symbol::X));

        assert_eq!(room.symbol_of(99), None);
        assert_eq!(room.opponent_of(1), Some(2));
    }

    #[test]
    fn rematch_reset_clears_board_and_flags() {
        let registry = RoomRegistry::new();
        let id = registry.create_room(1);
        let mut room = registry.get_mut(&id).unwrap();
        room.players.push(2);
        room.phase = RoomPhase::Finished;
        room.board.apply_move(7, 7, Symbol::X).unwrap();
        room.pending_rematch = Some(PendingOffer::new(1));

        room.reset_for_rematch(Symbol::O);
        assert_eq!(room.board.move_count(), 0);
        assert_eq!(room.current_player, Symbol::O);
        assert_eq!(room.phase, RoomPhase::Active);
        assert!(room.pending_rematch.is_none());
    }

    #[test]
    fn room_ids_do_not_collide_with_live_rooms() {
        let registry = RoomRegistry::new();
        let mut ids = std::collections::HashSet::new();
        for conn in 0..50 {
            assert!(ids.insert(registry.create_room(conn)));
        }
        for id in &ids {
            assert!(registry.get(id).is_some());
        }
    }
}
