use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::mpsc;

use gomoku_core::ServerMessage;

/// Transport-level endpoint identifier. Ephemeral, 1:1 with one socket.
pub type ConnId = u64;

/// Inbound rate limit: messages per one-second window.
const RATE_LIMIT_PER_SEC: u32 = 20;

/// Handle to push messages to a connected WebSocket client. Messages queued
/// here are drained by the connection's socket task in submission order,
/// which is what gives room broadcasts their per-receiver ordering.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub id: ConnId,
    /// Display name supplied at upgrade time; anonymous connections have none.
    pub name: Option<String>,
    pub tx: mpsc::UnboundedSender<ServerMessage>,
    pub room_id: Option<String>,
    message_count: u32,
    rate_limit_window: Instant,
}

/// Connection book-keeping plus the two delivery primitives: unicast and
/// room multicast. Rooms reference connection ids; the hub owns the
/// connection lifecycle.
#[derive(Debug, Default)]
pub struct Hub {
    connections: DashMap<ConnId, ConnectionHandle>,
    next_id: AtomicU64,
}

impl Hub {
    pub fn new() -> Hub {
        Hub {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn register(
        &self,
        name: Option<String>,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> ConnId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.insert(
            id,
            ConnectionHandle {
                id,
                name,
                tx,
                room_id: None,
                message_count: 0,
                rate_limit_window: Instant::now(),
            },
        );
        id
    }

    pub fn unregister(&self, id: ConnId) {
        self.connections.remove(&id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn name_of(&self, id: ConnId) -> Option<String> {
        self.connections.get(&id).and_then(|c| c.name.clone())
    }

    pub fn room_of(&self, id: ConnId) -> Option<String> {
        self.connections.get(&id).and_then(|c| c.room_id.clone())
    }

    pub fn set_room(&self, id: ConnId, room_id: Option<String>) {
        if let Some(mut conn) = self.connections.get_mut(&id) {
            conn.room_id = room_id;
        }
    }

    /// Count an inbound message against the connection's current window.
    /// Returns false when the connection went over the limit.
    pub fn check_rate_limit(&self, id: ConnId) -> bool {
        let mut conn = match self.connections.get_mut(&id) {
            Some(c) => c,
            None => return false,
        };
        let now = Instant::now();
        if now.duration_since(conn.rate_limit_window) > Duration::from_secs(1) {
            conn.rate_limit_window = now;
            conn.message_count = 0;
        }
        conn.message_count += 1;
        conn.message_count <= RATE_LIMIT_PER_SEC
    }

    /// Send to one connection. Delivery failures mean the socket task is
    /// gone; the disconnect path cleans up.
    pub fn unicast(&self, id: ConnId, msg: ServerMessage) {
        if let Some(conn) = self.connections.get(&id) {
            let _ = conn.tx.send(msg);
        }
    }

    /// Send to every current member of a room. The caller passes the
    /// membership snapshot taken under the room lock, so a multicast issued
    /// after a membership change only reaches current members.
    pub fn multicast(&self, members: &[ConnId], msg: ServerMessage) {
        for &id in members {
            self.unicast(id, msg.clone());
        }
    }
}
