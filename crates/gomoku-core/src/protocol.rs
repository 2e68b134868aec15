use serde::{Deserialize, Serialize};

use crate::board::{Cell, Symbol};

/// Board as it travels on the wire: row-major, `null` for empty cells.
pub type WireBoard = Vec<Vec<Cell>>;

/// Outcome of a finished game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    X,
    O,
    #[serde(rename = "draw")]
    Draw,
}

impl From<Symbol> for GameResult {
    fn from(symbol: Symbol) -> GameResult {
        match symbol {
            Symbol::X => GameResult::X,
            Symbol::O => GameResult::O,
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    CreateRoom,
    JoinRoom {
        /// Omitted for quick matchmaking; the server picks or creates a room.
        #[serde(default)]
        room_id: Option<String>,
    },
    MakeMove {
        game_id: String,
        row: usize,
        col: usize,
    },
    Resign {
        game_id: String,
    },
    ProposeDraw {
        game_id: String,
    },
    AcceptTie {
        game_id: String,
    },
    DeclineTie {
        game_id: String,
    },
    RequestRematch {
        game_id: String,
    },
    AcceptRematch {
        game_id: String,
        starting_player: Symbol,
    },
    DeclineRematch {
        game_id: String,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    RoomCreated {
        room_id: String,
    },
    WaitingForPlayer {
        room_id: String,
    },
    /// Sent to the host when a second player takes the free seat.
    PlayerJoined {
        room_id: String,
    },
    AssignPlayer {
        symbol: Symbol,
    },
    GameState {
        board: WireBoard,
        current_player: Symbol,
        winner: Option<GameResult>,
    },
    PlayerSurrendered {
        winner: Symbol,
    },
    /// A player left the room. `winner` is set when the departure forfeits
    /// a game that was already underway.
    PlayerLeft {
        board: WireBoard,
        current_player: Symbol,
        winner: Option<Symbol>,
        message: Option<String>,
    },
    TieOffered,
    TieAccepted,
    TieDeclined,
    RematchRequested,
    RematchRequestSent,
    RematchAccepted {
        starting_player: Symbol,
    },
    RematchDeclined,
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_original_event_names() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"makeMove","gameId":"123456","row":7,"col":7}"#)
                .unwrap();
        match msg {
            ClientMessage::MakeMove { game_id, row, col } => {
                assert_eq!(game_id, "123456");
                assert_eq!((row, col), (7, 7));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn join_room_id_is_optional() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"joinRoom"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::JoinRoom { room_id: None }));
    }

    #[test]
    fn game_state_serializes_winner_as_null_while_running() {
        let msg = ServerMessage::GameState {
            board: vec![vec![None, Some(Symbol::X)]],
            current_player: Symbol::O,
            winner: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "gameState");
        assert_eq!(json["currentPlayer"], "O");
        assert!(json["winner"].is_null());
        assert_eq!(json["board"][0][1], "X");
    }

    #[test]
    fn draw_result_serializes_lowercase() {
        let json = serde_json::to_value(GameResult::Draw).unwrap();
        assert_eq!(json, "draw");
        assert_eq!(serde_json::to_value(GameResult::X).unwrap(), "X");
    }
}
