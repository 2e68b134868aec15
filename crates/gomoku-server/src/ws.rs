use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use tokio::sync::mpsc;
use tracing::{debug, info};

use gomoku_core::protocol::{ClientMessage, GameResult, ServerMessage, WireBoard};
use gomoku_core::{check_winner, Symbol};

use crate::broadcast::ConnId;
use crate::report::{self, MatchReport};
use crate::state::{AppState, PendingOffer, RoomPhase};

/// Top-level WebSocket handler -- spawned per connection.
pub async fn handle_socket(state: Arc<AppState>, mut socket: WebSocket, name: Option<String>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let conn_id = state.hub.register(name, tx.clone());
    info!(conn_id, "connection open");

    loop {
        tokio::select! {
            // Outbound: drain the connection's outbox in submission order.
            Some(msg) = rx.recv() => {
                if let Ok(json) = serde_json::to_string(&msg) {
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }
            // Inbound: read from the WebSocket.
            maybe_msg = socket.recv() => {
                match maybe_msg {
                    Some(Ok(Message::Text(text))) => {
                        if !state.hub.check_rate_limit(conn_id) {
                            let _ = tx.send(ServerMessage::Error {
                                message: "Rate limited".into(),
                            });
                            continue;
                        }

                        let client_msg: ClientMessage = match serde_json::from_str(&text) {
                            Ok(m) => m,
                            Err(e) => {
                                let _ = tx.send(ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                });
                                continue;
                            }
                        };

                        handle_message(&state, conn_id, client_msg);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    _ => continue,
                }
            }
        }
    }

    leave_room(&state, conn_id);
    state.hub.unregister(conn_id);
    info!(conn_id, "connection closed");
}

/// Dispatch a single client command.
fn handle_message(state: &Arc<AppState>, conn: ConnId, msg: ClientMessage) {
    match msg {
        ClientMessage::CreateRoom => create_room(state, conn),
        ClientMessage::JoinRoom { room_id } => join_room(state, conn, room_id),
        ClientMessage::MakeMove { game_id, row, col } => make_move(state, conn, &game_id, row, col),
        ClientMessage::Resign { game_id } => resign(state, conn, &game_id),
        ClientMessage::ProposeDraw { game_id } => propose_draw(state, conn, &game_id),
        ClientMessage::AcceptTie { game_id } => accept_tie(state, conn, &game_id),
        ClientMessage::DeclineTie { game_id } => decline_tie(state, conn, &game_id),
        ClientMessage::RequestRematch { game_id } => request_rematch(state, conn, &game_id),
        ClientMessage::AcceptRematch {
            game_id,
            starting_player,
        } => accept_rematch(state, conn, &game_id, starting_player),
        ClientMessage::DeclineRematch { game_id } => decline_rematch(state, conn, &game_id),
    }
}

fn send_error(state: &AppState, conn: ConnId, message: impl Into<String>) {
    state.hub.unicast(
        conn,
        ServerMessage::Error {
            message: message.into(),
        },
    );
}

// -- Room lifecycle -----------------------------------------------------------

fn create_room(state: &Arc<AppState>, conn: ConnId) {
    // Creating a fresh room abandons any room the connection still sits in.
    if state.hub.room_of(conn).is_some() {
        leave_room(state, conn);
    }

    let room_id = state.registry.create_room(conn);
    state.hub.set_room(conn, Some(room_id.clone()));
    info!(conn, %room_id, "room created");

    state.hub.unicast(
        conn,
        ServerMessage::RoomCreated {
            room_id: room_id.clone(),
        },
    );
    state
        .hub
        .unicast(conn, ServerMessage::WaitingForPlayer { room_id });
}

enum JoinOutcome {
    Waiting,
    Started {
        host: ConnId,
        seats: Vec<(ConnId, Symbol)>,
        board: WireBoard,
        current_player: Symbol,
    },
}

fn join_room(state: &Arc<AppState>, conn: ConnId, room_id: Option<String>) {
    let room_id = match room_id.or_else(|| state.registry.find_joinable()) {
        Some(id) => id,
        None => {
            // Quick-match with no open room: create one implicitly.
            if state.hub.room_of(conn).is_some() {
                leave_room(state, conn);
            }
            let id = state.registry.create_room(conn);
            state.hub.set_room(conn, Some(id.clone()));
            info!(conn, room_id = %id, "room created implicitly");
            state
                .hub
                .unicast(conn, ServerMessage::WaitingForPlayer { room_id: id });
            return;
        }
    };

    // Switching rooms abandons the old one first; re-joining the same room
    // falls through to the idempotent path below.
    if let Some(current) = state.hub.room_of(conn) {
        if current != room_id {
            leave_room(state, conn);
        }
    }

    let outcome = {
        let mut room = match state.registry.get_mut(&room_id) {
            Some(r) => r,
            None => {
                send_error(state, conn, "Room not found");
                return;
            }
        };

        if room.seat_of(conn).is_some() {
            // Idempotent: the creator's client re-sends joinRoom after
            // roomCreated. Never double-seat.
            if room.players.len() < 2 {
                JoinOutcome::Waiting
            } else {
                return;
            }
        } else if room.players.len() >= 2 {
            send_error(state, conn, "Room is full");
            return;
        } else if room.phase != RoomPhase::Waiting {
            // A finished room with a free seat keeps its terminal board until
            // the seated player rematches or the cleanup task reaps it.
            send_error(state, conn, "Room is not accepting players");
            return;
        } else {
            room.players.push(conn);
            room.touch();
            state.hub.set_room(conn, Some(room_id.clone()));

            if room.players.len() < 2 {
                JoinOutcome::Waiting
            } else {
                // Second seat taken: fix symbol ownership and start.
                room.x_player_index = if state.config.randomize_symbols {
                    use rand::RngExt;
                    rand::rng().random_range(0..2)
                } else {
                    0
                };
                room.phase = RoomPhase::Active;

                let seats = room
                    .players
                    .iter()
                    .enumerate()
                    .map(|(seat, &p)| {
                        let symbol = if seat == room.x_player_index {
                            Symbol::X
                        } else {
                            Symbol::O
                        };
                        (p, symbol)
                    })
                    .collect();

                JoinOutcome::Started {
                    host: room.host,
                    seats,
                    board: room.board.to_rows(),
                    current_player: room.current_player,
                }
            }
        }
    };

    match outcome {
        JoinOutcome::Waiting => {
            state
                .hub
                .unicast(conn, ServerMessage::WaitingForPlayer { room_id });
        }
        JoinOutcome::Started {
            host,
            seats,
            board,
            current_player,
        } => {
            info!(%room_id, "game started");

            // Each connection's outbox is FIFO, so the host sees playerJoined
            // before its symbol assignment and the initial game state.
            state.hub.unicast(
                host,
                ServerMessage::PlayerJoined {
                    room_id: room_id.clone(),
                },
            );
            for &(player, symbol) in &seats {
                state
                    .hub
                    .unicast(player, ServerMessage::AssignPlayer { symbol });
            }

            let members: Vec<ConnId> = seats.iter().map(|&(p, _)| p).collect();
            state.hub.multicast(
                &members,
                ServerMessage::GameState {
                    board,
                    current_player,
                    winner: None,
                },
            );
        }
    }
}

// -- Moves --------------------------------------------------------------------

fn make_move(state: &Arc<AppState>, conn: ConnId, game_id: &str, row: usize, col: usize) {
    let update = {
        let mut room = match state.registry.get_mut(game_id) {
            Some(r) => r,
            None => {
                send_error(state, conn, "Room not found");
                return;
            }
        };

        if room.phase != RoomPhase::Active {
            send_error(state, conn, "Game is not in progress");
            return;
        }

        let symbol = match room.symbol_of(conn) {
            Some(s) => s,
            None => {
                send_error(state, conn, "You are not in this room");
                return;
            }
        };

        if symbol != room.current_player {
            send_error(state, conn, "Not your turn");
            return;
        }

        if let Err(err) = room.board.apply_move(row, col, symbol) {
            debug!(conn, %room.id, %err, "move rejected");
            send_error(state, conn, err.to_string());
            return;
        }

        room.current_player = symbol.other();
        room.touch();

        // Server-authoritative outcome so clients never have to agree on it.
        let winner = if check_winner(&room.board, symbol) {
            Some(GameResult::from(symbol))
        } else if room.board.is_full() {
            Some(GameResult::Draw)
        } else {
            None
        };
        if winner.is_some() {
            room.phase = RoomPhase::Finished;
        }

        (
            room.players.clone(),
            room.board.to_rows(),
            room.current_player,
            winner,
            room.board.move_count(),
        )
    };

    let (members, board, current_player, winner, move_count) = update;
    state.hub.multicast(
        &members,
        ServerMessage::GameState {
            board,
            current_player,
            winner,
        },
    );

    if let Some(result) = winner {
        info!(room_id = game_id, ?result, "game finished");
        let ended_by = if result == GameResult::Draw {
            "board_full"
        } else {
            "win"
        };
        report::spawn_report(
            state,
            MatchReport::new(state, game_id, &members, result, ended_by, move_count),
        );
    }
}

fn resign(state: &Arc<AppState>, conn: ConnId, game_id: &str) {
    let ended = {
        let mut room = match state.registry.get_mut(game_id) {
            Some(r) => r,
            None => {
                send_error(state, conn, "Room not found");
                return;
            }
        };

        if room.phase != RoomPhase::Active {
            send_error(state, conn, "Game is not in progress");
            return;
        }

        let symbol = match room.symbol_of(conn) {
            Some(s) => s,
            None => {
                send_error(state, conn, "You are not in this room");
                return;
            }
        };

        room.phase = RoomPhase::Finished;
        room.touch();
        (
            room.players.clone(),
            symbol.other(),
            room.board.move_count(),
        )
    };

    let (members, winner, move_count) = ended;
    info!(room_id = game_id, %winner, "player resigned");
    state
        .hub
        .multicast(&members, ServerMessage::PlayerSurrendered { winner });

    report::spawn_report(
        state,
        MatchReport::new(
            state,
            game_id,
            &members,
            GameResult::from(winner),
            "resignation",
            move_count,
        ),
    );
}

// -- Draw negotiation ---------------------------------------------------------

enum DrawAction {
    Offered(Option<ConnId>),
    Accepted {
        members: Vec<ConnId>,
        move_count: usize,
    },
}

fn propose_draw(state: &Arc<AppState>, conn: ConnId, game_id: &str) {
    let action = {
        let mut room = match state.registry.get_mut(game_id) {
            Some(r) => r,
            None => {
                send_error(state, conn, "Room not found");
                return;
            }
        };

        if room.phase != RoomPhase::Active {
            send_error(state, conn, "Game is not in progress");
            return;
        }
        if room.seat_of(conn).is_none() {
            send_error(state, conn, "You are not in this room");
            return;
        }

        match room.pending_draw {
            // Re-proposing while your own offer is pending does nothing.
            Some(offer) if offer.by == conn => return,
            // A counter-proposal from the other player is an acceptance.
            Some(_) => {
                room.pending_draw = None;
                room.phase = RoomPhase::Finished;
                room.touch();
                DrawAction::Accepted {
                    members: room.players.clone(),
                    move_count: room.board.move_count(),
                }
            }
            None => {
                room.pending_draw = Some(PendingOffer::new(conn));
                room.touch();
                DrawAction::Offered(room.opponent_of(conn))
            }
        }
    };

    match action {
        DrawAction::Offered(opponent) => {
            if let Some(opp) = opponent {
                state.hub.unicast(opp, ServerMessage::TieOffered);
            }
        }
        DrawAction::Accepted {
            members,
            move_count,
        } => finish_draw(state, game_id, &members, move_count),
    }
}

fn accept_tie(state: &Arc<AppState>, conn: ConnId, game_id: &str) {
    let accepted = {
        let mut room = match state.registry.get_mut(game_id) {
            Some(r) => r,
            None => {
                send_error(state, conn, "Room not found");
                return;
            }
        };

        if room.phase != RoomPhase::Active {
            send_error(state, conn, "Game is not in progress");
            return;
        }
        if room.seat_of(conn).is_none() {
            send_error(state, conn, "You are not in this room");
            return;
        }

        match room.pending_draw {
            Some(offer) if offer.by != conn => {
                room.pending_draw = None;
                room.phase = RoomPhase::Finished;
                room.touch();
                (room.players.clone(), room.board.move_count())
            }
            _ => {
                send_error(state, conn, "No draw offer to accept");
                return;
            }
        }
    };

    let (members, move_count) = accepted;
    finish_draw(state, game_id, &members, move_count);
}

fn finish_draw(state: &Arc<AppState>, game_id: &str, members: &[ConnId], move_count: usize) {
    info!(room_id = game_id, "draw agreed");
    state.hub.multicast(members, ServerMessage::TieAccepted);
    report::spawn_report(
        state,
        MatchReport::new(
            state,
            game_id,
            members,
            GameResult::Draw,
            "draw_agreed",
            move_count,
        ),
    );
}

fn decline_tie(state: &Arc<AppState>, conn: ConnId, game_id: &str) {
    let proposer = {
        let mut room = match state.registry.get_mut(game_id) {
            Some(r) => r,
            None => {
                send_error(state, conn, "Room not found");
                return;
            }
        };
        if room.seat_of(conn).is_none() {
            send_error(state, conn, "You are not in this room");
            return;
        }
        room.pending_draw.take().map(|offer| offer.by)
    };

    // Declining clears the flag; the game continues. The proposer hears
    // about it unless they withdrew their own offer.
    if let Some(by) = proposer {
        if by != conn {
            state.hub.unicast(by, ServerMessage::TieDeclined);
        }
    }
}

// -- Rematch ------------------------------------------------------------------

enum RematchAction {
    Requested(ConnId),
    Accepted {
        members: Vec<ConnId>,
        board: WireBoard,
    },
}

fn request_rematch(state: &Arc<AppState>, conn: ConnId, game_id: &str) {
    let action = {
        let mut room = match state.registry.get_mut(game_id) {
            Some(r) => r,
            None => {
                send_error(state, conn, "Room not found");
                return;
            }
        };

        if room.phase != RoomPhase::Finished {
            send_error(state, conn, "Game is not over yet");
            return;
        }
        if room.seat_of(conn).is_none() {
            send_error(state, conn, "You are not in this room");
            return;
        }
        let opponent = match room.opponent_of(conn) {
            Some(o) => o,
            None => {
                send_error(state, conn, "No opponent to rematch");
                return;
            }
        };

        match room.pending_rematch {
            // Repeat requests by the same player are no-ops.
            Some(pending) if pending.by == conn => return,
            // Crossing requests agree: both players asked, so start over.
            // X leads the fresh game, same as a brand-new pairing.
            Some(_) => {
                room.reset_for_rematch(Symbol::X);
                RematchAction::Accepted {
                    members: room.players.clone(),
                    board: room.board.to_rows(),
                }
            }
            None => {
                room.pending_rematch = Some(PendingOffer::new(conn));
                room.touch();
                RematchAction::Requested(opponent)
            }
        }
    };

    match action {
        RematchAction::Requested(opponent) => {
            state.hub.unicast(opponent, ServerMessage::RematchRequested);
            state.hub.unicast(conn, ServerMessage::RematchRequestSent);
        }
        RematchAction::Accepted { members, board } => {
            info!(room_id = game_id, "rematch agreed by crossing requests");
            state.hub.multicast(
                &members,
                ServerMessage::RematchAccepted {
                    starting_player: Symbol::X,
                },
            );
            state.hub.multicast(
                &members,
                ServerMessage::GameState {
                    board,
                    current_player: Symbol::X,
                    winner: None,
                },
            );
        }
    }
}

fn accept_rematch(state: &Arc<AppState>, conn: ConnId, game_id: &str, starting_player: Symbol) {
    let restarted = {
        let mut room = match state.registry.get_mut(game_id) {
            Some(r) => r,
            None => {
                send_error(state, conn, "Room not found");
                return;
            }
        };

        if room.seat_of(conn).is_none() {
            send_error(state, conn, "You are not in this room");
            return;
        }
        match room.pending_rematch {
            Some(pending) if pending.by != conn => {}
            _ => {
                send_error(state, conn, "No rematch request to accept");
                return;
            }
        }

        room.reset_for_rematch(starting_player);
        (room.players.clone(), room.board.to_rows())
    };

    let (members, board) = restarted;
    info!(room_id = game_id, %starting_player, "rematch accepted");
    state
        .hub
        .multicast(&members, ServerMessage::RematchAccepted { starting_player });
    state.hub.multicast(
        &members,
        ServerMessage::GameState {
            board,
            current_player: starting_player,
            winner: None,
        },
    );
}

fn decline_rematch(state: &Arc<AppState>, conn: ConnId, game_id: &str) {
    let requester = {
        let mut room = match state.registry.get_mut(game_id) {
            Some(r) => r,
            None => {
                send_error(state, conn, "Room not found");
                return;
            }
        };
        if room.seat_of(conn).is_none() {
            send_error(state, conn, "You are not in this room");
            return;
        }
        room.pending_rematch.take().map(|pending| pending.by)
    };

    if let Some(by) = requester {
        if by != conn {
            state.hub.unicast(by, ServerMessage::RematchDeclined);
        }
    }
}

// -- Disconnect ---------------------------------------------------------------

enum Departure {
    Deleted,
    Left {
        members: Vec<ConnId>,
        board: WireBoard,
        current_player: Symbol,
        winner: Option<Symbol>,
        move_count: usize,
    },
}

/// Unseat the connection from its current room. Invoked by the transport on
/// socket close and by the coordinator when a client hops rooms; mid-game
/// departure is an automatic forfeit either way.
fn leave_room(state: &Arc<AppState>, conn: ConnId) {
    let room_id = match state.hub.room_of(conn) {
        Some(id) => id,
        None => return,
    };
    state.hub.set_room(conn, None);

    let departure = {
        let mut room = match state.registry.get_mut(&room_id) {
            Some(r) => r,
            None => return,
        };
        let seat = match room.seat_of(conn) {
            Some(s) => s,
            None => return,
        };

        // The remaining player's symbol has to be derived before seats shift.
        let remaining = room.opponent_of(conn);
        let forfeit = room.phase == RoomPhase::Active && room.board.move_count() > 0;
        let winner = match (remaining, forfeit) {
            (Some(peer), true) => room.symbol_of(peer),
            _ => None,
        };

        room.players.remove(seat);
        // Offers made by the leaver cannot be answered anymore.
        if room.pending_draw.map(|o| o.by == conn).unwrap_or(false) {
            room.pending_draw = None;
        }
        if room.pending_rematch.map(|o| o.by == conn).unwrap_or(false) {
            room.pending_rematch = None;
        }

        if room.players.is_empty() {
            Departure::Deleted
        } else {
            if winner.is_some() {
                room.phase = RoomPhase::Finished;
            } else if room.phase == RoomPhase::Active {
                // Game never started: the room goes back to pairing.
                room.phase = RoomPhase::Waiting;
                room.x_player_index = 0;
            }
            room.touch();
            Departure::Left {
                members: room.players.clone(),
                board: room.board.to_rows(),
                current_player: room.current_player,
                winner,
                move_count: room.board.move_count(),
            }
        }
    };

    match departure {
        Departure::Deleted => {
            state.registry.delete(&room_id);
            info!(conn, %room_id, "room deleted after last player left");
        }
        Departure::Left {
            members,
            board,
            current_player,
            winner,
            move_count,
        } => {
            info!(conn, %room_id, forfeit = winner.is_some(), "player left room");
            let message = match winner {
                Some(w) => format!("Your opponent has left the game. {} wins by forfeit.", w),
                None => "Your opponent has left the game.".to_string(),
            };
            state.hub.multicast(
                &members,
                ServerMessage::PlayerLeft {
                    board,
                    current_player,
                    winner,
                    message: Some(message),
                },
            );

            if let Some(w) = winner {
                report::spawn_report(
                    state,
                    MatchReport::new(
                        state,
                        &room_id,
                        &members,
                        GameResult::from(w),
                        "forfeit",
                        move_count,
                    ),
                );
            }
        }
    }
}
