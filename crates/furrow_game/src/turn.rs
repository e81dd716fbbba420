//! Turn control
//!
//! Only the authority mutates the world. A client asks for the turn to
//! end and waits for the authority's broadcast; a dedicated server pushes
//! the whole world to every client after each change.

use std::time::Duration;

use furrow_core::event::EventBus;
use furrow_core::time::TurnClock;
use furrow_net::{Inbound, Message, ServerHub, Session};
use tracing::{debug, info, warn};

use crate::bot;
use crate::error::WorldError;
use crate::events::{GameOver, TurnEnded};
use crate::save::Save;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The turn moved to the next player.
    Advanced { new_round: bool },
    /// The request went to the authority.
    Requested,
}

#[derive(Debug, Default)]
pub struct TurnController {
    clock: TurnClock,
    world_version: u64,
}

impl TurnController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version of the last world sent or accepted.
    pub fn world_version(&self) -> u64 {
        self.world_version
    }

    /// Continue the turn stored in `save`.
    pub fn resume(&mut self, save: &Save) {
        self.clock
            .resume(Duration::from_secs(save.turn_time_passed as u64));
    }

    pub fn end_turn(
        &mut self,
        save: &mut Save,
        session: &mut Session,
        events: &mut EventBus,
    ) -> Result<TurnOutcome, WorldError> {
        match session {
            Session::Client(endpoint) => {
                endpoint.send(Message::EndTurn)?;
                debug!("end of turn requested");
                Ok(TurnOutcome::Requested)
            }
            Session::Server(hub) => self.advance(save, Some(&*hub), events),
            Session::Standalone => self.advance(save, None, events),
        }
    }

    fn advance(
        &mut self,
        save: &mut Save,
        hub: Option<&ServerHub>,
        events: &mut EventBus,
    ) -> Result<TurnOutcome, WorldError> {
        let finished = save.current_player_id;
        let new_round = save.advance_turn();
        self.clock.reset_turn();
        self.world_version += 1;
        info!(turn = save.turn, player = save.current_player_id, "turn ended");

        check_end_state(save, finished, events)?;
        events.dispatch(&TurnEnded {
            turn: save.turn,
            current_player: save.current_player_id,
            new_round,
        });

        if let Some(hub) = hub {
            let reached = hub.broadcast(&self.snapshot(save)?);
            debug!(reached, version = self.world_version, "world broadcast");
        }
        Ok(TurnOutcome::Advanced { new_round })
    }

    fn snapshot(&self, save: &Save) -> Result<Message, WorldError> {
        Ok(Message::LoadSaveResponse {
            world_version: self.world_version,
            world: save.to_value()?,
        })
    }

    /// Apply queued network messages. Returns how many were read.
    pub fn handle_messages(
        &mut self,
        save: &mut Save,
        session: &mut Session,
        events: &mut EventBus,
    ) -> Result<usize, WorldError> {
        match session {
            Session::Standalone => Ok(0),
            Session::Server(hub) => {
                let inbound = hub.drain();
                let count = inbound.len();
                for Inbound { from, message } in inbound {
                    match message {
                        Message::EndTurn => {
                            self.advance(save, Some(&*hub), events)?;
                        }
                        Message::RequestSave => {
                            if let Err(err) = hub.send_to(from, self.snapshot(save)?) {
                                warn!(%from, %err, "could not answer world request");
                            }
                        }
                        other => warn!(%from, kind = other.kind(), "ignoring client message"),
                    }
                }
                Ok(count)
            }
            Session::Client(endpoint) => {
                let messages = endpoint.drain();
                let count = messages.len();
                for message in messages {
                    match message {
                        Message::LoadSaveResponse {
                            world_version,
                            world,
                        } => {
                            if world_version < self.world_version {
                                warn!(
                                    version = world_version,
                                    current = self.world_version,
                                    "ignoring stale world"
                                );
                                continue;
                            }
                            match Save::from_value(world) {
                                Ok(received) => {
                                    self.accept_world(save, received, world_version, events)
                                }
                                Err(err) => {
                                    warn!(%err, "unreadable world, asking again");
                                    endpoint.send(Message::RequestSave)?;
                                }
                            }
                        }
                        other => warn!(kind = other.kind(), "ignoring server message"),
                    }
                }
                Ok(count)
            }
        }
    }

    fn accept_world(
        &mut self,
        save: &mut Save,
        mut received: Save,
        version: u64,
        events: &mut EventBus,
    ) {
        let moved = (received.turn, received.current_player_id) != (save.turn, save.current_player_id);
        let new_round = received.turn != save.turn;
        received.path = save.path.take();
        received.local_player_id = save.local_player_id;
        *save = received;
        self.world_version = version;
        self.resume(save);
        debug!(version, "world replaced by authority");
        if moved {
            events.dispatch(&TurnEnded {
                turn: save.turn,
                current_player: save.current_player_id,
                new_round,
            });
        }
    }

    /// Advance the turn timer and let bots play. Does nothing on clients.
    pub fn update(
        &mut self,
        dt: Duration,
        save: &mut Save,
        session: &mut Session,
        events: &mut EventBus,
    ) -> Result<(), WorldError> {
        if !session.has_authority() || save.players.is_empty() {
            return Ok(());
        }
        let tick = self.clock.advance(dt);
        if save.advance_time(tick.whole_seconds) {
            info!(player = save.current_player_id, "turn time is up");
            self.end_turn(save, session, events)?;
            return Ok(());
        }
        if save.is_dead(save.current_player_id) {
            self.end_turn(save, session, events)?;
        } else if save.is_current_player_bot() {
            bot::play_turn(save, events)?;
            self.end_turn(save, session, events)?;
        }
        Ok(())
    }
}

/// A bankrupt bot leaves the game; any finished player is announced.
fn check_end_state(
    save: &mut Save,
    player: usize,
    events: &mut EventBus,
) -> Result<(), WorldError> {
    if save.is_dead(player) {
        return Ok(());
    }
    let Some(state) = save.players.get(player) else {
        return Ok(());
    };
    if !state.has_finished() {
        return Ok(());
    }
    let won = state.has_won();
    if state.is_bot() && !won {
        save.mark_dead(player)?;
    }
    events.dispatch(&GameOver { player, won });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerColors;
    use crate::save::tests::world;
    use furrow_render::Color;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn three_humans() -> Save {
        let mut save = world(42, 8, 8, 0);
        save.add_player("B", "Bville", PlayerColors::uniform(Color::RED)).unwrap();
        save.add_player("C", "Cville", PlayerColors::uniform(Color::BLACK)).unwrap();
        save
    }

    #[test]
    fn a_round_advances_turn_once() {
        let mut save = three_humans();
        let mut turns = TurnController::new();
        let mut events = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        events.subscribe::<TurnEnded, _>(move |e| sink.borrow_mut().push(*e));

        for _ in 0..save.players.len() {
            turns
                .end_turn(&mut save, &mut Session::Standalone, &mut events)
                .unwrap();
        }
        assert_eq!((save.turn, save.current_player_id), (1, 0));
        let rounds: Vec<bool> = seen.borrow().iter().map(|e| e.new_round).collect();
        assert_eq!(rounds, vec![false, false, true]);
    }

    #[test]
    fn dedicated_server_broadcasts_the_new_world() {
        let hub = ServerHub::new();
        let mut client = hub.connect_local();
        let mut session = Session::Server(hub);
        let mut save = three_humans();
        save.current_player_id = 2;
        let mut turns = TurnController::new();

        let outcome = turns
            .end_turn(&mut save, &mut session, &mut EventBus::new())
            .unwrap();
        assert_eq!(outcome, TurnOutcome::Advanced { new_round: true });
        assert_eq!((save.turn, save.current_player_id), (1, 0));

        let received = client.drain();
        assert_eq!(received.len(), 1);
        let Message::LoadSaveResponse {
            world_version,
            world,
        } = &received[0]
        else {
            panic!("expected a world");
        };
        assert_eq!(*world_version, 1);
        assert_eq!(world["turn"], 1);
        assert_eq!(world["currentPlayerId"], 0);
        assert_eq!(Save::from_value(world.clone()).unwrap().players, save.players);
    }

    #[test]
    fn client_requests_instead_of_mutating() {
        let mut hub = ServerHub::new();
        let mut session = Session::Client(hub.connect_local());
        let mut save = three_humans();
        let before = save.clone();

        let outcome = TurnController::new()
            .end_turn(&mut save, &mut session, &mut EventBus::new())
            .unwrap();
        assert_eq!(outcome, TurnOutcome::Requested);
        assert_eq!(save, before);
        let inbound = hub.drain();
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].message, Message::EndTurn);
    }

    #[test]
    fn server_answers_client_messages() {
        let hub = ServerHub::new();
        let mut client = hub.connect_local();
        let mut session = Session::Server(hub);
        let mut save = three_humans();
        let mut turns = TurnController::new();

        client.send(Message::EndTurn).unwrap();
        client.send(Message::RequestSave).unwrap();
        let read = turns
            .handle_messages(&mut save, &mut session, &mut EventBus::new())
            .unwrap();
        assert_eq!(read, 2);
        assert_eq!(save.current_player_id, 1);

        let kinds: Vec<&str> = client.drain().iter().map(Message::kind).collect();
        assert_eq!(kinds, vec!["loadSaveResponse", "loadSaveResponse"]);
    }

    #[test]
    fn client_keeps_newest_world() {
        let mut hub = ServerHub::new();
        let mut session = Session::Client(hub.connect_local());
        let mut save = three_humans();
        save.local_player_id = 1;
        let mut turns = TurnController::new();
        let mut events = EventBus::new();

        let mut newer = save.clone();
        newer.turn = 5;
        let mut older = save.clone();
        older.turn = 9;
        hub.broadcast(&Message::LoadSaveResponse {
            world_version: 2,
            world: newer.to_value().unwrap(),
        });
        hub.broadcast(&Message::LoadSaveResponse {
            world_version: 1,
            world: older.to_value().unwrap(),
        });
        turns
            .handle_messages(&mut save, &mut session, &mut events)
            .unwrap();
        assert_eq!(save.turn, 5);
        assert_eq!(save.local_player_id, 1);
        assert_eq!(turns.world_version(), 2);

        hub.broadcast(&Message::LoadSaveResponse {
            world_version: 3,
            world: serde_json::json!({"turn": "many"}),
        });
        turns
            .handle_messages(&mut save, &mut session, &mut events)
            .unwrap();
        assert_eq!(save.turn, 5);
        let inbound = hub.drain();
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].message, Message::RequestSave);
    }

    #[test]
    fn time_out_forces_end_of_turn() {
        let mut save = three_humans();
        let mut turns = TurnController::new();
        let mut session = Session::Standalone;
        let mut events = EventBus::new();

        turns
            .update(Duration::from_secs(89), &mut save, &mut session, &mut events)
            .unwrap();
        assert_eq!(save.current_player_id, 0);
        turns
            .update(Duration::from_millis(1500), &mut save, &mut session, &mut events)
            .unwrap();
        assert_eq!(save.current_player_id, 1);
        assert_eq!(save.turn_time_passed, 0);
        assert_eq!(save.time_passed, 90);
    }

    #[test]
    fn bots_play_on_update() {
        let mut save = world(42, 6, 6, 1);
        save.current_player_id = 1;
        let mut turns = TurnController::new();
        turns
            .update(
                Duration::from_millis(16),
                &mut save,
                &mut Session::Standalone,
                &mut EventBus::new(),
            )
            .unwrap();
        assert_eq!((save.turn, save.current_player_id), (1, 0));
        assert!(save.owned_cells_with_no_item(1).is_empty());
        assert_eq!(save.buy_items_per_turn.len(), 1);
    }

    #[test]
    fn bankrupt_bot_leaves_the_game() {
        let mut save = world(42, 6, 6, 1);
        save.current_player_id = 1;
        save.players[1].money = 0;
        let mut events = EventBus::new();
        let over = Rc::new(RefCell::new(Vec::new()));
        let sink = over.clone();
        events.subscribe::<GameOver, _>(move |e| sink.borrow_mut().push(*e));

        TurnController::new()
            .end_turn(&mut save, &mut Session::Standalone, &mut events)
            .unwrap();
        assert!(save.is_dead(1));
        assert!(save.owned_cells(1).is_empty());
        assert_eq!(*over.borrow(), vec![GameOver { player: 1, won: false }]);
    }
}
