// The authoritative game session: one state machine per room, driven by a
// single task so concurrent player input becomes sequential logic.

use crate::domain::{
    Color, GameResult, GameTuning, JoinError, PlayerId, PlayerRegistry, PressResult, RoundOutcome,
    RoundPhase, RoundState, RoundTimer, SequenceGenerator,
};
use crate::use_cases::types::{
    IntentError, JoinAck, PlayerSnapshot, RoomCommand, RoomEvent, RoomJoinError, RoomSnapshot,
    RoomStatus,
};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionStatus {
    Waiting,
    Countdown { remaining: u8 },
    Active,
    GameOver,
}

impl SessionStatus {
    fn room_status(self) -> RoomStatus {
        match self {
            SessionStatus::Waiting => RoomStatus::Waiting,
            SessionStatus::Countdown { .. } => RoomStatus::Countdown,
            SessionStatus::Active => RoomStatus::Active,
            SessionStatus::GameOver => RoomStatus::GameOver,
        }
    }
}

/// Room lifecycle state machine: waiting -> countdown -> active -> game
/// over, with restart back to waiting. All transition methods are
/// synchronous and take `now` explicitly so tests can drive them.
pub struct GameSession {
    code: String,
    tuning: GameTuning,
    registry: PlayerRegistry,
    generator: SequenceGenerator,
    status: SessionStatus,
    round: u32,
    sequence: Vec<Color>,
    round_state: Option<RoundState>,
    next_deadline: Option<Instant>,
}

impl GameSession {
    pub fn new(code: String, tuning: GameTuning, generator: SequenceGenerator) -> Self {
        let registry = PlayerRegistry::new(tuning.max_players);
        Self {
            code,
            tuning,
            registry,
            generator,
            status: SessionStatus::Waiting,
            round: 0,
            sequence: Vec::new(),
            round_state: None,
            next_deadline: None,
        }
    }

    /// When the room actor must next wake up without input.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_deadline
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn handle_command(&mut self, now: Instant, command: RoomCommand) -> Vec<RoomEvent> {
        let mut events = Vec::new();
        match command {
            RoomCommand::Join {
                profile,
                resume,
                reply,
            } => {
                let result = self.join(profile, resume);
                if result.is_ok() {
                    events.push(self.snapshot_event());
                }
                let _ = reply.send(result.map(|player_id| JoinAck { player_id }));
            }
            RoomCommand::Start { player_id, reply } => {
                let result = self.start(now, player_id, &mut events);
                let _ = reply.send(result);
            }
            RoomCommand::PressColor { player_id, color } => {
                self.press_color(now, player_id, color, &mut events);
            }
            RoomCommand::SubmitSequence { player_id } => {
                self.submit_sequence(now, player_id, &mut events);
            }
            RoomCommand::Restart { player_id, reply } => {
                let result = self.restart(player_id, &mut events);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id } => {
                self.leave(now, player_id, &mut events);
            }
            RoomCommand::Disconnect { player_id } => {
                self.disconnect(now, player_id, &mut events);
            }
        }
        events
    }

    /// Fires the pending deadline: countdown step, reveal end, or a timer
    /// second. A deadline arriving after the round resolved is a no-op.
    pub fn handle_deadline(&mut self, now: Instant) -> Vec<RoomEvent> {
        let mut events = Vec::new();
        self.next_deadline = None;
        match self.status {
            SessionStatus::Countdown { remaining } => {
                let remaining = remaining.saturating_sub(1);
                events.push(RoomEvent::Countdown { count: remaining });
                if remaining == 0 {
                    self.status = SessionStatus::Active;
                    events.push(self.snapshot_event());
                    self.begin_round(now, &mut events);
                } else {
                    self.status = SessionStatus::Countdown { remaining };
                    self.next_deadline = Some(now + Duration::from_secs(1));
                }
            }
            SessionStatus::Active => match self.round_state.as_ref().map(|r| r.phase) {
                Some(RoundPhase::Showing) => self.open_input(now, &mut events),
                Some(RoundPhase::Input) => self.tick_timer(now, &mut events),
                None => {}
            },
            _ => {}
        }
        events
    }

    fn join(
        &mut self,
        profile: crate::domain::PlayerProfile,
        resume: Option<PlayerId>,
    ) -> Result<PlayerId, RoomJoinError> {
        if self.status.room_status() != RoomStatus::Waiting {
            // Only a disconnected member may come back mid-game.
            match resume.and_then(|id| self.registry.get(id)) {
                Some(player) if player.connected => return Err(RoomJoinError::DuplicateJoin),
                Some(_) => {}
                None => return Err(RoomJoinError::GameInProgress),
            }
        }
        self.registry.join(profile, resume).map_err(|e| match e {
            JoinError::RoomFull => RoomJoinError::RoomFull,
            JoinError::DuplicateJoin => RoomJoinError::DuplicateJoin,
            JoinError::InvalidName => RoomJoinError::InvalidName,
        })
    }

    fn start(
        &mut self,
        now: Instant,
        player_id: PlayerId,
        events: &mut Vec<RoomEvent>,
    ) -> Result<(), IntentError> {
        if self.status != SessionStatus::Waiting {
            return Err(IntentError::Stale);
        }
        if !self.registry.is_host(player_id) && self.registry.len() != 1 {
            return Err(IntentError::NotHost);
        }
        let from = self.tuning.countdown_from;
        self.status = SessionStatus::Countdown { remaining: from };
        info!(room = %self.code, "game starting");
        events.push(self.snapshot_event());
        events.push(RoomEvent::Countdown { count: from });
        self.next_deadline = Some(now + Duration::from_secs(1));
        Ok(())
    }

    fn press_color(
        &mut self,
        now: Instant,
        player_id: PlayerId,
        color: Color,
        events: &mut Vec<RoomEvent>,
    ) {
        let Some(round) = self.round_state.as_mut() else {
            return; // stale press after resolution
        };
        match round.press(player_id, color) {
            PressResult::Failed => {
                events.push(RoomEvent::PlayerSubmitted { player_id });
                self.maybe_resolve(now, events);
            }
            PressResult::Accepted { .. } | PressResult::Ignored => {}
        }
    }

    fn submit_sequence(&mut self, now: Instant, player_id: PlayerId, events: &mut Vec<RoomEvent>) {
        let Some(round) = self.round_state.as_mut() else {
            return;
        };
        if round.finalize(player_id) {
            events.push(RoomEvent::PlayerSubmitted { player_id });
            self.maybe_resolve(now, events);
        }
    }

    fn restart(
        &mut self,
        player_id: PlayerId,
        events: &mut Vec<RoomEvent>,
    ) -> Result<(), IntentError> {
        if !self.registry.is_host(player_id) {
            return Err(IntentError::NotHost);
        }
        if !matches!(self.status, SessionStatus::Active | SessionStatus::GameOver) {
            return Err(IntentError::Stale);
        }
        // An in-flight round is cancelled outright: no scores, no
        // eliminations from it.
        self.round_state = None;
        self.round = 0;
        self.sequence.clear();
        self.registry.reset_all();
        self.status = SessionStatus::Waiting;
        self.next_deadline = None;
        info!(room = %self.code, "game restarted");
        events.push(RoomEvent::GameRestarted);
        events.push(self.snapshot_event());
        Ok(())
    }

    fn leave(&mut self, now: Instant, player_id: PlayerId, events: &mut Vec<RoomEvent>) {
        if !self.registry.remove(player_id) {
            return;
        }
        if let Some(round) = self.round_state.as_mut() {
            round.mark_failed(player_id);
        }
        events.push(RoomEvent::PlayerLeft { player_id });
        events.push(self.snapshot_event());
        self.maybe_resolve(now, events);
    }

    fn disconnect(&mut self, now: Instant, player_id: PlayerId, events: &mut Vec<RoomEvent>) {
        if !self.registry.mark_disconnected(player_id) {
            return;
        }
        debug!(room = %self.code, player_id, "player disconnected");
        if let Some(round) = self.round_state.as_mut() {
            round.mark_failed(player_id);
        }
        events.push(self.snapshot_event());
        self.maybe_resolve(now, events);
    }

    fn begin_round(&mut self, now: Instant, events: &mut Vec<RoomEvent>) {
        self.round += 1;
        self.sequence = self.generator.extend(&self.sequence);
        let participants = self.registry.active_players();
        if participants.is_empty() {
            // Everyone vanished before the round could start.
            self.finish_game(None, self.round - 1, events);
            return;
        }
        self.round_state = Some(RoundState::new(
            self.round,
            self.sequence.clone(),
            &participants,
        ));
        debug!(room = %self.code, round = self.round, players = participants.len(), "round started");
        events.push(RoomEvent::RoundStart {
            round: self.round,
            sequence: self.sequence.clone(),
        });
        self.next_deadline = Some(now + self.tuning.reveal_duration(self.sequence.len()));
    }

    fn open_input(&mut self, now: Instant, events: &mut Vec<RoomEvent>) {
        let total_seconds = self.tuning.input_seconds(self.round);
        let timer = RoundTimer::new(total_seconds);
        events.push(RoomEvent::InputOpen {
            round: self.round,
            total_seconds,
        });
        events.push(RoomEvent::TimerTick {
            seconds_remaining: timer.seconds_remaining(),
            timer_color: timer.color(),
            is_pulsing: timer.is_pulsing(),
        });
        if let Some(round) = self.round_state.as_mut() {
            round.open_input(timer);
        }
        self.next_deadline = Some(now + Duration::from_secs(1));
    }

    fn tick_timer(&mut self, now: Instant, events: &mut Vec<RoomEvent>) {
        let Some(round) = self.round_state.as_mut() else {
            return;
        };
        let Some(timer) = round.timer.as_mut() else {
            return;
        };
        let remaining = timer.tick();
        events.push(RoomEvent::TimerTick {
            seconds_remaining: remaining,
            timer_color: timer.color(),
            is_pulsing: timer.is_pulsing(),
        });
        if remaining == 0 {
            round.expire_pending();
            self.resolve_round(now, events);
        } else {
            self.next_deadline = Some(now + Duration::from_secs(1));
        }
    }

    fn maybe_resolve(&mut self, now: Instant, events: &mut Vec<RoomEvent>) {
        if self.round_state.as_ref().is_some_and(|r| r.all_terminal()) {
            self.resolve_round(now, events);
        }
    }

    /// Commits the round decision. Taking the round state out is the
    /// set-once point: whichever of "all submitted" or "timer expired"
    /// lands first wins, and the loser finds nothing to act on.
    fn resolve_round(&mut self, now: Instant, events: &mut Vec<RoomEvent>) {
        let Some(round) = self.round_state.take() else {
            return;
        };
        let outcomes = round.outcomes();
        let sole_participant = round.participant_count() == 1;

        for &(player_id, outcome) in &outcomes {
            match outcome {
                RoundOutcome::Correct => {
                    self.registry
                        .add_score(player_id, self.tuning.reward(round.round));
                }
                // A sole participant's failure ends the game instead of
                // eliminating them; covers solo mode and the last
                // survivor's final run.
                _ if !sole_participant => {
                    self.registry.eliminate(player_id, round.round);
                }
                _ => {}
            }
        }

        let scores = outcomes
            .iter()
            .filter_map(|&(id, _)| self.registry.get(id).map(|p| (id, p.score)))
            .collect();
        events.push(RoomEvent::RoundResult {
            round: round.round,
            outcomes: outcomes.clone(),
            scores,
        });
        events.push(self.snapshot_event());

        let survivors = self.registry.active_players();
        if survivors.is_empty() {
            let winner = if sole_participant {
                outcomes.first().map(|&(id, _)| id)
            } else {
                None
            };
            self.finish_game(winner, round.round, events);
        } else {
            self.begin_round(now, events);
        }
    }

    fn finish_game(
        &mut self,
        winner: Option<PlayerId>,
        rounds_played: u32,
        events: &mut Vec<RoomEvent>,
    ) {
        self.status = SessionStatus::GameOver;
        self.round_state = None;
        self.next_deadline = None;
        let result = GameResult {
            winner: winner.and_then(|id| self.registry.get(id).cloned()),
            final_scores: self.registry.final_standings(),
            rounds_played,
        };
        info!(room = %self.code, rounds_played, winner = ?winner, "game over");
        events.push(self.snapshot_event());
        events.push(RoomEvent::GameOver(result));
    }

    fn snapshot_event(&self) -> RoomEvent {
        RoomEvent::RoomState(self.snapshot())
    }

    /// Immutable room view; the only shape the outside world observes.
    pub fn snapshot(&self) -> RoomSnapshot {
        let players = self
            .registry
            .players()
            .iter()
            .map(|p| PlayerSnapshot {
                id: p.id,
                display_name: p.display_name.clone(),
                avatar_id: p.avatar_id.clone(),
                is_host: p.is_host,
                is_eliminated: p.is_eliminated,
                score: p.score,
                connected: p.connected,
                has_submitted: self
                    .round_state
                    .as_ref()
                    .is_some_and(|r| r.outcome_of(p.id).is_some()),
            })
            .collect();
        RoomSnapshot {
            code: self.code.clone(),
            status: self.status.room_status(),
            round: self.round,
            players,
        }
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// The per-room actor. Owns the session exclusively; commands arrive over
/// one channel and every emitted event is broadcast to subscribers.
pub async fn room_task(
    code: String,
    tuning: GameTuning,
    mut command_rx: mpsc::Receiver<RoomCommand>,
    event_tx: broadcast::Sender<RoomEvent>,
) {
    let mut session = GameSession::new(code.clone(), tuning, SequenceGenerator::new());
    let mut ever_joined = false;

    loop {
        let events = tokio::select! {
            command = command_rx.recv() => match command {
                Some(command) => session.handle_command(Instant::now(), command),
                None => break,
            },
            _ = wait_for_deadline(session.next_deadline()) => {
                session.handle_deadline(Instant::now())
            }
        };

        if !session.is_empty() {
            ever_joined = true;
        }
        for event in events {
            let _ = event_tx.send(event);
        }
        if ever_joined && session.is_empty() {
            info!(room = %code, "room empty; closing");
            let _ = event_tx.send(RoomEvent::Closed);
            break;
        }
    }
}
