//! Match state machine and authoritative tick loop

use parking_lot::{Mutex, RwLock};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::util::time::{monotonic_millis, TickClock, TICK_DURATION_MICROS};
use crate::ws::protocol::{GameEvent, GameSnapshot, ServerMsg};

use super::character::CharacterType;
use super::combat::CombatSystem;
use super::ledge::{LedgeGrabSystem, LedgeRelease};
use super::physics::PhysicsSystem;
use super::player::{Player, Slot};
use super::snapshot::SnapshotBuilder;
use super::stage::{Stage, STAGES};
use super::InputState;

/// Round wins needed to take the match
pub const ROUNDS_TO_WIN: u32 = 2;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Fewer than two participants
    Waiting,
    /// Round in progress
    Playing,
    /// A round ended; waiting for a next-round request
    RoundOver,
    /// A match ended; waiting for a new-match request
    MatchOver,
}

/// Player creation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    #[error("Stage catalog is empty")]
    EmptyCatalog,

    #[error("No stage selected")]
    NoStage,

    #[error("Stage {stage} has no spawn point for {slot}")]
    MissingSpawn { stage: &'static str, slot: Slot },
}

/// Score bookkeeping for the current match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchScore {
    pub scores: [u32; 2],
    pub round_winner: Option<Slot>,
    pub match_winner: Option<Slot>,
}

/// Control requests latched between ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ControlRequests {
    next_round: bool,
    new_match: bool,
}

/// Result of a tick
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    pub round_ended: bool,
    pub match_ended: bool,
}

/// The simulation world: players, stage, score and the round/match state
/// machine. Owned by a single task and mutated only through its methods.
pub struct Arena {
    phase: MatchPhase,
    stages: &'static [Stage],
    stage_index: Option<usize>,
    players: [Option<Player>; 2],
    /// Connected participants and their character picks
    participants: [Option<CharacterType>; 2],
    inputs: [InputState; 2],
    requests: ControlRequests,
    score: MatchScore,
    pending_round_reset: bool,
    pending_match_reset: bool,
    rng: ChaCha8Rng,
    tick: u64,
    events: Vec<GameEvent>,
}

/// Borrow a slot's player and its opponent at the same time
fn split_pair(
    players: &mut [Option<Player>; 2],
    slot: Slot,
) -> (&mut Option<Player>, &mut Option<Player>) {
    let [first, second] = players;
    match slot {
        Slot::One => (first, second),
        Slot::Two => (second, first),
    }
}

impl Arena {
    pub fn new(seed: u64) -> Self {
        Self::with_stages(STAGES, seed)
    }

    pub fn with_stages(stages: &'static [Stage], seed: u64) -> Self {
        Self {
            phase: MatchPhase::Waiting,
            stages,
            stage_index: None,
            players: [None, None],
            participants: [None, None],
            inputs: [InputState::default(); 2],
            requests: ControlRequests::default(),
            score: MatchScore::default(),
            pending_round_reset: false,
            pending_match_reset: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Whether the tick clock should be running
    pub fn is_running(&self) -> bool {
        self.phase != MatchPhase::Waiting
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn stage(&self) -> Option<&'static Stage> {
        let stages = self.stages;
        self.stage_index.and_then(|i| stages.get(i))
    }

    pub fn player(&self, slot: Slot) -> Option<&Player> {
        self.players[slot.index()].as_ref()
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().flatten()
    }

    pub fn score(&self) -> &MatchScore {
        &self.score
    }

    pub fn pending_round_reset(&self) -> bool {
        self.pending_round_reset
    }

    pub fn pending_match_reset(&self) -> bool {
        self.pending_match_reset
    }

    pub fn participant_count(&self) -> usize {
        self.participants.iter().flatten().count()
    }

    // ------------------------------------------------------------------
    // Inbound events
    // ------------------------------------------------------------------

    /// A participant took `slot`. Starts a match once both slots are taken.
    pub fn join(&mut self, slot: Slot, character: Option<CharacterType>) {
        let character = character.unwrap_or_else(|| CharacterType::default_for_slot(slot.index()));
        self.participants[slot.index()] = Some(character);
        self.inputs[slot.index()] = InputState::default();
        info!(slot = %slot, ?character, "Participant joined");
        self.try_start();
    }

    /// A participant left `slot`. Returns true if a running match was
    /// dropped back to waiting.
    pub fn leave(&mut self, slot: Slot) -> bool {
        self.participants[slot.index()] = None;
        self.inputs[slot.index()] = InputState::default();
        info!(slot = %slot, remaining = self.participant_count(), "Participant left");
        if self.phase == MatchPhase::Waiting {
            return false;
        }
        info!("Participant left mid-match, stopping game");
        self.reset_to_waiting();
        true
    }

    /// Latch the latest input for a slot. Last write wins.
    pub fn set_input(&mut self, slot: Slot, input: InputState) {
        if self.participants[slot.index()].is_some() {
            self.inputs[slot.index()] = input;
        }
    }

    /// Queue an "advance round" request for the next tick
    pub fn request_next_round(&mut self) {
        self.requests.next_round = true;
    }

    /// Queue a "new match" request for the next tick
    pub fn request_new_match(&mut self) {
        self.requests.new_match = true;
    }

    /// Start a match if two participants are present and none is running
    pub fn try_start(&mut self) -> bool {
        if self.phase != MatchPhase::Waiting || self.participant_count() < 2 {
            return false;
        }
        self.start_match()
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Run one simulation tick with `elapsed_ms` of real time since the last
    pub fn tick(&mut self, elapsed_ms: f32) -> TickResult {
        let mut result = TickResult::default();
        if !self.is_running() {
            return result;
        }
        self.tick += 1;

        self.process_requests();
        if self.phase != MatchPhase::Playing {
            result.events = std::mem::take(&mut self.events);
            return result;
        }

        let Some(stage) = self.stage() else {
            error!("Playing without a stage, returning to waiting");
            self.reset_to_waiting();
            return result;
        };

        // Inputs are latched for the whole tick
        let inputs = self.inputs;

        // 1. Timers
        self.advance_timers(elapsed_ms);

        // 2. Ledge logic, guard and movement for both slots
        let mut free = [false; 2];
        for slot in Slot::ALL {
            free[slot.index()] =
                self.apply_slot_control(slot, &inputs[slot.index()], stage, elapsed_ms);
        }

        // 3. Attacks, after every slot has moved so launches are not overwritten
        for slot in Slot::ALL {
            if free[slot.index()] {
                self.apply_slot_attack(slot, &inputs[slot.index()]);
            }
        }

        // 4. Integration and landing
        for player in self.players.iter_mut().flatten() {
            if !player.is_hanging() {
                PhysicsSystem::integrate(player, stage.platforms, elapsed_ms);
            }
        }

        // 5. Off-stage check
        self.check_off_stage(&mut result);

        result.events = std::mem::take(&mut self.events);
        result
    }

    fn process_requests(&mut self) {
        let requests = std::mem::take(&mut self.requests);
        if requests.next_round {
            self.advance_round();
        }
        if requests.new_match {
            self.new_match();
        }
    }

    fn advance_timers(&mut self, elapsed_ms: f32) {
        for player in self.players.iter_mut().flatten() {
            let expired = player.timers.advance(elapsed_ms);
            if expired.basic {
                player.is_basic_attacking = false;
            }
            if expired.special {
                player.is_special_attacking = false;
            }
            if expired.guard {
                player.is_guarding = false;
            }
            if expired.ledge_hang && player.is_hanging() {
                LedgeGrabSystem::release(player, LedgeRelease::LetGo);
                self.events.push(GameEvent::LedgeReleased {
                    player: player.slot,
                    release: LedgeRelease::LetGo,
                });
            }
        }
    }

    /// Ledge handling, guard and movement for one slot. Returns false when
    /// the player is absent or spent the tick on the ledge.
    fn apply_slot_control(
        &mut self,
        slot: Slot,
        input: &InputState,
        stage: &Stage,
        elapsed_ms: f32,
    ) -> bool {
        let Some(player) = self.players[slot.index()].as_mut() else {
            return false;
        };

        if player.is_hanging() {
            if let Some(release) = LedgeGrabSystem::release_for_input(player, input) {
                LedgeGrabSystem::release(player, release);
                self.events.push(GameEvent::LedgeReleased {
                    player: slot,
                    release,
                });
            }
            return false;
        }

        if LedgeGrabSystem::try_grab(player, stage.platforms) {
            debug!(slot = %slot, "Ledge grabbed");
            self.events.push(GameEvent::LedgeGrabbed { player: slot });
            return false;
        }

        CombatSystem::try_guard(player, input);
        PhysicsSystem::apply_input(player, input, elapsed_ms);
        true
    }

    fn apply_slot_attack(&mut self, slot: Slot, input: &InputState) {
        let (own, other) = split_pair(&mut self.players, slot);
        let Some(player) = own.as_mut() else {
            return;
        };
        let hits = CombatSystem::try_attack(player, other.as_mut(), input);
        self.events.extend(hits);
    }

    fn check_off_stage(&mut self, result: &mut TickResult) {
        let loser = Slot::ALL.into_iter().find(|slot| {
            self.players[slot.index()]
                .as_ref()
                .is_some_and(|p| p.bounds().is_off_stage())
        });
        let Some(loser) = loser else {
            return;
        };

        let winner = loser.opponent();
        if self.players[winner.index()].is_none() {
            warn!(slot = %loser, "Player left the arena with no opponent, resetting match");
            self.reset_to_waiting();
            return;
        }

        result.round_ended = true;
        result.match_ended = self.end_round(winner, loser);
    }

    // ------------------------------------------------------------------
    // Round and match lifecycle
    // ------------------------------------------------------------------

    /// Credit `winner` with the round. Returns true if that won the match.
    fn end_round(&mut self, winner: Slot, loser: Slot) -> bool {
        self.phase = MatchPhase::RoundOver;
        self.score.round_winner = Some(winner);
        self.score.scores[winner.index()] += 1;
        self.events.push(GameEvent::RoundEnd { winner, loser });
        info!(
            winner = %winner,
            loser = %loser,
            scores = ?self.score.scores,
            "Round ended"
        );

        if self.score.scores[winner.index()] >= ROUNDS_TO_WIN {
            self.phase = MatchPhase::MatchOver;
            self.score.match_winner = Some(winner);
            self.pending_match_reset = true;
            self.events.push(GameEvent::MatchEnd { winner });
            info!(winner = %winner, "Match ended");
            true
        } else {
            self.pending_round_reset = true;
            false
        }
    }

    /// RoundOver -> Playing. Ignored outside its precondition.
    fn advance_round(&mut self) -> bool {
        if self.phase != MatchPhase::RoundOver || !self.pending_round_reset {
            debug!(phase = ?self.phase, "Ignoring next-round request");
            return false;
        }
        info!("Starting next round");
        match self.begin_round(false) {
            Ok(()) => {
                self.phase = MatchPhase::Playing;
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to reset round");
                self.reset_to_waiting();
                false
            }
        }
    }

    /// MatchOver -> Playing. Ignored outside its precondition.
    fn new_match(&mut self) -> bool {
        if self.phase != MatchPhase::MatchOver || !self.pending_match_reset {
            debug!(phase = ?self.phase, "Ignoring new-match request");
            return false;
        }
        info!("Starting new match");
        self.start_match()
    }

    /// Fresh match: scores cleared, both players recreated
    fn start_match(&mut self) -> bool {
        self.score = MatchScore::default();
        self.pending_round_reset = false;
        self.pending_match_reset = false;
        self.players = [None, None];

        match self.begin_round(true) {
            Ok(()) => {
                self.phase = MatchPhase::Playing;
                info!(stage = ?self.stage().map(|s| s.id), "Match started");
                true
            }
            Err(e) => {
                error!(error = %e, "Cannot start match");
                self.reset_to_waiting();
                false
            }
        }
    }

    /// Pick a stage and place both players. With `recreate` the players are
    /// built from scratch; otherwise existing players are repositioned.
    /// Nothing is committed on failure.
    fn begin_round(&mut self, recreate: bool) -> Result<(), ArenaError> {
        if self.stages.is_empty() {
            return Err(ArenaError::EmptyCatalog);
        }
        let stages = self.stages;
        let stage_index = self.rng.gen_range(0..stages.len());
        let stage = &stages[stage_index];

        let mut next: [Option<Player>; 2] = [None, None];
        for slot in Slot::ALL {
            let spawn = stage.spawn_point(slot.index()).ok_or(ArenaError::MissingSpawn {
                stage: stage.id,
                slot,
            })?;
            let player = match self.players[slot.index()].take() {
                Some(mut existing) if !recreate => {
                    existing.respawn(spawn);
                    existing
                }
                _ => {
                    let character = self.participants[slot.index()]
                        .unwrap_or_else(|| CharacterType::default_for_slot(slot.index()));
                    Player::new(slot, character, spawn)
                }
            };
            next[slot.index()] = Some(player);
        }

        self.stage_index = Some(stage_index);
        self.players = next;
        self.score.round_winner = None;
        self.pending_round_reset = false;
        self.events.push(GameEvent::StageSelected { stage: stage.id });
        info!(stage = stage.name, "New stage");
        Ok(())
    }

    /// Any state -> Waiting: players discarded, score cleared
    fn reset_to_waiting(&mut self) {
        self.phase = MatchPhase::Waiting;
        self.players = [None, None];
        self.stage_index = None;
        self.score = MatchScore::default();
        self.pending_round_reset = false;
        self.pending_match_reset = false;
        self.requests = ControlRequests::default();
    }
}

// ============================================================================
// Tick loop task
// ============================================================================

/// Inbound events from the transport
#[derive(Debug, Clone)]
pub enum ArenaCommand {
    Join {
        slot: Slot,
        character: Option<CharacterType>,
    },
    Leave {
        slot: Slot,
    },
    Input {
        slot: Slot,
        input: InputState,
    },
    NextRound {
        slot: Slot,
    },
    NewMatch {
        slot: Slot,
    },
}

/// Slot acquisition errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("Game is full")]
    Full,
}

/// Transport-side handle to the running arena
#[derive(Clone)]
pub struct MatchHandle {
    pub command_tx: mpsc::Sender<ArenaCommand>,
    pub broadcast_tx: broadcast::Sender<ServerMsg>,
    slots: Arc<Mutex<[Option<Uuid>; 2]>>,
    latest: Arc<RwLock<Option<GameSnapshot>>>,
}

impl MatchHandle {
    /// Claim the first free slot for a connection
    pub fn acquire_slot(&self, connection_id: Uuid) -> Result<Slot, SlotError> {
        let mut slots = self.slots.lock();
        let index = slots.iter().position(Option::is_none).ok_or(SlotError::Full)?;
        slots[index] = Some(connection_id);
        Slot::from_index(index).ok_or(SlotError::Full)
    }

    /// Free a slot, if it still belongs to `connection_id`
    pub fn release_slot(&self, slot: Slot, connection_id: Uuid) {
        let mut slots = self.slots.lock();
        if slots[slot.index()] == Some(connection_id) {
            slots[slot.index()] = None;
        }
    }

    /// Number of occupied slots
    pub fn connected(&self) -> usize {
        self.slots.lock().iter().flatten().count()
    }

    /// Most recent snapshot produced by the tick loop
    pub fn latest_snapshot(&self) -> Option<GameSnapshot> {
        self.latest.read().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.broadcast_tx.subscribe()
    }

    /// Forward a command to the arena task. Returns false once it is gone.
    pub async fn send(&self, command: ArenaCommand) -> bool {
        self.command_tx.send(command).await.is_ok()
    }
}

/// The authoritative game loop around an [`Arena`]
pub struct GameMatch {
    arena: Arena,
    command_rx: mpsc::Receiver<ArenaCommand>,
    broadcast_tx: broadcast::Sender<ServerMsg>,
    latest: Arc<RwLock<Option<GameSnapshot>>>,
    snapshot_builder: SnapshotBuilder,
    clock: TickClock,
}

impl GameMatch {
    pub fn new(arena: Arena) -> (Self, MatchHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (broadcast_tx, _) = broadcast::channel(64);
        let latest = Arc::new(RwLock::new(None));

        let handle = MatchHandle {
            command_tx,
            broadcast_tx: broadcast_tx.clone(),
            slots: Arc::new(Mutex::new([None, None])),
            latest: latest.clone(),
        };

        let game_match = Self {
            arena,
            command_rx,
            broadcast_tx,
            latest,
            snapshot_builder: SnapshotBuilder::new(),
            clock: TickClock::new(),
        };

        (game_match, handle)
    }

    /// Run until every handle is dropped
    pub async fn run(mut self) {
        info!("Arena loop started");

        let tick_duration = Duration::from_micros(TICK_DURATION_MICROS);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.publish(Vec::new());

        loop {
            if !self.arena.is_running() {
                // Clock stopped: block until the transport reports something
                let Some(command) = self.command_rx.recv().await else {
                    break;
                };
                self.apply(command);
                if !self.drain_commands() {
                    break;
                }
                self.arena.try_start();
                if self.arena.is_running() {
                    info!("Tick clock started");
                    self.clock.reset();
                    tick_interval.reset();
                }
                let events = std::mem::take(&mut self.arena.events);
                self.publish(events);
                continue;
            }

            tick_interval.tick().await;

            if !self.drain_commands() {
                break;
            }
            if !self.arena.is_running() {
                info!("Tick clock stopped");
                self.publish(Vec::new());
                continue;
            }

            let elapsed_ms = self.clock.lap_ms();
            let result = self.arena.tick(elapsed_ms);
            if result.match_ended {
                debug!(tick = self.arena.tick_count(), "Match over, awaiting new-match request");
            }
            self.publish(result.events);
        }

        info!("Arena loop stopped");
    }

    /// Apply everything queued since the last tick. Returns false once the
    /// command channel is closed.
    fn drain_commands(&mut self) -> bool {
        loop {
            match self.command_rx.try_recv() {
                Ok(command) => self.apply(command),
                Err(mpsc::error::TryRecvError::Empty) => return true,
                Err(mpsc::error::TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn apply(&mut self, command: ArenaCommand) {
        match command {
            ArenaCommand::Join { slot, character } => self.arena.join(slot, character),
            ArenaCommand::Leave { slot } => {
                let msg = if self.arena.leave(slot) {
                    ServerMsg::OpponentLeft {}
                } else {
                    ServerMsg::PlayerLeft { player_id: slot }
                };
                let _ = self.broadcast_tx.send(msg);
            }
            ArenaCommand::Input { slot, input } => self.arena.set_input(slot, input),
            ArenaCommand::NextRound { slot } => {
                debug!(slot = %slot, "Next-round request");
                self.arena.request_next_round();
            }
            ArenaCommand::NewMatch { slot } => {
                debug!(slot = %slot, "New-match request");
                self.arena.request_new_match();
            }
        }
    }

    fn publish(&mut self, events: Vec<GameEvent>) {
        let snapshot = self
            .snapshot_builder
            .build(&self.arena, events, monotonic_millis());
        *self.latest.write() = Some(snapshot.clone());
        // No receivers is fine; nobody is connected yet
        let _ = self.broadcast_tx.send(ServerMsg::GameState(snapshot));
    }
}
