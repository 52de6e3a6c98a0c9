//! The turn/phase scheduler (§4.4 "Turn/Phase scheduler").
//!
//! Ported from `usecase/processor/turnbase_engine.go`'s `TurnBaseEngine`,
//! generalized to take an explicit [`Clock`] instead of reading
//! `time.Now()` ambiently.

use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::ids::UserId;

/// One timed unit within a [`Round`].
#[derive(Debug, Clone)]
pub struct Phase {
    /// A short identifying code (e.g. `"insurance"`, `"playing"`).
    pub code: &'static str,
    /// How long this phase runs before the scheduler auto-advances it.
    pub duration: Duration,
}

impl Phase {
    /// A new phase.
    #[must_use]
    pub const fn new(code: &'static str, duration: Duration) -> Self {
        Self { code, duration }
    }
}

/// A sequence of phases, either traversed once per hand (`is_glob`) or
/// once per player.
#[derive(Debug, Clone)]
pub struct Round {
    /// A short identifying code.
    pub code: &'static str,
    /// The phases this round steps through in order.
    pub phases: Vec<Phase>,
    /// Global rounds advance without player rotation; a non-glob round
    /// repeats for every player before the scheduler moves to the next
    /// round.
    pub is_glob: bool,
}

impl Round {
    /// A new round.
    #[must_use]
    pub const fn new(code: &'static str, phases: Vec<Phase>, is_glob: bool) -> Self {
        Self {
            code,
            phases,
            is_glob,
        }
    }
}

/// A snapshot of scheduler state returned from every [`TurnBaseEngine::tick`]
/// call (§4.4 `TurnInfo`).
#[derive(Debug, Clone)]
pub struct TurnInfo {
    /// The player whose turn it currently is.
    pub user_id: UserId,
    /// The current round's code.
    pub round_code: &'static str,
    /// The current phase's code.
    pub phase_code: &'static str,
    /// Set for exactly one `tick()` call after entering a new round.
    pub is_new_round: bool,
    /// Set for exactly one `tick()` call after rotating to a new player.
    pub is_new_turn: bool,
    /// Set for exactly one `tick()` call after entering a new phase.
    pub is_new_phase: bool,
    /// Seconds remaining in the current phase, rounded to the nearest
    /// second (§5 "Time").
    pub countdown: i64,
    /// Whether this tick resulted from the previous phase timing out.
    pub prev_timeout: bool,
    /// The player whose phase just timed out, if `prev_timeout`.
    pub prev_timeout_user_id: Option<UserId>,
}

/// Sequences players and rounds within the play state with explicit
/// per-phase deadlines (§4.4).
#[derive(Debug, Clone)]
pub struct TurnBaseEngine {
    players: Vec<UserId>,
    rounds: Vec<Round>,
    cur_round: usize,
    cur_phase: usize,
    cur_player: usize,
    is_new_turn: bool,
    is_new_round: bool,
    is_new_phase: bool,
    is_init: bool,
    countdown_end_time: Instant,
}

impl TurnBaseEngine {
    /// An unconfigured engine; call [`TurnBaseEngine::config`] before
    /// ticking it.
    #[must_use]
    pub fn new() -> Self {
        Self {
            players: Vec::new(),
            rounds: Vec::new(),
            cur_round: 0,
            cur_phase: 0,
            cur_player: 0,
            is_new_turn: false,
            is_new_round: false,
            is_new_phase: false,
            is_init: false,
            countdown_end_time: Instant::now(),
        }
    }

    /// Configures (or reconfigures) the engine for a new hand (§4.4
    /// "Configured once per hand with `(playerList, roundList)`").
    ///
    /// # Panics
    /// Panics if `rounds` is empty or any round has no phases — a
    /// misconfigured scheduler with nothing to advance through is a
    /// caller bug, not a recoverable runtime condition.
    pub fn config(&mut self, players: Vec<UserId>, rounds: Vec<Round>, clock: &impl Clock) {
        assert!(!rounds.is_empty(), "scheduler requires at least one round");
        assert!(
            rounds.iter().all(|r| !r.phases.is_empty()),
            "every round requires at least one phase"
        );
        self.players = players;
        self.rounds = rounds;
        self.is_init = true;
        self.is_new_turn = true;
        self.is_new_round = true;
        self.is_new_phase = true;
        self.cur_round = 0;
        self.cur_phase = 0;
        self.cur_player = 0;
        self.set_countdown(clock);
    }

    fn current_round(&self) -> &Round {
        &self.rounds[self.cur_round]
    }

    fn current_phase(&self) -> &Phase {
        &self.current_round().phases[self.cur_phase]
    }

    fn set_countdown(&mut self, clock: &impl Clock) {
        self.countdown_end_time = clock.now() + self.current_phase().duration;
    }

    /// Seconds remaining in the current phase, rounded to the nearest
    /// second; negative once the deadline has passed.
    #[must_use]
    pub fn remaining_countdown(&self, clock: &impl Clock) -> i64 {
        let now = clock.now();
        let diff = if self.countdown_end_time >= now {
            self.countdown_end_time - now
        } else {
            now - self.countdown_end_time
        };
        let seconds = diff.as_secs_f64().round() as i64;
        if self.countdown_end_time >= now {
            seconds
        } else {
            -seconds
        }
    }

    /// Whether the current round is global (no per-player rotation).
    #[must_use]
    pub fn is_glob(&self) -> bool {
        self.current_round().is_glob
    }

    /// Advances to the next round. Returns `false` if already on the last
    /// round.
    pub fn next_round(&mut self, clock: &impl Clock) -> bool {
        if self.cur_round + 1 < self.rounds.len() {
            self.cur_round += 1;
            self.cur_phase = 0;
            self.cur_player = 0;
            self.is_new_round = true;
            self.is_new_turn = true;
            self.is_new_phase = true;
            self.set_countdown(clock);
            true
        } else {
            false
        }
    }

    /// Rotates to the next player, wrapping to the first phase of the
    /// current round.
    pub fn next_player(&mut self, clock: &impl Clock) {
        self.cur_player = (self.cur_player + 1) % self.players.len().max(1);
        self.is_new_turn = true;
        self.cur_phase = 0;
        self.is_new_phase = true;
        self.set_countdown(clock);
    }

    /// Resets the countdown without advancing, used when an action
    /// extends the turn (e.g. a non-terminal hit, or a split) rather than
    /// ending it (§4.4 `RePhase`).
    pub fn rephase(&mut self, clock: &impl Clock) {
        self.set_countdown(clock);
        self.is_new_phase = true;
    }

    /// Advances to the next phase within the current round. Returns
    /// `false` if already on the last phase.
    pub fn next_phase(&mut self, clock: &impl Clock) -> bool {
        if self.cur_phase + 1 < self.current_round().phases.len() {
            self.cur_phase += 1;
            self.is_new_phase = true;
            self.set_countdown(clock);
            true
        } else {
            false
        }
    }

    /// The current player.
    #[must_use]
    pub fn current_player(&self) -> &UserId {
        &self.players[self.cur_player]
    }

    /// Advances the scheduler by one tick (§4.4 `Loop`). Must be called
    /// after [`TurnBaseEngine::config`].
    ///
    /// # Panics
    /// Panics if called before `config`.
    pub fn tick(&mut self, clock: &impl Clock) -> TurnInfo {
        assert!(self.is_init, "tick() called before config()");
        let info = if self.remaining_countdown(clock) < 0 {
            let prev_uid = self.players[self.cur_player].clone();
            if !self.next_phase(clock) {
                if self.is_glob() {
                    self.next_round(clock);
                } else {
                    self.next_player(clock);
                }
            }
            TurnInfo {
                user_id: self.players[self.cur_player].clone(),
                round_code: self.current_round().code,
                phase_code: self.current_phase().code,
                is_new_round: self.is_new_round,
                is_new_turn: self.is_new_turn,
                is_new_phase: self.is_new_phase,
                countdown: self.remaining_countdown(clock),
                prev_timeout: true,
                prev_timeout_user_id: Some(prev_uid),
            }
        } else {
            TurnInfo {
                user_id: self.players[self.cur_player].clone(),
                round_code: self.current_round().code,
                phase_code: self.current_phase().code,
                is_new_round: self.is_new_round,
                is_new_turn: self.is_new_turn,
                is_new_phase: self.is_new_phase,
                countdown: self.remaining_countdown(clock),
                prev_timeout: false,
                prev_timeout_user_id: None,
            }
        };
        self.is_new_round = false;
        self.is_new_turn = false;
        self.is_new_phase = false;
        info
    }
}

impl Default for TurnBaseEngine {
    fn default() -> Self {
        Self::new()
    }
}
