//! The match life-cycle state machine (§4.8 "State machine").
//!
//! Grounded on `usecase/state_machine/sm_states/*.go`'s `StateHandler`
//! interface (`Enter`/`Exit`/`Process` per state, triggered by a shared
//! `FireFn`). Per Design Notes §9 ("State handlers... the transition
//! table is data, not inheritance"), each state here is a plain value in
//! [`GamePhase`] plus free functions closing over an explicit
//! [`PhaseContext`] rather than a trait object hierarchy, and the
//! transition table in [`GamePhase::next`] is the single source of truth
//! for which phase follows which.

use std::time::Instant;

use crate::clock::Clock;
use crate::config::MatchConfig;

/// The five life-cycle states plus the bootstrap/terminal pair (§1, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Bootstrap state, entered once at match construction.
    Init,
    /// Waiting for presences; countdown-driven return to `Finish` if empty.
    Idle,
    /// Applies pending leaves, then checks readiness to open betting.
    Matching,
    /// Betting window; idle-kick and bot bet scheduling happen here.
    Preparing,
    /// Cards are dealt and players act in turn.
    Play,
    /// Dealer plays out, hands settle, chips move.
    Reward,
    /// Terminal sentinel; the host tears the match down once reached.
    Finish,
}

impl GamePhase {
    /// A stable display string for the match label and `UPDATE_GAME_STATE`
    /// broadcasts (§6 "Match label").
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Idle => "IDLE",
            Self::Matching => "MATCHING",
            Self::Preparing => "PREPARING",
            Self::Play => "PLAY",
            Self::Reward => "REWARD",
            Self::Finish => "FINISH",
        }
    }

    /// This phase's countdown budget, or `None` for phases with no timer
    /// of their own (`Init` fires its transition immediately; `Finish` is
    /// terminal).
    #[must_use]
    pub fn duration(self, config: &MatchConfig) -> Option<std::time::Duration> {
        match self {
            Self::Init | Self::Finish => None,
            Self::Idle => Some(config.idle_duration),
            Self::Matching => Some(config.matching_duration),
            Self::Preparing => Some(config.preparing_duration),
            Self::Play => Some(config.play_duration),
            Self::Reward => Some(config.reward_duration),
        }
    }
}

/// Per-phase countdown tracking (§5 "Time": absolute wall-clock deadlines,
/// polled each tick rather than slept on).
#[derive(Debug, Clone, Copy)]
pub struct PhaseClock {
    deadline: Instant,
    /// The last rounded-remaining-seconds value a notification was sent
    /// for (§5 "a 'need-notify' predicate fires when the rounded
    /// remaining changes").
    last_notified: Option<i64>,
}

impl PhaseClock {
    /// Starts a countdown of `duration` from `now`. A `None` duration (a
    /// timer-less phase) is represented as an already-elapsed deadline so
    /// `remaining()` reads negative immediately.
    #[must_use]
    pub fn start(duration: Option<std::time::Duration>, clock: &impl Clock) -> Self {
        let now = clock.now();
        Self {
            deadline: duration.map_or(now, |d| now + d),
            last_notified: None,
        }
    }

    /// Seconds remaining, rounded to the nearest second; negative once
    /// past the deadline.
    #[must_use]
    pub fn remaining(&self, clock: &impl Clock) -> i64 {
        let now = clock.now();
        if self.deadline >= now {
            (self.deadline - now).as_secs_f64().round() as i64
        } else {
            -((now - self.deadline).as_secs_f64().round() as i64)
        }
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn expired(&self, clock: &impl Clock) -> bool {
        self.remaining(clock) < 0
    }

    /// Whether the rounded remaining-seconds value has changed since the
    /// last call that returned `true`; latches internally so callers only
    /// broadcast on actual changes (§5).
    pub fn needs_notify(&mut self, clock: &impl Clock) -> bool {
        let remaining = self.remaining(clock);
        if self.last_notified != Some(remaining) {
            self.last_notified = Some(remaining);
            true
        } else {
            false
        }
    }
}

/// Inputs a state's `process` step needs beyond the match state itself,
/// all explicit per Design Notes §9 ("replace the source's ambient
/// context-value pattern with explicit parameters").
#[derive(Debug, Clone, Copy)]
pub struct PhaseInputs {
    /// Number of seated presences.
    pub presence_count: usize,
    /// Number of seated non-bot presences (§8 scenario 5: matches never
    /// run bot-only).
    pub human_count: usize,
    /// Whether at least one bet has been placed this hand (`IsReadyToPlay`
    /// also folds in `presence_count`, checked separately by the caller).
    pub any_bet_placed: bool,
    /// Whether the current hand has ended (`MatchState::is_game_ended`).
    pub game_ended: bool,
}

/// The outcome of one `GamePhase::next` evaluation: either stay, or move
/// to a new phase (carrying whether this is a "natural" advance the
/// caller should run the new phase's `enter` hook for).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No transition this tick.
    Stay,
    /// Move to the named phase.
    To(GamePhase),
}

impl GamePhase {
    /// §4.8's transition table, evaluated once per tick after the current
    /// phase's `process` logic has run. Returns the next phase, or `Stay`
    /// if none of this phase's exit conditions hold yet.
    #[must_use]
    pub fn next(self, phase_clock: &PhaseClock, clock: &impl Clock, inputs: PhaseInputs, min_presences: u8) -> Transition {
        let expired = phase_clock.expired(clock);
        match self {
            Self::Init => Transition::To(Self::Idle),
            Self::Idle => {
                if inputs.presence_count > 0 {
                    Transition::To(Self::Matching)
                } else if expired {
                    Transition::To(Self::Finish)
                } else {
                    Transition::Stay
                }
            }
            Self::Matching => {
                if !expired {
                    return Transition::Stay;
                }
                if inputs.presence_count >= usize::from(min_presences) {
                    Transition::To(Self::Preparing)
                } else {
                    Transition::To(Self::Idle)
                }
            }
            Self::Preparing => {
                if inputs.human_count == 0 {
                    return Transition::To(Self::Matching);
                }
                if !expired {
                    return Transition::Stay;
                }
                if inputs.any_bet_placed {
                    Transition::To(Self::Play)
                } else {
                    Transition::To(Self::Matching)
                }
            }
            Self::Play => {
                if inputs.game_ended {
                    Transition::To(Self::Reward)
                } else {
                    Transition::Stay
                }
            }
            Self::Reward => {
                if expired {
                    Transition::To(Self::Matching)
                } else {
                    Transition::Stay
                }
            }
            Self::Finish => Transition::Stay,
        }
    }
}
