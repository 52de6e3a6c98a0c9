//! Per-match orchestration (§6 "Wiring (match handler, packaging)").
//!
//! `Match` is the thing a host registers and ticks: it owns every
//! per-instance collaborator (match state, shoe/engine, turn scheduler,
//! RNG, bot bookkeeping) and implements the host contract's inherent
//! methods (`init`/`join_attempt`/`join`/`leave`/`loop_tick`/`terminate`,
//! mirroring §6's `MatchInit`/`MatchJoinAttempt`/`MatchJoin`/`MatchLeave`/
//! `MatchLoop`/`MatchTerminate`). Nothing here is global: a second match
//! on the same host gets its own `Match`, its own RNG, its own bot policy
//! (§9 "Global bot-integration singleton... replace with per-match bot
//! policy passed at construction").

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::bot::scheduler::{schedule_bot_bets, BotBetSchedule};
use crate::bot::strategy::{decide_action, decide_bet_amount, should_take_insurance};
use crate::bot::{BotProfile, RiskLevel};
use crate::clock::Clock;
use crate::config::MatchConfig;
use crate::error::StateMachineFinish;
use crate::game_engine::GameEngine;
use crate::hand::HandPosition;
use crate::host::{LabelProfile, MatchHost, MatchLabel, Opcode};
use crate::ids::UserId;
use crate::match_state::MatchState;
use crate::messages::{BetCode, InboundMessage};
use crate::presence::Presence;
use crate::processor;
use crate::rng::MatchRng;
use crate::state_machine::{GamePhase, PhaseClock, PhaseInputs, Transition};
use crate::turn_scheduler::TurnBaseEngine;

const LOG_TARGET: &str = "blackjack_table_core::match_handler";

/// Table metadata fixed at match creation (§6 "params include `label`").
#[derive(Debug, Clone)]
pub struct MatchParams {
    /// Host-assigned match id.
    pub match_id: String,
    /// Table display name.
    pub name: String,
    /// Optional join password.
    pub password: Option<String>,
    /// Number of bot seats the host leases into this table.
    pub num_bot: u8,
}

/// Why a join attempt was rejected (§6 `MatchJoinAttempt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRejection {
    /// The table has reached `max_seats`. Password matching is the host's
    /// job — it never reaches this core, which only ever sees approved
    /// joins via [`Match::join`].
    TableFull,
}

/// The full per-instance state a host registers and ticks (§5 "Shared
/// resources... all owned by the match instance and never shared").
pub struct Match {
    phase: GamePhase,
    phase_clock: PhaseClock,
    config: MatchConfig,
    params: MatchParams,
    rng: MatchRng,
    state: MatchState,
    turn_engine: TurnBaseEngine,
    engine: Option<GameEngine>,
    bot_profiles: HashMap<UserId, BotProfile>,
    bot_bet_schedules: HashMap<UserId, BotBetSchedule>,
    bot_insurance_evaluated: HashSet<UserId>,
    preparing_tick: u32,
}

impl Match {
    /// §6 `MatchInit`: builds the initial state, already advanced past the
    /// momentary `Init` bootstrap into `Idle` (the source's `TriggerInit`
    /// fires synchronously at construction, before the host's first
    /// tick), and returns the tick rate and initial label.
    #[must_use]
    pub fn init(params: MatchParams, config: MatchConfig, rng: MatchRng, clock: &impl Clock) -> (Self, u8, MatchLabel) {
        let tick_rate = config.tick_rate;
        let phase_clock = PhaseClock::start(GamePhase::Idle.duration(&config), clock);
        let mut m = Self {
            phase: GamePhase::Idle,
            phase_clock,
            config,
            params,
            rng,
            state: MatchState::new(),
            turn_engine: TurnBaseEngine::new(),
            engine: None,
            bot_profiles: HashMap::new(),
            bot_bet_schedules: HashMap::new(),
            bot_insurance_evaluated: HashSet::new(),
            preparing_tick: 0,
        };
        let label = m.label();
        (m, tick_rate, label)
    }

    /// The current life-cycle phase, for host-side diagnostics/tests.
    #[must_use]
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Read-only access to the match state, for host-side inspection.
    #[must_use]
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// §6 `MatchJoinAttempt`: whether a presence may join right now. Only
    /// capacity is evaluated here; credential checking (password) is the
    /// host's responsibility since the core never sees transport-level
    /// auth.
    #[must_use]
    pub fn join_attempt(&self, _presence: &Presence) -> Result<(), JoinRejection> {
        if self.state.presences.len() >= usize::from(self.config.max_seats) {
            return Err(JoinRejection::TableFull);
        }
        Ok(())
    }

    /// §6 `MatchJoin`: admits presences already approved by
    /// [`Match::join_attempt`] (§4.7 "Presence lifecycle").
    pub fn join(&mut self, presences: Vec<Presence>, host: &mut impl MatchHost) {
        for presence in &presences {
            if presence.is_bot() && !self.bot_profiles.contains_key(&presence.user_id) {
                self.bot_profiles.insert(presence.user_id.clone(), self.new_bot_profile());
            }
        }
        processor::process_join(&mut self.state, host, presences);
        self.refresh_label(host);
    }

    fn new_bot_profile(&mut self) -> BotProfile {
        let preset = match self.rng.range_inclusive(0, 2) {
            0 => RiskLevel::Conservative,
            1 => RiskLevel::Moderate,
            _ => RiskLevel::Aggressive,
        };
        let roll = self.rng.roll_percent();
        BotProfile::new(preset, roll)
    }

    /// §6 `MatchLeave`: a seat is mid-hand if it's part of the current
    /// hand's `playing_presences` and play has not yet reached `Reward`.
    pub fn leave(&mut self, users: &[UserId], host: &mut impl MatchHost) {
        let mid_hand = matches!(self.phase, GamePhase::Play);
        processor::process_leave(&mut self.state, host, users, mid_hand);
        self.refresh_label(host);
    }

    /// §6 `MatchTerminate`: the host is tearing the match down regardless
    /// of phase; nothing to flush since broadcasts are emitted eagerly.
    pub fn terminate(&mut self, host: &mut impl MatchHost) {
        host.emit_event(crate::host::MatchEvent::End);
        self.phase = GamePhase::Finish;
    }

    /// §6 `MatchLoop`: the per-tick entry point. Drains inbound messages
    /// in arrival order, injects bot decisions for this tick, then fires
    /// the current phase's `process` step and evaluates the transition
    /// table (§2 "Control flow per tick").
    ///
    /// # Errors
    /// Returns [`StateMachineFinish`] once `Finish` is reached; the host
    /// should tear the match down and stop invoking it.
    pub fn loop_tick(
        &mut self,
        clock: &impl Clock,
        host: &mut impl MatchHost,
        inbound: Vec<(UserId, InboundMessage)>,
    ) -> Result<(), StateMachineFinish> {
        if matches!(self.phase, GamePhase::Finish) {
            return Err(StateMachineFinish);
        }
        for (sender, message) in inbound {
            self.handle_message(&sender, message, clock, host);
        }
        self.inject_bot_decisions(clock, host);
        self.process_current_phase(clock, host);
        let transitioned = self.evaluate_transition(clock, host);
        if !transitioned && self.phase_clock.needs_notify(clock) {
            self.broadcast_game_state(clock, host);
        }
        if matches!(self.phase, GamePhase::Finish) {
            return Err(StateMachineFinish);
        }
        Ok(())
    }

    fn handle_message(&mut self, sender: &UserId, message: InboundMessage, clock: &impl Clock, host: &mut impl MatchHost) {
        match message {
            InboundMessage::Bet(req) => processor::apply_bet(&mut self.state, host, sender, req.code, req.amount),
            InboundMessage::DeclareCards(req) => {
                if let Some(engine) = self.engine.as_mut() {
                    processor::apply_action(&mut self.state, engine, &mut self.turn_engine, clock, host, sender, req.code);
                } else if req.code == crate::messages::ActionCode::Insurance {
                    processor::apply_insurance(&mut self.state, host, sender);
                }
            }
            InboundMessage::InfoTable => processor::apply_info_table(&self.state, host, sender),
            InboundMessage::SyncTable => processor::apply_sync_table(&self.state, host, sender),
        }
    }

    fn phase_inputs(&self) -> PhaseInputs {
        PhaseInputs {
            presence_count: self.state.presences.len(),
            human_count: self.state.presences.human_count(),
            any_bet_placed: self.state.presences.iter().any(|p| self.state.is_bet(&p.user_id)),
            game_ended: self.state.is_game_ended(),
        }
    }

    fn evaluate_transition(&mut self, clock: &impl Clock, host: &mut impl MatchHost) -> bool {
        let inputs = self.phase_inputs();
        match self.phase.next(&self.phase_clock, clock, inputs, self.config.min_presences) {
            Transition::Stay => false,
            Transition::To(next) => {
                info!(
                    target: LOG_TARGET,
                    match_id = %self.params.match_id,
                    from = self.phase.label(),
                    to = next.label(),
                    "state transition"
                );
                self.exit_phase(self.phase, host);
                self.phase = next;
                self.phase_clock = PhaseClock::start(next.duration(&self.config), clock);
                self.enter_phase(next, clock, host);
                self.broadcast_game_state(clock, host);
                self.refresh_label(host);
                true
            }
        }
    }

    /// §4.8: every transition publishes `UpdateGameState` and refreshes
    /// the label. `UPDATE_GAME_STATE` broadcasts are the one opcode the
    /// host is told not to log (§4.7 "Broadcast primitive"), which is a
    /// host-side concern, not this core's.
    fn broadcast_game_state(&self, clock: &impl Clock, host: &mut impl MatchHost) {
        let payload = serde_json::to_vec(&serde_json::json!({
            "state": self.phase.label(),
            "remainingCountdown": self.phase_clock.remaining(clock),
        }))
        .unwrap_or_default();
        host.broadcast(Opcode::UpdateGameState, &payload, None, None, true);
    }

    fn exit_phase(&mut self, phase: GamePhase, host: &mut impl MatchHost) {
        if matches!(phase, GamePhase::Reward) {
            processor::process_min_chip_kick(&mut self.state, host, self.config.auto_leave_chip_floor);
        }
    }

    fn enter_phase(&mut self, phase: GamePhase, clock: &impl Clock, host: &mut impl MatchHost) {
        match phase {
            GamePhase::Idle => {}
            GamePhase::Matching => {
                processor::process_match_kick(&mut self.state, host);
            }
            GamePhase::Preparing => {
                self.state.set_allow_bet(true);
                self.preparing_tick = 0;
                processor::process_apply_presences_leave(&mut self.state, &self.config, host);
                let bot_ids: Vec<UserId> = self
                    .state
                    .presences
                    .iter()
                    .filter(|p| p.is_bot())
                    .map(|p| p.user_id.clone())
                    .collect();
                let preparing_secs = self.config.preparing_duration.as_secs().max(1) as u32;
                self.bot_bet_schedules =
                    schedule_bot_bets(&bot_ids, self.config.tick_rate, preparing_secs, &mut self.rng);
            }
            GamePhase::Play => {
                self.state.setup_match_presence();
                self.bot_insurance_evaluated.clear();
                let mut engine = GameEngine::new_game(&mut self.state, &self.config, &mut self.rng);
                processor::process_new_game(
                    &mut self.state,
                    &mut engine,
                    &mut self.turn_engine,
                    &self.config,
                    clock,
                    host,
                );
                self.engine = Some(engine);
            }
            GamePhase::Reward => {
                if let Some(engine) = self.engine.as_mut() {
                    let results = processor::process_finish_game(&mut self.state, engine, host);
                    self.record_bot_hand_results(&results);
                }
                self.engine = None;
            }
            GamePhase::Init | GamePhase::Finish => {}
        }
    }

    /// Feeds each bot's just-settled outcome back into its profile so the
    /// next hand's `decide_bet_amount` can apply progressive betting (§4.6
    /// "Bet sizing"). A hand is a loss for a bot when it staked more than
    /// it got back, insurance included.
    fn record_bot_hand_results(&mut self, results: &[(UserId, crate::bet::BetResult, crate::wallet::SettlementReport)]) {
        for (user_id, result, _report) in results {
            let Some(profile) = self.bot_profiles.get_mut(user_id) else {
                continue;
            };
            let Some(bet) = self.state.user_bet(user_id) else {
                continue;
            };
            let staked = bet.total_staked();
            let was_loss = result.total_credit() < staked;
            profile.record_hand_result(staked, was_loss);
        }
    }

    fn process_current_phase(&mut self, clock: &impl Clock, host: &mut impl MatchHost) {
        if matches!(self.phase, GamePhase::Preparing) {
            self.preparing_tick += 1;
        }
        if matches!(self.phase, GamePhase::Play) {
            processor::process_turnbase(&mut self.state, &mut self.turn_engine, clock, host);
        }
    }

    fn inject_bot_decisions(&mut self, clock: &impl Clock, host: &mut impl MatchHost) {
        match self.phase {
            GamePhase::Preparing => self.inject_bot_bets(host),
            GamePhase::Play => {
                if self.state.is_allow_insurance() {
                    self.inject_bot_insurance(host);
                } else if self.state.is_allow_action() {
                    self.inject_bot_action(clock, host);
                }
            }
            _ => {}
        }
    }

    fn inject_bot_bets(&mut self, host: &mut impl MatchHost) {
        let due: Vec<UserId> = self
            .bot_bet_schedules
            .iter()
            .filter(|(_, sched)| sched.ticks.contains(&self.preparing_tick))
            .map(|(id, _)| id.clone())
            .collect();
        for bot_id in due {
            let Some(profile) = self.bot_profiles.get(&bot_id) else {
                continue;
            };
            let balance = host
                .read_wallets(std::slice::from_ref(&bot_id))
                .into_iter()
                .find_map(|(id, bal)| (id == bot_id).then_some(bal))
                .unwrap_or(0);
            let amount = decide_bet_amount(profile, balance, &self.config);
            if amount > 0 {
                processor::apply_bet(&mut self.state, host, &bot_id, BetCode::Normal, amount);
            }
        }
    }

    fn inject_bot_insurance(&mut self, host: &mut impl MatchHost) {
        let bot_ids: Vec<UserId> = self
            .state
            .playing_presences
            .iter()
            .filter(|p| p.is_bot() && !self.bot_insurance_evaluated.contains(&p.user_id))
            .map(|p| p.user_id.clone())
            .collect();
        for bot_id in bot_ids {
            self.bot_insurance_evaluated.insert(bot_id.clone());
            let Some(hand) = self.state.player_hand(&bot_id) else {
                continue;
            };
            let (cp, _, _) = hand.eval(HandPosition::First);
            let Some(profile) = self.bot_profiles.get(&bot_id) else {
                continue;
            };
            if should_take_insurance(cp.point, profile, &mut self.rng) {
                processor::apply_insurance(&mut self.state, host, &bot_id);
            }
        }
    }

    fn inject_bot_action(&mut self, clock: &impl Clock, host: &mut impl MatchHost) {
        let Some(current) = self.state.current_turn().cloned() else {
            return;
        };
        let Some(presence) = self.state.playing_presences.get(&current) else {
            return;
        };
        if !presence.is_bot() {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let legal = self.state.legal_actions(&current);
        if legal.is_empty() {
            return;
        }
        let pos = self.state.current_hand_position(&current);
        let dealer_up = self.state.dealer_hand().first.cards().first().map_or(0, |c| c.rank);
        let Some(hand) = self.state.player_hand(&current) else {
            return;
        };
        let Some(profile) = self.bot_profiles.get(&current) else {
            return;
        };
        let action = decide_action(hand, pos, dealer_up, &legal, profile, &mut self.rng);
        processor::apply_action(&mut self.state, engine, &mut self.turn_engine, clock, host, &current, action);
    }

    /// Builds a fresh [`MatchLabel`] reflecting the current phase and
    /// roster (§6 "Match label", refreshed on every transition).
    #[must_use]
    pub fn label(&self) -> MatchLabel {
        let profiles: Vec<LabelProfile> = self.state.label_profiles();
        MatchLabel {
            open: self.state.presences.len() < usize::from(self.config.max_seats),
            mark_unit: self.config.bet_unit,
            name: self.params.name.clone(),
            password: self.params.password.clone(),
            max_size: self.config.max_seats,
            match_id: self.params.match_id.clone(),
            game_state: self.phase.label().to_string(),
            size: self.state.presences.len() as u8,
            profiles,
            num_bot: self.params.num_bot,
        }
    }

    fn refresh_label(&self, host: &mut impl MatchHost) {
        if let Ok(bytes) = self.label().to_json() {
            host.match_label_update(&bytes);
        }
    }
}
