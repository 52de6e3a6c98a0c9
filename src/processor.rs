//! Message processing and per-tick game-flow orchestration (§4.7 "Message
//! processor").
//!
//! Grounded on `usecase/processor/processor.go`'s `Processor` methods,
//! generalized off the ambient Nakama runtime/context parameters onto the
//! explicit [`Clock`]/[`MatchHost`] collaborators this crate threads
//! everywhere else (§9 "Context with processor package"). Bot decisions are
//! applied through the same mutators real requests use rather than being
//! round-tripped through serialized wire messages, since nothing here
//! needs the bot's "turn" to cross a transport boundary.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::card::Card;
use crate::clock::Clock;
use crate::config::MatchConfig;
use crate::game_engine::GameEngine;
use crate::hand::{HandPosition, HandType};
use crate::host::{MatchEvent, MatchHost, Opcode, WalletUpdate};
use crate::ids::UserId;
use crate::match_state::MatchState;
use crate::messages::{
    ActionCode, BetCode, SerializablePosition, SyncTableHand, SyncTableSnapshot, UpdateDeal,
    UpdateTable, UserInTableInfo, WireError,
};
use crate::presence::Presence;
use crate::turn_scheduler::{Phase, Round, TurnBaseEngine};

const LOG_TARGET: &str = "blackjack_table_core::processor";

fn balance_of(host: &impl MatchHost, user_id: &UserId) -> i64 {
    host.read_wallets(std::slice::from_ref(user_id))
        .into_iter()
        .find_map(|(id, bal)| (&id == user_id).then_some(bal))
        .unwrap_or(0)
}

fn encode(target: &'static str, opcode: Opcode, msg: &impl serde::Serialize) -> Vec<u8> {
    serde_json::to_vec(msg).unwrap_or_else(|err| {
        warn!(target: target, opcode = ?opcode, %err, "failed to serialize broadcast payload, suppressing");
        Vec::new()
    })
}

fn broadcast_table(host: &mut impl MatchHost, msg: &UpdateTable, to: Option<&[UserId]>) {
    let payload = encode(LOG_TARGET, Opcode::UpdateTable, msg);
    host.broadcast(Opcode::UpdateTable, &payload, to, None, true);
}

fn broadcast_deal(host: &mut impl MatchHost, msg: &UpdateDeal) {
    let payload = encode(LOG_TARGET, Opcode::UpdateDeal, msg);
    host.broadcast(Opcode::UpdateDeal, &payload, None, None, true);
}

fn reject(host: &mut impl MatchHost, user_id: &UserId, error: WireError) {
    debug!(target: LOG_TARGET, %user_id, ?error, "rejected request");
    broadcast_table(
        host,
        &UpdateTable::error(user_id.clone(), error),
        Some(std::slice::from_ref(user_id)),
    );
}

/// Applies a wallet delta, logging the full payload on failure rather than
/// silently dropping it (§7 "wallet backend failures are logged with the
/// full payload").
fn apply_wallet_update(host: &mut impl MatchHost, updates: &[WalletUpdate<'_>]) {
    if let Err(err) = host.wallets_update(updates, true) {
        error!(target: LOG_TARGET, ?updates, ?err, "wallet update failed");
    }
}

/// §4.7 `notifyUpdateBet`: acknowledges a bet/rebet/double and debits the
/// wallet by the increment just staked (not the new accumulated total).
fn notify_bet_accepted(state: &MatchState, host: &mut impl MatchHost, user_id: &UserId, added: i64) {
    let total = state.user_bet(user_id).map(|b| b.first).unwrap_or(0);
    broadcast_table(host, &UpdateTable::bet_accepted(user_id.clone(), total), None);
    apply_wallet_update(host, &[WalletUpdate { user_id, delta: -added }]);
}

/// §4.7 `ProcessMessageFromUser` / `OPCODE_REQUEST_BET`.
pub fn apply_bet(state: &mut MatchState, host: &mut impl MatchHost, user_id: &UserId, code: BetCode, amount: i64) {
    if !state.is_allow_bet() {
        return;
    }
    let balance = balance_of(host, user_id);
    state.no_interact.reset(user_id);
    let outcome = match code {
        BetCode::Normal => {
            if state.is_can_bet(amount, balance) {
                state.add_bet(user_id, amount);
                Ok(amount)
            } else {
                Err(())
            }
        }
        BetCode::Rebet => state.rebet(user_id, balance).map_err(|_| ()),
        BetCode::Double => state.double_bet(user_id, balance).map_err(|_| ()),
    };
    match outcome {
        Ok(added) => notify_bet_accepted(state, host, user_id, added),
        Err(()) => reject(host, user_id, WireError::ChipNotEnough),
    }
}

/// §4.7 `ProcessMessageFromUser` / `OPCODE_REQUEST_DECLARE_CARDS` /
/// `BLACKJACK_ACTION_INSURANCE`: allowed any time the insurance round is
/// open, independent of whose turn it currently is.
pub fn apply_insurance(state: &mut MatchState, host: &mut impl MatchHost, user_id: &UserId) {
    if !state.is_allow_insurance() {
        return;
    }
    let balance = balance_of(host, user_id);
    match state.insurance_bet(user_id, balance) {
        Ok(chip) => {
            broadcast_table(
                host,
                &UpdateTable::bet_accepted(user_id.clone(), chip),
                None,
            );
            apply_wallet_update(host, &[WalletUpdate { user_id, delta: -chip }]);
        }
        Err(_) => reject(host, user_id, WireError::ChipNotEnough),
    }
}

/// Deals and announces one card, returning it.
fn deal_and_announce(
    engine: &mut GameEngine,
    state: &mut MatchState,
    host: &mut impl MatchHost,
    user_id: &UserId,
    pos: HandPosition,
) -> Option<Card> {
    let mut cards = engine.deal(1).ok()?;
    let card = cards.pop()?;
    state.add_cards(user_id, pos, std::slice::from_ref(&card));
    broadcast_deal(
        host,
        &UpdateDeal {
            user_id: user_id.clone(),
            position: SerializablePosition::from(pos),
            suit: card.suit as u8,
            rank: card.rank,
        },
    );
    Some(card)
}

/// Whether the active seat should move to its split second hand, or
/// otherwise advance the scheduler to the next phase (§4.7: every terminal
/// action on the first hand checks for an un-started second hand before
/// handing off the turn).
fn advance_turn(
    state: &mut MatchState,
    turn_engine: &mut TurnBaseEngine,
    clock: &impl Clock,
    user_id: &UserId,
    pos: HandPosition,
) {
    let has_fresh_second = matches!(pos, HandPosition::First)
        && state
            .player_hand(user_id)
            .and_then(|h| h.second.as_ref())
            .is_some_and(|s| s.cards().len() == 2);
    if has_fresh_second {
        state.set_current_hand_position(user_id, HandPosition::Second);
        turn_engine.rephase(clock);
    } else {
        turn_engine.next_phase(clock);
    }
}

/// §4.7 `ProcessMessageFromUser` / `OPCODE_REQUEST_DECLARE_CARDS` (hit,
/// stand, double, split — insurance is [`apply_insurance`]).
#[allow(clippy::too_many_arguments)]
pub fn apply_action(
    state: &mut MatchState,
    engine: &mut GameEngine,
    turn_engine: &mut TurnBaseEngine,
    clock: &impl Clock,
    host: &mut impl MatchHost,
    user_id: &UserId,
    code: ActionCode,
) {
    if code == ActionCode::Insurance {
        apply_insurance(state, host, user_id);
        return;
    }
    if !state.is_allow_action() || state.current_turn() != Some(user_id) {
        debug!(target: LOG_TARGET, %user_id, ?code, "rejected declare-cards request: not this seat's turn");
        return;
    }
    let pos = state.current_hand_position(user_id);
    match code {
        ActionCode::Double => {
            if !state.is_can_double_down(user_id, balance_of(host, user_id), pos) {
                debug!(target: LOG_TARGET, %user_id, "rejected double: balance does not cover the stake");
                return;
            }
            if let Ok(added) = state.double_down_bet(user_id, pos) {
                notify_bet_accepted(state, host, user_id, added);
                deal_and_announce(engine, state, host, user_id, pos);
                advance_turn(state, turn_engine, clock, user_id, pos);
            }
        }
        ActionCode::Hit => {
            let can_hit = state.player_hand(user_id).is_some_and(|h| h.can_draw(pos));
            if !can_hit {
                return;
            }
            deal_and_announce(engine, state, host, user_id, pos);
            let still_can_hit = state.player_hand(user_id).is_some_and(|h| h.can_draw(pos));
            if still_can_hit {
                turn_engine.rephase(clock);
            } else {
                advance_turn(state, turn_engine, clock, user_id, pos);
            }
        }
        ActionCode::Stay => {
            advance_turn(state, turn_engine, clock, user_id, pos);
        }
        ActionCode::Split => {
            let (allow, _) = state.is_can_split_hand(user_id, balance_of(host, user_id));
            if !allow {
                return;
            }
            if let Ok(added) = state.split_hand(user_id) {
                notify_bet_accepted(state, host, user_id, added);
                broadcast_table(host, &UpdateTable::split_accepted(user_id.clone()), None);
                deal_and_announce(engine, state, host, user_id, HandPosition::First);
                deal_and_announce(engine, state, host, user_id, HandPosition::Second);
                turn_engine.rephase(clock);
            }
        }
        ActionCode::Insurance => unreachable!("handled above"),
    }
}

/// §4.7 `OPCODE_REQUEST_INFO_TABLE`: a personalized snapshot of whose turn
/// it is and whether insurance is open, sent only to the requester.
pub fn apply_info_table(state: &MatchState, host: &mut impl MatchHost, user_id: &UserId) {
    let msg = UpdateTable {
        in_turn: state.current_turn().cloned(),
        insurance_turn_entered: Some(state.is_allow_insurance()),
        ..UpdateTable::default()
    };
    broadcast_table(host, &msg, Some(std::slice::from_ref(user_id)));
}

/// §4.7 `notifyUpdateTurn`: the active seat alone receives its legal
/// actions; everyone else is told only whose turn it now is.
fn notify_update_turn(state: &MatchState, host: &mut impl MatchHost, user_id: &UserId) {
    for presence in state.playing_presences.iter() {
        let legal = (presence.user_id == *user_id).then(|| state.legal_actions(user_id));
        broadcast_table(
            host,
            &UpdateTable::turn_update(user_id.clone(), legal),
            Some(std::slice::from_ref(&presence.user_id)),
        );
    }
}

/// §4.5 `NewGame` / `ProcessNewGame`: rebuilds the shoe, deals the opening
/// two cards to every playing seat then the dealer, and configures the
/// turn scheduler for this hand's insurance and playing rounds.
pub fn process_new_game(
    state: &mut MatchState,
    engine: &mut GameEngine,
    turn_engine: &mut TurnBaseEngine,
    config: &MatchConfig,
    clock: &impl Clock,
    host: &mut impl MatchHost,
) {
    let user_ids: Vec<UserId> = state.playing_presences.iter().map(|p| p.user_id.clone()).collect();
    if let Err(err) = engine.deal_initial(state, &user_ids) {
        error!(target: LOG_TARGET, ?err, "shoe exhausted dealing the opening hand, ending it early");
        state.set_game_ended(true);
        return;
    }
    for user_id in &user_ids {
        if let Some(hand) = state.player_hand(user_id) {
            for &card in hand.first.cards() {
                broadcast_deal(
                    host,
                    &UpdateDeal {
                        user_id: user_id.clone(),
                        position: SerializablePosition::First,
                        suit: card.suit as u8,
                        rank: card.rank,
                    },
                );
            }
        }
    }
    // The dealer's hole card is announced face-down: suit/rank 0 stand in
    // for "unspecified" until `revealDealerHiddenCard` (§4.7).
    let up_card = state.dealer_hand().first.cards()[0];
    broadcast_deal(
        host,
        &UpdateDeal {
            user_id: UserId::dealer(),
            position: SerializablePosition::First,
            suit: up_card.suit as u8,
            rank: up_card.rank,
        },
    );

    turn_engine.config(
        user_ids,
        vec![
            Round::new("insurance", vec![Phase::new("main", config.insurance_phase_duration)], true),
            Round::new("playing", vec![Phase::new("main", config.playing_phase_duration)], false),
        ],
        clock,
    );
}

/// §4.7 `ProcessTurnbase`: advances the scheduler one tick and reacts to
/// round/turn/phase boundaries — opening insurance, checking the dealer
/// for blackjack, and rotating the active seat.
pub fn process_turnbase(
    state: &mut MatchState,
    turn_engine: &mut TurnBaseEngine,
    clock: &impl Clock,
    host: &mut impl MatchHost,
) {
    let info = turn_engine.tick(clock);
    if info.is_new_round {
        match info.round_code {
            "insurance" => {
                state.set_allow_bet(false);
                state.set_allow_action(false);
                if state.dealer_hand().dealer_potential_blackjack() && !state.is_allow_insurance() {
                    state.set_allow_insurance(true);
                    broadcast_table(host, &UpdateTable::insurance_turn_entered(), None);
                } else {
                    turn_engine.next_round(clock);
                    return;
                }
            }
            "playing" => {
                if state.dealer_hand().dealer_potential_blackjack() {
                    let (_, _, dealer_type) = state.dealer_hand().eval(HandPosition::First);
                    if matches!(dealer_type, HandType::Blackjack) {
                        state.set_game_ended(true);
                        return;
                    }
                    broadcast_table(host, &UpdateTable::banker_not_blackjack(), None);
                    let playing: Vec<UserId> = state.playing_presences.iter().map(|p| p.user_id.clone()).collect();
                    for user_id in playing {
                        // The stake was already debited at placement and insurance
                        // loses outright when the dealer checks out as not
                        // blackjack (§4.5) — voiding it here only clears the bet
                        // record and acknowledges it on the wire, no wallet delta.
                        if state.void_insurance(&user_id) > 0 {
                            broadcast_table(host, &UpdateTable::insurance_voided(user_id.clone()), None);
                        }
                    }
                }
                state.init_visited();
                state.set_allow_bet(false);
                state.set_allow_insurance(false);
                state.set_allow_action(true);
            }
            _ => {}
        }
    }
    if info.is_new_turn && info.round_code == "playing" && state.is_all_visited() {
        state.set_game_ended(true);
        return;
    }
    if info.is_new_phase && info.round_code == "playing" {
        state.set_visited(&info.user_id);
        state.set_current_turn(Some(info.user_id.clone()));
        notify_update_turn(state, host, &info.user_id);
    }
}

/// §4.5 `ProcessFinishGame`: reveals the dealer's hole card, plays the
/// dealer out, settles every hand, and broadcasts the results.
pub fn process_finish_game(
    state: &mut MatchState,
    engine: &mut GameEngine,
    host: &mut impl MatchHost,
) -> Vec<(UserId, crate::bet::BetResult, crate::wallet::SettlementReport)> {
    let hole_card = state.dealer_hand().first.cards().get(1).copied();
    if let Some(card) = hole_card {
        broadcast_deal(
            host,
            &UpdateDeal {
                user_id: UserId::dealer(),
                position: SerializablePosition::First,
                suit: card.suit as u8,
                rank: card.rank,
            },
        );
    }
    while state.dealer_hand().dealer_must_draw() {
        if let Some(card) = deal_and_announce(engine, state, host, &UserId::dealer(), HandPosition::First) {
            let _ = card;
        } else {
            break;
        }
    }

    let results = GameEngine::finish(state);
    let total_credited: i64 = results.iter().map(|(_, r, _)| r.total_credit()).sum();
    let total_fee: i64 = results.iter().map(|(_, _, r)| r.fee_charged).sum();
    info!(
        target: LOG_TARGET,
        hands = results.len(),
        total_credited,
        total_fee,
        "hand settled"
    );
    let mut updates = Vec::with_capacity(results.len());
    for (user_id, result, _report) in &results {
        updates.push(WalletUpdate {
            user_id,
            delta: result.total_credit(),
        });
    }
    apply_wallet_update(host, &updates);

    let payload = encode(
        LOG_TARGET,
        Opcode::UpdateFinish,
        &results
            .iter()
            .map(|(user_id, result, _)| (user_id.clone(), *result))
            .collect::<Vec<_>>(),
    );
    host.broadcast(Opcode::UpdateFinish, &payload, None, None, true);

    let wallet_payload = encode(
        LOG_TARGET,
        Opcode::UpdateWallet,
        &results
            .iter()
            .map(|(user_id, result, _)| (user_id.clone(), result.total_credit()))
            .collect::<Vec<_>>(),
    );
    host.broadcast(Opcode::UpdateWallet, &wallet_payload, None, None, true);

    results
}

/// §4.7 `OPCODE_REQUEST_SYNC_TABLE`: a rejoining seat's personalized
/// snapshot — every hand dealt so far (dealer's and every playing seat's),
/// whose turn it is, and the requester's own legal actions if it is
/// currently their turn. The source splits this across its DEAL and TABLE
/// opcodes; bundled into one payload here since both describe the same
/// rejoin moment and §6 treats the exact wire shape as a companion
/// artifact.
pub fn apply_sync_table(state: &MatchState, host: &mut impl MatchHost, user_id: &UserId) {
    let to_pairs = |cards: &[Card]| cards.iter().map(|c| (c.suit as u8, c.rank)).collect();
    let mut hands = vec![SyncTableHand {
        user_id: UserId::dealer(),
        first_cards: to_pairs(state.dealer_hand().first.cards()),
        second_cards: Vec::new(),
    }];
    for presence in state.playing_presences.iter() {
        if let Some(hand) = state.player_hand(&presence.user_id) {
            hands.push(SyncTableHand {
                user_id: presence.user_id.clone(),
                first_cards: to_pairs(hand.first.cards()),
                second_cards: hand.second.as_ref().map(|s| to_pairs(s.cards())).unwrap_or_default(),
            });
        }
    }
    let legal_actions = (state.current_turn() == Some(user_id)).then(|| state.legal_actions(user_id));
    let snapshot = SyncTableSnapshot {
        hands,
        in_turn: state.current_turn().cloned(),
        legal_actions,
    };
    let payload = encode(LOG_TARGET, Opcode::UpdateDeal, &snapshot);
    host.broadcast(Opcode::UpdateDeal, &payload, Some(std::slice::from_ref(user_id)), None, true);
}

/// Broadcasts the full presence roster with wallet balances (§4.7
/// `USER_IN_TABLE_INFO`), emitted whenever a seat joins.
fn broadcast_user_in_table_info(state: &MatchState, host: &mut impl MatchHost) {
    let all_users: Vec<UserId> = state.presences.iter().map(|p| p.user_id.clone()).collect();
    let balances = host.read_wallets(&all_users);
    let wallet_chips = all_users
        .iter()
        .map(|u| balances.iter().find(|(id, _)| id == u).map_or(0, |(_, bal)| *bal))
        .collect();
    let info = UserInTableInfo {
        presences: all_users,
        playing_presences: state.playing_presences.iter().map(|p| p.user_id.clone()).collect(),
        leave_presences: state.leave_presences.iter().map(|p| p.user_id.clone()).collect(),
        wallet_chips,
    };
    let payload = encode(LOG_TARGET, Opcode::UserInTableInfo, &info);
    host.broadcast(Opcode::UserInTableInfo, &payload, None, None, true);
}

/// §4.7 "Presence lifecycle" — join: dedups against a pending leave (a
/// reconnect cancels the queued departure), inserts into `presences`,
/// emits the audit event, and broadcasts the full roster.
pub fn process_join(state: &mut MatchState, host: &mut impl MatchHost, joining: Vec<Presence>) {
    for presence in joining {
        state.leave_presences.remove(&presence.user_id);
        state.presences.insert(presence.clone());
        host.emit_event(MatchEvent::Join {
            user_id: presence.user_id.clone(),
        });
    }
    broadcast_user_in_table_info(state, host);
}

/// §4.7 "Presence lifecycle" — leave: removed immediately outside a hand;
/// queued into `leave_presences` for `process_match_kick` to apply at the
/// matching boundary if the seat is mid-hand (`mid_hand` is decided by the
/// caller from the current state-machine phase).
pub fn process_leave(state: &mut MatchState, host: &mut impl MatchHost, leaving: &[UserId], mid_hand: bool) {
    for user_id in leaving {
        if mid_hand && state.playing_presences.contains(user_id) {
            if let Some(presence) = state.presences.get(user_id).cloned() {
                state.leave_presences.insert(presence);
            }
        } else {
            state.presences.remove(user_id);
            state.no_interact.remove(user_id);
            host.emit_event(MatchEvent::Leave {
                user_id: user_id.clone(),
            });
        }
    }
    broadcast_user_in_table_info(state, host);
}

/// §4.7 "Minimum-chip kick": at reward exit, every seated user whose
/// wallet is below `floor` is handed to the host's kick primitive
/// (delegated — the core only identifies candidates, per §4.7).
pub fn process_min_chip_kick(state: &mut MatchState, host: &mut impl MatchHost, floor: i64) {
    let all_users: Vec<UserId> = state.presences.iter().map(|p| p.user_id.clone()).collect();
    let candidates: Vec<UserId> = host
        .read_wallets(&all_users)
        .into_iter()
        .filter(|(_, balance)| *balance < floor)
        .map(|(user_id, _)| user_id)
        .collect();
    if candidates.is_empty() {
        return;
    }
    for user_id in &candidates {
        state.presences.remove(user_id);
        state.no_interact.remove(user_id);
    }
    host.match_kick(&candidates);
}

/// §4.7 "Idle kick": presences auto-leave once their counter has gone a
/// configured number of consecutive hands without interacting.
pub fn process_apply_presences_leave(state: &mut MatchState, config: &MatchConfig, host: &mut impl MatchHost) {
    let due: Vec<UserId> = state
        .presences
        .iter()
        .filter(|p| state.no_interact.get(&p.user_id) >= config.idle_kick_threshold)
        .map(|p| p.user_id.clone())
        .collect();
    for user_id in &due {
        state.leave_presences.insert(state.presences.get(user_id).cloned().unwrap_or_else(|| {
            crate::presence::Presence::bot(user_id.clone(), String::new())
        }));
    }
    process_match_kick(state, host);
}

/// §4.7 `ProcessMatchKick` / `KICK_OFF_THE_TABLE`: removes every presence
/// queued in `leave_presences` at the matching/reward boundary.
pub fn process_match_kick(state: &mut MatchState, host: &mut impl MatchHost) {
    let leaving: Vec<UserId> = state.leave_presences.iter().map(|p| p.user_id.clone()).collect();
    if leaving.is_empty() {
        return;
    }
    for user_id in &leaving {
        state.presences.remove(user_id);
        state.no_interact.remove(user_id);
    }
    host.match_kick(&leaving);
    let payload = encode(LOG_TARGET, Opcode::KickOffTheTable, &leaving);
    host.broadcast(Opcode::KickOffTheTable, &payload, None, None, true);
    state.leave_presences.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::host::{LabelProfile, MatchEvent, WalletError};
    use crate::presence::Presence;
    use crate::rng::MatchRng;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FakeHost {
        balances: RefCell<HashMap<UserId, i64>>,
        broadcasts: RefCell<Vec<(Opcode, Vec<u8>)>>,
    }

    impl FakeHost {
        fn new() -> Self {
            Self {
                balances: RefCell::new(HashMap::new()),
                broadcasts: RefCell::new(Vec::new()),
            }
        }

        fn set_balance(&self, user_id: &UserId, amount: i64) {
            self.balances.borrow_mut().insert(user_id.clone(), amount);
        }
    }

    impl MatchHost for FakeHost {
        fn broadcast(&mut self, opcode: Opcode, payload: &[u8], _to: Option<&[UserId]>, _from: Option<&UserId>, _reliable: bool) {
            self.broadcasts.borrow_mut().push((opcode, payload.to_vec()));
        }
        fn match_label_update(&mut self, _label_json: &[u8]) {}
        fn match_kick(&mut self, _users: &[UserId]) {}
        fn wallets_update(&mut self, updates: &[WalletUpdate<'_>], _atomic: bool) -> Result<(), WalletError> {
            let mut balances = self.balances.borrow_mut();
            for update in updates {
                *balances.entry(update.user_id.clone()).or_insert(0) += update.delta;
            }
            Ok(())
        }
        fn read_wallets(&self, users: &[UserId]) -> Vec<(UserId, i64)> {
            let balances = self.balances.borrow();
            users.iter().map(|u| (u.clone(), balances.get(u).copied().unwrap_or(0))).collect()
        }
        fn emit_event(&mut self, _event: MatchEvent) {}
    }

    fn user(n: &str) -> UserId {
        UserId::from(n)
    }

    #[test]
    fn normal_bet_debits_only_the_placed_increment() {
        let mut state = MatchState::new();
        state.set_allow_bet(true);
        let mut host = FakeHost::new();
        host.set_balance(&user("u1"), 1_000);
        apply_bet(&mut state, &mut host, &user("u1"), BetCode::Normal, 200);
        assert_eq!(*host.balances.borrow().get(&user("u1")).unwrap(), -200);
        assert_eq!(state.user_bet(&user("u1")).unwrap().first, 200);
    }

    #[test]
    fn bet_rejected_when_balance_too_low_emits_error() {
        let mut state = MatchState::new();
        state.set_allow_bet(true);
        let mut host = FakeHost::new();
        host.set_balance(&user("u1"), 50);
        apply_bet(&mut state, &mut host, &user("u1"), BetCode::Normal, 200);
        assert!(state.user_bet(&user("u1")).is_none());
        assert_eq!(host.broadcasts.borrow().len(), 1);
    }

    #[test]
    fn double_debits_only_the_added_increment() {
        let mut state = MatchState::new();
        state.set_allow_bet(true);
        let mut host = FakeHost::new();
        host.set_balance(&user("u1"), 1_000);
        apply_bet(&mut state, &mut host, &user("u1"), BetCode::Normal, 100);
        apply_bet(&mut state, &mut host, &user("u1"), BetCode::Double, 0);
        assert_eq!(state.user_bet(&user("u1")).unwrap().first, 200);
        assert_eq!(*host.balances.borrow().get(&user("u1")).unwrap(), -200);
    }

    #[test]
    fn new_game_deals_and_configures_turn_engine() {
        let mut state = MatchState::new();
        let config = MatchConfig::default();
        let mut rng = MatchRng::from_seed(9);
        state.presences.insert(Presence::human(user("u1"), "U1".into(), 0, "s".into()));
        state.add_bet(&user("u1"), 100);
        state.setup_match_presence();
        let mut engine = GameEngine::new_game(&mut state, &config, &mut rng);
        let mut turn_engine = TurnBaseEngine::new();
        let clock = TestClock::new();
        let mut host = FakeHost::new();
        process_new_game(&mut state, &mut engine, &mut turn_engine, &config, &clock, &mut host);
        assert_eq!(state.player_hand(&user("u1")).unwrap().first.cards().len(), 2);
        assert_eq!(turn_engine.current_player(), &user("u1"));
        assert!(!host.broadcasts.borrow().is_empty());
    }

    #[allow(dead_code)]
    fn unused_label_profile_reference(_: LabelProfile) {}

    #[test]
    fn losing_insurance_voids_the_bet_without_crediting_a_refund() {
        let mut state = MatchState::new();
        let presence = Presence::human(user("u1"), "U1".into(), 0, "s".into());
        state.presences.insert(presence.clone());
        state.add_bet(&user("u1"), 100);
        state.setup_match_presence();
        state.insurance_bet(&user("u1"), 1_000).unwrap();
        assert_eq!(state.user_bet(&user("u1")).unwrap().insurance, 50);

        // Dealer shows an ace but the hole card is not a ten: not blackjack.
        state.dealer_hand_mut().first.add_card(Card::new(crate::card::Suit::Spades, 1));
        state.dealer_hand_mut().first.add_card(Card::new(crate::card::Suit::Hearts, 5));

        let mut turn_engine = TurnBaseEngine::new();
        let clock = TestClock::new();
        turn_engine.config(
            vec![user("u1")],
            vec![Round::new("playing", vec![Phase::new("main", Duration::from_secs(30))], false)],
            &clock,
        );
        let mut host = FakeHost::new();
        host.set_balance(&user("u1"), 1_000);

        process_turnbase(&mut state, &mut turn_engine, &clock, &mut host);

        assert_eq!(state.user_bet(&user("u1")).unwrap().insurance, 0);
        assert_eq!(*host.balances.borrow().get(&user("u1")).unwrap(), 1_000);
        assert!(host
            .broadcasts
            .borrow()
            .iter()
            .any(|(opcode, _)| *opcode == Opcode::UpdateTable));
    }

    #[test]
    fn join_cancels_a_pending_leave_and_broadcasts_roster() {
        let mut state = MatchState::new();
        let presence = Presence::human(user("u1"), "U1".into(), 0, "s".into());
        state.leave_presences.insert(presence.clone());
        let mut host = FakeHost::new();
        process_join(&mut state, &mut host, vec![presence]);
        assert!(!state.leave_presences.contains(&user("u1")));
        assert!(state.presences.contains(&user("u1")));
        assert_eq!(host.broadcasts.borrow().len(), 1);
        assert_eq!(host.broadcasts.borrow()[0].0, Opcode::UserInTableInfo);
    }

    #[test]
    fn leave_outside_a_hand_removes_immediately() {
        let mut state = MatchState::new();
        state.presences.insert(Presence::human(user("u1"), "U1".into(), 0, "s".into()));
        let mut host = FakeHost::new();
        process_leave(&mut state, &mut host, &[user("u1")], false);
        assert!(!state.presences.contains(&user("u1")));
        assert!(!state.leave_presences.contains(&user("u1")));
    }

    #[test]
    fn leave_mid_hand_is_queued_not_removed() {
        let mut state = MatchState::new();
        let presence = Presence::human(user("u1"), "U1".into(), 0, "s".into());
        state.presences.insert(presence.clone());
        state.playing_presences.insert(presence);
        let mut host = FakeHost::new();
        process_leave(&mut state, &mut host, &[user("u1")], true);
        assert!(state.presences.contains(&user("u1")));
        assert!(state.leave_presences.contains(&user("u1")));
    }

    #[test]
    fn min_chip_kick_only_removes_users_below_the_floor() {
        let mut state = MatchState::new();
        state.presences.insert(Presence::human(user("rich"), "Rich".into(), 0, "s".into()));
        state.presences.insert(Presence::human(user("poor"), "Poor".into(), 0, "s".into()));
        let mut host = FakeHost::new();
        host.set_balance(&user("rich"), 10_000);
        host.set_balance(&user("poor"), 50);
        process_min_chip_kick(&mut state, &mut host, 100);
        assert!(state.presences.contains(&user("rich")));
        assert!(!state.presences.contains(&user("poor")));
    }

    #[test]
    fn sync_table_reports_legal_actions_only_to_the_active_seat() {
        let mut state = MatchState::new();
        state.presences.insert(Presence::human(user("u1"), "U1".into(), 0, "s".into()));
        state.add_bet(&user("u1"), 100);
        state.setup_match_presence();
        state.set_current_turn(Some(user("u1")));
        state.set_allow_action(true);
        let hand = state.player_hand_mut(&user("u1"));
        hand.first.add_card(Card::new(crate::card::Suit::Spades, 8));
        hand.first.add_card(Card::new(crate::card::Suit::Hearts, 4));
        let mut host = FakeHost::new();
        apply_sync_table(&state, &mut host, &user("u1"));
        let (opcode, payload) = &host.broadcasts.borrow()[0];
        assert_eq!(*opcode, Opcode::UpdateDeal);
        let snapshot: crate::messages::SyncTableSnapshot = serde_json::from_slice(payload).unwrap();
        assert_eq!(snapshot.in_turn, Some(user("u1")));
        assert!(snapshot.legal_actions.unwrap().contains(&ActionCode::Hit));
    }
}
