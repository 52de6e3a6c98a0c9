//! Authoritative match state (§3 "Match state", §4.3 "Match state operations").
//!
//! Grounded on `entity/match_state.go`'s `MatchState`, generalized from its
//! ambient Nakama dependencies to a plain aggregate owned exclusively by
//! the tick driver (§5 "Scheduling model").

use std::collections::HashMap;

use crate::bet::{BetResult, PlayerBet};
use crate::card::Card;
use crate::error::{ActionError, BetError, InsuranceError};
use crate::hand::{Hand, HandPosition, HandType};
use crate::host::LabelProfile;
use crate::ids::UserId;
use crate::messages::ActionCode;
use crate::presence::{NoInteractCounters, Presence, PresenceSet};
use crate::wallet::{settle_insurance, settle_leg, SettlementReport};

/// The canonical, exclusively-owned state of one match instance.
#[derive(Debug)]
pub struct MatchState {
    /// All seated users, insertion-ordered.
    pub presences: PresenceSet,
    /// Participants of the current hand (bet before preparing ended).
    pub playing_presences: PresenceSet,
    /// Requested to leave but still mid-hand; applied at the matching
    /// boundary.
    pub leave_presences: PresenceSet,
    /// Consecutive-hands-without-interaction counters (idle kick).
    pub no_interact: NoInteractCounters,

    allow_bet: bool,
    allow_insurance: bool,
    allow_action: bool,

    visited: HashMap<UserId, bool>,
    user_bets: HashMap<UserId, PlayerBet>,
    user_last_bets: HashMap<UserId, i64>,
    user_hands: HashMap<UserId, Hand>,
    dealer_hand: Hand,
    current_turn: Option<UserId>,
    current_hand_pos: HashMap<UserId, HandPosition>,
    is_game_ended: bool,
}

impl MatchState {
    /// A fresh match state with no seats.
    #[must_use]
    pub fn new() -> Self {
        Self {
            presences: PresenceSet::new(),
            playing_presences: PresenceSet::new(),
            leave_presences: PresenceSet::new(),
            no_interact: NoInteractCounters::new(),
            allow_bet: false,
            allow_insurance: false,
            allow_action: false,
            visited: HashMap::new(),
            user_bets: HashMap::new(),
            user_last_bets: HashMap::new(),
            user_hands: HashMap::new(),
            dealer_hand: Hand::new(UserId::dealer()),
            current_turn: None,
            current_hand_pos: HashMap::new(),
            is_game_ended: false,
        }
    }

    /// §4.5 `NewGame`: clears per-hand state and resets every playing
    /// user's current sub-hand to `First`. Does not touch presences or
    /// the shoe (owned by the game engine).
    pub fn init_new_game(&mut self) {
        self.user_hands.clear();
        self.user_bets.clear();
        self.dealer_hand = Hand::new(UserId::dealer());
        self.current_turn = None;
        self.is_game_ended = false;
        self.current_hand_pos.clear();
        for presence in self.playing_presences.iter() {
            self.current_hand_pos
                .insert(presence.user_id.clone(), HandPosition::First);
        }
    }

    /// §4.3 "Visited set": marks every playing user unvisited.
    pub fn init_visited(&mut self) {
        self.visited.clear();
        for presence in self.playing_presences.iter() {
            self.visited.insert(presence.user_id.clone(), false);
        }
    }

    /// Marks a user visited on the first `Process` of their play-phase.
    pub fn set_visited(&mut self, user_id: &UserId) {
        self.visited.insert(user_id.clone(), true);
    }

    /// Whether every playing user has been visited this hand.
    #[must_use]
    pub fn is_all_visited(&self) -> bool {
        !self.visited.is_empty() && self.visited.values().all(|v| *v)
    }

    /// The dealer's hand.
    #[must_use]
    pub fn dealer_hand(&self) -> &Hand {
        &self.dealer_hand
    }

    /// Mutable access to the dealer's hand (dealing, draws).
    pub fn dealer_hand_mut(&mut self) -> &mut Hand {
        &mut self.dealer_hand
    }

    /// A player's hand, if they have one dealt this hand.
    #[must_use]
    pub fn player_hand(&self, user_id: &UserId) -> Option<&Hand> {
        self.user_hands.get(user_id)
    }

    /// Mutable access to a player's hand, creating one if absent.
    pub fn player_hand_mut(&mut self, user_id: &UserId) -> &mut Hand {
        self.user_hands
            .entry(user_id.clone())
            .or_insert_with(|| Hand::new(user_id.clone()))
    }

    /// All dealt player hands, in no particular order.
    pub fn player_hands(&self) -> impl Iterator<Item = &Hand> {
        self.user_hands.values()
    }

    /// Adds freshly dealt cards to a sub-hand; `user_id.is_dealer()` routes
    /// to the dealer's hand (§4.5 "Dealing sequence").
    pub fn add_cards(&mut self, user_id: &UserId, pos: HandPosition, cards: &[Card]) {
        let hand = if user_id.is_dealer() {
            &mut self.dealer_hand
        } else {
            self.user_hands
                .entry(user_id.clone())
                .or_insert_with(|| Hand::new(user_id.clone()))
        };
        let sub = match pos {
            HandPosition::First => &mut hand.first,
            HandPosition::Second => hand.second.get_or_insert_with(crate::hand::SubHand::new),
        };
        for &card in cards {
            sub.add_card(card);
        }
    }

    /// Whether betting is currently accepted.
    #[must_use]
    pub fn is_allow_bet(&self) -> bool {
        self.allow_bet
    }

    /// Sets whether betting is currently accepted.
    pub fn set_allow_bet(&mut self, allow: bool) {
        self.allow_bet = allow;
    }

    /// Whether insurance is currently offered.
    #[must_use]
    pub fn is_allow_insurance(&self) -> bool {
        self.allow_insurance
    }

    /// Sets whether insurance is currently offered.
    pub fn set_allow_insurance(&mut self, allow: bool) {
        self.allow_insurance = allow;
    }

    /// Whether play-phase actions are currently accepted.
    #[must_use]
    pub fn is_allow_action(&self) -> bool {
        self.allow_action
    }

    /// Sets whether play-phase actions are currently accepted.
    pub fn set_allow_action(&mut self, allow: bool) {
        self.allow_action = allow;
    }

    /// The user whose turn it currently is.
    #[must_use]
    pub fn current_turn(&self) -> Option<&UserId> {
        self.current_turn.as_ref()
    }

    /// Sets the current turn.
    pub fn set_current_turn(&mut self, user_id: Option<UserId>) {
        self.current_turn = user_id;
    }

    /// Which sub-hand a user is currently playing.
    #[must_use]
    pub fn current_hand_position(&self, user_id: &UserId) -> HandPosition {
        self.current_hand_pos
            .get(user_id)
            .copied()
            .unwrap_or(HandPosition::First)
    }

    /// Sets which sub-hand a user is currently playing.
    pub fn set_current_hand_position(&mut self, user_id: &UserId, pos: HandPosition) {
        self.current_hand_pos.insert(user_id.clone(), pos);
    }

    /// A user's current bet record, if any.
    #[must_use]
    pub fn user_bet(&self, user_id: &UserId) -> Option<&PlayerBet> {
        self.user_bets.get(user_id)
    }

    /// §4.3 `IsCanBet`: `bet.chips ≤ balance`, regardless of whether a bet
    /// was already placed this hand (chips accumulate).
    #[must_use]
    pub fn is_can_bet(&self, chips: i64, balance: i64) -> bool {
        chips <= balance
    }

    /// §4.3 `AddBet`: accumulates `first`, records the new running total
    /// as the "last bet" for rebet purposes, and closes the action gate
    /// (actions require a dealt hand first). Resets the idle counter.
    pub fn add_bet(&mut self, user_id: &UserId, chips: i64) {
        let bet = self.user_bets.entry(user_id.clone()).or_default();
        bet.first += chips;
        self.user_last_bets.insert(user_id.clone(), bet.first);
        self.allow_action = false;
        self.no_interact.reset(user_id);
    }

    /// §4.3 `Rebet`: restores `first` from `userLastBets`.
    ///
    /// # Errors
    /// Returns [`BetError::NoPreviousBet`] if nothing was bet last hand,
    /// [`BetError::InsufficientFunds`] if the balance can no longer cover
    /// it.
    pub fn rebet(&mut self, user_id: &UserId, balance: i64) -> Result<i64, BetError> {
        let last = *self
            .user_last_bets
            .get(user_id)
            .ok_or(BetError::NoPreviousBet)?;
        if last > balance {
            return Err(BetError::InsufficientFunds);
        }
        let bet = self.user_bets.entry(user_id.clone()).or_default();
        bet.first = last;
        self.no_interact.reset(user_id);
        Ok(last)
    }

    /// §4.3 `DoubleBet`: doubles the current placement, or the previous
    /// placement if nothing is placed yet this hand. Returns the
    /// newly-staked increment (not the new total) — doubling an existing
    /// stake only owes the wallet the amount added, matching the source's
    /// `DoubleBet` return value used to compute the wallet debit.
    ///
    /// # Errors
    /// Returns [`BetError::NoPreviousBet`] if there is neither a current
    /// nor previous bet, [`BetError::InsufficientFunds`] if short.
    pub fn double_bet(&mut self, user_id: &UserId, balance: i64) -> Result<i64, BetError> {
        if let Some(bet) = self.user_bets.get(user_id).copied() {
            if bet.first == 0 {
                return self.double_from_last(user_id, balance);
            }
            let doubled = bet.first * 2;
            if doubled > balance {
                return Err(BetError::InsufficientFunds);
            }
            let entry = self.user_bets.get_mut(user_id).expect("checked above");
            entry.first = doubled;
            self.user_last_bets.insert(user_id.clone(), doubled);
            self.no_interact.reset(user_id);
            Ok(bet.first)
        } else {
            self.double_from_last(user_id, balance)
        }
    }

    fn double_from_last(&mut self, user_id: &UserId, balance: i64) -> Result<i64, BetError> {
        let last = *self
            .user_last_bets
            .get(user_id)
            .ok_or(BetError::NoPreviousBet)?;
        let doubled = last * 2;
        if doubled > balance {
            return Err(BetError::InsufficientFunds);
        }
        self.user_last_bets.insert(user_id.clone(), doubled);
        let bet = self.user_bets.entry(user_id.clone()).or_default();
        bet.first = doubled;
        self.no_interact.reset(user_id);
        Ok(doubled)
    }

    /// Refunds and clears a seat's insurance stake when the dealer checks
    /// for, and does not have, blackjack (§4.7 "insurance round"). Returns
    /// the refunded amount, `0` if none was staked.
    pub fn void_insurance(&mut self, user_id: &UserId) -> i64 {
        let Some(bet) = self.user_bets.get_mut(user_id) else {
            return 0;
        };
        let refund = bet.insurance;
        bet.insurance = 0;
        refund
    }

    /// §4.3 `IsCanInsuranceBet`: `balance*2 ≥ first`.
    #[must_use]
    pub fn is_can_insurance_bet(&self, user_id: &UserId, balance: i64) -> bool {
        self.user_bets
            .get(user_id)
            .is_some_and(|bet| balance * 2 >= bet.first)
    }

    /// §4.3 `InsuranceBet`: sets `insurance = first / 2`.
    ///
    /// # Errors
    /// Returns [`InsuranceError::NotOffered`] if the user has no bet yet,
    /// [`InsuranceError::InsufficientFunds`] if the pre-check fails.
    pub fn insurance_bet(&mut self, user_id: &UserId, balance: i64) -> Result<i64, InsuranceError> {
        if !self.is_can_insurance_bet(user_id, balance) {
            return Err(InsuranceError::InsufficientFunds);
        }
        let bet = self
            .user_bets
            .get_mut(user_id)
            .ok_or(InsuranceError::NotOffered)?;
        bet.insurance = bet.first / 2;
        Ok(bet.insurance)
    }

    /// §4.3 `IsCanDoubleDownBet`: balance must cover the existing stake at
    /// `pos`.
    #[must_use]
    pub fn is_can_double_down(&self, user_id: &UserId, balance: i64, pos: HandPosition) -> bool {
        let Some(bet) = self.user_bets.get(user_id) else {
            return false;
        };
        let existing = match pos {
            HandPosition::First => bet.first,
            HandPosition::Second => bet.second,
        };
        balance >= existing
    }

    /// §4.3 `DoubleDownBet`: doubles the stake at `pos`, returning the
    /// added amount. Caller must then deal exactly one card.
    ///
    /// # Errors
    /// Returns [`ActionError::CannotDouble`] if the user has no bet.
    pub fn double_down_bet(&mut self, user_id: &UserId, pos: HandPosition) -> Result<i64, ActionError> {
        let bet = self
            .user_bets
            .get_mut(user_id)
            .ok_or(ActionError::CannotDouble)?;
        let existing = match pos {
            HandPosition::First => &mut bet.first,
            HandPosition::Second => &mut bet.second,
        };
        let added = *existing;
        *existing *= 2;
        Ok(added)
    }

    /// §4.3 `IsCanSplitHand`: `(allow, enough_chip)`.
    #[must_use]
    pub fn is_can_split_hand(&self, user_id: &UserId, balance: i64) -> (bool, bool) {
        let Some(bet) = self.user_bets.get(user_id) else {
            return (false, false);
        };
        let enough_chip = balance >= bet.first;
        if !enough_chip {
            return (false, false);
        }
        let allow = self
            .user_hands
            .get(user_id)
            .is_some_and(Hand::can_split);
        (allow, enough_chip)
    }

    /// §4.3 `SplitHand`: sets `second = first`, splits the dealt cards,
    /// and returns the added stake. Caller must then deal one card into
    /// each sub-hand.
    ///
    /// # Errors
    /// Returns [`ActionError::CannotSplit`] if the hand cannot split.
    pub fn split_hand(&mut self, user_id: &UserId) -> Result<i64, ActionError> {
        let hand = self
            .user_hands
            .get_mut(user_id)
            .ok_or(ActionError::CannotSplit)?;
        if !hand.can_split() {
            return Err(ActionError::CannotSplit);
        }
        hand.split();
        let bet = self.user_bets.entry(user_id.clone()).or_default();
        bet.second = bet.first;
        Ok(bet.second)
    }

    /// §4.3 "Legal actions": computed for the current turn's active
    /// sub-hand. Empty iff the sub-hand cannot draw; callers treat an
    /// empty list as "auto-advance".
    #[must_use]
    pub fn legal_actions(&self, user_id: &UserId) -> Vec<ActionCode> {
        let mut result = Vec::new();
        let Some(hand) = self.user_hands.get(user_id) else {
            return result;
        };
        let pos = self.current_hand_position(user_id);
        if hand.can_draw(pos) {
            result.push(ActionCode::Hit);
            let two_cards = match pos {
                HandPosition::First => hand.first.cards().len() == 2,
                HandPosition::Second => hand.second.as_ref().is_some_and(|s| s.cards().len() == 2),
            };
            if two_cards {
                result.push(ActionCode::Double);
                if hand.can_split() {
                    result.push(ActionCode::Split);
                }
            }
            result.push(ActionCode::Stay);
        }
        result
    }

    /// §4.3 `IsReadyToPlay`: enough seated presences and at least one bet
    /// placed.
    #[must_use]
    pub fn is_ready_to_play(&self, min_presences: u8) -> bool {
        if self.presences.len() < usize::from(min_presences) {
            return false;
        }
        self.presences
            .iter()
            .any(|p| self.is_bet(&p.user_id))
    }

    /// Whether a user has placed a (non-zero) bet this hand.
    #[must_use]
    pub fn is_bet(&self, user_id: &UserId) -> bool {
        self.user_bets.get(user_id).is_some_and(|b| b.first > 0)
    }

    /// §4.3 `SetupMatchPresence`: snapshots currently-seated-with-bet
    /// users into `playing_presences`, the canonical participant set for
    /// the hand, and bumps every participant's idle counter.
    pub fn setup_match_presence(&mut self) {
        self.playing_presences.clear();
        let participants: Vec<Presence> = self
            .presences
            .iter()
            .filter(|p| self.is_bet(&p.user_id))
            .cloned()
            .collect();
        for presence in participants {
            self.no_interact.increment(&presence.user_id);
            self.playing_presences.insert(presence);
        }
    }

    /// §4.5 `Finish` / §4.7 "Wallet updates": settles every playing hand
    /// against the dealer's, applying the VIP fee table, and returns the
    /// per-user results alongside a settlement report.
    ///
    /// The `bet.insurance > 0` branch below mirrors `getPlayerBetResult`'s
    /// own early return on a lost insurance bet. In both this crate and the
    /// source, the "playing"-round entry (`process_turnbase` /
    /// `ProcessTurnbase`) already zeroes every seat's insurance stake
    /// before this point whenever the dealer isn't holding blackjack, so
    /// the branch never actually fires there — it only fires in the
    /// dealer-blackjack case, where it falls through to the win arm below
    /// instead. Kept for parity with the source's shape rather than
    /// realized dead code cut for elegance (see DESIGN.md).
    pub fn finish(&mut self) -> Vec<(UserId, BetResult, SettlementReport)> {
        let (_, _, dealer_type) = self.dealer_hand.eval(HandPosition::First);
        let dealer_blackjack = matches!(dealer_type, HandType::Blackjack);
        let mut out = Vec::new();
        for presence in self.playing_presences.iter() {
            let user_id = presence.user_id.clone();
            let vip_level = presence.vip_level;
            let bet = self.user_bets.get(&user_id).copied().unwrap_or_default();
            let Some(hand) = self.user_hands.get(&user_id) else {
                continue;
            };

            let mut result = BetResult::default();
            let mut report = SettlementReport::default();

            if bet.insurance > 0 {
                let (credited, fee) = settle_insurance(bet.insurance, dealer_blackjack, vip_level);
                result.insurance_credit = credited;
                report.add_leg(credited, fee);
                if let Some(user_bet) = self.user_bets.get_mut(&user_id) {
                    user_bet.insurance = 0;
                }
                if !dealer_blackjack {
                    result.fee_charged = report.fee_charged;
                    out.push((user_id, result, report));
                    continue;
                }
            }

            let (r1, r2) = hand.compare(&self.dealer_hand);
            if bet.first > 0 {
                let (credited, fee) = settle_leg(bet.first, r1, vip_level);
                result.first_credit = credited;
                report.add_leg(credited, fee);
            }
            if bet.second > 0 {
                let (credited, fee) = settle_leg(bet.second, r2, vip_level);
                result.second_credit = Some(credited);
                report.add_leg(credited, fee);
            }

            result.fee_charged = report.fee_charged;
            out.push((user_id, result, report));
        }
        out
    }

    /// Whether the current hand has ended (dealer finished playing,
    /// settlement pending).
    #[must_use]
    pub fn is_game_ended(&self) -> bool {
        self.is_game_ended
    }

    /// Sets whether the current hand has ended.
    pub fn set_game_ended(&mut self, ended: bool) {
        self.is_game_ended = ended;
    }

    /// Profiles for the match label (§6 "Match label").
    #[must_use]
    pub fn label_profiles(&self) -> Vec<LabelProfile> {
        self.presences
            .iter()
            .map(|p| LabelProfile {
                user_id: p.user_id.clone(),
                user_name: p.user_name.clone(),
                user_sid: match &p.participant {
                    crate::presence::Participant::Human { session_id } => session_id.clone(),
                    crate::presence::Participant::Bot => String::new(),
                },
            })
            .collect()
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Suit;

    fn user(n: &str) -> UserId {
        UserId::from(n)
    }

    #[test]
    fn add_bet_accumulates_and_closes_action_gate() {
        let mut state = MatchState::new();
        state.set_allow_action(true);
        state.add_bet(&user("u1"), 100);
        state.add_bet(&user("u1"), 50);
        assert_eq!(state.user_bet(&user("u1")).unwrap().first, 150);
        assert!(!state.is_allow_action());
    }

    #[test]
    fn rebet_restores_last_bet() {
        let mut state = MatchState::new();
        state.add_bet(&user("u1"), 200);
        // Simulate a new hand: user_bets cleared, userLastBets retained.
        state.user_bets.clear();
        let restored = state.rebet(&user("u1"), 1_000).unwrap();
        assert_eq!(restored, 200);
        assert_eq!(state.user_bet(&user("u1")).unwrap().first, 200);
    }

    #[test]
    fn rebet_without_prior_bet_errors() {
        let mut state = MatchState::new();
        assert_eq!(
            state.rebet(&user("u1"), 1_000).unwrap_err(),
            BetError::NoPreviousBet
        );
    }

    #[test]
    fn double_bet_doubles_current_placement_and_returns_the_added_increment() {
        let mut state = MatchState::new();
        state.add_bet(&user("u1"), 100);
        let added = state.double_bet(&user("u1"), 1_000).unwrap();
        assert_eq!(added, 100);
        assert_eq!(state.user_bet(&user("u1")).unwrap().first, 200);
    }

    #[test]
    fn legal_actions_empty_when_hand_cannot_draw() {
        let mut state = MatchState::new();
        let hand = state.player_hand_mut(&user("u1"));
        hand.first.add_card(Card::new(Suit::Spades, 10));
        hand.first.add_card(Card::new(Suit::Hearts, 10));
        hand.first.add_card(Card::new(Suit::Clubs, 5));
        assert!(state.legal_actions(&user("u1")).is_empty());
    }

    #[test]
    fn legal_actions_include_double_and_split_on_two_matching_cards() {
        let mut state = MatchState::new();
        state.add_bet(&user("u1"), 100);
        let hand = state.player_hand_mut(&user("u1"));
        hand.first.add_card(Card::new(Suit::Spades, 8));
        hand.first.add_card(Card::new(Suit::Hearts, 8));
        let actions = state.legal_actions(&user("u1"));
        assert!(actions.contains(&ActionCode::Hit));
        assert!(actions.contains(&ActionCode::Double));
        assert!(actions.contains(&ActionCode::Split));
        assert!(actions.contains(&ActionCode::Stay));
    }

    #[test]
    fn finish_settles_natural_blackjack_scenario() {
        let mut state = MatchState::new();
        state.presences.insert(Presence::human(
            user("u1"),
            "U1".into(),
            0,
            "sess".into(),
        ));
        state.add_bet(&user("u1"), 100);
        state.setup_match_presence();
        let hand = state.player_hand_mut(&user("u1"));
        hand.first.add_card(Card::new(Suit::Spades, 1));
        hand.first.add_card(Card::new(Suit::Hearts, 13));
        state.dealer_hand_mut().first.add_card(Card::new(Suit::Clubs, 7));
        state.dealer_hand_mut().first.add_card(Card::new(Suit::Diamonds, 9));
        state.dealer_hand_mut().first.add_card(Card::new(Suit::Spades, 8));

        let results = state.finish();
        assert_eq!(results.len(), 1);
        let (uid, result, _report) = &results[0];
        assert_eq!(uid, &user("u1"));
        assert_eq!(result.first_credit, 193);
    }
}
