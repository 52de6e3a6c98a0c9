//! New-game setup, dealing, and dealer policy (§4.5 "Game engine").
//!
//! Grounded on `usecase/engine/engine.go`'s thin delegation layer over
//! `entity.MatchState` plus the shoe.

use crate::bet::BetResult;
use crate::card::Shoe;
use crate::config::MatchConfig;
use crate::error::ShoeError;
use crate::hand::HandPosition;
use crate::ids::UserId;
use crate::match_state::MatchState;
use crate::rng::MatchRng;
use crate::wallet::SettlementReport;

/// Owns the shoe for one hand and exposes dealing/settlement operations
/// against a [`MatchState`]. Rebuilt every new hand (§3 "Shoe").
pub struct GameEngine {
    shoe: Shoe,
}

impl GameEngine {
    /// §4.5 `NewGame`: rebuilds and shuffles the shoe, then resets the
    /// match state for a fresh hand.
    pub fn new_game(state: &mut MatchState, config: &MatchConfig, rng: &mut MatchRng) -> Self {
        let _ = config.shoe_decks; // shoe size is fixed at 8 decks per §3; see DESIGN.md
        state.init_new_game();
        Self {
            shoe: Shoe::new(rng.inner_mut()),
        }
    }

    /// §4.1 `Deal(n)`: delegates to the shoe.
    ///
    /// # Errors
    /// Returns [`ShoeError::Exhausted`] if fewer than `n` cards remain.
    pub fn deal(&mut self, n: usize) -> Result<Vec<crate::card::Card>, ShoeError> {
        self.shoe.deal(n)
    }

    /// §4.5 "Dealing sequence at new hand": two cards to each playing
    /// user's first sub-hand, then two to the dealer's.
    ///
    /// # Errors
    /// Propagates [`ShoeError::Exhausted`] (§8 scenario 6).
    pub fn deal_initial(&mut self, state: &mut MatchState, user_ids: &[UserId]) -> Result<(), ShoeError> {
        for user_id in user_ids {
            let cards = self.deal(2)?;
            state.add_cards(user_id, HandPosition::First, &cards);
        }
        let dealer_cards = self.deal(2)?;
        state.add_cards(&UserId::dealer(), HandPosition::First, &dealer_cards);
        Ok(())
    }

    /// §4.5 `Draw`: deals one card to the given user's sub-hand.
    ///
    /// # Errors
    /// Propagates [`ShoeError::Exhausted`].
    pub fn draw(&mut self, state: &mut MatchState, user_id: &UserId, pos: HandPosition) -> Result<(), ShoeError> {
        let cards = self.deal(1)?;
        state.add_cards(user_id, pos, &cards);
        Ok(())
    }

    /// §4.5 Dealer play, executed at Reward entry: while `DealerMustDraw`,
    /// deal one card to the dealer's (first) hand.
    ///
    /// # Errors
    /// Propagates [`ShoeError::Exhausted`].
    pub fn play_dealer(&mut self, state: &mut MatchState) -> Result<(), ShoeError> {
        while state.dealer_hand().dealer_must_draw() {
            let cards = self.deal(1)?;
            state.add_cards(&UserId::dealer(), HandPosition::First, &cards);
        }
        Ok(())
    }

    /// §4.5 `Finish`: settles every playing hand. Dealer play must have
    /// already been resolved via [`GameEngine::play_dealer`].
    pub fn finish(state: &mut MatchState) -> Vec<(UserId, BetResult, SettlementReport)> {
        state.finish()
    }

    /// Cards remaining in the shoe.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.shoe.remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::Presence;

    #[test]
    fn deal_initial_gives_two_cards_each_then_two_to_dealer() {
        let mut state = MatchState::new();
        let config = MatchConfig::default();
        let mut rng = MatchRng::from_seed(7);
        state.presences.insert(Presence::human(
            UserId::from("u1"),
            "U1".into(),
            0,
            "s".into(),
        ));
        state.add_bet(&UserId::from("u1"), 100);
        state.setup_match_presence();
        let mut engine = GameEngine::new_game(&mut state, &config, &mut rng);
        engine
            .deal_initial(&mut state, &[UserId::from("u1")])
            .unwrap();
        assert_eq!(state.player_hand(&UserId::from("u1")).unwrap().first.cards().len(), 2);
        assert_eq!(state.dealer_hand().first.cards().len(), 2);
        assert_eq!(engine.remaining(), crate::card::SHOE_SIZE - 4);
    }

    #[test]
    fn shoe_exhaustion_surfaces_as_error() {
        let mut state = MatchState::new();
        let config = MatchConfig::default();
        let mut rng = MatchRng::from_seed(1);
        let mut engine = GameEngine::new_game(&mut state, &config, &mut rng);
        // Drain the shoe down to 1 card, then request 2.
        engine.deal(crate::card::SHOE_SIZE - 1).unwrap();
        let err = engine.deal(2).unwrap_err();
        assert_eq!(
            err,
            ShoeError::Exhausted {
                requested: 2,
                remaining: 1
            }
        );
    }

    #[test]
    fn dealer_draws_until_past_seventeen_hard() {
        let mut state = MatchState::new();
        let config = MatchConfig::default();
        let mut rng = MatchRng::from_seed(3);
        let mut engine = GameEngine::new_game(&mut state, &config, &mut rng);
        state
            .dealer_hand_mut()
            .first
            .add_card(crate::card::Card::new(crate::card::Suit::Spades, 10));
        state
            .dealer_hand_mut()
            .first
            .add_card(crate::card::Card::new(crate::card::Suit::Hearts, 6));
        engine.play_dealer(&mut state).unwrap();
        assert!(!state.dealer_hand().dealer_must_draw());
        assert!(state.dealer_hand().first.cp().point >= 17);
    }
}
