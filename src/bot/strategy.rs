//! Basic-strategy decision tables and the randomness layer (§4.6 "Bot logic").
//!
//! Grounded on `entity/bot_logic.go`'s `basicStrategy`/`softTotalStrategy`/
//! `hardTotalStrategy`/`ShouldSplit`/`ShouldDoubleDown`/`ShouldTakeInsurance`,
//! generalized off the ambient `math/rand` calls onto an explicit
//! [`MatchRng`].

use crate::bot::profile::BotProfile;
use crate::config::{round_to_chip_ladder, MatchConfig};
use crate::hand::{CPoint, Hand, HandPosition};
use crate::messages::ActionCode;
use crate::rng::MatchRng;

/// Computes the bet amount a bot places this hand (§4.6 "Bet sizing").
#[must_use]
pub fn decide_bet_amount(profile: &BotProfile, balance: i64, _config: &MatchConfig) -> i64 {
    let preset = profile.risk_level;
    let mut base = (balance as f64 * preset.base_bet_pct()) as i64;
    if profile.progressive_betting && profile.last_bet > 0 && profile.last_hand_was_loss {
        base = ((profile.last_bet as f64) * 2.0) as i64;
    }
    let max_amount = ((balance as f64 * preset.max_bet_pct()) as i64).min(balance);
    base = base.min(max_amount);
    round_to_chip_ladder(base).min(balance)
}

/// Dealer up-card value for strategy lookups: 2-9 face, 10/J/Q/K → 10,
/// ace → 11 (§4.6 uses the "soft" ace value for comparisons, unlike the
/// player hand's own evaluation which uses 1 as the base value).
#[must_use]
pub const fn dealer_strategy_value(up_card_rank: u8) -> u8 {
    match up_card_rank {
        1 => 11,
        2..=9 => up_card_rank,
        _ => 10,
    }
}

fn soft_total_strategy(point: u8, dealer: u8) -> ActionCode {
    match point {
        20 | 21 => ActionCode::Stay,
        19 => {
            if dealer >= 6 {
                ActionCode::Stay
            } else {
                ActionCode::Hit
            }
        }
        18 => {
            if dealer >= 9 {
                ActionCode::Hit
            } else {
                ActionCode::Stay
            }
        }
        17 => {
            if dealer >= 7 {
                ActionCode::Hit
            } else {
                ActionCode::Stay
            }
        }
        _ => ActionCode::Hit,
    }
}

fn hard_total_strategy(point: u8, dealer: u8) -> ActionCode {
    match point {
        17..=21 => ActionCode::Stay,
        13..=16 => {
            if dealer <= 6 {
                ActionCode::Stay
            } else {
                ActionCode::Hit
            }
        }
        12 => {
            if (4..=6).contains(&dealer) {
                ActionCode::Stay
            } else {
                ActionCode::Hit
            }
        }
        _ => ActionCode::Hit,
    }
}

/// §4.6 "Action strategy": the textbook basic-strategy table, dispatched
/// on whether the active sub-hand is soft.
#[must_use]
pub fn basic_strategy_action(cp: CPoint, is_soft: bool, dealer_up_value: u8) -> ActionCode {
    if is_soft {
        soft_total_strategy(cp.point, dealer_up_value)
    } else {
        hard_total_strategy(cp.point, dealer_up_value)
    }
}

/// §4.6 "Split" table: always split A/8, never 10/5, 9 splits against
/// {2-6,8,9}, 7 against 2-7, 6 against 2-6, 4 against 5-6, 2/3 against 2-7.
#[must_use]
pub const fn should_split(card_rank: u8, dealer_up_value: u8) -> bool {
    match card_rank {
        1 => true,
        8 => true,
        10..=13 => false,
        9 => !(dealer_up_value == 7 || dealer_up_value == 10 || dealer_up_value == 11),
        7 => dealer_up_value >= 2 && dealer_up_value <= 7,
        6 => dealer_up_value >= 2 && dealer_up_value <= 6,
        5 => false,
        4 => dealer_up_value == 5 || dealer_up_value == 6,
        2 | 3 => dealer_up_value >= 2 && dealer_up_value <= 7,
        _ => false,
    }
}

/// §4.6 "Double" table: always on hard 11; hard 10 vs 2-9; hard 9 vs 3-6;
/// soft 18/17 vs 3-6; soft 16/15 vs 4-6; soft 14/13 vs 5-6; none below.
#[must_use]
pub const fn should_double(point: u8, is_soft: bool, dealer_up_value: u8) -> bool {
    if is_soft {
        match point {
            18 | 17 => dealer_up_value >= 3 && dealer_up_value <= 6,
            16 | 15 => dealer_up_value >= 4 && dealer_up_value <= 6,
            14 | 13 => dealer_up_value >= 5 && dealer_up_value <= 6,
            _ => false,
        }
    } else {
        match point {
            11 => true,
            10 => dealer_up_value >= 2 && dealer_up_value <= 9,
            9 => dealer_up_value >= 3 && dealer_up_value <= 6,
            _ => false,
        }
    }
}

/// §4.6 "Insurance": take if dealer shows an ace and the hand totals
/// `{20, 21}`; otherwise take with probability `riskTolerance/100 × 30%`.
#[must_use]
pub fn should_take_insurance(point: u8, profile: &BotProfile, rng: &mut MatchRng) -> bool {
    if point == 20 || point == 21 {
        return true;
    }
    let threshold = u32::from(profile.risk_tolerance) * 30 / 100;
    u32::from(rng.roll_percent()) < threshold
}

/// §4.6 "Randomness layer": with probability `riskTolerance%`, a `STAY`
/// decision has a 20% chance of being replaced with `HIT` when legal.
#[must_use]
pub fn apply_randomness_layer(
    action: ActionCode,
    legal: &[ActionCode],
    profile: &BotProfile,
    rng: &mut MatchRng,
) -> ActionCode {
    if matches!(action, ActionCode::Stay)
        && u32::from(rng.roll_percent()) < u32::from(profile.risk_tolerance)
        && rng.roll_percent() < 20
        && legal.contains(&ActionCode::Hit)
    {
        return ActionCode::Hit;
    }
    action
}

/// Full action decision for one turn: split/double override the base
/// strategy table when legal and indicated, then the randomness layer is
/// applied last (§4.6 `DecideGameAction`).
#[must_use]
pub fn decide_action(
    hand: &Hand,
    pos: HandPosition,
    dealer_up_card_rank: u8,
    legal: &[ActionCode],
    profile: &BotProfile,
    rng: &mut MatchRng,
) -> ActionCode {
    let (cp, ace_text, _) = hand.eval(pos);
    let is_soft = ace_text == "soft";
    let dealer_value = dealer_strategy_value(dealer_up_card_rank);

    if legal.contains(&ActionCode::Split) {
        let sub = match pos {
            HandPosition::First => &hand.first,
            HandPosition::Second => hand.second.as_ref().expect("split implies second exists is unreachable here"),
        };
        if let Some(&card) = sub.cards().first() {
            if should_split(card.rank, dealer_value) {
                return ActionCode::Split;
            }
        }
    }
    if legal.contains(&ActionCode::Double) && should_double(cp.point, is_soft, dealer_value) {
        return ActionCode::Double;
    }
    let base = basic_strategy_action(cp, is_soft, dealer_value);
    let base = if legal.contains(&base) { base } else { ActionCode::Stay };
    apply_randomness_layer(base, legal, profile, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::profile::RiskLevel;

    #[test]
    fn soft_eighteen_hits_against_strong_dealer_upcard() {
        assert_eq!(
            basic_strategy_action(CPoint { point: 18, min_point: 8, max_point: 18 }, true, 9),
            ActionCode::Hit
        );
        assert_eq!(
            basic_strategy_action(CPoint { point: 18, min_point: 8, max_point: 18 }, true, 6),
            ActionCode::Stay
        );
    }

    #[test]
    fn hard_twelve_stays_only_in_the_narrow_dealer_band() {
        assert_eq!(
            basic_strategy_action(CPoint { point: 12, min_point: 12, max_point: 12 }, false, 5),
            ActionCode::Stay
        );
        assert_eq!(
            basic_strategy_action(CPoint { point: 12, min_point: 12, max_point: 12 }, false, 7),
            ActionCode::Hit
        );
    }

    #[test]
    fn split_table_always_splits_aces_never_tens() {
        assert!(should_split(1, 5));
        assert!(!should_split(10, 5));
        assert!(!should_split(5, 5));
    }

    #[test]
    fn double_table_always_doubles_hard_eleven() {
        assert!(should_double(11, false, 2));
        assert!(should_double(11, false, 9));
        assert!(!should_double(8, false, 5));
    }

    #[test]
    fn insurance_always_taken_on_twenty_or_twenty_one() {
        let profile = BotProfile::new(RiskLevel::Conservative, 0);
        let mut rng = MatchRng::from_seed(1);
        assert!(should_take_insurance(21, &profile, &mut rng));
        assert!(should_take_insurance(20, &profile, &mut rng));
    }

    #[test]
    fn bet_amount_never_exceeds_balance() {
        let profile = BotProfile::new(RiskLevel::Aggressive, 50);
        let config = MatchConfig::default();
        let amount = decide_bet_amount(&profile, 150, &config);
        assert!(amount <= 150);
    }
}
