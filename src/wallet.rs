//! Settlement fee table and wallet delta bookkeeping (§4.7 "Wallet updates").
//!
//! Grounded on `entity/common.go`'s `feeGameByLvPercent` map and
//! `GetFeeGameByLevel` fallback in the original source.

use crate::ids::UserId;

/// Default fee percentage applied when a VIP level has no table entry.
pub const DEFAULT_FEE_PERCENT: u8 = 5;

/// Returns the settlement fee percentage for a VIP level (§4.7).
///
/// Levels 0–1 pay 7%, 2 pays 6%, 3–5 pay 5%, 6–9 pay 4%; anything else
/// (including levels the source's table never listed, e.g. 5) falls back
/// to [`DEFAULT_FEE_PERCENT`].
#[must_use]
pub const fn fee_percent_for_level(level: u8) -> u8 {
    match level {
        0 | 1 => 7,
        2 => 6,
        3 | 4 => 5,
        6..=9 => 4,
        _ => DEFAULT_FEE_PERCENT,
    }
}

/// Settles one staked leg (main, second, or insurance) against a
/// `{-1, 0, +1}` comparison result (§8 scenario 1).
///
/// The stake was already debited from the wallet when placed, so a loss
/// credits nothing back. A push returns the stake untouched (no fee — no
/// profit was made). A win returns the stake plus a profit equal to the
/// stake (1:1, §4.5: "Blackjack natural … pays 1:1 under this design"),
/// with the VIP fee levied on the profit portion only before the total is
/// credited back. Returns `(credited, fee_charged)`.
#[must_use]
pub fn settle_leg(stake: i64, compare_result: i8, vip_level: u8) -> (i64, i64) {
    match compare_result.signum() {
        -1 => (0, 0),
        0 => (stake, 0),
        _ => {
            let profit = stake;
            let pct = i64::from(fee_percent_for_level(vip_level));
            let fee = profit * pct / 100;
            (stake + profit - fee, fee)
        }
    }
}

/// Settles the insurance side-bet, which pays 2:1 rather than 1:1 (§4.5).
/// `dealer_blackjack` selects win vs. loss; there is no push for insurance.
#[must_use]
pub fn settle_insurance(stake: i64, dealer_blackjack: bool, vip_level: u8) -> (i64, i64) {
    if stake == 0 {
        return (0, 0);
    }
    if dealer_blackjack {
        let profit = stake * 2;
        let pct = i64::from(fee_percent_for_level(vip_level));
        let fee = profit * pct / 100;
        (stake + profit - fee, fee)
    } else {
        (0, 0)
    }
}

/// One wallet adjustment, ready to hand to [`crate::host::MatchHost::wallets_update`].
#[derive(Debug, Clone, Copy)]
pub struct WalletUpdate<'a> {
    /// The seat whose wallet changes.
    pub user_id: &'a UserId,
    /// Signed chip delta; negative for a placed bet, positive (credited,
    /// net of fee) for a settlement payout.
    pub delta: i64,
}

/// Per-user settlement summary accumulated during `Finish` (§4.5, §4.7),
/// reported to the host's reporting hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementReport {
    /// Total chips credited back across all legs (0 on an all-loss hand).
    pub credited: i64,
    /// Fee charged against any winning legs.
    pub fee_charged: i64,
}

impl SettlementReport {
    /// Accumulates one leg's settlement into the running report.
    pub fn add_leg(&mut self, credited: i64, fee: i64) {
        self.credited += credited;
        self.fee_charged += fee;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_table_matches_documented_brackets() {
        assert_eq!(fee_percent_for_level(0), 7);
        assert_eq!(fee_percent_for_level(1), 7);
        assert_eq!(fee_percent_for_level(2), 6);
        assert_eq!(fee_percent_for_level(3), 5);
        assert_eq!(fee_percent_for_level(4), 5);
        assert_eq!(fee_percent_for_level(5), DEFAULT_FEE_PERCENT);
        assert_eq!(fee_percent_for_level(6), 4);
        assert_eq!(fee_percent_for_level(9), 4);
        assert_eq!(fee_percent_for_level(42), DEFAULT_FEE_PERCENT);
    }

    #[test]
    fn loss_credits_nothing_back() {
        assert_eq!(settle_leg(100, -1, 0), (0, 0));
    }

    #[test]
    fn push_returns_stake_untaxed() {
        assert_eq!(settle_leg(100, 0, 0), (100, 0));
    }

    #[test]
    fn natural_blackjack_scenario_credits_193() {
        // §8 scenario 1: VIP 0, stake 100, win -> total 200, fee 7% of the
        // 100 profit = 7, credited back = 193.
        let (credited, fee) = settle_leg(100, 1, 0);
        assert_eq!(fee, 7);
        assert_eq!(credited, 193);
    }

    #[test]
    fn insurance_pays_two_to_one_on_dealer_blackjack() {
        let (credited, fee) = settle_insurance(100, true, 0);
        // profit = 200, fee = 7% of 200 = 14, credited = 100 + 200 - 14.
        assert_eq!(fee, 14);
        assert_eq!(credited, 286);
        assert_eq!(settle_insurance(100, false, 0), (0, 0));
    }
}
