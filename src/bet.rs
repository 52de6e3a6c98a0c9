//! Per-hand bet bookkeeping (§3 "Bet").

use serde::{Deserialize, Serialize};

/// Chips staked on one or both of a player's sub-hands, plus any insurance
/// side-bet.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PlayerBet {
    /// Main bet on the first (original) hand.
    pub first: i64,
    /// Bet on the second hand, populated only after a split; equals
    /// `first` at the moment of the split (§4.3).
    pub second: i64,
    /// Insurance side-bet, at most half of `first` (§4.3).
    pub insurance: i64,
}

impl PlayerBet {
    /// A bet record with no chips staked yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total chips currently at risk across both hands and insurance.
    #[must_use]
    pub fn total_staked(&self) -> i64 {
        self.first + self.second + self.insurance
    }
}

/// A resolved bet owned by a specific seat, produced by settlement (§4.5
/// "Finish"). Each field is the amount *credited back* to the wallet for
/// that leg (zero on a loss, since the stake was already debited when
/// placed — see [`crate::wallet::settle_leg`]), already fee-adjusted on
/// wins, never negative.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BetResult {
    /// Chips credited back for the first hand.
    pub first_credit: i64,
    /// Chips credited back for the second hand, if a split occurred.
    pub second_credit: Option<i64>,
    /// Chips credited back from the insurance side-bet.
    pub insurance_credit: i64,
    /// Total fee withheld across all winning legs.
    pub fee_charged: i64,
}

impl BetResult {
    /// Total chips credited to the wallet in one settlement update (§6
    /// `wallets_update`).
    #[must_use]
    pub fn total_credit(&self) -> i64 {
        self.first_credit + self.second_credit.unwrap_or(0) + self.insurance_credit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_staked_sums_all_legs() {
        let bet = PlayerBet {
            first: 500,
            second: 500,
            insurance: 250,
        };
        assert_eq!(bet.total_staked(), 1_250);
    }

    #[test]
    fn bet_result_total_sums_credited_legs_only() {
        let result = BetResult {
            first_credit: 193,
            second_credit: Some(0),
            insurance_credit: 0,
            fee_charged: 7,
        };
        assert_eq!(result.total_credit(), 193);
    }
}
