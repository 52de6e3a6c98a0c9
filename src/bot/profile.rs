//! Risk-tolerance presets and per-bot bankroll state (§4.6 "Bot logic").
//!
//! Grounded on `entity/bot_logic.go`'s `BlackjackBotLogic` /
//! `BettingStrategy` / `SetRiskLevel`, collapsed from a stateful mutator
//! into a plain preset table plus a small per-bot record.

/// Named risk presets (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    /// Risk tolerance 10-30, base 2%, max 10%.
    Conservative,
    /// Risk tolerance 30-70, base 5%, max 20%.
    Moderate,
    /// Risk tolerance 70-100, base 10%, max 40%.
    Aggressive,
}

impl RiskLevel {
    /// The `[low, high]` risk-tolerance range this preset draws from.
    #[must_use]
    pub const fn tolerance_range(self) -> (u8, u8) {
        match self {
            Self::Conservative => (10, 30),
            Self::Moderate => (30, 70),
            Self::Aggressive => (70, 100),
        }
    }

    /// Base bet percentage of balance.
    #[must_use]
    pub const fn base_bet_pct(self) -> f64 {
        match self {
            Self::Conservative => 0.02,
            Self::Moderate => 0.05,
            Self::Aggressive => 0.10,
        }
    }

    /// Maximum bet percentage of balance.
    #[must_use]
    pub const fn max_bet_pct(self) -> f64 {
        match self {
            Self::Conservative => 0.10,
            Self::Moderate => 0.20,
            Self::Aggressive => 0.40,
        }
    }
}

/// Per-bot decision-making state, carried across hands within a match.
#[derive(Debug, Clone)]
pub struct BotProfile {
    /// The preset this bot was assigned at seat time.
    pub risk_level: RiskLevel,
    /// Concrete risk tolerance in `[0, 100]`, drawn once from the preset's
    /// range at construction.
    pub risk_tolerance: u8,
    /// Whether a martingale-style bet increase follows a loss.
    pub progressive_betting: bool,
    /// The stake placed last hand, `0` if none yet or the bot is new.
    pub last_bet: i64,
    /// Whether the last hand was a net loss for this bot (drives
    /// progressive betting).
    pub last_hand_was_loss: bool,
}

impl BotProfile {
    /// A fresh profile for `risk_level`, with `risk_tolerance` rolled from
    /// its range using `roll` (expected to return a value in `[0, 100)`,
    /// e.g. [`crate::rng::MatchRng::range_inclusive`]).
    #[must_use]
    pub fn new(risk_level: RiskLevel, tolerance_roll: u8) -> Self {
        let (low, high) = risk_level.tolerance_range();
        let span = high - low;
        let tolerance = low + (tolerance_roll % (span + 1));
        Self {
            risk_level,
            risk_tolerance: tolerance,
            progressive_betting: true,
            last_bet: 0,
            last_hand_was_loss: false,
        }
    }

    /// Records the outcome of the hand just settled, for next hand's
    /// progressive-betting decision.
    pub fn record_hand_result(&mut self, stake: i64, was_loss: bool) {
        self.last_bet = stake;
        self.last_hand_was_loss = was_loss;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_is_clamped_into_the_preset_range() {
        let profile = BotProfile::new(RiskLevel::Conservative, 255);
        assert!(profile.risk_tolerance >= 10 && profile.risk_tolerance <= 30);
    }

    #[test]
    fn aggressive_preset_uses_documented_percentages() {
        assert_eq!(RiskLevel::Aggressive.base_bet_pct(), 0.10);
        assert_eq!(RiskLevel::Aggressive.max_bet_pct(), 0.40);
    }
}
