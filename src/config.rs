//! Match configuration surface (§6: "Configuration surface").
//!
//! Mirrors the teacher crate's `GameOptions` builder: a plain data struct
//! with a sensible `Default` and `with_*` setters, rather than a global or
//! environment-sniffing config loader.

use std::time::Duration;

/// The bot chip-value ladder bot bets are rounded onto (§4.6).
pub const CHIP_LADDER: [i64; 5] = [100, 500, 1_000, 5_000, 10_000];

/// Configuration for one match instance.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Ticks per second the host invokes the match at.
    pub tick_rate: u8,
    /// Idle-state countdown.
    pub idle_duration: Duration,
    /// Matching-state countdown.
    pub matching_duration: Duration,
    /// Preparing-state countdown (bet window).
    pub preparing_duration: Duration,
    /// Play-state countdown budget (upper bound; actual play ends when
    /// `IsAllVisited` and the dealer has played).
    pub play_duration: Duration,
    /// Reward-state countdown (settlement display window).
    pub reward_duration: Duration,
    /// Insurance round duration (glob round, §4.4).
    pub insurance_phase_duration: Duration,
    /// Per-player-per-hand playing round phase duration (§4.4).
    pub playing_phase_duration: Duration,
    /// Number of 52-card decks mixed into the shoe.
    pub shoe_decks: u8,
    /// Maximum seats at the table.
    pub max_seats: u8,
    /// Minimum seated presences required to leave Matching for Preparing.
    pub min_presences: u8,
    /// Consecutive no-interaction hands before a presence is auto-kicked.
    pub idle_kick_threshold: u32,
    /// Minimum wallet balance to remain seated after Reward.
    pub auto_leave_chip_floor: i64,
    /// Table bet unit (label metadata, smallest chip denomination).
    pub bet_unit: i64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tick_rate: 2,
            idle_duration: Duration::from_secs(15),
            matching_duration: Duration::from_secs(1),
            preparing_duration: Duration::from_secs(15),
            play_duration: Duration::from_secs(60),
            reward_duration: Duration::from_secs(5),
            insurance_phase_duration: Duration::from_secs(5),
            playing_phase_duration: Duration::from_secs(10),
            shoe_decks: 8,
            max_seats: 5,
            min_presences: 1,
            idle_kick_threshold: 2,
            auto_leave_chip_floor: 0,
            bet_unit: 100,
        }
    }
}

impl MatchConfig {
    /// Sets the tick rate.
    #[must_use]
    pub const fn with_tick_rate(mut self, tick_rate: u8) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Sets the preparing-state duration.
    #[must_use]
    pub const fn with_preparing_duration(mut self, duration: Duration) -> Self {
        self.preparing_duration = duration;
        self
    }

    /// Sets the play-state duration budget.
    #[must_use]
    pub const fn with_play_duration(mut self, duration: Duration) -> Self {
        self.play_duration = duration;
        self
    }

    /// Sets the reward-state duration.
    #[must_use]
    pub const fn with_reward_duration(mut self, duration: Duration) -> Self {
        self.reward_duration = duration;
        self
    }

    /// Sets the maximum number of seats.
    #[must_use]
    pub const fn with_max_seats(mut self, max_seats: u8) -> Self {
        self.max_seats = max_seats;
        self
    }

    /// Sets the idle-kick threshold (consecutive hands without interaction).
    #[must_use]
    pub const fn with_idle_kick_threshold(mut self, threshold: u32) -> Self {
        self.idle_kick_threshold = threshold;
        self
    }

    /// Sets the minimum wallet balance required to remain seated.
    #[must_use]
    pub const fn with_auto_leave_chip_floor(mut self, floor: i64) -> Self {
        self.auto_leave_chip_floor = floor;
        self
    }

    /// Sets the table bet unit.
    #[must_use]
    pub const fn with_bet_unit(mut self, unit: i64) -> Self {
        self.bet_unit = unit;
        self
    }
}

/// Rounds `amount` to the nearest value in [`CHIP_LADDER`].
///
/// Ties break toward the lower value, matching the first-occurrence order
/// the source iterates the ladder in (§4.6, §9 Open Questions). Amounts
/// above the top rung are capped at it, not scaled further — an Open
/// Question in the spec, preserved as-is (see DESIGN.md).
#[must_use]
pub fn round_to_chip_ladder(amount: i64) -> i64 {
    let mut closest = CHIP_LADDER[0];
    let mut min_diff = (amount - closest).abs();
    for &chip in &CHIP_LADDER[1..] {
        let diff = (amount - chip).abs();
        if diff < min_diff {
            min_diff = diff;
            closest = chip;
        }
    }
    closest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_nearest_rung() {
        assert_eq!(round_to_chip_ladder(50), 100);
        assert_eq!(round_to_chip_ladder(250), 100);
        assert_eq!(round_to_chip_ladder(260), 500);
        assert_eq!(round_to_chip_ladder(20_000), 10_000);
    }

    #[test]
    fn ties_break_to_the_lower_rung() {
        // 300 is equidistant between 100 and 500.
        assert_eq!(round_to_chip_ladder(300), 100);
    }
}
