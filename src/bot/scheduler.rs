//! Per-bot turn scheduling during the preparing phase (§4.6 "Per-bot turn
//! scheduling").
//!
//! The source drives each bot's bets from randomized tick offsets rather
//! than a fixed cadence, so bots don't all act in lockstep; this is a new
//! module (no direct Go counterpart) built in the scheduler idiom already
//! established by [`crate::turn_scheduler`].

use std::collections::HashMap;

use crate::ids::UserId;
use crate::rng::MatchRng;

/// The ticks, relative to preparing-state entry, at which one bot will
/// enqueue a bet placement.
#[derive(Debug, Clone)]
pub struct BotBetSchedule {
    /// Sorted tick offsets at which this bot should place a bet.
    pub ticks: Vec<u32>,
}

/// Schedules every bot's bet placements for one preparing phase (§4.6:
/// "each bot, on preparing entry, picks `MaxOccur ∈ [1,3]` bet placements
/// scheduled at random ticks in `[MinTick, MaxTick]`").
#[must_use]
pub fn schedule_bot_bets(
    bot_ids: &[UserId],
    tick_rate: u8,
    preparing_secs: u32,
    rng: &mut MatchRng,
) -> HashMap<UserId, BotBetSchedule> {
    let min_tick = 2 * u32::from(tick_rate);
    let max_tick = preparing_secs.saturating_sub(2) * u32::from(tick_rate);
    let mut out = HashMap::new();
    for bot_id in bot_ids {
        let max_occur = 1 + rng.range_inclusive(0, 2) as u32;
        let mut ticks: Vec<u32> = (0..max_occur)
            .map(|_| {
                if max_tick <= min_tick {
                    min_tick
                } else {
                    rng.range_inclusive(i64::from(min_tick), i64::from(max_tick)) as u32
                }
            })
            .collect();
        ticks.sort_unstable();
        out.insert(bot_id.clone(), BotBetSchedule { ticks });
    }
    out
}
