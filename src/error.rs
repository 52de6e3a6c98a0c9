//! Error types for game and match operations.

use thiserror::Error;

/// Errors raised by [`crate::card::Shoe::deal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShoeError {
    /// Fewer cards remain than were requested.
    #[error("shoe exhausted: requested {requested} cards, {remaining} remain")]
    Exhausted {
        /// Cards requested.
        requested: usize,
        /// Cards actually remaining.
        remaining: usize,
    },
}

/// Errors that can occur while placing or adjusting a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BetError {
    /// Betting is not accepted in the current match state.
    #[error("betting not allowed in the current state")]
    NotAllowedNow,
    /// No previous bet exists to rebet or double.
    #[error("no previous bet to repeat")]
    NoPreviousBet,
    /// Chips requested exceed the player's wallet balance.
    #[error("insufficient funds")]
    InsufficientFunds,
}

/// Errors that can occur while taking or declining insurance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InsuranceError {
    /// Insurance is not currently offered (dealer up-card is not an ace, or
    /// the insurance round is not active).
    #[error("insurance is not currently offered")]
    NotOffered,
    /// Chips requested exceed the player's wallet balance.
    #[error("insufficient funds for insurance")]
    InsufficientFunds,
}

/// Errors that can occur while resolving a player action
/// (hit/stand/double/split).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The match is not in a state that accepts player actions.
    #[error("actions not allowed in the current state")]
    NotAllowedNow,
    /// The sender is not the player whose turn it currently is.
    #[error("not your turn")]
    NotYourTurn,
    /// The requested action is not in the computed legal-action list.
    #[error("action not legal for the current hand")]
    IllegalAction,
    /// Double down requested on a hand that cannot double (not two cards,
    /// or insufficient funds).
    #[error("cannot double down on this hand")]
    CannotDouble,
    /// Split requested on a hand that cannot split.
    #[error("cannot split this hand")]
    CannotSplit,
    /// Chips requested exceed the player's wallet balance.
    #[error("insufficient funds")]
    InsufficientFunds,
    /// The shoe ran out of cards mid-action.
    #[error(transparent)]
    Shoe(#[from] ShoeError),
}

/// Sentinel returned by [`crate::match_handler::Match::loop_tick`] once the
/// state machine has reached `Finish` (§7: "once Finish is entered, the
/// host tears the match down"). Carries no data; the phase itself is the
/// only thing a caller needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("match has reached the finish state and should be torn down")]
pub struct StateMachineFinish;

