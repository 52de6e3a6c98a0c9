//! The authoritative server-side core of a multiplayer Blackjack table.
//!
//! A [`match_handler::Match`] owns the canonical state for one table
//! instance and is driven one tick at a time by a host runtime through
//! [`match_handler::Match::loop_tick`]: it mediates every player action
//! against game rules, deals cards from an eight-deck shoe, runs a pool of
//! bots through the same state transitions as humans, computes chip
//! settlements, and leaves a buffered log of outbound broadcasts for the
//! host to drain. Wire encoding, transport, authentication, and wallet
//! persistence are consumed through the narrow [`host::MatchHost`] trait
//! rather than implemented here.
//!
//! # Example
//!
//! ```
//! use blackjack_table_core::clock::SystemClock;
//! use blackjack_table_core::config::MatchConfig;
//! use blackjack_table_core::match_handler::{Match, MatchParams};
//! use blackjack_table_core::rng::MatchRng;
//!
//! let params = MatchParams {
//!     match_id: "table-1".into(),
//!     name: "High Roller".into(),
//!     password: None,
//!     num_bot: 2,
//! };
//! let clock = SystemClock;
//! let (table, tick_rate, label) =
//!     Match::init(params, MatchConfig::default(), MatchRng::from_seed(1), &clock);
//! assert_eq!(tick_rate, 2);
//! assert_eq!(table.phase(), blackjack_table_core::GamePhase::Idle);
//! assert!(label.open);
//! ```

pub mod bet;
pub mod bot;
pub mod card;
pub mod clock;
pub mod config;
pub mod error;
pub mod game_engine;
pub mod hand;
pub mod host;
pub mod ids;
pub mod match_handler;
pub mod match_state;
pub mod messages;
pub mod presence;
pub mod processor;
pub mod rng;
pub mod state_machine;
pub mod turn_scheduler;
pub mod wallet;

pub use bet::{BetResult, PlayerBet};
pub use card::{Card, Shoe, Suit, DECK_SIZE, SHOE_DECKS, SHOE_SIZE};
pub use config::MatchConfig;
pub use error::{ActionError, BetError, InsuranceError, ShoeError, StateMachineFinish};
pub use game_engine::GameEngine;
pub use hand::{CPoint, Hand, HandPosition, HandType, SubHand};
pub use host::{MatchEvent, MatchHost, MatchLabel};
pub use ids::UserId;
pub use match_handler::{JoinRejection, Match, MatchParams};
pub use match_state::MatchState;
pub use presence::{Participant, Presence, PresenceSet};
pub use rng::MatchRng;
pub use state_machine::GamePhase;
pub use turn_scheduler::TurnBaseEngine;
