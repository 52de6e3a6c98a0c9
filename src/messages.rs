//! Client wire protocol (§6 "Client wire protocol").
//!
//! The original wire format is protobuf; an exhaustive IDL is explicitly
//! called out as a companion artifact outside this core's scope. These
//! serde-serializable structs stand in for that payload shape so the
//! processor can be exercised and tested without a codec dependency.

use serde::{Deserialize, Serialize};

use crate::hand::HandPosition;
use crate::ids::UserId;

/// Client-originated opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestOpcode {
    /// Place, rebet, or double a bet.
    Bet,
    /// Declare a play-phase action (hit/stand/double/split/insurance).
    DeclareCards,
    /// Request the current turn and insurance flag.
    InfoTable,
    /// Request a personalized rejoin snapshot.
    SyncTable,
}

/// Server-originated opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateOpcode {
    /// State-machine transition notice.
    UpdateGameState,
    /// Bet/action acknowledgement or error.
    UpdateTable,
    /// A card was dealt.
    UpdateDeal,
    /// Hand settlement results.
    UpdateFinish,
    /// Wallet balance change.
    UpdateWallet,
    /// Presence roster snapshot.
    UserInTableInfo,
    /// A presence was removed from the table.
    KickOffTheTable,
}

/// Bet-placement sub-codes carried by a `BET` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BetCode {
    /// Place a fresh stake.
    Normal,
    /// Repeat the previous hand's stake.
    Rebet,
    /// Double the current or previous stake.
    Double,
}

/// Play-phase action sub-codes carried by a `DECLARE_CARDS` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionCode {
    /// Double down on the active sub-hand.
    Double,
    /// Draw a card.
    Hit,
    /// End the turn on the active sub-hand.
    Stay,
    /// Split the active hand into two sub-hands.
    Split,
    /// Take or decline insurance.
    Insurance,
}

/// A `BET` request body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BetRequest {
    /// Which bet operation to perform.
    pub code: BetCode,
    /// Chip amount; ignored for `REBET`/`DOUBLE`.
    pub amount: i64,
}

/// A `DECLARE_CARDS` request body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeclareCardsRequest {
    /// Which action to perform.
    pub code: ActionCode,
    /// For `INSURANCE`, whether the player accepts it.
    #[serde(default)]
    pub accept_insurance: bool,
}

/// A stable, client-facing error code carried on `UPDATE_TABLE` rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireError {
    /// Insufficient wallet balance for the requested stake.
    ChipNotEnough,
    /// The request was rejected for any other validation reason.
    ActionRejected,
}

/// The `UPDATE_TABLE` payload: a catch-all desk-event notice (bet/split
/// acknowledgement, an error, the insurance-round announcement, or a
/// turn-rotation notice), mirroring the source's single multi-purpose
/// `BlackjackUpdateDesk` message rather than one type per event (§4.7).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTable {
    /// The seat this update concerns; absent for table-wide announcements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Set when a bet was accepted, to the seat's new accumulated stake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_update_bet: Option<i64>,
    /// Set when a split just occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_split_hand: Option<bool>,
    /// Set when the request was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
    /// Set when the insurance round has just opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_turn_entered: Option<bool>,
    /// Set when the dealer's up-card was an ace but the hole card is not a
    /// ten, so insurance side-bets are voided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banker_not_blackjack: Option<bool>,
    /// Set on a turn rotation, naming the seat whose turn it now is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_turn: Option<UserId>,
    /// Carried alongside `in_turn`, sent only to the active seat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_actions: Option<Vec<ActionCode>>,
    /// Set when this seat's insurance stake was refunded and voided
    /// because the dealer checked for, and did not have, blackjack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_voided: Option<bool>,
}

impl UpdateTable {
    /// A bare error acknowledgement to the sender.
    #[must_use]
    pub fn error(user_id: UserId, error: WireError) -> Self {
        Self {
            user_id: Some(user_id),
            error: Some(error),
            ..Self::default()
        }
    }

    /// A bet-accepted acknowledgement, carrying the seat's new accumulated
    /// stake (§4.7 `notifyUpdateBet`).
    #[must_use]
    pub fn bet_accepted(user_id: UserId, accumulated_first: i64) -> Self {
        Self {
            user_id: Some(user_id),
            is_update_bet: Some(accumulated_first),
            ..Self::default()
        }
    }

    /// A split-accepted acknowledgement.
    #[must_use]
    pub fn split_accepted(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            is_split_hand: Some(true),
            ..Self::default()
        }
    }

    /// The insurance-round-opened announcement.
    #[must_use]
    pub fn insurance_turn_entered() -> Self {
        Self {
            insurance_turn_entered: Some(true),
            ..Self::default()
        }
    }

    /// The dealer-checked-not-blackjack announcement, voiding insurance.
    #[must_use]
    pub fn banker_not_blackjack() -> Self {
        Self {
            banker_not_blackjack: Some(true),
            ..Self::default()
        }
    }

    /// A turn-rotation notice; `legal_actions` is populated only in the
    /// copy sent to the active seat (§4.7 `notifyUpdateTurn`).
    #[must_use]
    pub fn turn_update(in_turn: UserId, legal_actions: Option<Vec<ActionCode>>) -> Self {
        Self {
            in_turn: Some(in_turn),
            legal_actions,
            ..Self::default()
        }
    }

    /// Notice that a seat's insurance stake was refunded and voided.
    #[must_use]
    pub fn insurance_voided(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            insurance_voided: Some(true),
            ..Self::default()
        }
    }
}

/// One request body dispatched to the processor, tagged by sender (§6
/// "Client wire protocol"). Stands in for the four request opcodes'
/// decoded payloads; a real deployment decodes these off the protobuf
/// envelope before handing them to [`crate::processor`].
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// `BET`.
    Bet(BetRequest),
    /// `DECLARE_CARDS`.
    DeclareCards(DeclareCardsRequest),
    /// `INFO_TABLE`.
    InfoTable,
    /// `SYNC_TABLE`.
    SyncTable,
}

/// One seat's snapshot in a `SYNC_TABLE` reply: every card currently dealt
/// to it plus the legal actions available right now (§4.7 "`SYNC_TABLE` —
/// reply to sender with an engine-provided set of rejoin messages (DEAL +
/// TABLE reflecting their personalized legal actions)").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTableHand {
    /// The owning seat, or [`UserId::dealer`] for the dealer's hand.
    pub user_id: UserId,
    /// Cards dealt to the first sub-hand so far, as `(suit, rank)` pairs.
    pub first_cards: Vec<(u8, u8)>,
    /// Cards dealt to the second sub-hand, if a split occurred.
    pub second_cards: Vec<(u8, u8)>,
}

/// The full `SYNC_TABLE` reply body: every dealt hand (dealer's and every
/// playing seat's), whose turn it currently is, and the requester's own
/// legal actions if it is their turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTableSnapshot {
    /// Every hand dealt so far this round, dealer included.
    pub hands: Vec<SyncTableHand>,
    /// The seat whose turn it currently is, if play has started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_turn: Option<UserId>,
    /// The requester's own legal actions, populated only when it is their
    /// turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_actions: Option<Vec<ActionCode>>,
}

/// The `USER_IN_TABLE_INFO` payload: a full presence-roster snapshot
/// broadcast whenever a seat joins (§4.7 "Presence lifecycle").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInTableInfo {
    /// Every seated user.
    pub presences: Vec<UserId>,
    /// Users participating in the hand currently in progress, if any.
    pub playing_presences: Vec<UserId>,
    /// Users queued to leave once the hand ends.
    pub leave_presences: Vec<UserId>,
    /// Current wallet balance for each seated user, in `presences` order.
    pub wallet_chips: Vec<i64>,
}

/// A single dealt card, broadcast as `UPDATE_DEAL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDeal {
    /// Whose sub-hand received the card (dealer uses [`UserId::dealer`]).
    pub user_id: UserId,
    /// Which sub-hand.
    pub position: SerializablePosition,
    /// Card suit ordinal.
    pub suit: u8,
    /// Card rank, 1 (ace) through 13 (king).
    pub rank: u8,
}

/// Serde-friendly mirror of [`HandPosition`] (the domain type intentionally
/// carries no serde derive, keeping the wire shape decoupled from it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SerializablePosition {
    /// First sub-hand.
    First,
    /// Second sub-hand.
    Second,
}

impl From<HandPosition> for SerializablePosition {
    fn from(pos: HandPosition) -> Self {
        match pos {
            HandPosition::First => Self::First,
            HandPosition::Second => Self::Second,
        }
    }
}
