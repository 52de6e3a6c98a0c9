//! The host runtime contract (§6 "Host runtime contract").
//!
//! Everything here is consumed, never owned: match registration, tick
//! invocation, broadcast transport, wallet persistence, and label
//! publication all live in the host. The core only ever sees this trait.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;
use crate::wallet::WalletUpdate;

/// Errors the host's wallet backend can report back to the core (§7
/// "Wallet backend failure" — logged, settlement for the affected user
/// treated as zero delta, never fatal to the hand).
#[derive(Debug, Clone, thiserror::Error)]
pub enum WalletError {
    /// The backend rejected the update (e.g. transient failure).
    #[error("wallet update failed for one or more users: {reason}")]
    UpdateFailed {
        /// Backend-supplied diagnostic.
        reason: String,
    },
}

/// Audit events emitted to the host (§6, §4.7 "Presence lifecycle").
#[derive(Debug, Clone)]
pub enum MatchEvent {
    /// A presence joined the table.
    Join {
        /// The seat that joined.
        user_id: UserId,
    },
    /// A presence left the table.
    Leave {
        /// The seat that left.
        user_id: UserId,
    },
    /// The match reached its terminal state.
    End,
}

/// Opcodes the core broadcasts to clients (§6 "Client wire protocol").
pub use crate::messages::UpdateOpcode as Opcode;

/// The narrow surface the match core requires of its host (§6, §9 "Context
/// with processor package" — explicit parameters, not ambient state).
pub trait MatchHost {
    /// Broadcasts a payload to `to` (or everyone if `None`), attributed to
    /// `from` (or the server if `None`). `UPDATE_GAME_STATE` broadcasts are
    /// expected not to be logged by the implementation, to avoid flooding
    /// (§4.7 "Broadcast primitive").
    fn broadcast(
        &mut self,
        opcode: Opcode,
        payload: &[u8],
        to: Option<&[UserId]>,
        from: Option<&UserId>,
        reliable: bool,
    );

    /// Publishes an updated match label (best-effort; a serialization
    /// failure is logged and skipped, never fatal, §4.8).
    fn match_label_update(&mut self, label_json: &[u8]);

    /// Removes presences from the match at the transport level (§4.7
    /// "`KICK_OFF_THE_TABLE`").
    fn match_kick(&mut self, users: &[UserId]);

    /// Applies wallet deltas, atomically when `atomic` is set (§6
    /// `walletsUpdate(updates, atomic=true)`).
    fn wallets_update(&mut self, updates: &[WalletUpdate<'_>], atomic: bool) -> Result<(), WalletError>;

    /// Reads current balances for the given users.
    fn read_wallets(&self, users: &[UserId]) -> Vec<(UserId, i64)>;

    /// Emits an audit event (§6: `match.join`, `match.leave`, `match.end`).
    fn emit_event(&mut self, event: MatchEvent);
}

/// One seat's public profile, as listed in the match label (§6 "Match
/// label").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelProfile {
    /// The seat's user id.
    pub user_id: UserId,
    /// Display name.
    pub user_name: String,
    /// Network session id, empty for bots.
    pub user_sid: String,
}

/// JSON-serialized table metadata, refreshed on every state transition
/// (§6 "Match label").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchLabel {
    /// Whether the table accepts new joins.
    pub open: bool,
    /// Smallest chip denomination at this table.
    pub mark_unit: i64,
    /// Table display name.
    pub name: String,
    /// Optional join password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Maximum seats.
    pub max_size: u8,
    /// Host-assigned match id.
    pub match_id: String,
    /// Current state-machine state, as a display string.
    pub game_state: String,
    /// Current seated count.
    pub size: u8,
    /// Seated profiles.
    pub profiles: Vec<LabelProfile>,
    /// Count of bot-leased seats.
    pub num_bot: u8,
}

impl MatchLabel {
    /// Serializes the label to JSON bytes for [`MatchHost::match_label_update`].
    ///
    /// # Errors
    /// Returns the `serde_json` error on malformed content; callers treat
    /// this as best-effort and log-and-skip rather than propagate (§4.8).
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
