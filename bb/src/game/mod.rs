//! Game domain: session ids, the round ledger and the session state machine

mod id;
mod ledger;
mod session;

pub use id::{SessionId, generate_id, is_valid_id};
pub use ledger::{RoundEntry, RoundKind, RoundLedger, expected_kind_for};
pub use session::{GameSession, SessionSettings, SessionState};
