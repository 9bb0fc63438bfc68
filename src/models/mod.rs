//! Typed item-bank content and session payloads.
//!
//! Inbound JSON is decoded into these types at the boundary so malformed
//! entries fail before any vendor call is built.

pub mod item;
pub mod question;
pub mod session;

pub use item::{derived_item_reference, ItemData, ItemPayload, QuestionRef};
pub use question::{Question, QuestionData, QuestionOption, ScoredResponse, ValidationRule};
pub use session::{bounded_activity_id, ActivitySource, AssessmentSession, MAX_ACTIVITY_ID_LEN};
