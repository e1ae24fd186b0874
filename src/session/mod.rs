//! Runtime sessions: the item attempt state machine, its store, and the
//! test session that walks a route.

pub mod item_session;
pub mod manager;
pub mod shuffling;
pub mod state;
pub mod store;
pub mod test_session;
pub mod time;

pub use item_session::{AssessmentItemSession, COMPLETION_STATUS, DURATION, NUM_ATTEMPTS};
pub use manager::SessionManager;
pub use shuffling::ShufflingState;
pub use state::{AssessmentItemSessionState, CompletionStatus, RemainingAttempts};
pub use store::AssessmentItemSessionStore;
pub use test_session::{AssessmentTestSession, AssessmentTestSessionState, Jump};
pub use time::TimeConstraint;
