/// Business logic layer for vote-service
///
/// Authentication checks, metrics and logging live here; vote semantics live
/// in `domain` and atomicity in the store.
pub mod votes;

pub use votes::{mask_email, VoteService};
