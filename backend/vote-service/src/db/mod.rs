/// Vote persistence
///
/// `VoteStore` is the boundary the service talks to. Each implementation must
/// run `apply_transition` as one atomic unit: concurrent calls for the same
/// post may never interleave between reading the current vote and writing the
/// counter delta.
pub mod memory;
pub mod pool;
pub mod vote_repo;

pub use memory::InMemoryVoteStore;
pub use vote_repo::PgVoteStore;

use crate::domain::{VoteAction, VoteType};
use crate::error::Result;
use crate::models::{PostCounters, VoteApplied};
use std::collections::HashMap;

#[async_trait::async_trait]
pub trait VoteStore: Send + Sync {
    /// Read the caller's vote, decide the transition and write it together
    /// with the counter delta. `NotFound` when the post does not exist.
    async fn apply_transition(
        &self,
        user_email: &str,
        post_id: i64,
        action: VoteAction,
    ) -> Result<VoteApplied>;

    async fn find_vote(&self, user_email: &str, post_id: i64) -> Result<Option<VoteType>>;

    /// Votes the user holds among `post_ids`; posts without a vote are absent
    async fn find_votes(
        &self,
        user_email: &str,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, VoteType>>;

    async fn post_counters(&self, post_id: i64) -> Result<Option<PostCounters>>;

    /// Counts derived from the vote rows, for comparison with stored counters
    async fn tally_votes(&self, post_id: i64) -> Result<PostCounters>;

    async fn ping(&self) -> Result<()>;
}
