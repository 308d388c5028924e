use super::VoteStore;
use crate::domain::{VoteAction, VoteState, VoteType, VoteWrite};
use crate::error::{AppError, Result};
use crate::models::{PostCounters, VoteApplied};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    posts: HashMap<i64, PostCounters>,
    votes: HashMap<(String, i64), VoteType>,
}

/// Process-local vote store for development and tests.
///
/// The lock is held across the whole read-decide-write of a transition, which
/// gives the same per-post serialization the PostgreSQL row lock provides.
#[derive(Default)]
pub struct InMemoryVoteStore {
    tables: Mutex<Tables>,
}

impl InMemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with zero-count posts
    pub fn with_posts(post_ids: impl IntoIterator<Item = i64>) -> Self {
        let posts = post_ids
            .into_iter()
            .map(|id| (id, PostCounters::new(id)))
            .collect();

        Self {
            tables: Mutex::new(Tables {
                posts,
                votes: HashMap::new(),
            }),
        }
    }

    pub async fn insert_post(&self, post_id: i64) -> PostCounters {
        let mut tables = self.tables.lock().await;
        *tables
            .posts
            .entry(post_id)
            .or_insert_with(|| PostCounters::new(post_id))
    }
}

#[async_trait::async_trait]
impl VoteStore for InMemoryVoteStore {
    async fn apply_transition(
        &self,
        user_email: &str,
        post_id: i64,
        action: VoteAction,
    ) -> Result<VoteApplied> {
        let mut tables = self.tables.lock().await;

        if !tables.posts.contains_key(&post_id) {
            return Err(AppError::post_not_found(post_id));
        }

        let key = (user_email.to_string(), post_id);
        let state = VoteState::from(tables.votes.get(&key).copied());
        let transition = state.apply(action);

        match transition.write {
            VoteWrite::None => {}
            VoteWrite::Insert(vote_type) | VoteWrite::Update(vote_type) => {
                tables.votes.insert(key, vote_type);
            }
            VoteWrite::Delete => {
                tables.votes.remove(&key);
            }
        }

        let post = tables
            .posts
            .get_mut(&post_id)
            .ok_or_else(|| AppError::post_not_found(post_id))?;
        post.likes += transition.delta.likes;
        post.dislikes += transition.delta.dislikes;

        Ok(VoteApplied {
            counters: *post,
            transition,
        })
    }

    async fn find_vote(&self, user_email: &str, post_id: i64) -> Result<Option<VoteType>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .votes
            .get(&(user_email.to_string(), post_id))
            .copied())
    }

    async fn find_votes(
        &self,
        user_email: &str,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, VoteType>> {
        let tables = self.tables.lock().await;
        Ok(post_ids
            .iter()
            .filter_map(|&post_id| {
                tables
                    .votes
                    .get(&(user_email.to_string(), post_id))
                    .map(|&vote_type| (post_id, vote_type))
            })
            .collect())
    }

    async fn post_counters(&self, post_id: i64) -> Result<Option<PostCounters>> {
        let tables = self.tables.lock().await;
        Ok(tables.posts.get(&post_id).copied())
    }

    async fn tally_votes(&self, post_id: i64) -> Result<PostCounters> {
        let tables = self.tables.lock().await;
        let mut tally = PostCounters::new(post_id);
        for ((_, voted_post), vote_type) in tables.votes.iter() {
            if *voted_post != post_id {
                continue;
            }
            match vote_type {
                VoteType::Like => tally.likes += 1,
                VoteType::Dislike => tally.dislikes += 1,
            }
        }
        Ok(tally)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
