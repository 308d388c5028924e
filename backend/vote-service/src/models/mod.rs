/// Data models for vote-service
///
/// - Storage rows: `PostCounters`, `Vote`
/// - API payloads: vote, status, score and audit responses
use crate::domain::{score, Transition, VoteType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Largest number of posts accepted by the batch status endpoint
pub const MAX_BATCH_POST_IDS: usize = 100;

/// Subset of a post that voting touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostCounters {
    pub id: i64,
    pub likes: i64,
    pub dislikes: i64,
}

impl PostCounters {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            likes: 0,
            dislikes: 0,
        }
    }

    pub fn score(&self) -> i64 {
        score(self.likes, self.dislikes)
    }
}

/// One row per (user_email, post_id)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: i64,
    pub user_email: String,
    pub post_id: i64,
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of one atomic transition, as returned by a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteApplied {
    pub counters: PostCounters,
    pub transition: Transition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub message: String,
    pub likes: i64,
    pub dislikes: i64,
    pub user_vote: Option<VoteType>,
}

impl From<VoteApplied> for VoteResponse {
    fn from(applied: VoteApplied) -> Self {
        Self {
            message: applied.transition.outcome.message().to_string(),
            likes: applied.counters.likes,
            dislikes: applied.counters.dislikes,
            user_vote: applied.transition.user_vote(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatusResponse {
    pub user_vote: Option<VoteType>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchVoteStatusRequest {
    #[validate(length(min = 1, max = 100))]
    pub post_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchVoteStatusResponse {
    pub votes: BTreeMap<i64, Option<VoteType>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub post_id: i64,
    pub likes: i64,
    pub dislikes: i64,
    pub score: i64,
}

impl From<PostCounters> for ScoreResponse {
    fn from(counters: PostCounters) -> Self {
        Self {
            post_id: counters.id,
            likes: counters.likes,
            dislikes: counters.dislikes,
            score: counters.score(),
        }
    }
}

/// Stored counters compared against counts derived from vote rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterAudit {
    pub post_id: i64,
    pub stored: PostCounters,
    pub derived: PostCounters,
    pub consistent: bool,
}

impl CounterAudit {
    pub fn new(stored: PostCounters, derived: PostCounters) -> Self {
        Self {
            post_id: stored.id,
            consistent: stored == derived,
            stored,
            derived,
        }
    }
}
