use crate::db::VoteStore;
use crate::domain::{VoteAction, VoteType};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    BatchVoteStatusResponse, CounterAudit, ScoreResponse, VoteResponse, VoteStatusResponse,
    MAX_BATCH_POST_IDS,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Vote operations exposed over HTTP
#[derive(Clone)]
pub struct VoteService {
    store: Arc<dyn VoteStore>,
}

impl VoteService {
    pub fn new(store: Arc<dyn VoteStore>) -> Self {
        Self { store }
    }

    /// Like or dislike a post on behalf of the caller
    pub async fn apply_vote(
        &self,
        identity: Option<&str>,
        post_id: i64,
        vote_type: VoteType,
    ) -> Result<VoteResponse> {
        self.transition("apply_vote", identity, post_id, vote_type.into())
            .await
    }

    /// Remove the caller's vote, if any
    pub async fn cancel_vote(&self, identity: Option<&str>, post_id: i64) -> Result<VoteResponse> {
        self.transition("cancel_vote", identity, post_id, VoteAction::Cancel)
            .await
    }

    /// Anonymous callers get `null` rather than an error
    pub async fn get_vote_status(
        &self,
        identity: Option<&str>,
        post_id: i64,
    ) -> Result<VoteStatusResponse> {
        timed("get_vote_status", async {
            let user_vote = match authenticated(identity) {
                Some(user_email) => self.store.find_vote(user_email, post_id).await?,
                None => None,
            };
            Ok(VoteStatusResponse { user_vote })
        })
        .await
    }

    pub async fn get_vote_statuses(
        &self,
        identity: Option<&str>,
        post_ids: &[i64],
    ) -> Result<BatchVoteStatusResponse> {
        timed("get_vote_statuses", async {
            if post_ids.is_empty() || post_ids.len() > MAX_BATCH_POST_IDS {
                return Err(AppError::Validation(format!(
                    "postIds must contain between 1 and {} entries",
                    MAX_BATCH_POST_IDS
                )));
            }

            let found = match authenticated(identity) {
                Some(user_email) => self.store.find_votes(user_email, post_ids).await?,
                None => Default::default(),
            };

            let votes = post_ids
                .iter()
                .map(|id| (*id, found.get(id).copied()))
                .collect();

            Ok(BatchVoteStatusResponse { votes })
        })
        .await
    }

    pub async fn get_score(&self, post_id: i64) -> Result<ScoreResponse> {
        timed("get_score", async {
            let counters = self
                .store
                .post_counters(post_id)
                .await?
                .ok_or_else(|| AppError::post_not_found(post_id))?;
            Ok(ScoreResponse::from(counters))
        })
        .await
    }

    /// Compare stored counters with the vote rows. Never rewrites counters.
    pub async fn verify_counters(&self, post_id: i64) -> Result<CounterAudit> {
        timed("verify_counters", async {
            let stored = self
                .store
                .post_counters(post_id)
                .await?
                .ok_or_else(|| AppError::post_not_found(post_id))?;
            let derived = self.store.tally_votes(post_id).await?;

            let audit = CounterAudit::new(stored, derived);
            if !audit.consistent {
                warn!(
                    post_id,
                    stored_likes = stored.likes,
                    stored_dislikes = stored.dislikes,
                    derived_likes = derived.likes,
                    derived_dislikes = derived.dislikes,
                    "vote counters drifted from vote rows"
                );
            }
            Ok(audit)
        })
        .await
    }

    async fn transition(
        &self,
        operation: &'static str,
        identity: Option<&str>,
        post_id: i64,
        action: VoteAction,
    ) -> Result<VoteResponse> {
        timed(operation, async {
            let user_email = authenticated(identity).ok_or_else(|| {
                AppError::Unauthorized("sign in to vote on posts".to_string())
            })?;

            let applied = self
                .store
                .apply_transition(user_email, post_id, action)
                .await?;
            let outcome = applied.transition.outcome;

            metrics::record_transition(action.as_str(), outcome.label());
            info!(
                post_id,
                action = action.as_str(),
                outcome = outcome.label(),
                user = %mask_email(user_email),
                likes = applied.counters.likes,
                dislikes = applied.counters.dislikes,
                "vote transition applied"
            );

            Ok(VoteResponse::from(applied))
        })
        .await
    }
}

/// Identity is present and not blank
fn authenticated(identity: Option<&str>) -> Option<&str> {
    identity.filter(|email| !email.trim().is_empty())
}

/// Records latency for every call and an error count for failures
async fn timed<T, F>(operation: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = fut.await;
    metrics::record_duration(operation, start.elapsed().as_secs_f64());

    if let Err(err) = &result {
        metrics::record_error(operation, err.kind());
        debug!(operation, kind = err.kind(), error = %err, "vote operation failed");
    }
    result
}

/// `alice@example.com` -> `a***@example.com`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().unwrap_or('*');
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticated_rejects_blank() {
        assert_eq!(authenticated(None), None);
        assert_eq!(authenticated(Some("")), None);
        assert_eq!(authenticated(Some("   ")), None);
        assert_eq!(authenticated(Some("a@b.c")), Some("a@b.c"));
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("alice@example.com"), "a***@example.com");
        assert_eq!(mask_email("not-an-email"), "***");
    }
}
