use super::{pool, VoteStore};
use crate::domain::{VoteAction, VoteState, VoteType, VoteWrite};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{PostCounters, Vote, VoteApplied};
use sqlx::{Connection, PgConnection, PgPool};
use std::collections::HashMap;
use std::time::Instant;

/// PostgreSQL-backed vote store
#[derive(Clone)]
pub struct PgVoteStore {
    pool: PgPool,
}

impl PgVoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a post with zeroed counters. Posts are owned elsewhere; this
    /// exists for seeding and tests.
    pub async fn insert_post(&self, post_id: i64) -> Result<PostCounters> {
        let post = sqlx::query_as::<_, PostCounters>(
            r#"
            INSERT INTO posts (id)
            VALUES ($1)
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id
            RETURNING id, likes, dislikes
            "#,
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    /// Carry out the row mutation chosen by the transition
    async fn write_vote(
        conn: &mut PgConnection,
        user_email: &str,
        post_id: i64,
        existing: Option<&Vote>,
        write: VoteWrite,
    ) -> Result<()> {
        match (write, existing) {
            (VoteWrite::None, _) => {}
            (VoteWrite::Insert(vote_type), None) => {
                sqlx::query(
                    r#"
                    INSERT INTO votes (user_email, post_id, vote_type)
                    VALUES ($1, $2, $3)
                    "#,
                )
                .bind(user_email)
                .bind(post_id)
                .bind(vote_type)
                .execute(&mut *conn)
                .await?;
            }
            (VoteWrite::Update(vote_type), Some(vote)) => {
                sqlx::query("UPDATE votes SET vote_type = $1, updated_at = NOW() WHERE id = $2")
                    .bind(vote_type)
                    .bind(vote.id)
                    .execute(&mut *conn)
                    .await?;
            }
            (VoteWrite::Delete, Some(vote)) => {
                sqlx::query("DELETE FROM votes WHERE id = $1")
                    .bind(vote.id)
                    .execute(&mut *conn)
                    .await?;
            }
            (write, existing) => {
                return Err(AppError::Internal(format!(
                    "vote write {:?} does not match stored row (present: {})",
                    write,
                    existing.is_some()
                )));
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl VoteStore for PgVoteStore {
    async fn apply_transition(
        &self,
        user_email: &str,
        post_id: i64,
        action: VoteAction,
    ) -> Result<VoteApplied> {
        let mut conn = pool::acquire(&self.pool).await?;
        let mut tx = conn.begin().await?;

        // Row lock serializes every transition on this post until commit
        let lock_start = Instant::now();
        let locked = sqlx::query_as::<_, PostCounters>(
            "SELECT id, likes, dislikes FROM posts WHERE id = $1 FOR UPDATE",
        )
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await;
        metrics::record_lock_wait(lock_start.elapsed().as_secs_f64());
        let locked = locked?.ok_or_else(|| AppError::post_not_found(post_id))?;

        let existing = sqlx::query_as::<_, Vote>(
            r#"
            SELECT id, user_email, post_id, vote_type, created_at, updated_at
            FROM votes
            WHERE user_email = $1 AND post_id = $2
            "#,
        )
        .bind(user_email)
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;

        let state = VoteState::from(existing.as_ref().map(|v| v.vote_type));
        let transition = state.apply(action);

        Self::write_vote(
            &mut *tx,
            user_email,
            post_id,
            existing.as_ref(),
            transition.write,
        )
        .await?;

        let counters = if transition.delta.is_zero() {
            locked
        } else {
            sqlx::query_as::<_, PostCounters>(
                r#"
                UPDATE posts
                SET likes = likes + $2, dislikes = dislikes + $3
                WHERE id = $1
                RETURNING id, likes, dislikes
                "#,
            )
            .bind(post_id)
            .bind(transition.delta.likes)
            .bind(transition.delta.dislikes)
            .fetch_one(&mut *tx)
            .await?
        };

        tx.commit().await?;

        Ok(VoteApplied {
            counters,
            transition,
        })
    }

    async fn find_vote(&self, user_email: &str, post_id: i64) -> Result<Option<VoteType>> {
        let vote_type = sqlx::query_scalar::<_, VoteType>(
            "SELECT vote_type FROM votes WHERE user_email = $1 AND post_id = $2",
        )
        .bind(user_email)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vote_type)
    }

    async fn find_votes(
        &self,
        user_email: &str,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, VoteType>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (i64, VoteType)>(
            r#"
            SELECT post_id, vote_type
            FROM votes
            WHERE user_email = $1 AND post_id = ANY($2)
            "#,
        )
        .bind(user_email)
        .bind(post_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn post_counters(&self, post_id: i64) -> Result<Option<PostCounters>> {
        let post = sqlx::query_as::<_, PostCounters>(
            "SELECT id, likes, dislikes FROM posts WHERE id = $1",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn tally_votes(&self, post_id: i64) -> Result<PostCounters> {
        let (likes, dislikes) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE vote_type = 'like'),
                COUNT(*) FILTER (WHERE vote_type = 'dislike')
            FROM votes
            WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(PostCounters {
            id: post_id,
            likes,
            dislikes,
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
