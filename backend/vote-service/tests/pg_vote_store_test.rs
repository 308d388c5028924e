//! PostgreSQL store tests. Need a reachable database:
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/vote_test cargo test -p vote-service --test pg_vote_store_test -- --ignored
//! ```

use serial_test::serial;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use vote_service::config::DatabaseConfig;
use vote_service::db::{pool, PgVoteStore, VoteStore};
use vote_service::domain::{VoteAction, VoteType};
use vote_service::error::AppError;
use vote_service::services::VoteService;

fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres tests")
}

async fn setup() -> PgVoteStore {
    let url = database_url();
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .expect("connect to test database");

    vote_service::MIGRATOR
        .run(&pool)
        .await
        .expect("run migrations");
    sqlx::query("TRUNCATE votes, posts")
        .execute(&pool)
        .await
        .expect("reset tables");

    PgVoteStore::new(pool)
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_transition_sequence() {
    let store = setup().await;
    store.insert_post(1).await.unwrap();

    let applied = store
        .apply_transition("a@example.com", 1, VoteAction::Like)
        .await
        .unwrap();
    assert_eq!((applied.counters.likes, applied.counters.dislikes), (1, 0));

    let applied = store
        .apply_transition("a@example.com", 1, VoteAction::Like)
        .await
        .unwrap();
    assert!(applied.transition.outcome.is_noop());
    assert_eq!((applied.counters.likes, applied.counters.dislikes), (1, 0));

    let applied = store
        .apply_transition("a@example.com", 1, VoteAction::Dislike)
        .await
        .unwrap();
    assert_eq!((applied.counters.likes, applied.counters.dislikes), (0, 1));
    assert_eq!(
        store.find_vote("a@example.com", 1).await.unwrap(),
        Some(VoteType::Dislike)
    );

    let applied = store
        .apply_transition("a@example.com", 1, VoteAction::Cancel)
        .await
        .unwrap();
    assert_eq!((applied.counters.likes, applied.counters.dislikes), (0, 0));
    assert_eq!(store.find_vote("a@example.com", 1).await.unwrap(), None);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_unknown_post_rolls_back() {
    let store = setup().await;

    let err = store
        .apply_transition("a@example.com", 404, VoteAction::Like)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_find_votes_and_tally() {
    let store = setup().await;
    for id in [1, 2, 3] {
        store.insert_post(id).await.unwrap();
    }
    store
        .apply_transition("a@example.com", 1, VoteAction::Like)
        .await
        .unwrap();
    store
        .apply_transition("a@example.com", 3, VoteAction::Dislike)
        .await
        .unwrap();
    store
        .apply_transition("b@example.com", 3, VoteAction::Dislike)
        .await
        .unwrap();

    let votes = store.find_votes("a@example.com", &[1, 2, 3]).await.unwrap();
    assert_eq!(votes.get(&1), Some(&VoteType::Like));
    assert_eq!(votes.get(&2), None);
    assert_eq!(votes.get(&3), Some(&VoteType::Dislike));

    let tally = store.tally_votes(3).await.unwrap();
    assert_eq!((tally.likes, tally.dislikes), (0, 2));
    assert_eq!(Some(tally), store.post_counters(3).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
#[serial]
async fn test_concurrent_likes_are_serialized() {
    let store = setup().await;
    store.insert_post(1).await.unwrap();
    let service = VoteService::new(Arc::new(store.clone()) as Arc<dyn VoteStore>);

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .apply_vote(Some("a@example.com"), 1, VoteType::Like)
                    .await
                    .map(|_| i)
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let counters = store.post_counters(1).await.unwrap().unwrap();
    assert_eq!((counters.likes, counters.dislikes), (1, 0));
    assert!(service.verify_counters(1).await.unwrap().consistent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
#[serial]
async fn test_concurrent_mixed_actions_keep_counters_consistent() {
    let store = setup().await;
    store.insert_post(1).await.unwrap();
    let service = VoteService::new(Arc::new(store.clone()) as Arc<dyn VoteStore>);

    let handles: Vec<_> = (0..30)
        .map(|i| {
            let service = service.clone();
            let user = format!("user{}@example.com", i % 5);
            tokio::spawn(async move {
                match i % 3 {
                    0 => service.apply_vote(Some(user.as_str()), 1, VoteType::Like).await,
                    1 => service.apply_vote(Some(user.as_str()), 1, VoteType::Dislike).await,
                    _ => service.cancel_vote(Some(user.as_str()), 1).await,
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let audit = service.verify_counters(1).await.unwrap();
    assert!(audit.consistent, "{:?}", audit);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore]
#[serial]
async fn test_locked_post_times_out_as_conflict() {
    setup().await.insert_post(1).await.unwrap();

    let config = DatabaseConfig {
        url: None,
        max_connections: 4,
        min_connections: 0,
        acquire_timeout_secs: 5,
        lock_timeout_ms: 200,
    };
    let pool = pool::connect(&database_url(), &config).await.unwrap();
    let store = PgVoteStore::new(pool.clone());

    let mut holder = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM posts WHERE id = 1 FOR UPDATE")
        .execute(&mut *holder)
        .await
        .unwrap();

    let err = store
        .apply_transition("a@example.com", 1, VoteAction::Like)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{:?}", err);
    holder.rollback().await.unwrap();

    let applied = store
        .apply_transition("a@example.com", 1, VoteAction::Like)
        .await
        .unwrap();
    assert_eq!((applied.counters.likes, applied.counters.dislikes), (1, 0));
    assert_eq!(store.find_vote("a@example.com", 1).await.unwrap(), Some(VoteType::Like));
}
