//! PostgreSQL repository tests.
//!
//! Run with a database available:
//! `DATABASE_URL=postgresql://... cargo test -- --ignored`

use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use short_url::domain::entities::NewShortUrl;
use short_url::domain::repositories::ShortUrlRepository;
use short_url::error::AppError;
use short_url::infrastructure::persistence::PgShortUrlRepository;

fn new_url(url: &str) -> NewShortUrl {
    NewShortUrl {
        original_url: url.to_string(),
        expires_at: None,
    }
}

#[sqlx::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_insert_returns_pending_record(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool));

    let pending = repo.insert(new_url("https://example.com")).await.unwrap();

    assert!(pending.id > 0);
    assert_eq!(pending.original_url, "https://example.com");
    assert!(pending.expires_at.is_none());
}

#[sqlx::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_pending_record_is_invisible(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool.clone()));

    repo.insert(new_url("https://example.com")).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM short_urls WHERE short_code IS NULL")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert!(!repo.increment_click("").await.unwrap());
    assert!(repo.find_any_by_code("").await.unwrap().is_none());
}

#[sqlx::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_set_code_then_find(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool));

    let pending = repo.insert(new_url("https://example.com")).await.unwrap();
    repo.set_code(pending.id, "aaaaab").await.unwrap();

    let record = repo.find_active_by_code("aaaaab").await.unwrap().unwrap();
    assert_eq!(record.id, pending.id);
    assert_eq!(record.short_code, "aaaaab");
    assert_eq!(record.click_count, 0);
    assert!(record.last_clicked_at.is_none());
}

#[sqlx::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_set_code_twice_is_not_found(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool));

    let pending = repo.insert(new_url("https://example.com")).await.unwrap();
    repo.set_code(pending.id, "aaaaab").await.unwrap();

    let err = repo.set_code(pending.id, "aaaaac").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[sqlx::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_duplicate_code_is_conflict(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool));

    let first = repo.insert(new_url("https://a.example")).await.unwrap();
    let second = repo.insert(new_url("https://b.example")).await.unwrap();
    repo.set_code(first.id, "aaaaab").await.unwrap();

    let err = repo.set_code(second.id, "aaaaab").await.unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }));
}

#[sqlx::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_expired_record_only_found_by_any(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool));

    let pending = repo
        .insert(NewShortUrl {
            original_url: "https://example.com".to_string(),
            expires_at: Some(Utc::now() - Duration::days(1)),
        })
        .await
        .unwrap();
    repo.set_code(pending.id, "aaaaab").await.unwrap();

    assert!(repo.find_active_by_code("aaaaab").await.unwrap().is_none());
    let record = repo.find_any_by_code("aaaaab").await.unwrap().unwrap();
    assert!(record.expires_at.is_some());
}

#[sqlx::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_increment_click(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool));

    let pending = repo.insert(new_url("https://example.com")).await.unwrap();
    repo.set_code(pending.id, "aaaaab").await.unwrap();

    assert!(repo.increment_click("aaaaab").await.unwrap());
    assert!(repo.increment_click("aaaaab").await.unwrap());
    assert!(!repo.increment_click("zzzzzz").await.unwrap());

    let record = repo.find_any_by_code("aaaaab").await.unwrap().unwrap();
    assert_eq!(record.click_count, 2);
    assert!(record.last_clicked_at.is_some());
}

#[sqlx::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_overlong_url_is_validation_error(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool));
    let url = format!("https://example.com/{}", "a".repeat(3000));

    let err = repo.insert(new_url(&url)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[sqlx::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_increment_click_by_adds_batch(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool));

    let pending = repo.insert(new_url("https://example.com")).await.unwrap();
    repo.set_code(pending.id, "aaaaab").await.unwrap();

    assert!(repo.increment_click_by("aaaaab", 40).await.unwrap());
    assert!(repo.increment_click("aaaaab").await.unwrap());
    assert!(!repo.increment_click_by("zzzzzz", 3).await.unwrap());

    let record = repo.find_any_by_code("aaaaab").await.unwrap().unwrap();
    assert_eq!(record.click_count, 41);
}

#[sqlx::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_increments_are_not_lost(pool: PgPool) {
    let repo = Arc::new(PgShortUrlRepository::new(Arc::new(pool)));

    let pending = repo.insert(new_url("https://example.com")).await.unwrap();
    repo.set_code(pending.id, "aaaaab").await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.increment_click("aaaaab").await.unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    let record = repo.find_any_by_code("aaaaab").await.unwrap().unwrap();
    assert_eq!(record.click_count, 50);
}

#[sqlx::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_failed_set_code_leaves_invisible_pending_row(pool: PgPool) {
    let repo = PgShortUrlRepository::new(Arc::new(pool.clone()));

    let first = repo.insert(new_url("https://a.example")).await.unwrap();
    let orphan = repo.insert(new_url("https://b.example")).await.unwrap();
    repo.set_code(first.id, "aaaaab").await.unwrap();
    assert!(repo.set_code(orphan.id, "aaaaab").await.is_err());

    let pending: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM short_urls WHERE short_code IS NULL")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(pending, 1);

    let record = repo.find_any_by_code("aaaaab").await.unwrap().unwrap();
    assert_eq!(record.original_url, "https://a.example");

    let next = repo.insert(new_url("https://c.example")).await.unwrap();
    repo.set_code(next.id, "aaaaad").await.unwrap();
    assert!(repo.find_active_by_code("aaaaad").await.unwrap().is_some());
}
