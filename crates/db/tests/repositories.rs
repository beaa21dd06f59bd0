//! Repository tests against a real Postgres.
//!
//! Ignored by default; run with `DATABASE_URL` set and `--ignored`.

use chrono::{Duration, NaiveDate, Utc};
use mapletrack_core::checkpoint::Checkpoint;
use mapletrack_core::item::{ItemDetail, ItemOptions, ItemSource, ItemType, ParsedItem};
use mapletrack_core::subtype::CrawlSubtype;
use mapletrack_core::task_status::CrawlStatus;
use mapletrack_db::models::character::{HistorySnapshot, RegisterCharacter};
use mapletrack_db::models::notification::CreateNotification;
use mapletrack_db::models::task::{CreateCrawlTask, UpdateCrawlTask};
use mapletrack_db::repositories::{
    CharacterRepo, HistoryRepo, InventoryRepo, ItemDetailRepo, NotificationRepo, TaskRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_character(pool: &PgPool, ocid: &str) {
    CharacterRepo::register(
        pool,
        &RegisterCharacter {
            ocid: ocid.to_string(),
            name: "메이플용사".to_string(),
            user_id: None,
        },
    )
    .await
    .unwrap();
}

async fn seed_user(pool: &PgPool) -> i64 {
    let row: (i64,) =
        sqlx::query_as("INSERT INTO users (email) VALUES ('owner@example.com') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

fn item(slot: i32) -> ParsedItem {
    ParsedItem {
        slot_index: slot,
        item_type: ItemType::Equip,
        name: format!("아이템 {slot}"),
        icon_url: None,
        quantity: 1,
        options: ItemOptions {
            starforce: Some(17),
            ..Default::default()
        },
        detail_url: Some(format!("https://maplestory.nexon.com/Item/{slot}")),
        expiry_at: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_history_upsert_is_one_row_per_day(pool: PgPool) {
    seed_character(&pool, "ocid-h").await;
    let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    let first = HistoryRepo::upsert(
        &pool,
        "ocid-h",
        day,
        &HistorySnapshot {
            level: 200,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let second = HistoryRepo::upsert(
        &pool,
        "ocid-h",
        day,
        &HistorySnapshot {
            level: 201,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.level, 201);

    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM character_history WHERE character_id = 'ocid-h'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count.0, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_history_meso_update_requires_existing_row(pool: PgPool) {
    seed_character(&pool, "ocid-m").await;
    let day = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();

    assert!(!HistoryRepo::update_meso(&pool, "ocid-m", day, Some(5)).await.unwrap());

    CharacterRepo::update_meso(&pool, "ocid-m", Some(123)).await.unwrap();
    let row = HistoryRepo::upsert(&pool, "ocid-m", day, &HistorySnapshot::default())
        .await
        .unwrap();
    assert_eq!(row.meso, Some(123));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_item_detail_flips_has_detail(pool: PgPool) {
    seed_character(&pool, "ocid-d").await;
    let row = InventoryRepo::insert(&pool, "ocid-d", &item(0), Utc::now())
        .await
        .unwrap();

    let pending = InventoryRepo::list_pending_detail(&pool, "ocid-d").await.unwrap();
    assert_eq!(pending.len(), 1);

    ItemDetailRepo::upsert(
        &pool,
        row.id,
        &ItemDetail {
            attack: Some(150),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(InventoryRepo::list_pending_detail(&pool, "ocid-d")
        .await
        .unwrap()
        .is_empty());
    let detail = ItemDetailRepo::find_by_item(&pool, row.id).await.unwrap().unwrap();
    assert_eq!(detail.attack, Some(150));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_task_update_and_last_success(pool: PgPool) {
    seed_character(&pool, "ocid-t").await;
    let id = uuid::Uuid::now_v7();
    TaskRepo::create(
        &pool,
        &CreateCrawlTask {
            id,
            character_id: "ocid-t".into(),
            subtypes: vec![CrawlSubtype::ApiData],
        },
    )
    .await
    .unwrap();

    assert!(TaskRepo::last_success_at(&pool, "ocid-t").await.unwrap().is_none());

    let updated = TaskRepo::update(
        &pool,
        id,
        &UpdateCrawlTask {
            status: CrawlStatus::Success,
            progress: 100,
            retry_count: 0,
            error_kind: None,
            error_detail: None,
            technical_error: None,
            result: Some(serde_json::json!({"api_data": {"status": "success"}})),
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.status(), CrawlStatus::Success);
    assert!(TaskRepo::last_success_at(&pool, "ocid-t").await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_notification_success_is_unique_per_checkpoint(pool: PgPool) {
    let user_id = seed_user(&pool).await;
    let input = CreateNotification {
        user_id,
        item_id: 99,
        item_source: ItemSource::Inventory,
        item_name: "펫".into(),
        character_name: "메이플용사".into(),
        checkpoint: Checkpoint::D3,
        channel: "email".into(),
        expiry_at: Utc::now() + Duration::days(3),
        success: true,
        error: None,
    };

    let first = NotificationRepo::create(&pool, &input).await.unwrap();
    assert!(first.is_some());
    let second = NotificationRepo::create(&pool, &input).await.unwrap();
    assert!(second.is_none());

    let id = first.unwrap().id;
    assert!(NotificationRepo::mark_read(&pool, id).await.unwrap());
    assert!(!NotificationRepo::mark_read(&pool, id).await.unwrap());
}
