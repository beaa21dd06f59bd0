//! Store traits the pipeline and background loops depend on.
//!
//! [`PgStore`] forwards each method to the matching repository; the
//! in-process [`MemoryStore`](crate::memory::MemoryStore) implements the
//! same contracts for single-node runs and tests.

use std::sync::Arc;

use chrono::NaiveDate;
use mapletrack_core::checkpoint::Checkpoint;
use mapletrack_core::item::{ItemDetail, ItemSource, ParsedItem};
use mapletrack_core::types::{DbId, TaskId, Timestamp};
use sqlx::PgPool;

use crate::models::character::{
    Character, CharacterBasic, CharacterHistory, HistorySnapshot, RegisterCharacter,
};
use crate::models::item::{ExpiringItem, InventoryItem, ItemDetailRow, StorageItem};
use crate::models::notification::{CreateNotification, ExpiryNotification};
use crate::models::task::{CrawlTask, CreateCrawlTask, UpdateCrawlTask};
use crate::models::user::{NotificationSettings, User};
use crate::repositories::{
    CharacterRepo, HistoryRepo, InventoryRepo, ItemDetailRepo, NotificationRepo, StorageRepo,
    TaskRepo, UserRepo,
};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Character identity and per-day history.
#[async_trait::async_trait]
pub trait CharacterStore: Send + Sync {
    async fn register(&self, input: &RegisterCharacter) -> Result<Character, sqlx::Error>;
    async fn find_character(&self, ocid: &str) -> Result<Option<Character>, sqlx::Error>;
    async fn update_basic(
        &self,
        ocid: &str,
        basic: &CharacterBasic,
    ) -> Result<Option<Character>, sqlx::Error>;
    async fn update_popularity(&self, ocid: &str, popularity: i32) -> Result<bool, sqlx::Error>;
    async fn update_stat(&self, ocid: &str, stat: &serde_json::Value)
        -> Result<bool, sqlx::Error>;
    async fn update_meso(&self, ocid: &str, meso: Option<i64>) -> Result<bool, sqlx::Error>;
    async fn update_base_url(&self, ocid: &str, base_url: &str) -> Result<bool, sqlx::Error>;
    async fn find_owner(&self, ocid: &str) -> Result<Option<User>, sqlx::Error>;

    async fn upsert_history(
        &self,
        ocid: &str,
        local_date: NaiveDate,
        snapshot: &HistorySnapshot,
    ) -> Result<CharacterHistory, sqlx::Error>;
    async fn update_history_meso(
        &self,
        ocid: &str,
        local_date: NaiveDate,
        meso: Option<i64>,
    ) -> Result<bool, sqlx::Error>;
    async fn find_history(
        &self,
        ocid: &str,
        local_date: NaiveDate,
    ) -> Result<Option<CharacterHistory>, sqlx::Error>;
}

/// Inventory, storage and item-detail rows.
#[async_trait::async_trait]
pub trait ItemStore: Send + Sync {
    async fn insert_inventory(
        &self,
        ocid: &str,
        item: &ParsedItem,
        crawled_at: Timestamp,
    ) -> Result<InventoryItem, sqlx::Error>;
    async fn insert_storage(
        &self,
        ocid: &str,
        item: &ParsedItem,
        crawled_at: Timestamp,
    ) -> Result<StorageItem, sqlx::Error>;
    async fn insert_storage_meso(
        &self,
        ocid: &str,
        meso: Option<i64>,
        crawled_at: Timestamp,
    ) -> Result<(), sqlx::Error>;
    async fn latest_inventory_crawl(&self, ocid: &str) -> Result<Option<Timestamp>, sqlx::Error>;
    async fn pending_detail_items(&self, ocid: &str) -> Result<Vec<InventoryItem>, sqlx::Error>;
    async fn upsert_detail(
        &self,
        inventory_item_id: DbId,
        detail: &ItemDetail,
    ) -> Result<ItemDetailRow, sqlx::Error>;
    async fn list_inventory(&self, ocid: &str) -> Result<Vec<InventoryItem>, sqlx::Error>;
    async fn list_storage(&self, ocid: &str) -> Result<Vec<StorageItem>, sqlx::Error>;
    /// Expiring rows from every character's newest runs, inventory first.
    async fn list_expiring(&self) -> Result<Vec<ExpiringItem>, sqlx::Error>;
}

/// Durable crawl task records.
#[async_trait::async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, input: &CreateCrawlTask) -> Result<CrawlTask, sqlx::Error>;
    async fn find_task(&self, id: TaskId) -> Result<Option<CrawlTask>, sqlx::Error>;
    async fn update_task(
        &self,
        id: TaskId,
        input: &UpdateCrawlTask,
    ) -> Result<Option<CrawlTask>, sqlx::Error>;
    async fn list_tasks(&self, character_id: &str, limit: i64)
        -> Result<Vec<CrawlTask>, sqlx::Error>;
    async fn last_success_at(&self, character_id: &str) -> Result<Option<Timestamp>, sqlx::Error>;
}

/// Users, their settings and expiry notification records.
#[async_trait::async_trait]
pub trait NotificationStore: Send + Sync {
    async fn find_user(&self, id: DbId) -> Result<Option<User>, sqlx::Error>;
    async fn get_settings(&self, user_id: DbId)
        -> Result<Option<NotificationSettings>, sqlx::Error>;
    async fn exists_success(
        &self,
        item_id: DbId,
        source: ItemSource,
        checkpoint: Checkpoint,
    ) -> Result<bool, sqlx::Error>;
    /// `None` when a successful record for the triple already exists.
    async fn create_notification(
        &self,
        input: &CreateNotification,
    ) -> Result<Option<ExpiryNotification>, sqlx::Error>;
    async fn list_notifications(
        &self,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<ExpiryNotification>, sqlx::Error>;
    async fn mark_read(&self, id: DbId) -> Result<bool, sqlx::Error>;
    async fn soft_delete_notification(&self, id: DbId) -> Result<bool, sqlx::Error>;
}

/// Handles to every store, cheap to clone into tasks.
#[derive(Clone)]
pub struct Stores {
    pub characters: Arc<dyn CharacterStore>,
    pub items: Arc<dyn ItemStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Stores {
    /// Use one backend for every store.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: CharacterStore + ItemStore + TaskStore + NotificationStore + 'static,
    {
        Self {
            characters: store.clone(),
            items: store.clone(),
            tasks: store.clone(),
            notifications: store,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self::shared(Arc::new(PgStore::new(pool)))
    }
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// Postgres-backed stores.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl CharacterStore for PgStore {
    async fn register(&self, input: &RegisterCharacter) -> Result<Character, sqlx::Error> {
        CharacterRepo::register(&self.pool, input).await
    }

    async fn find_character(&self, ocid: &str) -> Result<Option<Character>, sqlx::Error> {
        CharacterRepo::find_by_ocid(&self.pool, ocid).await
    }

    async fn update_basic(
        &self,
        ocid: &str,
        basic: &CharacterBasic,
    ) -> Result<Option<Character>, sqlx::Error> {
        CharacterRepo::update_basic(&self.pool, ocid, basic).await
    }

    async fn update_popularity(&self, ocid: &str, popularity: i32) -> Result<bool, sqlx::Error> {
        CharacterRepo::update_popularity(&self.pool, ocid, popularity).await
    }

    async fn update_stat(
        &self,
        ocid: &str,
        stat: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        CharacterRepo::update_stat(&self.pool, ocid, stat).await
    }

    async fn update_meso(&self, ocid: &str, meso: Option<i64>) -> Result<bool, sqlx::Error> {
        CharacterRepo::update_meso(&self.pool, ocid, meso).await
    }

    async fn update_base_url(&self, ocid: &str, base_url: &str) -> Result<bool, sqlx::Error> {
        CharacterRepo::update_base_url(&self.pool, ocid, base_url).await
    }

    async fn find_owner(&self, ocid: &str) -> Result<Option<User>, sqlx::Error> {
        CharacterRepo::find_owner(&self.pool, ocid).await
    }

    async fn upsert_history(
        &self,
        ocid: &str,
        local_date: NaiveDate,
        snapshot: &HistorySnapshot,
    ) -> Result<CharacterHistory, sqlx::Error> {
        HistoryRepo::upsert(&self.pool, ocid, local_date, snapshot).await
    }

    async fn update_history_meso(
        &self,
        ocid: &str,
        local_date: NaiveDate,
        meso: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        HistoryRepo::update_meso(&self.pool, ocid, local_date, meso).await
    }

    async fn find_history(
        &self,
        ocid: &str,
        local_date: NaiveDate,
    ) -> Result<Option<CharacterHistory>, sqlx::Error> {
        HistoryRepo::find(&self.pool, ocid, local_date).await
    }
}

#[async_trait::async_trait]
impl ItemStore for PgStore {
    async fn insert_inventory(
        &self,
        ocid: &str,
        item: &ParsedItem,
        crawled_at: Timestamp,
    ) -> Result<InventoryItem, sqlx::Error> {
        InventoryRepo::insert(&self.pool, ocid, item, crawled_at).await
    }

    async fn insert_storage(
        &self,
        ocid: &str,
        item: &ParsedItem,
        crawled_at: Timestamp,
    ) -> Result<StorageItem, sqlx::Error> {
        StorageRepo::insert(&self.pool, ocid, item, crawled_at).await
    }

    async fn insert_storage_meso(
        &self,
        ocid: &str,
        meso: Option<i64>,
        crawled_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        StorageRepo::insert_meso(&self.pool, ocid, meso, crawled_at).await
    }

    async fn latest_inventory_crawl(&self, ocid: &str) -> Result<Option<Timestamp>, sqlx::Error> {
        InventoryRepo::latest_crawled_at(&self.pool, ocid).await
    }

    async fn pending_detail_items(&self, ocid: &str) -> Result<Vec<InventoryItem>, sqlx::Error> {
        InventoryRepo::list_pending_detail(&self.pool, ocid).await
    }

    async fn upsert_detail(
        &self,
        inventory_item_id: DbId,
        detail: &ItemDetail,
    ) -> Result<ItemDetailRow, sqlx::Error> {
        ItemDetailRepo::upsert(&self.pool, inventory_item_id, detail).await
    }

    async fn list_inventory(&self, ocid: &str) -> Result<Vec<InventoryItem>, sqlx::Error> {
        InventoryRepo::list_for_character(&self.pool, ocid).await
    }

    async fn list_storage(&self, ocid: &str) -> Result<Vec<StorageItem>, sqlx::Error> {
        StorageRepo::list_for_character(&self.pool, ocid).await
    }

    async fn list_expiring(&self) -> Result<Vec<ExpiringItem>, sqlx::Error> {
        let mut items = InventoryRepo::list_expiring(&self.pool).await?;
        items.extend(StorageRepo::list_expiring(&self.pool).await?);
        Ok(items)
    }
}

#[async_trait::async_trait]
impl TaskStore for PgStore {
    async fn create_task(&self, input: &CreateCrawlTask) -> Result<CrawlTask, sqlx::Error> {
        TaskRepo::create(&self.pool, input).await
    }

    async fn find_task(&self, id: TaskId) -> Result<Option<CrawlTask>, sqlx::Error> {
        TaskRepo::find_by_id(&self.pool, id).await
    }

    async fn update_task(
        &self,
        id: TaskId,
        input: &UpdateCrawlTask,
    ) -> Result<Option<CrawlTask>, sqlx::Error> {
        TaskRepo::update(&self.pool, id, input).await
    }

    async fn list_tasks(
        &self,
        character_id: &str,
        limit: i64,
    ) -> Result<Vec<CrawlTask>, sqlx::Error> {
        TaskRepo::list_for_character(&self.pool, character_id, limit).await
    }

    async fn last_success_at(&self, character_id: &str) -> Result<Option<Timestamp>, sqlx::Error> {
        TaskRepo::last_success_at(&self.pool, character_id).await
    }
}

#[async_trait::async_trait]
impl NotificationStore for PgStore {
    async fn find_user(&self, id: DbId) -> Result<Option<User>, sqlx::Error> {
        UserRepo::find_by_id(&self.pool, id).await
    }

    async fn get_settings(
        &self,
        user_id: DbId,
    ) -> Result<Option<NotificationSettings>, sqlx::Error> {
        UserRepo::get_settings(&self.pool, user_id).await
    }

    async fn exists_success(
        &self,
        item_id: DbId,
        source: ItemSource,
        checkpoint: Checkpoint,
    ) -> Result<bool, sqlx::Error> {
        NotificationRepo::exists_success(&self.pool, item_id, source, checkpoint).await
    }

    async fn create_notification(
        &self,
        input: &CreateNotification,
    ) -> Result<Option<ExpiryNotification>, sqlx::Error> {
        NotificationRepo::create(&self.pool, input).await
    }

    async fn list_notifications(
        &self,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<ExpiryNotification>, sqlx::Error> {
        NotificationRepo::list_for_user(&self.pool, user_id, limit).await
    }

    async fn mark_read(&self, id: DbId) -> Result<bool, sqlx::Error> {
        NotificationRepo::mark_read(&self.pool, id).await
    }

    async fn soft_delete_notification(&self, id: DbId) -> Result<bool, sqlx::Error> {
        NotificationRepo::soft_delete(&self.pool, id).await
    }
}
