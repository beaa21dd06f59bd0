//! In-process implementation of every store trait.
//!
//! Mirrors the Postgres constraints that the pipeline relies on: one
//! history row per character and day, append-only item rows, and at most
//! one successful notification per item and checkpoint.

use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use mapletrack_core::checkpoint::Checkpoint;
use mapletrack_core::item::{ItemDetail, ItemSource, ParsedItem};
use mapletrack_core::types::{DbId, TaskId, Timestamp};

use crate::models::character::{
    Character, CharacterBasic, CharacterHistory, HistorySnapshot, RegisterCharacter,
};
use crate::models::item::{
    options_json, ExpiringItem, InventoryItem, ItemDetailRow, StorageItem, SHARED_STORAGE_KIND,
};
use crate::models::notification::{CreateNotification, ExpiryNotification};
use crate::models::task::{CrawlTask, CreateCrawlTask, UpdateCrawlTask};
use crate::models::user::{NotificationSettings, User};
use crate::store::{CharacterStore, ItemStore, NotificationStore, TaskStore};

#[derive(Default)]
struct State {
    next_id: DbId,
    users: Vec<User>,
    settings: Vec<NotificationSettings>,
    characters: Vec<Character>,
    history: Vec<CharacterHistory>,
    inventory: Vec<InventoryItem>,
    storage: Vec<StorageItem>,
    storage_meso: Vec<(String, Option<i64>, Timestamp)>,
    details: Vec<ItemDetailRow>,
    tasks: Vec<CrawlTask>,
    notifications: Vec<ExpiryNotification>,
}

impl State {
    fn id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn character_mut(&mut self, ocid: &str) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.ocid == ocid)
    }
}

/// Store backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create a user row.
    pub fn insert_user(&self, email: Option<&str>, notification_enabled: bool) -> User {
        let mut state = self.lock();
        let user = User {
            id: state.id(),
            email: email.map(str::to_string),
            notification_enabled,
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        user
    }

    /// Replace a user's notification settings.
    pub fn put_settings(&self, settings: NotificationSettings) {
        let mut state = self.lock();
        state.settings.retain(|s| s.user_id != settings.user_id);
        state.settings.push(settings);
    }

    /// Overwrite a task's `updated_at`, for fixtures that need an older run.
    pub fn set_task_updated_at(&self, id: TaskId, at: Timestamp) {
        if let Some(task) = self.lock().tasks.iter_mut().find(|t| t.id == id) {
            task.updated_at = at;
        }
    }

    /// Overwrite a character's `updated_at`.
    pub fn set_character_updated_at(&self, ocid: &str, at: Option<Timestamp>) {
        if let Some(c) = self.lock().character_mut(ocid) {
            c.updated_at = at;
        }
    }

    /// Every history row for a character.
    pub fn history_for(&self, ocid: &str) -> Vec<CharacterHistory> {
        self.lock()
            .history
            .iter()
            .filter(|h| h.character_id == ocid)
            .cloned()
            .collect()
    }

    /// Every notification record, including deleted ones.
    pub fn all_notifications(&self) -> Vec<ExpiryNotification> {
        self.lock().notifications.clone()
    }

    pub fn detail_for(&self, inventory_item_id: DbId) -> Option<ItemDetailRow> {
        self.lock()
            .details
            .iter()
            .find(|d| d.inventory_item_id == inventory_item_id)
            .cloned()
    }

    pub fn storage_meso_for(&self, ocid: &str) -> Vec<(Option<i64>, Timestamp)> {
        self.lock()
            .storage_meso
            .iter()
            .filter(|(c, _, _)| c == ocid)
            .map(|(_, m, t)| (*m, *t))
            .collect()
    }
}

fn not_registered() -> sqlx::Error {
    sqlx::Error::RowNotFound
}

#[async_trait::async_trait]
impl CharacterStore for MemoryStore {
    async fn register(&self, input: &RegisterCharacter) -> Result<Character, sqlx::Error> {
        let mut state = self.lock();
        if let Some(existing) = state.character_mut(&input.ocid) {
            existing.name = input.name.clone();
            if input.user_id.is_some() {
                existing.user_id = input.user_id;
            }
            return Ok(existing.clone());
        }
        let character = Character {
            ocid: input.ocid.clone(),
            name: input.name.clone(),
            world: None,
            class: None,
            level: None,
            image_url: None,
            user_id: input.user_id,
            base_url: None,
            meso: None,
            popularity: None,
            stat: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        state.characters.push(character.clone());
        Ok(character)
    }

    async fn find_character(&self, ocid: &str) -> Result<Option<Character>, sqlx::Error> {
        Ok(self.lock().characters.iter().find(|c| c.ocid == ocid).cloned())
    }

    async fn update_basic(
        &self,
        ocid: &str,
        basic: &CharacterBasic,
    ) -> Result<Option<Character>, sqlx::Error> {
        let mut state = self.lock();
        Ok(state.character_mut(ocid).map(|c| {
            c.name = basic.name.clone();
            c.world = basic.world.clone();
            c.class = basic.class.clone();
            c.level = Some(basic.level);
            c.image_url = basic.image_url.clone();
            c.updated_at = Some(Utc::now());
            c.clone()
        }))
    }

    async fn update_popularity(&self, ocid: &str, popularity: i32) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        Ok(state
            .character_mut(ocid)
            .map(|c| {
                c.popularity = Some(popularity);
                c.updated_at = Some(Utc::now());
            })
            .is_some())
    }

    async fn update_stat(
        &self,
        ocid: &str,
        stat: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        Ok(state
            .character_mut(ocid)
            .map(|c| {
                c.stat = Some(stat.clone());
                c.updated_at = Some(Utc::now());
            })
            .is_some())
    }

    async fn update_meso(&self, ocid: &str, meso: Option<i64>) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        Ok(state
            .character_mut(ocid)
            .map(|c| {
                c.meso = meso;
                c.updated_at = Some(Utc::now());
            })
            .is_some())
    }

    async fn update_base_url(&self, ocid: &str, base_url: &str) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        Ok(state
            .character_mut(ocid)
            .map(|c| c.base_url = Some(base_url.to_string()))
            .is_some())
    }

    async fn find_owner(&self, ocid: &str) -> Result<Option<User>, sqlx::Error> {
        let state = self.lock();
        let user_id = state
            .characters
            .iter()
            .find(|c| c.ocid == ocid)
            .and_then(|c| c.user_id);
        Ok(user_id.and_then(|id| state.users.iter().find(|u| u.id == id).cloned()))
    }

    async fn upsert_history(
        &self,
        ocid: &str,
        local_date: NaiveDate,
        snapshot: &HistorySnapshot,
    ) -> Result<CharacterHistory, sqlx::Error> {
        let mut state = self.lock();
        let current_meso = state
            .characters
            .iter()
            .find(|c| c.ocid == ocid)
            .ok_or_else(not_registered)?
            .meso;
        let now = Utc::now();

        if let Some(row) = state
            .history
            .iter_mut()
            .find(|h| h.character_id == ocid && h.local_date == local_date)
        {
            row.level = snapshot.level;
            row.exp = snapshot.exp;
            row.guild_name = snapshot.guild_name.clone();
            row.image_url = snapshot.image_url.clone();
            row.access_flag = snapshot.access_flag;
            row.meso = current_meso.or(row.meso);
            row.updated_at = now;
            return Ok(row.clone());
        }

        let row = CharacterHistory {
            id: state.id(),
            character_id: ocid.to_string(),
            local_date,
            level: snapshot.level,
            exp: snapshot.exp,
            guild_name: snapshot.guild_name.clone(),
            image_url: snapshot.image_url.clone(),
            access_flag: snapshot.access_flag,
            meso: current_meso,
            created_at: now,
            updated_at: now,
        };
        state.history.push(row.clone());
        Ok(row)
    }

    async fn update_history_meso(
        &self,
        ocid: &str,
        local_date: NaiveDate,
        meso: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        Ok(state
            .history
            .iter_mut()
            .find(|h| h.character_id == ocid && h.local_date == local_date)
            .map(|h| {
                h.meso = meso;
                h.updated_at = Utc::now();
            })
            .is_some())
    }

    async fn find_history(
        &self,
        ocid: &str,
        local_date: NaiveDate,
    ) -> Result<Option<CharacterHistory>, sqlx::Error> {
        Ok(self
            .lock()
            .history
            .iter()
            .find(|h| h.character_id == ocid && h.local_date == local_date)
            .cloned())
    }
}

#[async_trait::async_trait]
impl ItemStore for MemoryStore {
    async fn insert_inventory(
        &self,
        ocid: &str,
        item: &ParsedItem,
        crawled_at: Timestamp,
    ) -> Result<InventoryItem, sqlx::Error> {
        let mut state = self.lock();
        if !state.characters.iter().any(|c| c.ocid == ocid) {
            return Err(not_registered());
        }
        let row = InventoryItem {
            id: state.id(),
            character_id: ocid.to_string(),
            slot_index: item.slot_index,
            item_type: item.item_type.as_str().to_string(),
            name: item.name.clone(),
            icon_url: item.icon_url.clone(),
            quantity: item.quantity,
            options: options_json(&item.options),
            detail_url: item.detail_url.clone(),
            expiry_at: item.expiry_at,
            has_detail: false,
            crawled_at,
        };
        state.inventory.push(row.clone());
        Ok(row)
    }

    async fn insert_storage(
        &self,
        ocid: &str,
        item: &ParsedItem,
        crawled_at: Timestamp,
    ) -> Result<StorageItem, sqlx::Error> {
        let mut state = self.lock();
        if !state.characters.iter().any(|c| c.ocid == ocid) {
            return Err(not_registered());
        }
        let row = StorageItem {
            id: state.id(),
            character_id: ocid.to_string(),
            storage_kind: SHARED_STORAGE_KIND.to_string(),
            slot_index: item.slot_index,
            item_type: item.item_type.as_str().to_string(),
            name: item.name.clone(),
            icon_url: item.icon_url.clone(),
            quantity: item.quantity,
            options: options_json(&item.options),
            detail_url: item.detail_url.clone(),
            expiry_at: item.expiry_at,
            crawled_at,
        };
        state.storage.push(row.clone());
        Ok(row)
    }

    async fn insert_storage_meso(
        &self,
        ocid: &str,
        meso: Option<i64>,
        crawled_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        self.lock()
            .storage_meso
            .push((ocid.to_string(), meso, crawled_at));
        Ok(())
    }

    async fn latest_inventory_crawl(&self, ocid: &str) -> Result<Option<Timestamp>, sqlx::Error> {
        Ok(self
            .lock()
            .inventory
            .iter()
            .filter(|i| i.character_id == ocid)
            .map(|i| i.crawled_at)
            .max())
    }

    async fn pending_detail_items(&self, ocid: &str) -> Result<Vec<InventoryItem>, sqlx::Error> {
        let mut rows: Vec<InventoryItem> = self
            .lock()
            .inventory
            .iter()
            .filter(|i| i.character_id == ocid && i.detail_url.is_some() && !i.has_detail)
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.id);
        Ok(rows)
    }

    async fn upsert_detail(
        &self,
        inventory_item_id: DbId,
        detail: &ItemDetail,
    ) -> Result<ItemDetailRow, sqlx::Error> {
        let mut state = self.lock();
        let item = state
            .inventory
            .iter_mut()
            .find(|i| i.id == inventory_item_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        item.has_detail = true;

        let now = Utc::now();
        let existing = state
            .details
            .iter()
            .position(|d| d.inventory_item_id == inventory_item_id);
        let (id, created_at) = match existing {
            Some(pos) => {
                let old = state.details.remove(pos);
                (old.id, old.created_at)
            }
            None => (state.id(), now),
        };

        let row = ItemDetailRow {
            id,
            inventory_item_id,
            attack: detail.attack,
            magic_attack: detail.magic_attack,
            str_stat: detail.str_stat,
            dex_stat: detail.dex_stat,
            int_stat: detail.int_stat,
            luk_stat: detail.luk_stat,
            max_hp: detail.max_hp,
            max_mp: detail.max_mp,
            boss_damage: detail.boss_damage,
            ignore_defense: detail.ignore_defense,
            potential_grade: detail.potential_grade.clone(),
            potential_option_1: detail.potential_option_1.clone(),
            potential_option_2: detail.potential_option_2.clone(),
            potential_option_3: detail.potential_option_3.clone(),
            additional_grade: detail.additional_grade.clone(),
            additional_option_1: detail.additional_option_1.clone(),
            additional_option_2: detail.additional_option_2.clone(),
            additional_option_3: detail.additional_option_3.clone(),
            soul_name: detail.soul_name.clone(),
            soul_option: detail.soul_option.clone(),
            category: detail.category.clone(),
            required_level: detail.required_level,
            required_job: detail.required_job.clone(),
            created_at,
            updated_at: now,
        };
        state.details.push(row.clone());
        Ok(row)
    }

    async fn list_inventory(&self, ocid: &str) -> Result<Vec<InventoryItem>, sqlx::Error> {
        let mut rows: Vec<InventoryItem> = self
            .lock()
            .inventory
            .iter()
            .filter(|i| i.character_id == ocid)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.crawled_at
                .cmp(&a.crawled_at)
                .then(a.slot_index.cmp(&b.slot_index))
        });
        Ok(rows)
    }

    async fn list_storage(&self, ocid: &str) -> Result<Vec<StorageItem>, sqlx::Error> {
        let mut rows: Vec<StorageItem> = self
            .lock()
            .storage
            .iter()
            .filter(|i| i.character_id == ocid)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.crawled_at
                .cmp(&a.crawled_at)
                .then(a.slot_index.cmp(&b.slot_index))
        });
        Ok(rows)
    }

    async fn list_expiring(&self) -> Result<Vec<ExpiringItem>, sqlx::Error> {
        let state = self.lock();
        let mut out = Vec::new();

        for c in &state.characters {
            let newest = state
                .inventory
                .iter()
                .filter(|i| i.character_id == c.ocid)
                .map(|i| i.crawled_at)
                .max();
            for i in state.inventory.iter().filter(|i| {
                i.character_id == c.ocid && Some(i.crawled_at) == newest && i.expiry_at.is_some()
            }) {
                if let Some(expiry_at) = i.expiry_at {
                    out.push(ExpiringItem {
                        item_id: i.id,
                        source: ItemSource::Inventory.as_str().to_string(),
                        item_name: i.name.clone(),
                        item_type: i.item_type.clone(),
                        expiry_at,
                        character_id: c.ocid.clone(),
                        character_name: c.name.clone(),
                        user_id: c.user_id,
                    });
                }
            }
        }

        for c in &state.characters {
            let newest = state
                .storage
                .iter()
                .filter(|s| s.character_id == c.ocid)
                .map(|s| s.crawled_at)
                .max();
            for s in state
                .storage
                .iter()
                .filter(|s| s.character_id == c.ocid && Some(s.crawled_at) == newest)
            {
                if let Some(expiry_at) = s.expiry_at {
                    out.push(ExpiringItem {
                        item_id: s.id,
                        source: ItemSource::Storage.as_str().to_string(),
                        item_name: s.name.clone(),
                        item_type: s.item_type.clone(),
                        expiry_at,
                        character_id: c.ocid.clone(),
                        character_name: c.name.clone(),
                        user_id: c.user_id,
                    });
                }
            }
        }

        out.sort_by(|a, b| a.source.cmp(&b.source).then(a.item_id.cmp(&b.item_id)));
        Ok(out)
    }
}

#[async_trait::async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, input: &CreateCrawlTask) -> Result<CrawlTask, sqlx::Error> {
        let mut state = self.lock();
        if !state.characters.iter().any(|c| c.ocid == input.character_id) {
            return Err(not_registered());
        }
        let now = Utc::now();
        let task = CrawlTask {
            id: input.id,
            character_id: input.character_id.clone(),
            subtypes: input.subtype_strings(),
            status: "pending".to_string(),
            progress: 0,
            retry_count: 0,
            error_kind: None,
            error_detail: None,
            technical_error: None,
            result: None,
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: TaskId) -> Result<Option<CrawlTask>, sqlx::Error> {
        Ok(self.lock().tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn update_task(
        &self,
        id: TaskId,
        input: &UpdateCrawlTask,
    ) -> Result<Option<CrawlTask>, sqlx::Error> {
        let mut state = self.lock();
        Ok(state.tasks.iter_mut().find(|t| t.id == id).map(|t| {
            t.status = input.status.as_str().to_string();
            t.progress = input.progress;
            t.retry_count = input.retry_count;
            t.error_kind = input.error_kind.map(|k| k.as_str().to_string());
            t.error_detail = input.error_detail.clone();
            t.technical_error = input.technical_error.clone();
            if input.result.is_some() {
                t.result = input.result.clone();
            }
            t.updated_at = Utc::now();
            t.clone()
        }))
    }

    async fn list_tasks(
        &self,
        character_id: &str,
        limit: i64,
    ) -> Result<Vec<CrawlTask>, sqlx::Error> {
        let state = self.lock();
        // Insertion order is creation order.
        Ok(state
            .tasks
            .iter()
            .rev()
            .filter(|t| t.character_id == character_id)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn last_success_at(&self, character_id: &str) -> Result<Option<Timestamp>, sqlx::Error> {
        Ok(self
            .lock()
            .tasks
            .iter()
            .filter(|t| t.character_id == character_id && t.status == "success")
            .map(|t| t.updated_at)
            .max())
    }
}

#[async_trait::async_trait]
impl NotificationStore for MemoryStore {
    async fn find_user(&self, id: DbId) -> Result<Option<User>, sqlx::Error> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_settings(
        &self,
        user_id: DbId,
    ) -> Result<Option<NotificationSettings>, sqlx::Error> {
        Ok(self
            .lock()
            .settings
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn exists_success(
        &self,
        item_id: DbId,
        source: ItemSource,
        checkpoint: Checkpoint,
    ) -> Result<bool, sqlx::Error> {
        Ok(self.lock().notifications.iter().any(|n| {
            n.success
                && n.item_id == item_id
                && n.item_source == source.as_str()
                && n.checkpoint == checkpoint.as_str()
        }))
    }

    async fn create_notification(
        &self,
        input: &CreateNotification,
    ) -> Result<Option<ExpiryNotification>, sqlx::Error> {
        let mut state = self.lock();
        let duplicate = input.success
            && state.notifications.iter().any(|n| {
                n.success
                    && n.item_id == input.item_id
                    && n.item_source == input.item_source.as_str()
                    && n.checkpoint == input.checkpoint.as_str()
            });
        if duplicate {
            return Ok(None);
        }

        let row = ExpiryNotification {
            id: state.id(),
            user_id: input.user_id,
            item_id: input.item_id,
            item_source: input.item_source.as_str().to_string(),
            item_name: input.item_name.clone(),
            character_name: input.character_name.clone(),
            checkpoint: input.checkpoint.as_str().to_string(),
            channel: input.channel.clone(),
            expiry_at: input.expiry_at,
            success: input.success,
            error: input.error.clone(),
            created_at: Utc::now(),
            read_at: None,
            deleted_at: None,
        };
        state.notifications.push(row.clone());
        Ok(Some(row))
    }

    async fn list_notifications(
        &self,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<ExpiryNotification>, sqlx::Error> {
        Ok(self
            .lock()
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id && n.deleted_at.is_none())
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn mark_read(&self, id: DbId) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        Ok(state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.read_at.is_none() && n.deleted_at.is_none())
            .map(|n| n.read_at = Some(Utc::now()))
            .is_some())
    }

    async fn soft_delete_notification(&self, id: DbId) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        Ok(state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.deleted_at.is_none())
            .map(|n| n.deleted_at = Some(Utc::now()))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use mapletrack_core::item::{ItemOptions, ItemType};

    use super::*;

    async fn registered(store: &MemoryStore, ocid: &str) {
        store
            .register(&RegisterCharacter {
                ocid: ocid.into(),
                name: "메이플용사".into(),
                user_id: None,
            })
            .await
            .unwrap();
    }

    fn parsed(slot: i32, expiry_at: Option<Timestamp>) -> ParsedItem {
        ParsedItem {
            slot_index: slot,
            item_type: ItemType::Cash,
            name: format!("item {slot}"),
            icon_url: None,
            quantity: 1,
            options: ItemOptions::default(),
            detail_url: None,
            expiry_at,
        }
    }

    #[tokio::test]
    async fn history_upsert_keeps_one_row_per_day() {
        let store = MemoryStore::new();
        registered(&store, "ocid-1").await;
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let mut snap = HistorySnapshot {
            level: 250,
            ..Default::default()
        };
        store.upsert_history("ocid-1", day, &snap).await.unwrap();
        snap.level = 251;
        store.upsert_history("ocid-1", day, &snap).await.unwrap();

        let rows = store.history_for("ocid-1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].level, 251);
    }

    #[tokio::test]
    async fn history_copies_current_meso() {
        let store = MemoryStore::new();
        registered(&store, "ocid-1").await;
        store.update_meso("ocid-1", Some(1_000)).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let row = store
            .upsert_history("ocid-1", day, &HistorySnapshot::default())
            .await
            .unwrap();
        assert_eq!(row.meso, Some(1_000));
    }

    #[tokio::test]
    async fn registration_does_not_mark_recent() {
        let store = MemoryStore::new();
        registered(&store, "ocid-1").await;
        let c = store.find_character("ocid-1").await.unwrap().unwrap();
        assert!(c.updated_at.is_none());

        store.update_base_url("ocid-1", "https://x/y?p=1").await.unwrap();
        let c = store.find_character("ocid-1").await.unwrap().unwrap();
        assert!(c.updated_at.is_none());
    }

    #[tokio::test]
    async fn expiring_items_come_from_newest_run_only() {
        let store = MemoryStore::new();
        registered(&store, "ocid-1").await;
        let old = Utc::now() - Duration::hours(2);
        let new = Utc::now();
        let expiry = Some(Utc::now() + Duration::days(3));

        store.insert_inventory("ocid-1", &parsed(0, expiry), old).await.unwrap();
        let fresh = store.insert_inventory("ocid-1", &parsed(0, expiry), new).await.unwrap();
        store.insert_inventory("ocid-1", &parsed(1, None), new).await.unwrap();

        let expiring = store.list_expiring().await.unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].item_id, fresh.id);
        assert_eq!(expiring[0].item_source(), ItemSource::Inventory);
    }

    #[tokio::test]
    async fn second_successful_notification_is_rejected() {
        let store = MemoryStore::new();
        let user = store.insert_user(Some("a@example.com"), true);
        let input = CreateNotification {
            user_id: user.id,
            item_id: 7,
            item_source: ItemSource::Inventory,
            item_name: "x".into(),
            character_name: "y".into(),
            checkpoint: Checkpoint::D3,
            channel: "email".into(),
            expiry_at: Utc::now(),
            success: true,
            error: None,
        };
        assert!(store.create_notification(&input).await.unwrap().is_some());
        assert!(store.create_notification(&input).await.unwrap().is_none());

        // Failed attempts are always recorded.
        let failed = CreateNotification {
            success: false,
            error: Some("smtp".into()),
            ..input
        };
        assert!(store.create_notification(&failed).await.unwrap().is_some());
        assert_eq!(store.all_notifications().len(), 2);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let store = MemoryStore::new();
        let user = store.insert_user(None, true);
        let n = store
            .create_notification(&CreateNotification {
                user_id: user.id,
                item_id: 1,
                item_source: ItemSource::Storage,
                item_name: "x".into(),
                character_name: "y".into(),
                checkpoint: Checkpoint::Expired,
                channel: "email".into(),
                expiry_at: Utc::now(),
                success: true,
                error: None,
            })
            .await
            .unwrap()
            .unwrap();

        assert!(store.mark_read(n.id).await.unwrap());
        let first = store.all_notifications()[0].read_at;
        assert!(!store.mark_read(n.id).await.unwrap());
        assert_eq!(store.all_notifications()[0].read_at, first);

        assert!(store.soft_delete_notification(n.id).await.unwrap());
        assert!(store.list_notifications(user.id, 10).await.unwrap().is_empty());
    }
}
