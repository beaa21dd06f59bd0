//! Repository for the `item_details` table.

use mapletrack_core::item::ItemDetail;
use mapletrack_core::types::DbId;
use sqlx::PgPool;

use crate::models::item::ItemDetailRow;

const COLUMNS: &str = "id, inventory_item_id, attack, magic_attack, str_stat, dex_stat, \
    int_stat, luk_stat, max_hp, max_mp, boss_damage, ignore_defense, potential_grade, \
    potential_option_1, potential_option_2, potential_option_3, additional_grade, \
    additional_option_1, additional_option_2, additional_option_3, soul_name, soul_option, \
    category, required_level, required_job, created_at, updated_at";

pub struct ItemDetailRepo;

impl ItemDetailRepo {
    /// Upsert the detail row and flip `has_detail` on its inventory item.
    ///
    /// Both writes commit together.
    pub async fn upsert(
        pool: &PgPool,
        inventory_item_id: DbId,
        detail: &ItemDetail,
    ) -> Result<ItemDetailRow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO item_details \
                (inventory_item_id, attack, magic_attack, str_stat, dex_stat, int_stat, \
                 luk_stat, max_hp, max_mp, boss_damage, ignore_defense, potential_grade, \
                 potential_option_1, potential_option_2, potential_option_3, additional_grade, \
                 additional_option_1, additional_option_2, additional_option_3, soul_name, \
                 soul_option, category, required_level, required_job) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                     $17, $18, $19, $20, $21, $22, $23, $24) \
             ON CONFLICT (inventory_item_id) DO UPDATE SET \
                attack = EXCLUDED.attack, \
                magic_attack = EXCLUDED.magic_attack, \
                str_stat = EXCLUDED.str_stat, \
                dex_stat = EXCLUDED.dex_stat, \
                int_stat = EXCLUDED.int_stat, \
                luk_stat = EXCLUDED.luk_stat, \
                max_hp = EXCLUDED.max_hp, \
                max_mp = EXCLUDED.max_mp, \
                boss_damage = EXCLUDED.boss_damage, \
                ignore_defense = EXCLUDED.ignore_defense, \
                potential_grade = EXCLUDED.potential_grade, \
                potential_option_1 = EXCLUDED.potential_option_1, \
                potential_option_2 = EXCLUDED.potential_option_2, \
                potential_option_3 = EXCLUDED.potential_option_3, \
                additional_grade = EXCLUDED.additional_grade, \
                additional_option_1 = EXCLUDED.additional_option_1, \
                additional_option_2 = EXCLUDED.additional_option_2, \
                additional_option_3 = EXCLUDED.additional_option_3, \
                soul_name = EXCLUDED.soul_name, \
                soul_option = EXCLUDED.soul_option, \
                category = EXCLUDED.category, \
                required_level = EXCLUDED.required_level, \
                required_job = EXCLUDED.required_job, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ItemDetailRow>(&query)
            .bind(inventory_item_id)
            .bind(detail.attack)
            .bind(detail.magic_attack)
            .bind(detail.str_stat)
            .bind(detail.dex_stat)
            .bind(detail.int_stat)
            .bind(detail.luk_stat)
            .bind(detail.max_hp)
            .bind(detail.max_mp)
            .bind(detail.boss_damage)
            .bind(detail.ignore_defense)
            .bind(&detail.potential_grade)
            .bind(&detail.potential_option_1)
            .bind(&detail.potential_option_2)
            .bind(&detail.potential_option_3)
            .bind(&detail.additional_grade)
            .bind(&detail.additional_option_1)
            .bind(&detail.additional_option_2)
            .bind(&detail.additional_option_3)
            .bind(&detail.soul_name)
            .bind(&detail.soul_option)
            .bind(&detail.category)
            .bind(detail.required_level)
            .bind(&detail.required_job)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE inventory_items SET has_detail = TRUE WHERE id = $1")
            .bind(inventory_item_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    pub async fn find_by_item(
        pool: &PgPool,
        inventory_item_id: DbId,
    ) -> Result<Option<ItemDetailRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM item_details WHERE inventory_item_id = $1");
        sqlx::query_as::<_, ItemDetailRow>(&query)
            .bind(inventory_item_id)
            .fetch_optional(pool)
            .await
    }
}
