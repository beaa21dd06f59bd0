//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod character_repo;
pub mod history_repo;
pub mod inventory_repo;
pub mod item_detail_repo;
pub mod notification_repo;
pub mod storage_repo;
pub mod task_repo;
pub mod user_repo;

pub use character_repo::CharacterRepo;
pub use history_repo::HistoryRepo;
pub use inventory_repo::InventoryRepo;
pub use item_detail_repo::ItemDetailRepo;
pub use notification_repo::NotificationRepo;
pub use storage_repo::StorageRepo;
pub use task_repo::TaskRepo;
pub use user_repo::UserRepo;
