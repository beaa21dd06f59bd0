//! HTML parsers for the vendor's public character pages.
//!
//! All functions here are pure: rendered HTML in, typed values out. They
//! never fail; missing or malformed pieces become `None` or are skipped,
//! and field-level checks happen afterwards in
//! [`mapletrack_core::validation`].

pub mod expiry;
pub mod inventory;
pub mod item_detail;
pub mod meso;
pub mod ranking;
pub mod storage;
mod text;

pub use expiry::parse_expiry;
pub use inventory::parse_inventory;
pub use item_detail::parse_item_detail;
pub use meso::parse_meso;
pub use ranking::find_character_anchor;
pub use storage::parse_storage;
pub use text::absolutize;
