//! Row structs and DTOs.
//!
//! Each submodule holds the `FromRow` entity for its table plus the input
//! structs used by the matching repository.

pub mod character;
pub mod item;
pub mod notification;
pub mod task;
pub mod user;
