pub mod characters;
pub mod crawl;
pub mod monitoring;
pub mod notifications;
