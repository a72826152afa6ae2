// Service exports
pub mod cache;
pub mod postgres;
pub mod vk;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use postgres::{FavoriteRecord, PostgresClient, PostgresError};
pub use vk::{search_filters, PhotoRef, SearchFilter, VkClient, VkError};
