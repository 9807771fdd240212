//! TikTok search surface: the HTTP client wrapper and the response models.
//!
//! Everything past `id` and `create_time` on a video is treated as opaque
//! payload and survives a decode/encode cycle unchanged.
pub mod client;
pub mod types;

pub use client::{FetchError, PageRequest, TikTokApi};
pub use types::{PageResult, SearchPageResponse, VideoItem};
