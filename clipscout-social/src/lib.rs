//! Short-video platform clients used by clipscout.
//!
//! Only the TikTok search pipeline (reached through the ScrapeCreators API)
//! is implemented. Each call fetches exactly one page; pagination strategy
//! lives in the search orchestrator, not here.
pub mod tiktok;
