#![allow(dead_code)]

use async_trait::async_trait;
use clipscout_common::observability::{LogConfig, LogFormat};
use clipscout_search::PageSource;
use clipscout_social::tiktok::{FetchError, PageRequest, PageResult, VideoItem};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "clipscout-tests",
            emit_stderr: true,
            format: if std::env::var("CLIPSCOUT_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".to_string(),
            ..LogConfig::default()
        };

        clipscout_common::observability::init_logging(config).unwrap_or_default()
    });
}

pub fn video(id: &str, created: i64) -> VideoItem {
    serde_json::from_value(json!({"id": id, "create_time": created})).unwrap()
}

pub fn undated(id: &str) -> VideoItem {
    serde_json::from_value(json!({"id": id})).unwrap()
}

/// Scripted behaviour for one offset.
#[derive(Clone)]
pub enum Script {
    Page {
        items: Vec<VideoItem>,
        credits: u64,
        delay: Duration,
    },
    Status(u16),
    Hang,
}

impl Script {
    pub fn page(items: Vec<VideoItem>, credits: u64) -> Self {
        Script::Page {
            items,
            credits,
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(items: Vec<VideoItem>, credits: u64, delay: Duration) -> Self {
        Script::Page {
            items,
            credits,
            delay,
        }
    }
}

/// One observed call, captured with owned copies of the request fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenCall {
    pub api_key: String,
    pub query: String,
    pub publish_time: String,
    pub sort_by: String,
    pub cursor: Option<u32>,
}

/// In-memory page source keyed by offset (`None` cursor is offset 0).
/// Offsets without a script return an empty page.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: HashMap<u32, Script>,
    calls: Mutex<Vec<SeenCall>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Decrements the in-flight count when a call finishes or is cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, offset: u32, script: Script) -> Self {
        self.scripts.insert(offset, script);
        self
    }

    pub fn calls(&self) -> Vec<SeenCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of calls observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(&self.in_flight)
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<PageResult, FetchError> {
        let _in_flight = self.enter();
        self.calls.lock().unwrap().push(SeenCall {
            api_key: request.api_key.to_string(),
            query: request.query.to_string(),
            publish_time: request.publish_time.to_string(),
            sort_by: request.sort_by.to_string(),
            cursor: request.cursor,
        });

        let offset = request.cursor.unwrap_or(0);
        match self.scripts.get(&offset).cloned() {
            Some(Script::Page {
                items,
                credits,
                delay,
            }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(PageResult {
                    items,
                    credits_remaining: credits,
                    next_cursor: Some(u64::from(offset) + 30),
                    has_more: true,
                })
            }
            Some(Script::Status(status)) => Err(FetchError::Status {
                status,
                message: format!("scripted failure at {offset}"),
            }),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FetchError::Transport("unreachable".into()))
            }
            None => Ok(PageResult::default()),
        }
    }
}
