use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Raw body of `GET /v1/tiktok/search/top`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPageResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub credits_remaining: Option<u64>,
    /// Entries that do not decode as a [`VideoItem`] are skipped one by one.
    #[serde(default, deserialize_with = "lenient_items")]
    pub items: Option<Vec<VideoItem>>,
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub cursor: Option<u64>,
    #[serde(default)]
    pub has_more: Option<bool>,
}

/// One upstream page, normalized.
///
/// `next_cursor` and `has_more` are advisory; the orchestrator requests its
/// fixed offsets regardless.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    pub items: Vec<VideoItem>,
    /// Remaining upstream quota as of this call (a snapshot, not a total).
    pub credits_remaining: u64,
    pub next_cursor: Option<u64>,
    pub has_more: bool,
}

impl From<SearchPageResponse> for PageResult {
    fn from(resp: SearchPageResponse) -> Self {
        let has_more = resp.has_more.unwrap_or(resp.cursor.is_some());
        Self {
            items: resp.items.unwrap_or_default(),
            credits_remaining: resp.credits_remaining.unwrap_or_default(),
            next_cursor: resp.cursor,
            has_more,
        }
    }
}

/// A video as returned by the search API.
///
/// `id` is the only identity; `create_time` is kept exactly as received and
/// interpreted through [`VideoItem::created_at`]. Fields without a slot here
/// land in `extra` so re-serialization is lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VideoItem {
    /// Publication instant.
    ///
    /// Accepts Unix epoch seconds (JSON number or numeric string) and RFC 3339
    /// strings. Anything else yields `None`.
    ///
    /// ```
    /// use clipscout_social::tiktok::VideoItem;
    /// use serde_json::json;
    ///
    /// let item: VideoItem = serde_json::from_value(json!({
    ///     "id": "7",
    ///     "create_time": "1700000000"
    /// })).unwrap();
    /// assert_eq!(item.created_at().unwrap().timestamp(), 1_700_000_000);
    /// ```
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        match self.create_time.as_ref()? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            Value::String(s) => parse_timestamp(s),
            _ => None,
        }
    }

    pub fn play_count(&self) -> Option<u64> {
        self.stat("play_count")
    }

    /// Likes are reported as `digg_count` upstream.
    pub fn like_count(&self) -> Option<u64> {
        self.stat("digg_count")
    }

    pub fn comment_count(&self) -> Option<u64> {
        self.stat("comment_count")
    }

    pub fn share_count(&self) -> Option<u64> {
        self.stat("share_count")
    }

    pub fn author_handle(&self) -> Option<&str> {
        self.author.as_ref()?.get("unique_id")?.as_str()
    }

    fn stat(&self, key: &str) -> Option<u64> {
        value_as_u64(self.statistics.as_ref()?.get(key)?)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn value_as_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn lenient_items<'de, D>(deserializer: D) -> Result<Option<Vec<VideoItem>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<Vec<Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let total = raw.len();
    let items: Vec<VideoItem> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::debug!(
                    target: "social.tiktok",
                    index,
                    error = %e,
                    "tiktok.item.skipped"
                );
                None
            }
        })
        .collect();
    if items.len() < total {
        tracing::debug!(
            target: "social.tiktok",
            total,
            kept = items.len(),
            "tiktok.page.items_skipped"
        );
    }
    Ok(Some(items))
}

fn lenient_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(value_as_u64))
}
