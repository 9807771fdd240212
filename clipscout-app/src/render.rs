use clipscout_common::snippet;
use clipscout_search::{AggregatedResult, SearchRequest};
use clipscout_social::tiktok::VideoItem;

fn count(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}

fn row(rank: usize, item: &VideoItem) -> String {
    let published = item
        .created_at()
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into());
    let author = item
        .author_handle()
        .map(|h| format!("@{h}"))
        .unwrap_or_else(|| "-".into());
    let desc = snippet(item.desc.as_deref().unwrap_or("").trim(), 60).replace('\n', " ");
    format!(
        "{rank:>4}  {published:<16}  {likes:>9}  {plays:>10}  {author:<20}  {desc}",
        likes = count(item.like_count()),
        plays = count(item.play_count()),
    )
}

/// Human-readable summary of one run.
pub fn summary(request: &SearchRequest, result: &AggregatedResult, max_pages: usize) -> String {
    let mut out = format!(
        "query: {:?}  publish_time: {}  sort_by: {}\n\
         pages fetched: {}/{}  checked: {}  kept: {}  filtered out: {}  credits remaining: {}\n",
        request.query.trim(),
        request.publish_time,
        request.sort_by,
        result.pages_fetched,
        max_pages,
        result.total_checked,
        result.items.len(),
        result.filtered_out,
        result.credits_remaining,
    );
    if result.items.is_empty() {
        out.push_str("no videos matched\n");
        return out;
    }
    out.push_str(&format!(
        "{:>4}  {:<16}  {:>9}  {:>10}  {:<20}  {}\n",
        "#", "published (UTC)", "likes", "plays", "author", "description"
    ));
    for (idx, item) in result.items.iter().enumerate() {
        out.push_str(&row(idx + 1, item));
        out.push('\n');
    }
    out
}
