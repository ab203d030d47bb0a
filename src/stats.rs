use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::{CatalogApi, VideoItem};
use crate::diagnostics::Diagnostics;
use crate::duration::parse_duration;

/// Largest number of ids accepted by one `videos` call.
pub const MAX_BATCH_SIZE: usize = 50;

const VIDEO_PARTS: &str = "statistics,snippet,contentDetails";

/// Per-video statistics as stored in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    /// Length in seconds.
    pub duration: u64,
    pub published_at: String,
    #[serde(default)]
    pub thumbnail: String,
}

impl VideoRecord {
    pub fn from_item(item: VideoItem) -> Self {
        let statistics = item.statistics.unwrap_or_default();
        let duration = item
            .content_details
            .and_then(|details| details.duration)
            .map(|d| parse_duration(&d))
            .unwrap_or(0);

        Self {
            id: item.id,
            title: item.snippet.title,
            views: parse_count(statistics.view_count.as_deref()),
            likes: parse_count(statistics.like_count.as_deref()),
            comments: parse_count(statistics.comment_count.as_deref()),
            duration,
            published_at: item.snippet.published_at,
            thumbnail: item
                .snippet
                .thumbnails
                .high
                .map(|t| t.url)
                .unwrap_or_default(),
        }
    }
}

fn parse_count(value: Option<&str>) -> u64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

/// A batch whose detail call failed; its ids are missing from the result.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkFailure {
    /// Position of the first id of the chunk in the input.
    pub offset: usize,
    pub ids: Vec<String>,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BatchStats {
    pub records: BTreeMap<String, VideoRecord>,
    pub failed_chunks: Vec<ChunkFailure>,
}

pub struct BatchStatsFetcher<'a, C: CatalogApi + ?Sized> {
    catalog: &'a C,
    delay: Duration,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a, C: CatalogApi + ?Sized> BatchStatsFetcher<'a, C> {
    pub fn new(catalog: &'a C, delay: Duration, diagnostics: &'a dyn Diagnostics) -> Self {
        Self {
            catalog,
            delay,
            diagnostics,
        }
    }

    /// Fetch details for `ids` in chunks of at most fifty. A failing chunk is
    /// skipped and the remaining chunks are still requested.
    pub async fn fetch_stats(&self, ids: &[String]) -> BatchStats {
        let mut stats = BatchStats::default();

        for (index, chunk) in ids.chunks(MAX_BATCH_SIZE).enumerate() {
            let offset = index * MAX_BATCH_SIZE;
            let last = offset + chunk.len() - 1;

            match self.catalog.list_videos(chunk, VIDEO_PARTS).await {
                Ok(response) => {
                    let requested: HashSet<&str> = chunk.iter().map(String::as_str).collect();
                    for item in response.items {
                        if requested.contains(item.id.as_str()) {
                            stats.records.insert(item.id.clone(), VideoRecord::from_item(item));
                        }
                    }
                    self.diagnostics.info(&format!(
                        "Processed {} videos (ids {}-{})",
                        chunk.len(),
                        offset,
                        last
                    ));
                }
                Err(e) => {
                    self.diagnostics.error(&format!(
                        "Failed to fetch statistics for batch {}-{}: {}",
                        offset, last, e
                    ));
                    stats.failed_chunks.push(ChunkFailure {
                        offset,
                        ids: chunk.to_vec(),
                        error: e.to_string(),
                    });
                }
            }

            tokio::time::sleep(self.delay).await;
        }

        stats
    }
}
