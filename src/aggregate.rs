use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::annual::AnnualViews;
use crate::paginate::UploadEntry;
use crate::snapshot::ChannelSnapshot;
use crate::stats::VideoRecord;

/// Length of each ranking.
pub const TOP_N: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Views,
    Likes,
    Comments,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Views, Metric::Likes, Metric::Comments];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Views => "views",
            Metric::Likes => "likes",
            Metric::Comments => "comments",
        }
    }

    pub fn value(self, record: &VideoRecord) -> u64 {
        match self {
            Metric::Views => record.views,
            Metric::Likes => record.likes,
            Metric::Comments => record.comments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedVideo {
    pub video_id: String,
    pub data: VideoRecord,
}

/// Group upload ids by the leading four characters of their timestamp.
pub fn bucket_by_year(entries: &[UploadEntry]) -> BTreeMap<String, Vec<String>> {
    let mut buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in entries {
        let year: String = entry.published_at.chars().take(4).collect();
        buckets.entry(year).or_default().push(entry.video_id.clone());
    }
    buckets
}

/// Highest `limit` records by `metric`. Equal values keep the map's order.
pub fn top_videos(
    records: &BTreeMap<String, VideoRecord>,
    metric: Metric,
    limit: usize,
) -> Vec<RankedVideo> {
    let mut sorted: Vec<(&String, &VideoRecord)> = records.iter().collect();
    sorted.sort_by(|a, b| metric.value(b.1).cmp(&metric.value(a.1)));
    sorted
        .into_iter()
        .take(limit)
        .map(|(id, record)| RankedVideo {
            video_id: id.clone(),
            data: record.clone(),
        })
        .collect()
}

pub fn rank_all(records: &BTreeMap<String, VideoRecord>) -> BTreeMap<String, Vec<RankedVideo>> {
    Metric::ALL
        .iter()
        .map(|metric| (metric.as_str().to_string(), top_videos(records, *metric, TOP_N)))
        .collect()
}

/// Assemble the final snapshot from the stage outputs.
pub fn build_snapshot(
    channel_id: &str,
    extraction_date: DateTime<Utc>,
    annual_views: &AnnualViews,
    videos_by_year: BTreeMap<String, Vec<String>>,
    video_stats: BTreeMap<String, VideoRecord>,
) -> ChannelSnapshot {
    let top_videos = rank_all(&video_stats);
    ChannelSnapshot {
        channel_id: channel_id.to_string(),
        extraction_date,
        annual_views: annual_views.totals(),
        videos_by_year,
        video_stats,
        top_videos,
    }
}
