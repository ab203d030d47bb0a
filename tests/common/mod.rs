#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde_json::json;

use yt_snapshot::api::{
    CatalogApi, ChannelListResponse, PlaylistItemListResponse, ReportResponse, ReportingApi,
    VideoListResponse,
};
use yt_snapshot::error::{Error, Result};

pub const CHANNEL: &str = "UCchannel";
pub const PLAYLIST: &str = "UUchannel";

/// Upload as it appears in the playlist listing.
#[derive(Clone)]
pub struct Upload {
    pub id: String,
    pub published_at: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
}

impl Upload {
    pub fn new(id: impl Into<String>, year: i32, views: u64) -> Self {
        Self {
            id: id.into(),
            published_at: format!("{}-06-01T12:00:00Z", year),
            views,
            likes: views / 10,
            comments: views / 100,
        }
    }
}

/// In-memory catalog serving a single channel.
#[derive(Default)]
pub struct FakeCatalog {
    pub channels: HashMap<String, String>,
    pub pages: Vec<Vec<Upload>>,
    pub failing_page: Option<usize>,
    pub failing_ids: HashSet<String>,
    pub fail_channels: bool,
    pub video_calls: Mutex<Vec<Vec<String>>>,
    pub page_calls: Mutex<Vec<(Option<String>, u32)>>,
}

impl FakeCatalog {
    pub fn with_uploads(uploads: Vec<Upload>, page_size: usize) -> Self {
        let mut channels = HashMap::new();
        channels.insert(CHANNEL.to_string(), PLAYLIST.to_string());
        Self {
            channels,
            pages: uploads.chunks(page_size).map(|c| c.to_vec()).collect(),
            ..Self::default()
        }
    }

    pub fn video_calls(&self) -> Vec<Vec<String>> {
        self.video_calls.lock().unwrap().clone()
    }

    fn upload(&self, id: &str) -> Option<&Upload> {
        self.pages.iter().flatten().find(|u| u.id == id)
    }
}

fn page_index(token: Option<&str>) -> usize {
    token
        .and_then(|t| t.strip_prefix("page-"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn list_channels(&self, channel_id: &str) -> Result<ChannelListResponse> {
        if self.fail_channels {
            return Err(Error::RemoteCall("channels: 503 Service Unavailable".to_string()));
        }
        let items: Vec<_> = self
            .channels
            .get(channel_id)
            .map(|playlist| json!({"contentDetails": {"relatedPlaylists": {"uploads": playlist}}}))
            .into_iter()
            .collect();
        Ok(serde_json::from_value(json!({ "items": items }))?)
    }

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<PlaylistItemListResponse> {
        self.page_calls
            .lock()
            .unwrap()
            .push((page_token.map(str::to_string), max_results));

        let index = page_index(page_token);
        if playlist_id != PLAYLIST || self.failing_page == Some(index) {
            return Err(Error::RemoteCall(format!("playlistItems page {} failed", index)));
        }

        let items: Vec<_> = self
            .pages
            .get(index)
            .map(|page| {
                page.iter()
                    .map(|u| {
                        json!({"snippet": {
                            "publishedAt": u.published_at,
                            "resourceId": {"videoId": u.id}
                        }})
                    })
                    .collect()
            })
            .unwrap_or_default();
        let next = (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1));

        Ok(serde_json::from_value(
            json!({ "items": items, "nextPageToken": next }),
        )?)
    }

    async fn list_videos(&self, ids: &[String], _parts: &str) -> Result<VideoListResponse> {
        self.video_calls.lock().unwrap().push(ids.to_vec());

        if ids.iter().any(|id| self.failing_ids.contains(id)) {
            return Err(Error::RemoteCall("videos: 500 Internal Server Error".to_string()));
        }

        let mut items: Vec<_> = ids
            .iter()
            .filter_map(|id| self.upload(id))
            .map(|u| {
                json!({
                    "id": u.id,
                    "snippet": {
                        "title": format!("Video {}", u.id),
                        "publishedAt": u.published_at,
                        "thumbnails": {"high": {"url": format!("https://i.ytimg.com/vi/{}/hq.jpg", u.id)}}
                    },
                    "statistics": {
                        "viewCount": u.views.to_string(),
                        "likeCount": u.likes.to_string(),
                        "commentCount": u.comments.to_string()
                    },
                    "contentDetails": {"duration": "PT4M20S"}
                })
            })
            .collect();
        // The service sometimes echoes ids that were not asked for.
        items.push(json!({"id": "unrequested", "snippet": {"title": "stray"}}));

        Ok(serde_json::from_value(json!({ "items": items }))?)
    }
}

/// Reporting surface keyed by calendar year.
#[derive(Default)]
pub struct FakeReporting {
    pub views: BTreeMap<i32, u64>,
    pub failing_years: HashSet<i32>,
    pub calls: Mutex<Vec<(NaiveDate, NaiveDate, String)>>,
}

impl FakeReporting {
    pub fn with_views(views: &[(i32, u64)]) -> Self {
        Self {
            views: views.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(NaiveDate, NaiveDate, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportingApi for FakeReporting {
    async fn query_report(
        &self,
        _channel_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        metrics: &str,
    ) -> Result<ReportResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((start_date, end_date, metrics.to_string()));

        let year = start_date.year();
        if self.failing_years.contains(&year) {
            return Err(Error::RemoteCall(format!("reports: quota exceeded for {}", year)));
        }
        let body = match self.views.get(&year) {
            Some(views) => json!({ "rows": [[views]] }),
            None => json!({}),
        };
        Ok(serde_json::from_value(body)?)
    }
}
