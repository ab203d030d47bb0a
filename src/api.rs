use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::auth::Credential;
use crate::config::Config;
use crate::error::{Error, Result};

/// Response of `channels.list`
#[derive(Debug, Default, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelItem {
    pub content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    pub related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: Option<String>,
}

/// Response of `playlistItems.list`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemListResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    pub published_at: String,
    pub resource_id: ResourceId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub video_id: String,
}

/// Response of `videos.list`
#[derive(Debug, Default, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub id: String,
    pub snippet: VideoSnippet,
    pub statistics: Option<VideoStatistics>,
    pub content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: String,
}

/// Counts arrive as decimal strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoContentDetails {
    pub duration: Option<String>,
}

/// Response of the reporting `reports` query
#[derive(Debug, Default, Deserialize)]
pub struct ReportResponse {
    #[serde(default)]
    pub rows: Option<Vec<Vec<serde_json::Value>>>,
}

impl ReportResponse {
    /// First column of the first row, or `None` when the report is empty.
    pub fn first_value(&self) -> Option<&serde_json::Value> {
        self.rows.as_ref()?.first()?.first()
    }
}

/// Catalog surface: channels, playlists and videos.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_channels(&self, channel_id: &str) -> Result<ChannelListResponse>;

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<PlaylistItemListResponse>;

    async fn list_videos(&self, ids: &[String], parts: &str) -> Result<VideoListResponse>;
}

/// Reporting surface: aggregated metric queries.
#[async_trait]
pub trait ReportingApi: Send + Sync {
    async fn query_report(
        &self,
        channel_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        metrics: &str,
    ) -> Result<ReportResponse>;
}

/// Find the uploads playlist of a channel, `None` when the channel is unknown.
pub async fn uploads_playlist<C: CatalogApi + ?Sized>(
    catalog: &C,
    channel_id: &str,
) -> Result<Option<String>> {
    let response = catalog.list_channels(channel_id).await?;
    Ok(response
        .items
        .into_iter()
        .next()
        .and_then(|item| item.content_details)
        .and_then(|details| details.related_playlists)
        .and_then(|playlists| playlists.uploads))
}

/// HTTP client for both surfaces, sharing one access token.
pub struct YouTubeClient {
    client: Client,
    access_token: String,
    data_base_url: String,
    analytics_base_url: String,
}

impl YouTubeClient {
    pub fn new(config: &Config, credential: &Credential) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            access_token: credential.token.clone(),
            data_base_url: config.data_base_url(),
            analytics_base_url: config.analytics_base_url(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::RemoteCall(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::RemoteCall(format!("{} ({}): {}", url, status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::RemoteCall(format!("{}: invalid response: {}", url, e)))
    }
}

#[async_trait]
impl CatalogApi for YouTubeClient {
    async fn list_channels(&self, channel_id: &str) -> Result<ChannelListResponse> {
        self.get_json(
            format!("{}/channels", self.data_base_url),
            &[
                ("part", "contentDetails".to_string()),
                ("id", channel_id.to_string()),
            ],
        )
        .await
    }

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<PlaylistItemListResponse> {
        let mut query = vec![
            ("part", "snippet".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        self.get_json(format!("{}/playlistItems", self.data_base_url), &query)
            .await
    }

    async fn list_videos(&self, ids: &[String], parts: &str) -> Result<VideoListResponse> {
        self.get_json(
            format!("{}/videos", self.data_base_url),
            &[("part", parts.to_string()), ("id", ids.join(","))],
        )
        .await
    }
}

#[async_trait]
impl ReportingApi for YouTubeClient {
    async fn query_report(
        &self,
        channel_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        metrics: &str,
    ) -> Result<ReportResponse> {
        self.get_json(
            format!("{}/reports", self.analytics_base_url),
            &[
                ("ids", format!("channel=={}", channel_id)),
                ("startDate", start_date.format("%Y-%m-%d").to_string()),
                ("endDate", end_date.format("%Y-%m-%d").to_string()),
                ("metrics", metrics.to_string()),
            ],
        )
        .await
    }
}
