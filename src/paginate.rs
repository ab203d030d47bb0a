//! Cursor-driven listing of catalog resources.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::CatalogApi;
use crate::diagnostics::Diagnostics;
use crate::error::Result;

/// Largest page the catalog surface will return.
pub const MAX_PAGE_SIZE: u32 = 50;

pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// One list call, addressed by an optional continuation cursor.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    fn describe(&self) -> String;

    async fn fetch_page(&self, cursor: Option<&str>, page_size: u32) -> Result<Page<Self::Item>>;
}

/// Everything a paginator produced before it stopped.
#[derive(Debug)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub pages: usize,
    /// Error that cut the listing short, if any.
    pub truncated: Option<String>,
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Lazy, non-restartable sequence over all pages of a `PageSource`.
///
/// Items come out in page order. A failed call ends the sequence; whatever
/// was already fetched stays valid.
pub struct Paginator<'a, S: PageSource> {
    source: S,
    page_size: u32,
    delay: Duration,
    diagnostics: &'a dyn Diagnostics,
    buffer: VecDeque<S::Item>,
    cursor: Cursor,
    pages: usize,
    failure: Option<String>,
}

impl<'a, S: PageSource> Paginator<'a, S> {
    pub fn new(source: S, page_size: u32, delay: Duration, diagnostics: &'a dyn Diagnostics) -> Self {
        Self {
            source,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            delay,
            diagnostics,
            buffer: VecDeque::new(),
            cursor: Cursor::Start,
            pages: 0,
            failure: None,
        }
    }

    pub async fn next(&mut self) -> Option<S::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(item);
            }
            if !self.fetch_next_page().await {
                return None;
            }
        }
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Drain the remaining items.
    pub async fn collect(mut self) -> Listing<S::Item> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item);
        }
        Listing {
            items,
            pages: self.pages,
            truncated: self.failure,
        }
    }

    /// Returns false once there is nothing more to fetch.
    async fn fetch_next_page(&mut self) -> bool {
        let cursor = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Done => return false,
            Cursor::Start => None,
            Cursor::Next(token) => {
                tokio::time::sleep(self.delay).await;
                Some(token)
            }
        };

        match self.source.fetch_page(cursor.as_deref(), self.page_size).await {
            Ok(page) => {
                self.pages += 1;
                self.buffer.extend(page.items);
                if let Some(next) = page.next_cursor.filter(|c| !c.is_empty()) {
                    self.cursor = Cursor::Next(next);
                }
                true
            }
            Err(e) => {
                let message = format!(
                    "Listing {} stopped after {} page(s): {}",
                    self.source.describe(),
                    self.pages,
                    e
                );
                self.diagnostics.error(&message);
                self.failure = Some(message);
                false
            }
        }
    }
}

/// One entry of a channel's uploads list.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadEntry {
    pub video_id: String,
    pub published_at: String,
}

/// Pages of the uploads playlist.
pub struct UploadsSource<'a, C: CatalogApi + ?Sized> {
    catalog: &'a C,
    playlist_id: String,
}

impl<'a, C: CatalogApi + ?Sized> UploadsSource<'a, C> {
    pub fn new(catalog: &'a C, playlist_id: impl Into<String>) -> Self {
        Self {
            catalog,
            playlist_id: playlist_id.into(),
        }
    }
}

#[async_trait]
impl<'a, C: CatalogApi + ?Sized> PageSource for UploadsSource<'a, C> {
    type Item = UploadEntry;

    fn describe(&self) -> String {
        format!("playlist {}", self.playlist_id)
    }

    async fn fetch_page(&self, cursor: Option<&str>, page_size: u32) -> Result<Page<UploadEntry>> {
        let response = self
            .catalog
            .list_playlist_items(&self.playlist_id, cursor, page_size)
            .await?;

        Ok(Page {
            items: response
                .items
                .into_iter()
                .map(|item| UploadEntry {
                    video_id: item.snippet.resource_id.video_id,
                    published_at: item.snippet.published_at,
                })
                .collect(),
            next_cursor: response.next_page_token,
        })
    }
}
