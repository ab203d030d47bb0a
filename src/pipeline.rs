//! Stage ordering for one extraction run.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::aggregate::{bucket_by_year, build_snapshot};
use crate::annual::{AnnualMetricsFetcher, AnnualViews};
use crate::api::{CatalogApi, ReportingApi, uploads_playlist};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::paginate::{MAX_PAGE_SIZE, Paginator, UploadsSource};
use crate::snapshot::ChannelSnapshot;
use crate::stats::{BatchStatsFetcher, ChunkFailure};

/// Snapshot plus what had to be degraded to produce it.
#[derive(Debug)]
pub struct RunReport {
    pub snapshot: ChannelSnapshot,
    pub annual_views: AnnualViews,
    pub failed_chunks: Vec<ChunkFailure>,
    pub listing_truncated: Option<String>,
}

impl RunReport {
    pub fn is_degraded(&self) -> bool {
        !self.annual_views.degraded_years().is_empty()
            || !self.failed_chunks.is_empty()
            || self.listing_truncated.is_some()
    }
}

pub struct Pipeline<'a, C: CatalogApi + ?Sized, R: ReportingApi + ?Sized> {
    catalog: &'a C,
    reporting: &'a R,
    delay: Duration,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a, C: CatalogApi + ?Sized, R: ReportingApi + ?Sized> Pipeline<'a, C, R> {
    pub fn new(
        catalog: &'a C,
        reporting: &'a R,
        delay: Duration,
        diagnostics: &'a dyn Diagnostics,
    ) -> Self {
        Self {
            catalog,
            reporting,
            delay,
            diagnostics,
        }
    }

    /// Run every stage in order. Only uploads playlist resolution can fail the
    /// run; the other stages degrade in place.
    pub async fn run(
        &self,
        channel_id: &str,
        start_year: i32,
        end_year: i32,
        extraction_date: DateTime<Utc>,
    ) -> Result<RunReport> {
        self.diagnostics.info("Fetching annual views...");
        let annual_views = AnnualMetricsFetcher::new(self.reporting, self.delay, self.diagnostics)
            .fetch_annual_views(channel_id, start_year, end_year)
            .await;

        self.diagnostics.info("Fetching channel video list...");
        let playlist_id = match uploads_playlist(self.catalog, channel_id).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                return Err(Error::UploadsPlaylist(format!(
                    "no channel found with id {}",
                    channel_id
                )));
            }
            Err(e) => return Err(Error::UploadsPlaylist(e.to_string())),
        };
        self.diagnostics
            .info(&format!("Uploads playlist: {}", playlist_id));

        let listing = Paginator::new(
            UploadsSource::new(self.catalog, playlist_id),
            MAX_PAGE_SIZE,
            self.delay,
            self.diagnostics,
        )
        .collect()
        .await;

        let videos_by_year = bucket_by_year(&listing.items);
        self.diagnostics.info(&format!(
            "Listed {} videos across {} years",
            listing.items.len(),
            videos_by_year.len()
        ));

        self.diagnostics.info("Fetching video statistics...");
        let ids: Vec<String> = videos_by_year.values().flatten().cloned().collect();
        let stats = BatchStatsFetcher::new(self.catalog, self.delay, self.diagnostics)
            .fetch_stats(&ids)
            .await;

        let snapshot = build_snapshot(
            channel_id,
            extraction_date,
            &annual_views,
            videos_by_year,
            stats.records,
        );

        Ok(RunReport {
            snapshot,
            annual_views,
            failed_chunks: stats.failed_chunks,
            listing_truncated: listing.truncated,
        })
    }
}
