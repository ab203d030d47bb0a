mod common;

use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::tempdir;

use common::{CHANNEL, FakeCatalog, FakeReporting, Upload};
use yt_snapshot::diagnostics::MemoryDiagnostics;
use yt_snapshot::error::Error;
use yt_snapshot::pipeline::{Pipeline, RunReport};
use yt_snapshot::snapshot::{read_snapshot, write_snapshot};

fn uploads(count: usize) -> Vec<Upload> {
    (0..count)
        .map(|i| Upload::new(format!("vid{:03}", i), 2021 + (i % 3) as i32, 1_000 + i as u64))
        .collect()
}

async fn run(
    catalog: &FakeCatalog,
    reporting: &FakeReporting,
    diagnostics: &MemoryDiagnostics,
) -> Result<RunReport, Error> {
    let extraction_date = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    Pipeline::new(catalog, reporting, Duration::ZERO, diagnostics)
        .run(CHANNEL, 2021, 2023, extraction_date)
        .await
}

#[tokio::test]
async fn full_run_produces_every_section() {
    let catalog = FakeCatalog::with_uploads(uploads(12), 50);
    let reporting = FakeReporting::with_views(&[(2021, 100), (2022, 200), (2023, 300)]);
    let diagnostics = MemoryDiagnostics::new();

    let report = run(&catalog, &reporting, &diagnostics).await.unwrap();
    let snapshot = &report.snapshot;

    assert!(!report.is_degraded());
    assert_eq!(snapshot.channel_id, CHANNEL);
    assert_eq!(
        snapshot.annual_views.iter().map(|(y, v)| (*y, *v)).collect::<Vec<_>>(),
        vec![(2021, 100), (2022, 200), (2023, 300)]
    );
    assert_eq!(
        snapshot.videos_by_year.keys().cloned().collect::<Vec<_>>(),
        vec!["2021", "2022", "2023"]
    );
    assert_eq!(snapshot.video_count(), 12);
    assert_eq!(snapshot.video_stats.len(), 12);
    assert_eq!(snapshot.video_stats["vid005"].duration, 260);

    let calls = reporting.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].0, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
    assert_eq!(calls[1].1, NaiveDate::from_ymd_opt(2022, 12, 31).unwrap());
    assert_eq!(calls[1].2, "views");
}

#[tokio::test]
async fn stats_are_requested_in_chunks_of_fifty() {
    let catalog = FakeCatalog::with_uploads(uploads(120), 50);
    let reporting = FakeReporting::default();
    let diagnostics = MemoryDiagnostics::new();

    let report = run(&catalog, &reporting, &diagnostics).await.unwrap();

    let calls = catalog.video_calls();
    assert_eq!(
        calls.iter().map(Vec::len).collect::<Vec<_>>(),
        vec![50, 50, 20]
    );
    // Stray ids echoed by the service never make it into the snapshot.
    assert!(!report.snapshot.video_stats.contains_key("unrequested"));
    for id in report.snapshot.video_stats.keys() {
        assert!(calls.iter().flatten().any(|requested| requested == id));
    }
    assert_eq!(report.snapshot.video_stats.len(), 120);
}

#[tokio::test]
async fn failing_chunk_is_skipped_and_later_chunks_still_run() {
    let mut catalog = FakeCatalog::with_uploads(uploads(120), 50);
    let reporting = FakeReporting::default();
    let diagnostics = MemoryDiagnostics::new();

    // Buckets are year ordered, so the first chunk holds the 2021 uploads.
    let first_chunk_id = "vid000".to_string();
    catalog.failing_ids.insert(first_chunk_id.clone());

    let report = run(&catalog, &reporting, &diagnostics).await.unwrap();

    assert_eq!(catalog.video_calls().len(), 3);
    assert_eq!(report.failed_chunks.len(), 1);
    assert_eq!(report.failed_chunks[0].offset, 0);
    assert_eq!(report.failed_chunks[0].ids.len(), 50);
    assert!(!report.snapshot.video_stats.contains_key(&first_chunk_id));
    assert_eq!(report.snapshot.video_stats.len(), 70);
    // Listing is unaffected by the failed chunk.
    let listed: usize = report.snapshot.videos_by_year.values().map(Vec::len).sum();
    assert_eq!(listed, 120);
    assert!(report.is_degraded());
    assert!(
        diagnostics
            .errors()
            .iter()
            .any(|e| e.contains("Failed to fetch statistics for batch 0-49"))
    );
}

#[tokio::test]
async fn failed_year_is_recorded_as_zero_and_snapshot_is_still_written() {
    let catalog = FakeCatalog::with_uploads(uploads(6), 50);
    let mut reporting = FakeReporting::with_views(&[(2021, 100), (2022, 200), (2023, 300)]);
    reporting.failing_years.insert(2021);
    let diagnostics = MemoryDiagnostics::new();

    let report = run(&catalog, &reporting, &diagnostics).await.unwrap();

    assert_eq!(report.snapshot.annual_views[&2021], 0);
    assert_eq!(report.snapshot.annual_views[&2022], 200);
    assert_eq!(report.annual_views.degraded_years(), vec![2021]);
    assert_eq!(reporting.calls().len(), 3);
    assert!(
        diagnostics
            .errors()
            .iter()
            .any(|e| e.contains("Failed to fetch views for 2021"))
    );

    let dir = tempdir().unwrap();
    let path = dir.path().join("out").join("youtube_data.json");
    write_snapshot(&path, &report.snapshot).unwrap();
    let loaded = read_snapshot(&path).unwrap();
    assert_eq!(loaded, report.snapshot);
}

#[tokio::test]
async fn year_without_rows_counts_as_zero_views() {
    let catalog = FakeCatalog::with_uploads(uploads(3), 50);
    let reporting = FakeReporting::with_views(&[(2022, 42)]);
    let diagnostics = MemoryDiagnostics::new();

    let report = run(&catalog, &reporting, &diagnostics).await.unwrap();

    assert_eq!(report.snapshot.annual_views[&2021], 0);
    assert_eq!(report.snapshot.annual_views[&2022], 42);
    assert!(report.annual_views.degraded_years().is_empty());
}

#[tokio::test]
async fn unknown_channel_fails_the_run() {
    let catalog = FakeCatalog::default();
    let reporting = FakeReporting::default();
    let diagnostics = MemoryDiagnostics::new();

    let err = run(&catalog, &reporting, &diagnostics).await.unwrap_err();

    assert!(matches!(err, Error::UploadsPlaylist(_)));
    assert!(catalog.video_calls().is_empty());
}

#[tokio::test]
async fn channel_lookup_error_fails_the_run() {
    let mut catalog = FakeCatalog::with_uploads(uploads(3), 50);
    catalog.fail_channels = true;
    let reporting = FakeReporting::default();
    let diagnostics = MemoryDiagnostics::new();

    let err = run(&catalog, &reporting, &diagnostics).await.unwrap_err();

    assert!(matches!(err, Error::UploadsPlaylist(msg) if msg.contains("503")));
    // Annual views were already fetched before the lookup.
    assert_eq!(reporting.calls().len(), 3);
}

#[tokio::test]
async fn listing_failure_keeps_earlier_pages() {
    let mut catalog = FakeCatalog::with_uploads(uploads(30), 10);
    catalog.failing_page = Some(2);
    let reporting = FakeReporting::default();
    let diagnostics = MemoryDiagnostics::new();

    let report = run(&catalog, &reporting, &diagnostics).await.unwrap();

    assert_eq!(report.snapshot.video_count(), 20);
    assert_eq!(report.snapshot.video_stats.len(), 20);
    let truncated = report.listing_truncated.as_deref().unwrap();
    assert!(truncated.contains("stopped after 2 page(s)"));
    assert!(report.is_degraded());
}

#[tokio::test]
async fn listing_follows_page_tokens_with_full_page_size() {
    let catalog = FakeCatalog::with_uploads(uploads(25), 10);
    let reporting = FakeReporting::default();
    let diagnostics = MemoryDiagnostics::new();

    let report = run(&catalog, &reporting, &diagnostics).await.unwrap();

    let page_calls = catalog.page_calls.lock().unwrap().clone();
    assert_eq!(
        page_calls,
        vec![
            (None, 50),
            (Some("page-1".to_string()), 50),
            (Some("page-2".to_string()), 50),
        ]
    );
    assert_eq!(report.snapshot.video_count(), 25);
}

#[tokio::test]
async fn rankings_are_capped_and_non_increasing() {
    let catalog = FakeCatalog::with_uploads(uploads(12), 50);
    let reporting = FakeReporting::default();
    let diagnostics = MemoryDiagnostics::new();

    let report = run(&catalog, &reporting, &diagnostics).await.unwrap();
    let top = &report.snapshot.top_videos;

    assert_eq!(
        top.keys().cloned().collect::<Vec<_>>(),
        vec!["comments", "likes", "views"]
    );
    let views = &top["views"];
    assert_eq!(views.len(), 5);
    assert!(views.windows(2).all(|w| w[0].data.views >= w[1].data.views));
    assert_eq!(views[0].video_id, "vid011");
    for ranked in top.values().flatten() {
        assert!(report.snapshot.video_stats.contains_key(&ranked.video_id));
    }
}

#[tokio::test]
async fn bucketing_preserves_listing_order_within_a_year() {
    let listed = vec![
        Upload::new("late", 2023, 1),
        Upload::new("early", 2021, 1),
        Upload::new("also-late", 2023, 1),
    ];
    let catalog = FakeCatalog::with_uploads(listed, 50);
    let reporting = FakeReporting::default();
    let diagnostics = MemoryDiagnostics::new();

    let report = run(&catalog, &reporting, &diagnostics).await.unwrap();

    assert_eq!(report.snapshot.videos_by_year["2021"], vec!["early"]);
    assert_eq!(report.snapshot.videos_by_year["2023"], vec!["late", "also-late"]);
    // Stats are requested in bucket order.
    assert_eq!(
        catalog.video_calls()[0],
        vec!["early".to_string(), "late".to_string(), "also-late".to_string()]
    );
}

#[tokio::test]
async fn repeated_runs_produce_the_same_mappings() {
    let catalog = FakeCatalog::with_uploads(uploads(60), 25);
    let reporting = FakeReporting::with_views(&[(2021, 10), (2022, 20), (2023, 30)]);
    let diagnostics = MemoryDiagnostics::new();

    let first = run(&catalog, &reporting, &diagnostics).await.unwrap().snapshot;
    let second = run(&catalog, &reporting, &diagnostics).await.unwrap().snapshot;

    assert_eq!(first.annual_views, second.annual_views);
    assert_eq!(first.videos_by_year, second.videos_by_year);
    assert_eq!(first.video_stats, second.video_stats);
    assert_eq!(first.top_videos, second.top_videos);
}
