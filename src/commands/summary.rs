use std::path::Path;

use crate::aggregate::Metric;
use crate::error::Result;
use crate::snapshot::{ChannelSnapshot, read_snapshot};

pub fn run(path: &Path) -> Result<()> {
    let snapshot = read_snapshot(path)?;
    print_summary(&snapshot);
    print_rankings(&snapshot);
    Ok(())
}

pub fn print_summary(snapshot: &ChannelSnapshot) {
    println!("Channel Snapshot Summary");
    println!("========================");
    println!("Channel ID:       {}", snapshot.channel_id);
    println!("Extracted at:     {}", snapshot.extraction_date.to_rfc3339());
    if let (Some(first), Some(last)) = (
        snapshot.annual_views.keys().next(),
        snapshot.annual_views.keys().next_back(),
    ) {
        println!("Years analyzed:   {}-{}", first, last);
    }
    println!("Videos processed: {}", snapshot.video_count());

    println!("\nAnnual views:");
    for (year, views) in &snapshot.annual_views {
        println!("  {}: {}", year, format_count(*views));
    }

    println!("\nVideos per year:");
    for (year, ids) in &snapshot.videos_by_year {
        println!("  {}: {} videos", year, ids.len());
    }
}

fn print_rankings(snapshot: &ChannelSnapshot) {
    for metric in Metric::ALL {
        let Some(ranked) = snapshot.top_videos.get(metric.as_str()) else {
            continue;
        };
        println!("\nTop videos by {}:", metric.as_str());
        for (i, entry) in ranked.iter().enumerate() {
            println!(
                "  {}. {} ({}) - {} {}",
                i + 1,
                entry.data.title,
                format_duration(entry.data.duration),
                format_count(metric.value(&entry.data)),
                metric.as_str()
            );
        }
    }
}

fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}
