use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::RankedVideo;
use crate::error::{Error, Result};
use crate::stats::VideoRecord;

/// Everything one extraction run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub channel_id: String,
    pub extraction_date: DateTime<Utc>,
    pub annual_views: BTreeMap<i32, u64>,
    pub videos_by_year: BTreeMap<String, Vec<String>>,
    pub video_stats: BTreeMap<String, VideoRecord>,
    pub top_videos: BTreeMap<String, Vec<RankedVideo>>,
}

impl ChannelSnapshot {
    pub fn video_count(&self) -> usize {
        self.video_stats.len()
    }
}

/// Write the snapshot as pretty JSON, replacing any previous file.
pub fn write_snapshot(path: &Path, snapshot: &ChannelSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, serde_json::to_string_pretty(snapshot)?)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<ChannelSnapshot> {
    if !path.exists() {
        return Err(Error::FileNotFound(format!(
            "No snapshot at {}",
            path.display()
        )));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
