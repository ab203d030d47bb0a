use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;

use crate::api::{ReportResponse, ReportingApi};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};

const VIEWS_METRIC: &str = "views";

/// Views for one calendar year.
#[derive(Debug, Clone, PartialEq)]
pub enum YearViews {
    Fetched(u64),
    /// The query failed; the year counts as zero.
    Degraded { error: String },
}

impl YearViews {
    pub fn views(&self) -> u64 {
        match self {
            YearViews::Fetched(views) => *views,
            YearViews::Degraded { .. } => 0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, YearViews::Degraded { .. })
    }
}

/// One entry per requested year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnualViews(pub BTreeMap<i32, YearViews>);

impl AnnualViews {
    pub fn get(&self, year: i32) -> Option<&YearViews> {
        self.0.get(&year)
    }

    pub fn totals(&self) -> BTreeMap<i32, u64> {
        self.0
            .iter()
            .map(|(year, views)| (*year, views.views()))
            .collect()
    }

    pub fn degraded_years(&self) -> Vec<i32> {
        self.0
            .iter()
            .filter(|(_, views)| views.is_degraded())
            .map(|(year, _)| *year)
            .collect()
    }
}

pub struct AnnualMetricsFetcher<'a, R: ReportingApi + ?Sized> {
    reporting: &'a R,
    delay: Duration,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a, R: ReportingApi + ?Sized> AnnualMetricsFetcher<'a, R> {
    pub fn new(reporting: &'a R, delay: Duration, diagnostics: &'a dyn Diagnostics) -> Self {
        Self {
            reporting,
            delay,
            diagnostics,
        }
    }

    /// Total views per calendar year for `start_year..=end_year`.
    pub async fn fetch_annual_views(
        &self,
        channel_id: &str,
        start_year: i32,
        end_year: i32,
    ) -> AnnualViews {
        let mut annual = AnnualViews::default();

        for year in start_year..=end_year {
            let entry = match self.fetch_year(channel_id, year).await {
                Ok(views) => {
                    self.diagnostics
                        .info(&format!("Fetched {} views for {}", views, year));
                    YearViews::Fetched(views)
                }
                Err(e) => {
                    self.diagnostics
                        .error(&format!("Failed to fetch views for {}: {}", year, e));
                    YearViews::Degraded {
                        error: e.to_string(),
                    }
                }
            };
            annual.0.insert(year, entry);

            tokio::time::sleep(self.delay).await;
        }

        annual
    }

    async fn fetch_year(&self, channel_id: &str, year: i32) -> Result<u64> {
        let (start, end) = calendar_year(year)?;
        let report = self
            .reporting
            .query_report(channel_id, start, end, VIEWS_METRIC)
            .await?;
        total_from_report(&report)
    }
}

fn calendar_year(year: i32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1);
    let end = NaiveDate::from_ymd_opt(year, 12, 31);
    start
        .zip(end)
        .ok_or_else(|| Error::RemoteCall(format!("year {} is out of range", year)))
}

/// First column of the first row. No rows means no views were recorded.
fn total_from_report(report: &ReportResponse) -> Result<u64> {
    let Some(value) = report.first_value() else {
        return Ok(0);
    };

    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .ok_or_else(|| Error::RemoteCall(format!("unexpected views value {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| Error::RemoteCall(format!("unexpected views value {:?}", s))),
        other => Err(Error::RemoteCall(format!("unexpected views value {}", other))),
    }
}
