// Report service - Use case for assembling an AQI report with its month-to-date chart
use crate::application::measurement_repository::MeasurementRepository;
use crate::domain::aqi::{AqiResult, categorize};
use crate::domain::history::{self, HistoryEntry};
use crate::domain::record::AqiRecord;
use crate::infrastructure::config::ReportSettings;
use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::sync::Arc;

pub const REPORT_DATE_FORMAT: &str = "%A %B %d, %Y";
pub const CHART_DATE_FORMAT: &str = "%m/%d/%Y";

/// A history bar with its display color.
#[derive(Debug, Clone, Serialize)]
pub struct ChartBar {
    pub date: NaiveDate,
    pub label: String,
    pub index: u16,
    pub color: &'static str,
}

impl From<HistoryEntry> for ChartBar {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            date: entry.date,
            label: entry.date.format(CHART_DATE_FORMAT).to_string(),
            index: entry.index,
            color: categorize(entry.index).color(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub location: String,
    pub parameter_limit: f64,
    pub date: NaiveDate,
    pub concentration: f64,
    pub result: AqiResult,
    pub bars: Vec<ChartBar>,
}

impl Report {
    pub fn date_label(&self) -> String {
        self.date.format(REPORT_DATE_FORMAT).to_string()
    }
}

#[derive(Clone)]
pub struct ReportService {
    repository: Arc<dyn MeasurementRepository>,
    settings: ReportSettings,
    seed: Option<u64>,
}

impl ReportService {
    pub fn new(
        repository: Arc<dyn MeasurementRepository>,
        settings: ReportSettings,
        seed: Option<u64>,
    ) -> Self {
        Self {
            repository,
            settings,
            seed,
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Synthetic month-to-date history ending at `date` with `index`.
    pub fn history(&self, index: u16, date: NaiveDate) -> Vec<ChartBar> {
        history::generate(index, date, self.rng())
            .map(ChartBar::from)
            .collect()
    }

    /// Report for the record stored on `date`, or None when nothing was recorded that day.
    pub async fn build_report(&self, date: NaiveDate) -> anyhow::Result<Option<Report>> {
        let Some(record) = self.repository.fetch_day(date).await? else {
            tracing::debug!("No record stored for {}, cannot build report", date);
            return Ok(None);
        };

        Ok(Some(self.report_for(&record)))
    }

    pub fn report_for(&self, record: &AqiRecord) -> Report {
        let bars = self.history(record.index, record.date);
        tracing::debug!("Built report for {} with {} history bars", record.date, bars.len());

        Report {
            location: self.settings.location.clone(),
            parameter_limit: self.settings.parameter_limit,
            date: record.date,
            concentration: record.concentration,
            result: record.result(),
            bars,
        }
    }
}
