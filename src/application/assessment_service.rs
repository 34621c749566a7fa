// Assessment service - Use case for turning a measurement into a stored AQI record
use crate::application::measurement_repository::MeasurementRepository;
use crate::domain::measurement::{Measurement, MeasurementWarning};
use crate::domain::record::AqiRecord;
use chrono::NaiveDate;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Assessment {
    pub record: AqiRecord,
    pub warnings: Vec<MeasurementWarning>,
}

#[derive(Clone)]
pub struct AssessmentService {
    repository: Arc<dyn MeasurementRepository>,
}

impl AssessmentService {
    pub fn new(repository: Arc<dyn MeasurementRepository>) -> Self {
        Self { repository }
    }

    /// Validate, compute and persist the assessment for `date`.
    ///
    /// Invalid measurements fail with [`crate::domain::measurement::InvalidMeasurement`];
    /// a decreasing filter mass is only reported as a warning.
    pub async fn assess(&self, date: NaiveDate, measurement: Measurement) -> anyhow::Result<Assessment> {
        let warnings = measurement.validate()?;
        for warning in &warnings {
            tracing::warn!("Measurement for {}: {}", date, warning.message());
        }

        let record = AqiRecord::assess(date, measurement);
        tracing::info!(
            "PM2.5 {:.1} µg/m³ on {} -> AQI {} ({})",
            record.concentration,
            date,
            record.index,
            record.category.label()
        );

        self.repository.save(&record).await?;

        Ok(Assessment { record, warnings })
    }

    /// Overwrite the stored index for `date`, recomputing its category.
    /// Returns the updated record, or None when nothing is stored for that date.
    ///
    /// Values above 500 fail with [`crate::domain::aqi::IndexOutOfRange`].
    pub async fn reclassify(&self, date: NaiveDate, index: u16) -> anyhow::Result<Option<AqiRecord>> {
        let Some(record) = self.repository.fetch_day(date).await? else {
            return Ok(None);
        };
        let record = record.with_index(index)?;

        if !self.repository.update_index(date, record.index, record.category).await? {
            return Ok(None);
        }
        tracing::info!("AQI for {} set to {} ({})", date, record.index, record.category.label());
        Ok(Some(record))
    }

    pub async fn record_for(&self, date: NaiveDate) -> anyhow::Result<Option<AqiRecord>> {
        self.repository.fetch_day(date).await
    }

    pub async fn monthly_records(&self, year: i32, month: u32) -> anyhow::Result<Vec<AqiRecord>> {
        self.repository.fetch_month(year, month).await
    }

    pub async fn all_records(&self) -> anyhow::Result<Vec<AqiRecord>> {
        self.repository.fetch_all().await
    }

    pub async fn delete(&self, date: NaiveDate) -> anyhow::Result<bool> {
        self.repository.delete(date).await
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        self.repository.clear().await
    }
}
