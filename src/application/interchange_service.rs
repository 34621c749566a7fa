// Interchange service - Use case for exporting and importing the tabular record format
use crate::application::measurement_repository::MeasurementRepository;
use crate::domain::aqi::{Category, MAX_INDEX};
use crate::domain::record::AqiRecord;
use crate::infrastructure::csv_interchange::{self, InterchangeRecord, InterchangeTables};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportOutcome {
    /// Rows read from the tables
    pub total: usize,
    /// Records written to the repository
    pub saved: usize,
    /// Row-level read problems; these rows were skipped
    pub read_errors: Vec<String>,
    /// Rule violations; any of these aborts the whole import
    pub validation_errors: Vec<String>,
}

/// Check merged rows against the record rules. Messages are 1-based by row.
pub fn validate_records(records: &[InterchangeRecord]) -> Vec<String> {
    let mut errors = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let n = i + 1;
        let m = &record.measurement;

        if m.flow_rate_lpm <= 0.0 {
            errors.push(format!("Record {}: Flow rate must be positive", n));
        }
        if m.stop_time_min <= m.start_time_min {
            errors.push(format!("Record {}: Stop time must be greater than start time", n));
        }
        // Negative only when the filter lost mass
        if record.concentration < 0.0 && m.final_mass_mg >= m.initial_mass_mg {
            errors.push(format!("Record {}: Concentration cannot be negative", n));
        }
        if !(0..=i64::from(MAX_INDEX)).contains(&record.aqi_value) {
            errors.push(format!("Record {}: AQI value must be between 0 and {}", n, MAX_INDEX));
        }
        if Category::from_label(&record.category).is_err() {
            errors.push(format!("Record {}: Invalid category '{}'", n, record.category));
        }
    }

    errors
}

fn into_record(record: InterchangeRecord) -> anyhow::Result<AqiRecord> {
    Ok(AqiRecord {
        date: record.date,
        measurement: record.measurement,
        concentration: record.concentration,
        index: u16::try_from(record.aqi_value)?,
        category: Category::from_label(&record.category)?,
    })
}

#[derive(Clone)]
pub struct InterchangeService {
    repository: Arc<dyn MeasurementRepository>,
}

impl InterchangeService {
    pub fn new(repository: Arc<dyn MeasurementRepository>) -> Self {
        Self { repository }
    }

    /// Both tables for every stored record, or None when nothing is stored.
    pub async fn export(&self) -> anyhow::Result<Option<InterchangeTables>> {
        let records = self.repository.fetch_all().await?;
        if records.is_empty() {
            return Ok(None);
        }

        let tables = csv_interchange::write_tables(&records)?;
        tracing::info!("Exported {} records", records.len());
        Ok(Some(tables))
    }

    /// Read, validate and store imported records.
    ///
    /// Stored values are taken as given (concentration, index and category are
    /// not recomputed). Nothing is saved if any record fails validation.
    pub async fn import(&self, tables: &InterchangeTables) -> anyhow::Result<ImportOutcome> {
        let (records, read_errors) = csv_interchange::read_tables(tables);
        let mut outcome = ImportOutcome {
            total: records.len(),
            read_errors,
            ..Default::default()
        };

        if records.is_empty() {
            tracing::warn!("No valid data found in import");
            return Ok(outcome);
        }

        outcome.validation_errors = validate_records(&records);
        if !outcome.validation_errors.is_empty() {
            tracing::warn!(
                "Import rejected with {} validation errors",
                outcome.validation_errors.len()
            );
            return Ok(outcome);
        }

        for record in records {
            let record = into_record(record)?;
            match self.repository.save(&record).await {
                Ok(()) => outcome.saved += 1,
                Err(e) => tracing::error!("Error saving imported record for {}: {:#}", record.date, e),
            }
        }

        tracing::info!("Imported {} of {} records", outcome.saved, outcome.total);
        Ok(outcome)
    }

    pub fn template(&self) -> InterchangeTables {
        csv_interchange::template_tables()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::measurement::Measurement;
    use crate::infrastructure::csv_interchange::{MEASUREMENT_COLUMNS, RESULT_COLUMNS};
    use crate::infrastructure::memory_repository::MemoryRepository;
    use chrono::NaiveDate;

    fn service() -> (InterchangeService, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        (InterchangeService::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_export_then_import_restores_records() {
        let (service, repo) = service();
        assert!(service.export().await.unwrap().is_none());

        let date = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        repo.save(&AqiRecord::assess(date, Measurement::new(100.0, 102.5, 16.7, 0.0, 1440.0)))
            .await
            .unwrap();
        let tables = service.export().await.unwrap().unwrap();

        repo.clear().await.unwrap();
        let outcome = service.import(&tables).await.unwrap();

        assert_eq!((outcome.total, outcome.saved), (1, 1));
        let restored = repo.fetch_day(date).await.unwrap().unwrap();
        assert_eq!(restored.index, 176);
        assert_eq!(restored.concentration, 104.0);
        assert_eq!(restored.category, Category::Unhealthy);
    }

    #[tokio::test]
    async fn test_round_trip_keeps_mass_decrease_records() {
        let (service, repo) = service();
        let normal = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let decreased = NaiveDate::from_ymd_opt(2025, 8, 2).unwrap();
        repo.save(&AqiRecord::assess(normal, Measurement::new(100.0, 102.5, 16.7, 0.0, 1440.0)))
            .await
            .unwrap();
        repo.save(&AqiRecord::assess(decreased, Measurement::new(102.5, 100.0, 16.7, 0.0, 1440.0)))
            .await
            .unwrap();
        let tables = service.export().await.unwrap().unwrap();

        repo.clear().await.unwrap();
        let outcome = service.import(&tables).await.unwrap();

        assert!(outcome.validation_errors.is_empty(), "{:?}", outcome.validation_errors);
        assert_eq!((outcome.total, outcome.saved), (2, 2));
        let restored = repo.fetch_day(decreased).await.unwrap().unwrap();
        assert_eq!(restored.concentration, -104.0);
        assert_eq!((restored.index, restored.category), (0, Category::Good));
        assert_eq!(repo.fetch_day(normal).await.unwrap().unwrap().index, 176);
    }

    #[tokio::test]
    async fn test_reclassified_record_round_trips() {
        let (service, repo) = service();
        let date = NaiveDate::from_ymd_opt(2025, 8, 3).unwrap();
        let record = AqiRecord::assess(date, Measurement::new(100.0, 102.5, 16.7, 0.0, 1440.0))
            .with_index(500)
            .unwrap();
        repo.save(&record).await.unwrap();
        let tables = service.export().await.unwrap().unwrap();

        repo.clear().await.unwrap();
        let outcome = service.import(&tables).await.unwrap();
        assert_eq!(outcome.saved, 1);
        assert_eq!(repo.fetch_day(date).await.unwrap().unwrap().category, Category::Hazardous);
    }

    #[test]
    fn test_negative_concentration_needs_mass_decrease() {
        let records = vec![InterchangeRecord {
            date: NaiveDate::from_ymd_opt(2025, 8, 4).unwrap(),
            measurement: Measurement::new(100.0, 102.5, 16.7, 0.0, 1440.0),
            concentration: -5.0,
            aqi_value: 0,
            category: "Good".to_string(),
        }];
        assert_eq!(
            validate_records(&records),
            vec!["Record 1: Concentration cannot be negative".to_string()]
        );
    }

    #[tokio::test]
    async fn test_import_template() {
        let (service, repo) = service();
        let outcome = service.import(&service.template()).await.unwrap();
        assert_eq!(outcome.saved, 2);
        assert_eq!(repo.fetch_month(2025, 8).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_validation_errors_abort_import() {
        let (service, repo) = service();
        let tables = InterchangeTables {
            measurements: format!(
                "{}\n2025-08-01,100.0,102.5,0.0,0.0,1440.0\n2025-08-02,100.0,102.5,16.7,0.0,1440.0\n",
                MEASUREMENT_COLUMNS.join(",")
            ),
            results: format!(
                "{}\n2025-08-01,104.0,176,Unhealthy\n2025-08-02,104.0,650,Satisfactory\n",
                RESULT_COLUMNS.join(",")
            ),
        };

        let outcome = service.import(&tables).await.unwrap();
        assert_eq!(outcome.saved, 0);
        assert_eq!(
            outcome.validation_errors,
            vec![
                "Record 1: Flow rate must be positive".to_string(),
                "Record 2: AQI value must be between 0 and 500".to_string(),
                "Record 2: Invalid category 'Satisfactory'".to_string(),
            ]
        );
        assert!(repo.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_errors_do_not_block_valid_rows() {
        let (service, _repo) = service();
        let tables = InterchangeTables {
            measurements: format!("{}\n2025-08-01,100.0,102.5,16.7,0.0,1440.0\n", MEASUREMENT_COLUMNS.join(",")),
            results: format!(
                "{}\n2025-08-01,104.0,176,Unhealthy\n2025-08-09,10.0,42,Good\n",
                RESULT_COLUMNS.join(",")
            ),
        };

        let outcome = service.import(&tables).await.unwrap();
        assert_eq!(outcome.saved, 1);
        assert_eq!(outcome.read_errors.len(), 1);
    }
}
