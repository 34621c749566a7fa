// In-memory repository implementation, keyed by date
use crate::application::measurement_repository::MeasurementRepository;
use crate::domain::aqi::Category;
use crate::domain::record::AqiRecord;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryRepository {
    records: RwLock<BTreeMap<NaiveDate, AqiRecord>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MeasurementRepository for MemoryRepository {
    async fn save(&self, record: &AqiRecord) -> Result<()> {
        self.records.write().await.insert(record.date, record.clone());
        tracing::debug!("Stored record for {} in memory", record.date);
        Ok(())
    }

    async fn fetch_month(&self, year: i32, month: u32) -> Result<Vec<AqiRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.date.year() == year && r.date.month() == month)
            .cloned()
            .collect())
    }

    async fn fetch_all(&self) -> Result<Vec<AqiRecord>> {
        let records = self.records.read().await;
        Ok(records.values().rev().cloned().collect())
    }

    async fn fetch_day(&self, date: NaiveDate) -> Result<Option<AqiRecord>> {
        Ok(self.records.read().await.get(&date).cloned())
    }

    async fn update_index(&self, date: NaiveDate, index: u16, category: Category) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&date) {
            Some(record) => {
                record.index = index;
                record.category = category;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, date: NaiveDate) -> Result<bool> {
        Ok(self.records.write().await.remove(&date).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::measurement::Measurement;

    fn record(y: i32, m: u32, d: u32, final_mass: f64) -> AqiRecord {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        AqiRecord::assess(date, Measurement::new(100.0, final_mass, 16.7, 0.0, 1440.0))
    }

    #[tokio::test]
    async fn test_save_overwrites_same_date() {
        let repo = MemoryRepository::new();
        repo.save(&record(2025, 8, 1, 100.5)).await.unwrap();
        repo.save(&record(2025, 8, 1, 102.5)).await.unwrap();

        let all = repo.fetch_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].index, 176);
    }

    #[tokio::test]
    async fn test_month_and_ordering() {
        let repo = MemoryRepository::new();
        repo.save(&record(2025, 8, 2, 100.5)).await.unwrap();
        repo.save(&record(2025, 8, 1, 100.5)).await.unwrap();
        repo.save(&record(2025, 9, 1, 100.5)).await.unwrap();

        let august = repo.fetch_month(2025, 8).await.unwrap();
        assert_eq!(august.len(), 2);
        assert!(august[0].date < august[1].date);

        let all = repo.fetch_all().await.unwrap();
        assert_eq!(all[0].date, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
    }

    #[tokio::test]
    async fn test_update_delete_clear() {
        let repo = MemoryRepository::new();
        let r = record(2025, 8, 1, 100.5);
        repo.save(&r).await.unwrap();

        assert!(repo.update_index(r.date, 301, Category::Hazardous).await.unwrap());
        assert_eq!(repo.fetch_day(r.date).await.unwrap().unwrap().index, 301);

        let missing = NaiveDate::from_ymd_opt(2025, 8, 9).unwrap();
        assert!(!repo.update_index(missing, 10, Category::Good).await.unwrap());
        assert!(!repo.delete(missing).await.unwrap());

        assert!(repo.delete(r.date).await.unwrap());
        repo.save(&r).await.unwrap();
        repo.clear().await.unwrap();
        assert!(repo.fetch_all().await.unwrap().is_empty());
    }
}
