// Repository trait for assessment record storage
use crate::domain::aqi::Category;
use crate::domain::record::AqiRecord;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait MeasurementRepository: Send + Sync {
    /// Insert or overwrite the record for `record.date` (one record per date)
    async fn save(&self, record: &AqiRecord) -> anyhow::Result<()>;

    /// Records for one calendar month, oldest first
    async fn fetch_month(&self, year: i32, month: u32) -> anyhow::Result<Vec<AqiRecord>>;

    /// Every stored record, newest first
    async fn fetch_all(&self) -> anyhow::Result<Vec<AqiRecord>>;

    async fn fetch_day(&self, date: NaiveDate) -> anyhow::Result<Option<AqiRecord>>;

    /// Overwrite the stored index and category; false when no record exists for `date`
    async fn update_index(
        &self,
        date: NaiveDate,
        index: u16,
        category: Category,
    ) -> anyhow::Result<bool>;

    /// false when no record exists for `date`
    async fn delete(&self, date: NaiveDate) -> anyhow::Result<bool>;

    async fn clear(&self) -> anyhow::Result<()>;
}
