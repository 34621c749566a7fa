// Persisted assessment record - one measurement and its derived AQI per calendar date
use super::aqi::{AqiResult, Category, IndexOutOfRange, categorize, checked_index};
use super::measurement::Measurement;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AqiRecord {
    pub date: NaiveDate,
    pub measurement: Measurement,
    pub concentration: f64,
    pub index: u16,
    pub category: Category,
}

impl AqiRecord {
    /// Derive concentration, index and category from a measurement.
    pub fn assess(date: NaiveDate, measurement: Measurement) -> Self {
        let concentration = measurement.concentration();
        let result = AqiResult::from_concentration(concentration);
        Self {
            date,
            measurement,
            concentration,
            index: result.index,
            category: result.category,
        }
    }

    /// Replace the index, keeping the category consistent with it.
    pub fn with_index(mut self, index: u16) -> Result<Self, IndexOutOfRange> {
        self.index = checked_index(index)?;
        self.category = categorize(self.index);
        Ok(self)
    }

    pub fn result(&self) -> AqiResult {
        AqiResult {
            index: self.index,
            category: self.category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assess() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let record = AqiRecord::assess(date, Measurement::new(100.0, 102.5, 16.7, 0.0, 1440.0));
        assert_eq!(record.index, 176);
        assert_eq!(record.category, Category::Unhealthy);
        assert!((record.concentration - 103.96).abs() < 0.01);
    }

    #[test]
    fn test_with_index_recategorizes() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 2).unwrap();
        let record = AqiRecord::assess(date, Measurement::new(100.0, 100.2, 16.7, 0.0, 1440.0))
            .with_index(320)
            .unwrap();
        assert_eq!(record.category, Category::Hazardous);
        assert_eq!(record.result().color(), Category::Hazardous.color());
    }

    #[test]
    fn test_with_index_rejects_values_off_the_scale() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 3).unwrap();
        let record = AqiRecord::assess(date, Measurement::new(100.0, 100.2, 16.7, 0.0, 1440.0));
        assert_eq!(record.clone().with_index(500).map(|r| r.index), Ok(500));
        assert_eq!(record.with_index(9999), Err(IndexOutOfRange(9999)));
    }
}
