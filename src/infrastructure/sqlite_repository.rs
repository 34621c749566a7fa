// SQLite repository implementation
use crate::application::measurement_repository::MeasurementRepository;
use crate::domain::aqi::Category;
use crate::domain::measurement::Measurement;
use crate::domain::record::AqiRecord;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS pm25_measurements (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date DATE NOT NULL UNIQUE,
        initial_mass REAL NOT NULL,
        final_mass REAL NOT NULL,
        flow_rate REAL NOT NULL,
        start_time REAL NOT NULL,
        stop_time REAL NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE IF NOT EXISTS aqi_calculations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        measurement_id INTEGER NOT NULL REFERENCES pm25_measurements (id) ON DELETE CASCADE,
        date DATE NOT NULL UNIQUE,
        concentration REAL NOT NULL,
        aqi_value INTEGER NOT NULL,
        category TEXT NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
";

const SELECT_JOINED: &str = "
    SELECT a.date, m.initial_mass, m.final_mass, m.flow_rate, m.start_time, m.stop_time,
           a.concentration, a.aqi_value, a.category
    FROM aqi_calculations a
    JOIN pm25_measurements m ON a.measurement_id = m.id
";

/// Row as stored, before date and category are parsed back into domain types.
struct StoredRow {
    date: String,
    measurement: Measurement,
    concentration: f64,
    aqi_value: i64,
    category: String,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            date: row.get(0)?,
            measurement: Measurement::new(row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?),
            concentration: row.get(6)?,
            aqi_value: row.get(7)?,
            category: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<AqiRecord> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT)
            .with_context(|| format!("Invalid stored date '{}'", self.date))?;
        let index = u16::try_from(self.aqi_value)
            .with_context(|| format!("Invalid stored AQI value {} for {}", self.aqi_value, date))?;
        let category = Category::from_label(&self.category)?;

        Ok(AqiRecord {
            date,
            measurement: self.measurement,
            concentration: self.concentration,
            index,
            category,
        })
    }
}

#[derive(Debug)]
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::initialize(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory().context("Failed to open in-memory database")?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;
        tracing::info!("Database initialized");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    fn query_records(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<AqiRecord>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql).context("Failed to prepare query")?;
        let rows = stmt
            .query_map(params, StoredRow::from_row)
            .context("Failed to query records")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read record rows")?;

        rows.into_iter().map(StoredRow::into_record).collect()
    }
}

#[async_trait]
impl MeasurementRepository for SqliteRepository {
    async fn save(&self, record: &AqiRecord) -> Result<()> {
        let date = record.date.format(DATE_FORMAT).to_string();
        let m = &record.measurement;

        let mut conn = self.connection()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        tx.execute(
            "INSERT INTO pm25_measurements (date, initial_mass, final_mass, flow_rate, start_time, stop_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(date) DO UPDATE SET
                initial_mass = excluded.initial_mass,
                final_mass = excluded.final_mass,
                flow_rate = excluded.flow_rate,
                start_time = excluded.start_time,
                stop_time = excluded.stop_time",
            params![date, m.initial_mass_mg, m.final_mass_mg, m.flow_rate_lpm, m.start_time_min, m.stop_time_min],
        )
        .context("Failed to save measurement")?;

        let measurement_id: i64 = tx
            .query_row(
                "SELECT id FROM pm25_measurements WHERE date = ?1",
                params![date],
                |row| row.get(0),
            )
            .context("Failed to look up measurement id")?;

        tx.execute(
            "INSERT INTO aqi_calculations (measurement_id, date, concentration, aqi_value, category)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(date) DO UPDATE SET
                measurement_id = excluded.measurement_id,
                concentration = excluded.concentration,
                aqi_value = excluded.aqi_value,
                category = excluded.category",
            params![measurement_id, date, record.concentration, record.index, record.category.label()],
        )
        .context("Failed to save AQI calculation")?;

        tx.commit().context("Failed to commit record")?;
        tracing::info!("Data saved for date: {}", date);
        Ok(())
    }

    async fn fetch_month(&self, year: i32, month: u32) -> Result<Vec<AqiRecord>> {
        let sql = format!(
            "{} WHERE strftime('%Y', a.date) = ?1 AND strftime('%m', a.date) = ?2 ORDER BY a.date",
            SELECT_JOINED
        );
        let records = self.query_records(&sql, params![format!("{:04}", year), format!("{:02}", month)])?;
        tracing::debug!("Retrieved {} records for {}-{:02}", records.len(), year, month);
        Ok(records)
    }

    async fn fetch_all(&self) -> Result<Vec<AqiRecord>> {
        let sql = format!("{} ORDER BY a.date DESC", SELECT_JOINED);
        let records = self.query_records(&sql, [])?;
        tracing::debug!("Retrieved {} total records", records.len());
        Ok(records)
    }

    async fn fetch_day(&self, date: NaiveDate) -> Result<Option<AqiRecord>> {
        let conn = self.connection()?;
        let sql = format!("{} WHERE a.date = ?1", SELECT_JOINED);
        let row = conn
            .query_row(&sql, params![date.format(DATE_FORMAT).to_string()], StoredRow::from_row)
            .optional()
            .context("Failed to query record")?;

        row.map(StoredRow::into_record).transpose()
    }

    async fn update_index(&self, date: NaiveDate, index: u16, category: Category) -> Result<bool> {
        let conn = self.connection()?;
        let updated = conn
            .execute(
                "UPDATE aqi_calculations SET aqi_value = ?1, category = ?2 WHERE date = ?3",
                params![index, category.label(), date.format(DATE_FORMAT).to_string()],
            )
            .context("Failed to update AQI value")?;

        if updated > 0 {
            tracing::info!("Updated AQI for {}: {} ({})", date, index, category.label());
        } else {
            tracing::warn!("No record found for date: {}", date);
        }
        Ok(updated > 0)
    }

    async fn delete(&self, date: NaiveDate) -> Result<bool> {
        let conn = self.connection()?;
        // aqi_calculations rows follow via ON DELETE CASCADE
        let deleted = conn
            .execute(
                "DELETE FROM pm25_measurements WHERE date = ?1",
                params![date.format(DATE_FORMAT).to_string()],
            )
            .context("Failed to delete record")?;

        if deleted == 0 {
            tracing::warn!("No record found for date: {}", date);
        }
        Ok(deleted > 0)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch("DELETE FROM aqi_calculations; DELETE FROM pm25_measurements;")
            .context("Failed to clear data")?;
        tracing::info!("All data cleared from database");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(y: i32, m: u32, d: u32, final_mass: f64) -> AqiRecord {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        AqiRecord::assess(date, Measurement::new(100.0, final_mass, 16.7, 0.0, 1440.0))
    }

    #[tokio::test]
    async fn test_save_and_fetch_day() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let r = record(2025, 8, 1, 102.5);
        repo.save(&r).await.unwrap();

        let stored = repo.fetch_day(r.date).await.unwrap().unwrap();
        assert_eq!(stored, r);
        assert!(repo
            .fetch_day(NaiveDate::from_ymd_opt(2025, 8, 2).unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_resave_overwrites() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.save(&record(2025, 8, 1, 100.5)).await.unwrap();
        repo.save(&record(2025, 8, 1, 102.5)).await.unwrap();

        let all = repo.fetch_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].measurement.final_mass_mg, 102.5);
        assert_eq!(all[0].index, 176);
    }

    #[tokio::test]
    async fn test_fetch_month_filters_and_orders() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.save(&record(2025, 8, 15, 100.5)).await.unwrap();
        repo.save(&record(2025, 8, 3, 100.5)).await.unwrap();
        repo.save(&record(2025, 7, 31, 100.5)).await.unwrap();

        let august = repo.fetch_month(2025, 8).await.unwrap();
        let days: Vec<_> = august.iter().map(|r| r.date.format("%d").to_string()).collect();
        assert_eq!(days, vec!["03", "15"]);

        let all = repo.fetch_all().await.unwrap();
        assert_eq!(all.first().unwrap().date, NaiveDate::from_ymd_opt(2025, 8, 15).unwrap());
    }

    #[tokio::test]
    async fn test_update_index() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let r = record(2025, 8, 1, 102.5);
        repo.save(&r).await.unwrap();

        assert!(repo.update_index(r.date, 42, Category::Good).await.unwrap());
        let stored = repo.fetch_day(r.date).await.unwrap().unwrap();
        assert_eq!((stored.index, stored.category), (42, Category::Good));

        let missing = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(!repo.update_index(missing, 42, Category::Good).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let r = record(2025, 8, 1, 102.5);
        repo.save(&r).await.unwrap();
        repo.save(&record(2025, 8, 2, 101.0)).await.unwrap();

        assert!(repo.delete(r.date).await.unwrap());
        assert!(!repo.delete(r.date).await.unwrap());
        assert_eq!(repo.fetch_all().await.unwrap().len(), 1);

        repo.clear().await.unwrap();
        assert!(repo.fetch_all().await.unwrap().is_empty());
    }
}
