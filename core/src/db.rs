use std::path::Path;

use log::{debug, info};
use rusqlite::types::Type;
use rusqlite::{Connection, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::models::{Confidence, DailySummary, Food, LogEntry};
use crate::normalize::{TimestampPolicy, WriteTime, normalize_food, normalize_log};
use crate::search::{self, SearchHit};

const FOOD_COLUMNS: &str =
    "id, name, name_lower, calories, portion, tags, tags_lower, notes, created_at, updated_at";

const LOG_COLUMNS: &str = "id, date, label, calories, range_low, range_high, note, breakdown, \
                           confidence, matched_food_id, created_at, updated_at";

pub const SCHEMA_VERSION: i64 = 1;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        info!("opened database at {}", path.display());
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < SCHEMA_VERSION {
            info!("migrating schema from version {version} to {SCHEMA_VERSION}");
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS foods (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    name_lower TEXT NOT NULL,
                    calories INTEGER NOT NULL CHECK (calories >= 0),
                    portion TEXT NOT NULL,
                    tags TEXT NOT NULL,
                    tags_lower TEXT NOT NULL,
                    notes TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    date TEXT NOT NULL,
                    label TEXT NOT NULL,
                    calories INTEGER NOT NULL CHECK (calories >= 0),
                    range_low INTEGER,
                    range_high INTEGER,
                    note TEXT NOT NULL,
                    breakdown TEXT NOT NULL,
                    confidence TEXT NOT NULL,
                    matched_food_id INTEGER,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_foods_name_lower ON foods(name_lower);
                CREATE INDEX IF NOT EXISTS idx_foods_tags_lower ON foods(tags_lower);
                CREATE INDEX IF NOT EXISTS idx_foods_updated_at ON foods(updated_at);
                CREATE INDEX IF NOT EXISTS idx_logs_date ON logs(date);
                CREATE INDEX IF NOT EXISTS idx_logs_date_created ON logs(date, created_at);",
            )?;
            self.conn
                .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn json_column<T: DeserializeOwned>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
        let text: String = row.get(idx)?;
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn food_from_row(row: &rusqlite::Row) -> rusqlite::Result<Food> {
        Ok(Food {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            name_lower: row.get(2)?,
            calories: row.get(3)?,
            portion: row.get(4)?,
            tags: Self::json_column(row, 5)?,
            tags_lower: row.get(6)?,
            notes: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn log_from_row(row: &rusqlite::Row) -> rusqlite::Result<LogEntry> {
        let confidence: String = row.get(8)?;
        Ok(LogEntry {
            id: Some(row.get(0)?),
            date: row.get(1)?,
            label: row.get(2)?,
            calories: row.get(3)?,
            range_low: row.get(4)?,
            range_high: row.get(5)?,
            note: row.get(6)?,
            breakdown: Self::json_column(row, 7)?,
            confidence: Confidence::parse_lenient(&confidence),
            matched_food_id: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    // Insert-or-replace keyed by id; a missing id lets SQLite assign the next one.
    fn put_food(conn: &Connection, food: &Food) -> Result<i64> {
        let tags = serde_json::to_string(&food.tags)?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO foods ({FOOD_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                food.id,
                food.name,
                food.name_lower,
                food.calories,
                food.portion,
                tags,
                food.tags_lower,
                food.notes,
                food.created_at,
                food.updated_at,
            ],
        )?;
        Ok(food.id.unwrap_or_else(|| conn.last_insert_rowid()))
    }

    fn put_log(conn: &Connection, entry: &LogEntry) -> Result<i64> {
        let breakdown = serde_json::to_string(&entry.breakdown)?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO logs ({LOG_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                entry.id,
                entry.date,
                entry.label,
                entry.calories,
                entry.range_low,
                entry.range_high,
                entry.note,
                breakdown,
                entry.confidence.as_str(),
                entry.matched_food_id,
                entry.created_at,
                entry.updated_at,
            ],
        )?;
        Ok(entry.id.unwrap_or_else(|| conn.last_insert_rowid()))
    }

    /// Writes already-normalized foods in one transaction, honoring their ids.
    pub(crate) fn put_foods(&self, foods: &mut [Food]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for food in foods.iter_mut() {
            food.id = Some(Self::put_food(&tx, food)?);
        }
        tx.commit()?;
        Ok(())
    }

    pub(crate) fn put_logs(&self, entries: &mut [LogEntry]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for entry in entries.iter_mut() {
            entry.id = Some(Self::put_log(&tx, entry)?);
        }
        tx.commit()?;
        Ok(())
    }

    // --- Foods ---

    /// Normalizes `payload` and inserts it, or fully replaces the record with the same id.
    pub fn upsert_food<T: Serialize + ?Sized>(&self, payload: &T) -> Result<Food> {
        self.upsert_food_at(payload, &WriteTime::current())
    }

    pub fn upsert_food_at<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        at: &WriteTime,
    ) -> Result<Food> {
        let raw = serde_json::to_value(payload)?;
        let mut food = normalize_food(&raw, at, TimestampPolicy::Touch)?;
        let tx = self.conn.unchecked_transaction()?;
        let id = Self::put_food(&tx, &food)?;
        tx.commit()?;
        food.id = Some(id);
        debug!("upserted food id={id} name={:?}", food.name);
        Ok(food)
    }

    pub fn get_food(&self, id: i64) -> Result<Option<Food>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {FOOD_COLUMNS} FROM foods WHERE id = ?1"))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::food_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Every food, most recently written first.
    pub fn get_all_foods(&self) -> Result<Vec<Food>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods ORDER BY updated_at DESC, created_at DESC, id DESC"
        ))?;
        let foods = stmt
            .query_map([], Self::food_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(foods)
    }

    /// Returns whether a record was removed. A missing id is not an error.
    pub fn delete_food(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM foods WHERE id = ?1", params![id])?;
        debug!("delete food id={id} removed={}", rows > 0);
        Ok(rows > 0)
    }

    pub fn search_foods(&self, query: &str, limit: usize) -> Result<Vec<Food>> {
        Ok(search::search_foods(&self.get_all_foods()?, query, limit))
    }

    pub fn rank_foods(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        Ok(search::rank_foods(&self.get_all_foods()?, query, limit))
    }

    // --- Log entries ---

    pub fn upsert_log<T: Serialize + ?Sized>(&self, payload: &T) -> Result<LogEntry> {
        self.upsert_log_at(payload, &WriteTime::current())
    }

    pub fn upsert_log_at<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        at: &WriteTime,
    ) -> Result<LogEntry> {
        let raw = serde_json::to_value(payload)?;
        let mut entry = normalize_log(&raw, at, TimestampPolicy::Touch)?;
        let tx = self.conn.unchecked_transaction()?;
        let id = Self::put_log(&tx, &entry)?;
        tx.commit()?;
        entry.id = Some(id);
        debug!("upserted log id={id} date={} calories={}", entry.date, entry.calories);
        Ok(entry)
    }

    pub fn get_log(&self, id: i64) -> Result<Option<LogEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {LOG_COLUMNS} FROM logs WHERE id = ?1"))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::log_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Entries whose date equals `date` exactly, most recently added first.
    pub fn get_logs_by_date(&self, date: &str) -> Result<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM logs WHERE date = ?1 ORDER BY created_at DESC, id DESC"
        ))?;
        let entries = stmt
            .query_map(params![date], Self::log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn get_all_logs(&self) -> Result<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM logs ORDER BY date DESC, created_at DESC, id DESC"
        ))?;
        let entries = stmt
            .query_map([], Self::log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Post-hoc calorie edit. Returns `None` when no entry has this id.
    pub fn update_log_calories(&self, id: i64, calories: i64) -> Result<Option<LogEntry>> {
        let now = WriteTime::current().millis;
        let tx = self.conn.unchecked_transaction()?;
        let rows = tx.execute(
            "UPDATE logs SET calories = ?1, updated_at = ?2 WHERE id = ?3",
            params![calories.max(0), now, id],
        )?;
        tx.commit()?;
        if rows == 0 {
            return Ok(None);
        }
        debug!("updated log id={id} calories={calories}");
        self.get_log(id)
    }

    pub fn delete_log(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM logs WHERE id = ?1", params![id])?;
        debug!("delete log id={id} removed={}", rows > 0);
        Ok(rows > 0)
    }

    pub fn daily_summary(&self, date: &str) -> Result<DailySummary> {
        let entries = self.get_logs_by_date(date)?;
        Ok(DailySummary::from_entries(date, entries))
    }

    // --- Maintenance ---

    /// Clears both collections in a single transaction. Id counters are not reset.
    pub fn wipe_all(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let foods = tx.execute("DELETE FROM foods", [])?;
        let logs = tx.execute("DELETE FROM logs", [])?;
        tx.commit()?;
        info!("wiped store: {foods} foods, {logs} log entries");
        Ok(())
    }
}
