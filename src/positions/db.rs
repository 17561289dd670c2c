// SQLite persistence for positions. One connection behind a mutex, opened
// once at service init; every open position survives a restart through
// this file.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

use super::types::{InstrumentKind, Position, PositionSide};
use crate::instruments::OptionRight;
use crate::logger::{log, LogTag};
use crate::paths::get_positions_db_path;

const SCHEMA_VERSION: i64 = 1;

static POSITIONS_DB: OnceCell<PositionsDb> = OnceCell::new();

pub struct PositionsDb {
    conn: Mutex<Connection>,
}

impl PositionsDb {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open positions database")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS positions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                position_uuid TEXT NOT NULL UNIQUE,
                symbol TEXT NOT NULL,
                display_symbol TEXT NOT NULL,
                underlying TEXT,
                side TEXT NOT NULL,
                quantity REAL NOT NULL,
                instrument_kind TEXT NOT NULL,
                option_right TEXT,
                option_strike REAL,
                option_expiry TEXT,
                entry_order_id TEXT,
                exit_order_id TEXT,
                entry_price REAL NOT NULL,
                effective_entry_price REAL,
                entry_time TEXT NOT NULL,
                exit_time TEXT,
                exit_price REAL,
                effective_exit_price REAL,
                take_profit_price REAL NOT NULL,
                stop_loss_price REAL NOT NULL,
                current_price REAL,
                current_price_updated TEXT,
                price_highest REAL NOT NULL DEFAULT 0.0,
                price_lowest REAL NOT NULL DEFAULT 0.0,
                entry_fill_confirmed INTEGER NOT NULL DEFAULT 0,
                exit_fill_confirmed INTEGER NOT NULL DEFAULT 0,
                closed_reason TEXT
            )",
            [],
        )
        .context("Failed to create positions table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_positions_exit_time ON positions (exit_time)",
            [],
        )
        .context("Failed to create positions index")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
            [],
        )
        .context("Failed to create schema_version table")?;

        let current: Option<i64> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .optional()
            .context("Failed to read schema version")?
            .flatten();

        if current.is_none() {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .context("Failed to record schema version")?;
        }

        Ok(())
    }

    /// Insert a new position row and return its rowid.
    pub fn insert_position(&self, position: &Position) -> Result<i64> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO positions (
                position_uuid, symbol, display_symbol, underlying, side, quantity,
                instrument_kind, option_right, option_strike, option_expiry,
                entry_order_id, exit_order_id, entry_price, effective_entry_price,
                entry_time, exit_time, exit_price, effective_exit_price,
                take_profit_price, stop_loss_price, current_price,
                current_price_updated, price_highest, price_lowest,
                entry_fill_confirmed, exit_fill_confirmed, closed_reason
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27
            )",
            params![
                position.position_uuid,
                position.symbol,
                position.display_symbol,
                position.underlying,
                position.side.as_str(),
                position.quantity,
                position.instrument_kind.as_str(),
                position.option_right.map(|r| r.as_str()),
                position.option_strike,
                position.option_expiry.map(|d| d.format("%Y-%m-%d").to_string()),
                position.entry_order_id,
                position.exit_order_id,
                position.entry_price,
                position.effective_entry_price,
                position.entry_time.to_rfc3339(),
                position.exit_time.map(|t| t.to_rfc3339()),
                position.exit_price,
                position.effective_exit_price,
                position.take_profit_price,
                position.stop_loss_price,
                position.current_price,
                position.current_price_updated.map(|t| t.to_rfc3339()),
                position.price_highest,
                position.price_lowest,
                position.entry_fill_confirmed,
                position.exit_fill_confirmed,
                position.closed_reason,
            ],
        )
        .with_context(|| format!("Failed to insert position {}", position.position_uuid))?;

        Ok(conn.last_insert_rowid())
    }

    /// Persist the full mutable state of an existing position.
    pub fn update_position(&self, position: &Position) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "UPDATE positions SET
                entry_order_id = ?2,
                exit_order_id = ?3,
                entry_price = ?4,
                effective_entry_price = ?5,
                entry_time = ?6,
                exit_time = ?7,
                exit_price = ?8,
                effective_exit_price = ?9,
                take_profit_price = ?10,
                stop_loss_price = ?11,
                current_price = ?12,
                current_price_updated = ?13,
                price_highest = ?14,
                price_lowest = ?15,
                entry_fill_confirmed = ?16,
                exit_fill_confirmed = ?17,
                closed_reason = ?18
            WHERE position_uuid = ?1",
            params![
                position.position_uuid,
                position.entry_order_id,
                position.exit_order_id,
                position.entry_price,
                position.effective_entry_price,
                position.entry_time.to_rfc3339(),
                position.exit_time.map(|t| t.to_rfc3339()),
                position.exit_price,
                position.effective_exit_price,
                position.take_profit_price,
                position.stop_loss_price,
                position.current_price,
                position.current_price_updated.map(|t| t.to_rfc3339()),
                position.price_highest,
                position.price_lowest,
                position.entry_fill_confirmed,
                position.exit_fill_confirmed,
                position.closed_reason,
            ],
        )
        .with_context(|| format!("Failed to update position {}", position.position_uuid))?;

        Ok(())
    }

    /// Close a row without exit prices (failed entries).
    pub fn mark_closed(
        &self,
        position_uuid: &str,
        reason: &str,
        exit_time: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "UPDATE positions SET closed_reason = ?2, exit_time = ?3 WHERE position_uuid = ?1",
            params![position_uuid, reason, exit_time.to_rfc3339()],
        )
        .with_context(|| format!("Failed to mark position {} closed", position_uuid))?;

        Ok(())
    }

    /// Positions with no recorded exit, in entry order.
    pub fn load_open_positions(&self) -> Result<Vec<Position>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT * FROM positions WHERE exit_time IS NULL ORDER BY entry_time ASC",
            )
            .context("Failed to prepare open positions query")?;

        let rows = stmt
            .query_map([], row_to_position)
            .context("Failed to query open positions")?;

        let mut positions = Vec::new();
        for row in rows {
            positions.push(row.context("Failed to decode position row")?);
        }
        Ok(positions)
    }

    /// Every stored position, newest entry first.
    pub fn all_positions_for_summary(&self) -> Result<Vec<Position>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare("SELECT * FROM positions ORDER BY entry_time DESC")
            .context("Failed to prepare summary query")?;

        let rows = stmt
            .query_map([], row_to_position)
            .context("Failed to query positions for summary")?;

        let mut positions = Vec::new();
        for row in rows {
            positions.push(row.context("Failed to decode position row")?);
        }
        Ok(positions)
    }
}

fn conversion_error(column: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("invalid {} value: {}", column, value).into(),
    )
}

fn parse_timestamp(column: &str, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| conversion_error(column, raw))
}

fn row_to_position(row: &Row<'_>) -> rusqlite::Result<Position> {
    let side_raw: String = row.get("side")?;
    let side = PositionSide::parse(&side_raw).ok_or_else(|| conversion_error("side", &side_raw))?;

    let kind_raw: String = row.get("instrument_kind")?;
    let instrument_kind = InstrumentKind::parse(&kind_raw)
        .ok_or_else(|| conversion_error("instrument_kind", &kind_raw))?;

    let option_right = match row.get::<_, Option<String>>("option_right")? {
        Some(raw) => Some(
            OptionRight::parse(&raw).ok_or_else(|| conversion_error("option_right", &raw))?,
        ),
        None => None,
    };

    let option_expiry = match row.get::<_, Option<String>>("option_expiry")? {
        Some(raw) => Some(
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| conversion_error("option_expiry", &raw))?,
        ),
        None => None,
    };

    let entry_time_raw: String = row.get("entry_time")?;
    let entry_time = parse_timestamp("entry_time", &entry_time_raw)?;

    let exit_time = match row.get::<_, Option<String>>("exit_time")? {
        Some(raw) => Some(parse_timestamp("exit_time", &raw)?),
        None => None,
    };

    let current_price_updated = match row.get::<_, Option<String>>("current_price_updated")? {
        Some(raw) => Some(parse_timestamp("current_price_updated", &raw)?),
        None => None,
    };

    Ok(Position {
        id: row.get("id")?,
        position_uuid: row.get("position_uuid")?,
        symbol: row.get("symbol")?,
        display_symbol: row.get("display_symbol")?,
        underlying: row.get("underlying")?,
        side,
        quantity: row.get("quantity")?,
        instrument_kind,
        option_right,
        option_strike: row.get("option_strike")?,
        option_expiry,
        entry_order_id: row.get("entry_order_id")?,
        exit_order_id: row.get("exit_order_id")?,
        entry_price: row.get("entry_price")?,
        effective_entry_price: row.get("effective_entry_price")?,
        entry_time,
        exit_time,
        exit_price: row.get("exit_price")?,
        effective_exit_price: row.get("effective_exit_price")?,
        take_profit_price: row.get("take_profit_price")?,
        stop_loss_price: row.get("stop_loss_price")?,
        current_price: row.get("current_price")?,
        current_price_updated,
        price_highest: row.get("price_highest")?,
        price_lowest: row.get("price_lowest")?,
        entry_fill_confirmed: row.get("entry_fill_confirmed")?,
        exit_fill_confirmed: row.get("exit_fill_confirmed")?,
        closed_reason: row.get("closed_reason")?,
    })
}

// =============================================================================
// GLOBAL HANDLE
// =============================================================================

/// Open the database at the standard data path. Idempotent; later calls
/// keep the first connection.
pub fn init_positions_db() -> Result<()> {
    let path = get_positions_db_path();
    init_positions_db_at(&path)
}

/// Open the database at an explicit path. First call wins, which is also
/// what lets tests point the process at a temporary file.
pub fn init_positions_db_at<P: AsRef<Path>>(path: P) -> Result<()> {
    if POSITIONS_DB.get().is_some() {
        return Ok(());
    }

    let db = PositionsDb::open(&path)?;
    if POSITIONS_DB.set(db).is_ok() {
        log(
            LogTag::Positions,
            "DB",
            &format!("💾 Positions database ready at {}", path.as_ref().display()),
        );
    }
    Ok(())
}

fn db() -> Result<&'static PositionsDb> {
    POSITIONS_DB
        .get()
        .context("Positions database not initialized")
}

pub fn insert_position(position: &Position) -> Result<i64> {
    db()?.insert_position(position)
}

pub fn update_position(position: &Position) -> Result<()> {
    db()?.update_position(position)
}

pub fn mark_closed(position_uuid: &str, reason: &str, exit_time: DateTime<Utc>) -> Result<()> {
    db()?.mark_closed(position_uuid, reason, exit_time)
}

pub fn load_open_positions() -> Result<Vec<Position>> {
    db()?.load_open_positions()
}

pub fn all_positions_for_summary() -> Result<Vec<Position>> {
    db()?.all_positions_for_summary()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positions::types::derive_tp_sl;
    use chrono::TimeZone;

    fn option_position(uuid: &str) -> Position {
        let (tp, sl) = derive_tp_sl(PositionSide::Long, 42.5, 5.0, 3.0);
        Position {
            id: 0,
            position_uuid: uuid.to_string(),
            symbol: "SPXW250829C06400000".to_string(),
            display_symbol: "SPX 6400 CALL 2025-08-29".to_string(),
            underlying: Some("SPX".to_string()),
            side: PositionSide::Long,
            quantity: 1.0,
            instrument_kind: InstrumentKind::Option,
            option_right: Some(OptionRight::Call),
            option_strike: Some(6400.0),
            option_expiry: Some(NaiveDate::from_ymd_opt(2025, 8, 29).unwrap()),
            entry_order_id: Some(format!("entry-{}", uuid)),
            exit_order_id: None,
            entry_price: 42.5,
            effective_entry_price: None,
            entry_time: Utc.with_ymd_and_hms(2025, 8, 25, 14, 30, 0).unwrap(),
            exit_time: None,
            exit_price: None,
            effective_exit_price: None,
            take_profit_price: tp,
            stop_loss_price: sl,
            current_price: None,
            current_price_updated: None,
            price_highest: 0.0,
            price_lowest: 0.0,
            entry_fill_confirmed: false,
            exit_fill_confirmed: false,
            closed_reason: None,
        }
    }

    fn temp_db() -> (tempfile::TempDir, PositionsDb) {
        let dir = tempfile::tempdir().expect("temp dir");
        let db = PositionsDb::open(dir.path().join("positions.db")).expect("open db");
        (dir, db)
    }

    #[test]
    fn insert_and_load_roundtrip() {
        let (_dir, db) = temp_db();

        let position = option_position("db-roundtrip");
        let id = db.insert_position(&position).expect("insert");
        assert!(id > 0);

        let open = db.load_open_positions().expect("load");
        assert_eq!(open.len(), 1);

        let loaded = &open[0];
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.position_uuid, "db-roundtrip");
        assert_eq!(loaded.symbol, "SPXW250829C06400000");
        assert_eq!(loaded.underlying.as_deref(), Some("SPX"));
        assert_eq!(loaded.side, PositionSide::Long);
        assert_eq!(loaded.instrument_kind, InstrumentKind::Option);
        assert_eq!(loaded.option_right, Some(OptionRight::Call));
        assert_eq!(loaded.option_strike, Some(6400.0));
        assert_eq!(
            loaded.option_expiry,
            Some(NaiveDate::from_ymd_opt(2025, 8, 29).unwrap())
        );
        assert_eq!(loaded.entry_time, position.entry_time);
        assert!(!loaded.entry_fill_confirmed);
    }

    #[test]
    fn update_persists_fill_state() {
        let (_dir, db) = temp_db();

        let mut position = option_position("db-update");
        position.id = db.insert_position(&position).expect("insert");

        position.entry_fill_confirmed = true;
        position.effective_entry_price = Some(43.1);
        position.price_highest = 44.0;
        position.price_lowest = 42.0;
        db.update_position(&position).expect("update");

        let open = db.load_open_positions().expect("load");
        assert_eq!(open.len(), 1);
        assert!(open[0].entry_fill_confirmed);
        assert_eq!(open[0].effective_entry_price, Some(43.1));
        assert_eq!(open[0].price_highest, 44.0);
    }

    #[test]
    fn mark_closed_removes_from_open_set() {
        let (_dir, db) = temp_db();

        let position = option_position("db-close");
        db.insert_position(&position).expect("insert");

        db.mark_closed("db-close", "entry_failed: rejected", Utc::now())
            .expect("mark closed");

        assert!(db.load_open_positions().expect("load").is_empty());

        let all = db.all_positions_for_summary().expect("summary");
        assert_eq!(all.len(), 1);
        assert_eq!(
            all[0].closed_reason.as_deref(),
            Some("entry_failed: rejected")
        );
        assert!(all[0].exit_time.is_some());
    }

    #[test]
    fn duplicate_uuid_is_rejected() {
        let (_dir, db) = temp_db();

        let position = option_position("db-dup");
        db.insert_position(&position).expect("first insert");
        assert!(db.insert_position(&position).is_err());
    }
}
