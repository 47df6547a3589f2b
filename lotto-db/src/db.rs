use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;

use crate::models::HistoricalDraw;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    round          INTEGER PRIMARY KEY,
    draw_date      TEXT NOT NULL,
    number_1       INTEGER NOT NULL,
    number_2       INTEGER NOT NULL,
    number_3       INTEGER NOT NULL,
    number_4       INTEGER NOT NULL,
    number_5       INTEGER NOT NULL,
    number_6       INTEGER NOT NULL,
    bonus          INTEGER NOT NULL,
    first_prize    INTEGER NOT NULL DEFAULT 0,
    first_winners  INTEGER NOT NULL DEFAULT 0,
    total_sales    INTEGER NOT NULL DEFAULT 0
);
";

const SELECT_COLUMNS: &str = "round, draw_date, number_1, number_2, number_3, number_4, number_5, number_6, bonus, first_prize, first_winners, total_sales";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("lotto.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    tracing::debug!(path = %path.display(), "base ouverte");
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

pub fn insert_draw(conn: &Connection, draw: &HistoricalDraw) -> Result<bool> {
    let first_prize = i64::try_from(draw.first_prize)
        .with_context(|| format!("Gain du 1er rang hors limites pour le tirage {}", draw.round))?;
    let total_sales = i64::try_from(draw.total_sales)
        .with_context(|| format!("Ventes hors limites pour le tirage {}", draw.round))?;
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (round, draw_date, number_1, number_2, number_3, number_4, number_5, number_6, bonus, first_prize, first_winners, total_sales)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        rusqlite::params![
            draw.round,
            draw.draw_date.format(DATE_FORMAT).to_string(),
            draw.numbers[0],
            draw.numbers[1],
            draw.numbers[2],
            draw.numbers[3],
            draw.numbers[4],
            draw.numbers[5],
            draw.bonus,
            first_prize,
            draw.first_winners,
            total_sales,
        ],
    ).with_context(|| format!("Échec de l'insertion du tirage {}", draw.round))?;
    Ok(changed > 0)
}

fn draw_from_row(row: &Row<'_>) -> rusqlite::Result<HistoricalDraw> {
    let raw_date: String = row.get(1)?;
    let draw_date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(HistoricalDraw {
        round: row.get(0)?,
        draw_date,
        numbers: [
            row.get::<_, u8>(2)?,
            row.get::<_, u8>(3)?,
            row.get::<_, u8>(4)?,
            row.get::<_, u8>(5)?,
            row.get::<_, u8>(6)?,
            row.get::<_, u8>(7)?,
        ],
        bonus: row.get(8)?,
        first_prize: row.get::<_, i64>(9)?.max(0) as u64,
        first_winners: row.get(10)?,
        total_sales: row.get::<_, i64>(11)?.max(0) as u64,
    })
}

pub fn fetch_draw(conn: &Connection, round: u32) -> Result<Option<HistoricalDraw>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM draws WHERE round = ?1");
    let draw = conn
        .query_row(&sql, [round], draw_from_row)
        .optional()
        .with_context(|| format!("Échec de la lecture du tirage {}", round))?;
    Ok(draw)
}

/// Derniers tirages, du plus récent au plus ancien.
pub fn fetch_last_draws(conn: &Connection, limit: u32) -> Result<Vec<HistoricalDraw>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM draws ORDER BY round DESC LIMIT ?1");
    let mut stmt = conn.prepare(&sql)?;
    let draws = stmt
        .query_map([limit], draw_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

/// Tirages dont le numéro est dans `[start, end]`, en ordre chronologique.
pub fn fetch_range(conn: &Connection, start: u32, end: u32) -> Result<Vec<HistoricalDraw>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM draws WHERE round BETWEEN ?1 AND ?2 ORDER BY round ASC");
    let mut stmt = conn.prepare(&sql)?;
    let draws = stmt
        .query_map([start, end], draw_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

pub fn latest_round(conn: &Connection) -> Result<Option<u32>> {
    let latest: Option<u32> = conn.query_row("SELECT MAX(round) FROM draws", [], |row| row.get(0))?;
    Ok(latest)
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::make_test_draws;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_count() {
        let conn = memory_db();
        assert_eq!(count_draws(&conn).unwrap(), 0);

        let draws = make_test_draws(1);
        insert_draw(&conn, &draws[0]).unwrap();
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_ignored() {
        let conn = memory_db();
        let draws = make_test_draws(1);

        assert!(insert_draw(&conn, &draws[0]).unwrap());
        assert!(!insert_draw(&conn, &draws[0]).unwrap());
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_amount_above_sqlite_range_rejected() {
        let conn = memory_db();
        let mut draw = make_test_draws(1).remove(0);
        draw.first_prize = u64::MAX;
        assert!(insert_draw(&conn, &draw).is_err());

        draw.first_prize = i64::MAX as u64;
        draw.total_sales = i64::MAX as u64 + 1;
        assert!(insert_draw(&conn, &draw).is_err());
        assert_eq!(count_draws(&conn).unwrap(), 0);

        draw.total_sales = i64::MAX as u64;
        assert!(insert_draw(&conn, &draw).unwrap());
        assert_eq!(fetch_draw(&conn, 1).unwrap().unwrap().first_prize, i64::MAX as u64);
    }

    #[test]
    fn test_fetch_draw_roundtrip() {
        let conn = memory_db();
        let draws = make_test_draws(3);
        for draw in &draws {
            insert_draw(&conn, draw).unwrap();
        }

        let fetched = fetch_draw(&conn, 2).unwrap().unwrap();
        assert_eq!(fetched, draws[1]);
        assert!(fetch_draw(&conn, 99).unwrap().is_none());
    }

    #[test]
    fn test_fetch_order() {
        let conn = memory_db();
        let draws = make_test_draws(3);
        insert_draw(&conn, &draws[0]).unwrap();
        insert_draw(&conn, &draws[2]).unwrap();
        insert_draw(&conn, &draws[1]).unwrap();

        let last = fetch_last_draws(&conn, 10).unwrap();
        let rounds: Vec<u32> = last.iter().map(|d| d.round).collect();
        assert_eq!(rounds, vec![3, 2, 1]);

        let range = fetch_range(&conn, 2, 3).unwrap();
        let rounds: Vec<u32> = range.iter().map(|d| d.round).collect();
        assert_eq!(rounds, vec![2, 3]);
    }

    #[test]
    fn test_latest_round() {
        let conn = memory_db();
        assert_eq!(latest_round(&conn).unwrap(), None);

        for draw in make_test_draws(5) {
            insert_draw(&conn, &draw).unwrap();
        }
        assert_eq!(latest_round(&conn).unwrap(), Some(5));
    }
}
