use rusqlite::{params, Connection, OptionalExtension, Statement, ToSql};

use crate::error::Result;

use super::models::{Cell, Row, MESSAGE_PUBLICATION};

const CELL_COLUMNS: &str = "row_key, family, qualifier, value, ts_micros";

/// Groups cells, already ordered by row key, into rows.
fn collect_rows(stmt: &mut Statement<'_>, params: &[&dyn ToSql]) -> Result<Vec<Row>> {
    let mut rows: Vec<Row> = Vec::new();
    let mut cells = stmt.query(params)?;

    while let Some(cell) = cells.next()? {
        let row_key: String = cell.get(0)?;
        let family: String = cell.get(1)?;
        let cell = Cell {
            column: cell.get(2)?,
            value: cell.get(3)?,
            timestamp_micros: cell.get(4)?,
        };

        if rows.last().map(|r| r.key.as_str()) != Some(row_key.as_str()) {
            rows.push(Row::new(row_key));
        }
        if let Some(row) = rows.last_mut() {
            row.families.entry(family).or_default().push(cell);
        }
    }

    Ok(rows)
}

pub fn read_row(conn: &Connection, row_key: &str) -> Result<Option<Row>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {CELL_COLUMNS} FROM cells WHERE row_key = ?1
         ORDER BY family, qualifier, ts_micros DESC"
    ))?;
    Ok(collect_rows(&mut stmt, params![row_key])?.pop())
}

/// Rows whose key starts with `prefix` and which hold at least one cell
/// written at or after `since_micros`. Ordered by row key.
pub fn read_prefix_since(conn: &Connection, prefix: &str, since_micros: i64) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {CELL_COLUMNS} FROM cells
         WHERE row_key IN (
             SELECT DISTINCT row_key FROM cells
             WHERE substr(row_key, 1, length(?1)) = ?1 AND ts_micros >= ?2
         )
         ORDER BY row_key, family, qualifier, ts_micros DESC"
    ))?;
    collect_rows(&mut stmt, params![prefix, since_micros])
}

/// Keys under `prefix`, most recently written first.
pub fn recent_row_keys(conn: &Connection, prefix: &str, limit: u32) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT row_key FROM cells
         WHERE substr(row_key, 1, length(?1)) = ?1
         GROUP BY row_key
         ORDER BY MAX(ts_micros) DESC, row_key DESC
         LIMIT ?2",
    )?;
    let keys = stmt
        .query_map(params![prefix, limit], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(keys)
}

pub fn find_row_key_by_tx(conn: &Connection, tx_id: &str) -> Result<Option<String>> {
    let key = conn
        .query_row(
            "SELECT row_key FROM cells
             WHERE family = ?1 AND qualifier = 'InitiatingTxID' AND value = ?2
             ORDER BY ts_micros DESC LIMIT 1",
            params![MESSAGE_PUBLICATION, tx_id.as_bytes()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(key)
}

pub fn put_cell(
    conn: &Connection,
    row_key: &str,
    family: &str,
    qualifier: &str,
    value: &[u8],
    ts_micros: i64,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO cells (row_key, family, qualifier, value, ts_micros)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![row_key, family, qualifier, value, ts_micros],
    )?;
    Ok(())
}

pub fn put_row(conn: &Connection, row: &Row) -> Result<()> {
    for (family, cells) in &row.families {
        for cell in cells {
            put_cell(
                conn,
                &row.key,
                family,
                &cell.column,
                &cell.value,
                cell.timestamp_micros,
            )?;
        }
    }
    Ok(())
}
