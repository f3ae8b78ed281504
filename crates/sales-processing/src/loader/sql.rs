//! SQLite reading.
//!
//! The connection lives for exactly one call: it is opened read-only, used
//! for the query, and closed before returning whether or not the query
//! succeeded.

use super::{Cell, frame_from_cells};
use crate::error::Result;
use crate::run_log::RunLog;
use polars::prelude::*;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::debug;

pub(crate) fn read_sql(path: &Path, query: &str, log: &mut RunLog) -> Result<DataFrame> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    debug!("Opened SQLite connection to {}", path.display());

    let result = query_frame(&conn, query);

    match conn.close() {
        Ok(()) => debug!("Closed SQLite connection to {}", path.display()),
        Err((_conn, e)) => log.warn(format!(
            "Failed to close connection to '{}': {}",
            path.display(),
            e
        )),
    }

    result
}

fn query_frame(conn: &Connection, query: &str) -> Result<DataFrame> {
    let mut stmt = conn.prepare(query)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); names.len()];

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for (i, cells) in columns.iter_mut().enumerate() {
            let cell = match row.get_ref(i)? {
                ValueRef::Null => Cell::Null,
                ValueRef::Integer(v) => Cell::Int(v),
                ValueRef::Real(v) => Cell::Float(v),
                ValueRef::Text(bytes) => Cell::Text(String::from_utf8_lossy(bytes).into_owned()),
                ValueRef::Blob(bytes) => Cell::Text(format!("<blob {} bytes>", bytes.len())),
            };
            cells.push(cell);
        }
    }

    frame_from_cells(names.into_iter().zip(columns).collect())
}
