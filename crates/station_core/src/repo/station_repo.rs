//! Station repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Turn read/insert/update/delete requests into bound SQL statements.
//! - Keep the projection allow-list and sort-order check at the storage edge.
//!
//! # Invariants
//! - Every caller value, filter argument and row id is bound as a parameter.
//! - The only caller text spliced into SQL is the filter clause, wrapped in
//!   parentheses. It can still comment out trailing SQL, so the row cap is
//!   also enforced while reading rows.
//! - Projections never leave `StationColumn::ALL`.
//! - Callers never write the `id` column.

use crate::cursor::StationCursor;
use crate::db::DbError;
use crate::model::station::{StationColumn, StationId, StationValues};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Sort applied when a read does not specify one.
pub const DEFAULT_SORT_ORDER: &str = "code DESC";

static SORT_TERM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(id|code|lat|lon|label)(?:\s+((?i:asc|desc)))?\s*$")
        .expect("valid sort term regex")
});

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    InvalidArgument(String),
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArgument(_) => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Caller filter: SQL clause with `?` placeholders plus their bound values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub clause: Option<String>,
    pub args: Vec<Value>,
}

impl Selection {
    /// Matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(clause: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            clause: Some(clause.into()),
            args,
        }
    }

    /// Narrows this filter to one row id: `id = ? AND (<clause>)`.
    ///
    /// The id is bound as the first argument, ahead of the caller's own.
    pub fn and_id(self, id: StationId) -> Self {
        let clause = match self.clause.as_deref().map(str::trim) {
            Some(clause) if !clause.is_empty() => format!("id = ? AND ({clause})"),
            _ => "id = ?".to_string(),
        };
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(Value::Integer(id));
        args.extend(self.args);
        Self {
            clause: Some(clause),
            args,
        }
    }

    fn where_sql(&self) -> String {
        match self.clause.as_deref().map(str::trim) {
            Some(clause) if !clause.is_empty() => format!(" WHERE ({clause})"),
            _ => String::new(),
        }
    }
}

/// Read request options.
///
/// There is deliberately no limit field: the result cap comes from the
/// provider configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationQuery {
    /// Requested column names; `None` or empty selects every allow-listed column.
    pub projection: Option<Vec<String>>,
    pub selection: Selection,
    /// Comma-separated `<column> [ASC|DESC]` terms; blank means `code DESC`.
    pub sort_order: Option<String>,
}

impl StationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projection<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn selection(mut self, clause: impl Into<String>, args: Vec<Value>) -> Self {
        self.selection = Selection::new(clause, args);
        self
    }

    pub fn sort_order(mut self, sort_order: impl Into<String>) -> Self {
        self.sort_order = Some(sort_order.into());
        self
    }
}

/// Repository interface for station CRUD statements.
pub trait StationRepository {
    fn query(&self, query: &StationQuery, limit: u32) -> RepoResult<StationCursor>;
    /// Returns the raw id reported by the engine; callers judge its validity.
    fn insert(&self, values: &StationValues) -> RepoResult<StationId>;
    fn update(&self, values: &StationValues, selection: &Selection) -> RepoResult<usize>;
    fn delete(&self, selection: &Selection) -> RepoResult<usize>;
}

/// SQLite-backed station repository over one table.
pub struct SqliteStationRepository<'conn> {
    conn: &'conn Connection,
    table: &'conn str,
}

impl<'conn> SqliteStationRepository<'conn> {
    /// `table` must already be a checked identifier (see `db::schema`).
    pub fn new(conn: &'conn Connection, table: &'conn str) -> Self {
        Self { conn, table }
    }
}

impl StationRepository for SqliteStationRepository<'_> {
    fn query(&self, query: &StationQuery, limit: u32) -> RepoResult<StationCursor> {
        let columns = resolve_projection(query.projection.as_deref())?;
        let order_by = resolve_sort_order(query.sort_order.as_deref())?;
        let column_sql = columns
            .iter()
            .map(|column| column.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "SELECT {column_sql} FROM {}{} ORDER BY {order_by} LIMIT ?",
            self.table,
            query.selection.where_sql()
        );
        let mut bind_values = query.selection.args.clone();
        bind_values.push(Value::Integer(i64::from(limit)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let cap = limit as usize;
        let mut materialized = Vec::new();
        while materialized.len() < cap {
            let Some(row) = rows.next()? else {
                break;
            };
            let mut values = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                values.push(row.get::<_, Value>(index)?);
            }
            materialized.push(values);
        }

        Ok(StationCursor::new(columns, materialized))
    }

    fn insert(&self, values: &StationValues) -> RepoResult<StationId> {
        check_writable(values)?;

        let columns = values
            .iter()
            .map(|(column, _)| column.as_str())
            .collect::<Vec<_>>();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            self.table,
            columns.join(", ")
        );

        self.conn
            .execute(&sql, params_from_iter(values.iter().map(|(_, value)| value)))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, values: &StationValues, selection: &Selection) -> RepoResult<usize> {
        check_writable(values)?;

        let assignments = values
            .iter()
            .map(|(column, _)| format!("{} = ?", column.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments}{};",
            self.table,
            selection.where_sql()
        );
        let bind_values = values
            .iter()
            .map(|(_, value)| value)
            .chain(selection.args.iter());

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(changed)
    }

    fn delete(&self, selection: &Selection) -> RepoResult<usize> {
        let sql = format!("DELETE FROM {}{};", self.table, selection.where_sql());
        let changed = self
            .conn
            .execute(&sql, params_from_iter(selection.args.iter()))?;
        Ok(changed)
    }
}

/// Maps requested names onto the allow-list.
///
/// Unknown names are dropped; a request naming no known column is rejected.
pub fn resolve_projection(requested: Option<&[String]>) -> RepoResult<Vec<StationColumn>> {
    let requested = match requested {
        Some(requested) if !requested.is_empty() => requested,
        _ => return Ok(StationColumn::ALL.to_vec()),
    };

    let mut columns = Vec::with_capacity(requested.len());
    for name in requested {
        match StationColumn::from_name(name.trim()) {
            Some(column) => columns.push(column),
            None => warn!(
                "event=station_query module=repo status=projection_dropped column_chars={}",
                name.chars().count()
            ),
        }
    }

    if columns.is_empty() {
        return Err(RepoError::InvalidArgument(
            "projection names no known station column".to_string(),
        ));
    }
    Ok(columns)
}

/// Validates a caller sort expression and returns its normalized form.
pub fn resolve_sort_order(sort_order: Option<&str>) -> RepoResult<String> {
    let sort_order = match sort_order.map(str::trim) {
        Some(sort_order) if !sort_order.is_empty() => sort_order,
        _ => return Ok(DEFAULT_SORT_ORDER.to_string()),
    };

    let mut terms = Vec::new();
    for term in sort_order.split(',') {
        let captures = SORT_TERM_RE.captures(term).ok_or_else(|| {
            RepoError::InvalidArgument(format!("unsupported sort term `{}`", term.trim()))
        })?;
        let column = &captures[1];
        match captures.get(2) {
            Some(direction) => {
                terms.push(format!("{column} {}", direction.as_str().to_ascii_uppercase()))
            }
            None => terms.push(column.to_string()),
        }
    }
    Ok(terms.join(", "))
}

fn check_writable(values: &StationValues) -> RepoResult<()> {
    if values.is_empty() {
        return Err(RepoError::InvalidArgument(
            "values should not be empty".to_string(),
        ));
    }
    if values.contains(StationColumn::Id) {
        return Err(RepoError::InvalidArgument(
            "id is assigned by storage and cannot be written".to_string(),
        ));
    }
    Ok(())
}
