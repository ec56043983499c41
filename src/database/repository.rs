//! Generic create / find / update helpers shared by the catalog and admin
//! queries.
//!
//! Every helper works on one table and a list of `column = value` pairs.
//! Column and table names only ever come from code; values are always bound
//! parameters. Filters combine with `AND`, and a `Null` filter value matches
//! `IS NULL`.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, postgres::PgRow};

use crate::error::{AppError, Result};

/// A row type stored in a single, fixed table.
pub trait Record: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin {
    const TABLE: &'static str;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    BigInt(i64),
    Text(String),
    Bool(bool),
    Decimal(Decimal),
    Json(serde_json::Value),
    Null,
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Ordered `column = value` pairs, used both for writes and for filters.
#[derive(Debug, Clone, Default)]
pub struct Fields(Vec<(&'static str, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.0.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn non_null(&self) -> impl Iterator<Item = &(&'static str, Value)> {
        self.0.iter().filter(|(_, value)| *value != Value::Null)
    }
}

fn push_value(query: &mut QueryBuilder<'static, Postgres>, value: &Value) {
    match value {
        Value::Int(v) => query.push_bind(*v),
        Value::BigInt(v) => query.push_bind(*v),
        Value::Text(v) => query.push_bind(v.clone()),
        Value::Bool(v) => query.push_bind(*v),
        Value::Decimal(v) => query.push_bind(*v),
        Value::Json(v) => query.push_bind(v.clone()),
        Value::Null => query.push("NULL"),
    };
}

fn push_where(query: &mut QueryBuilder<'static, Postgres>, filter: &Fields) {
    for (i, (column, value)) in filter.0.iter().enumerate() {
        query.push(if i == 0 { " WHERE " } else { " AND " });
        query.push(*column);
        if *value == Value::Null {
            query.push(" IS NULL");
        } else {
            query.push(" = ");
            push_value(query, value);
        }
    }
}

pub(crate) fn insert_query(table: &str, fields: &Fields) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("INSERT INTO {}", table));

    if fields.is_empty() {
        query.push(" DEFAULT VALUES RETURNING *");
        return query;
    }

    query.push(" (");
    for (i, (column, _)) in fields.0.iter().enumerate() {
        if i > 0 {
            query.push(", ");
        }
        query.push(*column);
    }
    query.push(") VALUES (");
    for (i, (_, value)) in fields.0.iter().enumerate() {
        if i > 0 {
            query.push(", ");
        }
        push_value(&mut query, value);
    }
    query.push(") RETURNING *");
    query
}

pub(crate) fn select_query(
    table: &str,
    filter: &Fields,
    single: bool,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT * FROM {}", table));
    push_where(&mut query, filter);
    query.push(" ORDER BY id");
    if single {
        query.push(" LIMIT 1");
    }
    query
}

pub(crate) fn update_query(
    table: &str,
    filter: &Fields,
    updates: &Fields,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("UPDATE {} SET ", table));
    for (column, value) in updates.non_null() {
        query.push(*column);
        query.push(" = ");
        push_value(&mut query, value);
        query.push(", ");
    }
    query.push("updated_at = NOW() WHERE id = (SELECT id FROM ");
    query.push(table);
    push_where(&mut query, filter);
    query.push(" ORDER BY id LIMIT 1) RETURNING *");
    query
}

/// Inserts one row and returns it. Store failures are reported as
/// `PersistenceError` with the original cause logged.
pub async fn create_in<T>(pool: &PgPool, table: &str, fields: &Fields) -> Result<T>
where
    T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
{
    let mut query = insert_query(table, fields);
    query
        .build_query_as::<T>()
        .fetch_one(pool)
        .await
        .map_err(|e| {
            tracing::error!("Insert into {} failed: {:?}", table, e);
            AppError::PersistenceError(e.to_string())
        })
}

pub async fn find_one_in<T>(pool: &PgPool, table: &str, filter: &Fields) -> Result<Option<T>>
where
    T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
{
    let mut query = select_query(table, filter, true);
    let row = query.build_query_as::<T>().fetch_optional(pool).await?;
    Ok(row)
}

pub async fn find_all_in<T>(pool: &PgPool, table: &str, filter: &Fields) -> Result<Vec<T>>
where
    T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
{
    let mut query = select_query(table, filter, false);
    let rows = query.build_query_as::<T>().fetch_all(pool).await?;
    Ok(rows)
}

/// Applies the non-null `updates` to the first row matching `filter`.
pub async fn update_in<T>(pool: &PgPool, table: &str, filter: &Fields, updates: &Fields) -> Result<T>
where
    T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
{
    let mut query = update_query(table, filter, updates);
    query
        .build_query_as::<T>()
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("Update of {} failed: {:?}", table, e);
            AppError::PersistenceError(e.to_string())
        })?
        .ok_or_else(|| AppError::NotFound("Record not found".to_string()))
}

pub async fn create<T: Record>(pool: &PgPool, fields: &Fields) -> Result<T> {
    create_in(pool, T::TABLE, fields).await
}

pub async fn find_one<T: Record>(pool: &PgPool, filter: &Fields) -> Result<Option<T>> {
    find_one_in(pool, T::TABLE, filter).await
}

pub async fn find_all<T: Record>(pool: &PgPool, filter: &Fields) -> Result<Vec<T>> {
    find_all_in(pool, T::TABLE, filter).await
}

pub async fn update<T: Record>(pool: &PgPool, filter: &Fields, updates: &Fields) -> Result<T> {
    update_in(pool, T::TABLE, filter, updates).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_binds_every_field_in_order() {
        let fields = Fields::new()
            .set("session_id", "abc")
            .set("product_id", 7)
            .set("frame_color", None::<String>);

        let query = insert_query("carts", &fields);

        assert_eq!(
            query.sql(),
            "INSERT INTO carts (session_id, product_id, frame_color) VALUES ($1, $2, NULL) RETURNING *"
        );
    }

    #[test]
    fn insert_without_fields_uses_defaults() {
        let query = insert_query("banners", &Fields::new());
        assert_eq!(query.sql(), "INSERT INTO banners DEFAULT VALUES RETURNING *");
    }

    #[test]
    fn filters_are_and_combined_and_null_matches_is_null() {
        let filter = Fields::new()
            .set("product_type", "trending")
            .set("product_category", None::<String>);

        assert_eq!(
            select_query("products", &filter, false).sql(),
            "SELECT * FROM products WHERE product_type = $1 AND product_category IS NULL ORDER BY id"
        );
        assert_eq!(
            select_query("products", &Fields::new(), true).sql(),
            "SELECT * FROM products ORDER BY id LIMIT 1"
        );
    }

    #[test]
    fn update_skips_null_values() {
        let filter = Fields::new().set("id", 3);
        let updates = Fields::new()
            .set("price", Some(Decimal::from(1200)))
            .set("description", None::<String>)
            .set("offer_price", Some(Decimal::from(999)));

        assert_eq!(
            update_query("products", &filter, &updates).sql(),
            "UPDATE products SET price = $1, offer_price = $2, updated_at = NOW() \
             WHERE id = (SELECT id FROM products WHERE id = $3 ORDER BY id LIMIT 1) RETURNING *"
        );
    }

    #[test]
    fn optional_values_convert_to_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }
}
