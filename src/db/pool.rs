use std::path::Path;

use bytes::BytesMut;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::types::{IsNull, ToSql, Type};
use tokio_postgres::NoTls;

use super::error::DbError;
use super::types::{DbOperation, DbValue, WhereClause};

pub struct DbPool {
    pool: Pool,
}

impl DbPool {
    pub async fn new(database_url: &str, max_size: usize) -> Result<Self, DbError> {
        let config = database_url
            .parse::<tokio_postgres::Config>()
            .map_err(|e| DbError::InvalidConnectionString(e.to_string()))?;

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = Manager::from_config(config, NoTls, manager_config);

        let pool = Pool::builder(manager)
            .max_size(max_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(DbError::BuildError)?;

        let _conn = pool.get().await?;
        tracing::info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Runs `operations` inside one transaction and returns the number of
    /// affected rows. Any failing row rolls the whole transaction back.
    ///
    /// Statements are prepared once per distinct SQL text and reused for
    /// every row that shares it.
    pub async fn execute_transaction(&self, operations: Vec<DbOperation>) -> Result<u64, DbError> {
        if operations.is_empty() {
            return Ok(0);
        }

        let mut client = self.pool.get().await?;
        let transaction = client.transaction().await?;
        let mut affected = 0;

        for op in operations {
            let (sql, params) = build_sql(op);

            let params_refs: Vec<&(dyn ToSql + Sync)> =
                params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

            let statement = transaction.prepare_cached(&sql).await?;
            match transaction.execute(&statement, &params_refs[..]).await {
                Ok(rows) => affected += rows,
                Err(e) => {
                    let db_err: DbError = e.into();
                    tracing::error!("SQL execution failed\n  SQL: {}\n  Error: {}", sql, db_err);
                    // Dropping the transaction rolls it back
                    return Err(db_err);
                }
            }
        }

        transaction.commit().await?;
        Ok(affected)
    }

    pub async fn run_migrations(&self, dir: &Path) -> Result<(), DbError> {
        super::migrations::run(&self.pool, dir).await
    }

    pub async fn query(
        &self,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<tokio_postgres::Row>, DbError> {
        let client = self.pool.get().await?;
        let rows = client.query(query, params).await?;
        Ok(rows)
    }
}

#[derive(Debug)]
enum SqlParam {
    Null,
    Int64(i64),
    Text(String),
}

impl ToSql for SqlParam {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlParam::Null => Ok(IsNull::Yes),
            SqlParam::Int64(v) => v.to_sql(ty, out),
            SqlParam::Text(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        <i64 as ToSql>::accepts(ty) || <String as ToSql>::accepts(ty)
    }

    /// NULL binds to a parameter of any type, so a missing amount can go into
    /// a NUMERIC column whose placeholder carries no cast.
    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlParam::Null => Ok(IsNull::Yes),
            SqlParam::Int64(v) => v.to_sql_checked(ty, out),
            SqlParam::Text(v) => v.to_sql_checked(ty, out),
        }
    }
}

fn convert_db_value(value: &DbValue) -> SqlParam {
    match value {
        DbValue::Null => SqlParam::Null,
        DbValue::Int64(v) => SqlParam::Int64(*v),
        DbValue::Text(v) | DbValue::Numeric(v) => SqlParam::Text(v.clone()),
    }
}

fn build_sql(op: DbOperation) -> (String, Vec<SqlParam>) {
    match op {
        DbOperation::Insert {
            table,
            columns,
            values,
        } => build_insert_sql(&table, &columns, &values),
        DbOperation::Update {
            table,
            set_columns,
            where_clause,
        } => build_update_sql(&table, &set_columns, &where_clause),
        DbOperation::RawSql { query, params } => {
            (query, params.iter().map(convert_db_value).collect())
        }
    }
}

/// Numeric values are sent as text and cast by PostgreSQL, so amounts never
/// pass through a lossy client-side numeric type.
fn placeholder_for(value: &DbValue, param_idx: usize) -> String {
    match value {
        DbValue::Numeric(_) => format!("${}::text::numeric", param_idx),
        _ => format!("${}", param_idx),
    }
}

/// Wrap an identifier in double quotes to handle reserved keywords.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name)
}

fn quote_cols(columns: &[String]) -> String {
    columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ")
}

fn build_insert_sql(table: &str, columns: &[String], values: &[DbValue]) -> (String, Vec<SqlParam>) {
    let cols = quote_cols(columns);
    let placeholders: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, v)| placeholder_for(v, i + 1))
        .collect();

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        cols,
        placeholders.join(", ")
    );
    let params = values.iter().map(convert_db_value).collect();

    (sql, params)
}

fn build_update_sql(
    table: &str,
    set_columns: &[(String, DbValue)],
    where_clause: &WhereClause,
) -> (String, Vec<SqlParam>) {
    let mut params = Vec::new();
    let mut param_idx = 1;

    let sets: Vec<String> = set_columns
        .iter()
        .map(|(col, val)| {
            let ph = placeholder_for(val, param_idx);
            params.push(convert_db_value(val));
            param_idx += 1;
            format!("{} = {}", quote_ident(col), ph)
        })
        .collect();

    let where_str = build_where_sql(where_clause, &mut params, &mut param_idx);

    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(table),
        sets.join(", "),
        where_str
    );
    (sql, params)
}

fn build_where_sql(
    where_clause: &WhereClause,
    params: &mut Vec<SqlParam>,
    param_idx: &mut usize,
) -> String {
    let mut condition = |col: &str, val: &DbValue| {
        if val.is_null() {
            return format!("{} IS NULL", quote_ident(col));
        }
        let ph = placeholder_for(val, *param_idx);
        params.push(convert_db_value(val));
        *param_idx += 1;
        format!("{} = {}", quote_ident(col), ph)
    };

    match where_clause {
        WhereClause::And(conditions) => conditions
            .iter()
            .map(|(col, val)| condition(col.as_str(), val))
            .collect::<Vec<_>>()
            .join(" AND "),
    }
}
