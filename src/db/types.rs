/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbValue {
    /// NULL value. In a WHERE clause it renders as `IS NULL`.
    Null,
    /// Signed 64-bit integer (BIGINT)
    Int64(i64),
    /// Text (unlimited length)
    Text(String),
    /// Decimal integer string, sent as text and cast to NUMERIC
    Numeric(String),
}

impl DbValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }

    pub fn opt_text(value: Option<&str>) -> Self {
        value.map_or(DbValue::Null, |v| DbValue::Text(v.to_string()))
    }

    pub fn opt_numeric<T: ToString>(value: Option<T>) -> Self {
        value.map_or(DbValue::Null, |v| DbValue::Numeric(v.to_string()))
    }
}

/// A single row-level write. A `Vec<DbOperation>` is executed as one transaction.
#[derive(Debug, Clone)]
pub enum DbOperation {
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<DbValue>,
    },
    Update {
        table: String,
        set_columns: Vec<(String, DbValue)>,
        where_clause: WhereClause,
    },
    /// Raw SQL for statements the builders do not cover
    RawSql {
        query: String,
        params: Vec<DbValue>,
    },
}

#[derive(Debug, Clone)]
pub enum WhereClause {
    /// column1 = value1 AND column2 = value2 AND ...
    And(Vec<(String, DbValue)>),
}
