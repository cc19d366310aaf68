//! Named-parameter queries and the executor seam.

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};

/// One result row: column name -> value, in result-set column order.
pub type NamedRow = Map<String, Value>;

/// A value bound to a `{name:Type}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    UInt(u64),
    Int(i64),
    Text(String),
}

impl ParamValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParamValue::UInt(v) => Some(*v),
            ParamValue::Int(v) => u64::try_from(*v).ok(),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::UInt(v) => i64::try_from(*v).ok(),
            ParamValue::Int(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        ParamValue::UInt(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

/// SQL template plus the values for its named placeholders.
///
/// Values are always shipped to the store as parameters, never spliced into
/// the SQL text.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedQuery {
    sql: String,
    params: Vec<(String, ParamValue)>,
}

impl NamedQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Bind `value` to `name`, replacing any earlier binding of the same name.
    pub fn bind(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        let value = value.into();
        match self.params.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.params.push((name.to_string(), value)),
        }
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// Error raised by the data layer. Never retried or translated.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("clickhouse query failed: {0}")]
    ClickHouse(#[from] ::clickhouse::error::Error),

    #[error("failed to decode result row: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Runs [`NamedQuery`]s against the relational store.
pub trait QueryExecutor: Send + Sync {
    /// Every row, in the order the store returned them.
    fn fetch_all<'a>(
        &'a self,
        query: &'a NamedQuery,
    ) -> BoxFuture<'a, Result<Vec<NamedRow>, QueryError>>;

    /// The first row, or `None` when the result is empty.
    fn fetch_first<'a>(
        &'a self,
        query: &'a NamedQuery,
    ) -> BoxFuture<'a, Result<Option<NamedRow>, QueryError>> {
        Box::pin(async move { Ok(self.fetch_all(query).await?.into_iter().next()) })
    }
}

/// Decode a `JSONEachRow` body.
pub fn decode_json_each_row(body: &[u8]) -> Result<Vec<NamedRow>, serde_json::Error> {
    serde_json::Deserializer::from_slice(body)
        .into_iter::<NamedRow>()
        .collect()
}
