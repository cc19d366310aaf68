//! ClickHouse-backed [`QueryExecutor`].

use clickhouse::{Client, Compression};
use futures_util::future::BoxFuture;
use tracing::Instrument;

use crate::config::ClickHouseConfig;
use crate::db::query::{decode_json_each_row, NamedQuery, NamedRow, QueryError, QueryExecutor};

/// Executes queries over the ClickHouse HTTP interface.
///
/// `clickhouse::Client` pools its HTTP connections internally and is cheap
/// to clone, so one executor is shared by every request.
#[derive(Clone)]
pub struct ClickHouseExecutor {
    client: Client,
}

impl ClickHouseExecutor {
    pub fn new(config: &ClickHouseConfig) -> Self {
        let client = Client::default()
            .with_url(&config.url)
            .with_user(&config.user)
            .with_password(&config.password)
            .with_database(&config.database)
            .with_compression(Compression::None)
            // Emit UInt64 columns as JSON numbers, not strings.
            .with_option("output_format_json_quote_64bit_integers", "0");
        Self { client }
    }
}

impl QueryExecutor for ClickHouseExecutor {
    fn fetch_all<'a>(
        &'a self,
        query: &'a NamedQuery,
    ) -> BoxFuture<'a, Result<Vec<NamedRow>, QueryError>> {
        Box::pin(async move {
            let mut request = self.client.query(query.sql());
            for (name, value) in query.params() {
                request = request.param(name, value);
            }

            let mut cursor = request.fetch_bytes("JSONEachRow")?;
            let body = cursor.collect().await?;
            let rows = decode_json_each_row(&body)?;

            tracing::debug!(rows = rows.len(), "Query complete");
            Ok(rows)
        }
        .instrument(tracing::debug_span!("clickhouse_query", params = query.params().len())))
    }
}
