//! Translation of `from` / `to` / `limit` request parameters into a single
//! store operation. Shared by the HTTP handler and the CLI.
//!
//! Precedence is strict: a complete time range wins over a limit, which wins
//! over the default "newest snapshot" mode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::metrics::Snapshot;
use crate::store::SnapshotStore;

/// Raw request parameters as received from a transport.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotQuery {
    Range {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    Latest(usize),
    Newest,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResult {
    Many(Vec<Snapshot>),
    One(Snapshot),
}

impl QueryResult {
    pub fn into_snapshots(self) -> Vec<Snapshot> {
        match self {
            QueryResult::Many(snapshots) => snapshots,
            QueryResult::One(snapshot) => vec![snapshot],
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_unix(param: &'static str, value: &str) -> Result<DateTime<Utc>, QueryError> {
    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| QueryError::InvalidTime {
            param,
            value: value.to_string(),
        })
}

fn parse_limit(value: &str) -> Result<usize, QueryError> {
    match value.parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(QueryError::InvalidLimit(value.to_string())),
    }
}

impl SnapshotQuery {
    pub fn parse(params: &QueryParams) -> Result<Self, QueryError> {
        if let (Some(from), Some(to)) = (present(&params.from), present(&params.to)) {
            return Ok(SnapshotQuery::Range {
                from: parse_unix("from", from)?,
                to: parse_unix("to", to)?,
            });
        }

        if let Some(limit) = present(&params.limit) {
            return Ok(SnapshotQuery::Latest(parse_limit(limit)?));
        }

        Ok(SnapshotQuery::Newest)
    }

    pub async fn execute(&self, store: &dyn SnapshotStore) -> Result<QueryResult, QueryError> {
        match *self {
            SnapshotQuery::Range { from, to } => Ok(QueryResult::Many(store.query(from, to).await?)),
            SnapshotQuery::Latest(limit) => Ok(QueryResult::Many(store.latest(limit).await?)),
            SnapshotQuery::Newest => store
                .latest(1)
                .await?
                .pop()
                .map(QueryResult::One)
                .ok_or(QueryError::NoDataAvailable),
        }
    }
}

/// Parses `params` and runs the selected operation against `store`.
pub async fn run_query(
    store: &dyn SnapshotStore,
    params: &QueryParams,
) -> Result<QueryResult, QueryError> {
    SnapshotQuery::parse(params)?.execute(store).await
}
