//! Relational-store collaborator.
//!
//! The core needs exactly two operations from persistence: delete rows
//! matching a filter, and insert rows. [`Store`] is that seam. The
//! production implementation, [`RestStore`], speaks the PostgREST dialect
//! used by Supabase: filters become query-string operators
//! (`?site_id=eq.jjs&date=in.("2025-03-03")`) and inserts are a `POST`
//! with a JSON array body. [`MemoryStore`] implements the same trait over
//! an in-memory table map; it backs `--dry-run` and the test suites, and
//! records every operation so tests can assert on ordering.
//!
//! Filters are structured conjunctions of the only predicate shapes
//! reconciliation needs (equality, set membership, and null checks on named
//! columns), so the trait stays agnostic about how an implementation
//! renders them.

use crate::utils::truncate_for_log;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Why a store operation failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("store key is not a valid header value")]
    Auth(#[from] reqwest::header::InvalidHeaderValue),
    /// Connection, TLS, or timeout failure from the HTTP client.
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The store answered with a non-success status.
    #[error("store rejected {op} on `{table}` with {status}: {body}")]
    Rejected {
        op: &'static str,
        table: String,
        status: StatusCode,
        body: String,
    },
    #[error("row serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A conjunction of column predicates.
///
/// Built fluently: `Filter::new().eq("site_id", "jjs").is_null("date")`.
/// An empty `is_in` list matches no rows; callers that would otherwise
/// issue a no-op delete should skip the call instead (see
/// [`crate::reconcile`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Eq(String, String),
    In(String, Vec<String>),
    IsNull(String),
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column = value`.
    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.clauses.push(Clause::Eq(column.to_string(), value.into()));
        self
    }

    /// Require `column` to be one of `values`.
    pub fn is_in<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.clauses.push(Clause::In(column.to_string(), values));
        self
    }

    /// Require `column` to be null (or absent from the row).
    pub fn is_null(mut self, column: &str) -> Self {
        self.clauses.push(Clause::IsNull(column.to_string()));
        self
    }

    /// Render the conjunction as PostgREST query pairs.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.clauses
            .iter()
            .map(|clause| match clause {
                Clause::Eq(column, value) => (column.clone(), format!("eq.{value}")),
                Clause::In(column, values) => {
                    let quoted = values
                        .iter()
                        .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
                        .collect::<Vec<_>>()
                        .join(",");
                    (column.clone(), format!("in.({quoted})"))
                }
                Clause::IsNull(column) => (column.clone(), "is.null".to_string()),
            })
            .collect()
    }

    /// Evaluate the conjunction against a row object.
    ///
    /// Scalar comparisons are stringly (a numeric `42` matches `"42"`),
    /// which mirrors how the rendered PostgREST operators compare against
    /// text columns. Used by [`MemoryStore`].
    pub fn matches(&self, row: &Value) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq(column, want) => {
                column_text(row, column).is_some_and(|have| have == *want)
            }
            Clause::In(column, want) => {
                column_text(row, column).is_some_and(|have| want.contains(&have))
            }
            Clause::IsNull(column) => row.get(column).is_none_or(Value::is_null),
        })
    }
}

fn column_text(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The two persistence primitives reconciliation needs.
pub trait Store {
    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError>;
    async fn insert(&self, table: &str, rows: &[Value]) -> Result<(), StoreError>;
}

/// Production [`Store`] speaking PostgREST (Supabase's REST surface).
///
/// `base_url` is the REST root, e.g. `https://PROJECT.supabase.co/rest/v1`;
/// table endpoints hang directly off it. The service key is sent as both
/// the `apikey` header and a bearer token, marked sensitive so it never
/// shows up in debug output.
pub struct RestStore {
    client: reqwest::Client,
    base: Url,
}

impl RestStore {
    pub fn new(base_url: &str, service_key: &str) -> Result<Self, StoreError> {
        let base = Url::parse(base_url)?;

        let mut api_key = HeaderValue::from_str(service_key)?;
        api_key.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {service_key}"))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("Prefer", HeaderValue::from_static("return=minimal"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, table: &str) -> Result<Url, StoreError> {
        // Tolerate a configured base with or without a trailing slash.
        let joined = format!("{}/{}", self.base.as_str().trim_end_matches('/'), table);
        Ok(Url::parse(&joined)?)
    }
}

impl Store for RestStore {
    #[instrument(level = "debug", skip_all, fields(%table))]
    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError> {
        let endpoint = self.endpoint(table)?;
        let response = self
            .client
            .delete(endpoint)
            .query(&filter.to_query_pairs())
            .send()
            .await?;
        check_response("delete", table, response).await
    }

    #[instrument(level = "debug", skip_all, fields(%table, rows = rows.len()))]
    async fn insert(&self, table: &str, rows: &[Value]) -> Result<(), StoreError> {
        let endpoint = self.endpoint(table)?;
        let body = serde_json::to_string(rows)?;
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        check_response("insert", table, response).await
    }
}

async fn check_response(
    op: &'static str,
    table: &str,
    response: reqwest::Response,
) -> Result<(), StoreError> {
    let status = response.status();
    if status.is_success() {
        debug!(op, table, %status, "store call ok");
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        op,
        table: table.to_string(),
        status,
        body: truncate_for_log(&body, 300),
    })
}

/// One recorded [`MemoryStore`] operation, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Delete { table: String, matched: usize },
    Insert { table: String, rows: usize },
}

/// In-memory [`Store`] backing `--dry-run` and the test suites.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    tables: HashMap<String, Vec<Value>>,
    ops: Vec<StoreOp>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current rows of a table, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.tables.get(table).cloned().unwrap_or_default()
    }

    /// Every operation performed so far, in call order.
    pub fn operations(&self) -> Vec<StoreOp> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.ops.clone()
    }

    /// `(table, row count)` pairs, sorted by table name.
    pub fn table_counts(&self) -> Vec<(String, usize)> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        let mut counts: Vec<(String, usize)> = inner
            .tables
            .iter()
            .map(|(table, rows)| (table.clone(), rows.len()))
            .collect();
        counts.sort();
        counts
    }
}

impl Store for MemoryStore {
    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        let rows = inner.tables.entry(table.to_string()).or_default();
        let before = rows.len();
        rows.retain(|row| !filter.matches(row));
        let matched = before - rows.len();
        inner.ops.push(StoreOp::Delete {
            table: table.to_string(),
            matched,
        });
        Ok(())
    }

    async fn insert(&self, table: &str, rows: &[Value]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .extend_from_slice(rows);
        inner.ops.push(StoreOp::Insert {
            table: table.to_string(),
            rows: rows.len(),
        });
        Ok(())
    }
}
