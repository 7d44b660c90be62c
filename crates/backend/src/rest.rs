//! Table queries in the REST interface's URL dialect.
//!
//! Filters, ordering and limits are query parameters
//! (`nombre=eq.home&order=actualizado_en.desc&limit=10`).

use std::fmt::Display;

use url::Url;

use crate::error::BackendError;

/// `Accept` value asking for a single JSON object instead of an array.
pub(crate) const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// A query against one table.
#[derive(Debug, Clone)]
pub(crate) struct Query {
    table: &'static str,
    params: Vec<(&'static str, String)>,
}

impl Query {
    pub(crate) const fn table(table: &'static str) -> Self {
        Self {
            table,
            params: Vec::new(),
        }
    }

    pub(crate) fn select(mut self, columns: &str) -> Self {
        self.params.push(("select", columns.to_string()));
        self
    }

    pub(crate) fn eq(mut self, column: &'static str, value: impl Display) -> Self {
        self.params.push((column, format!("eq.{value}")));
        self
    }

    pub(crate) fn order_desc(mut self, column: &str) -> Self {
        self.params.push(("order", format!("{column}.desc")));
        self
    }

    pub(crate) fn limit(mut self, limit: usize) -> Self {
        self.params.push(("limit", limit.to_string()));
        self
    }

    /// Column whose unique constraint resolves upsert conflicts.
    pub(crate) fn on_conflict(mut self, column: &str) -> Self {
        self.params.push(("on_conflict", column.to_string()));
        self
    }

    pub(crate) const fn table_name(&self) -> &'static str {
        self.table
    }

    /// Full URL for this query under the project base URL.
    pub(crate) fn url(&self, base: &Url) -> Result<Url, BackendError> {
        let mut url = base.join(&format!("rest/v1/{}", self.table))?;
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}
