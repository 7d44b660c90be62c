//! Page content persistence.
//!
//! Pages live in `paginas`, unique by `nombre`. Saving a page with an
//! existing name overwrites it. Previous versions are kept by the database in
//! `pagina_historial`; this module only reads them.

use chrono::{DateTime, Utc};
use pagecraft_core::{PAGE_HISTORY_LIMIT, Page, PageHistoryEntry, UserId};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::BackendError;
use crate::gateway::Gateway;
use crate::outcome::Outcome;
use crate::rest::Query;

const PAGES_TABLE: &str = "paginas";
const HISTORY_TABLE: &str = "pagina_historial";

/// Row written on save.
#[derive(Serialize)]
struct PageUpsert<'a> {
    nombre: &'a str,
    contenido_html: &'a str,
    usuario_id: &'a UserId,
    actualizado_en: DateTime<Utc>,
}

/// Content group.
#[derive(Debug, Clone)]
pub struct ContentApi {
    gateway: Gateway,
}

impl ContentApi {
    #[must_use]
    pub const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Create or overwrite a page as the current user.
    #[instrument(skip(self, content), fields(content_len = content.len()))]
    pub async fn save_page_content(&self, page_name: &str, content: &str) -> Outcome<Page> {
        let result = self.try_save(page_name, content).await;
        Outcome::capture("save_page_content", result.map(Some))
    }

    async fn try_save(&self, page_name: &str, content: &str) -> Result<Page, BackendError> {
        let user = self.gateway.require_user().await?;

        let row = PageUpsert {
            nombre: page_name,
            contenido_html: content,
            usuario_id: &user.id,
            actualizado_en: Utc::now(),
        };
        let query = Query::table(PAGES_TABLE).on_conflict("nombre");

        let rows: Vec<Page> = self.gateway.upsert(&query, &row).await?;
        let page = rows
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::MissingRow(query.table_name().to_string()))?;

        info!(page = %page.name, user_id = %user.id, "Page saved");
        Ok(page)
    }

    /// Fetch a page by name; `{null, null}` when it does not exist.
    #[instrument(skip(self))]
    pub async fn load_page_content(&self, page_name: &str) -> Outcome<Page> {
        Outcome::capture("load_page_content", self.try_load(page_name).await)
    }

    async fn try_load(&self, page_name: &str) -> Result<Option<Page>, BackendError> {
        let query = Query::table(PAGES_TABLE)
            .select("*")
            .eq("nombre", page_name);

        match self.gateway.select_single(&query).await {
            Ok(page) => Ok(Some(page)),
            Err(e) if e.is_no_rows() => {
                debug!("Page not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Up to ten previous versions of a page, newest first.
    #[instrument(skip(self))]
    pub async fn get_page_history(&self, page_name: &str) -> Outcome<Vec<PageHistoryEntry>> {
        let result = self.try_history(page_name).await;
        Outcome::capture("get_page_history", result.map(Some))
    }

    async fn try_history(&self, page_name: &str) -> Result<Vec<PageHistoryEntry>, BackendError> {
        let query = Query::table(HISTORY_TABLE)
            .select("*")
            .eq("nombre_pagina", page_name)
            .order_desc("actualizado_en")
            .limit(PAGE_HISTORY_LIMIT);

        let mut entries: Vec<PageHistoryEntry> = self.gateway.select(&query).await?;

        // The server already orders and limits; keep the guarantee regardless.
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        entries.truncate(PAGE_HISTORY_LIMIT);
        Ok(entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::gateway::tests::{far_future, test_config, test_session};

    async fn signed_in(server: &MockServer) -> ContentApi {
        let gateway = Gateway::new(test_config(server)).unwrap();
        gateway
            .set_session(test_session("tok", "u1", far_future()))
            .await;
        ContentApi::new(gateway)
    }

    #[tokio::test]
    async fn test_save_without_session_is_unauthenticated() {
        let server = MockServer::start();
        let content = ContentApi::new(Gateway::new(test_config(&server)).unwrap());

        let outcome = content.save_page_content("home", "<p>hi</p>").await;

        assert!(outcome.data_ref().is_none());
        assert!(matches!(
            outcome.error_ref(),
            Some(BackendError::NotAuthenticated)
        ));
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"data": null, "error": "Usuario no autenticado"})
        );
    }

    #[tokio::test]
    async fn test_save_with_rejected_token_is_unauthenticated() {
        let server = MockServer::start();
        let _user = server.mock(|when, then| {
            when.method(GET).path("/auth/v1/user");
            then.status(401)
                .json_body(json!({"code": 401, "msg": "invalid JWT"}));
        });

        let outcome = signed_in(&server)
            .await
            .save_page_content("home", "<p>hi</p>")
            .await;

        assert!(matches!(
            outcome.error_ref(),
            Some(BackendError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_save_upserts_by_name() {
        let server = MockServer::start();
        let _user = server.mock(|when, then| {
            when.method(GET).path("/auth/v1/user");
            then.status(200).json_body(json!({"id": "u1"}));
        });
        let upsert = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/paginas")
                .query_param("on_conflict", "nombre")
                .header("prefer", "resolution=merge-duplicates,return=representation")
                .header("authorization", "Bearer tok");
            then.status(201).json_body(json!([{
                "nombre": "home",
                "contenido_html": "<p>hi</p>",
                "usuario_id": "u1",
                "actualizado_en": "2025-02-01T09:30:00+00:00"
            }]));
        });

        let page = signed_in(&server)
            .await
            .save_page_content("home", "<p>hi</p>")
            .await
            .into_data()
            .unwrap();

        upsert.assert();
        assert_eq!(page.name, "home");
        assert_eq!(page.user_id, Some(UserId::from("u1")));
    }

    #[tokio::test]
    async fn test_load_missing_page_is_empty_success() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/paginas")
                .query_param("nombre", "eq.nope")
                .header("accept", "application/vnd.pgrst.object+json");
            then.status(406).json_body(json!({
                "code": "PGRST116",
                "details": "The result contains 0 rows",
                "hint": null,
                "message": "JSON object requested, multiple (or no) rows returned"
            }));
        });

        let content = ContentApi::new(Gateway::new(test_config(&server)).unwrap());
        let outcome = content.load_page_content("nope").await;

        assert!(outcome.is_ok());
        assert!(outcome.data_ref().is_none());
    }

    #[tokio::test]
    async fn test_load_other_errors_fail() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/rest/v1/paginas");
            then.status(500)
                .json_body(json!({"code": "XX000", "message": "internal error"}));
        });

        let content = ContentApi::new(Gateway::new(test_config(&server)).unwrap());
        let outcome = content.load_page_content("home").await;

        assert!(outcome.data_ref().is_none());
        assert_eq!(outcome.error_ref().unwrap().to_string(), "internal error");
    }

    #[tokio::test]
    async fn test_history_is_capped_and_newest_first() {
        let server = MockServer::start();
        // A server ignoring order/limit still yields at most ten, newest first.
        let rows: Vec<serde_json::Value> = (0..12)
            .map(|day| {
                json!({
                    "nombre_pagina": "home",
                    "contenido_html": format!("<p>v{day}</p>"),
                    "actualizado_en": format!("2025-01-{:02}T00:00:00+00:00", day + 1),
                    "usuario_id": "u1"
                })
            })
            .collect();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/pagina_historial")
                .query_param("nombre_pagina", "eq.home")
                .query_param("order", "actualizado_en.desc")
                .query_param("limit", "10");
            then.status(200).json_body(serde_json::Value::Array(rows));
        });

        let content = ContentApi::new(Gateway::new(test_config(&server)).unwrap());
        let history = content
            .get_page_history("home")
            .await
            .into_data()
            .unwrap();

        mock.assert();
        assert_eq!(history.len(), PAGE_HISTORY_LIMIT);
        assert!(history.windows(2).all(|w| w[0].updated_at >= w[1].updated_at));
        assert_eq!(history[0].content_html, "<p>v11</p>");
    }
}
