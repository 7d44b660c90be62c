//! Page content rows.
//!
//! The remote tables use Spanish column names (`nombre`, `contenido_html`,
//! ...); they are renamed here so callers work with `name`, `content_html`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{UserId, timestamp};

/// Maximum number of history entries returned for a page.
pub const PAGE_HISTORY_LIMIT: usize = 10;

/// A row of the `paginas` table, unique by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "contenido_html")]
    pub content_html: String,
    /// Last writer.
    #[serde(rename = "usuario_id", default)]
    pub user_id: Option<UserId>,
    #[serde(rename = "actualizado_en", deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

/// A row of the `pagina_historial` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageHistoryEntry {
    #[serde(rename = "nombre_pagina")]
    pub page_name: String,
    #[serde(rename = "contenido_html")]
    pub content_html: String,
    #[serde(rename = "actualizado_en", deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "usuario_id", default)]
    pub user_id: Option<UserId>,
}
