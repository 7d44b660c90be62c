//! Core types for Pagecraft.
//!
//! This module provides type-safe wrappers and row types for the remote
//! tables (`paginas`, `pagina_historial`, `profiles`).

pub mod email;
pub mod id;
pub mod page;
pub mod role;
pub mod timestamp;
pub mod user;

pub use email::{Email, EmailError};
pub use id::UserId;
pub use page::{PAGE_HISTORY_LIMIT, Page, PageHistoryEntry};
pub use role::Role;
pub use user::{Profile, User};
