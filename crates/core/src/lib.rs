//! Pagecraft Core - Shared types library.
//!
//! This crate provides the records exchanged with the hosted backend:
//! - [`Page`] and [`PageHistoryEntry`] - page content rows
//! - [`User`] and [`Profile`] - identities and their access-control role
//! - [`Email`], [`UserId`], [`Role`] - validated newtypes
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Column names
//! of the remote tables are mapped with serde renames so the rest of the
//! workspace works with English field names.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
