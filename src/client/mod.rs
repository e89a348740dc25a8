//! Remote store client and authentication.
//!
//! This module provides the [`SearchStore`] contract the dump core is written
//! against, its Elasticsearch implementation [`ElasticsearchClient`], and the
//! authentication types ([`Auth`]).

mod auth;
mod elasticsearch;
mod store;

pub use auth::Auth;
pub use elasticsearch::ElasticsearchClient;
pub use store::{CursorQuery, INDEX_ORDER, Page, SearchStore};
