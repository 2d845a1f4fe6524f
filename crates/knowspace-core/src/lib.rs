//! Core types and trait definitions for the Knowspace knowledge base.
//!
//! Holds the domain model, validation, paging, the comment-tree builder and
//! the [`store::KnowledgeStore`] trait. No HTTP or database code lives here;
//! the store, API, server and client crates all build on it.

pub mod comment_tree;
pub mod error;
pub mod model;
pub mod paging;
pub mod permission;
pub mod slug;
pub mod store;
pub mod validate;

pub use error::{Error, Result};
