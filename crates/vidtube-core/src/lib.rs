//! Core types and trait definitions for the vidtube backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the document model, the declarative aggregation pipeline and its
//! evaluator, pagination, and the [`store::DocumentStore`] abstraction that
//! storage backends implement.

pub mod collection;
pub mod error;
pub mod eval;
pub mod filter;
pub mod model;
pub mod page;
pub mod path;
pub mod pipeline;
pub mod read_model;
pub mod store;

pub use collection::{Collection, UniqueIndex};
pub use error::{Error, Result};
