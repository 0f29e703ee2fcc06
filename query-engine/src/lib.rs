//! Natural-language querying over MongoDB collections.
//!
//! A [`QueryEngine`] shows one sample document to a text-generation backend,
//! asks it for a query descriptor (`find`, `filter`, `projection`, `sort`),
//! validates the reply and runs it against a [`DocumentStore`]:
//!
//! - [`QueryEngine::translate`]: natural language → [`QueryDescriptor`]
//! - [`parse`]: raw generation reply → [`QueryDescriptor`]
//! - [`QueryEngine::execute`]: descriptor → documents
//! - [`QueryEngine::run`]: the whole pipeline, rendered as pretty JSON or an
//!   error message
//!
//! The collection that is queried is always the one the caller names.

pub mod cfg;
mod descriptor;
mod engine;
mod error;
mod parse;
pub mod prompt;
pub mod store;

pub use cfg::StoreConfig;
pub use descriptor::{Document, QueryDescriptor, SortDirection, SortSpec};
pub use engine::QueryEngine;
pub use error::{ConfigError, QueryError, StoreError};
pub use parse::{first_json_object, parse, unescape_underscores};
pub use store::{DocumentStore, MemoryStore, MongoStore, StoreFuture};
