//! Document store seam and its implementations.
//!
//! - [`MongoStore`]: production store over the official MongoDB driver
//! - [`MemoryStore`]: in-process store evaluating a MongoDB-compatible
//!   subset of filters, projections and sorts

mod matcher;
mod memory;
mod mongo;

use std::future::Future;
use std::pin::Pin;

pub use matcher::{compare_values, matches, project, sort_documents};
pub use memory::MemoryStore;
pub use mongo::MongoStore;

use crate::descriptor::{Document, QueryDescriptor};
use crate::error::StoreError;

/// Boxed future returned by [`DocumentStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Read access to named document collections.
pub trait DocumentStore: Send + Sync {
    /// Any one document of `collection`, or `None` if it is empty.
    fn sample<'a>(&'a self, collection: &'a str) -> StoreFuture<'a, Option<Document>>;

    /// All documents of `query.find` matching the filter, projected and sorted.
    fn find<'a>(&'a self, query: &'a QueryDescriptor) -> StoreFuture<'a, Vec<Document>>;

    /// Cheap liveness probe.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
