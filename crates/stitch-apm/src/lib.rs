//! Tracing backend client for tracestitch
//!
//! Retrieves the span graph belonging to a pivot activation id and flattens
//! the nested container/span structure into canonical span records.

mod client;
mod error;
mod flatten;

pub use client::{ApmClient, RawSpan, SpanContainer, SpanReference, TraceFetch};
pub use error::{ApmError, ApmResult};
pub use flatten::flatten;
