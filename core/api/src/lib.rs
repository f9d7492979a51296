//! Remote API boundary for Lockerbox.
//!
//! This module provides the normalized result contract every remote operation
//! resolves to, the data model exchanged with the service, and a trait-based
//! interface with two implementations: an HTTP client for the real service and
//! an in-memory service for tests and offline use.
//!
//! # Design Principles
//! - Expected failures are values: no operation panics or propagates a fault
//!   for an authentication, validation, or not-found response
//! - Structured records: string-encoded composites are split at the boundary
//! - Async operations: every remote call is async and may be in flight
//!   concurrently with others

pub mod http;
pub mod memory;
pub mod model;
pub mod outcome;
pub mod remote;

pub use http::HttpApi;
pub use memory::MemoryApi;
pub use model::{ConversationDetail, ConversationSummary, Download, Entry, Listing, User};
pub use outcome::{capitalize, ApiResult, Envelope, Failure};
pub use remote::{FileChange, RemoteApi};
