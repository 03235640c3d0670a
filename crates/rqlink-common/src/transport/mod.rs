//! rqlink Transport Layer
//!
//! Plain HTTP/1.1 exchanges with rqlite nodes over `hyper`.
//!
//! # Components
//!
//! - **[`HttpTransport`]**: shared client that adds Basic credentials, applies
//!   the configured request timeout and honors the caller's [`CallContext`]
//! - **[`HttpResponse`]**: status code plus the fully read body
//!
//! Every request is an independent exchange, so aborting one call never
//! disturbs another in flight on the same transport.
//!
//! [`CallContext`]: crate::context::CallContext

pub mod http;

pub use http::{HttpResponse, HttpTransport};
