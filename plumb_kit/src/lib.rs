//! # Plumb Kit - Plain Functions as HTTP Endpoints
//!
//! `plumb_kit` lets you register ordinary `async fn`s as HTTP endpoints. Each
//! function's signature decides how a request is bound to its parameters and
//! how its results are written back, so handlers contain domain logic only.
//!
//! ## Core Features:
//!
//! - **Signature-driven binding**: parameters are JSON bodies ([`Dto`]),
//!   query parameters ([`StringParam`], [`IntParam`]) or your own extractors
//!   ([`FromRequest`]); results are a JSON body, your own responders
//!   ([`ToResponse`]) and a trailing error. Errors implementing [`HttpError`]
//!   choose their status code.
//!
//! - **`#[handler]`**: pre-generates the adapter for a function at compile time
//!   and registers it at startup. Functions without it still work through an
//!   adapter built at runtime.
//!
//! - **`#[api_dto]`**: derives `serde` traits, a deep-zero [`Example`] and the
//!   body capabilities for a request/response type.
//!
//! - **[`ByMethod`] and [`ServeMux`]**: method multiplexing with `405`/`Allow`
//!   handling and a route registry that compiles into an `axum::Router`.
//!
//! - **Documentation**: [`ServeMux::documentation`] describes every endpoint
//!   using the same classification the adapters use, and
//!   [`openapi::build_openapi`] turns that into an OpenAPI document.

extern crate self as plumb_kit;

pub mod adapter;
pub mod bootstrap;
pub mod by_method;
pub mod cache;
pub mod docs;
pub mod error;
pub mod example;
pub mod handler;
pub mod input;
pub mod mux;
pub mod openapi;
pub mod output;
pub mod request;
pub mod respond;
pub mod signature;

pub use adapter::{Adapter, Handler};
pub use by_method::{ByMethod, Method};
pub use docs::Documentation;
pub use error::{Error, HttpError, Result};
pub use example::Example;
pub use handler::{HandlerValue, IntoHandler, Raw};
pub use input::{Dto, FromRequest, Input, IntParam, ParamName, StringParam};
pub use mux::ServeMux;
pub use output::{Output, Outputs, ToResponse};
pub use request::RequestContext;
pub use respond::ResponseWriter;
pub use signature::{Info, Signature};

#[cfg(feature = "macros")]
pub use plumb_kit_macros::{api_dto, handler};

// Re-exported for macro-generated code.
pub use axum;
pub use inventory;
pub use serde;
pub use serde_json;
