//! Declarative call contracts for the music web service.
//!
//! # Overview
//! Every remote endpoint is a `CallDescriptor`: an immutable record that says
//! how to build the request and how to judge the response. The client builds
//! `HttpRequest` values and parses `HttpResponse` values without touching the
//! network (host-does-IO pattern); the caller, or an injected `Transport`,
//! performs the round-trip.
//!
//! # Design
//! - Responses go through one pipeline: decode, success check, shape check.
//!   Each failure is classified as `ParseFailure`, `CallFailure` or
//!   `ValidationFailure` and returned untouched. Nothing is retried.
//! - Shapes are described by structural `Schema`s or exact literals.
//! - Descriptors, the client and the pipeline hold no mutable state and are
//!   safe to share between threads.
//! - Concrete endpoints live in `calls`; adding one does not touch the engine.

pub mod calls;
pub mod client;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod paging;
pub mod processor;
pub mod schema;

pub use client::WebClient;
pub use config::{ClientConfig, ConfigError};
pub use descriptor::{CallDescriptor, RequestBody, ResponseContract, ResponseExpectation};
pub use error::{ApiError, CallError, CallFailure, ParseFailure, ValidationFailure};
pub use http::{AuthRequirements, HttpMethod, HttpRequest, HttpResponse, Transport};
pub use paging::Pages;
pub use schema::{validate, ObjectSchema, Property, Schema};
