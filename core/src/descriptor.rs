//! Call descriptors: the per-endpoint contract.
//!
//! # Design
//! A `CallDescriptor<A>` is a plain immutable record describing one remote
//! endpoint: where to send the request, which credentials the transport must
//! attach, how to turn the caller's parameter object `A` into a body, and how
//! to judge the response. Descriptors never perform I/O. They are built once
//! (see `crate::calls`) and shared read-only between threads.
//!
//! Families of calls share defaults through factory functions that return a
//! pre-filled `CallDescriptorBuilder`, not through inheritance.

use std::fmt;

use serde_json::Value;

use crate::error::ApiError;
use crate::http::{AuthRequirements, HttpMethod};
use crate::schema::Schema;

/// Request payload produced by a descriptor's body builder.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent as `application/x-www-form-urlencoded` with the serialized JSON
    /// in a single `json` form field.
    Form(Value),
    /// The serialized JSON is the whole body.
    Raw(Value),
}

impl RequestBody {
    /// The JSON payload, before wire encoding.
    pub fn payload(&self) -> &Value {
        match self {
            RequestBody::Form(value) | RequestBody::Raw(value) => value,
        }
    }

    /// Encode into a `(content type, body text)` pair.
    pub fn encode(&self) -> Result<(&'static str, String), ApiError> {
        let json = serde_json::to_string(self.payload())
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(match self {
            RequestBody::Form(_) => (
                "application/x-www-form-urlencoded",
                url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("json", &json)
                    .finish(),
            ),
            RequestBody::Raw(_) => ("application/json", json),
        })
    }
}

/// How a decoded, service-accepted response is judged.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseExpectation {
    /// Validate the structure against a schema.
    Schema(Schema),
    /// The response must equal this value exactly.
    Literal(Value),
    /// Any value passes.
    Unchecked,
}

/// Builds a request body from the caller's parameter object.
pub type BodyBuilder<A> = fn(&A) -> RequestBody;

/// Reduces a response before it is written to a log record.
pub type LogFilter = fn(&Value) -> Value;

/// Immutable definition of one remote endpoint.
pub struct CallDescriptor<A> {
    name: &'static str,
    method: HttpMethod,
    path: &'static str,
    auth: AuthRequirements,
    static_params: Vec<(&'static str, &'static str)>,
    build_body: BodyBuilder<A>,
    expectation: ResponseExpectation,
    log_filter: Option<LogFilter>,
}

impl<A> CallDescriptor<A> {
    /// Start a descriptor for `path`, relative to the client's base URL.
    ///
    /// Defaults: `GET`, no auth, no static params, unchecked response.
    pub fn builder(
        name: &'static str,
        path: &'static str,
        build_body: BodyBuilder<A>,
    ) -> CallDescriptorBuilder<A> {
        CallDescriptorBuilder {
            descriptor: CallDescriptor {
                name,
                method: HttpMethod::Get,
                path,
                auth: AuthRequirements::NONE,
                static_params: Vec::new(),
                build_body,
                expectation: ResponseExpectation::Unchecked,
                log_filter: None,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn auth(&self) -> AuthRequirements {
        self.auth
    }

    pub fn static_params(&self) -> &[(&'static str, &'static str)] {
        &self.static_params
    }

    pub fn expectation(&self) -> &ResponseExpectation {
        &self.expectation
    }

    /// Build the request body for one invocation.
    pub fn build_body(&self, args: &A) -> RequestBody {
        (self.build_body)(args)
    }

    /// The response as it should appear in a log record.
    ///
    /// Without a filter this is a copy of `response`.
    pub fn filter_for_log(&self, response: &Value) -> Value {
        match self.log_filter {
            Some(filter) => filter(response),
            None => response.clone(),
        }
    }
}

impl<A> fmt::Debug for CallDescriptor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallDescriptor")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("auth", &self.auth)
            .field("static_params", &self.static_params)
            .field("expectation", &self.expectation)
            .field("log_filter", &self.log_filter.is_some())
            .finish_non_exhaustive()
    }
}

/// The response-judging half of a descriptor, independent of its argument
/// type. This is all the response pipeline needs, and it lets descriptors
/// with different parameter objects sit in one registry.
pub trait ResponseContract: Send + Sync {
    fn name(&self) -> &'static str;
    fn expectation(&self) -> &ResponseExpectation;
    fn filter_for_log(&self, response: &Value) -> Value;
}

impl<A> ResponseContract for CallDescriptor<A> {
    fn name(&self) -> &'static str {
        CallDescriptor::name(self)
    }

    fn expectation(&self) -> &ResponseExpectation {
        CallDescriptor::expectation(self)
    }

    fn filter_for_log(&self, response: &Value) -> Value {
        CallDescriptor::filter_for_log(self, response)
    }
}

/// Builder for `CallDescriptor`. Setting a schema replaces a literal and
/// vice versa, so a descriptor always carries at most one expectation.
pub struct CallDescriptorBuilder<A> {
    descriptor: CallDescriptor<A>,
}

impl<A> CallDescriptorBuilder<A> {
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.descriptor.method = method;
        self
    }

    pub fn auth(mut self, auth: AuthRequirements) -> Self {
        self.descriptor.auth = auth;
        self
    }

    pub fn static_param(mut self, name: &'static str, value: &'static str) -> Self {
        self.descriptor.static_params.push((name, value));
        self
    }

    pub fn schema(mut self, schema: impl Into<Schema>) -> Self {
        self.descriptor.expectation = ResponseExpectation::Schema(schema.into());
        self
    }

    pub fn expect_literal(mut self, literal: Value) -> Self {
        self.descriptor.expectation = ResponseExpectation::Literal(literal);
        self
    }

    pub fn log_filter(mut self, filter: LogFilter) -> Self {
        self.descriptor.log_filter = Some(filter);
        self
    }

    pub fn build(self) -> CallDescriptor<A> {
        self.descriptor
    }
}

/// Keep the first `max` elements of an array, noting how many were dropped.
///
/// Non-arrays and short arrays are returned as-is.
pub fn truncate_array(value: &Value, max: usize) -> Value {
    match value {
        Value::Array(items) if items.len() > max => {
            let mut kept: Vec<Value> = items[..max].to_vec();
            kept.push(Value::String(format!("...{} more", items.len() - max)));
            Value::Array(kept)
        }
        other => other.clone(),
    }
}
