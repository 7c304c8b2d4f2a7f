//! Response pipeline: raw text in, validated value or classified failure out.
//!
//! # Design
//! Stages run strictly in order and the first failure is terminal:
//!
//! 1. `Decode`: parse the text as JSON (`ParseFailure`).
//! 2. `SuccessCheck`: a falsy `success` key means the service rejected the
//!    call (`CallFailure`). A missing key is success; the service only sends
//!    the flag reliably when it is negative.
//! 3. `ShapeCheck`: literal equality or schema validation
//!    (`ValidationFailure`). This gate is independent of the success check.
//! 4. `LogFilter`: the descriptor's log filter shapes the debug record. The
//!    caller always receives the unfiltered value.
//!
//! The processor holds no state. `process_observed` reports each stage to a
//! `StageObserver` so tests can see exactly how far a response travelled.

use serde_json::Value;

use crate::descriptor::{ResponseContract, ResponseExpectation};
use crate::error::{CallError, CallFailure, ParseFailure, ValidationFailure};
use crate::schema;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Decode,
    SuccessCheck,
    ShapeCheck,
    LogFilter,
}

/// Receives a notification as each stage starts.
pub trait StageObserver {
    fn entered(&mut self, stage: Stage);
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn entered(&mut self, _stage: Stage) {}
}

/// Run the full pipeline for `call` over `text`.
pub fn process<C>(call: &C, text: &str) -> Result<Value, CallError>
where
    C: ResponseContract + ?Sized,
{
    process_observed(call, text, &mut NoopObserver)
}

/// Like `process`, reporting each stage to `observer`.
pub fn process_observed<C, O>(call: &C, text: &str, observer: &mut O) -> Result<Value, CallError>
where
    C: ResponseContract + ?Sized,
    O: StageObserver + ?Sized,
{
    let result = run(call, text, observer);
    if let Err(err) = &result {
        tracing::warn!(call = call.name(), error = %err, "call response rejected");
    }
    result
}

fn run<C, O>(call: &C, text: &str, observer: &mut O) -> Result<Value, CallError>
where
    C: ResponseContract + ?Sized,
    O: StageObserver + ?Sized,
{
    observer.entered(Stage::Decode);
    let value = decode(text)?;

    observer.entered(Stage::SuccessCheck);
    check_success(call.name(), &value)?;

    observer.entered(Stage::ShapeCheck);
    check_shape(call.expectation(), &value)?;

    observer.entered(Stage::LogFilter);
    tracing::debug!(
        call = call.name(),
        response = %log_record(call, &value),
        "call succeeded"
    );

    Ok(value)
}

/// Decode the raw response text.
pub fn decode(text: &str) -> Result<Value, ParseFailure> {
    serde_json::from_str(text).map_err(|e| ParseFailure {
        reason: e.to_string(),
    })
}

/// Fail when the response carries a falsy `success` flag.
pub fn check_success(call_name: &str, value: &Value) -> Result<(), CallFailure> {
    match value.get("success") {
        Some(flag) if is_falsy(flag) => Err(CallFailure::server_reported(call_name)),
        _ => Ok(()),
    }
}

/// Judge a service-accepted response against the descriptor's expectation.
pub fn check_shape(expectation: &ResponseExpectation, value: &Value) -> Result<(), ValidationFailure> {
    match expectation {
        ResponseExpectation::Schema(schema) => schema::validate(value, schema).map(|_| ()),
        ResponseExpectation::Literal(expected) if value == expected => Ok(()),
        ResponseExpectation::Literal(expected) => Err(ValidationFailure::new(
            "$",
            format!("response != {expected}"),
        )),
        ResponseExpectation::Unchecked => Ok(()),
    }
}

/// The value to write to diagnostic logs for `response`.
///
/// Serializable on its own and never substituted for the returned value.
pub fn log_record<C>(call: &C, response: &Value) -> Value
where
    C: ResponseContract + ?Sized,
{
    call.filter_for_log(response)
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
