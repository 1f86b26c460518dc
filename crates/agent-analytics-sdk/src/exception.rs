//! Recording of errors, panics and metrics on spans.

use agent_analytics_core::{Metric, MetricCategory, Record};
use agent_analytics_span::{ActiveSpan, ExecutionContext, SpanStatus};
use chrono::Utc;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe, Location};

use crate::capture::{emit, with_recording_span};

const EXCEPTION_SPAN_SUFFIX: &str = "ExceptionHandling";

/// Record `error` as an `exception` event and mark the span failed.
///
/// Uses the current recording span, or a fresh
/// `<file>:<line>.ExceptionHandling` span ended right after.
#[track_caller]
pub fn record_exception<E>(ctx: &ExecutionContext, error: &E)
where
    E: std::error::Error + ?Sized,
{
    let location = Location::caller();
    with_recording_span(ctx, location, EXCEPTION_SPAN_SUFFIX, |span| {
        mark_failed(span, error)
    });
}

/// Run `op`, recording its error or panic.
///
/// The error is returned unchanged. A panic is recorded and then resumed
/// with its original payload.
#[track_caller]
pub fn record_exceptions<T, E, F>(ctx: &ExecutionContext, op: F) -> Result<T, E>
where
    E: std::error::Error,
    F: FnOnce() -> Result<T, E>,
{
    let location = Location::caller();
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => {
            with_recording_span(ctx, location, EXCEPTION_SPAN_SUFFIX, |span| {
                mark_failed(span, &error)
            });
            Err(error)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            with_recording_span(ctx, location, EXCEPTION_SPAN_SUFFIX, |span| {
                span.record_exception_parts("panic", &message, None);
                span.set_status(SpanStatus::Error, Some(message.clone()));
            });
            panic::resume_unwind(payload)
        }
    }
}

/// Build a metric about `affected_element_id` and capture it.
///
/// The metric id is `<affected_element_id>.<name>`; the generated metric is
/// returned for further use.
#[track_caller]
pub fn record_metric(
    ctx: &ExecutionContext,
    affected_element_id: &str,
    name: &str,
    value: f64,
    units: &str,
    category: MetricCategory,
) -> Metric {
    let location = Location::caller();
    let mut metric = Metric::new(
        format!("{}.{}", affected_element_id, name),
        affected_element_id,
        value,
        units,
    )
    .with_category(category)
    .with_name(name);
    metric.generation_time = Some(Utc::now());

    with_recording_span(ctx, location, "metric", |span| emit(span, &metric));
    metric
}

fn mark_failed<E>(span: &ActiveSpan, error: &E)
where
    E: std::error::Error + ?Sized,
{
    span.record_exception(error);
    span.set_status(SpanStatus::Error, Some(error.to_string()));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
