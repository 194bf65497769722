//! The exposed operations, grouped by subsystem.
//!
//! Each operation takes the runtime plus one structured argument and returns a
//! structured result. `dispatch` exposes the same operations to callers that
//! speak JSON, keyed by operation name.

pub mod aggregation;
pub mod compliance;
pub mod learning;
pub mod registry;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::runtime::CanonRuntime;

/// Operation names accepted by [`dispatch`].
pub const OPERATIONS: [&str; 11] = [
    "processChanges",
    "queueChanges",
    "awaitLearning",
    "checkCompliance",
    "addException",
    "isExcepted",
    "syncProject",
    "getAggregations",
    "getPortfolioView",
    "linkProject",
    "unlinkProject",
];

/// Run the operation named `operation` with JSON `args`, returning its JSON result.
pub fn dispatch(rt: &CanonRuntime, operation: &str, args: Value) -> Result<Value, ApiError> {
    let _span = tracing::debug_span!("dispatch", operation).entered();
    match operation {
        "processChanges" => respond(learning::process_changes(rt, parse(operation, args)?)),
        "queueChanges" => respond(learning::queue_changes(rt, parse(operation, args)?)),
        "awaitLearning" => respond(learning::await_learning(rt, parse(operation, args)?)),
        "checkCompliance" => respond(compliance::check_compliance(rt, parse(operation, args)?)),
        "addException" => respond(compliance::add_exception(rt, parse(operation, args)?)),
        "isExcepted" => respond(compliance::is_excepted(rt, parse(operation, args)?)),
        "syncProject" => respond(aggregation::sync_project(rt, parse(operation, args)?)),
        "getAggregations" => respond(aggregation::get_aggregations(rt, parse(operation, args)?)),
        "getPortfolioView" => respond(aggregation::get_portfolio_view(rt)),
        "linkProject" => respond(registry::link_project(rt, parse(operation, args)?)),
        "unlinkProject" => respond(registry::unlink_project(rt, parse(operation, args)?)),
        other => Err(ApiError::invalid_input(format!("unknown operation '{other}'"))),
    }
}

fn parse<T: DeserializeOwned>(operation: &str, args: Value) -> Result<T, ApiError> {
    // Operations without fields accept a missing argument object.
    let args = if args.is_null() { Value::Object(Default::default()) } else { args };
    serde_json::from_value(args)
        .map_err(|e| ApiError::invalid_input(format!("invalid arguments for {operation}: {e}")))
}

fn respond<T: Serialize>(result: Result<T, ApiError>) -> Result<Value, ApiError> {
    let value = result?;
    serde_json::to_value(value).map_err(|e| {
        ApiError::new(
            canon_core::errors::error_code::STORAGE_ERROR,
            format!("result serialization failed: {e}"),
        )
    })
}
