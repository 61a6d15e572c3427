//! Functions used by the demo.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use functional_agent_core::{FunctionError, FunctionSpec, Param, ParamType};
use serde_json::json;

/// A function counting its own calls, returning the count as text.
///
/// The count lives in the returned spec, so every counter starts from zero.
pub fn counter() -> FunctionSpec {
    let count = Arc::new(AtomicU64::new(0));
    FunctionSpec::new("counter", move |_| {
        let count = count.fetch_add(1, Ordering::SeqCst) + 1;
        println!("Counter: {count}");
        Ok(json!(count.to_string()))
    })
    .with_description("Increments a counter and returns its new value.")
}

/// Integer division of `n` by `d`.
pub fn divide() -> FunctionSpec {
    FunctionSpec::new("divide", |args| {
        let (Some(n), Some(d)) = (args.get_i64("n"), args.get_i64("d")) else {
            return Err(FunctionError::new("`n` and `d` must be integers"));
        };
        n.checked_div(d)
            .map(|q| json!(q))
            .ok_or_else(|| FunctionError::new("division by zero"))
    })
    .with_description("Divides two integers.")
    .with_param(Param::required("n", ParamType::Integer).described("dividend"))
    .with_param(
        Param::with_default("d", ParamType::Integer, 1).described("divisor"),
    )
}
