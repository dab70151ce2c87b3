//! Tool dispatcher — one round of concurrent tool execution.
//!
//! A dispatch round is the ordered list of tool calls from one model turn.
//! Calls run concurrently and in isolation: one handler's failure or
//! timeout is captured on its own result and never cancels siblings. The
//! returned vector is order-matched to the requests (`join_all` preserves
//! input order), which matters because some provider encodings bind
//! results positionally as well as by id.

use std::time::{Duration, Instant};

use futures::future::join_all;
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use strand_core::events::{BaseEvent, StrandEvent};
use strand_core::messages::{ToolCallRequest, ToolCallResult};
use strand_tools::errors::ToolError;
use strand_tools::registry::ToolRegistry;
use strand_tools::schema::validate_arguments;
use strand_tools::traits::ToolContext;

use crate::emitter::EventEmitter;

/// Convert a `Duration` to milliseconds, rounding up (ceiling).
///
/// `Duration::as_millis()` truncates sub-millisecond values to 0, which
/// makes fast handlers report "0ms". Any non-zero duration reports at
/// least 1ms.
#[allow(clippy::cast_possible_truncation)]
fn duration_ceil_ms(d: Duration) -> u64 {
    let micros = d.as_micros();
    if micros == 0 {
        return 0;
    }
    ((micros + 999) / 1000) as u64
}

/// Execute one dispatch round.
///
/// `ctx` is the session-scoped context; each call gets a copy scoped to
/// its own `tool_call_id`. Event emission is fire-and-forget relative to
/// the returned results.
#[instrument(skip_all, fields(session_id = %ctx.session_id, calls = requests.len()))]
pub async fn dispatch_round(
    requests: &[ToolCallRequest],
    registry: &ToolRegistry,
    emitter: &EventEmitter,
    ctx: &ToolContext,
    tool_timeout: Duration,
) -> Vec<ToolCallResult> {
    let round = requests
        .iter()
        .map(|req| execute_call(req, registry, emitter, ctx, tool_timeout));
    let results = join_all(round).await;
    debug!(results = results.len(), "dispatch round resolved");
    results
}

/// Execute a single tool call: lookup → validate → run under budget.
///
/// Always returns a result for the request's id, and always emits
/// `tool_start` followed by exactly one of `tool_complete`/`tool_failed`.
async fn execute_call(
    request: &ToolCallRequest,
    registry: &ToolRegistry,
    emitter: &EventEmitter,
    ctx: &ToolContext,
    tool_timeout: Duration,
) -> ToolCallResult {
    let start = Instant::now();
    let session_id = ctx.session_id.as_str();
    let call_ctx = ctx.for_call(&request.id);

    // 1. Announce the call
    let _ = emitter.emit(StrandEvent::ToolStart {
        base: BaseEvent::now(session_id),
        tool_call_id: request.id.clone(),
        tool_name: request.name.clone(),
        arguments: Some(request.arguments.clone()),
    });

    // 2. Look up the handler
    let Some(tool) = registry.get(&request.name) else {
        error!(tool_name = %request.name, "tool not found");
        let err = ToolError::NotFound(request.name.clone());
        return fail(request, start, emitter, session_id, &err);
    };

    // 3. Validate arguments against the declared schema
    if let Err(err) = validate_arguments(&request.arguments, &tool.spec().parameters) {
        warn!(tool_name = %request.name, %err, "argument validation failed");
        return fail(request, start, emitter, session_id, &err);
    }

    // 4. Run the handler under its per-call budget
    let outcome = if call_ctx.cancellation.is_cancelled() {
        Err(ToolError::Execution("operation cancelled".into()))
    } else {
        let arguments = Value::Object(request.arguments.clone());
        match tokio::time::timeout(tool_timeout, tool.execute(arguments, &call_ctx)).await {
            Ok(result) => result,
            // The future is dropped here; a handler that ignored its
            // cancellation token may keep side effects running. Known
            // leak boundary.
            Err(_) => Err(ToolError::Timeout {
                budget_ms: duration_ceil_ms(tool_timeout),
            }),
        }
    };

    let duration_ms = duration_ceil_ms(start.elapsed());

    // 5. Record metrics
    counter!("tool_executions_total", "tool" => request.name.clone()).increment(1);
    histogram!("tool_execution_duration_seconds", "tool" => request.name.clone())
        .record(start.elapsed().as_secs_f64());

    // 6. Resolve
    match outcome {
        Ok(output) => {
            let _ = emitter.emit(StrandEvent::ToolComplete {
                base: BaseEvent::now(session_id),
                tool_call_id: request.id.clone(),
                tool_name: request.name.clone(),
                duration: duration_ms,
            });
            info!(tool = %request.name, duration_ms, "tool executed");
            ToolCallResult::ok(&request.id, &request.name, output)
        }
        Err(err) => {
            let _ = emitter.emit(StrandEvent::ToolFailed {
                base: BaseEvent::now(session_id),
                tool_call_id: request.id.clone(),
                tool_name: request.name.clone(),
                duration: duration_ms,
                error: err.to_string(),
            });
            counter!("tool_errors_total", "tool" => request.name.clone(), "code" => err.code())
                .increment(1);
            warn!(tool = %request.name, code = err.code(), duration_ms, "tool failed");
            ToolCallResult::error(&request.id, &request.name, err.code(), err.to_string())
        }
    }
}

/// Short-circuit failure before the handler ran (lookup or validation).
fn fail(
    request: &ToolCallRequest,
    start: Instant,
    emitter: &EventEmitter,
    session_id: &str,
    err: &ToolError,
) -> ToolCallResult {
    let duration_ms = duration_ceil_ms(start.elapsed());
    let _ = emitter.emit(StrandEvent::ToolFailed {
        base: BaseEvent::now(session_id),
        tool_call_id: request.id.clone(),
        tool_name: request.name.clone(),
        duration: duration_ms,
        error: err.to_string(),
    });
    counter!("tool_errors_total", "tool" => request.name.clone(), "code" => err.code())
        .increment(1);
    ToolCallResult::error(&request.id, &request.name, err.code(), err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use std::sync::Arc;
    use strand_core::messages::{
        ERR_EXECUTION, ERR_INVALID_ARGUMENTS, ERR_TIMEOUT, ERR_TOOL_NOT_FOUND,
    };
    use strand_tools::testutil::{EchoTool, FailingTool, SlowTool};
    use strand_tools::Tool;

    fn make_registry(tools: Vec<Arc<dyn Tool>>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool).unwrap();
        }
        registry
    }

    fn req(id: &str, name: &str, args: Map<String, Value>) -> ToolCallRequest {
        ToolCallRequest::new(id, name, args)
    }

    fn text_args(text: &str) -> Map<String, Value> {
        let mut m = Map::new();
        let _ = m.insert("text".into(), json!(text));
        m
    }

    #[tokio::test]
    async fn successful_round() {
        let registry = make_registry(vec![Arc::new(EchoTool)]);
        let emitter = EventEmitter::new();
        let ctx = ToolContext::new("tc_1", "s1");

        let requests = vec![req("tc_1", "echo", text_args("hello"))];
        let results =
            dispatch_round(&requests, &registry, &emitter, &ctx, Duration::from_secs(5)).await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].is_error());
        assert_eq!(results[0].output.as_ref().unwrap()["echo"], "hello");
    }

    #[tokio::test]
    async fn unknown_tool_fails_without_affecting_siblings() {
        let registry = make_registry(vec![Arc::new(EchoTool)]);
        let emitter = EventEmitter::new();
        let ctx = ToolContext::new("tc_1", "s1");

        let requests = vec![
            req("tc_1", "nonexistent", Map::new()),
            req("tc_2", "echo", text_args("still fine")),
        ];
        let results =
            dispatch_round(&requests, &registry, &emitter, &ctx, Duration::from_secs(5)).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "tc_1");
        assert_eq!(results[0].error.as_ref().unwrap().code, ERR_TOOL_NOT_FOUND);
        assert_eq!(results[1].id, "tc_2");
        assert!(!results[1].is_error());
    }

    #[tokio::test]
    async fn invalid_arguments_rejected() {
        let registry = make_registry(vec![Arc::new(EchoTool)]);
        let emitter = EventEmitter::new();
        let ctx = ToolContext::new("tc_1", "s1");

        // echo's schema declares `text: string`
        let mut bad = Map::new();
        let _ = bad.insert("text".into(), json!(42));
        let requests = vec![req("tc_1", "echo", bad)];
        let results =
            dispatch_round(&requests, &registry, &emitter, &ctx, Duration::from_secs(5)).await;

        assert_eq!(
            results[0].error.as_ref().unwrap().code,
            ERR_INVALID_ARGUMENTS
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_yields_timeout_error_and_spares_siblings() {
        let registry = make_registry(vec![
            Arc::new(SlowTool::new(Duration::from_secs(60))),
            Arc::new(EchoTool),
        ]);
        let emitter = EventEmitter::new();
        let ctx = ToolContext::new("tc_1", "s1");

        let requests = vec![
            req("tc_1", "slow", Map::new()),
            req("tc_2", "echo", text_args("fast")),
        ];
        let results =
            dispatch_round(&requests, &registry, &emitter, &ctx, Duration::from_secs(30)).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].error.as_ref().unwrap().code, ERR_TIMEOUT);
        assert!(!results[1].is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn round_runs_concurrently() {
        let registry = make_registry(vec![Arc::new(SlowTool::new(Duration::from_secs(10)))]);
        let emitter = EventEmitter::new();
        let ctx = ToolContext::new("tc_1", "s1");

        let requests = vec![
            req("tc_1", "slow", Map::new()),
            req("tc_2", "slow", Map::new()),
            req("tc_3", "slow", Map::new()),
        ];
        let start = tokio::time::Instant::now();
        let results =
            dispatch_round(&requests, &registry, &emitter, &ctx, Duration::from_secs(60)).await;

        // Three 10s handlers raced together take 10s, not 30s.
        assert_eq!(results.len(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn results_order_matches_request_order() {
        let registry = make_registry(vec![
            Arc::new(EchoTool),
            Arc::new(SlowTool::new(Duration::from_millis(20))),
        ]);
        let emitter = EventEmitter::new();
        let ctx = ToolContext::new("tc_1", "s1");

        // Slow first, fast second — output order must still match input.
        let requests = vec![
            req("tc_1", "slow", Map::new()),
            req("tc_2", "echo", text_args("x")),
        ];
        let results =
            dispatch_round(&requests, &registry, &emitter, &ctx, Duration::from_secs(5)).await;

        assert_eq!(results[0].id, "tc_1");
        assert_eq!(results[1].id, "tc_2");
    }

    #[tokio::test]
    async fn emits_start_then_resolution_per_call() {
        let registry = make_registry(vec![Arc::new(EchoTool)]);
        let emitter = EventEmitter::new();
        let mut rx = emitter.subscribe();
        let ctx = ToolContext::new("tc_1", "s1");

        let requests = vec![
            req("tc_1", "echo", text_args("a")),
            req("tc_2", "nonexistent", Map::new()),
        ];
        let _ = dispatch_round(&requests, &registry, &emitter, &ctx, Duration::from_secs(5)).await;

        let mut started = vec![];
        let mut resolved = vec![];
        while let Ok(event) = rx.try_recv() {
            match event {
                StrandEvent::ToolStart { tool_call_id, .. } => started.push(tool_call_id),
                StrandEvent::ToolComplete { tool_call_id, .. }
                | StrandEvent::ToolFailed { tool_call_id, .. } => resolved.push(tool_call_id),
                _ => {}
            }
        }
        // Every resolution has a prior start, exactly one each.
        assert_eq!(started.len(), 2);
        assert_eq!(resolved.len(), 2);
        for id in &resolved {
            assert_eq!(started.iter().filter(|s| *s == id).count(), 1);
            assert_eq!(resolved.iter().filter(|r| *r == id).count(), 1);
        }
    }

    #[tokio::test]
    async fn cancelled_session_skips_handler() {
        let tool = Arc::new(FailingTool::fail_first(0));
        let registry = {
            let mut r = ToolRegistry::new();
            r.register(tool.clone() as Arc<dyn Tool>).unwrap();
            r
        };
        let emitter = EventEmitter::new();
        let ctx = ToolContext::new("tc_1", "s1");
        ctx.cancellation.cancel();

        let requests = vec![req("tc_1", "flaky", Map::new())];
        let results =
            dispatch_round(&requests, &registry, &emitter, &ctx, Duration::from_secs(5)).await;

        assert_eq!(results[0].error.as_ref().unwrap().code, ERR_EXECUTION);
        assert_eq!(tool.call_count(), 0);
    }

    #[test]
    fn duration_ceil_rounds_up() {
        assert_eq!(duration_ceil_ms(Duration::ZERO), 0);
        assert_eq!(duration_ceil_ms(Duration::from_micros(1)), 1);
        assert_eq!(duration_ceil_ms(Duration::from_micros(1001)), 2);
        assert_eq!(duration_ceil_ms(Duration::from_millis(30)), 30);
    }
}
