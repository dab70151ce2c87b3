//! Conversation state machine.
//!
//! One session run drives the loop `AwaitingModel → {text terminal | tool
//! calls → dispatch → AwaitingModel}` bounded by an iteration cap and a
//! wall-clock deadline. The runner is the single emitting task for its
//! session, which enforces the stream ordering invariants by construction:
//! `connected` is emitted before the first model call, every `tool_start`
//! resolves exactly once, `token` frames reconstruct the final text left to
//! right, and every exit path emits exactly one terminal frame.

use std::sync::Arc;

use metrics::{counter, histogram};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use strand_core::events::{connected_event, BaseEvent, StrandEvent};
use strand_core::messages::{Conversation, Turn};
use strand_core::text::chunk_text;
use strand_llm::gateway::{ModelGateway, ModelOutcome};
use strand_tools::registry::ToolRegistry;
use strand_tools::traits::ToolContext;

use crate::dispatch::dispatch_round;
use crate::emitter::EventEmitter;
use crate::errors::RuntimeError;
use crate::types::{RunResult, SessionConfig, STOP_ITERATION_LIMIT};

/// Token frame payload size. Small enough for progressive display,
/// large enough to keep frame overhead negligible.
const TOKEN_CHUNK_BYTES: usize = 64;

/// Fallback answer when the cap is hit and no text was ever buffered.
const NO_ANSWER_TEXT: &str =
    "I wasn't able to produce a final answer within the allowed number of steps.";

/// Run one session to completion.
///
/// Emits the full frame sequence on `emitter` and returns the run outcome.
/// Bounds violations that still produce an answer (iteration cap) resolve
/// to `Ok` with a `stop_reason`; systemic failures resolve to `Err` after
/// the terminal `error` frame is emitted.
#[instrument(skip_all, fields(session_id = %session_id))]
pub async fn run_session(
    session_id: &str,
    mut conversation: Conversation,
    gateway: &dyn ModelGateway,
    registry: &Arc<ToolRegistry>,
    emitter: &Arc<EventEmitter>,
    cancel: CancellationToken,
    config: &SessionConfig,
) -> Result<RunResult, RuntimeError> {
    let started = std::time::Instant::now();
    let _ = emitter.emit(connected_event(session_id));
    counter!("session_runs_total").increment(1);

    let deadline = tokio::time::sleep(config.session_timeout);
    tokio::pin!(deadline);

    let outcome = tokio::select! {
        res = drive(session_id, &mut conversation, gateway, registry, emitter, &cancel, config) => res,
        () = &mut deadline => Err(RuntimeError::SessionTimeout {
            budget_secs: config.session_timeout.as_secs(),
        }),
        () = cancel.cancelled() => Err(RuntimeError::Cancelled),
    };

    histogram!("session_run_duration_seconds").record(started.elapsed().as_secs_f64());

    // Let tools release per-session state regardless of how the run ended.
    registry.session_closed(session_id);

    match outcome {
        Ok(run) => {
            finish(emitter, session_id, &run);
            Ok(run)
        }
        // The cap produces an answer, not a failure: synthesize from
        // whatever text the model buffered along the way.
        Err(RuntimeError::IterationLimitExceeded { cap }) => {
            warn!(session_id, cap, "iteration limit reached, synthesizing answer");
            let fragments = conversation.model_text_fragments();
            let text = if fragments.is_empty() {
                NO_ANSWER_TEXT.to_owned()
            } else {
                fragments.join("\n")
            };
            let run = RunResult {
                text,
                iterations: cap,
                stop_reason: Some(STOP_ITERATION_LIMIT.to_owned()),
            };
            finish(emitter, session_id, &run);
            Ok(run)
        }
        Err(err) => {
            warn!(session_id, code = err.code(), "session failed");
            counter!("session_errors_total", "code" => err.code()).increment(1);
            let _ = emitter.emit(StrandEvent::Error {
                base: BaseEvent::now(session_id),
                error: err.to_string(),
                code: Some(err.code().to_owned()),
            });
            Err(err)
        }
    }
}

/// Stream the final text as `token` frames, then the `done` frame.
fn finish(emitter: &EventEmitter, session_id: &str, run: &RunResult) {
    for chunk in chunk_text(&run.text, TOKEN_CHUNK_BYTES) {
        let _ = emitter.emit(StrandEvent::Token {
            base: BaseEvent::now(session_id),
            text: chunk.to_owned(),
        });
    }
    let _ = emitter.emit(StrandEvent::Done {
        base: BaseEvent::now(session_id),
        text: run.text.clone(),
        iterations: run.iterations,
        stop_reason: run.stop_reason.clone(),
    });
    info!(session_id, iterations = run.iterations, "session done");
}

/// The model/dispatch loop. Returns on a text-only model response or a
/// bounds violation; the caller turns both into terminal frames.
async fn drive(
    session_id: &str,
    conversation: &mut Conversation,
    gateway: &dyn ModelGateway,
    registry: &Arc<ToolRegistry>,
    emitter: &Arc<EventEmitter>,
    cancel: &CancellationToken,
    config: &SessionConfig,
) -> Result<RunResult, RuntimeError> {
    let catalogue = registry.catalogue();
    let ctx = ToolContext {
        tool_call_id: String::new(),
        session_id: session_id.to_owned(),
        cancellation: cancel.clone(),
    };

    let mut iterations: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }
        iterations += 1;
        if iterations > config.max_iterations {
            return Err(RuntimeError::IterationLimitExceeded {
                cap: config.max_iterations,
            });
        }

        let _ = emitter.emit(StrandEvent::Thinking {
            base: BaseEvent::now(session_id),
            message: "Thinking".into(),
        });
        debug!(session_id, iterations, "calling model");
        counter!("session_turns_total").increment(1);

        let outcome = gateway.call(conversation, catalogue).await?;
        if cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }

        match outcome {
            ModelOutcome::Text { text } => {
                conversation.push(Turn::model_text(&text));
                return Ok(RunResult {
                    text,
                    iterations,
                    stop_reason: None,
                });
            }
            // An empty tool-call list is a termination signal.
            ModelOutcome::ToolCalls { text, calls, .. } if calls.is_empty() => {
                let text = text.unwrap_or_default();
                conversation.push(Turn::model_text(&text));
                return Ok(RunResult {
                    text,
                    iterations,
                    stop_reason: None,
                });
            }
            ModelOutcome::ToolCalls {
                text,
                calls,
                continuation,
            } => {
                // Mixed text is buffered on the turn; tool calls drive
                // control flow. Buffered text resurfaces only in
                // iteration-limit synthesis.
                conversation.push(Turn::model_tool_calls(text, calls.clone(), continuation));
                let results =
                    dispatch_round(&calls, registry, emitter, &ctx, config.tool_timeout).await;
                conversation.push(Turn::tool_results(results));
            }
        }
    }
}
