//! Plan execution: run a plan's actions against the Tool Provider.
//!
//! Actions run strictly in declaration order. A failed reference degrades
//! its argument to null and the call still goes out; a failed call is
//! recorded and the next action runs. Nothing in here aborts a plan.

use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use huddle_core::context::WorkingContext;
use huddle_core::error::{ReferenceError, ToolError};
use huddle_core::event::{DomainEvent, EventBus};
use huddle_core::tool::{ToolArguments, ToolDescriptor, ToolProvider};

use crate::normalizer;
use crate::plan::{Action, Plan};
use crate::resolver;

/// What happened to one action.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// The tool ran; its result was saved if the action asked for it.
    Completed { saved_as: Option<String> },

    /// The tool is not in the current catalogue, so it was never called.
    UnknownTool,

    /// The Tool Provider reported a failure.
    Failed(ToolError),
}

/// The record of one executed action.
#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub tool: String,
    pub outcome: ActionOutcome,
    /// References that failed to resolve (their arguments were sent as null).
    pub unresolved: Vec<ReferenceError>,
    pub duration_ms: u64,
}

impl ActionRecord {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, ActionOutcome::Completed { .. })
    }
}

/// The result of executing one plan.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// The plan's `done` flag (true when absent).
    pub done: bool,
    /// The plan's user-visible text for this round.
    pub response: Option<String>,
    pub actions: Vec<ActionRecord>,
}

/// Executes plans against a Tool Provider.
pub struct PlanExecutor {
    tools: Arc<dyn ToolProvider>,
    event_bus: Arc<EventBus>,
}

impl PlanExecutor {
    pub fn new(tools: Arc<dyn ToolProvider>, event_bus: Arc<EventBus>) -> Self {
        Self { tools, event_bus }
    }

    /// Run every action of `plan` in order, writing saved results into `context`.
    ///
    /// `catalogue` is the tool list fetched for this round; actions naming
    /// any other tool are recorded as unknown and skipped.
    pub async fn execute(
        &self,
        plan: &Plan,
        context: &mut WorkingContext,
        catalogue: &[ToolDescriptor],
    ) -> ExecutionReport {
        let known: BTreeSet<&str> = catalogue.iter().map(|d| d.name.as_str()).collect();
        let mut records = Vec::with_capacity(plan.actions.len());

        for action in &plan.actions {
            let record = self.execute_action(action, context, &known).await;
            records.push(record);
        }

        ExecutionReport {
            done: plan.is_done(),
            response: plan.response_text().map(str::to_string),
            actions: records,
        }
    }

    async fn execute_action(
        &self,
        action: &Action,
        context: &mut WorkingContext,
        known: &BTreeSet<&str>,
    ) -> ActionRecord {
        if !known.contains(action.tool.as_str()) {
            warn!(tool = %action.tool, "Plan names a tool that is not in the catalogue");
            self.event_bus.publish(DomainEvent::ToolExecuted {
                tool_name: action.tool.clone(),
                saved_as: None,
                success: false,
                duration_ms: 0,
                timestamp: Utc::now(),
            });
            return ActionRecord {
                tool: action.tool.clone(),
                outcome: ActionOutcome::UnknownTool,
                unresolved: vec![],
                duration_ms: 0,
            };
        }

        let (arguments, unresolved) = self.resolve_arguments(action, context);

        debug!(tool = %action.tool, args = ?arguments, "Calling tool");
        let start = Instant::now();
        let result = self.tools.call_tool(&action.tool, arguments).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(result) => {
                let saved_as = action.slot().map(str::to_string);
                if let Some(name) = &saved_as {
                    let normalized = normalizer::normalize(&result);
                    debug!(slot = %name, data = %normalized, "Saved tool result");
                    context.store_result(name, result, normalized);
                }
                ActionOutcome::Completed { saved_as }
            }
            Err(e) => {
                warn!(tool = %action.tool, error = %e, "Tool execution failed");
                ActionOutcome::Failed(e)
            }
        };

        let success = matches!(outcome, ActionOutcome::Completed { .. });
        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: action.tool.clone(),
            saved_as: match &outcome {
                ActionOutcome::Completed { saved_as } => saved_as.clone(),
                _ => None,
            },
            success,
            duration_ms,
            timestamp: Utc::now(),
        });

        ActionRecord {
            tool: action.tool.clone(),
            outcome,
            unresolved,
            duration_ms,
        }
    }

    /// Resolve top-level string arguments that are references.
    fn resolve_arguments(
        &self,
        action: &Action,
        context: &WorkingContext,
    ) -> (ToolArguments, Vec<ReferenceError>) {
        let mut unresolved = Vec::new();
        let arguments = action
            .args
            .iter()
            .map(|(key, value)| {
                let resolved = match value {
                    Value::String(s) if resolver::is_reference(s) => {
                        match resolver::resolve(s, context) {
                            Ok(v) => {
                                debug!(reference = %s, resolved = %v, "Resolved reference");
                                v
                            }
                            Err(e) => {
                                warn!(tool = %action.tool, reference = %s, error = %e, "Reference unresolved");
                                self.event_bus.publish(DomainEvent::ReferenceUnresolved {
                                    tool_name: action.tool.clone(),
                                    reference: s.clone(),
                                    reason: e.to_string(),
                                    timestamp: Utc::now(),
                                });
                                unresolved.push(e);
                                Value::Null
                            }
                        }
                    }
                    other => other.clone(),
                };
                (key.clone(), resolved)
            })
            .collect();
        (arguments, unresolved)
    }
}
