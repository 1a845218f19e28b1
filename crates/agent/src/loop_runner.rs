//! The agent planning loop implementation.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use huddle_config::AgentConfig;
use huddle_core::error::PlanError;
use huddle_core::event::{DomainEvent, EventBus};
use huddle_core::provider::CompletionProvider;
use huddle_core::session::Session;
use huddle_core::tool::{ToolDescriptor, ToolProvider};

use crate::executor::{ActionRecord, PlanExecutor};
use crate::normalizer;
use crate::plan::{self, Plan, PlannerOutput};
use crate::prompt::PromptBuilder;

/// Rounds per turn unless configured otherwise.
pub const DEFAULT_MAX_ROUNDS: usize = 5;

/// Where a turn is in the plan/execute cycle.
#[derive(Debug, Clone)]
pub enum LoopState {
    AwaitingInput,
    Planning {
        round: usize,
    },
    Executing {
        round: usize,
        plan: Plan,
        catalogue: Vec<ToolDescriptor>,
    },
    Done(StopReason),
}

/// Why a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// The last plan said it was done (or did not say).
    Done,
    /// The planner answered in prose.
    TextOnly,
    /// The round cap was reached with the task still open.
    IterationCap,
    /// The planner's reply looked like a plan but did not parse.
    MalformedPlan { reason: String, raw: String },
    /// The Completion Provider failed.
    CompletionFailed(String),
    /// The tool catalogue could not be fetched at the start of a round.
    CatalogueUnavailable(String),
    /// The turn ran past its wall-clock limit, in seconds.
    TimedOut(u64),
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::TextOnly => "text_only",
            Self::IterationCap => "iteration_cap",
            Self::MalformedPlan { .. } => "malformed_plan",
            Self::CompletionFailed(_) => "completion_failed",
            Self::CatalogueUnavailable(_) => "catalogue_unavailable",
            Self::TimedOut(_) => "timed_out",
        }
    }
}

/// Everything a turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// User-visible text, in the order it was produced.
    pub responses: Vec<String>,
    /// Planning rounds that ran.
    pub rounds: usize,
    pub stop: StopReason,
    /// Every action executed across all rounds.
    pub actions: Vec<ActionRecord>,
}

impl TurnOutcome {
    /// The last user-visible text of the turn.
    pub fn final_response(&self) -> Option<&str> {
        self.responses.last().map(String::as_str)
    }
}

/// What a turn has produced so far.
///
/// Owned by the caller of the round loop, so a turn cut short by the
/// timeout still reports its earlier rounds.
#[derive(Debug, Default)]
struct TurnProgress {
    responses: Vec<String>,
    actions: Vec<ActionRecord>,
    rounds: usize,
}

/// The core agent loop that orchestrates planning and tool execution.
pub struct AgentLoop {
    /// The planner
    provider: Arc<dyn CompletionProvider>,

    /// Where tools are listed and called
    tools: Arc<dyn ToolProvider>,

    executor: PlanExecutor,

    prompt: PromptBuilder,

    /// Maximum planning rounds per turn
    max_rounds: usize,

    /// Wall-clock limit for `handle_turn_with_timeout`
    turn_timeout: Option<Duration>,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        tools: Arc<dyn ToolProvider>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            executor: PlanExecutor::new(tools.clone(), event_bus.clone()),
            provider,
            tools,
            prompt: PromptBuilder::default(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            turn_timeout: None,
            event_bus,
        }
    }

    /// Create a loop configured from the `[agent]` section.
    pub fn from_config(
        config: &AgentConfig,
        provider: Arc<dyn CompletionProvider>,
        tools: Arc<dyn ToolProvider>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let prompt = PromptBuilder::new(config.assistant_name.clone())
            .with_extra_rules(config.extra_rules.clone());
        let mut agent = Self::new(provider, tools, event_bus)
            .with_max_rounds(config.max_rounds)
            .with_prompt(prompt);
        if config.turn_timeout_secs > 0 {
            agent = agent.with_turn_timeout(Duration::from_secs(config.turn_timeout_secs));
        }
        agent
    }

    /// Set the maximum number of planning rounds. Values below 1 become 1.
    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    pub fn with_prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Run one user turn, bounded by the configured turn timeout if any.
    ///
    /// A turn that runs out of time still completes: it stops with
    /// `StopReason::TimedOut` and keeps whatever the finished rounds produced.
    pub async fn handle_turn_with_timeout(
        &self,
        session: &mut Session,
        user_input: &str,
    ) -> TurnOutcome {
        let Some(limit) = self.turn_timeout else {
            return self.handle_turn(session, user_input).await;
        };

        let mut progress = TurnProgress::default();
        let rounds = self.run_rounds(session, user_input, &mut progress);
        let run = tokio::time::timeout(limit, rounds).await;
        let stop = match run {
            Ok(stop) => stop,
            Err(_) => {
                warn!(session = %session.id, timeout_secs = limit.as_secs(), "Turn timed out");
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: "turn".into(),
                    error_message: format!("timed out after {}s", limit.as_secs()),
                    timestamp: Utc::now(),
                });
                StopReason::TimedOut(limit.as_secs())
            }
        };
        self.finish_turn(session, progress, stop)
    }

    /// Run one user turn: plan, execute, and repeat until the planner is done.
    ///
    /// Failures end the turn and are described by the outcome's stop reason;
    /// responses and actions from earlier rounds are always kept.
    pub async fn handle_turn(&self, session: &mut Session, user_input: &str) -> TurnOutcome {
        let mut progress = TurnProgress::default();
        let stop = self.run_rounds(session, user_input, &mut progress).await;
        self.finish_turn(session, progress, stop)
    }

    async fn run_rounds(
        &self,
        session: &mut Session,
        user_input: &str,
        progress: &mut TurnProgress,
    ) -> StopReason {
        let session_id = session.id.to_string();
        let mut state = LoopState::AwaitingInput;

        loop {
            state = match state {
                LoopState::AwaitingInput => LoopState::Planning { round: 1 },

                LoopState::Planning { round } if round > self.max_rounds => {
                    warn!(
                        session = %session_id,
                        max_rounds = self.max_rounds,
                        "Round cap reached with the task still open"
                    );
                    LoopState::Done(StopReason::IterationCap)
                }

                LoopState::Planning { round } => {
                    progress.rounds = round;
                    self.event_bus.publish(DomainEvent::RoundStarted {
                        session_id: session_id.clone(),
                        round,
                        timestamp: Utc::now(),
                    });

                    match self.tools.list_tools().await {
                        Ok(catalogue) => {
                            debug!(round, tools = catalogue.len(), "Fetched tool catalogue");
                            let context_json = normalizer::serialize_context(&session.context);
                            let prompt = self.prompt.build(user_input, &catalogue, &context_json);
                            self.plan_round(round, &session_id, &prompt, catalogue, progress)
                                .await
                        }
                        Err(e) => {
                            warn!(round, error = %e, "Could not fetch the tool catalogue");
                            self.event_bus.publish(DomainEvent::ErrorOccurred {
                                context: "catalogue".into(),
                                error_message: e.to_string(),
                                timestamp: Utc::now(),
                            });
                            LoopState::Done(StopReason::CatalogueUnavailable(e.to_string()))
                        }
                    }
                }

                LoopState::Executing { round, plan, catalogue } => {
                    let report = self
                        .executor
                        .execute(&plan, &mut session.context, &catalogue)
                        .await;
                    progress.actions.extend(report.actions);
                    if let Some(text) = report.response {
                        self.respond(&session_id, round, text, progress);
                    }

                    if report.done {
                        LoopState::Done(StopReason::Done)
                    } else {
                        debug!(round, "Plan not done, planning again");
                        LoopState::Planning { round: round + 1 }
                    }
                }

                LoopState::Done(reason) => return reason,
            };
        }
    }

    fn finish_turn(
        &self,
        session: &mut Session,
        progress: TurnProgress,
        stop: StopReason,
    ) -> TurnOutcome {
        session.turns += 1;
        let TurnProgress {
            responses,
            actions,
            rounds,
        } = progress;
        info!(
            session = %session.id,
            rounds,
            actions = actions.len(),
            stop = stop.label(),
            "Turn completed"
        );
        self.event_bus.publish(DomainEvent::TurnCompleted {
            session_id: session.id.to_string(),
            rounds,
            stop_reason: stop.label().into(),
            timestamp: Utc::now(),
        });

        TurnOutcome {
            responses,
            rounds,
            stop,
            actions,
        }
    }

    /// Record user-visible text and announce it on the bus.
    fn respond(&self, session_id: &str, round: usize, text: String, progress: &mut TurnProgress) {
        self.event_bus.publish(DomainEvent::ResponseProduced {
            session_id: session_id.to_string(),
            round,
            text: text.clone(),
            timestamp: Utc::now(),
        });
        progress.responses.push(text);
    }

    /// Ask the planner and decide the next state from its reply.
    async fn plan_round(
        &self,
        round: usize,
        session_id: &str,
        prompt: &str,
        catalogue: Vec<ToolDescriptor>,
        progress: &mut TurnProgress,
    ) -> LoopState {
        let raw = match self.provider.complete(prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(round, provider = self.provider.name(), error = %e, "Completion failed");
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: format!("completion:{}", self.provider.name()),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                self.respond(session_id, round, format!("[Completion error] {e}"), progress);
                return LoopState::Done(StopReason::CompletionFailed(e.to_string()));
            }
        };

        match plan::parse_plan(&raw) {
            Ok(PlannerOutput::TextOnly(text)) => {
                info!(round, "Planner replied with text only");
                if !text.is_empty() {
                    self.respond(session_id, round, text, progress);
                }
                LoopState::Done(StopReason::TextOnly)
            }
            Ok(PlannerOutput::Plan(plan)) => {
                debug!(round, actions = plan.actions.len(), done = plan.is_done(), "Plan accepted");
                self.event_bus.publish(DomainEvent::PlanAccepted {
                    session_id: session_id.to_string(),
                    round,
                    actions: plan.actions.len(),
                    done: plan.is_done(),
                    timestamp: Utc::now(),
                });
                LoopState::Executing {
                    round,
                    plan,
                    catalogue,
                }
            }
            Err(e) => {
                warn!(round, error = %e, raw = %e.raw(), "Failed to parse plan");
                self.event_bus.publish(DomainEvent::PlanRejected {
                    session_id: session_id.to_string(),
                    round,
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                let PlanError::Parse { reason, raw } = e;
                LoopState::Done(StopReason::MalformedPlan { reason, raw })
            }
        }
    }
}
