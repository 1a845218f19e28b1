//! The planning loop: the heart of Huddle.
//!
//! Each user turn follows a **Plan → Execute** cycle:
//!
//! 1. **Fetch** the tool catalogue from the Tool Provider
//! 2. **Prompt** the planner with the request, the catalogue and the working context
//! 3. **Parse** the reply into a plan (or accept plain prose as the answer)
//! 4. **Execute** the plan's actions in order, resolving `$`-references and
//!    saving normalized results into the context
//! 5. **Repeat** while the plan says it is not done, up to the round cap

pub mod executor;
pub mod loop_runner;
pub mod normalizer;
pub mod plan;
pub mod prompt;
pub mod resolver;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use executor::{ActionOutcome, ActionRecord, ExecutionReport, PlanExecutor};
pub use loop_runner::{AgentLoop, LoopState, StopReason, TurnOutcome};
pub use plan::{Action, Plan, PlannerOutput, parse_plan};
pub use prompt::PromptBuilder;
