//! Domain event system: decoupled observation of the planning loop.
//!
//! The loop publishes an event whenever something interesting happens in a
//! turn. Subscribers (the CLI trace printer, tests) react without the loop
//! knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A planning round began
    RoundStarted {
        session_id: String,
        round: usize,
        timestamp: DateTime<Utc>,
    },

    /// The planner produced a plan and it was accepted
    PlanAccepted {
        session_id: String,
        round: usize,
        actions: usize,
        done: bool,
        timestamp: DateTime<Utc>,
    },

    /// The planner's output could not be turned into a plan
    PlanRejected {
        session_id: String,
        round: usize,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// User-visible text was produced, ahead of the turn finishing
    ResponseProduced {
        session_id: String,
        round: usize,
        text: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        saved_as: Option<String>,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A `$`-reference in an action's arguments failed to resolve
    ReferenceUnresolved {
        tool_name: String,
        reference: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A turn finished
    TurnCompleted {
        session_id: String,
        rounds: usize,
        stop_reason: String,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Short human-readable label used by trace output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::RoundStarted { .. } => "round_started",
            Self::PlanAccepted { .. } => "plan_accepted",
            Self::PlanRejected { .. } => "plan_rejected",
            Self::ResponseProduced { .. } => "response_produced",
            Self::ToolExecuted { .. } => "tool_executed",
            Self::ReferenceUnresolved { .. } => "reference_unresolved",
            Self::TurnCompleted { .. } => "turn_completed",
            Self::ErrorOccurred { .. } => "error",
        }
    }
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Components can subscribe to receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
