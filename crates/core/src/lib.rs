//! # Huddle Core
//!
//! Domain types, traits, and error definitions for the Huddle planning agent.
//! This crate has **no I/O of its own**: it defines the domain model that the
//! provider, tool and agent crates implement against.
//!
//! The two seams are [`CompletionProvider`] (the planner's language model)
//! and [`ToolProvider`] (the tool catalogue and its executor). Everything the
//! loop remembers between rounds lives in a [`WorkingContext`].

pub mod context;
pub mod error;
pub mod event;
pub mod provider;
pub mod result;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use context::{ContextValue, WorkingContext, data_key};
pub use error::{Error, PlanError, ProviderError, ReferenceError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use provider::CompletionProvider;
pub use result::{ContentItem, ToolContent, ToolResult};
pub use session::{Session, SessionId};
pub use tool::{Tool, ToolArguments, ToolDescriptor, ToolProvider, ToolRegistry};
