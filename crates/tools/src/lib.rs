//! Tool Provider implementations for Huddle.
//!
//! The planning loop talks to tools through `huddle_core::ToolProvider`.
//! Two implementations live here: a client for the stdio tool server, and
//! an in-process demo workspace built on `ToolRegistry` for offline runs.
//! Sampling replies (the server asking the client for a completion) are
//! handled by [`sampling`].

pub mod demo;
pub mod mcp_stdio;
pub mod sampling;

pub use demo::DemoWorkspace;
pub use mcp_stdio::{McpStdioClient, StdioServerConfig};
pub use sampling::{SamplingError, SamplingRequest};
