//! Demo workspace: in-process stub tools with canned workspace data.
//!
//! In production the tools live in the stdio tool server. These stubs
//! mirror its catalogue against an in-memory workspace so the planning
//! loop can be driven end-to-end without network access or tokens.
//!
//! `summarize_channel` answers through a completion provider when one is
//! attached, the way the server samples through the client; otherwise it
//! returns the raw sampling payload.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt;
use std::sync::{Arc, Mutex};

use huddle_core::error::ToolError;
use huddle_core::provider::CompletionProvider;
use huddle_core::result::ToolResult;
use huddle_core::tool::{Tool, ToolArguments, ToolRegistry};

use crate::sampling::SamplingRequest;

const SUMMARIZE_INSTRUCTIONS: &str = "Summarize the following channel messages concisely.";

#[derive(Debug, Clone)]
struct Channel {
    id: String,
    name: String,
    messages: Vec<Message>,
}

#[derive(Debug, Clone)]
struct Message {
    user: String,
    text: String,
    ts: String,
    thread_ts: Option<String>,
}

/// Shared in-memory workspace state.
#[derive(Clone)]
pub struct DemoWorkspace {
    channels: Arc<Mutex<Vec<Channel>>>,
    sampler: Option<Arc<dyn CompletionProvider>>,
}

impl fmt::Debug for DemoWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemoWorkspace")
            .field("channels", &self.channels)
            .field("sampler", &self.sampler.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

impl DemoWorkspace {
    /// A workspace seeded with a couple of channels and messages.
    pub fn seeded() -> Self {
        let msg = |user: &str, text: &str, ts: &str| Message {
            user: user.into(),
            text: text.into(),
            ts: ts.into(),
            thread_ts: None,
        };

        let channels = vec![
            Channel {
                id: "C0001".into(),
                name: "general".into(),
                messages: vec![
                    msg("alice", "Welcome to the workspace!", "1700000000.000100"),
                    msg("bob", "TODO: update the onboarding doc", "1700000050.000200"),
                ],
            },
            Channel {
                id: "C0002".into(),
                name: "releases".into(),
                messages: vec![
                    msg("carol", "Release 1.4 is cut, please test", "1700000100.000300"),
                    msg("dave", "Action item: finalize the testing schedule", "1700000200.000400"),
                    msg("alice", "Deployment failure on staging, investigating", "1700000300.000500"),
                ],
            },
        ];

        Self {
            channels: Arc::new(Mutex::new(channels)),
            sampler: None,
        }
    }

    /// Answer `summarize_channel` through `provider`.
    pub fn with_sampler(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.sampler = Some(provider);
        self
    }

    /// Register every demo tool against this workspace.
    pub fn registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for op in [
            Operation::ListChannels,
            Operation::GetChannelMessages,
            Operation::PostMessage,
            Operation::SearchMessages,
            Operation::SummarizeChannel,
            Operation::ExtractActionItems,
        ] {
            registry.register(Box::new(DemoTool {
                op,
                workspace: self.clone(),
            }));
        }
        registry
    }

    /// Messages currently stored in a channel (by name or id).
    pub fn messages_in(&self, channel: &str) -> Vec<String> {
        self.with_channels(|channels| {
            find_channel(channels, channel)
                .map(|c| c.messages.iter().map(|m| m.text.clone()).collect())
                .unwrap_or_default()
        })
    }

    fn with_channels<R>(&self, f: impl FnOnce(&mut Vec<Channel>) -> R) -> R {
        let mut guard = match self.channels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl Default for DemoWorkspace {
    fn default() -> Self {
        Self::seeded()
    }
}

fn find_channel<'a>(channels: &'a mut [Channel], key: &str) -> Option<&'a mut Channel> {
    let key = key.trim_start_matches('#');
    channels.iter_mut().find(|c| c.name == key || c.id == key)
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    ListChannels,
    GetChannelMessages,
    PostMessage,
    SearchMessages,
    SummarizeChannel,
    ExtractActionItems,
}

struct DemoTool {
    op: Operation,
    workspace: DemoWorkspace,
}

fn required_str<'a>(args: &'a ToolArguments, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

fn limit_arg(args: &ToolArguments, default: usize) -> usize {
    args.get("limit")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(default)
}

fn message_json(m: &Message) -> Value {
    json!({"user": m.user, "text": m.text, "ts": m.ts, "thread_ts": m.thread_ts})
}

fn is_action_item(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["todo", "action item", "please", "need to", "follow up"]
        .iter()
        .any(|kw| lower.contains(kw))
}

#[async_trait]
impl Tool for DemoTool {
    fn name(&self) -> &str {
        match self.op {
            Operation::ListChannels => "list_channels",
            Operation::GetChannelMessages => "get_channel_messages",
            Operation::PostMessage => "post_message",
            Operation::SearchMessages => "search_messages",
            Operation::SummarizeChannel => "summarize_channel",
            Operation::ExtractActionItems => "extract_action_items",
        }
    }

    fn description(&self) -> &str {
        match self.op {
            Operation::ListChannels => "List all public channels with their IDs and names",
            Operation::GetChannelMessages => {
                "Fetch recent messages from a channel (args: channel, limit)"
            }
            Operation::PostMessage => {
                "Post a message to a channel, optionally as a thread reply (args: channel, text, thread_ts)"
            }
            Operation::SearchMessages => "Search messages across channels (args: query, limit)",
            Operation::SummarizeChannel => {
                "Gather recent messages from a channel for the client to summarize (args: channel, limit)"
            }
            Operation::ExtractActionItems => {
                "Extract actionable items from a channel (args: channel, limit)"
            }
        }
    }

    async fn execute(&self, args: ToolArguments) -> Result<ToolResult, ToolError> {
        let value = match self.op {
            Operation::ListChannels => self.workspace.with_channels(|channels| {
                Value::Array(
                    channels
                        .iter()
                        .map(|c| json!({"id": c.id, "name": c.name}))
                        .collect(),
                )
            }),

            Operation::GetChannelMessages => {
                let channel = required_str(&args, "channel")?;
                let limit = limit_arg(&args, 20);
                self.workspace.with_channels(|channels| {
                    let found = find_channel(channels, channel)
                        .ok_or_else(|| self.failed(format!("channel_not_found: {channel}")))?;
                    let start = found.messages.len().saturating_sub(limit);
                    Ok::<_, ToolError>(Value::Array(
                        found.messages[start..].iter().map(message_json).collect(),
                    ))
                })?
            }

            Operation::PostMessage => {
                let channel = required_str(&args, "channel")?;
                let text = required_str(&args, "text")?;
                let thread_ts = args
                    .get("thread_ts")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                self.workspace.with_channels(|channels| {
                    let found = find_channel(channels, channel)
                        .ok_or_else(|| self.failed(format!("channel_not_found: {channel}")))?;
                    let ts = format!("{}.{:06}", 1_700_001_000 + found.messages.len(), 1);
                    found.messages.push(Message {
                        user: "huddle".into(),
                        text: text.into(),
                        ts: ts.clone(),
                        thread_ts,
                    });
                    Ok::<_, ToolError>(json!({"ok": true, "channel": found.id, "ts": ts}))
                })?
            }

            Operation::SearchMessages => {
                let query = required_str(&args, "query")?.to_lowercase();
                let limit = limit_arg(&args, 20);
                self.workspace.with_channels(|channels| {
                    let matches: Vec<Value> = channels
                        .iter()
                        .flat_map(|c| {
                            c.messages
                                .iter()
                                .filter(|m| m.text.to_lowercase().contains(&query))
                                .map(|m| {
                                    let mut v = message_json(m);
                                    v["channel"] = json!(c.name);
                                    v
                                })
                        })
                        .take(limit)
                        .collect();
                    Value::Array(matches)
                })
            }

            Operation::SummarizeChannel => {
                let channel = required_str(&args, "channel")?;
                let limit = limit_arg(&args, 50);
                let lines = self.workspace.with_channels(|channels| {
                    find_channel(channels, channel)
                        .map(|c| {
                            let start = c.messages.len().saturating_sub(limit);
                            c.messages[start..]
                                .iter()
                                .map(|m| format!("{}: {}", m.user, m.text))
                                .collect::<Vec<_>>()
                        })
                        .unwrap_or_default()
                });
                let request = SamplingRequest::new(lines, SUMMARIZE_INSTRUCTIONS);
                match &self.workspace.sampler {
                    Some(provider) => {
                        let summary = request.reply(&**provider).await?;
                        return Ok(ToolResult::text(summary));
                    }
                    None => serde_json::to_value(&request)
                        .map_err(|e| self.failed(e.to_string()))?,
                }
            }

            Operation::ExtractActionItems => {
                let channel = required_str(&args, "channel")?;
                let limit = limit_arg(&args, 50);
                self.workspace.with_channels(|channels| {
                    let items: Vec<Value> = find_channel(channels, channel)
                        .map(|c| {
                            let start = c.messages.len().saturating_sub(limit);
                            c.messages[start..]
                                .iter()
                                .filter(|m| is_action_item(&m.text))
                                .map(|m| json!({"user": m.user, "text": m.text, "ts": m.ts}))
                                .collect()
                        })
                        .unwrap_or_default();
                    if items.is_empty() {
                        json!({"status": "empty", "message": "No messages to analyze"})
                    } else {
                        json!({"channel": channel, "action_items": items})
                    }
                })
            }
        };

        Ok(ToolResult::json(&value))
    }
}

impl DemoTool {
    fn failed(&self, reason: String) -> ToolError {
        ToolError::InvocationFailed {
            tool_name: self.name().to_string(),
            reason,
        }
    }
}
