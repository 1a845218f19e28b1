//! Stdio tool server client.
//!
//! Spawns the tool server as a child process and speaks newline-delimited
//! JSON-RPC 2.0 over its stdin/stdout. The process is started lazily on
//! first use and restarted on the next call if it exits.
//!
//! Each spawn gets a generation number. A reader task only tears the
//! connection down while its generation is still current, so a reader left
//! over from a stopped process cannot kill its replacement.
//!
//! Server-initiated requests are answered too: `ping`, and
//! `sampling/createMessage` when a completion provider was supplied.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};

use huddle_core::error::ToolError;
use huddle_core::provider::CompletionProvider;
use huddle_core::result::{ContentItem, ToolResult};
use huddle_core::tool::{ToolArguments, ToolDescriptor, ToolProvider};

use crate::sampling::SamplingRequest;

const PROTOCOL_VERSION: &str = "2025-06-18";

/// How to launch the server process.
#[derive(Debug, Clone)]
pub struct StdioServerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub workdir: Option<PathBuf>,
}

impl StdioServerConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: vec![],
            env: HashMap::new(),
            workdir: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

impl From<&huddle_config::ToolServerConfig> for StdioServerConfig {
    fn from(config: &huddle_config::ToolServerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            env: config.env.clone(),
            workdir: config.workdir.clone(),
        }
    }
}

/// Transport-level failures, mapped to `ToolError` at the provider boundary.
#[derive(Debug, Clone, thiserror::Error)]
enum McpError {
    #[error("failed to spawn tool server '{command}': {reason}")]
    Spawn { command: String, reason: String },

    #[error("tool server transport error: {0}")]
    Transport(String),

    #[error("tool server returned JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("tool server terminated unexpectedly")]
    Terminated,

    #[error("tool server request cancelled")]
    Cancelled,
}

type Pending = HashMap<String, oneshot::Sender<Result<Value, McpError>>>;

/// A Tool Provider backed by a stdio tool server.
#[derive(Clone)]
pub struct McpStdioClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: StdioServerConfig,
    sampler: Option<Arc<dyn CompletionProvider>>,
    child: Mutex<Option<Child>>,
    writer: Mutex<Option<BufWriter<ChildStdin>>>,
    pending: Mutex<Pending>,
    id_counter: AtomicU64,
    generation: AtomicU64,
    instructions: Mutex<Option<String>>,
}

impl McpStdioClient {
    pub fn new(config: StdioServerConfig) -> Self {
        Self::build(config, None)
    }

    /// Answer `sampling/createMessage` requests through `provider`.
    pub fn with_sampler(config: StdioServerConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        Self::build(config, Some(provider))
    }

    fn build(config: StdioServerConfig, sampler: Option<Arc<dyn CompletionProvider>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                sampler,
                child: Mutex::new(None),
                writer: Mutex::new(None),
                pending: Mutex::new(HashMap::new()),
                id_counter: AtomicU64::new(1),
                generation: AtomicU64::new(0),
                instructions: Mutex::new(None),
            }),
        }
    }

    /// Start the server now instead of on first use.
    pub async fn connect(&self) -> Result<(), ToolError> {
        self.inner.ensure_running().await.map_err(transport)
    }

    /// Instructions the server sent during initialization, if any.
    pub async fn instructions(&self) -> Option<String> {
        self.inner.instructions.lock().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.child.lock().await.is_some()
    }

    /// Stop the server process and fail any requests still in flight.
    pub async fn shutdown(&self) {
        info!(command = %self.inner.config.command, "Shutting down tool server");
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.reset().await;
    }
}

#[async_trait]
impl ToolProvider for McpStdioClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        self.inner.ensure_running().await.map_err(transport)?;
        let result = self
            .inner
            .send_request("tools/list", json!({}))
            .await
            .map_err(|e| ToolError::CatalogueUnavailable(e.to_string()))?;
        Ok(descriptors_from_wire(&result))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: ToolArguments,
    ) -> Result<ToolResult, ToolError> {
        self.inner.ensure_running().await.map_err(transport)?;

        let params = json!({
            "name": name,
            "arguments": Value::Object(arguments),
        });
        let response = self
            .inner
            .send_request("tools/call", params)
            .await
            .map_err(|e| match e {
                McpError::Rpc { message, .. } => ToolError::InvocationFailed {
                    tool_name: name.to_string(),
                    reason: message,
                },
                other => transport(other),
            })?;

        let result = tool_result_from_wire(&response);
        if result.is_error {
            let reason = result.text_content();
            return Err(ToolError::InvocationFailed {
                tool_name: name.to_string(),
                reason: if reason.is_empty() {
                    "tool reported an error".into()
                } else {
                    reason
                },
            });
        }
        Ok(result)
    }
}

fn transport(err: McpError) -> ToolError {
    ToolError::Transport(err.to_string())
}

impl Inner {
    async fn ensure_running(self: &Arc<Self>) -> Result<(), McpError> {
        {
            let child = self.child.lock().await;
            if child.is_some() {
                return Ok(());
            }
        }

        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.workdir {
            command.current_dir(dir);
        }
        for (key, value) in &self.config.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|e| McpError::Spawn {
            command: self.config.command.clone(),
            reason: e.to_string(),
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Transport("failed to capture server stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Transport("failed to capture server stdout".into()))?;

        *self.writer.lock().await = Some(BufWriter::new(stdin));
        let generation = {
            let mut slot = self.child.lock().await;
            *slot = Some(child);
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        let reader = Arc::clone(self);
        tokio::spawn(async move {
            reader.reader_loop(stdout, generation).await;
        });

        match self.initialize().await {
            Ok(()) => {
                info!(command = %self.config.command, generation, "Tool server ready");
                Ok(())
            }
            Err(err) => {
                self.reset_if_current(generation).await;
                Err(err)
            }
        }
    }

    async fn initialize(&self) -> Result<(), McpError> {
        let mut capabilities = json!({});
        if self.sampler.is_some() {
            capabilities["sampling"] = json!({});
        }

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": capabilities,
        });
        let result = self.send_request("initialize", params).await?;
        if let Some(text) = result.get("instructions").and_then(Value::as_str) {
            *self.instructions.lock().await = Some(text.to_string());
        }
        self.send_notification("notifications/initialized", json!({}))
            .await
    }

    async fn reader_loop(self: Arc<Self>, stdout: ChildStdout, generation: u64) {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(raw)) = lines.next_line().await {
            if raw.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => self.dispatch(value).await,
                Err(err) => {
                    warn!(line = %raw, error = %err, "Tool server sent invalid JSON");
                }
            }
        }

        debug!(generation, "Tool server stdout closed");
        self.reset_if_current(generation).await;
    }

    async fn dispatch(self: &Arc<Self>, value: Value) {
        match classify(&value) {
            Inbound::Response(key) => self.handle_response(key, value).await,
            Inbound::Request(id, method) => self.handle_server_request(id, method, value),
            Inbound::Notification(method) => {
                debug!(method = %method, "Tool server notification");
            }
            Inbound::Unknown => {
                debug!("Ignoring unrecognized message from tool server");
            }
        }
    }

    async fn handle_response(&self, key: String, value: Value) {
        let responder = self.pending.lock().await.remove(&key);
        let Some(sender) = responder else {
            debug!(response_id = %key, "Response for unknown request");
            return;
        };

        let outcome = match value.get("error") {
            Some(error) => Err(McpError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
            None => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
        };
        let _ = sender.send(outcome);
    }

    fn handle_server_request(self: &Arc<Self>, id: Value, method: String, value: Value) {
        // Answered off the reader task so slow completions never stall it.
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let reply = match method.as_str() {
                "ping" => this.send_response(id, json!({})).await,
                "sampling/createMessage" => {
                    let params = value.get("params").cloned().unwrap_or(Value::Null);
                    match this.sample(&params).await {
                        Ok(result) => this.send_response(id, result).await,
                        Err(message) => {
                            this.send_error(id, json!({"code": -32603, "message": message}))
                                .await
                        }
                    }
                }
                other => {
                    warn!(method = other, "Tool server sent unsupported request");
                    let error = json!({
                        "code": -32601,
                        "message": format!("client does not implement method '{other}'"),
                    });
                    this.send_error(id, error).await
                }
            };
            if let Err(err) = reply {
                warn!(error = %err, "Failed to answer tool server request");
            }
        });
    }

    async fn sample(&self, params: &Value) -> Result<Value, String> {
        let provider = self
            .sampler
            .as_ref()
            .ok_or_else(|| "sampling is not enabled on this client".to_string())?;
        let request = SamplingRequest::from_create_message(params);
        let text = request
            .reply(provider.as_ref())
            .await
            .map_err(|e| e.to_string())?;
        Ok(json!({
            "role": "assistant",
            "content": {"type": "text", "text": text},
            "model": provider.name(),
            "stopReason": "endTurn",
        }))
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = format!("req-{}", self.id_counter.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        debug!(method, id = %id, "Sending request to tool server");
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        if let Err(err) = self.write_message(&payload).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(McpError::Cancelled),
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), McpError> {
        self.write_message(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .await
    }

    async fn send_response(&self, id: Value, result: Value) -> Result<(), McpError> {
        self.write_message(&json!({"jsonrpc": "2.0", "id": id, "result": result}))
            .await
    }

    async fn send_error(&self, id: Value, error: Value) -> Result<(), McpError> {
        self.write_message(&json!({"jsonrpc": "2.0", "id": id, "error": error}))
            .await
    }

    async fn write_message(&self, message: &Value) -> Result<(), McpError> {
        let mut encoded = message.to_string();
        encoded.push('\n');

        let mut writer = self.writer.lock().await;
        let stream = writer
            .as_mut()
            .ok_or_else(|| McpError::Transport("writer not initialised".into()))?;
        stream
            .write_all(encoded.as_bytes())
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|e| McpError::Transport(e.to_string()))
    }

    async fn reset(&self) {
        let mut child = self.child.lock().await;
        self.teardown(&mut child).await;
    }

    /// Tear down only if `generation` is still the running process.
    async fn reset_if_current(&self, generation: u64) {
        let mut child = self.child.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Ignoring exit of a replaced tool server");
            return;
        }
        self.teardown(&mut child).await;
    }

    /// Caller holds the child lock.
    async fn teardown(&self, child: &mut Option<Child>) {
        *self.writer.lock().await = None;

        if let Some(mut child) = child.take() {
            if let Err(err) = child.kill().await {
                debug!(error = %err, "Failed to kill tool server (may have already exited)");
            }
            let _ = child.wait().await;
        }

        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(McpError::Terminated));
        }
        drop(pending);

        self.instructions.lock().await.take();
    }
}

/// What a line read from the server is.
#[derive(Debug, PartialEq)]
enum Inbound {
    Response(String),
    Request(Value, String),
    Notification(String),
    Unknown,
}

fn classify(value: &Value) -> Inbound {
    let method = value.get("method").and_then(Value::as_str).map(str::to_string);
    match (value.get("id"), method) {
        (Some(id), Some(method)) => Inbound::Request(id.clone(), method),
        (Some(Value::String(id)), None) => Inbound::Response(id.clone()),
        (Some(Value::Number(id)), None) => Inbound::Response(id.to_string()),
        (None, Some(method)) => Inbound::Notification(method),
        _ => Inbound::Unknown,
    }
}

/// Map a `tools/list` result to catalogue entries.
fn descriptors_from_wire(result: &Value) -> Vec<ToolDescriptor> {
    result
        .get("tools")
        .and_then(Value::as_array)
        .map(|tools| {
            tools
                .iter()
                .filter_map(|tool| {
                    let name = tool.get("name").and_then(Value::as_str)?;
                    let description = tool
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    Some(ToolDescriptor::new(name, description))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Map a `tools/call` result to a `ToolResult`.
fn tool_result_from_wire(result: &Value) -> ToolResult {
    let mapped = match result.get("content") {
        Some(Value::Array(items)) => {
            ToolResult::items(items.iter().filter_map(content_item_from_wire).collect())
        }
        Some(item @ Value::Object(_)) => content_item_from_wire(item)
            .map(ToolResult::single)
            .unwrap_or_else(ToolResult::empty),
        _ => ToolResult::empty(),
    };
    let mapped = mapped.with_error_flag(
        result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    );
    match result.get("structuredContent") {
        Some(structured) => mapped.with_structured_content(structured.clone()),
        None => mapped,
    }
}

fn content_item_from_wire(item: &Value) -> Option<ContentItem> {
    let str_field = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).map(str::to_string);

    match item.get("type").and_then(Value::as_str)? {
        "text" => Some(ContentItem::Text {
            text: str_field(item, "text").unwrap_or_default(),
        }),
        "image" | "audio" => Some(ContentItem::Image {
            data: str_field(item, "data").unwrap_or_default(),
            mime_type: str_field(item, "mimeType").unwrap_or_default(),
        }),
        "resource" => {
            let resource = item.get("resource")?;
            Some(ContentItem::Resource {
                uri: str_field(resource, "uri").unwrap_or_default(),
                mime_type: str_field(resource, "mimeType"),
                text: str_field(resource, "text"),
            })
        }
        "resource_link" => Some(ContentItem::Resource {
            uri: str_field(item, "uri").unwrap_or_default(),
            mime_type: str_field(item, "mimeType"),
            text: None,
        }),
        other => {
            debug!(kind = other, "Skipping unsupported content item");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::result::ToolContent;

    #[test]
    fn classify_messages() {
        assert_eq!(
            classify(&json!({"jsonrpc": "2.0", "id": "req-1", "result": {}})),
            Inbound::Response("req-1".into())
        );
        assert_eq!(
            classify(&json!({"jsonrpc": "2.0", "id": 7, "result": {}})),
            Inbound::Response("7".into())
        );
        assert_eq!(
            classify(&json!({"jsonrpc": "2.0", "id": 3, "method": "ping"})),
            Inbound::Request(json!(3), "ping".into())
        );
        assert_eq!(
            classify(&json!({"jsonrpc": "2.0", "method": "notifications/tools/list_changed"})),
            Inbound::Notification("notifications/tools/list_changed".into())
        );
        assert_eq!(classify(&json!({"jsonrpc": "2.0"})), Inbound::Unknown);
    }

    #[test]
    fn catalogue_from_tools_list() {
        let result = json!({
            "tools": [
                {"name": "list_channels", "description": "List channels", "inputSchema": {}},
                {"name": "post_message"},
                {"description": "nameless"}
            ]
        });
        let catalogue = descriptors_from_wire(&result);
        assert_eq!(
            catalogue,
            vec![
                ToolDescriptor::new("list_channels", "List channels"),
                ToolDescriptor::new("post_message", ""),
            ]
        );
    }

    #[test]
    fn call_result_maps_content_items() {
        let result = json!({
            "content": [
                {"type": "text", "text": "[{\"id\":\"C1\"}]"},
                {"type": "resource", "resource": {"uri": "slack://C1", "mimeType": "application/json", "text": "{}"}},
                {"type": "mystery"}
            ],
            "structuredContent": {"result": [{"id": "C1"}]},
            "isError": false
        });
        let mapped = tool_result_from_wire(&result);
        match &mapped.content {
            ToolContent::Items(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].as_text(), Some("[{\"id\":\"C1\"}]"));
                assert_eq!(items[1].kind(), "resource");
            }
            other => panic!("expected items, got {other:?}"),
        }
        assert!(!mapped.is_error);
        assert!(mapped.structured_content.is_some());
    }

    #[test]
    fn call_result_without_content_is_empty() {
        let mapped = tool_result_from_wire(&json!({}));
        assert_eq!(mapped.content, ToolContent::Empty);
    }

    #[test]
    fn error_flag_is_read() {
        let mapped = tool_result_from_wire(&json!({
            "content": [{"type": "text", "text": "channel_not_found"}],
            "isError": true
        }));
        assert!(mapped.is_error);
        assert_eq!(mapped.text_content(), "channel_not_found");
    }

    #[test]
    fn config_conversion() {
        let config = huddle_config::ToolServerConfig::default();
        let stdio = StdioServerConfig::from(&config);
        assert_eq!(stdio.command, "python");
        assert_eq!(stdio.args, vec!["mcp_server.py"]);
    }

    #[tokio::test]
    async fn spawn_failure_is_a_transport_error() {
        let client = McpStdioClient::new(StdioServerConfig::new(
            "/nonexistent/huddle-tool-server-binary",
        ));
        let err = client.list_tools().await.unwrap_err();
        assert!(matches!(err, ToolError::Transport(_)));
        assert!(!client.is_running().await);
    }

    /// A small tool server speaking the same newline-delimited JSON-RPC.
    const SCRIPTED_SERVER: &str = r##"
import json, sys

def send(msg):
    sys.stdout.write(json.dumps(msg) + "\n")
    sys.stdout.flush()

def wait_for(request_id):
    for line in sys.stdin:
        msg = json.loads(line)
        if msg.get("id") == request_id and "method" not in msg:
            return msg
    sys.exit(0)

def text(value, is_error=False):
    return {"content": [{"type": "text", "text": value}], "isError": is_error}

TOOLS = [
    {"name": "echo", "description": "Echo the arguments", "inputSchema": {"type": "object"}},
    {"name": "broken", "description": "Always fails", "inputSchema": {"type": "object"}},
    {"name": "ping_client", "description": "Ping the client", "inputSchema": {"type": "object"}},
    {"name": "summarize", "description": "Summarize through the client", "inputSchema": {"type": "object"}},
    {"name": "crash", "description": "Exit immediately", "inputSchema": {"type": "object"}},
]

def call(params):
    name = params.get("name")
    args = params.get("arguments") or {}
    if name == "echo":
        result = text(json.dumps(args, sort_keys=True))
        result["structuredContent"] = {"echo": args}
        return result
    if name == "broken":
        return text("channel_not_found", True)
    if name == "ping_client":
        send({"jsonrpc": "2.0", "id": "srv-ping", "method": "ping"})
        reply = wait_for("srv-ping")
        return text("pong" if reply.get("result") == {} else "no pong")
    if name == "summarize":
        send({"jsonrpc": "2.0", "id": "srv-sample", "method": "sampling/createMessage", "params": {
            "messages": [{"role": "user", "content": {"type": "text", "text": "alice: release is cut"}}],
            "systemPrompt": "Summarize briefly.",
            "maxTokens": 100}})
        reply = wait_for("srv-sample")
        if "error" in reply:
            return text(reply["error"]["message"], True)
        return text(reply["result"]["content"]["text"])
    if name == "crash":
        sys.exit(0)
    return None

for line in sys.stdin:
    line = line.strip()
    if not line:
        continue
    msg = json.loads(line)
    if "id" not in msg:
        continue
    method = msg.get("method")
    if method == "initialize":
        caps = msg["params"].get("capabilities", {})
        send({"jsonrpc": "2.0", "id": msg["id"], "result": {
            "protocolVersion": msg["params"]["protocolVersion"],
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "scripted", "version": "0"},
            "instructions": "sampling" if "sampling" in caps else "plain"}})
    elif method == "tools/list":
        send({"jsonrpc": "2.0", "id": msg["id"], "result": {"tools": TOOLS}})
    elif method == "tools/call":
        result = call(msg.get("params") or {})
        if result is None:
            send({"jsonrpc": "2.0", "id": msg["id"], "error": {"code": -32602, "message": "unknown tool"}})
        else:
            send({"jsonrpc": "2.0", "id": msg["id"], "result": result})
    else:
        send({"jsonrpc": "2.0", "id": msg["id"], "error": {"code": -32601, "message": "method not found"}})
"##;

    fn python3_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn scripted_config() -> StdioServerConfig {
        StdioServerConfig::new("python3").with_args(vec![
            "-u".into(),
            "-c".into(),
            SCRIPTED_SERVER.into(),
        ])
    }

    fn args(value: Value) -> ToolArguments {
        match value {
            Value::Object(map) => map,
            _ => ToolArguments::new(),
        }
    }

    struct RecordingSampler {
        prompts: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionProvider for RecordingSampler {
        fn name(&self) -> &str {
            "recording-sampler"
        }

        async fn complete(
            &self,
            prompt: &str,
        ) -> Result<String, huddle_core::error::ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("Release is cut.".into())
        }
    }

    #[tokio::test]
    async fn handshake_and_catalogue() {
        if !python3_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let client = McpStdioClient::new(scripted_config());
        client.connect().await.unwrap();
        assert!(client.is_running().await);
        assert_eq!(client.instructions().await.as_deref(), Some("plain"));

        let catalogue = client.list_tools().await.unwrap();
        assert_eq!(catalogue.len(), 5);
        assert_eq!(catalogue[0], ToolDescriptor::new("echo", "Echo the arguments"));
        client.shutdown().await;
    }

    #[tokio::test]
    async fn tool_call_maps_content_and_structured_data() {
        if !python3_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let client = McpStdioClient::new(scripted_config());
        let result = client
            .call_tool("echo", args(json!({"channel": "general"})))
            .await
            .unwrap();
        assert_eq!(result.text_content(), r#"{"channel": "general"}"#);
        assert!(!result.is_error);
        assert_eq!(
            result.structured_content,
            Some(json!({"echo": {"channel": "general"}}))
        );
        client.shutdown().await;
    }

    #[tokio::test]
    async fn error_result_and_rpc_error_fail_the_call() {
        if !python3_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let client = McpStdioClient::new(scripted_config());

        match client.call_tool("broken", ToolArguments::new()).await {
            Err(ToolError::InvocationFailed { tool_name, reason }) => {
                assert_eq!(tool_name, "broken");
                assert_eq!(reason, "channel_not_found");
            }
            other => panic!("expected InvocationFailed, got {other:?}"),
        }
        match client.call_tool("no_such_tool", ToolArguments::new()).await {
            Err(ToolError::InvocationFailed { reason, .. }) => assert_eq!(reason, "unknown tool"),
            other => panic!("expected InvocationFailed, got {other:?}"),
        }
        client.shutdown().await;
    }

    #[tokio::test]
    async fn server_ping_is_answered() {
        if !python3_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let client = McpStdioClient::new(scripted_config());
        let result = client
            .call_tool("ping_client", ToolArguments::new())
            .await
            .unwrap();
        assert_eq!(result.text_content(), "pong");
        client.shutdown().await;
    }

    #[tokio::test]
    async fn sampling_request_is_answered_by_the_provider() {
        if !python3_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let sampler = Arc::new(RecordingSampler {
            prompts: std::sync::Mutex::new(vec![]),
        });
        let client = McpStdioClient::with_sampler(scripted_config(), sampler.clone());
        client.connect().await.unwrap();
        assert_eq!(client.instructions().await.as_deref(), Some("sampling"));

        let result = client
            .call_tool("summarize", ToolArguments::new())
            .await
            .unwrap();
        assert_eq!(result.text_content(), "Release is cut.");
        assert_eq!(
            *sampler.prompts.lock().unwrap(),
            vec!["Summarize briefly.\n\nalice: release is cut".to_string()]
        );
        client.shutdown().await;
    }

    #[tokio::test]
    async fn sampling_without_a_provider_is_refused() {
        if !python3_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let client = McpStdioClient::new(scripted_config());
        match client.call_tool("summarize", ToolArguments::new()).await {
            Err(ToolError::InvocationFailed { reason, .. }) => {
                assert!(reason.contains("sampling is not enabled"));
            }
            other => panic!("expected InvocationFailed, got {other:?}"),
        }
        client.shutdown().await;
    }

    #[tokio::test]
    async fn client_is_reusable_after_shutdown() {
        if !python3_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let client = McpStdioClient::new(scripted_config());
        for _ in 0..5 {
            let catalogue = client.list_tools().await.unwrap();
            assert_eq!(catalogue.len(), 5);
            client.shutdown().await;
            assert!(!client.is_running().await);
            // Give the old reader time to see EOF before the next spawn.
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        let result = client
            .call_tool("echo", args(json!({"n": 1})))
            .await
            .unwrap();
        assert_eq!(result.text_content(), r#"{"n": 1}"#);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn exited_server_is_restarted_on_next_call() {
        if !python3_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let client = McpStdioClient::new(scripted_config());
        let err = client
            .call_tool("crash", ToolArguments::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Transport(_)));
        assert!(!client.is_running().await);

        let catalogue = client.list_tools().await.unwrap();
        assert_eq!(catalogue.len(), 5);
        client.shutdown().await;
    }
}
