//! `huddle agent`: Interactive or single-message chat mode.

use std::io::Write;
use std::sync::Arc;

use huddle_agent::{ActionOutcome, ActionRecord, AgentLoop, StopReason, TurnOutcome};
use huddle_config::AppConfig;
use huddle_core::event::EventBus;
use huddle_core::session::Session;
use huddle_core::tool::ToolProvider;
use huddle_tools::{DemoWorkspace, McpStdioClient, StdioServerConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

pub async fn run(
    message: Option<String>,
    demo: bool,
    trace_events: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Fail early with setup instructions when no key is configured
    let provider = match huddle_providers::default_from_config(&config) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!();
            eprintln!("  ERROR: {e}");
            eprintln!();
            eprintln!("  Set one of these environment variables:");
            eprintln!("    HUDDLE_API_KEY   (generic)");
            eprintln!("    GOOGLE_API_KEY   (for Gemini)");
            eprintln!("    OPENAI_API_KEY   (for OpenAI)");
            eprintln!();
            eprintln!("  Or add it to your config file:");
            eprintln!("    {}", AppConfig::config_path().display());
            eprintln!();
            return Err(e.into());
        }
    };

    let event_bus = Arc::new(EventBus::default());
    if trace_events {
        spawn_event_printer(&event_bus);
    }

    let mut server = None;
    let tools: Arc<dyn ToolProvider> = if demo {
        Arc::new(DemoWorkspace::seeded().with_sampler(provider.clone()).registry())
    } else {
        let client = McpStdioClient::with_sampler(
            StdioServerConfig::from(&config.tool_server),
            provider.clone(),
        );
        client
            .connect()
            .await
            .map_err(|e| format!("Failed to start tool server: {e}"))?;
        server = Some(client.clone());
        Arc::new(client)
    };

    let agent = AgentLoop::from_config(&config.agent, provider, tools, event_bus);
    let mut session = Session::new();

    let result = match message {
        Some(msg) => single(&agent, &mut session, &msg).await,
        None => interactive(&agent, &mut session, &config, demo).await,
    };

    if let Some(server) = server {
        server.shutdown().await;
    }
    result
}

async fn single(
    agent: &AgentLoop,
    session: &mut Session,
    message: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    eprint!("  Thinking...");
    let outcome = agent.handle_turn_with_timeout(session, message).await;
    eprint!("\r              \r");
    print_outcome(&outcome);
    Ok(())
}

async fn interactive(
    agent: &AgentLoop,
    session: &mut Session,
    config: &AppConfig,
    demo: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║         Huddle Agent — Interactive Mode      ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.model_for(&config.default_provider));
    if demo {
        println!("  Tools:     built-in demo workspace");
    } else {
        println!(
            "  Tools:     {} {}",
            config.tool_server.command,
            config.tool_server.args.join(" ")
        );
    }
    println!("  Rounds:    up to {} per message", agent.max_rounds());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        eprint!("  ...");
        let outcome = agent.handle_turn_with_timeout(session, input).await;
        eprint!("\r     \r");
        println!();
        print_outcome(&outcome);
        println!();
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}

fn print_outcome(outcome: &TurnOutcome) {
    for note in action_notes(&outcome.actions) {
        eprintln!("  {note}");
    }

    for response in &outcome.responses {
        for line in response.lines() {
            println!("  Assistant > {line}");
        }
    }

    match &outcome.stop {
        StopReason::MalformedPlan { reason, raw } => {
            eprintln!("  [Error] Failed to parse plan: {reason}");
            eprintln!("  Raw response:");
            for line in raw.lines() {
                eprintln!("    {line}");
            }
        }
        StopReason::IterationCap => {
            eprintln!(
                "  [Info] Stopped after {} rounds without the task finishing",
                outcome.rounds
            );
        }
        StopReason::CatalogueUnavailable(reason) => {
            eprintln!("  [Error] Could not list tools: {reason}");
        }
        StopReason::TimedOut(secs) => {
            eprintln!("  [Error] Turn timed out after {secs}s");
        }
        _ => {}
    }
}

/// One line per action that did not go cleanly.
fn action_notes(actions: &[ActionRecord]) -> Vec<String> {
    let mut notes = Vec::new();
    for record in actions {
        for err in &record.unresolved {
            notes.push(format!("[Warning] {}: {err}", record.tool));
        }
        match &record.outcome {
            ActionOutcome::Completed { .. } => {}
            ActionOutcome::UnknownTool => {
                notes.push(format!("[Error] Unknown tool '{}', skipped", record.tool));
            }
            ActionOutcome::Failed(err) => {
                notes.push(format!("[Error calling tool {}]: {err}", record.tool));
            }
        }
    }
    notes
}

fn spawn_event_printer(event_bus: &EventBus) {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let body = serde_json::to_string(&*event).unwrap_or_default();
                    eprintln!("  [event:{}] {body}", event.label());
                }
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("  [event] skipped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
