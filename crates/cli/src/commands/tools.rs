//! `huddle tools`: Print the catalogue the planner will see.

use huddle_config::AppConfig;
use huddle_core::tool::{ToolDescriptor, ToolProvider};
use huddle_tools::{DemoWorkspace, McpStdioClient, StdioServerConfig};

pub async fn run(demo: bool) -> Result<(), Box<dyn std::error::Error>> {
    let catalogue = if demo {
        println!("🧰 Demo workspace tools");
        DemoWorkspace::seeded().registry().list_tools().await?
    } else {
        let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
        let client = McpStdioClient::new(StdioServerConfig::from(&config.tool_server));
        println!(
            "🧰 Tools from `{} {}`",
            config.tool_server.command,
            config.tool_server.args.join(" ")
        );
        let listed = client.list_tools().await;
        if let Some(instructions) = client.instructions().await {
            println!("   {instructions}");
        }
        client.shutdown().await;
        listed?
    };

    println!("==========================");
    print!("{}", render(&catalogue));
    Ok(())
}

fn render(catalogue: &[ToolDescriptor]) -> String {
    if catalogue.is_empty() {
        return "  (no tools)\n".into();
    }
    let width = catalogue.iter().map(|d| d.name.len()).max().unwrap_or(0);
    catalogue
        .iter()
        .map(|d| {
            let summary = d.description.lines().next().unwrap_or("");
            format!("  {:<width$}  {summary}\n", d.name)
        })
        .collect()
}
