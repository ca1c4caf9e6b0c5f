//! `mcptool list-tools` - show the tools a server exposes.

use anyhow::Result;
use clap::Args;
use console::style;

use mcptool_mcp::{ToolInfo, invoker};

use super::Context;

/// Arguments for `mcptool list-tools`.
#[derive(Args, Debug)]
pub struct ListToolsArgs {
    /// Show each tool's parameters
    #[arg(long)]
    pub full: bool,
}

/// Run `mcptool list-tools`.
pub async fn run(args: ListToolsArgs, ctx: &Context) -> Result<()> {
    let spinner = ctx.spinner("Connecting to MCP server...");
    let result = invoker::list_tools(&ctx.settings).await;
    spinner.finish_and_clear();
    let tools = result?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    if tools.is_empty() {
        println!("No tools available.");
        return Ok(());
    }

    println!("{}", style(format!("Tools ({})", tools.len())).bold());
    for tool in &tools {
        print_tool(tool, args.full || ctx.verbose);
    }
    Ok(())
}

fn print_tool(tool: &ToolInfo, full: bool) {
    match tool.description.as_deref() {
        Some(desc) if !desc.is_empty() => {
            println!("  {} - {}", style(&tool.name).cyan(), first_line(desc));
        }
        _ => println!("  {}", style(&tool.name).cyan()),
    }

    if !full {
        return;
    }

    let Some(schema) = tool.input_schema.as_ref().filter(|s| !s.properties.is_empty()) else {
        println!("      (no parameters)");
        return;
    };
    for (name, property) in &schema.properties {
        let marker = if schema.is_required(name) {
            style(" (required)").yellow().to_string()
        } else {
            String::new()
        };
        let description = property
            .description
            .as_deref()
            .map(|d| format!(" - {}", first_line(d)))
            .unwrap_or_default();
        println!(
            "      {}: {}{}{}",
            name,
            style(property.type_name()).dim(),
            marker,
            description
        );
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}
