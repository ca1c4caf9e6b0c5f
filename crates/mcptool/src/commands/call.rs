//! `mcptool call` - invoke one tool.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow, bail};
use clap::Args;
use serde_json::{Map, Value};

use mcptool_mcp::{CallToolResult, invoker};

use super::Context;

/// Arguments for `mcptool call`.
#[derive(Args, Debug)]
pub struct CallArgs {
    /// Name of the tool to call
    pub tool: String,

    /// Tool arguments as a JSON object
    #[arg(short, long)]
    pub args: Option<String>,

    /// Read tool arguments (a JSON object) from a file, or `-` for stdin
    #[arg(long, value_name = "PATH")]
    pub args_file: Option<PathBuf>,

    /// Individual arguments; values are parsed as JSON when possible
    #[arg(value_name = "KEY=VALUE")]
    pub params: Vec<String>,
}

/// Run `mcptool call`.
pub async fn run(args: CallArgs, ctx: &Context) -> Result<()> {
    let file_contents = match &args.args_file {
        Some(path) => Some(read_args_file(path)?),
        None => None,
    };
    let arguments = build_arguments(file_contents.as_deref(), args.args.as_deref(), &args.params)?;
    tracing::debug!(tool = %args.tool, count = arguments.len(), "calling tool");

    let spinner = ctx.spinner(format!("Calling {}...", args.tool));
    let result = invoker::call_tool(&ctx.settings, &args.tool, arguments).await;
    spinner.finish_and_clear();
    let result = result?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result)?;
    }
    Ok(())
}

fn read_args_file(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read arguments from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read arguments file {}", path.display()))
}

/// Merge arguments: file first, then `--args`, then `KEY=VALUE` pairs.
fn build_arguments(
    file_contents: Option<&str>,
    inline: Option<&str>,
    pairs: &[String],
) -> Result<Map<String, Value>> {
    let mut arguments = Map::new();

    if let Some(contents) = file_contents.filter(|c| !c.trim().is_empty()) {
        arguments.extend(parse_object(contents, "arguments file")?);
    }
    if let Some(inline) = inline {
        arguments.extend(parse_object(inline, "--args")?);
    }
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid argument '{}': expected KEY=VALUE", pair))?;
        if key.is_empty() {
            bail!("invalid argument '{}': empty key", pair);
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        arguments.insert(key.to_string(), value);
    }

    Ok(arguments)
}

fn parse_object(text: &str, source: &str) -> Result<Map<String, Value>> {
    let value: Value =
        serde_json::from_str(text).with_context(|| format!("{} is not valid JSON", source))?;
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("{} must be a JSON object, got {}", source, type_name(&other)),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Print text blocks as-is; anything else as pretty JSON.
fn print_result(result: &CallToolResult) -> Result<()> {
    if let Some(text) = result.text() {
        println!("{}", text);
    }
    let others: Vec<&Value> = result
        .content
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) != Some("text"))
        .collect();
    if !others.is_empty() {
        println!("{}", serde_json::to_string_pretty(&others)?);
    }
    if result.content.is_empty()
        && let Some(structured) = &result.structured_content
    {
        println!("{}", serde_json::to_string_pretty(structured)?);
    }
    Ok(())
}
