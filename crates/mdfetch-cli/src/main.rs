//! mdfetch CLI - fetch raw, rendered or Markdown web content

mod mcp;

use clap::{Parser, Subcommand, ValueEnum};
use mdfetch::{ContentService, FetchOptions, RenderError, Tool, UrlRequest};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Output format for content subcommands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Content only
    #[default]
    Text,
    /// JSON object with url, tool and content
    Json,
}

/// mdfetch - web content fetching for language models
#[derive(Parser, Debug)]
#[command(name = "mdfetch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(long, short, global = true, default_value = "text")]
    output: OutputFormat,

    /// Custom User-Agent for raw fetches
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Timeout per fetch or render, in seconds
    #[arg(long, global = true, default_value_t = 20)]
    timeout_secs: u64,

    /// Path to the Chrome/Chromium executable
    #[arg(long, global = true)]
    chrome: Option<PathBuf>,

    /// Show the browser window
    #[arg(long, global = true)]
    headful: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as MCP (Model Context Protocol) server over stdio
    Mcp,
    /// Fetch the body directly, without rendering
    Raw { url: String },
    /// Fetch browser-rendered HTML
    Html { url: String },
    /// Fetch the rendered page as Markdown
    Markdown { url: String },
    /// Fetch the main content of the rendered page as Markdown
    Summary { url: String },
}

#[derive(Debug, Serialize)]
struct JsonOutput<'a> {
    url: &'a str,
    tool: &'a str,
    content: &'a str,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let (tool, url) = match &cli.command {
        Some(Commands::Mcp) => {
            let server = mcp::McpServer::new(build_service(&cli, true));
            let result = mcp::run_server(&server).await;
            server.into_service().shutdown().await;
            if let Err(e) = result {
                eprintln!("Error reading stdin: {}", e);
                std::process::exit(1);
            }
            return;
        }
        Some(Commands::Raw { url }) => (Tool::RawText, url.clone()),
        Some(Commands::Html { url }) => (Tool::RenderedHtml, url.clone()),
        Some(Commands::Markdown { url }) => (Tool::Markdown, url.clone()),
        Some(Commands::Summary { url }) => (Tool::MarkdownSummary, url.clone()),
        None => {
            eprintln!("Usage: mdfetch <raw|html|markdown|summary> <URL>");
            eprintln!("   or: mdfetch mcp");
            eprintln!("   or: mdfetch --help");
            std::process::exit(1);
        }
    };

    let service = build_service(&cli, tool != Tool::RawText);
    let result = tool.execute(&service, UrlRequest::new(url.as_str())).await;
    service.shutdown().await;

    match result {
        Ok(content) => writeln_safe(&format_output(cli.output, tool, &url, &content)),
        Err(e) => {
            eprintln!("Error: {}", tool.error_message(&e));
            std::process::exit(1);
        }
    }
}

/// Build the service; the browser is only started when `rendering` is set
fn build_service(cli: &Cli, rendering: bool) -> ContentService {
    let options = FetchOptions {
        user_agent: cli.user_agent.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
        chrome_executable: cli.chrome.clone(),
        headless: !cli.headful,
        ..Default::default()
    };

    let builder = ContentService::builder().options(options);
    if rendering {
        builder.build()
    } else {
        builder
            .engine_init(|_| Err(RenderError::Launch("not requested".into())))
            .build()
    }
}

fn format_output(format: OutputFormat, tool: Tool, url: &str, content: &str) -> String {
    match format {
        OutputFormat::Text => content.to_string(),
        OutputFormat::Json => {
            let output = JsonOutput {
                url,
                tool: tool.name(),
                content,
            };
            serde_json::to_string_pretty(&output).unwrap_or_else(|e| {
                eprintln!("Error serializing response: {}", e);
                std::process::exit(1);
            })
        }
    }
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_text() {
        let output = format_output(
            OutputFormat::Text,
            Tool::Markdown,
            "https://example.com",
            "# Hello World",
        );
        assert_eq!(output, "# Hello World");
    }

    #[test]
    fn test_format_json() {
        let output = format_output(
            OutputFormat::Json,
            Tool::MarkdownSummary,
            "https://example.com/post",
            "Core text",
        );
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["url"], "https://example.com/post");
        assert_eq!(value["tool"], "get_markdown_summary");
        assert_eq!(value["content"], "Core text");
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "mdfetch",
            "summary",
            "https://example.com",
            "--timeout-secs",
            "5",
            "--headful",
            "-o",
            "json",
        ])
        .unwrap();

        assert!(matches!(&cli.command, Some(Commands::Summary { url }) if url == "https://example.com"));
        assert_eq!(cli.timeout_secs, 5);
        assert!(cli.headful);
        assert!(matches!(cli.output, OutputFormat::Json));
    }
}
