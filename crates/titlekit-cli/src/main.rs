//! TitleKit CLI - Print titles of web documents

use clap::{Parser, ValueEnum};
use futures::future::join_all;
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;
use titlekit::{FetchError, FetchOptions, TitleFetcher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One title per line
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// TitleKit - fetch and summarize web documents
#[derive(Parser, Debug)]
#[command(name = "titlekit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// URLs to fetch; read one per line from stdin if none are given
    uris: Vec<String>,

    /// Prefix each title with the requested (and final) host
    #[arg(long, short = 't')]
    hostname_tag: bool,

    /// Print descriptions of common failures instead of errors
    #[arg(long, short = 'f')]
    friendly_errors: bool,

    /// Output format
    #[arg(long, short, default_value = "text")]
    output: OutputFormat,

    /// Custom User-Agent
    #[arg(long)]
    user_agent: Option<String>,

    /// Deadline for each fetch, in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Soft redirects followed per fetch
    #[arg(long, default_value_t = titlekit::DEFAULT_MAX_SOFT_REDIRECTS)]
    max_soft_redirects: usize,
}

/// Result line for JSON output
#[derive(Debug, Serialize)]
struct FetchOutput {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl FetchOutput {
    fn new(url: String, result: Result<String, FetchError>) -> Self {
        match result {
            Ok(title) => Self {
                url,
                title: Some(title),
                error: None,
            },
            Err(e) => Self {
                url,
                title: None,
                error: Some(e.to_string()),
            },
        }
    }
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

    let uris = if cli.uris.is_empty() {
        match read_stdin_uris().await {
            Ok(uris) => uris,
            Err(e) => {
                eprintln!("Error reading stdin: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        cli.uris.clone()
    };

    let mut builder = TitleFetcher::builder()
        .max_soft_redirects(cli.max_soft_redirects)
        .timeout(Some(Duration::from_secs(cli.timeout)));
    if let Some(ua) = &cli.user_agent {
        builder = builder.user_agent(ua);
    }
    let fetcher = match builder.build() {
        Ok(fetcher) => fetcher,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let options = FetchOptions::default()
        .with_hostname_tag(cli.hostname_tag)
        .with_friendly_errors(cli.friendly_errors);

    debug!(count = uris.len(), "Fetching titles");
    let results = join_all(uris.iter().map(|uri| fetcher.fetch_title(uri, options))).await;

    let mut failed = false;
    for (uri, result) in uris.into_iter().zip(results) {
        failed |= result.is_err();
        match cli.output {
            OutputFormat::Text => match result {
                Ok(title) => writeln_safe(&title),
                Err(e) => eprintln!("Error: {}: {}", uri, e),
            },
            OutputFormat::Json => {
                let output = FetchOutput::new(uri, result);
                let json = serde_json::to_string(&output).unwrap_or_else(|e| {
                    eprintln!("Error serializing output: {}", e);
                    std::process::exit(1);
                });
                writeln_safe(&json);
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}

/// Non-blank lines of stdin, trimmed
async fn read_stdin_uris() -> io::Result<Vec<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut uris = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if let Some(uri) = parse_uri_line(&line) {
            uris.push(uri);
        }
    }
    Ok(uris)
}

fn parse_uri_line(line: &str) -> Option<String> {
    let line = line.trim();
    (!line.is_empty()).then(|| line.to_string())
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
