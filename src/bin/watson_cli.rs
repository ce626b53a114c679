//! watson-cli: run Compare & Comply calls from the command line
//!
//! Usage:
//!   watson-cli [--config <path>] html <file>...     Convert documents to HTML
//!   watson-cli [--config <path>] classify <file>... Classify document elements
//!   watson-cli [--config <path>] tables <file>...   Extract tables
//!   watson-cli [--config <path>] feedback list      List classification feedback
//!   watson-cli [--config <path>] batches list       List batch jobs

use anyhow::{anyhow, bail, Context};
use futures::future::join_all;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;
use watson_sdk::service::compare_comply::{
    CompareComplyService, ListFeedbackOptions, SortField,
};
use watson_sdk::service::{reply_channel, FileUpload, ServiceReply};
use watson_sdk::{Config, CustomData};

const DEFAULT_VERSION_DATE: &str = "2018-10-15";

struct Options {
    config: PathBuf,
    version_date: String,
    command: Vec<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = match parse_args(&args) {
        Ok(Some(o)) => o,
        Ok(None) => {
            print_usage();
            return;
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(e) = run(opts).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"watson-cli: Compare & Comply command-line driver

USAGE:
    watson-cli [--config <path>] [--version-date <yyyy-mm-dd>] <COMMAND>

COMMANDS:
    html <file>...      Convert documents to HTML
    classify <file>...  Classify the elements of documents
    tables <file>...    Extract tables from documents
    feedback list       List classification feedback (newest first)
    batches list        List batch jobs
    version             Show version information
    help                Show this help message

ENVIRONMENT:
    WATSON_CONFIG                   Config file path (default: watson-config.json)
    WATSON_TIMEOUT_SECS             Request timeout override
    WATSON_MAX_REST_CONNECTIONS     Concurrency ceiling override
    RUST_LOG                        Log filter (default: warn)"#
    );
}

fn parse_args(args: &[String]) -> anyhow::Result<Option<Options>> {
    let mut config = std::env::var("WATSON_CONFIG").ok().map(PathBuf::from);
    let mut version_date = DEFAULT_VERSION_DATE.to_string();
    let mut command = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                config = Some(PathBuf::from(path));
            }
            "--version-date" => {
                version_date = iter
                    .next()
                    .ok_or_else(|| anyhow!("--version-date needs a value"))?
                    .clone();
            }
            "help" | "--help" | "-h" => return Ok(None),
            "version" | "--version" | "-V" => {
                println!("watson-cli {} ({})", env!("CARGO_PKG_VERSION"), watson_sdk::USER_AGENT);
                std::process::exit(0);
            }
            _ => command.push(arg.clone()),
        }
    }
    if command.is_empty() {
        return Ok(None);
    }
    Ok(Some(Options {
        config: config.unwrap_or_else(|| PathBuf::from("watson-config.json")),
        version_date,
        command,
    }))
}

async fn run(opts: Options) -> anyhow::Result<()> {
    let config = Config::load(&opts.config)
        .with_context(|| format!("loading {}", opts.config.display()))?;
    let ctx = config.client_context()?;
    let service = CompareComplyService::from_config(&config, &ctx, opts.version_date)?;

    let words: Vec<&str> = opts.command.iter().map(String::as_str).collect();
    match words.as_slice() {
        ["html", paths @ ..] if !paths.is_empty() => {
            let mut replies = Vec::new();
            for path in paths {
                let (cb, rx) = reply_channel();
                service.convert_to_html(upload(path).await?, None, CustomData::new(), cb)?;
                replies.push(rx);
            }
            print_replies(replies).await
        }
        ["classify", paths @ ..] if !paths.is_empty() => {
            let mut replies = Vec::new();
            for path in paths {
                let (cb, rx) = reply_channel();
                service.classify_elements(upload(path).await?, None, CustomData::new(), cb)?;
                replies.push(rx);
            }
            print_replies(replies).await
        }
        ["tables", paths @ ..] if !paths.is_empty() => {
            let mut replies = Vec::new();
            for path in paths {
                let (cb, rx) = reply_channel();
                service.extract_tables(upload(path).await?, None, CustomData::new(), cb)?;
                replies.push(rx);
            }
            print_replies(replies).await
        }
        ["feedback", "list"] => {
            let (cb, rx) = reply_channel();
            let options = ListFeedbackOptions::new()
                .page_limit(10)
                .sort_by(SortField::desc("created"));
            service.list_feedback(options, CustomData::new(), cb)?;
            print_replies(vec![rx]).await
        }
        ["batches", "list"] => {
            let (cb, rx) = reply_channel();
            service.list_batches(CustomData::new(), cb)?;
            print_replies(vec![rx]).await
        }
        other => bail!("unknown command: {}", other.join(" ")),
    }
}

async fn upload(path: &str) -> anyhow::Result<FileUpload> {
    FileUpload::from_path(path)
        .await
        .with_context(|| format!("reading {path}"))
}

/// Every call is already in flight; wait for all of them, then print in order.
async fn print_replies<T: Serialize>(
    replies: Vec<oneshot::Receiver<ServiceReply<T>>>,
) -> anyhow::Result<()> {
    let mut failed = 0usize;
    for reply in join_all(replies).await {
        let reply = reply.context("call completed without a reply")?;
        if let Some(raw) = reply.custom_data.raw_json.as_deref() {
            tracing::debug!(bytes = raw.len(), "raw response received");
        }
        let status = reply.response.status_code;
        match reply.into_result() {
            Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            Err(e) => {
                eprintln!("request failed (HTTP status {status}): {e}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} request(s) failed");
    }
    Ok(())
}
