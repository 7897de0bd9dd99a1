//! relay-cli — run one analysis task against the configured model chain.
//!
//! Usage:
//!   relay-cli <classify|extract_entities|summarize> <text|-> [--config <path>] [--temperature <t>]
//!
//! Reads the payload from the argument, or from stdin when the argument is
//! `-`. Configuration comes from a JSON file (`--config` or RELAY_CONFIG),
//! falling back to built-in defaults. The API key is read from
//! OPENAI_API_KEY.

use llm_relay::{translate, InvocationParams, Orchestrator, RelayConfig, Task};
use std::io::Read;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        print_usage();
        std::process::exit(1);
    }

    let task = match args[1].as_str() {
        "classify" => Task::Classify,
        "extract_entities" => Task::ExtractEntities,
        "summarize" => Task::Summarize,
        other => {
            eprintln!("Unknown task: {other}");
            print_usage();
            std::process::exit(1);
        }
    };

    let text = if args[2] == "-" {
        let mut buffer = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buffer) {
            eprintln!("Failed to read stdin: {e}");
            std::process::exit(1);
        }
        buffer
    } else {
        args[2].clone()
    };

    let config = match load_config(&args[3..]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let mut params = InvocationParams::default().with_timeout(config.request_timeout());
    if let Some(t) = flag_value(&args[3..], "--temperature").and_then(|v| v.parse().ok()) {
        params = params.with_temperature(t);
    }

    let orchestrator = match Orchestrator::from_config(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    match orchestrator.invoke(task, &text, &params).await {
        Ok(result) => {
            println!("{}", result.text);
            eprintln!(
                "[model: {} | cached: {} | attempts: {} | {}ms]",
                result.model_used,
                result.cache_hit,
                result.attempt_count,
                result.latency.as_millis()
            );
        }
        Err(e) => {
            eprintln!("{}", translate(&e));
            std::process::exit(1);
        }
    }
}

fn load_config(args: &[String]) -> Result<RelayConfig, String> {
    let path = flag_value(args, "--config").or_else(|| std::env::var("RELAY_CONFIG").ok());
    match path {
        Some(path) => RelayConfig::from_json_file(&path).map_err(|e| e.to_string()),
        None => Ok(RelayConfig::default()),
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn print_usage() {
    println!(
        r#"relay-cli — resilient LLM invocation

USAGE:
    relay-cli <TASK> <TEXT|-> [OPTIONS]

TASKS:
    classify            Classify the document
    extract_entities    Extract named entities
    summarize           Summarize the document

OPTIONS:
    --config <path>         JSON configuration file (or RELAY_CONFIG env var)
    --temperature <float>   Sampling temperature (default 0.0, cache-eligible)

ENVIRONMENT:
    OPENAI_API_KEY          Provider API key
    RELAY_CONFIG            Default configuration file path"#
    );
}
