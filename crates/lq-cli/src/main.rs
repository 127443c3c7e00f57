//! # lq-cli — LOGQ from the terminal
//!
//! - `lq ingest <json>` / `lq ingest --file <path>` — Send records to the hub.
//! - `lq query <json>` — Run a query on the hub.
//! - `lq validate <json>` — Check a query without running it.
//! - `lq status` — Hub status.
//! - `lq scan --journal <path> <json>` — Run a query against a local journal.
//! - `lq hub` — Launch the hub.
//!
//! The hub address comes from `LQ_BASE_URL` (default `http://127.0.0.1:3000`).

use std::path::{Path, PathBuf};
use std::process::Command;

use clap::{Parser, Subcommand};
use serde_json::Value;

use lq_core::{Query, QueryResult};
use lq_io::Journal;

mod render;

use render::QueryOutput;

/// LOGQ: structured log ingestion and querying.
#[derive(Parser)]
#[command(name = "lq", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one record, or a list of records, to the hub.
    Ingest {
        /// A JSON map or list of maps.
        records: Option<String>,

        /// Read records from a file with one JSON map per line.
        #[arg(long, conflicts_with = "records")]
        file: Option<PathBuf>,
    },

    /// Run a query on the hub.
    Query {
        /// The query as JSON.
        query: String,

        /// Print the raw response instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Validate a query without running it.
    Validate { query: String },

    /// Report hub status.
    Status,

    /// Run a query directly against a journal file.
    Scan {
        /// Path to the journal file.
        #[arg(long, default_value = "logs.journal")]
        journal: PathBuf,

        /// The query as JSON.
        query: String,

        /// Print the raw result instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Launch the hub.
    Hub {
        /// Path to the journal file.
        #[arg(long, default_value = "logs.journal")]
        journal: PathBuf,

        /// Keep records in memory only.
        #[arg(long)]
        memory: bool,

        /// Server bind address.
        #[arg(long, default_value = "127.0.0.1:3000")]
        bind: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            journal,
            query,
            json,
        } => {
            let raw = parse_json_arg(&query);
            match scan_journal(&journal, &raw) {
                Ok(result) if json => match serde_json::to_value(&result) {
                    Ok(value) => print_json(&value),
                    Err(e) => fail(&e.to_string()),
                },
                Ok(result) => println!("{}", render::summary(&result.into())),
                Err(e) => fail(&e),
            }
        }

        Commands::Hub {
            journal,
            memory,
            bind,
        } => {
            eprintln!("LOGQ: Launching hub...");
            eprintln!("   Bind:    {}", bind);
            if memory {
                eprintln!("   Store:   memory");
            } else {
                eprintln!("   Journal: {}", journal.display());
            }
            eprintln!();

            let journal = journal.display().to_string();
            let mut args = vec!["run", "-p", "lq-hub", "--", "--bind", &bind];
            if memory {
                args.push("--memory");
            } else {
                args.extend(["--journal", journal.as_str()]);
            }

            match Command::new("cargo").args(&args).status() {
                Ok(s) if s.success() => {}
                Ok(s) => fail(&format!("Hub exited with: {}", s)),
                Err(e) => fail(&format!("Failed to launch hub: {}", e)),
            }
        }

        // Async Commands
        cmd => {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => fail(&format!("Failed to build tokio runtime: {}", e)),
            };

            rt.block_on(async_main(cmd));
        }
    }
}

async fn async_main(cmd: Commands) {
    let client = reqwest::Client::new();
    let base_url =
        std::env::var("LQ_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

    match cmd {
        Commands::Ingest { records, file } => {
            let payload = match (records, file) {
                (Some(records), None) => parse_json_arg(&records),
                (None, Some(path)) => read_json_lines(&path),
                _ => fail("Pass records as an argument or with --file"),
            };

            let url = format!("{}/api/logs", base_url);
            let body = send(post_request(&client, &url, &payload).await).await;
            println!("Ingested {} records", body["count"]);
        }

        Commands::Query { query, json } => {
            let url = format!("{}/api/logs/query", base_url);
            let body = send(post_request(&client, &url, &parse_json_arg(&query)).await).await;
            if json {
                print_json(&body);
            } else {
                match serde_json::from_value::<QueryOutput>(body) {
                    Ok(output) => println!("{}", render::summary(&output)),
                    Err(e) => fail(&format!("Unexpected response: {}", e)),
                }
            }
        }

        Commands::Validate { query } => {
            let url = format!("{}/api/logs/query/validate", base_url);
            let body = send(post_request(&client, &url, &parse_json_arg(&query)).await).await;
            if body["valid"] == true {
                println!("Query is valid");
            } else {
                for issue in body["errors"].as_array().into_iter().flatten() {
                    println!(
                        "{}: {}",
                        issue["path"].as_str().unwrap_or("$"),
                        issue["message"].as_str().unwrap_or_default()
                    );
                }
                std::process::exit(1);
            }
        }

        Commands::Status => {
            let url = format!("{}/api/status", base_url);
            let body = send(get_request(&client, &url).await).await;
            print_json(&body);
        }

        // Run synchronously in main().
        Commands::Scan { .. } | Commands::Hub { .. } => {}
    }
}

/// Run a query over a journal file without opening it for writing. The
/// query is validated before the file is read.
fn scan_journal(path: &Path, raw: &Value) -> Result<QueryResult, String> {
    let query = Query::parse(raw).map_err(|e| e.to_string())?;
    let records = Journal::read_file(path)
        .map_err(|e| format!("Failed to read journal {}: {}", path.display(), e))?;
    Ok(lq_core::run(&query, &records))
}

async fn get_request(
    client: &reqwest::Client,
    url: &str,
) -> Result<reqwest::Response, reqwest::Error> {
    client.get(url).send().await
}

async fn post_request(
    client: &reqwest::Client,
    url: &str,
    json: &Value,
) -> Result<reqwest::Response, reqwest::Error> {
    client.post(url).json(json).send().await
}

/// Unwrap a hub response into its JSON body, exiting on failure.
async fn send(resp: Result<reqwest::Response, reqwest::Error>) -> Value {
    let resp = match resp {
        Ok(resp) => resp,
        Err(e) => fail(&format!("Error: {}", e)),
    };
    let status = resp.status();
    let body = match resp.json::<Value>().await {
        Ok(body) => body,
        Err(e) => fail(&format!("Error: {} ({})", e, status)),
    };

    if !status.is_success() {
        eprintln!("Error: {}", body["error"].as_str().unwrap_or(status.as_str()));
        for issue in body["errors"].as_array().into_iter().flatten() {
            eprintln!(
                "   {}: {}",
                issue["path"].as_str().unwrap_or("$"),
                issue["message"].as_str().unwrap_or_default()
            );
        }
        std::process::exit(1);
    }
    body
}

fn parse_json_arg(raw: &str) -> Value {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => fail(&format!("Invalid JSON: {}", e)),
    }
}

/// One record per non-blank line.
fn read_json_lines(path: &Path) -> Value {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => fail(&format!("Failed to read {}: {}", path.display(), e)),
    };
    match parse_json_lines(&content) {
        Ok(records) => Value::Array(records),
        Err((line, e)) => fail(&format!("{}:{}: {}", path.display(), line, e)),
    }
}

fn parse_json_lines(content: &str) -> Result<Vec<Value>, (usize, serde_json::Error)> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| serde_json::from_str(line).map_err(|e| (i + 1, e)))
        .collect()
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => fail(&e.to_string()),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_json_lines_skips_blanks() {
        let records = parse_json_lines("{\"n\": 1}\n\n  \n{\"n\": 2}\n").unwrap();
        assert_eq!(records, vec![json!({"n": 1}), json!({"n": 2})]);

        let (line, _) = parse_json_lines("{\"n\": 1}\n{oops}\n").unwrap_err();
        assert_eq!(line, 2);
    }

    #[test]
    fn test_scan_args() {
        let cli = Cli::try_parse_from(["lq", "scan", "--journal", "a.journal", "{}", "--json"])
            .unwrap();
        match cli.command {
            Commands::Scan { journal, query, json } => {
                assert_eq!(journal, PathBuf::from("a.journal"));
                assert_eq!(query, "{}");
                assert!(json);
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_local_scan_renders_journal_results() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs.journal");
        let journal = Journal::open(&path).unwrap();
        for (level, service) in [("error", "auth"), ("info", "db"), ("error", "db")] {
            journal
                .write_record(json!({"level": level, "service": service}).as_object().unwrap())
                .unwrap();
        }

        let raw = json!({"where": {"field": "level", "operator": "eq", "value": "error"},
                         "find": ["service"]});
        let result = scan_journal(&path, &raw).unwrap();
        let rendered = render::summary(&result.into());
        assert!(rendered.contains("auth"));
        assert!(rendered.ends_with("2 entries (2 records matched)"));
    }

    #[test]
    fn test_scan_of_missing_journal_fails_without_creating_it() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("typo.journal");

        let err = scan_journal(&path, &json!({})).unwrap_err();
        assert!(err.contains("typo.journal"));
        assert!(!path.exists());

        let err = scan_journal(&path, &json!({"limit": -1})).unwrap_err();
        assert!(err.starts_with("invalid query"));
    }
}
