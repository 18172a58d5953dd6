//! Roster CLI - Command-line interface for the Roster daemon
//! Drives the queue.*.v1 RPC methods and renders queue snapshots

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9630";

#[derive(Parser)]
#[command(name = "roster-cli")]
#[command(about = "Roster queue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "ROSTER_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Per-call deadline in milliseconds (daemon default if omitted)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new queue
    Create {
        queue_id: String,

        /// Shown above the member list (truncated to 100 characters)
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Join the queue, or leave it if already a member
    Toggle {
        queue_id: String,

        /// Participant ID
        participant_id: i64,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        #[arg(long, default_value = "")]
        last_name: String,

        #[arg(long, default_value = "")]
        first_name: String,
    },

    /// Show the queue
    Show { queue_id: String },

    /// Fix the order and begin iterating
    Start {
        queue_id: String,

        /// Shuffle members before fixing the order
        #[arg(long)]
        shuffle: bool,
    },

    /// Move to the next participant
    Next { queue_id: String },

    /// Return to the collection phase
    Menu { queue_id: String },

    /// Delete the queue
    Finish { queue_id: String },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Member {
    position: usize,
    id: i64,
    display_name: String,
    current: bool,
}

#[derive(Debug, Deserialize)]
struct QueueView {
    queue_id: String,
    description: String,
    phase: String,
    members: Vec<Member>,
}

#[derive(Debug, Tabled)]
struct MemberRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Up")]
    marker: &'static str,
}

fn member_rows(queue: &QueueView) -> Vec<MemberRow> {
    queue
        .members
        .iter()
        .map(|m| MemberRow {
            position: m.position + 1,
            id: m.id,
            name: m.display_name.clone(),
            marker: if m.current { "▶" } else { "" },
        })
        .collect()
}

fn print_queue(queue: &QueueView) {
    let phase = match queue.phase.as_str() {
        "COLLECTING" => queue.phase.yellow(),
        "ACTIVE" => queue.phase.green(),
        _ => queue.phase.blue(),
    };

    println!("{} {} [{}]", "Queue".bold(), queue.queue_id.cyan(), phase);
    if !queue.description.is_empty() {
        println!("  {}", queue.description);
    }
    println!();

    if queue.members.is_empty() {
        println!("  {}", "No members yet".yellow());
    } else {
        println!("{}", Table::new(member_rows(queue)));
    }
}

async fn call_rpc(
    url: &str,
    method: &str,
    mut params: serde_json::Value,
    timeout_ms: Option<u64>,
) -> Result<serde_json::Value> {
    if let (Some(ms), Some(map)) = (timeout_ms, params.as_object_mut()) {
        map.insert("timeout_ms".to_string(), json!(ms));
    }

    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let url = cli.rpc_url.as_str();
    let timeout = cli.timeout_ms;

    match cli.command {
        Commands::Create {
            queue_id,
            description,
        } => {
            let params = json!({ "queue_id": queue_id, "description": description });
            let result = call_rpc(url, "queue.create.v1", params, timeout).await?;
            let queue: QueueView = serde_json::from_value(result)?;

            println!("{}", "✓ Queue created".green().bold());
            println!();
            print_queue(&queue);
        }

        Commands::Toggle {
            queue_id,
            participant_id,
            name,
            last_name,
            first_name,
        } => {
            let params = json!({
                "queue_id": queue_id,
                "participant_id": participant_id,
                "display_name": name,
                "last_name": last_name,
                "first_name": first_name,
            });
            let result = call_rpc(url, "queue.toggle.v1", params, timeout).await?;

            let outcome = result["outcome"].as_str().unwrap_or_default();
            let queue: QueueView = serde_json::from_value(result["queue"].clone())?;

            if outcome == "ADDED" {
                println!("{}", format!("✓ {} joined", participant_id).green().bold());
            } else {
                println!("{}", format!("✓ {} left", participant_id).yellow().bold());
            }
            println!();
            print_queue(&queue);
        }

        Commands::Show { queue_id } => {
            let params = json!({ "queue_id": queue_id });
            let result = call_rpc(url, "queue.get.v1", params, timeout).await?;
            let queue: QueueView = serde_json::from_value(result)?;
            print_queue(&queue);
        }

        Commands::Start { queue_id, shuffle } => {
            let params = json!({ "queue_id": queue_id, "shuffle": shuffle });
            let result = call_rpc(url, "queue.start.v1", params, timeout).await?;

            let outcome = result["outcome"].as_str().unwrap_or_default();
            let queue: QueueView = serde_json::from_value(result["queue"].clone())?;

            if outcome == "STARTED" {
                println!("{}", "✓ Queue started".green().bold());
            } else {
                println!("{}", "○ Queue was already started".yellow());
            }
            println!();
            print_queue(&queue);
        }

        Commands::Next { queue_id } => {
            let params = json!({ "queue_id": queue_id });
            let result = call_rpc(url, "queue.next.v1", params, timeout).await?;

            let queue: QueueView = serde_json::from_value(result["queue"].clone())?;
            if result["exhausted"].as_bool().unwrap_or(false) {
                println!("{}", "Everyone has been up. Use `menu` or `finish`.".blue().bold());
            } else if let Some(name) = result["current"]["display_name"].as_str() {
                println!("{} {}", "▶ Up now:".green().bold(), name.bold());
            }
            println!();
            print_queue(&queue);
        }

        Commands::Menu { queue_id } => {
            let params = json!({ "queue_id": queue_id });
            let result = call_rpc(url, "queue.menu.v1", params, timeout).await?;
            let queue: QueueView = serde_json::from_value(result)?;

            println!("{}", "✓ Back to menu".green().bold());
            println!();
            print_queue(&queue);
        }

        Commands::Finish { queue_id } => {
            let params = json!({ "queue_id": queue_id });
            call_rpc(url, "queue.finish.v1", params, timeout).await?;

            println!("{}", format!("✓ Queue {} finished", queue_id).green().bold());
        }
    }

    Ok(())
}
