use clap::{Parser, Subcommand};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "broker-cli")]
#[command(about = "Client for the correlation broker", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:9080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a request and print its correlation key
    Submit {
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Target URL the downstream call should hit
        #[arg(short, long)]
        target: String,

        /// Header as NAME=VALUE; repeatable
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },
    /// Poll the status of a correlation key once
    Status { key: String },
    /// Poll until the request completes
    Wait {
        key: String,

        #[arg(short, long, default_value_t = 1)]
        interval_secs: u64,
    },
    /// Show record counts
    Records,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Submit { method, target, headers } => {
            let mut header_set: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (name, value) in headers {
                header_set.entry(name).or_default().push(value);
            }

            let res = client
                .post(format!("{}/client/request", cli.url))
                .json(&json!({ "method": method, "url": target, "headers": header_set }))
                .send()
                .await?;

            let status = res.status();
            let text = res.text().await?;
            if status == StatusCode::ACCEPTED {
                println!("{}", text);
            } else {
                eprintln!("Error: broker returned status {}", status);
                eprintln!("Response: {}", text);
            }
        }
        Commands::Status { key } => {
            let (status, text) = poll(&client, &cli.url, &key).await?;
            print_status(status, &text)?;
        }
        Commands::Wait { key, interval_secs } => loop {
            let (status, text) = poll(&client, &cli.url, &key).await?;
            if status != StatusCode::ACCEPTED {
                print_status(status, &text)?;
                break;
            }
            tokio::time::sleep(Duration::from_secs(interval_secs)).await;
        },
        Commands::Records => {
            let res = client.get(format!("{}/admin/records", cli.url)).send().await?;
            let json: Value = res.json().await?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

async fn poll(client: &reqwest::Client, url: &str, key: &str) -> Result<(StatusCode, String), reqwest::Error> {
    let res = client
        .post(format!("{}/client/status", url))
        .json(&json!({ "request": key }))
        .send()
        .await?;
    let status = res.status();
    Ok((status, res.text().await?))
}

fn print_status(status: StatusCode, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    if status == StatusCode::OK {
        let json: Value = serde_json::from_str(text)?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{}: {}", status, text);
    }
    Ok(())
}
