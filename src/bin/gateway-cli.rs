use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the vary gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway liveness
    Status,
    /// Dump circuit breaker and rate limiter state for a route
    Health {
        /// Route name, e.g. vary-character
        route: String,
    },
    /// Submit a generation request through a route
    Vary {
        route: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        num_outputs: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Health { route } => {
            let res = client.get(format!("{}/api/{}", base, route)).send().await?;
            print_response(res).await?;
        }
        Commands::Vary {
            route,
            user,
            prompt,
            image_url,
            model,
            num_outputs,
        } => {
            let mut headers = HeaderMap::new();
            headers.insert("x-user-id", HeaderValue::from_str(&user)?);

            let body = json!({
                "userId": user,
                "prompt": prompt,
                "imageUrl": image_url,
                "model": model,
                "numOutputs": num_outputs,
            });
            let res = client
                .post(format!("{}/api/{}", base, route))
                .headers(headers)
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let retry_after = res
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let text = res.text().await?;
    let pretty = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", pretty);
    } else {
        eprintln!("Error: gateway returned status {}", status);
        if let Some(secs) = retry_after {
            eprintln!("Retry after: {}s", secs);
        }
        eprintln!("{}", pretty);
    }
    Ok(())
}
