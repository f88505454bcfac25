use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use url::Url;

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Command-line client for the hub bridge gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8085")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the bridge is connected to the hub
    Alive,
    /// Round-trip a ping through the hub
    Ping,
    /// Relay a generic message to the hub
    Generic {
        /// Routing path on the hub
        path: String,
        /// Message body (text)
        #[arg(short, long, default_value = "")]
        body: String,
        /// Correlation ID; generated by the bridge when omitted
        #[arg(short, long)]
        msg_id: Option<String>,
    },
    /// Delete an event on the hub
    DeleteEvent { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = Url::parse(&cli.url)?;

    let res = match cli.command {
        Commands::Alive => client.get(endpoint(&base, &["alive"])?).send().await?,
        Commands::Ping => client.get(endpoint(&base, &["ping"])?).send().await?,
        Commands::Generic { path, body, msg_id } => {
            let mut request = json!({ "path": path, "body": body });
            if let Some(msg_id) = msg_id {
                request["msgID"] = Value::String(msg_id);
            }
            client
                .post(endpoint(&base, &["generic"])?)
                .json(&request)
                .send()
                .await?
        }
        Commands::DeleteEvent { id } => {
            client
                .delete(endpoint(&base, &["events", id.as_str()])?)
                .send()
                .await?
        }
    };

    print_response(res).await
}

/// Append percent-encoded path segments to the gateway base URL.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, Box<dyn std::error::Error>> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| format!("'{}' cannot be used as a gateway URL", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("Response: {}", text);
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_to_base_path() {
        let base = Url::parse("http://localhost:8085/bridge/").unwrap();
        let url = endpoint(&base, &["alive"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8085/bridge/alive");
    }

    #[test]
    fn event_ids_stay_in_one_segment() {
        let base = Url::parse("http://localhost:8085").unwrap();
        let url = endpoint(&base, &["events", "a/b?c#d"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8085/events/a%2Fb%3Fc%23d");
        assert_eq!(url.path_segments().unwrap().count(), 2);
    }

    #[test]
    fn non_base_urls_are_rejected() {
        let base = Url::parse("mailto:someone@example.com").unwrap();
        assert!(endpoint(&base, &["ping"]).is_err());
    }
}
