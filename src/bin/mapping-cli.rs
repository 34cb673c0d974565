use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use geo_rewrite::config::{load_config, GeoRewriteConfig};
use geo_rewrite::mapping::{
    encode_mapping, parse_mapping, CountryMapping, MappingSource, RemoteMappingSource,
};

#[derive(Parser)]
#[command(name = "mapping-cli")]
#[command(about = "Inspect and author the country landing page mapping", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the mapping from the configured content endpoint
    Fetch {
        /// Config file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Decode a serialized mapping payload
    Decode { payload: String },
    /// Encode COUNTRY=/path pairs into a mapping payload
    Encode {
        #[arg(required = true)]
        pairs: Vec<String>,
    },
    /// Show the mapping cached by a running proxy
    Status {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,

        #[arg(short, long, default_value = "admin-secret-key")]
        key: String,

        /// Force the proxy to refetch first
        #[arg(long)]
        refresh: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { config } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => GeoRewriteConfig::default(),
            };
            let source = RemoteMappingSource::new(&config.mapping_source)?;
            let mapping = source.fetch_mapping().await?;
            print_mapping(&mapping);
        }
        Commands::Decode { payload } => {
            print_mapping(&parse_mapping(&payload)?);
        }
        Commands::Encode { pairs } => {
            let mut entries = Vec::with_capacity(pairs.len());
            for pair in &pairs {
                let (country, path) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("expected COUNTRY=/path, got '{pair}'"))?;
                if !path.starts_with('/') {
                    return Err(format!("path for '{country}' must start with '/'").into());
                }
                entries.push((country.to_string(), path.to_string()));
            }
            let mapping: CountryMapping = entries.into_iter().collect();
            println!("{}", encode_mapping(&mapping));
        }
        Commands::Status { url, key, refresh } => {
            let client = reqwest::Client::new();
            let mut headers = HeaderMap::new();
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))?,
            );

            let res = if refresh {
                client
                    .post(format!("{}/admin/mapping/refresh", url))
                    .headers(headers)
                    .send()
                    .await?
            } else {
                client
                    .get(format!("{}/admin/mapping", url))
                    .headers(headers)
                    .send()
                    .await?
            };
            print_response(res).await?;
        }
    }

    Ok(())
}

fn print_mapping(mapping: &CountryMapping) {
    let sorted: BTreeMap<&str, &str> = mapping.iter().collect();
    for (country, path) in sorted {
        println!("{country}\t{path}");
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
