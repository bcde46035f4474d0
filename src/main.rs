//! Command-line tracker: queries each server once and prints its status.

use std::collections::HashSet;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use log::warn;

use sourcetrack::{query_all, Endpoint, QueryConfig, QueryOutcome};

const RULE: &str = "───────────────────────────────────────";

/// Query game servers over A2S and report their players.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Servers to query, as host or host:port (port defaults to 27015).
    #[arg(required = true, value_name = "HOST[:PORT]")]
    endpoints: Vec<Endpoint>,

    /// Deadline for each info or player query, in milliseconds.
    #[arg(
        long,
        env = "QUERY_TIMEOUT_MS",
        default_value_t = QueryConfig::DEFAULT_TIMEOUT_MS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_ms: u64,

    /// Query all servers at the same time.
    #[arg(long, env = "QUERY_CONCURRENT")]
    concurrent: bool,
}

impl Cli {
    fn config(&self) -> QueryConfig {
        QueryConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            concurrent: self.concurrent,
        }
    }
}

/// Drop repeated endpoints, keeping the first occurrence of each.
fn unique_endpoints(endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
    let mut seen: HashSet<Endpoint> = HashSet::with_capacity(endpoints.len());
    endpoints
        .into_iter()
        .filter(|endpoint| {
            let first = seen.insert(endpoint.clone());
            if !first {
                warn!("server {} already listed, querying it once", endpoint);
            }
            first
        })
        .collect()
}

fn print_outcome(endpoint: &Endpoint, outcome: &QueryOutcome) {
    match outcome {
        QueryOutcome::Success { info, players } => {
            println!("  Server : {}", endpoint);
            println!("  Name   : {}", info.server_name);
            println!("  Map    : {}", info.map_name);
            println!("  Players: {}/{}", players.len(), info.max_players);

            if players.is_empty() {
                println!("    No players online.");
            } else {
                println!();
                for (i, player) in players.iter().enumerate() {
                    let name: &str = if player.name.is_empty() {
                        "(Unnamed)"
                    } else {
                        &player.name
                    };
                    println!("    {:02}. {}", i + 1, name);
                }
            }
        }
        QueryOutcome::Failure { kind, detail } => {
            println!("  [X] {}", endpoint);
            println!("      {}: {}", kind, detail);
        }
    }
    println!("\n{}\n", RULE);
}

#[tokio::main]
async fn main() {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    let config: QueryConfig = cli.config();
    let endpoints: Vec<Endpoint> = unique_endpoints(cli.endpoints);

    for (endpoint, outcome) in query_all(&endpoints, &config).await {
        print_outcome(&endpoint, &outcome);
    }
}
