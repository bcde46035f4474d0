use std::fmt;
use std::str::FromStr;

use log::{error, info, warn};
use tokio::task::JoinSet;

use crate::config::QueryConfig;
use crate::error::{EndpointError, ErrorKind, QueryError};
use crate::info::{self, ServerInfo};
use crate::player::{self, Player};

/// A queryable server, identified by its `(host, port)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub const DEFAULT_PORT: u16 = 27015;

    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, EndpointError> {
        let host: String = host.into().trim().to_owned();
        if host.is_empty() {
            return Err(EndpointError::EmptyHost);
        }
        if port == 0 {
            return Err(EndpointError::InvalidPort(port.to_string()));
        }
        Ok(Endpoint { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Parses `host` or `host:port`; the port defaults to [Endpoint::DEFAULT_PORT].
impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((host, port)) => {
                let port: u16 = port
                    .trim()
                    .parse()
                    .map_err(|_| EndpointError::InvalidPort(port.trim().to_owned()))?;
                Endpoint::new(host, port)
            }
            None => Endpoint::new(s, Self::DEFAULT_PORT),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Result of querying one endpoint in one pass.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Success {
        info: ServerInfo,
        players: Vec<Player>,
    },
    Failure {
        kind: ErrorKind,
        detail: String,
    },
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Success { .. })
    }

    /// The failure kind, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            QueryOutcome::Success { .. } => None,
            QueryOutcome::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl From<QueryError> for QueryOutcome {
    fn from(err: QueryError) -> Self {
        QueryOutcome::Failure {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

/// Query one endpoint: A2S_INFO, then A2S_PLAYER if the info query succeeded.
///
/// Each query gets its own socket and its own deadline. Nothing is retried.
pub async fn query_endpoint(endpoint: &Endpoint, config: &QueryConfig) -> QueryOutcome {
    match query_both(endpoint, config).await {
        Ok((info, players)) => QueryOutcome::Success { info, players },
        Err(err) => {
            warn!("{}: {} ({})", endpoint, err, err.kind());
            err.into()
        }
    }
}

async fn query_both(
    endpoint: &Endpoint,
    config: &QueryConfig,
) -> Result<(ServerInfo, Vec<Player>), QueryError> {
    let info: ServerInfo = info::query(endpoint, config.timeout).await?;
    let players: Vec<Player> = player::query(endpoint, config.timeout).await?;
    Ok((info, players))
}

/// Query every endpoint once, returning outcomes in input order.
///
/// A failed endpoint never stops the pass.
pub async fn query_all(endpoints: &[Endpoint], config: &QueryConfig) -> Vec<(Endpoint, QueryOutcome)> {
    let outcomes: Vec<QueryOutcome> = if config.concurrent {
        query_concurrently(endpoints, config).await
    } else {
        let mut outcomes: Vec<QueryOutcome> = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            outcomes.push(query_endpoint(endpoint, config).await);
        }
        outcomes
    };

    let succeeded: usize = outcomes.iter().filter(|o| o.is_success()).count();
    info!("query pass complete: {}/{} servers answered", succeeded, endpoints.len());

    endpoints.iter().cloned().zip(outcomes).collect()
}

/// One task per endpoint. Outcomes land in index slots so the result
/// keeps input order.
async fn query_concurrently(endpoints: &[Endpoint], config: &QueryConfig) -> Vec<QueryOutcome> {
    let mut tasks: JoinSet<(usize, QueryOutcome)> = JoinSet::new();
    for (i, endpoint) in endpoints.iter().enumerate() {
        let endpoint: Endpoint = endpoint.clone();
        let config: QueryConfig = config.clone();
        tasks.spawn(async move { (i, query_endpoint(&endpoint, &config).await) });
    }

    // each task owns its outcome; only this loop writes the collection
    let mut slots: Vec<Option<QueryOutcome>> = vec![None; endpoints.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((i, outcome)) => slots[i] = Some(outcome),
            Err(err) => error!("bug: query task did not complete: {}", err),
        }
    }

    slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(unfinished_task))
        .collect()
}

/// Outcome for a slot whose task panicked or was aborted.
///
/// Query tasks report every failure through [QueryOutcome], so this is
/// unreachable unless the query code itself panics.
fn unfinished_task() -> QueryOutcome {
    QueryOutcome::Failure {
        kind: ErrorKind::NetworkError,
        detail: "internal error: query task did not complete".to_owned(),
    }
}
