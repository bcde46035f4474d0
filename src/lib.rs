//! Pure Rust async client for the [Source A2S_INFO and A2S_PLAYER queries](https://developer.valvesoftware.com/wiki/Server_queries),
//! reporting server and player status for a list of endpoints.
pub mod config;
pub mod error;
pub mod exchange;
pub mod info;
pub mod packet;
pub mod parse;
pub mod player;
pub mod query;

pub use config::QueryConfig;
pub use error::{EndpointError, ErrorKind, QueryError};
pub use info::ServerInfo;
pub use player::Player;
pub use query::{query_all, query_endpoint, Endpoint, QueryOutcome};
