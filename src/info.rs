use std::time::Duration;

use crate::error::QueryError;
use crate::exchange::{self, Exchange, Step};
use crate::packet::{PacketType, RequestPacket, ResponsePacket};
use crate::parse::{get_string, get_u8, skip};
use crate::query::Endpoint;

/// Server information as obtained by [query].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server hostname
    pub server_name: String,
    /// Current map
    pub map_name: String,
    /// Current players
    pub players: u8,
    /// Max players
    pub max_players: u8,
}

impl ServerInfo {
    const APP_ID_LEN: usize = 2;

    /// Parse an A2S_INFO [ResponsePacket] into its corresponding [ServerInfo].
    ///
    /// Game folder and description are read only to reach the player counts.
    pub fn parse(packet: &ResponsePacket) -> Result<ServerInfo, QueryError> {
        let data: &[u8] = packet.expect_type(PacketType::InfoResponse)?;
        let mut offset: usize = 0;

        let server_name: String = get_string(data, &mut offset)?;
        let map_name: String = get_string(data, &mut offset)?;
        let _folder: String = get_string(data, &mut offset)?;
        let _game: String = get_string(data, &mut offset)?;
        skip(data, &mut offset, Self::APP_ID_LEN)?;
        let players: u8 = get_u8(data, &mut offset)?;
        let max_players: u8 = get_u8(data, &mut offset)?;

        Ok(ServerInfo {
            server_name,
            map_name,
            players,
            max_players,
        })
    }
}

/// A2S_INFO exchange: one request, answering at most one challenge.
#[derive(Debug, Default)]
pub struct InfoQuery {
    challenged: bool,
}

impl InfoQuery {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Exchange for InfoQuery {
    type Output = ServerInfo;

    fn initial_request(&mut self) -> RequestPacket {
        self.challenged = false;
        RequestPacket::info(None)
    }

    fn on_reply(&mut self, reply: &[u8]) -> Result<Step<ServerInfo>, QueryError> {
        let packet: ResponsePacket = ResponsePacket::unpack(reply)?;

        // absolving challenge
        if packet.packet_type() == PacketType::Challenge {
            if self.challenged {
                return Err(QueryError::RepeatedChallenge);
            }
            self.challenged = true;
            return Ok(Step::Send(RequestPacket::info(Some(packet.challenge()?))));
        }

        ServerInfo::parse(&packet).map(Step::Done)
    }
}

/// Query `endpoint` with the A2S_INFO query.
///
/// `timeout_dur` bounds the whole exchange, including a challenge round.
pub async fn query(endpoint: &Endpoint, timeout_dur: Duration) -> Result<ServerInfo, QueryError> {
    exchange::run(endpoint, InfoQuery::new(), timeout_dur).await
}
