use std::time::Duration;

use log::debug;

use crate::error::QueryError;
use crate::exchange::{self, Exchange, Step};
use crate::packet::{PacketType, RequestPacket, ResponsePacket};
use crate::parse::{get_f32, get_i32, get_string, get_u8};
use crate::query::Endpoint;

/// One connected player as reported by A2S_PLAYER.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Player name, possibly empty
    pub name: String,
    /// Seconds connected to the server
    pub duration_secs: f32,
}

/// Parse an A2S_PLAYER [ResponsePacket] into players, in wire order.
///
/// The type byte is not checked: any reply that is not a challenge
/// carries the player list.
pub fn parse_players(packet: &ResponsePacket) -> Result<Vec<Player>, QueryError> {
    let data: &[u8] = packet.body();
    let mut offset: usize = 0;

    let count: u8 = get_u8(data, &mut offset)?;
    let mut players: Vec<Player> = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let _index: u8 = get_u8(data, &mut offset)?;
        let name: String = get_string(data, &mut offset)?;
        let _score: i32 = get_i32(data, &mut offset)?;
        let duration: f32 = get_f32(data, &mut offset)?;

        players.push(Player {
            name,
            // NaN and negative durations collapse to zero
            duration_secs: duration.max(0.0),
        });
    }

    Ok(players)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerQueryState {
    /// Placeholder request sent; the server may answer with a challenge.
    AwaitingChallenge,
    /// Challenge answered; only the player list is acceptable now.
    AwaitingPlayers,
    Done,
    Failed,
}

/// A2S_PLAYER challenge/response state machine.
///
/// At most two round trips: placeholder request, challenge, challenged
/// request, player list. Servers that skip the challenge finish in one.
#[derive(Debug)]
pub struct PlayerQuery {
    state: PlayerQueryState,
}

impl Default for PlayerQuery {
    fn default() -> Self {
        PlayerQuery {
            state: PlayerQueryState::AwaitingChallenge,
        }
    }
}

impl PlayerQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlayerQueryState {
        self.state
    }

    fn advance(&mut self, reply: &[u8]) -> Result<Step<Vec<Player>>, QueryError> {
        let packet: ResponsePacket = ResponsePacket::unpack(reply)?;

        match (self.state, packet.packet_type()) {
            (PlayerQueryState::Done | PlayerQueryState::Failed, _) => {
                Err(QueryError::ReplyAfterDone)
            }
            (PlayerQueryState::AwaitingChallenge, PacketType::Challenge) => {
                let challenge = packet.challenge()?;
                debug!("player query challenged with {:02x?}", challenge);
                self.state = PlayerQueryState::AwaitingPlayers;
                Ok(Step::Send(RequestPacket::players(Some(challenge))))
            }
            (PlayerQueryState::AwaitingPlayers, PacketType::Challenge) => {
                Err(QueryError::RepeatedChallenge)
            }
            // the final list, whether or not a challenge came first
            (PlayerQueryState::AwaitingChallenge | PlayerQueryState::AwaitingPlayers, _) => {
                let players: Vec<Player> = parse_players(&packet)?;
                self.state = PlayerQueryState::Done;
                Ok(Step::Done(players))
            }
        }
    }
}

impl Exchange for PlayerQuery {
    type Output = Vec<Player>;

    fn initial_request(&mut self) -> RequestPacket {
        self.state = PlayerQueryState::AwaitingChallenge;
        RequestPacket::players(None)
    }

    fn on_reply(&mut self, reply: &[u8]) -> Result<Step<Vec<Player>>, QueryError> {
        let step = self.advance(reply);
        if step.is_err() {
            self.state = PlayerQueryState::Failed;
        }
        step
    }
}

/// Query `endpoint` with the A2S_PLAYER query.
///
/// `timeout_dur` bounds the whole exchange, both rounds included.
pub async fn query(endpoint: &Endpoint, timeout_dur: Duration) -> Result<Vec<Player>, QueryError> {
    exchange::run(endpoint, PlayerQuery::new(), timeout_dur).await
}
