use byteorder::{ByteOrder, LittleEndian};

use crate::error::QueryError;
use crate::parse::get_array;

/// Opaque anti-spoofing token issued by a server in an S2C_CHALLENGE reply.
pub type Challenge = [u8; 4];

/// Placeholder challenge sent when no token has been issued yet.
pub const NO_CHALLENGE: Challenge = [0xFF; 4];

/// Source query responses use 1400 bytes + IP/UDP headers for a single packet.
pub const MAX_PACKET_SIZE: usize = 1400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketHeader {
    Single,
    Split,
}

impl TryFrom<i32> for PacketHeader {
    type Error = QueryError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(PacketHeader::Single),
            -2 => Ok(PacketHeader::Split),
            n => Err(QueryError::UnknownPacketHeader(n)),
        }
    }
}

/// For packing a [PacketHeader] into a packet in [RequestPacket::pack].
impl PacketHeader {
    pub fn to_le_bytes(&self) -> [u8; 4] {
        let type_value: i32 = match self {
            PacketHeader::Single => -1,
            PacketHeader::Split => -2,
        };
        type_value.to_le_bytes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// A2S_INFO request ('T').
    InfoRequest,
    /// A2S_PLAYER request ('U').
    PlayerRequest,
    /// S2C_CHALLENGE ('A')
    ///
    /// The server may reply with a challenge; the client then repeats
    /// the request carrying the challenge number.
    Challenge,
    /// A2S_INFO response ('I'), parsed by [crate::info::ServerInfo::parse].
    InfoResponse,
    /// A2S_PLAYER response ('D'), parsed by [crate::player::parse_players].
    PlayerResponse,
    /// Anything else a server might send.
    Unknown(u8),
}

impl From<u8> for PacketType {
    fn from(value: u8) -> Self {
        match value {
            0x54 => PacketType::InfoRequest,
            0x55 => PacketType::PlayerRequest,
            0x41 => PacketType::Challenge,
            0x49 => PacketType::InfoResponse,
            0x44 => PacketType::PlayerResponse,
            n => PacketType::Unknown(n),
        }
    }
}

impl PacketType {
    pub fn to_byte(&self) -> u8 {
        match self {
            PacketType::InfoRequest => 0x54,
            PacketType::PlayerRequest => 0x55,
            PacketType::Challenge => 0x41,
            PacketType::InfoResponse => 0x49,
            PacketType::PlayerResponse => 0x44,
            PacketType::Unknown(n) => *n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPacket {
    packet_header: PacketHeader,
    packet_type: PacketType,
    body: &'static [u8],
    challenge: Option<Challenge>,
}

impl RequestPacket {
    const INFO_BODY: &'static [u8] = b"Source Engine Query\0";

    /// A2S_INFO request, optionally answering a challenge.
    pub fn info(challenge: Option<Challenge>) -> Self {
        RequestPacket {
            packet_header: PacketHeader::Single,
            packet_type: PacketType::InfoRequest,
            body: Self::INFO_BODY,
            challenge,
        }
    }

    /// A2S_PLAYER request. Without a challenge the placeholder is sent,
    /// which asks the server to issue one.
    pub fn players(challenge: Option<Challenge>) -> Self {
        RequestPacket {
            packet_header: PacketHeader::Single,
            packet_type: PacketType::PlayerRequest,
            body: &[],
            challenge: Some(challenge.unwrap_or(NO_CHALLENGE)),
        }
    }

    /// Serializes a request packet into an array of bytes.
    pub fn pack(&self) -> Vec<u8> {
        // packet structure: header, type, body (and challenge)
        let mut payload: Vec<u8> = Vec::with_capacity(5 + self.body.len() + 4);
        payload.extend_from_slice(&self.packet_header.to_le_bytes());
        payload.push(self.packet_type.to_byte());
        payload.extend_from_slice(self.body);
        if let Some(c) = &self.challenge {
            payload.extend_from_slice(c);
        }

        payload
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn challenge(&self) -> Option<Challenge> {
        self.challenge
    }
}

/// A single-packet reply, split into its type byte and body.
#[derive(Debug, PartialEq, Eq)]
pub struct ResponsePacket<'a> {
    packet_type: PacketType,
    body: &'a [u8],
}

impl<'a> ResponsePacket<'a> {
    const HEADER_LEN: usize = 4;
    const SINGLE_TYPE_OFFSET: usize = 4;
    const SINGLE_BODY_OFFSET: usize = 5;

    /// Deserializes an incoming datagram, checking the header and type byte are present.
    pub fn unpack(incoming: &'a [u8]) -> Result<Self, QueryError> {
        if incoming.len() < Self::SINGLE_BODY_OFFSET {
            return Err(QueryError::MalformedResponse {
                offset: 0,
                needed: Self::SINGLE_BODY_OFFSET,
                available: incoming.len(),
            });
        }

        let raw_header: i32 = LittleEndian::read_i32(&incoming[..Self::HEADER_LEN]);
        match PacketHeader::try_from(raw_header)? {
            PacketHeader::Single => Ok(ResponsePacket {
                packet_type: PacketType::from(incoming[Self::SINGLE_TYPE_OFFSET]),
                body: &incoming[Self::SINGLE_BODY_OFFSET..],
            }),
            PacketHeader::Split => Err(QueryError::SplitResponse),
        }
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Read the challenge token carried by an S2C_CHALLENGE body.
    pub fn challenge(&self) -> Result<Challenge, QueryError> {
        get_array::<4>(self.body, &mut 0)
    }

    /// Fail unless this packet is of the `expected` type.
    pub fn expect_type(&self, expected: PacketType) -> Result<&'a [u8], QueryError> {
        if self.packet_type == expected {
            Ok(self.body)
        } else {
            Err(QueryError::UnexpectedPacketType {
                expected: expected.to_byte(),
                got: self.packet_type.to_byte(),
            })
        }
    }
}
