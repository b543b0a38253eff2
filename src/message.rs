// Message catalog: numeric codes on the wire, typed payload structs in memory.
// Client payloads decode leniently (missing or garbled fields fall back to
// defaults); server payloads decode strictly, which only the client side and the
// tests exercise.

use serde::{Deserialize, Serialize};
use strum::FromRepr;

use crate::clock::TimeControl;
use crate::engine::Difficulty;
use crate::error::{ProtocolError, RequestError};
use crate::force::Force;
use crate::oracle::GameResult;
use crate::wire::{encode_payload, parse_payload, Frame};


#[derive(Clone, Copy, PartialEq, Eq, Debug, FromRepr)]
#[repr(u16)]
pub enum ClientMessageType {
    Register = 0x0001,
    Login = 0x0002,
    GetOnlineUsers = 0x0003,
    FindMatch = 0x0010,
    CancelFindMatch = 0x0011,
    FindAiMatch = 0x0012,
    MakeMove = 0x0020,
    Resign = 0x0021,
    OfferDraw = 0x0022,
    AcceptDraw = 0x0023,
    DeclineDraw = 0x0024,
    GetStats = 0x0030,
    GetHistory = 0x0031,
    GetReplay = 0x0032,
    Challenge = 0x0040,
    AcceptChallenge = 0x0041,
    DeclineChallenge = 0x0042,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, FromRepr)]
#[repr(u16)]
pub enum ServerMessageType {
    RegisterResult = 0x1001,
    LoginResult = 0x1002,
    OnlineUsersList = 0x1004,
    MatchFound = 0x1100,
    GameStart = 0x1101,
    GameStateUpdate = 0x1200,
    InvalidMove = 0x1201,
    GameOver = 0x1202,
    DrawOfferReceived = 0x1203,
    DrawOfferDeclined = 0x1204,
    StatsResponse = 0x1300,
    HistoryResponse = 0x1301,
    ReplayData = 0x1302,
    ChallengeReceived = 0x1400,
    ChallengeAccepted = 0x1401,
    ChallengeDeclined = 0x1402,
    Error = 0x1500,
}


#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FindAiMatchRequest {
    pub difficulty: Difficulty,
    pub color: Force,
}

impl Default for FindAiMatchRequest {
    fn default() -> Self {
        FindAiMatchRequest { difficulty: Difficulty::Medium, color: Force::White }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MakeMoveRequest {
    pub game_id: String,
    #[serde(rename = "move")]
    pub mv: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRequest {
    pub game_id: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeRequest {
    pub target_user_id: i64,
}


#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct RegisterResult {
    pub success: bool,
    pub user_id: Option<i64>,
    pub error: Option<String>,
}

#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct LoginResult {
    pub success: bool,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub rating: Option<i32>,
    pub error: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct OnlineUser {
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    pub rating: i32,
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct OnlineUsersList {
    pub users: Vec<OnlineUser>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct MatchFound {
    pub opponent_id: i64,
    pub opponent_username: String,
    pub opponent_rating: i32,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct GameStart {
    pub game_id: String,
    pub color: Force,
    pub opponent_username: String,
    pub opponent_rating: i32,
    pub time_control: TimeControl,
    pub position: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct GameStateUpdate {
    pub game_id: String,
    pub position: String,
    pub last_move: String,
    pub turn: Force,
    pub in_check: bool,
    pub game_over: bool,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct InvalidMove {
    pub game_id: String,
    pub reason: String,
}

// Game-over messages are personalized: each human seat learns the result from
// its own point of view.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalOutcome {
    YouWin,
    YouLoss,
    Draw,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct GameOver {
    pub game_id: String,
    pub result: GameResult,
    pub outcome: PersonalOutcome,
    pub message: String,
    pub reason: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct DrawOfferReceived {
    pub game_id: String,
    pub message: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct DrawOfferDeclined {
    pub game_id: String,
    pub message: String,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub user_id: i64,
    pub username: String,
    pub rating: i32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub total_games: u32,
    pub win_rate: f64,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub game_id: String,
    pub opponent: String,
    pub my_color: Force,
    pub result: GameResult,
    pub user_result: PersonalOutcome,
    pub moves_count: u32,
    pub date: String,
    pub is_ai_game: bool,
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub games: Vec<HistoryEntry>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ReplayData {
    pub game_id: String,
    pub white_username: String,
    pub black_username: String,
    pub moves: Vec<String>,
    pub result: GameResult,
    pub date: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ChallengeReceived {
    pub challenger_id: i64,
    pub challenger_username: String,
    pub challenger_rating: i32,
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct ChallengeAccepted {
    pub opponent_username: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct ChallengeDeclined {
    pub reason: String,
}


#[derive(Clone, PartialEq, Debug)]
pub enum ClientRequest {
    Register(RegisterRequest),
    Login(LoginRequest),
    GetOnlineUsers,
    FindMatch,
    CancelFindMatch,
    FindAiMatch(FindAiMatchRequest),
    MakeMove(MakeMoveRequest),
    Resign(GameRequest),
    OfferDraw(GameRequest),
    AcceptDraw(GameRequest),
    DeclineDraw(GameRequest),
    GetStats,
    GetHistory,
    GetReplay(GameRequest),
    Challenge(ChallengeRequest),
    AcceptChallenge,
    DeclineChallenge,
}

impl ClientRequest {
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        use ClientMessageType::*;
        let message_type = ClientMessageType::from_repr(frame.message_type)
            .ok_or(ProtocolError::UnknownMessageType(frame.message_type))?;
        let p = &frame.payload;
        Ok(match message_type {
            Register => ClientRequest::Register(parse_payload(p)),
            Login => ClientRequest::Login(parse_payload(p)),
            GetOnlineUsers => ClientRequest::GetOnlineUsers,
            FindMatch => ClientRequest::FindMatch,
            CancelFindMatch => ClientRequest::CancelFindMatch,
            FindAiMatch => ClientRequest::FindAiMatch(parse_payload(p)),
            MakeMove => ClientRequest::MakeMove(parse_payload(p)),
            Resign => ClientRequest::Resign(parse_payload(p)),
            OfferDraw => ClientRequest::OfferDraw(parse_payload(p)),
            AcceptDraw => ClientRequest::AcceptDraw(parse_payload(p)),
            DeclineDraw => ClientRequest::DeclineDraw(parse_payload(p)),
            GetStats => ClientRequest::GetStats,
            GetHistory => ClientRequest::GetHistory,
            GetReplay => ClientRequest::GetReplay(parse_payload(p)),
            Challenge => ClientRequest::Challenge(parse_payload(p)),
            AcceptChallenge => ClientRequest::AcceptChallenge,
            DeclineChallenge => ClientRequest::DeclineChallenge,
        })
    }

    pub fn encode(&self) -> Frame {
        use ClientMessageType as T;
        let (t, payload) = match self {
            ClientRequest::Register(p) => (T::Register, encode_payload(p)),
            ClientRequest::Login(p) => (T::Login, encode_payload(p)),
            ClientRequest::GetOnlineUsers => (T::GetOnlineUsers, vec![]),
            ClientRequest::FindMatch => (T::FindMatch, vec![]),
            ClientRequest::CancelFindMatch => (T::CancelFindMatch, vec![]),
            ClientRequest::FindAiMatch(p) => (T::FindAiMatch, encode_payload(p)),
            ClientRequest::MakeMove(p) => (T::MakeMove, encode_payload(p)),
            ClientRequest::Resign(p) => (T::Resign, encode_payload(p)),
            ClientRequest::OfferDraw(p) => (T::OfferDraw, encode_payload(p)),
            ClientRequest::AcceptDraw(p) => (T::AcceptDraw, encode_payload(p)),
            ClientRequest::DeclineDraw(p) => (T::DeclineDraw, encode_payload(p)),
            ClientRequest::GetStats => (T::GetStats, vec![]),
            ClientRequest::GetHistory => (T::GetHistory, vec![]),
            ClientRequest::GetReplay(p) => (T::GetReplay, encode_payload(p)),
            ClientRequest::Challenge(p) => (T::Challenge, encode_payload(p)),
            ClientRequest::AcceptChallenge => (T::AcceptChallenge, vec![]),
            ClientRequest::DeclineChallenge => (T::DeclineChallenge, vec![]),
        };
        Frame::new(t as u16, payload)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum ServerPush {
    RegisterResult(RegisterResult),
    LoginResult(LoginResult),
    OnlineUsersList(OnlineUsersList),
    MatchFound(MatchFound),
    GameStart(GameStart),
    GameStateUpdate(GameStateUpdate),
    InvalidMove(InvalidMove),
    GameOver(GameOver),
    DrawOfferReceived(DrawOfferReceived),
    DrawOfferDeclined(DrawOfferDeclined),
    StatsResponse(StatsResponse),
    HistoryResponse(HistoryResponse),
    ReplayData(ReplayData),
    ChallengeReceived(ChallengeReceived),
    ChallengeAccepted(ChallengeAccepted),
    ChallengeDeclined(ChallengeDeclined),
    Error(RequestError),
}

impl ServerPush {
    pub fn encode(&self) -> Frame {
        use ServerMessageType as T;
        let (t, payload) = match self {
            ServerPush::RegisterResult(p) => (T::RegisterResult, encode_payload(p)),
            ServerPush::LoginResult(p) => (T::LoginResult, encode_payload(p)),
            ServerPush::OnlineUsersList(p) => (T::OnlineUsersList, encode_payload(p)),
            ServerPush::MatchFound(p) => (T::MatchFound, encode_payload(p)),
            ServerPush::GameStart(p) => (T::GameStart, encode_payload(p)),
            ServerPush::GameStateUpdate(p) => (T::GameStateUpdate, encode_payload(p)),
            ServerPush::InvalidMove(p) => (T::InvalidMove, encode_payload(p)),
            ServerPush::GameOver(p) => (T::GameOver, encode_payload(p)),
            ServerPush::DrawOfferReceived(p) => (T::DrawOfferReceived, encode_payload(p)),
            ServerPush::DrawOfferDeclined(p) => (T::DrawOfferDeclined, encode_payload(p)),
            ServerPush::StatsResponse(p) => (T::StatsResponse, encode_payload(p)),
            ServerPush::HistoryResponse(p) => (T::HistoryResponse, encode_payload(p)),
            ServerPush::ReplayData(p) => (T::ReplayData, encode_payload(p)),
            ServerPush::ChallengeReceived(p) => (T::ChallengeReceived, encode_payload(p)),
            ServerPush::ChallengeAccepted(p) => (T::ChallengeAccepted, encode_payload(p)),
            ServerPush::ChallengeDeclined(p) => (T::ChallengeDeclined, encode_payload(p)),
            ServerPush::Error(p) => (T::Error, encode_payload(p)),
        };
        Frame::new(t as u16, payload)
    }

    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        use ServerMessageType::*;
        let message_type = ServerMessageType::from_repr(frame.message_type)
            .ok_or(ProtocolError::UnknownMessageType(frame.message_type))?;
        fn strict<T: serde::de::DeserializeOwned>(frame: &Frame) -> Result<T, ProtocolError> {
            serde_json::from_slice(&frame.payload)
                .map_err(|_| ProtocolError::MalformedPayload(frame.message_type))
        }
        Ok(match message_type {
            RegisterResult => ServerPush::RegisterResult(strict(frame)?),
            LoginResult => ServerPush::LoginResult(strict(frame)?),
            OnlineUsersList => ServerPush::OnlineUsersList(strict(frame)?),
            MatchFound => ServerPush::MatchFound(strict(frame)?),
            GameStart => ServerPush::GameStart(strict(frame)?),
            GameStateUpdate => ServerPush::GameStateUpdate(strict(frame)?),
            InvalidMove => ServerPush::InvalidMove(strict(frame)?),
            GameOver => ServerPush::GameOver(strict(frame)?),
            DrawOfferReceived => ServerPush::DrawOfferReceived(strict(frame)?),
            DrawOfferDeclined => ServerPush::DrawOfferDeclined(strict(frame)?),
            StatsResponse => ServerPush::StatsResponse(strict(frame)?),
            HistoryResponse => ServerPush::HistoryResponse(strict(frame)?),
            ReplayData => ServerPush::ReplayData(strict(frame)?),
            ChallengeReceived => ServerPush::ChallengeReceived(strict(frame)?),
            ChallengeAccepted => ServerPush::ChallengeAccepted(strict(frame)?),
            ChallengeDeclined => ServerPush::ChallengeDeclined(strict(frame)?),
            Error => ServerPush::Error(strict(frame)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn client_request_round_trip() {
        let requests = [
            ClientRequest::Login(LoginRequest {
                username: "alice".to_owned(),
                password: "hunter2".to_owned(),
            }),
            ClientRequest::MakeMove(MakeMoveRequest {
                game_id: "pvp_1".to_owned(),
                mv: "e2e4".to_owned(),
            }),
            ClientRequest::FindMatch,
            ClientRequest::AcceptChallenge,
        ];
        for request in requests {
            assert_eq!(ClientRequest::decode(&request.encode()).unwrap(), request);
        }
    }

    #[test]
    fn unknown_message_type_is_an_error() {
        let frame = Frame::new(0x7777, vec![]);
        assert_eq!(
            ClientRequest::decode(&frame),
            Err(ProtocolError::UnknownMessageType(0x7777))
        );
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let frame = Frame::new(ClientMessageType::FindAiMatch as u16, br#"{}"#.to_vec());
        assert_eq!(
            ClientRequest::decode(&frame).unwrap(),
            ClientRequest::FindAiMatch(FindAiMatchRequest {
                difficulty: Difficulty::Medium,
                color: Force::White,
            })
        );
    }

    #[test]
    fn move_field_uses_wire_name() {
        let frame = Frame::new(
            ClientMessageType::MakeMove as u16,
            br#"{"game_id":"ai_1","move":"g8f6"}"#.to_vec(),
        );
        let ClientRequest::MakeMove(request) = ClientRequest::decode(&frame).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(request.mv, "g8f6");
    }

    #[test]
    fn server_push_round_trip() {
        let push = ServerPush::GameOver(GameOver {
            game_id: "pvp_3".to_owned(),
            result: GameResult::WhiteWin,
            outcome: PersonalOutcome::YouWin,
            message: "You win! Checkmate".to_owned(),
            reason: "Checkmate".to_owned(),
        });
        assert_eq!(ServerPush::decode(&push.encode()).unwrap(), push);
    }
}
