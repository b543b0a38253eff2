// Per-game state machine. Moves are all-or-nothing: an illegal move leaves the
// game untouched and produces no state transition.

use std::fmt;

use enum_map::{enum_map, EnumMap};
use instant::Instant;
use serde::{Deserialize, Serialize};

use crate::clock::{MoveClock, TimeControl};
use crate::engine::Difficulty;
use crate::force::Force;
use crate::oracle::{GameResult, MoveOutcome, OracleError, RulesOracle};
use crate::session::{ClientId, UserInfo};


#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct GameId(pub String);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameStatus {
    Active,
    Completed,
    Resigned,
    Draw,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::Active)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameOverReason {
    Checkmate,
    Draw,
    Resignation,
    DrawAgreement,
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOverReason::Checkmate => write!(f, "Checkmate"),
            GameOverReason::Draw => write!(f, "Draw"),
            GameOverReason::Resignation => write!(f, "Player resigned"),
            GameOverReason::DrawAgreement => write!(f, "Draw by agreement"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Seat {
    Human { client_id: ClientId, user: UserInfo },
    Ai { difficulty: Difficulty },
}

impl Seat {
    pub fn is_ai(&self) -> bool {
        matches!(self, Seat::Ai { .. })
    }

    pub fn client_id(&self) -> Option<ClientId> {
        match self {
            Seat::Human { client_id, .. } => Some(*client_id),
            Seat::Ai { .. } => None,
        }
    }

    pub fn user(&self) -> Option<&UserInfo> {
        match self {
            Seat::Human { user, .. } => Some(user),
            Seat::Ai { .. } => None,
        }
    }
}

pub struct GameSession {
    pub id: GameId,
    pub seats: EnumMap<Force, Seat>,
    pub is_ai_game: bool,
    pub position: String,
    pub moves: Vec<String>,
    pub status: GameStatus,
    pub result: GameResult,
    pub reason: Option<GameOverReason>,
    pub clock: MoveClock,
    pub time_control: TimeControl,
}

impl GameSession {
    pub fn new_pvp(
        id: GameId,
        white: (ClientId, UserInfo),
        black: (ClientId, UserInfo),
        position: String,
        time_control: TimeControl,
        now: Instant,
    ) -> Self {
        GameSession {
            id,
            seats: enum_map! {
                Force::White => Seat::Human { client_id: white.0, user: white.1.clone() },
                Force::Black => Seat::Human { client_id: black.0, user: black.1.clone() },
            },
            is_ai_game: false,
            position,
            moves: Vec::new(),
            status: GameStatus::Active,
            result: GameResult::Ongoing,
            reason: None,
            clock: MoveClock::new(now),
            time_control,
        }
    }

    pub fn new_vs_ai(
        id: GameId,
        human: (ClientId, UserInfo),
        human_color: Force,
        difficulty: Difficulty,
        position: String,
        time_control: TimeControl,
        now: Instant,
    ) -> Self {
        let human_seat = Seat::Human { client_id: human.0, user: human.1.clone() };
        let ai_seat = Seat::Ai { difficulty };
        let seats = match human_color {
            Force::White => enum_map! {
                Force::White => human_seat.clone(),
                Force::Black => ai_seat.clone(),
            },
            Force::Black => enum_map! {
                Force::White => ai_seat.clone(),
                Force::Black => human_seat.clone(),
            },
        };
        GameSession {
            id,
            seats,
            is_ai_game: true,
            position,
            moves: Vec::new(),
            status: GameStatus::Active,
            result: GameResult::Ongoing,
            reason: None,
            clock: MoveClock::new(now),
            time_control,
        }
    }

    pub fn seat_of(&self, client_id: ClientId) -> Option<Force> {
        self.seats
            .iter()
            .find(|(_, seat)| seat.client_id() == Some(client_id))
            .map(|(force, _)| force)
    }

    pub fn human_seats(&self) -> impl Iterator<Item = (Force, ClientId)> + '_ {
        self.seats
            .iter()
            .filter_map(|(force, seat)| seat.client_id().map(|id| (force, id)))
    }

    pub fn side_to_move(&self, oracle: &dyn RulesOracle) -> Result<Force, OracleError> {
        oracle.side_to_move(&self.position)
    }

    pub fn apply_move(
        &mut self,
        oracle: &dyn RulesOracle,
        mv: &str,
        now: Instant,
    ) -> Result<MoveOutcome, OracleError> {
        let outcome = oracle.apply_move(&self.position, mv)?;
        self.position = outcome.position.clone();
        self.moves.push(mv.to_owned());
        self.clock.register_move(now);
        if outcome.game_over {
            self.status = GameStatus::Completed;
            self.result = outcome.result;
            self.reason = Some(match outcome.result {
                GameResult::Draw => GameOverReason::Draw,
                _ => GameOverReason::Checkmate,
            });
        }
        Ok(outcome)
    }

    pub fn resign(&mut self, loser: Force) {
        self.status = GameStatus::Resigned;
        self.result = GameResult::victory(loser.opponent());
        self.reason = Some(GameOverReason::Resignation);
    }

    pub fn agree_draw(&mut self) {
        self.status = GameStatus::Draw;
        self.result = GameResult::Draw;
        self.reason = Some(GameOverReason::DrawAgreement);
    }

    // Agreed draws are unrated; draws reached over the board (stalemate,
    // insufficient material) are rated.
    pub fn affects_ratings(&self) -> bool {
        !self.is_ai_game && self.status.is_terminal() && self.status != GameStatus::Draw
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_util::{user, ToyOracle};

    fn pvp_game(oracle: &ToyOracle) -> GameSession {
        GameSession::new_pvp(
            GameId("pvp_1".to_owned()),
            (ClientId(1), user(1, "alice")),
            (ClientId(2), user(2, "bob")),
            oracle.start(),
            TimeControl::default(),
            Instant::now(),
        )
    }

    #[test]
    fn illegal_move_leaves_the_game_untouched() {
        let oracle = ToyOracle::new(21, 3);
        let mut game = pvp_game(&oracle);
        let before = game.position.clone();
        assert!(game.apply_move(&oracle, "7", Instant::now()).is_err());
        assert_eq!(game.position, before);
        assert_eq!(game.moves.len(), 0);
        assert_eq!(game.status, GameStatus::Active);
    }

    #[test]
    fn winning_move_completes_the_game() {
        let oracle = ToyOracle::new(5, 3);
        let mut game = pvp_game(&oracle);
        let now = Instant::now();
        game.apply_move(&oracle, "3", now).unwrap();
        assert_eq!(game.status, GameStatus::Active);
        game.apply_move(&oracle, "2", now).unwrap();
        assert_eq!(game.status, GameStatus::Completed);
        assert_eq!(game.result, GameResult::BlackWin);
        assert_eq!(game.reason, Some(GameOverReason::Checkmate));
        assert!(game.affects_ratings());
    }

    #[test]
    fn agreed_draw_is_unrated() {
        let oracle = ToyOracle::new(21, 3);
        let mut game = pvp_game(&oracle);
        game.agree_draw();
        assert_eq!(game.status, GameStatus::Draw);
        assert_eq!(game.result, GameResult::Draw);
        assert!(!game.affects_ratings());
    }

    #[test]
    fn board_draw_is_rated() {
        let oracle = ToyOracle::new(21, 3).with_draw_at(4);
        let mut game = pvp_game(&oracle);
        let now = Instant::now();
        game.apply_move(&oracle, "2", now).unwrap();
        game.apply_move(&oracle, "2", now).unwrap();
        assert_eq!(game.status, GameStatus::Completed);
        assert_eq!(game.result, GameResult::Draw);
        assert_eq!(game.reason, Some(GameOverReason::Draw));
        assert!(game.affects_ratings());
    }

    #[test]
    fn seats_resolve_by_client() {
        let oracle = ToyOracle::new(21, 3);
        let game = pvp_game(&oracle);
        assert_eq!(game.seat_of(ClientId(1)), Some(Force::White));
        assert_eq!(game.seat_of(ClientId(2)), Some(Force::Black));
        assert_eq!(game.seat_of(ClientId(3)), None);
    }
}
