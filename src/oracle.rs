// Seam between the server core and the chess rules implementation. The core
// never interprets positions or move strings itself; it shuttles them between
// the oracle, the clients and the store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::force::Force;


#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    WhiteWin,
    BlackWin,
    Draw,
    Ongoing,
}

impl GameResult {
    pub fn winner(self) -> Option<Force> {
        match self {
            GameResult::WhiteWin => Some(Force::White),
            GameResult::BlackWin => Some(Force::Black),
            GameResult::Draw | GameResult::Ongoing => None,
        }
    }

    pub fn victory(force: Force) -> GameResult {
        match force {
            Force::White => GameResult::WhiteWin,
            Force::Black => GameResult::BlackWin,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum OracleError {
    #[error("illegal move: {reason}")]
    IllegalMove { reason: String },
    #[error("bad position: {0}")]
    BadPosition(String),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MoveOutcome {
    pub position: String,
    pub in_check: bool,
    pub game_over: bool,
    pub result: GameResult,
}

pub trait RulesOracle {
    fn starting_position(&self) -> String;
    fn side_to_move(&self, position: &str) -> Result<Force, OracleError>;
    fn legal_moves(&self, position: &str) -> Vec<String>;
    fn apply_move(&self, position: &str, mv: &str) -> Result<MoveOutcome, OracleError>;
}
