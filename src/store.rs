// Seams for the account table and the finished-game archive. The console crate
// provides in-memory implementations; a persistent backend slots in behind the
// same traits.

use thiserror::Error;

use crate::game::{GameId, GameSession};
use crate::message::{HistoryEntry, ReplayData};
use crate::session::UserInfo;


#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum AccountError {
    #[error("username is already taken")]
    UsernameTaken,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("account storage failure: {0}")]
    Storage(String),
}

pub trait Accounts {
    fn register(
        &mut self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserInfo, AccountError>;
    fn login(&mut self, username: &str, password: &str) -> Result<UserInfo, AccountError>;
    fn rating(&self, user_id: i64) -> Option<i32>;
    fn set_rating(&mut self, user_id: i64, rating: i32);
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct RawStats {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl RawStats {
    pub fn total(&self) -> u32 {
        self.wins + self.losses + self.draws
    }

    // Win rate as a percentage with two decimal places.
    pub fn win_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        let rate = 100.0 * f64::from(self.wins) / f64::from(self.total());
        (rate * 100.0).round() / 100.0
    }
}

pub trait GameStore {
    fn create_game(&mut self, game: &GameSession);
    fn append_move(&mut self, game_id: &GameId, mv: &str, position: &str);
    fn finish_game(&mut self, game: &GameSession);
    fn stats(&self, user_id: i64) -> RawStats;
    fn history(&self, user_id: i64, limit: usize) -> Vec<HistoryEntry>;
    fn replay(&self, game_id: &GameId) -> Option<ReplayData>;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn win_rate_rounds_to_two_decimals() {
        let stats = RawStats { wins: 1, losses: 2, draws: 0 };
        assert_eq!(stats.win_rate(), 33.33);
        let stats = RawStats { wins: 0, losses: 0, draws: 0 };
        assert_eq!(stats.win_rate(), 0.0);
        let stats = RawStats { wins: 3, losses: 0, draws: 1 };
        assert_eq!(stats.win_rate(), 75.0);
    }
}
