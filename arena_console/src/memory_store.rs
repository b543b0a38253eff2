// In-memory account table and game archive. Stand-ins for a persistent store;
// they live behind the `Accounts`/`GameStore` seams so a database-backed
// implementation can replace them without touching the server core.

use std::collections::HashMap;

use arena_chess::force::Force;
use arena_chess::game::{GameId, GameSession, Seat};
use arena_chess::message::{HistoryEntry, PersonalOutcome, ReplayData};
use arena_chess::oracle::GameResult;
use arena_chess::rating::INITIAL_RATING;
use arena_chess::session::UserInfo;
use arena_chess::store::{AccountError, Accounts, GameStore, RawStats};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use time::macros::format_description;
use time::OffsetDateTime;


fn now_string() -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    OffsetDateTime::now_utc().format(format).unwrap_or_default()
}

#[derive(Clone, Debug)]
struct Account {
    user_id: i64,
    display_name: String,
    password_hash: String,
    rating: i32,
}

#[derive(Default)]
pub struct MemoryAccounts {
    by_username: HashMap<String, Account>,
    next_user_id: i64,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        MemoryAccounts::default()
    }
}

impl Accounts for MemoryAccounts {
    fn register(
        &mut self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserInfo, AccountError> {
        if username.is_empty() || self.by_username.contains_key(username) {
            return Err(AccountError::UsernameTaken);
        }
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| AccountError::Storage(err.to_string()))?
            .to_string();
        self.next_user_id += 1;
        let account = Account {
            user_id: self.next_user_id,
            display_name: display_name.to_owned(),
            password_hash,
            rating: INITIAL_RATING,
        };
        self.by_username.insert(username.to_owned(), account.clone());
        Ok(UserInfo {
            user_id: account.user_id,
            username: username.to_owned(),
            display_name: account.display_name,
            rating: account.rating,
        })
    }

    fn login(&mut self, username: &str, password: &str) -> Result<UserInfo, AccountError> {
        let account = self
            .by_username
            .get(username)
            .ok_or(AccountError::InvalidCredentials)?;
        let parsed_hash = PasswordHash::new(&account.password_hash)
            .map_err(|err| AccountError::Storage(err.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AccountError::InvalidCredentials)?;
        Ok(UserInfo {
            user_id: account.user_id,
            username: username.to_owned(),
            display_name: account.display_name.clone(),
            rating: account.rating,
        })
    }

    fn rating(&self, user_id: i64) -> Option<i32> {
        self.by_username.values().find(|a| a.user_id == user_id).map(|a| a.rating)
    }

    fn set_rating(&mut self, user_id: i64, rating: i32) {
        if let Some(account) = self.by_username.values_mut().find(|a| a.user_id == user_id) {
            account.rating = rating;
        }
    }
}

struct ArchivedGame {
    white_name: String,
    black_name: String,
    white_user: Option<i64>,
    black_user: Option<i64>,
    is_ai_game: bool,
    moves: Vec<String>,
    result: GameResult,
    finished_at: Option<String>,
}

fn seat_name(seat: &Seat) -> String {
    match seat {
        Seat::Human { user, .. } => user.username.clone(),
        Seat::Ai { difficulty } => format!("AI Bot ({})", difficulty.label()),
    }
}

#[derive(Default)]
pub struct MemoryGameStore {
    games: HashMap<GameId, ArchivedGame>,
    order: Vec<GameId>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        MemoryGameStore::default()
    }
}

impl GameStore for MemoryGameStore {
    fn create_game(&mut self, game: &GameSession) {
        let archived = ArchivedGame {
            white_name: seat_name(&game.seats[Force::White]),
            black_name: seat_name(&game.seats[Force::Black]),
            white_user: game.seats[Force::White].user().map(|u| u.user_id),
            black_user: game.seats[Force::Black].user().map(|u| u.user_id),
            is_ai_game: game.is_ai_game,
            moves: Vec::new(),
            result: GameResult::Ongoing,
            finished_at: None,
        };
        self.games.insert(game.id.clone(), archived);
        self.order.push(game.id.clone());
    }

    fn append_move(&mut self, game_id: &GameId, mv: &str, _position: &str) {
        if let Some(archived) = self.games.get_mut(game_id) {
            archived.moves.push(mv.to_owned());
        }
    }

    fn finish_game(&mut self, game: &GameSession) {
        if let Some(archived) = self.games.get_mut(&game.id) {
            archived.result = game.result;
            archived.finished_at = Some(now_string());
        }
    }

    fn stats(&self, user_id: i64) -> RawStats {
        let mut stats = RawStats::default();
        for archived in self.games.values() {
            if archived.finished_at.is_none() {
                continue;
            }
            let my_color = if archived.white_user == Some(user_id) {
                Force::White
            } else if archived.black_user == Some(user_id) {
                Force::Black
            } else {
                continue;
            };
            match archived.result.winner() {
                Some(winner) if winner == my_color => stats.wins += 1,
                Some(_) => stats.losses += 1,
                None => stats.draws += 1,
            }
        }
        stats
    }

    fn history(&self, user_id: i64, limit: usize) -> Vec<HistoryEntry> {
        self.order
            .iter()
            .rev()
            .filter_map(|game_id| self.games.get(game_id).map(|g| (game_id, g)))
            .filter_map(|(game_id, g)| {
                let finished_at = g.finished_at.as_ref()?;
                let my_color = if g.white_user == Some(user_id) {
                    Force::White
                } else if g.black_user == Some(user_id) {
                    Force::Black
                } else {
                    return None;
                };
                let opponent = match my_color {
                    Force::White => g.black_name.clone(),
                    Force::Black => g.white_name.clone(),
                };
                let user_result = match g.result.winner() {
                    Some(winner) if winner == my_color => PersonalOutcome::YouWin,
                    Some(_) => PersonalOutcome::YouLoss,
                    None => PersonalOutcome::Draw,
                };
                Some(HistoryEntry {
                    game_id: game_id.0.clone(),
                    opponent,
                    my_color,
                    result: g.result,
                    user_result,
                    moves_count: g.moves.len() as u32,
                    date: finished_at.clone(),
                    is_ai_game: g.is_ai_game,
                })
            })
            .take(limit)
            .collect()
    }

    fn replay(&self, game_id: &GameId) -> Option<ReplayData> {
        let archived = self.games.get(game_id)?;
        Some(ReplayData {
            game_id: game_id.0.clone(),
            white_username: archived.white_name.clone(),
            black_username: archived.black_name.clone(),
            moves: archived.moves.clone(),
            result: archived.result,
            date: archived.finished_at.clone().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn register_then_login() {
        let mut accounts = MemoryAccounts::new();
        let user = accounts.register("alice", "hunter2", "Alice").unwrap();
        assert_eq!(user.rating, INITIAL_RATING);
        assert_eq!(
            accounts.register("alice", "other", "Alice II"),
            Err(AccountError::UsernameTaken)
        );
        let logged_in = accounts.login("alice", "hunter2").unwrap();
        assert_eq!(logged_in.user_id, user.user_id);
        assert_eq!(
            accounts.login("alice", "wrong"),
            Err(AccountError::InvalidCredentials)
        );
        assert_eq!(
            accounts.login("nobody", "hunter2"),
            Err(AccountError::InvalidCredentials)
        );
    }

    #[test]
    fn ratings_are_per_user() {
        let mut accounts = MemoryAccounts::new();
        let alice = accounts.register("alice", "a", "Alice").unwrap();
        let bob = accounts.register("bob", "b", "Bob").unwrap();
        accounts.set_rating(alice.user_id, 1516);
        assert_eq!(accounts.rating(alice.user_id), Some(1516));
        assert_eq!(accounts.rating(bob.user_id), Some(INITIAL_RATING));
    }
}
