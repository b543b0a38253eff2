// Deterministic stand-ins for the external collaborators, used by unit and
// integration tests. `ToyOracle` plays a "race to N" game: each move adds
// 1..=step_limit to a counter and whoever lands exactly on the target wins,
// which makes search behavior and game endings easy to script.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::engine::{MoveClassifier, PositionEvaluator};
use crate::force::Force;
use crate::game::{GameId, GameSession, Seat};
use crate::message::{HistoryEntry, PersonalOutcome, ReplayData};
use crate::oracle::{GameResult, MoveOutcome, OracleError, RulesOracle};
use crate::rating::INITIAL_RATING;
use crate::server::{AiDriver, AiTask};
use crate::session::UserInfo;
use crate::store::{AccountError, Accounts, GameStore, RawStats};


pub fn user(user_id: i64, username: &str) -> UserInfo {
    UserInfo {
        user_id,
        username: username.to_owned(),
        display_name: username.to_owned(),
        rating: INITIAL_RATING,
    }
}

// Positions look like "7:w": counter value, then the side to move.
#[derive(Clone, Debug)]
pub struct ToyOracle {
    target: u32,
    step_limit: u32,
    draw_at: Option<u32>,
}

impl ToyOracle {
    pub fn new(target: u32, step_limit: u32) -> Self {
        ToyOracle { target, step_limit, draw_at: None }
    }

    // Landing exactly on `count` ends the game in a draw instead.
    pub fn with_draw_at(mut self, count: u32) -> Self {
        self.draw_at = Some(count);
        self
    }

    pub fn start(&self) -> String {
        self.starting_position()
    }

    fn parse(&self, position: &str) -> Result<(u32, Force), OracleError> {
        let bad = || OracleError::BadPosition(position.to_owned());
        let (count, side) = position.split_once(':').ok_or_else(bad)?;
        let count: u32 = count.parse().map_err(|_| bad())?;
        let side = match side {
            "w" => Force::White,
            "b" => Force::Black,
            _ => return Err(bad()),
        };
        Ok((count, side))
    }

    fn format(&self, count: u32, side: Force) -> String {
        let side = match side {
            Force::White => "w",
            Force::Black => "b",
        };
        format!("{count}:{side}")
    }

    fn is_terminal(&self, count: u32) -> bool {
        count >= self.target || self.draw_at == Some(count)
    }
}

impl RulesOracle for ToyOracle {
    fn starting_position(&self) -> String {
        self.format(0, Force::White)
    }

    fn side_to_move(&self, position: &str) -> Result<Force, OracleError> {
        Ok(self.parse(position)?.1)
    }

    fn legal_moves(&self, position: &str) -> Vec<String> {
        let Ok((count, _)) = self.parse(position) else {
            return vec![];
        };
        if self.is_terminal(count) {
            return vec![];
        }
        (1..=self.step_limit)
            .filter(|step| count + step <= self.target)
            .map(|step| step.to_string())
            .collect()
    }

    fn apply_move(&self, position: &str, mv: &str) -> Result<MoveOutcome, OracleError> {
        let (count, side) = self.parse(position)?;
        let step: u32 = mv.parse().map_err(|_| OracleError::IllegalMove {
            reason: format!("not a step: {mv:?}"),
        })?;
        if step == 0 || step > self.step_limit || count + step > self.target {
            return Err(OracleError::IllegalMove { reason: format!("step {step} not allowed") });
        }
        let new_count = count + step;
        let result = if new_count == self.target {
            GameResult::victory(side)
        } else if self.draw_at == Some(new_count) {
            GameResult::Draw
        } else {
            GameResult::Ongoing
        };
        Ok(MoveOutcome {
            position: self.format(new_count, side.opponent()),
            in_check: new_count + 1 == self.target,
            game_over: result != GameResult::Ongoing,
            result,
        })
    }
}

pub struct NullEvaluator;

impl PositionEvaluator for NullEvaluator {
    fn evaluate(&self, _position: &str, _side: Force) -> i32 { 0 }
}

pub struct ScriptedClassifier {
    ranked: Vec<String>,
}

impl ScriptedClassifier {
    pub fn new(ranked: Vec<String>) -> Self {
        ScriptedClassifier { ranked }
    }
}

impl MoveClassifier for ScriptedClassifier {
    fn rank_moves(&self, _position: &str, _legal_moves: &[String]) -> Vec<String> {
        self.ranked.clone()
    }
}

// Collects AI tasks instead of running a search, so tests control exactly when
// and what the "AI" answers.
#[derive(Clone, Default)]
pub struct QueueAiDriver {
    pub tasks: Arc<Mutex<VecDeque<AiTask>>>,
}

impl QueueAiDriver {
    pub fn new() -> Self {
        QueueAiDriver::default()
    }

    pub fn pop(&self) -> Option<AiTask> {
        self.tasks.lock().unwrap().pop_front()
    }
}

impl AiDriver for QueueAiDriver {
    fn request(&self, task: AiTask) {
        self.tasks.lock().unwrap().push_back(task);
    }
}

#[derive(Clone, Debug)]
struct MemoryAccount {
    user_id: i64,
    password: String,
    display_name: String,
    rating: i32,
}

#[derive(Default)]
pub struct MemoryAccounts {
    by_username: HashMap<String, MemoryAccount>,
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
        if self.by_username.contains_key(username) {
            return Err(AccountError::UsernameTaken);
        }
        self.next_user_id += 1;
        let account = MemoryAccount {
            user_id: self.next_user_id,
            password: password.to_owned(),
            display_name: display_name.to_owned(),
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
            .filter(|account| account.password == password)
            .ok_or(AccountError::InvalidCredentials)?;
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

// Cloneable handle so a test can keep inspecting accounts after handing them to
// the server.
#[derive(Clone, Default)]
pub struct SharedAccounts(pub Arc<Mutex<MemoryAccounts>>);

impl SharedAccounts {
    pub fn new() -> Self {
        SharedAccounts::default()
    }

    pub fn rating_of(&self, user_id: i64) -> Option<i32> {
        self.0.lock().unwrap().rating(user_id)
    }

    pub fn set_rating_of(&self, user_id: i64, rating: i32) {
        self.0.lock().unwrap().set_rating(user_id, rating);
    }
}

impl Accounts for SharedAccounts {
    fn register(
        &mut self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserInfo, AccountError> {
        self.0.lock().unwrap().register(username, password, display_name)
    }

    fn login(&mut self, username: &str, password: &str) -> Result<UserInfo, AccountError> {
        self.0.lock().unwrap().login(username, password)
    }

    fn rating(&self, user_id: i64) -> Option<i32> {
        self.0.lock().unwrap().rating(user_id)
    }

    fn set_rating(&mut self, user_id: i64, rating: i32) {
        self.0.lock().unwrap().set_rating(user_id, rating)
    }
}

const TEST_DATE: &str = "2024-01-01 00:00";

struct StoredGame {
    white_name: String,
    black_name: String,
    white_user: Option<i64>,
    black_user: Option<i64>,
    is_ai_game: bool,
    moves: Vec<String>,
    result: GameResult,
    finished: bool,
}

fn seat_name(seat: &Seat) -> String {
    match seat {
        Seat::Human { user, .. } => user.username.clone(),
        Seat::Ai { difficulty } => format!("AI Bot ({})", difficulty.label()),
    }
}

#[derive(Default)]
pub struct MemoryStore {
    games: HashMap<GameId, StoredGame>,
    order: Vec<GameId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl GameStore for MemoryStore {
    fn create_game(&mut self, game: &GameSession) {
        let stored = StoredGame {
            white_name: seat_name(&game.seats[Force::White]),
            black_name: seat_name(&game.seats[Force::Black]),
            white_user: game.seats[Force::White].user().map(|u| u.user_id),
            black_user: game.seats[Force::Black].user().map(|u| u.user_id),
            is_ai_game: game.is_ai_game,
            moves: Vec::new(),
            result: GameResult::Ongoing,
            finished: false,
        };
        self.games.insert(game.id.clone(), stored);
        self.order.push(game.id.clone());
    }

    fn append_move(&mut self, game_id: &GameId, mv: &str, _position: &str) {
        if let Some(stored) = self.games.get_mut(game_id) {
            stored.moves.push(mv.to_owned());
        }
    }

    fn finish_game(&mut self, game: &GameSession) {
        if let Some(stored) = self.games.get_mut(&game.id) {
            stored.result = game.result;
            stored.finished = true;
        }
    }

    fn stats(&self, user_id: i64) -> RawStats {
        let mut stats = RawStats::default();
        for stored in self.games.values().filter(|g| g.finished) {
            let my_color = if stored.white_user == Some(user_id) {
                Force::White
            } else if stored.black_user == Some(user_id) {
                Force::Black
            } else {
                continue;
            };
            match stored.result.winner() {
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
            .filter(|(_, g)| g.finished)
            .filter_map(|(game_id, g)| {
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
                    date: TEST_DATE.to_owned(),
                    is_ai_game: g.is_ai_game,
                })
            })
            .take(limit)
            .collect()
    }

    fn replay(&self, game_id: &GameId) -> Option<ReplayData> {
        let stored = self.games.get(game_id)?;
        Some(ReplayData {
            game_id: game_id.0.clone(),
            white_username: stored.white_name.clone(),
            black_username: stored.black_name.clone(),
            moves: stored.moves.clone(),
            result: stored.result,
            date: TEST_DATE.to_owned(),
        })
    }
}
