// The server core. All mutations go through `ServerState::apply_event`, which
// the transport layer feeds from a single event channel, so per-game update
// ordering needs no further synchronization. AI search never runs here: when an
// AI seat has to reply, a task goes out through the `AiDriver` seam and the
// chosen move comes back later as a synthetic `AiMove` event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use instant::Instant;
use rand::seq::IndexedRandom;

use crate::clock::{TimeControl, DEFAULT_MOVE_TIME_LIMIT};
use crate::engine::Difficulty;
use crate::error::RequestError;
use crate::force::Force;
use crate::game::{GameId, GameSession, GameStatus, Seat};
use crate::matchmaking::Matchmaking;
use crate::message::{
    ChallengeAccepted, ChallengeDeclined, ChallengeReceived, ChallengeRequest, ClientRequest,
    DrawOfferDeclined, DrawOfferReceived, FindAiMatchRequest, GameOver, GameStart, GameStateUpdate,
    InvalidMove, LoginRequest, LoginResult, MakeMoveRequest, MatchFound, OnlineUser,
    OnlineUsersList, PersonalOutcome, RegisterRequest, RegisterResult, ServerPush, StatsResponse,
};
use crate::oracle::{MoveOutcome, OracleError, RulesOracle};
use crate::rating::{updated_ratings, INITIAL_RATING};
use crate::session::{ClientId, Clients, UserInfo};
use crate::store::{AccountError, Accounts, GameStore};


const HISTORY_LIMIT: usize = 10;

#[derive(Clone, Debug)]
pub enum IncomingEvent {
    Network(ClientId, ClientRequest),
    // Result of an AI search posted back by the driver. `mv` is `None` when the
    // search could not produce a move.
    AiMove { game_id: GameId, ply: usize, mv: Option<String> },
    Disconnect(ClientId),
    Tick,
    Terminate,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AiTask {
    pub game_id: GameId,
    pub ply: usize,
    pub position: String,
    pub difficulty: Difficulty,
}

pub trait AiDriver {
    fn request(&self, task: AiTask);
}

#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub move_time_limit: Duration,
    pub time_control: TimeControl,
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            move_time_limit: DEFAULT_MOVE_TIME_LIMIT,
            time_control: TimeControl::default(),
        }
    }
}

pub struct ServerState {
    clients: Arc<Mutex<Clients>>,
    matchmaking: Matchmaking,
    games: HashMap<GameId, GameSession>,
    oracle: Arc<dyn RulesOracle + Send + Sync>,
    ai: Box<dyn AiDriver + Send>,
    accounts: Box<dyn Accounts + Send>,
    store: Box<dyn GameStore + Send>,
    options: ServerOptions,
    next_game_seq: u64,
}

impl ServerState {
    pub fn new(
        options: ServerOptions,
        clients: Arc<Mutex<Clients>>,
        oracle: Arc<dyn RulesOracle + Send + Sync>,
        ai: Box<dyn AiDriver + Send>,
        accounts: Box<dyn Accounts + Send>,
        store: Box<dyn GameStore + Send>,
    ) -> Self {
        ServerState {
            clients,
            matchmaking: Matchmaking::new(),
            games: HashMap::new(),
            oracle,
            ai,
            accounts,
            store,
            options,
            next_game_seq: 0,
        }
    }

    pub fn game(&self, game_id: &GameId) -> Option<&GameSession> {
        self.games.get(game_id)
    }

    pub fn apply_event(&mut self, event: IncomingEvent, now: Instant) {
        let clients_arc = Arc::clone(&self.clients);
        let mut clients = clients_arc.lock().unwrap();
        match event {
            IncomingEvent::Network(id, request) => {
                if let Err(err) = self.on_request(&mut clients, id, request, now) {
                    clients.send_to(id, ServerPush::Error(err));
                }
            }
            IncomingEvent::AiMove { game_id, ply, mv } => {
                self.on_ai_move(&mut clients, &game_id, ply, mv, now);
            }
            IncomingEvent::Disconnect(id) => self.on_disconnect(&mut clients, id),
            IncomingEvent::Tick => self.timeout_sweep(&mut clients, now),
            IncomingEvent::Terminate => {}
        }
    }

    fn on_request(
        &mut self,
        clients: &mut Clients,
        id: ClientId,
        request: ClientRequest,
        now: Instant,
    ) -> Result<(), RequestError> {
        match request {
            ClientRequest::Register(payload) => self.on_register(clients, id, payload),
            ClientRequest::Login(payload) => self.on_login(clients, id, payload),
            ClientRequest::GetOnlineUsers => {
                self.require_auth(clients, id)?;
                let roster = self.roster(clients);
                clients.send_to(id, ServerPush::OnlineUsersList(roster));
                Ok(())
            }
            ClientRequest::FindMatch => self.on_find_match(clients, id, now),
            ClientRequest::CancelFindMatch => {
                self.require_auth(clients, id)?;
                self.matchmaking.cancel(id);
                Ok(())
            }
            ClientRequest::FindAiMatch(payload) => self.on_find_ai_match(clients, id, payload, now),
            ClientRequest::MakeMove(payload) => self.on_make_move(clients, id, payload, now),
            ClientRequest::Resign(payload) => {
                let game_id = GameId(payload.game_id);
                let force = self.playable_game(clients, id, &game_id)?;
                let game = self.games.get_mut(&game_id).unwrap();
                game.resign(force);
                log::info!("game {game_id}: {force:?} resigned");
                self.finish(clients, &game_id);
                Ok(())
            }
            ClientRequest::OfferDraw(payload) => {
                let game_id = GameId(payload.game_id);
                let force = self.playable_game(clients, id, &game_id)?;
                let game = &self.games[&game_id];
                if game.is_ai_game {
                    return Ok(());
                }
                let username = self.username_of(clients, id);
                let opponent = game.seats[force.opponent()].client_id().unwrap();
                clients.send_to(
                    opponent,
                    ServerPush::DrawOfferReceived(DrawOfferReceived {
                        game_id: game_id.0,
                        message: format!("{username} offers a draw"),
                    }),
                );
                Ok(())
            }
            ClientRequest::AcceptDraw(payload) => {
                let game_id = GameId(payload.game_id);
                self.playable_game(clients, id, &game_id)?;
                if self.games[&game_id].is_ai_game {
                    return Ok(());
                }
                self.games.get_mut(&game_id).unwrap().agree_draw();
                log::info!("game {game_id}: draw agreed");
                self.finish(clients, &game_id);
                Ok(())
            }
            ClientRequest::DeclineDraw(payload) => {
                let game_id = GameId(payload.game_id);
                let force = self.playable_game(clients, id, &game_id)?;
                let game = &self.games[&game_id];
                if game.is_ai_game {
                    return Ok(());
                }
                let username = self.username_of(clients, id);
                let opponent = game.seats[force.opponent()].client_id().unwrap();
                clients.send_to(
                    opponent,
                    ServerPush::DrawOfferDeclined(DrawOfferDeclined {
                        game_id: game_id.0,
                        message: format!("{username} declined the draw offer"),
                    }),
                );
                Ok(())
            }
            ClientRequest::GetStats => {
                let user = self.require_auth(clients, id)?;
                let stats = self.store.stats(user.user_id);
                let rating = self.accounts.rating(user.user_id).unwrap_or(user.rating);
                clients.send_to(
                    id,
                    ServerPush::StatsResponse(StatsResponse {
                        user_id: user.user_id,
                        username: user.username,
                        rating,
                        wins: stats.wins,
                        losses: stats.losses,
                        draws: stats.draws,
                        total_games: stats.total(),
                        win_rate: stats.win_rate(),
                    }),
                );
                Ok(())
            }
            ClientRequest::GetHistory => {
                let user = self.require_auth(clients, id)?;
                let games = self.store.history(user.user_id, HISTORY_LIMIT);
                clients.send_to(
                    id,
                    ServerPush::HistoryResponse(crate::message::HistoryResponse { games }),
                );
                Ok(())
            }
            ClientRequest::GetReplay(payload) => {
                self.require_auth(clients, id)?;
                let replay = self
                    .store
                    .replay(&GameId(payload.game_id))
                    .ok_or(RequestError::GameNotFound)?;
                clients.send_to(id, ServerPush::ReplayData(replay));
                Ok(())
            }
            ClientRequest::Challenge(payload) => self.on_challenge(clients, id, payload, now),
            ClientRequest::AcceptChallenge => self.on_accept_challenge(clients, id, now),
            ClientRequest::DeclineChallenge => {
                self.require_auth(clients, id)?;
                if let Some(challenge) = self.matchmaking.take_challenge(id) {
                    clients.send_to(
                        challenge.challenger,
                        ServerPush::ChallengeDeclined(ChallengeDeclined {
                            reason: "challenge declined".to_owned(),
                        }),
                    );
                }
                Ok(())
            }
        }
    }

    fn on_register(
        &mut self,
        clients: &mut Clients,
        id: ClientId,
        payload: RegisterRequest,
    ) -> Result<(), RequestError> {
        let result = match self.accounts.register(
            &payload.username,
            &payload.password,
            &payload.display_name,
        ) {
            Ok(user) => {
                log::info!("registered user {} ({})", user.username, user.user_id);
                RegisterResult { success: true, user_id: Some(user.user_id), error: None }
            }
            Err(AccountError::Storage(message)) => {
                return Err(RequestError::Internal { message });
            }
            Err(err) => RegisterResult { success: false, user_id: None, error: Some(err.to_string()) },
        };
        clients.send_to(id, ServerPush::RegisterResult(result));
        Ok(())
    }

    fn on_login(
        &mut self,
        clients: &mut Clients,
        id: ClientId,
        payload: LoginRequest,
    ) -> Result<(), RequestError> {
        if clients[id].session.is_authenticated() {
            return Err(RequestError::AlreadyLoggedIn);
        }
        let result = match self.accounts.login(&payload.username, &payload.password) {
            Ok(user) => {
                if clients.find_by_user_id(user.user_id).is_some() {
                    LoginResult {
                        success: false,
                        error: Some("account is already logged in elsewhere".to_owned()),
                        ..LoginResult::default()
                    }
                } else {
                    clients[id].session.authenticate(user.clone());
                    log::info!("client {id}: logged in as {}", user.username);
                    LoginResult {
                        success: true,
                        user_id: Some(user.user_id),
                        username: Some(user.username),
                        display_name: Some(user.display_name),
                        rating: Some(user.rating),
                        error: None,
                    }
                }
            }
            Err(AccountError::Storage(message)) => {
                return Err(RequestError::Internal { message });
            }
            Err(err) => LoginResult {
                success: false,
                error: Some(err.to_string()),
                ..LoginResult::default()
            },
        };
        let logged_in = result.success;
        clients.send_to(id, ServerPush::LoginResult(result));
        if logged_in {
            self.broadcast_roster(clients);
        }
        Ok(())
    }

    fn on_find_match(
        &mut self,
        clients: &mut Clients,
        id: ClientId,
        now: Instant,
    ) -> Result<(), RequestError> {
        self.require_auth(clients, id)?;
        if clients[id].session.game_id.is_some() || self.matchmaking.is_queued(id) {
            return Ok(());
        }
        self.matchmaking.enqueue(id);
        while let Some((white, black)) = self.matchmaking.take_pair() {
            clients.send_to(white, self.match_found(clients, black));
            clients.send_to(black, self.match_found(clients, white));
            self.start_pvp_game(clients, white, black, now);
        }
        Ok(())
    }

    fn on_find_ai_match(
        &mut self,
        clients: &mut Clients,
        id: ClientId,
        payload: FindAiMatchRequest,
        now: Instant,
    ) -> Result<(), RequestError> {
        let user = self.require_auth(clients, id)?;
        if clients[id].session.game_id.is_some() {
            return Ok(());
        }
        self.matchmaking.cancel(id);
        self.next_game_seq += 1;
        let game_id = GameId(format!("ai_{}", self.next_game_seq));
        let game = GameSession::new_vs_ai(
            game_id.clone(),
            (id, user),
            payload.color,
            payload.difficulty,
            self.oracle.starting_position(),
            self.options.time_control,
            now,
        );
        log::info!(
            "game {game_id}: vs AI ({}), human plays {:?}",
            payload.difficulty.label(),
            payload.color
        );
        self.store.create_game(&game);
        clients[id].session.enter_game(game_id.clone());
        clients.send_to(
            id,
            ServerPush::GameStart(GameStart {
                game_id: game_id.0.clone(),
                color: payload.color,
                opponent_username: format!("AI Bot ({})", payload.difficulty.label()),
                opponent_rating: payload.difficulty.nominal_rating(),
                time_control: game.time_control,
                position: game.position.clone(),
            }),
        );
        let position = game.position.clone();
        self.games.insert(game_id.clone(), game);
        if payload.color == Force::Black {
            self.ai.request(AiTask {
                game_id,
                ply: 0,
                position,
                difficulty: payload.difficulty,
            });
        }
        Ok(())
    }

    fn on_make_move(
        &mut self,
        clients: &mut Clients,
        id: ClientId,
        payload: MakeMoveRequest,
        now: Instant,
    ) -> Result<(), RequestError> {
        let game_id = GameId(payload.game_id);
        let force = self.playable_game(clients, id, &game_id)?;
        let game = self.games.get_mut(&game_id).unwrap();
        let turn = game
            .side_to_move(self.oracle.as_ref())
            .map_err(|err| RequestError::Internal { message: err.to_string() })?;
        if turn != force {
            return Err(RequestError::NotYourTurn);
        }
        match game.apply_move(self.oracle.as_ref(), &payload.mv, now) {
            Ok(outcome) => {
                self.after_move(clients, &game_id, &payload.mv, force, &outcome);
                Ok(())
            }
            Err(OracleError::IllegalMove { reason }) => {
                clients.send_to(
                    id,
                    ServerPush::InvalidMove(InvalidMove { game_id: game_id.0, reason }),
                );
                Ok(())
            }
            Err(err) => Err(RequestError::Internal { message: err.to_string() }),
        }
    }

    fn on_challenge(
        &mut self,
        clients: &mut Clients,
        id: ClientId,
        payload: ChallengeRequest,
        now: Instant,
    ) -> Result<(), RequestError> {
        let challenger = self.require_auth(clients, id)?;
        let target = clients.find_by_user_id(payload.target_user_id);
        let target = match target {
            Some(target) if target != id => target,
            _ => {
                let reason = if target.is_some() {
                    "you cannot challenge yourself".to_owned()
                } else {
                    "target is offline".to_owned()
                };
                clients.send_to(id, ServerPush::ChallengeDeclined(ChallengeDeclined { reason }));
                return Ok(());
            }
        };
        self.matchmaking.add_challenge(target, id, now);
        clients.send_to(
            target,
            ServerPush::ChallengeReceived(ChallengeReceived {
                challenger_id: challenger.user_id,
                challenger_username: challenger.username,
                challenger_rating: challenger.rating,
            }),
        );
        Ok(())
    }

    fn on_accept_challenge(
        &mut self,
        clients: &mut Clients,
        id: ClientId,
        now: Instant,
    ) -> Result<(), RequestError> {
        let acceptor = self.require_auth(clients, id)?;
        let Some(challenge) = self.matchmaking.take_challenge(id) else {
            return Ok(());
        };
        let challenger = challenge.challenger;
        if !clients.get(challenger).is_some_and(|c| c.session.is_authenticated()) {
            return Ok(());
        }
        // Either side may have started another game since the challenge was sent.
        if clients[id].session.game_id.is_some() || clients[challenger].session.game_id.is_some() {
            return Ok(());
        }
        self.matchmaking.cancel(id);
        self.matchmaking.cancel(challenger);
        clients.send_to(
            challenger,
            ServerPush::ChallengeAccepted(ChallengeAccepted { opponent_username: acceptor.username }),
        );
        self.start_pvp_game(clients, challenger, id, now);
        Ok(())
    }

    // The first client takes white.
    fn start_pvp_game(&mut self, clients: &mut Clients, white: ClientId, black: ClientId, now: Instant) {
        let white_user = clients[white].user().unwrap().clone();
        let black_user = clients[black].user().unwrap().clone();
        self.next_game_seq += 1;
        let game_id = GameId(format!("pvp_{}", self.next_game_seq));
        let game = GameSession::new_pvp(
            game_id.clone(),
            (white, white_user.clone()),
            (black, black_user.clone()),
            self.oracle.starting_position(),
            self.options.time_control,
            now,
        );
        log::info!("game {game_id}: {} vs {}", white_user.username, black_user.username);
        self.store.create_game(&game);
        clients[white].session.enter_game(game_id.clone());
        clients[black].session.enter_game(game_id.clone());
        for (force, client_id, opponent) in [
            (Force::White, white, &black_user),
            (Force::Black, black, &white_user),
        ] {
            clients.send_to(
                client_id,
                ServerPush::GameStart(GameStart {
                    game_id: game_id.0.clone(),
                    color: force,
                    opponent_username: opponent.username.clone(),
                    opponent_rating: opponent.rating,
                    time_control: game.time_control,
                    position: game.position.clone(),
                }),
            );
        }
        self.games.insert(game_id, game);
    }

    // Broadcasts the post-move state, archives the move and either finishes the
    // game or hands the turn to an AI seat.
    fn after_move(
        &mut self,
        clients: &mut Clients,
        game_id: &GameId,
        mv: &str,
        mover: Force,
        outcome: &MoveOutcome,
    ) {
        self.store.append_move(game_id, mv, &outcome.position);
        let game = &self.games[game_id];
        let update = ServerPush::GameStateUpdate(GameStateUpdate {
            game_id: game_id.0.clone(),
            position: outcome.position.clone(),
            last_move: mv.to_owned(),
            turn: mover.opponent(),
            in_check: outcome.in_check,
            game_over: outcome.game_over,
        });
        for (_, client_id) in game.human_seats() {
            clients.send_to(client_id, update.clone());
        }
        if game.status.is_terminal() {
            self.finish(clients, game_id);
            return;
        }
        let next_seat = &self.games[game_id].seats[mover.opponent()];
        if let Seat::Ai { difficulty } = next_seat {
            self.ai.request(AiTask {
                game_id: game_id.clone(),
                ply: self.games[game_id].moves.len(),
                position: outcome.position.clone(),
                difficulty: *difficulty,
            });
        }
    }

    fn finish(&mut self, clients: &mut Clients, game_id: &GameId) {
        let game = &self.games[game_id];
        if game.affects_ratings() {
            let white_id = game.seats[Force::White].user().unwrap().user_id;
            let black_id = game.seats[Force::Black].user().unwrap().user_id;
            let white = self.accounts.rating(white_id).unwrap_or(INITIAL_RATING);
            let black = self.accounts.rating(black_id).unwrap_or(INITIAL_RATING);
            let (new_white, new_black) = updated_ratings(white, black, game.result);
            self.accounts.set_rating(white_id, new_white);
            self.accounts.set_rating(black_id, new_black);
            for (user_id, rating) in [(white_id, new_white), (black_id, new_black)] {
                if let Some(client_id) = clients.find_by_user_id(user_id) {
                    if let Some(user) = clients[client_id].session.user.as_mut() {
                        user.rating = rating;
                    }
                }
            }
            log::info!(
                "game {game_id}: ratings updated {white}->{new_white}, {black}->{new_black}"
            );
        }
        let game = &self.games[game_id];
        self.store.finish_game(game);
        let reason = game.reason.map(|r| r.to_string()).unwrap_or_default();
        let winner = game.result.winner();
        for (force, client_id) in game.human_seats() {
            let outcome = match winner {
                Some(w) if w == force => PersonalOutcome::YouWin,
                Some(_) => PersonalOutcome::YouLoss,
                None => PersonalOutcome::Draw,
            };
            let message = match outcome {
                PersonalOutcome::YouWin => format!("You win! {reason}"),
                PersonalOutcome::YouLoss => format!("You lost! {reason}"),
                PersonalOutcome::Draw => format!("Game ended in a draw: {reason}"),
            };
            clients.send_to(
                client_id,
                ServerPush::GameOver(GameOver {
                    game_id: game_id.0.clone(),
                    result: game.result,
                    outcome,
                    message,
                    reason: reason.clone(),
                }),
            );
            if let Some(client) = clients.get_mut(client_id) {
                client.session.leave_game();
            }
        }
        log::info!("game {game_id}: over, {:?}", self.games[game_id].result);
    }

    fn on_ai_move(
        &mut self,
        clients: &mut Clients,
        game_id: &GameId,
        ply: usize,
        mv: Option<String>,
        now: Instant,
    ) {
        let Some(game) = self.games.get_mut(game_id) else {
            return;
        };
        // Staleness guard: the game may have ended or advanced (e.g. by the
        // timeout sweeper) since the task was issued.
        if game.status.is_terminal() || game.moves.len() != ply {
            return;
        }
        let Ok(mover) = game.side_to_move(self.oracle.as_ref()) else {
            log::error!("game {game_id}: unreadable position {:?}", game.position);
            return;
        };
        if !game.seats[mover].is_ai() {
            return;
        }
        let applied = match mv {
            Some(mv) => match game.apply_move(self.oracle.as_ref(), &mv, now) {
                Ok(outcome) => Some((mv, outcome)),
                Err(err) => {
                    log::warn!("game {game_id}: AI produced unplayable move: {err}");
                    None
                }
            },
            None => None,
        };
        let (mv, outcome) = match applied {
            Some(applied) => applied,
            None => {
                let game = self.games.get_mut(game_id).unwrap();
                let legal_moves = self.oracle.legal_moves(&game.position);
                let Some(fallback) = legal_moves.choose(&mut rand::rng()).cloned() else {
                    log::error!("game {game_id}: no legal moves for the AI seat");
                    return;
                };
                match game.apply_move(self.oracle.as_ref(), &fallback, now) {
                    Ok(outcome) => (fallback, outcome),
                    Err(err) => {
                        log::error!("game {game_id}: fallback move failed: {err}");
                        return;
                    }
                }
            }
        };
        self.after_move(clients, game_id, &mv, mover, &outcome);
    }

    fn timeout_sweep(&mut self, clients: &mut Clients, now: Instant) {
        let stale: Vec<GameId> = self
            .games
            .values()
            .filter(|game| {
                game.status == GameStatus::Active
                    && !game.is_ai_game
                    && game.clock.is_stale(now, self.options.move_time_limit)
            })
            .map(|game| game.id.clone())
            .collect();
        for game_id in stale {
            let game = self.games.get_mut(&game_id).unwrap();
            let Ok(mover) = game.side_to_move(self.oracle.as_ref()) else {
                game.clock.register_move(now);
                continue;
            };
            let legal_moves = self.oracle.legal_moves(&game.position);
            let Some(mv) = legal_moves.choose(&mut rand::rng()).cloned() else {
                game.clock.register_move(now);
                continue;
            };
            log::info!("game {game_id}: forcing move {mv:?} for {mover:?} on timeout");
            match game.apply_move(self.oracle.as_ref(), &mv, now) {
                Ok(outcome) => self.after_move(clients, &game_id, &mv, mover, &outcome),
                Err(err) => {
                    log::error!("game {game_id}: forced move failed: {err}");
                    game.clock.register_move(now);
                }
            }
        }
    }

    fn on_disconnect(&mut self, clients: &mut Clients, id: ClientId) {
        // A PvP game keeps its seat binding: the sweeper keeps the game moving
        // whether or not the player returns. An AI game has no other human left
        // to keep it alive, so the vacated seat resigns.
        let removed = clients.remove_client(id);
        if let Some(game_id) = removed.as_ref().and_then(|c| c.session.game_id.clone()) {
            if let Some(game) = self.games.get_mut(&game_id) {
                if game.is_ai_game && !game.status.is_terminal() {
                    if let Some(force) = game.seat_of(id) {
                        log::info!("game {game_id}: player left an AI game, resigning");
                        game.resign(force);
                        self.finish(clients, &game_id);
                    }
                }
            }
        }
        self.matchmaking.remove_client(id);
        if let Some(client) = removed {
            if let Some(user) = client.user() {
                log::info!("client {id}: {} disconnected", user.username);
                self.broadcast_roster(clients);
            }
        }
    }

    fn require_auth(&self, clients: &Clients, id: ClientId) -> Result<UserInfo, RequestError> {
        clients
            .get(id)
            .and_then(|client| client.user())
            .cloned()
            .ok_or(RequestError::NotAuthenticated)
    }

    // Auth, participation and liveness checks shared by all in-game requests.
    // Returns the seat the client occupies.
    fn playable_game(
        &self,
        clients: &Clients,
        id: ClientId,
        game_id: &GameId,
    ) -> Result<Force, RequestError> {
        self.require_auth(clients, id)?;
        let game = self.games.get(game_id).ok_or(RequestError::GameNotFound)?;
        let force = game.seat_of(id).ok_or(RequestError::NotAParticipant)?;
        if game.status.is_terminal() {
            return Err(RequestError::GameAlreadyOver);
        }
        Ok(force)
    }

    fn roster(&self, clients: &Clients) -> OnlineUsersList {
        let mut users: Vec<OnlineUser> = clients
            .iter()
            .filter_map(|(_, client)| client.user())
            .map(|user| OnlineUser {
                user_id: user.user_id,
                username: user.username.clone(),
                display_name: user.display_name.clone(),
                rating: user.rating,
            })
            .collect();
        users.sort_by_key(|user| user.user_id);
        OnlineUsersList { users }
    }

    fn broadcast_roster(&self, clients: &Clients) {
        clients.broadcast(&ServerPush::OnlineUsersList(self.roster(clients)));
    }

    fn match_found(&self, clients: &Clients, opponent: ClientId) -> ServerPush {
        let user = clients[opponent].user().unwrap();
        ServerPush::MatchFound(MatchFound {
            opponent_id: user.user_id,
            opponent_username: user.username.clone(),
            opponent_rating: user.rating,
        })
    }

    fn username_of(&self, clients: &Clients, id: ClientId) -> String {
        clients
            .get(id)
            .and_then(|client| client.user())
            .map(|user| user.username.clone())
            .unwrap_or_default()
    }
}
