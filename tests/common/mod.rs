#![allow(dead_code)]

use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use arena_chess::message::{
    ClientRequest, GameOver, GameStart, LoginRequest, RegisterRequest, ServerPush,
};
use arena_chess::server::{AiTask, IncomingEvent, ServerOptions, ServerState};
use arena_chess::session::{ClientId, Clients};
use arena_chess::test_util::{MemoryStore, QueueAiDriver, SharedAccounts, ToyOracle};
use instant::Instant;

pub struct TestServer {
    pub state: ServerState,
    pub clients: Arc<Mutex<Clients>>,
    pub accounts: SharedAccounts,
    pub ai: QueueAiDriver,
    pub now: Instant,
}

pub struct TestClient {
    pub id: ClientId,
    rx: mpsc::Receiver<ServerPush>,
}

impl TestClient {
    pub fn drain(&self) -> Vec<ServerPush> {
        self.rx.try_iter().collect()
    }
}

impl TestServer {
    pub fn new(oracle: ToyOracle) -> Self {
        let clients = Arc::new(Mutex::new(Clients::new()));
        let accounts = SharedAccounts::new();
        let ai = QueueAiDriver::new();
        let state = ServerState::new(
            ServerOptions::default(),
            Arc::clone(&clients),
            Arc::new(oracle),
            Box::new(ai.clone()),
            Box::new(accounts.clone()),
            Box::new(MemoryStore::new()),
        );
        TestServer { state, clients, accounts, ai, now: Instant::now() }
    }

    pub fn connect(&mut self) -> TestClient {
        let (tx, rx) = mpsc::channel();
        let id = self.clients.lock().unwrap().add_client(tx);
        TestClient { id, rx }
    }

    pub fn send(&mut self, client: &TestClient, request: ClientRequest) {
        self.state.apply_event(IncomingEvent::Network(client.id, request), self.now);
    }

    pub fn disconnect(&mut self, client: &TestClient) {
        self.state.apply_event(IncomingEvent::Disconnect(client.id), self.now);
    }

    pub fn tick(&mut self) {
        self.state.apply_event(IncomingEvent::Tick, self.now);
    }

    pub fn advance(&mut self, duration: Duration) {
        self.now += duration;
    }

    pub fn ai_reply(&mut self, task: AiTask, mv: Option<&str>) {
        self.state.apply_event(
            IncomingEvent::AiMove {
                game_id: task.game_id,
                ply: task.ply,
                mv: mv.map(str::to_owned),
            },
            self.now,
        );
    }

    // Registers a fresh account and logs the connection in. User ids are
    // assigned in registration order, starting from 1.
    pub fn login_user(&mut self, username: &str) -> TestClient {
        let client = self.connect();
        self.send(
            &client,
            ClientRequest::Register(RegisterRequest {
                username: username.to_owned(),
                password: "correct horse".to_owned(),
                display_name: username.to_owned(),
            }),
        );
        self.send(
            &client,
            ClientRequest::Login(LoginRequest {
                username: username.to_owned(),
                password: "correct horse".to_owned(),
            }),
        );
        let pushes = client.drain();
        let login_ok = pushes.iter().any(|push| {
            matches!(push, ServerPush::LoginResult(result) if result.success)
        });
        assert!(login_ok, "login failed for {username}: {pushes:?}");
        client
    }
}

pub fn find_game_start(pushes: &[ServerPush]) -> Option<GameStart> {
    pushes.iter().find_map(|push| match push {
        ServerPush::GameStart(start) => Some(start.clone()),
        _ => None,
    })
}

pub fn find_game_over(pushes: &[ServerPush]) -> Option<GameOver> {
    pushes.iter().find_map(|push| match push {
        ServerPush::GameOver(over) => Some(over.clone()),
        _ => None,
    })
}
