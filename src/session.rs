use std::collections::HashMap;
use std::sync::mpsc;
use std::{fmt, ops};

use serde::{Deserialize, Serialize};

use crate::game::GameId;
use crate::message::ServerPush;


#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ClientId(pub usize);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionState {
    Connected,
    Authenticated,
    InGame,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    pub rating: i32,
}

#[derive(Clone, Debug)]
pub struct ClientSession {
    pub state: SessionState,
    pub user: Option<UserInfo>,
    pub game_id: Option<GameId>,
}

impl ClientSession {
    pub fn new() -> Self {
        ClientSession { state: SessionState::Connected, user: None, game_id: None }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self.state, SessionState::Connected)
    }

    pub fn authenticate(&mut self, user: UserInfo) {
        self.state = SessionState::Authenticated;
        self.user = Some(user);
    }

    pub fn enter_game(&mut self, game_id: GameId) {
        self.state = SessionState::InGame;
        self.game_id = Some(game_id);
    }

    pub fn leave_game(&mut self) {
        if self.state == SessionState::InGame {
            self.state = SessionState::Authenticated;
        }
        self.game_id = None;
    }
}

pub struct Client {
    pub events_tx: mpsc::Sender<ServerPush>,
    pub session: ClientSession,
}

impl Client {
    pub fn send(&self, push: ServerPush) {
        // The client could have disconnected between the moment the event was
        // queued and the moment it was processed.
        let _ = self.events_tx.send(push);
    }

    pub fn user(&self) -> Option<&UserInfo> { self.session.user.as_ref() }
}

#[derive(Default)]
pub struct Clients {
    map: HashMap<ClientId, Client>,
}

impl Clients {
    pub fn new() -> Self {
        Clients { map: HashMap::new() }
    }

    pub fn add_client(&mut self, events_tx: mpsc::Sender<ServerPush>) -> ClientId {
        let client = Client { events_tx, session: ClientSession::new() };
        let mut id = ClientId(rand::random::<u64>() as usize);
        while self.map.contains_key(&id) {
            id = ClientId(rand::random::<u64>() as usize);
        }
        assert!(self.map.insert(id, client).is_none());
        id
    }

    pub fn remove_client(&mut self, id: ClientId) -> Option<Client> {
        self.map.remove(&id)
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.map.get(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.map.get_mut(&id)
    }

    pub fn send_to(&self, id: ClientId, push: ServerPush) {
        if let Some(client) = self.map.get(&id) {
            client.send(push);
        }
    }

    pub fn broadcast(&self, push: &ServerPush) {
        for client in self.map.values() {
            client.send(push.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClientId, &Client)> {
        self.map.iter().map(|(id, client)| (*id, client))
    }

    pub fn find_by_user_id(&self, user_id: i64) -> Option<ClientId> {
        self.map
            .iter()
            .find(|(_, client)| client.user().is_some_and(|u| u.user_id == user_id))
            .map(|(id, _)| *id)
    }
}

impl ops::Index<ClientId> for Clients {
    type Output = Client;
    fn index(&self, id: ClientId) -> &Client { &self.map[&id] }
}

impl ops::IndexMut<ClientId> for Clients {
    fn index_mut(&mut self, id: ClientId) -> &mut Client { self.map.get_mut(&id).unwrap() }
}
