use std::net::{TcpListener, TcpStream};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use arena_chess::engine::AiEngine;
use arena_chess::message::ClientRequest;
use arena_chess::server::{AiDriver, AiTask, IncomingEvent, ServerOptions, ServerState};
use arena_chess::session::Clients;
use instant::Instant;
use log::{error, info, warn};

use crate::chess_oracle::{ChessOracle, MaterialEvaluator, TacticalRanker};
use crate::memory_store::{MemoryAccounts, MemoryGameStore};
use crate::network::{self, FrameStream, ReadEvent};
use crate::server_config::ServerConfig;


const TICK_INTERVAL: Duration = Duration::from_millis(100);

// Hands AI tasks to the worker thread. The worker posts results back into the
// main event channel, so search never blocks request dispatch.
struct ChannelAiDriver {
    tasks_tx: mpsc::Sender<AiTask>,
}

impl AiDriver for ChannelAiDriver {
    fn request(&self, task: AiTask) {
        let _ = self.tasks_tx.send(task);
    }
}

pub fn run(config: ServerConfig) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::sync_channel(100_000);

    let tx_tick = tx.clone();
    thread::spawn(move || loop {
        thread::sleep(TICK_INTERVAL);
        if tx_tick.send(IncomingEvent::Tick).is_err() {
            break;
        }
    });

    let tx_terminate = tx.clone();
    ctrlc::set_handler(move || {
        let _ = tx_terminate.send(IncomingEvent::Terminate);
    })
    .context("Cannot set Ctrl-C handler")?;

    let oracle = Arc::new(ChessOracle::new());
    let (ai_tasks_tx, ai_tasks_rx) = mpsc::channel::<AiTask>();
    let engine = AiEngine::new(oracle.clone(), Arc::new(MaterialEvaluator))
        .with_classifier(Arc::new(TacticalRanker));
    let tx_ai = tx.clone();
    thread::spawn(move || {
        let mut rng = rand::rng();
        for task in ai_tasks_rx {
            let mv = match engine.select_move(&task.position, task.difficulty, &mut rng) {
                Ok(mv) => Some(mv),
                Err(err) => {
                    warn!("AI cannot move in game {}: {err}", task.game_id);
                    None
                }
            };
            let _ = tx_ai.send(IncomingEvent::AiMove {
                game_id: task.game_id,
                ply: task.ply,
                mv,
            });
        }
    });

    let clients = Arc::new(Mutex::new(Clients::new()));
    let options = ServerOptions {
        move_time_limit: config.move_time_limit,
        time_control: config.time_control,
    };
    let mut server_state = ServerState::new(
        options,
        Arc::clone(&clients),
        oracle,
        Box::new(ChannelAiDriver { tasks_tx: ai_tasks_tx }),
        Box::new(MemoryAccounts::new()),
        Box::new(MemoryGameStore::new()),
    );
    thread::spawn(move || {
        for event in rx {
            if matches!(event, IncomingEvent::Terminate) {
                info!("Shutting down");
                std::process::exit(0);
            }
            server_state.apply_event(event, Instant::now());
        }
        panic!("Unexpected end of events stream");
    });

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .with_context(|| format!("Cannot listen on port {}", config.port))?;
    info!("Listening on port {}", config.port);
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let tx = tx.clone();
                let clients = Arc::clone(&clients);
                thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, &tx, &clients) {
                        warn!("Connection aborted: {err:#}");
                    }
                });
            }
            Err(err) => error!("Cannot accept connection: {err}"),
        }
    }
    Ok(())
}

fn handle_connection(
    stream: TcpStream,
    tx: &mpsc::SyncSender<IncomingEvent>,
    clients: &Arc<Mutex<Clients>>,
) -> anyhow::Result<()> {
    let peer_addr = stream.peer_addr().context("Cannot get peer address")?;
    info!("Client connected: {peer_addr}");

    let (client_tx, client_rx) = mpsc::channel();
    let client_id = clients.lock().unwrap().add_client(client_tx);

    // The writer thread ends when the server removes the client and the push
    // channel closes.
    let mut write_stream = stream.try_clone().context("Cannot clone TCP stream")?;
    thread::spawn(move || {
        for push in client_rx {
            if network::write_frame(&mut write_stream, &push.encode()).is_err() {
                break;
            }
        }
    });

    let mut frames = FrameStream::new(stream);
    let disconnect_reason = loop {
        match frames.next_event() {
            Ok(ReadEvent::Frame(frame)) => match ClientRequest::decode(&frame) {
                Ok(request) => tx.send(IncomingEvent::Network(client_id, request))?,
                Err(err) => break format!("protocol violation: {err}"),
            },
            Ok(ReadEvent::Closed) => break "peer closed the connection".to_owned(),
            Err(err) => break format!("{err:#}"),
        }
    };
    info!("Client {client_id} ({peer_addr}) disconnected: {disconnect_reason}");
    tx.send(IncomingEvent::Disconnect(client_id))?;
    Ok(())
}
