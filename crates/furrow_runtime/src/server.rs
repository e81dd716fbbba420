//! Headless dedicated server
//!
//! Owns the world, accepts TCP clients and runs turns at a fixed tick.
//! Each completed round is written to the save directory.

use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use furrow_core::event::EventBus;
use furrow_game::events::TurnEnded;
use furrow_game::TurnController;
use furrow_net::transport::accept_loop;
use furrow_net::{ServerHub, Session};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tracing::{error, info};

use crate::launch::Launch;

const TICK: Duration = Duration::from_millis(50);

pub fn run(runtime: &Runtime, launch: &Launch) -> Result<()> {
    let mut save = launch.world()?;
    let hub = ServerHub::new();

    let listener = runtime
        .block_on(TcpListener::bind(&launch.address))
        .with_context(|| format!("cannot listen on {}", launch.address))?;
    info!(address = %launch.address, players = save.players.len(), "dedicated server listening");
    let handle = hub.handle();
    runtime.spawn(async move {
        if let Err(err) = accept_loop(listener, handle).await {
            error!(%err, "accept loop stopped");
        }
    });

    let mut session = Session::Server(hub);
    let mut events = EventBus::new();
    let round_done = Rc::new(Cell::new(false));
    let flag = round_done.clone();
    events.subscribe::<TurnEnded, _>(move |event| {
        if event.new_round {
            flag.set(true);
        }
    });

    let mut turns = TurnController::new();
    turns.resume(&save);
    let mut last = Instant::now();
    loop {
        thread::sleep(TICK);
        let now = Instant::now();
        let dt = now - last;
        last = now;

        turns.handle_messages(&mut save, &mut session, &mut events)?;
        turns.update(dt, &mut save, &mut session, &mut events)?;

        if round_done.replace(false) {
            save.save_to_dir(&launch.save_dir)?;
        }
    }
}
