//! Server hub and client endpoints
//!
//! The hub owns the single inbound queue drained by the game thread and a
//! concurrent map of per-client outbound queues written by broadcasts.
//! Network tasks only hold a [`HubHandle`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::message::Message;
use crate::{ClientId, NetError};

/// A message received from a client.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub from: ClientId,
    pub message: Message,
}

/// Cloneable, `Send` view of a hub for network tasks.
#[derive(Clone)]
pub struct HubHandle {
    clients: Arc<DashMap<ClientId, UnboundedSender<Message>>>,
    inbound: UnboundedSender<Inbound>,
    next_id: Arc<AtomicU64>,
}

impl HubHandle {
    /// Add a client; returns its id and the queue of messages to send it.
    pub fn register(&self) -> (ClientId, UnboundedReceiver<Message>) {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.insert(id, tx);
        info!(%id, "client connected");
        (id, rx)
    }

    pub fn unregister(&self, id: ClientId) {
        if self.clients.remove(&id).is_some() {
            info!(%id, "client disconnected");
        }
    }

    /// Queue a client message for the game thread.
    pub fn submit(&self, from: ClientId, message: Message) -> Result<(), NetError> {
        self.inbound
            .send(Inbound { from, message })
            .map_err(|_| NetError::Closed)
    }

    pub fn inbound_sender(&self) -> UnboundedSender<Inbound> {
        self.inbound.clone()
    }
}

pub struct ServerHub {
    handle: HubHandle,
    inbound: UnboundedReceiver<Inbound>,
}

impl ServerHub {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            handle: HubHandle {
                clients: Arc::new(DashMap::new()),
                inbound: tx,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            inbound: rx,
        }
    }

    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    /// Connect a client living in the same process.
    pub fn connect_local(&self) -> ClientEndpoint {
        let (id, inbound) = self.handle.register();
        ClientEndpoint {
            id,
            outbound: self.handle.inbound_sender(),
            inbound,
        }
    }

    pub fn client_count(&self) -> usize {
        self.handle.clients.len()
    }

    pub fn send_to(&self, id: ClientId, message: Message) -> Result<(), NetError> {
        let client = self
            .handle
            .clients
            .get(&id)
            .ok_or(NetError::UnknownClient(id))?;
        client.send(message).map_err(|_| NetError::Closed)
    }

    /// Send `message` to every client; closed connections are dropped.
    /// Returns how many clients it reached.
    pub fn broadcast(&self, message: &Message) -> usize {
        let mut closed = Vec::new();
        let mut reached = 0;
        for client in self.handle.clients.iter() {
            if client.value().send(message.clone()).is_ok() {
                reached += 1;
            } else {
                closed.push(*client.key());
            }
        }
        for id in closed {
            self.handle.unregister(id);
        }
        debug!(reached, "broadcast");
        reached
    }

    /// Everything received since the last call, in arrival order.
    pub fn drain(&mut self) -> Vec<Inbound> {
        let mut messages = Vec::new();
        loop {
            match self.inbound.try_recv() {
                Ok(message) => messages.push(message),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        messages
    }
}

impl Default for ServerHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A client's side of the connection.
pub struct ClientEndpoint {
    id: ClientId,
    outbound: UnboundedSender<Inbound>,
    inbound: UnboundedReceiver<Message>,
}

impl ClientEndpoint {
    pub fn new(
        id: ClientId,
        outbound: UnboundedSender<Inbound>,
        inbound: UnboundedReceiver<Message>,
    ) -> Self {
        Self {
            id,
            outbound,
            inbound,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn send(&self, message: Message) -> Result<(), NetError> {
        self.outbound
            .send(Inbound {
                from: self.id,
                message,
            })
            .map_err(|_| NetError::Closed)
    }

    pub fn drain(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(message) = self.inbound.try_recv() {
            messages.push(message);
        }
        messages
    }
}
