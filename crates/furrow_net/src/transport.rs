//! TCP transport
//!
//! Newline-delimited JSON envelopes over tokio streams. Malformed lines are
//! logged and skipped; the connection stays open.

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

use crate::hub::{ClientEndpoint, HubHandle, Inbound};
use crate::message::{decode, encode, Message};
use crate::{ClientId, NetError};

/// Accept connections until the listener fails.
pub async fn accept_loop(listener: TcpListener, hub: HubHandle) -> Result<(), NetError> {
    info!(addr = ?listener.local_addr()?, "listening for players");
    loop {
        let (stream, peer) = listener.accept().await?;
        let hub = hub.clone();
        tokio::spawn(async move {
            let (id, outbound) = hub.register();
            debug!(%id, %peer, "serving");
            if let Err(err) = serve_client(stream, id, &hub, outbound).await {
                warn!(%id, error = %err, "connection ended with error");
            }
            hub.unregister(id);
        });
    }
}

async fn serve_client(
    stream: TcpStream,
    id: ClientId,
    hub: &HubHandle,
    mut outbound: UnboundedReceiver<Message>,
) -> Result<(), NetError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(());
                };
                match decode(&line) {
                    Ok(message) => hub.submit(id, message)?,
                    Err(err) => warn!(%id, error = %err, "ignoring malformed message"),
                }
            }
            message = outbound.recv() => {
                let Some(message) = message else {
                    return Ok(());
                };
                write_line(&mut writer, &message).await?;
            }
        }
    }
}

async fn write_line<W>(writer: &mut W, message: &Message) -> Result<(), NetError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = encode(message)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

/// Connect to a server; a background task bridges the socket and the
/// returned endpoint.
pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<ClientEndpoint, NetError> {
    let stream = TcpStream::connect(addr).await?;
    let (to_socket_tx, mut to_socket) = mpsc::unbounded_channel::<Inbound>();
    let (from_socket, from_socket_rx) = mpsc::unbounded_channel::<Message>();
    // the server assigns the real id; locally it only tags outgoing messages
    let endpoint = ClientEndpoint::new(ClientId(0), to_socket_tx, from_socket_rx);

    tokio::spawn(async move {
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => match decode(&line) {
                        Ok(message) => {
                            if from_socket.send(message).is_err() {
                                break;
                            }
                        }
                        Err(err) => warn!(error = %err, "ignoring malformed message"),
                    },
                    Ok(None) => break,
                    Err(err) => {
                        warn!(error = %err, "server connection lost");
                        break;
                    }
                },
                outgoing = to_socket.recv() => {
                    let Some(outgoing) = outgoing else { break };
                    if let Err(err) = write_line(&mut writer, &outgoing.message).await {
                        warn!(error = %err, "failed to send");
                        break;
                    }
                }
            }
        }
        debug!("client bridge stopped");
    });

    Ok(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::ServerHub;
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn tcp_roundtrip_through_the_hub() {
        let mut hub = ServerHub::new();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(accept_loop(listener, hub.handle()));

        let mut client = connect(addr).await.unwrap();
        settle().await;
        assert_eq!(hub.client_count(), 1);

        client.send(Message::EndTurn).unwrap();
        settle().await;
        let inbound = hub.drain();
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].message, Message::EndTurn);

        let update = Message::LoadSaveResponse {
            world_version: 3,
            world: serde_json::json!({"turn": 1}),
        };
        assert_eq!(hub.broadcast(&update), 1);
        settle().await;
        assert_eq!(client.drain(), vec![update]);
    }

    #[tokio::test]
    async fn garbage_lines_do_not_drop_the_connection() {
        let mut hub = ServerHub::new();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(accept_loop(listener, hub.handle()));

        let mut raw = TcpStream::connect(addr).await.unwrap();
        raw.write_all(b"not json\n").await.unwrap();
        raw.write_all(b"{\"protocol\":1,\"message\":{\"type\":\"requestSave\"}}\n")
            .await
            .unwrap();
        settle().await;

        let inbound = hub.drain();
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].message, Message::RequestSave);
    }
}
