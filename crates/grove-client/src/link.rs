//! WebSocket connection to the relay.

use futures::stream::{SplitSink, SplitStream};
use futures::{Sink, SinkExt, Stream, StreamExt};
use grove_protocol::{ClientEvent, ServerEvent};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::Result;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A visitor's connection to the relay.
pub struct RelayLink {
    ws: WsStream,
}

impl RelayLink {
    /// Connect to a relay at `url`, e.g. `ws://127.0.0.1:3000/ws`.
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _) = connect_async(url).await?;
        info!(%url, "connected to relay");
        Ok(Self { ws })
    }

    pub async fn send(&mut self, event: &ClientEvent) -> Result<()> {
        send_event(&mut self.ws, event).await
    }

    /// Next event from the relay, or `None` once the connection is closed.
    /// Frames that do not decode are skipped.
    pub async fn recv(&mut self) -> Result<Option<ServerEvent>> {
        next_event(&mut self.ws).await
    }

    /// Separate halves so sending and receiving can run concurrently.
    pub fn split(self) -> (LinkSender, LinkReceiver) {
        let (sink, stream) = self.ws.split();
        (LinkSender { sink }, LinkReceiver { stream })
    }

    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}

/// Sending half of a [`RelayLink`].
pub struct LinkSender {
    sink: SplitSink<WsStream, Message>,
}

impl LinkSender {
    pub async fn send(&mut self, event: &ClientEvent) -> Result<()> {
        send_event(&mut self.sink, event).await
    }

    pub async fn close(mut self) -> Result<()> {
        self.sink.close().await?;
        Ok(())
    }
}

/// Receiving half of a [`RelayLink`].
pub struct LinkReceiver {
    stream: SplitStream<WsStream>,
}

impl LinkReceiver {
    pub async fn recv(&mut self) -> Result<Option<ServerEvent>> {
        next_event(&mut self.stream).await
    }
}

async fn send_event<S>(sink: &mut S, event: &ClientEvent) -> Result<()>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let json = event.to_json()?;
    sink.send(Message::text(json)).await?;
    Ok(())
}

async fn next_event<S>(stream: &mut S) -> Result<Option<ServerEvent>>
where
    S: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match ServerEvent::from_json(text.as_str()) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => warn!("Skipping malformed frame from relay: {}", e),
            },
            Ok(Message::Close(frame)) => {
                debug!(?frame, "relay closed the connection");
                return Ok(None);
            }
            Ok(_) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => return Ok(None),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(None)
}
