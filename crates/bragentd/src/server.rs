//! Inbound dispatcher for frames pushed by the SoC
//!
//! The SoC connects to this listener to push topology updates and
//! configuration, and to query the current configuration. Connections are
//! serviced one at a time in arrival order: a connection is fully handled
//! and closed before the next accept, so updates apply in the order the SoC
//! sent them. A malformed frame poisons only its own connection.

use std::net::{Ipv6Addr, SocketAddr};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::BusNotifier;
use crate::error::{AgentError, Result};
use crate::msg::{hex_dump, Msg, MsgCode, MAX_FRAME_SIZE, MSG_HEADER_SIZE};
use crate::session::Session;
use crate::settings::Settings;
use crate::topology::parse_topology_payload;

/// Listening dispatcher for the SoC-facing service port
pub struct AgentServer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl AgentServer {
    /// Bind the service port and start the accept loop
    pub async fn start(
        session: Session,
        notifier: Option<BusNotifier>,
        port: u16,
    ) -> Result<Self> {
        let socket = TcpSocket::new_v6()?;
        socket.set_reuseaddr(true)?;
        socket.bind(SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)))?;
        let listener = socket.listen(16)?;
        let local_addr = listener.local_addr()?;
        info!("listening on {local_addr}");

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(accept_loop(
            listener,
            session,
            notifier,
            cancel.clone(),
        ));

        Ok(Self {
            cancel,
            handle,
            local_addr,
        })
    }

    /// Address the listener actually bound, useful with port 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and wait for the loop to drain
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            warn!("accept loop join failed: {err}");
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    session: Session,
    notifier: Option<BusNotifier>,
    cancel: CancellationToken,
) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(err) => {
                    warn!("accept failed: {err}");
                    continue;
                }
            },
        };
        debug!("connection from {peer}");
        // serviced inline so updates apply in arrival order
        if let Err(err) = handle_connection(stream, peer, &session, notifier.as_ref()).await {
            warn!("connection from {peer}: {err}");
        }
    }
    info!("accept loop stopped");
}

/// Read one complete frame from the stream
///
/// Reads are accumulated until a frame decodes or the peer closes; a close
/// mid-frame surfaces the codec's truncation error.
async fn read_frame(stream: &mut TcpStream) -> Result<Msg> {
    let mut buf = Vec::with_capacity(MSG_HEADER_SIZE);
    let mut chunk = [0u8; 512];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Msg::decode(&buf);
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > MAX_FRAME_SIZE {
            return Err(AgentError::Allocation(buf.len()));
        }
        match Msg::decode(&buf) {
            Ok(msg) => return Ok(msg),
            Err(AgentError::Truncated { .. }) => continue,
            Err(err) => return Err(err),
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    session: &Session,
    notifier: Option<&BusNotifier>,
) -> Result<()> {
    let msg = read_frame(&mut stream).await?;
    debug!(
        "{} from {peer}, {} payload bytes\n{}",
        msg.code,
        msg.payload.len(),
        hex_dump(&msg.payload)
    );

    match msg.code {
        MsgCode::GetTopology => {
            let entries = parse_topology_payload(&msg.payload)?;
            info!("topology update: {} nodes", entries.len());
            session.set_topology(entries).await?;
            if let Some(notifier) = notifier {
                notifier.topology_changed();
            }
        }
        MsgCode::SetConfigParams => {
            let settings = Settings::from_wire(&msg.payload)?;
            let peer_ip = match peer {
                SocketAddr::V6(v6) => *v6.ip(),
                SocketAddr::V4(_) => {
                    return Err(AgentError::InvalidAddress(peer.to_string()));
                }
            };
            info!(
                "config install from {peer_ip}: network {:?}, PAN {:#06x}",
                settings.network_name, settings.pan_id
            );
            session.set_peer_endpoint(peer_ip, settings).await;
            if let Some(notifier) = notifier {
                notifier.settings_changed();
            }
        }
        MsgCode::GetConfigParams => {
            let settings = session.settings().await;
            let reply = Msg::set_config(&settings).encode()?;
            stream.write_all(&reply).await?;
            debug!("config reply sent to {peer}");
        }
        MsgCode::StartBr | MsgCode::StopBr => {
            // control codes are outbound-only; an inbound one is noise
            info!("ignoring inbound {} from {peer}", msg.code);
        }
    }
    Ok(())
}
