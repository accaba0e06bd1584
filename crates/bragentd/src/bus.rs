//! Bus-bridge boundary
//!
//! The daemon exposes its state to a host message bus through this module:
//! property readers over the session, command handlers that forward to the
//! SoC, and change notifications emitted when inbound traffic updates the
//! session. The bus transport itself lives outside this crate; here the
//! boundary is a typed event channel plus accessors returning serializable
//! values.

use std::net::Ipv6Addr;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::Result;
use crate::msg::{Msg, MsgCode};
use crate::session::Session;
use crate::settings::Settings;
use crate::soc_client::SocClient;

/// Change notification emitted toward the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    TopologyChanged,
    SettingsChanged,
}

/// Sender half handed to the inbound dispatcher
#[derive(Debug, Clone)]
pub struct BusNotifier {
    tx: mpsc::UnboundedSender<BusEvent>,
}

impl BusNotifier {
    pub fn topology_changed(&self) {
        // receiver gone means the bridge is shutting down; nothing to signal
        let _ = self.tx.send(BusEvent::TopologyChanged);
    }

    pub fn settings_changed(&self) {
        let _ = self.tx.send(BusEvent::SettingsChanged);
    }
}

/// One node of the routing graph as published on the bus
///
/// The first entry is the border router itself and carries no parents; an
/// all-zero backup parent is omitted rather than published as `::`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingGraphNode {
    pub target: Ipv6Addr,
    /// Marshaled explicitly; consumers branch on it without probing the
    /// optional parent slots
    pub has_preferred: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred: Option<Ipv6Addr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<Ipv6Addr>,
}

/// Bus-facing view of the agent
pub struct BusBridge {
    session: Session,
    client: SocClient,
    rx: mpsc::UnboundedReceiver<BusEvent>,
}

impl BusBridge {
    /// Build the bridge and the notifier the dispatcher feeds
    pub fn channel(session: Session, client: SocClient) -> (Self, BusNotifier) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                session,
                client,
                rx,
            },
            BusNotifier { tx },
        )
    }

    /// RoutingGraph property
    pub async fn routing_graph(&self) -> Vec<RoutingGraphNode> {
        let entries = self.session.topology().await;
        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let preferred = (i != 0 && entry.preferred != Ipv6Addr::UNSPECIFIED)
                    .then_some(entry.preferred);
                RoutingGraphNode {
                    target: entry.target,
                    has_preferred: preferred.is_some(),
                    preferred,
                    backup: (i != 0 && entry.backup != Ipv6Addr::UNSPECIFIED)
                        .then_some(entry.backup),
                }
            })
            .collect()
    }

    /// NetworkName property
    pub async fn network_name(&self) -> String {
        self.session.settings().await.network_name
    }

    /// NetworkSize property
    pub async fn network_size(&self) -> String {
        self.session.settings().await.network_size.to_string()
    }

    /// Domain property
    pub async fn regulatory_domain(&self) -> String {
        self.session.settings().await.phy.reg_domain().to_string()
    }

    /// PhyModeId property
    pub async fn phy_mode_id(&self) -> u8 {
        self.session.settings().await.phy.phy_mode_id()
    }

    /// ChanPlanId property
    pub async fn chan_plan_id(&self) -> u8 {
        self.session.settings().await.phy.chan_plan_id()
    }

    /// FanVersion property
    pub async fn fan_version(&self) -> &'static str {
        self.session.settings().await.phy.fan_version()
    }

    /// Restart command: stop then start the border router on the SoC
    ///
    /// SoC failures are logged but not surfaced to the bus caller; the
    /// command is best-effort from the bus point of view.
    pub async fn restart_border_router(&self) -> Result<()> {
        for code in [MsgCode::StopBr, MsgCode::StartBr] {
            if let Err(err) = self.client.send_request(&Msg::request(code)).await {
                warn!("restart: {code} failed: {err}");
            }
        }
        Ok(())
    }

    /// Stop command
    pub async fn stop_border_router(&self) -> Result<()> {
        if let Err(err) = self
            .client
            .send_request(&Msg::request(MsgCode::StopBr))
            .await
        {
            warn!("stop: {} failed: {err}", MsgCode::StopBr);
        }
        Ok(())
    }

    /// SetConfig command: push settings to the SoC and mirror them locally
    pub async fn set_border_router_config(&self, settings: Settings) -> Result<()> {
        match self.client.send_request(&Msg::set_config(&settings)).await {
            Ok(_) => self.session.set_settings(settings).await,
            Err(err) => warn!("set config: {} failed: {err}", MsgCode::SetConfigParams),
        }
        Ok(())
    }

    /// Drain change events until cancelled, logging each published change
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.rx.recv() => {
                    let Some(event) = event else { break };
                    match event {
                        BusEvent::TopologyChanged => {
                            let graph = self.routing_graph().await;
                            match serde_json::to_string(&graph) {
                                Ok(json) => info!("RoutingGraph changed: {json}"),
                                Err(err) => warn!("RoutingGraph serialization failed: {err}"),
                            }
                        }
                        BusEvent::SettingsChanged => {
                            info!(
                                "settings changed: name={:?} size={} domain={} \
                                 phy_mode_id={} chan_plan_id={} fan={}",
                                self.network_name().await,
                                self.network_size().await,
                                self.regulatory_domain().await,
                                self.phy_mode_id().await,
                                self.chan_plan_id().await,
                                self.fan_version().await,
                            );
                        }
                    }
                }
            }
        }
    }
}
