//! UDP transport for the daemon.
//!
//! Sync updates are flooded to every configured neighbor and re-flooded once
//! when newer than anything seen for that prefix. LSA interests go to every
//! neighbor; any neighbor holding the requested version answers with data.

use anyhow::Context;
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::RouterConfig;
use crate::error::Result;
use crate::fetch::{AcceptAllValidator, FetchError, FetchRequest, FetchResponse, LsaFetcher};
use crate::name::Name;
use crate::protocol::messages::Packet;
use crate::protocol::sync::{SyncChannel, SyncUpdate};
use crate::router::{InstanceId, Router};

pub const DEFAULT_PORT: u16 = 6363;

const MAX_DATAGRAM: usize = 65_507;
const IDLE_POLL: Duration = Duration::from_secs(1);

/// Work the router hands to the transport.
#[derive(Debug)]
pub enum Outgoing {
    Sync(SyncUpdate),
    Fetch(FetchRequest),
}

#[derive(Debug, Clone)]
pub struct ChannelSync {
    tx: mpsc::UnboundedSender<Outgoing>,
}

impl SyncChannel for ChannelSync {
    fn publish(&mut self, update: SyncUpdate) -> Result<()> {
        if self.tx.send(Outgoing::Sync(update)).is_err() {
            warn!("Transport is gone, sync update dropped");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ChannelFetcher {
    tx: mpsc::UnboundedSender<Outgoing>,
}

impl LsaFetcher for ChannelFetcher {
    fn fetch(&mut self, request: FetchRequest) {
        if self.tx.send(Outgoing::Fetch(request)).is_err() {
            warn!("Transport is gone, fetch dropped");
        }
    }
}

/// Accepts `udp://host:port`, `udp4://host:port` or a bare `host:port`.
pub fn parse_face_uri(face_uri: &str) -> Option<SocketAddr> {
    let address = face_uri
        .strip_prefix("udp://")
        .or_else(|| face_uri.strip_prefix("udp4://"))
        .unwrap_or(face_uri);
    address.parse().ok()
}

struct PendingInterest {
    request: FetchRequest,
    expires: Instant,
}

pub struct UdpTransport {
    socket: UdpSocket,
    neighbors: Vec<SocketAddr>,
    router: Router,
    rx: mpsc::UnboundedReceiver<Outgoing>,
    start: Instant,
    pending: HashMap<Name, PendingInterest>,
    /// Highest combined sequence number seen per update prefix.
    last_seen: HashMap<Name, u64>,
}

impl UdpTransport {
    pub async fn bind(conf: RouterConfig, instance: InstanceId) -> anyhow::Result<Self> {
        let listen = conf
            .listen_addr
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)));
        let socket = UdpSocket::bind(listen)
            .await
            .with_context(|| format!("binding {}", listen))?;

        let mut neighbors = Vec::new();
        for neighbor in &conf.neighbors {
            match parse_face_uri(&neighbor.face_uri) {
                Some(addr) => neighbors.push(addr),
                None => warn!("Ignoring neighbor {}: bad face {}", neighbor.name, neighbor.face_uri),
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut router = Router::new(
            conf,
            instance,
            Utc::now(),
            Box::new(ChannelFetcher { tx: tx.clone() }),
            Box::new(AcceptAllValidator),
        );
        router.set_sync_channel(Box::new(ChannelSync { tx }));
        info!("Listening on {} with {} neighbors", socket.local_addr()?, neighbors.len());

        Ok(Self {
            socket,
            neighbors,
            router,
            rx,
            start: Instant::now(),
            pending: HashMap::new(),
            last_seen: HashMap::new(),
        })
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        self.router.initialize()?;
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            while let Ok(outgoing) = self.rx.try_recv() {
                self.send_outgoing(outgoing).await;
            }

            let wake = self.next_wakeup();
            let received = tokio::select! {
                received = self.socket.recv_from(&mut buf) => Some(received),
                _ = tokio::time::sleep_until(wake) => None,
            };
            match received {
                Some(Ok((len, src))) => self.handle_datagram(&buf[..len], src).await,
                Some(Err(e)) => warn!("Receive failed: {}", e),
                None => {}
            }

            self.expire_interests();
            self.router.advance_to(self.start.elapsed());
        }
    }

    fn next_wakeup(&self) -> Instant {
        let router = self.router.next_deadline().map(|d| self.start + d);
        let interest = self.pending.values().map(|p| p.expires).min();
        match (router, interest) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => Instant::now() + IDLE_POLL,
        }
    }

    async fn send_outgoing(&mut self, outgoing: Outgoing) {
        match outgoing {
            Outgoing::Sync(update) => {
                self.last_seen.insert(update.prefix.clone(), update.seq_no);
                self.flood(&Packet::Sync(update), None).await;
            }
            Outgoing::Fetch(request) => {
                let name = request.interest.clone();
                let expires = Instant::now() + request.lifetime;
                self.pending
                    .insert(name.clone(), PendingInterest { request, expires });
                self.flood(&Packet::Interest { name }, None).await;
            }
        }
    }

    async fn flood(&self, packet: &Packet, except: Option<SocketAddr>) {
        let bytes = match packet.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to encode packet: {}", e);
                return;
            }
        };
        for neighbor in self.neighbors.iter().filter(|n| Some(**n) != except) {
            if let Err(e) = self.socket.send_to(&bytes, neighbor).await {
                warn!("Send to {} failed: {}", neighbor, e);
            }
        }
    }

    async fn handle_datagram(&mut self, bytes: &[u8], src: SocketAddr) {
        let packet = match Packet::decode(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Discarding datagram from {}: {}", src, e);
                return;
            }
        };
        match packet {
            Packet::Sync(update) => {
                let newer = self
                    .last_seen
                    .get(&update.prefix)
                    .is_none_or(|seen| update.seq_no > *seen);
                if !newer {
                    return;
                }
                self.last_seen.insert(update.prefix.clone(), update.seq_no);
                self.router.on_sync_updates(std::slice::from_ref(&update));
                self.flood(&Packet::Sync(update), Some(src)).await;
            }
            Packet::Interest { name } => {
                let Some(content) = self.router.process_interest(&name) else {
                    debug!("No data for {} requested by {}", name, src);
                    return;
                };
                let reply = Packet::Data { name, content };
                match reply.encode() {
                    Ok(bytes) => {
                        if let Err(e) = self.socket.send_to(&bytes, src).await {
                            warn!("Reply to {} failed: {}", src, e);
                        }
                    }
                    Err(e) => warn!("Failed to encode reply: {}", e),
                }
            }
            Packet::Data { name, content } => {
                let Some(pending) = self.pending.remove(&name) else {
                    debug!("Unsolicited data {} from {}", name, src);
                    return;
                };
                self.router.on_fetch_response(FetchResponse {
                    request: pending.request,
                    result: Ok(content),
                });
            }
        }
    }

    fn expire_interests(&mut self) {
        let now = Instant::now();
        let expired: Vec<Name> = self
            .pending
            .iter()
            .filter(|(_, p)| p.expires <= now)
            .map(|(name, _)| name.clone())
            .collect();
        for name in expired {
            if let Some(pending) = self.pending.remove(&name) {
                self.router.on_fetch_response(FetchResponse {
                    request: pending.request,
                    result: Err(FetchError::timeout()),
                });
            }
        }
    }
}
