//! Server network layer: UDP transport, sessions, and move dispatch

use crate::authority::{InMemoryStore, LogObserver, MoveDecision, MovementAuthority};
use crate::client_manager::ClientManager;
use crate::validator::{MoveValidator, ValidationProfile};
use bincode::{deserialize, serialize};
use log::{error, info, warn};
use shared::{now_micros, LocomotionState, MoveReport, Packet, PlayerId, PlayerMovementRecord};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: PlayerId },
    Shutdown,
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum OutboundMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Host settings that are not part of movement validation itself
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_clients: usize,
    pub client_timeout: Duration,
    pub profile: ValidationProfile,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_clients: 32,
            client_timeout: Duration::from_secs(5),
            profile: ValidationProfile::Standard,
        }
    }
}

/// Main server coordinating networking and move validation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    authority: MovementAuthority<InMemoryStore, LogObserver>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    outbound_rx: Option<mpsc::UnboundedReceiver<OutboundMessage>>,
}

impl Server {
    pub async fn new(addr: &str, config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!(
            "Server listening on {} ({:?} validation)",
            socket.local_addr()?,
            config.profile
        );

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(
                config.max_clients,
                config.client_timeout,
            ))),
            authority: MovementAuthority::new(
                InMemoryStore::new(),
                LogObserver,
                MoveValidator::new(config.profile),
            ),
            server_tx,
            server_rx,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle for stopping the main loop from another task.
    pub fn control(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        // Unknown locomotion states fail to decode here and never reach validation.
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let Some(mut outbound_rx) = self.outbound_rx.take() else {
            return;
        };

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                match message {
                    OutboundMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self
            .outbound_tx
            .send(OutboundMessage::SendPacket { packet, addr })
        {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Processes one incoming packet
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                let mut clients = self.clients.write().await;
                if let Some(existing_id) = clients.find_client_by_addr(addr) {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    clients.remove_client(&existing_id);
                    self.authority.end_session(existing_id);
                }

                match clients.add_client(addr) {
                    Some(player_id) => self.send_packet(Packet::Connected { player_id }, addr),
                    None => self.send_packet(
                        Packet::Disconnected {
                            reason: "Server full".to_string(),
                        },
                        addr,
                    ),
                }
            }

            Packet::MoveUpdate { state, report } => {
                let player = {
                    let mut clients = self.clients.write().await;
                    let player = clients.find_client_by_addr(addr);
                    if let Some(id) = player {
                        clients.touch(id);
                    }
                    player
                };

                match player {
                    Some(player) => {
                        if let Some(reply) = self.handle_move(player, state, report) {
                            self.send_packet(reply, addr);
                        }
                    }
                    None => warn!("Move update from unknown client at {}", addr),
                }
            }

            Packet::Disconnect => {
                let mut clients = self.clients.write().await;
                if let Some(client_id) = clients.find_client_by_addr(addr) {
                    clients.remove_client(&client_id);
                    self.authority.end_session(client_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    fn handle_move(
        &mut self,
        player: PlayerId,
        state: LocomotionState,
        report: MoveReport,
    ) -> Option<Packet> {
        let decision = self
            .authority
            .submit_move(player, state, report, now_micros());

        if let MoveDecision::Corrected {
            suspicious_activity_count,
            ..
        } = &decision
        {
            info!(
                "Correcting player {} ({} suspicious reports in a row)",
                player, suspicious_activity_count
            );
        }

        reply_for(&decision, self.authority.record(player).as_ref())
    }

    /// Main server loop
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        info!("Server started successfully");

        loop {
            match self.server_rx.recv().await {
                Some(ServerMessage::PacketReceived { packet, addr }) => {
                    self.handle_packet(packet, addr).await;
                }
                Some(ServerMessage::ClientTimeout { client_id }) => {
                    self.authority.end_session(client_id);
                }
                Some(ServerMessage::Shutdown) | None => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Builds the answer to a move report from the decision and the record it left behind.
///
/// Silent drops get no answer: the client already has a newer report in flight.
pub fn reply_for(decision: &MoveDecision, record: Option<&PlayerMovementRecord>) -> Option<Packet> {
    let record = record?;
    match decision {
        MoveDecision::FirstContact | MoveDecision::Heartbeat | MoveDecision::Accepted => {
            Some(Packet::MoveAccepted {
                timestamp: record.timestamp,
            })
        }
        MoveDecision::Dropped(_) | MoveDecision::Refused(_) => None,
        MoveDecision::Corrected { .. } => Some(Packet::Correction {
            state: record.state,
            origin: record.origin,
            yaw: record.yaw,
            timestamp: record.timestamp,
        }),
    }
}
