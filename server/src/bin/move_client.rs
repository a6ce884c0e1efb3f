//! Scripted client that sends a short sequence of move reports and prints
//! how the server answers each one.

use bincode::{deserialize, serialize};
use clap::Parser;
use shared::{now_micros, LocomotionState, MoveReport, Packet, Vec3};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Delay between reports in milliseconds
    #[arg(short, long, default_value = "200")]
    interval_ms: u64,
}

async fn send(
    socket: &UdpSocket,
    packet: &Packet,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = serialize(packet)?;
    socket.send_to(&data, addr).await?;
    Ok(())
}

async fn receive(socket: &UdpSocket) -> Result<Option<Packet>, Box<dyn std::error::Error>> {
    let mut buf = [0u8; 2048];
    match timeout(Duration::from_secs(1), socket.recv_from(&mut buf)).await {
        Ok(result) => {
            let (len, _) = result?;
            Ok(Some(deserialize::<Packet>(&buf[0..len])?))
        }
        Err(_) => Ok(None),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let server_addr = args.server.parse::<SocketAddr>()?;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    send(&socket, &Packet::Connect { client_version: 1 }, server_addr).await?;
    match receive(&socket).await? {
        Some(Packet::Connected { player_id }) => println!("Connected as player {}", player_id),
        Some(other) => {
            println!("Server refused connection: {:?}", other);
            return Ok(());
        }
        None => {
            println!("No response from {}", server_addr);
            return Ok(());
        }
    }

    let interval = Duration::from_millis(args.interval_ms);
    let dt = interval.as_secs_f32();

    // Idle seed, two walking steps, a heartbeat, then a teleport.
    let script = [
        ("seed", LocomotionState::Idle, Vec3::ZERO, Vec3::ZERO),
        ("walk", LocomotionState::Walk, Vec3::new(2.5 * dt, 0.0, 0.0), Vec3::new(2.5, 0.0, 0.0)),
        ("walk", LocomotionState::Walk, Vec3::new(5.0 * dt, 0.0, 0.0), Vec3::new(2.5, 0.0, 0.0)),
        ("heartbeat", LocomotionState::Walk, Vec3::new(5.0 * dt, 0.0, 0.0), Vec3::ZERO),
        ("teleport", LocomotionState::Run, Vec3::new(80.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)),
    ];

    for (label, state, origin, velocity) in script {
        let report = MoveReport {
            origin,
            velocity,
            yaw: 0.0,
            timestamp: now_micros(),
            duration: dt,
        };
        send(&socket, &Packet::MoveUpdate { state, report }, server_addr).await?;

        match receive(&socket).await? {
            Some(Packet::MoveAccepted { timestamp }) => {
                println!("{:<10} {} at {} -> accepted ({})", label, state, origin, timestamp)
            }
            Some(Packet::Correction { state: s, origin: o, .. }) => {
                println!("{:<10} {} at {} -> corrected to {} at {}", label, state, origin, s, o)
            }
            Some(other) => println!("{:<10} unexpected reply {:?}", label, other),
            None => println!("{:<10} {} at {} -> no reply", label, state, origin),
        }

        sleep(interval).await;
    }

    send(&socket, &Packet::Disconnect, server_addr).await?;
    println!("Disconnected");

    Ok(())
}
