use clap::Parser;
use log::info;
use server::network::{Server, ServerConfig};
use server::validator::ValidationProfile;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of concurrent clients
    #[arg(short, long, default_value = "32")]
    max_clients: usize,

    /// Seconds of silence before a client is dropped
    #[arg(long, default_value = "5")]
    client_timeout_secs: u64,

    /// Which movement checks to apply
    #[arg(long, value_enum, default_value_t = ValidationProfile::Standard)]
    profile: ValidationProfile,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    info!("Starting movement server...");
    info!("Max clients: {}", args.max_clients);
    if args.profile == ValidationProfile::Lenient {
        info!("Lenient profile: only timestamps are validated");
    }

    let config = ServerConfig {
        max_clients: args.max_clients,
        client_timeout: Duration::from_secs(args.client_timeout_secs),
        profile: args.profile,
    };

    let mut server = Server::new(&addr, config).await?;
    server.run().await?;

    Ok(())
}
