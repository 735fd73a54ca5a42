//! Host-name resolution example
//!
//! Resolves `<host>.local.` with a deadline.
//!
//! ```
//! cargo run --package mdns --example resolve -- --target beta --timeout 5
//! ```

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use clap::Parser;
use mdns::{Mdns, MdnsConfig, MdnsEvent, MulticastSocket};
use sansio::Protocol;
use shared::{TaggedBytesMut, TransportContext, TransportProtocol};
use tokio::net::UdpSocket;

#[derive(Parser, Debug)]
#[command(name = "mDNS Resolve")]
#[command(about = "Resolve a .local host name via the sans-I/O mdns engine")]
struct Args {
    /// Host name to respond for (<host>.local.)
    #[arg(long, default_value = "resolver")]
    host: String,

    /// Host name to look up
    #[arg(long)]
    target: String,

    /// Resolution deadline in seconds
    #[arg(long, default_value = "5")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut engine = Mdns::new(MdnsConfig::new());
    engine.start(&args.host)?;
    engine.resolve_host_name(&args.target, Instant::now() + Duration::from_secs(args.timeout))?;
    log::info!("resolving {}.local. ({}s deadline)", args.target, args.timeout);

    let std_socket = MulticastSocket::new().into_std()?;
    let local_addr: SocketAddr = std_socket.local_addr()?;
    let socket = UdpSocket::from_std(std_socket)?;

    let mut buf = vec![0u8; 1500];

    loop {
        while let Some(packet) = engine.poll_write() {
            socket
                .send_to(&packet.message, packet.transport.peer_addr)
                .await?;
        }

        let wait = engine
            .poll_timeout()
            .map(|t| t.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_millis(100));

        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                if let Ok((len, src)) = result {
                    let msg = TaggedBytesMut {
                        now: Instant::now(),
                        transport: TransportContext {
                            local_addr,
                            peer_addr: src,
                            transport_protocol: TransportProtocol::UDP,
                            ecn: None,
                        },
                        message: BytesMut::from(&buf[..len]),
                    };
                    if let Err(e) = engine.handle_read(msg) {
                        log::warn!("failed to handle packet: {e}");
                    }
                }
            }
            _ = tokio::time::sleep(wait) => {
                if let Err(e) = engine.handle_timeout(Instant::now()) {
                    log::warn!("failed to handle timeout: {e}");
                }
            }
        }

        while let Some(event) = engine.poll_event() {
            if let MdnsEvent::HostNameResolved { host_name, address } = event {
                engine.close()?;
                return match address {
                    Some(address) => {
                        println!("{host_name}.local. resolved to {address}");
                        Ok(ExitCode::SUCCESS)
                    }
                    None => {
                        eprintln!("{host_name}.local. not found");
                        Ok(ExitCode::FAILURE)
                    }
                };
            }
        }
    }
}
