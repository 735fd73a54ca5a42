//! Service publishing example
//!
//! Announces a service instance on the local link and defends it until
//! Ctrl-C, then sends the goodbye.
//!
//! ```
//! cargo run --package mdns --example publish -- \
//!     --host alpha --service _printer._tcp --instance lp1 --port 9100 --txt paper=A4
//! ```

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use clap::Parser;
use mdns::{Mdns, MdnsConfig, MulticastSocket};
use sansio::Protocol;
use shared::{TaggedBytesMut, TransportContext, TransportProtocol};
use tokio::net::UdpSocket;

#[derive(Parser, Debug)]
#[command(name = "mDNS Publish")]
#[command(about = "Publish a service instance via the sans-I/O mdns engine")]
struct Args {
    /// Host name to respond for (<host>.local.)
    #[arg(long, default_value = "alpha")]
    host: String,

    /// Local IP address to advertise
    #[arg(long, default_value = "192.168.1.2")]
    ip: IpAddr,

    /// Service type
    #[arg(long, default_value = "_printer._tcp")]
    service: String,

    /// Instance name
    #[arg(long, default_value = "lp1")]
    instance: String,

    /// Port the instance listens on
    #[arg(long, default_value = "9100")]
    port: u16,

    /// TXT entries (repeatable)
    #[arg(long)]
    txt: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut engine = Mdns::new(MdnsConfig::new().with_local_ip(args.ip));
    engine.start(&args.host)?;
    engine.publish_service_instance(&args.service, &args.instance, args.port, args.txt.clone())?;
    log::info!(
        "publishing {}.{}.local. on port {}",
        args.instance,
        args.service,
        args.port
    );

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
            .unwrap_or(Duration::from_secs(3600));

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("unpublishing {}", args.instance);
                engine.unpublish_service_instance(&args.service, &args.instance)?;
                while let Some(packet) = engine.poll_write() {
                    socket.send_to(&packet.message, packet.transport.peer_addr).await?;
                }
                engine.close()?;
                return Ok(());
            }
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
    }
}
