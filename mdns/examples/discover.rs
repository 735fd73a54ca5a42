//! Service discovery example
//!
//! Subscribes to a service type and prints every instance event.
//!
//! ```
//! cargo run --package mdns --example discover -- --service _printer._tcp
//! ```

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use clap::Parser;
use mdns::{InstanceChange, Mdns, MdnsConfig, MdnsEvent, MulticastSocket};
use sansio::Protocol;
use shared::{TaggedBytesMut, TransportContext, TransportProtocol};
use tokio::net::UdpSocket;

#[derive(Parser, Debug)]
#[command(name = "mDNS Discover")]
#[command(about = "Watch service instances via the sans-I/O mdns engine")]
struct Args {
    /// Host name to respond for (<host>.local.)
    #[arg(long, default_value = "watcher")]
    host: String,

    /// Service type to watch
    #[arg(long, default_value = "_printer._tcp")]
    service: String,

    /// Log inbound/outbound messages in full
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut engine = Mdns::new(MdnsConfig::new().with_verbose(args.verbose));
    engine.start(&args.host)?;
    engine.subscribe_to_service(&args.service)?;
    log::info!("watching {}.local.", args.service);

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
                engine.unsubscribe_to_service(&args.service)?;
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

        while let Some(event) = engine.poll_event() {
            if let MdnsEvent::ServiceInstance { change, instance } = event {
                let verb = match change {
                    InstanceChange::Discovered => "discovered",
                    InstanceChange::Changed => "changed",
                    InstanceChange::Lost => "lost",
                };
                println!(
                    "{verb}: {}.{} at {:?}:{} txt={:?}",
                    instance.instance, instance.service, instance.address, instance.port,
                    instance.text
                );
            }
        }
    }
}
