//! Thin smoke-test binary: wires the driver to a console-logging `RadarHost`
//! and drives one session, either against a real radar or the built-in
//! emulator. Not part of the library's public surface.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clap::Parser;
use env_logger::Env;

use radome_link::host::{RadarHost, RadarType};
use radome_link::session::RadarSession;
use radome_link::settings::Settings;
use radome_link::spoke::Spoke;

#[derive(Parser, Clone, Debug)]
#[command(about = "Manual smoke-test harness for the radar driver")]
struct Cli {
    #[clap(flatten)]
    verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Limit radar discovery to a single interface, by name or address.
    #[arg(short, long)]
    interface: Option<String>,

    /// Run the built-in emulator instead of listening on the network.
    #[arg(long, default_value_t = false)]
    emulate: bool,

    /// Disable outbound control/heartbeat traffic (listen-only).
    #[arg(long, default_value_t = false)]
    no_transmit: bool,
}

struct ConsoleHost {
    spokes_seen: AtomicU64,
}

impl RadarHost for ConsoleHost {
    fn heading(&self) -> f64 {
        0.0
    }

    fn viewpoint_rotation(&self) -> f64 {
        0.0
    }

    fn on_spoke(&self, spoke: &Spoke) {
        let n = self.spokes_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if n % 2048 == 0 {
            log::info!(
                "spoke #{n}: angle={} bearing={} range={}m",
                spoke.angle, spoke.bearing, spoke.range_meters
            );
        }
    }

    fn set_radar_type(&self, radar_type: RadarType) {
        log::info!("radar type: {radar_type:?}");
    }

    fn set_radar_ip(&self, ip: Ipv4Addr) {
        log::info!("radar ip: {ip}");
    }

    fn set_mcast_ip(&self, ip: Ipv4Addr) {
        log::info!("data multicast group: {ip}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    env_logger::Builder::from_env(Env::default())
        .filter_level(args.verbose.log_level_filter())
        .init();

    let host = Arc::new(ConsoleHost {
        spokes_seen: AtomicU64::new(0),
    });
    let settings = Arc::new(Settings::new(!args.no_transmit, args.emulate, args.interface));

    let (session, handle) = RadarSession::new(host, settings);
    let join_handle = tokio::spawn(session.run());

    tokio::signal::ctrl_c().await?;
    log::info!("shutting down");
    handle.shutdown();
    join_handle.await?;

    Ok(())
}
