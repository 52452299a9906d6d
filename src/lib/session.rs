//! The session worker (§4.D, §5): one task per radar, owning every socket,
//! driving the OFF/STANDBY/WAKING_UP/TRANSMIT state machine, and exposing a
//! cross-task handle over a cancellation token and an unbounded command
//! channel. Grounded on the reference crate's `socket_loop`/`run` shape for
//! its Raymarine report reader, generalized to own both discovery and data
//! sockets instead of just one report socket.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::command::CommandSender;
use crate::control::{ControlRegistry, ControlType, MiscInfo};
use crate::emulator::Emulator;
use crate::error::RadarError;
use crate::host::{RadarHost, RadarType};
use crate::network;
use crate::settings::Settings;
use crate::spoke::{Spoke, SpokePipeline};
use crate::wire::{announce, inbound, outbound, RangeTable};

pub const ANNOUNCE_ADDR: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(224, 0, 0, 1), 5800);

/// No packets of any kind for this long and the session drops to OFF (§4.D,
/// §5). Not captured in the fragment of the reference this was distilled
/// from; chosen to be generous relative to the 1s/5s heartbeat cadence.
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(10);
/// No scan data for this long and the session drops to STANDBY while the
/// control channel stays live (§4.D, §5).
pub const DATA_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Off = 0,
    Standby = 1,
    WakingUp = 2,
    Transmit = 3,
}

impl From<u8> for SessionState {
    fn from(v: u8) -> Self {
        match v {
            1 => SessionState::Standby,
            2 => SessionState::WakingUp,
            3 => SessionState::Transmit,
            _ => SessionState::Off,
        }
    }
}

#[derive(Debug, Default)]
pub struct Statistics {
    pub packets: AtomicU64,
    pub spokes: AtomicU64,
    pub missing_spokes: AtomicU64,
    pub broken_spokes: AtomicU64,
}

/// Everything a host-side reader can see without round-tripping through the
/// worker task (§5 cross-task contract).
pub struct SharedState {
    state: AtomicU8,
    range_meters: AtomicU32,
    registry: RwLock<ControlRegistry>,
    misc: RwLock<MiscInfo>,
    pub stats: Statistics,
}

impl SharedState {
    fn new() -> Self {
        SharedState {
            state: AtomicU8::new(SessionState::Off as u8),
            range_meters: AtomicU32::new(0),
            registry: RwLock::new(ControlRegistry::new()),
            misc: RwLock::new(MiscInfo::default()),
            stats: Statistics::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SessionState) {
        if self.state() != state {
            log::info!("radar session -> {state:?}");
        }
        self.state.store(state as u8, Ordering::Release);
    }
}

enum ControlCommand {
    SetValue(ControlType, i32),
    ChangeValue(ControlType, i32),
    ToggleAuto(ControlType),
    SetRangeMeters(u32),
    Wakeup,
}

/// The public, cross-task face of a running session (§5).
pub struct RadarSessionHandle {
    shared: Arc<SharedState>,
    cmd_tx: mpsc::UnboundedSender<ControlCommand>,
    cancel: CancellationToken,
}

impl RadarSessionHandle {
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn set_control_value(&self, ct: ControlType, value: i32) {
        let _ = self.cmd_tx.send(ControlCommand::SetValue(ct, value));
    }

    pub fn change_control_value(&self, ct: ControlType, delta: i32) {
        let _ = self.cmd_tx.send(ControlCommand::ChangeValue(ct, delta));
    }

    pub fn toggle_auto(&self, ct: ControlType) {
        let _ = self.cmd_tx.send(ControlCommand::ToggleAuto(ct));
    }

    pub fn set_range_meters(&self, meters: u32) {
        let _ = self.cmd_tx.send(ControlCommand::SetRangeMeters(meters));
    }

    pub fn wakeup_radar(&self) {
        let _ = self.cmd_tx.send(ControlCommand::Wakeup);
    }

    pub fn get_control_value(&self, ct: ControlType) -> Result<i32, crate::error::ControlError> {
        self.shared.registry.read().unwrap().value(ct)
    }

    pub fn get_misc(&self) -> MiscInfo {
        *self.shared.misc.read().unwrap()
    }
}

struct Announced {
    nic_addr: Ipv4Addr,
    mcast_addr: SocketAddrV4,
    radar_addr: SocketAddrV4,
}

/// Owns the sockets and runs to completion on the host's async runtime. One
/// per radar (§5 scheduling model).
pub struct RadarSession<H: RadarHost + 'static> {
    shared: Arc<SharedState>,
    host: Arc<H>,
    settings: Arc<Settings>,
    cmd_rx: mpsc::UnboundedReceiver<ControlCommand>,
    cancel: CancellationToken,
    ranges: RangeTable,
    spoke_pipeline: SpokePipeline,
    interface_cursor: usize,
}

impl<H: RadarHost + 'static> RadarSession<H> {
    pub fn new(host: Arc<H>, settings: Arc<Settings>) -> (Self, RadarSessionHandle) {
        let shared = Arc::new(SharedState::new());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let session = RadarSession {
            shared: shared.clone(),
            host,
            settings,
            cmd_rx,
            cancel: cancel.clone(),
            ranges: RangeTable::default(),
            spoke_pipeline: SpokePipeline::new(),
            interface_cursor: 0,
        };
        let handle = RadarSessionHandle { shared, cmd_tx, cancel };
        (session, handle)
    }

    /// Runs until `shutdown()` is called. Never returns an error: every
    /// failure is logged and the session falls back to discovery (§7).
    pub async fn run(mut self) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            if self.settings.emulator_on() {
                self.run_emulator().await;
                continue;
            }
            match self.discover_and_serve().await {
                Ok(()) => {}
                Err(RadarError::Shutdown) => return,
                Err(e) => {
                    log::warn!("session error, restarting discovery: {e}");
                    self.shared.set_state(SessionState::Off);
                    sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn run_emulator(&mut self) {
        log::info!("emulator mode engaged");
        let mut emulator = Emulator::new();
        self.host.set_radar_type(RadarType::FourG);
        self.shared.set_state(SessionState::Transmit);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = sleep(Duration::from_secs(1)) => {
                    if !self.settings.emulator_on() {
                        self.shared.set_state(SessionState::Off);
                        return;
                    }
                    let heading = self.host.heading();
                    let rotation = self.host.viewpoint_rotation();
                    let host = self.host.clone();
                    let stats = &self.shared.stats;
                    emulator.tick(heading, rotation, |spoke| {
                        host.on_spoke(&spoke);
                        stats.spokes.fetch_add(1, Ordering::Relaxed);
                    });
                }
                cmd = self.cmd_rx.recv() => {
                    if let Some(ControlCommand::Wakeup) = cmd {
                        log::debug!("wakeup requested while emulator is engaged; ignored");
                    }
                }
            }
        }
    }

    async fn discover_and_serve(&mut self) -> Result<(), RadarError> {
        let announced = self.discover().await?;
        self.serve(announced).await
    }

    fn next_interface(&mut self) -> Result<network::Nic, RadarError> {
        if let Some(name) = self.settings.interface_override() {
            return network::resolve_interface(Some(&name));
        }
        let nics = network::enumerate_interfaces()?;
        let nic = nics[self.interface_cursor % nics.len()].clone();
        self.interface_cursor = (self.interface_cursor + 1) % nics.len();
        Ok(nic)
    }

    /// Bind the announce listener on the next interface and wait for a
    /// valid data-endpoint announcement, re-picking the interface after two
    /// consecutive quiet seconds (§4.C, §4.D).
    async fn discover(&mut self) -> Result<Announced, RadarError> {
        loop {
            let nic = self.next_interface()?;
            let sock = match network::create_udp_multicast_listen(&ANNOUNCE_ADDR, &nic.addr) {
                Ok(s) => s,
                Err(e) => {
                    log::debug!("failed to bind announce listener on {}: {e}", nic.addr);
                    sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };
            log::info!("listening for radar announcements on {ANNOUNCE_ADDR} via {}", nic.addr);

            let mut buf = vec![0u8; 512];
            let mut misses = 0u8;
            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(RadarError::Shutdown),
                    _ = sleep(Duration::from_secs(1)) => {
                        misses += 1;
                        if misses >= 2 {
                            log::debug!("no announcements on {}, rotating interface", nic.addr);
                            break;
                        }
                    }
                    r = sock.recv_from(&mut buf) => {
                        let (n, _from) = r?;
                        misses = 0;
                        let Some(ann) = announce::decode(&buf[..n]) else { continue };
                        if !ann.is_data_endpoint() {
                            continue;
                        }
                        self.shared.set_state(SessionState::Standby);
                        self.host.set_radar_ip(ann.radar_ip);
                        self.host.set_mcast_ip(ann.mcast_ip);
                        return Ok(Announced {
                            nic_addr: nic.addr,
                            mcast_addr: SocketAddrV4::new(ann.mcast_ip, ann.mcast_port),
                            radar_addr: SocketAddrV4::new(ann.radar_ip, ann.radar_port),
                        });
                    }
                    cmd = self.cmd_rx.recv() => {
                        if let Some(ControlCommand::Wakeup) = cmd {
                            spawn_wakeup(nic.addr);
                        }
                    }
                }
            }
        }
    }

    /// Open the data/command sockets and hand off to `run_loop`.
    async fn serve(&mut self, announced: Announced) -> Result<(), RadarError> {
        let data_sock = network::create_udp_multicast_listen(&announced.mcast_addr, &announced.nic_addr)?;
        let cmd_sock = network::create_command_socket(&announced.radar_addr, &announced.nic_addr)?;
        log::info!(
            "session open: data {} cmd {} via {}",
            announced.mcast_addr, announced.radar_addr, announced.nic_addr
        );
        self.run_loop(data_sock, cmd_sock, announced.nic_addr).await
    }

    /// Send the init burst and run the main select loop until the watchdog
    /// fires or the session is cancelled. Split out from `serve` so tests can
    /// drive it over a pair of plain loopback sockets instead of real
    /// multicast ones (§10 test tooling).
    async fn run_loop(
        &mut self,
        data_sock: UdpSocket,
        cmd_sock: UdpSocket,
        nic_addr: Ipv4Addr,
    ) -> Result<(), RadarError> {
        let sender = CommandSender::new(&cmd_sock);

        sender.send_raw(&outbound::KEEPALIVE_1S).await?;
        sender.send_raw(&outbound::KEEPALIVE_5S).await?;
        sender.send_raw(&outbound::ONCE_MESSAGE).await?;

        let now = Instant::now();
        let mut heartbeat_1s = now + Duration::from_secs(1);
        let mut heartbeat_5s = now + Duration::from_secs(5);
        let mut radar_deadline = now + WATCHDOG_TIMEOUT;
        let mut data_deadline = now + DATA_TIMEOUT;

        let mut buf = vec![0u8; 4096];
        let mut scan_stats = inbound::ScanDataStats::default();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = sender.tx_shutdown().await;
                    self.shared.set_state(SessionState::Off);
                    return Err(RadarError::Shutdown);
                }
                _ = sleep_until(heartbeat_1s), if self.settings.enable_transmit() => {
                    sender.send_raw(&outbound::KEEPALIVE_1S).await?;
                    heartbeat_1s = Instant::now() + Duration::from_secs(1);
                }
                _ = sleep_until(heartbeat_5s), if self.settings.enable_transmit() => {
                    sender.send_raw(&outbound::KEEPALIVE_5S).await?;
                    heartbeat_5s = Instant::now() + Duration::from_secs(5);
                }
                _ = sleep_until(radar_deadline) => {
                    log::info!("radar watchdog expired, dropping session");
                    self.shared.set_state(SessionState::Off);
                    return Ok(());
                }
                _ = sleep_until(data_deadline) => {
                    log::info!("scan data timed out, returning to standby");
                    self.shared.set_state(SessionState::Standby);
                    data_deadline = Instant::now() + DATA_TIMEOUT;
                }
                r = data_sock.recv_from(&mut buf) => {
                    let (n, _from) = r?;
                    radar_deadline = Instant::now() + WATCHDOG_TIMEOUT;
                    self.shared.stats.packets.fetch_add(1, Ordering::Relaxed);
                    match inbound::decode_datagram(&buf[..n], &mut scan_stats) {
                        Ok(record) => {
                            if let Some(next_deadline) = self.handle_record(record) {
                                data_deadline = next_deadline;
                            }
                        }
                        Err(e) => log::debug!("dropping malformed datagram: {e}"),
                    }
                    self.shared.stats.broken_spokes.store(scan_stats.broken_spokes as u64, Ordering::Relaxed);
                }
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.apply_command(cmd, &sender, nic_addr).await,
                        None => return Err(RadarError::Shutdown),
                    }
                }
            }
        }
    }

    /// Returns `Some(new data_deadline)` when the record was scan data (so
    /// the caller re-arms the data watchdog), `None` otherwise.
    fn handle_record(&mut self, record: inbound::InboundRecord) -> Option<Instant> {
        match record {
            inbound::InboundRecord::Feedback(fb) => {
                let status = fb.status;
                let range_meters = self.ranges.meters_for_index(fb.range_id).unwrap_or(0);
                self.shared.range_meters.store(range_meters, Ordering::Relaxed);
                {
                    let mut registry = self.shared.registry.write().unwrap();
                    inbound::apply_feedback(&mut registry, &mut self.ranges, &fb);
                }
                {
                    let mut misc = self.shared.misc.write().unwrap();
                    misc.warmup_seconds = fb.warmup_time;
                    misc.signal_strength = fb.signal_strength;
                }
                self.transition_on_status(status);
                None
            }
            inbound::InboundRecord::PresetFeedback(pf) => {
                {
                    let mut registry = self.shared.registry.write().unwrap();
                    inbound::apply_preset_feedback(&mut registry, &pf);
                }
                {
                    let mut misc = self.shared.misc.write().unwrap();
                    misc.magnetron_hours = pf.magnetron_hours as u32;
                    misc.magnetron_current = pf.magnetron_current as u16;
                    misc.rotation_period_ms = pf.rotation_time_ms;
                }
                None
            }
            inbound::InboundRecord::CurveLevel(level) => {
                self.shared.registry.write().unwrap().record(ControlType::StcCurve, level as i32);
                None
            }
            inbound::InboundRecord::ScanData(flavor, spokes) => {
                self.shared.set_state(SessionState::Transmit);
                self.host.set_radar_type(match flavor {
                    inbound::RadarFlavor::Br24 => RadarType::Br24,
                    inbound::RadarFlavor::FourG => RadarType::FourG,
                });
                let heading = self.host.heading();
                let rotation = self.host.viewpoint_rotation();
                let range_meters = self.shared.range_meters.load(Ordering::Relaxed);
                for decoded in spokes {
                    let (angle, bearing) = self.spoke_pipeline.accept(decoded.spoke_index, heading, rotation);
                    let spoke = Spoke {
                        angle,
                        bearing,
                        range_meters,
                        data: decoded.samples,
                    };
                    self.host.on_spoke(&spoke);
                    self.shared.stats.spokes.fetch_add(1, Ordering::Relaxed);
                }
                self.shared
                    .stats
                    .missing_spokes
                    .store(self.spoke_pipeline.missing_spokes, Ordering::Relaxed);
                Some(Instant::now() + DATA_TIMEOUT)
            }
            inbound::InboundRecord::Ignored(id) => {
                log::trace!("ignored msg_id {id:#010x}");
                None
            }
        }
    }

    fn transition_on_status(&self, status: inbound::RadarStatus) {
        use inbound::RadarStatus::*;
        let next = match status {
            Standby => SessionState::Standby,
            Transmit => SessionState::Transmit,
            Warmup => SessionState::WakingUp,
            Off | ShuttingDown => SessionState::Off,
            Unknown(v) => {
                log::debug!("unrecognized feedback status byte {v}");
                return;
            }
        };
        self.shared.set_state(next);
    }

    async fn apply_command(&mut self, cmd: ControlCommand, sender: &CommandSender<'_>, nic_addr: Ipv4Addr) {
        if !self.settings.enable_transmit() {
            if matches!(cmd, ControlCommand::Wakeup) {
                spawn_wakeup(nic_addr);
            }
            return;
        }
        match cmd {
            ControlCommand::SetValue(ct, value) => {
                let clamped = self.shared.registry.read().unwrap().get(ct).clamp(value);
                match sender.set_value(ct, clamped).await {
                    Ok(true) => self.shared.registry.write().unwrap().record(ct, clamped),
                    Ok(false) => log::debug!("{ct} rejected value {value}"),
                    Err(e) => log::warn!("failed to send {ct} set command: {e}"),
                }
            }
            ControlCommand::ChangeValue(ct, delta) => {
                let new_value = self.shared.registry.write().unwrap().change_value(ct, delta);
                if let Some(value) = new_value {
                    if let Err(e) = sender.set_value(ct, value).await {
                        log::warn!("failed to send {ct} change command: {e}");
                    }
                }
            }
            ControlCommand::ToggleAuto(ct) => {
                let result = self.shared.registry.write().unwrap().toggle_auto(ct);
                match result {
                    Ok(was_active) => {
                        // `toggle_auto` returns the PRE-toggle value. Gain, Sea,
                        // TuneFine and TuneCoarse send that old value on the wire
                        // as-is; Rain, Ftc and SeaAuto send its negation (the new
                        // value) instead — matches the reference `ToggleAuto`.
                        let wire_active = match ct {
                            ControlType::Gain
                            | ControlType::Sea
                            | ControlType::TuneFine
                            | ControlType::TuneCoarse => was_active,
                            _ => !was_active,
                        };
                        if let Err(e) = sender.set_auto(ct, wire_active).await {
                            log::warn!("failed to send {ct} auto toggle: {e}");
                        }
                    }
                    Err(e) => log::debug!("toggle_auto({ct}) rejected: {e}"),
                }
            }
            ControlCommand::SetRangeMeters(meters) => {
                let index = self.ranges.index_for_meters(meters);
                if let Err(e) = sender.set_range(index).await {
                    log::warn!("failed to send range command: {e}");
                }
            }
            ControlCommand::Wakeup => spawn_wakeup(nic_addr),
        }
    }
}

/// Publishes the wakeup magic to the announce group 10x at 10 ms cadence,
/// independent of the worker's select loop (§4.D).
fn spawn_wakeup(nic_addr: Ipv4Addr) {
    tokio::spawn(async move {
        let sock: UdpSocket = match network::create_command_socket(&ANNOUNCE_ADDR, &nic_addr) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("wakeup: failed to open socket via {nic_addr}: {e}");
                return;
            }
        };
        for _ in 0..10 {
            if let Err(e) = sock.send(outbound::WAKEUP_MAGIC).await {
                log::warn!("wakeup: send failed: {e}");
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::inbound::{Feedback, InboundRecord, RadarStatus};

    #[test]
    fn session_state_roundtrips_through_u8() {
        for state in [
            SessionState::Off,
            SessionState::Standby,
            SessionState::WakingUp,
            SessionState::Transmit,
        ] {
            assert_eq!(SessionState::from(state as u8), state);
        }
    }

    struct TestHost;

    impl RadarHost for TestHost {
        fn heading(&self) -> f64 {
            0.0
        }
        fn viewpoint_rotation(&self) -> f64 {
            0.0
        }
        fn on_spoke(&self, _spoke: &Spoke) {}
        fn set_radar_type(&self, _radar_type: RadarType) {}
        fn set_radar_ip(&self, _ip: Ipv4Addr) {}
        fn set_mcast_ip(&self, _ip: Ipv4Addr) {}
    }

    fn test_session() -> (RadarSession<TestHost>, RadarSessionHandle) {
        RadarSession::new(Arc::new(TestHost), Arc::new(Settings::default()))
    }

    fn sample_feedback(status: RadarStatus) -> Feedback {
        Feedback {
            range_values: [0; 11],
            status,
            warmup_time: 0,
            signal_strength: 0,
            range_id: 0,
            auto_gain: false,
            gain: 50,
            auto_sea: 0,
            sea_value: 50,
            rain_enabled: false,
            rain_value: 0,
            ftc_enabled: false,
            ftc_value: 0,
            auto_tune: false,
            tune: 0,
            bearing_offset: 0,
            interference_rejection: 0,
            target_expansion: 0,
            mbs_enabled: false,
        }
    }

    #[test]
    fn feedback_status_byte_drives_session_state() {
        let (mut session, handle) = test_session();
        assert_eq!(handle.state(), SessionState::Off);

        session.handle_record(InboundRecord::Feedback(sample_feedback(RadarStatus::Transmit)));
        assert_eq!(handle.state(), SessionState::Transmit);

        session.handle_record(InboundRecord::Feedback(sample_feedback(RadarStatus::Standby)));
        assert_eq!(handle.state(), SessionState::Standby);
    }

    /// Binds a pair of loopback sockets and a throwaway "drain" socket for
    /// the command socket to connect to, so the init burst and heartbeats
    /// `run_loop` sends don't loop back into the data socket under test.
    async fn loopback_sockets() -> (UdpSocket, UdpSocket) {
        let data_sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let cmd_sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let drain = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        cmd_sock.connect(drain.local_addr().unwrap()).await.unwrap();
        (data_sock, cmd_sock)
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_expiry_drops_session_to_off() {
        let (mut session, handle) = test_session();
        let (data_sock, cmd_sock) = loopback_sockets().await;

        let join = tokio::spawn(async move { session.run_loop(data_sock, cmd_sock, Ipv4Addr::LOCALHOST).await });

        tokio::time::advance(WATCHDOG_TIMEOUT + Duration::from_secs(1)).await;

        let result = join.await.unwrap();
        assert!(matches!(result, Ok(())));
        assert_eq!(handle.state(), SessionState::Off);
    }

    #[tokio::test(start_paused = true)]
    async fn data_timeout_drops_to_standby_without_ending_session() {
        let (mut session, handle) = test_session();
        let (data_sock, cmd_sock) = loopback_sockets().await;

        let join = tokio::spawn(async move { session.run_loop(data_sock, cmd_sock, Ipv4Addr::LOCALHOST).await });

        tokio::time::advance(DATA_TIMEOUT + Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(handle.state(), SessionState::Standby);

        handle.shutdown();
        let result = join.await.unwrap();
        assert!(matches!(result, Err(RadarError::Shutdown)));
    }
}
