//! Command dispatch (component F collaborator): turns a `ControlType` +
//! value into the matching `wire::outbound` encoder call and a `send` over
//! the unicast command socket. The worker task is the only caller.

use tokio::net::UdpSocket;

use crate::control::ControlType;
use crate::error::RadarError;
use crate::wire::outbound;

pub struct CommandSender<'a> {
    sock: &'a UdpSocket,
}

impl<'a> CommandSender<'a> {
    pub fn new(sock: &'a UdpSocket) -> Self {
        CommandSender { sock }
    }

    async fn send(&self, datagram: Vec<u8>) -> Result<(), RadarError> {
        self.sock.send(&datagram).await?;
        Ok(())
    }

    /// Send an already-encoded datagram verbatim (keepalives, the once
    /// message, the wakeup magic).
    pub async fn send_raw(&self, datagram: &[u8]) -> Result<(), RadarError> {
        self.sock.send(datagram).await?;
        Ok(())
    }

    pub async fn tx_control(&self, on: bool) -> Result<(), RadarError> {
        self.send(outbound::tx_control(on as u8)).await
    }

    pub async fn tx_shutdown(&self) -> Result<(), RadarError> {
        self.send(outbound::tx_control(3)).await
    }

    pub async fn set_range(&self, index: u8) -> Result<(), RadarError> {
        self.send(outbound::set_range(index)).await
    }

    /// Set a single value, dispatching to the matching encoder by control
    /// type. Returns `Ok(false)` for the two controls the reference leaves
    /// with an unconditional true/false contract (§4.F) when `value` is out
    /// of their accepted range; everything else always sends.
    pub async fn set_value(&self, ct: ControlType, value: i32) -> Result<bool, RadarError> {
        match ct {
            ControlType::Gain => self.send(outbound::set_gain(value as u8)).await.map(|_| true),
            ControlType::Sea => self.send(outbound::set_sea(value as u8)).await.map(|_| true),
            ControlType::SeaAuto => self.send(outbound::sea_auto(value as u8)).await.map(|_| true),
            ControlType::Rain => self.send(outbound::rain_set(value as u8)).await.map(|_| true),
            ControlType::Ftc => self.send(outbound::ftc_set(value as u8)).await.map(|_| true),
            ControlType::TuneFine => self.send(outbound::fine_tune(value as u8)).await.map(|_| true),
            ControlType::TuneCoarse => self.send(outbound::coarse_tune(value as u8)).await.map(|_| true),
            ControlType::BearingAlignment => {
                self.send(outbound::bearing_offset(value)).await.map(|_| true)
            }
            ControlType::Stc => self.send(outbound::stc_preset(value as u8)).await.map(|_| true),
            ControlType::StcCurve => match outbound::curve_level_to_wire(value as u8) {
                Some(wire) => self.send(outbound::curve_select(wire)).await.map(|_| true),
                None => Ok(false),
            },
            ControlType::MbsEnabled => self.send(outbound::mbs_enable(value != 0)).await.map(|_| true),
            ControlType::DisplayTiming => {
                self.send(outbound::display_timing(value as u8)).await.map(|_| true)
            }
            ControlType::InterferenceRejection => {
                if !(0..=2).contains(&value) {
                    return Ok(false);
                }
                self.send(outbound::interference_rejection(value as u8)).await.map(|_| true)
            }
            ControlType::TargetBoost => {
                if !(0..=2).contains(&value) {
                    return Ok(false);
                }
                self.send(outbound::target_boost(value as u8)).await.map(|_| true)
            }
        }
    }

    pub async fn set_auto(&self, ct: ControlType, auto: bool) -> Result<(), RadarError> {
        match ct {
            ControlType::Gain => self.send(outbound::auto_gain(auto)).await,
            ControlType::Rain => self.send(outbound::rain_enable(auto)).await,
            ControlType::Ftc => self.send(outbound::ftc_enable(auto)).await,
            ControlType::TuneFine | ControlType::TuneCoarse => self.send(outbound::auto_tune(auto)).await,
            ControlType::Sea | ControlType::SeaAuto => {
                self.send(outbound::sea_auto(if auto { 1 } else { 0 })).await
            }
            _ => Ok(()),
        }
    }
}
