//! Decode of the fixed-size inbound records (§4.A): feedback, preset
//! feedback, curve feedback, and scan-data. All reads are explicit
//! little-endian with bounds checks — no packed-struct overlays (§9).

use crate::control::{ControlRegistry, ControlType};
use crate::error::RadarError;
use crate::wire::{self, msg_id, rle, RangeTable, RETURNS_PER_LINE};

fn u32_at(buf: &[u8], offset: usize) -> Option<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn i16_at(buf: &[u8], offset: usize) -> Option<i16> {
    buf.get(offset..offset + 2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
}

fn u16_at(buf: &[u8], offset: usize) -> Option<u16> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn u8_at(buf: &[u8], offset: usize) -> Option<u8> {
    buf.get(offset).copied()
}

/// Radar runtime status byte carried in Feedback (§4.D drives transitions
/// off this).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadarStatus {
    Standby,
    Transmit,
    Warmup,
    Off,
    ShuttingDown,
    Unknown(u8),
}

impl From<u8> for RadarStatus {
    fn from(b: u8) -> Self {
        match b {
            0 => RadarStatus::Standby,
            1 => RadarStatus::Transmit,
            2 => RadarStatus::Warmup,
            3 => RadarStatus::Off,
            6 => RadarStatus::ShuttingDown,
            other => RadarStatus::Unknown(other),
        }
    }
}

pub const FEEDBACK_LEN: usize = 245;

#[derive(Debug, Clone)]
pub struct Feedback {
    pub range_values: [u32; 11],
    pub status: RadarStatus,
    pub warmup_time: u8,
    pub signal_strength: u8,
    pub range_id: u8,
    pub auto_gain: bool,
    pub gain: u32,
    pub auto_sea: u8,
    pub sea_value: u8,
    pub rain_enabled: bool,
    pub rain_value: u8,
    pub ftc_enabled: bool,
    pub ftc_value: u8,
    pub auto_tune: bool,
    pub tune: u8,
    pub bearing_offset: i16,
    pub interference_rejection: u8,
    pub target_expansion: u8,
    pub mbs_enabled: bool,
}

pub fn decode_feedback(buf: &[u8]) -> Result<Feedback, RadarError> {
    if buf.len() < FEEDBACK_LEN {
        return Err(RadarError::Decode(format!(
            "feedback packet too short: {} < {FEEDBACK_LEN}",
            buf.len()
        )));
    }
    let mut range_values = [0u32; 11];
    for (i, slot) in range_values.iter_mut().enumerate() {
        *slot = u32_at(buf, 4 + i * 4).ok_or_else(|| RadarError::Decode("range table".into()))?;
    }
    Ok(Feedback {
        range_values,
        status: u8_at(buf, 180).ok_or_else(|| RadarError::Decode("status".into()))?.into(),
        warmup_time: u8_at(buf, 184).unwrap(),
        signal_strength: u8_at(buf, 185).unwrap(),
        range_id: u8_at(buf, 193).unwrap(),
        auto_gain: u8_at(buf, 196).unwrap() != 0,
        gain: u32_at(buf, 200).unwrap(),
        auto_sea: u8_at(buf, 204).unwrap(),
        sea_value: u8_at(buf, 208).unwrap(),
        rain_enabled: u8_at(buf, 209).unwrap() != 0,
        rain_value: u8_at(buf, 213).unwrap(),
        ftc_enabled: u8_at(buf, 214).unwrap() != 0,
        ftc_value: u8_at(buf, 218).unwrap(),
        auto_tune: u8_at(buf, 219).unwrap() != 0,
        tune: u8_at(buf, 223).unwrap(),
        bearing_offset: i16_at(buf, 224).unwrap(),
        interference_rejection: u8_at(buf, 226).unwrap(),
        target_expansion: u8_at(buf, 230).unwrap(),
        mbs_enabled: u8_at(buf, 244).unwrap() != 0,
    })
}

/// Apply a decoded Feedback record to the control registry and range table.
/// Returns whether the range table's units changed (range_values[0] differs
/// from what was previously recorded), mirroring the reference's
/// "units changed" detection.
pub fn apply_feedback(
    registry: &mut ControlRegistry,
    ranges: &mut RangeTable,
    fb: &Feedback,
) -> bool {
    registry.record(ControlType::Gain, fb.gain as i32);
    registry.record_active(ControlType::Gain, !fb.auto_gain);
    registry.record(ControlType::Sea, fb.sea_value as i32);
    registry.record(ControlType::SeaAuto, fb.auto_sea as i32);
    registry.record_active(ControlType::SeaAuto, fb.auto_sea != 0);
    registry.record(ControlType::Rain, fb.rain_value as i32);
    registry.record_active(ControlType::Rain, fb.rain_enabled);
    registry.record(ControlType::Ftc, fb.ftc_value as i32);
    registry.record_active(ControlType::Ftc, fb.ftc_enabled);
    registry.record(ControlType::TuneFine, fb.tune as i32);
    registry.record_active(ControlType::TuneFine, !fb.auto_tune);
    registry.record_active(ControlType::TuneCoarse, !fb.auto_tune);
    registry.record(ControlType::BearingAlignment, fb.bearing_offset as i32);
    registry.record(ControlType::InterferenceRejection, fb.interference_rejection as i32);
    registry.record(ControlType::TargetBoost, fb.target_expansion as i32);
    registry.record(ControlType::MbsEnabled, fb.mbs_enabled as i32);

    let units_changed = ranges.0.first().copied() != Some(fb.range_values[0]);
    if units_changed {
        ranges.0 = fb.range_values.to_vec();
    }
    units_changed
}

pub const PRESET_FEEDBACK_LEN: usize = 308;

#[derive(Debug, Clone)]
pub struct PresetFeedback {
    pub magnetron_hours: u16,
    pub magnetron_current: u8,
    pub rotation_time_ms: u16,
    pub stc_preset_max: u8,
    pub display_timing_value: u8,
    pub stc_preset_value: u8,
    pub min_gain: u8,
    pub max_gain: u8,
    pub min_sea: u8,
    pub max_sea: u8,
    pub min_rain: u8,
    pub max_rain: u8,
    pub min_ftc: u8,
    pub max_ftc: u8,
    pub signal_strength_value: u8,
    pub coarse_tune_value: u8,
}

pub fn decode_preset_feedback(buf: &[u8]) -> Result<PresetFeedback, RadarError> {
    if buf.len() < PRESET_FEEDBACK_LEN {
        return Err(RadarError::Decode(format!(
            "preset feedback packet too short: {} < {PRESET_FEEDBACK_LEN}",
            buf.len()
        )));
    }
    Ok(PresetFeedback {
        magnetron_hours: u16_at(buf, 217).unwrap(),
        magnetron_current: u8_at(buf, 225).unwrap(),
        rotation_time_ms: u16_at(buf, 237).unwrap(),
        stc_preset_max: u8_at(buf, 252).unwrap(),
        display_timing_value: u8_at(buf, 267).unwrap(),
        stc_preset_value: u8_at(buf, 280).unwrap(),
        min_gain: u8_at(buf, 293).unwrap(),
        max_gain: u8_at(buf, 294).unwrap(),
        min_sea: u8_at(buf, 295).unwrap(),
        max_sea: u8_at(buf, 296).unwrap(),
        min_rain: u8_at(buf, 297).unwrap(),
        max_rain: u8_at(buf, 298).unwrap(),
        min_ftc: u8_at(buf, 299).unwrap(),
        max_ftc: u8_at(buf, 300).unwrap(),
        signal_strength_value: u8_at(buf, 305).unwrap(),
        coarse_tune_value: u8_at(buf, 304).unwrap(),
    })
}

pub fn apply_preset_feedback(registry: &mut ControlRegistry, pf: &PresetFeedback) {
    registry.get_mut(ControlType::Gain).set_min(pf.min_gain as i32);
    registry.get_mut(ControlType::Gain).set_max(pf.max_gain as i32);
    registry.get_mut(ControlType::Sea).set_min(pf.min_sea as i32);
    registry.get_mut(ControlType::Sea).set_max(pf.max_sea as i32);
    registry.get_mut(ControlType::Rain).set_min(pf.min_rain as i32);
    registry.get_mut(ControlType::Rain).set_max(pf.max_rain as i32);
    registry.get_mut(ControlType::Ftc).set_min(pf.min_ftc as i32);
    registry.get_mut(ControlType::Ftc).set_max(pf.max_ftc as i32);
    registry.record(ControlType::Stc, pf.stc_preset_value as i32);
    registry.get_mut(ControlType::Stc).set_max(pf.stc_preset_max as i32);
    registry.record(ControlType::DisplayTiming, pf.display_timing_value as i32);
    registry.record(ControlType::TuneCoarse, pf.coarse_tune_value as i32);
}

/// Decode the single curve-feedback byte into its 1..8 level (§4.A, §8 S6).
pub fn decode_curve_feedback(buf: &[u8]) -> Result<u8, RadarError> {
    let wire = u8_at(buf, 4).ok_or_else(|| RadarError::Decode("curve feedback too short".into()))?;
    crate::wire::outbound::curve_wire_to_level(wire)
        .ok_or_else(|| RadarError::Decode(format!("unrecognized curve value {wire}")))
}

/// Which wire variant a scan-data packet declared itself to be (§4.A).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadarFlavor {
    Br24,
    FourG,
}

#[derive(Debug, Clone)]
pub struct DecodedSpoke {
    pub spoke_index: u16,
    pub samples: [u8; RETURNS_PER_LINE],
}

#[derive(Debug, Default)]
pub struct ScanDataStats {
    pub broken_spokes: u32,
}

const PACKET_HEADER_LEN: usize = 32;
const SCAN_HEADER_LEN: usize = 0x28;
const OPT_HEADER_LEN: usize = 0x1c;
const SCAN_DATA_HEADER_LEN: usize = 12;
const FLAVOR_FLAG_OFFSET: usize = 28;

/// Parse a scan-data datagram body (everything after the leading `msg_id`)
/// into its spoke records, tolerating trailing bytes after a last-marked
/// record (§4.A).
pub fn decode_scan_data(
    buf: &[u8],
    stats: &mut ScanDataStats,
) -> Result<(RadarFlavor, Vec<DecodedSpoke>), RadarError> {
    if buf.len() < PACKET_HEADER_LEN + SCAN_HEADER_LEN {
        return Err(RadarError::Decode("scan packet too short".into()));
    }
    let something_1 = u32_at(buf, 8).unwrap_or(0);
    let something_3 = u32_at(buf, 20).unwrap_or(0);
    if something_1 != 0x1c || something_3 != 1 {
        return Err(RadarError::Decode("scan packet header mismatch".into()));
    }
    let flavor_flag = u32_at(buf, FLAVOR_FLAG_OFFSET).unwrap_or(0);
    let flavor = if flavor_flag == 0x400 {
        RadarFlavor::FourG
    } else {
        RadarFlavor::Br24
    };

    let mut spokes = Vec::new();
    let mut offset = PACKET_HEADER_LEN;

    while offset + SCAN_HEADER_LEN <= buf.len() {
        let header_type = u32_at(buf, offset).unwrap();
        let header_len = u32_at(buf, offset + 4).unwrap();
        if header_type != 1 || header_len != SCAN_HEADER_LEN as u32 {
            log::debug!("scan header mismatch at offset {offset}, stopping");
            break;
        }
        let azimuth = u32_at(buf, offset + 8).unwrap();
        let d2 = u32_at(buf, offset + 12).unwrap();
        let d3 = u32_at(buf, offset + 16).unwrap();
        let d4 = u32_at(buf, offset + 20).unwrap();
        let d5 = u32_at(buf, offset + 24).unwrap();
        let d6 = u32_at(buf, offset + 28).unwrap();
        let d7 = u32_at(buf, offset + 36).unwrap();
        let is_br24_pattern = (d2, d3, d4, d5, d6, d7) == (1, 2, 1, 1, 0x1f4, 1);
        let is_4g_pattern = (d2, d3, d4, d5, d6, d7) == (3, 2, 3, 0, 0, 1);
        if !is_br24_pattern && !is_4g_pattern {
            log::debug!("scan header discriminator mismatch at offset {offset}, stopping");
            break;
        }
        offset += SCAN_HEADER_LEN;

        if offset + 8 <= buf.len() {
            let opt_type = u32_at(buf, offset).unwrap();
            if opt_type == 2 {
                let opt_len = u32_at(buf, offset + 4).unwrap_or(OPT_HEADER_LEN as u32);
                offset += opt_len as usize;
            }
        }

        if offset + SCAN_DATA_HEADER_LEN > buf.len() {
            break;
        }
        let raw_type = u32_at(buf, offset).unwrap();
        let is_last = raw_type & 0x8000_0000 != 0;
        let record_type = raw_type & 0x7fff_ffff;
        let length = u32_at(buf, offset + 4).unwrap();
        let data_len = u32_at(buf, offset + 8).unwrap();
        if record_type != 3 || length < data_len + 8 {
            log::debug!("scan data header mismatch at offset {offset}");
            break;
        }
        let data_start = offset + SCAN_DATA_HEADER_LEN;
        let data = buf.get(data_start..).unwrap_or(&[]);

        let samples = match flavor {
            RadarFlavor::Br24 => rle::decode(data, data_len, length),
            RadarFlavor::FourG => {
                if data_len as usize != RETURNS_PER_LINE {
                    stats.broken_spokes += 1;
                    log::debug!("4G spoke data_len {data_len} != {RETURNS_PER_LINE}, abandoning packet");
                    break;
                }
                let mut samples = [0u8; RETURNS_PER_LINE];
                let n = data.len().min(RETURNS_PER_LINE);
                samples[..n].copy_from_slice(&data[..n]);
                samples
            }
        };

        spokes.push(DecodedSpoke {
            spoke_index: (azimuth % wire::SPOKES as u32) as u16,
            samples,
        });

        offset = data_start + data_len as usize;

        if is_last {
            if offset < buf.len() {
                log::trace!("{} trailing bytes after last-marked scan record", buf.len() - offset);
            }
            break;
        }
    }

    Ok((flavor, spokes))
}

/// Top-level dispatch on the leading `msg_id` (§4.A).
pub enum InboundRecord {
    Feedback(Feedback),
    PresetFeedback(PresetFeedback),
    ScanData(RadarFlavor, Vec<DecodedSpoke>),
    CurveLevel(u8),
    Ignored(u32),
}

pub fn decode_datagram(buf: &[u8], stats: &mut ScanDataStats) -> Result<InboundRecord, RadarError> {
    let id = u32_at(buf, 0).ok_or_else(|| RadarError::Decode("datagram shorter than msg_id".into()))?;
    match id {
        msg_id::FEEDBACK => decode_feedback(buf).map(InboundRecord::Feedback),
        msg_id::PRESET_FEEDBACK => decode_preset_feedback(buf).map(InboundRecord::PresetFeedback),
        msg_id::SCAN_DATA => {
            let (flavor, spokes) = decode_scan_data(buf, stats)?;
            Ok(InboundRecord::ScanData(flavor, spokes))
        }
        msg_id::CURVE_FEEDBACK => decode_curve_feedback(buf).map(InboundRecord::CurveLevel),
        msg_id::IGNORED_LOW..=msg_id::IGNORED_HIGH | msg_id::IGNORED_OTHER => {
            Ok(InboundRecord::Ignored(id))
        }
        other => {
            log::trace!("ignoring unrecognized msg_id {other:#010x}");
            Ok(InboundRecord::Ignored(other))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s6_curve_feedback_decode() {
        let mut buf = vec![0u8; 5];
        buf[0..4].copy_from_slice(&msg_id::CURVE_FEEDBACK.to_le_bytes());
        buf[4] = 8;
        let level = decode_curve_feedback(&buf).unwrap();
        assert_eq!(level, 6);
    }

    #[test]
    fn feedback_too_short_is_a_decode_error() {
        assert!(decode_feedback(&[0u8; 10]).is_err());
    }
}
