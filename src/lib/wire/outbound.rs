//! Command surface encoders (component F, §4.F). Each template below is
//! copied verbatim from reference captures (original_source/RMControl.cpp);
//! only the named offset(s) are mutated per call. These are NOT a uniform
//! "lead + value" shape — several carry fixed trailing padding the radar
//! apparently expects, so the literal bytes are kept rather than derived
//! from a single rule.

/// TX on/off/shutdown. `value`: 0=off, 1=on, 3=shutdown.
pub fn tx_control(value: u8) -> Vec<u8> {
    patched(&[0x01, 0x80, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00], 4, value)
}

/// Set range, index 0..10.
pub fn set_range(index: u8) -> Vec<u8> {
    patched(
        &[0x01, 0x81, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        8,
        index,
    )
}

pub fn mbs_enable(on: bool) -> Vec<u8> {
    patched(
        &[
            0x01, 0x82, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        16,
        on as u8,
    )
}

pub fn display_timing(value: u8) -> Vec<u8> {
    patched(
        &[0x02, 0x82, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        8,
        value,
    )
}

pub fn stc_preset(value: u8) -> Vec<u8> {
    patched(
        &[0x03, 0x82, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        8,
        value,
    )
}

pub fn coarse_tune(value: u8) -> Vec<u8> {
    patched(&[0x04, 0x82, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00], 4, value)
}

/// Bearing offset: signed tenths of a degree, written as a sign-extended i32.
pub fn bearing_offset(tenths: i32) -> Vec<u8> {
    let mut cmd = vec![0x07, 0x82, 0x01, 0x00];
    cmd.extend_from_slice(&tenths.to_le_bytes());
    cmd
}

pub fn set_gain(value: u8) -> Vec<u8> {
    patched(
        &[
            0x01, 0x83, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        20,
        value,
    )
}

pub fn auto_gain(auto: bool) -> Vec<u8> {
    patched(
        &[
            0x01, 0x83, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        16,
        auto as u8,
    )
}

pub fn set_sea(value: u8) -> Vec<u8> {
    patched(
        &[
            0x02, 0x83, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        20,
        value,
    )
}

/// 0..3 (disabled/harbour/offshore/coastal).
pub fn sea_auto(mode: u8) -> Vec<u8> {
    patched(
        &[
            0x02, 0x83, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        16,
        mode,
    )
}

pub fn rain_enable(on: bool) -> Vec<u8> {
    patched(
        &[
            0x03, 0x83, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        16,
        on as u8,
    )
}

pub fn rain_set(value: u8) -> Vec<u8> {
    patched(
        &[
            0x03, 0x83, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        20,
        value,
    )
}

pub fn ftc_enable(on: bool) -> Vec<u8> {
    patched(
        &[
            0x04, 0x83, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        16,
        on as u8,
    )
}

pub fn ftc_set(value: u8) -> Vec<u8> {
    patched(
        &[
            0x04, 0x83, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        20,
        value,
    )
}

pub fn auto_tune(auto: bool) -> Vec<u8> {
    patched(
        &[
            0x05, 0x83, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        12,
        auto as u8,
    )
}

pub fn fine_tune(value: u8) -> Vec<u8> {
    patched(
        &[
            0x05, 0x83, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        16,
        value,
    )
}

/// 0..2
pub fn target_boost(value: u8) -> Vec<u8> {
    patched(
        &[0x06, 0x83, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        8,
        value,
    )
}

/// 0..2
pub fn interference_rejection(value: u8) -> Vec<u8> {
    patched(&[0x07, 0x83, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00], 4, value)
}

/// Curve value is already mapped via `{0,1,2,4,6,8,10,13}` before this call.
/// Unlike every other command this template carries no trailing padding.
pub fn curve_select(mapped_value: u8) -> Vec<u8> {
    patched(&[0x0A, 0x83, 0x01, 0x00, 0x00], 4, mapped_value)
}

/// The single on-the-wire curve value set, indexed by curve level 1..8
/// (§4.A CurveFeedback, §8 S6).
pub const CURVE_VALUES: [u8; 8] = [0, 1, 2, 4, 6, 8, 10, 13];

/// Map a curve level (1..8) to its wire value.
pub fn curve_level_to_wire(level: u8) -> Option<u8> {
    CURVE_VALUES.get((level.checked_sub(1))? as usize).copied()
}

/// Map a wire curve value back to a 1..8 level (§8 S6: wire value 8 -> level 6).
pub fn curve_wire_to_level(wire: u8) -> Option<u8> {
    CURVE_VALUES
        .iter()
        .position(|&v| v == wire)
        .map(|i| (i + 1) as u8)
}

/// 1 s keepalive, sent to the radar's command address whenever transmit is
/// enabled and a session is live (§4.D).
pub const KEEPALIVE_1S: [u8; 12] = [
    0x00, 0x80, 0x01, 0x00, 0x52, 0x41, 0x44, 0x41, 0x52, 0x00, 0x00, 0x00,
];

/// 5 s status poll (§4.D, §6).
pub const KEEPALIVE_5S: [u8; 36] = [
    0x03, 0x89, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x68, 0x01, 0x00, 0x00, 0x9e, 0x03, 0x00, 0x00, 0xb4, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// The one-shot 72-byte message sent once right after opening the data
/// socket, alongside the two keepalives (§4.D init burst).
pub const ONCE_MESSAGE: [u8; 72] = [
    0x02, 0x81, 0x01, 0x00, 0x7d, 0x00, 0x00, 0x00, 0xfa, 0x00, 0x00, 0x00, 0xf4, 0x01, 0x00,
    0x00, 0xee, 0x02, 0x00, 0x00, 0xdc, 0x05, 0x00, 0x00, 0xb8, 0x0b, 0x00, 0x00, 0x70, 0x17,
    0x00, 0x00, 0xe0, 0x2e, 0x00, 0x00, 0xc0, 0x5d, 0x00, 0x00, 0x80, 0xbb, 0x00, 0x00, 0x40,
    0x19, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// The 16-byte wakeup magic string, sent 10x at 10 ms cadence to the
/// announce group (§4.D, §6).
pub const WAKEUP_MAGIC: &[u8; 16] = b"ABCDEFGHIJKLMNOP";

fn patched(template: &[u8], value_offset: usize, value: u8) -> Vec<u8> {
    let mut cmd = template.to_vec();
    cmd[value_offset] = value;
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s2_bearing_offset_encode() {
        let cmd = bearing_offset(-450);
        assert_eq!(cmd, vec![0x07, 0x82, 0x01, 0x00, 0x3E, 0xFE, 0xFF, 0xFF]);
    }

    #[test]
    fn s3_range_command_byte() {
        let cmd = set_range(5);
        assert_eq!(cmd[8], 0x05);
        assert_eq!(&cmd[0..4], &[0x01, 0x81, 0x01, 0x00]);
        assert_eq!(cmd.len(), 12);
    }

    #[test]
    fn s6_curve_mapping() {
        assert_eq!(curve_wire_to_level(8), Some(6));
    }

    #[test]
    fn templates_only_differ_at_value_offset() {
        let a = tx_control(0);
        let b = tx_control(1);
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            if i != 4 {
                assert_eq!(x, y, "byte {i} should be invariant across values");
            }
        }
    }

    #[test]
    fn curve_select_has_no_trailing_padding() {
        assert_eq!(curve_select(8).len(), 5);
    }

    #[test]
    fn keepalives_match_reference_lengths() {
        assert_eq!(KEEPALIVE_1S.len(), 12);
        assert_eq!(KEEPALIVE_5S.len(), 36);
        assert_eq!(ONCE_MESSAGE.len(), 72);
    }
}
