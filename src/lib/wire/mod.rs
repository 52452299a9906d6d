//! Wire codec (component A): encode/decode every on-wire record.

pub mod announce;
pub mod inbound;
pub mod outbound;
pub mod rle;

/// Spokes per full revolution.
pub const SPOKES: u16 = 2048;
/// Intensity bytes per spoke.
pub const RETURNS_PER_LINE: usize = 512;

/// Raw angular units per revolution used by `angle_raw`/`bearing_raw` math in
/// §4.E. `SPOKES` is doubled here because the reference computes `spoke_index * 2`
/// before adding the degree-scaled rotation terms.
const RAW_UNITS_PER_REVOLUTION: f64 = (SPOKES as f64) * 2.0;

/// `SCALE_DEGREES_TO_RAW` from §4.E: convert a (possibly negative, possibly
/// >360) degree value into the raw angular unit space.
pub fn scale_degrees_to_raw(degrees: f64) -> i64 {
    (degrees * RAW_UNITS_PER_REVOLUTION / 360.0).round() as i64
}

pub mod msg_id {
    pub const FEEDBACK: u32 = 0x0001_0001;
    pub const PRESET_FEEDBACK: u32 = 0x0001_0002;
    pub const SCAN_DATA: u32 = 0x0001_0003;
    pub const CURVE_FEEDBACK: u32 = 0x0001_0005;
    pub const IGNORED_LOW: u32 = 0x0001_0006;
    pub const IGNORED_HIGH: u32 = 0x0001_0009;
    pub const IGNORED_OTHER: u32 = 0x0001_8942;
}

/// The 11-entry ascending range table in meters (§3, §6 S3). May be replaced
/// wholesale when a feedback packet reports a different scale.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeTable(pub Vec<u32>);

impl Default for RangeTable {
    fn default() -> Self {
        RangeTable(vec![
            1852 / 8,
            1852 / 4,
            1852 / 2,
            1852,
            1852 * 3 / 2,
            1852 * 3,
            1852 * 6,
            1852 * 12,
            1852 * 24,
            1852 * 48,
            1852 * 96,
        ])
    }
}

impl RangeTable {
    /// First index whose range is `>= meters` (§8 S3); falls back to the last
    /// entry if `meters` exceeds the whole table.
    pub fn index_for_meters(&self, meters: u32) -> u8 {
        self.0
            .iter()
            .position(|&r| meters <= r)
            .unwrap_or(self.0.len() - 1) as u8
    }

    pub fn meters_for_index(&self, index: u8) -> Option<u32> {
        self.0.get(index as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_selection_picks_first_index_gte() {
        let table = RangeTable::default();
        assert_eq!(table.0[5], 5556);
        assert_eq!(table.0[4], 2778);
        assert_eq!(table.index_for_meters(3000), 5);
    }

    #[test]
    fn scale_degrees_to_raw_half_turn() {
        assert_eq!(scale_degrees_to_raw(180.0), 2048);
        assert_eq!(scale_degrees_to_raw(360.0), 4096);
    }
}
