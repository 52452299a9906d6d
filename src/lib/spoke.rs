//! Spoke pipeline (§4.E): angle/bearing math and missing-spoke accounting,
//! shared by both the live decode path and the emulator (§4.G).

use crate::wire::{self, RETURNS_PER_LINE, SPOKES};

/// One fully positioned spoke ready to hand to the host collaborator.
#[derive(Debug, Clone)]
pub struct Spoke {
    pub angle: u16,
    pub bearing: u16,
    pub range_meters: u32,
    pub data: [u8; RETURNS_PER_LINE],
}

/// Tracks `expected_next_spoke` across a session and turns a raw spoke index
/// into a positioned `Spoke`, counting gaps as they occur (§4.E).
pub struct SpokePipeline {
    expected_next: Option<u16>,
    pub missing_spokes: u64,
}

impl SpokePipeline {
    pub fn new() -> Self {
        SpokePipeline {
            expected_next: None,
            missing_spokes: 0,
        }
    }

    /// Fold in the raw spoke index, updating the missing-spoke counter, and
    /// compute the positioned output angle/bearing for `spoke_index`.
    pub fn accept(&mut self, spoke_index: u16, heading_deg: f64, viewpoint_rotation_deg: f64) -> (u16, u16) {
        if let Some(expected) = self.expected_next {
            if spoke_index != expected {
                let gap = (spoke_index as i32 - expected as i32).rem_euclid(SPOKES as i32);
                self.missing_spokes += gap as u64;
            }
        }
        self.expected_next = Some((spoke_index + 1) % SPOKES);

        let half_turn = wire::scale_degrees_to_raw(180.0);
        let angle_raw = spoke_index as i64 * 2 + half_turn;
        let bearing_raw = angle_raw + wire::scale_degrees_to_raw(heading_deg + viewpoint_rotation_deg);

        let angle = ((angle_raw / 2).rem_euclid(SPOKES as i64)) as u16;
        let bearing = ((bearing_raw / 2).rem_euclid(SPOKES as i64)) as u16;
        (angle, bearing)
    }
}

impl Default for SpokePipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_spoke_never_counts_as_missing() {
        let mut pipeline = SpokePipeline::new();
        pipeline.accept(500, 0.0, 0.0);
        assert_eq!(pipeline.missing_spokes, 0);
    }

    #[test]
    fn gap_is_counted_modularly() {
        let mut pipeline = SpokePipeline::new();
        pipeline.accept(10, 0.0, 0.0);
        pipeline.accept(15, 0.0, 0.0);
        assert_eq!(pipeline.missing_spokes, 4);
    }

    #[test]
    fn no_heading_no_rotation_leaves_angle_and_bearing_equal() {
        let mut pipeline = SpokePipeline::new();
        let (angle, bearing) = pipeline.accept(100, 0.0, 0.0);
        assert_eq!(angle, bearing);
    }
}
