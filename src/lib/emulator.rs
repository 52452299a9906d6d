//! Synthetic spoke generator (§4.G), used when `Settings::emulator_on` is
//! set. Bypasses the network entirely but runs through the same
//! `SpokePipeline` as live data so the host sees an identical shape.

use crate::spoke::{Spoke, SpokePipeline};
use crate::wire::{RETURNS_PER_LINE, SPOKES};

/// Fixed range the emulator always reports (§4.G).
pub const EMULATOR_RANGE_METERS: u32 = 2308;

/// Spokes emitted per second: `SPOKES * 24 RPM / 60 s / 4` quarter-turns.
pub const SPOKES_PER_SECOND: u16 = (SPOKES as u32 * 24 / 60 / 4) as u16;

/// Paints the outer-ring-plus-grid test pattern for one spoke (§4.G).
fn paint(spoke_index: u16, rotation_counter: u32) -> [u8; RETURNS_PER_LINE] {
    let mut data = [0u8; RETURNS_PER_LINE];
    for (i, sample) in data.iter_mut().enumerate() {
        let outer_ring = i >= RETURNS_PER_LINE - 8;
        let grid = (spoke_index as usize + rotation_counter as usize) % 64 == 0 && i % 32 == 0;
        *sample = if outer_ring {
            0xFF
        } else if grid {
            0x80
        } else {
            0
        };
    }
    data
}

/// Generates one second's worth of spokes (§4.G: `SPOKES_PER_SECOND` of
/// them), advancing `rotation_counter` and `next_spoke` across calls.
pub struct Emulator {
    pipeline: SpokePipeline,
    next_spoke: u16,
    rotation_counter: u32,
}

impl Emulator {
    pub fn new() -> Self {
        Emulator {
            pipeline: SpokePipeline::new(),
            next_spoke: 0,
            rotation_counter: 0,
        }
    }

    /// Produce the next second's batch, invoking `emit` once per spoke in
    /// the order the worker would hand them to the host.
    pub fn tick(&mut self, heading_deg: f64, viewpoint_rotation_deg: f64, mut emit: impl FnMut(Spoke)) {
        let step = SPOKES / SPOKES_PER_SECOND;
        for _ in 0..SPOKES_PER_SECOND {
            let (angle, bearing) = self
                .pipeline
                .accept(self.next_spoke, heading_deg, viewpoint_rotation_deg);
            let data = paint(self.next_spoke, self.rotation_counter);
            emit(Spoke {
                angle,
                bearing,
                range_meters: EMULATOR_RANGE_METERS,
                data,
            });
            self.next_spoke = (self.next_spoke + step) % SPOKES;
        }
        self.rotation_counter = self.rotation_counter.wrapping_add(1);
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_tick_emits_the_spec_spoke_count() {
        let mut emulator = Emulator::new();
        let mut count = 0;
        emulator.tick(0.0, 0.0, |_| count += 1);
        assert_eq!(count, SPOKES_PER_SECOND as usize);
    }

    #[test]
    fn every_emitted_spoke_is_in_bounds() {
        let mut emulator = Emulator::new();
        emulator.tick(10.0, 5.0, |spoke| {
            assert!((spoke.angle as u16) < SPOKES);
            assert!((spoke.bearing as u16) < SPOKES);
            assert_eq!(spoke.range_meters, EMULATOR_RANGE_METERS);
        });
    }
}
