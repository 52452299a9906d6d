//! The control registry (component B): a closed, typed map of radar settings.
//!
//! Mirrors the shape of the reference's `CControlItem`/`ControlType` pair, but
//! expresses "not set" and "no such control" as `Result` variants instead of
//! thrown exceptions (§9 DESIGN NOTES).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::error::ControlError;

/// The closed set of radar settings. Membership is fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum ControlType {
    Gain,
    Sea,
    SeaAuto,
    Rain,
    Ftc,
    InterferenceRejection,
    TargetBoost,
    BearingAlignment,
    Stc,
    StcCurve,
    TuneFine,
    TuneCoarse,
    MbsEnabled,
    DisplayTiming,
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControlType::Gain => "gain",
            ControlType::Sea => "sea",
            ControlType::SeaAuto => "sea_auto",
            ControlType::Rain => "rain",
            ControlType::Ftc => "ftc",
            ControlType::InterferenceRejection => "interference_rejection",
            ControlType::TargetBoost => "target_boost",
            ControlType::BearingAlignment => "bearing_alignment",
            ControlType::Stc => "stc",
            ControlType::StcCurve => "stc_curve",
            ControlType::TuneFine => "tune_fine",
            ControlType::TuneCoarse => "tune_coarse",
            ControlType::MbsEnabled => "mbs_enabled",
            ControlType::DisplayTiming => "display_timing",
        };
        f.write_str(s)
    }
}

/// Controls for which `toggle_auto` is a meaningful operation (§4.B).
const AUTO_CAPABLE: [ControlType; 7] = [
    ControlType::Gain,
    ControlType::Rain,
    ControlType::Sea,
    ControlType::SeaAuto,
    ControlType::Ftc,
    ControlType::TuneFine,
    ControlType::TuneCoarse,
];

/// A single radar setting: current value, optional bounds, and the `active` flag
/// whose meaning varies by control (§3).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ControlItem {
    value: Option<i32>,
    min: Option<i32>,
    max: Option<i32>,
    pub active: bool,
}

impl ControlItem {
    fn new() -> Self {
        ControlItem::default()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<i32> {
        self.value
    }

    pub fn min(&self) -> Option<i32> {
        self.min
    }

    pub fn max(&self) -> Option<i32> {
        self.max
    }

    pub fn set_min(&mut self, min: i32) {
        self.min = Some(min);
    }

    pub fn set_max(&mut self, max: i32) {
        self.max = Some(max);
    }

    /// Clamp `v` against `min`/`max` if both are set; otherwise pass through.
    pub fn clamp(&self, v: i32) -> i32 {
        match (self.min, self.max) {
            (Some(min), Some(max)) => v.clamp(min, max),
            _ => v,
        }
    }

    pub fn set(&mut self, value: i32) {
        self.value = Some(value);
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// A typed registry of all fourteen controls, fixed at construction.
#[derive(Debug, Clone)]
pub struct ControlRegistry {
    items: HashMap<ControlType, ControlItem>,
}

impl ControlRegistry {
    /// Build the registry with the constant min/max bounds the reference sets up
    /// in its constructor. Controls whose bounds only become known from a
    /// preset-feedback packet (gain/sea/rain/ftc) start out unbounded.
    pub fn new() -> Self {
        let mut items = HashMap::new();
        for ct in [
            ControlType::Gain,
            ControlType::Sea,
            ControlType::SeaAuto,
            ControlType::Rain,
            ControlType::Ftc,
            ControlType::InterferenceRejection,
            ControlType::TargetBoost,
            ControlType::BearingAlignment,
            ControlType::Stc,
            ControlType::StcCurve,
            ControlType::TuneFine,
            ControlType::TuneCoarse,
            ControlType::MbsEnabled,
            ControlType::DisplayTiming,
        ] {
            items.insert(ct, ControlItem::new());
        }

        let mut registry = ControlRegistry { items };
        registry.bounds_mut(ControlType::Stc).set_min(0);
        registry.bounds_mut(ControlType::TuneFine).set_min(0);
        registry.bounds_mut(ControlType::TuneFine).set_max(255);
        registry.bounds_mut(ControlType::TuneCoarse).set_min(0);
        registry.bounds_mut(ControlType::TuneCoarse).set_max(255);
        registry.bounds_mut(ControlType::BearingAlignment).set_min(-1800);
        registry.bounds_mut(ControlType::BearingAlignment).set_max(1795);
        registry.bounds_mut(ControlType::SeaAuto).set_min(0);
        registry.bounds_mut(ControlType::SeaAuto).set_max(3);
        registry.bounds_mut(ControlType::InterferenceRejection).set_min(0);
        registry.bounds_mut(ControlType::InterferenceRejection).set_max(2);
        registry.bounds_mut(ControlType::TargetBoost).set_min(0);
        registry.bounds_mut(ControlType::TargetBoost).set_max(2);
        registry.bounds_mut(ControlType::DisplayTiming).set_min(0);
        registry.bounds_mut(ControlType::DisplayTiming).set_max(255);
        registry.bounds_mut(ControlType::MbsEnabled).set_min(0);
        registry.bounds_mut(ControlType::MbsEnabled).set_max(1);
        registry.bounds_mut(ControlType::StcCurve).set_min(1);
        registry.bounds_mut(ControlType::StcCurve).set_max(8);
        registry
    }

    fn bounds_mut(&mut self, ct: ControlType) -> &mut ControlItem {
        self.items.get_mut(&ct).expect("fixed control set")
    }

    pub fn get(&self, ct: ControlType) -> &ControlItem {
        self.items.get(&ct).expect("fixed control set")
    }

    pub fn get_mut(&mut self, ct: ControlType) -> &mut ControlItem {
        self.items.get_mut(&ct).expect("fixed control set")
    }

    /// Read the current value, distinguishing "not set" from a real value.
    pub fn value(&self, ct: ControlType) -> Result<i32, ControlError> {
        self.get(ct).value().ok_or(ControlError::NotSet(ct))
    }

    /// Record a value that arrived from the radar (feedback/preset decoding).
    /// This never fails: the wire is always treated as authoritative.
    pub fn record(&mut self, ct: ControlType, value: i32) {
        self.get_mut(ct).set(value);
    }

    pub fn record_active(&mut self, ct: ControlType, active: bool) {
        self.get_mut(ct).set_active(active);
    }

    /// `change_value` (§4.B): clamp `value + delta`, flip to manual if currently
    /// auto, and hand back the clamped value for the caller to send on the wire.
    /// Returns `None` if the value isn't set yet or bounds are unknown (fails
    /// silently, per spec).
    pub fn change_value(&mut self, ct: ControlType, delta: i32) -> Option<i32> {
        let item = self.get(ct);
        let current = item.value()?;
        let (min, max) = (item.min()?, item.max()?);
        let new_value = (current + delta).clamp(min, max);
        if !self.get(ct).active {
            self.toggle_auto(ct).ok();
        }
        self.get_mut(ct).set(new_value);
        Some(new_value)
    }

    /// `toggle_auto` (§4.B): permitted only for the auto-capable controls, and
    /// only once the control has a value. Flips `active` in place and returns
    /// the PRE-toggle value — the caller needs the old value, not the new
    /// one, to build the matching wire command (component F): some controls
    /// send the old active value as-is, others send its negation.
    pub fn toggle_auto(&mut self, ct: ControlType) -> Result<bool, ControlError> {
        if !AUTO_CAPABLE.contains(&ct) {
            return Err(ControlError::InvalidControl(format!(
                "{ct} has no auto mode"
            )));
        }
        let item = self.get_mut(ct);
        if !item.is_set() {
            return Err(ControlError::NotSet(ct));
        }
        let was_active = item.active;
        item.active = !was_active;
        Ok(was_active)
    }
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only telemetry (§3 MiscInfo), separate from the settings registry.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MiscInfo {
    pub warmup_seconds: u8,
    pub signal_strength: u8,
    pub magnetron_current: u16,
    pub magnetron_hours: u32,
    pub rotation_period_ms: u16,
}

/// The UI descriptor contract from §4.B / §9: for controls with a companion
/// auto-selector, the owning widget (outside core scope) decides which value
/// to display. The registry only hands out the descriptor; it holds no UI state.
#[derive(Debug, Clone)]
pub struct ControlDescriptor {
    pub primary: ControlType,
    pub companion: Option<ControlType>,
    pub labels: Option<Vec<String>>,
}

pub fn descriptor_for(ct: ControlType) -> ControlDescriptor {
    let companion = match ct {
        ControlType::Sea => Some(ControlType::SeaAuto),
        _ => None,
    };
    ControlDescriptor {
        primary: ct,
        companion,
        labels: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_value_clamps_and_flips_auto() {
        let mut reg = ControlRegistry::new();
        reg.record(ControlType::BearingAlignment, 1790);
        reg.record_active(ControlType::BearingAlignment, true);

        let v = reg.change_value(ControlType::BearingAlignment, 100).unwrap();
        assert_eq!(v, 1795);
        assert!(reg.value(ControlType::BearingAlignment).unwrap() <= 1795);
    }

    #[test]
    fn toggle_auto_is_idempotent_in_pairs() {
        let mut reg = ControlRegistry::new();
        reg.record(ControlType::Gain, 50);
        reg.record_active(ControlType::Gain, true);

        let before = reg.get(ControlType::Gain).active;
        reg.toggle_auto(ControlType::Gain).unwrap();
        reg.toggle_auto(ControlType::Gain).unwrap();
        assert_eq!(reg.get(ControlType::Gain).active, before);
    }

    #[test]
    fn toggle_auto_rejects_non_auto_controls() {
        let mut reg = ControlRegistry::new();
        assert!(reg.toggle_auto(ControlType::BearingAlignment).is_err());
    }

    #[test]
    fn reading_unset_value_is_an_error() {
        let reg = ControlRegistry::new();
        assert!(matches!(
            reg.value(ControlType::Gain),
            Err(ControlError::NotSet(ControlType::Gain))
        ));
    }
}
