use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Toggle and strength for one screen-space effect.
///
/// Strength is validated on every write: negative and NaN inputs become
/// `0.0`, `+inf` becomes `f32::MAX`. A strength of zero makes the effect a
/// pass-through even while enabled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(inline)]
#[serde(default)]
pub struct EffectConfig {
    #[schemars(title = "Enabled")]
    enabled: bool,
    #[schemars(title = "Strength", range(min = 0.0, max = 2.0), extend("step" = 0.05))]
    strength: f32,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: 1.0,
        }
    }
}

impl EffectConfig {
    /// Create a config, clamping `strength`.
    #[must_use]
    pub fn new(enabled: bool, strength: f32) -> Self {
        Self {
            enabled,
            strength: clamp_strength(strength),
        }
    }

    /// Whether the effect is switched on.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Current strength, always `>= 0`.
    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Switch the effect on or off. Strength is left as is.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Set the strength; see the type docs for the clamping rules.
    pub fn set_strength(&mut self, strength: f32) {
        self.strength = clamp_strength(strength);
    }

    /// Strength the effect runs with this frame: zero when disabled.
    pub fn effective_strength(&self) -> f32 {
        if self.enabled {
            self.strength
        } else {
            0.0
        }
    }

    /// True when the effect changes the image.
    pub fn is_active(&self) -> bool {
        self.effective_strength() > 0.0
    }

    fn sanitized(self) -> Self {
        Self::new(self.enabled, self.strength)
    }
}

/// Edge-detection toggle. Its strength is derived from the flag (1.0 when
/// enabled, 0.0 when disabled) and cannot be set independently.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[schemars(inline)]
#[serde(default)]
pub struct EdgeDetectionConfig {
    #[schemars(title = "Enabled")]
    enabled: bool,
}

impl EdgeDetectionConfig {
    /// Create a config with the given flag.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether edge detection is switched on.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Switch edge detection on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Derived strength: `1.0` when enabled, `0.0` otherwise.
    pub fn strength(&self) -> f32 {
        if self.enabled {
            1.0
        } else {
            0.0
        }
    }

    /// True when the effect changes the image.
    pub fn is_active(&self) -> bool {
        self.enabled
    }
}

/// Per-effect toggles and strengths, applied on the next `end()`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[schemars(title = "Effects", inline)]
#[serde(default)]
pub struct EffectsOptions {
    /// Screen-space ambient occlusion.
    #[schemars(title = "Ambient Occlusion")]
    pub ambient_occlusion: EffectConfig,
    /// Depth-of-field blur around the focal plane.
    #[schemars(title = "Depth of Field")]
    pub depth_of_field: EffectConfig,
    /// Depth/normal discontinuity outlines.
    #[schemars(title = "Edge Detection")]
    pub edge_detection: EdgeDetectionConfig,
}

impl EffectsOptions {
    /// Re-apply strength clamping, e.g. after deserializing a preset.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            ambient_occlusion: self.ambient_occlusion.sanitized(),
            depth_of_field: self.depth_of_field.sanitized(),
            edge_detection: self.edge_detection,
        }
    }
}

fn clamp_strength(strength: f32) -> f32 {
    if strength.is_nan() || strength < 0.0 {
        log::warn!("effect strength {strength} clamped to 0");
        0.0
    } else {
        strength.min(f32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_strength_clamps_to_zero() {
        let mut ao = EffectConfig::new(true, 0.5);
        ao.set_strength(-3.0);
        assert_eq!(ao.strength(), 0.0);
        assert!(!ao.is_active());
    }

    #[test]
    fn nan_strength_clamps_to_zero() {
        let config = EffectConfig::new(true, f32::NAN);
        assert_eq!(config.strength(), 0.0);
    }

    #[test]
    fn infinite_strength_saturates() {
        let config = EffectConfig::new(true, f32::INFINITY);
        assert_eq!(config.strength(), f32::MAX);
    }

    #[test]
    fn large_strength_is_kept() {
        let config = EffectConfig::new(true, 7.5);
        assert_eq!(config.strength(), 7.5);
    }

    #[test]
    fn disabling_keeps_strength_but_zeroes_effective() {
        let mut dof = EffectConfig::new(true, 0.8);
        dof.set_enabled(false);
        assert_eq!(dof.strength(), 0.8);
        assert_eq!(dof.effective_strength(), 0.0);
    }

    #[test]
    fn edge_strength_follows_flag() {
        let mut ed = EdgeDetectionConfig::new(true);
        assert_eq!(ed.strength(), 1.0);
        ed.set_enabled(false);
        assert_eq!(ed.strength(), 0.0);
        ed.set_enabled(true);
        assert_eq!(ed.strength(), 1.0);
    }

    #[test]
    fn deserialized_negative_strength_is_sanitized() {
        let effects: EffectsOptions = toml::from_str(
            r"
[ambient_occlusion]
enabled = true
strength = -2.0
",
        )
        .unwrap();
        assert_eq!(effects.ambient_occlusion.strength(), -2.0);
        let effects = effects.sanitized();
        assert_eq!(effects.ambient_occlusion.strength(), 0.0);
        assert!(effects.ambient_occlusion.enabled());
    }
}
