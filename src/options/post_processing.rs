use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Tuning for the screen-space passes. Pixel-valued fields are in logical
/// pixels and get multiplied by the pixel ratio before reaching a shader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Post Processing", inline)]
#[serde(default)]
pub struct PostProcessingOptions {
    /// AO sampling radius in logical pixels.
    #[schemars(title = "AO Radius", range(min = 1.0, max = 32.0), extend("step" = 0.5))]
    pub ao_radius: f32,
    /// View-space depth difference ignored by AO (self-occlusion guard).
    #[schemars(skip)]
    pub ao_bias: f32,
    /// View-space distance beyond which occluders stop counting.
    #[schemars(skip)]
    pub ao_falloff: f32,
    /// Exponent applied to the AO visibility term.
    #[schemars(title = "AO Power", range(min = 0.5, max = 4.0), extend("step" = 0.1))]
    pub ao_power: f32,
    /// Largest depth-of-field blur radius in logical pixels.
    #[schemars(title = "Max Blur Radius", range(min = 1.0, max = 16.0), extend("step" = 0.5))]
    pub dof_max_radius: f32,
    /// Relative depth jump treated as an edge.
    #[schemars(skip)]
    pub edge_depth_threshold: f32,
    /// Contribution of normal discontinuities to edges.
    #[schemars(title = "Normal Edges", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub edge_normal_weight: f32,
    /// Edge sampling distance in logical pixels.
    #[schemars(title = "Outline Thickness", range(min = 0.5, max = 3.0), extend("step" = 0.1))]
    pub outline_thickness: f32,
    /// Exposure multiplier applied in the final composite.
    #[schemars(title = "Exposure", range(min = 0.5, max = 2.0), extend("step" = 0.05))]
    pub exposure: f32,
    /// Gamma exponent applied in the final composite.
    #[schemars(skip)]
    pub gamma: f32,
    /// Clear color of the solid pass (linear RGBA).
    #[schemars(skip)]
    pub background: [f32; 4],
}

impl Default for PostProcessingOptions {
    fn default() -> Self {
        Self {
            ao_radius: 6.0,
            ao_bias: 0.025,
            ao_falloff: 4.0,
            ao_power: 2.0,
            dof_max_radius: 6.0,
            edge_depth_threshold: 0.02,
            edge_normal_weight: 0.5,
            outline_thickness: 1.0,
            exposure: 1.0,
            gamma: 1.0,
            background: [0.0, 0.0, 0.0, 1.0],
        }
    }
}
