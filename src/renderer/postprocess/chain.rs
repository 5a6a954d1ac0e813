//! Backend-neutral planning of the post-process chain.

use crate::options::EffectsOptions;

/// A screen-space effect stage, in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EffectStage {
    AmbientOcclusion,
    DepthOfField,
    EdgeDetection,
}

impl EffectStage {
    /// Fixed execution order.
    pub const ORDER: [Self; 3] = [
        Self::AmbientOcclusion,
        Self::DepthOfField,
        Self::EdgeDetection,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::AmbientOcclusion => "Ambient Occlusion Pass",
            Self::DepthOfField => "Depth of Field Pass",
            Self::EdgeDetection => "Edge Detection Pass",
        }
    }

    /// Whether the stage would change the image with these settings.
    pub fn is_active(self, effects: &EffectsOptions) -> bool {
        match self {
            Self::AmbientOcclusion => effects.ambient_occlusion.is_active(),
            Self::DepthOfField => effects.depth_of_field.is_active(),
            Self::EdgeDetection => effects.edge_detection.is_active(),
        }
    }
}

/// Color buffer a stage reads from or writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// The solid pass output.
    Color,
    ScratchA,
    ScratchB,
}

impl Slot {
    pub const ALL: [Self; 3] = [Self::Color, Self::ScratchA, Self::ScratchB];

    pub fn index(self) -> usize {
        match self {
            Self::Color => 0,
            Self::ScratchA => 1,
            Self::ScratchB => 2,
        }
    }

    /// Where the stage after one reading `self` writes. The solid color
    /// buffer is never overwritten.
    fn next(self) -> Self {
        match self {
            Self::Color | Self::ScratchB => Self::ScratchA,
            Self::ScratchA => Self::ScratchB,
        }
    }
}

/// One stage execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StageStep {
    pub stage: EffectStage,
    pub source: Slot,
    pub target: Slot,
}

/// The stages to run this frame and where the composite reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChainPlan {
    pub steps: Vec<StageStep>,
    pub composite_source: Slot,
}

impl ChainPlan {
    pub fn plan(effects: &EffectsOptions) -> Self {
        let mut steps = Vec::with_capacity(EffectStage::ORDER.len());
        let mut source = Slot::Color;
        for stage in EffectStage::ORDER {
            if !stage.is_active(effects) {
                continue;
            }
            let target = source.next();
            steps.push(StageStep {
                stage,
                source,
                target,
            });
            source = target;
        }
        Self {
            steps,
            composite_source: source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{EdgeDetectionConfig, EffectConfig};

    fn effects(ao: f32, dof: f32, ed: bool) -> EffectsOptions {
        EffectsOptions {
            ambient_occlusion: EffectConfig::new(true, ao),
            depth_of_field: EffectConfig::new(true, dof),
            edge_detection: EdgeDetectionConfig::new(ed),
        }
    }

    #[test]
    fn nothing_active_composites_solid_color() {
        let plan = ChainPlan::plan(&EffectsOptions::default());
        assert!(plan.steps.is_empty());
        assert_eq!(plan.composite_source, Slot::Color);
    }

    #[test]
    fn all_stages_ping_pong_in_order() {
        let plan = ChainPlan::plan(&effects(1.0, 1.0, true));
        let route: Vec<_> = plan
            .steps
            .iter()
            .map(|s| (s.stage, s.source, s.target))
            .collect();
        assert_eq!(
            route,
            vec![
                (EffectStage::AmbientOcclusion, Slot::Color, Slot::ScratchA),
                (EffectStage::DepthOfField, Slot::ScratchA, Slot::ScratchB),
                (EffectStage::EdgeDetection, Slot::ScratchB, Slot::ScratchA),
            ]
        );
        assert_eq!(plan.composite_source, Slot::ScratchA);
    }

    #[test]
    fn zero_strength_stage_is_skipped() {
        let plan = ChainPlan::plan(&effects(0.0, 0.5, false));
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].stage, EffectStage::DepthOfField);
        assert_eq!(plan.steps[0].source, Slot::Color);
        assert_eq!(plan.composite_source, Slot::ScratchA);
    }

    #[test]
    fn no_step_reads_its_own_target() {
        let plan = ChainPlan::plan(&effects(1.0, 1.0, true));
        assert!(plan.steps.iter().all(|s| s.source != s.target));
        assert!(plan.steps.iter().all(|s| s.target != Slot::Color));
    }
}
