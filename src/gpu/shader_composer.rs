use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage,
    ShaderType,
};

use crate::error::PipelineError;

/// Screen-pass shaders known to the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shader {
    /// Screen-space ambient occlusion.
    AmbientOcclusion,
    /// Depth-of-field gather blur.
    DepthOfField,
    /// Depth/normal edge outlines.
    EdgeDetection,
    /// Exposure/gamma composite into the display target.
    Composite,
}

impl Shader {
    /// Every shader, in pipeline order.
    pub const ALL: [Self; 4] = [
        Self::AmbientOcclusion,
        Self::DepthOfField,
        Self::EdgeDetection,
        Self::Composite,
    ];

    /// Debug label for the created module.
    pub fn label(self) -> &'static str {
        match self {
            Self::AmbientOcclusion => "Ambient Occlusion Shader",
            Self::DepthOfField => "Depth of Field Shader",
            Self::EdgeDetection => "Edge Detection Shader",
            Self::Composite => "Composite Shader",
        }
    }

    /// Path reported in composition errors.
    pub fn path(self) -> &'static str {
        match self {
            Self::AmbientOcclusion => "screen/ambient_occlusion.wgsl",
            Self::DepthOfField => "screen/depth_of_field.wgsl",
            Self::EdgeDetection => "screen/edge_detection.wgsl",
            Self::Composite => "screen/composite.wgsl",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Self::AmbientOcclusion => include_str!(
                "../../assets/shaders/screen/ambient_occlusion.wgsl"
            ),
            Self::DepthOfField => {
                include_str!("../../assets/shaders/screen/depth_of_field.wgsl")
            }
            Self::EdgeDetection => {
                include_str!("../../assets/shaders/screen/edge_detection.wgsl")
            }
            Self::Composite => {
                include_str!("../../assets/shaders/screen/composite.wgsl")
            }
        }
    }
}

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Pre-loads the shared WGSL modules at construction time. Consuming shaders
/// use `#import solid::module_name` to pull in shared code. The composer
/// produces `naga::Module` IR directly, skipping WGSL re-parse at runtime.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition: (source, file_path).
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

const MODULES: &[ModuleDef] = &[
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/fullscreen.wgsl"),
        file_path: "modules/fullscreen.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/depth.wgsl"),
        file_path: "modules/depth.wgsl",
    },
];

impl ShaderComposer {
    /// Build a composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Shader`] if a shared module fails to parse.
    pub fn new() -> Result<Self, PipelineError> {
        let mut composer = Composer::default();

        // Modules with no dependencies first.
        for m in MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    PipelineError::Shader(format!(
                        "failed to register module '{}': {e}",
                        m.file_path
                    ))
                })?;
        }

        Ok(Self { composer })
    }

    /// Compose a screen shader into a `wgpu::ShaderModule` ready for
    /// pipeline creation.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Shader`] if composition fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        shader: Shader,
    ) -> Result<wgpu::ShaderModule, PipelineError> {
        let naga_module = self.compose_naga(shader)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(shader.label()),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader into a `naga::Module` without creating a wgpu shader
    /// module. Useful for testing shader composition without a GPU device.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Shader`] if composition fails.
    pub fn compose_naga(
        &mut self,
        shader: Shader,
    ) -> Result<naga::Module, PipelineError> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source: shader.source(),
                file_path: shader.path(),
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| {
                PipelineError::Shader(format!(
                    "failed to compose '{}': {e}",
                    shader.path()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_shaders_compose() {
        let mut composer = ShaderComposer::new().unwrap();
        for shader in Shader::ALL {
            let module = composer
                .compose_naga(shader)
                .unwrap_or_else(|e| panic!("{e}"));
            let entry_points: Vec<&str> = module
                .entry_points
                .iter()
                .map(|ep| ep.name.as_str())
                .collect();
            assert!(entry_points.contains(&"vs_main"), "{}", shader.path());
            assert!(entry_points.contains(&"fs_main"), "{}", shader.path());
        }
    }

    /// GL backends cannot translate `textureLoad` on depth textures.
    #[test]
    fn depth_is_never_fetched_with_texture_load() {
        let mut composer = ShaderComposer::new().unwrap();
        for shader in Shader::ALL {
            let module = composer.compose_naga(shader).unwrap();
            let is_depth = |global: naga::Handle<naga::GlobalVariable>| {
                matches!(
                    module.types[module.global_variables[global].ty].inner,
                    naga::TypeInner::Image {
                        class: naga::ImageClass::Depth { .. },
                        ..
                    }
                )
            };
            let functions = module
                .functions
                .iter()
                .map(|(_, f)| f)
                .chain(module.entry_points.iter().map(|ep| &ep.function));
            for function in functions {
                for (_, expr) in function.expressions.iter() {
                    let naga::Expression::ImageLoad { image, .. } = expr else {
                        continue;
                    };
                    if let naga::Expression::GlobalVariable(global) =
                        function.expressions[*image]
                    {
                        assert!(
                            !is_depth(global),
                            "{} fetches depth with textureLoad",
                            shader.path()
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn composed_shaders_validate() {
        let mut composer = ShaderComposer::new().unwrap();
        for shader in Shader::ALL {
            let module = composer.compose_naga(shader).unwrap();
            let mut validator = naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::empty(),
            );
            let _ = validator
                .validate(&module)
                .unwrap_or_else(|e| panic!("{}: {e:?}", shader.path()));
        }
    }
}
