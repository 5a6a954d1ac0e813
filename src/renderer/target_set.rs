//! Render-target sizing and the GPU target set.
//!
//! [`TargetExtent`] is the backend-neutral half: the physical size derived
//! from a logical viewport and pixel ratio. `RenderTargetSet` owns the
//! wgpu textures at that size.

use crate::error::AllocationError;
use crate::gpu::texture::RenderTarget;
use crate::renderer::postprocess::chain::Slot;
use crate::renderer::postprocess::screen_pass::PassInputs;
use crate::renderer::solid_pass::{COLOR_FORMAT, DEPTH_FORMAT, NORMAL_FORMAT};

/// Format of the composited display target.
pub const DISPLAY_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Pixel ratios are resolved to millionths before scaling, so `1.1` means
/// exactly 11/10 whatever its f32 representation, and the product is then
/// rounded up in integer arithmetic.
const RATIO_UNITS: u64 = 1_000_000;

/// Physical size of every render target, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TargetExtent {
    /// Width in physical pixels.
    pub width: u32,
    /// Height in physical pixels.
    pub height: u32,
}

impl TargetExtent {
    /// Extent with explicit physical dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Physical extent of a logical viewport at `ratio`:
    /// `ceil(width * ratio) x ceil(height * ratio)`, with `ratio` taken to
    /// the nearest millionth (never below one millionth when positive).
    #[must_use]
    pub fn from_logical(width: u32, height: u32, ratio: f32) -> Self {
        Self {
            width: scale(width, ratio),
            height: scale(height, ratio),
        }
    }

    /// True when either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Row-major index of `(x, y)`, or `None` outside the extent.
    pub fn index(self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    /// Validate the extent against a device's largest 2D texture size.
    ///
    /// # Errors
    ///
    /// [`AllocationError::EmptyExtent`] when a dimension is zero,
    /// [`AllocationError::ExceedsDeviceLimit`] when one is above `limit`.
    pub fn check(self, limit: u32) -> Result<(), AllocationError> {
        if self.is_empty() {
            return Err(AllocationError::EmptyExtent {
                width: self.width,
                height: self.height,
            });
        }
        if self.width > limit || self.height > limit {
            return Err(AllocationError::ExceedsDeviceLimit {
                width: self.width,
                height: self.height,
                limit,
            });
        }
        Ok(())
    }
}

fn scale(logical: u32, ratio: f32) -> u32 {
    if logical == 0 || ratio.is_nan() || ratio <= 0.0 {
        return 0;
    }
    let units = (f64::from(ratio) * RATIO_UNITS as f64).round();
    if units >= u64::MAX as f64 {
        return u32::MAX;
    }
    let units = (units as u64).max(1);
    let physical = (u128::from(logical) * u128::from(units))
        .div_ceil(u128::from(RATIO_UNITS));
    u32::try_from(physical).unwrap_or(u32::MAX)
}

/// Every GPU texture the pipeline renders into for one allocation.
///
/// The solid pass writes `color`, `normal` and `depth`; post-process
/// stages ping-pong between `color`, `scratch_a` and `scratch_b`; the
/// composite writes `display`.
pub(crate) struct RenderTargetSet {
    pub extent: TargetExtent,
    /// Allocation counter these textures belong to.
    pub generation: u64,
    pub color: RenderTarget,
    pub normal: RenderTarget,
    pub depth: RenderTarget,
    pub scratch_a: RenderTarget,
    pub scratch_b: RenderTarget,
    pub display: RenderTarget,
}

impl RenderTargetSet {
    pub fn new(
        device: &wgpu::Device,
        extent: TargetExtent,
        generation: u64,
    ) -> Self {
        let size = (extent.width, extent.height);
        let none = wgpu::TextureUsages::empty();
        Self {
            extent,
            generation,
            color: RenderTarget::new(device, "Solid Color", size, COLOR_FORMAT, none),
            normal: RenderTarget::new(device, "Solid Normal", size, NORMAL_FORMAT, none),
            depth: RenderTarget::new(device, "Solid Depth", size, DEPTH_FORMAT, none),
            scratch_a: RenderTarget::new(device, "Post Scratch A", size, COLOR_FORMAT, none),
            scratch_b: RenderTarget::new(device, "Post Scratch B", size, COLOR_FORMAT, none),
            display: RenderTarget::new(
                device,
                "Display Target",
                size,
                DISPLAY_FORMAT,
                wgpu::TextureUsages::COPY_SRC,
            ),
        }
    }

    /// Color view for a ping-pong slot.
    pub fn view(&self, slot: Slot) -> &wgpu::TextureView {
        match slot {
            Slot::Color => &self.color.view,
            Slot::ScratchA => &self.scratch_a.view,
            Slot::ScratchB => &self.scratch_b.view,
        }
    }

    /// Views the post-process bind groups are built against.
    pub fn pass_inputs(&self) -> PassInputs<'_> {
        PassInputs {
            generation: self.generation,
            color: &self.color.view,
            scratch_a: &self.scratch_a.view,
            scratch_b: &self.scratch_b.view,
            depth: &self.depth.view,
            normal: &self.normal.view,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_rounds_up() {
        assert_eq!(
            TargetExtent::from_logical(801, 601, 1.5),
            TargetExtent::new(1202, 902)
        );
        assert_eq!(
            TargetExtent::from_logical(800, 600, 2.0),
            TargetExtent::new(1600, 1200)
        );
    }

    #[test]
    fn extent_ignores_float_noise() {
        // 1.1f32 is slightly above 1.1; the product must not round to 881.
        assert_eq!(TargetExtent::from_logical(800, 10, 1.1).width, 880);
        assert_eq!(TargetExtent::from_logical(3, 3, 1.0 / 3.0).width, 1);
    }

    #[test]
    fn fractional_products_round_up_at_any_width() {
        assert_eq!(TargetExtent::from_logical(8000, 1, 1.000_001).width, 8001);
        assert_eq!(TargetExtent::from_logical(1000, 1, 1.234_567).width, 1235);
        assert_eq!(TargetExtent::from_logical(8191, 1, 0.999_999).width, 8191);
        assert_eq!(TargetExtent::from_logical(7, 1, 1.25).width, 9);
    }

    #[test]
    fn degenerate_ratios_saturate() {
        assert!(TargetExtent::from_logical(10, 10, 0.0).is_empty());
        assert!(TargetExtent::from_logical(10, 10, f32::NAN).is_empty());
        assert_eq!(TargetExtent::from_logical(2, 1, 1.0e-9).width, 1);
        assert_eq!(TargetExtent::from_logical(2, 1, f32::INFINITY).width, u32::MAX);
    }

    #[test]
    fn tiny_ratio_never_rounds_to_zero_for_positive_input() {
        assert_eq!(TargetExtent::from_logical(1, 1, 0.01), TargetExtent::new(1, 1));
        assert!(TargetExtent::from_logical(0, 10, 2.0).is_empty());
    }

    #[test]
    fn check_reports_limits() {
        assert!(TargetExtent::new(64, 64).check(64).is_ok());
        assert_eq!(
            TargetExtent::new(65, 10).check(64),
            Err(AllocationError::ExceedsDeviceLimit {
                width: 65,
                height: 10,
                limit: 64
            })
        );
        assert_eq!(
            TargetExtent::new(0, 10).check(64),
            Err(AllocationError::EmptyExtent {
                width: 0,
                height: 10
            })
        );
    }

    #[test]
    fn index_is_row_major() {
        let extent = TargetExtent::new(4, 3);
        assert_eq!(extent.index(1, 2), Some(9));
        assert_eq!(extent.index(4, 0), None);
        assert_eq!(extent.pixel_count(), 12);
    }
}
