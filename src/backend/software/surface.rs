//! CPU render targets and the host-facing rasterization handle.

use crate::error::AllocationError;
use crate::renderer::target_set::TargetExtent;

/// One RGBA texel in linear float.
pub(crate) type Texel = [f32; 4];

/// A shaded fragment submitted to a [`SoftwareTarget`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    /// Normalized depth in `[0, 1]`; 0 is the near plane.
    pub depth: f32,
    /// Linear RGBA color.
    pub color: [f32; 4],
    /// View-space unit normal.
    pub normal: [f32; 3],
}

/// Mutable view of the CPU solid targets handed to
/// [`SolidGeometry::rasterize`](crate::renderer::solid_pass::SolidGeometry::rasterize).
///
/// Writes go through the same `LessEqual` depth test the GPU pass uses:
/// a fragment lands when its depth is at most the stored one, so a later
/// submission at equal depth replaces an earlier one.
pub struct SoftwareTarget<'a> {
    extent: TargetExtent,
    color: &'a mut [Texel],
    normal: &'a mut [Texel],
    depth: &'a mut [f32],
}

impl SoftwareTarget<'_> {
    /// Target size in physical pixels.
    pub fn extent(&self) -> TargetExtent {
        self.extent
    }

    /// Depth-test and write one fragment. Returns `true` when it landed.
    /// Fragments outside the target or the `[0, 1]` depth range are
    /// clipped.
    pub fn fragment(&mut self, x: u32, y: u32, fragment: Fragment) -> bool {
        let Some(i) = self.extent.index(x, y) else {
            return false;
        };
        if !(0.0..=1.0).contains(&fragment.depth) || fragment.depth > self.depth[i] {
            return false;
        }
        self.depth[i] = fragment.depth;
        self.color[i] = fragment.color;
        let [nx, ny, nz] = fragment.normal;
        self.normal[i] = [nx, ny, nz, 1.0];
        true
    }

    /// Write `fragment` over the half-open rectangle `[x0, x1) x [y0, y1)`,
    /// clipped to the target. Returns how many pixels passed the depth
    /// test.
    pub fn fill_rect(
        &mut self,
        (x0, y0): (u32, u32),
        (x1, y1): (u32, u32),
        fragment: Fragment,
    ) -> usize {
        let x1 = x1.min(self.extent.width);
        let y1 = y1.min(self.extent.height);
        let mut written = 0;
        for y in y0..y1 {
            for x in x0..x1 {
                if self.fragment(x, y, fragment) {
                    written += 1;
                }
            }
        }
        written
    }

    /// Stored depth at `(x, y)`.
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        self.extent.index(x, y).map(|i| self.depth[i])
    }
}

/// Every CPU buffer for one allocation.
pub(crate) struct SurfaceBuffers {
    pub extent: TargetExtent,
    /// Solid color, then the two ping-pong scratch buffers.
    pub slots: [Vec<Texel>; 3],
    pub normal: Vec<Texel>,
    pub depth: Vec<f32>,
    pub display: Vec<[u8; 4]>,
}

impl SurfaceBuffers {
    pub fn new(extent: TargetExtent) -> Result<Self, AllocationError> {
        let n = extent.pixel_count();
        Ok(Self {
            extent,
            slots: [
                filled(n, [0.0; 4])?,
                filled(n, [0.0; 4])?,
                filled(n, [0.0; 4])?,
            ],
            normal: filled(n, [0.0; 4])?,
            depth: filled(n, 1.0)?,
            display: filled(n, [0; 4])?,
        })
    }

    /// Clear the solid targets for a new frame.
    pub fn clear(&mut self, background: [f32; 4]) {
        self.slots[0].fill(background);
        self.normal.fill([0.0; 4]);
        self.depth.fill(1.0);
    }

    pub fn target(&mut self) -> SoftwareTarget<'_> {
        SoftwareTarget {
            extent: self.extent,
            color: &mut self.slots[0],
            normal: &mut self.normal,
            depth: &mut self.depth,
        }
    }

    /// Borrow slot `source` for reading and slot `target` for writing.
    pub fn ping_pong(
        &mut self,
        source: usize,
        target: usize,
    ) -> Option<(&[Texel], &mut [Texel])> {
        if source == target || source >= 3 || target >= 3 {
            return None;
        }
        if source < target {
            let (lo, hi) = self.slots.split_at_mut(target);
            Some((&lo[source], &mut hi[0]))
        } else {
            let (lo, hi) = self.slots.split_at_mut(source);
            Some((&hi[0], &mut lo[target]))
        }
    }
}

fn filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>, AllocationError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| AllocationError::Device(e.to_string()))?;
    v.resize(len, value);
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(depth: f32, r: f32) -> Fragment {
        Fragment {
            depth,
            color: [r, 0.0, 0.0, 1.0],
            normal: [0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn less_equal_lets_later_equal_depth_win() {
        let mut buffers = SurfaceBuffers::new(TargetExtent::new(2, 2)).unwrap();
        buffers.clear([0.0; 4]);
        let mut target = buffers.target();
        assert!(target.fragment(0, 0, frag(0.5, 0.1)));
        assert!(target.fragment(0, 0, frag(0.5, 0.2)));
        assert!(!target.fragment(0, 0, frag(0.6, 0.3)));
        assert_eq!(buffers.slots[0][0], [0.2, 0.0, 0.0, 1.0]);
        assert_eq!(buffers.normal[0], [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn fragments_outside_are_clipped() {
        let mut buffers = SurfaceBuffers::new(TargetExtent::new(2, 2)).unwrap();
        let mut target = buffers.target();
        assert!(!target.fragment(2, 0, frag(0.5, 1.0)));
        assert!(!target.fragment(0, 0, frag(-0.1, 1.0)));
        assert!(!target.fragment(0, 0, frag(f32::NAN, 1.0)));
        assert_eq!(target.fill_rect((1, 1), (10, 10), frag(0.5, 1.0)), 1);
    }

    #[test]
    fn ping_pong_borrows_distinct_slots() {
        let mut buffers = SurfaceBuffers::new(TargetExtent::new(1, 1)).unwrap();
        buffers.slots[2][0] = [1.0; 4];
        let (src, dst) = buffers.ping_pong(2, 1).unwrap();
        dst[0] = src[0];
        assert_eq!(buffers.slots[1][0], [1.0; 4]);
        assert!(buffers.ping_pong(1, 1).is_none());
    }
}
