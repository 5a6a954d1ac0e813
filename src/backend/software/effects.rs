//! CPU versions of the post-process shaders.
//!
//! Each function mirrors its WGSL counterpart tap for tap. The one
//! deliberate difference is the AO spiral, which is not rotated per pixel
//! here so that output is deterministic.

use super::surface::Texel;
use crate::renderer::postprocess::ambient_occlusion::{AoParams, SAMPLE_COUNT};
use crate::renderer::postprocess::composite::CompositeParams;
use crate::renderer::postprocess::depth_of_field::{
    DofParams, MIN_BLUR_RADIUS, TAP_COUNT,
};
use crate::renderer::postprocess::edge_detection::EdgeParams;
use crate::renderer::target_set::TargetExtent;

const GOLDEN_ANGLE: f32 = 2.399_963_2;

/// Read-only solid depth and normals.
pub(crate) struct GBuffer<'a> {
    pub extent: TargetExtent,
    pub depth: &'a [f32],
    pub normal: &'a [Texel],
}

impl GBuffer<'_> {
    /// Index of `(x, y)` clamped to the edge.
    fn clamped(&self, x: i32, y: i32) -> usize {
        let x = x.clamp(0, self.extent.width as i32 - 1) as usize;
        let y = y.clamp(0, self.extent.height as i32 - 1) as usize;
        y * self.extent.width as usize + x
    }

    fn coords(&self, i: usize) -> (i32, i32) {
        let w = self.extent.width as usize;
        ((i % w) as i32, (i / w) as i32)
    }
}

fn linearize(depth: f32, near: f32, far: f32) -> f32 {
    near * far / (far - depth * (far - near))
}

fn is_background(depth: f32) -> bool {
    depth >= 1.0
}

fn spiral_offset(index: u32, count: u32, radius: f32) -> (i32, i32) {
    let angle = index as f32 * GOLDEN_ANGLE;
    let r = ((index as f32 + 0.5) / count as f32).sqrt() * radius;
    (
        (angle.cos() * r).round_ties_even() as i32,
        (angle.sin() * r).round_ties_even() as i32,
    )
}

fn scale_rgb(color: Texel, factor: f32) -> Texel {
    [color[0] * factor, color[1] * factor, color[2] * factor, color[3]]
}

pub(crate) fn ambient_occlusion(
    src: &[Texel],
    dst: &mut [Texel],
    g: &GBuffer<'_>,
    params: &AoParams,
) {
    for (i, out) in dst.iter_mut().enumerate() {
        let depth = g.depth[i];
        if is_background(depth) {
            *out = src[i];
            continue;
        }
        let center = linearize(depth, params.near, params.far);
        let (x, y) = g.coords(i);

        let mut occlusion = 0.0;
        for tap in 0..SAMPLE_COUNT {
            let (dx, dy) = spiral_offset(tap, SAMPLE_COUNT, params.radius);
            let sample = g.depth[g.clamped(x + dx, y + dy)];
            if is_background(sample) {
                continue;
            }
            let diff = center - linearize(sample, params.near, params.far);
            if diff > params.bias {
                occlusion += (params.falloff / diff).clamp(0.0, 1.0);
            }
        }
        occlusion /= SAMPLE_COUNT as f32;

        let visibility = (1.0 - occlusion).powf(params.power);
        let factor = (1.0 - params.strength * (1.0 - visibility)).max(0.0);
        *out = scale_rgb(src[i], factor);
    }
}

pub(crate) fn depth_of_field(
    src: &[Texel],
    dst: &mut [Texel],
    g: &GBuffer<'_>,
    params: &DofParams,
) {
    for (i, out) in dst.iter_mut().enumerate() {
        let depth = g.depth[i];
        let distance = if is_background(depth) {
            params.far
        } else {
            linearize(depth, params.near, params.far)
        };
        let coc = params.circle_of_confusion(distance);
        if coc < MIN_BLUR_RADIUS {
            *out = src[i];
            continue;
        }

        let (x, y) = g.coords(i);
        let mut sum = src[i];
        for tap in 0..TAP_COUNT {
            let (dx, dy) = spiral_offset(tap, TAP_COUNT, coc);
            let sample = src[g.clamped(x + dx, y + dy)];
            for (acc, s) in sum.iter_mut().zip(sample) {
                *acc += s;
            }
        }
        let n = (TAP_COUNT + 1) as f32;
        *out = sum.map(|c| c / n);
    }
}

pub(crate) fn edge_detection(
    src: &[Texel],
    dst: &mut [Texel],
    g: &GBuffer<'_>,
    params: &EdgeParams,
) {
    let step = params.step();
    let offsets = [(step, 0), (-step, 0), (0, step), (0, -step)];
    let distance_at = |depth: f32| {
        if is_background(depth) {
            params.far
        } else {
            linearize(depth, params.near, params.far)
        }
    };

    for (i, out) in dst.iter_mut().enumerate() {
        let (x, y) = g.coords(i);
        let center_depth = g.depth[i];
        let center_distance = distance_at(center_depth);
        let center_normal = g.normal[i];

        let mut edge: f32 = 0.0;
        for (dx, dy) in offsets {
            let j = g.clamped(x + dx, y + dy);
            let depth = g.depth[j];
            if is_background(depth) && is_background(center_depth) {
                continue;
            }
            let depth_edge = params.depth_edge(distance_at(depth), center_distance);
            let normal = g.normal[j];
            let normal_edge = if center_normal[3] > 0.5 && normal[3] > 0.5 {
                params.normal_edge(
                    [center_normal[0], center_normal[1], center_normal[2]],
                    [normal[0], normal[1], normal[2]],
                )
            } else {
                0.0
            };
            edge = edge.max(depth_edge.max(normal_edge));
        }

        let factor = (1.0 - params.strength * edge).max(0.0);
        *out = scale_rgb(src[i], factor);
    }
}

pub(crate) fn composite(
    src: &[Texel],
    display: &mut [[u8; 4]],
    params: &CompositeParams,
) {
    for (out, color) in display.iter_mut().zip(src) {
        *out = [
            quantize(params.apply(color[0])),
            quantize(params.apply(color[1])),
            quantize(params.apply(color[2])),
            quantize(color[3].clamp(0.0, 1.0)),
        ];
    }
}

/// Unorm8 conversion as the GPU performs it on store.
fn quantize(v: f32) -> u8 {
    (v * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(extent: TargetExtent, depth: f32) -> (Vec<f32>, Vec<Texel>) {
        let n = extent.pixel_count();
        (vec![depth; n], vec![[0.0, 0.0, 1.0, 1.0]; n])
    }

    #[test]
    fn linearize_hits_clip_planes() {
        assert!((linearize(0.0, 1.0, 100.0) - 1.0).abs() < 1e-5);
        assert!((linearize(1.0, 1.0, 100.0) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn flat_surface_has_no_occlusion() {
        let extent = TargetExtent::new(8, 8);
        let (depth, normal) = flat(extent, 0.5);
        let g = GBuffer {
            extent,
            depth: &depth,
            normal: &normal,
        };
        let src = vec![[0.5, 0.5, 0.5, 1.0]; extent.pixel_count()];
        let mut dst = vec![[0.0; 4]; extent.pixel_count()];
        let params = AoParams {
            screen_size: [8.0, 8.0],
            near: 1.0,
            far: 100.0,
            strength: 1.0,
            radius: 3.0,
            bias: 0.025,
            power: 2.0,
            falloff: 4.0,
            _pad: [0.0; 3],
        };
        ambient_occlusion(&src, &mut dst, &g, &params);
        assert_eq!(dst, src);
    }

    #[test]
    fn recessed_pixel_is_darkened() {
        let extent = TargetExtent::new(9, 9);
        let (mut depth, normal) = flat(extent, 0.2);
        // Pit in the middle, well behind its surroundings.
        let center = extent.index(4, 4).unwrap();
        depth[center] = 0.9;
        let g = GBuffer {
            extent,
            depth: &depth,
            normal: &normal,
        };
        let src = vec![[1.0; 4]; extent.pixel_count()];
        let mut dst = vec![[0.0; 4]; extent.pixel_count()];
        let params = AoParams {
            screen_size: [9.0, 9.0],
            near: 1.0,
            far: 100.0,
            strength: 1.0,
            radius: 3.0,
            bias: 0.025,
            power: 1.0,
            falloff: 100.0,
            _pad: [0.0; 3],
        };
        ambient_occlusion(&src, &mut dst, &g, &params);
        assert!(dst[center][0] < 1.0);
        assert_eq!(dst[center][3], 1.0);
    }

    #[test]
    fn depth_step_draws_an_outline() {
        let extent = TargetExtent::new(4, 1);
        let depth = vec![0.1, 0.1, 0.9, 0.9];
        let normal = vec![[0.0, 0.0, 1.0, 1.0]; 4];
        let g = GBuffer {
            extent,
            depth: &depth,
            normal: &normal,
        };
        let src = vec![[1.0; 4]; 4];
        let mut dst = vec![[0.0; 4]; 4];
        let params = EdgeParams {
            screen_size: [4.0, 1.0],
            near: 1.0,
            far: 100.0,
            strength: 1.0,
            depth_threshold: 0.02,
            normal_weight: 0.5,
            thickness: 1.0,
        };
        edge_detection(&src, &mut dst, &g, &params);
        assert_eq!(dst[0], [1.0; 4]);
        assert_eq!(dst[1][0], 0.0);
        assert_eq!(dst[2][0], 0.0);
    }

    #[test]
    fn composite_quantizes_like_unorm() {
        let params = CompositeParams {
            exposure: 1.0,
            gamma: 1.0,
            _pad: [0.0; 2],
        };
        let src = [[0.5, 1.5, -1.0, 1.0]];
        let mut display = [[0u8; 4]];
        composite(&src, &mut display, &params);
        assert_eq!(display[0], [128, 255, 0, 255]);
    }
}
