//! Offline Morton-code (Z-order) reorder applied to a chunk before it joins
//! the store, to improve post-depth-sort GPU cache locality (§4.7).

use glam::Vec3;

use crate::chunk::SplatChunk;

const QUANT_BITS: u32 = 10;
const QUANT_MAX: f32 = ((1u32 << QUANT_BITS) - 1) as f32;

/// Reorder `chunk`'s splats in place by ascending Morton code of their
/// quantized position. Skips chunks with `<= 3` splats or with zero extent
/// on any axis, per §4.7 — in both cases the original order is preserved.
pub fn apply(chunk: &mut SplatChunk) {
    let n = chunk.splat_count();
    if n <= 3 {
        return;
    }

    let positions: Vec<Vec3> = chunk.encoded().as_slice().iter().map(|s| s.decoded_position()).collect();
    let Some((min, extent)) = bounds(&positions) else {
        return;
    };

    let mut keyed: Vec<(u32, usize)> = positions
        .iter()
        .enumerate()
        .map(|(i, p)| (morton_code(*p, min, extent), i))
        .collect();
    keyed.sort_by_key(|(code, _)| *code);
    let perm: Vec<usize> = keyed.into_iter().map(|(_, i)| i).collect();

    apply_permutation_rows(chunk.encoded_mut().as_mut_slice(), 1, &perm);
    let sh_stride = chunk.sh_stride();
    if let Some(sh) = chunk.sh_mut() {
        apply_permutation_rows(sh.as_mut_slice(), sh_stride, &perm);
    }
}

/// Per-axis `mean +/- 2.5sigma` bounds, or `None` if any axis has zero
/// extent (the chunk aborts locality pre-sort in that case).
fn bounds(positions: &[Vec3]) -> Option<(Vec3, Vec3)> {
    let n = positions.len() as f32;
    let mean = positions.iter().copied().fold(Vec3::ZERO, |acc, p| acc + p) / n;
    let variance = positions
        .iter()
        .copied()
        .fold(Vec3::ZERO, |acc, p| acc + (p - mean) * (p - mean))
        / n;
    let std = Vec3::new(variance.x.sqrt(), variance.y.sqrt(), variance.z.sqrt());

    let min = mean - std * 2.5;
    let max = mean + std * 2.5;
    let extent = max - min;
    if extent.x == 0.0 || extent.y == 0.0 || extent.z == 0.0 {
        return None;
    }
    Some((min, extent))
}

fn quantize_axis(value: f32, min: f32, extent: f32) -> u32 {
    let t = ((value - min) / extent).clamp(0.0, 1.0);
    (t * QUANT_MAX).round() as u32
}

fn morton_code(position: Vec3, min: Vec3, extent: Vec3) -> u32 {
    let x = quantize_axis(position.x, min.x, extent.x);
    let y = quantize_axis(position.y, min.y, extent.y);
    let z = quantize_axis(position.z, min.z, extent.z);
    part_by_2(x) | (part_by_2(y) << 1) | (part_by_2(z) << 2)
}

/// Spread the low 10 bits of `x` so two zero bits separate each original
/// bit, making room to interleave with two more 10-bit values.
fn part_by_2(mut x: u32) -> u32 {
    x &= 0x0000_03ff;
    x = (x | (x << 16)) & 0x0300_00ff;
    x = (x | (x << 8)) & 0x0300_f00f;
    x = (x | (x << 4)) & 0x030c_30c3;
    x = (x | (x << 2)) & 0x0924_9249;
    x
}

/// Apply an in-place permutation to fixed-size rows of `data`: row `i` of
/// the result is row `perm[i]` of the input. Cycle-following with a
/// visited bitmap — O(n) moves, O(n) bits auxiliary.
fn apply_permutation_rows<T: Copy>(data: &mut [T], row_len: usize, perm: &[usize]) {
    if row_len == 0 {
        return;
    }
    let n = perm.len();
    let mut visited = vec![false; n];
    for i in 0..n {
        if visited[i] || perm[i] == i {
            visited[i] = true;
            continue;
        }
        let start = i * row_len;
        let temp: Vec<T> = data[start..start + row_len].to_vec();
        let mut current = i;
        loop {
            visited[current] = true;
            let next = perm[current];
            if next == i {
                data[current * row_len..(current + 1) * row_len].copy_from_slice(&temp);
                break;
            }
            data.copy_within(next * row_len..(next + 1) * row_len, current * row_len);
            current = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use splat_core::{Color, Opacity, Scale};
    use splat_core::ScenePoint;
    use splat_gpu::HostDevice;

    fn point_at(pos: Vec3) -> ScenePoint {
        ScenePoint {
            position: pos,
            color: Color::SrgbU8([128, 128, 128]),
            opacity: Opacity::Linear(1.0),
            scale: Scale::Linear(Vec3::ONE),
            rotation: Quat::IDENTITY,
        }
    }

    #[test]
    fn small_chunk_skips_presort() {
        let points = vec![point_at(Vec3::new(3.0, 0.0, 0.0)), point_at(Vec3::ZERO)];
        let mut chunk = SplatChunk::new(HostDevice::unbounded(), &points).unwrap();
        let before: Vec<_> = chunk.encoded().as_slice().to_vec();
        apply(&mut chunk);
        assert_eq!(chunk.encoded().as_slice(), before.as_slice());
    }

    #[test]
    fn zero_extent_axis_skips_presort() {
        let points: Vec<_> = (0..8).map(|i| point_at(Vec3::new(i as f32, 0.0, 0.0))).collect();
        let mut chunk = SplatChunk::new(HostDevice::unbounded(), &points).unwrap();
        let before: Vec<_> = chunk.encoded().as_slice().to_vec();
        apply(&mut chunk);
        assert_eq!(chunk.encoded().as_slice(), before.as_slice());
    }

    #[test]
    fn unit_cube_corners_sort_into_expected_z_order() {
        let corners = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ];
        let points: Vec<_> = corners.iter().map(|c| point_at(*c)).collect();
        let mut chunk = SplatChunk::new(HostDevice::unbounded(), &points).unwrap();
        apply(&mut chunk);

        let expected_order = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ];
        let got: Vec<Vec3> = chunk.encoded().as_slice().iter().map(|s| s.decoded_position()).collect();
        assert_eq!(got, expected_order);
    }

    #[test]
    fn presort_is_idempotent() {
        let points: Vec<_> = (0..12)
            .map(|i| point_at(Vec3::new((i % 4) as f32, (i % 3) as f32, (i % 2) as f32)))
            .collect();
        let mut chunk = SplatChunk::new(HostDevice::unbounded(), &points).unwrap();
        apply(&mut chunk);
        let once: Vec<_> = chunk.encoded().as_slice().to_vec();
        apply(&mut chunk);
        let twice: Vec<_> = chunk.encoded().as_slice().to_vec();
        assert_eq!(once, twice);
    }
}
