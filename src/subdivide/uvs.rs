//! Uv refinement.
//!
//! Uvs are a per-corner attribute, not topology: a vertex on a seam has
//! a different uv in each adjacent face, so uvs refine per halfedge, in
//! exact parallel with the four-children halfedge refinement. Each
//! parent corner emits its own uv, the midpoints toward the next and
//! previous corners, and the face average.
//!
//! At derived levels the pair is packed into the halfedge's `uv` field
//! as two 16-bit normalized halves, so refinement reads and writes the
//! halfedge blocks directly; the corner child copies its parent's packed
//! bits verbatim.

use nalgebra::Vector2;
use rayon::prelude::*;

use crate::mesh::{quad_next, quad_prev};

use super::{lerp_uv, Subd};

/// Pack a uv pair into 16-bit normalized halves, u low, v high.
pub(crate) fn encode_uv(uv: Vector2<f32>) -> i32 {
    let u = (uv.x * 65535.0) as u32;
    let v = (uv.y * 65535.0) as u32;
    ((u & 0xffff) | ((v & 0xffff) << 16)) as i32
}

/// Unpack a uv pair packed by [`encode_uv`].
pub(crate) fn decode_uv(bits: i32) -> Vector2<f32> {
    let bits = bits as u32;
    Vector2::new(
        (bits & 0xffff) as f32 / 65535.0,
        (bits >> 16) as f32 / 65535.0,
    )
}

/// Refine the cage's per-corner uvs into level 1.
pub(crate) fn refine_cage_uvs(subd: &mut Subd<'_>) {
    let cage = subd.topo.cage;
    let out_end = subd.topo.halfedge_offsets[1];
    let out = &mut subd.topo.halfedges[..out_end];

    out.par_chunks_exact_mut(4)
        .enumerate()
        .for_each(|(id, children)| {
            let halfedge = id as i32;
            let prev = cage.prev(halfedge);
            let next = cage.next(halfedge);
            let uv = cage.halfedge_uv(halfedge);
            let next_uv = cage.halfedge_uv(next);
            let prev_uv = cage.halfedge_uv(prev);

            let edge_uv = lerp_uv(uv, next_uv, 0.5);
            let prev_edge_uv = lerp_uv(uv, prev_uv, 0.5);

            let mut face_uv = uv;
            let mut ring = 1.0f32;
            let mut it = cage.next(halfedge);
            while it != halfedge {
                face_uv += cage.halfedge_uv(it);
                ring += 1.0;
                it = cage.next(it);
            }
            face_uv /= ring;

            children[0].uv = encode_uv(uv);
            children[1].uv = encode_uv(edge_uv);
            children[2].uv = encode_uv(face_uv);
            children[3].uv = encode_uv(prev_edge_uv);
        });
}

/// Refine level `depth` uvs into level `depth + 1`.
pub(crate) fn refine_uvs(subd: &mut Subd<'_>, depth: i32) {
    let halfedge_count = subd.topo.cage.halfedge_count_at_depth(depth) as usize;
    let level_start = subd.topo.halfedge_offsets[depth as usize - 1];
    let out_start = subd.topo.halfedge_offsets[depth as usize];

    let (head, out) = subd.topo.halfedges.split_at_mut(out_start);
    let level = &head[level_start..];
    let out = &mut out[..4 * halfedge_count];

    out.par_chunks_exact_mut(4)
        .enumerate()
        .for_each(|(id, children)| {
            let halfedge = id as i32;
            let prev = quad_prev(halfedge);
            let next = quad_next(halfedge);
            let uv = decode_uv(level[id].uv);
            let next_uv = decode_uv(level[next as usize].uv);
            let prev_uv = decode_uv(level[prev as usize].uv);

            let edge_uv = lerp_uv(uv, next_uv, 0.5);
            let prev_edge_uv = lerp_uv(uv, prev_uv, 0.5);

            let mut face_uv = uv;
            let mut it = quad_next(halfedge);
            while it != halfedge {
                face_uv += decode_uv(level[it as usize].uv);
                it = quad_next(it);
            }
            face_uv /= 4.0;

            children[0].uv = level[id].uv;
            children[1].uv = encode_uv(edge_uv);
            children[2].uv = encode_uv(face_uv);
            children[3].uv = encode_uv(prev_edge_uv);
        });
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_encode_decode_quantizes_to_16_bits() {
        for uv in [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.25, 0.75),
            Vector2::new(0.123, 0.987),
        ] {
            let decoded = decode_uv(encode_uv(uv));
            assert_relative_eq!(decoded.x, uv.x, epsilon = 1.0 / 65535.0);
            assert_relative_eq!(decoded.y, uv.y, epsilon = 1.0 / 65535.0);
        }
    }

    #[test]
    fn test_encode_is_exact_at_the_corners() {
        assert_eq!(decode_uv(encode_uv(Vector2::new(0.0, 0.0))), Vector2::new(0.0, 0.0));
        assert_eq!(decode_uv(encode_uv(Vector2::new(1.0, 0.0))), Vector2::new(1.0, 0.0));
        assert_eq!(decode_uv(encode_uv(Vector2::new(0.0, 1.0))), Vector2::new(0.0, 1.0));
        assert_eq!(decode_uv(encode_uv(Vector2::new(1.0, 1.0))), Vector2::new(1.0, 1.0));
    }
}
