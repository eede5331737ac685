//! Halfedge refinement: synthesizing level `d + 1` topology from level `d`.
//!
//! Every parent halfedge emits a block of four children at slots
//! `[4h, 4h + 4)`, ordered: the corner child at the parent's origin, the
//! half running from the parent edge point toward the face point, the
//! half leaving the face point, and the half running back to the
//! previous edge point. Child twins, edges, and vertices follow from the
//! parent's neighborhood by pure index arithmetic, so the kernel has no
//! data dependencies between halfedges and parallelizes trivially.
//!
//! Child edge numbering splits each parent edge into `2e` and `2e + 1`
//! (the `halfedge > twin` tie-break assigns the same subedge the same id
//! from both sides) and appends one interior edge per parent halfedge at
//! `2 * edge_count + h`. Child vertices partition into carried vertices,
//! face points (`vertex_count + face`), and edge points
//! (`vertex_count + face_count + edge`).
//!
//! Boundary twins stay negative through the arithmetic: the quad
//! rotations are bitwise and `4 * negative + 3` is still negative.

use rayon::prelude::*;

use crate::mesh::{quad_face, quad_next, quad_prev};

use super::Subd;

/// Refine the cage's halfedges into level 1.
pub(crate) fn refine_cage_halfedges(subd: &mut Subd<'_>) {
    let cage = subd.topo.cage;
    let vertex_count = cage.vertex_count();
    let edge_count = cage.edge_count();
    let face_count = cage.face_count();
    let out_end = subd.topo.halfedge_offsets[1];
    let out = &mut subd.topo.halfedges[..out_end];

    out.par_chunks_exact_mut(4)
        .enumerate()
        .for_each(|(id, children)| {
            let halfedge = id as i32;
            let twin = cage.twin(halfedge);
            let prev = cage.prev(halfedge);
            let next = cage.next(halfedge);
            let face = cage.face(halfedge);
            let edge = cage.edge(halfedge);
            let prev_edge = cage.edge(prev);
            let prev_twin = cage.twin(prev);
            let vertex = cage.vertex(halfedge);
            let twin_next = if twin >= 0 { cage.next(twin) } else { -1 };

            children[0].twin = 4 * twin_next + 3;
            children[1].twin = 4 * next + 2;
            children[2].twin = 4 * prev + 1;
            children[3].twin = 4 * prev_twin;

            children[0].edge = 2 * edge + i32::from(halfedge <= twin);
            children[1].edge = 2 * edge_count + halfedge;
            children[2].edge = 2 * edge_count + prev;
            children[3].edge = 2 * prev_edge + i32::from(prev > prev_twin);

            children[0].vertex = vertex;
            children[1].vertex = vertex_count + face_count + edge;
            children[2].vertex = vertex_count + face;
            children[3].vertex = vertex_count + face_count + prev_edge;
        });
}

/// Refine level `depth` halfedges into level `depth + 1`.
///
/// Identical wiring to the cage kernel, with `next`, `prev`, and `face`
/// replaced by the quad-block arithmetic.
pub(crate) fn refine_halfedges(subd: &mut Subd<'_>, depth: i32) {
    let cage = subd.topo.cage;
    let halfedge_count = cage.halfedge_count_at_depth(depth) as usize;
    let vertex_count = cage.vertex_count_at_depth(depth);
    let edge_count = cage.edge_count_at_depth(depth);
    let face_count = cage.face_count_at_depth(depth);
    let level_start = subd.topo.halfedge_offsets[depth as usize - 1];
    let out_start = subd.topo.halfedge_offsets[depth as usize];

    let (head, out) = subd.topo.halfedges.split_at_mut(out_start);
    let level = &head[level_start..];
    let out = &mut out[..4 * halfedge_count];

    out.par_chunks_exact_mut(4)
        .enumerate()
        .for_each(|(id, children)| {
            let halfedge = id as i32;
            let twin = level[id].twin;
            let prev = quad_prev(halfedge);
            let next = quad_next(halfedge);
            let quad = quad_face(halfedge);
            let edge = level[id].edge;
            let vertex = level[id].vertex;
            let prev_edge = level[prev as usize].edge;
            let prev_twin = level[prev as usize].twin;
            let twin_next = quad_next(twin);

            children[0].twin = 4 * twin_next + 3;
            children[1].twin = 4 * next + 2;
            children[2].twin = 4 * prev + 1;
            children[3].twin = 4 * prev_twin;

            children[0].edge = 2 * edge + i32::from(halfedge <= twin);
            children[1].edge = 2 * edge_count + halfedge;
            children[2].edge = 2 * edge_count + prev;
            children[3].edge = 2 * prev_edge + i32::from(prev > prev_twin);

            children[0].vertex = vertex;
            children[1].vertex = vertex_count + face_count + edge;
            children[2].vertex = vertex_count + quad;
            children[3].vertex = vertex_count + face_count + prev_edge;
        });
}
