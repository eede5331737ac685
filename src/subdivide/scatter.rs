//! Scatter forms of the face-, edge-, and vertex-point rules.
//!
//! A scatter kernel parallelizes over halfedges: each iteration computes
//! its fractional contribution to one output point and accumulates it
//! with an atomic float add. Contributions to a point land in arbitrary
//! order, so results match the gather forms up to float reassociation.
//! The output array must be zeroed first ([`clear_vertex_points`]).
//!
//! The vertex kernels still walk the one-ring, but only to count valence
//! and incident sharpness; when the forward walk falls off a boundary
//! the backward walk picks up the rest of the ring, and the smooth
//! contribution is suppressed so boundary vertices stay pinned.

use rayon::prelude::*;

use crate::mesh::{quad_face, quad_next, quad_prev};

use super::atomic::{add_point, as_atomics};
use super::{crease_weight, lerp, saturate, Subd};

/// Zero every vertex point in the hierarchy ahead of a scatter pass.
pub(crate) fn clear_vertex_points(subd: &mut Subd<'_>) {
    subd.points.fill(nalgebra::Point3::origin());
}

// ==================== Cage level ====================

/// Scatter each cage corner into its face point.
pub(crate) fn cage_face_points(subd: &mut Subd<'_>) {
    let cage = subd.topo.cage;
    let vertex_count = cage.vertex_count() as usize;
    let face_count = cage.face_count() as usize;
    let halfedge_count = cage.halfedge_count();
    let out = as_atomics(&mut subd.points[vertex_count..vertex_count + face_count]);

    (0..halfedge_count).into_par_iter().for_each(|halfedge| {
        let point = cage.halfedge_point(halfedge).coords;
        let face = cage.face(halfedge);
        let mut ring = 1.0f32;
        let mut it = cage.next(halfedge);
        while it != halfedge {
            ring += 1.0;
            it = cage.next(it);
        }
        add_point(out, face, point / ring);
    });
}

/// Scatter each cage halfedge into its edge point, ignoring creases.
pub(crate) fn cage_edge_points(subd: &mut Subd<'_>) {
    let cage = subd.topo.cage;
    let vertex_count = cage.vertex_count() as usize;
    let face_count = cage.face_count() as usize;
    let edge_count = cage.edge_count() as usize;
    let halfedge_count = cage.halfedge_count();
    let (head, tail) = subd.points.split_at_mut(vertex_count + face_count);
    let face_points = &head[vertex_count..];
    let out = as_atomics(&mut tail[..edge_count]);

    (0..halfedge_count).into_par_iter().for_each(|halfedge| {
        let face = cage.face(halfedge);
        let edge = cage.edge(halfedge);
        let twin = cage.twin(halfedge);
        let next = cage.next(halfedge);
        // Half the smooth average from each side; everything on a boundary.
        let weight = if twin >= 0 { 0.5 } else { 1.0 };

        let face_term = face_points[face as usize].coords * 0.5;
        let this_term = cage.halfedge_point(halfedge).coords * weight;
        let next_term = cage.halfedge_point(next).coords * weight;
        let midpoint = lerp(this_term, next_term, 0.5);
        add_point(out, edge, lerp(face_term, midpoint, weight));
    });
}

/// Scatter each cage halfedge into its edge point with the crease rule.
pub(crate) fn creased_cage_edge_points(subd: &mut Subd<'_>) {
    let cage = subd.topo.cage;
    let vertex_count = cage.vertex_count() as usize;
    let face_count = cage.face_count() as usize;
    let edge_count = cage.edge_count() as usize;
    let halfedge_count = cage.halfedge_count();
    let (head, tail) = subd.points.split_at_mut(vertex_count + face_count);
    let face_points = &head[vertex_count..];
    let out = as_atomics(&mut tail[..edge_count]);

    (0..halfedge_count).into_par_iter().for_each(|halfedge| {
        let face = cage.face(halfedge);
        let edge = cage.edge(halfedge);
        let twin = cage.twin(halfedge);
        let next = cage.next(halfedge);
        let edge_weight = saturate(cage.sharpness(edge));
        let this_point = cage.halfedge_point(halfedge).coords;
        let next_point = cage.halfedge_point(next).coords;

        let sharp = lerp(this_point, next_point, 0.5) * if twin < 0 { 1.0 } else { 0.5 };
        let smooth = lerp(this_point, face_points[face as usize].coords, 0.5) * 0.5;
        add_point(out, edge, lerp(smooth, sharp, edge_weight));
    });
}

/// Scatter each cage halfedge into its vertex point, ignoring creases.
pub(crate) fn cage_vertex_points(subd: &mut Subd<'_>) {
    let cage = subd.topo.cage;
    let vertex_count = cage.vertex_count() as usize;
    let face_count = cage.face_count() as usize;
    let edge_count = cage.edge_count() as usize;
    let halfedge_count = cage.halfedge_count();
    let (vertex_points, tail) = subd.points.split_at_mut(vertex_count);
    let (face_points, edge_points) = tail[..face_count + edge_count].split_at(face_count);
    let out = as_atomics(vertex_points);

    (0..halfedge_count).into_par_iter().for_each(|halfedge| {
        let vertex = cage.vertex(halfedge);
        let edge = cage.edge(halfedge);
        let face = cage.face(halfedge);
        let old = cage.point(vertex).coords;

        let mut valence = 1.0f32;
        let mut forward = cage.prev_vertex_halfedge(halfedge);
        while forward >= 0 && forward != halfedge {
            valence += 1.0;
            forward = cage.prev_vertex_halfedge(forward);
        }
        let mut backward = cage.next_vertex_halfedge(halfedge);
        while forward < 0 && backward >= 0 && backward != halfedge {
            valence += 1.0;
            backward = cage.next_vertex_halfedge(backward);
        }

        let weight = 1.0 / valence;
        let smooth = if forward < 0 { 0.0 } else { 1.0 };
        let face_point = face_points[face as usize].coords;
        let edge_point = edge_points[edge as usize].coords;
        let update = (edge_point * 4.0 - face_point - old * 3.0) * (weight * smooth);
        add_point(out, vertex, (old + update) * weight);
    });
}

/// Scatter each cage halfedge into its vertex point with the crease rules.
pub(crate) fn creased_cage_vertex_points(subd: &mut Subd<'_>) {
    let cage = subd.topo.cage;
    let vertex_count = cage.vertex_count() as usize;
    let face_count = cage.face_count() as usize;
    let edge_count = cage.edge_count() as usize;
    let halfedge_count = cage.halfedge_count();
    let (vertex_points, tail) = subd.points.split_at_mut(vertex_count);
    let (face_points, edge_points) = tail[..face_count + edge_count].split_at(face_count);
    let out = as_atomics(vertex_points);

    (0..halfedge_count).into_par_iter().for_each(|halfedge| {
        let vertex = cage.vertex(halfedge);
        let edge = cage.edge(halfedge);
        let face = cage.face(halfedge);
        let prev = cage.prev(halfedge);
        let prev_edge = cage.edge(prev);
        let this_weight = crease_weight(cage.halfedge_sharpness(halfedge));
        let prev_sharpness = cage.halfedge_sharpness(prev);
        let prev_weight = crease_weight(prev_sharpness);
        let new_edge_point = edge_points[edge as usize].coords;
        let new_prev_edge_point = edge_points[prev_edge as usize].coords;
        let old = cage.point(vertex).coords;

        let mut average_sharpness = prev_sharpness;
        let mut crease_count = prev_weight;
        let mut valence = 1.0f32;

        let mut forward = cage.twin(prev);
        while forward >= 0 && forward != halfedge {
            let prev = cage.prev(forward);
            let prev_sharpness = cage.halfedge_sharpness(prev);
            valence += 1.0;
            average_sharpness += prev_sharpness;
            crease_count += crease_weight(prev_sharpness);
            forward = cage.twin(prev);
        }
        let mut backward = cage.twin(halfedge);
        while forward < 0 && backward >= 0 && backward != halfedge {
            let next = cage.next(backward);
            let next_sharpness = cage.halfedge_sharpness(next);
            valence += 1.0;
            average_sharpness += next_sharpness;
            crease_count += crease_weight(next_sharpness);
            backward = cage.twin(next);
        }

        let corner = old / valence;
        let mut crease = (old + new_edge_point) * (0.25 * this_weight);
        let smooth = (new_edge_point * 4.0 - face_points[face as usize].coords
            + old * (valence - 3.0))
            / (valence * valence);

        if forward < 0 {
            crease_count += this_weight;
            valence += 1.0;
            crease += (old + new_prev_edge_point) * (0.25 * prev_weight);
        }

        let contribution = if crease_count <= 1.0 {
            smooth
        } else if crease_count >= 3.0 || valence == 2.0 {
            corner
        } else {
            lerp(corner, crease, saturate(average_sharpness * 0.5))
        };
        add_point(out, vertex, contribution);
    });
}

// ==================== Derived levels ====================

/// Scatter each level-`depth` corner into its face point.
pub(crate) fn face_points(subd: &mut Subd<'_>, depth: i32) {
    let topo = &subd.topo;
    let cage = topo.cage;
    let vertex_count = cage.vertex_count_at_depth(depth) as usize;
    let face_count = cage.face_count_at_depth(depth) as usize;
    let halfedge_count = cage.halfedge_count_at_depth(depth);
    let level_start = subd.point_offsets[depth as usize - 1];
    let out_start = subd.point_offsets[depth as usize];
    let (head, tail) = subd.points.split_at_mut(out_start);
    let old_points = &head[level_start..];
    let out = as_atomics(&mut tail[vertex_count..vertex_count + face_count]);

    (0..halfedge_count).into_par_iter().for_each(|halfedge| {
        let point = old_points[topo.vertex(halfedge, depth) as usize].coords;
        add_point(out, quad_face(halfedge), point * 0.25);
    });
}

/// Scatter each level-`depth` halfedge into its edge point, ignoring creases.
pub(crate) fn edge_points(subd: &mut Subd<'_>, depth: i32) {
    let topo = &subd.topo;
    let cage = topo.cage;
    let vertex_count = cage.vertex_count_at_depth(depth) as usize;
    let face_count = cage.face_count_at_depth(depth) as usize;
    let edge_count = cage.edge_count_at_depth(depth) as usize;
    let halfedge_count = cage.halfedge_count_at_depth(depth);
    let level_start = subd.point_offsets[depth as usize - 1];
    let out_start = subd.point_offsets[depth as usize];
    let (head, tail) = subd.points.split_at_mut(out_start);
    let old_points = &head[level_start..];
    let (new_head, edge_out) = tail.split_at_mut(vertex_count + face_count);
    let face_points = &new_head[vertex_count..];
    let out = as_atomics(&mut edge_out[..edge_count]);

    (0..halfedge_count).into_par_iter().for_each(|halfedge| {
        let edge = topo.edge(halfedge, depth);
        let twin = topo.twin(halfedge, depth);
        let next = quad_next(halfedge);
        let weight = if twin >= 0 { 0.5 } else { 1.0 };

        let face_term = face_points[quad_face(halfedge) as usize].coords * 0.5;
        let this_term = old_points[topo.vertex(halfedge, depth) as usize].coords * weight;
        let next_term = old_points[topo.vertex(next, depth) as usize].coords * weight;
        let midpoint = lerp(this_term, next_term, 0.5);
        add_point(out, edge, lerp(face_term, midpoint, weight));
    });
}

/// Scatter each level-`depth` halfedge into its edge point with the crease rule.
pub(crate) fn creased_edge_points(subd: &mut Subd<'_>, depth: i32) {
    let topo = &subd.topo;
    let cage = topo.cage;
    let vertex_count = cage.vertex_count_at_depth(depth) as usize;
    let face_count = cage.face_count_at_depth(depth) as usize;
    let edge_count = cage.edge_count_at_depth(depth) as usize;
    let halfedge_count = cage.halfedge_count_at_depth(depth);
    let level_start = subd.point_offsets[depth as usize - 1];
    let out_start = subd.point_offsets[depth as usize];
    let (head, tail) = subd.points.split_at_mut(out_start);
    let old_points = &head[level_start..];
    let (new_head, edge_out) = tail.split_at_mut(vertex_count + face_count);
    let face_points = &new_head[vertex_count..];
    let out = as_atomics(&mut edge_out[..edge_count]);

    (0..halfedge_count).into_par_iter().for_each(|halfedge| {
        let edge = topo.edge(halfedge, depth);
        let twin = topo.twin(halfedge, depth);
        let next = quad_next(halfedge);
        let edge_weight = saturate(topo.sharpness(edge, depth));
        let this_point = old_points[topo.vertex(halfedge, depth) as usize].coords;
        let next_point = old_points[topo.vertex(next, depth) as usize].coords;

        let sharp = lerp(this_point, next_point, 0.5) * if twin < 0 { 1.0 } else { 0.5 };
        let smooth =
            lerp(this_point, face_points[quad_face(halfedge) as usize].coords, 0.5) * 0.5;
        add_point(out, edge, lerp(smooth, sharp, edge_weight));
    });
}

/// Scatter each level-`depth` halfedge into its vertex point, ignoring creases.
pub(crate) fn vertex_points(subd: &mut Subd<'_>, depth: i32) {
    let topo = &subd.topo;
    let cage = topo.cage;
    let vertex_count = cage.vertex_count_at_depth(depth) as usize;
    let face_count = cage.face_count_at_depth(depth) as usize;
    let edge_count = cage.edge_count_at_depth(depth) as usize;
    let halfedge_count = cage.halfedge_count_at_depth(depth);
    let level_start = subd.point_offsets[depth as usize - 1];
    let out_start = subd.point_offsets[depth as usize];
    let (head, tail) = subd.points.split_at_mut(out_start);
    let old_points = &head[level_start..];
    let (vertex_out, new_tail) = tail.split_at_mut(vertex_count);
    let (face_points, edge_points) = new_tail[..face_count + edge_count].split_at(face_count);
    let out = as_atomics(vertex_out);

    (0..halfedge_count).into_par_iter().for_each(|halfedge| {
        let vertex = topo.vertex(halfedge, depth);
        let edge = topo.edge(halfedge, depth);
        let old = old_points[vertex as usize].coords;

        let mut valence = 1.0f32;
        let mut forward = topo.prev_vertex_halfedge(halfedge, depth);
        while forward >= 0 && forward != halfedge {
            valence += 1.0;
            forward = topo.prev_vertex_halfedge(forward, depth);
        }
        let mut backward = topo.next_vertex_halfedge(halfedge, depth);
        while forward < 0 && backward >= 0 && backward != halfedge {
            valence += 1.0;
            backward = topo.next_vertex_halfedge(backward, depth);
        }

        let weight = 1.0 / valence;
        let smooth = if forward < 0 { 0.0 } else { 1.0 };
        let face_point = face_points[quad_face(halfedge) as usize].coords;
        let edge_point = edge_points[edge as usize].coords;
        let update = (edge_point * 4.0 - face_point - old * 3.0) * (weight * smooth);
        add_point(out, vertex, (old + update) * weight);
    });
}

/// Scatter each level-`depth` halfedge into its vertex point with the
/// crease rules.
pub(crate) fn creased_vertex_points(subd: &mut Subd<'_>, depth: i32) {
    let topo = &subd.topo;
    let cage = topo.cage;
    let vertex_count = cage.vertex_count_at_depth(depth) as usize;
    let face_count = cage.face_count_at_depth(depth) as usize;
    let edge_count = cage.edge_count_at_depth(depth) as usize;
    let halfedge_count = cage.halfedge_count_at_depth(depth);
    let level_start = subd.point_offsets[depth as usize - 1];
    let out_start = subd.point_offsets[depth as usize];
    let (head, tail) = subd.points.split_at_mut(out_start);
    let old_points = &head[level_start..];
    let (vertex_out, new_tail) = tail.split_at_mut(vertex_count);
    let (face_points, edge_points) = new_tail[..face_count + edge_count].split_at(face_count);
    let out = as_atomics(vertex_out);

    (0..halfedge_count).into_par_iter().for_each(|halfedge| {
        let vertex = topo.vertex(halfedge, depth);
        let edge = topo.edge(halfedge, depth);
        let prev = quad_prev(halfedge);
        let prev_edge = topo.edge(prev, depth);
        let this_weight = crease_weight(topo.halfedge_sharpness(halfedge, depth));
        let prev_sharpness = topo.halfedge_sharpness(prev, depth);
        let prev_weight = crease_weight(prev_sharpness);
        let new_edge_point = edge_points[edge as usize].coords;
        let new_prev_edge_point = edge_points[prev_edge as usize].coords;
        let old = old_points[vertex as usize].coords;

        let mut average_sharpness = prev_sharpness;
        let mut crease_count = prev_weight;
        let mut valence = 1.0f32;

        let mut forward = topo.twin(prev, depth);
        while forward >= 0 && forward != halfedge {
            let prev = quad_prev(forward);
            let prev_sharpness = topo.halfedge_sharpness(prev, depth);
            valence += 1.0;
            average_sharpness += prev_sharpness;
            crease_count += crease_weight(prev_sharpness);
            forward = topo.twin(prev, depth);
        }
        let mut backward = topo.twin(halfedge, depth);
        while forward < 0 && backward >= 0 && backward != halfedge {
            let next = quad_next(backward);
            let next_sharpness = topo.halfedge_sharpness(next, depth);
            valence += 1.0;
            average_sharpness += next_sharpness;
            crease_count += crease_weight(next_sharpness);
            backward = topo.twin(next, depth);
        }

        let corner = old / valence;
        let mut crease = (old + new_edge_point) * (0.25 * this_weight);
        let smooth = (new_edge_point * 4.0 - face_points[quad_face(halfedge) as usize].coords
            + old * (valence - 3.0))
            / (valence * valence);

        if forward < 0 {
            crease_count += this_weight;
            valence += 1.0;
            crease += (old + new_prev_edge_point) * (0.25 * prev_weight);
        }

        let contribution = if crease_count <= 1.0 {
            smooth
        } else if crease_count >= 3.0 || valence == 2.0 {
            corner
        } else {
            lerp(corner, crease, saturate(average_sharpness * 0.5))
        };
        add_point(out, vertex, contribution);
    });
}
