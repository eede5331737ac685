//! Gather forms of the face-, edge-, and vertex-point rules.
//!
//! A gather kernel parallelizes over output points: each iteration reads
//! every contribution to one point and writes a single result, so no
//! synchronization is needed. Work per output varies with face arity and
//! vertex valence at the cage level; at derived levels every face is a
//! quad and the face loop unrolls to four corners.
//!
//! Kernel order within a level matters: the edge rule reads the new face
//! points and the vertex rule reads both, which is why the orchestration
//! runs face, then edge, then vertex.
//!
//! The creased vertex rule walks the one-ring accumulating the smooth
//! update, the incident sharpness, and the crease count, then selects
//! the final rule: at most one incident crease means smooth, three or
//! more (or valence two) pins the vertex, and exactly two blends toward
//! the crease point by the saturated half of the accumulated sharpness.
//! Boundary rings contribute their anchor edge as a synthetic crease.

use nalgebra::Point3;
use rayon::prelude::*;

use crate::mesh::{quad_face, quad_next, quad_prev};

use super::{crease_weight, lerp, saturate, Subd};

// ==================== Cage level ====================

/// Face points of level 1: centroid of each cage face ring.
pub(crate) fn cage_face_points(subd: &mut Subd<'_>) {
    let cage = subd.topo.cage;
    let vertex_count = cage.vertex_count() as usize;
    let face_count = cage.face_count() as usize;
    let face_points = &mut subd.points[vertex_count..vertex_count + face_count];

    face_points.par_iter_mut().enumerate().for_each(|(id, out)| {
        let first = cage.face_to_halfedge(id as i32);
        let mut sum = cage.halfedge_point(first).coords;
        let mut ring = 1.0f32;
        let mut it = cage.next(first);
        while it != first {
            sum += cage.halfedge_point(it).coords;
            ring += 1.0;
            it = cage.next(it);
        }
        *out = Point3::from(sum / ring);
    });
}

/// Edge points of level 1, boundary-aware and ignoring creases.
pub(crate) fn cage_edge_points(subd: &mut Subd<'_>) {
    let cage = subd.topo.cage;
    let vertex_count = cage.vertex_count() as usize;
    let face_count = cage.face_count() as usize;
    let edge_count = cage.edge_count() as usize;
    let (head, tail) = subd.points.split_at_mut(vertex_count + face_count);
    let face_points = &head[vertex_count..];
    let edge_points = &mut tail[..edge_count];

    edge_points.par_iter_mut().enumerate().for_each(|(id, out)| {
        let halfedge = cage.edge_to_halfedge(id as i32);
        let twin = cage.twin(halfedge);
        let next = cage.next(halfedge);
        let edge_weight = if twin < 0 { 0.0 } else { 1.0 };
        let endpoints = cage.halfedge_point(halfedge).coords + cage.halfedge_point(next).coords;
        let face_pair = face_points[cage.face(halfedge) as usize].coords
            + face_points[cage.face(twin.max(0)) as usize].coords;

        let sharp = endpoints * 0.5;
        let smooth = (endpoints + face_pair) * 0.25;
        *out = Point3::from(lerp(sharp, smooth, edge_weight));
    });
}

/// Edge points of level 1 with the semi-sharp crease rule.
pub(crate) fn creased_cage_edge_points(subd: &mut Subd<'_>) {
    let cage = subd.topo.cage;
    let vertex_count = cage.vertex_count() as usize;
    let face_count = cage.face_count() as usize;
    let edge_count = cage.edge_count() as usize;
    let (head, tail) = subd.points.split_at_mut(vertex_count + face_count);
    let face_points = &head[vertex_count..];
    let edge_points = &mut tail[..edge_count];

    edge_points.par_iter_mut().enumerate().for_each(|(id, out)| {
        let edge = id as i32;
        let halfedge = cage.edge_to_halfedge(edge);
        let twin = cage.twin(halfedge);
        let next = cage.next(halfedge);
        let edge_weight = saturate(cage.sharpness(edge));
        let endpoints = cage.halfedge_point(halfedge).coords + cage.halfedge_point(next).coords;
        let face_pair = face_points[cage.face(halfedge) as usize].coords
            + face_points[cage.face(twin.max(0)) as usize].coords;

        let sharp = endpoints * 0.5;
        let smooth = (endpoints + face_pair) * 0.25;
        *out = Point3::from(lerp(smooth, sharp, edge_weight));
    });
}

/// Vertex points of level 1, ignoring creases.
///
/// Interior vertices take the Catmull-Clark average in the rearranged
/// form `V + (4E - F - 3V) / n` summed over the ring and divided by `n`;
/// a ring walk that falls off a boundary pins the vertex instead.
pub(crate) fn cage_vertex_points(subd: &mut Subd<'_>) {
    let cage = subd.topo.cage;
    let vertex_count = cage.vertex_count() as usize;
    let face_count = cage.face_count() as usize;
    let edge_count = cage.edge_count() as usize;
    let (vertex_points, tail) = subd.points.split_at_mut(vertex_count);
    let (face_points, edge_points) = tail[..face_count + edge_count].split_at(face_count);

    vertex_points.par_iter_mut().enumerate().for_each(|(id, out)| {
        let vertex = id as i32;
        let halfedge = cage.vertex_to_halfedge(vertex);
        let old = cage.point(vertex).coords;

        let mut smooth = edge_points[cage.edge(halfedge) as usize].coords * 4.0
            - face_points[cage.face(halfedge) as usize].coords;
        let mut valence = 1.0f32;
        let mut it = cage.prev_vertex_halfedge(halfedge);
        while it >= 0 && it != halfedge {
            smooth += edge_points[cage.edge(it) as usize].coords * 4.0
                - face_points[cage.face(it) as usize].coords;
            valence += 1.0;
            it = cage.prev_vertex_halfedge(it);
        }
        let smooth = smooth / (valence * valence) + old * (1.0 - 3.0 / valence);

        let closed = if it == halfedge { 1.0 } else { 0.0 };
        *out = Point3::from(lerp(old, smooth, closed));
    });
}

/// Vertex points of level 1 with the semi-sharp crease rules.
pub(crate) fn creased_cage_vertex_points(subd: &mut Subd<'_>) {
    let cage = subd.topo.cage;
    let vertex_count = cage.vertex_count() as usize;
    let face_count = cage.face_count() as usize;
    let edge_count = cage.edge_count() as usize;
    let (vertex_points, tail) = subd.points.split_at_mut(vertex_count);
    let (face_points, edge_points) = tail[..face_count + edge_count].split_at(face_count);

    vertex_points.par_iter_mut().enumerate().for_each(|(id, out)| {
        let vertex = id as i32;
        let halfedge = cage.vertex_to_halfedge(vertex);
        let edge = cage.edge(halfedge);
        let prev = cage.prev(halfedge);
        let prev_edge = cage.edge(prev);
        let this_weight = crease_weight(cage.halfedge_sharpness(halfedge));
        let prev_sharpness = cage.halfedge_sharpness(prev);
        let prev_weight = crease_weight(prev_sharpness);
        let old = cage.point(vertex).coords;

        let mut smooth = edge_points[prev_edge as usize].coords * 4.0
            - face_points[cage.face(prev) as usize].coords;
        let mut crease = edge_points[prev_edge as usize].coords * prev_weight;
        let mut average_sharpness = prev_sharpness;
        let mut crease_count = prev_weight;
        let mut valence = 1.0f32;

        let mut forward = cage.twin(prev);
        while forward >= 0 && forward != halfedge {
            let prev = cage.prev(forward);
            let prev_edge = cage.edge(prev);
            let prev_sharpness = cage.halfedge_sharpness(prev);
            let prev_weight = crease_weight(prev_sharpness);

            smooth += edge_points[prev_edge as usize].coords * 4.0
                - face_points[cage.face(prev) as usize].coords;
            valence += 1.0;

            crease += edge_points[prev_edge as usize].coords * prev_weight;
            average_sharpness += prev_sharpness;
            crease_count += prev_weight;

            forward = cage.twin(prev);
        }

        // The ring fell off a boundary: the anchor halfedge lies on it
        // and contributes a synthetic crease.
        if forward < 0 {
            crease += edge_points[edge as usize].coords * this_weight;
            crease_count += this_weight;
            valence += 1.0;
        }

        let smooth = smooth / (valence * valence) + old * (1.0 - 3.0 / valence);

        *out = if crease_count <= 1.0 {
            Point3::from(smooth)
        } else if crease_count >= 3.0 || valence == 2.0 {
            Point3::from(old)
        } else {
            let crease_point = crease * 0.25 + old * 0.5;
            Point3::from(lerp(old, crease_point, saturate(average_sharpness * 0.5)))
        };
    });
}

// ==================== Derived levels ====================

/// Face points of level `depth + 1`: average of the four quad corners.
pub(crate) fn face_points(subd: &mut Subd<'_>, depth: i32) {
    let topo = &subd.topo;
    let cage = topo.cage;
    let vertex_count = cage.vertex_count_at_depth(depth) as usize;
    let face_count = cage.face_count_at_depth(depth) as usize;
    let level_start = subd.point_offsets[depth as usize - 1];
    let out_start = subd.point_offsets[depth as usize];
    let (head, tail) = subd.points.split_at_mut(out_start);
    let old_points = &head[level_start..];
    let face_points = &mut tail[vertex_count..vertex_count + face_count];

    face_points.par_iter_mut().enumerate().for_each(|(id, out)| {
        let first = topo.face_to_halfedge(id as i32, depth);
        let mut sum = old_points[topo.vertex(first, depth) as usize].coords;
        let mut it = quad_next(first);
        while it != first {
            sum += old_points[topo.vertex(it, depth) as usize].coords;
            it = quad_next(it);
        }
        *out = Point3::from(sum * 0.25);
    });
}

/// Edge points of level `depth + 1`, boundary-aware and ignoring creases.
pub(crate) fn edge_points(subd: &mut Subd<'_>, depth: i32) {
    let topo = &subd.topo;
    let cage = topo.cage;
    let vertex_count = cage.vertex_count_at_depth(depth) as usize;
    let face_count = cage.face_count_at_depth(depth) as usize;
    let edge_count = cage.edge_count_at_depth(depth) as usize;
    let level_start = subd.point_offsets[depth as usize - 1];
    let out_start = subd.point_offsets[depth as usize];
    let (head, tail) = subd.points.split_at_mut(out_start);
    let old_points = &head[level_start..];
    let (new_head, edge_points) = tail.split_at_mut(vertex_count + face_count);
    let face_points = &new_head[vertex_count..];
    let edge_points = &mut edge_points[..edge_count];

    edge_points.par_iter_mut().enumerate().for_each(|(id, out)| {
        let halfedge = topo.edge_to_halfedge(id as i32, depth);
        let twin = topo.twin(halfedge, depth);
        let next = quad_next(halfedge);
        let edge_weight = if twin < 0 { 0.0 } else { 1.0 };
        let endpoints = old_points[topo.vertex(halfedge, depth) as usize].coords
            + old_points[topo.vertex(next, depth) as usize].coords;
        let face_pair = face_points[quad_face(halfedge) as usize].coords
            + face_points[quad_face(twin.max(0)) as usize].coords;

        let sharp = endpoints * 0.5;
        let smooth = (endpoints + face_pair) * 0.25;
        *out = Point3::from(lerp(sharp, smooth, edge_weight));
    });
}

/// Edge points of level `depth + 1` with the semi-sharp crease rule.
pub(crate) fn creased_edge_points(subd: &mut Subd<'_>, depth: i32) {
    let topo = &subd.topo;
    let cage = topo.cage;
    let vertex_count = cage.vertex_count_at_depth(depth) as usize;
    let face_count = cage.face_count_at_depth(depth) as usize;
    let edge_count = cage.edge_count_at_depth(depth) as usize;
    let level_start = subd.point_offsets[depth as usize - 1];
    let out_start = subd.point_offsets[depth as usize];
    let (head, tail) = subd.points.split_at_mut(out_start);
    let old_points = &head[level_start..];
    let (new_head, edge_points) = tail.split_at_mut(vertex_count + face_count);
    let face_points = &new_head[vertex_count..];
    let edge_points = &mut edge_points[..edge_count];

    edge_points.par_iter_mut().enumerate().for_each(|(id, out)| {
        let edge = id as i32;
        let halfedge = topo.edge_to_halfedge(edge, depth);
        let twin = topo.twin(halfedge, depth);
        let next = quad_next(halfedge);
        let edge_weight = saturate(topo.sharpness(edge, depth));
        let endpoints = old_points[topo.vertex(halfedge, depth) as usize].coords
            + old_points[topo.vertex(next, depth) as usize].coords;
        let face_pair = face_points[quad_face(halfedge) as usize].coords
            + face_points[quad_face(twin.max(0)) as usize].coords;

        let sharp = endpoints * 0.5;
        let smooth = (endpoints + face_pair) * 0.25;
        *out = Point3::from(lerp(smooth, sharp, edge_weight));
    });
}

/// Vertex points of level `depth + 1`, ignoring creases.
pub(crate) fn vertex_points(subd: &mut Subd<'_>, depth: i32) {
    let topo = &subd.topo;
    let cage = topo.cage;
    let vertex_count = cage.vertex_count_at_depth(depth) as usize;
    let face_count = cage.face_count_at_depth(depth) as usize;
    let edge_count = cage.edge_count_at_depth(depth) as usize;
    let level_start = subd.point_offsets[depth as usize - 1];
    let out_start = subd.point_offsets[depth as usize];
    let (head, tail) = subd.points.split_at_mut(out_start);
    let old_points = &head[level_start..];
    let (vertex_points, new_tail) = tail.split_at_mut(vertex_count);
    let (face_points, edge_points) = new_tail[..face_count + edge_count].split_at(face_count);

    vertex_points.par_iter_mut().enumerate().for_each(|(id, out)| {
        let vertex = id as i32;
        let halfedge = topo.vertex_point_to_halfedge(vertex, depth);
        let old = old_points[vertex as usize].coords;

        let mut smooth = edge_points[topo.edge(halfedge, depth) as usize].coords * 4.0
            - face_points[quad_face(halfedge) as usize].coords;
        let mut valence = 1.0f32;
        let mut it = topo.prev_vertex_halfedge(halfedge, depth);
        while it >= 0 && it != halfedge {
            smooth += edge_points[topo.edge(it, depth) as usize].coords * 4.0
                - face_points[quad_face(it) as usize].coords;
            valence += 1.0;
            it = topo.prev_vertex_halfedge(it, depth);
        }
        let smooth = smooth / (valence * valence) + old * (1.0 - 3.0 / valence);

        let closed = if it == halfedge { 1.0 } else { 0.0 };
        *out = Point3::from(lerp(old, smooth, closed));
    });
}

/// Vertex points of level `depth + 1` with the semi-sharp crease rules.
///
/// Unlike the cage kernel, the anchor halfedge here is whatever
/// `vertex_point_to_halfedge` yields, with no boundary-first guarantee,
/// so a ring that falls off a boundary finishes with a backward walk
/// from the anchor's other side.
pub(crate) fn creased_vertex_points(subd: &mut Subd<'_>, depth: i32) {
    let topo = &subd.topo;
    let cage = topo.cage;
    let vertex_count = cage.vertex_count_at_depth(depth) as usize;
    let face_count = cage.face_count_at_depth(depth) as usize;
    let edge_count = cage.edge_count_at_depth(depth) as usize;
    let level_start = subd.point_offsets[depth as usize - 1];
    let out_start = subd.point_offsets[depth as usize];
    let (head, tail) = subd.points.split_at_mut(out_start);
    let old_points = &head[level_start..];
    let (vertex_points, new_tail) = tail.split_at_mut(vertex_count);
    let (face_points, edge_points) = new_tail[..face_count + edge_count].split_at(face_count);

    vertex_points.par_iter_mut().enumerate().for_each(|(id, out)| {
        let vertex = id as i32;
        let halfedge = topo.vertex_point_to_halfedge(vertex, depth);
        let edge = topo.edge(halfedge, depth);
        let prev = quad_prev(halfedge);
        let prev_edge = topo.edge(prev, depth);
        let this_weight = crease_weight(topo.halfedge_sharpness(halfedge, depth));
        let prev_sharpness = topo.halfedge_sharpness(prev, depth);
        let prev_weight = crease_weight(prev_sharpness);
        let old = old_points[vertex as usize].coords;

        let mut smooth = edge_points[prev_edge as usize].coords * 4.0
            - face_points[quad_face(prev) as usize].coords;
        let mut crease = edge_points[prev_edge as usize].coords * prev_weight;
        let mut average_sharpness = prev_sharpness;
        let mut crease_count = prev_weight;
        let mut valence = 1.0f32;

        let mut forward = topo.twin(prev, depth);
        while forward >= 0 && forward != halfedge {
            let prev = quad_prev(forward);
            let prev_edge = topo.edge(prev, depth);
            let prev_sharpness = topo.halfedge_sharpness(prev, depth);
            let prev_weight = crease_weight(prev_sharpness);

            smooth += edge_points[prev_edge as usize].coords * 4.0
                - face_points[quad_face(prev) as usize].coords;
            valence += 1.0;

            crease += edge_points[prev_edge as usize].coords * prev_weight;
            average_sharpness += prev_sharpness;
            crease_count += prev_weight;

            forward = topo.twin(prev, depth);
        }

        let mut backward = topo.twin(halfedge, depth);
        while forward < 0 && backward >= 0 && backward != halfedge {
            let next = quad_next(backward);
            let next_edge = topo.edge(next, depth);
            let next_sharpness = topo.halfedge_sharpness(next, depth);
            let next_weight = crease_weight(next_sharpness);

            smooth += edge_points[next_edge as usize].coords * 4.0
                - face_points[quad_face(next) as usize].coords;
            valence += 1.0;

            crease += edge_points[next_edge as usize].coords * next_weight;
            average_sharpness += next_sharpness;
            crease_count += next_weight;

            backward = topo.twin(next, depth);
        }

        if forward < 0 {
            crease += edge_points[edge as usize].coords * this_weight;
            crease_count += this_weight;
            valence += 1.0;
        }

        let smooth = smooth / (valence * valence) + old * (1.0 - 3.0 / valence);

        *out = if crease_count <= 1.0 {
            Point3::from(smooth)
        } else if crease_count >= 3.0 || valence == 2.0 {
            Point3::from(old)
        } else {
            let crease_point = crease * (0.5 / crease_count) + old * 0.5;
            Point3::from(lerp(old, crease_point, saturate(average_sharpness * 0.5)))
        };
    });
}
