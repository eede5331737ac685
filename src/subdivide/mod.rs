//! Catmull-Clark subdivision of a halfedge cage.
//!
//! [`Subd`] owns the whole hierarchy of derived levels `1..=max_depth`:
//! halfedges, creases, and vertex points, each stored contiguously per
//! level behind cumulative offsets computed from the cage counts. The
//! refinement pipeline fills the hierarchy in passes:
//!
//! 1. Halfedge refinement synthesizes each level's quad topology from
//!    the level below (`cage -> 1`, then `1 -> 2`, and so on).
//! 2. Crease refinement subdivides the per-edge sharpness chains.
//! 3. Uv refinement interpolates per-corner uvs (when the cage has any).
//! 4. Geometry refinement applies the face-, edge-, and vertex-point
//!    rules level by level, in that order, since the edge rule reads the
//!    new face points and the vertex rule reads both.
//!
//! Each geometry rule exists in two algorithmically dual forms that
//! produce the same values up to float reassociation: **gather** loops
//! over output points, and **scatter** loops over halfedges and
//! accumulates contributions atomically. Combined with the semi-sharp
//! crease rules of DeRose et al. being on or off, that yields the four
//! entry points [`refine_gather`], [`refine_scatter`],
//! [`refine_no_creases_gather`], and [`refine_no_creases_scatter`].
//! Every kernel is a rayon parallel loop; the join at the end of each
//! kernel is the barrier that publishes its writes to the next one.
//!
//! # Example
//!
//! ```
//! use quadrille::mesh::build_from_quads;
//! use quadrille::subdivide::{refine_gather, Subd};
//! use nalgebra::Point3;
//!
//! let points = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let cage = build_from_quads(&points, &[[0, 1, 2, 3]]).unwrap();
//!
//! let mut subd = Subd::new(&cage, 2).unwrap();
//! refine_gather(&mut subd);
//!
//! // One quad becomes four, then sixteen.
//! assert_eq!(subd.cage().face_count_at_depth(1), 4);
//! assert_eq!(subd.cage().face_count_at_depth(2), 16);
//! ```

mod atomic;
mod creases;
mod gather;
mod scatter;
mod topology;
mod uvs;

use nalgebra::{Point3, Vector2, Vector3};

use crate::error::{Error, Result};
use crate::mesh::{quad_face_halfedge, quad_next, quad_prev, Cage, Crease, QuadHalfedge};

pub use atomic::AtomicF32;

/// `a` at 0, `b` at 1; exact at both endpoints.
#[inline]
pub(crate) fn lerp(a: Vector3<f32>, b: Vector3<f32>, t: f32) -> Vector3<f32> {
    a * (1.0 - t) + b * t
}

#[inline]
pub(crate) fn lerp_uv(a: Vector2<f32>, b: Vector2<f32>, t: f32) -> Vector2<f32> {
    a * (1.0 - t) + b * t
}

#[inline]
pub(crate) fn saturate(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// 1 for a sharp edge, 0 for a smooth one.
#[inline]
pub(crate) fn crease_weight(sharpness: f32) -> f32 {
    if sharpness > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Derived topology of the hierarchy: halfedges and creases for every
/// level `1..=max_depth`, plus the addressing queries over them.
///
/// Split out of [`Subd`] so geometry kernels can read topology while
/// writing vertex points.
#[derive(Debug)]
pub struct SubdTopology<'a> {
    pub(crate) cage: &'a Cage,
    pub(crate) max_depth: i32,
    pub(crate) halfedges: Vec<QuadHalfedge>,
    pub(crate) creases: Vec<Crease>,
    /// `halfedge_offsets[d]` = halfedges stored for levels `1..=d`.
    pub(crate) halfedge_offsets: Vec<usize>,
    /// `crease_offsets[d]` = creases stored for levels `1..=d`.
    pub(crate) crease_offsets: Vec<usize>,
}

impl<'a> SubdTopology<'a> {
    fn new(cage: &'a Cage, max_depth: i32) -> Self {
        let mut halfedge_offsets = vec![0usize];
        let mut crease_offsets = vec![0usize];
        for depth in 1..=max_depth {
            halfedge_offsets
                .push(halfedge_offsets[depth as usize - 1] + cage.halfedge_count_at_depth(depth) as usize);
            crease_offsets
                .push(crease_offsets[depth as usize - 1] + cage.crease_count_at_depth(depth) as usize);
        }

        let halfedges = vec![QuadHalfedge::default(); halfedge_offsets[max_depth as usize]];
        // Creases default to smooth self-links; crease refinement only
        // rewrites the children of parent edges, so the creases of the
        // interior edges created by each refinement step keep this
        // default and stay smooth.
        let mut creases = Vec::with_capacity(crease_offsets[max_depth as usize]);
        for depth in 1..=max_depth {
            for edge in 0..cage.crease_count_at_depth(depth) {
                creases.push(Crease::smooth(edge));
            }
        }

        Self {
            cage,
            max_depth,
            halfedges,
            creases,
            halfedge_offsets,
            crease_offsets,
        }
    }

    /// The halfedge records of level `depth` (1-based).
    pub fn halfedges_at_depth(&self, depth: i32) -> &[QuadHalfedge] {
        let depth = depth as usize;
        &self.halfedges[self.halfedge_offsets[depth - 1]..self.halfedge_offsets[depth]]
    }

    /// The crease records of level `depth` (1-based).
    pub fn creases_at_depth(&self, depth: i32) -> &[Crease] {
        let depth = depth as usize;
        &self.creases[self.crease_offsets[depth - 1]..self.crease_offsets[depth]]
    }

    #[inline]
    fn halfedge(&self, halfedge: i32, depth: i32) -> &QuadHalfedge {
        &self.halfedges[self.halfedge_offsets[depth as usize - 1] + halfedge as usize]
    }

    #[inline]
    fn crease(&self, edge: i32, depth: i32) -> &Crease {
        &self.creases[self.crease_offsets[depth as usize - 1] + edge as usize]
    }

    /// Twin of a halfedge at a level >= 1; negative on a boundary.
    #[inline]
    pub fn twin(&self, halfedge: i32, depth: i32) -> i32 {
        self.halfedge(halfedge, depth).twin
    }

    /// Edge of a halfedge at a level >= 1.
    #[inline]
    pub fn edge(&self, halfedge: i32, depth: i32) -> i32 {
        self.halfedge(halfedge, depth).edge
    }

    /// Origin vertex of a halfedge at a level >= 1.
    #[inline]
    pub fn vertex(&self, halfedge: i32, depth: i32) -> i32 {
        self.halfedge(halfedge, depth).vertex
    }

    /// Packed uv bits of a halfedge at a level >= 1.
    #[inline]
    pub fn uv_bits(&self, halfedge: i32, depth: i32) -> i32 {
        self.halfedge(halfedge, depth).uv
    }

    /// Uv of a halfedge corner at a level >= 1.
    #[inline]
    pub fn uv(&self, halfedge: i32, depth: i32) -> Vector2<f32> {
        uvs::decode_uv(self.uv_bits(halfedge, depth))
    }

    /// Next edge along the sharpness chain at a level >= 1.
    #[inline]
    pub fn crease_next(&self, edge: i32, depth: i32) -> i32 {
        self.crease(edge, depth).next
    }

    /// Previous edge along the sharpness chain at a level >= 1.
    #[inline]
    pub fn crease_prev(&self, edge: i32, depth: i32) -> i32 {
        self.crease(edge, depth).prev
    }

    /// Sharpness of an edge at a level >= 1.
    #[inline]
    pub fn sharpness(&self, edge: i32, depth: i32) -> f32 {
        self.crease(edge, depth).sharpness
    }

    /// Sharpness of the edge a halfedge lies on, at a level >= 1.
    #[inline]
    pub fn halfedge_sharpness(&self, halfedge: i32, depth: i32) -> f32 {
        self.sharpness(self.edge(halfedge, depth), depth)
    }

    /// Rotate around the origin vertex, against face winding.
    ///
    /// Negative once the rotation falls off a boundary.
    #[inline]
    pub fn prev_vertex_halfedge(&self, halfedge: i32, depth: i32) -> i32 {
        self.twin(quad_prev(halfedge), depth)
    }

    /// Rotate around the origin vertex, along face winding.
    ///
    /// Negative once the rotation falls off a boundary.
    #[inline]
    pub fn next_vertex_halfedge(&self, halfedge: i32, depth: i32) -> i32 {
        let twin = self.twin(halfedge, depth);
        if twin >= 0 {
            quad_next(twin)
        } else {
            -1
        }
    }

    /// First halfedge of a face at any level.
    #[inline]
    pub fn face_to_halfedge(&self, face: i32, depth: i32) -> i32 {
        if depth == 0 {
            self.cage.face_to_halfedge(face)
        } else {
            quad_face_halfedge(face)
        }
    }

    /// A halfedge lying on `edge` at any level.
    ///
    /// At derived levels the mapping inverts the child-edge numbering of
    /// the refinement rule: edges past `2 * E_parent` are interior to a
    /// parent face and come from one parent halfedge; edges below that
    /// are the two subedges of a parent edge, assigned to the two sides
    /// by the `halfedge > twin` tie-break.
    pub fn edge_to_halfedge(&self, edge: i32, depth: i32) -> i32 {
        if depth == 0 {
            return self.cage.edge_to_halfedge(edge);
        }
        let parent_edge_count = self.cage.edge_count_at_depth(depth - 1);
        if edge >= 2 * parent_edge_count {
            // Interior edge, from the edge point of parent halfedge to
            // its face point; covered by that halfedge's second child.
            return 4 * (edge - 2 * parent_edge_count) + 1;
        }

        // A subedge of parent edge `edge / 2`.
        let (halfedge, twin, next) = if depth > 1 {
            let halfedge = self.edge_to_halfedge(edge / 2, depth - 1);
            (
                halfedge,
                self.twin(halfedge, depth - 1),
                quad_next(halfedge),
            )
        } else {
            let halfedge = self.cage.edge_to_halfedge(edge / 2);
            (
                halfedge,
                self.cage.twin(halfedge),
                self.cage.next(halfedge),
            )
        };

        let side = i32::from(halfedge <= twin);
        if (edge & 1) == side {
            4 * halfedge
        } else if twin >= 0 {
            4 * twin
        } else {
            // Boundary: the far subedge is covered by the next corner's
            // fourth child.
            4 * next + 3
        }
    }

    /// A halfedge whose origin is vertex point `vertex` at `depth`.
    ///
    /// New vertex points partition into three ranges - carried vertices,
    /// face points, edge points - so the query descends the hierarchy
    /// until the vertex stops being "carried", then maps through the
    /// face or edge that spawned it. A vertex carried from the level
    /// below keeps the first child of its parent halfedge.
    pub fn vertex_point_to_halfedge(&self, vertex: i32, depth: i32) -> i32 {
        if depth > 1 {
            let vertex_count = self.cage.vertex_count_at_depth(depth - 1);
            let face_count = self.cage.face_count_at_depth(depth - 1);
            if vertex >= vertex_count + face_count {
                4 * self.edge_to_halfedge(vertex - vertex_count - face_count, depth - 1) + 1
            } else if vertex >= vertex_count {
                4 * quad_face_halfedge(vertex - vertex_count) + 2
            } else {
                4 * self.vertex_point_to_halfedge(vertex, depth - 1)
            }
        } else {
            let vertex_count = self.cage.vertex_count();
            let face_count = self.cage.face_count();
            if vertex >= vertex_count + face_count {
                4 * self.cage.edge_to_halfedge(vertex - vertex_count - face_count) + 1
            } else if vertex >= vertex_count {
                4 * self.cage.face_to_halfedge(vertex - vertex_count) + 2
            } else {
                4 * self.cage.vertex_to_halfedge(vertex)
            }
        }
    }
}

/// A Catmull-Clark subdivision hierarchy over a borrowed cage.
///
/// Created once with [`Subd::new`], filled by one of the refine entry
/// points, then read through the query accessors. The cage is never
/// mutated; all derived state lives here.
#[derive(Debug)]
pub struct Subd<'a> {
    pub(crate) topo: SubdTopology<'a>,
    pub(crate) points: Vec<Point3<f32>>,
    /// `point_offsets[d]` = vertex points stored for levels `1..=d`.
    pub(crate) point_offsets: Vec<usize>,
}

impl<'a> Subd<'a> {
    /// Allocate hierarchy storage for `max_depth` subdivision levels.
    ///
    /// `max_depth` must be at least 1.
    pub fn new(cage: &'a Cage, max_depth: i32) -> Result<Self> {
        if max_depth < 1 {
            return Err(Error::InvalidDepth(max_depth));
        }

        let mut point_offsets = vec![0usize];
        for depth in 1..=max_depth {
            point_offsets
                .push(point_offsets[depth as usize - 1] + cage.vertex_count_at_depth(depth) as usize);
        }
        let points = vec![Point3::origin(); point_offsets[max_depth as usize]];

        Ok(Self {
            topo: SubdTopology::new(cage, max_depth),
            points,
            point_offsets,
        })
    }

    /// The borrowed control cage.
    #[inline]
    pub fn cage(&self) -> &Cage {
        self.topo.cage
    }

    /// Number of stored subdivision levels.
    #[inline]
    pub fn max_depth(&self) -> i32 {
        self.topo.max_depth
    }

    /// Derived topology queries (levels >= 1).
    #[inline]
    pub fn topology(&self) -> &SubdTopology<'a> {
        &self.topo
    }

    /// Vertex point `vertex` of level `depth`; level 0 reads the cage.
    #[inline]
    pub fn vertex_point(&self, vertex: i32, depth: i32) -> Point3<f32> {
        if depth == 0 {
            self.topo.cage.point(vertex)
        } else {
            self.points[self.point_offsets[depth as usize - 1] + vertex as usize]
        }
    }

    /// All vertex points of level `depth` (1-based).
    pub fn points_at_depth(&self, depth: i32) -> &[Point3<f32>] {
        let depth = depth as usize;
        &self.points[self.point_offsets[depth - 1]..self.point_offsets[depth]]
    }

    /// Total halfedges stored across levels `1..=depth`.
    #[inline]
    pub fn cumulative_halfedge_count_at_depth(&self, depth: i32) -> i32 {
        self.topo.halfedge_offsets[depth as usize] as i32
    }

    /// Total creases stored across levels `1..=depth`.
    #[inline]
    pub fn cumulative_crease_count_at_depth(&self, depth: i32) -> i32 {
        self.topo.crease_offsets[depth as usize] as i32
    }

    /// Total vertex points stored across levels `1..=depth`.
    #[inline]
    pub fn cumulative_vertex_count_at_depth(&self, depth: i32) -> i32 {
        self.point_offsets[depth as usize] as i32
    }

    /// Total halfedges stored in the hierarchy.
    #[inline]
    pub fn cumulative_halfedge_count(&self) -> i32 {
        self.cumulative_halfedge_count_at_depth(self.max_depth())
    }

    /// Total creases stored in the hierarchy.
    #[inline]
    pub fn cumulative_crease_count(&self) -> i32 {
        self.cumulative_crease_count_at_depth(self.max_depth())
    }

    /// Total vertex points stored in the hierarchy.
    #[inline]
    pub fn cumulative_vertex_count(&self) -> i32 {
        self.cumulative_vertex_count_at_depth(self.max_depth())
    }
}

// ==================== Orchestration ====================

/// Refine topology and geometry with creases, gather kernels.
pub fn refine_gather(subd: &mut Subd<'_>) {
    refine_topology(subd);
    refine_vertex_points_gather(subd);
}

/// Refine topology and geometry with creases, scatter kernels.
pub fn refine_scatter(subd: &mut Subd<'_>) {
    refine_topology(subd);
    refine_vertex_points_scatter(subd);
}

/// Refine topology and geometry ignoring creases, gather kernels.
pub fn refine_no_creases_gather(subd: &mut Subd<'_>) {
    refine_topology(subd);
    refine_vertex_points_no_creases_gather(subd);
}

/// Refine topology and geometry ignoring creases, scatter kernels.
pub fn refine_no_creases_scatter(subd: &mut Subd<'_>) {
    refine_topology(subd);
    refine_vertex_points_no_creases_scatter(subd);
}

fn refine_topology(subd: &mut Subd<'_>) {
    refine_halfedges(subd);
    refine_creases(subd);
    refine_vertex_uvs(subd);
}

/// Synthesize the halfedge topology of every level.
pub fn refine_halfedges(subd: &mut Subd<'_>) {
    topology::refine_cage_halfedges(subd);
    for depth in 1..subd.max_depth() {
        topology::refine_halfedges(subd, depth);
    }
}

/// Subdivide the crease chains of every level.
pub fn refine_creases(subd: &mut Subd<'_>) {
    creases::refine_cage_creases(subd);
    for depth in 1..subd.max_depth() {
        creases::refine_creases(subd, depth);
    }
}

/// Interpolate uvs across every level; no-op when the cage has no uvs.
pub fn refine_vertex_uvs(subd: &mut Subd<'_>) {
    if subd.cage().uv_count() == 0 {
        return;
    }
    uvs::refine_cage_uvs(subd);
    for depth in 1..subd.max_depth() {
        uvs::refine_uvs(subd, depth);
    }
}

/// Compute all vertex points with the creased rules, gather kernels.
pub fn refine_vertex_points_gather(subd: &mut Subd<'_>) {
    gather::cage_face_points(subd);
    gather::creased_cage_edge_points(subd);
    gather::creased_cage_vertex_points(subd);
    for depth in 1..subd.max_depth() {
        gather::face_points(subd, depth);
        gather::creased_edge_points(subd, depth);
        gather::creased_vertex_points(subd, depth);
    }
}

/// Compute all vertex points with the uncreased rules, gather kernels.
pub fn refine_vertex_points_no_creases_gather(subd: &mut Subd<'_>) {
    gather::cage_face_points(subd);
    gather::cage_edge_points(subd);
    gather::cage_vertex_points(subd);
    for depth in 1..subd.max_depth() {
        gather::face_points(subd, depth);
        gather::edge_points(subd, depth);
        gather::vertex_points(subd, depth);
    }
}

/// Compute all vertex points with the creased rules, scatter kernels.
pub fn refine_vertex_points_scatter(subd: &mut Subd<'_>) {
    scatter::clear_vertex_points(subd);
    scatter::cage_face_points(subd);
    scatter::creased_cage_edge_points(subd);
    scatter::creased_cage_vertex_points(subd);
    for depth in 1..subd.max_depth() {
        scatter::face_points(subd, depth);
        scatter::creased_edge_points(subd, depth);
        scatter::creased_vertex_points(subd, depth);
    }
}

/// Compute all vertex points with the uncreased rules, scatter kernels.
pub fn refine_vertex_points_no_creases_scatter(subd: &mut Subd<'_>) {
    scatter::clear_vertex_points(subd);
    scatter::cage_face_points(subd);
    scatter::cage_edge_points(subd);
    scatter::cage_vertex_points(subd);
    for depth in 1..subd.max_depth() {
        scatter::face_points(subd, depth);
        scatter::edge_points(subd, depth);
        scatter::vertex_points(subd, depth);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector2};

    use crate::error::Error;
    use crate::mesh::{build_from_quads, build_from_triangles, Cage, CageBuilder};

    use super::*;

    fn cube_points() -> Vec<Point3<f32>> {
        vec![
            Point3::new(-0.5, -0.5, -0.5),
            Point3::new(0.5, -0.5, -0.5),
            Point3::new(0.5, 0.5, -0.5),
            Point3::new(-0.5, 0.5, -0.5),
            Point3::new(-0.5, -0.5, 0.5),
            Point3::new(0.5, -0.5, 0.5),
            Point3::new(0.5, 0.5, 0.5),
            Point3::new(-0.5, 0.5, 0.5),
        ]
    }

    fn cube_faces() -> Vec<[usize; 4]> {
        vec![
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ]
    }

    fn cube() -> Cage {
        build_from_quads(&cube_points(), &cube_faces()).unwrap()
    }

    /// Cube with the four top edges sharp, forming a closed crease ring.
    fn cube_with_sharp_top(sharpness: f32) -> Cage {
        let mut builder = CageBuilder::new(&cube_points());
        for ring in cube_faces() {
            builder = builder.quad(ring);
        }
        builder
            .sharp_edge(4, 5, sharpness)
            .sharp_edge(5, 6, sharpness)
            .sharp_edge(6, 7, sharpness)
            .sharp_edge(7, 4, sharpness)
            .build()
            .unwrap()
    }

    fn tetrahedron() -> Cage {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        build_from_triangles(&points, &[[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]]).unwrap()
    }

    fn square() -> Vec<Point3<f32>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    /// Two quads in a row; every vertex lies on the boundary.
    fn quad_strip() -> Cage {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        build_from_quads(&points, &[[0, 1, 4, 3], [1, 2, 5, 4]]).unwrap()
    }

    fn assert_points_close(a: &[Point3<f32>], b: &[Point3<f32>]) {
        assert_eq!(a.len(), b.len());
        for (left, right) in a.iter().zip(b) {
            for i in 0..3 {
                assert_relative_eq!(left[i], right[i], epsilon = 1e-5, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn test_new_rejects_zero_depth() {
        let cage = cube();
        assert!(matches!(Subd::new(&cage, 0), Err(Error::InvalidDepth(0))));
    }

    #[test]
    fn test_cumulative_counts_sum_per_level_counts() {
        let cage = cube();
        let subd = Subd::new(&cage, 3).unwrap();

        let mut halfedges = 0;
        let mut creases = 0;
        let mut vertices = 0;
        for depth in 1..=3 {
            halfedges += cage.halfedge_count_at_depth(depth);
            creases += cage.crease_count_at_depth(depth);
            vertices += cage.vertex_count_at_depth(depth);
            assert_eq!(subd.cumulative_halfedge_count_at_depth(depth), halfedges);
            assert_eq!(subd.cumulative_crease_count_at_depth(depth), creases);
            assert_eq!(subd.cumulative_vertex_count_at_depth(depth), vertices);
        }
        assert_eq!(subd.cumulative_halfedge_count(), halfedges);
        assert_eq!(subd.cumulative_crease_count(), creases);
        assert_eq!(subd.cumulative_vertex_count(), vertices);
    }

    #[test]
    fn test_refined_topology_invariants_closed() {
        let cage = cube();
        let mut subd = Subd::new(&cage, 3).unwrap();
        refine_halfedges(&mut subd);
        let topo = subd.topology();

        for depth in 1..=3 {
            let halfedge_count = cage.halfedge_count_at_depth(depth);
            let edge_count = cage.edge_count_at_depth(depth);
            let vertex_count = cage.vertex_count_at_depth(depth);

            for h in 0..halfedge_count {
                // A closed cage stays closed.
                let twin = topo.twin(h, depth);
                assert!(twin >= 0);
                assert_eq!(topo.twin(twin, depth), h);
                assert_eq!(topo.edge(twin, depth), topo.edge(h, depth));
                assert!((0..edge_count).contains(&topo.edge(h, depth)));
                assert!((0..vertex_count).contains(&topo.vertex(h, depth)));
            }
            for e in 0..edge_count {
                let h = topo.edge_to_halfedge(e, depth);
                assert_eq!(topo.edge(h, depth), e);
            }
            for v in 0..vertex_count {
                let h = topo.vertex_point_to_halfedge(v, depth);
                assert_eq!(topo.vertex(h, depth), v);
            }
        }
    }

    #[test]
    fn test_refined_topology_invariants_boundary() {
        let cage = quad_strip();
        let mut subd = Subd::new(&cage, 2).unwrap();
        refine_halfedges(&mut subd);
        let topo = subd.topology();

        let cage_boundary = (0..cage.halfedge_count())
            .filter(|&h| cage.twin(h) < 0)
            .count();
        assert_eq!(cage_boundary, 6);

        for depth in 1..=2 {
            let halfedge_count = cage.halfedge_count_at_depth(depth);
            let mut boundary = 0;
            for h in 0..halfedge_count {
                let twin = topo.twin(h, depth);
                if twin < 0 {
                    boundary += 1;
                } else {
                    assert_eq!(topo.twin(twin, depth), h);
                    assert_eq!(topo.edge(twin, depth), topo.edge(h, depth));
                }
            }
            // Every boundary edge splits in two per level.
            assert_eq!(boundary, 6 << depth);

            for e in 0..cage.edge_count_at_depth(depth) {
                let h = topo.edge_to_halfedge(e, depth);
                assert_eq!(topo.edge(h, depth), e);
            }
            for v in 0..cage.vertex_count_at_depth(depth) {
                let h = topo.vertex_point_to_halfedge(v, depth);
                assert_eq!(topo.vertex(h, depth), v);
            }
        }
    }

    #[test]
    fn test_cube_face_points_are_centroids() {
        let cage = cube();
        let mut subd = Subd::new(&cage, 2).unwrap();
        refine_gather(&mut subd);

        assert_eq!(subd.points_at_depth(1).len(), 26);
        assert_eq!(subd.points_at_depth(2).len(), 98);

        for face in 0..cage.face_count() {
            let first = cage.face_to_halfedge(face);
            let mut sum = cage.halfedge_point(first).coords;
            let mut it = cage.next(first);
            while it != first {
                sum += cage.halfedge_point(it).coords;
                it = cage.next(it);
            }
            let centroid = Point3::from(sum / 4.0);
            assert_eq!(subd.vertex_point(cage.vertex_count() + face, 1), centroid);
        }

        // The bottom face of the cube sits at z = -0.5.
        assert_eq!(
            subd.vertex_point(cage.vertex_count(), 1),
            Point3::new(0.0, 0.0, -0.5)
        );
    }

    #[test]
    fn test_tetrahedron_face_points_are_triangle_centroids() {
        let cage = tetrahedron();
        // Three quads per triangle.
        assert_eq!(cage.face_count_at_depth(1), 12);

        let mut subd = Subd::new(&cage, 1).unwrap();
        refine_gather(&mut subd);

        for face in 0..cage.face_count() {
            let first = cage.face_to_halfedge(face);
            let mut sum = cage.halfedge_point(first).coords;
            let mut it = cage.next(first);
            while it != first {
                sum += cage.halfedge_point(it).coords;
                it = cage.next(it);
            }
            let centroid = Point3::from(sum / 3.0);
            let face_point = subd.vertex_point(cage.vertex_count() + face, 1);
            for i in 0..3 {
                assert_relative_eq!(face_point[i], centroid[i], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_scatter_matches_gather_uncreased() {
        let cage = cube();
        let mut gathered = Subd::new(&cage, 3).unwrap();
        let mut scattered = Subd::new(&cage, 3).unwrap();
        refine_no_creases_gather(&mut gathered);
        refine_no_creases_scatter(&mut scattered);

        for depth in 1..=3 {
            assert_points_close(gathered.points_at_depth(depth), scattered.points_at_depth(depth));
        }
    }

    #[test]
    fn test_scatter_matches_gather_creased() {
        let cage = cube_with_sharp_top(1.5);
        let mut gathered = Subd::new(&cage, 3).unwrap();
        let mut scattered = Subd::new(&cage, 3).unwrap();
        refine_gather(&mut gathered);
        refine_scatter(&mut scattered);

        for depth in 1..=3 {
            assert_points_close(gathered.points_at_depth(depth), scattered.points_at_depth(depth));
        }
    }

    #[test]
    fn test_scatter_matches_gather_on_boundary() {
        let cage = quad_strip();
        let mut gathered = Subd::new(&cage, 2).unwrap();
        let mut scattered = Subd::new(&cage, 2).unwrap();
        refine_no_creases_gather(&mut gathered);
        refine_no_creases_scatter(&mut scattered);

        for depth in 1..=2 {
            assert_points_close(gathered.points_at_depth(depth), scattered.points_at_depth(depth));
        }
    }

    #[test]
    fn test_zero_sharpness_matches_uncreased() {
        // On a closed cage the creased rules with all sharpness zero
        // reduce to the uncreased rules. The first level is exact (the
        // cube's sums are dyadic); deeper levels only differ by the
        // rotated accumulation order of the creased one-ring walk.
        let cage = cube();
        let mut creased = Subd::new(&cage, 2).unwrap();
        let mut uncreased = Subd::new(&cage, 2).unwrap();
        refine_gather(&mut creased);
        refine_no_creases_gather(&mut uncreased);

        assert_eq!(creased.points_at_depth(1), uncreased.points_at_depth(1));
        assert_points_close(creased.points_at_depth(2), uncreased.points_at_depth(2));
    }

    #[test]
    fn test_huge_sharpness_pins_cage_vertices() {
        let mut builder = CageBuilder::new(&cube_points());
        for ring in cube_faces() {
            builder = builder.quad(ring);
        }
        // Every edge effectively infinitely sharp: every cube corner has
        // three incident creases and takes the corner rule at all levels.
        for face in cube_faces() {
            for i in 0..4 {
                builder = builder.sharp_edge(face[i], face[(i + 1) % 4], 1e6);
            }
        }
        let cage = builder.build().unwrap();

        let mut subd = Subd::new(&cage, 3).unwrap();
        refine_gather(&mut subd);

        for depth in 1..=3 {
            for vertex in 0..cage.vertex_count() {
                assert_eq!(subd.vertex_point(vertex, depth), cage.point(vertex));
            }
        }
    }

    #[test]
    fn test_valence_two_vertex_with_two_creases_is_held() {
        // Sharp enough that the creases survive all three levels.
        let cage = CageBuilder::new(&square())
            .quad([0, 1, 2, 3])
            .sharp_edge(0, 1, 4.0)
            .sharp_edge(0, 3, 4.0)
            .build()
            .unwrap();

        let mut subd = Subd::new(&cage, 3).unwrap();
        refine_gather(&mut subd);

        for depth in 1..=3 {
            assert_eq!(subd.vertex_point(0, depth), cage.point(0));
        }
    }

    #[test]
    fn test_sharp_edge_point_is_the_exact_midpoint() {
        let cage = CageBuilder::new(&square())
            .quad([0, 1, 2, 3])
            .sharp_edge(0, 1, 1.0)
            .build()
            .unwrap();
        let sharp = cage.edge(0);

        let mut subd = Subd::new(&cage, 1).unwrap();
        refine_gather(&mut subd);

        let edge_point =
            subd.vertex_point(cage.vertex_count() + cage.face_count() + sharp, 1);
        assert_eq!(edge_point, Point3::new(0.5, 0.0, 0.0));

        // A smooth boundary edge of the same cage is pulled toward the
        // face point instead.
        let smooth = cage.edge(1);
        let smooth_point =
            subd.vertex_point(cage.vertex_count() + cage.face_count() + smooth, 1);
        assert_ne!(smooth_point, Point3::new(1.0, 0.5, 0.0));
    }

    #[test]
    fn test_boundary_strip_keeps_its_rim() {
        let cage = quad_strip();
        let mut subd = Subd::new(&cage, 2).unwrap();
        refine_no_creases_gather(&mut subd);

        // Every cage vertex lies on the boundary and is preserved.
        for depth in 1..=2 {
            for vertex in 0..cage.vertex_count() {
                assert_eq!(subd.vertex_point(vertex, depth), cage.point(vertex));
            }
        }

        // Boundary edge points are exact midpoints.
        let edge_point_base = cage.vertex_count() + cage.face_count();
        for edge in 0..cage.edge_count() {
            let halfedge = cage.edge_to_halfedge(edge);
            if cage.twin(halfedge) >= 0 {
                continue;
            }
            let a = cage.halfedge_point(halfedge).coords;
            let b = cage.halfedge_point(cage.next(halfedge)).coords;
            assert_eq!(
                subd.vertex_point(edge_point_base + edge, 1),
                Point3::from((a + b) * 0.5)
            );
        }

        // The level-1 boundary midpoints survive the second level too.
        let midpoint_01 = edge_point_base + cage.edge(0);
        assert_eq!(
            subd.vertex_point(midpoint_01, 2),
            subd.vertex_point(midpoint_01, 1)
        );
    }

    #[test]
    fn test_deeper_hierarchy_restricts_to_shallower() {
        let cage = cube_with_sharp_top(2.0);
        let mut deep = Subd::new(&cage, 3).unwrap();
        let mut shallow = Subd::new(&cage, 2).unwrap();
        refine_gather(&mut deep);
        refine_gather(&mut shallow);

        for depth in 1..=2 {
            assert_eq!(
                deep.topology().halfedges_at_depth(depth),
                shallow.topology().halfedges_at_depth(depth)
            );
            assert_eq!(
                deep.topology().creases_at_depth(depth),
                shallow.topology().creases_at_depth(depth)
            );
            assert_eq!(deep.points_at_depth(depth), shallow.points_at_depth(depth));
        }
    }

    #[test]
    fn test_uv_refinement_on_a_square() {
        let uvs = [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 1.0),
        ];
        let cage = CageBuilder::new(&square())
            .quad([0, 1, 2, 3])
            .corner_uvs(&uvs)
            .build()
            .unwrap();

        let mut subd = Subd::new(&cage, 2).unwrap();
        refine_gather(&mut subd);
        let topo = subd.topology();

        // Children of halfedge 0: corner, edge midpoint, face average,
        // previous edge midpoint. Quantized to 16 bits.
        let expectations = [
            (0, Vector2::new(0.0, 0.0)),
            (1, Vector2::new(0.5, 0.0)),
            (2, Vector2::new(0.5, 0.5)),
            (3, Vector2::new(0.0, 0.5)),
        ];
        for (child, expected) in expectations {
            let uv = topo.uv(child, 1);
            assert_relative_eq!(uv.x, expected.x, epsilon = 1e-4);
            assert_relative_eq!(uv.y, expected.y, epsilon = 1e-4);
        }

        // The corner child carries its parent's packed bits verbatim.
        assert_eq!(topo.uv_bits(0, 2), topo.uv_bits(0, 1));
    }

    #[test]
    fn test_stage_functions_compose_into_refine() {
        let cage = cube();
        let mut staged = Subd::new(&cage, 2).unwrap();
        refine_halfedges(&mut staged);
        refine_creases(&mut staged);
        refine_vertex_uvs(&mut staged);
        refine_vertex_points_gather(&mut staged);

        let mut full = Subd::new(&cage, 2).unwrap();
        refine_gather(&mut full);

        for depth in 1..=2 {
            assert_eq!(full.points_at_depth(depth), staged.points_at_depth(depth));
        }
    }
}
