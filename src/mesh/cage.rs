//! The control cage: the immutable level-0 mesh.
//!
//! The cage is a flat-array halfedge mesh with arbitrary-arity faces,
//! per-vertex positions, optional per-corner uvs, and one crease record
//! per edge. It is built once (see the [builder](crate::mesh::builder)
//! or the [container loader](crate::io)) and never mutated afterwards;
//! the subdivision hierarchy borrows it for its whole lifetime.
//!
//! Besides plain element access, the cage answers the count questions the
//! hierarchy is sized from: how many vertices, faces, edges, and
//! halfedges exist after `d` applications of the Catmull-Clark rule.

use nalgebra::{Point3, Vector2};

use super::halfedge::{Crease, Halfedge};

/// The immutable level-0 control mesh.
///
/// All connectivity lives in flat arrays of `i32` indices; negative
/// values mean "absent". See [`Halfedge`] for the record layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Cage {
    pub(crate) vertex_to_halfedge: Vec<i32>,
    pub(crate) edge_to_halfedge: Vec<i32>,
    pub(crate) face_to_halfedge: Vec<i32>,
    pub(crate) vertex_points: Vec<Point3<f32>>,
    pub(crate) uvs: Vec<Vector2<f32>>,
    pub(crate) creases: Vec<Crease>,
    pub(crate) halfedges: Vec<Halfedge>,
}

impl Cage {
    // ==================== Counts ====================

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> i32 {
        self.vertex_points.len() as i32
    }

    /// Number of uvs; 0 when the cage carries no uv channel.
    #[inline]
    pub fn uv_count(&self) -> i32 {
        self.uvs.len() as i32
    }

    /// Number of halfedges.
    #[inline]
    pub fn halfedge_count(&self) -> i32 {
        self.halfedges.len() as i32
    }

    /// Number of undirected edges.
    #[inline]
    pub fn edge_count(&self) -> i32 {
        self.edge_to_halfedge.len() as i32
    }

    /// Number of faces.
    #[inline]
    pub fn face_count(&self) -> i32 {
        self.face_to_halfedge.len() as i32
    }

    /// Number of creases; always equal to the edge count.
    #[inline]
    pub fn crease_count(&self) -> i32 {
        self.creases.len() as i32
    }

    // ==================== Counts after subdivision ====================
    //
    // Each refinement step turns every halfedge into four, every face
    // into one quad per ring corner, splits every edge in two and adds
    // one interior edge per halfedge, and adds one vertex per old face
    // and per old edge.

    /// Halfedge count after `depth` subdivision steps.
    #[inline]
    pub fn halfedge_count_at_depth(&self, depth: i32) -> i32 {
        self.halfedge_count() << (2 * depth)
    }

    /// Face count after `depth` subdivision steps.
    ///
    /// The first step emits one quad per cage halfedge; every step after
    /// that quadruples the face count.
    #[inline]
    pub fn face_count_at_depth(&self, depth: i32) -> i32 {
        if depth == 0 {
            self.face_count()
        } else {
            self.halfedge_count() << (2 * (depth - 1))
        }
    }

    /// Edge count after `depth` subdivision steps.
    pub fn edge_count_at_depth(&self, depth: i32) -> i32 {
        let mut edges = self.edge_count();
        let mut halfedges = self.halfedge_count();
        for _ in 0..depth {
            edges = 2 * edges + halfedges;
            halfedges *= 4;
        }
        edges
    }

    /// Vertex count after `depth` subdivision steps.
    pub fn vertex_count_at_depth(&self, depth: i32) -> i32 {
        let mut vertices = self.vertex_count();
        let mut faces = self.face_count();
        let mut edges = self.edge_count();
        let mut halfedges = self.halfedge_count();
        for _ in 0..depth {
            vertices += faces + edges;
            faces = halfedges;
            edges = 2 * edges + halfedges;
            halfedges *= 4;
        }
        vertices
    }

    /// Crease count after `depth` subdivision steps.
    #[inline]
    pub fn crease_count_at_depth(&self, depth: i32) -> i32 {
        self.edge_count_at_depth(depth)
    }

    // ==================== Element maps ====================

    /// Some halfedge leaving `vertex`.
    ///
    /// For boundary vertices this is the outgoing halfedge that lies on
    /// the boundary itself (`twin < 0`), which is what lets the one-ring
    /// walks in the vertex rules cover the whole ring before falling off.
    #[inline]
    pub fn vertex_to_halfedge(&self, vertex: i32) -> i32 {
        self.vertex_to_halfedge[vertex as usize]
    }

    /// The representative halfedge of `edge`.
    #[inline]
    pub fn edge_to_halfedge(&self, edge: i32) -> i32 {
        self.edge_to_halfedge[edge as usize]
    }

    /// The first halfedge of `face`'s ring.
    #[inline]
    pub fn face_to_halfedge(&self, face: i32) -> i32 {
        self.face_to_halfedge[face as usize]
    }

    // ==================== Halfedge fields ====================

    /// The full halfedge record.
    #[inline]
    pub fn halfedge(&self, halfedge: i32) -> &Halfedge {
        &self.halfedges[halfedge as usize]
    }

    /// Opposite halfedge, or -1 on a boundary.
    #[inline]
    pub fn twin(&self, halfedge: i32) -> i32 {
        self.halfedge(halfedge).twin
    }

    /// Next halfedge in the face ring.
    #[inline]
    pub fn next(&self, halfedge: i32) -> i32 {
        self.halfedge(halfedge).next
    }

    /// Previous halfedge in the face ring.
    #[inline]
    pub fn prev(&self, halfedge: i32) -> i32 {
        self.halfedge(halfedge).prev
    }

    /// Incident face.
    #[inline]
    pub fn face(&self, halfedge: i32) -> i32 {
        self.halfedge(halfedge).face
    }

    /// Undirected edge of a halfedge.
    #[inline]
    pub fn edge(&self, halfedge: i32) -> i32 {
        self.halfedge(halfedge).edge
    }

    /// Origin vertex of a halfedge.
    #[inline]
    pub fn vertex(&self, halfedge: i32) -> i32 {
        self.halfedge(halfedge).vertex
    }

    /// Rotate around the origin vertex, against face winding.
    ///
    /// Returns -1 once the rotation falls off a boundary.
    #[inline]
    pub fn prev_vertex_halfedge(&self, halfedge: i32) -> i32 {
        self.twin(self.prev(halfedge))
    }

    /// Rotate around the origin vertex, along face winding.
    ///
    /// Returns -1 once the rotation falls off a boundary.
    #[inline]
    pub fn next_vertex_halfedge(&self, halfedge: i32) -> i32 {
        let twin = self.twin(halfedge);
        if twin >= 0 {
            self.next(twin)
        } else {
            -1
        }
    }

    // ==================== Geometry and attributes ====================

    /// Position of a vertex.
    #[inline]
    pub fn point(&self, vertex: i32) -> Point3<f32> {
        self.vertex_points[vertex as usize]
    }

    /// Position of a halfedge's origin vertex.
    #[inline]
    pub fn halfedge_point(&self, halfedge: i32) -> Point3<f32> {
        self.point(self.vertex(halfedge))
    }

    /// Uv attached to a halfedge corner.
    ///
    /// Only meaningful when [`uv_count`](Self::uv_count) is nonzero.
    #[inline]
    pub fn halfedge_uv(&self, halfedge: i32) -> Vector2<f32> {
        self.uvs[self.halfedge(halfedge).uv as usize]
    }

    /// The crease record of an edge.
    #[inline]
    pub fn crease(&self, edge: i32) -> &Crease {
        &self.creases[edge as usize]
    }

    /// Next edge along the sharpness chain.
    #[inline]
    pub fn crease_next(&self, edge: i32) -> i32 {
        self.crease(edge).next
    }

    /// Previous edge along the sharpness chain.
    #[inline]
    pub fn crease_prev(&self, edge: i32) -> i32 {
        self.crease(edge).prev
    }

    /// Sharpness of an edge.
    #[inline]
    pub fn sharpness(&self, edge: i32) -> f32 {
        self.crease(edge).sharpness
    }

    /// Sharpness of the edge a halfedge lies on.
    #[inline]
    pub fn halfedge_sharpness(&self, halfedge: i32) -> f32 {
        self.sharpness(self.edge(halfedge))
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Point3;

    use crate::mesh::{build_from_quads, Cage};

    fn unit_cube() -> Cage {
        let points = vec![
            Point3::new(-0.5, -0.5, -0.5),
            Point3::new(0.5, -0.5, -0.5),
            Point3::new(0.5, 0.5, -0.5),
            Point3::new(-0.5, 0.5, -0.5),
            Point3::new(-0.5, -0.5, 0.5),
            Point3::new(0.5, -0.5, 0.5),
            Point3::new(0.5, 0.5, 0.5),
            Point3::new(-0.5, 0.5, 0.5),
        ];
        let faces = vec![
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ];
        build_from_quads(&points, &faces).unwrap()
    }

    #[test]
    fn test_cube_counts_at_depth() {
        let cage = unit_cube();

        assert_eq!(cage.vertex_count(), 8);
        assert_eq!(cage.face_count(), 6);
        assert_eq!(cage.edge_count(), 12);
        assert_eq!(cage.halfedge_count(), 24);

        // One step: a vertex per old face and edge, a quad per halfedge,
        // split edges plus one interior edge per halfedge.
        assert_eq!(cage.vertex_count_at_depth(1), 8 + 6 + 12);
        assert_eq!(cage.face_count_at_depth(1), 24);
        assert_eq!(cage.edge_count_at_depth(1), 2 * 12 + 24);
        assert_eq!(cage.halfedge_count_at_depth(1), 96);

        // Two steps.
        assert_eq!(cage.vertex_count_at_depth(2), 26 + 24 + 48);
        assert_eq!(cage.face_count_at_depth(2), 96);
        assert_eq!(cage.edge_count_at_depth(2), 2 * 48 + 96);
        assert_eq!(cage.halfedge_count_at_depth(2), 384);

        assert_eq!(cage.crease_count_at_depth(2), cage.edge_count_at_depth(2));
    }

    #[test]
    fn test_vertex_rotation_covers_ring() {
        let cage = unit_cube();

        // Every cube vertex has valence 3; rotating three times returns
        // to the starting halfedge.
        for vertex in 0..cage.vertex_count() {
            let start = cage.vertex_to_halfedge(vertex);
            let mut halfedge = start;
            for _ in 0..3 {
                assert_eq!(cage.vertex(halfedge), vertex);
                halfedge = cage.prev_vertex_halfedge(halfedge);
            }
            assert_eq!(halfedge, start);
        }
    }
}
