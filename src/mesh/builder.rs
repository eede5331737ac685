//! Cage construction from face-vertex lists.
//!
//! The refinement engine consumes a fully linked halfedge cage; this
//! module builds one from the polygon soup that files and applications
//! naturally produce. Twin links come from a directed-edge map, one edge
//! id is assigned per undirected edge, and boundary vertices are anchored
//! to their outgoing boundary halfedge so that the one-ring walks in the
//! vertex rules cover the whole ring before falling off the boundary.
//!
//! # Example
//!
//! ```
//! use quadrille::mesh::CageBuilder;
//! use nalgebra::Point3;
//!
//! let points = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//!
//! let cage = CageBuilder::new(&points)
//!     .quad([0, 1, 2, 3])
//!     .sharp_edge(0, 1, 1.0)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(cage.vertex_count(), 4);
//! assert_eq!(cage.edge_count(), 4);
//! ```

use std::collections::HashMap;

use nalgebra::{Point3, Vector2};

use crate::error::{Error, Result};

use super::cage::Cage;
use super::halfedge::{Crease, Halfedge};

/// Builder for a [`Cage`].
#[derive(Debug, Clone)]
pub struct CageBuilder {
    points: Vec<Point3<f32>>,
    faces: Vec<Vec<usize>>,
    corner_uvs: Vec<Vector2<f32>>,
    sharp_edges: Vec<(usize, usize, f32)>,
}

impl CageBuilder {
    /// Start a cage from vertex positions.
    pub fn new(points: &[Point3<f32>]) -> Self {
        Self {
            points: points.to_vec(),
            faces: Vec::new(),
            corner_uvs: Vec::new(),
            sharp_edges: Vec::new(),
        }
    }

    /// Append a polygonal face (three or more vertex indices, in winding order).
    pub fn polygon(mut self, ring: &[usize]) -> Self {
        self.faces.push(ring.to_vec());
        self
    }

    /// Append a quad face.
    pub fn quad(self, ring: [usize; 4]) -> Self {
        self.polygon(&ring)
    }

    /// Append a triangle face.
    pub fn triangle(self, ring: [usize; 3]) -> Self {
        self.polygon(&ring)
    }

    /// Attach per-corner uvs, one per face corner in declaration order.
    pub fn corner_uvs(mut self, uvs: &[Vector2<f32>]) -> Self {
        self.corner_uvs = uvs.to_vec();
        self
    }

    /// Mark the undirected edge `(v0, v1)` sharp.
    ///
    /// Sharpness 0 is smooth; values at or above 1 keep the edge sharp
    /// through that many subdivision levels.
    pub fn sharp_edge(mut self, v0: usize, v1: usize, sharpness: f32) -> Self {
        self.sharp_edges.push((v0, v1, sharpness));
        self
    }

    /// Link the halfedge cage.
    pub fn build(self) -> Result<Cage> {
        if self.faces.is_empty() {
            return Err(Error::EmptyMesh);
        }

        let corner_count: usize = self.faces.iter().map(Vec::len).sum();
        for (face, ring) in self.faces.iter().enumerate() {
            if ring.len() < 3 {
                return Err(Error::DegenerateFace { face });
            }
            for (i, &vertex) in ring.iter().enumerate() {
                if vertex >= self.points.len() {
                    return Err(Error::InvalidVertexIndex { face, vertex });
                }
                if ring[..i].contains(&vertex) {
                    return Err(Error::DegenerateFace { face });
                }
            }
        }
        if !self.corner_uvs.is_empty() && self.corner_uvs.len() != corner_count {
            return Err(Error::UvCountMismatch {
                uvs: self.corner_uvs.len(),
                corners: corner_count,
            });
        }

        let has_uvs = !self.corner_uvs.is_empty();
        let mut halfedges = Vec::with_capacity(corner_count);
        let mut face_to_halfedge = Vec::with_capacity(self.faces.len());

        // Face rings: contiguous halfedges per face, twins and edges
        // resolved afterwards.
        for (face, ring) in self.faces.iter().enumerate() {
            let base = halfedges.len() as i32;
            let arity = ring.len() as i32;
            face_to_halfedge.push(base);
            for (corner, &vertex) in ring.iter().enumerate() {
                let corner = corner as i32;
                halfedges.push(Halfedge {
                    twin: -1,
                    next: base + (corner + 1).rem_euclid(arity),
                    prev: base + (corner + arity - 1).rem_euclid(arity),
                    face: face as i32,
                    edge: -1,
                    vertex: vertex as i32,
                    uv: if has_uvs { base + corner } else { -1 },
                });
            }
        }

        // Twin linking through a directed-edge map. A repeated directed
        // edge means more than two faces share an edge, or inconsistent
        // winding; either way the cage would not be manifold.
        let mut directed: HashMap<(usize, usize), i32> = HashMap::with_capacity(corner_count);
        for (id, halfedge) in halfedges.iter().enumerate() {
            let from = halfedge.vertex as usize;
            let to = halfedges[halfedge.next as usize].vertex as usize;
            if directed.insert((from, to), id as i32).is_some() {
                return Err(Error::NonManifoldEdge { v0: from, v1: to });
            }
        }
        for id in 0..halfedges.len() {
            let from = halfedges[id].vertex as usize;
            let to = halfedges[halfedges[id].next as usize].vertex as usize;
            if let Some(&twin) = directed.get(&(to, from)) {
                halfedges[id].twin = twin;
            }
        }

        // One edge id per undirected edge; the representative halfedge is
        // the first one that introduced the edge.
        let mut edge_to_halfedge = Vec::new();
        for id in 0..halfedges.len() {
            if halfedges[id].edge >= 0 {
                continue;
            }
            let edge = edge_to_halfedge.len() as i32;
            edge_to_halfedge.push(id as i32);
            halfedges[id].edge = edge;
            let twin = halfedges[id].twin;
            if twin >= 0 {
                halfedges[twin as usize].edge = edge;
            }
        }

        // Vertex anchors, boundary halfedges taking precedence.
        let mut vertex_to_halfedge = vec![-1; self.points.len()];
        for (id, halfedge) in halfedges.iter().enumerate() {
            let vertex = halfedge.vertex as usize;
            if vertex_to_halfedge[vertex] < 0 {
                vertex_to_halfedge[vertex] = id as i32;
            }
        }
        for (id, halfedge) in halfedges.iter().enumerate() {
            if halfedge.twin < 0 {
                vertex_to_halfedge[halfedge.vertex as usize] = id as i32;
            }
        }

        let mut creases: Vec<Crease> = (0..edge_to_halfedge.len())
            .map(|edge| Crease::smooth(edge as i32))
            .collect();
        for &(v0, v1, sharpness) in &self.sharp_edges {
            let halfedge = directed
                .get(&(v0, v1))
                .or_else(|| directed.get(&(v1, v0)))
                .copied()
                .ok_or(Error::UnknownEdge { v0, v1 })?;
            creases[halfedges[halfedge as usize].edge as usize].sharpness = sharpness;
        }

        let mut cage = Cage {
            vertex_to_halfedge,
            edge_to_halfedge,
            face_to_halfedge,
            vertex_points: self.points,
            uvs: self.corner_uvs,
            creases,
            halfedges,
        };
        link_crease_chains(&mut cage);

        Ok(cage)
    }
}

/// Chain creases through vertices where exactly two sharp edges meet.
///
/// A chained crease averages sharpness with its neighbors when it is
/// subdivided, which keeps sharpness uniform along a feature curve. At
/// vertices with one or three-plus sharp edges the chain stops and the
/// crease keeps its self link on that side.
fn link_crease_chains(cage: &mut Cage) {
    let mut incident_sharp: Vec<Vec<i32>> = vec![Vec::new(); cage.vertex_count() as usize];
    for edge in 0..cage.edge_count() {
        if cage.sharpness(edge) <= 0.0 {
            continue;
        }
        let halfedge = cage.edge_to_halfedge(edge);
        let tail = cage.vertex(halfedge) as usize;
        let head = cage.vertex(cage.next(halfedge)) as usize;
        incident_sharp[tail].push(edge);
        incident_sharp[head].push(edge);
    }

    for (vertex, edges) in incident_sharp.iter().enumerate() {
        let (a, b) = match edges.as_slice() {
            &[a, b] => (a, b),
            _ => continue,
        };
        for (edge, other) in [(a, b), (b, a)] {
            let halfedge = cage.edge_to_halfedge(edge);
            let head = cage.vertex(cage.next(halfedge));
            if head as usize == vertex {
                cage.creases[edge as usize].next = other;
            } else {
                cage.creases[edge as usize].prev = other;
            }
        }
    }
}

/// Build a cage from vertex positions and polygonal faces.
pub fn build_from_polygons(points: &[Point3<f32>], faces: &[Vec<usize>]) -> Result<Cage> {
    let mut builder = CageBuilder::new(points);
    for ring in faces {
        builder = builder.polygon(ring);
    }
    builder.build()
}

/// Build a cage from vertex positions and quad faces.
pub fn build_from_quads(points: &[Point3<f32>], faces: &[[usize; 4]]) -> Result<Cage> {
    let mut builder = CageBuilder::new(points);
    for &ring in faces {
        builder = builder.quad(ring);
    }
    builder.build()
}

/// Build a cage from vertex positions and triangle faces.
pub fn build_from_triangles(points: &[Point3<f32>], faces: &[[usize; 3]]) -> Result<Cage> {
    let mut builder = CageBuilder::new(points);
    for &ring in faces {
        builder = builder.triangle(ring);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_points() -> Vec<Point3<f32>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    fn cube() -> Cage {
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
    fn test_cube_connectivity() {
        let cage = cube();
        assert_eq!(cage.halfedge_count(), 24);
        assert_eq!(cage.edge_count(), 12);

        for h in 0..cage.halfedge_count() {
            // Closed mesh: every twin reciprocates and shares the edge.
            let twin = cage.twin(h);
            assert!(twin >= 0);
            assert_eq!(cage.twin(twin), h);
            assert_eq!(cage.edge(twin), cage.edge(h));
            // Face rings close.
            assert_eq!(cage.next(cage.prev(h)), h);
            assert_eq!(cage.prev(cage.next(h)), h);
        }
        for e in 0..cage.edge_count() {
            assert_eq!(cage.edge(cage.edge_to_halfedge(e)), e);
        }
        for v in 0..cage.vertex_count() {
            assert_eq!(cage.vertex(cage.vertex_to_halfedge(v)), v);
        }
    }

    #[test]
    fn test_single_quad_boundary() {
        let cage = build_from_quads(&square_points(), &[[0, 1, 2, 3]]).unwrap();
        assert_eq!(cage.halfedge_count(), 4);
        assert_eq!(cage.edge_count(), 4);

        for h in 0..4 {
            assert_eq!(cage.twin(h), -1);
        }
        // Boundary vertices anchor to their outgoing boundary halfedge.
        for v in 0..4 {
            let anchor = cage.vertex_to_halfedge(v);
            assert_eq!(cage.vertex(anchor), v);
            assert!(cage.twin(anchor) < 0);
        }
    }

    #[test]
    fn test_triangles_share_edge() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
        ];
        let cage = build_from_triangles(&points, &[[0, 1, 2], [1, 0, 3]]).unwrap();

        assert_eq!(cage.halfedge_count(), 6);
        assert_eq!(cage.edge_count(), 5);

        // Exactly one interior edge.
        let interior = (0..cage.halfedge_count())
            .filter(|&h| cage.twin(h) >= 0)
            .count();
        assert_eq!(interior, 2);
    }

    #[test]
    fn test_rejects_bad_input() {
        let points = square_points();

        assert!(matches!(
            CageBuilder::new(&points).build(),
            Err(Error::EmptyMesh)
        ));
        assert!(matches!(
            build_from_quads(&points, &[[0, 1, 2, 9]]),
            Err(Error::InvalidVertexIndex { face: 0, vertex: 9 })
        ));
        assert!(matches!(
            build_from_quads(&points, &[[0, 1, 1, 2]]),
            Err(Error::DegenerateFace { face: 0 })
        ));
        // Same directed edge twice: inconsistent winding.
        assert!(matches!(
            build_from_triangles(&points, &[[0, 1, 2], [0, 1, 3]]),
            Err(Error::NonManifoldEdge { .. })
        ));
        assert!(matches!(
            CageBuilder::new(&points)
                .quad([0, 1, 2, 3])
                .sharp_edge(0, 2, 1.0)
                .build(),
            Err(Error::UnknownEdge { v0: 0, v1: 2 })
        ));
    }

    #[test]
    fn test_crease_chain_links_through_shared_vertex() {
        // Two quads side by side; the bottom edges (0,1) and (1,4) form a
        // feature curve through vertex 1.
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        let cage = CageBuilder::new(&points)
            .quad([0, 1, 2, 3])
            .quad([1, 4, 5, 2])
            .sharp_edge(0, 1, 2.0)
            .sharp_edge(1, 4, 2.0)
            .build()
            .unwrap();

        let e01 = cage.edge(0);
        let h14 = 4; // first halfedge of the second quad
        let e14 = cage.edge(h14);
        assert_eq!(cage.sharpness(e01), 2.0);
        assert_eq!(cage.sharpness(e14), 2.0);

        // (0,1) runs into (1,4) head-to-tail: chained both ways.
        assert_eq!(cage.crease_next(e01), e14);
        assert_eq!(cage.crease_prev(e14), e01);
        // The far ends stay self-linked.
        assert_eq!(cage.crease_prev(e01), e01);
        assert_eq!(cage.crease_next(e14), e14);
    }

    #[test]
    fn test_corner_uv_count_must_match() {
        let uvs = [Vector2::new(0.0, 0.0); 3];
        assert!(matches!(
            CageBuilder::new(&square_points())
                .quad([0, 1, 2, 3])
                .corner_uvs(&uvs)
                .build(),
            Err(Error::UvCountMismatch { uvs: 3, corners: 4 })
        ));
    }
}
