//! Core mesh data structures.
//!
//! The [`Cage`] is the immutable level-0 control mesh: flat arrays of
//! halfedge records, vertex positions, optional uvs, and per-edge
//! creases, all addressed by `i32` ids. Derived subdivision levels use
//! the compact [`QuadHalfedge`] record plus the quad-block arithmetic in
//! [`halfedge`](self::halfedge).
//!
//! Cages come from the [builder](CageBuilder) or from the
//! [binary container](crate::io):
//!
//! ```
//! use quadrille::mesh::build_from_quads;
//! use nalgebra::Point3;
//!
//! let points = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let cage = build_from_quads(&points, &[[0, 1, 2, 3]]).unwrap();
//! assert_eq!(cage.halfedge_count(), 4);
//! ```

mod builder;
mod cage;
mod halfedge;

pub use builder::{build_from_polygons, build_from_quads, build_from_triangles, CageBuilder};
pub use cage::Cage;
pub use halfedge::{quad_face, quad_face_halfedge, quad_next, quad_prev, Crease, Halfedge, QuadHalfedge};
