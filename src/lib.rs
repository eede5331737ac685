//! # Quadrille
//!
//! Parallel Catmull-Clark subdivision over a halfedge cage, with the
//! DeRose et al. semi-sharp crease extension, optional uv interpolation,
//! and a bit-exact binary cage container.
//!
//! Given an arbitrary-polygon control cage and a depth `D`, the engine
//! produces, for every level `1..=D`, the full semi-regular topology
//! (halfedges, edges, creases) and geometry (vertex points, uvs) that
//! result from applying the Catmull-Clark rules that many times. After
//! the first step every face is a quad, so derived levels store four
//! small halfedge records per parent halfedge and recover `next`, `prev`,
//! and `face` by index arithmetic.
//!
//! ## Quick start
//!
//! ```
//! use quadrille::prelude::*;
//! use nalgebra::Point3;
//!
//! // A unit cube cage.
//! let points = [
//!     Point3::new(-0.5, -0.5, -0.5),
//!     Point3::new(0.5, -0.5, -0.5),
//!     Point3::new(0.5, 0.5, -0.5),
//!     Point3::new(-0.5, 0.5, -0.5),
//!     Point3::new(-0.5, -0.5, 0.5),
//!     Point3::new(0.5, -0.5, 0.5),
//!     Point3::new(0.5, 0.5, 0.5),
//!     Point3::new(-0.5, 0.5, 0.5),
//! ];
//! let faces = [
//!     [0, 3, 2, 1],
//!     [4, 5, 6, 7],
//!     [0, 1, 5, 4],
//!     [1, 2, 6, 5],
//!     [2, 3, 7, 6],
//!     [3, 0, 4, 7],
//! ];
//! let cage = build_from_quads(&points, &faces).unwrap();
//!
//! // Two subdivision levels, gather kernels.
//! let mut subd = Subd::new(&cage, 2).unwrap();
//! refine_gather(&mut subd);
//!
//! // The first new face point is the centroid of the first cage face.
//! let face_point = subd.vertex_point(cage.vertex_count(), 1);
//! assert_eq!(face_point, Point3::new(0.0, 0.0, -0.5));
//! ```
//!
//! ## Gather and scatter
//!
//! Every geometry rule comes in two algorithmically dual forms. The
//! gather kernels ([`refine_gather`](subdivide::refine_gather),
//! [`refine_no_creases_gather`](subdivide::refine_no_creases_gather))
//! write each output point from one iteration. The scatter kernels
//! ([`refine_scatter`](subdivide::refine_scatter),
//! [`refine_no_creases_scatter`](subdivide::refine_no_creases_scatter))
//! iterate over halfedges and accumulate contributions with atomic float
//! adds. Both produce the same surface up to float reassociation.
//!
//! ## Crates used
//!
//! - [`nalgebra`] for points and vectors
//! - [`rayon`](https://docs.rs/rayon) for the parallel kernels
//! - [`byteorder`](https://docs.rs/byteorder) for the cage container

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod io;
pub mod mesh;
pub mod subdivide;

/// Prelude module for convenient imports.
///
/// ```
/// use quadrille::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::mesh::{
        build_from_polygons, build_from_quads, build_from_triangles, Cage, CageBuilder, Crease,
        Halfedge, QuadHalfedge,
    };
    pub use crate::subdivide::{
        refine_gather, refine_no_creases_gather, refine_no_creases_scatter, refine_scatter, Subd,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
