//! Error types for quadrille.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by cage construction, hierarchy creation, and
/// container I/O. Refinement itself cannot fail.
#[derive(Error, Debug)]
pub enum Error {
    /// The cage has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has fewer than three sides or repeats a vertex.
    #[error("face {face} is degenerate")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// An edge is shared by more than two faces, or winding is inconsistent.
    #[error("edge ({v0}, {v1}) is non-manifold")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// A sharp edge was requested between vertices no face connects.
    #[error("no edge between vertices {v0} and {v1}")]
    UnknownEdge {
        /// First vertex of the requested edge.
        v0: usize,
        /// Second vertex of the requested edge.
        v1: usize,
    },

    /// The per-corner uv list does not match the face corner count.
    #[error("uv count {uvs} does not match face corner count {corners}")]
    UvCountMismatch {
        /// Number of uvs provided.
        uvs: usize,
        /// Number of face corners in the cage.
        corners: usize,
    },

    /// The subdivision hierarchy needs at least one level.
    #[error("subdivision depth must be at least 1, got {0}")]
    InvalidDepth(i32),

    /// The file is not a `cc_Mesh1` container.
    #[error("{}: not a cc_Mesh1 file", .path.display())]
    Format {
        /// The offending file.
        path: PathBuf,
    },

    /// File I/O error, including short reads and writes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
