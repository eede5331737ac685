//! Halfedge, crease, and quad-block index arithmetic.
//!
//! Two halfedge records exist because the mesh hierarchy has two regimes:
//!
//! - The **cage** (level 0) allows faces of arbitrary arity, so every
//!   halfedge stores its full connectivity: twin, next, prev, face, edge,
//!   vertex, and uv.
//! - Every **derived level** (level >= 1) consists purely of quads laid
//!   out four halfedges per face, so `next`, `prev`, and `face` collapse
//!   into index arithmetic and the record shrinks to twin, edge, vertex,
//!   and uv.
//!
//! All identifiers are `i32`; a negative value means "absent" (a boundary
//! twin, an unlinked crease neighbor). The quad arithmetic below is
//! written with bitwise operations so that negative identifiers stay
//! negative, which is what lets the refinement kernels run the same
//! child-wiring formulas on boundary halfedges without branching.

/// A halfedge of the cage mesh (level 0).
///
/// Faces of the cage may have any number of sides; `next` and `prev`
/// traverse the face ring explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halfedge {
    /// Opposite halfedge on the same edge, or -1 on a boundary.
    pub twin: i32,
    /// Next halfedge in the face ring.
    pub next: i32,
    /// Previous halfedge in the face ring.
    pub prev: i32,
    /// Incident face.
    pub face: i32,
    /// Undirected edge this halfedge lies on.
    pub edge: i32,
    /// Origin vertex.
    pub vertex: i32,
    /// Index into the cage uv array, or -1 when the cage carries no uvs.
    pub uv: i32,
}

/// A halfedge of a derived subdivision level (level >= 1).
///
/// `next`, `prev`, and `face` are implied by the halfedge's own index:
/// see [`quad_next`], [`quad_prev`], and [`quad_face`]. The `uv` field
/// holds a packed uv pair (see the uv refinement module), not an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuadHalfedge {
    /// Opposite halfedge on the same edge, or negative on a boundary.
    pub twin: i32,
    /// Undirected edge this halfedge lies on.
    pub edge: i32,
    /// Origin vertex.
    pub vertex: i32,
    /// Packed uv pair (16-bit normalized u in the low half, v in the high half).
    pub uv: i32,
}

/// Per-edge crease state.
///
/// Sharp edges form doubly-linked chains along feature curves; the
/// subdivision rule averages sharpness along the chain. An edge that is
/// not part of a chain links to itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crease {
    /// Next edge along the sharpness chain.
    pub next: i32,
    /// Previous edge along the sharpness chain.
    pub prev: i32,
    /// Sharpness; 0 is smooth, values >= 1 stay sharp for that many levels.
    pub sharpness: f32,
}

impl Crease {
    /// A smooth, self-linked crease for the given edge.
    pub fn smooth(edge: i32) -> Self {
        Self {
            next: edge,
            prev: edge,
            sharpness: 0.0,
        }
    }
}

/// Next halfedge within a quad face block.
///
/// Quads occupy four consecutive slots `[4f, 4f + 4)`; rotating forward
/// wraps within the block. Negative inputs produce negative outputs.
#[inline]
pub fn quad_next(halfedge: i32) -> i32 {
    (halfedge & !3) | ((halfedge + 1) & 3)
}

/// Previous halfedge within a quad face block.
#[inline]
pub fn quad_prev(halfedge: i32) -> i32 {
    (halfedge & !3) | ((halfedge + 3) & 3)
}

/// Face of a halfedge at a derived level.
#[inline]
pub fn quad_face(halfedge: i32) -> i32 {
    halfedge >> 2
}

/// First halfedge of a quad face at a derived level.
#[inline]
pub fn quad_face_halfedge(face: i32) -> i32 {
    face << 2
}
