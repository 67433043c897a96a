//! Half-edge triangle mesh with support for boundaries and non-manifold
//! junction edges.
//!
//! Triangles are stored in an arena and addressed by [`TriangleId`]. A
//! half-edge is a `(triangle, side)` pair: side `k` of a triangle goes from
//! its vertex `k` to its vertex `(k + 1) % 3`, and the opposite vertex
//! `(k + 2) % 3` is called the apex.
//!
//! Every boundary edge is glued to a scaffold triangle whose apex is a
//! reserved vertex living outside of the surface. Scaffolds carry the edge
//! attributes of the hole they border and keep `sym` involutive, so fan
//! walks around a vertex never fall off the surface. Junction edges shared
//! by more than two triangles are not glued pairwise: each incident
//! half-edge gets its own scaffold and the `NONMANIFOLD` attribute.

pub use self::mesh::Mesh;

mod mesh;
mod surgery;

use crate::math::{Point, Vector};
use bitflags::bitflags;
use smallvec::SmallVec;
use thiserror::Error;

/// A handle to a vertex of a [`Mesh`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(pub u32);

/// A handle to a triangle of a [`Mesh`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriangleId(pub u32);

/// An oriented edge of one triangle of a [`Mesh`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HalfEdge {
    /// The triangle this half-edge belongs to.
    pub tri: TriangleId,
    /// The side of the triangle, in `0..3`.
    pub side: u8,
}

impl HalfEdge {
    /// A half-edge from the given side of a triangle.
    pub fn new(tri: TriangleId, side: u8) -> Self {
        debug_assert!(side < 3);
        HalfEdge { tri, side }
    }

    /// The next half-edge of the same triangle, in counterclockwise order.
    pub fn next(self) -> Self {
        HalfEdge::new(self.tri, (self.side + 1) % 3)
    }

    /// The previous half-edge of the same triangle.
    pub fn prev(self) -> Self {
        HalfEdge::new(self.tri, (self.side + 2) % 3)
    }
}

bitflags! {
    /// Attributes of one half-edge.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct EdgeFlags: u8 {
        /// The edge borders a hole of the surface.
        const BOUNDARY = 1;
        /// The edge belongs to a scaffold triangle, outside of the surface.
        const OUTER = 1 << 1;
        /// The edge is shared by more than two triangles.
        const NONMANIFOLD = 1 << 2;
    }
}

/// The set of triangle fans a vertex belongs to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum VertexLink {
    /// The vertex is not part of any triangle.
    #[default]
    Isolated,
    /// The vertex belongs to a single fan; the triangle is one of its members.
    Manifold(TriangleId),
    /// The vertex belongs to several fans, one representative triangle each.
    NonManifold(SmallVec<[TriangleId; 2]>),
}

impl VertexLink {
    /// Is this vertex part of at most one triangle fan?
    pub fn is_manifold(&self) -> bool {
        !matches!(self, VertexLink::NonManifold(_))
    }
}

/// A vertex of a [`Mesh`].
#[derive(Clone, Debug)]
pub struct Vertex {
    pub(crate) pos: Point,
    pub(crate) link: VertexLink,
    /// Cleared once the stitching process pinned this vertex to its final
    /// position.
    pub(crate) mutable: bool,
}

impl Vertex {
    /// The position of this vertex.
    pub fn position(&self) -> &Point {
        &self.pos
    }

    /// The fans this vertex belongs to.
    pub fn link(&self) -> &VertexLink {
        &self.link
    }

    /// Can this vertex still be moved by the stitching process?
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }
}

/// The group id given to triangles that belong to no group.
pub const NO_GROUP: i32 = -1;

/// A triangle of a [`Mesh`].
#[derive(Clone, Debug)]
pub struct Triangle {
    pub(crate) v: [VertexId; 3],
    pub(crate) sym: [Option<HalfEdge>; 3],
    pub(crate) flags: [EdgeFlags; 3],
    pub(crate) group: i32,
}

impl Triangle {
    /// The vertices of this triangle.
    pub fn vertices(&self) -> [VertexId; 3] {
        self.v
    }

    /// The group this triangle belongs to.
    pub fn group(&self) -> i32 {
        self.group
    }

    /// Does this triangle contain the given vertex?
    pub fn contains(&self, v: VertexId) -> bool {
        self.v[0] == v || self.v[1] == v || self.v[2] == v
    }

    /// The side of this triangle whose origin is the given vertex.
    pub fn side_with_origin(&self, v: VertexId) -> Option<u8> {
        (0..3u8).find(|&k| self.v[k as usize] == v)
    }
}

/// Error indicating that a topological operation cannot be applied.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The half-edge has no symmetric half-edge.
    #[error("edge without symmetric counterpart (triangle {0:?})")]
    UnpairedEdge(TriangleId),
    /// The operation would have created a degenerate or inverted triangle.
    #[error("operation would create a degenerate triangle")]
    Degeneracy,
    /// The edge is non-manifold and the operation only supports manifold
    /// configurations.
    #[error("non-manifold edge")]
    NonManifoldEdge,
    /// The mesh still contains non-manifold junction edges.
    #[error("the mesh contains {0} non-manifold edges")]
    NonManifoldInput(usize),
}

/// The (non-normalized) normal of a triangle, with a norm equal to twice the
/// triangle area.
pub fn triangle_normal(p0: &Point, p1: &Point, p2: &Point) -> Vector {
    (p1 - p0).cross(&(p2 - p0))
}
