//! Stitching of triangulated surfaces.
//!
//! The entry point is [`NonManifoldStitch`]: borders of one group of
//! triangles are projected onto another group, both surfaces are refined
//! until their borders match, and matching vertices are merged. Groups can
//! also be cut along their intersection curves with
//! [`NonManifoldStitch::intersect`].
//!
//! The lower-level pieces are exposed as well: [`EdgeProjector`] drives the
//! projection of a set of edges, [`TriangleProjector`] classifies one point
//! against one triangle, [`TriangleSplitter`] computes segment/triangle
//! crossings, [`VertexMerger`] merges and unmerges vertices, and
//! [`VertexSwapper`] restores triangle quality after splits.

pub use self::edge_projector::EdgeProjector;
pub use self::intersection::{triangle_triangle_intersection, Intersection};
pub use self::non_manifold_stitch::{NonManifoldSplitter, NonManifoldStitch};
pub use self::projector::{ProjectionKind, TriangleProjector};
pub use self::splitter::TriangleSplitter;
pub use self::swapper::{EdgeQuality, VertexSwapper};
pub use self::triangle_helper::{
    is_on_edge, reverse_project, sqr_distance_to_segment, TriangleHelper,
};
pub use self::vertex_merger::VertexMerger;

mod edge_projector;
mod intersection;
mod non_manifold_stitch;
mod projector;
mod splitter;
mod swapper;
pub(crate) mod triangle_helper;
mod vertex_merger;
