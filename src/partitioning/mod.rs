//! Spatial partitioning of the triangles of a mesh.

pub use self::triangle_rtree::TriangleRTree;

mod triangle_rtree;
