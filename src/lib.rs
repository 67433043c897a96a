/*!
stitch3d
========

**stitch3d** is a library for stitching and intersecting triangulated
surfaces written with the rust programming language. It repairs
tessellations where adjacent patches do not share vertices: boundary
edges of one patch are projected onto a nearby patch, both surfaces are
refined until their borders match, and matching vertices are merged,
possibly creating non-manifold junction edges.

*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![deny(unused_results)]
#![warn(missing_docs)] // TODO: deny this
#![warn(unused_imports)]
#![allow(missing_copy_implementations)]
#![allow(clippy::too_many_arguments)] // Maybe revisit this one later.
#![allow(clippy::module_inception)]
#![allow(clippy::manual_range_contains)] // This usually makes it way more verbose that it could be.

pub extern crate nalgebra as na;

pub mod mesh;
pub mod partitioning;
pub mod stitch;
pub mod utils;

/// Aliases for the mathematical types used throughout this crate.
pub mod math {
    pub use na::{Point3, Vector3};

    /// The scalar type used throughout this crate.
    pub use f64 as Real;

    /// The point type.
    pub type Point = Point3<Real>;

    /// The vector type.
    pub type Vector = Vector3<Real>;
}
