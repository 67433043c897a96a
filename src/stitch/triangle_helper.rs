use crate::math::{Point, Real, Vector};
use crate::mesh::{HalfEdge, Mesh, TriangleId};

/// Per-triangle geometric data cached for repeated projections and splits.
///
/// The barycentric basis is (`V0V2`, `V0V1`): `u` grows toward `V2` and `v`
/// toward `V1`, so `u = 0`, `v = 0` and `u + v = 1` are the lines supporting
/// the three triangle edges.
#[derive(Clone)]
pub struct TriangleHelper {
    tri: TriangleId,
    points: [Point; 3],
    /// The edge vectors `V1 - V0`, `V2 - V1` and `V0 - V2`.
    pub edges: [Vector; 3],
    /// The squared norms of `edges`.
    pub edges_norm: [Real; 3],
    /// The non-normalized normal `edges[0] x edges[1]`.
    pub normal: Vector,
    /// The squared norm of `normal`.
    pub sqr_normal: Real,
}

impl TriangleHelper {
    pub fn new(mesh: &Mesh, tri: TriangleId) -> Self {
        let v = mesh.triangle(tri).vertices();
        let points = [mesh.point(v[0]), mesh.point(v[1]), mesh.point(v[2])];
        let edges = [
            points[1] - points[0],
            points[2] - points[1],
            points[0] - points[2],
        ];
        let normal = edges[0].cross(&edges[1]);
        let sqr_normal = normal.norm_squared();
        debug_assert!(sqr_normal > 0.0, "degenerate triangle {tri:?}");
        TriangleHelper {
            tri,
            points,
            edges,
            edges_norm: [
                edges[0].norm_squared(),
                edges[1].norm_squared(),
                edges[2].norm_squared(),
            ],
            normal,
            sqr_normal,
        }
    }

    pub fn triangle(&self) -> TriangleId {
        self.tri
    }

    /// The cached position of the i-th triangle vertex.
    pub fn point(&self, i: usize) -> &Point {
        &self.points[i]
    }

    /// The half-edge supported by the line of the i-th edge vector.
    pub fn half_edge(&self, i: u8) -> HalfEdge {
        HalfEdge::new(self.tri, i)
    }

    /// Solves the 2x2 normal-equation system giving the coordinates of `p`
    /// in the (`V0V2`, `V0V1`) basis.
    pub fn barycentric_coords(&self, p: &Point) -> [Real; 2] {
        let v0 = self.edges[2]; // -(V2 - V0)
        let v1 = self.edges[0]; // V1 - V0
        let tmp = p - self.points[0];
        let dot00 = self.edges_norm[2];
        let dot01 = -v0.dot(&v1);
        let dot02 = -v0.dot(&tmp);
        let dot11 = self.edges_norm[0];
        let dot12 = v1.dot(&tmp);
        let inv_denom = 1.0 / (dot00 * dot11 - dot01 * dot01);
        [
            (dot11 * dot02 - dot01 * dot12) * inv_denom,
            (dot00 * dot12 - dot01 * dot02) * inv_denom,
        ]
    }

    /// The point of barycentric coordinates `(u, v)`.
    pub fn location(&self, u: Real, v: Real) -> Point {
        self.points[0] - u * self.edges[2] + v * self.edges[0]
    }
}

/// The squared distance between `p` and the line supporting `(p1, p2)`.
///
/// Assumes the projection of `p` falls between `p1` and `p2`.
pub fn sqr_distance_to_segment(p1: &Point, p2: &Point, p: &Point) -> Real {
    let edge1 = p - p1;
    let edge2 = p2 - p1;
    edge1.cross(&edge2).norm_squared() / edge2.norm_squared()
}

/// Debugging check that `p` lies on the `(s1, s2)` segment.
pub fn is_on_edge(p: &Point, s1: &Point, s2: &Point, sqr_tol: Real) -> bool {
    if na::distance_squared(p, s1) < sqr_tol || na::distance_squared(p, s2) < sqr_tol {
        return true;
    }
    let vector1 = s2 - s1;
    let vector2 = p - s1;
    let edge_norm = vector1.norm_squared();
    let sqr_dist = vector1.cross(&vector2).norm_squared() / edge_norm;
    if sqr_dist < sqr_tol {
        let dot = vector2.dot(&vector1) / edge_norm;
        if (0.0..=1.0).contains(&dot) {
            return true;
        }
    }
    log::debug!("{p:?} is not on {s1:?}-{s2:?}");
    false
}

/// Given `b` the projection of `c` on a triangle and a point `e` of that
/// triangle close to the projection of the `(d, c)` segment, reconstructs the
/// point of the `(d, c)` line whose projection is `e`.
///
/// The two lines, `(d, c)` and the line through `e` directed along `c - b`,
/// are intersected in the 2D coordinate plane where the system is best
/// conditioned. Returns the reconstructed point and the squared residual
/// distance along the dropped axis; the residual is infinite when the lines
/// are nearly parallel.
pub fn reverse_project(b: &Point, c: &Point, d: &Point, e: &Point) -> (Point, Real) {
    let dir1 = c - d;
    let dir2 = c - b;
    let mut best_axis = 0;
    let mut best_det: Real = 0.0;
    for axis in 0..3 {
        let (i, j) = ((axis + 1) % 3, (axis + 2) % 3);
        let det = dir2[i] * dir1[j] - dir2[j] * dir1[i];
        if det.abs() > best_det.abs() {
            best_det = det;
            best_axis = axis;
        }
    }
    if best_det.abs() < 1.0e-12 {
        return (*d, Real::INFINITY);
    }
    let (i, j) = ((best_axis + 1) % 3, (best_axis + 2) % 3);
    // Cramer on  t * dir1 - s * dir2 = e - d  restricted to the (i, j) plane.
    let rhs = (e[i] - d[i], e[j] - d[j]);
    let t = (rhs.1 * dir2[i] - rhs.0 * dir2[j]) / best_det;
    let s = (rhs.1 * dir1[i] - rhs.0 * dir1[j]) / best_det;
    let f = d + t * dir1;
    let g = e + s * dir2;
    let residual = f[best_axis] - g[best_axis];
    (f, residual * residual)
}
