use super::triangle_helper::TriangleHelper;
use crate::math::{Point, Real};
use crate::mesh::{HalfEdge, Mesh, VertexId};

/// Intersects a segment with the edges of one triangle, in the triangle's
/// own barycentric plane.
///
/// The outcome is exclusive: either an edge to split together with the split
/// point, or an existing triangle vertex when the crossing lands within
/// `sqr_tol` of it, or nothing.
#[derive(Default)]
pub struct TriangleSplitter {
    to_split: Option<HalfEdge>,
    vertex: Option<VertexId>,
    split_point: Point,
}

impl TriangleSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The triangle vertex the crossing snapped to, if any.
    pub fn split_vertex(&self) -> Option<VertexId> {
        self.vertex
    }

    /// The triangle half-edge crossed by the segment, if any.
    pub fn splitted_edge(&self) -> Option<HalfEdge> {
        self.to_split
    }

    /// The crossing point, meaningful when [`Self::splitted_edge`] is set.
    pub fn split_point(&self) -> &Point {
        &self.split_point
    }

    fn is_vertex(&mut self, mesh: &Mesh, helper: &TriangleHelper, u: Real, v: Real, sqr_tol: Real) -> bool {
        self.split_point = helper.location(u, v);
        let e = self.to_split.unwrap();
        let origin = mesh.origin(e);
        let destination = mesh.destination(e);
        if na::distance_squared(&self.split_point, &mesh.point(origin)) < sqr_tol {
            self.vertex = Some(origin);
            self.to_split = None;
            true
        } else if na::distance_squared(&self.split_point, &mesh.point(destination)) < sqr_tol {
            self.vertex = Some(destination);
            self.to_split = None;
            true
        } else {
            self.vertex = None;
            false
        }
    }

    /// Intersects an edge of the triangle with the `(p1, p2)` segment.
    ///
    /// The crossing is searched against the three canonical barycentric
    /// lines `u = 0`, `v = 0` and `u + v = 1`, which support the triangle
    /// sides `V0V1`, `V2V0` and `V1V2` respectively.
    pub fn split(
        &mut self,
        mesh: &Mesh,
        helper: &TriangleHelper,
        p1: &Point,
        p2: &Point,
        sqr_tol: Real,
    ) {
        self.to_split = None;
        self.vertex = None;
        let uv_o = helper.barycentric_coords(p1);
        let uv_d = helper.barycentric_coords(p2);
        let delta_u = uv_d[0] - uv_o[0];
        let delta_v = uv_d[1] - uv_o[1];
        if uv_o[0] < 0.0 && uv_d[0] > 0.0 {
            // Crossing of the u = 0 line.
            let v = uv_o[1] - uv_o[0] / delta_u * delta_v;
            self.to_split = Some(helper.half_edge(0));
            if !self.is_vertex(mesh, helper, 0.0, v, sqr_tol) && !(0.0..=1.0).contains(&v) {
                self.to_split = None;
            }
        } else if uv_o[1] < 0.0 && uv_d[1] > 0.0 {
            // Crossing of the v = 0 line.
            let u = uv_o[0] - uv_o[1] / delta_v * delta_u;
            self.to_split = Some(helper.half_edge(2));
            if !self.is_vertex(mesh, helper, u, 0.0, sqr_tol) && !(0.0..=1.0).contains(&u) {
                self.to_split = None;
            }
        } else {
            // Crossing of the u + v = 1 line.
            let tt = (1.0 - uv_o[0] - uv_o[1]) / (delta_u + delta_v);
            if tt > 0.0 && tt < 1.0 {
                self.to_split = Some(helper.half_edge(1));
                let u = uv_o[0] + tt * delta_u;
                let v = uv_o[1] + tt * delta_v;
                debug_assert!((u + v - 1.0).abs() < 1.0e-4);
                if !self.is_vertex(mesh, helper, u, v, sqr_tol) && !(v > 0.0 && u > 0.0) {
                    self.to_split = None;
                }
            }
        }
        debug_assert!(!(self.to_split.is_some() && self.vertex.is_some()));
    }

    /// Intersects an edge of the triangle with the `(apex, p)` segment,
    /// where `apex` is one of the triangle's own vertices.
    pub fn split_apex(
        &mut self,
        mesh: &Mesh,
        helper: &TriangleHelper,
        apex: VertexId,
        p: &Point,
        sqr_tol: Real,
    ) {
        let vertices = mesh.triangle(helper.triangle()).vertices();
        debug_assert!((0..3).all(|i| na::distance_squared(helper.point(i), p) > 1.0e-24));
        let uv = helper.barycentric_coords(p);
        self.to_split = None;
        self.vertex = None;
        if apex == vertices[2] {
            if uv[0] > 1.0 {
                return;
            }
            // The segment leaves V2 and may cross the u = 0 line.
            self.to_split = Some(helper.half_edge(0));
            let v = uv[1] / (1.0 - uv[0]);
            if !self.is_vertex(mesh, helper, 0.0, v, sqr_tol) && !(0.0..=1.0).contains(&v) {
                self.to_split = None;
            }
        } else if apex == vertices[1] {
            if uv[1] > 1.0 {
                return;
            }
            // The segment leaves V1 and may cross the v = 0 line.
            self.to_split = Some(helper.half_edge(2));
            let u = uv[0] / (1.0 - uv[1]);
            if !self.is_vertex(mesh, helper, u, 0.0, sqr_tol) && !(0.0..=1.0).contains(&u) {
                self.to_split = None;
            }
        } else if apex == vertices[0] {
            if uv[0] + uv[1] < 0.0 {
                return;
            }
            // The segment leaves V0 and may cross the u + v = 1 line.
            self.to_split = Some(helper.half_edge(1));
            let tt = uv[0] + uv[1];
            let u = uv[0] / tt;
            let v = uv[1] / tt;
            if !self.is_vertex(mesh, helper, u, v, sqr_tol)
                && (u < 0.0 || v < 0.0 || uv[0] < 0.0 || uv[1] < 0.0)
            {
                self.to_split = None;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::TriangleSplitter;
    use crate::math::Point;
    use crate::mesh::{Mesh, TriangleId, VertexId};
    use crate::stitch::triangle_helper::TriangleHelper;
    use approx::assert_relative_eq;

    fn unit_triangle() -> (Mesh, TriangleId, [VertexId; 3]) {
        let mut mesh = Mesh::new();
        let v0 = mesh.add_vertex(Point::new(0.0, 0.0, 0.0));
        let v1 = mesh.add_vertex(Point::new(1.0, 0.0, 0.0));
        let v2 = mesh.add_vertex(Point::new(0.0, 1.0, 0.0));
        let t = mesh.add_triangle([v0, v1, v2], 0);
        mesh.build_adjacency();
        (mesh, t, [v0, v1, v2])
    }

    #[test]
    fn segment_crossing_one_edge() {
        let (mesh, t, _) = unit_triangle();
        let th = TriangleHelper::new(&mesh, t);
        let mut splitter = TriangleSplitter::new();
        // Enters through the v0-v1 edge.
        splitter.split(
            &mesh,
            &th,
            &Point::new(0.4, -0.5, 0.0),
            &Point::new(0.4, 0.3, 0.0),
            1.0e-8,
        );
        let crossed = splitter.splitted_edge().expect("an edge must be crossed");
        assert_eq!(crossed.side, 0);
        assert!(splitter.split_vertex().is_none());
        assert_relative_eq!(splitter.split_point(), &Point::new(0.4, 0.0, 0.0), epsilon = 1.0e-9);
    }

    #[test]
    fn crossing_near_vertex_snaps() {
        let (mesh, t, [v0, _, _]) = unit_triangle();
        let th = TriangleHelper::new(&mesh, t);
        let mut splitter = TriangleSplitter::new();
        splitter.split(
            &mesh,
            &th,
            &Point::new(0.001, -0.5, 0.0),
            &Point::new(0.001, 0.3, 0.0),
            0.01,
        );
        // Exclusive outcome: a vertex, and no edge.
        assert_eq!(splitter.split_vertex(), Some(v0));
        assert!(splitter.splitted_edge().is_none());
    }

    #[test]
    fn apex_split_hits_opposite_edge() {
        let (mesh, t, [v0, _, _]) = unit_triangle();
        let th = TriangleHelper::new(&mesh, t);
        let mut splitter = TriangleSplitter::new();
        // From V0 toward a point beyond the hypotenuse.
        splitter.split_apex(&mesh, &th, v0, &Point::new(0.8, 0.8, 0.0), 1.0e-8);
        let crossed = splitter.splitted_edge().expect("the hypotenuse must be crossed");
        assert_eq!(crossed.side, 1);
        assert_relative_eq!(splitter.split_point(), &Point::new(0.5, 0.5, 0.0), epsilon = 1.0e-9);
    }

    #[test]
    fn disjoint_segment_reports_nothing() {
        let (mesh, t, _) = unit_triangle();
        let th = TriangleHelper::new(&mesh, t);
        let mut splitter = TriangleSplitter::new();
        splitter.split(
            &mesh,
            &th,
            &Point::new(2.0, 2.0, 0.0),
            &Point::new(3.0, 2.0, 0.0),
            1.0e-8,
        );
        assert!(splitter.splitted_edge().is_none());
        assert!(splitter.split_vertex().is_none());
    }
}
