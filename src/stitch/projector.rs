use super::triangle_helper::TriangleHelper;
use crate::math::{Point, Real};
use crate::mesh::{EdgeFlags, HalfEdge, Mesh, TriangleId, VertexId};

/// How a point projects onto a triangle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProjectionKind {
    Face,
    Edge,
    Vertex,
    /// The projection is out of the triangle.
    Out,
    /// The point is too far from the triangle, even though its projection
    /// may lie on it.
    Far,
}

/// Classifies where a point lands when projected onto one triangle.
///
/// All thresholds are squared distances. `sqr_tolerance` is the snapping
/// distance to vertices and edges; `sqr_max_distance` is the hard cutoff
/// beyond which the result is always [`ProjectionKind::Far`].
#[derive(Clone)]
pub struct TriangleProjector {
    pub sqr_max_distance: Real,
    pub sqr_tolerance: Real,
    /// Restrict the projection to the boundary half-edges of the triangle.
    pub boundary_only: bool,
    pub(crate) projection: Point,
    pub(crate) kind: ProjectionKind,
    pub(crate) vertex: Option<VertexId>,
    pub(crate) edge: Option<HalfEdge>,
    pub(crate) sqr_distance: Real,
    /// The relative abscissa of the projection on each edge line.
    ///
    /// `edge_abscissa[i]` goes with the half-edge of side `i`; it is only
    /// meaningful when the matching `on_edge_line[i]` is true.
    pub edge_abscissa: [Real; 3],
    pub on_edge_line: [bool; 3],
}

impl Default for TriangleProjector {
    fn default() -> Self {
        TriangleProjector {
            sqr_max_distance: Real::MAX,
            sqr_tolerance: 0.01,
            boundary_only: false,
            projection: Point::origin(),
            kind: ProjectionKind::Far,
            vertex: None,
            edge: None,
            sqr_distance: Real::INFINITY,
            edge_abscissa: [0.0; 3],
            on_edge_line: [false; 3],
        }
    }
}

impl TriangleProjector {
    pub fn reset(&mut self) {
        self.kind = ProjectionKind::Far;
        self.sqr_distance = Real::INFINITY;
    }

    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    /// The projected point.
    pub fn projection(&self) -> &Point {
        &self.projection
    }

    /// The distance between the point and its projection on the triangle
    /// plane. The projection itself may have been snapped to a close vertex
    /// or edge, so this is not always the distance to `projection()`.
    pub fn sqr_distance(&self) -> Real {
        self.sqr_distance
    }

    /// The triangle vertex to merge with, when the kind is `Vertex`.
    pub fn vertex(&self) -> VertexId {
        debug_assert!(self.kind == ProjectionKind::Vertex);
        self.vertex.unwrap()
    }

    /// The triangle half-edge to split, when the kind is `Edge`.
    pub fn edge(&self) -> HalfEdge {
        debug_assert!(self.kind == ProjectionKind::Edge);
        self.edge.unwrap()
    }

    pub fn project(&mut self, mesh: &Mesh, point: &Point, helper: &TriangleHelper) {
        if self.boundary_only {
            self.project_on_boundary(mesh, point, helper.triangle());
            return;
        }
        let am = point - helper.point(0);
        let am_dot_an = helper.normal.dot(&am);
        let alpha = am_dot_an / helper.sqr_normal;
        self.sqr_distance = am_dot_an * alpha;
        self.projection = point - alpha * helper.normal;

        let vertices = mesh.triangle(helper.triangle()).vertices();
        let mut to_vertices = [na::Vector3::zeros(); 3];
        for i in 0..3 {
            to_vertices[i] = self.projection - helper.point(i);
            if to_vertices[i].norm_squared() < self.sqr_tolerance {
                if self.sqr_distance < self.sqr_max_distance {
                    self.vertex = Some(vertices[i]);
                    self.kind = ProjectionKind::Vertex;
                } else {
                    self.kind = ProjectionKind::Far;
                }
                return;
            }
        }

        let mut cross_products = [na::Vector3::zeros(); 3];
        for i in 0..3 {
            cross_products[i] = helper.edges[i].cross(&to_vertices[i]);
            let edge_norm = helper.edges_norm[i];
            let sqr_line_dist = cross_products[i].norm_squared() / edge_norm;
            // The abscissas are also needed by the out/out splitting case,
            // so compute them even when the edge is not retained here.
            let dot = to_vertices[i].dot(&helper.edges[i]) / edge_norm;
            self.edge_abscissa[i] = dot;
            self.on_edge_line[i] = sqr_line_dist < self.sqr_tolerance;
            if self.on_edge_line[i] {
                if self.sqr_distance >= self.sqr_max_distance {
                    self.kind = ProjectionKind::Far;
                    return;
                }
                self.kind = ProjectionKind::Edge;
                self.edge = Some(helper.half_edge(i as u8));
                if dot > 0.0 && dot < 1.0 {
                    self.projection = helper.point(i) + dot * helper.edges[i];
                    return;
                }
            }
        }

        for cross in &cross_products {
            if cross.dot(&helper.normal) < 0.0 {
                self.kind = ProjectionKind::Out;
                return;
            }
        }
        self.kind = if self.sqr_distance < self.sqr_max_distance {
            ProjectionKind::Face
        } else {
            ProjectionKind::Far
        };
    }

    /// Projects onto the closest boundary half-edge of the triangle,
    /// ignoring its interior.
    pub fn project_on_boundary(&mut self, mesh: &Mesh, point: &Point, tri: TriangleId) {
        let mut sqr_closest = Real::MAX;
        self.kind = ProjectionKind::Far;
        for side in 0..3u8 {
            let current = HalfEdge::new(tri, side);
            if !mesh.edge_has(current, EdgeFlags::BOUNDARY) {
                continue;
            }
            let origin = mesh.point(mesh.origin(current));
            let destination = mesh.point(mesh.destination(current));
            let edge = destination - origin;
            let to_point = point - origin;
            let r = edge.dot(&to_point) / edge.norm_squared();
            let offset = edge * r - to_point;
            self.sqr_distance = offset.norm_squared();
            if self.sqr_distance < self.sqr_max_distance && self.sqr_distance < sqr_closest {
                sqr_closest = self.sqr_distance;
                self.projection = point + offset;
                if na::distance_squared(&origin, &self.projection) < self.sqr_tolerance {
                    self.kind = ProjectionKind::Vertex;
                    self.vertex = Some(mesh.origin(current));
                } else if na::distance_squared(&self.projection, &destination) < self.sqr_tolerance
                {
                    self.kind = ProjectionKind::Vertex;
                    self.vertex = Some(mesh.destination(current));
                } else if (0.0..=1.0).contains(&r) {
                    self.kind = ProjectionKind::Edge;
                } else {
                    self.kind = ProjectionKind::Out;
                }
                self.edge = Some(current);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{ProjectionKind, TriangleProjector};
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

    fn project(mesh: &Mesh, t: TriangleId, p: Point) -> TriangleProjector {
        let th = TriangleHelper::new(mesh, t);
        let mut tp = TriangleProjector::default();
        tp.reset();
        tp.project(mesh, &p, &th);
        tp
    }

    #[test]
    fn classify_face() {
        let (mesh, t, _) = unit_triangle();
        let tp = project(&mesh, t, Point::new(0.3, 0.3, 0.5));
        assert_eq!(tp.kind(), ProjectionKind::Face);
        assert_relative_eq!(tp.sqr_distance(), 0.25, epsilon = 1.0e-12);
        assert_relative_eq!(tp.projection(), &Point::new(0.3, 0.3, 0.0), epsilon = 1.0e-12);
    }

    #[test]
    fn classify_edge() {
        let (mesh, t, _) = unit_triangle();
        let tp = project(&mesh, t, Point::new(0.5, 0.01, 0.0));
        assert_eq!(tp.kind(), ProjectionKind::Edge);
        // The snapped projection lies on the v0-v1 edge.
        assert_eq!(tp.edge().side, 0);
        assert_relative_eq!(tp.projection().y, 0.0, epsilon = 1.0e-12);
    }

    #[test]
    fn classify_vertex() {
        let (mesh, t, [v0, _, _]) = unit_triangle();
        let tp = project(&mesh, t, Point::new(0.0, 0.01, 0.0));
        assert_eq!(tp.kind(), ProjectionKind::Vertex);
        assert_eq!(tp.vertex(), v0);
    }

    #[test]
    fn classify_out() {
        let (mesh, t, _) = unit_triangle();
        let tp = project(&mesh, t, Point::new(-1.0, -1.0, 0.0));
        assert_eq!(tp.kind(), ProjectionKind::Out);
    }

    #[test]
    fn classify_far() {
        let (mesh, t, _) = unit_triangle();
        let th = TriangleHelper::new(&mesh, t);
        let mut tp = TriangleProjector {
            sqr_max_distance: 0.01,
            ..TriangleProjector::default()
        };
        tp.reset();
        tp.project(&mesh, &Point::new(0.3, 0.3, 2.0), &th);
        assert_eq!(tp.kind(), ProjectionKind::Far);
    }

    #[test]
    fn classification_is_idempotent_on_snapped_point() {
        let (mesh, t, [v0, _, _]) = unit_triangle();
        let tp = project(&mesh, t, Point::new(0.0, 0.01, 0.0));
        assert_eq!(tp.kind(), ProjectionKind::Vertex);
        let again = project(&mesh, t, mesh.point(v0));
        assert_eq!(again.kind(), ProjectionKind::Vertex);
        assert_eq!(again.vertex(), v0);
    }

    #[test]
    fn boundary_projection_ignores_interior() {
        let (mesh, t, _) = unit_triangle();
        let th = TriangleHelper::new(&mesh, t);
        let mut tp = TriangleProjector {
            boundary_only: true,
            ..TriangleProjector::default()
        };
        tp.reset();
        // Right above the interior: a plain projection would be FACE, the
        // boundary projection snaps to the closest border edge.
        tp.project(&mesh, &Point::new(0.3, 0.1, 0.0), &th);
        assert_eq!(tp.kind(), ProjectionKind::Edge);
        assert_eq!(tp.edge().side, 0);
    }
}
