use crate::math::{Point, Real};
use crate::mesh::{triangle_normal, EdgeFlags, HalfEdge, Mesh, VertexId};
use crate::partitioning::TriangleRTree;

/// Quality figures of an interior edge and of its swapped configuration.
#[derive(Copy, Clone, Debug)]
pub struct EdgeQuality {
    /// The worst aspect ratio of the two triangles sharing the edge.
    pub quality: Real,
    /// The worst aspect ratio after swapping the edge.
    pub swapped_quality: Real,
    /// Cosine of the angle between the two triangle normals.
    pub angle: Real,
    /// Cosine of the angle between the two normals after swapping.
    pub swapped_angle: Real,
    /// The volume of the tetrahedron spanned by the quad; swapping a large
    /// volume would noticeably change the surface.
    pub swapped_volume: Real,
}

/// Aspect ratio of a triangle, normalized so an equilateral triangle
/// scores 1 and a degenerate one 0.
fn aspect_ratio(p0: &Point, p1: &Point, p2: &Point) -> Real {
    let area2 = triangle_normal(p0, p1, p2).norm(); // twice the area
    let sqr_edges = na::distance_squared(p0, p1)
        + na::distance_squared(p1, p2)
        + na::distance_squared(p2, p0);
    if sqr_edges == 0.0 {
        return 0.0;
    }
    2.0 * 3.0f64.sqrt() * area2 / sqr_edges
}

impl EdgeQuality {
    /// Evaluates the edge `e`, which must be glued surface to surface.
    pub fn of_edge(mesh: &Mesh, e: HalfEdge) -> Self {
        let s = mesh.sym(e).unwrap();
        let o = mesh.point(mesh.origin(e));
        let d = mesh.point(mesh.destination(e));
        let a1 = mesh.point(mesh.apex(e));
        let a2 = mesh.point(mesh.apex(s));
        let n1 = triangle_normal(&o, &d, &a1);
        let n2 = triangle_normal(&d, &o, &a2);
        let ns1 = triangle_normal(&o, &a2, &a1);
        let ns2 = triangle_normal(&d, &a1, &a2);
        let cos = |u: &crate::math::Vector, v: &crate::math::Vector| {
            let n = u.norm() * v.norm();
            if n == 0.0 {
                -1.0
            } else {
                u.dot(v) / n
            }
        };
        EdgeQuality {
            quality: aspect_ratio(&o, &d, &a1).min(aspect_ratio(&d, &o, &a2)),
            swapped_quality: aspect_ratio(&o, &a2, &a1).min(aspect_ratio(&d, &a1, &a2)),
            angle: cos(&n1, &n2),
            swapped_angle: cos(&ns1, &ns2),
            swapped_volume: (d - o).dot(&(a1 - o).cross(&(a2 - o))).abs() / 6.0,
        }
    }
}

/// Swaps the edges around a vertex to improve the quality of its incident
/// triangles.
///
/// With the default thresholds no edge is ever swapped; callers opt in by
/// lowering `min_normal_angle` or by bounding `max_swapped_volume`.
pub struct VertexSwapper {
    /// An edge is kept when the cosine of the angle between its two
    /// triangle normals is below this value.
    pub min_normal_angle: Real,
    /// An edge is kept when swapping it would sweep a larger volume.
    pub max_swapped_volume: Real,
    /// Skip the `min_normal_angle` test entirely.
    pub ignore_angle: bool,
}

impl Default for VertexSwapper {
    fn default() -> Self {
        VertexSwapper {
            min_normal_angle: Real::INFINITY,
            max_swapped_volume: Real::INFINITY,
            ignore_angle: false,
        }
    }
}

impl VertexSwapper {
    fn is_quality_improved(&self, q: &EdgeQuality) -> bool {
        q.swapped_quality > q.quality
            && q.swapped_angle > 0.0
            && (self.ignore_angle || q.angle > self.min_normal_angle)
            && q.swapped_volume < self.max_swapped_volume
    }

    /// Swaps improvable edges around `v` until a fixed point is reached.
    ///
    /// Returns the number of swapped edges. The spatial index is kept in
    /// sync with every swap.
    pub fn swap(&self, mesh: &mut Mesh, tree: &mut TriangleRTree, v: VertexId) -> usize {
        let mut count = 0;
        'redo: loop {
            for t in mesh.incident_triangles(v) {
                let tri = mesh.triangle(t);
                let Some(i) = tri.vertices().iter().position(|&w| w == v) else {
                    continue;
                };
                // The edge opposite to v in this triangle.
                let e = HalfEdge::new(t, ((i + 1) % 3) as u8);
                debug_assert!(mesh.apex(e) == v);
                if mesh.edge_has(
                    e,
                    EdgeFlags::NONMANIFOLD | EdgeFlags::BOUNDARY | EdgeFlags::OUTER,
                ) || !mesh.can_swap_topology(e)
                {
                    continue;
                }
                let s = mesh.sym(e).unwrap();
                if mesh.is_outer(s.tri) || mesh.edge_has(s, EdgeFlags::BOUNDARY) {
                    continue;
                }
                let quality = EdgeQuality::of_edge(mesh, e);
                if self.is_quality_improved(&quality) {
                    tree.remove(e.tri);
                    tree.remove(s.tri);
                    let swapped = mesh
                        .edge_swap(e)
                        .expect("the swap preconditions were checked");
                    let diagonal = swapped.next();
                    tree.insert(mesh, diagonal.tri);
                    tree.insert(mesh, mesh.sym(diagonal).unwrap().tri);
                    count += 1;
                    continue 'redo;
                }
            }
            break;
        }
        count
    }
}

#[cfg(test)]
mod test {
    use super::{EdgeQuality, VertexSwapper};
    use crate::math::Point;
    use crate::mesh::Mesh;
    use crate::partitioning::TriangleRTree;

    /// A flat, elongated quad triangulated along its long diagonal, so
    /// swapping to the short diagonal improves the aspect ratios.
    fn skewed_quad() -> (Mesh, crate::mesh::VertexId) {
        let mut mesh = Mesh::new();
        let left = mesh.add_vertex(Point::new(-1.0, 0.0, 0.0));
        let right = mesh.add_vertex(Point::new(1.0, 0.0, 0.0));
        let bottom = mesh.add_vertex(Point::new(0.0, -0.1, 0.0));
        let top = mesh.add_vertex(Point::new(0.0, 0.1, 0.0));
        let _ = mesh.add_triangle([left, right, bottom], 0);
        let _ = mesh.add_triangle([right, left, top], 0);
        mesh.build_adjacency();
        (mesh, bottom)
    }

    #[test]
    fn swapped_configuration_scores_better() {
        let (mesh, _) = skewed_quad();
        let t = mesh.surface_triangle_ids().next().unwrap();
        let e = (0..3u8)
            .map(|side| crate::mesh::HalfEdge::new(t, side))
            .find(|&e| {
                let s = mesh.sym(e);
                s.is_some_and(|s| !mesh.is_outer(s.tri))
            })
            .unwrap();
        let q = EdgeQuality::of_edge(&mesh, e);
        assert!(q.swapped_quality > q.quality);
        assert!(q.swapped_angle > 0.0);
        // Coplanar quad: no volume is swept by the swap.
        assert!(q.swapped_volume < 1.0e-12);
    }

    #[test]
    fn default_swapper_is_inert() {
        let (mut mesh, v) = skewed_quad();
        let mut tree = TriangleRTree::new(&mesh);
        let swapper = VertexSwapper::default();
        assert_eq!(swapper.swap(&mut mesh, &mut tree, v), 0);
    }

    #[test]
    fn bounded_volume_swapper_swaps_flat_quad() {
        let (mut mesh, v) = skewed_quad();
        let mut tree = TriangleRTree::new(&mesh);
        let swapper = VertexSwapper {
            ignore_angle: true,
            max_swapped_volume: 1.0e-6,
            ..VertexSwapper::default()
        };
        assert_eq!(swapper.swap(&mut mesh, &mut tree, v), 1);
        assert!(mesh.is_valid());
        assert_eq!(tree.len(), 2);
    }
}
