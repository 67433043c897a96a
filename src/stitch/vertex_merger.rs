use crate::math::Point;
use crate::mesh::{EdgeFlags, HalfEdge, Mesh, TriangleId, VertexId, VertexLink};
use indexmap::{IndexMap, IndexSet};

/// Merges and unmerges vertices while keeping the half-edge invariants
/// intact.
///
/// A merge detaches every half-edge around the merged vertices, repoints the
/// sources to the target, then re-glues the coincident half-edges. Edges
/// that end up shared by more than two triangles become non-manifold
/// junctions; edges left without a partner become boundary edges. An
/// unmerge is the inverse: it fissures the fans around a non-manifold
/// vertex so that each fan gets its own vertex copy.
///
/// The buffers are reused across calls, so one instance should be kept for
/// a whole stitching pass.
#[derive(Default)]
pub struct VertexMerger {
    map: IndexMap<VertexId, Vec<TriangleId>>,
    edge_to_clear: IndexSet<HalfEdge>,
    fans: Vec<Vec<TriangleId>>,
}

impl VertexMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the triangles around `vertex` to the incidence map and records
    /// the half-edges whose adjacency must be cleared.
    fn indexify(&mut self, mesh: &Mesh, vertex: VertexId) {
        for edge in mesh.half_edges_from(vertex) {
            if mesh.destination(edge) == mesh.outer_vertex() {
                continue;
            }
            // A scaffold base stands for the inner boundary edge it is glued
            // to.
            let edge = if mesh.edge_has(edge, EdgeFlags::OUTER) {
                mesh.sym(edge).unwrap()
            } else {
                edge
            };
            debug_assert!(!mesh.edge_has(edge, EdgeFlags::OUTER));
            let _ = self.edge_to_clear.insert(edge);
            self.index_triangle(mesh, edge.tri);
        }
    }

    fn index_triangle(&mut self, mesh: &Mesh, t: TriangleId) {
        debug_assert!(!mesh.is_outer(t));
        for v in mesh.triangle(t).vertices() {
            let l = self.map.entry(v).or_default();
            if !l.contains(&t) {
                l.push(t);
            }
        }
    }

    /// Unglues the recorded half-edges and removes the scaffolds that were
    /// attached to them.
    fn clear_adjacency(&mut self, mesh: &mut Mesh) {
        let mut scaffolds: IndexSet<TriangleId> = IndexSet::new();
        let edges: Vec<HalfEdge> = self.edge_to_clear.iter().copied().collect();
        for e in edges {
            if let Some(s) = mesh.sym(e) {
                if mesh.is_outer(s.tri) {
                    let _ = scaffolds.insert(s.tri);
                } else {
                    mesh.remove_flags(s, EdgeFlags::BOUNDARY | EdgeFlags::NONMANIFOLD);
                }
            }
            mesh.unglue(e);
            mesh.remove_flags(e, EdgeFlags::BOUNDARY | EdgeFlags::NONMANIFOLD);
        }
        for t in scaffolds {
            mesh.remove_triangle(t);
        }
    }

    /// Re-glues the unglued half-edges of the indexed triangles pairwise.
    ///
    /// Edges shared by more than two half-edges, or by two half-edges with
    /// the same orientation, become non-manifold junctions with one scaffold
    /// per half-edge.
    fn glue_symmetric_half_edges(&self, mesh: &mut Mesh) {
        let mut triangles: IndexSet<TriangleId> = IndexSet::new();
        for tris in self.map.values() {
            triangles.extend(tris.iter().copied());
        }
        let mut buckets: IndexMap<(VertexId, VertexId), Vec<HalfEdge>> = IndexMap::new();
        for &t in &triangles {
            for side in 0..3u8 {
                let e = HalfEdge::new(t, side);
                if mesh.sym(e).is_none() {
                    buckets.entry(mesh.edge_key(e)).or_default().push(e);
                }
            }
        }
        for (_, edges) in buckets {
            match edges.len() {
                1 => {} // handled by connect_boundary_triangles
                2 if mesh.origin(edges[0]) == mesh.destination(edges[1]) => {
                    mesh.glue(edges[0], edges[1]);
                }
                _ => {
                    for e in edges {
                        let _ = mesh.add_scaffold(e, EdgeFlags::NONMANIFOLD);
                    }
                }
            }
        }
    }

    /// Turns the recorded half-edges that are still unglued into boundary
    /// edges with a scaffold.
    fn connect_boundary_triangles(&self, mesh: &mut Mesh) {
        for &e in &self.edge_to_clear {
            if mesh.sym(e).is_none() && !mesh.edge_has(e, EdgeFlags::OUTER) {
                let _ = mesh.add_scaffold(e, EdgeFlags::BOUNDARY);
            }
        }
    }

    /// Rebuilds the link of every indexed vertex.
    ///
    /// `frozen` lists the vertices whose whole incidence is already in the
    /// map; for the others the triangles reachable from their current link
    /// are added so fans untouched by the operation are not dropped.
    fn rebuild_links(&mut self, mesh: &mut Mesh, frozen: &[VertexId]) {
        let keys: Vec<VertexId> = self.map.keys().copied().collect();
        for v in keys {
            if !frozen.contains(&v) {
                for t in mesh.incident_triangles(v) {
                    let l = &mut self.map[&v];
                    if !l.contains(&t) {
                        l.push(t);
                    }
                }
            }
        }
        mesh.rebuild_vertex_links(&self.map);
    }

    /// Merges `vertices` into the last of them, then moves it to `target`.
    ///
    /// The caller must have checked that no triangle references both a
    /// source and the target; such a configuration requires an edge
    /// collapse instead. The source vertices are removed from the mesh.
    pub fn merge(&mut self, mesh: &mut Mesh, target: Point, vertices: &[VertexId]) {
        self.map.clear();
        self.edge_to_clear.clear();
        for &v in vertices {
            self.indexify(mesh, v);
        }
        self.clear_adjacency(mesh);
        let target_v = *vertices.last().unwrap();
        for &source in &vertices[..vertices.len() - 1] {
            let tris = self.map.shift_remove(&source).unwrap_or_default();
            for &t in &tris {
                debug_assert!(
                    !mesh.triangle(t).contains(target_v),
                    "cannot merge {source:?} into {target_v:?}"
                );
                for i in 0..3 {
                    if mesh.triangle(t).vertices()[i] == source {
                        mesh.set_triangle_vertex(t, i, target_v);
                    }
                }
            }
            let l = self.map.entry(target_v).or_default();
            for t in tris {
                if !l.contains(&t) {
                    l.push(t);
                }
            }
        }
        self.glue_symmetric_half_edges(mesh);
        self.connect_boundary_triangles(mesh);
        self.rebuild_links(mesh, &[]);
        for &source in &vertices[..vertices.len() - 1] {
            mesh.set_link(source, VertexLink::Isolated);
            mesh.remove_vertex(source);
        }
        mesh.move_vertex(target_v, target);
    }

    /// Converts the non-manifold junctions around `v` into boundary edges by
    /// giving each fan its own vertex.
    ///
    /// The first fan keeps `v`; this is a no-op when `v` is manifold.
    pub fn unmerge(&mut self, mesh: &mut Mesh, v: VertexId) {
        self.map.clear();
        self.edge_to_clear.clear();
        self.fans.clear();
        let reps = match mesh.vertex(v).link() {
            VertexLink::NonManifold(reps) => reps.clone(),
            _ => return,
        };
        for &rep in &reps {
            let fan = mesh.expand_fan(v, rep);
            for &t in &fan {
                for side in 0..3u8 {
                    let e = HalfEdge::new(t, side);
                    if mesh.origin(e) == v || mesh.destination(e) == v {
                        let _ = self.edge_to_clear.insert(e);
                    }
                }
            }
            self.fans.push(fan);
        }
        self.clear_adjacency(mesh);
        let mutable = mesh.vertex(v).is_mutable();
        let mut new_vertices = vec![v];
        let fans = std::mem::take(&mut self.fans);
        for (k, fan) in fans.iter().enumerate() {
            let new_v = if k == 0 {
                v
            } else {
                let copy = mesh.duplicate_vertex(v);
                mesh.set_mutable(copy, mutable);
                new_vertices.push(copy);
                copy
            };
            for &t in fan {
                for i in 0..3 {
                    if mesh.triangle(t).vertices()[i] == v {
                        mesh.set_triangle_vertex(t, i, new_v);
                    }
                }
                mesh.set_link(new_v, VertexLink::Manifold(t));
                self.index_triangle(mesh, t);
            }
        }
        self.fans = fans;
        self.glue_symmetric_half_edges(mesh);
        self.connect_boundary_triangles(mesh);
        self.rebuild_links(mesh, &new_vertices);
    }
}

#[cfg(test)]
mod test {
    use super::VertexMerger;
    use crate::math::Point;
    use crate::mesh::{EdgeFlags, Mesh, VertexId, VertexLink};

    /// Two triangles in the z = 0 plane and one standing up, with the
    /// standing one holding its own copy of the (0, 1, 0) vertex.
    fn three_patches() -> (Mesh, [VertexId; 6]) {
        let mut mesh = Mesh::new();
        let v0 = mesh.add_vertex(Point::new(0.0, 0.0, 0.0));
        let v1 = mesh.add_vertex(Point::new(0.0, 1.0, 0.0));
        let v11 = mesh.add_vertex(Point::new(0.0, 1.0, 0.0));
        let v2 = mesh.add_vertex(Point::new(1.0, 0.0, 0.0));
        let v3 = mesh.add_vertex(Point::new(-1.0, 0.0, 0.0));
        let v4 = mesh.add_vertex(Point::new(0.0, 0.0, 1.0));
        let _ = mesh.add_triangle([v0, v1, v2], 0);
        let _ = mesh.add_triangle([v0, v3, v1], 0);
        let _ = mesh.add_triangle([v0, v11, v4], 0);
        mesh.build_adjacency();
        (mesh, [v0, v1, v11, v2, v3, v4])
    }

    #[test]
    fn merge_then_unmerge_round_trip() {
        let (mut mesh, [v0, v1, v11, ..]) = three_patches();
        let mut merger = VertexMerger::new();

        let target = mesh.point(v11);
        merger.merge(&mut mesh, target, &[v1, v11]);
        assert!(mesh.is_valid());
        assert!(mesh.check_no_degenerate_triangles());
        assert!(mesh.check_no_inverted_triangles());
        // The merged vertex now joins three triangles through the junction
        // edge (v0, v11).
        assert!(!mesh.vertex(v11).link().is_manifold());
        let junction = mesh.half_edge_between(v0, v11).unwrap();
        assert!(mesh.edge_has(junction, EdgeFlags::NONMANIFOLD));

        merger.unmerge(&mut mesh, v11);
        assert!(mesh.is_valid());
        assert!(mesh.check_no_degenerate_triangles());
        assert!(mesh.check_no_inverted_triangles());
        assert!(mesh.vertex(v11).link().is_manifold());
        // The fissure turned every junction edge back into a boundary edge.
        for t in mesh.surface_triangle_ids() {
            for side in 0..3u8 {
                let e = crate::mesh::HalfEdge::new(t, side);
                assert!(!mesh.edge_has(e, EdgeFlags::NONMANIFOLD));
            }
        }
    }

    #[test]
    fn merge_moves_target_to_blend_position() {
        let mut mesh = Mesh::new();
        let a0 = mesh.add_vertex(Point::new(0.0, 0.0, 0.0));
        let a1 = mesh.add_vertex(Point::new(1.0, 0.0, 0.0));
        let a2 = mesh.add_vertex(Point::new(0.0, 1.0, 0.0));
        let b0 = mesh.add_vertex(Point::new(1.1, 0.0, 0.0));
        let b1 = mesh.add_vertex(Point::new(2.0, 0.0, 0.0));
        let b2 = mesh.add_vertex(Point::new(1.0, 1.0, 0.0));
        let _ = mesh.add_triangle([a0, a1, a2], 1);
        let _ = mesh.add_triangle([b0, b1, b2], 2);
        mesh.build_adjacency();

        let mut merger = VertexMerger::new();
        let blend = Point::new(1.05, 0.0, 0.0);
        merger.merge(&mut mesh, blend, &[a1, b0]);
        assert!(mesh.is_valid());
        assert_eq!(mesh.point(b0), blend);
        // a1 is gone, b0 is now shared by both triangles.
        assert_eq!(mesh.incident_triangles(b0).len(), 2);
        assert!(!mesh.vertex(b0).link().is_manifold());
    }
}
