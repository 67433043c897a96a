use super::edge_projector::EdgeProjector;
use super::intersection::Intersection;
use super::vertex_merger::VertexMerger;
use crate::math::{Point, Real};
use crate::mesh::{EdgeFlags, HalfEdge, Mesh, TopologyError, TriangleId, VertexId, VertexLink};
use crate::partitioning::TriangleRTree;
use indexmap::IndexMap;

/// Duplicates every vertex shared by several triangle fans until the surface
/// is manifold everywhere.
///
/// Junction edges become ordinary boundary edges between the resulting
/// fans, so a surface crossed by an imprinted polyline is fissured along it.
pub struct NonManifoldSplitter<'a> {
    mesh: &'a mut Mesh,
}

impl<'a> NonManifoldSplitter<'a> {
    pub fn new(mesh: &'a mut Mesh) -> Self {
        NonManifoldSplitter { mesh }
    }

    pub fn compute(&mut self) {
        let mut merger = VertexMerger::new();
        // Fissuring one vertex can turn a neighbor into a junction, so
        // iterate until a fixed point.
        for _ in 0..32 {
            let junctions: Vec<VertexId> = self
                .mesh
                .vertex_ids()
                .filter(|&v| !self.mesh.vertex(v).link().is_manifold())
                .collect();
            if junctions.is_empty() {
                return;
            }
            for v in junctions {
                if !self.mesh.vertex(v).link().is_manifold() {
                    merger.unmerge(self.mesh, v);
                }
            }
        }
        log::warn!("non-manifold splitting did not converge");
    }
}

/// Stitches and intersects the groups of a triangulated surface.
///
/// Borders of one group are projected onto another group and merged into it
/// ([`EdgeProjector`]), and intersection curves between two groups can be
/// imprinted on both ([`Intersection`]). The input surface must be manifold;
/// the output may contain junction edges until [`NonManifoldStitch::finish`]
/// fissures them.
pub struct NonManifoldStitch {
    mesh: Mesh,
    tree: TriangleRTree,
    working_group: i32,
    inserted_beams: usize,
    max_distance: Real,
    tolerance: Real,
}

impl NonManifoldStitch {
    /// Wraps a mesh whose adjacency has already been built.
    ///
    /// Fails when the mesh contains non-manifold or badly oriented edges:
    /// stitching such a surface would produce garbage.
    pub fn new(mesh: Mesh) -> Result<Self, TopologyError> {
        check_non_manifold(&mesh)?;
        let tree = TriangleRTree::new(&mesh);
        let working_group = mesh.next_free_group();
        Ok(NonManifoldStitch {
            mesh,
            tree,
            working_group,
            inserted_beams: 0,
            max_distance: 10.0,
            tolerance: 1.0,
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }

    pub fn max_distance(&self) -> Real {
        self.max_distance
    }

    /// The maximal distance between a border and the surface it is merged
    /// into.
    pub fn set_max_distance(&mut self, max_distance: Real) {
        self.max_distance = max_distance;
    }

    pub fn tolerance(&self) -> Real {
        self.tolerance
    }

    /// The number of intersection segments imprinted by [`Self::intersect`]
    /// since the last call to [`Self::finish`].
    pub fn inserted_beam_count(&self) -> usize {
        self.inserted_beams
    }

    /// The distance under which points are considered coincident.
    pub fn set_tolerance(&mut self, tolerance: Real) {
        self.tolerance = tolerance;
    }

    fn border(&self, group: i32) -> Vec<HalfEdge> {
        let mut edges = Vec::new();
        for t in self.mesh.surface_triangle_ids() {
            if self.mesh.triangle(t).group() != group {
                continue;
            }
            for side in 0..3u8 {
                let e = HalfEdge::new(t, side);
                if self.mesh.edge_has(e, EdgeFlags::BOUNDARY) {
                    edges.push(e);
                }
            }
        }
        edges
    }

    /// Stitches the border of `group1` onto every other group.
    pub fn stitch(&mut self, group1: i32, weight: Real, boundary_only: bool) {
        let edges = self.border(group1);
        let mut projector = EdgeProjector::new(
            &mut self.mesh,
            &mut self.tree,
            edges,
            group1,
            self.max_distance,
            self.tolerance,
            weight,
        );
        projector.set_ignore_group(true);
        projector.boundary_only = boundary_only;
        projector.project();
    }

    /// Stitches the border of `group1` onto `group2`.
    pub fn stitch_pair(&mut self, group1: i32, group2: i32, weight: Real, boundary_only: bool) {
        let edges = self.border(group1);
        let mut projector = EdgeProjector::new(
            &mut self.mesh,
            &mut self.tree,
            edges,
            group2,
            self.max_distance,
            self.tolerance,
            weight,
        );
        projector.boundary_only = boundary_only;
        projector.project();
    }

    /// Stitches the borders of both groups onto each other, then fissures
    /// the created junctions.
    pub fn stitch_both(&mut self, group1: i32, group2: i32, weight: Real) {
        self.stitch_pair(group1, group2, weight, false);
        self.stitch_pair(group2, group1, 1.0 - weight, false);
        self.finish();
    }

    /// Stitches every pair of groups of the mesh.
    pub fn stitch_all(&mut self) {
        let mut groups: Vec<i32> = self
            .mesh
            .surface_triangle_ids()
            .map(|t| self.mesh.triangle(t).group())
            .filter(|&g| g != self.working_group)
            .collect();
        groups.sort_unstable();
        groups.dedup();
        for i in 0..groups.len() {
            for j in i + 1..groups.len() {
                self.stitch_pair(groups[i], groups[j], 0.0, false);
                self.stitch_pair(groups[j], groups[i], 1.0, false);
            }
        }
        self.finish();
    }

    /// Imprints the intersection curve of `group1` and `group2` on both
    /// groups.
    ///
    /// Call [`NonManifoldStitch::finish`] afterwards to fissure the surfaces
    /// along the imprinted curves.
    pub fn intersect(&mut self, group1: i32, group2: i32) {
        let beams =
            Intersection::new(&mut self.mesh, &self.tree).intersect(group1, group2, self.tolerance);
        // The first projection moves and consumes the beam endpoints, so the
        // second one works on copies.
        let mut copy_map: IndexMap<VertexId, VertexId> = IndexMap::new();
        let mut copies = Vec::with_capacity(beams.len());
        for &b in &beams {
            let p = self.mesh.point(b);
            let copy = *copy_map
                .entry(b)
                .or_insert_with(|| self.mesh.add_vertex(p));
            copies.push(copy);
        }
        let tol = self.tolerance;
        self.stitch_beams(&beams, group1, 0.0, Real::INFINITY, tol);
        self.stitch_beams(&copies, group2, 0.0, Real::INFINITY, tol);
    }

    /// Glues one working-group triangle on each beam and projects the beam
    /// edges onto `tria_group`.
    fn stitch_beams(
        &mut self,
        beams: &[VertexId],
        tria_group: i32,
        weight: Real,
        max_distance: Real,
        tolerance: Real,
    ) {
        let dummy = self.mesh.add_vertex(Point::origin());
        let mut edges = Vec::with_capacity(beams.len() / 2);
        for pair in beams.chunks_exact(2) {
            let (v1, v2) = (pair[0], pair[1]);
            debug_assert!(v1 != v2);
            self.mesh.set_mutable(v1, true);
            self.mesh.set_mutable(v2, true);
            let t = self.mesh.add_triangle([dummy, v1, v2], self.working_group);
            edges.push(HalfEdge::new(t, 1));
        }
        // TODO only rebuild the adjacency around the inserted triangles.
        self.mesh.clear_adjacency();
        self.mesh.build_adjacency();

        let mut projector = EdgeProjector::new(
            &mut self.mesh,
            &mut self.tree,
            edges,
            tria_group,
            max_distance,
            tolerance,
            weight,
        );
        projector.check_merge = false;
        projector.exclude_vertex = Some(dummy);
        projector.project();
        self.inserted_beams += beams.len() / 2;
    }

    /// Fissures the surface along its junctions and removes the
    /// working-group triangles created by [`NonManifoldStitch::intersect`].
    pub fn finish(&mut self) {
        NonManifoldSplitter::new(&mut self.mesh).compute();
        if self.inserted_beams > 0 {
            let to_remove: Vec<TriangleId> = self
                .mesh
                .surface_triangle_ids()
                .filter(|&t| self.mesh.triangle(t).group() == self.working_group)
                .collect();
            self.mesh.clear_adjacency();
            for t in to_remove {
                self.tree.remove(t);
                self.mesh.remove_triangle(t);
            }
            self.mesh.build_adjacency();
            let isolated: Vec<VertexId> = self
                .mesh
                .vertex_ids()
                .filter(|&v| matches!(self.mesh.vertex(v).link(), VertexLink::Isolated))
                .collect();
            for v in isolated {
                self.mesh.remove_vertex(v);
            }
            self.inserted_beams = 0;
        }
    }
}

fn check_non_manifold(mesh: &Mesh) -> Result<(), TopologyError> {
    let mut count = 0;
    let mut groups: Vec<i32> = Vec::new();
    for t in mesh.surface_triangle_ids() {
        for side in 0..3u8 {
            let e = HalfEdge::new(t, side);
            if mesh.edge_has(e, EdgeFlags::NONMANIFOLD) {
                count += 1;
                let gid = mesh.triangle(t).group();
                if !groups.contains(&gid) {
                    groups.push(gid);
                }
                log::error!(
                    "non-manifold edge {:?}-{:?} in group {}",
                    mesh.point(mesh.origin(e)),
                    mesh.point(mesh.destination(e)),
                    gid
                );
            }
        }
    }
    if count > 0 {
        return Err(TopologyError::NonManifoldInput(count));
    }
    Ok(())
}
