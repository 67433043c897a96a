use super::projector::{ProjectionKind, TriangleProjector};
use super::splitter::TriangleSplitter;
use super::swapper::VertexSwapper;
use super::triangle_helper::{self, TriangleHelper};
use super::vertex_merger::VertexMerger;
use crate::math::{Point, Real};
use crate::mesh::{EdgeFlags, HalfEdge, Mesh, TriangleId, VertexId, VertexLink};
use crate::partitioning::TriangleRTree;
use crate::utils::Worklist;

/// Projects a set of boundary half-edges onto a group of triangles and
/// merges their endpoints into the target surface.
///
/// This is the stitching state machine: edges are popped from a worklist,
/// their endpoints are classified against the candidate triangles
/// ([`TriangleProjector`]), the matching geometric case splits the target
/// and/or the source edge, and the resulting vertex pair is merged
/// ([`VertexMerger`]). Freshly split boundary edges are re-queued with
/// priority until everything is resolved or dropped.
///
/// An edge with no viable candidate is silently skipped: stitching is
/// best-effort per edge.
pub struct EdgeProjector<'a> {
    mesh: &'a mut Mesh,
    tree: &'a mut TriangleRTree,
    to_project: Worklist<HalfEdge>,
    half_inserted: Worklist<HalfEdge>,
    group: i32,
    ignore_group: bool,
    /// Blend factor of a merge: 1 keeps the source position, 0 the target.
    pub weight: Real,
    /// Check that merges do not invert or degenerate triangles.
    pub check_merge: bool,
    /// Project on the boundary of the target patch instead of its surface.
    pub boundary_only: bool,
    /// Edges touching this vertex are never re-queued.
    pub exclude_vertex: Option<VertexId>,
    max_sqr_dist: Real,
    sqr_tol: Real,
    candidates: Vec<TriangleId>,
    helpers: Vec<TriangleHelper>,
    projectors1: Vec<TriangleProjector>,
    projectors2: Vec<TriangleProjector>,
    projector1_valid: bool,
    projector2_valid: bool,
    order: Vec<usize>,
    splitter: TriangleSplitter,
    merger: VertexMerger,
    swapper: VertexSwapper,
    last_merge_source: Option<VertexId>,
    last_merge_target: Option<VertexId>,
    last_splitted1: Option<HalfEdge>,
    last_splitted2: Option<HalfEdge>,
    edge_to_collapse: Option<HalfEdge>,
}

impl<'a> EdgeProjector<'a> {
    pub fn new(
        mesh: &'a mut Mesh,
        tree: &'a mut TriangleRTree,
        edges: impl IntoIterator<Item = HalfEdge>,
        group: i32,
        max_dist: Real,
        tol: Real,
        weight: Real,
    ) -> Self {
        let mut to_project = Worklist::new();
        to_project.extend(edges);
        let swapper = VertexSwapper {
            ignore_angle: true,
            max_swapped_volume: tol * tol * tol,
            ..VertexSwapper::default()
        };
        EdgeProjector {
            mesh,
            tree,
            to_project,
            half_inserted: Worklist::new(),
            group,
            ignore_group: false,
            weight,
            check_merge: true,
            boundary_only: false,
            exclude_vertex: None,
            max_sqr_dist: max_dist * max_dist,
            sqr_tol: tol * tol,
            candidates: Vec::new(),
            helpers: Vec::new(),
            projectors1: Vec::new(),
            projectors2: Vec::new(),
            projector1_valid: false,
            projector2_valid: false,
            order: Vec::new(),
            splitter: TriangleSplitter::new(),
            merger: VertexMerger::new(),
            swapper,
            last_merge_source: None,
            last_merge_target: None,
            last_splitted1: None,
            last_splitted2: None,
            edge_to_collapse: None,
        }
    }

    /// When true, project on all groups but the target one instead of
    /// projecting on the target group.
    pub fn set_ignore_group(&mut self, ignore: bool) {
        self.ignore_group = ignore;
    }

    /// Drains the worklists.
    pub fn project(&mut self) {
        loop {
            let edge = if let Some(e) = self.half_inserted.pop() {
                e
            } else if let Some(e) = self.to_project.pop() {
                if !self.mesh.contains_triangle(e.tri)
                    || !self.mesh.edge_has(e, EdgeFlags::BOUNDARY)
                {
                    // A previous merge resolved or removed this edge.
                    continue;
                }
                e
            } else {
                break;
            };
            if !self.mesh.contains_triangle(edge.tri) {
                continue;
            }
            self.project_edge(edge);
        }
    }

    fn check(&self) {
        if cfg!(feature = "enhanced-checks") {
            debug_assert!(self.mesh.is_valid());
            debug_assert!(self.mesh.check_no_degenerate_triangles());
            debug_assert!(self.mesh.check_no_inverted_triangles());
        }
    }

    fn is_to_project(&self, edge: HalfEdge) -> bool {
        match self.exclude_vertex {
            None => true,
            Some(v) => self.mesh.origin(edge) != v && self.mesh.destination(edge) != v,
        }
    }

    fn blend_position(&self, source: VertexId, target: &Point) -> Point {
        let s = self.mesh.point(source);
        Point::from(s.coords * self.weight + target.coords * (1.0 - self.weight))
    }

    /// Removes a scratch vertex that was never connected to a triangle.
    fn discard_vertex(&mut self, v: Option<VertexId>) {
        if let Some(v) = v {
            if matches!(self.mesh.vertex(v).link(), VertexLink::Isolated) {
                self.mesh.remove_vertex(v);
            }
        }
    }

    /// Can `source` be moved onto `target_pos` and merged there?
    ///
    /// When the merge target is an existing vertex already linked to
    /// `source` by an edge, a plain merge would create a degenerate
    /// triangle; `edge_to_collapse` is then set so the merge is replaced by
    /// an edge collapse.
    fn can_merge(&mut self, source: VertexId, target_pos: &Point, target: Option<VertexId>) -> bool {
        if Some(source) == target {
            return false;
        }
        let real_position = self.check_merge.then(|| self.blend_position(source, target_pos));
        self.edge_to_collapse = None;
        for e in self.mesh.half_edges_from(source) {
            debug_assert!(self.mesh.origin(e) == source);
            if let Some(pos) = &real_position {
                if !self.mesh.can_move_origin(e, pos) {
                    log::info!("cannot move {source:?} to {pos:?}");
                    return false;
                }
            }
            let boundary = self.mesh.edge_has(e, EdgeFlags::BOUNDARY)
                || self
                    .mesh
                    .sym(e)
                    .is_some_and(|s| self.mesh.edge_has(s, EdgeFlags::BOUNDARY));
            if self.boundary_only {
                // A manifold stitch must not create non-manifold edges.
                for ee in self.mesh.half_edges_from(self.mesh.destination(e)) {
                    let ee_boundary = self.mesh.edge_has(ee, EdgeFlags::BOUNDARY)
                        || self
                            .mesh
                            .sym(ee)
                            .is_some_and(|s| self.mesh.edge_has(s, EdgeFlags::BOUNDARY));
                    if Some(self.mesh.destination(ee)) == target && (!ee_boundary || !boundary) {
                        return false;
                    }
                }
            }
            if Some(self.mesh.destination(e)) == target {
                let target = target.unwrap();
                let e = if self.mesh.edge_has(e, EdgeFlags::OUTER) {
                    self.mesh.sym(e).unwrap()
                } else {
                    e
                };
                if boundary && self.mesh.can_collapse_edge(e, target) {
                    // The target was already stitched, so collapse the edge
                    // of the source mesh instead of merging the vertices.
                    self.edge_to_collapse = Some(e);
                } else {
                    log::info!("cannot collapse {source:?} to {target:?}");
                    return false;
                }
            }
        }
        true
    }

    fn merge_vertices(&mut self, source: VertexId, target: VertexId) {
        debug_assert!(source != target);
        let blend = self.blend_position(source, &self.mesh.point(target));
        match self.edge_to_collapse.take() {
            None => self.merger.merge(self.mesh, blend, &[source, target]),
            Some(edge) => {
                let t = edge.tri;
                if self.last_splitted1.is_some_and(|e| e.tri == t) {
                    self.last_splitted1 = None;
                }
                if self.last_splitted2.is_some_and(|e| e.tri == t) {
                    self.last_splitted2 = None;
                }
                let _ = self.to_project.remove(&edge);
                let _ = self.to_project.remove(&edge.next());
                let _ = self.to_project.remove(&edge.prev());
                self.mesh.move_vertex(target, blend);
                if let Err(err) = self.mesh.edge_collapse(edge, target) {
                    log::error!("edge collapse failed: {err}");
                }
                self.tree.remove(t);
            }
        }
        self.mesh.set_mutable(target, false);
    }

    fn split_triangle(&mut self, t: TriangleId, tp: &TriangleProjector) -> VertexId {
        let v = self.mesh.add_vertex(*tp.projection());
        let tris = self.mesh.split_triangle(t, v);
        self.tree.replace(self.mesh, t, &tris);
        let _ = self.swapper.swap(self.mesh, self.tree, v);
        v
    }

    /// Splits `to_split` at `v` and keeps the spatial index in sync.
    ///
    /// Returns the new boundary half-edge starting at `v` that continues
    /// `to_split`, or `None` when the edge cannot be split.
    fn split_edge_at(&mut self, to_split: HalfEdge, v: VertexId) -> Option<HalfEdge> {
        if self.mesh.edge_has(to_split, EdgeFlags::NONMANIFOLD) {
            log::info!("will not split the non-manifold edge {to_split:?}");
            return None;
        }
        let new_edge;
        if self.mesh.edge_has(to_split, EdgeFlags::BOUNDARY) {
            let t = to_split.tri;
            self.tree.remove(t);
            new_edge = match self.mesh.vertex_split(to_split, v) {
                Ok(e) => e,
                Err(err) => {
                    log::error!("vertex split failed: {err}");
                    self.tree.insert(self.mesh, t);
                    return None;
                }
            };
            self.tree.insert(self.mesh, to_split.tri);
            self.tree.insert(self.mesh, new_edge.tri);
        } else {
            let t1 = to_split.tri;
            let t2 = self.mesh.sym(to_split)?.tri;
            self.tree.remove(t1);
            self.tree.remove(t2);
            new_edge = match self.mesh.vertex_split(to_split, v) {
                Ok(e) => e,
                Err(err) => {
                    log::error!("vertex split failed: {err}");
                    self.tree.insert(self.mesh, t1);
                    self.tree.insert(self.mesh, t2);
                    return None;
                }
            };
            debug_assert!(self.mesh.destination(to_split) == v);
            debug_assert!(self.mesh.origin(new_edge) == v);
            for t in [
                to_split.tri,
                self.mesh.sym(to_split).unwrap().tri,
                new_edge.tri,
                self.mesh.sym(new_edge).unwrap().tri,
            ] {
                if !self.mesh.is_outer(t) {
                    self.tree.insert(self.mesh, t);
                }
            }
        }
        let _ = self.swapper.swap(self.mesh, self.tree, v);
        Some(new_edge)
    }

    fn split_edge_from_projector(&mut self, tp: &TriangleProjector) -> Option<VertexId> {
        let to_split = tp.edge();
        let v = self.mesh.add_vertex(*tp.projection());
        if self.split_edge_at(to_split, v).is_none() {
            self.discard_vertex(Some(v));
            return None;
        }
        Some(v)
    }

    /// Splits the source edge at `v1` and, when given, the candidate
    /// triangle's edge at `v2`, so both intersection points exist in the
    /// mesh before merging them.
    fn split_2_edges(
        &mut self,
        v1: VertexId,
        edge1: HalfEdge,
        v2: Option<VertexId>,
        edge2: Option<HalfEdge>,
    ) -> Option<HalfEdge> {
        debug_assert!(v1 != self.mesh.origin(edge1) && v1 != self.mesh.destination(edge1));
        self.check();
        let new_edge = self.split_edge_at(edge1, v1)?;
        self.check();
        if let (Some(v2), Some(edge2)) = (v2, edge2) {
            debug_assert!(v2 != self.mesh.origin(edge2) && v2 != self.mesh.destination(edge2));
            if self.split_edge_at(edge2, v2).is_none() {
                log::debug!("candidate edge {:?} declined to split at {:?}", edge2, v2);
            }
            self.check();
        }
        Some(new_edge)
    }

    /// The border edge of the same group that shares the destination of
    /// `edge`.
    fn next_border_edge(&self, edge: HalfEdge) -> Option<HalfEdge> {
        debug_assert!(self.mesh.edge_has(edge, EdgeFlags::BOUNDARY));
        let gid = self.mesh.triangle(edge.tri).group();
        let outer = self.mesh.outer_vertex();
        let mut current = edge.next();
        loop {
            if self.mesh.destination(current) == outer {
                return None;
            }
            if self.mesh.edge_has(current, EdgeFlags::BOUNDARY)
                && self.mesh.triangle(current.tri).group() == gid
            {
                debug_assert!(self.mesh.origin(current) == self.mesh.destination(edge));
                return Some(current);
            }
            current = self.mesh.sym(current)?.next();
        }
    }

    /// The border edge of the same group that shares the origin of `edge`.
    fn previous_border_edge(&self, edge: HalfEdge) -> Option<HalfEdge> {
        debug_assert!(self.mesh.edge_has(edge, EdgeFlags::BOUNDARY));
        let gid = self.mesh.triangle(edge.tri).group();
        let outer = self.mesh.outer_vertex();
        let mut current = edge.next().next();
        loop {
            if self.mesh.origin(current) == outer {
                return None;
            }
            if self.mesh.edge_has(current, EdgeFlags::BOUNDARY)
                && self.mesh.triangle(current.tri).group() == gid
            {
                debug_assert!(self.mesh.destination(current) == self.mesh.origin(edge));
                return Some(current);
            }
            current = self.mesh.sym(current)?.next().next();
        }
    }

    /// Fills `candidates` with the triangles the edge may be projected on.
    fn find_candidates(&mut self, edge: HalfEdge) {
        let origin = self.mesh.vertex(self.mesh.origin(edge)).is_mutable();
        let destination = self.mesh.vertex(self.mesh.destination(edge)).is_mutable();
        self.candidates.clear();
        // When neither endpoint is mutable both are already projected, but
        // the edge itself may still cross the target: only the out/out case
        // can resolve it.
        let not_projected =
            !origin && !destination && self.mesh.edge_has(edge, EdgeFlags::BOUNDARY);
        if (origin && destination) || not_projected {
            let p1 = self.mesh.point(self.mesh.origin(edge));
            let p2 = self.mesh.point(self.mesh.destination(edge));
            let mins = [p1.x.min(p2.x), p1.y.min(p2.y), p1.z.min(p2.z)];
            let maxs = [p1.x.max(p2.x), p1.y.max(p2.y), p1.z.max(p2.z)];
            let margin = if self.max_sqr_dist.is_finite() {
                self.max_sqr_dist.sqrt()
            } else {
                self.sqr_tol.sqrt()
            };
            self.tree.near_triangles(
                mins,
                maxs,
                margin,
                self.group,
                self.ignore_group,
                &mut self.candidates,
            );
        } else {
            // Exactly one endpoint is resolved: walk its fan instead of
            // querying the spatial index.
            let vv = if origin {
                self.mesh.destination(edge)
            } else {
                self.mesh.origin(edge)
            };
            for t in self.mesh.incident_triangles(vv) {
                let gid = self.mesh.triangle(t).group();
                let keep = if self.ignore_group {
                    self.group >= 0 && gid != self.group
                } else {
                    self.group >= 0 && gid == self.group
                };
                if keep {
                    self.candidates.push(t);
                }
            }
        }
    }

    /// Projects both endpoints on every candidate and sorts the candidates
    /// by increasing distance. Projecting to the closest triangle first is
    /// more robust than picking a random close one.
    fn project_to_closest(&mut self, edge: HalfEdge) {
        let origin = self.mesh.vertex(self.mesh.origin(edge)).is_mutable();
        let destination = self.mesh.vertex(self.mesh.destination(edge)).is_mutable();
        self.find_candidates(edge);
        self.helpers.clear();
        for &t in &self.candidates {
            self.helpers.push(TriangleHelper::new(self.mesh, t));
        }
        self.projector1_valid = origin || !destination;
        self.projector2_valid = destination || !origin;
        let n = self.candidates.len();
        for projectors in [&mut self.projectors1, &mut self.projectors2] {
            while projectors.len() < n {
                projectors.push(TriangleProjector {
                    sqr_max_distance: self.max_sqr_dist,
                    sqr_tolerance: self.sqr_tol,
                    boundary_only: self.boundary_only,
                    ..TriangleProjector::default()
                });
            }
        }
        if self.projector1_valid {
            let p = self.mesh.point(self.mesh.origin(edge));
            for k in 0..n {
                self.projectors1[k].reset();
                self.projectors1[k].project(self.mesh, &p, &self.helpers[k]);
            }
        }
        if self.projector2_valid {
            let p = self.mesh.point(self.mesh.destination(edge));
            for k in 0..n {
                self.projectors2[k].reset();
                self.projectors2[k].project(self.mesh, &p, &self.helpers[k]);
            }
        }
        self.order.clear();
        self.order.extend(0..n);
        let key = |projectors: &[TriangleProjector], valid: bool, i: usize| {
            if valid {
                projectors[i].sqr_distance()
            } else {
                Real::INFINITY
            }
        };
        let p1 = &self.projectors1;
        let p2 = &self.projectors2;
        let (v1, v2) = (self.projector1_valid, self.projector2_valid);
        self.order.sort_by(|&a, &b| {
            let da = key(p1, v1, a).min(key(p2, v2, a));
            let db = key(p1, v1, b).min(key(p2, v2, b));
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Applies the highest-priority geometric case matching the two
    /// endpoint classifications.
    #[allow(clippy::too_many_arguments)]
    fn dispatch_cases(
        &mut self,
        origin: bool,
        destination: bool,
        edge: HalfEdge,
        tri: TriangleId,
        tp1: &TriangleProjector,
        tp2: &TriangleProjector,
        helper: &TriangleHelper,
    ) {
        self.last_merge_source = None;
        self.last_merge_target = None;
        self.last_splitted1 = None;
        self.last_splitted2 = None;
        if tp1.kind() == ProjectionKind::Out && !destination {
            // Split an edge of the candidate and split the projected edge.
            let apex = self.mesh.destination(edge);
            self.splitter
                .split_apex(self.mesh, helper, apex, tp1.projection(), self.sqr_tol);
            let mut created_target = false;
            let mut target = self.splitter.split_vertex();
            if target.is_none() {
                if self.splitter.splitted_edge().is_some() {
                    target = Some(self.mesh.add_vertex(*self.splitter.split_point()));
                    created_target = true;
                }
            }
            let mut source = None;
            if let Some(t) = target {
                let (f, l) = triangle_helper::reverse_project(
                    tp1.projection(),
                    &self.mesh.point(self.mesh.origin(edge)),
                    &self.mesh.point(self.mesh.destination(edge)),
                    &self.mesh.point(t),
                );
                if l > self.max_sqr_dist {
                    if created_target {
                        self.discard_vertex(target);
                    }
                    target = None;
                } else {
                    source = Some(self.mesh.add_vertex(f));
                }
            }
            if let (Some(s), Some(t)) = (source, target) {
                if self.can_merge(s, &self.mesh.point(t), Some(t)) {
                    let splitted = self.splitter.splitted_edge();
                    if self.split_2_edges(s, edge, target, splitted).is_none() {
                        log::debug!("source edge {:?} declined to split, merging as is", edge);
                    }
                    self.last_merge_source = source;
                    self.last_merge_target = target;
                    self.last_splitted1 = Some(edge);
                } else {
                    self.discard_vertex(source);
                    if created_target {
                        self.discard_vertex(target);
                    }
                }
            }
        } else if tp2.kind() == ProjectionKind::Out && !origin {
            let apex = self.mesh.origin(edge);
            self.splitter
                .split_apex(self.mesh, helper, apex, tp2.projection(), self.sqr_tol);
            let mut created_target = false;
            let mut target = self.splitter.split_vertex();
            if target.is_none() {
                if self.splitter.splitted_edge().is_some() {
                    target = Some(self.mesh.add_vertex(*self.splitter.split_point()));
                    created_target = true;
                }
            }
            let mut source = None;
            if let Some(t) = target {
                let (f, l) = triangle_helper::reverse_project(
                    tp2.projection(),
                    &self.mesh.point(self.mesh.destination(edge)),
                    &self.mesh.point(self.mesh.origin(edge)),
                    &self.mesh.point(t),
                );
                if l > self.max_sqr_dist {
                    if created_target {
                        self.discard_vertex(target);
                    }
                    target = None;
                } else {
                    source = Some(self.mesh.add_vertex(f));
                }
            }
            if let (Some(s), Some(t)) = (source, target) {
                if self.can_merge(s, &self.mesh.point(t), Some(t)) {
                    let splitted = self.splitter.splitted_edge();
                    if self.split_2_edges(s, edge, target, splitted).is_none() {
                        log::debug!("source edge {:?} declined to split, merging as is", edge);
                    }
                    self.last_merge_source = source;
                    self.last_merge_target = target;
                    self.last_splitted2 = self.next_border_edge(edge);
                } else {
                    self.discard_vertex(source);
                    if created_target {
                        self.discard_vertex(target);
                    }
                }
            }
        } else if origin && tp1.kind() == ProjectionKind::Vertex {
            self.last_merge_source = Some(self.mesh.origin(edge));
            self.last_merge_target = Some(tp1.vertex());
            self.last_splitted1 = Some(edge);
            self.last_splitted2 = self.previous_border_edge(edge);
        } else if destination && tp2.kind() == ProjectionKind::Vertex {
            self.last_merge_source = Some(self.mesh.destination(edge));
            self.last_merge_target = Some(tp2.vertex());
            self.last_splitted1 = Some(edge);
            self.last_splitted2 = self.next_border_edge(edge);
        } else if origin && tp1.kind() == ProjectionKind::Face {
            let source = self.mesh.origin(edge);
            if self.can_merge(source, tp1.projection(), None) {
                self.last_merge_source = Some(source);
                self.last_merge_target = Some(self.split_triangle(tri, tp1));
                self.last_splitted1 = Some(edge);
                self.last_splitted2 = self.previous_border_edge(edge);
            }
        } else if destination && tp2.kind() == ProjectionKind::Face {
            let source = self.mesh.destination(edge);
            if self.can_merge(source, tp2.projection(), None) {
                self.last_merge_source = Some(source);
                self.last_merge_target = Some(self.split_triangle(tri, tp2));
                self.last_splitted1 = Some(edge);
                self.last_splitted2 = self.next_border_edge(edge);
            }
        } else if origin && tp1.kind() == ProjectionKind::Edge {
            let source = self.mesh.origin(edge);
            if self.can_merge(source, tp1.projection(), None) {
                self.last_merge_source = Some(source);
                self.last_merge_target = self.split_edge_from_projector(tp1);
                self.last_splitted1 = Some(edge);
                self.last_splitted2 = self.previous_border_edge(edge);
            }
        } else if destination && tp2.kind() == ProjectionKind::Edge {
            let source = self.mesh.destination(edge);
            if self.can_merge(source, tp2.projection(), None) {
                self.last_merge_source = Some(source);
                self.last_merge_target = self.split_edge_from_projector(tp2);
                self.last_splitted1 = Some(edge);
                self.last_splitted2 = self.next_border_edge(edge);
            }
        }
        self.revalidate_merge();
    }

    /// The final re-validation: a case may have split the mesh in a way
    /// that makes the queued merge invalid, in which case it is cancelled
    /// and the next candidate is tried.
    fn revalidate_merge(&mut self) {
        if let (Some(s), Some(t)) = (self.last_merge_source, self.last_merge_target) {
            if !self.can_merge(s, &self.mesh.point(t), Some(t)) {
                self.last_merge_target = None;
            }
        }
    }

    /// The low-priority fallback when both endpoints project out of every
    /// candidate: intersect the projected edge with the candidate edges.
    fn handle_out_out(
        &mut self,
        edge: HalfEdge,
        tp1: &TriangleProjector,
        tp2: &TriangleProjector,
        helper: &TriangleHelper,
    ) {
        self.last_merge_source = None;
        self.last_merge_target = None;
        if tp1.kind() != ProjectionKind::Out || tp2.kind() != ProjectionKind::Out {
            return;
        }
        let p1 = *tp1.projection();
        let p2 = *tp2.projection();
        // The edge may cut two edges of the candidate; only one crossing is
        // inserted per pass.
        self.splitter.split(self.mesh, helper, &p1, &p2, self.sqr_tol);
        let mut created_target = false;
        let mut target = self.splitter.split_vertex();
        if target.is_none() && self.splitter.splitted_edge().is_some() {
            target = Some(self.mesh.add_vertex(*self.splitter.split_point()));
            created_target = true;
        }
        let mut source = None;
        if let Some(t) = target {
            let (f, l) = triangle_helper::reverse_project(
                &p2,
                &self.mesh.point(self.mesh.destination(edge)),
                &self.mesh.point(self.mesh.origin(edge)),
                &self.mesh.point(t),
            );
            if l > self.max_sqr_dist {
                if created_target {
                    self.discard_vertex(target);
                }
                target = None;
            } else {
                source = Some(self.mesh.add_vertex(f));
            }
        }
        if let (Some(s), Some(_)) = (source, target) {
            let splitted = self.splitter.splitted_edge();
            if let Some(new_edge) = self.split_2_edges(s, edge, target, splitted) {
                self.last_merge_source = source;
                self.last_merge_target = target;
                self.last_splitted1 = Some(edge);
                self.last_splitted2 = Some(new_edge);
            } else {
                self.discard_vertex(source);
                if created_target {
                    self.discard_vertex(target);
                }
            }
        }
        self.revalidate_merge();
    }

    /// Performs the queued merge and re-queues the freshly split boundary
    /// edges. Returns true when a merge happened.
    fn merge_and_finish(&mut self) -> bool {
        let Some(target) = self.last_merge_target else {
            return false;
        };
        let source = self.last_merge_source.unwrap();
        if source == target {
            log::info!("something strange happened around {source:?}");
            return false;
        }
        debug_assert!(
            na::distance_squared(&self.mesh.point(source), &self.mesh.point(target))
                < self.max_sqr_dist * 2.0
        );
        self.check();
        self.merge_vertices(source, target);
        self.check();
        for ls in [self.last_splitted1, self.last_splitted2] {
            if let Some(ls) = ls {
                if self.mesh.contains_triangle(ls.tri)
                    && self.mesh.edge_has(ls, EdgeFlags::BOUNDARY)
                    && self.is_to_project(ls)
                {
                    let _ = self.half_inserted.push(ls);
                }
            }
        }
        true
    }

    fn project_edge(&mut self, edge: HalfEdge) {
        let origin = self.mesh.vertex(self.mesh.origin(edge)).is_mutable();
        let destination = self.mesh.vertex(self.mesh.destination(edge)).is_mutable();
        self.project_to_closest(edge);
        let n = self.candidates.len();
        let far = TriangleProjector::default();
        for i in 0..n {
            let index = self.order[i];
            let tp1 = if self.projector1_valid {
                self.projectors1[index].clone()
            } else {
                far.clone()
            };
            let tp2 = if self.projector2_valid {
                self.projectors2[index].clone()
            } else {
                far.clone()
            };
            let helper = self.helpers[index].clone();
            self.check();
            self.dispatch_cases(
                origin,
                destination,
                edge,
                helper.triangle(),
                &tp1,
                &tp2,
                &helper,
            );
            self.check();
            if self.merge_and_finish() {
                return;
            }
        }
        // The out/out case has a lower priority than the other cases, so it
        // runs in a separate loop after all of them.
        if origin && destination {
            for i in 0..n {
                let index = self.order[i];
                let tp1 = self.projectors1[index].clone();
                let tp2 = self.projectors2[index].clone();
                let helper = self.helpers[index].clone();
                self.handle_out_out(edge, &tp1, &tp2, &helper);
                if self.merge_and_finish() {
                    return;
                }
            }
        }
    }
}
