use super::{
    triangle_normal, EdgeFlags, HalfEdge, Triangle, TriangleId, Vertex, VertexId, VertexLink,
    NO_GROUP,
};
use crate::math::Point;
use indexmap::IndexMap;
use slab::Slab;
use smallvec::SmallVec;

/// A triangulated surface with explicit adjacency.
///
/// The surface does not have to be connected, closed, nor manifold. After
/// [`Mesh::build_adjacency`] every half-edge of a surface triangle is glued
/// to a symmetric half-edge, possibly belonging to a scaffold triangle if
/// the edge is on a boundary or on a non-manifold junction.
pub struct Mesh {
    vertices: Slab<Vertex>,
    triangles: Slab<Triangle>,
    outer_vertex: VertexId,
    max_group: i32,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    /// Creates an empty mesh.
    ///
    /// The reserved outer vertex is created eagerly so its handle is stable
    /// for the whole lifetime of the mesh.
    pub fn new() -> Self {
        let mut vertices = Slab::new();
        let outer = vertices.insert(Vertex {
            pos: Point::origin(),
            link: VertexLink::Isolated,
            mutable: false,
        });
        Mesh {
            vertices,
            triangles: Slab::new(),
            outer_vertex: VertexId(outer as u32),
            max_group: NO_GROUP,
        }
    }

    /// The reserved vertex used as the apex of scaffold triangles.
    pub fn outer_vertex(&self) -> VertexId {
        self.outer_vertex
    }

    /*
     * Vertices.
     */

    /// Adds a new, isolated, mutable vertex.
    pub fn add_vertex(&mut self, pos: Point) -> VertexId {
        VertexId(self.vertices.insert(Vertex {
            pos,
            link: VertexLink::Isolated,
            mutable: true,
        }) as u32)
    }

    /// Adds a new vertex at the same position as an existing one.
    pub fn duplicate_vertex(&mut self, v: VertexId) -> VertexId {
        let pos = self.vertices[v.0 as usize].pos;
        self.add_vertex(pos)
    }

    /// Removes an isolated vertex.
    pub fn remove_vertex(&mut self, v: VertexId) {
        debug_assert!(matches!(
            self.vertices[v.0 as usize].link,
            VertexLink::Isolated
        ));
        let _ = self.vertices.remove(v.0 as usize);
    }

    /// A reference to a vertex.
    pub fn vertex(&self, v: VertexId) -> &Vertex {
        &self.vertices[v.0 as usize]
    }

    /// The position of a vertex.
    pub fn point(&self, v: VertexId) -> Point {
        self.vertices[v.0 as usize].pos
    }

    /// Moves a vertex without any validity check.
    pub fn move_vertex(&mut self, v: VertexId, pos: Point) {
        self.vertices[v.0 as usize].pos = pos;
    }

    /// Marks a vertex as pinned or movable by the stitching process.
    pub fn set_mutable(&mut self, v: VertexId, mutable: bool) {
        self.vertices[v.0 as usize].mutable = mutable;
    }

    pub(crate) fn set_link(&mut self, v: VertexId, link: VertexLink) {
        self.vertices[v.0 as usize].link = link;
    }

    /// The number of vertices, including the outer vertex.
    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Iterates through the handles of all the vertices, outer vertex
    /// excluded.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        let outer = self.outer_vertex;
        self.vertices
            .iter()
            .map(|(i, _)| VertexId(i as u32))
            .filter(move |&v| v != outer)
    }

    /*
     * Triangles.
     */

    /// Adds a triangle with no adjacency information.
    pub fn add_triangle(&mut self, v: [VertexId; 3], group: i32) -> TriangleId {
        self.max_group = self.max_group.max(group);
        TriangleId(self.triangles.insert(Triangle {
            v,
            sym: [None; 3],
            flags: [EdgeFlags::empty(); 3],
            group,
        }) as u32)
    }

    /// Removes a triangle, ungluing all its sides.
    ///
    /// The links of its vertices are left untouched: the caller is expected
    /// to rebuild them.
    pub fn remove_triangle(&mut self, t: TriangleId) {
        for side in 0..3 {
            if let Some(s) = self.triangles[t.0 as usize].sym[side] {
                self.triangles[s.tri.0 as usize].sym[s.side as usize] = None;
            }
        }
        let _ = self.triangles.remove(t.0 as usize);
    }

    /// Does this handle reference a live triangle?
    pub fn contains_triangle(&self, t: TriangleId) -> bool {
        self.triangles.contains(t.0 as usize)
    }

    /// A reference to a triangle.
    pub fn triangle(&self, t: TriangleId) -> &Triangle {
        &self.triangles[t.0 as usize]
    }

    /// Is this triangle a scaffold triangle?
    pub fn is_outer(&self, t: TriangleId) -> bool {
        self.triangles[t.0 as usize].flags[0].contains(EdgeFlags::OUTER)
    }

    /// The number of triangles, scaffolds included.
    pub fn n_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Iterates through the handles of all the triangles, scaffolds included.
    pub fn triangle_ids(&self) -> impl Iterator<Item = TriangleId> + '_ {
        self.triangles.iter().map(|(i, _)| TriangleId(i as u32))
    }

    /// Iterates through the handles of all the surface (non-scaffold)
    /// triangles.
    pub fn surface_triangle_ids(&self) -> impl Iterator<Item = TriangleId> + '_ {
        self.triangles
            .iter()
            .filter(|(_, t)| !t.flags[0].contains(EdgeFlags::OUTER))
            .map(|(i, _)| TriangleId(i as u32))
    }

    /// Changes the group of a triangle.
    pub fn set_group(&mut self, t: TriangleId, group: i32) {
        self.max_group = self.max_group.max(group);
        self.triangles[t.0 as usize].group = group;
    }

    /// A group id that no triangle of this mesh uses.
    pub fn next_free_group(&self) -> i32 {
        self.max_group + 1
    }

    /// The non-normalized normal of a surface triangle.
    pub fn normal(&self, t: TriangleId) -> crate::math::Vector {
        let tri = &self.triangles[t.0 as usize];
        triangle_normal(
            &self.point(tri.v[0]),
            &self.point(tri.v[1]),
            &self.point(tri.v[2]),
        )
    }

    /*
     * Half-edge navigation.
     */

    /// The origin vertex of a half-edge.
    pub fn origin(&self, e: HalfEdge) -> VertexId {
        self.triangles[e.tri.0 as usize].v[e.side as usize]
    }

    /// The destination vertex of a half-edge.
    pub fn destination(&self, e: HalfEdge) -> VertexId {
        self.triangles[e.tri.0 as usize].v[(e.side as usize + 1) % 3]
    }

    /// The vertex of the triangle of a half-edge that is not on the edge.
    pub fn apex(&self, e: HalfEdge) -> VertexId {
        self.triangles[e.tri.0 as usize].v[(e.side as usize + 2) % 3]
    }

    /// The half-edge glued to the given one, on the neighboring triangle.
    pub fn sym(&self, e: HalfEdge) -> Option<HalfEdge> {
        self.triangles[e.tri.0 as usize].sym[e.side as usize]
    }

    /// The attributes of a half-edge.
    pub fn flags(&self, e: HalfEdge) -> EdgeFlags {
        self.triangles[e.tri.0 as usize].flags[e.side as usize]
    }

    /// Does this half-edge have any of the given attributes?
    pub fn edge_has(&self, e: HalfEdge, flags: EdgeFlags) -> bool {
        self.flags(e).intersects(flags)
    }

    /// Adds attributes to a half-edge.
    pub fn insert_flags(&mut self, e: HalfEdge, flags: EdgeFlags) {
        self.triangles[e.tri.0 as usize].flags[e.side as usize] |= flags;
    }

    /// Removes attributes from a half-edge.
    pub fn remove_flags(&mut self, e: HalfEdge, flags: EdgeFlags) {
        self.triangles[e.tri.0 as usize].flags[e.side as usize] &= !flags;
    }

    pub(crate) fn set_flags(&mut self, e: HalfEdge, flags: EdgeFlags) {
        self.triangles[e.tri.0 as usize].flags[e.side as usize] = flags;
    }

    /// Glues two half-edges to each other.
    pub fn glue(&mut self, e1: HalfEdge, e2: HalfEdge) {
        debug_assert!(self.origin(e1) == self.destination(e2));
        debug_assert!(self.destination(e1) == self.origin(e2));
        self.triangles[e1.tri.0 as usize].sym[e1.side as usize] = Some(e2);
        self.triangles[e2.tri.0 as usize].sym[e2.side as usize] = Some(e1);
    }

    /// Unglues a half-edge and its symmetric counterpart, if any.
    pub fn unglue(&mut self, e: HalfEdge) {
        if let Some(s) = self.triangles[e.tri.0 as usize].sym[e.side as usize].take() {
            self.triangles[s.tri.0 as usize].sym[s.side as usize] = None;
        }
    }

    pub(crate) fn set_sym(&mut self, e: HalfEdge, sym: Option<HalfEdge>) {
        self.triangles[e.tri.0 as usize].sym[e.side as usize] = sym;
    }

    pub(crate) fn set_triangle_vertex(&mut self, t: TriangleId, i: usize, v: VertexId) {
        self.triangles[t.0 as usize].v[i] = v;
    }

    /*
     * Fans and links.
     */

    /// All the surface triangles of the fan of `v` that contains `seed`.
    ///
    /// The walk crosses glued edges but never enters scaffold triangles, so
    /// boundary and non-manifold edges stop it.
    pub fn expand_fan(&self, v: VertexId, seed: TriangleId) -> Vec<TriangleId> {
        debug_assert!(!self.is_outer(seed));
        let mut fan = vec![seed];
        let mut stack = vec![seed];
        while let Some(t) = stack.pop() {
            for side in 0..3u8 {
                let e = HalfEdge::new(t, side);
                if self.origin(e) != v && self.destination(e) != v {
                    continue;
                }
                if let Some(s) = self.sym(e) {
                    if !self.is_outer(s.tri) && !fan.contains(&s.tri) {
                        fan.push(s.tri);
                        stack.push(s.tri);
                    }
                }
            }
        }
        fan
    }

    /// All the surface triangles containing `v`, across all its fans.
    pub fn incident_triangles(&self, v: VertexId) -> Vec<TriangleId> {
        match &self.vertices[v.0 as usize].link {
            VertexLink::Isolated => Vec::new(),
            VertexLink::Manifold(t) => self.expand_fan(v, *t),
            VertexLink::NonManifold(reps) => {
                let mut result = Vec::new();
                for rep in reps {
                    for t in self.expand_fan(v, *rep) {
                        if !result.contains(&t) {
                            result.push(t);
                        }
                    }
                }
                result
            }
        }
    }

    /// All the half-edges whose origin is `v`.
    ///
    /// This includes the base edges of the scaffolds attached to boundary
    /// edges ending at `v`, so that every neighbor of `v` is the destination
    /// of exactly one of the returned half-edges.
    pub fn half_edges_from(&self, v: VertexId) -> Vec<HalfEdge> {
        let mut result = Vec::new();
        for t in self.incident_triangles(v) {
            let tri = &self.triangles[t.0 as usize];
            if let Some(side) = tri.side_with_origin(v) {
                result.push(HalfEdge::new(t, side));
            }
            // The side ending at v; its sym is a scaffold base starting at v
            // when the edge is a boundary or a junction.
            for side in 0..3u8 {
                let e = HalfEdge::new(t, side);
                if self.destination(e) == v {
                    if let Some(s) = self.sym(e) {
                        if self.is_outer(s.tri) {
                            result.push(s);
                        }
                    }
                }
            }
        }
        result
    }

    /// The half-edge going from `va` to `vb`, if any.
    ///
    /// Scaffold base edges are considered, so a boundary edge is found in
    /// both directions.
    pub fn half_edge_between(&self, va: VertexId, vb: VertexId) -> Option<HalfEdge> {
        self.half_edges_from(va)
            .into_iter()
            .find(|&e| self.destination(e) == vb)
    }

    /// The endpoints of a half-edge, as an orientation-independent key.
    pub(crate) fn edge_key(&self, e: HalfEdge) -> (VertexId, VertexId) {
        let (o, d) = (self.origin(e), self.destination(e));
        if o < d {
            (o, d)
        } else {
            (d, o)
        }
    }

    /// Recomputes the link of `v`, given at least one incident surface
    /// triangle per fan.
    pub fn rebuild_link(&mut self, v: VertexId, seeds: &[TriangleId]) {
        let mut reps: SmallVec<[TriangleId; 2]> = SmallVec::new();
        let mut visited: Vec<TriangleId> = Vec::new();
        for &seed in seeds {
            if self.is_outer(seed) || !self.triangles[seed.0 as usize].contains(v) {
                continue;
            }
            if visited.contains(&seed) {
                continue;
            }
            let fan = self.expand_fan(v, seed);
            visited.extend_from_slice(&fan);
            reps.push(seed);
        }
        let link = match reps.len() {
            0 => VertexLink::Isolated,
            1 => VertexLink::Manifold(reps[0]),
            _ => VertexLink::NonManifold(reps),
        };
        self.vertices[v.0 as usize].link = link;
    }

    /// Recomputes the links of a set of vertices from an incidence map.
    pub fn rebuild_vertex_links(&mut self, map: &IndexMap<VertexId, Vec<TriangleId>>) {
        for (&v, tris) in map {
            self.rebuild_link(v, tris);
        }
    }

    /*
     * Adjacency.
     */

    /// Creates the scaffold triangle glued to `e` and returns its handle.
    ///
    /// Both `e` and the scaffold base receive `flag` in addition to the
    /// `OUTER` attribute carried by every scaffold edge.
    pub fn add_scaffold(&mut self, e: HalfEdge, flag: EdgeFlags) -> TriangleId {
        let o = self.origin(e);
        let d = self.destination(e);
        let t = self.add_triangle([self.outer_vertex, d, o], NO_GROUP);
        for side in 0..3u8 {
            self.set_flags(HalfEdge::new(t, side), EdgeFlags::OUTER);
        }
        let base = HalfEdge::new(t, 1); // d -> o
        self.insert_flags(base, flag);
        self.insert_flags(e, flag);
        self.glue(e, base);
        t
    }

    /// Computes the symmetry relation of every half-edge, creates the
    /// scaffold triangles, and rebuilds all vertex links.
    ///
    /// Edges shared by exactly two triangles are glued pairwise. Edges with
    /// a single incident triangle become `BOUNDARY` edges and edges shared
    /// by three or more triangles become `NONMANIFOLD` edges; both get one
    /// scaffold per incident half-edge.
    pub fn build_adjacency(&mut self) {
        let mut buckets: IndexMap<(VertexId, VertexId), SmallVec<[HalfEdge; 2]>> = IndexMap::new();
        for (i, tri) in self.triangles.iter() {
            debug_assert!(!tri.flags[0].contains(EdgeFlags::OUTER));
            for side in 0..3u8 {
                let e = HalfEdge::new(TriangleId(i as u32), side);
                buckets.entry(self.edge_key(e)).or_default().push(e);
            }
        }

        for (_, edges) in buckets {
            match edges.len() {
                2 if self.origin(edges[0]) == self.destination(edges[1]) => {
                    self.glue(edges[0], edges[1]);
                }
                1 => {
                    let _ = self.add_scaffold(edges[0], EdgeFlags::BOUNDARY);
                }
                _ => {
                    // Junction edge, or two triangles with incompatible
                    // orientations. No pairwise gluing.
                    for e in edges {
                        let _ = self.add_scaffold(e, EdgeFlags::NONMANIFOLD);
                    }
                }
            }
        }

        self.rebuild_all_links();
    }

    /// Removes every scaffold triangle and all adjacency information.
    pub fn clear_adjacency(&mut self) {
        let outer: Vec<TriangleId> = self
            .triangle_ids()
            .filter(|&t| self.is_outer(t))
            .collect();
        for t in outer {
            self.remove_triangle(t);
        }
        for (_, tri) in self.triangles.iter_mut() {
            tri.sym = [None; 3];
            tri.flags = [EdgeFlags::empty(); 3];
        }
        for (_, v) in self.vertices.iter_mut() {
            v.link = VertexLink::Isolated;
        }
    }

    fn rebuild_all_links(&mut self) {
        let mut incidence: IndexMap<VertexId, Vec<TriangleId>> = IndexMap::new();
        for (i, tri) in self.triangles.iter() {
            if tri.flags[0].contains(EdgeFlags::OUTER) {
                continue;
            }
            for &v in &tri.v {
                incidence.entry(v).or_default().push(TriangleId(i as u32));
            }
        }
        for (_, v) in self.vertices.iter_mut() {
            v.link = VertexLink::Isolated;
        }
        self.rebuild_vertex_links(&incidence);
    }

    /*
     * Validity checks.
     */

    /// Checks the structural invariants of the mesh, logging any violation.
    ///
    /// This is intended for tests and debugging: it is slow.
    pub fn is_valid(&self) -> bool {
        let mut ok = true;
        for (i, tri) in self.triangles.iter() {
            let t = TriangleId(i as u32);
            for side in 0..3u8 {
                let e = HalfEdge::new(t, side);
                if let Some(s) = self.sym(e) {
                    if self.sym(s) != Some(e) {
                        log::error!("non-involutive sym on {:?}", e);
                        ok = false;
                    }
                    if self.origin(e) != self.destination(s)
                        || self.destination(e) != self.origin(s)
                    {
                        log::error!("mismatched endpoints between {:?} and {:?}", e, s);
                        ok = false;
                    }
                } else if !tri.flags[0].contains(EdgeFlags::OUTER) {
                    log::error!("unglued surface edge {:?}", e);
                    ok = false;
                }
                if self.edge_has(e, EdgeFlags::BOUNDARY | EdgeFlags::NONMANIFOLD)
                    && !self.edge_has(e, EdgeFlags::OUTER)
                {
                    match self.sym(e) {
                        Some(s) if self.is_outer(s.tri) => {}
                        _ => {
                            log::error!("boundary edge {:?} without scaffold", e);
                            ok = false;
                        }
                    }
                }
            }
        }
        for (i, v) in self.vertices.iter() {
            let vid = VertexId(i as u32);
            let tris: SmallVec<[TriangleId; 2]> = match &v.link {
                VertexLink::Isolated => SmallVec::new(),
                VertexLink::Manifold(t) => smallvec::smallvec![*t],
                VertexLink::NonManifold(reps) => reps.clone(),
            };
            for t in tris {
                if !self.triangles.contains(t.0 as usize) {
                    log::error!("link of {:?} references removed triangle {:?}", vid, t);
                    ok = false;
                } else if !self.triangle(t).contains(vid) {
                    log::error!("link of {:?} references foreign triangle {:?}", vid, t);
                    ok = false;
                }
            }
        }
        ok
    }

    /// Checks that no surface triangle has a zero area.
    pub fn check_no_degenerate_triangles(&self) -> bool {
        let mut ok = true;
        for t in self.surface_triangle_ids() {
            if self.normal(t).norm_squared() == 0.0 {
                log::error!("degenerate triangle {:?}: {:?}", t, self.triangle(t).v);
                ok = false;
            }
        }
        ok
    }

    /// Checks that no surface triangle is folded back onto its neighbor.
    ///
    /// Two surface triangles glued through a manifold interior edge must not
    /// have opposing normals.
    pub fn check_no_inverted_triangles(&self) -> bool {
        let mut ok = true;
        for t in self.surface_triangle_ids() {
            for side in 0..3u8 {
                let e = HalfEdge::new(t, side);
                if self
                    .edge_has(e, EdgeFlags::BOUNDARY | EdgeFlags::NONMANIFOLD | EdgeFlags::OUTER)
                {
                    continue;
                }
                match self.sym(e) {
                    // Each glued pair is inspected once.
                    Some(s) if !self.is_outer(s.tri) && s.tri.0 > t.0 => {
                        if self.normal(t).dot(&self.normal(s.tri)) < 0.0 {
                            log::error!("inverted triangles across {:?} and {:?}", e, s);
                            ok = false;
                        }
                    }
                    _ => {}
                }
            }
        }
        ok
    }
}

#[cfg(test)]
mod test {
    use super::Mesh;
    use crate::math::Point;
    use crate::mesh::{EdgeFlags, HalfEdge, VertexLink};

    fn two_triangle_strip() -> (Mesh, [crate::mesh::VertexId; 4]) {
        let mut mesh = Mesh::new();
        let v0 = mesh.add_vertex(Point::new(0.0, 0.0, 0.0));
        let v1 = mesh.add_vertex(Point::new(1.0, 0.0, 0.0));
        let v2 = mesh.add_vertex(Point::new(0.0, 1.0, 0.0));
        let v3 = mesh.add_vertex(Point::new(1.0, 1.0, 0.0));
        let _ = mesh.add_triangle([v0, v1, v2], 0);
        let _ = mesh.add_triangle([v2, v1, v3], 0);
        mesh.build_adjacency();
        (mesh, [v0, v1, v2, v3])
    }

    #[test]
    fn adjacency_of_strip() {
        let (mesh, [v0, v1, v2, v3]) = two_triangle_strip();
        assert!(mesh.is_valid());
        // The shared edge is glued surface to surface.
        let shared = mesh.half_edge_between(v1, v2).unwrap();
        let sym = mesh.sym(shared).unwrap();
        assert!(!mesh.is_outer(sym.tri));
        assert!(!mesh.edge_has(shared, EdgeFlags::BOUNDARY));
        // The four other edges are boundary edges glued to scaffolds.
        for (a, b) in [(v0, v1), (v2, v0), (v1, v3), (v3, v2)] {
            let e = mesh.half_edge_between(a, b).unwrap();
            assert!(mesh.edge_has(e, EdgeFlags::BOUNDARY));
            let s = mesh.sym(e).unwrap();
            assert!(mesh.is_outer(s.tri));
            assert!(mesh.edge_has(s, EdgeFlags::BOUNDARY));
        }
        // 2 surface triangles + 4 scaffolds.
        assert_eq!(mesh.n_triangles(), 6);
        assert_eq!(mesh.surface_triangle_ids().count(), 2);
    }

    #[test]
    fn folded_triangle_is_reported_as_inverted() {
        let (mesh, _) = two_triangle_strip();
        assert!(mesh.check_no_inverted_triangles());

        // The second triangle folds back over the first one.
        let mut mesh = Mesh::new();
        let v0 = mesh.add_vertex(Point::new(0.0, 0.0, 0.0));
        let v1 = mesh.add_vertex(Point::new(1.0, 0.0, 0.0));
        let v2 = mesh.add_vertex(Point::new(0.0, 1.0, 0.0));
        let v3 = mesh.add_vertex(Point::new(0.2, 0.2, 0.0));
        let _ = mesh.add_triangle([v0, v1, v2], 0);
        let _ = mesh.add_triangle([v1, v0, v3], 0);
        mesh.build_adjacency();
        assert!(mesh.is_valid());
        assert!(mesh.check_no_degenerate_triangles());
        assert!(!mesh.check_no_inverted_triangles());
    }

    #[test]
    fn fans_and_links() {
        let (mesh, [v0, _, v2, _]) = two_triangle_strip();
        assert!(matches!(mesh.vertex(v2).link(), VertexLink::Manifold(_)));
        assert_eq!(mesh.incident_triangles(v2).len(), 2);
        assert_eq!(mesh.incident_triangles(v0).len(), 1);
        // v2 has 3 neighbors: v0, v1, v3.
        assert_eq!(mesh.half_edges_from(v2).len(), 3);
    }

    #[test]
    fn junction_edge_is_not_glued_pairwise() {
        let mut mesh = Mesh::new();
        let v0 = mesh.add_vertex(Point::new(0.0, 0.0, 0.0));
        let v1 = mesh.add_vertex(Point::new(0.0, 1.0, 0.0));
        let a = mesh.add_vertex(Point::new(1.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point::new(-1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point::new(0.0, 0.0, 1.0));
        let t0 = mesh.add_triangle([v0, v1, a], 0);
        let t1 = mesh.add_triangle([v1, v0, b], 0);
        let t2 = mesh.add_triangle([v1, v0, c], 0);
        mesh.build_adjacency();
        assert!(mesh.is_valid());
        // In each triangle, the side joining v0 and v1 is a junction edge
        // glued to its own scaffold.
        for t in [t0, t1, t2] {
            let junction = (0..3u8)
                .map(|side| HalfEdge::new(t, side))
                .find(|&e| {
                    (mesh.origin(e) == v0 && mesh.destination(e) == v1)
                        || (mesh.origin(e) == v1 && mesh.destination(e) == v0)
                })
                .unwrap();
            assert!(mesh.edge_has(junction, EdgeFlags::NONMANIFOLD));
            let s = mesh.sym(junction).unwrap();
            assert!(mesh.is_outer(s.tri));
        }
    }

    #[test]
    fn clear_and_rebuild_adjacency() {
        let (mut mesh, _) = two_triangle_strip();
        mesh.clear_adjacency();
        assert_eq!(mesh.n_triangles(), 2);
        mesh.build_adjacency();
        assert!(mesh.is_valid());
        assert_eq!(mesh.n_triangles(), 6);
    }
}
