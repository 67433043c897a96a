use crate::math::Real;
use crate::mesh::{Mesh, TriangleId};
use indexmap::IndexMap;
use rstar::{RTree, RTreeObject, AABB};

/// One triangle of the mesh, as stored in the R-tree.
#[derive(Clone, Debug, PartialEq)]
struct TriangleEntry {
    tid: TriangleId,
    group: i32,
    envelope: AABB<[Real; 3]>,
}

impl RTreeObject for TriangleEntry {
    type Envelope = AABB<[Real; 3]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// An R-tree over the surface triangles of a mesh.
///
/// The tree is kept up to date explicitly by the surgery callers: a split or
/// collapsed triangle must be removed and its replacements inserted. Each
/// entry remembers the envelope it was inserted with, so a triangle can be
/// removed even after its vertices moved.
pub struct TriangleRTree {
    tree: RTree<TriangleEntry>,
    entries: IndexMap<TriangleId, TriangleEntry>,
}

fn triangle_envelope(mesh: &Mesh, tid: TriangleId) -> AABB<[Real; 3]> {
    let vs = mesh.triangle(tid).vertices();
    let mut mins = [Real::INFINITY; 3];
    let mut maxs = [Real::NEG_INFINITY; 3];
    for v in vs {
        let p = mesh.point(v);
        for i in 0..3 {
            mins[i] = mins[i].min(p[i]);
            maxs[i] = maxs[i].max(p[i]);
        }
    }
    AABB::from_corners(mins, maxs)
}

impl TriangleRTree {
    /// Builds the tree from every surface triangle of the mesh.
    pub fn new(mesh: &Mesh) -> Self {
        let mut entries = IndexMap::new();
        let objects: Vec<TriangleEntry> = mesh
            .surface_triangle_ids()
            .map(|tid| {
                let entry = TriangleEntry {
                    tid,
                    group: mesh.triangle(tid).group(),
                    envelope: triangle_envelope(mesh, tid),
                };
                let _ = entries.insert(tid, entry.clone());
                entry
            })
            .collect();
        TriangleRTree {
            tree: RTree::bulk_load(objects),
            entries,
        }
    }

    /// Inserts one triangle.
    pub fn insert(&mut self, mesh: &Mesh, tid: TriangleId) {
        debug_assert!(!mesh.is_outer(tid));
        let entry = TriangleEntry {
            tid,
            group: mesh.triangle(tid).group(),
            envelope: triangle_envelope(mesh, tid),
        };
        if let Some(old) = self.entries.insert(tid, entry.clone()) {
            let _ = self.tree.remove(&old);
        }
        self.tree.insert(entry);
    }

    /// Removes one triangle, if present.
    pub fn remove(&mut self, tid: TriangleId) {
        if let Some(entry) = self.entries.swap_remove(&tid) {
            let _ = self.tree.remove(&entry);
        }
    }

    /// Removes `old` and inserts its replacements.
    pub fn replace(&mut self, mesh: &Mesh, old: TriangleId, new: &[TriangleId]) {
        self.remove(old);
        for &tid in new {
            self.insert(mesh, tid);
        }
    }

    /// The number of indexed triangles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the tree empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collects the triangles whose envelope intersects the given box grown
    /// by `margin`.
    ///
    /// If `ignore_group` is `false`, only triangles of `group` are returned;
    /// if it is `true`, only triangles of other groups are. A negative
    /// `group` disables the filter altogether.
    pub fn near_triangles(
        &self,
        mins: [Real; 3],
        maxs: [Real; 3],
        margin: Real,
        group: i32,
        ignore_group: bool,
        out: &mut Vec<TriangleId>,
    ) {
        let query = AABB::from_corners(
            [mins[0] - margin, mins[1] - margin, mins[2] - margin],
            [maxs[0] + margin, maxs[1] + margin, maxs[2] + margin],
        );
        for entry in self.tree.locate_in_envelope_intersecting(&query) {
            let keep = if group < 0 {
                true
            } else if ignore_group {
                entry.group != group
            } else {
                entry.group == group
            };
            if keep {
                out.push(entry.tid);
            }
        }
    }
}
