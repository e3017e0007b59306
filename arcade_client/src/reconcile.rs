//! Entity reconciliation.
//!
//! One algorithm for every entity kind: diff an authoritative snapshot
//! list against the locally owned proxies and issue the minimal
//! create/update/remove calls. Kind-specific proxy construction lives
//! entirely behind [`ProxyBinding`]; the engine never inspects a handle.
//!
//! Correctness properties this module upholds exactly:
//! - `apply_full_state` is idempotent: applying the same list twice does
//!   zero creates/removes on the second pass.
//! - `apply_delta` processes removals, then additions, then patches, so an
//!   id present in both `removed` and `added` is destroyed and recreated,
//!   never merged.

use std::collections::{HashMap, HashSet};

use arcade_shared::entity::{EntityId, EntityKind, EntityPatch, EntitySnapshot};
use tracing::debug;

/// Capability record supplied by the presentation collaborator, one per
/// entity kind. Handles are opaque to the engine.
pub trait ProxyBinding {
    type Handle;

    fn create_proxy(&mut self, snapshot: &EntitySnapshot) -> Self::Handle;
    fn update_proxy(&mut self, handle: &mut Self::Handle, snapshot: &EntitySnapshot);
    fn remove_proxy(&mut self, handle: Self::Handle);
}

struct Entry<H> {
    /// Last snapshot applied; patches merge into it before redelivery.
    snapshot: EntitySnapshot,
    handle: H,
}

/// Per-kind reconciliation engine. Owns the id → proxy map exclusively;
/// at most one live proxy exists per id.
pub struct Reconciler<B: ProxyBinding> {
    kind: EntityKind,
    binding: B,
    entries: HashMap<EntityId, Entry<B::Handle>>,
}

impl<B: ProxyBinding> Reconciler<B> {
    pub fn new(kind: EntityKind, binding: B) -> Self {
        Self {
            kind,
            binding,
            entries: HashMap::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Authoritative replacement: update or create every incoming id,
    /// then remove every owned id the server no longer lists.
    pub fn apply_full_state(&mut self, snapshots: &[EntitySnapshot]) {
        let incoming: HashSet<EntityId> = snapshots.iter().map(|s| s.id).collect();

        for snap in snapshots {
            match self.entries.get_mut(&snap.id) {
                Some(entry) => {
                    self.binding.update_proxy(&mut entry.handle, snap);
                    entry.snapshot = snap.clone();
                }
                None => {
                    let handle = self.binding.create_proxy(snap);
                    self.entries.insert(
                        snap.id,
                        Entry {
                            snapshot: snap.clone(),
                            handle,
                        },
                    );
                }
            }
        }

        let stale: Vec<EntityId> = self
            .entries
            .keys()
            .filter(|id| !incoming.contains(id))
            .copied()
            .collect();
        for id in stale {
            if let Some(entry) = self.entries.remove(&id) {
                self.binding.remove_proxy(entry.handle);
            }
        }
    }

    /// Incremental update, in fixed order: removals, additions, patches.
    pub fn apply_delta(
        &mut self,
        removed: &[EntityId],
        added: &[EntitySnapshot],
        changes: &[EntityPatch],
    ) {
        for id in removed {
            match self.entries.remove(id) {
                Some(entry) => self.binding.remove_proxy(entry.handle),
                None => debug!(kind = %self.kind, id = %id, "removal for unknown id"),
            }
        }

        for snap in added {
            match self.entries.get_mut(&snap.id) {
                Some(entry) => {
                    // Server re-announced a known id; refresh in place
                    // rather than risking a second proxy.
                    debug!(kind = %self.kind, id = %snap.id, "add for known id");
                    self.binding.update_proxy(&mut entry.handle, snap);
                    entry.snapshot = snap.clone();
                }
                None => {
                    let handle = self.binding.create_proxy(snap);
                    self.entries.insert(
                        snap.id,
                        Entry {
                            snapshot: snap.clone(),
                            handle,
                        },
                    );
                }
            }
        }

        for patch in changes {
            // A patch for an unknown id is a no-op, not an error.
            if let Some(entry) = self.entries.get_mut(&patch.id) {
                entry.snapshot.apply_patch(patch);
                self.binding.update_proxy(&mut entry.handle, &entry.snapshot);
            }
        }
    }

    /// Lifecycle sugar for individually announced entities.
    pub fn apply_spawn(&mut self, snapshot: &EntitySnapshot) {
        self.apply_delta(&[], std::slice::from_ref(snapshot), &[]);
    }

    pub fn apply_destroy(&mut self, id: EntityId) {
        self.apply_delta(&[id], &[], &[]);
    }

    /// Removes every owned proxy. Called at session teardown.
    pub fn clear(&mut self) {
        for (_, entry) in self.entries.drain() {
            self.binding.remove_proxy(entry.handle);
        }
    }
}

/// Object-safe facade so the state receiver can hold engines for
/// different handle types side by side.
pub trait KindReconciler {
    fn kind(&self) -> EntityKind;
    fn apply_full_state(&mut self, snapshots: &[EntitySnapshot]);
    fn apply_delta(
        &mut self,
        removed: &[EntityId],
        added: &[EntitySnapshot],
        changes: &[EntityPatch],
    );
    fn apply_spawn(&mut self, snapshot: &EntitySnapshot);
    fn apply_destroy(&mut self, id: EntityId);
    fn clear(&mut self);
    fn len(&self) -> usize;
}

impl<B: ProxyBinding> KindReconciler for Reconciler<B> {
    fn kind(&self) -> EntityKind {
        Reconciler::kind(self)
    }

    fn apply_full_state(&mut self, snapshots: &[EntitySnapshot]) {
        Reconciler::apply_full_state(self, snapshots);
    }

    fn apply_delta(
        &mut self,
        removed: &[EntityId],
        added: &[EntitySnapshot],
        changes: &[EntityPatch],
    ) {
        Reconciler::apply_delta(self, removed, added, changes);
    }

    fn apply_spawn(&mut self, snapshot: &EntitySnapshot) {
        Reconciler::apply_spawn(self, snapshot);
    }

    fn apply_destroy(&mut self, id: EntityId) {
        Reconciler::apply_destroy(self, id);
    }

    fn clear(&mut self) {
        Reconciler::clear(self);
    }

    fn len(&self) -> usize {
        Reconciler::len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_shared::math::{Quat, Vec3};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Create(EntityId),
        Update(EntityId),
        Remove(EntityId),
    }

    /// Binding that records every capability call.
    struct Recording {
        ops: Rc<RefCell<Vec<Op>>>,
    }

    impl ProxyBinding for Recording {
        type Handle = EntityId;

        fn create_proxy(&mut self, snapshot: &EntitySnapshot) -> EntityId {
            self.ops.borrow_mut().push(Op::Create(snapshot.id));
            snapshot.id
        }

        fn update_proxy(&mut self, handle: &mut EntityId, snapshot: &EntitySnapshot) {
            assert_eq!(*handle, snapshot.id);
            self.ops.borrow_mut().push(Op::Update(snapshot.id));
        }

        fn remove_proxy(&mut self, handle: EntityId) {
            self.ops.borrow_mut().push(Op::Remove(handle));
        }
    }

    fn engine() -> (Reconciler<Recording>, Rc<RefCell<Vec<Op>>>) {
        let ops = Rc::new(RefCell::new(Vec::new()));
        (
            Reconciler::new(EntityKind::Asteroid, Recording { ops: ops.clone() }),
            ops,
        )
    }

    fn snap(id: i64) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId(id),
            kind: Some(EntityKind::Asteroid),
            position: Vec3::new(id as f64, 0.0, 0.0),
            velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            size: Some(2.0),
            zone_type: None,
            purity: None,
            health: None,
            client_id: None,
        }
    }

    fn taken(ops: &Rc<RefCell<Vec<Op>>>) -> Vec<Op> {
        ops.borrow_mut().drain(..).collect()
    }

    #[test]
    fn full_state_is_idempotent() {
        let (mut rec, ops) = engine();
        let state = vec![snap(1), snap(2), snap(3)];

        rec.apply_full_state(&state);
        assert_eq!(
            taken(&ops),
            vec![
                Op::Create(EntityId(1)),
                Op::Create(EntityId(2)),
                Op::Create(EntityId(3))
            ]
        );

        rec.apply_full_state(&state);
        let second = taken(&ops);
        assert!(second
            .iter()
            .all(|op| matches!(op, Op::Update(_))), "second pass: {second:?}");
        assert_eq!(second.len(), 3);
    }

    #[test]
    fn full_state_diff_creates_and_removes_exactly_the_difference() {
        let (mut rec, ops) = engine();
        rec.apply_full_state(&[snap(1), snap(2), snap(3)]);
        taken(&ops);

        rec.apply_full_state(&[snap(2), snap(3), snap(4)]);
        let second = taken(&ops);

        let creates: Vec<_> = second
            .iter()
            .filter(|op| matches!(op, Op::Create(_)))
            .collect();
        let removes: Vec<_> = second
            .iter()
            .filter(|op| matches!(op, Op::Remove(_)))
            .collect();
        let updates: Vec<_> = second
            .iter()
            .filter(|op| matches!(op, Op::Update(_)))
            .collect();
        assert_eq!(creates, vec![&Op::Create(EntityId(4))]);
        assert_eq!(removes, vec![&Op::Remove(EntityId(1))]);
        assert_eq!(updates.len(), 2);
    }

    #[test]
    fn empty_full_state_removes_everything() {
        let (mut rec, ops) = engine();
        rec.apply_full_state(&[snap(1)]);
        taken(&ops);

        rec.apply_full_state(&[]);
        assert_eq!(taken(&ops), vec![Op::Remove(EntityId(1))]);
        assert!(rec.is_empty());
    }

    #[test]
    fn delta_removed_then_added_recreates_never_merges() {
        let (mut rec, ops) = engine();
        rec.apply_full_state(&[snap(5)]);
        taken(&ops);

        rec.apply_delta(&[EntityId(5)], &[snap(5)], &[]);
        assert_eq!(
            taken(&ops),
            vec![Op::Remove(EntityId(5)), Op::Create(EntityId(5))]
        );
    }

    #[test]
    fn delta_add_then_remove_across_deltas() {
        let (mut rec, ops) = engine();
        rec.apply_delta(&[], &[snap(5)], &[]);
        rec.apply_delta(&[EntityId(5)], &[], &[]);
        assert_eq!(
            taken(&ops),
            vec![Op::Create(EntityId(5)), Op::Remove(EntityId(5))]
        );
    }

    #[test]
    fn patch_for_unknown_id_is_a_noop() {
        let (mut rec, ops) = engine();
        rec.apply_delta(
            &[],
            &[],
            &[EntityPatch {
                id: EntityId(9),
                position: Some([1.0, 2.0, 3.0]),
                velocity: None,
                health: None,
            }],
        );
        assert!(taken(&ops).is_empty());
    }

    #[test]
    fn patch_merges_into_retained_snapshot() {
        let (mut rec, ops) = engine();
        rec.apply_full_state(&[snap(1)]);
        taken(&ops);

        rec.apply_delta(
            &[],
            &[],
            &[EntityPatch {
                id: EntityId(1),
                position: Some([7.0, 8.0, 9.0]),
                velocity: None,
                health: None,
            }],
        );
        assert_eq!(taken(&ops), vec![Op::Update(EntityId(1))]);
    }

    #[test]
    fn readded_known_id_updates_in_place() {
        let (mut rec, ops) = engine();
        rec.apply_spawn(&snap(7));
        taken(&ops);

        rec.apply_spawn(&snap(7));
        assert_eq!(taken(&ops), vec![Op::Update(EntityId(7))]);
        assert_eq!(rec.len(), 1);
    }

    #[test]
    fn clear_removes_all_proxies() {
        let (mut rec, ops) = engine();
        rec.apply_full_state(&[snap(1), snap(2)]);
        taken(&ops);

        rec.clear();
        let mut removed = taken(&ops);
        removed.sort_by_key(|op| match op {
            Op::Remove(id) => id.0,
            _ => panic!("expected only removes"),
        });
        assert_eq!(
            removed,
            vec![Op::Remove(EntityId(1)), Op::Remove(EntityId(2))]
        );
        assert!(rec.is_empty());
    }
}
