//! State receiver.
//!
//! Drains snapshot-bearing events off the bus and routes them to the
//! per-kind reconcilers. Kind discrimination is tolerant: the `type`
//! field accepts either casing convention (see `arcade_shared::entity`).
//!
//! Delta `removed` ids and `changes` patches carry no kind on the wire,
//! so they are offered to every store; unknown ids are no-ops there, which
//! is sound as long as ids are unique within a kind.

use std::collections::HashMap;

use arcade_shared::entity::{EntityKind, EntitySnapshot};
use arcade_shared::event::EventBus;
use arcade_shared::net::{EntityDestroyData, StateData, StateDeltaData};
use tracing::{debug, warn};

use crate::events::{EntityDestroyEvent, EntitySpawnEvent, StateDeltaEvent, StateEvent};
use crate::reconcile::KindReconciler;

/// Routes authoritative state to per-kind reconciliation engines.
#[derive(Default)]
pub struct StateReceiver {
    stores: Vec<Box<dyn KindReconciler>>,
}

impl StateReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the engine for one kind, replacing any previous one.
    pub fn register(&mut self, store: Box<dyn KindReconciler>) {
        self.stores.retain(|s| s.kind() != store.kind());
        self.stores.push(store);
    }

    pub fn store_count(&self, kind: EntityKind) -> Option<usize> {
        self.stores
            .iter()
            .find(|s| s.kind() == kind)
            .map(|s| s.len())
    }

    /// Drains every snapshot-bearing event currently queued.
    pub fn pump(&mut self, bus: &mut EventBus) {
        for StateEvent(state) in bus.drain::<StateEvent>() {
            self.apply_full_state(&state);
        }
        for StateDeltaEvent(delta) in bus.drain::<StateDeltaEvent>() {
            self.apply_delta(&delta);
        }
        for EntitySpawnEvent(raw) in bus.drain::<EntitySpawnEvent>() {
            self.apply_spawn(raw.normalize());
        }
        for EntityDestroyEvent(destroy) in bus.drain::<EntityDestroyEvent>() {
            self.apply_destroy(&destroy);
        }
    }

    /// Tears every store down (removing all proxies). Used at disconnect.
    pub fn clear(&mut self) {
        for store in &mut self.stores {
            store.clear();
        }
    }

    fn apply_full_state(&mut self, state: &StateData) {
        let mut by_kind: HashMap<EntityKind, Vec<EntitySnapshot>> = HashMap::new();
        for raw in &state.entities {
            let snap = raw.normalize();
            match snap.kind {
                Some(kind) => by_kind.entry(kind).or_default().push(snap),
                None => warn!(id = raw.id, kind = ?raw.kind, "entity with unknown kind ignored"),
            }
        }

        // Full state is a replacement for every kind: a store whose kind
        // is absent from the snapshot gets an empty list and drops all
        // its proxies.
        for store in &mut self.stores {
            let list = by_kind.remove(&store.kind()).unwrap_or_default();
            store.apply_full_state(&list);
        }
        for kind in by_kind.keys() {
            debug!(%kind, "no store registered for kind");
        }
    }

    fn apply_delta(&mut self, delta: &StateDeltaData) {
        let removed = delta.removed.clone().unwrap_or_default();
        let changes = delta.changes.clone().unwrap_or_default();
        let mut added: Vec<EntitySnapshot> = Vec::new();
        for raw in delta.added.as_deref().unwrap_or_default() {
            let snap = raw.normalize();
            if snap.kind.is_none() {
                warn!(id = raw.id, kind = ?raw.kind, "added entity with unknown kind ignored");
                continue;
            }
            added.push(snap);
        }

        for store in &mut self.stores {
            let kind = store.kind();
            let added_of_kind: Vec<EntitySnapshot> = added
                .iter()
                .filter(|s| s.kind == Some(kind))
                .cloned()
                .collect();
            store.apply_delta(&removed, &added_of_kind, &changes);
        }
    }

    fn apply_spawn(&mut self, snap: EntitySnapshot) {
        let Some(kind) = snap.kind else {
            warn!(id = %snap.id, "spawn with unknown kind ignored");
            return;
        };
        match self.stores.iter_mut().find(|s| s.kind() == kind) {
            Some(store) => store.apply_spawn(&snap),
            None => debug!(%kind, "no store registered for kind"),
        }
    }

    fn apply_destroy(&mut self, destroy: &EntityDestroyData) {
        let Some(kind) = destroy.kind.as_deref().and_then(EntityKind::parse) else {
            warn!(id = %destroy.id, kind = ?destroy.kind, "destroy without usable kind dropped");
            return;
        };
        match self.stores.iter_mut().find(|s| s.kind() == kind) {
            Some(store) => store.apply_destroy(destroy.id),
            None => debug!(%kind, "no store registered for kind"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_shared::entity::{EntityId, RawEntity};
    use crate::reconcile::{ProxyBinding, Reconciler};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Create(EntityKind, EntityId),
        Update(EntityKind, EntityId),
        Remove(EntityKind, EntityId),
    }

    struct Recording {
        kind: EntityKind,
        ops: Rc<RefCell<Vec<Op>>>,
    }

    impl ProxyBinding for Recording {
        type Handle = EntityId;

        fn create_proxy(&mut self, snapshot: &EntitySnapshot) -> EntityId {
            self.ops
                .borrow_mut()
                .push(Op::Create(self.kind, snapshot.id));
            snapshot.id
        }

        fn update_proxy(&mut self, _handle: &mut EntityId, snapshot: &EntitySnapshot) {
            self.ops
                .borrow_mut()
                .push(Op::Update(self.kind, snapshot.id));
        }

        fn remove_proxy(&mut self, handle: EntityId) {
            self.ops.borrow_mut().push(Op::Remove(self.kind, handle));
        }
    }

    fn receiver_with(kinds: &[EntityKind]) -> (StateReceiver, Rc<RefCell<Vec<Op>>>) {
        let ops = Rc::new(RefCell::new(Vec::new()));
        let mut receiver = StateReceiver::new();
        for &kind in kinds {
            receiver.register(Box::new(Reconciler::new(
                kind,
                Recording {
                    kind,
                    ops: ops.clone(),
                },
            )));
        }
        (receiver, ops)
    }

    fn raw(id: i64, kind: &str) -> RawEntity {
        RawEntity {
            id,
            kind: Some(kind.to_string()),
            x: Some(1.0),
            ..Default::default()
        }
    }

    fn taken(ops: &Rc<RefCell<Vec<Op>>>) -> Vec<Op> {
        ops.borrow_mut().drain(..).collect()
    }

    #[test]
    fn state_partitions_by_kind() {
        let (mut receiver, ops) =
            receiver_with(&[EntityKind::Asteroid, EntityKind::Spaceship]);
        let mut bus = EventBus::default();
        bus.push(StateEvent(StateData {
            entities: vec![raw(1, "asteroid"), raw(2, "spaceship"), raw(3, "Asteroid")],
        }));

        receiver.pump(&mut bus);

        let seen = taken(&ops);
        assert!(seen.contains(&Op::Create(EntityKind::Asteroid, EntityId(1))));
        assert!(seen.contains(&Op::Create(EntityKind::Asteroid, EntityId(3))));
        assert!(seen.contains(&Op::Create(EntityKind::Spaceship, EntityId(2))));
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn state_omitting_a_kind_clears_that_store() {
        let (mut receiver, ops) =
            receiver_with(&[EntityKind::Asteroid, EntityKind::Spaceship]);
        let mut bus = EventBus::default();
        bus.push(StateEvent(StateData {
            entities: vec![raw(1, "asteroid"), raw(2, "spaceship")],
        }));
        receiver.pump(&mut bus);
        taken(&ops);

        bus.push(StateEvent(StateData {
            entities: vec![raw(2, "spaceship")],
        }));
        receiver.pump(&mut bus);

        let seen = taken(&ops);
        assert!(seen.contains(&Op::Remove(EntityKind::Asteroid, EntityId(1))));
        assert!(seen.contains(&Op::Update(EntityKind::Spaceship, EntityId(2))));
        assert_eq!(receiver.store_count(EntityKind::Asteroid), Some(0));
    }

    #[test]
    fn delta_added_routes_by_kind_removed_offered_to_all() {
        let (mut receiver, ops) =
            receiver_with(&[EntityKind::Asteroid, EntityKind::Bullet]);
        let mut bus = EventBus::default();
        bus.push(StateDeltaEvent(StateDeltaData {
            added: Some(vec![raw(5, "bullet")]),
            ..Default::default()
        }));
        receiver.pump(&mut bus);
        assert_eq!(taken(&ops), vec![Op::Create(EntityKind::Bullet, EntityId(5))]);

        bus.push(StateDeltaEvent(StateDeltaData {
            removed: Some(vec![EntityId(5)]),
            ..Default::default()
        }));
        receiver.pump(&mut bus);
        // Only the bullet store knows id 5; the asteroid store no-ops.
        assert_eq!(taken(&ops), vec![Op::Remove(EntityKind::Bullet, EntityId(5))]);
    }

    #[test]
    fn spawn_and_destroy_route_by_kind() {
        let (mut receiver, ops) = receiver_with(&[EntityKind::MineralChunk]);
        let mut bus = EventBus::default();
        bus.push(EntitySpawnEvent(raw(8, "mineral_chunk")));
        receiver.pump(&mut bus);
        assert_eq!(
            taken(&ops),
            vec![Op::Create(EntityKind::MineralChunk, EntityId(8))]
        );

        bus.push(EntityDestroyEvent(EntityDestroyData {
            id: EntityId(8),
            kind: Some("mineralChunk".into()),
        }));
        receiver.pump(&mut bus);
        assert_eq!(
            taken(&ops),
            vec![Op::Remove(EntityKind::MineralChunk, EntityId(8))]
        );
    }

    #[test]
    fn destroy_without_kind_is_dropped() {
        let (mut receiver, ops) = receiver_with(&[EntityKind::Asteroid]);
        let mut bus = EventBus::default();
        bus.push(EntitySpawnEvent(raw(4, "asteroid")));
        receiver.pump(&mut bus);
        taken(&ops);

        bus.push(EntityDestroyEvent(EntityDestroyData {
            id: EntityId(4),
            kind: None,
        }));
        receiver.pump(&mut bus);
        assert!(taken(&ops).is_empty());
        assert_eq!(receiver.store_count(EntityKind::Asteroid), Some(1));
    }

    #[test]
    fn unknown_kind_entities_are_skipped() {
        let (mut receiver, ops) = receiver_with(&[EntityKind::Asteroid]);
        let mut bus = EventBus::default();
        bus.push(StateEvent(StateData {
            entities: vec![raw(1, "asteroid"), raw(2, "space_station")],
        }));
        receiver.pump(&mut bus);
        assert_eq!(
            taken(&ops),
            vec![Op::Create(EntityKind::Asteroid, EntityId(1))]
        );
    }
}
