//! Mineral chunk adapter.
//!
//! Chunks spawn when asteroids break up. Purity scales the collect value;
//! the server omits it for plain chunks.

use arcade_shared::entity::{EntityId, EntitySnapshot};
use arcade_shared::math::Vec3;

use crate::reconcile::ProxyBinding;

#[derive(Debug, Clone, PartialEq)]
pub struct MineralChunkView {
    pub id: EntityId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// 0.1–1.0 when present; 1.0 otherwise.
    pub purity: f64,
    pub size: f64,
}

impl MineralChunkView {
    pub fn from_snapshot(snap: &EntitySnapshot) -> Self {
        Self {
            id: snap.id,
            position: snap.position,
            velocity: snap.velocity,
            purity: snap.purity.unwrap_or(1.0),
            size: snap.size.unwrap_or(0.5),
        }
    }
}

pub trait MineralChunkPresenter {
    type Handle;

    fn create(&mut self, view: &MineralChunkView) -> Self::Handle;
    fn update(&mut self, handle: &mut Self::Handle, view: &MineralChunkView);
    fn remove(&mut self, handle: Self::Handle);
}

pub struct MineralChunkBinding<P>(pub P);

impl<P: MineralChunkPresenter> ProxyBinding for MineralChunkBinding<P> {
    type Handle = P::Handle;

    fn create_proxy(&mut self, snapshot: &EntitySnapshot) -> Self::Handle {
        self.0.create(&MineralChunkView::from_snapshot(snapshot))
    }

    fn update_proxy(&mut self, handle: &mut Self::Handle, snapshot: &EntitySnapshot) {
        self.0
            .update(handle, &MineralChunkView::from_snapshot(snapshot));
    }

    fn remove_proxy(&mut self, handle: Self::Handle) {
        self.0.remove(handle);
    }
}
