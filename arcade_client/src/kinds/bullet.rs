//! Bullet adapter.
//!
//! Bullets are announced and destroyed individually far more often than
//! they appear in periodic snapshots, so this kind mostly sees the
//! spawn/destroy path of the engine.

use arcade_shared::entity::{EntityId, EntitySnapshot};
use arcade_shared::math::Vec3;

use crate::reconcile::ProxyBinding;

#[derive(Debug, Clone, PartialEq)]
pub struct BulletView {
    pub id: EntityId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Firing client, when the server attributes the shot.
    pub client_id: Option<u32>,
}

impl BulletView {
    pub fn from_snapshot(snap: &EntitySnapshot) -> Self {
        Self {
            id: snap.id,
            position: snap.position,
            velocity: snap.velocity,
            client_id: snap.client_id,
        }
    }
}

pub trait BulletPresenter {
    type Handle;

    fn create(&mut self, view: &BulletView) -> Self::Handle;
    fn update(&mut self, handle: &mut Self::Handle, view: &BulletView);
    fn remove(&mut self, handle: Self::Handle);
}

pub struct BulletBinding<P>(pub P);

impl<P: BulletPresenter> ProxyBinding for BulletBinding<P> {
    type Handle = P::Handle;

    fn create_proxy(&mut self, snapshot: &EntitySnapshot) -> Self::Handle {
        self.0.create(&BulletView::from_snapshot(snapshot))
    }

    fn update_proxy(&mut self, handle: &mut Self::Handle, snapshot: &EntitySnapshot) {
        self.0.update(handle, &BulletView::from_snapshot(snapshot));
    }

    fn remove_proxy(&mut self, handle: Self::Handle) {
        self.0.remove(handle);
    }
}
