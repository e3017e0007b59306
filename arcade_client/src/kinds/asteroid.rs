//! Asteroid adapter.
//!
//! Asteroids carry a scale factor and, in zoned fields, a zone
//! discriminator. Geometry roughening, material, and the physics sphere
//! all live behind the presenter.

use arcade_shared::entity::{EntityId, EntitySnapshot};
use arcade_shared::math::Vec3;

use crate::reconcile::ProxyBinding;

/// Typed asteroid snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AsteroidView {
    pub id: EntityId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Scale factor; the server omits it for unit asteroids.
    pub size: f64,
    pub zone_type: Option<String>,
}

impl AsteroidView {
    pub fn from_snapshot(snap: &EntitySnapshot) -> Self {
        Self {
            id: snap.id,
            position: snap.position,
            velocity: snap.velocity,
            size: snap.size.unwrap_or(1.0),
            zone_type: snap.zone_type.clone(),
        }
    }
}

/// Presentation collaborator for asteroids.
pub trait AsteroidPresenter {
    type Handle;

    fn create(&mut self, view: &AsteroidView) -> Self::Handle;
    fn update(&mut self, handle: &mut Self::Handle, view: &AsteroidView);
    fn remove(&mut self, handle: Self::Handle);
}

/// Adapts a presenter to the generic engine.
pub struct AsteroidBinding<P>(pub P);

impl<P: AsteroidPresenter> ProxyBinding for AsteroidBinding<P> {
    type Handle = P::Handle;

    fn create_proxy(&mut self, snapshot: &EntitySnapshot) -> Self::Handle {
        self.0.create(&AsteroidView::from_snapshot(snapshot))
    }

    fn update_proxy(&mut self, handle: &mut Self::Handle, snapshot: &EntitySnapshot) {
        self.0.update(handle, &AsteroidView::from_snapshot(snapshot));
    }

    fn remove_proxy(&mut self, handle: Self::Handle) {
        self.0.remove(handle);
    }
}
