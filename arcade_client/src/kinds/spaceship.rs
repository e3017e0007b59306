//! Spaceship adapter.
//!
//! Remote ships are the only kind carrying a full orientation quaternion
//! on the wire; a missing quaternion means identity. `client_id` lets the
//! presenter tell the local player's ship apart from remote ones.

use arcade_shared::entity::{EntityId, EntitySnapshot};
use arcade_shared::math::{Quat, Vec3};

use crate::reconcile::ProxyBinding;

#[derive(Debug, Clone, PartialEq)]
pub struct SpaceshipView {
    pub id: EntityId,
    pub client_id: Option<u32>,
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Quat,
    pub health: Option<i32>,
}

impl SpaceshipView {
    pub fn from_snapshot(snap: &EntitySnapshot) -> Self {
        Self {
            id: snap.id,
            client_id: snap.client_id,
            position: snap.position,
            velocity: snap.velocity,
            orientation: snap.orientation,
            health: snap.health,
        }
    }
}

pub trait SpaceshipPresenter {
    type Handle;

    fn create(&mut self, view: &SpaceshipView) -> Self::Handle;
    fn update(&mut self, handle: &mut Self::Handle, view: &SpaceshipView);
    fn remove(&mut self, handle: Self::Handle);
}

pub struct SpaceshipBinding<P>(pub P);

impl<P: SpaceshipPresenter> ProxyBinding for SpaceshipBinding<P> {
    type Handle = P::Handle;

    fn create_proxy(&mut self, snapshot: &EntitySnapshot) -> Self::Handle {
        self.0.create(&SpaceshipView::from_snapshot(snapshot))
    }

    fn update_proxy(&mut self, handle: &mut Self::Handle, snapshot: &EntitySnapshot) {
        self.0.update(handle, &SpaceshipView::from_snapshot(snapshot));
    }

    fn remove_proxy(&mut self, handle: Self::Handle) {
        self.0.remove(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_shared::entity::RawEntity;

    #[test]
    fn orientation_defaults_to_identity() {
        let raw: RawEntity =
            serde_json::from_str(r#"{"id":9,"type":"spaceship","x":1.0,"clientId":4}"#).unwrap();
        let view = SpaceshipView::from_snapshot(&raw.normalize());
        assert_eq!(view.orientation, Quat::IDENTITY);
        assert_eq!(view.client_id, Some(4));
    }

    #[test]
    fn wire_quaternion_is_kept() {
        let raw: RawEntity = serde_json::from_str(
            r#"{"id":9,"type":"spaceship","qx":0.1,"qy":0.2,"qz":0.3,"qw":0.9}"#,
        )
        .unwrap();
        let view = SpaceshipView::from_snapshot(&raw.normalize());
        assert_eq!(view.orientation, Quat::new(0.1, 0.2, 0.3, 0.9));
    }
}
