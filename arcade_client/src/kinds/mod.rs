//! Per-kind adapters.
//!
//! The reconciliation engine is kind-agnostic; these modules give each
//! entity kind a typed view of its snapshot fields and adapt the
//! presentation collaborator's create/update/remove triple to the
//! engine's [`ProxyBinding`](crate::reconcile::ProxyBinding) seam.

pub mod asteroid;
pub mod bullet;
pub mod mineral;
pub mod spaceship;

use arcade_shared::entity::EntityKind;

use crate::receiver::StateReceiver;
use crate::reconcile::Reconciler;

use asteroid::{AsteroidBinding, AsteroidPresenter};
use bullet::{BulletBinding, BulletPresenter};
use mineral::{MineralChunkBinding, MineralChunkPresenter};
use spaceship::{SpaceshipBinding, SpaceshipPresenter};

/// Builds a receiver wired with one engine per kind.
pub fn standard_receiver<A, S, M, B>(
    asteroids: A,
    spaceships: S,
    minerals: M,
    bullets: B,
) -> StateReceiver
where
    A: AsteroidPresenter + 'static,
    A::Handle: 'static,
    S: SpaceshipPresenter + 'static,
    S::Handle: 'static,
    M: MineralChunkPresenter + 'static,
    M::Handle: 'static,
    B: BulletPresenter + 'static,
    B::Handle: 'static,
{
    let mut receiver = StateReceiver::new();
    receiver.register(Box::new(Reconciler::new(
        EntityKind::Asteroid,
        AsteroidBinding(asteroids),
    )));
    receiver.register(Box::new(Reconciler::new(
        EntityKind::Spaceship,
        SpaceshipBinding(spaceships),
    )));
    receiver.register(Box::new(Reconciler::new(
        EntityKind::MineralChunk,
        MineralChunkBinding(minerals),
    )));
    receiver.register(Box::new(Reconciler::new(
        EntityKind::Bullet,
        BulletBinding(bullets),
    )));
    receiver
}
