//! Entity snapshots.
//!
//! The authoritative server describes entities in a loose superset shape;
//! field names arrive in either lower-camel or capitalized form depending
//! on the server implementation, and positions arrive either as `x`/`y`/`z`
//! scalars or a `position` triple. [`RawEntity`] absorbs all of that;
//! [`EntitySnapshot`] is the normalized form the rest of the client sees.
//!
//! Ids are server-assigned and unique within a kind's namespace only.
//! Nothing here checks for cross-kind collisions.

use serde::{Deserialize, Serialize};

use crate::math::{Quat, Vec3};

/// Server-assigned entity identifier, stable for the entity's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub i64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Entity kinds the client reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Asteroid,
    Spaceship,
    MineralChunk,
    Bullet,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Asteroid,
        EntityKind::Spaceship,
        EntityKind::MineralChunk,
        EntityKind::Bullet,
    ];

    /// Parses a kind discriminator, tolerating case and underscore
    /// variations (`mineral_chunk`, `mineralChunk`, `MineralChunk`).
    pub fn parse(s: &str) -> Option<Self> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "asteroid" => Some(EntityKind::Asteroid),
            "spaceship" => Some(EntityKind::Spaceship),
            "mineralchunk" => Some(EntityKind::MineralChunk),
            "bullet" => Some(EntityKind::Bullet),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Asteroid => "asteroid",
            EntityKind::Spaceship => "spaceship",
            EntityKind::MineralChunk => "mineral_chunk",
            EntityKind::Bullet => "bullet",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire-shape entity as the server sends it. Every optional field stays
/// optional here; defaults are applied once in [`RawEntity::normalize`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RawEntity {
    #[serde(alias = "Id", alias = "ID")]
    pub id: i64,
    #[serde(
        rename = "type",
        alias = "Type",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(alias = "X", skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(alias = "Y", skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(alias = "Z", skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(alias = "Position", skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 3]>,
    #[serde(alias = "Vx", alias = "VX", skip_serializing_if = "Option::is_none")]
    pub vx: Option<f64>,
    #[serde(alias = "Vy", alias = "VY", skip_serializing_if = "Option::is_none")]
    pub vy: Option<f64>,
    #[serde(alias = "Vz", alias = "VZ", skip_serializing_if = "Option::is_none")]
    pub vz: Option<f64>,
    #[serde(alias = "Qx", skip_serializing_if = "Option::is_none")]
    pub qx: Option<f64>,
    #[serde(alias = "Qy", skip_serializing_if = "Option::is_none")]
    pub qy: Option<f64>,
    #[serde(alias = "Qz", skip_serializing_if = "Option::is_none")]
    pub qz: Option<f64>,
    #[serde(alias = "Qw", skip_serializing_if = "Option::is_none")]
    pub qw: Option<f64>,
    #[serde(alias = "Size", skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(
        rename = "zoneType",
        alias = "ZoneType",
        skip_serializing_if = "Option::is_none"
    )]
    pub zone_type: Option<String>,
    #[serde(alias = "Purity", skip_serializing_if = "Option::is_none")]
    pub purity: Option<f64>,
    #[serde(alias = "Hp", alias = "HP", skip_serializing_if = "Option::is_none")]
    pub hp: Option<i32>,
    #[serde(
        rename = "clientId",
        alias = "ClientId",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_id: Option<u32>,
}

impl RawEntity {
    /// Canonicalizes the wire shape: position triple wins over scalar
    /// coordinates, missing velocity is zero, missing orientation is
    /// identity.
    pub fn normalize(&self) -> EntitySnapshot {
        let position = match self.position {
            Some(p) => Vec3::from(p),
            None => Vec3::new(
                self.x.unwrap_or(0.0),
                self.y.unwrap_or(0.0),
                self.z.unwrap_or(0.0),
            ),
        };
        let velocity = Vec3::new(
            self.vx.unwrap_or(0.0),
            self.vy.unwrap_or(0.0),
            self.vz.unwrap_or(0.0),
        );
        let orientation = if self.qx.is_some() || self.qy.is_some() || self.qz.is_some() || self.qw.is_some()
        {
            Quat::new(
                self.qx.unwrap_or(0.0),
                self.qy.unwrap_or(0.0),
                self.qz.unwrap_or(0.0),
                self.qw.unwrap_or(1.0),
            )
        } else {
            Quat::IDENTITY
        };

        EntitySnapshot {
            id: EntityId(self.id),
            kind: self.kind.as_deref().and_then(EntityKind::parse),
            position,
            velocity,
            orientation,
            size: self.size,
            zone_type: self.zone_type.clone(),
            purity: self.purity,
            health: self.hp,
            client_id: self.client_id,
        }
    }
}

/// Normalized entity snapshot handed to the reconcilers.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    /// `None` when the server sent no or an unrecognized discriminator.
    pub kind: Option<EntityKind>,
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Quat,
    pub size: Option<f64>,
    pub zone_type: Option<String>,
    pub purity: Option<f64>,
    pub health: Option<i32>,
    pub client_id: Option<u32>,
}

impl EntitySnapshot {
    /// Folds a partial change into this snapshot.
    pub fn apply_patch(&mut self, patch: &EntityPatch) {
        if let Some(p) = patch.position {
            self.position = Vec3::from(p);
        }
        if let Some(v) = patch.velocity {
            self.velocity = Vec3::from(v);
        }
        if let Some(h) = patch.health {
            self.health = Some(h);
        }
    }
}

/// Partial-field change entry of a STATE_DELTA. Only changed fields are
/// present on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityPatch {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parsing_tolerates_casing() {
        assert_eq!(EntityKind::parse("asteroid"), Some(EntityKind::Asteroid));
        assert_eq!(EntityKind::parse("Asteroid"), Some(EntityKind::Asteroid));
        assert_eq!(
            EntityKind::parse("mineral_chunk"),
            Some(EntityKind::MineralChunk)
        );
        assert_eq!(
            EntityKind::parse("mineralChunk"),
            Some(EntityKind::MineralChunk)
        );
        assert_eq!(EntityKind::parse("space_station"), None);
    }

    #[test]
    fn field_casing_variants_decode_identically() {
        let lower: RawEntity =
            serde_json::from_str(r#"{"id":1,"type":"asteroid","x":1.0,"y":2.0,"z":3.0}"#).unwrap();
        let upper: RawEntity =
            serde_json::from_str(r#"{"id":1,"Type":"asteroid","X":1.0,"Y":2.0,"Z":3.0}"#).unwrap();
        assert_eq!(lower.normalize(), upper.normalize());
    }

    #[test]
    fn position_triple_wins_over_scalars() {
        let raw: RawEntity = serde_json::from_str(
            r#"{"id":2,"type":"bullet","position":[9.0,8.0,7.0],"x":1.0,"y":2.0,"z":3.0}"#,
        )
        .unwrap();
        assert_eq!(raw.normalize().position, Vec3::new(9.0, 8.0, 7.0));
    }

    #[test]
    fn missing_optionals_default_to_zero_and_identity() {
        let raw: RawEntity =
            serde_json::from_str(r#"{"id":3,"type":"spaceship","x":1.0}"#).unwrap();
        let snap = raw.normalize();
        assert_eq!(snap.position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(snap.velocity, Vec3::ZERO);
        assert_eq!(snap.orientation, Quat::IDENTITY);
    }

    #[test]
    fn partial_quaternion_fills_identity_components() {
        let raw: RawEntity =
            serde_json::from_str(r#"{"id":4,"type":"spaceship","qx":0.5}"#).unwrap();
        assert_eq!(raw.normalize().orientation, Quat::new(0.5, 0.0, 0.0, 1.0));
    }

    #[test]
    fn patch_folds_into_snapshot() {
        let mut snap = RawEntity {
            id: 5,
            kind: Some("asteroid".into()),
            x: Some(1.0),
            ..Default::default()
        }
        .normalize();
        snap.apply_patch(&EntityPatch {
            id: EntityId(5),
            position: Some([4.0, 5.0, 6.0]),
            velocity: None,
            health: Some(7),
        });
        assert_eq!(snap.position, Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(snap.velocity, Vec3::ZERO);
        assert_eq!(snap.health, Some(7));
    }
}
