//! Message router.
//!
//! Turns each raw inbound frame into a typed envelope and republishes it:
//! once as the generic [`MessageEvent`], once as the type-specific event.
//! Parse failures are logged and dropped; the connection stays open.

use arcade_shared::event::EventBus;
use arcade_shared::net::{decode_envelope, Payload};
use tracing::{debug, warn};

use crate::events::{
    EntityDestroyEvent, EntitySpawnEvent, InputAckEvent, MessageEvent, ParseErrorEvent,
    PongEvent, ServerErrorEvent, StateDeltaEvent, StateEvent,
};

#[derive(Default)]
pub struct MessageRouter;

impl MessageRouter {
    /// Parses `body` and publishes. Never fails the caller: bad frames
    /// only cost a warning.
    pub fn dispatch(&self, body: &[u8], bus: &mut EventBus) {
        let env = match decode_envelope(body) {
            Ok(env) => env,
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                bus.push(ParseErrorEvent);
                return;
            }
        };

        let payload = env.payload();
        bus.push(MessageEvent(env.clone()));

        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                warn!(msg_type = ?env.msg_type, error = %e, "dropping undecodable payload");
                bus.push(ParseErrorEvent);
                return;
            }
        };

        match payload {
            Payload::State(data) => bus.push(StateEvent(data)),
            Payload::StateDelta(data) => bus.push(StateDeltaEvent(data)),
            Payload::EntitySpawn(entity) => bus.push(EntitySpawnEvent(entity)),
            Payload::EntityDestroy(data) => bus.push(EntityDestroyEvent(data)),
            Payload::Pong(data) => bus.push(PongEvent(data)),
            Payload::Error(data) => bus.push(ServerErrorEvent(data)),
            Payload::InputAck(data) => bus.push(InputAckEvent(data)),
            // Client-bound categories arriving inbound are unexpected but
            // harmless.
            Payload::Join(_) | Payload::Input(_) | Payload::Ping(_) => {
                debug!(msg_type = ?env.msg_type, "ignoring unexpected inbound message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_shared::net::{ErrorData, MessageType};

    #[test]
    fn malformed_frame_publishes_nothing() {
        let router = MessageRouter;
        let mut bus = EventBus::default();
        router.dispatch(b"not json at all", &mut bus);
        assert!(bus.drain::<MessageEvent>().is_empty());
        assert_eq!(bus.drain::<ParseErrorEvent>().len(), 1);
    }

    #[test]
    fn state_frame_publishes_generic_and_typed() {
        let router = MessageRouter;
        let mut bus = EventBus::default();
        let body = br#"{"type":"STATE","timestamp":1,"seq":1,"data":{"entities":[{"id":1,"type":"asteroid","x":0,"y":0,"z":0,"size":2}]}}"#;
        router.dispatch(body, &mut bus);

        let generic: Vec<MessageEvent> = bus.drain::<MessageEvent>().into_iter().collect();
        assert_eq!(generic.len(), 1);
        assert_eq!(generic[0].0.msg_type, MessageType::State);

        let typed: Vec<StateEvent> = bus.drain::<StateEvent>().into_iter().collect();
        assert_eq!(typed.len(), 1);
        assert_eq!(typed[0].0.entities.len(), 1);
    }

    #[test]
    fn spawn_frame_carries_the_wire_entity() {
        let router = MessageRouter;
        let mut bus = EventBus::default();
        let body = br#"{"type":"ENTITY_SPAWN","timestamp":1,"seq":4,"data":{"id":6,"type":"bullet","vx":12.5}}"#;
        router.dispatch(body, &mut bus);

        let spawns: Vec<EntitySpawnEvent> = bus.drain::<EntitySpawnEvent>().into_iter().collect();
        assert_eq!(spawns.len(), 1);
        assert_eq!(spawns[0].0.id, 6);
        assert_eq!(spawns[0].0.vx, Some(12.5));
    }

    #[test]
    fn error_frame_surfaces_message() {
        let router = MessageRouter;
        let mut bus = EventBus::default();
        let body = br#"{"type":"ERROR","timestamp":1,"seq":2,"data":{"message":"lobby full"}}"#;
        router.dispatch(body, &mut bus);

        let errors: Vec<ServerErrorEvent> = bus.drain::<ServerErrorEvent>().into_iter().collect();
        assert_eq!(
            errors[0].0,
            ErrorData {
                message: "lobby full".into()
            }
        );
    }

    #[test]
    fn valid_envelope_with_bad_payload_still_counts_as_message() {
        let router = MessageRouter;
        let mut bus = EventBus::default();
        // STATE data missing the entities list.
        let body = br#"{"type":"STATE","timestamp":1,"seq":3,"data":{"wrong":true}}"#;
        router.dispatch(body, &mut bus);

        assert_eq!(bus.drain::<MessageEvent>().len(), 1);
        assert!(bus.drain::<StateEvent>().is_empty());
    }
}
