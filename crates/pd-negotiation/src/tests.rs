//! Unit tests for pd-negotiation.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;

    use pd_belief::BeliefStore;
    use pd_core::{AgentConfig, AgentId, Position, Timestamp};
    use pd_spatial::TileMap;

    /// 5×5, spawn in one corner, delivery in the other.
    pub const MAP: &str = "
        S....
        .....
        .....
        .....
        ....D";

    pub fn agent(id: &str, mate: &str, at: Position) -> BeliefStore {
        let mut s = BeliefStore::new(AgentId::new(id), Arc::new(AgentConfig::default()));
        s.set_map(TileMap::parse(MAP).unwrap(), Timestamp(0));
        s.set_position(at, Timestamp(0));
        s.set_teammates([AgentId::new(mate)]);
        s
    }
}

// ── Codec ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod codec {
    use pd_core::{IntentionKind, ParcelId, Position};

    use crate::{Message, NegotiationError};

    #[test]
    fn type_and_data_envelope() {
        let text = Message::HelpHere { midpoint: Position::new(3, 1) }.encode().unwrap();
        assert_eq!(text, r#"{"type":"help_here","data":{"midpoint":{"x":3,"y":1}}}"#);
    }

    #[test]
    fn decodes_every_kind() {
        let cases = [
            (r#"{"type":"available_to_help","data":{"position":{"x":0,"y":1}}}"#,
             Message::AvailableToHelp { position: Position::new(0, 1) }),
            (r#"{"type":"not_available_to_help","data":{}}"#, Message::NotAvailableToHelp {}),
            (r#"{"type":"position_update","data":{"position":{"x":2,"y":2}}}"#,
             Message::PositionUpdate { position: Position::new(2, 2) }),
            (r#"{"type":"intention_update","data":{"kind":"courier_move"}}"#,
             Message::IntentionUpdate { kind: IntentionKind::CourierMove }),
            (r#"{"type":"book_parcel","data":{"ids":["p1","p2"]}}"#,
             Message::BookParcel { ids: vec![ParcelId::new("p1"), ParcelId::new("p2")] }),
        ];
        for (text, expected) in cases {
            assert_eq!(Message::decode(text).unwrap(), expected, "{text}");
        }
    }

    #[test]
    fn unknown_kind_rejected() {
        let err = Message::decode(r#"{"type":"dance","data":{}}"#).unwrap_err();
        assert!(matches!(err, NegotiationError::Malformed(_)));
    }

    #[test]
    fn garbage_rejected() {
        assert!(Message::decode("not json").is_err());
        assert!(Message::decode(r#"{"type":"help_here","data":{"midpoint":"here"}}"#).is_err());
    }

    #[test]
    fn kind_matches_wire_tag() {
        let msg = Message::BookParcel { ids: vec![] };
        assert!(msg.encode().unwrap().contains(&format!("\"{}\"", msg.kind())));
    }
}

// ── Midpoint ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod midpoint {
    use pd_core::Position;
    use pd_spatial::{MapIndex, TileMap};

    use crate::midpoint;

    fn pick(text: &str, a: Position, b: Position) -> Option<Position> {
        let map = TileMap::parse(text).unwrap();
        let index = MapIndex::build(&map);
        midpoint(&map, &index, a, b)
    }

    #[test]
    fn balanced_on_corridor() {
        assert_eq!(pick(".......", Position::new(0, 0), Position::new(6, 0)), Some(Position::new(3, 0)));
    }

    #[test]
    fn ties_prefer_distance_from_spawn() {
        let m = pick("S..\n...\n...", Position::new(0, 2), Position::new(2, 0));
        assert_eq!(m, Some(Position::new(2, 2)));
    }

    #[test]
    fn never_a_spawn_tile() {
        let m = pick("S.S", Position::new(0, 0), Position::new(2, 0));
        assert_eq!(m, Some(Position::new(1, 0)));
        assert_eq!(pick("SSS", Position::new(0, 0), Position::new(2, 0)), None);
    }

    #[test]
    fn disconnected_agents_have_none() {
        assert_eq!(pick("..#..", Position::new(0, 0), Position::new(4, 0)), None);
    }
}

// ── Handshake ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod handshake {
    use pd_core::{AgentId, IntentionKind, Position, Role, Timestamp};

    use super::helpers::agent;
    use crate::{Message, Negotiator, Outgoing};

    fn only(replies: &[Outgoing]) -> &Message {
        assert_eq!(replies.len(), 1);
        &replies[0].message
    }

    #[test]
    fn available_then_help_here_assigns_roles() {
        let (a_id, b_id) = (AgentId::new("a"), AgentId::new("b"));
        let mut a = agent("a", "b", Position::new(0, 1));
        let mut b = agent("b", "a", Position::new(2, 0));
        let mut na = Negotiator::new(&a);
        let mut nb = Negotiator::new(&b);

        let offer = Message::AvailableToHelp { position: Position::new(0, 1) };
        let rb = nb.handle(&mut b, None, &a_id, offer, Timestamp(10));
        assert!(rb.abort);
        assert_eq!(b.role(), Role::Explorer);
        let Message::HelpHere { midpoint } = only(&rb.replies).clone() else {
            panic!("expected help_here, got {:?}", rb.replies);
        };
        assert_eq!(rb.replies[0].to, a_id);
        assert_eq!(b.midpoint(), Some(midpoint));
        assert_eq!(b.teammate_position(&a_id), Some(Position::new(0, 1)));

        let ra = na.handle(&mut a, Some(IntentionKind::Move), &b_id, Message::HelpHere { midpoint }, Timestamp(20));
        assert!(ra.abort);
        assert!(ra.replies.is_empty());
        assert_eq!(a.role(), Role::Courier);
        assert_eq!(a.midpoint(), Some(midpoint));
        assert_eq!(a.collaboration().unwrap().partner, b_id);
    }

    #[test]
    fn busy_agent_declines_help_here() {
        let mut a = agent("a", "b", Position::new(0, 1));
        let mut na = Negotiator::new(&a);
        let r = na.handle(
            &mut a,
            Some(IntentionKind::Pickup),
            &AgentId::new("b"),
            Message::HelpHere { midpoint: Position::new(2, 2) },
            Timestamp(0),
        );
        assert!(!r.abort);
        assert_eq!(only(&r.replies), &Message::NotAvailableToHelp {});
        assert_eq!(a.role(), Role::None);
    }

    #[test]
    fn delivering_agent_ignores_offer() {
        let mut b = agent("b", "a", Position::new(2, 0));
        let mut nb = Negotiator::new(&b);
        let r = nb.handle(
            &mut b,
            Some(IntentionKind::Deliver),
            &AgentId::new("a"),
            Message::AvailableToHelp { position: Position::new(0, 1) },
            Timestamp(0),
        );
        assert_eq!(r, Default::default());
        assert_eq!(b.role(), Role::None);
    }

    #[test]
    fn duplicate_messages_are_idempotent() {
        let a_id = AgentId::new("a");
        let mut b = agent("b", "a", Position::new(2, 0));
        let mut nb = Negotiator::new(&b);
        let offer = Message::AvailableToHelp { position: Position::new(0, 1) };
        let first  = nb.handle(&mut b, None, &a_id, offer.clone(), Timestamp(0));
        let epoch  = b.role_epoch();
        let second = nb.handle(&mut b, None, &a_id, offer, Timestamp(5));
        assert!(!second.abort);
        assert_eq!(second.replies, first.replies);
        assert_eq!(b.role_epoch(), epoch);

        let mut a = agent("a", "b", Position::new(0, 1));
        let mut na = Negotiator::new(&a);
        let b_id = AgentId::new("b");
        let help = Message::HelpHere { midpoint: Position::new(2, 1) };
        assert!(na.handle(&mut a, None, &b_id, help.clone(), Timestamp(0)).abort);
        assert!(!na.handle(&mut a, None, &b_id, help, Timestamp(1)).abort);
        assert_eq!(a.role(), Role::Courier);
    }

    #[test]
    fn not_available_resets_partner_only() {
        let mut a = agent("a", "b", Position::new(0, 1));
        let mut na = Negotiator::new(&a);
        a.start_collaboration(Role::Courier, AgentId::new("b"), Position::new(2, 2), Timestamp(0));

        let r = na.handle(&mut a, None, &AgentId::new("b"), Message::NotAvailableToHelp {}, Timestamp(1));
        assert!(r.abort);
        assert_eq!(a.role(), Role::None);
        assert!(!a.is_collaborating());

        let again = na.handle(&mut a, None, &AgentId::new("b"), Message::NotAvailableToHelp {}, Timestamp(2));
        assert_eq!(again, Default::default());
    }

    #[test]
    fn strangers_are_ignored() {
        let mut a = agent("a", "b", Position::new(0, 1));
        let mut na = Negotiator::new(&a);
        let r = na.handle(
            &mut a,
            None,
            &AgentId::new("mallory"),
            Message::HelpHere { midpoint: Position::new(2, 2) },
            Timestamp(0),
        );
        assert_eq!(r, Default::default());
        assert_eq!(a.role(), Role::None);
    }

    #[test]
    fn teammate_facts_refreshed() {
        let b_id = AgentId::new("b");
        let mut a = agent("a", "b", Position::new(0, 1));
        let mut na = Negotiator::new(&a);
        na.handle(&mut a, None, &b_id, Message::PositionUpdate { position: Position::new(3, 3) }, Timestamp(0));
        na.handle(&mut a, None, &b_id, Message::IntentionUpdate { kind: IntentionKind::Deliver }, Timestamp(0));
        assert_eq!(a.teammate_position(&b_id), Some(Position::new(3, 3)));
        assert_eq!(a.teammate_intention(&b_id), Some(IntentionKind::Deliver));
    }
}

// ── Bookings ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod bookings {
    use pd_behavior::{pickup_candidates, RewardModel};
    use pd_belief::ParcelSighting;
    use pd_core::{AgentConfig, AgentId, ParcelId, Position, Timestamp};

    use super::helpers::agent;
    use crate::{Message, Negotiator};

    #[test]
    fn booked_parcel_leaves_candidate_set() {
        let mut a = agent("a", "b", Position::new(1, 1));
        a.sense_parcels(
            &[ParcelSighting {
                id: ParcelId::new("p1"),
                position: Position::new(2, 1),
                carried_by: None,
                reward: 20,
            }],
            Timestamp(0),
        );
        let model = RewardModel::from_config(&AgentConfig::default());
        assert_eq!(pickup_candidates(&a, &model, Timestamp(0)).count(), 1);

        let mut na = Negotiator::new(&a);
        let b_id = AgentId::new("b");
        na.handle(&mut a, None, &b_id, Message::BookParcel { ids: vec![ParcelId::new("p1")] }, Timestamp(0));
        assert_eq!(pickup_candidates(&a, &model, Timestamp(0)).count(), 0);

        na.handle(&mut a, None, &b_id, Message::BookParcel { ids: vec![] }, Timestamp(0));
        assert_eq!(pickup_candidates(&a, &model, Timestamp(0)).count(), 1);
    }
}

// ── Announcing and timeout ────────────────────────────────────────────────────

#[cfg(test)]
mod timing {
    use pd_belief::ParcelSighting;
    use pd_core::{AgentId, IntentionKind, ParcelId, Position, Role, Timestamp};

    use super::helpers::agent;
    use crate::{Message, Negotiator};

    #[test]
    fn announce_is_rate_limited() {
        let a = agent("a", "b", Position::new(0, 1));
        let mut na = Negotiator::new(&a);
        let max = a.config().announce_max_ms;

        assert!(na.maybe_announce(&a, None, Timestamp(0)).is_empty());
        let out = na.maybe_announce(&a, None, Timestamp(max));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, AgentId::new("b"));
        assert_eq!(out[0].message, Message::AvailableToHelp { position: Position::new(0, 1) });
        assert!(na.maybe_announce(&a, None, Timestamp(max + 1)).is_empty());
    }

    #[test]
    fn committed_agent_stays_quiet() {
        let mut a = agent("a", "b", Position::new(0, 1));
        let mut na = Negotiator::new(&a);
        let later = Timestamp(a.config().announce_max_ms * 2);
        na.maybe_announce(&a, None, Timestamp(0));
        assert!(na.maybe_announce(&a, Some(IntentionKind::Pickup), later).is_empty());

        a.sense_parcels(
            &[ParcelSighting {
                id: ParcelId::new("c"),
                position: Position::new(0, 1),
                carried_by: Some(AgentId::new("a")),
                reward: 5,
            }],
            Timestamp(0),
        );
        assert!(na.maybe_announce(&a, None, later).is_empty());
    }

    #[test]
    fn far_from_spawn_stays_quiet() {
        let a = agent("a", "b", Position::new(4, 4));
        let mut na = Negotiator::new(&a);
        na.maybe_announce(&a, None, Timestamp(0));
        let later = Timestamp(a.config().announce_max_ms * 2);
        assert!(na.maybe_announce(&a, None, later).is_empty());
    }

    #[test]
    fn stale_collaboration_times_out() {
        let mut b = agent("b", "a", Position::new(2, 0));
        let mut nb = Negotiator::new(&b);
        b.start_collaboration(Role::Explorer, AgentId::new("a"), Position::new(2, 1), Timestamp(0));
        let timeout = b.config().collaboration_timeout_ms;

        b.mark_collaboration_progress(Timestamp(1_000));
        assert!(nb.check_timeout(&mut b, Timestamp(timeout)).is_empty());
        assert!(b.is_collaborating());

        let out = nb.check_timeout(&mut b, Timestamp(1_000 + timeout));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message, Message::NotAvailableToHelp {});
        assert_eq!(b.role(), Role::None);
        assert!(nb.check_timeout(&mut b, Timestamp(1_000 + 2 * timeout)).is_empty());
    }
}
