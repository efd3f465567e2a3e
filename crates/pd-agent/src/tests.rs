//! Tests for pd-agent: builder validation, the loop against a scripted
//! gateway, and end-to-end runs against `pd-world`.

#[cfg(test)]
mod helpers {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

    use pd_behavior::{DropReason, Intention};
    use pd_belief::{ParcelSighting, SelfState};
    use pd_core::{AgentConfig, AgentId, Direction, ParcelId, Position, Role, Timestamp};
    use pd_executor::{EnvironmentGateway, OccupancyProbe, Perception, StepEvent};
    use pd_negotiation::Message;
    use pd_spatial::TileMap;

    use crate::AgentObserver;

    pub fn id(s: &str) -> AgentId {
        AgentId::new(s)
    }

    pub fn config() -> AgentConfig {
        AgentConfig { decay_interval_ms: None, ..Default::default() }
    }

    /// Gateway that accepts every move, answers pickups with `pickup_ok`
    /// and records what was said.
    #[derive(Default)]
    pub struct ScriptedGateway {
        pub pickup_ok: bool,
        pub pickups:   Mutex<usize>,
        pub said:      Mutex<Vec<(AgentId, Message)>>,
    }

    impl ScriptedGateway {
        pub fn new(pickup_ok: bool) -> Arc<Self> {
            Arc::new(Self { pickup_ok, ..Default::default() })
        }

        pub fn said_to(&self, to: &AgentId) -> Vec<Message> {
            self.said
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, _)| t == to)
                .map(|(_, m)| m.clone())
                .collect()
        }
    }

    #[async_trait]
    impl EnvironmentGateway for ScriptedGateway {
        async fn move_to(&self, _dir: Direction) -> bool { true }

        async fn pickup(&self) -> bool {
            *self.pickups.lock().unwrap() += 1;
            self.pickup_ok
        }

        async fn putdown(&self) -> bool { false }

        async fn say(&self, to: &AgentId, payload: String) {
            let message = Message::decode(&payload).unwrap();
            self.said.lock().unwrap().push((to.clone(), message));
        }
    }

    #[async_trait]
    impl OccupancyProbe for ScriptedGateway {
        async fn is_occupied(&self, _pos: Position) -> bool { false }
    }

    /// Perceptions a fresh agent at `at` would receive on `map`.
    pub fn initial_view(
        me:      &AgentId,
        map:     &str,
        at:      Position,
        parcels: Vec<ParcelSighting>,
    ) -> (UnboundedSender<Perception>, UnboundedReceiver<Perception>) {
        let (tx, rx) = unbounded_channel();
        let tiles = TileMap::parse(map).unwrap().tiles().collect();
        tx.send(Perception::Map(tiles)).unwrap();
        tx.send(Perception::SelfState(SelfState {
            id:    me.clone(),
            name:  me.as_str().to_string(),
            x:     at.x as f32,
            y:     at.y as f32,
            score: 0,
        }))
        .unwrap();
        tx.send(Perception::Parcels(parcels)).unwrap();
        (tx, rx)
    }

    pub fn parcel(name: &str, at: Position, reward: u32) -> ParcelSighting {
        ParcelSighting { id: ParcelId::new(name), position: at, carried_by: None, reward }
    }

    /// Observer that keeps everything it is told.
    #[derive(Default)]
    pub struct Recorder {
        pub ticks:   usize,
        pub steps:   Vec<StepEvent>,
        pub adopted: Vec<Intention>,
        /// Step events already seen when each intention was adopted.
        pub adopted_after: Vec<usize>,
        pub dropped: Vec<(Intention, DropReason)>,
        pub roles:   Vec<(Role, Role)>,
        pub stopped: bool,
    }

    impl Recorder {
        pub fn drops(&self, reason: DropReason) -> usize {
            self.dropped.iter().filter(|(_, r)| *r == reason).count()
        }
    }

    impl AgentObserver for Recorder {
        fn on_tick(&mut self, _: &AgentId, _: Timestamp) {
            self.ticks += 1;
        }
        fn on_step(&mut self, _: &AgentId, event: &StepEvent, _: Timestamp) {
            self.steps.push(event.clone());
        }
        fn on_intention_adopted(&mut self, _: &AgentId, i: &Intention, _: Timestamp) {
            self.adopted.push(i.clone());
            self.adopted_after.push(self.steps.len());
        }
        fn on_intention_dropped(&mut self, _: &AgentId, i: &Intention, r: DropReason, _: Timestamp) {
            self.dropped.push((i.clone(), r));
        }
        fn on_role_changed(&mut self, _: &AgentId, from: Role, to: Role, _: Timestamp) {
            self.roles.push((from, to));
        }
        fn on_stop(&mut self, _: &AgentId, _: Timestamp) {
            self.stopped = true;
        }
    }
}

// ── Builder validation ────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use pd_core::AgentConfig;

    use super::helpers::{config, id, ScriptedGateway};
    use crate::{AgentBuilder, AgentError};

    #[tokio::test]
    async fn builds_with_defaults() {
        let gw = ScriptedGateway::new(true);
        let agent = AgentBuilder::standard(id("a"), config(), gw.clone(), gw)
            .teammates([id("b")])
            .build()
            .unwrap();
        assert_eq!(agent.id(), &id("a"));
        assert_eq!(agent.beliefs().read().await.teammates().count(), 1);
    }

    #[test]
    fn rejects_empty_identity() {
        let gw = ScriptedGateway::new(true);
        let result = AgentBuilder::standard(id("  "), config(), gw.clone(), gw).build();
        assert!(matches!(result, Err(AgentError::Identity(_))));
    }

    #[test]
    fn rejects_invalid_config() {
        let gw = ScriptedGateway::new(true);
        let bad = AgentConfig { tick_multiplier: 0, ..Default::default() };
        let result = AgentBuilder::standard(id("a"), bad, gw.clone(), gw).build();
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[test]
    fn rejects_bad_teammates() {
        let gw = ScriptedGateway::new(true);
        let own = AgentBuilder::standard(id("a"), config(), gw.clone(), gw.clone())
            .teammates([id("a")])
            .build();
        assert!(matches!(own, Err(AgentError::Teammate { .. })));

        let twice = AgentBuilder::standard(id("a"), config(), gw.clone(), gw)
            .teammates([id("b"), id("b")])
            .build();
        assert!(matches!(twice, Err(AgentError::Teammate { reason: "declared twice", .. })));
    }
}

// ── Loop against a scripted gateway ───────────────────────────────────────────

#[cfg(test)]
mod scripted {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use pd_behavior::{DropReason, Intention};
    use pd_core::{Position, Role};
    use pd_executor::Perception;
    use pd_negotiation::Message;

    use super::helpers::{config, id, initial_view, parcel, Recorder, ScriptedGateway};
    use crate::AgentBuilder;

    #[tokio::test(start_paused = true)]
    async fn failed_pickup_is_replanned_once_then_dropped() {
        let gw = ScriptedGateway::new(false);
        let token = CancellationToken::new();
        let agent = AgentBuilder::standard(id("a"), config(), gw.clone(), gw.clone())
            .shutdown(token.clone())
            .build()
            .unwrap();
        let (_tx, rx) = initial_view(&id("a"), "...\n..D", Position::new(0, 0), vec![
            parcel("p1", Position::new(0, 0), 10),
        ]);

        let task = tokio::spawn(async move {
            let mut rec = Recorder::default();
            let summary = agent.run(rx, &mut rec).await;
            (summary, rec)
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
        let (summary, rec) = task.await.unwrap();

        assert_eq!(summary.plans_started, 2, "first plan plus one fallback");
        assert_eq!(summary.plans_failed, 2);
        assert_eq!(rec.drops(DropReason::PlanFailed), 2);
        assert_eq!(*gw.pickups.lock().unwrap(), 2);
        assert!(matches!(rec.adopted[0], Intention::Pickup { .. }));
        assert!(rec.stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn pickups_are_booked_then_released() {
        let gw = ScriptedGateway::new(true);
        let token = CancellationToken::new();
        let agent = AgentBuilder::standard(id("a"), config(), gw.clone(), gw.clone())
            .teammates([id("b")])
            .shutdown(token.clone())
            .build()
            .unwrap();
        let (_tx, rx) = initial_view(&id("a"), "...\n..D", Position::new(0, 0), vec![
            parcel("p1", Position::new(1, 0), 10),
        ]);

        let task = tokio::spawn(async move { agent.run(rx, &mut Recorder::default()).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
        task.await.unwrap();

        let to_b = gw.said_to(&id("b"));
        let bookings: Vec<&Message> = to_b.iter().filter(|m| matches!(m, Message::BookParcel { .. })).collect();
        assert!(matches!(bookings[0], Message::BookParcel { ids } if ids.len() == 1));
        assert!(matches!(bookings[1], Message::BookParcel { ids } if ids.is_empty()));
        assert!(to_b.iter().any(|m| matches!(m, Message::PositionUpdate { position } if *position == Position::new(1, 0))));
    }

    #[tokio::test(start_paused = true)]
    async fn offer_from_teammate_makes_explorer_and_shutdown_leaves() {
        let gw = ScriptedGateway::new(true);
        let token = CancellationToken::new();
        let agent = AgentBuilder::standard(id("a"), config(), gw.clone(), gw.clone())
            .teammates([id("b")])
            .shutdown(token.clone())
            .build()
            .unwrap();
        let beliefs = agent.beliefs();
        let (tx, rx) = initial_view(&id("a"), "S....\n.....\n....D", Position::new(0, 0), vec![]);
        let offer = Message::AvailableToHelp { position: Position::new(4, 1) };
        tx.send(Perception::Message { from: id("b"), payload: offer.encode().unwrap() }).unwrap();

        let task = tokio::spawn(async move {
            let mut rec = Recorder::default();
            agent.run(rx, &mut rec).await;
            rec
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(beliefs.read().await.role(), Role::Explorer);
        token.cancel();
        let rec = task.await.unwrap();

        assert_eq!(rec.roles.first(), Some(&(Role::None, Role::Explorer)));
        let to_b = gw.said_to(&id("b"));
        assert!(matches!(to_b.first(), Some(Message::HelpHere { .. })));
        assert_eq!(to_b.last(), Some(&Message::NotAvailableToHelp {}));
        assert!(!beliefs.read().await.is_collaborating());
    }

    #[tokio::test(start_paused = true)]
    async fn strangers_and_garbage_are_ignored() {
        let gw = ScriptedGateway::new(true);
        let token = CancellationToken::new();
        let agent = AgentBuilder::standard(id("a"), config(), gw.clone(), gw.clone())
            .teammates([id("b")])
            .shutdown(token.clone())
            .build()
            .unwrap();
        let beliefs = agent.beliefs();
        let (tx, rx) = initial_view(&id("a"), "S....\n....D", Position::new(0, 0), vec![]);
        let offer = Message::AvailableToHelp { position: Position::new(4, 1) };
        tx.send(Perception::Message { from: id("z"), payload: offer.encode().unwrap() }).unwrap();
        tx.send(Perception::Message { from: id("b"), payload: "{not json".into() }).unwrap();

        let task = tokio::spawn(async move { agent.run(rx, &mut Recorder::default()).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(beliefs.read().await.role(), Role::None);
        assert!(gw.said_to(&id("z")).is_empty());
        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn closed_perception_stream_ends_the_loop() {
        let gw = ScriptedGateway::new(true);
        let agent = AgentBuilder::standard(id("a"), config(), gw.clone(), gw).build().unwrap();
        let (tx, rx) = initial_view(&id("a"), "..D", Position::new(0, 0), vec![]);
        drop(tx);
        let mut rec = Recorder::default();
        agent.run(rx, &mut rec).await;
        assert!(rec.stopped);
    }
}

// ── End to end against pd-world ───────────────────────────────────────────────

#[cfg(test)]
mod world {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use tokio::sync::RwLock;

    use pd_behavior::{DropReason, Intention};
    use pd_belief::BeliefStore;
    use pd_core::{Action, AgentConfig, AgentId, Direction, IntentionKind, Position, Role};
    use pd_executor::StepStatus;
    use pd_spatial::TileMap;
    use pd_world::{World, WorldConfig};

    use super::helpers::{config, id, Recorder};
    use crate::{AgentBuilder, RunSummary};

    fn world(map: &str) -> World {
        let cfg = WorldConfig { decay_interval_ms: None, max_parcels: 0, ..Default::default() };
        World::new(TileMap::parse(map).unwrap(), cfg)
    }

    type Running = tokio::task::JoinHandle<(RunSummary, Recorder)>;

    async fn launch(
        w:         &World,
        me:        AgentId,
        at:        Position,
        teammates: Vec<AgentId>,
        token:     &CancellationToken,
    ) -> Running {
        launch_with(w, me, at, teammates, config(), token).await.0
    }

    async fn launch_with(
        w:         &World,
        me:        AgentId,
        at:        Position,
        teammates: Vec<AgentId>,
        config:    AgentConfig,
        token:     &CancellationToken,
    ) -> (Running, Arc<RwLock<BeliefStore>>) {
        let (gw, rx) = w.connect(me.clone(), me.as_str(), at).await.unwrap();
        let gw = Arc::new(gw);
        let agent = AgentBuilder::standard(me, config, gw.clone(), gw)
            .teammates(teammates)
            .shutdown(token.child_token())
            .build()
            .unwrap();
        let beliefs = agent.beliefs();
        let task = tokio::spawn(async move {
            let mut rec = Recorder::default();
            let summary = agent.run(rx, &mut rec).await;
            (summary, rec)
        });
        (task, beliefs)
    }

    #[tokio::test(start_paused = true)]
    async fn single_agent_picks_up_and_delivers() {
        let w = world("....\n...D");
        w.spawn_parcel(Position::new(2, 0), 10).await.unwrap();
        let token = CancellationToken::new();
        let task = launch(&w, id("a"), Position::new(0, 0), vec![], &token).await;

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(w.score(&id("a")).await, Some(10));
        assert_eq!(w.parcel_count().await, 0);

        token.cancel();
        let (summary, rec) = task.await.unwrap();
        assert!(summary.plans_completed >= 2);
        assert!(rec.adopted.iter().any(|i| i.kind().is_deliver_family()));
        assert!(rec.steps.iter().any(|s| s.position == Position::new(3, 1)));
        assert!(rec.stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn teammates_deliver_every_parcel() {
        let w = world("....D\n.....\nD....");
        w.spawn_parcel(Position::new(1, 1), 10).await.unwrap();
        w.spawn_parcel(Position::new(3, 1), 20).await.unwrap();
        let token = CancellationToken::new();
        let a = launch(&w, id("a"), Position::new(0, 1), vec![id("b")], &token).await;
        let b = launch(&w, id("b"), Position::new(4, 1), vec![id("a")], &token).await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(w.total_score().await, 30);
        assert_eq!(w.parcel_count().await, 0);

        token.cancel();
        a.await.unwrap();
        b.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_running_plan() {
        let w = world("..........");
        let token = CancellationToken::new();
        let task = launch(&w, id("a"), Position::new(0, 0), vec![], &token).await;

        // Long enough for the first exploration move to be under way.
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
        let (summary, rec) = task.await.unwrap();
        assert_eq!(summary.plans_started, 1);
        assert_eq!(summary.plans_cancelled, 1);
        assert_eq!(rec.drops(DropReason::Cancelled), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spotted_parcel_cancels_exploration_and_is_picked_up() {
        let w = world("D..............");
        let token = CancellationToken::new();
        let task = launch(&w, id("a"), Position::new(2, 0), vec![], &token).await;

        // One move into the walk towards (7, 0), a parcel shows up behind.
        tokio::time::sleep(Duration::from_millis(600)).await;
        w.spawn_parcel(Position::new(2, 0), 10).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(w.score(&id("a")).await, Some(10));

        token.cancel();
        let (summary, rec) = task.await.unwrap();
        assert_eq!(summary.plans_cancelled, 1);
        assert_eq!(summary.plans_failed, 0);
        assert_eq!(rec.drops(DropReason::ParcelSpotted), 1);
        assert!(rec.steps.iter().all(|s| s.status != StepStatus::Failed));

        // The pickup plan was adopted only after every move of the
        // cancelled walk had been applied.
        let pickup = rec.adopted.iter().position(|i| matches!(i, Intention::Pickup { .. })).unwrap();
        let last_right = rec
            .steps
            .iter()
            .rposition(|s| s.action == Action::Move(Direction::Right))
            .unwrap();
        assert!(rec.adopted_after[pickup] > last_right);

        let picked = rec.steps.iter().find(|s| s.action == Action::Pickup).unwrap();
        assert_eq!(picked.status, StepStatus::Ok);
        assert_eq!(picked.position, Position::new(2, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn explorer_hands_off_to_courier_at_midpoint() {
        let w = world("DS..................S");
        let token = CancellationToken::new();
        let patient = |c: AgentConfig| AgentConfig { collaboration_timeout_ms: 120_000, ..c };
        // `a` sees the whole corridor and offers help after one second.  `b`
        // never offers and, with nothing to explore, stays on its spawn tile
        // until a parcel shows up.
        let courier = patient(AgentConfig {
            parcels_observation_distance: 30,
            announce_min_ms: 1_000,
            announce_max_ms: 1_000,
            ..config()
        });
        let explorer = patient(AgentConfig {
            announce_min_ms:       3_600_000,
            announce_max_ms:       3_600_000,
            explore_lookahead:     0,
            min_fallback_distance: 0,
            ..config()
        });
        let (a, a_beliefs) = launch_with(&w, id("a"), Position::new(2, 0), vec![id("b")], courier, &token).await;
        let (b, b_beliefs) = launch_with(&w, id("b"), Position::new(20, 0), vec![id("a")], explorer, &token).await;

        let mut waited = 0;
        while b_beliefs.read().await.role() != Role::Explorer || a_beliefs.read().await.role() != Role::Courier {
            assert!(waited < 20, "collaboration never formed");
            tokio::time::sleep(Duration::from_millis(500)).await;
            waited += 1;
        }
        let midpoint = b_beliefs.read().await.midpoint().unwrap();
        assert_eq!(a_beliefs.read().await.midpoint(), Some(midpoint));

        // Next to the explorer, out of the courier's sight.
        let far = Position::new(19, 0);
        assert!(far.manhattan(midpoint) > 5);
        w.spawn_parcel(far, 10).await.unwrap();

        let mut waited = 0;
        while w.score(&id("a")).await != Some(10) {
            assert!(waited < 120, "parcel never delivered by the courier");
            tokio::time::sleep(Duration::from_secs(1)).await;
            waited += 1;
        }
        assert_eq!(w.score(&id("b")).await, Some(0));

        token.cancel();
        let (_, rec_a) = a.await.unwrap();
        let (_, rec_b) = b.await.unwrap();

        assert!(rec_a.roles.contains(&(Role::None, Role::Courier)));
        assert!(rec_b.roles.contains(&(Role::None, Role::Explorer)));

        let kinds = |rec: &Recorder| rec.adopted.iter().map(Intention::kind).collect::<Vec<_>>();
        let b_kinds = kinds(&rec_b);
        let b_pickup = b_kinds.iter().position(|k| *k == IntentionKind::ExplorerPickup).unwrap();
        let b_deliver = b_kinds.iter().rposition(|k| *k == IntentionKind::ExplorerDeliver).unwrap();
        assert!(b_pickup < b_deliver);
        let dropped_off = rec_b.steps.iter().find(|s| s.action == Action::Putdown).unwrap();
        assert_eq!((dropped_off.status, dropped_off.position), (StepStatus::Ok, midpoint));

        let a_kinds = kinds(&rec_a);
        let a_pickup = a_kinds.iter().position(|k| *k == IntentionKind::CourierPickup).unwrap();
        let a_deliver = a_kinds.iter().rposition(|k| *k == IntentionKind::CourierDeliver).unwrap();
        assert!(a_pickup < a_deliver);
        let picked = rec_a.steps.iter().find(|s| s.action == Action::Pickup && s.status == StepStatus::Ok).unwrap();
        assert_eq!(picked.position, midpoint);
    }
}
