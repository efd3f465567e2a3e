//! The `Agent` struct and its deliberation loop.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use pd_behavior::{DeliberationContext, DesireModel, DropReason, Intention, IntentionManager, RewardModel};
use pd_belief::BeliefStore;
use pd_core::{AgentConfig, AgentId, Role, Timestamp};
use pd_executor::{
    EnvironmentGateway, ExecutionOutcome, ExecutorResult, OccupancyProbe, Perception, PlanExecutor,
    StepEvent, StepStatus,
};
use pd_negotiation::{Message, Negotiator, Outgoing};
use pd_planner::{Plan, PlanContext, PlanSource};
use pd_spatial::TileMap;

use crate::AgentObserver;

type PlanOutcome = Result<ExecutorResult<ExecutionOutcome>, JoinError>;

// ── Running plan ──────────────────────────────────────────────────────────────

/// The one plan an agent may have in flight.
struct RunningPlan {
    handle:    JoinHandle<ExecutorResult<ExecutionOutcome>>,
    cancel:    CancellationToken,
    intention: Intention,
    /// Parcels were booked with teammates and must be released.
    booked:    bool,
    /// This plan is already the replan of a failed one.
    fallback:  bool,
}

/// Resolves when the running plan's task ends; never resolves when idle.
async fn plan_finished(running: &mut Option<RunningPlan>) -> PlanOutcome {
    match running {
        Some(run) => (&mut run.handle).await,
        None      => std::future::pending().await,
    }
}

/// Counters returned by [`Agent::run`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks:           u64,
    pub plans_started:   u64,
    pub plans_completed: u64,
    pub plans_failed:    u64,
    pub plans_cancelled: u64,
}

// ── Agent ─────────────────────────────────────────────────────────────────────

/// One autonomous courier.
///
/// `Agent<D, P>` owns the belief store and drives a single-threaded loop
/// over four event sources:
///
/// 1. **Perception**: mutates beliefs, runs negotiation handlers and
///    revises the active intention.  Never plans.
/// 2. **Tick** (every `tick_multiplier × movement_duration_ms`): collaboration
///    timeout and availability announcements; cancels the running plan if
///    an abort was requested; when idle, generates desires and starts the
///    first one that plans to a non-empty plan.
/// 3. **Step events** from the executor task.
/// 4. **Plan completion**: success archives the intention; failure releases
///    bookings, drops the intention and replans it once.
///
/// At most one plan runs at a time.  Create via
/// [`AgentBuilder`][crate::AgentBuilder].
pub struct Agent<D: DesireModel, P: PlanSource> {
    id:     AgentId,
    config: Arc<AgentConfig>,

    /// Shared with observers; the planner works on a cloned snapshot.
    beliefs: Arc<RwLock<BeliefStore>>,

    desires:    D,
    planner:    P,
    manager:    IntentionManager,
    negotiator: Negotiator,
    executor:   Arc<PlanExecutor>,
    gateway:    Arc<dyn EnvironmentGateway>,

    shutdown: CancellationToken,
    started:  Instant,

    running:         Option<RunningPlan>,
    abort_requested: bool,
    step_tx:         UnboundedSender<StepEvent>,
    step_rx:         UnboundedReceiver<StepEvent>,
    summary:         RunSummary,
}

impl<D: DesireModel, P: PlanSource> Agent<D, P> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id:        AgentId,
        config:    Arc<AgentConfig>,
        teammates: Vec<AgentId>,
        desires:   D,
        planner:   P,
        gateway:   Arc<dyn EnvironmentGateway>,
        probe:     Arc<dyn OccupancyProbe>,
        shutdown:  CancellationToken,
    ) -> Self {
        let mut store = BeliefStore::new(id.clone(), config.clone());
        store.set_teammates(teammates);
        let negotiator = Negotiator::new(&store);
        let executor = Arc::new(PlanExecutor::new(gateway.clone(), probe, &config));
        let (step_tx, step_rx) = unbounded_channel();
        Self {
            manager: IntentionManager::new(RewardModel::from_config(&config)),
            id,
            config,
            beliefs: Arc::new(RwLock::new(store)),
            desires,
            planner,
            negotiator,
            executor,
            gateway,
            shutdown,
            started: Instant::now(),
            running: None,
            abort_requested: false,
            step_tx,
            step_rx,
            summary: RunSummary::default(),
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Handle on the belief store, for inspection while the agent runs.
    pub fn beliefs(&self) -> Arc<RwLock<BeliefStore>> {
        self.beliefs.clone()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn now(&self) -> Timestamp {
        Timestamp::from_elapsed(self.started.elapsed())
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Run until the shutdown token fires or the perception stream closes.
    pub async fn run<O: AgentObserver>(
        mut self,
        mut perceptions: UnboundedReceiver<Perception>,
        observer:        &mut O,
    ) -> RunSummary {
        let teammates = self.beliefs.read().await.teammates().count();
        info!(agent = %self.id, teammates, "agent started");
        let mut tick = interval(self.config.tick_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!(agent = %self.id, "shutdown requested");
                    break;
                }
                Some(event) = self.step_rx.recv() => self.on_step(event, observer).await,
                outcome = plan_finished(&mut self.running) => self.on_plan_finished(outcome, observer).await,
                perception = perceptions.recv() => match perception {
                    Some(p) => self.on_perception(p, observer).await,
                    None => {
                        info!(agent = %self.id, "perception stream closed");
                        break;
                    }
                },
                _ = tick.tick() => self.on_tick(observer).await,
            }
        }

        self.stop(observer).await;
        self.summary
    }

    // ── Perception ────────────────────────────────────────────────────────

    async fn on_perception<O: AgentObserver>(&mut self, perception: Perception, observer: &mut O) {
        let now = self.now();
        let active = self.manager.active().map(Intention::kind);
        let mut replies: Vec<Outgoing> = Vec::new();

        let (role_change, dropped) = {
            let mut b = self.beliefs.write().await;
            let role_before = b.role();
            match perception {
                Perception::SelfState(s)  => b.sense_self(&s, now),
                Perception::Parcels(v)    => b.sense_parcels(&v, now),
                Perception::Agents(v)     => b.sense_agents(&v, now),
                Perception::Map(tiles) => match TileMap::from_tiles(&tiles) {
                    Ok(map) => {
                        info!(agent = %self.id, width = map.width(), height = map.height(), "map received");
                        b.set_map(map, now);
                    }
                    Err(e) => warn!(agent = %self.id, error = %e, "unusable map"),
                },
                Perception::Message { from, payload } => match Message::decode(&payload) {
                    Ok(message) => {
                        let reaction = self.negotiator.handle(&mut b, active, &from, message, now);
                        self.abort_requested |= reaction.abort;
                        replies = reaction.replies;
                    }
                    Err(e) => debug!(agent = %self.id, from = %from, error = %e, "dropping malformed message"),
                },
            }
            let role_after = b.role();
            let before = self.manager.active().cloned();
            let dropped = self.manager.revise(&b, now).and_then(|r| before.map(|i| (i, r)));
            ((role_before != role_after).then_some((role_before, role_after)), dropped)
        };

        self.report(role_change, dropped, observer, now);
        self.send(replies).await;
    }

    fn report<O: AgentObserver>(
        &mut self,
        role_change: Option<(Role, Role)>,
        dropped:     Option<(Intention, DropReason)>,
        observer:    &mut O,
        now:         Timestamp,
    ) {
        if let Some((from, to)) = role_change {
            observer.on_role_changed(&self.id, from, to, now);
        }
        if let Some((intention, reason)) = dropped {
            observer.on_intention_dropped(&self.id, &intention, reason, now);
            if self.running.is_some() {
                self.abort_requested = true;
            }
        }
    }

    // ── Tick ──────────────────────────────────────────────────────────────

    async fn on_tick<O: AgentObserver>(&mut self, observer: &mut O) {
        let now = self.now();
        self.summary.ticks += 1;
        observer.on_tick(&self.id, now);
        let active = self.manager.active().map(Intention::kind);

        let (out, role_change, dropped) = {
            let mut b = self.beliefs.write().await;
            if b.position().is_none() || b.map().is_none() {
                trace!(agent = %self.id, "waiting for position and map");
                return;
            }
            let role_before = b.role();
            let mut out = self.negotiator.check_timeout(&mut b, now);
            out.extend(self.negotiator.maybe_announce(&b, active, now));
            let role_after = b.role();
            let before = self.manager.active().cloned();
            let dropped = self.manager.revise(&b, now).and_then(|r| before.map(|i| (i, r)));
            (out, (role_before != role_after).then_some((role_before, role_after)), dropped)
        };
        self.report(role_change, dropped, observer, now);
        self.send(out).await;

        if self.running.is_some() {
            if !self.abort_requested {
                return;
            }
            self.cancel_running(observer).await;
        }
        self.deliberate(observer).await;
    }

    /// Desire → intention → plan; start the first non-empty plan.
    async fn deliberate<O: AgentObserver>(&mut self, observer: &mut O) {
        let now = self.now();
        let snapshot = self.beliefs.read().await.clone();
        let desires = self.desires.generate(&snapshot, &DeliberationContext { now });
        let ctx = PlanContext { now };
        for intention in desires {
            match self.planner.plan_for(&intention, &snapshot, &ctx).await {
                Some(plan) if !plan.is_empty() => {
                    self.start(plan, &snapshot, observer, false).await;
                    return;
                }
                _ => trace!(agent = %self.id, intention = %intention, "desire not plannable"),
            }
        }
        debug!(agent = %self.id, "no viable plan this tick");
    }

    // ── Plan lifecycle ────────────────────────────────────────────────────

    async fn start<O: AgentObserver>(
        &mut self,
        plan:     Plan,
        snapshot: &BeliefStore,
        observer: &mut O,
        fallback: bool,
    ) {
        let Some(from) = snapshot.position() else { return };
        let now = self.now();
        let intention = plan.intention.clone();
        if self.manager.adopt(intention.clone(), snapshot, now) {
            observer.on_intention_adopted(&self.id, &intention, now);
        }

        let booked = intention.kind().is_pickup_family();
        let mut out = Vec::new();
        if booked {
            let ids = intention.candidates().to_vec();
            out.extend(Negotiator::broadcast(snapshot, Message::BookParcel { ids }));
        }
        out.extend(Negotiator::broadcast(snapshot, Message::IntentionUpdate { kind: intention.kind() }));
        out.extend(Negotiator::broadcast(snapshot, Message::PositionUpdate { position: from }));
        self.send(out).await;

        let cancel   = self.shutdown.child_token();
        let token    = cancel.clone();
        let executor = self.executor.clone();
        let events   = self.step_tx.clone();
        info!(agent = %self.id, intention = %intention, actions = plan.len(), fallback, "executing plan");
        let handle = tokio::spawn(async move { executor.execute(plan, from, &token, &events).await });

        self.running = Some(RunningPlan { handle, cancel, intention, booked, fallback });
        self.abort_requested = false;
        self.summary.plans_started += 1;
    }

    async fn cancel_running<O: AgentObserver>(&mut self, observer: &mut O) {
        if let Some(mut run) = self.running.take() {
            debug!(agent = %self.id, intention = %run.intention, "aborting running plan");
            run.cancel.cancel();
            let outcome = (&mut run.handle).await;
            self.drain_steps(observer).await;
            self.settle(run, outcome, observer, false).await;
        }
        self.abort_requested = false;
    }

    async fn on_plan_finished<O: AgentObserver>(&mut self, outcome: PlanOutcome, observer: &mut O) {
        if let Some(run) = self.running.take() {
            self.drain_steps(observer).await;
            self.settle(run, outcome, observer, true).await;
        }
    }

    /// Apply step events the finished task sent but the loop has not seen
    /// yet, so the next plan starts from the tile the agent really is on.
    async fn drain_steps<O: AgentObserver>(&mut self, observer: &mut O) {
        while let Ok(event) = self.step_rx.try_recv() {
            self.on_step(event, observer).await;
        }
    }

    async fn settle<O: AgentObserver>(
        &mut self,
        run:      RunningPlan,
        outcome:  PlanOutcome,
        observer: &mut O,
        replan:   bool,
    ) {
        let now = self.now();
        if run.booked {
            self.unbook().await;
        }
        match outcome {
            Ok(Ok(ExecutionOutcome::Completed { position })) => {
                self.summary.plans_completed += 1;
                debug!(agent = %self.id, intention = %run.intention, at = %position, "plan completed");
                if run.intention.kind().is_deliver_family() {
                    self.beliefs.write().await.mark_collaboration_progress(now);
                }
                self.drop_intention(&run.intention, DropReason::Achieved, observer, now);
            }
            Ok(Ok(ExecutionOutcome::Cancelled { executed, .. })) => {
                self.summary.plans_cancelled += 1;
                debug!(agent = %self.id, intention = %run.intention, executed, "plan cancelled");
                self.drop_intention(&run.intention, DropReason::Cancelled, observer, now);
            }
            Ok(Err(e)) => {
                self.summary.plans_failed += 1;
                warn!(agent = %self.id, intention = %run.intention, error = %e, "plan failed");
                self.drop_intention(&run.intention, DropReason::PlanFailed, observer, now);
                if replan && !run.fallback {
                    self.fallback(run.intention, observer).await;
                }
            }
            Err(e) => {
                self.summary.plans_failed += 1;
                warn!(agent = %self.id, intention = %run.intention, error = %e, "executor task ended abnormally");
                self.drop_intention(&run.intention, DropReason::PlanFailed, observer, now);
            }
        }
    }

    /// One replan of a failed intention, if it survives revision.
    async fn fallback<O: AgentObserver>(&mut self, intention: Intention, observer: &mut O) {
        let now = self.now();
        let snapshot = self.beliefs.read().await.clone();
        if self.manager.adopt(intention.clone(), &snapshot, now) {
            observer.on_intention_adopted(&self.id, &intention, now);
        }
        if let Some(reason) = self.manager.revise(&snapshot, now) {
            observer.on_intention_dropped(&self.id, &intention, reason, now);
            return;
        }
        match self.planner.plan_for(&intention, &snapshot, &PlanContext { now }).await {
            Some(plan) if !plan.is_empty() => self.start(plan, &snapshot, observer, true).await,
            _ => {
                debug!(agent = %self.id, intention = %intention, "fallback replan found nothing");
                self.drop_intention(&intention, DropReason::Unplannable, observer, now);
            }
        }
    }

    /// Archive `intention` if it is still the active one.  Intentions
    /// already dropped by revision were reported then.
    fn drop_intention<O: AgentObserver>(
        &mut self,
        intention: &Intention,
        reason:    DropReason,
        observer:  &mut O,
        now:       Timestamp,
    ) {
        if self.manager.active() == Some(intention) {
            self.manager.drop_active(reason, now);
            observer.on_intention_dropped(&self.id, intention, reason, now);
        }
    }

    // ── Steps ─────────────────────────────────────────────────────────────

    async fn on_step<O: AgentObserver>(&mut self, event: StepEvent, observer: &mut O) {
        let now = self.now();
        observer.on_step(&self.id, &event, now);
        if event.status == StepStatus::Ok && event.action.is_move() {
            let out = {
                let mut b = self.beliefs.write().await;
                b.set_position(event.position, now);
                Negotiator::broadcast(&b, Message::PositionUpdate { position: event.position })
            };
            self.send(out).await;
        }
    }

    // ── Messaging ─────────────────────────────────────────────────────────

    async fn send(&self, out: Vec<Outgoing>) {
        for o in out {
            match o.message.encode() {
                Ok(payload) => self.gateway.say(&o.to, payload).await,
                Err(e) => warn!(agent = %self.id, to = %o.to, error = %e, "message not encodable"),
            }
        }
    }

    async fn unbook(&self) {
        let out = Negotiator::broadcast(&*self.beliefs.read().await, Message::BookParcel { ids: vec![] });
        self.send(out).await;
    }

    // ── Shutdown ──────────────────────────────────────────────────────────

    async fn stop<O: AgentObserver>(&mut self, observer: &mut O) {
        self.cancel_running(observer).await;
        let now = self.now();
        let out = {
            let mut b = self.beliefs.write().await;
            let out = b
                .collaboration()
                .map(|c| vec![Outgoing::new(c.partner.clone(), Message::NotAvailableToHelp {})])
                .unwrap_or_default();
            b.reset_collaboration();
            out
        };
        self.send(out).await;
        observer.on_stop(&self.id, now);
        info!(agent = %self.id, summary = ?self.summary, "agent stopped");
    }
}
