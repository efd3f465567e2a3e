//! Tests for pd-output.

#[cfg(test)]
mod csv_tests {
    use tempfile::TempDir;

    use crate::csv::CsvTraceWriter;
    use crate::row::{IntentionEvent, IntentionRow, StepRow};
    use crate::writer::TraceWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn step_row(index: usize) -> StepRow {
        StepRow {
            agent:   "a".into(),
            at_ms:   500 * index as u64,
            index,
            action:  "move_right",
            attempt: 0,
            status:  "ok".into(),
            x:       index as i32 + 1,
            y:       0,
        }
    }

    fn headers(path: std::path::PathBuf) -> Vec<String> {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        rdr.headers().unwrap().iter().map(str::to_owned).collect()
    }

    #[test]
    fn files_created_in_nested_dir() {
        let dir = tmp();
        let nested = dir.path().join("trace").join("alice");
        let _w = CsvTraceWriter::new(&nested).unwrap();
        assert!(nested.join("steps.csv").exists());
        assert!(nested.join("intentions.csv").exists());
    }

    #[test]
    fn headers_correct() {
        let dir = tmp();
        let mut w = CsvTraceWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        assert_eq!(headers(dir.path().join("steps.csv")), ["agent", "at_ms", "index", "action", "attempt", "status", "x", "y"]);
        assert_eq!(headers(dir.path().join("intentions.csv")), ["agent", "at_ms", "event", "subject", "detail"]);
    }

    #[test]
    fn step_rows_written_in_order() {
        let dir = tmp();
        let mut w = CsvTraceWriter::new(dir.path()).unwrap();
        w.write_steps(&[step_row(0), step_row(1), step_row(2)]).unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("steps.csv")).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[1][1], "500");
        assert_eq!(&rows[2][6], "3");
    }

    #[test]
    fn intention_subject_with_commas_is_quoted() {
        let dir = tmp();
        let mut w = CsvTraceWriter::new(dir.path()).unwrap();
        w.write_intentions(&[IntentionRow {
            agent:   "a".into(),
            at_ms:   0,
            event:   IntentionEvent::Adopted,
            subject: "pickup[p1,p2]".into(),
            detail:  String::new(),
        }])
        .unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("intentions.csv")).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][2], "adopted");
        assert_eq!(&rows[0][3], "pickup[p1,p2]");
    }

    #[test]
    fn finish_idempotent() {
        let dir = tmp();
        let mut w = CsvTraceWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        w.finish().unwrap();
    }
}

// ── Observer ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod observer_tests {
    use pd_agent::AgentObserver;
    use pd_behavior::{DropReason, Intention};
    use pd_core::{Action, AgentId, Direction, ParcelId, Position, Role, Timestamp};
    use pd_executor::{StepEvent, StepStatus};

    use crate::{IntentionEvent, IntentionRow, OutputError, OutputResult, StepRow, TraceObserver, TraceWriter};

    /// Keeps rows in memory; optionally fails every write.
    #[derive(Default)]
    struct MemWriter {
        steps:      Vec<StepRow>,
        intentions: Vec<IntentionRow>,
        finished:   usize,
        fail:       bool,
    }

    impl TraceWriter for MemWriter {
        fn write_steps(&mut self, rows: &[StepRow]) -> OutputResult<()> {
            if self.fail {
                return Err(OutputError::Io(std::io::Error::other("disk full")));
            }
            self.steps.extend_from_slice(rows);
            Ok(())
        }
        fn write_intentions(&mut self, rows: &[IntentionRow]) -> OutputResult<()> {
            self.intentions.extend_from_slice(rows);
            Ok(())
        }
        fn finish(&mut self) -> OutputResult<()> {
            self.finished += 1;
            Ok(())
        }
    }

    fn step(index: usize, status: StepStatus) -> StepEvent {
        StepEvent {
            index,
            action: Action::Move(Direction::Right),
            attempt: 0,
            status,
            position: Position::new(index as i32, 0),
        }
    }

    #[test]
    fn rows_are_buffered_until_tick() {
        let a = AgentId::new("a");
        let mut obs = TraceObserver::new(MemWriter::default());
        obs.on_step(&a, &step(0, StepStatus::Ok), Timestamp(10));
        obs.on_step(&a, &step(1, StepStatus::Retrying), Timestamp(20));
        obs.on_tick(&a, Timestamp(30));
        obs.on_step(&a, &step(2, StepStatus::Ok), Timestamp(40));

        let w = obs.into_writer();
        assert_eq!(w.steps.len(), 2);
        assert_eq!(w.steps[1].status, "retrying");
        assert_eq!(w.steps[1].action, "move_right");
    }

    #[test]
    fn lifecycle_rows() {
        let a = AgentId::new("a");
        let intention = Intention::pickup(Role::None, vec![ParcelId::new("p1")]);
        let mut obs = TraceObserver::new(MemWriter::default());
        obs.on_intention_adopted(&a, &intention, Timestamp(0));
        obs.on_intention_dropped(&a, &intention, DropReason::PlanFailed, Timestamp(5));
        obs.on_role_changed(&a, Role::None, Role::Courier, Timestamp(6));
        obs.on_stop(&a, Timestamp(7));

        let w = obs.into_writer();
        assert_eq!(w.finished, 1);
        let events: Vec<IntentionEvent> = w.intentions.iter().map(|r| r.event).collect();
        assert_eq!(events, [IntentionEvent::Adopted, IntentionEvent::Dropped, IntentionEvent::RoleChanged]);
        assert_eq!(w.intentions[0].subject, "pickup[p1]");
        assert_eq!(w.intentions[1].detail, "plan_failed");
        assert_eq!(w.intentions[2].subject, Role::Courier.to_string());
    }

    #[test]
    fn first_error_is_kept() {
        let a = AgentId::new("a");
        let mut obs = TraceObserver::new(MemWriter { fail: true, ..Default::default() });
        obs.on_step(&a, &step(0, StepStatus::Ok), Timestamp(0));
        obs.on_tick(&a, Timestamp(1));
        obs.on_step(&a, &step(1, StepStatus::Ok), Timestamp(2));
        obs.on_stop(&a, Timestamp(3));
        assert!(matches!(obs.take_error(), Some(OutputError::Io(_))));
        assert!(obs.take_error().is_none());
    }
}

// ── With a running agent ──────────────────────────────────────────────────────

#[cfg(test)]
mod integration {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use pd_agent::AgentBuilder;
    use pd_core::{AgentConfig, AgentId, Position};
    use pd_spatial::TileMap;
    use pd_world::{World, WorldConfig};

    use crate::{CsvTraceWriter, TraceObserver};

    #[tokio::test(start_paused = true)]
    async fn delivery_run_is_traced() {
        let world = World::new(
            TileMap::parse("....\n...D").unwrap(),
            WorldConfig { decay_interval_ms: None, max_parcels: 0, ..Default::default() },
        );
        world.spawn_parcel(Position::new(2, 0), 10).await.unwrap();
        let id = AgentId::new("a");
        let (gw, rx) = world.connect(id.clone(), "alice", Position::new(0, 0)).await.unwrap();
        let gw = Arc::new(gw);
        let token = CancellationToken::new();
        let config = AgentConfig { decay_interval_ms: None, ..Default::default() };
        let agent = AgentBuilder::standard(id, config, gw.clone(), gw)
            .shutdown(token.clone())
            .build()
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();
        let task = tokio::spawn(async move {
            let mut obs = TraceObserver::new(CsvTraceWriter::new(&path).unwrap());
            agent.run(rx, &mut obs).await;
            obs.take_error()
        });
        tokio::time::sleep(Duration::from_secs(10)).await;
        token.cancel();
        assert!(task.await.unwrap().is_none(), "no write errors expected");

        let mut rdr = csv::Reader::from_path(dir.path().join("steps.csv")).unwrap();
        let actions: Vec<String> = rdr.records().map(|r| r.unwrap()[3].to_string()).collect();
        assert!(actions.iter().any(|a| a == "pickup"));
        assert!(actions.iter().any(|a| a == "putdown"));

        let mut rdr = csv::Reader::from_path(dir.path().join("intentions.csv")).unwrap();
        let subjects: Vec<String> = rdr.records().map(|r| r.unwrap()[3].to_string()).collect();
        assert!(subjects.iter().any(|s| s.starts_with("pickup")));
        assert!(subjects.iter().any(|s| s.starts_with("deliver")));
    }
}
