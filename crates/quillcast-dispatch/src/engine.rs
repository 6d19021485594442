use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use quillcast_core::request::GenerationRequest;
use quillcast_core::types::RunKind;
use quillcast_registry::ScheduleRegistry;

use crate::error::Result;

/// Polls the registry and hands due occurrences to the generation pipeline.
///
/// The engine decides due-ness only: it emits a [`GenerationRequest`] per
/// due occurrence and advances the schedule's bookkeeping. Running the
/// pipeline and recording the outcome belong to the consumer on the other
/// end of the channel.
pub struct DispatchEngine {
    registry: Arc<ScheduleRegistry>,
    /// Fired requests are sent here for the pipeline to pick up.
    fired_tx: mpsc::Sender<GenerationRequest>,
    poll_interval: Duration,
}

impl DispatchEngine {
    pub fn new(
        registry: Arc<ScheduleRegistry>,
        fired_tx: mpsc::Sender<GenerationRequest>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            registry,
            fired_tx,
            poll_interval,
        }
    }

    /// Main event loop. Polls every interval until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("dispatch engine started");
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick(Utc::now()) {
                        error!("dispatch tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("dispatch engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Dispatch every schedule whose cached next run has arrived.
    ///
    /// The schedule is advanced *before* the hand-off: once `next_run_at`
    /// moves past the fired occurrence, a second tick cannot fire it again,
    /// however long the consumer takes.
    pub fn tick(&self, now: DateTime<Utc>) -> Result<()> {
        for schedule in self.registry.due_schedules(now)? {
            let occurrence_at = match schedule.next_run_at {
                Some(at) => at,
                None => continue,
            };
            let occurrence_date = occurrence_at
                .with_timezone(&schedule.rule.timezone())
                .date_naive();
            let request = schedule.generation_request(occurrence_date, RunKind::Scheduled);

            let next = self.registry.mark_dispatched(&schedule.id, now)?;
            info!(
                schedule_id = %schedule.id,
                %occurrence_date,
                next_run = ?next,
                "occurrence dispatched"
            );

            // try_send never blocks the tick loop; log a warning if the channel is full.
            if self.fired_tx.try_send(request).is_err() {
                warn!(schedule_id = %schedule.id, "generation channel full or closed — request dropped");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rusqlite::Connection;

    use quillcast_core::types::{PostStatus, ScheduleOverrides};
    use quillcast_recurrence::{Frequency, RuleSpec, TimeOfDay};
    use quillcast_registry::NewSchedule;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn registry() -> Arc<ScheduleRegistry> {
        Arc::new(ScheduleRegistry::new(Connection::open_in_memory().unwrap()).unwrap())
    }

    fn daily_nine(name: &str, site: &str) -> NewSchedule {
        NewSchedule {
            name: name.to_string(),
            rule: RuleSpec {
                frequency: Frequency::Daily,
                time_of_day: Some(TimeOfDay { hour: 9, minute: 0 }),
                ..RuleSpec::default()
            },
            template_id: "tpl-1".into(),
            site_id: site.into(),
            overrides: ScheduleOverrides::default(),
            post_status: PostStatus::AutoPublish,
            active: true,
        }
    }

    fn engine(
        registry: Arc<ScheduleRegistry>,
        capacity: usize,
    ) -> (DispatchEngine, mpsc::Receiver<GenerationRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            DispatchEngine::new(registry, tx, Duration::from_secs(30)),
            rx,
        )
    }

    #[test]
    fn due_schedule_fires_exactly_once() {
        let reg = registry();
        // Created at 06:00, so next_run_at caches today 09:00.
        let schedule = reg
            .create_at(daily_nine("digest", "site-1"), utc(2024, 1, 5, 6, 0))
            .unwrap();
        let (engine, mut rx) = engine(Arc::clone(&reg), 8);

        let now = utc(2024, 1, 5, 9, 0);
        engine.tick(now).unwrap();

        let request = rx.try_recv().expect("one request expected");
        assert_eq!(request.schedule_id, schedule.id);
        assert_eq!(request.kind, RunKind::Scheduled);
        assert_eq!(request.occurrence_date, "2024-01-05".parse::<chrono::NaiveDate>().unwrap());

        // The schedule advanced past the fired occurrence…
        let after = reg.get(&schedule.id).unwrap();
        assert_eq!(after.last_run_at, Some(now));
        assert_eq!(after.next_run_at, Some(utc(2024, 1, 6, 9, 0)));

        // …so a second tick at the same instant fires nothing.
        engine.tick(now).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn not_yet_due_and_inactive_schedules_stay_quiet() {
        let reg = registry();
        reg.create_at(daily_nine("early", "site-1"), utc(2024, 1, 5, 6, 0))
            .unwrap();
        let parked = reg
            .create_at(daily_nine("parked", "site-2"), utc(2024, 1, 5, 6, 0))
            .unwrap();
        reg.deactivate_at(&parked.id, utc(2024, 1, 5, 6, 30)).unwrap();

        let (engine, mut rx) = engine(reg, 8);
        engine.tick(utc(2024, 1, 5, 8, 59)).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_channel_drops_the_request_but_still_advances() {
        let reg = registry();
        let a = reg
            .create_at(daily_nine("a", "site-1"), utc(2024, 1, 5, 6, 0))
            .unwrap();
        let b = reg
            .create_at(daily_nine("b", "site-2"), utc(2024, 1, 5, 6, 0))
            .unwrap();

        let (engine, mut rx) = engine(Arc::clone(&reg), 1);
        let now = utc(2024, 1, 5, 9, 0);
        engine.tick(now).unwrap();

        // Capacity one: the second request was dropped, not queued.
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        // Both schedules advanced regardless — no refire storm next tick.
        for id in [&a.id, &b.id] {
            assert_eq!(
                reg.get(id).unwrap().next_run_at,
                Some(utc(2024, 1, 6, 9, 0))
            );
        }
    }

    #[tokio::test]
    async fn run_loop_stops_on_shutdown_signal() {
        let reg = registry();
        let (engine, _rx) = engine(reg, 8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(engine.run(shutdown_rx));
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("engine should stop promptly")
            .expect("engine task should not panic");
    }
}
