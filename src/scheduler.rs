use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::queue::{JobQueue, JobSource};
use crate::status::{Mode, SharedStatus};
use crate::{loge, logi};

pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Earliest instant strictly after `now` that falls on one of `times`.
pub fn next_occurrence(now: NaiveDateTime, times: &[NaiveTime]) -> Option<NaiveDateTime> {
    times
        .iter()
        .map(|t| {
            let today = now.date().and_time(*t);
            if today > now {
                today
            } else {
                today + ChronoDuration::days(1)
            }
        })
        .min()
}

/// Fires a job at fixed wall-clock times while the mode is auto.
pub struct Scheduler {
    times: Vec<NaiveTime>,
    queue: JobQueue,
    status: SharedStatus,
    due: Option<NaiveDateTime>,
}

impl Scheduler {
    pub fn new(times: Vec<NaiveTime>, queue: JobQueue, status: SharedStatus, now: NaiveDateTime) -> Self {
        let due = next_occurrence(now, &times);
        let scheduler = Self {
            times,
            queue,
            status,
            due,
        };
        scheduler.publish_next_run();
        scheduler
    }

    fn publish_next_run(&self) {
        self.status
            .set_next_run(self.due.map(|at| at.format("%H:%M").to_string()));
    }

    /// Checks the clock once. Returns true when a job was enqueued.
    pub fn tick(&mut self, now: NaiveDateTime) -> bool {
        let Some(due) = self.due else {
            return false;
        };
        if now < due {
            return false;
        }

        let mut fired = false;
        if self.status.mode() == Mode::Auto {
            logi("⏰ Scheduled video started");
            match self.queue.enqueue(JobSource::Scheduled) {
                Ok(_) => fired = true,
                Err(err) => loge(format!("Scheduler error: {:#}", err)),
            }
        } else {
            logi(format!("Manual mode, skipping run due at {}", due.format("%H:%M")));
        }

        self.due = next_occurrence(now, &self.times);
        self.publish_next_run();
        fired
    }

    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            loop {
                interval.tick().await;
                self.tick(Local::now().naive_local());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::JobRunner;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Arc;

    struct Idle;

    #[async_trait]
    impl JobRunner for Idle {
        async fn run(&self) {}
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn times() -> Vec<NaiveTime> {
        vec![
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        ]
    }

    #[test]
    fn next_occurrence_picks_same_day_or_rolls_over() {
        assert_eq!(next_occurrence(at(8, 0), &times()), Some(at(9, 0)));
        assert_eq!(next_occurrence(at(9, 0), &times()), Some(at(19, 0)));
        assert_eq!(next_occurrence(at(20, 0), &times()), Some(at(9, 0) + ChronoDuration::days(1)));
        assert_eq!(next_occurrence(at(20, 0), &[]), None);
    }

    #[tokio::test]
    async fn fires_once_per_slot_in_auto_mode() {
        let status = SharedStatus::new();
        let (queue, _worker) = JobQueue::start(Arc::new(Idle), status.clone());
        let mut scheduler = Scheduler::new(times(), queue, status.clone(), at(8, 0));
        assert_eq!(status.snapshot().next_run.as_deref(), Some("09:00"));

        assert!(!scheduler.tick(at(8, 59)));
        assert!(scheduler.tick(at(9, 0)));
        assert!(!scheduler.tick(at(9, 0)));
        assert_eq!(status.snapshot().next_run.as_deref(), Some("19:00"));
    }

    #[tokio::test]
    async fn manual_mode_skips_but_advances() {
        let status = SharedStatus::new();
        status.set_mode(Mode::Manual);
        let (queue, _worker) = JobQueue::start(Arc::new(Idle), status.clone());
        let mut scheduler = Scheduler::new(times(), queue, status.clone(), at(18, 0));

        assert!(!scheduler.tick(at(19, 0)));
        assert_eq!(status.snapshot().next_run.as_deref(), Some("09:00"));
    }
}
