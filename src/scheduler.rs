//! Daily trigger scheduling.
//!
//! A random daily trigger picks a uniformly random minute between 08:00 and
//! 22:00 local time (both ends included). If that minute already passed
//! today, the same minute tomorrow is used. Armed triggers are stored as
//! `scheduled_triggers` rows and fired by whichever comes first: the
//! in-process timer, or the background poller after a restart. Firing claims
//! the row atomically, so the orchestrator is notified at most once.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use futures::FutureExt;
use rand::Rng;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::models::{ScheduledTrigger, TriggerType};
use crate::orchestrator::TriggerNotification;
use crate::util::to_rfc3339;

/// First hour of the delivery window (local time).
pub const WINDOW_BASE_HOUR: u32 = 8;

/// Window length in minutes: 08:00 + 840 min = 22:00.
pub const WINDOW_SPAN_MINUTES: u32 = 14 * 60;

/// Triggers overdue by more than this are dropped instead of fired late,
/// so a long outage never starts a cycle in the middle of the night.
pub const MISSED_TRIGGER_GRACE_SECS: i64 = 6 * 60 * 60;

/// Uniform offset into the window, in minutes, inclusive on both ends.
pub fn random_offset_minutes<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(0..=WINDOW_SPAN_MINUTES)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerPlan {
    pub scheduled_at: DateTime<Utc>,
    pub delay: TimeDelta,
}

impl TriggerPlan {
    pub fn delay_ms(&self) -> i64 {
        self.delay.num_milliseconds()
    }

    /// Delay in hours, rounded to two decimals.
    pub fn delay_hours(&self) -> f64 {
        (self.delay_ms() as f64 / 3_600_000.0 * 100.0).round() / 100.0
    }
}

/// Resolve a wall-clock time in `tz`. Times skipped by a DST jump move
/// forward one hour; repeated times take the earlier instant.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + TimeDelta::hours(1))).earliest())
}

/// Compute the next fire instant for `offset_minutes` into the window,
/// relative to `now`. The delay is always at least one millisecond.
pub fn plan_trigger<Tz: TimeZone>(now: &DateTime<Tz>, offset_minutes: u32) -> TriggerPlan {
    let offset_minutes = offset_minutes.min(WINDOW_SPAN_MINUTES);
    let hour = WINDOW_BASE_HOUR + offset_minutes / 60;
    let minute = offset_minutes % 60;
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);

    let tz = now.timezone();
    let today = now.date_naive();

    let target = [Some(today), today.checked_add_days(Days::new(1))]
        .into_iter()
        .flatten()
        .filter_map(|date| resolve_local(&tz, date.and_time(time)))
        .find(|candidate| candidate > now)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc) + TimeDelta::days(1));

    let delay = (target - now.with_timezone(&Utc)).max(TimeDelta::milliseconds(1));

    TriggerPlan {
        scheduled_at: target,
        delay,
    }
}

/// Outcome of one attempt to fire a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    /// The orchestrator accepted the notification.
    Delivered,
    /// Another task claimed the trigger first.
    AlreadyClaimed,
    /// Claiming or notifying failed; the error is logged and, where
    /// possible, stored on the trigger row.
    Failed(String),
}

/// Spawn a background task, logging panics instead of losing them.
fn spawn_guarded<F>(task: &'static str, fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(AssertUnwindSafe(fut).catch_unwind().map(move |result| {
        if let Err(panic) = result {
            let panic_msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("{} task panicked: {}", task, panic_msg);
        }
    }));
}

/// Store a pending random-daily trigger for `plan` and start its timer.
pub fn arm_random_trigger(state: &AppState, plan: &TriggerPlan) -> Result<ScheduledTrigger> {
    let trigger = {
        let conn = state.db.get()?;
        queries::create_scheduled_trigger(
            &conn,
            TriggerType::RandomDaily,
            plan.scheduled_at.timestamp(),
        )?
    };

    let sleep_for = plan.delay.to_std().unwrap_or(Duration::from_millis(1));
    let timer_state = state.clone();
    let timer_trigger = trigger.clone();
    spawn_guarded("trigger timer", async move {
        tokio::time::sleep(sleep_for).await;
        fire_trigger(&timer_state, &timer_trigger).await;
    });

    tracing::info!(
        "Armed {} trigger {} for {} (in {:.2}h)",
        trigger.trigger_type.as_ref(),
        trigger.id,
        to_rfc3339(trigger.fire_at),
        plan.delay_hours()
    );

    Ok(trigger)
}

fn claim(state: &AppState, id: &str) -> Result<bool> {
    let conn = state.db.get()?;
    queries::try_claim_trigger(&conn, id)
}

fn record_failure(state: &AppState, id: &str, error: &str) {
    let recorded = state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| queries::mark_trigger_failed(&conn, id, error));
    if let Err(e) = recorded {
        tracing::warn!("Failed to record failure on trigger {}: {}", id, e);
    }
}

/// Claim `trigger` and notify the orchestrator. Never returns an error:
/// failures are logged and recorded on the row, and nothing is retried.
pub async fn fire_trigger(state: &AppState, trigger: &ScheduledTrigger) -> FireOutcome {
    match claim(state, &trigger.id) {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!("Trigger {} already claimed", trigger.id);
            return FireOutcome::AlreadyClaimed;
        }
        Err(e) => {
            tracing::error!("Failed to claim trigger {}: {}", trigger.id, e);
            return FireOutcome::Failed(e.to_string());
        }
    }

    let event = TriggerNotification {
        trigger_time: to_rfc3339(trigger.fire_at),
        trigger_type: trigger.trigger_type,
    };

    match state.orchestrator.notify(&event).await {
        Ok(()) => {
            tracing::info!(
                "{} trigger {} executed at {}",
                trigger.trigger_type.as_ref(),
                trigger.id,
                event.trigger_time
            );
            FireOutcome::Delivered
        }
        Err(e) => {
            let msg = e.to_string();
            tracing::error!("Failed to notify orchestrator for trigger {}: {}", trigger.id, msg);
            record_failure(state, &trigger.id, &msg);
            FireOutcome::Failed(msg)
        }
    }
}

/// Fire every pending trigger whose time has come. Triggers more than
/// `MISSED_TRIGGER_GRACE_SECS` late are marked failed instead.
/// Returns how many triggers were delivered.
pub async fn fire_due_triggers(state: &AppState) -> Result<usize> {
    let now = Utc::now().timestamp();
    let due = {
        let conn = state.db.get()?;
        queries::list_due_triggers(&conn, now)?
    };

    let mut delivered = 0;
    for trigger in due {
        if now - trigger.fire_at > MISSED_TRIGGER_GRACE_SECS {
            let reason = format!("missed: due at {}", to_rfc3339(trigger.fire_at));
            let conn = state.db.get()?;
            if queries::expire_trigger(&conn, &trigger.id, &reason)? {
                tracing::warn!("Trigger {} {}, not firing late", trigger.id, reason);
            }
            continue;
        }

        if fire_trigger(state, &trigger).await == FireOutcome::Delivered {
            delivered += 1;
        }
    }

    Ok(delivered)
}

/// Start the background poller. The first pass runs immediately so
/// triggers armed before a restart are picked up at startup.
pub fn spawn_trigger_poller(state: AppState, interval: Duration) {
    spawn_guarded("trigger poller", async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match fire_due_triggers(&state).await {
                Ok(count) if count > 0 => {
                    tracing::info!("Poller fired {} overdue trigger(s)", count);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Trigger poll failed: {}", e);
                }
            }
        }
    });

    tracing::info!(
        "Trigger poller started (runs every {}s)",
        interval.as_secs()
    );
}
