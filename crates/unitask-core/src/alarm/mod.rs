//! Reminder delivery.
//!
//! [`AlarmService`] is the platform port: the handful of primitives an OS
//! alarm manager offers. [`AlarmScheduler`] is the policy on top that picks a
//! primitive for each reminder:
//!
//! - one-shot: exact idle-proof delivery when the platform allows it right
//!   now, otherwise approximate idle-proof delivery;
//! - repeating: inexact repeating delivery, interval clamped to one minute.

mod queue;
mod recording;

pub use queue::{QueuedAlarm, SqliteAlarmQueue};
pub use recording::RecordingAlarmService;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AlarmError, Result};

/// Shortest repeat interval handed to the platform.
pub const MIN_REPEAT_INTERVAL_MILLIS: i64 = 60_000;

/// What the platform fires when an alarm goes off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryHandle {
    /// Reminder id; also the key the platform registers the alarm under.
    pub id: String,
    pub task_id: Option<String>,
    pub label: String,
}

impl DeliveryHandle {
    pub fn new(id: impl Into<String>, task_id: Option<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task_id,
            label: label.into(),
        }
    }
}

/// The platform request that was actually issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlarmRequest {
    /// Fires at the exact time, even in low-power idle.
    ExactWhileIdle { at_millis: i64 },
    /// Fires near the requested time, even in low-power idle.
    ApproximateWhileIdle { at_millis: i64 },
    /// Fires roughly every `interval_millis` starting near `at_millis`.
    InexactRepeating { at_millis: i64, interval_millis: i64 },
}

impl AlarmRequest {
    pub fn at_millis(&self) -> i64 {
        match *self {
            AlarmRequest::ExactWhileIdle { at_millis }
            | AlarmRequest::ApproximateWhileIdle { at_millis }
            | AlarmRequest::InexactRepeating { at_millis, .. } => at_millis,
        }
    }

    pub fn interval_millis(&self) -> Option<i64> {
        match *self {
            AlarmRequest::InexactRepeating { interval_millis, .. } => Some(interval_millis),
            _ => None,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            AlarmRequest::ExactWhileIdle { .. } => "exact_while_idle",
            AlarmRequest::ApproximateWhileIdle { .. } => "approximate_while_idle",
            AlarmRequest::InexactRepeating { .. } => "inexact_repeating",
        }
    }

    pub(crate) fn from_parts(
        kind: &str,
        at_millis: i64,
        interval_millis: Option<i64>,
    ) -> Option<Self> {
        match (kind, interval_millis) {
            ("exact_while_idle", _) => Some(AlarmRequest::ExactWhileIdle { at_millis }),
            ("approximate_while_idle", _) => Some(AlarmRequest::ApproximateWhileIdle { at_millis }),
            ("inexact_repeating", Some(interval_millis)) => Some(AlarmRequest::InexactRepeating {
                at_millis,
                interval_millis,
            }),
            _ => None,
        }
    }
}

/// Platform alarm primitives.
///
/// Registering under an id that is already registered replaces the earlier
/// request.
pub trait AlarmService: Send + Sync {
    /// Whether exact delivery is currently permitted.
    fn can_schedule_exact(&self) -> bool;

    /// May fail with [`AlarmError::ExactDenied`] if the capability was revoked
    /// between the check and the call.
    fn set_exact_and_allow_while_idle(
        &self,
        handle: &DeliveryHandle,
        at_millis: i64,
    ) -> Result<(), AlarmError>;

    fn set_and_allow_while_idle(
        &self,
        handle: &DeliveryHandle,
        at_millis: i64,
    ) -> Result<(), AlarmError>;

    fn set_inexact_repeating(
        &self,
        handle: &DeliveryHandle,
        at_millis: i64,
        interval_millis: i64,
    ) -> Result<(), AlarmError>;

    /// Revoke the scheduled delivery and release its handle. Unknown ids are
    /// ignored.
    fn cancel(&self, handle: &DeliveryHandle) -> Result<(), AlarmError>;
}

/// Chooses and issues platform alarm requests.
#[derive(Clone)]
pub struct AlarmScheduler {
    service: Arc<dyn AlarmService>,
    min_repeat_millis: i64,
}

impl AlarmScheduler {
    pub fn new(service: Arc<dyn AlarmService>) -> Self {
        Self {
            service,
            min_repeat_millis: MIN_REPEAT_INTERVAL_MILLIS,
        }
    }

    /// Raise the repeat floor. Values below one minute are ignored.
    pub fn with_min_repeat_millis(mut self, millis: i64) -> Self {
        self.min_repeat_millis = millis.max(MIN_REPEAT_INTERVAL_MILLIS);
        self
    }

    pub fn service(&self) -> &Arc<dyn AlarmService> {
        &self.service
    }

    /// Schedule a reminder, preferring exact delivery for one-shots.
    pub fn schedule_exact(
        &self,
        trigger_at_millis: i64,
        repeat_interval_millis: Option<i64>,
        handle: &DeliveryHandle,
    ) -> Result<AlarmRequest> {
        self.schedule(trigger_at_millis, repeat_interval_millis, true, handle)
    }

    /// Schedule a reminder. `exact` only matters for one-shots.
    pub fn schedule(
        &self,
        trigger_at_millis: i64,
        repeat_interval_millis: Option<i64>,
        exact: bool,
        handle: &DeliveryHandle,
    ) -> Result<AlarmRequest> {
        let request = match repeat_interval_millis {
            Some(interval) => {
                let interval = interval.max(self.min_repeat_millis);
                self.service
                    .set_inexact_repeating(handle, trigger_at_millis, interval)?;
                AlarmRequest::InexactRepeating {
                    at_millis: trigger_at_millis,
                    interval_millis: interval,
                }
            }
            None if exact && self.service.can_schedule_exact() => {
                match self
                    .service
                    .set_exact_and_allow_while_idle(handle, trigger_at_millis)
                {
                    Ok(()) => AlarmRequest::ExactWhileIdle {
                        at_millis: trigger_at_millis,
                    },
                    Err(AlarmError::ExactDenied) => {
                        tracing::warn!(id = %handle.id, "exact alarm denied, falling back");
                        self.approximate(handle, trigger_at_millis)?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            None => self.approximate(handle, trigger_at_millis)?,
        };
        tracing::info!(id = %handle.id, request = request.kind(), at = trigger_at_millis, "alarm scheduled");
        Ok(request)
    }

    fn approximate(&self, handle: &DeliveryHandle, at_millis: i64) -> Result<AlarmRequest> {
        self.service.set_and_allow_while_idle(handle, at_millis)?;
        Ok(AlarmRequest::ApproximateWhileIdle { at_millis })
    }

    pub fn cancel(&self, handle: &DeliveryHandle) -> Result<()> {
        self.service.cancel(handle)?;
        tracing::info!(id = %handle.id, "alarm cancelled");
        Ok(())
    }
}
