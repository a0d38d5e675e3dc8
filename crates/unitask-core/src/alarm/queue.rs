use rusqlite::{params, Connection, Params};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{AlarmRequest, AlarmService, DeliveryHandle};
use crate::error::{AlarmError, CoreError, Result, StorageError};
use crate::storage::SqliteStore;

/// A request waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedAlarm {
    pub handle: DeliveryHandle,
    pub request: AlarmRequest,
}

/// Alarm service for hosts without an OS alarm manager.
///
/// Requests are kept in the `alarm_requests` table; a poller (the CLI's
/// `alarm due`) asks for what has come due and acknowledges it.
pub struct SqliteAlarmQueue {
    store: Arc<SqliteStore>,
    exact_allowed: AtomicBool,
}

fn platform(err: impl std::fmt::Display) -> AlarmError {
    AlarmError::Platform(err.to_string())
}

impl SqliteAlarmQueue {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self {
            store,
            exact_allowed: AtomicBool::new(true),
        }
    }

    pub fn set_exact_allowed(&self, allowed: bool) {
        self.exact_allowed.store(allowed, Ordering::SeqCst);
    }

    fn put(&self, handle: &DeliveryHandle, request: AlarmRequest) -> Result<(), AlarmError> {
        let conn = self.store.lock().map_err(platform)?;
        conn.execute(
            "INSERT INTO alarm_requests (id, task_id, label, kind, trigger_at_millis, interval_millis)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                task_id = excluded.task_id,
                label = excluded.label,
                kind = excluded.kind,
                trigger_at_millis = excluded.trigger_at_millis,
                interval_millis = excluded.interval_millis",
            params![
                handle.id,
                handle.task_id,
                handle.label,
                request.kind(),
                request.at_millis(),
                request.interval_millis(),
            ],
        )
        .map_err(platform)?;
        Ok(())
    }

    fn query(conn: &Connection, filter: &str, params: impl Params) -> Result<Vec<QueuedAlarm>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT id, task_id, label, kind, trigger_at_millis, interval_millis
             FROM alarm_requests {filter} ORDER BY trigger_at_millis ASC"
        ))?;
        let rows = stmt.query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<i64>>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, task_id, label, kind, at, interval) = row?;
            let request = AlarmRequest::from_parts(&kind, at, interval).ok_or_else(|| {
                CoreError::Storage(StorageError::CorruptRow {
                    table: "alarm_requests",
                    message: format!("unknown alarm kind '{kind}' for {id}"),
                })
            })?;
            out.push(QueuedAlarm {
                handle: DeliveryHandle { id, task_id, label },
                request,
            });
        }
        Ok(out)
    }

    /// Every queued request, soonest first.
    pub fn pending(&self) -> Result<Vec<QueuedAlarm>> {
        let conn = self.store.lock()?;
        Self::query(&conn, "", [])
    }

    /// Requests whose trigger time is at or before `now_millis`.
    pub fn due(&self, now_millis: i64) -> Result<Vec<QueuedAlarm>> {
        let conn = self.store.lock()?;
        Self::query(&conn, "WHERE trigger_at_millis <= ?1", params![now_millis])
    }

    /// Mark a delivered alarm as handled. One-shots are removed; repeating
    /// ones move to their first trigger time after `now_millis`.
    pub fn acknowledge(&self, alarm: &QueuedAlarm, now_millis: i64) -> Result<()> {
        let conn = self.store.lock()?;
        match alarm.request {
            AlarmRequest::InexactRepeating {
                at_millis,
                interval_millis,
            } => {
                let next = next_occurrence(at_millis, interval_millis, now_millis);
                conn.execute(
                    "UPDATE alarm_requests SET trigger_at_millis = ?2 WHERE id = ?1",
                    params![alarm.handle.id, next],
                )?;
            }
            _ => {
                conn.execute(
                    "DELETE FROM alarm_requests WHERE id = ?1",
                    params![alarm.handle.id],
                )?;
            }
        }
        Ok(())
    }
}

/// First `at + k × interval` strictly after `now`.
fn next_occurrence(at_millis: i64, interval_millis: i64, now_millis: i64) -> i64 {
    if at_millis > now_millis {
        return at_millis;
    }
    let interval = interval_millis.max(1);
    let elapsed_periods = (now_millis - at_millis) / interval + 1;
    at_millis + elapsed_periods * interval
}

impl AlarmService for SqliteAlarmQueue {
    fn can_schedule_exact(&self) -> bool {
        self.exact_allowed.load(Ordering::SeqCst)
    }

    fn set_exact_and_allow_while_idle(
        &self,
        handle: &DeliveryHandle,
        at_millis: i64,
    ) -> Result<(), AlarmError> {
        if !self.can_schedule_exact() {
            return Err(AlarmError::ExactDenied);
        }
        self.put(handle, AlarmRequest::ExactWhileIdle { at_millis })
    }

    fn set_and_allow_while_idle(
        &self,
        handle: &DeliveryHandle,
        at_millis: i64,
    ) -> Result<(), AlarmError> {
        self.put(handle, AlarmRequest::ApproximateWhileIdle { at_millis })
    }

    fn set_inexact_repeating(
        &self,
        handle: &DeliveryHandle,
        at_millis: i64,
        interval_millis: i64,
    ) -> Result<(), AlarmError> {
        self.put(
            handle,
            AlarmRequest::InexactRepeating {
                at_millis,
                interval_millis,
            },
        )
    }

    fn cancel(&self, handle: &DeliveryHandle) -> Result<(), AlarmError> {
        let conn = self.store.lock().map_err(platform)?;
        conn.execute("DELETE FROM alarm_requests WHERE id = ?1", params![handle.id])
            .map_err(platform)?;
        Ok(())
    }
}
