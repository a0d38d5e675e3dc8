use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{AlarmRequest, AlarmService, DeliveryHandle};
use crate::error::AlarmError;

/// In-process alarm service that remembers every live request.
///
/// Nothing ever fires; callers inspect [`pending`](Self::pending) instead.
#[derive(Debug)]
pub struct RecordingAlarmService {
    exact_allowed: AtomicBool,
    deny_next_exact: AtomicBool,
    live: Mutex<HashMap<String, (DeliveryHandle, AlarmRequest)>>,
}

impl Default for RecordingAlarmService {
    fn default() -> Self {
        Self {
            exact_allowed: AtomicBool::new(true),
            deny_next_exact: AtomicBool::new(false),
            live: Mutex::new(HashMap::new()),
        }
    }
}

impl RecordingAlarmService {
    /// A service on which exact delivery is never permitted.
    pub fn without_exact() -> Self {
        let service = Self::default();
        service.set_exact_allowed(false);
        service
    }

    pub fn set_exact_allowed(&self, allowed: bool) {
        self.exact_allowed.store(allowed, Ordering::SeqCst);
    }

    /// Report the capability as granted but reject the next exact request,
    /// as a platform does when permission is revoked mid-call.
    pub fn deny_next_exact(&self) {
        self.deny_next_exact.store(true, Ordering::SeqCst);
    }

    pub fn pending(&self, id: &str) -> Option<AlarmRequest> {
        self.live_map().get(id).map(|(_, req)| *req)
    }

    pub fn handle(&self, id: &str) -> Option<DeliveryHandle> {
        self.live_map().get(id).map(|(h, _)| h.clone())
    }

    /// Every live handle, in no particular order.
    pub fn handles(&self) -> Vec<DeliveryHandle> {
        self.live_map().values().map(|(h, _)| h.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.live_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_map(&self) -> std::sync::MutexGuard<'_, HashMap<String, (DeliveryHandle, AlarmRequest)>> {
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn register(&self, handle: &DeliveryHandle, request: AlarmRequest) {
        self.live_map()
            .insert(handle.id.clone(), (handle.clone(), request));
    }
}

impl AlarmService for RecordingAlarmService {
    fn can_schedule_exact(&self) -> bool {
        self.exact_allowed.load(Ordering::SeqCst)
    }

    fn set_exact_and_allow_while_idle(
        &self,
        handle: &DeliveryHandle,
        at_millis: i64,
    ) -> Result<(), AlarmError> {
        if !self.can_schedule_exact() || self.deny_next_exact.swap(false, Ordering::SeqCst) {
            return Err(AlarmError::ExactDenied);
        }
        self.register(handle, AlarmRequest::ExactWhileIdle { at_millis });
        Ok(())
    }

    fn set_and_allow_while_idle(
        &self,
        handle: &DeliveryHandle,
        at_millis: i64,
    ) -> Result<(), AlarmError> {
        self.register(handle, AlarmRequest::ApproximateWhileIdle { at_millis });
        Ok(())
    }

    fn set_inexact_repeating(
        &self,
        handle: &DeliveryHandle,
        at_millis: i64,
        interval_millis: i64,
    ) -> Result<(), AlarmError> {
        self.register(
            handle,
            AlarmRequest::InexactRepeating {
                at_millis,
                interval_millis,
            },
        );
        Ok(())
    }

    fn cancel(&self, handle: &DeliveryHandle) -> Result<(), AlarmError> {
        self.live_map().remove(&handle.id);
        Ok(())
    }
}
