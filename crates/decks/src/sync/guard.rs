//! One active sync per service
//!
//! An in-process guard: a request for a service that already has a live
//! handle is refused. Handles release on drop, including on early return.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::Service;

/// Tracks which services currently have a sync running
#[derive(Debug, Default)]
pub struct SyncGuard {
    active: Mutex<HashSet<Service>>,
}

/// Proof that the holder is the only running sync for `service`
#[derive(Debug)]
pub struct ActiveSync<'a> {
    guard: &'a SyncGuard,
    service: Service,
}

impl SyncGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn active(&self) -> MutexGuard<'_, HashSet<Service>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `service`, or `None` if a sync for it is already running
    pub fn try_acquire(&self, service: Service) -> Option<ActiveSync<'_>> {
        if self.active().insert(service) {
            Some(ActiveSync {
                guard: self,
                service,
            })
        } else {
            None
        }
    }

    pub fn is_active(&self, service: Service) -> bool {
        self.active().contains(&service)
    }
}

impl ActiveSync<'_> {
    pub fn service(&self) -> Service {
        self.service
    }
}

impl Drop for ActiveSync<'_> {
    fn drop(&mut self) {
        self.guard.active().remove(&self.service);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let guard = SyncGuard::new();
        let first = guard.try_acquire(Service::MasterVault);
        assert!(first.is_some());
        assert!(guard.try_acquire(Service::MasterVault).is_none());
        assert!(guard.is_active(Service::MasterVault));
    }

    #[test]
    fn test_release_on_drop() {
        let guard = SyncGuard::new();
        {
            let _handle = guard.try_acquire(Service::Crucible).unwrap();
        }
        assert!(!guard.is_active(Service::Crucible));
        assert!(guard.try_acquire(Service::Crucible).is_some());
    }

    #[test]
    fn test_services_are_independent() {
        let guard = SyncGuard::new();
        let _dok = guard.try_acquire(Service::DecksOfKeyforge).unwrap();
        assert!(guard.try_acquire(Service::Crucible).is_some());
    }
}
