use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Per-request-identity in-flight claims.
///
/// A second caller that fails to claim does not wait; it decides for itself
/// what to serve in the meantime.
#[derive(Clone, Default)]
pub struct InFlight {
    slots: Arc<DashMap<String, Arc<AtomicBool>>>,
}

/// Releases its claim when dropped, including on error paths.
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
    key: String,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.slots
            .get(key)
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// `None` if another caller already holds the claim for `key`.
    pub fn try_claim(&self, key: &str) -> Option<InFlightGuard> {
        let flag = self
            .slots
            .entry(key.to_owned())
            .or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .clone();

        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                flag,
                key: key.to_owned(),
            })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        debug!(key = %self.key, "in-flight slot released");
    }
}
