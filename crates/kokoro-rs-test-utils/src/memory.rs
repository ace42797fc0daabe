use kokoro_rs_memory::{InMemoryProvider, MemoryError, MemoryProvider, MemoryRecord};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Provider whose writes can be switched to fail.
#[derive(Debug, Default, Clone)]
pub struct FailingProvider {
    inner: Arc<InMemoryProvider>,
    fail_appends: Arc<AtomicBool>,
    fail_rewrites: Arc<AtomicBool>,
    fail_loads: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
    rewritten: Arc<Mutex<Vec<String>>>,
}

impl FailingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_rewrites(&self, fail: bool) {
        self.fail_rewrites.store(fail, Ordering::SeqCst);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Number of successful appends and rewrites.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Users whose collections were rewritten, in order.
    pub fn rewritten(&self) -> Vec<String> {
        self.rewritten.lock().clone()
    }
}

impl MemoryProvider for FailingProvider {
    fn load_user(&self, user_id: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(MemoryError::Backend("load failed".to_string()));
        }
        self.inner.load_user(user_id)
    }

    fn append(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(MemoryError::Backend("append failed".to_string()));
        }
        self.inner.append(record)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rewrite_user(&self, user_id: &str, records: &[MemoryRecord]) -> Result<(), MemoryError> {
        if self.fail_rewrites.load(Ordering::SeqCst) {
            return Err(MemoryError::Backend("rewrite failed".to_string()));
        }
        self.inner.rewrite_user(user_id, records)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.rewritten.lock().push(user_id.to_string());
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<String>, MemoryError> {
        self.inner.list_users()
    }
}
