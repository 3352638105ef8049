/// Runs a closure when dropped, whether the scope exits normally or through a
/// panic. Used to undo per-scope bookkeeping (idle counters, handler flag).
pub(crate) struct ScopeGuard<F: FnOnce()> {
    // `Option` so the closure can be taken exactly once in `drop`.
    closure: Option<F>,
}

impl<F: FnOnce()> ScopeGuard<F> {
    pub(crate) fn new(closure: F) -> Self {
        ScopeGuard {
            closure: Some(closure),
        }
    }
}

impl<F: FnOnce()> Drop for ScopeGuard<F> {
    fn drop(&mut self) {
        if let Some(closure) = self.closure.take() {
            closure();
        }
    }
}
