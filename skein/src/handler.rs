//! Tracks whether the current thread is running a remote-message handler.
//!
//! Some task manager entry points are only legal from one of the two contexts
//! (`spawn_local_private` from workers, `spawn_remote_private` from handlers).
//! The check is a debug assertion only, release builds trust the caller.

use crate::utils::ScopeGuard;
use std::cell::Cell;

thread_local! {
    static IN_HANDLER: Cell<bool> = const { Cell::new(false) };
}

/// Run `f` as a remote-message handler. Transports wrap every inbound message
/// delivery with this. Nesting is allowed and the previous state is restored
/// on exit, including on unwind.
pub fn in_handler<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let prev = IN_HANDLER.with(|h| h.replace(true));
    let _guard = ScopeGuard::new(move || IN_HANDLER.with(|h| h.set(prev)));
    f()
}

/// Returns true if called from inside [`in_handler`].
pub fn is_handler_context() -> bool {
    IN_HANDLER.with(|h| h.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_handler_sets_and_restores() {
        assert!(!is_handler_context());

        in_handler(|| {
            assert!(is_handler_context());
            in_handler(|| assert!(is_handler_context()));
            assert!(is_handler_context());
        });

        assert!(!is_handler_context());
    }

    #[test]
    fn test_restored_after_panic() {
        let res = std::panic::catch_unwind(|| in_handler(|| panic!("handler failed")));

        assert!(res.is_err());
        assert!(!is_handler_context());
    }

    #[test]
    fn test_flag_is_per_thread() {
        in_handler(|| {
            let other = std::thread::spawn(is_handler_context).join().unwrap();
            assert!(!other);
        });
    }
}
