use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative shutdown request shared with the signal path.
///
/// The flag is the only state the signal handler touches.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// The underlying flag, for handlers that set it to `true` directly.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_visible_through_clones() {
        let shutdown = Shutdown::new();
        let handle = shutdown.clone();
        assert!(!shutdown.is_requested());

        std::thread::spawn(move || handle.request()).join().unwrap();
        assert!(shutdown.is_requested());
    }

    #[test]
    fn raw_flag_requests_shutdown() {
        let shutdown = Shutdown::new();
        shutdown.flag().store(true, Ordering::SeqCst);
        assert!(shutdown.is_requested());
    }
}
