use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot guard for "first decode wins".
///
/// Decoders keep producing results for the same code until the camera has
/// actually stopped. Only the caller that flips the latch gets to act on a
/// decode; everyone after it sees `false`.
#[derive(Debug, Default)]
pub struct DecodeLatch {
    fired: AtomicBool,
}

impl DecodeLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once over the lifetime of the latch.
    pub fn fire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn fires_once() {
        let latch = DecodeLatch::new();
        assert!(!latch.is_fired());
        assert!(latch.fire());
        assert!(!latch.fire());
        assert!(latch.is_fired());
    }

    #[test]
    fn only_one_thread_wins() {
        let latch = Arc::new(DecodeLatch::new());
        let wins = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..16)
            .map(|_| {
                let latch = latch.clone();
                let wins = wins.clone();
                std::thread::spawn(move || {
                    if latch.fire() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
