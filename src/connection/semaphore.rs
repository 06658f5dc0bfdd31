//! A small blocking counting semaphore, used as the per-connection
//! concurrency gate (spec §3: UDP 8, TCP 128 outstanding calls).

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<usize>,
    cv: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(permits),
            cv: Condvar::new(),
        }
    }

    /// Blocks until a permit is available, then takes it.
    pub fn acquire(&self) -> SemaphoreGuard<'_> {
        let mut n = self.state.lock();
        while *n == 0 {
            self.cv.wait(&mut n);
        }
        *n -= 1;
        SemaphoreGuard { sem: self }
    }

    fn release(&self) {
        let mut n = self.state.lock();
        *n += 1;
        self.cv.notify_one();
    }
}

/// Releases the permit back to the semaphore on drop — covers both the
/// normal return path and an early return via `?` in `send_and_wait`.
pub struct SemaphoreGuard<'a> {
    sem: &'a Semaphore,
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn acquire_blocks_until_release() {
        let sem = Arc::new(Semaphore::new(1));
        let g1 = sem.acquire();
        let sem2 = sem.clone();
        let handle = std::thread::spawn(move || {
            let _g2 = sem2.acquire();
        });
        std::thread::sleep(Duration::from_millis(30));
        assert!(!handle.is_finished());
        drop(g1);
        handle.join().unwrap();
    }
}
