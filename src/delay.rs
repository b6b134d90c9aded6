//! Blocking waits used between transmissions.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use fugit::MillisDurationU32;

/// Something that can block the caller for a while.
pub trait Delay {
    fn delay(&mut self, duration: MillisDurationU32);
}

/// Plain [std::thread::sleep].
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay(&mut self, duration: MillisDurationU32) {
        std::thread::sleep(Duration::from_millis(duration.to_millis().into()));
    }
}

/// Sleeps in short slices and returns early once `running` is cleared.
#[derive(Debug, Clone)]
pub struct InterruptibleDelay {
    running: Arc<AtomicBool>,
    slice: Duration,
}

impl InterruptibleDelay {
    pub fn new(running: Arc<AtomicBool>) -> Self {
        Self {
            running,
            slice: Duration::from_millis(50),
        }
    }
}

impl Delay for InterruptibleDelay {
    fn delay(&mut self, duration: MillisDurationU32) {
        let deadline = Instant::now() + Duration::from_millis(duration.to_millis().into());
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(self.slice.min(deadline - now));
        }
    }
}
