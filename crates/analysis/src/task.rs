use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between the UI side and a running
/// analysis pass. Cancelling never rolls anything back; a pass checks the
/// token between transactions and simply stops publishing a result.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Minimum advance, in percentage points, between two forwarded updates.
const THROTTLE_STEP: f32 = 5.0;

/// Wraps a percent-complete sink and suppresses updates that have not
/// advanced at least [`THROTTLE_STEP`] since the last forwarded one, so a
/// long pass cannot flood the UI. `reset` and `complete` always forward.
pub struct ProgressThrottle<'a> {
    sink: Box<dyn FnMut(u8) + 'a>,
    percent: f32,
    last_reported: f32,
}

impl<'a> ProgressThrottle<'a> {
    pub fn new(sink: impl FnMut(u8) + 'a) -> Self {
        ProgressThrottle {
            sink: Box::new(sink),
            percent: 0.0,
            last_reported: 0.0,
        }
    }

    /// Reports 0% and starts over.
    pub fn reset(&mut self) {
        self.percent = 0.0;
        self.last_reported = 0.0;
        (self.sink)(0);
    }

    /// Advances by a portion of the whole task, forwarding an update only
    /// once enough progress has accumulated.
    pub fn add(&mut self, portion: f32) {
        self.percent += portion;
        if (self.percent - self.last_reported).abs() >= THROTTLE_STEP {
            self.last_reported = self.percent;
            (self.sink)(self.percent.min(100.0).round() as u8);
        }
    }

    /// Reports 100% unconditionally.
    pub fn complete(&mut self) {
        self.percent = 100.0;
        self.last_reported = 100.0;
        (self.sink)(100);
    }
}
