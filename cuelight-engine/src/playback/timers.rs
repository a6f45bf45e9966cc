//! Per-list scheduled tasks

use tokio::task::JoinHandle;

/// Timers armed for one cue list
///
/// `follow` is either the auto-advance timer or, for a cue without a follow
/// time, the fade-complete timer. Dropping the set aborts everything in it.
#[derive(Debug, Default)]
pub struct ListTimers {
    pub follow: Option<JoinHandle<()>>,
    pub progress: Option<JoinHandle<()>>,
}

impl ListTimers {
    /// Abort every armed timer. Calling it again is a no-op.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.follow.take() {
            handle.abort();
        }
        if let Some(handle) = self.progress.take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.follow.as_ref().is_some_and(|h| !h.is_finished())
            || self.progress.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ListTimers {
    fn drop(&mut self) {
        self.cancel();
    }
}
