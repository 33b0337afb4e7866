/// Cancellable scheduled tasks owned by the session.
///
/// A `TaskSlot` holds at most one armed task. Arming replaces whatever was
/// armed before, so a stale task can never fire after it has been superseded.
/// Time is passed in explicitly; nothing here reads the clock.

use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
struct Armed<T> {
    deadline: Instant,
    period: Option<Duration>,
    payload: T,
}

#[derive(Clone, Debug)]
pub struct TaskSlot<T> {
    armed: Option<Armed<T>>,
}

impl<T: Clone> TaskSlot<T> {
    pub fn new() -> Self {
        TaskSlot { armed: None }
    }

    /// Arm a one-shot task firing `delay` after `now`.
    pub fn arm_once(&mut self, now: Instant, delay: Duration, payload: T) {
        self.armed = Some(Armed { deadline: now + delay, period: None, payload });
    }

    /// Arm a repeating task firing every `period`, first at `now + period`.
    pub fn arm_every(&mut self, now: Instant, period: Duration, payload: T) {
        self.armed = Some(Armed { deadline: now + period, period: Some(period), payload });
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }

    /// Deadline of the armed task, if it is due at `now`.
    pub fn due_at(&self, now: Instant) -> Option<Instant> {
        self.armed.as_ref().map(|a| a.deadline).filter(|d| *d <= now)
    }

    /// Fire the task if due. One-shots disarm; intervals advance by one
    /// period from the previous deadline so late frames don't drift.
    pub fn fire(&mut self, now: Instant) -> Option<T> {
        let armed = self.armed.as_mut()?;
        if armed.deadline > now {
            return None;
        }
        let payload = armed.payload.clone();
        match armed.period {
            Some(p) => armed.deadline += p,
            None => self.armed = None,
        }
        Some(payload)
    }
}

impl<T: Clone> Default for TaskSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
