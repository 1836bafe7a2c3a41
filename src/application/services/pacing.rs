use std::time::Duration;

use rand::Rng;

use crate::domain::models::{DispatchSettings, QueuedMessage};

/// Computes the pause between two consecutive sends. Messages to the same
/// recipient stay visually contiguous behind a short fixed delay; everything
/// else gets a randomized delay so the traffic pattern does not look
/// machine-generated.
pub struct PacingController {
    same_recipient_delay: Duration,
}

impl PacingController {
    pub fn new(same_recipient_delay: Duration) -> Self {
        Self {
            same_recipient_delay,
        }
    }

    pub fn delay_before_next(
        &self,
        current: &QueuedMessage,
        next: &QueuedMessage,
        settings: &DispatchSettings,
    ) -> Duration {
        if current.recipient == next.recipient {
            return self.same_recipient_delay;
        }

        let min = settings.delay_min_secs.min(settings.delay_max_secs);
        let max = settings.delay_min_secs.max(settings.delay_max_secs);
        let seconds = rand::rng().random_range(min..=max);
        Duration::from_secs(u64::from(seconds))
    }
}
