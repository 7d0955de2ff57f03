/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use tokio::time::Instant;

/// Compute the next target time from the previous one.
///
/// The next target is `prev + interval`, even if that is already in the past.
/// Only when it is behind `now` by more than one whole interval, it is moved
/// forward in whole interval steps until it lies strictly after `now`.
pub fn next_target(prev: Instant, interval: Duration, now: Instant) -> Instant {
    let next = prev + interval;
    if now.saturating_duration_since(next) <= interval {
        return next;
    }

    let interval_nanos = interval.as_nanos().max(1);
    let steps = now.duration_since(prev).as_nanos() / interval_nanos + 1;
    let advance = interval_nanos.saturating_mul(steps);
    prev + Duration::from_nanos(u64::try_from(advance).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_time() {
        let prev = Instant::now();
        let interval = Duration::from_secs(2);
        assert_eq!(next_target(prev, interval, prev), prev + interval);
        assert_eq!(
            next_target(prev, interval, prev + Duration::from_millis(500)),
            prev + interval
        );
    }

    #[test]
    fn late_within_one_interval() {
        let prev = Instant::now();
        let interval = Duration::from_secs(2);
        // the target is in the past, but not by more than one interval
        let now = prev + Duration::from_secs(3);
        assert_eq!(next_target(prev, interval, now), prev + interval);
        let now = prev + Duration::from_secs(4);
        assert_eq!(next_target(prev, interval, now), prev + interval);
    }

    #[test]
    fn drift() {
        let prev = Instant::now();
        let interval = Duration::from_secs(2);
        // a cycle takes 3.5 intervals
        let now = prev + Duration::from_secs(7);
        let next = next_target(prev, interval, now);
        assert!(next > now);
        assert_eq!(next, prev + Duration::from_secs(8));
        assert!(next - now < interval);

        let now = prev + Duration::from_secs(8);
        assert_eq!(
            next_target(prev, interval, now),
            prev + Duration::from_secs(10)
        );
    }
}
