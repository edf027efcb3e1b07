use std::time::Duration;

/// `base * 2^attempt`, capped at `max`, then spread by +/- `jitter_frac`.
pub fn exponential_jitter_backoff(
    base: Duration,
    attempt: u32,
    max: Duration,
    jitter_frac: f32,
) -> Duration {
    let factor = 1u32 << attempt.min(16);
    let capped = base.saturating_mul(factor).min(max);
    let jitter_frac = f64::from(jitter_frac.clamp(0.0, 1.0));
    if jitter_frac == 0.0 {
        return capped;
    }
    let spread = capped.as_secs_f64() * jitter_frac;
    let offset = (fastrand::f64() * 2.0 - 1.0) * spread;
    Duration::from_secs_f64((capped.as_secs_f64() + offset).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let base = Duration::from_millis(200);
        let max = Duration::from_secs(5);
        assert_eq!(
            exponential_jitter_backoff(base, 0, max, 0.0),
            Duration::from_millis(200)
        );
        assert_eq!(
            exponential_jitter_backoff(base, 2, max, 0.0),
            Duration::from_millis(800)
        );
        assert_eq!(exponential_jitter_backoff(base, 30, max, 0.0), max);
    }

    #[test]
    fn jitter_stays_within_band() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(60);
        for _ in 0..100 {
            let wait = exponential_jitter_backoff(base, 1, max, 0.25);
            assert!(wait >= Duration::from_millis(1500));
            assert!(wait <= Duration::from_millis(2500));
        }
    }
}
