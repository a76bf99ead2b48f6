use std::time::Duration;

use tokio::time::Instant;

/// Render-frame metadata handed to per-frame callbacks.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Time since the clock started.
    pub elapsed: Duration,
    /// Time since the previous frame (zero for the first one).
    pub dt: Duration,
}

/// Numbers frames against the tokio clock, so a paused test clock yields
/// reproducible timings.
#[derive(Debug)]
pub struct FrameClock {
    started: Instant,
    last: Option<Instant>,
    next_index: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            last: None,
            next_index: 0,
        }
    }

    pub fn tick(&mut self) -> Frame {
        let now = Instant::now();
        let dt = self.last.map(|l| now - l).unwrap_or_default();
        let frame = Frame {
            index: self.next_index,
            elapsed: now - self.started,
            dt,
        };
        self.last = Some(now);
        self.next_index += 1;
        frame
    }

    pub fn frames_rendered(&self) -> u64 {
        self.next_index
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::FrameClock;

    #[tokio::test(start_paused = true)]
    async fn ticks_follow_the_tokio_clock() {
        let mut clock = FrameClock::new();
        let f0 = clock.tick();
        assert_eq!(f0.index, 0);
        assert_eq!(f0.dt, Duration::ZERO);

        tokio::time::advance(Duration::from_millis(16)).await;
        let f1 = clock.tick();
        assert_eq!(f1.index, 1);
        assert_eq!(f1.dt, Duration::from_millis(16));
        assert_eq!(f1.elapsed, Duration::from_millis(16));
        assert_eq!(clock.frames_rendered(), 2);
    }
}
