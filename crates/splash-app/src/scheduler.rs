//! Frame timing and the cancellable frame schedule.
//!
//! [`FrameClock`] measures the wall-clock time between frames for hosts that
//! do not hand one in. [`FrameScheduler`] stands in for the host's
//! next-frame request: every finished frame schedules its successor until the
//! schedule is cancelled.

use std::time::Instant;

use tracing::{debug, warn};

/// Longest frame time a single frame may consume, in seconds.
pub const MAX_FRAME_TIME: f32 = 0.25;

/// Per-frame stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameStage {
    /// Star opacity from elapsed time.
    Twinkle,
    /// Orbit pivots advance.
    Orbit,
    /// Bodies advance their own rotation.
    Rotation,
    /// Pointer ray test and hover easing.
    Hover,
    /// Explosion bursts advance and expire.
    Explosions,
    /// Aurora time uniform.
    ShaderUniforms,
    /// Composite and present.
    Composite,
}

impl FrameStage {
    /// Every stage, in the order a frame runs them.
    pub const ORDER: [FrameStage; 7] = [
        FrameStage::Twinkle,
        FrameStage::Orbit,
        FrameStage::Rotation,
        FrameStage::Hover,
        FrameStage::Explosions,
        FrameStage::ShaderUniforms,
        FrameStage::Composite,
    ];
}

/// Wall-clock frame timer.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    previous: Instant,
    frames: u64,
}

impl FrameClock {
    /// Starts timing from now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Starts timing from `start`.
    pub fn starting_at(start: Instant) -> Self {
        Self {
            previous: start,
            frames: 0,
        }
    }

    /// Seconds since the previous call, clamped to [`MAX_FRAME_TIME`].
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// Seconds between the previous tick and `now`, clamped to
    /// [`MAX_FRAME_TIME`]. An instant earlier than the previous tick yields 0.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let mut dt = now.saturating_duration_since(self.previous).as_secs_f32();
        self.previous = now;
        self.frames += 1;
        if dt > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                dt * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            dt = MAX_FRAME_TIME;
        }
        dt
    }

    /// Ticks measured so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Schedule state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScheduleState {
    /// A next frame is requested.
    Pending,
    /// A frame is executing.
    InFlight,
    /// Withdrawn; no frame will run again.
    Cancelled,
}

/// Continuous, cancellable frame schedule.
///
/// A frame runs between [`begin_frame`](Self::begin_frame) and
/// [`end_frame`](Self::end_frame). Ending a frame requests the next one unless
/// the schedule was cancelled meanwhile.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    state: ScheduleState,
    frames_run: u64,
}

impl FrameScheduler {
    /// A schedule with its first frame already requested.
    pub fn start() -> Self {
        Self {
            state: ScheduleState::Pending,
            frames_run: 0,
        }
    }

    /// Claim the pending frame. Returns `false` if none is pending.
    pub fn begin_frame(&mut self) -> bool {
        if self.state != ScheduleState::Pending {
            return false;
        }
        self.state = ScheduleState::InFlight;
        true
    }

    /// Finish the running frame and request its successor, unless cancelled.
    pub fn end_frame(&mut self) {
        if self.state == ScheduleState::InFlight {
            self.frames_run += 1;
            self.state = ScheduleState::Pending;
        } else if self.state == ScheduleState::Cancelled {
            self.frames_run += 1;
            debug!(frames = self.frames_run, "frame finished after cancel, not rescheduled");
        }
    }

    /// Withdraw any pending frame. A frame in flight may finish but will not
    /// schedule a successor.
    pub fn cancel(&mut self) {
        if self.state != ScheduleState::Cancelled {
            debug!(frames = self.frames_run, "frame schedule cancelled");
            self.state = ScheduleState::Cancelled;
        }
    }

    /// Whether a next frame is requested.
    pub fn has_pending(&self) -> bool {
        self.state == ScheduleState::Pending
    }

    /// Whether the schedule was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state == ScheduleState::Cancelled
    }

    /// Frames that ran to completion.
    pub fn frames_run(&self) -> u64 {
        self.frames_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clock_measures_and_clamps() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        let dt = clock.tick_at(start + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-4);
        let dt = clock.tick_at(start + Duration::from_secs(2));
        assert_eq!(dt, MAX_FRAME_TIME);
        assert_eq!(clock.frames(), 2);
    }

    #[test]
    fn test_clock_never_goes_backwards() {
        let start = Instant::now() + Duration::from_secs(1);
        let mut clock = FrameClock::starting_at(start);
        assert_eq!(clock.tick_at(start - Duration::from_millis(5)), 0.0);
    }

    #[test]
    fn test_each_frame_schedules_the_next() {
        let mut scheduler = FrameScheduler::start();
        for _ in 0..3 {
            assert!(scheduler.begin_frame());
            assert!(!scheduler.begin_frame(), "only one frame in flight");
            scheduler.end_frame();
            assert!(scheduler.has_pending());
        }
        assert_eq!(scheduler.frames_run(), 3);
    }

    #[test]
    fn test_cancel_withdraws_pending_frame() {
        let mut scheduler = FrameScheduler::start();
        scheduler.cancel();
        assert!(!scheduler.has_pending());
        assert!(!scheduler.begin_frame());
        assert_eq!(scheduler.frames_run(), 0);
    }

    #[test]
    fn test_frame_in_flight_finishes_without_successor() {
        let mut scheduler = FrameScheduler::start();
        assert!(scheduler.begin_frame());
        scheduler.cancel();
        scheduler.end_frame();
        assert_eq!(scheduler.frames_run(), 1);
        assert!(!scheduler.has_pending());
        assert!(!scheduler.begin_frame());
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(FrameStage::ORDER.first(), Some(&FrameStage::Twinkle));
        assert_eq!(FrameStage::ORDER.last(), Some(&FrameStage::Composite));
        let hover = FrameStage::ORDER.iter().position(|s| *s == FrameStage::Hover);
        let explosions = FrameStage::ORDER
            .iter()
            .position(|s| *s == FrameStage::Explosions);
        assert!(hover < explosions);
    }
}
