//! Tween scheduler: the time-driven property animator.
//!
//! Two tiers share one per-tick entry point:
//!
//! 1. **Ad-hoc tweens** ([`TweenScheduler::run`]) accumulate tick deltas and
//!    report `easing(progress)` each tick. Used for entity-local effects
//!    (explode fade/shrink, drops).
//! 2. **Property tweens** ([`TweenScheduler::animate`]) interpolate a value
//!    from start to target against wall-clock elapsed time — not tick count,
//!    so a slow frame cannot stretch the animation — and snap to the exact
//!    target on completion. Used for a column's `position` while stopping.
//!
//! The scheduler holds no domain knowledge: callers attach a copyable tag to
//! each tween and route the emitted [`TweenFrame`]s themselves. It is a value
//! owned by the engine and passed where needed, not a process-wide registry,
//! which keeps the core deterministic under a virtual clock.

use serde::{Deserialize, Serialize};

/// An easing curve mapping linear progress `t in [0, 1]` to eased progress.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum Easing {
    /// Identity.
    Linear,
    /// `t^3` — slow start, used for drops gathering speed.
    InCubic,
    /// `1 - (1-t)^3` — fast start, used for fades.
    OutCubic,
    /// Overshoot-and-settle deceleration with the given back amount, used
    /// for the reel stop.
    Backout(f32),
}

impl Easing {
    /// Applies the curve to a progress value.
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Self::Linear => t,
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::Backout(amount) => {
                let t = t - 1.0;
                t * t * ((amount + 1.0) * t + amount) + 1.0
            }
        }
    }
}

/// Handle to an active tween.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TweenId(u64);

/// One per-tick sample of an active tween.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TweenFrame<T> {
    /// Handle returned when the tween was started.
    pub id: TweenId,
    /// Caller-supplied routing tag.
    pub tag: T,
    /// For property tweens the interpolated value; for ad-hoc tweens the
    /// eased progress in `[0, 1]`.
    pub value: f32,
    /// True on the final frame. The tween is removed after emitting it.
    pub done: bool,
}

#[derive(Debug, Clone)]
struct PropertyTween<T> {
    id: TweenId,
    tag: T,
    start: f32,
    target: f32,
    duration_ms: u64,
    easing: Easing,
    started_at_ms: u64,
}

#[derive(Debug, Clone)]
struct AdHocTween<T> {
    id: TweenId,
    tag: T,
    duration_ms: u64,
    easing: Easing,
    elapsed_ms: u64,
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Registry of active tweens, advanced once per clock tick.
#[derive(Debug, Clone, Default)]
pub struct TweenScheduler<T> {
    next_id: u64,
    property: Vec<PropertyTween<T>>,
    adhoc: Vec<AdHocTween<T>>,
}

impl<T: Copy> TweenScheduler<T> {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            property: Vec::new(),
            adhoc: Vec::new(),
        }
    }

    fn fresh_id(&mut self) -> TweenId {
        let id = TweenId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Starts a property tween from `start` to `target` over `duration_ms`,
    /// anchored at `now_ms`.
    ///
    /// Frames report the interpolated value; the final frame reports exactly
    /// `target`.
    pub fn animate(
        &mut self,
        tag: T,
        start: f32,
        target: f32,
        duration_ms: u64,
        easing: Easing,
        now_ms: u64,
    ) -> TweenId {
        let id = self.fresh_id();
        self.property.push(PropertyTween {
            id,
            tag,
            start,
            target,
            duration_ms,
            easing,
            started_at_ms: now_ms,
        });
        id
    }

    /// Starts an ad-hoc tween of `duration_ms`.
    ///
    /// Frames report the eased progress; the final frame reports
    /// `easing(1.0)`.
    pub fn run(&mut self, tag: T, duration_ms: u64, easing: Easing) -> TweenId {
        let id = self.fresh_id();
        self.adhoc.push(AdHocTween {
            id,
            tag,
            duration_ms,
            easing,
            elapsed_ms: 0,
        });
        id
    }

    /// Advances every active tween and returns one frame per tween.
    ///
    /// Frames are ordered property-then-ad-hoc, each group in start order,
    /// so routing is deterministic. Completed tweens emit a final `done`
    /// frame and are removed.
    pub fn tick(&mut self, now_ms: u64, dt_ms: u64) -> Vec<TweenFrame<T>> {
        let mut frames = Vec::with_capacity(self.property.len() + self.adhoc.len());

        for tween in &self.property {
            let elapsed = now_ms.saturating_sub(tween.started_at_ms);
            let phase = if tween.duration_ms == 0 {
                1.0
            } else {
                (elapsed as f32 / tween.duration_ms as f32).min(1.0)
            };
            let done = phase >= 1.0;
            let value = if done {
                tween.target
            } else {
                lerp(tween.start, tween.target, tween.easing.apply(phase))
            };
            frames.push(TweenFrame {
                id: tween.id,
                tag: tween.tag,
                value,
                done,
            });
        }
        self.property.retain(|t| {
            let elapsed = now_ms.saturating_sub(t.started_at_ms);
            t.duration_ms > 0 && elapsed < t.duration_ms
        });

        for tween in &mut self.adhoc {
            tween.elapsed_ms += dt_ms;
            let t = if tween.duration_ms == 0 {
                1.0
            } else {
                (tween.elapsed_ms as f32 / tween.duration_ms as f32).min(1.0)
            };
            frames.push(TweenFrame {
                id: tween.id,
                tag: tween.tag,
                value: tween.easing.apply(t),
                done: t >= 1.0,
            });
        }
        self.adhoc
            .retain(|t| t.duration_ms > 0 && t.elapsed_ms < t.duration_ms);

        frames
    }

    /// Drops every active tween without emitting final frames.
    pub fn clear(&mut self) {
        self.property.clear();
        self.adhoc.clear();
    }

    /// Number of tweens still running.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.property.len() + self.adhoc.len()
    }

    /// True when nothing is animating.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.property.is_empty() && self.adhoc.is_empty()
    }
}
