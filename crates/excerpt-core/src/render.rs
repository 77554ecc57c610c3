//! Render scheduler
//!
//! Throttled repaint of the envelope curve, the playhead, and the dimming
//! mask over excluded timeline parts. Rendering is pulled: components
//! request a repaint, and the session runs the scheduler once per pump, so
//! paints can never overlap and position updates never push paints
//! themselves. Everything reads the authoritative playhead value handed in
//! by the session.

use std::time::{Duration, Instant};

use crate::clock::SharedClock;
use crate::envelope::{effective_gain, EnvelopeConfig, FadeToggle};
use crate::types::{RegionBounds, Seconds};

/// Minimum interval between non-forced paints (~60 Hz)
pub const MIN_PAINT_INTERVAL: Duration = Duration::from_millis(16);

/// One frame of timeline state, in normalized track coordinates `[0, 1]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    /// Envelope curve as `(x, gain)` samples spanning the region
    pub curve: Vec<(f64, f64)>,
    /// Playhead x position
    pub playhead: f64,
    /// Spans to dim; outside the region normally, the region itself in
    /// delete mode
    pub dim_spans: Vec<(f64, f64)>,
}

/// Consumes built scenes and turns them into pixels
pub trait Surface {
    fn paint(&mut self, scene: &Scene);
}

/// Coalescing repaint scheduler
pub struct RenderScheduler {
    clock: SharedClock,
    last_paint: Option<Instant>,
    pending: bool,
    forced: bool,
    dragging: bool,
    delete_mode: bool,
}

impl RenderScheduler {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            last_paint: None,
            pending: false,
            forced: false,
            dragging: false,
            delete_mode: false,
        }
    }

    /// Ask for a repaint; `force` bypasses the rate limit
    pub fn request_repaint(&mut self, force: bool) {
        self.pending = true;
        if force {
            self.forced = true;
        }
    }

    /// Drags repaint every frame for visual responsiveness
    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    /// Invert the dimming mask to cover the kept section instead
    pub fn set_delete_mode(&mut self, delete_mode: bool) {
        self.delete_mode = delete_mode;
    }

    #[inline]
    pub fn delete_mode(&self) -> bool {
        self.delete_mode
    }

    fn due(&self) -> bool {
        if !self.pending {
            return false;
        }
        if self.forced || self.dragging {
            return true;
        }
        match self.last_paint {
            Some(at) => self.clock.now().duration_since(at) >= MIN_PAINT_INTERVAL,
            None => true,
        }
    }

    /// Paint if a repaint is due; returns whether the surface was touched
    pub fn run(
        &mut self,
        surface: &mut dyn Surface,
        bounds: RegionBounds,
        total_duration: Seconds,
        position: Seconds,
        envelope: &EnvelopeConfig,
        fade: FadeToggle,
    ) -> bool {
        if !self.due() {
            return false;
        }
        self.pending = false;
        self.forced = false;
        self.last_paint = Some(self.clock.now());

        let scene = build_scene(
            bounds,
            total_duration,
            position,
            envelope,
            fade,
            self.delete_mode,
        );
        surface.paint(&scene);
        true
    }
}

/// Sample the envelope and lay out one scene
///
/// The curve resolution follows the profile: simple linear shapes get few
/// samples, curved ones more.
pub fn build_scene(
    bounds: RegionBounds,
    total_duration: Seconds,
    position: Seconds,
    envelope: &EnvelopeConfig,
    fade: FadeToggle,
    delete_mode: bool,
) -> Scene {
    if total_duration <= 0.0 {
        return Scene::default();
    }

    let samples = envelope.profile.curve_sample_count();
    let region_seconds = bounds.length();
    let mut curve = Vec::with_capacity(samples);
    for i in 0..samples {
        let rel = i as f64 / (samples - 1) as f64;
        let gain = effective_gain(envelope, fade, rel, region_seconds);
        let x = (bounds.start + rel * region_seconds) / total_duration;
        curve.push((x, gain));
    }

    let start_x = (bounds.start / total_duration).clamp(0.0, 1.0);
    let end_x = (bounds.end / total_duration).clamp(0.0, 1.0);
    let dim_spans = if delete_mode {
        vec![(start_x, end_x)]
    } else {
        let mut spans = Vec::new();
        if start_x > 0.0 {
            spans.push((0.0, start_x));
        }
        if end_x < 1.0 {
            spans.push((end_x, 1.0));
        }
        spans
    };

    Scene {
        curve,
        playhead: (position / total_duration).clamp(0.0, 1.0),
        dim_spans,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EnvelopeProfile;
    use crate::testing::{ManualClock, RecordingSurface};
    use std::rc::Rc;
    use std::time::Duration;

    fn scheduler() -> (RenderScheduler, Rc<ManualClock>) {
        let clock = Rc::new(ManualClock::new());
        (RenderScheduler::new(clock.clone()), clock)
    }

    fn run(scheduler: &mut RenderScheduler, surface: &mut RecordingSurface) -> bool {
        scheduler.run(
            surface,
            RegionBounds::new(5.0, 15.0),
            20.0,
            10.0,
            &EnvelopeConfig::default(),
            FadeToggle::default(),
        )
    }

    #[test]
    fn test_nothing_paints_without_request() {
        let (mut scheduler, _clock) = scheduler();
        let mut surface = RecordingSurface::default();
        assert!(!run(&mut scheduler, &mut surface));
        assert!(surface.scenes.is_empty());
    }

    #[test]
    fn test_rapid_requests_coalesce() {
        let (mut scheduler, clock) = scheduler();
        let mut surface = RecordingSurface::default();

        scheduler.request_repaint(false);
        assert!(run(&mut scheduler, &mut surface));

        // Second request lands inside the interval and is held back
        scheduler.request_repaint(false);
        assert!(!run(&mut scheduler, &mut surface));

        clock.advance(MIN_PAINT_INTERVAL);
        assert!(run(&mut scheduler, &mut surface));
        assert_eq!(surface.scenes.len(), 2);
    }

    #[test]
    fn test_force_bypasses_throttle() {
        let (mut scheduler, _clock) = scheduler();
        let mut surface = RecordingSurface::default();

        scheduler.request_repaint(false);
        assert!(run(&mut scheduler, &mut surface));
        scheduler.request_repaint(true);
        assert!(run(&mut scheduler, &mut surface));
    }

    #[test]
    fn test_dragging_paints_every_frame() {
        let (mut scheduler, _clock) = scheduler();
        let mut surface = RecordingSurface::default();
        scheduler.set_dragging(true);

        scheduler.request_repaint(false);
        assert!(run(&mut scheduler, &mut surface));
        scheduler.request_repaint(false);
        assert!(run(&mut scheduler, &mut surface));

        scheduler.set_dragging(false);
        scheduler.request_repaint(false);
        assert!(!run(&mut scheduler, &mut surface));
    }

    #[test]
    fn test_request_survives_until_interval_elapses() {
        let (mut scheduler, clock) = scheduler();
        let mut surface = RecordingSurface::default();

        scheduler.request_repaint(false);
        assert!(run(&mut scheduler, &mut surface));

        scheduler.request_repaint(false);
        clock.advance(Duration::from_millis(10));
        assert!(!run(&mut scheduler, &mut surface));
        clock.advance(Duration::from_millis(6));
        assert!(run(&mut scheduler, &mut surface));
    }

    #[test]
    fn test_curve_resolution_follows_profile() {
        let bounds = RegionBounds::new(0.0, 10.0);
        let uniform = EnvelopeConfig::default();
        let bell = EnvelopeConfig {
            profile: EnvelopeProfile::Bell,
            ..EnvelopeConfig::default()
        };

        let flat = build_scene(bounds, 10.0, 0.0, &uniform, FadeToggle::default(), false);
        let curved = build_scene(bounds, 10.0, 0.0, &bell, FadeToggle::default(), false);
        assert_eq!(flat.curve.len(), EnvelopeProfile::Uniform.curve_sample_count());
        assert_eq!(curved.curve.len(), EnvelopeProfile::Bell.curve_sample_count());
        assert!(curved.curve.len() > flat.curve.len());
    }

    #[test]
    fn test_curve_spans_region_in_track_coordinates() {
        let scene = build_scene(
            RegionBounds::new(5.0, 15.0),
            20.0,
            0.0,
            &EnvelopeConfig::default(),
            FadeToggle::default(),
            false,
        );
        let (first_x, _) = scene.curve[0];
        let (last_x, _) = *scene.curve.last().unwrap();
        assert!((first_x - 0.25).abs() < 1e-9);
        assert!((last_x - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_dim_spans_cover_outside_of_region() {
        let scene = build_scene(
            RegionBounds::new(5.0, 15.0),
            20.0,
            0.0,
            &EnvelopeConfig::default(),
            FadeToggle::default(),
            false,
        );
        assert_eq!(scene.dim_spans, vec![(0.0, 0.25), (0.75, 1.0)]);
    }

    #[test]
    fn test_delete_mode_inverts_dim_mask() {
        let scene = build_scene(
            RegionBounds::new(5.0, 15.0),
            20.0,
            0.0,
            &EnvelopeConfig::default(),
            FadeToggle::default(),
            true,
        );
        assert_eq!(scene.dim_spans, vec![(0.25, 0.75)]);
    }

    #[test]
    fn test_full_track_region_has_no_dim_spans() {
        let scene = build_scene(
            RegionBounds::new(0.0, 20.0),
            20.0,
            0.0,
            &EnvelopeConfig::default(),
            FadeToggle::default(),
            false,
        );
        assert!(scene.dim_spans.is_empty());
    }

    #[test]
    fn test_playhead_normalized_to_track() {
        let scene = build_scene(
            RegionBounds::new(5.0, 15.0),
            20.0,
            10.0,
            &EnvelopeConfig::default(),
            FadeToggle::default(),
            false,
        );
        assert!((scene.playhead - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_track_builds_empty_scene() {
        let scene = build_scene(
            RegionBounds::new(0.0, 1.0),
            0.0,
            0.0,
            &EnvelopeConfig::default(),
            FadeToggle::default(),
            false,
        );
        assert_eq!(scene, Scene::default());
    }
}
