//! The reconciler: keeps the crop selection anchored to image pixels.
//!
//! # Model
//!
//! The logical region lives in image-space and is only trusted while its
//! projection is fully visible. Edits made against a clipped or off-screen
//! display are recorded as image-space deltas and folded into the region
//! once the effective rectangle (region + pending delta) is fully visible
//! again, either right away or on a later transform change.
//!
//! # Event Flow
//!
//! 1. Transform change: re-project, clip for display, commit a pending
//!    delta if the result is now fully visible.
//! 2. Edit start: record the image-space baseline of the displayed box.
//! 3. Edit end: commit if fully visible, otherwise accumulate the delta.
//!    A newly drawn box replaces the region outright, or is rejected.
//! 4. Reset / clear: drop region, delta and snapshot together.
//! 5. Pan gesture: reconcile on each move (deferred) and at the end.
//!
//! Errors never escape the event handlers. Each rejected update keeps the
//! last good state and is logged.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::adapter::{CropEvent, CropRenderer, EditAction};
use crate::config::EngineConfig;
use crate::error::{CropError, CropResult};
use crate::geometry::{ImageRect, PendingDelta, Transform, ViewportRect};
use crate::pixels::PixelBuffer;
use crate::projector::{to_image, to_viewport};
use crate::region::{validate_region, RegionStore, Snapshot};
use crate::schedule::{DeferredTask, Epoch, Scheduler};
use crate::visibility::{classify, clip, VisibilityState};

/// Reconciler state for the active selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconcilerState {
    /// No logical region.
    Idle,
    /// The user is dragging or resizing the selection.
    Editing {
        /// Image-space rectangle displayed when the edit began.
        baseline: Option<ImageRect>,
        action: EditAction,
        session: Epoch,
    },
    /// The user is dragging the image.
    Panning { session: Epoch },
    /// The logical region is committed, fully visible, and no delta is pending.
    CommittedVisible,
    /// The logical region is committed but the view shows it clipped or
    /// not at all. No delta is pending.
    CommittedHidden,
    /// A delta is waiting for the region to become fully visible.
    DeferredPartialEdit,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub commits: usize,
    pub deferrals: usize,
    pub rejected_updates: usize,
    pub stale_tasks: usize,
    pub constrained_updates: usize,
    pub rejected_zooms: usize,
}

/// Logical region summary for hosts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropData {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// True while an uncommitted delta is outstanding.
    pub pending: bool,
}

/// Crop engine driving one selection on one renderer.
pub struct CropEngine<R: CropRenderer> {
    renderer: R,
    config: EngineConfig,
    store: RegionStore,
    scheduler: Scheduler,
    state: ReconcilerState,
    visibility: Option<VisibilityState>,
    stats: EngineStats,
}

impl<R: CropRenderer> CropEngine<R> {
    /// Create an engine with the default configuration.
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            config: EngineConfig::default(),
            store: RegionStore::new(),
            scheduler: Scheduler::new(),
            state: ReconcilerState::Idle,
            visibility: None,
            stats: EngineStats::default(),
        }
    }

    /// Create an engine with a custom configuration.
    ///
    /// # Errors
    ///
    /// `CropError::InvalidConfig` if the configuration fails validation.
    pub fn with_config(renderer: R, config: EngineConfig) -> CropResult<Self> {
        config.validate()?;
        let mut engine = Self::new(renderer);
        engine.config = config;
        Ok(engine)
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Mutable access for hosts that mirror live view state into the renderer.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> ReconcilerState {
        self.state
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The logical region including any pending delta.
    ///
    /// Never a clipped value: this is the last committed region plus the
    /// uncommitted adjustment.
    pub fn logical_region(&self) -> Option<ImageRect> {
        self.store.effective()
    }

    /// The last committed region, without the pending delta.
    pub fn committed_region(&self) -> Option<ImageRect> {
        self.store.logical()
    }

    pub fn pending_delta(&self) -> Option<PendingDelta> {
        self.store.pending()
    }

    pub fn has_deferred_update(&self) -> bool {
        self.store.has_pending()
    }

    /// Last computed visibility; `OutOfBounds` when there is no region.
    pub fn visibility_state(&self) -> VisibilityState {
        if self.store.logical().is_none() {
            return VisibilityState::default();
        }
        self.visibility.unwrap_or_default()
    }

    pub fn crop_data(&self) -> Option<CropData> {
        let rect = self.store.effective()?;
        Some(CropData {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            pending: self.store.has_pending(),
        })
    }

    /// Snapshot if one is valid, otherwise a render of the displayed
    /// selection.
    ///
    /// The fallback reads whatever the renderer currently shows, which may
    /// be clipped. Only the snapshot is stable across pan and zoom.
    pub fn result(&mut self) -> Option<PixelBuffer> {
        self.store.logical()?;

        if let Some(snapshot) = self.store.snapshot() {
            return Some(snapshot.pixels.clone());
        }

        debug!("No snapshot, rendering from displayed selection");
        let displayed = self.renderer.displayed_selection()?;
        let region = match to_image(&displayed, &self.renderer.transform()) {
            Ok(region) => region,
            Err(e) => {
                warn!("Cannot render result: {}", e);
                return None;
            }
        };
        self.renderer.render_pixels(&region)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Process one event.
    pub fn handle(&mut self, event: CropEvent) {
        match event {
            CropEvent::Ready => self.on_ready(),
            CropEvent::EditStart(action) => self.on_edit_start(action),
            CropEvent::EditMove => self.on_edit_move(),
            CropEvent::EditEnd => self.on_edit_end(),
            CropEvent::TransformChanged => self.on_transform_changed(),
            CropEvent::PanStart => self.on_pan_start(),
            CropEvent::PanMove => self.on_pan_move(),
            CropEvent::PanEnd => self.on_pan_end(),
        }
    }

    /// The renderer is ready: adopt its selection as the logical region.
    ///
    /// A region that already exists is re-projected instead. The renderer's
    /// box may be clipped at that point and must not replace it.
    pub fn on_ready(&mut self) {
        info!("Renderer ready");
        let outcome = if self.store.logical().is_some() {
            self.reconcile()
        } else {
            self.capture_displayed()
        };
        if let Err(e) = outcome {
            self.absorb(e);
        }
    }

    pub fn on_edit_start(&mut self, action: EditAction) {
        if action.is_pan() {
            self.on_pan_start();
            return;
        }

        let session = self.scheduler.begin_session();
        let baseline = match self.renderer.displayed_selection() {
            Some(displayed) => match to_image(&displayed, &self.renderer.transform()) {
                Ok(rect) => Some(rect),
                Err(e) => {
                    // Without a baseline the edit cannot be expressed in image-space.
                    self.absorb(e);
                    return;
                }
            },
            None => None,
        };

        debug!("Edit start {:?} (session {:?}), baseline {:?}", action, session, baseline);
        self.state = ReconcilerState::Editing {
            baseline,
            action,
            session,
        };
    }

    pub fn on_edit_move(&mut self) {
        match self.state {
            ReconcilerState::Panning { .. } => self.on_pan_move(),
            ReconcilerState::Editing { .. } => {}
            _ => debug!("Edit move outside a gesture ignored"),
        }
    }

    pub fn on_edit_end(&mut self) {
        let (baseline, action) = match self.state {
            ReconcilerState::Editing { baseline, action, .. } => (baseline, action),
            ReconcilerState::Panning { .. } => {
                self.on_pan_end();
                return;
            }
            _ => {
                debug!("Edit end without edit start ignored");
                return;
            }
        };

        self.state = self.resting_state();
        if let Err(e) = self.finish_edit(baseline, action) {
            self.absorb(e);
        }
    }

    /// Pan or zoom happened.
    pub fn on_transform_changed(&mut self) {
        if matches!(self.state, ReconcilerState::Editing { .. }) {
            debug!("Transform change during edit ignored");
            return;
        }
        if let Err(e) = self.reconcile() {
            self.absorb(e);
        }
    }

    pub fn on_pan_start(&mut self) {
        let session = self.scheduler.begin_session();
        debug!("Pan start (session {:?})", session);
        self.state = ReconcilerState::Panning { session };
    }

    /// The image moved under the pointer; reconcile once it has rendered.
    pub fn on_pan_move(&mut self) {
        if matches!(self.state, ReconcilerState::Panning { .. }) {
            self.scheduler.schedule(DeferredTask::Reconcile);
        } else {
            debug!("Pan move without pan start ignored");
        }
    }

    /// Commits if the effective region is now fully visible; otherwise the
    /// delta stays pending for a later transform change.
    pub fn on_pan_end(&mut self) {
        if !matches!(self.state, ReconcilerState::Panning { .. }) {
            debug!("Pan end without pan start ignored");
            return;
        }
        self.state = self.resting_state();
        if let Err(e) = self.reconcile() {
            self.absorb(e);
        }
    }

    /// Whether the host may apply a zoom to `ratio`.
    pub fn on_zoom(&mut self, ratio: f64) -> bool {
        if self.config.allows_zoom(ratio) {
            return true;
        }
        warn!(
            "Zoom ratio {} outside [{}, {}], refusing",
            ratio, self.config.min_zoom, self.config.max_zoom
        );
        self.stats.rejected_zooms += 1;
        false
    }

    /// Run deferred work queued before this call.
    ///
    /// Hosts call this once the current render cycle has settled. Work from
    /// superseded sessions is dropped.
    pub fn settle(&mut self) {
        let (tasks, stale) = self.scheduler.drain();
        if stale > 0 {
            debug!("Discarded {} stale deferred task(s)", stale);
            self.stats.stale_tasks += stale;
        }

        for task in tasks {
            let outcome = match task {
                DeferredTask::Reconcile => {
                    if matches!(self.state, ReconcilerState::Editing { .. }) {
                        Ok(())
                    } else {
                        self.reconcile()
                    }
                }
                DeferredTask::Recapture => {
                    if self.store.logical().is_some() {
                        Ok(())
                    } else {
                        self.capture_displayed()
                    }
                }
            };
            if let Err(e) = outcome {
                self.absorb(e);
            }
        }
    }

    /// Clear everything, then re-adopt the renderer's selection once its
    /// own reset has settled.
    pub fn reset(&mut self) {
        info!("Reset crop region");
        self.clear_state();
        self.scheduler.schedule(DeferredTask::Recapture);
    }

    /// Clear everything.
    pub fn clear(&mut self) {
        info!("Clear crop region");
        self.clear_state();
    }

    /// The renderer loaded a different source image.
    pub fn replace_image(&mut self) {
        info!("Source image replaced");
        self.reset();
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn clear_state(&mut self) {
        self.scheduler.begin_session();
        self.store.clear();
        self.state = ReconcilerState::Idle;
        self.visibility = None;
    }

    fn resting_state(&self) -> ReconcilerState {
        if self.store.logical().is_none() {
            ReconcilerState::Idle
        } else if self.store.has_pending() {
            ReconcilerState::DeferredPartialEdit
        } else if self.visibility_state().is_fully_visible() {
            ReconcilerState::CommittedVisible
        } else {
            ReconcilerState::CommittedHidden
        }
    }

    fn classify_image(&self, rect: &ImageRect, transform: &Transform) -> VisibilityState {
        let projected = to_viewport(rect, transform);
        classify(&projected, &self.renderer.viewport_bounds(), &self.config)
    }

    fn validate(&self, rect: &ImageRect) -> CropResult<()> {
        validate_region(
            rect,
            self.renderer.image_size(),
            self.config.max_region_factor,
        )
    }

    /// Adopt the displayed selection as the logical region.
    fn capture_displayed(&mut self) -> CropResult<()> {
        let displayed = self
            .renderer
            .displayed_selection()
            .ok_or(CropError::NoActiveRegion)?;
        let transform = self.renderer.transform();
        let region = to_image(&displayed, &transform)?;

        debug!("Capturing region {:?}", region);
        self.replace_region(region, &transform)
    }

    /// Commit an absolute rectangle, discarding any pending delta. Only a
    /// fully visible rectangle is trusted.
    fn replace_region(&mut self, region: ImageRect, transform: &Transform) -> CropResult<()> {
        self.validate(&region)?;
        let visibility = self.classify_image(&region, transform);
        if !visibility.is_fully_visible() {
            return Err(CropError::DegenerateRegion(format!(
                "new selection is not fully visible ({:?})",
                visibility
            )));
        }
        self.commit(region, transform);
        Ok(())
    }

    fn finish_edit(&mut self, baseline: Option<ImageRect>, action: EditAction) -> CropResult<()> {
        let transform = self.renderer.transform();
        let displayed = self
            .renderer
            .displayed_selection()
            .ok_or(CropError::NoActiveRegion)?;
        let post_edit = to_image(&displayed, &transform)?;

        // A drawn box is absolute; it replaces the region rather than moving it.
        let effective = match self.store.effective() {
            Some(effective) if action != EditAction::Crop => effective,
            _ => {
                debug!("New selection drawn: {:?}", post_edit);
                return self.replace_region(post_edit, &transform);
            }
        };

        let baseline = baseline.ok_or(CropError::NoActiveRegion)?;
        let delta = post_edit.delta_from(&baseline);
        let candidate = effective.offset_by(&delta);
        self.validate(&candidate)?;

        let visibility = self.classify_image(&candidate, &transform);
        if visibility.is_fully_visible() {
            debug!("Edit committed: {:?}", candidate);
            self.commit(candidate, &transform);
        } else {
            let total = self.store.accumulate(delta)?;
            self.stats.deferrals += 1;
            self.state = ReconcilerState::DeferredPartialEdit;
            self.visibility = Some(visibility);
            debug!(
                "Edit deferred ({:?}), pending delta now {:?}",
                visibility, total
            );
            self.show(&candidate, &transform);
        }
        Ok(())
    }

    /// Transition 1: re-project the effective region for the current view.
    fn reconcile(&mut self) -> CropResult<()> {
        let effective = self.store.effective().ok_or(CropError::NoActiveRegion)?;
        self.validate(&effective)?;

        let transform = self.renderer.transform();
        if !transform.is_invertible() {
            return Err(CropError::InvalidTransform);
        }

        let visibility = self.show(&effective, &transform);
        self.visibility = Some(visibility);

        if visibility.is_fully_visible() && self.store.has_pending() {
            info!("Pending delta committed: {:?}", effective);
            self.commit(effective, &transform);
        } else if !matches!(
            self.state,
            ReconcilerState::Panning { .. } | ReconcilerState::Editing { .. }
        ) {
            self.state = self.resting_state();
        }
        Ok(())
    }

    /// Project, clip and display a region. Returns its visibility.
    fn show(&mut self, region: &ImageRect, transform: &Transform) -> VisibilityState {
        let bounds = self.renderer.viewport_bounds();
        let projected = to_viewport(region, transform);
        let visibility = classify(&projected, &bounds, &self.config);
        let display = clip(&projected, &bounds);
        if let Some(edge) = display.offscreen {
            debug!("Selection off screen towards {:?}", edge);
        }
        self.push_display(display.rect);
        visibility
    }

    fn push_display(&mut self, rect: ViewportRect) {
        self.renderer.set_displayed_selection(rect);

        if let Some(actual) = self.renderer.displayed_selection() {
            let diff = actual.max_difference(&rect);
            if diff > self.config.constraint_tolerance {
                warn!(
                    "Renderer constrained the selection: wanted {:?}, got {:?}",
                    rect, actual
                );
                self.stats.constrained_updates += 1;
            }
        }
    }

    /// Replace the logical region and refresh the display and snapshot.
    ///
    /// Callers only commit rectangles they classified as fully visible.
    fn commit(&mut self, region: ImageRect, transform: &Transform) {
        self.store.commit(region);
        self.stats.commits += 1;

        let visibility = self.show(&region, transform);
        self.visibility = Some(visibility);
        if visibility.is_fully_visible() {
            self.capture_snapshot(region);
        }
        // A pan gesture keeps its state until it ends.
        if !matches!(self.state, ReconcilerState::Panning { .. }) {
            self.state = self.resting_state();
        }
    }

    fn capture_snapshot(&mut self, region: ImageRect) {
        match self.renderer.render_pixels(&region) {
            Some(pixels) => {
                self.store.store_snapshot(Snapshot { region, pixels });
            }
            None => debug!("Renderer produced no pixels for {:?}", region),
        }
    }

    fn absorb(&mut self, error: CropError) {
        match error {
            CropError::NoActiveRegion => debug!("{}", error),
            _ => {
                warn!("Update rejected: {}", error);
                self.stats.rejected_updates += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{Handle, ViewRenderer};
    use crate::geometry::{ImageSize, ViewportBounds};

    const TOL: f64 = 1e-9;

    /// 1000x800 image in a 500x400 viewport at half scale.
    fn renderer() -> ViewRenderer {
        let mut r = ViewRenderer::new(
            ImageSize::new(1000, 800),
            ViewportBounds::new(500.0, 400.0),
            Transform::new(0.0, 0.0, 0.5, 0.5),
        );
        r.set_source(PixelBuffer::new(1000, 800, vec![128u8; 1000 * 800 * 3]));
        r
    }

    /// Engine with the region {100,100,200,150} captured on ready.
    fn ready_engine() -> CropEngine<ViewRenderer> {
        let mut r = renderer();
        r.displayed = Some(ViewportRect::new(50.0, 50.0, 100.0, 75.0));
        let mut engine = CropEngine::new(r);
        engine.on_ready();
        engine
    }

    fn region() -> ImageRect {
        ImageRect::new(100.0, 100.0, 200.0, 150.0)
    }

    fn set_transform(engine: &mut CropEngine<ViewRenderer>, t: Transform) {
        engine.renderer_mut().transform = t;
        engine.on_transform_changed();
    }

    /// Drag the displayed selection by a viewport offset.
    fn drag(engine: &mut CropEngine<ViewRenderer>, dx: f64, dy: f64) {
        engine.on_edit_start(EditAction::All);
        let shown = engine.renderer().displayed.unwrap();
        engine.renderer_mut().displayed =
            Some(ViewportRect::new(shown.x + dx, shown.y + dy, shown.width, shown.height));
        engine.on_edit_move();
        engine.on_edit_end();
    }

    #[test]
    fn test_scenario_a_fully_visible() {
        let engine = ready_engine();
        assert_eq!(engine.logical_region(), Some(region()));
        assert_eq!(engine.visibility_state(), VisibilityState::FullyVisible);
        assert!(engine
            .renderer()
            .displayed
            .unwrap()
            .approx_eq(&ViewportRect::new(50.0, 50.0, 100.0, 75.0), TOL));
        assert_eq!(engine.state(), ReconcilerState::CommittedVisible);
    }

    #[test]
    fn test_scenario_b_panned_out_left() {
        let mut engine = ready_engine();
        set_transform(&mut engine, Transform::new(-480.0, 0.0, 0.5, 0.5));

        assert_eq!(engine.visibility_state(), VisibilityState::OutOfBounds);
        let shown = engine.renderer().displayed.unwrap();
        assert!(shown.approx_eq(&ViewportRect::new(0.0, 50.0, 0.0, 0.0), TOL));
        assert_eq!(engine.logical_region(), Some(region()));
    }

    #[test]
    fn test_scenario_c_edit_deferred() {
        let mut engine = ready_engine();
        set_transform(&mut engine, Transform::new(-480.0, 0.0, 0.5, 0.5));
        drag(&mut engine, 50.0, 0.0);

        let delta = engine.pending_delta().unwrap();
        assert!((delta.dx - 100.0).abs() < TOL);
        assert!(delta.dy.abs() < TOL);
        assert_eq!(engine.committed_region(), Some(region()));
        assert!(engine.has_deferred_update());
        assert_eq!(engine.state(), ReconcilerState::DeferredPartialEdit);
        assert_ne!(engine.visibility_state(), VisibilityState::FullyVisible);
    }

    #[test]
    fn test_scenario_d_pending_committed_on_pan_back() {
        let mut engine = ready_engine();
        set_transform(&mut engine, Transform::new(-480.0, 0.0, 0.5, 0.5));
        drag(&mut engine, 50.0, 0.0);
        let renders_before = engine.renderer().renders;

        set_transform(&mut engine, Transform::new(0.0, 0.0, 0.5, 0.5));

        let committed = engine.committed_region().unwrap();
        assert!((committed.x - 200.0).abs() < TOL);
        assert!((committed.width - 200.0).abs() < TOL);
        assert!(!engine.has_deferred_update());
        assert_eq!(engine.state(), ReconcilerState::CommittedVisible);
        assert_eq!(engine.renderer().renders, renders_before + 1);
        let result = engine.result().unwrap();
        assert_eq!((result.width, result.height), (200, 150));
    }

    #[test]
    fn test_scenario_e_reset() {
        let mut engine = ready_engine();
        set_transform(&mut engine, Transform::new(-480.0, 0.0, 0.5, 0.5));
        drag(&mut engine, 50.0, 0.0);

        engine.reset();
        assert_eq!(engine.logical_region(), None);
        assert_eq!(engine.pending_delta(), None);
        assert!(engine.result().is_none());
        assert_eq!(engine.visibility_state(), VisibilityState::OutOfBounds);
        assert_eq!(engine.state(), ReconcilerState::Idle);
    }

    #[test]
    fn test_reset_recaptures_after_settle() {
        let mut engine = ready_engine();
        engine.reset();
        assert_eq!(engine.logical_region(), None);

        // The renderer resets its own box before the deferred capture runs.
        engine.renderer_mut().displayed = Some(ViewportRect::new(100.0, 100.0, 200.0, 100.0));
        engine.settle();
        let rect = engine.logical_region().unwrap();
        assert!(rect.approx_eq(&ImageRect::new(200.0, 200.0, 400.0, 200.0), TOL));
    }

    #[test]
    fn test_clear_does_not_recapture() {
        let mut engine = ready_engine();
        engine.clear();
        engine.settle();
        assert_eq!(engine.logical_region(), None);
    }

    #[test]
    fn test_edit_commits_when_fully_visible() {
        let mut engine = ready_engine();
        drag(&mut engine, 20.0, 10.0);

        let rect = engine.logical_region().unwrap();
        assert!(rect.approx_eq(&ImageRect::new(140.0, 120.0, 200.0, 150.0), TOL));
        assert!(!engine.has_deferred_update());
        assert!(engine.result().is_some());
        assert_eq!(engine.stats().commits, 2);
    }

    #[test]
    fn test_resize_commits_new_size() {
        let mut engine = ready_engine();
        engine.on_edit_start(EditAction::Resize(Handle::E));
        engine.renderer_mut().displayed = Some(ViewportRect::new(50.0, 50.0, 150.0, 75.0));
        engine.on_edit_end();
        let rect = engine.logical_region().unwrap();
        assert!(rect.approx_eq(&ImageRect::new(100.0, 100.0, 300.0, 150.0), TOL));
    }

    #[test]
    fn test_partial_edit_does_not_ratchet_size() {
        let mut engine = ready_engine();
        // Half the box hangs off the left edge; the display shows the clipped part.
        set_transform(&mut engine, Transform::new(-100.0, 0.0, 0.5, 0.5));
        assert_eq!(engine.visibility_state(), VisibilityState::PartiallyVisible);
        let shown = engine.renderer().displayed.unwrap();
        assert!((shown.width - 50.0).abs() < TOL);

        // Move the clipped box right without resizing it.
        drag(&mut engine, 10.0, 0.0);
        let rect = engine.logical_region().unwrap();
        assert!((rect.width - 200.0).abs() < TOL);
        assert!((rect.x - 120.0).abs() < TOL);
        assert!(engine.has_deferred_update());
    }

    #[test]
    fn test_transform_change_ignored_while_editing() {
        let mut engine = ready_engine();
        engine.on_edit_start(EditAction::All);
        let shown = engine.renderer().displayed;
        set_transform(&mut engine, Transform::new(-480.0, 0.0, 0.5, 0.5));
        assert_eq!(engine.renderer().displayed, shown);
        assert!(matches!(engine.state(), ReconcilerState::Editing { .. }));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut engine = ready_engine();
        set_transform(&mut engine, Transform::new(-60.0, 10.0, 0.75, 0.75));
        let first = engine.renderer().displayed;
        engine.on_transform_changed();
        assert_eq!(engine.renderer().displayed, first);
    }

    #[test]
    fn test_invalid_transform_keeps_display() {
        let mut engine = ready_engine();
        let shown = engine.renderer().displayed;
        set_transform(&mut engine, Transform::new(0.0, 0.0, 0.0, 0.5));
        assert_eq!(engine.renderer().displayed, shown);
        assert_eq!(engine.logical_region(), Some(region()));
        assert_eq!(engine.stats().rejected_updates, 1);
    }

    #[test]
    fn test_edit_with_invalid_transform_is_ignored() {
        let mut engine = ready_engine();
        engine.renderer_mut().transform = Transform::new(0.0, 0.0, f64::NAN, 0.5);
        engine.on_edit_start(EditAction::All);
        assert_eq!(engine.state(), ReconcilerState::CommittedVisible);
        engine.on_edit_end();
        assert_eq!(engine.logical_region(), Some(region()));
    }

    #[test]
    fn test_runaway_delta_rejected() {
        let mut engine = ready_engine();
        set_transform(&mut engine, Transform::new(-480.0, 0.0, 0.5, 0.5));

        // Shrinking the off-screen indicator would make the width negative.
        engine.on_edit_start(EditAction::Resize(Handle::W));
        engine.renderer_mut().displayed = Some(ViewportRect::new(0.0, 50.0, -150.0, 0.0));
        engine.on_edit_end();

        assert!(!engine.has_deferred_update());
        assert_eq!(engine.logical_region(), Some(region()));
        assert_eq!(engine.stats().rejected_updates, 1);
    }

    #[test]
    fn test_pan_gesture_commits_at_end() {
        let mut engine = ready_engine();
        set_transform(&mut engine, Transform::new(-480.0, 0.0, 0.5, 0.5));
        drag(&mut engine, 50.0, 0.0);

        engine.on_edit_start(EditAction::Move);
        assert!(matches!(engine.state(), ReconcilerState::Panning { .. }));
        engine.renderer_mut().transform = Transform::new(-200.0, 0.0, 0.5, 0.5);
        engine.on_edit_move();
        // Still partially off screen at this point.
        engine.settle();
        assert!(engine.has_deferred_update());

        engine.renderer_mut().transform = Transform::new(0.0, 0.0, 0.5, 0.5);
        engine.on_edit_end();
        assert!(!engine.has_deferred_update());
        assert!((engine.committed_region().unwrap().x - 200.0).abs() < TOL);
    }

    #[test]
    fn test_pan_end_stays_deferred_when_not_visible() {
        let mut engine = ready_engine();
        set_transform(&mut engine, Transform::new(-480.0, 0.0, 0.5, 0.5));
        drag(&mut engine, 50.0, 0.0);

        engine.on_pan_start();
        engine.renderer_mut().transform = Transform::new(-300.0, 0.0, 0.5, 0.5);
        engine.on_pan_end();
        assert_eq!(engine.state(), ReconcilerState::DeferredPartialEdit);
        assert!(engine.has_deferred_update());
    }

    #[test]
    fn test_stale_deferred_reconcile_discarded() {
        let mut engine = ready_engine();
        engine.on_pan_start();
        engine.renderer_mut().transform = Transform::new(-480.0, 0.0, 0.5, 0.5);
        engine.on_pan_move();
        engine.on_pan_end();

        // A new edit session supersedes the pan's queued reconcile.
        engine.on_edit_start(EditAction::All);
        let shown = engine.renderer().displayed;
        engine.settle();
        assert_eq!(engine.renderer().displayed, shown);
        assert_eq!(engine.stats().stale_tasks, 1);
    }

    #[test]
    fn test_new_box_drawn_without_region() {
        let mut engine = CropEngine::new(renderer());
        engine.on_ready();
        assert_eq!(engine.logical_region(), None);

        engine.on_edit_start(EditAction::Crop);
        engine.renderer_mut().displayed = Some(ViewportRect::new(10.0, 10.0, 100.0, 100.0));
        engine.on_edit_end();
        let rect = engine.logical_region().unwrap();
        assert!(rect.approx_eq(&ImageRect::new(20.0, 20.0, 200.0, 200.0), TOL));
        assert!(engine.result().is_some());
    }

    #[test]
    fn test_box_drawn_while_region_off_screen_replaces_it() {
        let mut engine = ready_engine();
        set_transform(&mut engine, Transform::new(-480.0, 0.0, 0.5, 0.5));
        assert_eq!(engine.visibility_state(), VisibilityState::OutOfBounds);

        engine.on_edit_start(EditAction::Crop);
        engine.renderer_mut().displayed = Some(ViewportRect::new(10.0, 60.0, 100.0, 75.0));
        engine.on_edit_end();

        let rect = engine.committed_region().unwrap();
        assert!(rect.approx_eq(&ImageRect::new(980.0, 120.0, 200.0, 150.0), TOL));
        assert_eq!(engine.logical_region(), engine.committed_region());
        assert!(!engine.has_deferred_update());
        assert_eq!(engine.visibility_state(), VisibilityState::FullyVisible);
        assert_eq!(engine.state(), ReconcilerState::CommittedVisible);

        // Panning home leaves the drawn region alone.
        set_transform(&mut engine, Transform::new(0.0, 0.0, 0.5, 0.5));
        let rect = engine.committed_region().unwrap();
        assert!(rect.approx_eq(&ImageRect::new(980.0, 120.0, 200.0, 150.0), TOL));
    }

    #[test]
    fn test_box_drawn_discards_pending_delta() {
        let mut engine = ready_engine();
        set_transform(&mut engine, Transform::new(-480.0, 0.0, 0.5, 0.5));
        drag(&mut engine, 50.0, 0.0);
        assert!(engine.has_deferred_update());

        engine.on_edit_start(EditAction::Crop);
        engine.renderer_mut().displayed = Some(ViewportRect::new(100.0, 100.0, 50.0, 50.0));
        engine.on_edit_end();

        let rect = engine.logical_region().unwrap();
        assert!(rect.approx_eq(&ImageRect::new(1160.0, 200.0, 100.0, 100.0), TOL));
        assert_eq!(engine.pending_delta(), None);
    }

    #[test]
    fn test_box_drawn_partly_off_screen_rejected() {
        let mut engine = ready_engine();
        engine.on_edit_start(EditAction::Crop);
        engine.renderer_mut().displayed = Some(ViewportRect::new(450.0, 50.0, 100.0, 75.0));
        engine.on_edit_end();

        assert_eq!(engine.logical_region(), Some(region()));
        assert!(!engine.has_deferred_update());
        assert_eq!(engine.stats().rejected_updates, 1);
        assert_eq!(engine.state(), ReconcilerState::CommittedVisible);
    }

    #[test]
    fn test_ready_with_region_does_not_capture_clipped_display() {
        let mut engine = ready_engine();
        set_transform(&mut engine, Transform::new(-100.0, 0.0, 0.5, 0.5));
        let shown = engine.renderer().displayed.unwrap();
        assert!(shown.approx_eq(&ViewportRect::new(0.0, 50.0, 50.0, 75.0), TOL));

        engine.on_ready();
        assert_eq!(engine.logical_region(), Some(region()));
        assert_eq!(engine.visibility_state(), VisibilityState::PartiallyVisible);
        assert_eq!(engine.stats().commits, 1);
    }

    #[test]
    fn test_ready_with_clipped_display_and_no_region() {
        let mut r = renderer();
        r.displayed = Some(ViewportRect::new(-20.0, 50.0, 100.0, 75.0));
        let mut engine = CropEngine::new(r);
        engine.on_ready();

        assert_eq!(engine.logical_region(), None);
        assert_eq!(engine.state(), ReconcilerState::Idle);
        assert_eq!(engine.visibility_state(), VisibilityState::OutOfBounds);
    }

    #[test]
    fn test_state_follows_visibility() {
        let mut engine = ready_engine();
        assert_eq!(engine.state(), ReconcilerState::CommittedVisible);

        set_transform(&mut engine, Transform::new(-100.0, 0.0, 0.5, 0.5));
        assert_eq!(engine.visibility_state(), VisibilityState::PartiallyVisible);
        assert_eq!(engine.state(), ReconcilerState::CommittedHidden);

        set_transform(&mut engine, Transform::new(-480.0, 0.0, 0.5, 0.5));
        assert_eq!(engine.visibility_state(), VisibilityState::OutOfBounds);
        assert_eq!(engine.state(), ReconcilerState::CommittedHidden);

        set_transform(&mut engine, Transform::new(0.0, 0.0, 0.5, 0.5));
        assert_eq!(engine.state(), ReconcilerState::CommittedVisible);
    }

    #[test]
    fn test_pan_keeps_state_until_end() {
        let mut engine = ready_engine();
        set_transform(&mut engine, Transform::new(-480.0, 0.0, 0.5, 0.5));
        drag(&mut engine, 50.0, 0.0);

        engine.on_pan_start();
        engine.renderer_mut().transform = Transform::new(0.0, 0.0, 0.5, 0.5);
        engine.on_pan_move();
        engine.settle();
        // The queued reconcile committed, but the gesture is still running.
        assert!(!engine.has_deferred_update());
        assert!(matches!(engine.state(), ReconcilerState::Panning { .. }));

        engine.on_pan_end();
        assert_eq!(engine.state(), ReconcilerState::CommittedVisible);
    }

    #[test]
    fn test_result_falls_back_to_display() {
        let mut r = renderer();
        r.source = None;
        r.displayed = Some(ViewportRect::new(50.0, 50.0, 100.0, 75.0));
        let mut engine = CropEngine::new(r);
        engine.on_ready();
        assert!(engine.result().is_none());

        engine.renderer_mut().set_source(PixelBuffer::new(1000, 800, vec![1u8; 1000 * 800 * 3]));
        let pixels = engine.result().unwrap();
        assert_eq!((pixels.width, pixels.height), (200, 150));
    }

    #[test]
    fn test_zoom_limits() {
        let mut engine = ready_engine();
        assert!(engine.on_zoom(1.5));
        assert!(!engine.on_zoom(3.5));
        assert!(!engine.on_zoom(0.05));
        assert_eq!(engine.stats().rejected_zooms, 2);
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let mut config = EngineConfig::default();
        config.max_zoom = -1.0;
        assert!(CropEngine::with_config(renderer(), config).is_err());
    }

    #[test]
    fn test_handle_dispatch() {
        let mut r = renderer();
        r.displayed = Some(ViewportRect::new(50.0, 50.0, 100.0, 75.0));
        let mut engine = CropEngine::new(r);
        engine.handle(CropEvent::Ready);
        engine.renderer_mut().transform = Transform::new(-480.0, 0.0, 0.5, 0.5);
        engine.handle(CropEvent::TransformChanged);
        engine.handle(CropEvent::EditStart(EditAction::All));
        engine.renderer_mut().displayed = Some(ViewportRect::new(50.0, 50.0, 0.0, 0.0));
        engine.handle(CropEvent::EditEnd);
        assert!(engine.has_deferred_update());
        let data = engine.crop_data().unwrap();
        assert!(data.pending);
        assert!((data.x - 200.0).abs() < TOL);
    }

    /// Renderer that refuses boxes narrower than 60 units.
    struct MinWidthRenderer(ViewRenderer);

    impl CropRenderer for MinWidthRenderer {
        fn transform(&self) -> Transform {
            self.0.transform()
        }
        fn viewport_bounds(&self) -> ViewportBounds {
            self.0.viewport_bounds()
        }
        fn image_size(&self) -> ImageSize {
            self.0.image_size()
        }
        fn displayed_selection(&self) -> Option<ViewportRect> {
            self.0.displayed_selection()
        }
        fn set_displayed_selection(&mut self, rect: ViewportRect) {
            let width = rect.width.max(60.0);
            self.0
                .set_displayed_selection(ViewportRect::new(rect.x, rect.y, width, rect.height));
        }
        fn render_pixels(&mut self, region: &ImageRect) -> Option<PixelBuffer> {
            self.0.render_pixels(region)
        }
    }

    #[test_log::test]
    fn test_constrained_display_detected() {
        let mut r = renderer();
        r.displayed = Some(ViewportRect::new(50.0, 50.0, 100.0, 75.0));
        let mut engine = CropEngine::new(MinWidthRenderer(r));
        engine.on_ready();
        assert_eq!(engine.stats().constrained_updates, 0);

        engine.renderer_mut().0.transform = Transform::new(0.0, 0.0, 0.25, 0.25);
        engine.on_transform_changed();
        assert_eq!(engine.stats().constrained_updates, 1);
        // The logical region keeps its own size.
        assert_eq!(engine.logical_region(), Some(region()));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
