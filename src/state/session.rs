//! The drawing session: owns the live document and decides when it is
//! persisted, restored, discarded or exported.
//!
//! A `Session` lives on the UI thread. Commands that need I/O hand the work to
//! the persistence gateway or the export compositor and keep a single
//! outstanding operation; its result is picked up by [`Session::poll`] and
//! applied in one step, together with every flag that depends on it.
//!
//! # Transitions
//!
//! - `activate`: Initial → Active, optionally probing for a paused drawing
//!   and offering to resume it
//! - `dismiss`: Terminated at once when nothing changed, otherwise a
//!   destructive confirmation first
//! - `pause`: saves, then clears the canvas (only when modified and non-empty)
//! - `restore`: loads the saved drawing onto the canvas
//! - `trash`: clears the canvas without touching the saved file
//! - `export_requested` / `choose_export`: flatten and write to the album
//!
//! Busy is held for at least `min_busy_secs` after `pause`, `restore` or an
//! export starts, even if the work finished sooner. While an operation is
//! outstanding, further I/O commands are refused with
//! [`SessionError::OperationInFlight`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sketch_session::export::{DirectoryPhotoLibrary, ExportCompositor};
//! use sketch_session::state::{PersistenceGateway, Session, SessionConfig};
//!
//! let store = Arc::new(PersistenceGateway::new("drawing.data").unwrap());
//! let library = Arc::new(DirectoryPhotoLibrary::new("album"));
//! let compositor = Arc::new(ExportCompositor::new(library).unwrap());
//!
//! let mut session = Session::new(SessionConfig::default(), store, compositor);
//! session.activate().unwrap();
//! // every frame:
//! session.poll();
//! ```
use std::sync::Arc;

use egui::Vec2;
use futures::FutureExt;
use futures::future::BoxFuture;
use image::RgbaImage;

use super::persistence::DocumentStore;
use super::prompt::{Confirmation, ErrorPrompt, ExportChoice, Toast};
use crate::document::DrawingDocument;
use crate::error::{ExportError, PersistenceResult, SessionError};
use crate::export::{ExportCompositor, ExportJob};
use crate::util::time::{Clock, SystemClock};

/// Tunables for a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Minimum time the busy projection stays up for pause, restore and export
    pub min_busy_secs: f64,
    /// How long the "saved" toast stays up without a tap
    pub toast_timeout_secs: f64,
    /// Look for a paused drawing on activation and offer to resume it
    pub offer_restore_on_activate: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_busy_secs: 0.5,
            toast_timeout_secs: 5.0,
            offer_restore_on_activate: true,
        }
    }
}

/// The projected state of the session, for the presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initial,
    Active,
    AwaitingConfirmation,
    Busy,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Initial,
    Active,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Pause,
    Restore,
    Probe,
    Export,
}

impl Operation {
    // The activation probe runs silently
    fn shows_progress(self) -> bool {
        !matches!(self, Self::Probe)
    }
}

enum Outcome {
    Saved(PersistenceResult<()>),
    Loaded(PersistenceResult<DrawingDocument>),
    Probed(PersistenceResult<DrawingDocument>),
    Exported(Result<(), ExportError>),
}

struct InFlight {
    operation: Operation,
    started_at: f64,
    future: BoxFuture<'static, Outcome>,
    outcome: Option<Outcome>,
}

impl InFlight {
    fn check(&mut self) {
        if self.outcome.is_none() {
            self.outcome = (&mut self.future).now_or_never();
        }
    }

    fn ready_at(&self, now: f64, min_busy_secs: f64) -> bool {
        self.outcome.is_some()
            && (!self.operation.shows_progress() || now - self.started_at >= min_busy_secs)
    }
}

pub struct Session {
    config: SessionConfig,
    store: Arc<dyn DocumentStore>,
    compositor: Arc<ExportCompositor>,
    clock: Arc<dyn Clock>,

    mode: Mode,
    document: DrawingDocument,
    modified: bool,
    generation: u64,
    tools_visible: bool,

    background: Option<Arc<RgbaImage>>,
    canvas_size: Vec2,
    pixels_per_point: f32,

    in_flight: Option<InFlight>,
    confirmation: Option<Confirmation>,
    restore_offer: Option<DrawingDocument>,
    error: Option<ErrorPrompt>,
    toast: Option<Toast>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("phase", &self.phase())
            .field("strokes", &self.document.len())
            .field("modified", &self.modified)
            .field("generation", &self.generation)
            .field("in_flight", &self.in_flight.as_ref().map(|op| op.operation))
            .field("confirmation", &self.confirmation)
            .field("error", &self.error)
            .field("toast", &self.toast)
            .finish()
    }
}

impl Session {
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn DocumentStore>,
        compositor: Arc<ExportCompositor>,
    ) -> Self {
        Self {
            config,
            store,
            compositor,
            clock: Arc::new(SystemClock::new()),
            mode: Mode::Initial,
            document: DrawingDocument::new(),
            modified: false,
            generation: 0,
            tools_visible: false,
            background: None,
            canvas_size: Vec2::ZERO,
            pixels_per_point: 1.0,
            in_flight: None,
            confirmation: None,
            restore_offer: None,
            error: None,
            toast: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_background(mut self, background: Arc<RgbaImage>) -> Self {
        self.background = Some(background);
        self
    }

    /// Records the canvas size (logical points) and scale used for exports.
    pub fn set_canvas_geometry(&mut self, canvas_size: Vec2, pixels_per_point: f32) {
        self.canvas_size = canvas_size;
        self.pixels_per_point = pixels_per_point;
    }

    // ---- projections ----

    pub fn phase(&self) -> Phase {
        match self.mode {
            Mode::Terminated => Phase::Terminated,
            _ if self.is_busy() => Phase::Busy,
            _ if self.confirmation.is_some() => Phase::AwaitingConfirmation,
            Mode::Initial => Phase::Initial,
            Mode::Active => Phase::Active,
        }
    }

    pub fn document(&self) -> &DrawingDocument {
        &self.document
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|op| op.operation.shows_progress())
    }

    pub fn is_terminated(&self) -> bool {
        self.mode == Mode::Terminated
    }

    /// True while any operation, including the silent activation probe, is outstanding.
    pub fn has_pending_operation(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Bumped every time the session replaces the whole document.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tools_visible(&self) -> bool {
        self.tools_visible
    }

    pub fn background(&self) -> Option<&Arc<RgbaImage>> {
        self.background.as_ref()
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorPrompt> {
        self.error.as_ref()
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    // ---- commands ----

    pub fn activate(&mut self) -> Result<(), SessionError> {
        match self.mode {
            Mode::Terminated => return Err(SessionError::Terminated),
            Mode::Active => return Ok(()),
            Mode::Initial => {}
        }

        self.mode = Mode::Active;
        log::info!("Drawing session activated");

        if self.config.offer_restore_on_activate {
            let probe = self.store.load().map(Outcome::Probed).boxed();
            self.start(Operation::Probe, probe);
        }
        Ok(())
    }

    pub fn dismiss(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;

        if self.modified {
            self.raise_confirmation(Confirmation::discard());
        } else {
            self.terminate();
        }
        Ok(())
    }

    /// Saves the drawing and clears the canvas. Does nothing unless the
    /// drawing has unsaved strokes.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;

        if !self.modified || self.document.is_empty() {
            log::debug!("Nothing to pause");
            return Ok(());
        }
        self.ensure_idle()?;

        let save = self
            .store
            .save(self.document.clone())
            .map(Outcome::Saved)
            .boxed();
        self.start(Operation::Pause, save);
        Ok(())
    }

    pub fn restore(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.ensure_idle()?;

        let load = self.store.load().map(Outcome::Loaded).boxed();
        self.start(Operation::Restore, load);
        Ok(())
    }

    /// Empties the canvas. The saved file is left alone.
    pub fn trash(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;

        self.replace_document(DrawingDocument::new());
        self.modified = false;
        Ok(())
    }

    pub fn toggle_tool_visibility(&mut self) {
        self.tools_visible = !self.tools_visible;
    }

    /// The canvas changed its strokes.
    pub fn stroke_changed(&mut self) {
        self.modified = true;
    }

    /// Applies a canvas edit to the document and marks it modified.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut DrawingDocument) -> R) -> R {
        let result = f(&mut self.document);
        self.stroke_changed();
        result
    }

    pub fn export_requested(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.raise_confirmation(Confirmation::export());
        Ok(())
    }

    /// Answers the export prompt. Ignored when no export prompt is up.
    pub fn choose_export(&mut self, choice: ExportChoice) -> Result<(), SessionError> {
        self.ensure_live()?;
        if !matches!(self.confirmation, Some(Confirmation::Export(_))) {
            log::debug!("Export choice {:?} without a prompt", choice);
            return Ok(());
        }

        let Some(layers) = choice.layers() else {
            self.confirmation = None;
            return Ok(());
        };
        self.ensure_idle()?;
        self.confirmation = None;

        let job = ExportJob {
            layers,
            document: self.document.clone(),
            background: self.background.clone(),
            canvas_size: self.canvas_size,
            pixels_per_point: self.pixels_per_point,
        };
        let export = self.compositor.export(job).map(Outcome::Exported).boxed();
        self.start(Operation::Export, export);
        Ok(())
    }

    pub fn help(&mut self) {
        self.error = Some(ErrorPrompt::not_implemented());
    }

    /// Answers a yes/no confirmation. Declining also cancels an export prompt.
    pub fn respond_confirmation(&mut self, accept: bool) {
        let Some(confirmation) = self.confirmation.take() else {
            return;
        };

        match confirmation {
            Confirmation::Discard(_) if accept => self.terminate(),
            Confirmation::Restore(_) => {
                let offered = self.restore_offer.take();
                if let (true, Some(document)) = (accept, offered) {
                    log::info!("Resuming paused drawing with {} strokes", document.len());
                    self.replace_document(document);
                    self.modified = false;
                }
            }
            Confirmation::Export(_) if accept => {
                // Needs a concrete choice
                self.confirmation = Some(confirmation);
            }
            _ => {}
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn tap_toast(&mut self) {
        self.toast = None;
    }

    // ---- driving ----

    pub fn poll(&mut self) {
        let now = self.clock.now();
        self.poll_at(now);
    }

    /// Picks up a finished operation and expires the toast, as of `now`.
    pub fn poll_at(&mut self, now: f64) {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| now - toast.shown_at >= self.config.toast_timeout_secs)
        {
            self.toast = None;
        }

        let ready = match self.in_flight.as_mut() {
            Some(op) => {
                op.check();
                op.ready_at(now, self.config.min_busy_secs)
            }
            None => false,
        };
        if !ready {
            return;
        }

        if let Some(InFlight {
            outcome: Some(outcome),
            ..
        }) = self.in_flight.take()
        {
            self.apply(outcome, now);
        }
    }

    /// Blocks until the outstanding operation has produced its result, then polls.
    ///
    /// Busy may still be held afterwards if the minimum busy time has not passed.
    pub fn settle(&mut self) {
        if let Some(op) = self.in_flight.as_mut() {
            if op.outcome.is_none() {
                op.outcome = Some(futures::executor::block_on(&mut op.future));
            }
        }
        self.poll();
    }

    // ---- internals ----

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.mode == Mode::Terminated {
            return Err(SessionError::Terminated);
        }
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        match &self.in_flight {
            Some(op) => {
                log::warn!("Refusing new operation while {:?} is outstanding", op.operation);
                Err(SessionError::OperationInFlight)
            }
            None => Ok(()),
        }
    }

    fn start(&mut self, operation: Operation, future: BoxFuture<'static, Outcome>) {
        log::debug!("Starting {:?}", operation);
        self.in_flight = Some(InFlight {
            operation,
            started_at: self.clock.now(),
            future,
            outcome: None,
        });
    }

    fn raise_confirmation(&mut self, confirmation: Confirmation) {
        self.restore_offer = None;
        self.confirmation = Some(confirmation);
    }

    fn replace_document(&mut self, document: DrawingDocument) {
        self.document = document;
        self.generation += 1;
    }

    fn terminate(&mut self) {
        if let Some(op) = self.in_flight.take() {
            log::info!("Leaving session with {:?} still outstanding", op.operation);
        }
        self.mode = Mode::Terminated;
        self.confirmation = None;
        self.restore_offer = None;
        self.error = None;
        self.toast = None;
        log::info!("Drawing session closed");
    }

    fn apply(&mut self, outcome: Outcome, now: f64) {
        match outcome {
            Outcome::Saved(Ok(())) => {
                log::info!("Paused drawing with {} strokes", self.document.len());
                self.replace_document(DrawingDocument::new());
                self.modified = false;
            }
            Outcome::Saved(Err(err)) => {
                self.error = Some(ErrorPrompt::new(err.to_string()));
            }
            Outcome::Loaded(Ok(document)) => {
                log::info!("Restored drawing with {} strokes", document.len());
                self.replace_document(document);
                self.modified = false;
            }
            Outcome::Loaded(Err(err)) => {
                self.error = Some(ErrorPrompt::load_failed(&err));
            }
            Outcome::Probed(Ok(document)) => {
                if document.is_empty() {
                    return;
                }
                if self.confirmation.is_some() {
                    log::debug!("Skipping resume offer, another prompt is up");
                    return;
                }
                // Resuming would replace strokes drawn since activation
                if self.modified || !self.document.is_empty() {
                    log::info!(
                        "Skipping resume offer, {} strokes drawn since activation",
                        self.document.len()
                    );
                    return;
                }
                self.confirmation = Some(Confirmation::restore(document.len()));
                self.restore_offer = Some(document);
            }
            Outcome::Probed(Err(err)) => {
                log::warn!("Could not check for a paused drawing: {}", err);
            }
            Outcome::Exported(Ok(())) => {
                self.toast = Some(Toast {
                    message: Toast::SAVE_COMPLETE.to_owned(),
                    shown_at: now,
                });
            }
            Outcome::Exported(Err(err)) => {
                self.error = Some(ErrorPrompt::new(err.to_string()));
            }
        }
    }
}
