use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use egui::{Color32, Pos2, vec2};
use futures::future::{self, BoxFuture, FutureExt};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use sketch_session::error::PersistenceResult;
use sketch_session::export::{ExportCompositor, PhotoLibrary, WriteCompletion};
use sketch_session::state::{
    Confirmation, DocumentStore, ExportChoice, Phase, Session, SessionConfig, Toast,
};
use sketch_session::util::time::ManualClock;
use sketch_session::{DrawingDocument, ExportError, PersistenceError, SessionError, Stroke};

// Store that answers immediately and counts every call
#[derive(Default)]
struct FakeStore {
    saved: Mutex<Option<DrawingDocument>>,
    saves: AtomicUsize,
    loads: AtomicUsize,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
}

impl FakeStore {
    fn with_saved(document: DrawingDocument) -> Self {
        let store = Self::default();
        *store.saved.lock() = Some(document);
        store
    }

    fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn saved(&self) -> Option<DrawingDocument> {
        self.saved.lock().clone()
    }
}

impl DocumentStore for FakeStore {
    fn load(&self) -> BoxFuture<'static, PersistenceResult<DrawingDocument>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_loads.load(Ordering::SeqCst) {
            Err(PersistenceError::Read {
                path: "fake.data".into(),
                source: io::Error::new(io::ErrorKind::Other, "disk unplugged"),
            })
        } else {
            Ok(self.saved().unwrap_or_default())
        };
        future::ready(result).boxed()
    }

    fn save(&self, document: DrawingDocument) -> BoxFuture<'static, PersistenceResult<()>> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_saves.load(Ordering::SeqCst) {
            Err(PersistenceError::Write {
                path: "fake.data".into(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only volume"),
            })
        } else {
            *self.saved.lock() = Some(document);
            Ok(())
        };
        future::ready(result).boxed()
    }
}

#[derive(Default)]
struct RecordingLibrary {
    images: Mutex<Vec<RgbaImage>>,
    failure: Option<String>,
}

impl PhotoLibrary for RecordingLibrary {
    fn write_image(&self, image: RgbaImage, on_complete: WriteCompletion) {
        match &self.failure {
            Some(message) => on_complete(Err(ExportError::Library(message.clone()))),
            None => {
                self.images.lock().push(image);
                on_complete(Ok(()));
            }
        }
    }
}

struct Harness {
    session: Session,
    store: Arc<FakeStore>,
    library: Arc<RecordingLibrary>,
    clock: ManualClock,
}

impl Harness {
    fn new(store: FakeStore, library: RecordingLibrary, config: SessionConfig) -> Self {
        let store = Arc::new(store);
        let library = Arc::new(library);
        let clock = ManualClock::new(100.0);
        let compositor = Arc::new(ExportCompositor::new(library.clone()).unwrap());
        let background = RgbaImage::from_pixel(40, 30, Rgba([0, 255, 0, 255]));

        let session = Session::new(config, store.clone(), compositor)
            .with_clock(Arc::new(clock.clone()))
            .with_background(Arc::new(background));

        Self {
            session,
            store,
            library,
            clock,
        }
    }

    /// Activated session without the resume probe
    fn active(store: FakeStore) -> Self {
        let mut harness = Self::new(store, RecordingLibrary::default(), quiet_config());
        harness.session.activate().unwrap();
        harness
    }

    fn draw(&mut self, count: usize) {
        for i in 0..count {
            self.session.edit(|document| document.add_stroke(stroke(i)));
        }
    }

    /// Waits for the outstanding operation and lets the minimum busy time pass.
    fn finish(&mut self) {
        self.session.settle();
        self.clock.advance(1.0);
        self.session.poll();
    }

    fn exported(&self) -> usize {
        self.library.images.lock().len()
    }
}

fn quiet_config() -> SessionConfig {
    SessionConfig {
        offer_restore_on_activate: false,
        ..SessionConfig::default()
    }
}

fn stroke(i: usize) -> Stroke {
    let y = 5.0 + i as f32 * 3.0;
    Stroke::new(Color32::RED, 4.0, vec![Pos2::new(2.0, y), Pos2::new(18.0, y)])
}

fn document(count: usize) -> DrawingDocument {
    DrawingDocument::from_strokes((0..count).map(stroke).collect())
}

// ---- dismiss ----

#[test]
fn dismiss_without_changes_terminates_without_io() {
    let mut h = Harness::active(FakeStore::default());

    h.session.dismiss().unwrap();

    assert_eq!(h.session.phase(), Phase::Terminated);
    assert!(h.session.confirmation().is_none());
    assert_eq!(h.store.saves() + h.store.loads(), 0);
}

#[test]
fn dismiss_after_restore_needs_no_confirmation() {
    let mut h = Harness::active(FakeStore::with_saved(document(2)));
    h.session.restore().unwrap();
    h.finish();
    let loads = h.store.loads();

    h.session.dismiss().unwrap();

    assert!(h.session.is_terminated());
    assert_eq!(h.store.loads(), loads);
    assert_eq!(h.store.saves(), 0);
}

#[test]
fn dismiss_with_changes_asks_for_destructive_confirmation() {
    let mut h = Harness::active(FakeStore::default());
    h.draw(1);

    h.session.dismiss().unwrap();

    assert_eq!(h.session.phase(), Phase::AwaitingConfirmation);
    match h.session.confirmation() {
        Some(Confirmation::Discard(prompt)) => {
            assert!(prompt.destructive);
            assert!(prompt.message.contains("undo and redo"));
        }
        other => panic!("expected discard prompt, got {other:?}"),
    }
}

#[test]
fn declining_discard_returns_to_active() {
    let mut h = Harness::active(FakeStore::default());
    h.draw(2);
    h.session.dismiss().unwrap();

    h.session.respond_confirmation(false);

    assert_eq!(h.session.phase(), Phase::Active);
    assert_eq!(h.session.document().len(), 2);
    assert!(h.session.is_modified());
}

#[test]
fn confirming_discard_terminates_without_saving() {
    let mut h = Harness::active(FakeStore::default());
    h.draw(2);
    h.session.dismiss().unwrap();

    h.session.respond_confirmation(true);

    assert_eq!(h.session.phase(), Phase::Terminated);
    assert_eq!(h.store.saves(), 0);
    assert!(h.store.saved().is_none());
}

#[test]
fn terminated_session_refuses_commands() {
    let mut h = Harness::active(FakeStore::default());
    h.session.dismiss().unwrap();

    assert_eq!(h.session.pause(), Err(SessionError::Terminated));
    assert_eq!(h.session.restore(), Err(SessionError::Terminated));
    assert_eq!(h.session.trash(), Err(SessionError::Terminated));
    assert_eq!(h.session.export_requested(), Err(SessionError::Terminated));
    assert_eq!(h.session.activate(), Err(SessionError::Terminated));
    assert_eq!(h.store.saves() + h.store.loads(), 0);
}

// ---- pause ----

#[test]
fn pause_saves_then_clears_the_canvas() {
    let mut h = Harness::active(FakeStore::default());
    h.draw(3);
    let generation = h.session.generation();

    h.session.pause().unwrap();
    assert!(h.session.is_busy());
    assert_eq!(h.session.phase(), Phase::Busy);

    h.finish();

    assert!(!h.session.is_busy());
    assert!(h.session.document().is_empty());
    assert!(!h.session.is_modified());
    assert!(h.session.error().is_none());
    assert_eq!(h.session.generation(), generation + 1);
    assert_eq!(h.store.saves(), 1);
    assert_eq!(h.store.saved(), Some(document(3)));
}

#[test]
fn pause_holds_busy_for_the_minimum_time() {
    let mut h = Harness::active(FakeStore::default());
    h.draw(3);

    h.session.pause().unwrap();
    h.session.settle();

    // Saved already, but the progress stays up and nothing is applied yet
    assert!(h.session.is_busy());
    assert_eq!(h.session.document().len(), 3);

    h.clock.advance(0.3);
    h.session.poll();
    assert!(h.session.is_busy());

    h.clock.advance(0.25);
    h.session.poll();
    assert!(!h.session.is_busy());
    assert!(h.session.document().is_empty());
}

#[test]
fn zero_minimum_busy_applies_on_first_poll() {
    let config = SessionConfig {
        min_busy_secs: 0.0,
        ..quiet_config()
    };
    let mut h = Harness::new(FakeStore::default(), RecordingLibrary::default(), config);
    h.session.activate().unwrap();
    h.draw(1);

    h.session.pause().unwrap();
    h.session.poll();

    assert!(!h.session.is_busy());
    assert!(h.session.document().is_empty());
}

#[test]
fn pause_on_unmodified_document_is_ignored() {
    let mut h = Harness::active(FakeStore::with_saved(document(2)));
    h.session.restore().unwrap();
    h.finish();
    assert!(!h.session.is_modified());

    h.session.pause().unwrap();

    assert!(!h.session.is_busy());
    assert!(!h.session.has_pending_operation());
    assert_eq!(h.session.document().len(), 2);
    assert_eq!(h.store.saves(), 0);
}

#[test]
fn pause_on_empty_document_is_ignored() {
    let mut h = Harness::active(FakeStore::default());
    h.session.stroke_changed();

    h.session.pause().unwrap();

    assert!(!h.session.is_busy());
    assert!(h.session.is_modified());
    assert_eq!(h.store.saves(), 0);
}

#[test]
fn failed_pause_keeps_document_and_flag() {
    let store = FakeStore::default();
    store.fail_saves.store(true, Ordering::SeqCst);
    let mut h = Harness::active(store);
    h.draw(3);

    h.session.pause().unwrap();
    h.finish();

    assert_eq!(h.session.document(), &document(3));
    assert!(h.session.is_modified());
    assert!(!h.session.is_busy());
    let error = h.session.error().expect("error prompt");
    assert!(error.message.contains("read-only volume"));
    assert_eq!(h.session.phase(), Phase::Active);
}

// ---- restore ----

#[test]
fn restore_replaces_the_document() {
    let mut h = Harness::active(FakeStore::with_saved(document(4)));
    h.draw(1);
    let generation = h.session.generation();

    h.session.restore().unwrap();
    assert!(h.session.is_busy());
    h.finish();

    assert_eq!(h.session.document(), &document(4));
    assert!(!h.session.is_modified());
    assert!(h.session.error().is_none());
    assert_eq!(h.session.generation(), generation + 1);
}

#[test]
fn failed_restore_keeps_document() {
    let store = FakeStore::default();
    store.fail_loads.store(true, Ordering::SeqCst);
    let mut h = Harness::active(store);
    h.draw(2);

    h.session.restore().unwrap();
    h.finish();

    assert_eq!(h.session.document(), &document(2));
    assert!(h.session.is_modified());
    let error = h.session.error().expect("error prompt");
    assert!(error.message.starts_with("Load error("));
    assert!(error.message.ends_with("Please try again."));
}

#[test]
fn second_operation_is_refused_while_one_is_outstanding() {
    let mut h = Harness::active(FakeStore::default());
    h.draw(3);

    h.session.pause().unwrap();
    assert_eq!(h.session.pause(), Err(SessionError::OperationInFlight));
    assert_eq!(h.session.restore(), Err(SessionError::OperationInFlight));
    assert_eq!(h.store.saves(), 1);
    assert_eq!(h.store.loads(), 0);

    h.finish();
    h.session.restore().unwrap();
    assert_eq!(h.store.loads(), 1);
}

// ---- modified flag ----

#[test]
fn modified_flag_survives_everything_but_save_restore_and_trash() {
    let mut h = Harness::active(FakeStore::default());
    h.draw(1);

    h.session.toggle_tool_visibility();
    h.session.help();
    h.session.dismiss_error();
    h.session.export_requested().unwrap();
    h.session.choose_export(ExportChoice::Cancel).unwrap();
    h.session.dismiss().unwrap();
    h.session.respond_confirmation(false);
    assert!(h.session.is_modified());

    h.session.trash().unwrap();
    assert!(!h.session.is_modified());
    assert!(h.session.document().is_empty());
}

#[test]
fn trash_leaves_the_saved_file_alone() {
    let mut h = Harness::active(FakeStore::with_saved(document(2)));
    h.draw(3);

    h.session.trash().unwrap();

    assert_eq!(h.store.saves() + h.store.loads(), 0);
    assert_eq!(h.store.saved(), Some(document(2)));
}

#[test]
fn tool_visibility_toggles() {
    let mut h = Harness::active(FakeStore::default());
    assert!(!h.session.tools_visible());
    h.session.toggle_tool_visibility();
    assert!(h.session.tools_visible());
    assert!(!h.session.is_modified());
}

// ---- export ----

#[test]
fn export_cancel_does_nothing() {
    let mut h = Harness::active(FakeStore::default());
    h.draw(1);

    h.session.export_requested().unwrap();
    assert!(matches!(h.session.confirmation(), Some(Confirmation::Export(_))));

    h.session.choose_export(ExportChoice::Cancel).unwrap();

    assert_eq!(h.session.phase(), Phase::Active);
    assert!(!h.session.has_pending_operation());
    assert_eq!(h.exported(), 0);
}

#[test]
fn declining_export_prompt_cancels_it() {
    let mut h = Harness::active(FakeStore::default());
    h.session.export_requested().unwrap();

    // A bare "yes" is not an answer to the export prompt
    h.session.respond_confirmation(true);
    assert!(h.session.confirmation().is_some());

    h.session.respond_confirmation(false);
    assert!(h.session.confirmation().is_none());
    assert_eq!(h.exported(), 0);
}

#[test]
fn strokes_only_export_shows_toast() {
    let mut h = Harness::active(FakeStore::default());
    h.session.set_canvas_geometry(vec2(20.0, 20.0), 1.0);
    h.draw(1);

    h.session.export_requested().unwrap();
    h.session.choose_export(ExportChoice::StrokesOnly).unwrap();
    assert!(h.session.is_busy());
    h.finish();

    assert!(!h.session.is_busy());
    assert!(h.session.error().is_none());
    assert_eq!(h.session.toast().map(|t| t.message.as_str()), Some(Toast::SAVE_COMPLETE));

    let images = h.library.images.lock();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].dimensions(), (20, 20));
    assert_eq!(images[0].get_pixel(10, 5).0, [255, 0, 0, 255]);
    assert_eq!(images[0].get_pixel(10, 15).0[3], 0);
}

#[test]
fn composited_export_uses_background_size() {
    let mut h = Harness::active(FakeStore::default());
    h.session.set_canvas_geometry(vec2(20.0, 15.0), 1.0);
    h.draw(1);

    h.session.export_requested().unwrap();
    h.session.choose_export(ExportChoice::Composited).unwrap();
    h.finish();

    let images = h.library.images.lock();
    assert_eq!(images.len(), 1);
    let image = &images[0];
    assert_eq!(image.dimensions(), (40, 30));
    // Stroke at y = 5pt lands at y = 10px on the 2x background
    assert_eq!(image.get_pixel(20, 10).0, [255, 0, 0, 255]);
    assert_eq!(image.get_pixel(1, 1).0, [0, 255, 0, 255]);
}

#[test]
fn export_failure_raises_error_instead_of_toast() {
    let library = RecordingLibrary {
        failure: Some("album full".to_owned()),
        ..RecordingLibrary::default()
    };
    let mut h = Harness::new(FakeStore::default(), library, quiet_config());
    h.session.activate().unwrap();
    h.session.set_canvas_geometry(vec2(10.0, 10.0), 1.0);
    h.draw(1);

    h.session.export_requested().unwrap();
    h.session.choose_export(ExportChoice::StrokesOnly).unwrap();
    h.finish();

    assert!(h.session.toast().is_none());
    assert_eq!(h.session.error().map(|e| e.message.as_str()), Some("album full"));
    assert!(!h.session.is_busy());
}

#[test]
fn toast_expires_after_timeout() {
    let mut h = Harness::active(FakeStore::default());
    h.session.set_canvas_geometry(vec2(10.0, 10.0), 1.0);
    h.draw(1);
    h.session.export_requested().unwrap();
    h.session.choose_export(ExportChoice::StrokesOnly).unwrap();
    h.finish();
    assert!(h.session.toast().is_some());

    h.clock.advance(4.9);
    h.session.poll();
    assert!(h.session.toast().is_some());

    h.clock.advance(0.2);
    h.session.poll();
    assert!(h.session.toast().is_none());
}

#[test]
fn tapping_toast_clears_it() {
    let mut h = Harness::active(FakeStore::default());
    h.session.set_canvas_geometry(vec2(10.0, 10.0), 1.0);
    h.draw(1);
    h.session.export_requested().unwrap();
    h.session.choose_export(ExportChoice::StrokesOnly).unwrap();
    h.finish();

    h.session.tap_toast();
    assert!(h.session.toast().is_none());
}

#[test]
fn export_choice_while_busy_is_refused_and_prompt_kept() {
    let mut h = Harness::active(FakeStore::default());
    h.draw(2);
    h.session.pause().unwrap();
    h.session.export_requested().unwrap();

    assert_eq!(
        h.session.choose_export(ExportChoice::StrokesOnly),
        Err(SessionError::OperationInFlight)
    );
    assert!(matches!(h.session.confirmation(), Some(Confirmation::Export(_))));

    h.finish();
    assert_eq!(h.exported(), 0);
}

// ---- activation ----

#[test]
fn activation_offers_to_resume_a_paused_drawing() {
    let mut h = Harness::new(
        FakeStore::with_saved(document(2)),
        RecordingLibrary::default(),
        SessionConfig::default(),
    );
    assert_eq!(h.session.phase(), Phase::Initial);

    h.session.activate().unwrap();
    // The probe runs without the progress overlay
    assert!(h.session.has_pending_operation());
    assert!(!h.session.is_busy());

    h.session.settle();
    match h.session.confirmation() {
        Some(Confirmation::Restore(prompt)) => {
            assert!(!prompt.destructive);
            assert!(prompt.message.contains("2 strokes"));
        }
        other => panic!("expected resume offer, got {other:?}"),
    }

    h.session.respond_confirmation(true);
    assert_eq!(h.session.document(), &document(2));
    assert!(!h.session.is_modified());
    assert_eq!(h.session.phase(), Phase::Active);
}

#[test]
fn declining_resume_keeps_the_empty_canvas() {
    let mut h = Harness::new(
        FakeStore::with_saved(document(2)),
        RecordingLibrary::default(),
        SessionConfig::default(),
    );
    h.session.activate().unwrap();
    h.session.settle();

    h.session.respond_confirmation(false);

    assert!(h.session.document().is_empty());
    assert_eq!(h.store.saved(), Some(document(2)));
}

#[test]
fn no_offer_when_nothing_was_paused() {
    let mut h = Harness::new(
        FakeStore::default(),
        RecordingLibrary::default(),
        SessionConfig::default(),
    );
    h.session.activate().unwrap();
    h.session.settle();

    assert!(h.session.confirmation().is_none());
    assert_eq!(h.store.loads(), 1);
}

#[test]
fn failed_probe_is_silent() {
    let store = FakeStore::default();
    store.fail_loads.store(true, Ordering::SeqCst);
    let mut h = Harness::new(store, RecordingLibrary::default(), SessionConfig::default());
    h.session.activate().unwrap();
    h.session.settle();

    assert!(h.session.confirmation().is_none());
    assert!(h.session.error().is_none());
}

#[test]
fn activating_twice_probes_once() {
    let mut h = Harness::new(
        FakeStore::default(),
        RecordingLibrary::default(),
        SessionConfig::default(),
    );
    h.session.activate().unwrap();
    h.session.activate().unwrap();
    h.session.settle();
    assert_eq!(h.store.loads(), 1);
}

// ---- help ----

#[test]
fn help_is_a_not_implemented_stub() {
    let mut h = Harness::active(FakeStore::default());

    h.session.help();
    let error = h.session.error().expect("error prompt");
    assert_eq!(error.message, "Sorry!!\nNot implement yet...");

    h.session.dismiss_error();
    assert!(h.session.error().is_none());
}

// ---- drawing while the activation check runs ----

#[test]
fn strokes_drawn_before_the_check_lands_suppress_the_resume_offer() {
    let mut h = Harness::new(
        FakeStore::with_saved(document(2)),
        RecordingLibrary::default(),
        SessionConfig::default(),
    );
    h.session.activate().unwrap();
    h.draw(3);

    h.session.settle();

    assert!(h.session.confirmation().is_none());
    assert_eq!(h.session.document(), &document(3));
    assert!(h.session.is_modified());

    // Nothing left to accept
    h.session.respond_confirmation(true);
    assert_eq!(h.session.document(), &document(3));
}

#[test]
fn export_choice_waits_for_the_activation_check() {
    let mut h = Harness::new(
        FakeStore::default(),
        RecordingLibrary::default(),
        SessionConfig::default(),
    );
    h.session.activate().unwrap();
    h.session.set_canvas_geometry(vec2(10.0, 10.0), 1.0);
    h.draw(1);
    h.session.export_requested().unwrap();

    assert!(h.session.has_pending_operation());
    assert_eq!(
        h.session.choose_export(ExportChoice::StrokesOnly),
        Err(SessionError::OperationInFlight)
    );
    assert!(matches!(h.session.confirmation(), Some(Confirmation::Export(_))));

    h.session.settle();
    assert!(!h.session.has_pending_operation());
    h.session.choose_export(ExportChoice::StrokesOnly).unwrap();
    h.finish();
    assert_eq!(h.exported(), 1);
}

#[test]
fn composited_export_stretches_canvas_over_background() {
    let mut h = Harness::active(FakeStore::default());
    // Wide canvas over the 40x30 background: x scales by 1, y by 3
    h.session.set_canvas_geometry(vec2(40.0, 10.0), 1.0);
    h.draw(1);

    h.session.export_requested().unwrap();
    h.session.choose_export(ExportChoice::Composited).unwrap();
    h.finish();

    let images = h.library.images.lock();
    let image = &images[0];
    assert_eq!(image.dimensions(), (40, 30));
    assert_eq!(image.get_pixel(10, 15).0, [255, 0, 0, 255]);
    assert_eq!(image.get_pixel(10, 5).0, [0, 255, 0, 255]);
}
