use std::sync::Arc;
use std::time::Duration;

use eframe::egui;

use crate::backdrop::load_backdrop;
use crate::canvas::Canvas;
use crate::error::StartupError;
use crate::export::{DirectoryPhotoLibrary, ExportCompositor};
use crate::panels::{ToolbarAction, prompts, toolbar, tools_panel};
use crate::settings::AppSettings;
use crate::state::{PersistenceGateway, Session};

/// Keeps frames coming while background work or a toast is pending.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// We derive Deserialize/Serialize so we can persist app settings on shutdown.
#[derive(serde::Deserialize, serde::Serialize, Debug, Default)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct SketchApp {
    settings: AppSettings,
    // One drawing surface at a time; gone when the user returns to the top screen
    #[serde(skip)]
    surface: Option<DrawingSurface>,
    #[serde(skip)]
    home_error: Option<String>,
}

impl SketchApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        if let Some(storage) = cc.storage {
            return eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default();
        }
        Default::default()
    }

    fn open_drawing(&mut self, ctx: &egui::Context) {
        match DrawingSurface::open(&self.settings, ctx) {
            Ok(surface) => {
                self.surface = Some(surface);
                self.home_error = None;
            }
            Err(err) => {
                log::error!("Could not open the drawing surface: {}", err);
                self.home_error = Some(err.to_string());
            }
        }
    }

    fn home(&mut self, ctx: &egui::Context) {
        let mut draw = false;
        egui::TopBottomPanel::top("home_toolbar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                draw = ui.button("Draw").clicked();
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(60.0);
                ui.heading("Sketch Session");
                ui.add_space(12.0);
                ui.label("Press Draw to start sketching over the backdrop.");
                ui.label(format!("Paused drawings are kept in {}", self.settings.save_path.display()));
                if let Some(err) = &self.home_error {
                    ui.add_space(12.0);
                    ui.colored_label(egui::Color32::RED, err);
                }
            });
        });

        if draw {
            self.open_drawing(ctx);
        }
    }
}

impl eframe::App for SketchApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let Some(surface) = self.surface.as_mut() else {
            self.home(ctx);
            return;
        };

        surface.update(ctx);
        self.settings.pen_color = surface.canvas.color();
        self.settings.pen_thickness = surface.canvas.thickness();

        if surface.session.is_terminated() {
            self.surface = None;
            ctx.request_repaint();
        }
    }
}

/// The drawing screen: one session plus the canvas bound to it.
#[derive(Debug)]
struct DrawingSurface {
    session: Session,
    canvas: Canvas,
}

impl DrawingSurface {
    fn open(settings: &AppSettings, ctx: &egui::Context) -> Result<Self, StartupError> {
        let store = PersistenceGateway::new(&settings.save_path)?;
        let library = DirectoryPhotoLibrary::new(&settings.album_dir);
        let compositor = ExportCompositor::new(Arc::new(library))?;

        let screen = ctx.screen_rect().size() * ctx.pixels_per_point();
        let backdrop = load_backdrop(
            settings.background_path.as_deref(),
            [screen.x as u32, screen.y as u32],
        );

        let mut session = Session::new(
            settings.session_config(),
            Arc::new(store),
            Arc::new(compositor),
        )
        .with_background(Arc::new(backdrop));
        session.activate()?;

        Ok(Self {
            session,
            canvas: Canvas::new(settings.pen_color, settings.pen_thickness),
        })
    }

    fn update(&mut self, ctx: &egui::Context) {
        self.session.poll();

        if let Some(action) = toolbar(ctx, &self.session, &self.canvas) {
            self.dispatch(action);
        }

        if self.session.tools_visible() {
            tools_panel(ctx, &mut self.canvas);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.canvas.show(ui, &mut self.session));

        prompts(ctx, &mut self.session);

        if self.session.has_pending_operation() || self.session.toast().is_some() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }

    fn dispatch(&mut self, action: ToolbarAction) {
        let result = match action {
            ToolbarAction::Dismiss => self.session.dismiss(),
            ToolbarAction::ToggleTools => {
                self.session.toggle_tool_visibility();
                Ok(())
            }
            ToolbarAction::SaveToAlbum => self.session.export_requested(),
            ToolbarAction::Restore => self.session.restore(),
            ToolbarAction::Pause => self.session.pause(),
            ToolbarAction::Undo => {
                self.canvas.undo(&mut self.session);
                Ok(())
            }
            ToolbarAction::Redo => {
                self.canvas.redo(&mut self.session);
                Ok(())
            }
            ToolbarAction::Trash => self.session.trash(),
            ToolbarAction::Help => {
                self.session.help();
                Ok(())
            }
        };

        if let Err(err) = result {
            log::warn!("{:?} refused: {}", action, err);
        }
    }
}
