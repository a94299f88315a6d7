use eframe::egui;

use crate::canvas::Canvas;
use crate::components::ToolButton;
use crate::state::Session;

/// What the user pressed in the drawing toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    Dismiss,
    ToggleTools,
    SaveToAlbum,
    Restore,
    Pause,
    Undo,
    Redo,
    Trash,
    Help,
}

struct Entry {
    icon: &'static str,
    tooltip: &'static str,
    action: ToolbarAction,
    enabled: bool,
    selected: bool,
}

pub fn toolbar(ctx: &egui::Context, session: &Session, canvas: &Canvas) -> Option<ToolbarAction> {
    // Everything is off while the progress overlay is up
    let idle = !session.is_busy();
    let entry = |icon, tooltip, action, enabled| Entry {
        icon,
        tooltip,
        action,
        enabled: idle && enabled,
        selected: false,
    };

    let trailing = [
        Entry {
            selected: session.tools_visible(),
            ..entry("✏", "Show or hide tools", ToolbarAction::ToggleTools, true)
        },
        entry("📷", "Save to album", ToolbarAction::SaveToAlbum, true),
        entry("▶", "Resume the paused drawing", ToolbarAction::Restore, true),
        entry("⏸", "Pause: save and clear", ToolbarAction::Pause, true),
        entry("⟲", "Undo", ToolbarAction::Undo, canvas.can_undo()),
        entry("⟳", "Redo", ToolbarAction::Redo, canvas.can_redo()),
        entry("🗑", "Clear the canvas", ToolbarAction::Trash, true),
        entry("❓", "Help", ToolbarAction::Help, true),
    ];

    let mut pressed = None;
    egui::TopBottomPanel::top("drawing_toolbar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            let dismiss = ToolButton::new("✖", "Back to the top screen").enabled(idle);
            if dismiss.show(ui).clicked() {
                pressed = Some(ToolbarAction::Dismiss);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                for entry in trailing.iter().rev() {
                    let button = ToolButton::new(entry.icon, entry.tooltip)
                        .enabled(entry.enabled)
                        .selected(entry.selected);
                    if button.show(ui).clicked() {
                        pressed = Some(entry.action);
                    }
                }
            });
        });
    });

    if let Some(action) = pressed {
        log::debug!("Toolbar: {:?}", action);
    }
    pressed
}
