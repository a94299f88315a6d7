use eframe::egui::{self, Align2, Color32, Id, LayerId, Order};

use crate::state::{Confirmation, ExportChoice, Session};

/// Renders whatever the session is currently asking or telling the user,
/// and feeds the answers back.
pub fn prompts(ctx: &egui::Context, session: &mut Session) {
    busy_overlay(ctx, session);
    confirmation_window(ctx, session);
    error_window(ctx, session);
    toast(ctx, session);
}

fn busy_overlay(ctx: &egui::Context, session: &Session) {
    if !session.is_busy() {
        return;
    }

    let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("busy_overlay")));
    painter.rect_filled(ctx.screen_rect(), 0.0, Color32::from_black_alpha(128));

    egui::Area::new(Id::new("busy_indicator"))
        .order(Order::Tooltip)
        .anchor(Align2::CENTER_CENTER, [0.0, -20.0])
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style())
                .inner_margin(30.0)
                .show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add(egui::Spinner::new());
                        ui.small("Loading...");
                    });
                });
        });
}

fn modal(title: &str, id: &'static str) -> egui::Window<'static> {
    egui::Window::new(title.to_owned())
        .id(Id::new(id))
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
}

fn confirmation_window(ctx: &egui::Context, session: &mut Session) {
    let Some(confirmation) = session.confirmation().cloned() else {
        return;
    };

    match confirmation {
        Confirmation::Discard(prompt) | Confirmation::Restore(prompt) => {
            let mut answer = None;
            modal(&prompt.title, "confirmation").show(ctx, |ui| {
                ui.label(prompt.message.as_str());
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        answer = Some(false);
                    }
                    let mut label = egui::RichText::new(&prompt.confirm_label);
                    if prompt.destructive {
                        label = label.color(Color32::RED);
                    }
                    if ui.button(label).clicked() {
                        answer = Some(true);
                    }
                });
            });
            if let Some(accept) = answer {
                session.respond_confirmation(accept);
            }
        }
        Confirmation::Export(prompt) => {
            // Saving is refused until the outstanding operation lands
            let waiting = session.has_pending_operation();
            let mut chosen = None;
            modal("Save to album", "export_choice").show(ctx, |ui| {
                ui.vertical_centered_justified(|ui| {
                    ui.label(egui::RichText::new(&prompt.message).small().weak());
                    if waiting {
                        ui.add(egui::Spinner::new());
                    }
                    ui.add_space(8.0);
                    for choice in ExportChoice::ALL {
                        let is_cancel = choice == ExportChoice::Cancel;
                        let mut text = egui::RichText::new(choice.label());
                        if is_cancel {
                            text = text.strong();
                        }
                        ui.separator();
                        let enabled = is_cancel || !waiting;
                        if ui.add_enabled(enabled, egui::Button::new(text)).clicked() {
                            chosen = Some(choice);
                        }
                    }
                });
            });
            if let Some(choice) = chosen {
                if let Err(err) = session.choose_export(choice) {
                    log::warn!("Export choice {:?} refused: {}", choice, err);
                }
            }
        }
    }
}

fn error_window(ctx: &egui::Context, session: &mut Session) {
    let Some(error) = session.error().cloned() else {
        return;
    };

    let mut dismissed = false;
    modal(&error.title, "error").show(ctx, |ui| {
        ui.label(error.message.as_str());
        ui.add_space(8.0);
        if ui.button("OK").clicked() {
            dismissed = true;
        }
    });
    if dismissed {
        session.dismiss_error();
    }
}

fn toast(ctx: &egui::Context, session: &mut Session) {
    let Some(message) = session.toast().map(|toast| toast.message.clone()) else {
        return;
    };

    let tapped = egui::Area::new(Id::new("toast"))
        .order(Order::Foreground)
        .anchor(Align2::CENTER_BOTTOM, [0.0, -10.0])
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style())
                .inner_margin(20.0)
                .show(ui, |ui| {
                    ui.label(egui::RichText::new(message).small());
                })
                .response
        })
        .inner
        .interact(egui::Sense::click())
        .clicked();

    if tapped {
        session.tap_toast();
    }
}
