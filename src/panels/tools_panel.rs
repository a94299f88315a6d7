use eframe::egui;

use crate::canvas::{Canvas, CanvasTool};

pub fn tools_panel(ctx: &egui::Context, canvas: &mut Canvas) {
    egui::SidePanel::left("tools_panel")
        .resizable(false)
        .default_width(180.0)
        .show(ctx, |ui| {
            ui.heading("Tools");
            ui.separator();

            ui.horizontal(|ui| {
                for tool in CanvasTool::ALL {
                    if ui.selectable_label(canvas.tool() == tool, tool.label()).clicked() {
                        log::info!("Tool selected: {:?}", tool);
                        canvas.set_tool(tool);
                    }
                }
            });

            ui.separator();

            ui.add_enabled_ui(canvas.tool() == CanvasTool::Pen, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Color:");
                    egui::color_picker::color_edit_button_srgba(
                        ui,
                        canvas.color_mut(),
                        egui::color_picker::Alpha::OnlyBlend,
                    );
                });

                ui.add(
                    egui::Slider::new(canvas.thickness_mut(), 1.0..=40.0)
                        .text("Thickness"),
                );
            });
        });
}
