use egui::{
    Color32, ColorImage, Painter, Pos2, Rect, Response, Sense, TextureHandle, TextureOptions, Ui,
    Vec2, pos2,
};

use crate::command::{Command, CommandHistory};
use crate::state::Session;
use crate::stroke::MutableStroke;

/// How close (in points) the eraser has to get to a stroke's outline
const ERASER_REACH: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasTool {
    Pen,
    Eraser,
}

impl CanvasTool {
    pub const ALL: [CanvasTool; 2] = [Self::Pen, Self::Eraser];

    pub fn label(self) -> &'static str {
        match self {
            Self::Pen => "✏ Pen",
            Self::Eraser => "⌫ Eraser",
        }
    }
}

/// The drawing area: paints the backdrop and strokes, turns pointer input into
/// document edits, and keeps the undo history for those edits.
pub struct Canvas {
    tool: CanvasTool,
    color: Color32,
    thickness: f32,
    in_progress: Option<MutableStroke>,
    history: CommandHistory,
    seen_generation: u64,
    background: Option<TextureHandle>,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("tool", &self.tool)
            .field("color", &self.color)
            .field("thickness", &self.thickness)
            .field("in_progress", &self.in_progress)
            .field("history", &self.history)
            .field("seen_generation", &self.seen_generation)
            .field("background", &self.background.as_ref().map(|_| "<TextureHandle>"))
            .finish()
    }
}

impl Canvas {
    pub fn new(color: Color32, thickness: f32) -> Self {
        Self {
            tool: CanvasTool::Pen,
            color,
            thickness,
            in_progress: None,
            history: CommandHistory::new(),
            seen_generation: 0,
            background: None,
        }
    }

    pub fn tool(&self) -> CanvasTool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: CanvasTool) {
        self.tool = tool;
        self.in_progress = None;
    }

    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn color_mut(&mut self) -> &mut Color32 {
        &mut self.color
    }

    pub fn thickness(&self) -> f32 {
        self.thickness
    }

    pub fn thickness_mut(&mut self) -> &mut f32 {
        &mut self.thickness
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self, session: &mut Session) {
        if self.history.can_undo() {
            let history = &mut self.history;
            session.edit(|document| history.undo(document));
        }
    }

    pub fn redo(&mut self, session: &mut Session) {
        if self.history.can_redo() {
            let history = &mut self.history;
            session.edit(|document| history.redo(document));
        }
    }

    /// History only applies to the document it was recorded against.
    fn sync_generation(&mut self, session: &Session) {
        if self.seen_generation != session.generation() {
            self.seen_generation = session.generation();
            self.history.clear();
            self.in_progress = None;
        }
    }

    pub fn show(&mut self, ui: &mut Ui, session: &mut Session) {
        self.sync_generation(session);

        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;
        session.set_canvas_geometry(rect.size(), ui.ctx().pixels_per_point());

        if let Some(texture) = self.background_texture(ui.ctx(), session) {
            painter.image(
                texture.id(),
                rect,
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        // Input is blocked while the session is busy or asking something
        if session.is_busy() || session.confirmation().is_some() {
            self.in_progress = None;
        } else {
            self.handle_input(&response, rect, session);
        }

        let origin = rect.min.to_vec2();
        for stroke in session.document().strokes() {
            paint_stroke(&painter, origin, stroke.points(), stroke.color(), stroke.thickness());
        }
        if let Some(stroke) = &self.in_progress {
            paint_stroke(&painter, origin, stroke.points(), stroke.color(), stroke.thickness());
        }
    }

    fn background_texture(&mut self, ctx: &egui::Context, session: &Session) -> Option<&TextureHandle> {
        if self.background.is_none() {
            let image = session.background()?;
            let color_image = ColorImage::from_rgba_unmultiplied(
                [image.width() as usize, image.height() as usize],
                image.as_raw(),
            );
            self.background = Some(ctx.load_texture("backdrop", color_image, TextureOptions::LINEAR));
        }
        self.background.as_ref()
    }

    fn handle_input(&mut self, response: &Response, rect: Rect, session: &mut Session) {
        let to_canvas = move |pos: Pos2| (pos - rect.min).to_pos2();
        let pointer = response.interact_pointer_pos().map(to_canvas);

        match self.tool {
            CanvasTool::Pen => self.handle_pen(response, pointer, to_canvas, session),
            CanvasTool::Eraser => {
                if response.clicked() || response.dragged() {
                    if let Some(pos) = pointer {
                        self.erase_at(pos, session);
                    }
                }
            }
        }
    }

    fn handle_pen(
        &mut self,
        response: &Response,
        pointer: Option<Pos2>,
        to_canvas: impl Fn(Pos2) -> Pos2,
        session: &mut Session,
    ) {
        if response.drag_started() {
            let mut stroke = MutableStroke::new(self.color, self.thickness);
            // The drag only registers after the pointer moved a little
            if let Some(origin) = response.ctx.input(|i| i.pointer.press_origin()) {
                stroke.add_point(to_canvas(origin));
            }
            self.in_progress = Some(stroke);
        }

        if response.dragged() {
            if let (Some(stroke), Some(pos)) = (self.in_progress.as_mut(), pointer) {
                stroke.add_point(pos);
            }
        }

        if response.drag_stopped() {
            if let Some(stroke) = self.in_progress.take().filter(|s| !s.is_empty()) {
                self.commit(Command::AddStroke(stroke.into_stroke()), session);
            }
        } else if response.clicked() {
            if let Some(pos) = pointer {
                let mut dot = MutableStroke::new(self.color, self.thickness);
                dot.add_point(pos);
                self.commit(Command::AddStroke(dot.into_stroke()), session);
            }
        }
    }

    fn erase_at(&mut self, pos: Pos2, session: &mut Session) {
        let hit = session
            .document()
            .strokes()
            .iter()
            .enumerate()
            .rev()
            .find(|(_, stroke)| {
                stroke.bounds().expand(ERASER_REACH).contains(pos)
                    && stroke.distance_to(pos) <= ERASER_REACH
            })
            .map(|(index, stroke)| (index, stroke.clone()));

        if let Some((index, stroke)) = hit {
            self.commit(Command::EraseStroke { index, stroke }, session);
        }
    }

    fn commit(&mut self, command: Command, session: &mut Session) {
        let history = &mut self.history;
        session.edit(|document| history.execute(command, document));
    }
}

fn paint_stroke(painter: &Painter, origin: Vec2, points: &[Pos2], color: Color32, thickness: f32) {
    match points {
        [] => {}
        [only] => {
            painter.circle_filled(*only + origin, thickness * 0.5, color);
        }
        _ => {
            let screen_points: Vec<Pos2> = points.iter().map(|p| *p + origin).collect();
            painter.add(egui::Shape::line(
                screen_points,
                egui::Stroke::new(thickness, color),
            ));
        }
    }
}
