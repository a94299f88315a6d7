#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod backdrop;
pub mod canvas;
pub mod command;
pub mod components;
pub mod document;
pub mod error;
pub mod export;
pub mod panels;
pub mod settings;
pub mod state;
pub mod stroke;
pub mod util;

pub use app::SketchApp;
pub use canvas::Canvas;
pub use command::{Command, CommandHistory};
pub use document::DrawingDocument;
pub use error::{ExportError, PersistenceError, SessionError};
pub use settings::AppSettings;
pub use state::{Session, SessionConfig};
pub use stroke::Stroke;
