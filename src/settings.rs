use std::path::PathBuf;

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::state::SessionConfig;

const APP_DIR: &str = "sketch_session";

/// User settings, persisted through eframe's storage between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old settings
pub struct AppSettings {
    /// Where a paused drawing is kept
    pub save_path: PathBuf,
    /// Directory exported images are written to
    pub album_dir: PathBuf,
    /// Image drawn behind the canvas; a generated backdrop when unset
    pub background_path: Option<PathBuf>,
    pub min_busy_secs: f64,
    pub toast_timeout_secs: f64,
    pub offer_restore_on_activate: bool,
    pub pen_color: Color32,
    pub pen_thickness: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        let album_dir = dirs::picture_dir()
            .map(|dir| dir.join("Sketch Session"))
            .unwrap_or_else(|| data_dir.join("album"));
        let session = SessionConfig::default();

        Self {
            save_path: data_dir.join("SketchSession.data"),
            album_dir,
            background_path: None,
            min_busy_secs: session.min_busy_secs,
            toast_timeout_secs: session.toast_timeout_secs,
            offer_restore_on_activate: session.offer_restore_on_activate,
            pen_color: Color32::BLACK,
            pen_thickness: 4.0,
        }
    }
}

impl AppSettings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            min_busy_secs: self.min_busy_secs.max(0.0),
            toast_timeout_secs: self.toast_timeout_secs.max(0.0),
            offer_restore_on_activate: self.offer_restore_on_activate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{ "min_busy_secs": 0.0, "pen_thickness": 9.0 }"#).unwrap();

        assert_eq!(settings.min_busy_secs, 0.0);
        assert_eq!(settings.pen_thickness, 9.0);
        assert_eq!(settings.save_path, AppSettings::default().save_path);
        assert!(settings.offer_restore_on_activate);
    }

    #[test]
    fn session_config_clamps_negative_durations() {
        let settings = AppSettings {
            min_busy_secs: -1.0,
            toast_timeout_secs: 2.0,
            ..AppSettings::default()
        };
        let config = settings.session_config();
        assert_eq!(config.min_busy_secs, 0.0);
        assert_eq!(config.toast_timeout_secs, 2.0);
    }

    #[test]
    fn default_save_path_is_a_single_data_file() {
        let settings = AppSettings::default();
        assert_eq!(settings.save_path.file_name().unwrap(), "SketchSession.data");
    }
}
