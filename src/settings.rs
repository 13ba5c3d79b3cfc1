// ============================================================================
// CANVAS SETTINGS - persisted defaults for new canvases
// ============================================================================
//
// Plain `key=value` lines, one per setting. Colors are stored as "r,g,b".
// Unknown keys and malformed values are skipped so old or hand-edited files
// keep working.
// ============================================================================

use std::path::{Path, PathBuf};

use crate::components::colors::Rgb8;
use crate::components::tools::{
    MAX_BRUSH_SIZE, MAX_FADE_DEGREE, MAX_GRADIENT_DEGREE, MIN_BRUSH_SIZE, MIN_GRADIENT_DEGREE,
};

pub const DEFAULT_CANVAS_SIZE: u32 = 500;
pub const DEFAULT_PEN_COLOR: Rgb8 = Rgb8([116, 102, 83]);
pub const DEFAULT_FILL_COLOR: Rgb8 = Rgb8([100, 100, 155]);
pub const DEFAULT_BACKGROUND_COLOR: Rgb8 = Rgb8([214, 236, 233]);
pub const DEFAULT_CIRCLE_POINTS_PER_PI: u32 = crate::ops::shapes::CIRCLE_POINTS_PER_PI;
/// Upper bound for canvas dimensions read from a settings file.
pub const MAX_CANVAS_SIZE: u32 = 16384;

#[derive(Clone, Debug, PartialEq)]
pub struct CanvasSettings {
    pub width: u32,
    pub height: u32,
    pub pen_color: Rgb8,
    pub fill_color: Rgb8,
    pub background_color: Rgb8,
    pub brush_size: u32,
    pub gradient_degree: i32,
    pub fade_degree: i32,
    pub circle_points_per_pi: u32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_SIZE,
            height: DEFAULT_CANVAS_SIZE,
            pen_color: DEFAULT_PEN_COLOR,
            fill_color: DEFAULT_FILL_COLOR,
            background_color: DEFAULT_BACKGROUND_COLOR,
            brush_size: 6,
            gradient_degree: 95,
            fade_degree: 128,
            circle_points_per_pi: DEFAULT_CIRCLE_POINTS_PER_PI,
        }
    }
}

impl CanvasSettings {
    /// Platform location of the settings file.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("splatterboard");
            return Some(config_dir.join("splatterboard.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("SplatterBoard").join("splatterboard.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("SplatterBoard")
                    .join("splatterboard.cfg"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.join("splatterboard.cfg")))
        }
    }

    /// Load from the platform path, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path).unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Parse settings text. Never fails; bad lines keep their defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "width" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.width = v.clamp(1, MAX_CANVAS_SIZE);
                    }
                }
                "height" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.height = v.clamp(1, MAX_CANVAS_SIZE);
                    }
                }
                "pen_color" => {
                    if let Ok(c) = val.parse() {
                        s.pen_color = c;
                    }
                }
                "fill_color" => {
                    if let Ok(c) = val.parse() {
                        s.fill_color = c;
                    }
                }
                "background_color" => {
                    if let Ok(c) = val.parse() {
                        s.background_color = c;
                    }
                }
                "brush_size" => {
                    if let Ok(v) = val.parse::<i64>() {
                        s.brush_size = v.clamp(MIN_BRUSH_SIZE as i64, MAX_BRUSH_SIZE as i64) as u32;
                    }
                }
                "gradient_degree" => {
                    if let Ok(v) = val.parse::<i64>() {
                        s.gradient_degree =
                            v.clamp(MIN_GRADIENT_DEGREE as i64, MAX_GRADIENT_DEGREE as i64) as i32;
                    }
                }
                "fade_degree" => {
                    if let Ok(v) = val.parse::<i64>() {
                        s.fade_degree = v.clamp(0, MAX_FADE_DEGREE as i64) as i32;
                    }
                }
                "circle_points_per_pi" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.circle_points_per_pi = v.clamp(1, 360);
                    }
                }
                _ => {}
            }
        }
        s
    }

    pub fn to_cfg_string(&self) -> String {
        format!(
            "width={}\n\
             height={}\n\
             pen_color={}\n\
             fill_color={}\n\
             background_color={}\n\
             brush_size={}\n\
             gradient_degree={}\n\
             fade_degree={}\n\
             circle_points_per_pi={}\n",
            self.width,
            self.height,
            self.pen_color,
            self.fill_color,
            self.background_color,
            self.brush_size,
            self.gradient_degree,
            self.fade_degree,
            self.circle_points_per_pi,
        )
    }

    /// Save to the platform path.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::settings_path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no settings directory on this platform",
            ));
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_cfg_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_palette() {
        let s = CanvasSettings::default();
        assert_eq!((s.width, s.height), (500, 500));
        assert_eq!(s.pen_color, Rgb8([116, 102, 83]));
        assert_eq!(s.fill_color, Rgb8([100, 100, 155]));
        assert_eq!(s.background_color, Rgb8([214, 236, 233]));
        assert_eq!((s.brush_size, s.gradient_degree, s.fade_degree), (6, 95, 128));
    }

    #[test]
    fn parse_reads_known_keys() {
        let s = CanvasSettings::parse(
            "# comment\nwidth=320\nheight = 200\npen_color=1,2,3\nbrush_size=9\ngradient_degree=-40\n",
        );
        assert_eq!((s.width, s.height), (320, 200));
        assert_eq!(s.pen_color, Rgb8([1, 2, 3]));
        assert_eq!(s.brush_size, 9);
        assert_eq!(s.gradient_degree, -40);
        assert_eq!(s.fill_color, DEFAULT_FILL_COLOR);
    }

    #[test]
    fn parse_is_tolerant_and_clamps() {
        let s = CanvasSettings::parse(
            "bogus=1\nno equals sign\nfill_color=300,0,0\nbrush_size=40\n\
             fade_degree=-5\ngradient_degree=9000\nwidth=0\n",
        );
        assert_eq!(s.fill_color, DEFAULT_FILL_COLOR);
        assert_eq!(s.brush_size, MAX_BRUSH_SIZE);
        assert_eq!(s.fade_degree, 0);
        assert_eq!(s.gradient_degree, MAX_GRADIENT_DEGREE);
        assert_eq!(s.width, 1);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("splatterboard-settings-{}", std::process::id()));
        let path = dir.join("nested").join("test.cfg");
        let s = CanvasSettings {
            width: 64,
            background_color: Rgb8([9, 8, 7]),
            fade_degree: 17,
            ..Default::default()
        };
        s.save_to(&path).expect("save");
        let back = CanvasSettings::load_from(&path).expect("load");
        assert_eq!(back, s);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_an_error_for_load_from() {
        let path = std::env::temp_dir().join("splatterboard-definitely-missing.cfg");
        assert!(CanvasSettings::load_from(&path).is_err());
    }
}
