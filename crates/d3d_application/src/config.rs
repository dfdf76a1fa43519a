//! Settings loaded from an optional TOML file and the command line.
//!
//! Every field has a default, so a missing file or a partial file is fine.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use eyre::ensure;
use eyre::eyre;
use eyre::WrapErr;
use serde::Deserialize;
use tracing::warn;

use crate::application::DEFAULT_CLEAR_COLOR;
use crate::device::Extent;
use crate::device::Format;
use crate::error::AppResult;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub frame_loop: LoopConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Smallest client size the window can be dragged to.
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "D3D Application".to_string(),
            width: 800,
            height: 600,
            min_width: 200,
            min_height: 200,
        }
    }
}

impl WindowConfig {
    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    pub fn min_extent(&self) -> Extent {
        Extent::new(self.min_width, self.min_height)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphicsConfig {
    pub back_buffer_format: Format,
    pub depth_stencil_format: Format,
    pub multisampling: bool,
    pub sync_interval: u32,
    pub use_warp_device: bool,
    pub debug_layer: bool,
    pub clear_color: [f32; 4],
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            back_buffer_format: Format::R8g8b8a8Unorm,
            depth_stencil_format: Format::D24UnormS8Uint,
            multisampling: false,
            sync_interval: 0,
            use_warp_device: false,
            debug_layer: cfg!(debug_assertions),
            clear_color: DEFAULT_CLEAR_COLOR,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoopConfig {
    /// How long a paused loop sleeps between message checks.
    pub paused_sleep_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            paused_sleep_ms: 100,
        }
    }
}

impl LoopConfig {
    pub fn paused_sleep(&self) -> Duration {
        Duration::from_millis(self.paused_sleep_ms)
    }
}

impl AppConfig {
    pub fn from_toml(text: &str) -> AppResult<Self> {
        let config: AppConfig = toml::from_str(text).wrap_err("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(error) => {
                return Err(eyre::Report::new(error)
                    .wrap_err(format!("failed to read {}", path.display()))
                    .into())
            }
        };
        Self::from_toml(&text).map_err(|report| report.wrap_err(format!("in {}", path.display())))
    }

    pub fn validate(&self) -> eyre::Result<()> {
        let window = &self.window;
        ensure!(
            window.width > 0 && window.height > 0,
            "window size must be positive, got {}x{}",
            window.width,
            window.height
        );
        ensure!(
            window.min_width > 0 && window.min_height > 0,
            "minimum window size must be positive"
        );
        ensure!(
            !self.graphics.back_buffer_format.is_depth(),
            "back buffer format {:?} is a depth format",
            self.graphics.back_buffer_format
        );
        ensure!(
            self.graphics.depth_stencil_format.is_depth(),
            "depth/stencil format {:?} is not a depth format",
            self.graphics.depth_stencil_format
        );
        Ok(())
    }

    /// Applies command line overrides on top of the file settings.
    pub fn apply(&mut self, command_line: &CommandLine) {
        if command_line.use_warp_device {
            self.graphics.use_warp_device = true;
        }
    }
}

pub const DEFAULT_HEADLESS_FRAMES: u32 = 600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub use_warp_device: bool,
    pub config_path: Option<PathBuf>,
    pub headless: bool,
    pub frames: u32,
}

impl Default for CommandLine {
    fn default() -> Self {
        Self {
            use_warp_device: false,
            config_path: None,
            headless: false,
            frames: DEFAULT_HEADLESS_FRAMES,
        }
    }
}

impl CommandLine {
    /// Parses arguments, not including the program name.
    pub fn parse<I>(args: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut command_line = CommandLine::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg.eq_ignore_ascii_case("-warp") || arg.eq_ignore_ascii_case("/warp") {
                command_line.use_warp_device = true;
            } else if arg == "--headless" {
                command_line.headless = true;
            } else if arg == "--config" {
                let path = args.next().ok_or_else(|| eyre!("--config needs a path"))?;
                command_line.config_path = Some(PathBuf::from(path));
            } else if arg == "--frames" {
                let count = args.next().ok_or_else(|| eyre!("--frames needs a count"))?;
                command_line.frames = count
                    .parse()
                    .wrap_err_with(|| format!("invalid frame count {count:?}"))?;
            } else {
                warn!(%arg, "Ignoring unknown argument");
            }
        }
        Ok(command_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.window.extent(), Extent::new(800, 600));
        assert_eq!(config.window.min_extent(), Extent::new(200, 200));
        assert_eq!(config.frame_loop.paused_sleep(), Duration::from_millis(100));
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config = AppConfig::from_toml(
            r#"
            [window]
            title = "Box"
            width = 1280

            [graphics]
            back_buffer_format = "b8g8r8a8_unorm"
            depth_stencil_format = "d32_float"
            multisampling = true
            "#,
        )
        .unwrap();
        assert_eq!(config.window.title, "Box");
        assert_eq!(config.window.extent(), Extent::new(1280, 600));
        assert_eq!(config.graphics.back_buffer_format, Format::B8g8r8a8Unorm);
        assert_eq!(config.graphics.depth_stencil_format, Format::D32Float);
        assert!(config.graphics.multisampling);
    }

    #[test]
    fn zero_sized_window_is_rejected() {
        let error = AppConfig::from_toml("[window]\nheight = 0").unwrap_err();
        assert!(format!("{error:?}").contains("window size must be positive"));
    }

    #[test]
    fn depth_format_for_back_buffer_is_rejected() {
        assert!(AppConfig::from_toml("[graphics]\nback_buffer_format = \"d32_float\"").is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = AppConfig::load(Path::new("definitely/not/here/app.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn command_line_flags() {
        let command_line = CommandLine::parse(args(&[
            "/WARP",
            "--headless",
            "--frames",
            "12",
            "--config",
            "box.toml",
        ]))
        .unwrap();
        assert!(command_line.use_warp_device);
        assert!(command_line.headless);
        assert_eq!(command_line.frames, 12);
        assert_eq!(command_line.config_path, Some(PathBuf::from("box.toml")));

        let mut config = AppConfig::default();
        config.apply(&command_line);
        assert!(config.graphics.use_warp_device);
    }

    #[test]
    fn bad_frame_count_is_an_error() {
        assert!(CommandLine::parse(args(&["--frames", "lots"])).is_err());
        assert!(CommandLine::parse(args(&["--config"])).is_err());
    }
}
