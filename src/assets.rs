use crate::error::ConfigError;
use crate::geometry::ModelSource;
use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

/// Built-in robot definitions, practice board and collision models
#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Asset;

pub const ROBOTS_FILE: &str = "robots.txt";
pub const BOARD_FILE: &str = "board.txt";

pub fn get_asset_bytes(name: &str) -> Option<Cow<'static, [u8]>> {
    Asset::get(name).map(|f| f.data)
}

pub fn asset_text(name: &str) -> Option<String> {
    get_asset_bytes(name).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads `path` when given, otherwise the embedded asset of the same role
pub fn load_text(path: Option<&Path>, embedded: &str) -> Result<String, ConfigError> {
    match path {
        Some(path) => fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        }),
        None => asset_text(embedded).ok_or_else(|| ConfigError::Io {
            path: embedded.to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }),
    }
}

fn model_asset(name: &str) -> String {
    format!("models/{}.txt", name)
}

/// Models compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedModels;

impl ModelSource for EmbeddedModels {
    fn model_text(&self, name: &str) -> Option<String> {
        asset_text(&model_asset(name))
    }
}

/// Models read from `<dir>/<name>.txt`, falling back to the built-in ones
#[derive(Debug, Clone)]
pub struct DirectoryModels {
    dir: PathBuf,
}

impl DirectoryModels {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryModels { dir: dir.into() }
    }
}

impl ModelSource for DirectoryModels {
    fn model_text(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.dir.join(format!("{}.txt", name)))
            .ok()
            .or_else(|| EmbeddedModels.model_text(name))
    }
}
