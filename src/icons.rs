//! Optional icon sprites for the receipt.
//!
//! Two small PNGs (a money glyph and a heart bullet) are loaded best-effort
//! from the assets directory. Either may be absent; the rasterizer then
//! falls back to a `￥` glyph or a plain filled bullet. The resolved set is
//! cached once per process and never mutated afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use once_cell::sync::Lazy;

static PROCESS_ICONS: Lazy<Arc<Icons>> = Lazy::new(|| Arc::new(Icons::load(&icons_dir())));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IconKind {
    Money,
    Heart,
}

/// Sprites that survived loading. A `None` slot means "draw the fallback".
#[derive(Clone, Default)]
pub struct Icons {
    money: Option<RgbaImage>,
    heart: Option<RgbaImage>,
}

impl Icons {
    /// Best-effort load from `dir`. Missing or undecodable files are not
    /// errors.
    pub fn load(dir: &Path) -> Icons {
        Icons {
            money: load_sprite(&dir.join("money.png")),
            heart: load_sprite(&dir.join("heart.png")),
        }
    }

    /// No sprites at all; every draw uses the glyph/bullet fallback.
    pub fn fallback() -> Icons {
        Icons::default()
    }

    pub fn from_sprites(money: Option<RgbaImage>, heart: Option<RgbaImage>) -> Icons {
        Icons { money, heart }
    }

    pub fn sprite(&self, kind: IconKind) -> Option<&RgbaImage> {
        match kind {
            IconKind::Money => self.money.as_ref(),
            IconKind::Heart => self.heart.as_ref(),
        }
    }
}

/// Icon set shared by all requests, resolved on first use.
pub fn process_icons() -> Arc<Icons> {
    Arc::clone(&PROCESS_ICONS)
}

pub fn icons_dir() -> PathBuf {
    let project_root = std::env::var("PROJECT_ROOT").ok().unwrap_or_else(|| {
        let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.to_string_lossy().to_string()
    });
    PathBuf::from(project_root).join("assets").join("icons")
}

fn load_sprite(path: &Path) -> Option<RgbaImage> {
    let bytes = std::fs::read(path).ok()?;
    match image::load_from_memory(&bytes) {
        Ok(img) => Some(img.to_rgba8()),
        Err(e) => {
            tracing::debug!(path = %path.display(), "icon not decodable: {e}");
            None
        }
    }
}
