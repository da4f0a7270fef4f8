//! Font resolution and process-wide caching.
//!
//! The receipt ships no brand font; we resolve a regular and a bold face
//! from, in order: an explicit env override, the repo's assets directory,
//! then the usual system font locations. Parsed faces are cached for the
//! lifetime of the process.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rusttype::Font;

use crate::render::RenderError;

static FONT_CACHE: Lazy<Mutex<HashMap<PathBuf, Arc<Font<'static>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
}

/// The two faces a receipt render needs.
#[derive(Clone)]
pub struct FontSet {
    pub regular: Arc<Font<'static>>,
    pub bold: Arc<Font<'static>>,
}

impl FontSet {
    pub fn get(&self, face: Face) -> &Font<'static> {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
        }
    }

    /// Resolve both faces. Fails only when no candidate file parses; a
    /// missing bold face silently reuses the regular one.
    pub fn resolve() -> Result<FontSet, RenderError> {
        let regular = first_usable(Face::Regular)
            .ok_or_else(|| RenderError::Font("no usable regular font found".into()))?;
        let bold = first_usable(Face::Bold).unwrap_or_else(|| Arc::clone(&regular));
        Ok(FontSet { regular, bold })
    }
}

fn assets_fonts_dir() -> PathBuf {
    let project_root = std::env::var("PROJECT_ROOT").ok().unwrap_or_else(|| {
        let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.to_string_lossy().to_string()
    });
    PathBuf::from(project_root).join("assets").join("fonts")
}

fn candidates(face: Face) -> Vec<PathBuf> {
    let (env_key, asset_names, system_paths): (&str, &[&str], &[&str]) = match face {
        Face::Regular => (
            "ORDER_FONT",
            &["receipt.ttf", "NotoSansSC-Regular.ttf"],
            &[
                "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
                "/usr/share/fonts/TTF/DejaVuSans.ttf",
                "/usr/share/fonts/dejavu/DejaVuSans.ttf",
                "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
                "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
                "C:/Windows/Fonts/msyh.ttc",
                "C:/Windows/Fonts/arial.ttf",
            ],
        ),
        Face::Bold => (
            "ORDER_FONT_BOLD",
            &["receipt-bold.ttf", "NotoSansSC-Bold.ttf"],
            &[
                "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc",
                "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
                "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
                "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
                "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
                "C:/Windows/Fonts/arialbd.ttf",
            ],
        ),
    };

    let mut out = Vec::new();
    if let Ok(p) = std::env::var(env_key) {
        out.push(PathBuf::from(p));
    }
    let dir = assets_fonts_dir();
    for name in asset_names {
        out.push(dir.join(name));
    }
    out.extend(system_paths.iter().map(PathBuf::from));
    out
}

fn first_usable(face: Face) -> Option<Arc<Font<'static>>> {
    candidates(face).into_iter().find_map(load_cached)
}

fn load_cached(path: PathBuf) -> Option<Arc<Font<'static>>> {
    if let Some(f) = FONT_CACHE.lock().get(&path) {
        return Some(Arc::clone(f));
    }
    let bytes = std::fs::read(&path).ok()?;
    // .ttc collections: take the first face.
    let font = Font::try_from_vec(bytes)?;
    let font = Arc::new(font);
    FONT_CACHE.lock().insert(path, Arc::clone(&font));
    Some(font)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_reuses_cached_faces() {
        // Host may have no fonts at all; only assert consistency.
        let first = FontSet::resolve();
        let second = FontSet::resolve();
        assert_eq!(first.is_ok(), second.is_ok());
        if let (Ok(a), Ok(b)) = (first, second) {
            assert!(Arc::ptr_eq(&a.regular, &b.regular));
        }
    }

    #[test]
    fn bold_candidates_are_distinct_from_regular() {
        assert_ne!(candidates(Face::Regular), candidates(Face::Bold));
    }
}
