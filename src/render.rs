//! Rasterization of a planned receipt onto an RGBA surface.
//!
//! The rasterizer walks the [`LayoutPlan`] read-only and issues drawing
//! commands with the coordinates computed there; it never re-measures. All
//! text is drawn glyph by glyph with src-over alpha blending.

use chrono::Local;
use image::{imageops::FilterType, ImageEncoder, Rgba, RgbaImage};
use rusttype::{point, Font, Scale};
use thiserror::Error;

use crate::cart::Group;
use crate::fonts::{Face, FontSet};
use crate::icons::{IconKind, Icons};
use crate::layout::{
    LayoutPlan, FOOTER_BLOCK, HEADER_LINE, ITEM_LINE, MARGIN, MAX_LINES, TITLE_HEIGHT, WIDTH,
};
use crate::util;

pub const MIME_TYPE: &str = "image/png";
pub const DEFAULT_TITLE: &str = "今天吃什么 · 清单";
const WATERMARK: &str = "EatWhat · Generated by API";

/// Right edge shared by the header subtotal and every line total.
const PRICE_RIGHT: i32 = WIDTH as i32 - MARGIN - 12;
const ICON_GAP: i32 = 8;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("font: {0}")]
    Font(String),
    #[error("invalid color: {0}")]
    Color(String),
    #[error("png encode: {0}")]
    Encode(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    /// Anything other than `"dark"` is the light theme.
    pub fn parse(value: Option<&str>) -> Theme {
        match value {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }
}

/// Fixed palette per theme. Colors only; geometry never varies with theme.
struct Palette {
    bg: Rgba<u8>,
    border: Rgba<u8>,
    section_bg: Rgba<u8>,
    title: Rgba<u8>,
    sub: Rgba<u8>,
    text: Rgba<u8>,
    accent: Rgba<u8>,
    rule: Rgba<u8>,
    watermark: Rgba<u8>,
}

impl Palette {
    fn for_theme(theme: Theme) -> Result<Palette, RenderError> {
        let p = match theme {
            Theme::Dark => Palette {
                bg: hex_color("#1F1F1F")?,
                border: hex_color("#2A2A2A")?,
                section_bg: hex_color("#2B2B2B")?,
                title: hex_color("#FAFAFA")?,
                sub: hex_color("#A0A0A0")?,
                text: hex_color("#EAEAEA")?,
                accent: hex_color("#FF6B6B")?,
                rule: hex_color("#303030")?,
                watermark: hex_color("#AAAAAA")?,
            },
            Theme::Light => Palette {
                bg: hex_color("#FFFDF8")?,
                border: hex_color("#E9E4D8")?,
                section_bg: hex_color("#FFF3E8")?,
                title: hex_color("#2C2C2C")?,
                sub: hex_color("#9A9A9A")?,
                text: hex_color("#2C2C2C")?,
                accent: hex_color("#FF6B6B")?,
                rule: hex_color("#EEE7D9")?,
                watermark: hex_color("#666666")?,
            },
        };
        Ok(p)
    }
}

/// Encoded receipt plus its metadata. No state survives the call.
pub struct RenderResult {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime_type: &'static str,
    pub data_url: String,
}

/// Draw `groups` according to `plan` and encode the surface as PNG.
pub fn render(
    groups: &[Group],
    plan: &LayoutPlan,
    theme: Theme,
    title: &str,
    fonts: &FontSet,
    icons: &Icons,
) -> Result<RenderResult, RenderError> {
    let _t = crate::perf_scope!("raster");
    let colors = Palette::for_theme(theme)?;
    let mut img = RgbaImage::from_pixel(plan.width, plan.height, colors.bg);

    stroke_border(&mut img, 2, colors.border);

    // Title block.
    draw_text(&mut img, fonts.get(Face::Bold), 24.0, MARGIN, MARGIN + 2, colors.title, title);
    let stamp = format!("生成时间：{}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    draw_text(&mut img, fonts.get(Face::Regular), 14.0, MARGIN, MARGIN + 38, colors.sub, &stamp);
    hline(
        &mut img,
        MARGIN,
        WIDTH as i32 - MARGIN,
        MARGIN + TITLE_HEIGHT - 20,
        colors.rule,
    );

    for gp in &plan.groups {
        let group = &groups[gp.group];

        // Header band with store name and right-aligned subtotal.
        fill_rect(
            &mut img,
            MARGIN,
            gp.header_y,
            WIDTH as i32 - MARGIN * 2,
            HEADER_LINE,
            colors.section_bg,
        );
        let header_center = gp.header_y + HEADER_LINE / 2;
        draw_text_centered(
            &mut img,
            fonts.get(Face::Bold),
            18.0,
            MARGIN + 14,
            header_center,
            colors.text,
            &group.store_name,
        );
        draw_priced(
            &mut img,
            fonts,
            icons,
            18.0,
            22,
            header_center,
            colors.text,
            &util::fmt_money(group.subtotal),
        );

        for row in &gp.rows {
            let item = &group.items[row.item];
            let row_center = row.y + ITEM_LINE / 2;

            match icons.sprite(IconKind::Heart) {
                Some(sprite) => {
                    overlay_scaled(&mut img, sprite, MARGIN + 6, row_center - 8, 16);
                }
                None => fill_circle(&mut img, MARGIN + 12, row_center, 4, colors.accent),
            }

            let left_text = format!("{} x{}", item.name, item.quantity);
            draw_text_centered(
                &mut img,
                fonts.get(Face::Regular),
                16.0,
                MARGIN + 28,
                row_center,
                colors.text,
                &left_text,
            );
            draw_priced(
                &mut img,
                fonts,
                icons,
                16.0,
                18,
                row_center,
                colors.text,
                &util::fmt_money(item.total()),
            );

            if row.note {
                let note_text = format!("备注：{}", item.note);
                draw_text_centered(
                    &mut img,
                    fonts.get(Face::Regular),
                    12.0,
                    MARGIN + 28,
                    row.y + ITEM_LINE - 4,
                    colors.sub,
                    &note_text,
                );
            }
        }
    }

    // Grand total over all normalized groups, including ones hidden by the
    // line cap.
    let total_text = format!("总计 ￥{}", util::fmt_money(crate::cart::grand_total(groups)));
    draw_text_centered_right(
        &mut img,
        fonts.get(Face::Bold),
        18.0,
        WIDTH as i32 - MARGIN - 14,
        plan.total_y + 8,
        colors.text,
        &total_text,
    );

    // Low-opacity attribution, bottom-right.
    let wm = Rgba([colors.watermark[0], colors.watermark[1], colors.watermark[2], 46]);
    draw_text_centered_right(
        &mut img,
        fonts.get(Face::Regular),
        12.0,
        WIDTH as i32 - MARGIN,
        plan.height as i32 - MARGIN - 8,
        wm,
        WATERMARK,
    );

    if plan.truncated {
        let notice = format!("注：超出最大行数 {MAX_LINES}，列表已截断");
        draw_text_centered(
            &mut img,
            fonts.get(Face::Regular),
            12.0,
            MARGIN,
            plan.height as i32 - FOOTER_BLOCK,
            colors.sub,
            &notice,
        );
    }

    let png = encode_png(&img)?;
    let data_url = util::png_data_url(&png);
    Ok(RenderResult {
        width: img.width(),
        height: img.height(),
        mime_type: MIME_TYPE,
        png,
        data_url,
    })
}

fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let _t = crate::perf_scope!("png_encode");
    let mut buf = Vec::new();
    let enc = image::codecs::png::PngEncoder::new(&mut buf);
    enc.write_image(img, img.width(), img.height(), image::ExtendedColorType::Rgba8)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(buf)
}

fn hex_color(s: &str) -> Result<Rgba<u8>, RenderError> {
    let s = s.trim().trim_start_matches('#');
    if s.len() != 6 {
        return Err(RenderError::Color(s.to_string()));
    }
    let b = hex::decode(s).map_err(|_| RenderError::Color(s.to_string()))?;
    Ok(Rgba([b[0], b[1], b[2], 255]))
}

fn blend_px(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, alpha: f32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= img.width() || y >= img.height() {
        return;
    }
    let sa = alpha * (color[3] as f32 / 255.0);
    if sa <= 0.0 {
        return;
    }
    let dst = img.get_pixel_mut(x, y);
    let inv = 1.0 - sa;
    dst[0] = (color[0] as f32 * sa + dst[0] as f32 * inv) as u8;
    dst[1] = (color[1] as f32 * sa + dst[1] as f32 * inv) as u8;
    dst[2] = (color[2] as f32 * sa + dst[2] as f32 * inv) as u8;
    dst[3] = 255;
}

fn fill_rect(img: &mut RgbaImage, x: i32, y: i32, w: i32, h: i32, color: Rgba<u8>) {
    for dy in 0..h.max(0) {
        for dx in 0..w.max(0) {
            blend_px(img, x + dx, y + dy, color, 1.0);
        }
    }
}

/// 2px border hugging the canvas edge (the canvas `strokeRect(1,1,..)` look).
fn stroke_border(img: &mut RgbaImage, t: i32, color: Rgba<u8>) {
    let (w, h) = (img.width() as i32, img.height() as i32);
    fill_rect(img, 0, 0, w, t, color);
    fill_rect(img, 0, h - t, w, t, color);
    fill_rect(img, 0, 0, t, h, color);
    fill_rect(img, w - t, 0, t, h, color);
}

fn hline(img: &mut RgbaImage, x0: i32, x1: i32, y: i32, color: Rgba<u8>) {
    for x in x0..x1 {
        blend_px(img, x, y, color, 1.0);
    }
}

fn fill_circle(img: &mut RgbaImage, cx: i32, cy: i32, r: i32, color: Rgba<u8>) {
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                blend_px(img, cx + dx, cy + dy, color, 1.0);
            }
        }
    }
}

fn text_width(font: &Font<'static>, px: f32, text: &str) -> f32 {
    if text.is_empty() {
        return 0.0;
    }
    let scale = Scale::uniform(px);
    let v_metrics = font.v_metrics(scale);
    let mut width: f32 = 0.0;
    for g in font.layout(text, scale, point(0.0, v_metrics.ascent)) {
        if let Some(bb) = g.pixel_bounding_box() {
            width = width.max(bb.max.x as f32);
        }
        width = width.max(g.position().x + g.unpositioned().h_metrics().advance_width);
    }
    width
}

/// Draw `text` with its top-left at `(x, y)` (canvas `textBaseline: top`).
fn draw_text(img: &mut RgbaImage, font: &Font<'static>, px: f32, x: i32, y: i32, color: Rgba<u8>, text: &str) {
    let scale = Scale::uniform(px);
    let v_metrics = font.v_metrics(scale);
    let mut caret_x = x as f32;
    let baseline_y = y as f32 + v_metrics.ascent;

    for ch in text.chars() {
        let glyph = font.glyph(ch).scaled(scale).positioned(point(caret_x, baseline_y));
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, v| {
                blend_px(img, gx as i32 + bb.min.x, gy as i32 + bb.min.y, color, v);
            });
        }
        caret_x += glyph.unpositioned().h_metrics().advance_width;
    }
}

/// Draw `text` vertically centered on `center_y` (canvas `textBaseline: middle`).
fn draw_text_centered(
    img: &mut RgbaImage,
    font: &Font<'static>,
    px: f32,
    x: i32,
    center_y: i32,
    color: Rgba<u8>,
    text: &str,
) {
    draw_text(img, font, px, x, center_y - (px / 2.0).round() as i32, color, text);
}

fn draw_text_centered_right(
    img: &mut RgbaImage,
    font: &Font<'static>,
    px: f32,
    right_x: i32,
    center_y: i32,
    color: Rgba<u8>,
    text: &str,
) {
    let w = text_width(font, px, text).ceil() as i32;
    draw_text_centered(img, font, px, right_x - w, center_y, color, text);
}

/// A monetary value right-aligned against the shared price edge, followed by
/// the money icon (sprite when loaded, `￥` glyph otherwise).
#[allow(clippy::too_many_arguments)]
fn draw_priced(
    img: &mut RgbaImage,
    fonts: &FontSet,
    icons: &Icons,
    px: f32,
    icon_size: i32,
    center_y: i32,
    color: Rgba<u8>,
    amount: &str,
) {
    let text_right = PRICE_RIGHT - icon_size - ICON_GAP;
    draw_text_centered_right(img, fonts.get(Face::Regular), px, text_right, center_y, color, amount);

    match icons.sprite(IconKind::Money) {
        Some(sprite) => {
            overlay_scaled(img, sprite, PRICE_RIGHT - icon_size, center_y - icon_size / 2, icon_size);
        }
        None => {
            draw_text_centered_right(img, fonts.get(Face::Regular), px, PRICE_RIGHT, center_y, color, "￥");
        }
    }
}

fn overlay_scaled(img: &mut RgbaImage, sprite: &RgbaImage, x: i32, y: i32, size: i32) {
    let size = size.max(1) as u32;
    let scaled = if sprite.width() == size && sprite.height() == size {
        sprite.clone()
    } else {
        image::imageops::resize(sprite, size, size, FilterType::Lanczos3)
    };
    for oy in 0..scaled.height() {
        for ox in 0..scaled.width() {
            let p = scaled.get_pixel(ox, oy);
            // blend_px folds the sprite pixel's own alpha in.
            blend_px(img, x + ox as i32, y + oy as i32, *p, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{self, normalize};
    use crate::layout::plan;
    use image::Rgba;
    use serde_json::json;

    fn fonts() -> Option<FontSet> {
        FontSet::resolve().ok()
    }

    fn sample_groups() -> Vec<cart::Group> {
        normalize(&json!({
            "s1": {
                "storeInfo": { "name": "Noodle House" },
                "items": [
                    { "name": "Beef Noodles", "price": 22, "quantity": 2 },
                    { "name": "Bad Item", "price": 0, "quantity": 1 },
                ]
            }
        }))
    }

    #[test]
    fn theme_parse_defaults_to_light() {
        assert_eq!(Theme::parse(None), Theme::Light);
        assert_eq!(Theme::parse(Some("blue")), Theme::Light);
        assert_eq!(Theme::parse(Some("dark")), Theme::Dark);
    }

    #[test]
    fn palettes_differ_between_themes() {
        let light = Palette::for_theme(Theme::Light).unwrap();
        let dark = Palette::for_theme(Theme::Dark).unwrap();
        assert_ne!(light.bg, dark.bg);
        assert_ne!(light.text, dark.text);
        assert_eq!(light.accent, dark.accent);
    }

    #[test]
    fn hex_color_rejects_junk() {
        assert!(hex_color("#GGGGGG").is_err());
        assert!(hex_color("#FFF").is_err());
        assert_eq!(hex_color("#FF6B6B").unwrap(), Rgba([0xFF, 0x6B, 0x6B, 255]));
    }

    #[test]
    fn example_scenario_produces_expected_png() {
        let Some(fonts) = fonts() else { return };
        let groups = sample_groups();
        assert_eq!(groups[0].subtotal, 44.0);

        let p = plan(&groups);
        // One group, one item line, no note.
        assert_eq!(p.height, (114 + 42 + 30 + 4 + 80) as u32);

        let out = render(&groups, &p, Theme::Light, DEFAULT_TITLE, &fonts, &Icons::fallback()).unwrap();
        assert_eq!(out.width, 420);
        assert_eq!(out.height, p.height);
        assert_eq!(out.mime_type, "image/png");
        assert_eq!(&out.png[..8], b"\x89PNG\r\n\x1a\n");
        assert!(out.data_url.starts_with("data:image/png;base64,"));

        let decoded = image::load_from_memory(&out.png).unwrap();
        assert_eq!(decoded.width(), out.width);
        assert_eq!(decoded.height(), out.height);
    }

    #[test]
    fn themes_share_geometry_but_not_colors() {
        let Some(fonts) = fonts() else { return };
        let groups = sample_groups();
        let p = plan(&groups);
        let icons = Icons::fallback();

        let light = render(&groups, &p, Theme::Light, "t", &fonts, &icons).unwrap();
        let dark = render(&groups, &p, Theme::Dark, "t", &fonts, &icons).unwrap();
        assert_eq!(light.width, dark.width);
        assert_eq!(light.height, dark.height);

        let li = image::load_from_memory(&light.png).unwrap().to_rgba8();
        let di = image::load_from_memory(&dark.png).unwrap().to_rgba8();
        // Mid-canvas background pixel differs between themes.
        let probe = (5, light.height / 2);
        assert_ne!(li.get_pixel(probe.0, probe.1), di.get_pixel(probe.0, probe.1));
    }

    #[test]
    fn icons_do_not_change_dimensions() {
        let Some(fonts) = fonts() else { return };
        let groups = sample_groups();
        let p = plan(&groups);

        let sprite = RgbaImage::from_pixel(8, 8, Rgba([10, 200, 10, 255]));
        let with = Icons::from_sprites(Some(sprite.clone()), Some(sprite));
        let without = Icons::fallback();

        let a = render(&groups, &p, Theme::Light, "t", &fonts, &with).unwrap();
        let b = render(&groups, &p, Theme::Light, "t", &fonts, &without).unwrap();
        assert_eq!(a.width, b.width);
        assert_eq!(a.height, b.height);
    }

    #[test]
    fn empty_cart_renders_a_near_empty_receipt() {
        let Some(fonts) = fonts() else { return };
        let groups: Vec<cart::Group> = Vec::new();
        let p = plan(&groups);
        let out = render(&groups, &p, Theme::Light, DEFAULT_TITLE, &fonts, &Icons::fallback()).unwrap();
        assert_eq!(out.height, 194);
    }
}
