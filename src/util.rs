use base64::Engine;

/// Inline data-URL form of PNG bytes.
pub fn png_data_url(png: &[u8]) -> String {
    let engine = base64::engine::general_purpose::STANDARD;
    format!("data:image/png;base64,{}", engine.encode(png))
}

/// Monetary value as displayed on the receipt: the raw number, no forced
/// decimals, no separators. Matches JS number-to-string for the values the
/// cart can produce.
pub fn fmt_money(v: f64) -> String {
    format!("{v}")
}
