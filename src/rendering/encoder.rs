/// Frame serialization into ANSI escape sequences.
/// Every cell carries its own color state and ends with a reset, so a frame
/// can be printed over the previous one without diffing.
use crate::rendering::framebuffer::{ColorBuffer, HudBuffer};
use glam::Vec3;
use serde::Deserialize;
use std::fmt::Write as _;

pub const RESET: &str = "\x1b[0m";

/// Luminance ramp for [`ColorMode::Ascii`], densest glyph first.
pub const ASCII_RAMP: &[u8] =
    b"$@B%8&WM#*oahkbdpqwmZO0QLCJUYXzcvunxrjft/\\|()1{}[]?-_+~<>i!lI;:,\"^`'.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// 24-bit background colors.
    #[default]
    Full,
    /// 256-color grayscale for terminals without truecolor.
    Compat,
    /// No escapes; one ramp character per cell.
    Ascii,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Foreground,
    Background,
}

impl Layer {
    #[inline]
    fn code(self) -> u8 {
        match self {
            Layer::Foreground => 38,
            Layer::Background => 48,
        }
    }
}

#[inline]
fn channel(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

#[inline]
fn average(color: Vec3) -> f32 {
    (color.x + color.y + color.z) / 3.0
}

/// `ESC[48;2;R;G;Bm` (or 38 for the foreground).
pub fn write_truecolor(out: &mut String, layer: Layer, color: Vec3) {
    let _ = write!(
        out,
        "\x1b[{};2;{};{};{}m",
        layer.code(),
        channel(color.x),
        channel(color.y),
        channel(color.z)
    );
}

/// Index into the 256-color grayscale ramp, black 16 and white 231.
pub fn gray_index(color: Vec3) -> u8 {
    let value = (231.1 + (256.1 - 231.1) * average(color).clamp(0.0, 1.0)) as u32;
    match value {
        231 => 16,
        256.. => 231,
        v => v as u8,
    }
}

/// `ESC[48;5;Nm` (or 38 for the foreground).
pub fn write_gray(out: &mut String, layer: Layer, color: Vec3) {
    let _ = write!(out, "\x1b[{};5;{}m", layer.code(), gray_index(color));
}

/// Color escape for `mode`: truecolor in `Full`, grayscale in `Compat`,
/// nothing in `Ascii`.
pub fn write_color(out: &mut String, layer: Layer, color: Vec3, mode: ColorMode) {
    match mode {
        ColorMode::Full => write_truecolor(out, layer, color),
        ColorMode::Compat => write_gray(out, layer, color),
        ColorMode::Ascii => {}
    }
}

/// Ramp glyph for `color`: bright input gives the densest glyph.
pub fn ascii_glyph(color: Vec3) -> char {
    let len = ASCII_RAMP.len();
    let index = (1.0 - average(color)).clamp(0.0, 1.0) * len as f32 - 1.0;
    ASCII_RAMP[(index.max(0.0) as usize).min(len - 1)] as char
}

/// Serialize the frame. HUD content replaces the cell's glyph but keeps its
/// background color.
pub fn encode(color: &ColorBuffer, hud: &HudBuffer, mode: ColorMode) -> String {
    let mut out = String::new();
    encode_into(&mut out, color, hud, mode);
    out
}

/// Like [`encode`], reusing `out`'s allocation.
pub fn encode_into(out: &mut String, color: &ColorBuffer, hud: &HudBuffer, mode: ColorMode) {
    out.clear();
    out.reserve(color.len() * 24 + color.height);

    for y in 0..color.height {
        if y > 0 {
            out.push('\n');
        }
        for (x, &cell) in color.row(y).iter().enumerate() {
            write_color(out, Layer::Background, cell, mode);

            match hud.get(x, y).and_then(Option::as_deref) {
                Some(content) => out.push_str(content),
                None if mode == ColorMode::Ascii => out.push(ascii_glyph(cell)),
                None => out.push(' '),
            }
            out.push_str(RESET);
        }
    }
}
