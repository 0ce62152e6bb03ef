/// Heads-up display: crosshair, inventory bar, status line and debug overlay.
/// Everything here is written straight into HUD cells, which the encoder
/// prints instead of the cell's blank glyph.
use crate::rendering::encoder::{write_color, ColorMode, Layer};
use crate::rendering::framebuffer::{DebugBuffer, HudBuffer};
use crate::voxel::BlockType;
use glam::Vec3;

/// Cells per inventory slot: `[`, glyph, `]`.
pub const SLOT_WIDTH: usize = 3;

const DEBUG_COLOR: Vec3 = Vec3::ONE;

/// Everything the HUD shows for one frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct HudState<'a> {
    pub selected_block: BlockType,
    pub status: Option<&'a str>,
    /// Escapes in HUD cells use the same palette as the frame.
    pub color_mode: ColorMode,
}

/// Draw crosshair, inventory bar and status line.
pub fn draw_hud(hud: &mut HudBuffer, state: &HudState<'_>) {
    let (width, height) = (hud.width, hud.height);
    if width == 0 || height == 0 {
        return;
    }

    hud.set(width / 2, height / 2, Some("+".to_string()));
    draw_inventory(hud, state.selected_block, state.color_mode);

    if let Some(status) = state.status {
        if height >= 2 {
            draw_text_centered(hud, height - 2, status);
        }
    }
}

/// One slot per placeable block along the bottom row, centred. The
/// selected slot is bracketed.
pub fn draw_inventory(hud: &mut HudBuffer, selected: BlockType, mode: ColorMode) {
    let Some(y) = hud.height.checked_sub(1) else {
        return;
    };
    let bar_width = BlockType::PLACEABLE.len() * SLOT_WIDTH;
    let start = hud.width.saturating_sub(bar_width) / 2;

    for (slot, block) in BlockType::PLACEABLE.iter().enumerate() {
        let x = start + slot * SLOT_WIDTH;
        let [r, g, b] = block.color();
        let color = Vec3::new(r as f32, g as f32, b as f32) / 255.0;

        let mut glyph = String::new();
        write_color(&mut glyph, Layer::Foreground, color, mode);
        glyph.push(block.hud_glyph());
        hud.set(x + 1, y, Some(glyph));

        if *block == selected {
            hud.set(x, y, Some("[".to_string()));
            hud.set(x + 2, y, Some("]".to_string()));
        }
    }
}

fn draw_text_centered(hud: &mut HudBuffer, y: usize, text: &str) {
    let len = text.chars().count();
    let start = hud.width.saturating_sub(len) / 2;
    for (i, c) in text.chars().enumerate() {
        hud.set(start + i, y, Some(c.to_string()));
    }
}

/// Lay `text` out one character per cell from the top-left corner,
/// splitting on newlines and clipping at the buffer edges.
pub fn layout_debug_text(debug: &mut DebugBuffer, text: &str) {
    for (y, line) in text.lines().enumerate().take(debug.height) {
        for (x, c) in line.chars().enumerate().take(debug.width) {
            debug.set(x, y, Some(c));
        }
    }
}

/// Copy debug characters over the HUD; they win over every other element.
pub fn overlay_debug(hud: &mut HudBuffer, debug: &DebugBuffer, mode: ColorMode) {
    let mut prefix = String::new();
    write_color(&mut prefix, Layer::Foreground, DEBUG_COLOR, mode);
    for y in 0..debug.height {
        for (x, cell) in debug.row(y).iter().enumerate() {
            if let Some(c) = cell {
                let mut content = prefix.clone();
                content.push(*c);
                hud.set(x, y, Some(content));
            }
        }
    }
}
