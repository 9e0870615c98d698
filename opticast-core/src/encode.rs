use image::{Rgb, RgbImage};

use crate::error::FrameError;
use crate::grid::{GridConfig, PALETTE};
use crate::header::FrameHeader;
use crate::symbol::pack_symbols;

// The fiducial border reuses palette slots: a white ring with solid red
// corner cells, so the receiver's corner picker has four fixed targets.
const RING: [u8; 3] = PALETTE[1];
const CORNER: [u8; 3] = PALETTE[2];

fn fill_cell(img: &mut RgbImage, cx: u32, cy: u32, cell: u32, color: [u8; 3]) {
    for py in cy * cell..(cy + 1) * cell {
        for px in cx * cell..(cx + 1) * cell {
            img.put_pixel(px, py, Rgb(color));
        }
    }
}

/// Render one payload slab as a bordered color-grid raster.
///
/// The grid is framed by a one-cell fiducial border, so the output spans
/// `(grid_w + 2) x (grid_h + 2)` cells; only the inner cells are data.
/// Output is byte-exact for fixed input and parameters.
pub fn encode_frame(
    payload: &[u8],
    seq: u32,
    chunk_idx: u32,
    cfg: &GridConfig,
) -> Result<RgbImage, FrameError> {
    let capacity = cfg.payload_capacity();
    if payload.len() > capacity {
        return Err(FrameError::PayloadTooLarge { len: payload.len(), capacity });
    }

    let header = FrameHeader::new(seq, chunk_idx, payload.len() as u32);
    let mut symbols = pack_symbols(&header.to_bytes(), cfg.bits_per_symbol);
    debug_assert!(symbols.len() <= cfg.header_symbols(), "header overflows reserved rows");
    symbols.resize(cfg.header_symbols(), 0);

    let mut data_symbols = pack_symbols(payload, cfg.bits_per_symbol);
    data_symbols.resize(cfg.payload_symbols(), 0);
    symbols.append(&mut data_symbols);

    let cell = cfg.cell_px;
    let cells_w = cfg.grid_w as u32 + 2;
    let cells_h = cfg.grid_h as u32 + 2;
    let mut img = RgbImage::from_pixel(cells_w * cell, cells_h * cell, Rgb(RING));
    for (cx, cy) in [(0, 0), (cells_w - 1, 0), (cells_w - 1, cells_h - 1), (0, cells_h - 1)] {
        fill_cell(&mut img, cx, cy, cell, CORNER);
    }
    for y in 0..cfg.grid_h {
        for x in 0..cfg.grid_w {
            let sym = symbols[y * cfg.grid_w + x] as usize;
            fill_cell(&mut img, x as u32 + 1, y as u32 + 1, cell, PALETTE[sym % PALETTE.len()]);
        }
    }
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_dimensions_include_border() {
        let cfg = GridConfig::default();
        let img = encode_frame(b"abc", 0, 0, &cfg).unwrap();
        assert_eq!(img.dimensions(), (66 * 12, 38 * 12));
    }

    #[test]
    fn border_ring_is_white_with_red_corners() {
        let cfg = GridConfig::default();
        let img = encode_frame(&[], 0, 0, &cfg).unwrap();
        // corner cell center, then a ring cell between corners
        assert_eq!(img.get_pixel(6, 6).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(5 * 12 + 6, 6).0, [255, 255, 255]);
    }
}
