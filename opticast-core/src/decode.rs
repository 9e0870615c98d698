//! Frame decoding: rectify, sample, cluster, unpack, validate.

use image::RgbImage;

use crate::cluster;
use crate::error::FrameError;
use crate::grid::GridConfig;
use crate::header::FrameHeader;
use crate::rectify::{self, Point, RECTIFY_CELL_PX};
use crate::symbol::unpack_symbols;

/// A successfully decoded frame: validated header plus the payload
/// trimmed to the declared length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedFrame {
    pub header: FrameHeader,
    pub payload: Vec<u8>,
}

/// Decode one captured raster.
///
/// With `corners` (TL, TR, BR, BL picks bounding the data grid) the image
/// is perspective-rectified first; without them the decoder samples the
/// raster directly, inferring from the aspect ratio whether the one-cell
/// fiducial border is still present.
///
/// All failures are per-frame: discard the frame and keep capturing.
pub fn decode_frame(
    img: &RgbImage,
    corners: Option<&[Point; 4]>,
    cfg: &GridConfig,
) -> Result<DecodedFrame, FrameError> {
    let samples = match corners {
        Some(quad) => match rectify::rectify(img, quad, cfg) {
            Some(warped) => {
                let cell = f64::from(RECTIFY_CELL_PX);
                cluster::sample_cells(&warped, 0, cell, cell, cfg)
            }
            None => {
                log::warn!("degenerate corner quad, sampling unrectified image");
                direct_samples(img, cfg)
            }
        },
        None => direct_samples(img, cfg),
    };
    let symbols = cluster::classify_symbols(&samples);

    let header_bytes = unpack_symbols(&symbols[..cfg.header_symbols()], cfg.bits_per_symbol);
    let header = FrameHeader::parse(&header_bytes)?;

    let mut payload = unpack_symbols(&symbols[cfg.header_symbols()..], cfg.bits_per_symbol);
    let declared = header.payload_len as usize;
    if payload.len() < declared {
        return Err(FrameError::FrameTruncated { declared, got: payload.len() });
    }
    payload.truncate(declared);
    Ok(DecodedFrame { header, payload })
}

/// Direct mode: no corner picks. Encoder output always carries the
/// one-cell border; third-party rasters may not, so the divisor is chosen
/// by whichever aspect ratio the image is closer to.
fn direct_samples(img: &RgbImage, cfg: &GridConfig) -> Vec<[f64; 3]> {
    let (w, h) = img.dimensions();
    let ratio = f64::from(w) / f64::from(h);
    let with_border = (cfg.grid_w + 2) as f64 / (cfg.grid_h + 2) as f64;
    let without = cfg.grid_w as f64 / cfg.grid_h as f64;
    let exact = w % (cfg.grid_w as u32 + 2) == 0 && h % (cfg.grid_h as u32 + 2) == 0;
    let closer = (ratio - with_border).abs() < (ratio - without).abs();
    let border = usize::from(exact || closer);

    let cell_w = f64::from(w) / (cfg.grid_w + 2 * border) as f64;
    let cell_h = f64::from(h) / (cfg.grid_h + 2 * border) as f64;
    cluster::sample_cells(img, border, cell_w, cell_h, cfg)
}
