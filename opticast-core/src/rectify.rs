//! Geometric recovery: perspective rectification of a captured frame.
//!
//! The receiver hands us four corner picks in image space, ordered
//! top-left, top-right, bottom-right, bottom-left. The quad they bound is
//! warped onto a canonical axis-aligned raster sized for clean
//! center-of-cell sampling.

use image::{Rgb, RgbImage};

use crate::grid::GridConfig;

/// Cell edge, in pixels, of the rectified raster.
pub const RECTIFY_CELL_PX: u32 = 10;

/// An image-space point in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A 3x3 projective transform between image planes.
#[derive(Clone, Copy, Debug)]
pub struct Homography {
    m: [f64; 9],
}

impl Homography {
    /// Solve the transform taking each `src[i]` to `dst[i]` via the
    /// four-point direct linear transform. Returns `None` for degenerate
    /// input (repeated or collinear points).
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        // Unknowns a..h with the bottom-right entry pinned to 1; each
        // correspondence contributes two rows of the 8x9 augmented system.
        let mut rows = [[0f64; 9]; 8];
        for (r, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
            rows[2 * r] = [s.x, s.y, 1.0, 0.0, 0.0, 0.0, -s.x * d.x, -s.y * d.x, d.x];
            rows[2 * r + 1] = [0.0, 0.0, 0.0, s.x, s.y, 1.0, -s.x * d.y, -s.y * d.y, d.y];
        }
        let sol = solve8(&mut rows)?;
        let mut m = [0f64; 9];
        m[..8].copy_from_slice(&sol);
        m[8] = 1.0;
        Some(Self { m })
    }

    /// Map one point through the transform.
    pub fn apply(&self, p: Point) -> Point {
        let m = &self.m;
        let w = m[6] * p.x + m[7] * p.y + m[8];
        Point::new(
            (m[0] * p.x + m[1] * p.y + m[2]) / w,
            (m[3] * p.x + m[4] * p.y + m[5]) / w,
        )
    }
}

/// Gauss-Jordan elimination with partial pivoting over an 8x9 augmented
/// system. `None` when the system is singular.
fn solve8(rows: &mut [[f64; 9]; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        let mut pivot = col;
        for r in col + 1..8 {
            if rows[r][col].abs() > rows[pivot][col].abs() {
                pivot = r;
            }
        }
        if rows[pivot][col].abs() < 1e-9 {
            return None;
        }
        rows.swap(col, pivot);
        let div = rows[col][col];
        for v in rows[col][col..].iter_mut() {
            *v /= div;
        }
        let prow = rows[col];
        for (r, row) in rows.iter_mut().enumerate() {
            if r == col || row[col] == 0.0 {
                continue;
            }
            let factor = row[col];
            for c in col..9 {
                row[c] -= factor * prow[c];
            }
        }
    }
    let mut out = [0f64; 8];
    for (i, row) in rows.iter().enumerate() {
        out[i] = row[8];
    }
    Some(out)
}

/// The destination rectangle corners for a `grid_w x grid_h` data grid,
/// in TL, TR, BR, BL order.
fn dest_quad(cfg: &GridConfig) -> [Point; 4] {
    let w = (cfg.grid_w as u32 * RECTIFY_CELL_PX) as f64;
    let h = (cfg.grid_h as u32 * RECTIFY_CELL_PX) as f64;
    [Point::new(0.0, 0.0), Point::new(w, 0.0), Point::new(w, h), Point::new(0.0, h)]
}

/// Perspective-warp the quad bounded by `corners` onto a canonical
/// `grid_w*10 x grid_h*10` raster, nearest-neighbor sampled. The quad is
/// mapped onto the data grid: exact cell alignment requires corners that
/// bound the data region (see [`inner_quad_from_border`] for picks on the
/// fiducial border). `None` when the corner quad is degenerate.
pub fn rectify(img: &RgbImage, corners: &[Point; 4], cfg: &GridConfig) -> Option<RgbImage> {
    let dst_w = cfg.grid_w as u32 * RECTIFY_CELL_PX;
    let dst_h = cfg.grid_h as u32 * RECTIFY_CELL_PX;
    // Inverse mapping: destination pixel centers back into the source.
    let h = Homography::from_points(&dest_quad(cfg), corners)?;
    let (src_w, src_h) = img.dimensions();
    let mut out = RgbImage::new(dst_w, dst_h);
    for y in 0..dst_h {
        for x in 0..dst_w {
            let s = h.apply(Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5));
            let sx = (s.x.round().max(0.0) as u32).min(src_w - 1);
            let sy = (s.y.round().max(0.0) as u32).min(src_h - 1);
            out.put_pixel(x, y, Rgb(img.get_pixel(sx, sy).0));
        }
    }
    Some(out)
}

/// Given picks on the four outer corners of the rendered fiducial border,
/// compute the corners of the inner data region by pushing the inner
/// rectangle of the bordered cell grid through the quad's homography.
pub fn inner_quad_from_border(corners: &[Point; 4], cfg: &GridConfig) -> Option<[Point; 4]> {
    let bw = (cfg.grid_w + 2) as f64;
    let bh = (cfg.grid_h + 2) as f64;
    let outer = [
        Point::new(0.0, 0.0),
        Point::new(bw, 0.0),
        Point::new(bw, bh),
        Point::new(0.0, bh),
    ];
    let h = Homography::from_points(&outer, corners)?;
    let iw = bw - 1.0;
    let ih = bh - 1.0;
    Some([
        h.apply(Point::new(1.0, 1.0)),
        h.apply(Point::new(iw, 1.0)),
        h.apply(Point::new(iw, ih)),
        h.apply(Point::new(1.0, ih)),
    ])
}
