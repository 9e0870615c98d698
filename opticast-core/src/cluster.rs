//! Photometric recovery: per-cell sampling and palette-seeded k-means.
//!
//! Camera capture shifts the rendered colors (white turns gray, red goes
//! dim), so fixed thresholds against the palette misclassify. Instead the
//! four centroids start at the canonical palette and adapt to the frame's
//! actual colors; the seeding preserves the symbol <-> centroid
//! correspondence, so labels come out as symbols directly.

use image::RgbImage;

use crate::grid::{GridConfig, PALETTE};

const MAX_ITERS: usize = 10;
// Squared RGB distance below which a centroid counts as settled.
const CONVERGED_DIST2: f64 = 1.0;

/// Read one RGB sample per data cell at the cell center, clamped to the
/// raster bounds. `border` is the count of fiducial cells to skip on each
/// axis; `cell_w`/`cell_h` are the cell pitch in pixels of `img`.
pub fn sample_cells(
    img: &RgbImage,
    border: usize,
    cell_w: f64,
    cell_h: f64,
    cfg: &GridConfig,
) -> Vec<[f64; 3]> {
    let (w, h) = img.dimensions();
    let mut samples = Vec::with_capacity(cfg.total_symbols());
    for y in 0..cfg.grid_h {
        for x in 0..cfg.grid_w {
            let px = ((((x + border) as f64 + 0.5) * cell_w) as u32).min(w - 1);
            let py = ((((y + border) as f64 + 0.5) * cell_h) as u32).min(h - 1);
            let p = img.get_pixel(px, py).0;
            samples.push([f64::from(p[0]), f64::from(p[1]), f64::from(p[2])]);
        }
    }
    samples
}

fn dist2(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

fn nearest(centroids: &[[f64; 3]; 4], s: [f64; 3]) -> usize {
    let mut best = 0;
    let mut best_d = f64::MAX;
    for (i, c) in centroids.iter().enumerate() {
        let d = dist2(*c, s);
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

/// Cluster cell samples to symbols.
///
/// Up to ten k-means iterations from the palette seed; an empty cluster
/// keeps its previous centroid, and iteration stops once every centroid
/// moves by less than 1.0 in RGB distance. Clusters are never re-sorted.
pub fn classify_symbols(samples: &[[f64; 3]]) -> Vec<u8> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mut centroids = [[0f64; 3]; 4];
    for (c, p) in centroids.iter_mut().zip(PALETTE.iter()) {
        *c = [f64::from(p[0]), f64::from(p[1]), f64::from(p[2])];
    }

    for iter in 0..MAX_ITERS {
        let mut sums = [[0f64; 3]; 4];
        let mut counts = [0usize; 4];
        for &s in samples {
            let k = nearest(&centroids, s);
            sums[k][0] += s[0];
            sums[k][1] += s[1];
            sums[k][2] += s[2];
            counts[k] += 1;
        }
        let mut moved = 0f64;
        for k in 0..4 {
            if counts[k] == 0 {
                continue;
            }
            let n = counts[k] as f64;
            let next = [sums[k][0] / n, sums[k][1] / n, sums[k][2] / n];
            moved = moved.max(dist2(centroids[k], next));
            centroids[k] = next;
        }
        if moved < CONVERGED_DIST2 {
            log::debug!("k-means converged after {} iterations", iter + 1);
            break;
        }
    }

    samples.iter().map(|&s| nearest(&centroids, s) as u8).collect()
}
