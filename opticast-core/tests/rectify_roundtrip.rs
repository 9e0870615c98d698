use image::{Rgb, RgbImage};
use opticast_core::decode::decode_frame;
use opticast_core::encode::encode_frame;
use opticast_core::grid::GridConfig;
use opticast_core::rectify::{inner_quad_from_border, Homography, Point};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn rect_quad(w: f64, h: f64) -> [Point; 4] {
    [Point::new(0.0, 0.0), Point::new(w, 0.0), Point::new(w, h), Point::new(0.0, h)]
}

/// Paint `src` into a larger canvas so that its rectangle lands on
/// `quad`, by inverse-mapping every canvas pixel.
fn project_into_canvas(src: &RgbImage, quad: &[Point; 4], cw: u32, ch: u32) -> RgbImage {
    let (sw, sh) = src.dimensions();
    let back = Homography::from_points(quad, &rect_quad(f64::from(sw), f64::from(sh))).unwrap();
    let mut canvas = RgbImage::from_pixel(cw, ch, Rgb([32, 32, 32]));
    for y in 0..ch {
        for x in 0..cw {
            let s = back.apply(Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5));
            if s.x >= 0.0 && s.y >= 0.0 && (s.x as u32) < sw && (s.y as u32) < sh {
                canvas.put_pixel(x, y, *src.get_pixel(s.x as u32, s.y as u32));
            }
        }
    }
    canvas
}

/// Corners of the inner data grid, mapped into canvas space through the
/// same distortion.
fn inner_corners(quad: &[Point; 4], img_w: f64, img_h: f64, cell: f64) -> [Point; 4] {
    let fwd = Homography::from_points(&rect_quad(img_w, img_h), quad).unwrap();
    [
        fwd.apply(Point::new(cell, cell)),
        fwd.apply(Point::new(img_w - cell, cell)),
        fwd.apply(Point::new(img_w - cell, img_h - cell)),
        fwd.apply(Point::new(cell, img_h - cell)),
    ]
}

#[test]
fn exact_corners_on_undistorted_frame_round_trip() {
    let cfg = GridConfig::default();
    let img = encode_frame(b"corner aligned", 11, 11, &cfg).unwrap();
    let (w, h) = img.dimensions();
    let cell = f64::from(cfg.cell_px);
    let quad = rect_quad(f64::from(w), f64::from(h));
    let inner = inner_corners(&quad, f64::from(w), f64::from(h), cell);
    let got = decode_frame(&img, Some(&inner), &cfg).unwrap();
    assert_eq!(got.header.seq, 11);
    assert_eq!(got.payload, b"corner aligned");
}

#[test]
fn perspective_jitter_round_trips_bit_exactly() {
    let cfg = GridConfig::default();
    let mut rng = StdRng::seed_from_u64(7);
    let payload: Vec<u8> = (0..cfg.payload_capacity()).map(|_| rng.gen()).collect();
    let img = encode_frame(&payload, 3, 3, &cfg).unwrap();
    let (w, h) = img.dimensions();
    let (wf, hf) = (f64::from(w), f64::from(h));
    let cell = f64::from(cfg.cell_px);

    for trial in 0..4u64 {
        let mut rng = StdRng::seed_from_u64(100 + trial);
        // Place the frame with margin, then jitter each corner by up to
        // 10% of the image dimension on its axis.
        let jx = 0.10 * wf;
        let jy = 0.10 * hf;
        let mut quad = [
            Point::new(80.0, 80.0),
            Point::new(80.0 + wf, 80.0),
            Point::new(80.0 + wf, 80.0 + hf),
            Point::new(80.0, 80.0 + hf),
        ];
        for p in &mut quad {
            p.x += rng.gen_range(-jx..jx);
            p.y += rng.gen_range(-jy..jy);
        }
        let canvas = project_into_canvas(&img, &quad, w + 160, h + 160);
        let inner = inner_corners(&quad, wf, hf, cell);
        let got = decode_frame(&canvas, Some(&inner), &cfg)
            .unwrap_or_else(|e| panic!("trial {trial}: {e}"));
        assert_eq!(got.header.seq, 3, "trial {trial}");
        assert_eq!(got.payload, payload, "trial {trial}");
    }
}

#[test]
fn border_picks_map_to_the_same_inner_quad() {
    let cfg = GridConfig::default();
    let img = encode_frame(b"border picks", 9, 9, &cfg).unwrap();
    let (w, h) = img.dimensions();
    // Picks on the outer corners of the rendered fiducial border.
    let outer = rect_quad(f64::from(w), f64::from(h));
    let inner = inner_quad_from_border(&outer, &cfg).unwrap();
    let got = decode_frame(&img, Some(&inner), &cfg).unwrap();
    assert_eq!(got.header.seq, 9);
    assert_eq!(got.payload, b"border picks");
}
