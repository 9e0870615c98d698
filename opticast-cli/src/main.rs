use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use opticast_core::chunking;
use opticast_core::decode::{decode_frame, DecodedFrame};
use opticast_core::encode::encode_frame;
use opticast_core::grid::GridConfig;
use opticast_core::manifest::Manifest;
use opticast_core::path_safety::safe_join;
use opticast_core::progress::Progress;
use opticast_core::reassemble::Reassembler;
use opticast_core::rectify::{inner_quad_from_border, Point};
use opticast_core::resume::ResumeState;
use opticast_core::verify::verify_files;

#[derive(Parser)]
#[command(name = "opticast", version, about = "one-way optical file transport")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Build a session: manifest plus rendered grid frames
    Send {
        /// File or directory to send
        input: PathBuf,
        /// Output directory for manifest.json and frame images
        #[arg(long, default_value = "frames")]
        out: PathBuf,
        /// Payload bytes per frame (default: one frame's capacity)
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        include: Vec<String>,
        #[arg(long)]
        exclude: Vec<String>,
        #[arg(long, default_value_t = false)]
        progress: bool,
    },
    /// Decode captured frames and reconstruct the file set
    Recv {
        /// Directory of captured frame images
        frames: PathBuf,
        /// Output directory for reconstructed files
        #[arg(long, default_value = "received")]
        out: PathBuf,
        /// Manifest path (default: manifest.json inside the frames dir)
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Corner picks "x,y,x,y,x,y,x,y" in TL,TR,BR,BL order, applied
        /// to every frame
        #[arg(long)]
        corners: Option<String>,
        /// Corner picks bound the fiducial border instead of the data grid
        #[arg(long, default_value_t = false)]
        border_corners: bool,
        /// Resume descriptor; skips frames already received in prior runs
        #[arg(long)]
        resume: Option<PathBuf>,
        /// Write a gapped stream when frames are missing
        #[arg(long, default_value_t = false)]
        allow_gaps: bool,
        #[arg(long, default_value_t = false)]
        progress: bool,
    },
    /// Decode one captured frame and print its header
    Inspect {
        image: PathBuf,
        #[arg(long)]
        corners: Option<String>,
        #[arg(long, default_value_t = false)]
        border_corners: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Send { input, out, chunk_size, include, exclude, progress } => {
            send(&input, &out, chunk_size, &include, &exclude, progress)
        }
        Cmd::Recv {
            frames,
            out,
            manifest,
            corners,
            border_corners,
            resume,
            allow_gaps,
            progress,
        } => recv(
            &frames,
            &out,
            manifest.as_deref(),
            corners.as_deref(),
            border_corners,
            resume.as_deref(),
            allow_gaps,
            progress,
        ),
        Cmd::Inspect { image, corners, border_corners } => {
            inspect(&image, corners.as_deref(), border_corners)
        }
    }
}

fn build_globset(
    includes: &[String],
    excludes: &[String],
) -> Result<(globset::GlobSet, globset::GlobSet)> {
    let mut incb = GlobSetBuilder::new();
    let mut excb = GlobSetBuilder::new();
    if includes.is_empty() {
        incb.add(Glob::new("**/*")?);
    }
    for g in includes {
        incb.add(Glob::new(g)?);
    }
    for g in excludes {
        excb.add(Glob::new(g)?);
    }
    Ok((incb.build()?, excb.build()?))
}

fn send(
    input: &Path,
    out: &Path,
    chunk_size: Option<usize>,
    include: &[String],
    exclude: &[String],
    progress: bool,
) -> Result<()> {
    let cfg = GridConfig::default();
    let chunk_size = chunk_size.unwrap_or_else(|| cfg.payload_capacity());
    if chunk_size > cfg.payload_capacity() {
        bail!("chunk_size {} exceeds frame capacity {}", chunk_size, cfg.payload_capacity());
    }
    fs::create_dir_all(out).with_context(|| format!("create dir {:?}", out))?;

    let (inc, exc) = build_globset(include, exclude)?;
    let manifest =
        Manifest::build_with_filter(input, chunk_size, |rel| inc.is_match(rel) && !exc.is_match(rel))?;
    manifest.save(&out.join("manifest.json"))?;

    let prog = Progress::new(progress);
    prog.set_stage("encoding frames");
    prog.set_frames_total(manifest.total_chunks as usize);
    prog.start();

    let mut seq = 0u32;
    for fe in &manifest.files {
        let path = if input.is_dir() { input.join(&fe.path) } else { input.to_path_buf() };
        for part in chunking::chunks(&path, chunk_size)? {
            let (_idx, data) = part?;
            let img = encode_frame(&data, seq, seq, &cfg)
                .map_err(|e| anyhow!("encode frame {}: {}", seq, e))?;
            img.save(out.join(format!("frame_{seq:05}.png")))
                .with_context(|| format!("write frame {}", seq))?;
            prog.inc_frame();
            prog.add_bytes(data.len());
            seq += 1;
        }
    }
    prog.stop();
    println!("session {}: {} frames written to {}", manifest.session_id, seq, out.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn recv(
    frames: &Path,
    out: &Path,
    manifest: Option<&Path>,
    corners: Option<&str>,
    border_corners: bool,
    resume: Option<&Path>,
    allow_gaps: bool,
    progress: bool,
) -> Result<()> {
    let cfg = GridConfig::default();
    if !frames.is_dir() {
        bail!("frames directory not found: {}", frames.display());
    }
    fs::create_dir_all(out).with_context(|| format!("create dir {:?}", out))?;

    let manifest_path = manifest.map(Path::to_path_buf).unwrap_or_else(|| frames.join("manifest.json"));
    let manifest = match Manifest::load(&manifest_path) {
        Ok(m) => {
            println!(
                "session {}: {} files, {} chunks expected",
                m.session_id,
                m.files.len(),
                m.total_chunks
            );
            Some(m)
        }
        Err(e) => {
            log::warn!("no usable manifest at {:?} ({e:#}); session is open-ended", manifest_path);
            None
        }
    };

    let quad = parse_corners(corners, border_corners, &cfg)?;
    let frame_files = list_frames(frames)?;
    if frame_files.is_empty() {
        bail!("no frame images in {}", frames.display());
    }

    let mut asm = Reassembler::new(manifest.as_ref().map(|m| m.total_chunks));
    let spool = out.join("chunks");
    let mut resume_state = match resume {
        Some(p) => {
            let st = ResumeState::load(p);
            preload_spool(&mut asm, &st, &spool);
            Some(st)
        }
        None => None,
    };

    let prog = Progress::new(progress);
    prog.set_stage("decoding frames");
    prog.set_frames_total(frame_files.len());
    prog.start();

    // Frame decode is referentially transparent, so frames fan out across
    // the pool; the reassembler is fed sequentially afterwards.
    let decoded: Vec<DecodedFrame> = frame_files
        .par_iter()
        .filter_map(|path| {
            let img = match image::open(path) {
                Ok(i) => i.to_rgb8(),
                Err(e) => {
                    log::warn!("unreadable image {:?}: {}", path, e);
                    return None;
                }
            };
            let res = decode_frame(&img, quad.as_ref(), &cfg);
            prog.inc_frame();
            match res {
                Ok(f) => {
                    prog.add_bytes(f.payload.len());
                    Some(f)
                }
                Err(e) => {
                    log::warn!("rejected {:?}: {}", path, e);
                    None
                }
            }
        })
        .collect();
    prog.stop();

    let mut fresh = 0usize;
    let decoded_count = decoded.len();
    for f in decoded {
        let seq = f.header.seq;
        if asm.accept(&f.header, f.payload.clone()) {
            fresh += 1;
            if let Some(st) = resume_state.as_mut() {
                spool_chunk(&spool, seq, &f.payload)?;
                st.mark(seq);
            }
        }
    }
    if let Some(st) = &resume_state {
        st.save()?;
    }
    println!(
        "{} of {} captures decoded ({} new); {} of {} received",
        decoded_count,
        frame_files.len(),
        fresh,
        asm.received(),
        manifest.as_ref().map(|m| m.total_chunks.to_string()).unwrap_or_else(|| "?".into())
    );

    let blob = out.join("reconstructed.bin");
    match asm.finalize(&blob) {
        Ok(()) => {}
        Err(opticast_core::error::ReassembleError::MissingFrames(missing)) => {
            if !allow_gaps {
                bail!("missing frames {:?}; re-run after more captures or pass --allow-gaps", missing);
            }
            log::warn!("writing gapped stream; missing frames {:?}", missing);
            asm.write_partial(&blob)?;
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(mf) = &manifest {
        split_blob(mf, &blob, out)?;
        fs::remove_file(&blob).ok();
        let rep = verify_files(mf, out)?;
        println!("verify: {} files OK, {} bad", rep.files_ok, rep.files_bad);
        if rep.files_bad > 0 {
            bail!("{} files failed verification", rep.files_bad);
        }
    } else {
        println!("no manifest; raw stream at {}", blob.display());
    }
    Ok(())
}

fn inspect(image: &Path, corners: Option<&str>, border_corners: bool) -> Result<()> {
    let cfg = GridConfig::default();
    let img = image::open(image).with_context(|| format!("open {:?}", image))?.to_rgb8();
    let quad = parse_corners(corners, border_corners, &cfg)?;
    match decode_frame(&img, quad.as_ref(), &cfg) {
        Ok(f) => {
            println!(
                "seq {} chunk {} payload {} bytes",
                f.header.seq,
                f.header.chunk_idx,
                f.payload.len()
            );
            Ok(())
        }
        Err(e) => bail!("frame invalid: {}", e),
    }
}

/// Parse "x,y,x,y,x,y,x,y" picks in TL,TR,BR,BL order; with
/// `border_corners` the picks are mapped from the fiducial border onto
/// the inner data grid.
fn parse_corners(
    picks: Option<&str>,
    border_corners: bool,
    cfg: &GridConfig,
) -> Result<Option<[Point; 4]>> {
    let Some(s) = picks else { return Ok(None) };
    let nums = s
        .split(',')
        .map(|t| t.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("parse corner coordinates")?;
    if nums.len() != 8 {
        bail!("expected 8 comma-separated coordinates, got {}", nums.len());
    }
    let quad = [
        Point::new(nums[0], nums[1]),
        Point::new(nums[2], nums[3]),
        Point::new(nums[4], nums[5]),
        Point::new(nums[6], nums[7]),
    ];
    if border_corners {
        let inner = inner_quad_from_border(&quad, cfg)
            .ok_or_else(|| anyhow!("degenerate corner quad"))?;
        Ok(Some(inner))
    } else {
        Ok(Some(quad))
    }
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().map(|s| s == "png").unwrap_or(false)
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("frame_"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

fn spool_chunk(spool: &Path, seq: u32, payload: &[u8]) -> Result<()> {
    fs::create_dir_all(spool)?;
    fs::write(spool.join(format!("chunk_{seq:05}.bin")), payload)
        .with_context(|| format!("spool chunk {}", seq))?;
    Ok(())
}

/// Re-load payloads spooled by earlier runs for every seq the resume
/// descriptor records.
fn preload_spool(asm: &mut Reassembler, st: &ResumeState, spool: &Path) {
    use opticast_core::header::FrameHeader;
    let mut loaded = 0usize;
    for seq in st.seqs() {
        let p = spool.join(format!("chunk_{seq:05}.bin"));
        match fs::read(&p) {
            Ok(payload) => {
                let len = payload.len() as u32;
                asm.accept(&FrameHeader::new(seq, seq, len), payload);
                loaded += 1;
            }
            Err(e) => log::warn!("resume lists seq {} but spool read failed: {}", seq, e),
        }
    }
    if loaded > 0 {
        println!("resumed {} frames from spool", loaded);
    }
}

fn split_blob(mf: &Manifest, blob: &Path, out: &Path) -> Result<()> {
    let mut reader = BufReader::new(File::open(blob).with_context(|| format!("open {:?}", blob))?);
    for fe in &mf.files {
        let dest = safe_join(out, Path::new(&fe.path))?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer =
            BufWriter::new(File::create(&dest).with_context(|| format!("create {:?}", dest))?);
        let copied = std::io::copy(&mut (&mut reader).take(fe.size), &mut writer)?;
        if copied < fe.size {
            log::warn!("{}: short by {} bytes", fe.path, fe.size - copied);
        }
    }
    Ok(())
}
