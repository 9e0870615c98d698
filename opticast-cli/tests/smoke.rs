use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::process::Command;

fn write_random(path: &std::path::Path, bytes: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<u8> = (0..bytes).map(|_| rng.gen()).collect();
    std::fs::write(path, data).unwrap();
}

#[test]
fn send_recv_single_file_round_trip() {
    let td = assert_fs::TempDir::new().unwrap();
    let input = td.child("payload.bin");
    write_random(input.path(), 1800, 1); // 4 frames at 544 B/frame

    Command::cargo_bin("opticast")
        .unwrap()
        .current_dir(td.path())
        .args(["send", "payload.bin", "--out", "frames"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 frames written"));

    td.child("frames/manifest.json").assert(predicate::path::exists());
    td.child("frames/frame_00000.png").assert(predicate::path::exists());
    td.child("frames/frame_00003.png").assert(predicate::path::exists());

    Command::cargo_bin("opticast")
        .unwrap()
        .current_dir(td.path())
        .args(["recv", "frames", "--out", "rx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files OK, 0 bad"));

    let sent = std::fs::read(input.path()).unwrap();
    let got = std::fs::read(td.child("rx/payload.bin").path()).unwrap();
    assert_eq!(got, sent);
}

#[test]
fn send_recv_directory_round_trip() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = td.child("data");
    data.create_dir_all().unwrap();
    data.child("sub").create_dir_all().unwrap();
    write_random(data.child("a.bin").path(), 700, 2);
    write_random(data.child("sub/b.bin").path(), 1200, 3);

    Command::cargo_bin("opticast")
        .unwrap()
        .current_dir(td.path())
        .args(["send", "data", "--out", "frames"])
        .assert()
        .success();

    Command::cargo_bin("opticast")
        .unwrap()
        .current_dir(td.path())
        .args(["recv", "frames", "--out", "rx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 files OK, 0 bad"));

    assert_eq!(
        std::fs::read(td.child("rx/a.bin").path()).unwrap(),
        std::fs::read(data.child("a.bin").path()).unwrap()
    );
    assert_eq!(
        std::fs::read(td.child("rx/sub/b.bin").path()).unwrap(),
        std::fs::read(data.child("sub/b.bin").path()).unwrap()
    );
}

#[test]
fn missing_frame_aborts_unless_gaps_allowed() {
    let td = assert_fs::TempDir::new().unwrap();
    let input = td.child("payload.bin");
    write_random(input.path(), 1800, 4);

    Command::cargo_bin("opticast")
        .unwrap()
        .current_dir(td.path())
        .args(["send", "payload.bin", "--out", "frames"])
        .assert()
        .success();

    std::fs::remove_file(td.child("frames/frame_00001.png").path()).unwrap();

    Command::cargo_bin("opticast")
        .unwrap()
        .current_dir(td.path())
        .args(["recv", "frames", "--out", "rx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing frames"));
}

#[test]
fn inspect_prints_header_fields() {
    let td = assert_fs::TempDir::new().unwrap();
    let input = td.child("payload.bin");
    write_random(input.path(), 100, 5);

    Command::cargo_bin("opticast")
        .unwrap()
        .current_dir(td.path())
        .args(["send", "payload.bin", "--out", "frames"])
        .assert()
        .success();

    Command::cargo_bin("opticast")
        .unwrap()
        .current_dir(td.path())
        .args(["inspect", "frames/frame_00000.png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("seq 0 chunk 0 payload 100 bytes"));
}

#[test]
fn exclude_glob_filters_the_walk() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = td.child("data");
    data.create_dir_all().unwrap();
    write_random(data.child("keep.bin").path(), 300, 6);
    write_random(data.child("skip.tmp").path(), 300, 7);

    Command::cargo_bin("opticast")
        .unwrap()
        .current_dir(td.path())
        .args(["send", "data", "--out", "frames", "--exclude", "*.tmp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 frames written"));

    let manifest = std::fs::read_to_string(td.child("frames/manifest.json").path()).unwrap();
    assert!(manifest.contains("keep.bin"));
    assert!(!manifest.contains("skip.tmp"));
}

#[test]
fn resume_skips_frames_across_runs() {
    let td = assert_fs::TempDir::new().unwrap();
    let input = td.child("payload.bin");
    write_random(input.path(), 1800, 8);

    Command::cargo_bin("opticast")
        .unwrap()
        .current_dir(td.path())
        .args(["send", "payload.bin", "--out", "frames"])
        .assert()
        .success();

    // First run sees only half the frames.
    std::fs::create_dir(td.child("partial").path()).unwrap();
    std::fs::copy(
        td.child("frames/manifest.json").path(),
        td.child("partial/manifest.json").path(),
    )
    .unwrap();
    for i in [0, 2] {
        let name = format!("frame_{i:05}.png");
        std::fs::copy(
            td.child("frames").path().join(&name),
            td.child("partial").path().join(&name),
        )
        .unwrap();
    }

    Command::cargo_bin("opticast")
        .unwrap()
        .current_dir(td.path())
        .args([
            "recv", "partial", "--out", "rx", "--resume", "resume.json", "--allow-gaps",
        ])
        .assert()
        .failure(); // gapped stream cannot verify against the manifest

    td.child("resume.json").assert(predicate::path::exists());

    // Second run over the full capture set completes the session.
    Command::cargo_bin("opticast")
        .unwrap()
        .current_dir(td.path())
        .args(["recv", "frames", "--out", "rx", "--resume", "resume.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files OK, 0 bad"));

    assert_eq!(
        std::fs::read(td.child("rx/payload.bin").path()).unwrap(),
        std::fs::read(input.path()).unwrap()
    );
}
