use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::{Duration, Instant};

/// Background progress ticker for long send/receive runs. Counters are
/// shared atomics so worker code updates them without locking; a spawned
/// thread prints a line every few seconds until stopped.
#[derive(Clone)]
pub struct Progress {
    enabled: bool,
    pub stage: Arc<Mutex<String>>,
    pub frames_done: Arc<AtomicUsize>,
    pub frames_total: Arc<AtomicUsize>,
    pub bytes_done: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            stage: Arc::new(Mutex::new(String::new())),
            frames_done: Arc::new(AtomicUsize::new(0)),
            frames_total: Arc::new(AtomicUsize::new(0)),
            bytes_done: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_stage(&self, s: &str) {
        if self.enabled {
            *self.stage.lock().unwrap() = s.to_string();
        }
    }

    pub fn set_frames_total(&self, n: usize) {
        self.frames_total.store(n, Ordering::Relaxed);
    }

    pub fn inc_frame(&self) {
        self.frames_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes(&self, n: usize) {
        self.bytes_done.fetch_add(n, Ordering::Relaxed);
    }

    pub fn start(&self) {
        if !self.enabled {
            return;
        }
        self.running.store(true, Ordering::Relaxed);
        let stage = self.stage.clone();
        let frames_done = self.frames_done.clone();
        let frames_total = self.frames_total.clone();
        let bytes_done = self.bytes_done.clone();
        let running = self.running.clone();
        thread::spawn(move || {
            let t0 = Instant::now();
            while running.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_secs(2));
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                let s = stage.lock().unwrap().clone();
                let fd = frames_done.load(Ordering::Relaxed);
                let ft = frames_total.load(Ordering::Relaxed);
                let bd = bytes_done.load(Ordering::Relaxed);
                eprintln!(
                    "[{:>4}s] {} | frames {}/{} | {} KiB",
                    t0.elapsed().as_secs(),
                    s,
                    fd,
                    ft,
                    bd / 1024
                );
            }
        });
    }

    pub fn stop(&self) {
        if self.enabled {
            self.running.store(false, Ordering::Relaxed);
        }
    }
}
