//! Frame capture for the presence channel
//!
//! A `FrameSource` hands out JPEG frames; the `CaptureLoop` pulls one per
//! tick and encodes it for the socket. Sending is fire-and-forget.

use crate::{ChatError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Something that can produce camera frames
pub trait FrameSource: Send {
    /// Grab the current frame as JPEG bytes, if one is available
    fn capture(&mut self) -> Option<Vec<u8>>;

    /// Short description for logs and the debug panel
    fn describe(&self) -> String;
}

/// Camera unavailable. Never yields a frame.
#[derive(Debug, Default)]
pub struct NoFrameSource;

impl FrameSource for NoFrameSource {
    fn capture(&mut self) -> Option<Vec<u8>> {
        None
    }

    fn describe(&self) -> String {
        "no camera".to_string()
    }
}

/// Cycles through the JPEG files of a directory
#[derive(Debug)]
pub struct DirectoryFrameSource {
    dir: PathBuf,
    frames: Vec<PathBuf>,
    next: usize,
}

impl DirectoryFrameSource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let mut frames: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_jpeg(path))
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(ChatError::Capability(format!("no JPEG frames in {:?}", dir)));
        }

        info!("Frame source: {} frames from {:?}", frames.len(), dir);
        Ok(Self {
            dir,
            frames,
            next: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

impl FrameSource for DirectoryFrameSource {
    fn capture(&mut self) -> Option<Vec<u8>> {
        let path = &self.frames[self.next % self.frames.len()];
        self.next = self.next.wrapping_add(1);

        match std::fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Failed to read frame {:?}: {}", path, e);
                None
            }
        }
    }

    fn describe(&self) -> String {
        format!("{} frames in {}", self.frames.len(), self.dir.display())
    }
}

/// Fixed in-memory frames, played in a loop
#[derive(Debug, Clone, Default)]
pub struct MemoryFrameSource {
    frames: Vec<Vec<u8>>,
    next: usize,
}

impl MemoryFrameSource {
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self { frames, next: 0 }
    }
}

impl FrameSource for MemoryFrameSource {
    fn capture(&mut self) -> Option<Vec<u8>> {
        if self.frames.is_empty() {
            return None;
        }
        let frame = self.frames[self.next % self.frames.len()].clone();
        self.next = self.next.wrapping_add(1);
        Some(frame)
    }

    fn describe(&self) -> String {
        format!("{} in-memory frames", self.frames.len())
    }
}

/// Base64 without a data-URL prefix, as the backend expects
pub fn encode_frame(jpeg: &[u8]) -> String {
    STANDARD.encode(jpeg)
}

/// A frame ready for the wire
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Raw JPEG, kept for the preview pane
    pub jpeg: Arc<Vec<u8>>,
    /// Base64 payload
    pub encoded: String,
}

/// Pulls frames at a fixed rate until stopped
pub struct CaptureLoop {
    source: Box<dyn FrameSource>,
    stopped: Arc<AtomicBool>,
    frames_captured: u64,
}

impl CaptureLoop {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self::with_stop_flag(source, Arc::new(AtomicBool::new(false)))
    }

    /// Share a stop flag with whoever ends the call
    pub fn with_stop_flag(source: Box<dyn FrameSource>, stopped: Arc<AtomicBool>) -> Self {
        Self {
            source,
            stopped,
            frames_captured: 0,
        }
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stopped)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }

    /// One timer tick. `None` when stopped or no frame is available.
    pub fn tick(&mut self) -> Option<CapturedFrame> {
        if self.is_stopped() {
            return None;
        }

        let jpeg = self.source.capture()?;
        if jpeg.is_empty() {
            debug!("Skipping empty frame");
            return None;
        }

        self.frames_captured += 1;
        let encoded = encode_frame(&jpeg);
        Some(CapturedFrame {
            jpeg: Arc::new(jpeg),
            encoded,
        })
    }
}

/// Capture timer. Late ticks are skipped rather than bunched up.
pub fn capture_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_frame_source_never_ticks() {
        let mut capture = CaptureLoop::new(Box::new(NoFrameSource));
        assert!(capture.tick().is_none());
        assert_eq!(capture.frames_captured(), 0);
    }

    #[test]
    fn test_tick_encodes_frame() {
        let mut capture = CaptureLoop::new(Box::new(MemoryFrameSource::new(vec![vec![0xFF, 0xD8, 0xFF]])));
        let frame = capture.tick().unwrap();
        assert_eq!(frame.encoded, "/9j/");
        assert_eq!(frame.jpeg.as_slice(), &[0xFF, 0xD8, 0xFF]);
        assert_eq!(capture.frames_captured(), 1);
    }

    #[test]
    fn test_stopped_loop_captures_nothing() {
        let mut capture = CaptureLoop::new(Box::new(MemoryFrameSource::new(vec![vec![1, 2, 3]])));
        let flag = capture.stop_flag();
        assert!(capture.tick().is_some());

        flag.store(true, Ordering::SeqCst);
        assert!(capture.is_stopped());
        assert!(capture.tick().is_none());
        assert!(capture.tick().is_none());
        assert_eq!(capture.frames_captured(), 1);
    }

    #[test]
    fn test_directory_source_cycles_sorted_jpegs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.jpg"), [2u8]).unwrap();
        std::fs::write(dir.path().join("a.JPEG"), [1u8]).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();

        let mut source = DirectoryFrameSource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.capture(), Some(vec![1]));
        assert_eq!(source.capture(), Some(vec![2]));
        assert_eq!(source.capture(), Some(vec![1]));
    }

    #[test]
    fn test_directory_source_requires_frames() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectoryFrameSource::open(dir.path()).unwrap_err();
        assert!(matches!(err, ChatError::Capability(_)));
    }
}
