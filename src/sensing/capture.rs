use std::path::PathBuf;

use image::RgbImage;

use crate::error::CaptureError;

pub type Frame = RgbImage;

/// Webcam-like source of frames.
///
/// `current_frame` failing is normal (camera warming up, device busy); the
/// prediction loop skips that tick and tries again on the next one.
pub trait FrameSource: Send {
    fn start(&mut self) -> Result<(), CaptureError>;
    fn stop(&mut self);
    fn current_frame(&mut self) -> Result<Frame, CaptureError>;
}

/// Re-reads one image file on every tick. Handy when a camera app keeps
/// overwriting a still on disk.
pub struct ImageFileSource {
    path: PathBuf,
    started: bool,
}

impl ImageFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            started: false,
        }
    }
}

impl FrameSource for ImageFileSource {
    fn start(&mut self) -> Result<(), CaptureError> {
        if !self.path.exists() {
            return Err(CaptureError::Unavailable(format!(
                "{} does not exist",
                self.path.display()
            )));
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn current_frame(&mut self) -> Result<Frame, CaptureError> {
        if !self.started {
            return Err(CaptureError::NotStarted);
        }
        image::open(&self.path)
            .map(|img| img.to_rgb8())
            .map_err(|err| CaptureError::Unavailable(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_source_reads_frames_after_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let mut source = ImageFileSource::new(&path);
        assert_eq!(source.current_frame().unwrap_err(), CaptureError::NotStarted);

        source.start().unwrap();
        let frame = source.current_frame().unwrap();
        assert_eq!(frame.dimensions(), (4, 3));

        source.stop();
        assert_eq!(source.current_frame().unwrap_err(), CaptureError::NotStarted);
    }

    #[test]
    fn missing_file_cannot_start() {
        let mut source = ImageFileSource::new("/definitely/not/here.png");
        assert!(matches!(source.start(), Err(CaptureError::Unavailable(_))));
    }
}
