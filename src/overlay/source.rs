use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};

/// Longest side of an image sent for analysis.
pub const UPLOAD_MAX_SIDE: u32 = 1024;
pub const UPLOAD_JPEG_QUALITY: u8 = 85;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to read image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a base64 data URL")]
    InvalidDataUrl,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
    #[error("image has no pixels")]
    Empty,
    #[error("image decode was abandoned")]
    Abandoned,
}

/// Where a background image comes from: an upload, a file on disk or a
/// camera snapshot encoded as a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    File(PathBuf),
    DataUrl(String),
}

impl ImageSource {
    pub fn decode(&self) -> Result<BackgroundImage, ImageError> {
        match self {
            ImageSource::Bytes(bytes) => BackgroundImage::from_bytes(bytes),
            ImageSource::File(path) => BackgroundImage::from_path(path),
            ImageSource::DataUrl(url) => BackgroundImage::from_data_url(url),
        }
    }
}

/// A decoded raster the overlay draws on top of.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundImage {
    pixels: RgbaImage,
}

impl BackgroundImage {
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self, ImageError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ImageError::Empty);
        }
        Ok(Self { pixels })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let decoded = image::load_from_memory(bytes)?;
        Self::from_rgba(decoded.to_rgba8())
    }

    pub fn from_path(path: &Path) -> Result<Self, ImageError> {
        let bytes = std::fs::read(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_data_url(url: &str) -> Result<Self, ImageError> {
        let bytes = decode_data_url(url)?;
        Self::from_bytes(&bytes)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    /// JPEG bytes suitable for upload, downscaled so the longest side is at
    /// most `max_side`.
    pub fn to_jpeg(&self, max_side: u32) -> Result<Vec<u8>, ImageError> {
        let (w, h) = self.size();
        let longest = w.max(h);
        let rgb = if longest > max_side && max_side > 0 {
            let ratio = max_side as f32 / longest as f32;
            let nw = ((w as f32 * ratio) as u32).max(1);
            let nh = ((h as f32 * ratio) as u32).max(1);
            DynamicImage::ImageRgba8(image::imageops::resize(
                &self.pixels,
                nw,
                nh,
                FilterType::Lanczos3,
            ))
            .to_rgb8()
        } else {
            DynamicImage::ImageRgba8(self.pixels.clone()).to_rgb8()
        };

        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut out, ImageOutputFormat::Jpeg(UPLOAD_JPEG_QUALITY))?;
        Ok(out.into_inner())
    }
}

/// Extracts the payload of a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, ImageError> {
    let rest = url.trim().strip_prefix("data:").ok_or(ImageError::InvalidDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(ImageError::InvalidDataUrl)?;
    if !header.ends_with(";base64") {
        return Err(ImageError::InvalidDataUrl);
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

/// A decode running off the UI thread. The result is delivered exactly once;
/// dropping the handle abandons it.
#[derive(Debug)]
pub struct ImageLoad {
    rx: Receiver<Result<BackgroundImage, ImageError>>,
    done: bool,
}

impl ImageLoad {
    pub fn spawn(source: ImageSource) -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = source.decode();
            if let Err(err) = &result {
                tracing::debug!("background decode failed: {err}");
            }
            let _ = tx.send(result);
        });
        Self { rx, done: false }
    }

    pub fn try_take(&mut self) -> Option<Result<BackgroundImage, ImageError>> {
        if self.done {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.done = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.done = true;
                Some(Err(ImageError::Abandoned))
            }
        }
    }
}
