//! Image preprocessing and text recognition.
//!
//! Uploaded bytes are decoded with the `image` crate, cleaned up for OCR
//! (grayscale, 2x upscale, Otsu binarization, 3x3 median) and handed to an
//! [`OcrEngine`]. The production engine shells out to the `tesseract` binary.

use image::{GrayImage, imageops::FilterType};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::filter::median_filter;
use serde::Serialize;
use std::process::Command;
use std::time::Instant;
use tempfile::TempDir;

const LANGUAGE: &str = "eng";
const ENGINE_MODE: &str = "3";
const PAGE_SEGMENTATION: &str = "6";
const SCALE: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("{0}")]
    NotAvailable(String),
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Text recognition over a preprocessed grayscale image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError>;
}

/// Runs `tesseract <png> stdout -l eng --oem 3 --psm 6`.
pub struct TesseractEngine {
    binary: String,
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self { binary: "tesseract".to_string() }
    }

    #[cfg(test)]
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        let temp_dir = TempDir::new()?;
        let image_path = temp_dir.path().join("input.png");
        image
            .save(&image_path)
            .map_err(|e| OcrError::Failed(format!("failed to write temp image: {}", e)))?;

        let output = Command::new(&self.binary)
            .arg(&image_path)
            .arg("stdout")
            .args(["-l", LANGUAGE, "--oem", ENGINE_MODE, "--psm", PAGE_SEGMENTATION])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::Failed(format!("tesseract failed: {}", stderr.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::NotAvailable(
                format!("{} not found (install tesseract-ocr)", self.binary),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    #[serde(rename = "results")]
    pub lines: Vec<String>,
    #[serde(rename = "original")]
    pub raw_text: String,
}

impl PredictionResult {
    pub fn from_text(raw_text: String) -> Self {
        Self { lines: split_lines(&raw_text), raw_text }
    }
}

/// Splits on `\n` only, keeping blank lines and a trailing empty entry.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

/// Decodes, preprocesses and recognizes one uploaded image. Blocking.
pub fn predict(engine: &dyn OcrEngine, bytes: &[u8]) -> Result<PredictionResult, OcrError> {
    let start = Instant::now();
    let decoded = image::load_from_memory(bytes).map_err(|e| OcrError::Decode(e.to_string()))?;
    tracing::debug!(width = decoded.width(), height = decoded.height(), "decoded upload");

    let prepared = preprocess(&decoded.to_luma8());
    let text = engine.recognize(&prepared)?;
    let result = PredictionResult::from_text(text);

    tracing::info!(
        lines = result.lines.len(),
        chars = result.raw_text.chars().count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "ocr complete"
    );
    Ok(result)
}

pub fn preprocess(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    let scaled = image::imageops::resize(gray, w * SCALE, h * SCALE, FilterType::CatmullRom);
    let level = otsu_level(&scaled);
    let binary = threshold(&scaled, level, ThresholdType::Binary);
    median_filter(&binary, 1, 1)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Luma;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Returns canned text and remembers what the last image it saw looked like.
    pub(crate) struct StubEngine {
        pub text: String,
        pub seen: Mutex<Option<(u32, u32)>>,
        pub binary_only: AtomicBool,
    }

    impl StubEngine {
        pub(crate) fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                seen: Mutex::new(None),
                binary_only: AtomicBool::new(false),
            }
        }
    }

    impl OcrEngine for StubEngine {
        fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
            *self.seen.lock().unwrap() = Some(image.dimensions());
            let binary = image.pixels().all(|p| p[0] == 0 || p[0] == 255);
            self.binary_only.store(binary, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = GrayImage::from_fn(width, height, |x, _| {
            if x % 4 < 2 {
                Luma([20])
            } else {
                Luma([230])
            }
        });
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn split_keeps_blank_lines() {
        assert_eq!(split_lines("a\n\nb\n"), vec!["a", "", "b", ""]);
        assert_eq!(split_lines(""), vec![""]);
    }

    #[test]
    fn prediction_serializes_two_keys() {
        let result = PredictionResult::from_text("hello\nworld".to_string());
        let json = serde_json::to_value(&result).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(json["results"], serde_json::json!(["hello", "world"]));
        assert_eq!(json["original"], "hello\nworld");
    }

    #[test]
    fn preprocess_doubles_and_binarizes() {
        let img = GrayImage::from_fn(8, 6, |x, _| {
            if x < 4 {
                Luma([30])
            } else {
                Luma([220])
            }
        });
        let out = preprocess(&img);
        assert_eq!(out.dimensions(), (16, 12));
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(15, 11)[0], 255);
    }

    #[test]
    fn predict_runs_engine_on_scaled_image() {
        let engine = StubEngine::new("line one\n\nline two");
        let result = predict(&engine, &png_bytes(12, 7)).unwrap();
        assert_eq!(result.lines, vec!["line one", "", "line two"]);
        assert_eq!(*engine.seen.lock().unwrap(), Some((24, 14)));
        assert!(engine.binary_only.load(Ordering::SeqCst));
    }

    #[test]
    fn predict_rejects_non_image() {
        let engine = StubEngine::new("unused");
        let err = predict(&engine, b"definitely not an image").unwrap_err();
        assert!(matches!(err, OcrError::Decode(_)));
        assert!(engine.seen.lock().unwrap().is_none());
    }

    #[test]
    fn missing_binary_reports_not_available() {
        let engine = TesseractEngine::with_binary("ocrserve-no-such-binary");
        let err = engine.recognize(&GrayImage::new(4, 4)).unwrap_err();
        assert!(matches!(err, OcrError::NotAvailable(_)));
    }
}
