//! PDF rasterisation: render page 1 to a PNG preview via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto a dedicated
//! thread pool thread designed for blocking operations, preventing the
//! Tokio worker threads from stalling during CPU-heavy rendering.
//!
//! ## Why a scale factor, not DPI?
//!
//! The preview exists to be read by a vision model and shown in a browser,
//! both of which think in CSS-pixel multiples of the page viewport, not in
//! print DPI. The default 2× magnification matches typical device pixel
//! ratios while keeping file sizes modest.
//!
//! Rendering is deterministic: identical document bytes and scale yield
//! byte-identical PNG output for a fixed pdfium version, which is what
//! makes raster output cacheable and testable.

use crate::error::AnalysisError;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use thiserror::Error;
use tracing::{debug, warn};

/// Default viewport magnification for the page-1 preview.
pub const DEFAULT_SCALE: f32 = 2.0;

/// A rendered page image ready for upload.
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// PNG-encoded pixels.
    pub bytes: Vec<u8>,
    /// Always `image/png`.
    pub mime_type: &'static str,
    /// Input file name with its extension replaced by `.png`.
    pub file_name: String,
    /// Rendered width in pixels.
    pub width: u32,
    /// Rendered height in pixels.
    pub height: u32,
}

/// Why rasterisation failed. Never escapes as a panic; every failure mode
/// is a typed, human-readable cause.
#[derive(Debug, Clone, Error)]
pub enum RasterError {
    /// The input bytes are not recognisable as a PDF.
    #[error("not a PDF document: {detail}")]
    UnsupportedFormat { detail: String },

    /// No pdfium library could be bound — there is no render surface.
    #[error("PDF rendering backend unavailable: {detail}")]
    BackendUnavailable { detail: String },

    /// pdfium could not decode the document.
    #[error("failed to load PDF: {detail}")]
    DecodeFailed { detail: String },

    /// The page exists but could not be rendered.
    #[error("failed to render page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The rendered bitmap could not be PNG-encoded.
    #[error("failed to encode raster image: {detail}")]
    EncodeFailed { detail: String },
}

impl From<RasterError> for AnalysisError {
    fn from(e: RasterError) -> Self {
        match e {
            RasterError::UnsupportedFormat { detail } => {
                AnalysisError::UnsupportedFormat { detail }
            }
            other => AnalysisError::Conversion {
                detail: other.to_string(),
            },
        }
    }
}

/// True when `bytes` carries the PDF magic header.
///
/// Shared with the orchestrator's pre-upload validation so an unsupported
/// document is rejected before any storage traffic.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Derive the raster file name from the input file name.
///
/// `resume.pdf` → `resume.png`; a name without a `.pdf` extension keeps its
/// full stem.
pub fn raster_file_name(input_name: &str) -> String {
    let stem = match input_name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("pdf") && !stem.is_empty() => stem,
        _ => input_name,
    };
    format!("{stem}.png")
}

/// Rasterisation seam the orchestrator drives.
///
/// A trait rather than a direct call so the pipeline can be exercised
/// without a pdfium library present; the production implementation is
/// [`PdfiumRasterizer`].
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Rasterise page 1 of `document` at the given scale.
    async fn rasterize(
        &self,
        document: &[u8],
        file_name: &str,
        scale: f32,
    ) -> Result<RasterImage, RasterError>;
}

/// Default rasteriser: page 1 via pdfium.
pub struct PdfiumRasterizer;

#[async_trait]
impl PageRasterizer for PdfiumRasterizer {
    async fn rasterize(
        &self,
        document: &[u8],
        file_name: &str,
        scale: f32,
    ) -> Result<RasterImage, RasterError> {
        rasterize_first_page(document, file_name, scale).await
    }
}

/// Rasterise page 1 of `document` at the given scale.
///
/// Convenience wrapper over [`rasterize_page`] with `page_index = 0`, the
/// only page the pipeline uses.
pub async fn rasterize_first_page(
    document: &[u8],
    file_name: &str,
    scale: f32,
) -> Result<RasterImage, RasterError> {
    rasterize_page(document, 0, scale, file_name).await
}

/// Rasterise the page at `page_index` (0-based) at the given scale.
///
/// The output dimensions are the page viewport at `scale`, each rounded up
/// to whole pixels. The input is never mutated; two calls with identical
/// input and scale produce byte-identical output.
pub async fn rasterize_page(
    document: &[u8],
    page_index: usize,
    scale: f32,
    file_name: &str,
) -> Result<RasterImage, RasterError> {
    let bytes = document.to_vec();
    let name = raster_file_name(file_name);

    tokio::task::spawn_blocking(move || rasterize_blocking(&bytes, page_index, scale, name))
        .await
        .map_err(|e| RasterError::RenderFailed {
            page: page_index + 1,
            detail: format!("render task panicked: {e}"),
        })?
}

/// Blocking implementation of page rasterisation.
fn rasterize_blocking(
    document: &[u8],
    page_index: usize,
    scale: f32,
    file_name: String,
) -> Result<RasterImage, RasterError> {
    if !is_pdf(document) {
        let preview: Vec<u8> = document.iter().copied().take(4).collect();
        return Err(RasterError::UnsupportedFormat {
            detail: format!("first bytes {preview:?}"),
        });
    }

    let pdfium = bind_pdfium()?;

    let pdf = pdfium
        .load_pdf_from_byte_slice(document, None)
        .map_err(|e| RasterError::DecodeFailed {
            detail: format!("{e:?}"),
        })?;

    let pages = pdf.pages();
    let total = pages.len() as usize;
    let index = u16::try_from(page_index).ok().filter(|_| page_index < total).ok_or_else(|| {
        RasterError::RenderFailed {
            page: page_index + 1,
            detail: format!("page out of range (document has {total} pages)"),
        }
    })?;

    let page = pages.get(index).map_err(|e| RasterError::RenderFailed {
        page: page_index + 1,
        detail: format!("{e:?}"),
    })?;

    // Pixel viewport: page size in points times the magnification factor,
    // rounded up to whole pixels.
    let width = (page.width().value * scale).ceil().max(1.0) as i32;
    let height = (page.height().value * scale).ceil().max(1.0) as i32;

    let render_config = PdfRenderConfig::new()
        .set_target_width(width)
        .set_maximum_height(height);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| RasterError::RenderFailed {
            page: page_index + 1,
            detail: format!("{e:?}"),
        })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_index + 1,
        image.width(),
        image.height()
    );

    encode_png(&image, file_name)
}

/// PNG-encode the rendered page.
///
/// PNG over JPEG: lossless compression preserves text crispness, which
/// matters far more than file size for a résumé page a vision model has
/// to read.
fn encode_png(image: &DynamicImage, file_name: String) -> Result<RasterImage, RasterError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| RasterError::EncodeFailed {
            detail: e.to_string(),
        })?;

    Ok(RasterImage {
        bytes: buf,
        mime_type: "image/png",
        file_name,
        width: image.width(),
        height: image.height(),
    })
}

/// Bind to a pdfium library.
///
/// Discovery order: `PDFIUM_DYNAMIC_LIB_PATH` env var, then alongside the
/// running executable, then the system library search path.
fn bind_pdfium() -> Result<Pdfium, RasterError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        let bindings =
            Pdfium::bind_to_library(&path).map_err(|e| RasterError::BackendUnavailable {
                detail: format!("failed to load pdfium from {path}: {e}"),
            })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let lib_path =
                Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                return Ok(Pdfium::new(bindings));
            }
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(e) => {
            warn!("no pdfium library found: {e}");
            Err(RasterError::BackendUnavailable {
                detail: format!(
                    "pdfium library not found; set PDFIUM_DYNAMIC_LIB_PATH or install pdfium: {e}"
                ),
            })
        }
    }
}
