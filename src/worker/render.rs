//! Document rasterisation: PDF pages to `DynamicImage` via pdfium, raster
//! uploads decoded with `image`.
//!
//! ## Why spawn_blocking?
//!
//! pdfium wraps a C++ library with thread-local state that must not be
//! driven from async contexts, and decoding a 16 MiB scan is CPU-bound
//! either way. `tokio::task::spawn_blocking` keeps the worker's async loop
//! responsive to shutdown while the heavy lifting runs on the blocking pool.
//!
//! ## Why cap pixels?
//!
//! A broadsheet page rendered unbounded can exceed vision-API upload limits
//! and exhaust memory. `max_pixels` caps the longest edge regardless of the
//! physical page size.

use crate::error::PatrikaError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Rasterise every page of a PDF, in page order.
pub async fn render_document(
    pdf_path: &Path,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, PatrikaError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || render_document_blocking(&path, max_pixels))
        .await
        .map_err(|e| PatrikaError::Internal(format!("render task panicked: {e}")))?
}

fn render_document_blocking(
    pdf_path: &Path,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, PatrikaError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| PatrikaError::CorruptDocument {
            path: pdf_path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!("PDF loaded: {} pages", total);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(total);
    for idx in 0..total {
        let page = pages
            .get(idx as u16)
            .map_err(|e| PatrikaError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;
        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| PatrikaError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{e:?}"),
                })?;
        let image = bitmap.as_image();
        debug!("Rendered page {} → {}x{} px", idx + 1, image.width(), image.height());
        images.push(image);
    }

    Ok(images)
}

/// Decode an uploaded raster image into the single input unit it becomes.
pub async fn decode_image(bytes: Vec<u8>) -> Result<DynamicImage, PatrikaError> {
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes).map_err(|e| PatrikaError::ImageFailed {
            detail: e.to_string(),
        })
    })
    .await
    .map_err(|e| PatrikaError::Internal(format!("decode task panicked: {e}")))?
}
