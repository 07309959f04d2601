//! Document-level OCR with an all-or-nothing completeness policy
//!
//! Pages are OCR'd concurrently (bounded), collected, and ordered by page
//! number. If any page fails the whole document is rejected.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::providers::PageOcr;
use crate::types::PageRecord;

use super::rasterizer::{validate_pdf, PageImage, Rasterizer};

/// Drives rasterization and per-page OCR for a whole document
pub struct DocumentOcr {
    rasterizer: Arc<dyn Rasterizer>,
    ocr: Arc<dyn PageOcr>,
    max_concurrent_pages: usize,
}

impl DocumentOcr {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        ocr: Arc<dyn PageOcr>,
        max_concurrent_pages: usize,
    ) -> Self {
        Self {
            rasterizer,
            ocr,
            max_concurrent_pages: max_concurrent_pages.max(1),
        }
    }

    /// Extract the text of every page, ordered `1..=N`.
    ///
    /// Fails with `InvalidInput` for a non-PDF, `Rasterize` if page images
    /// cannot be produced, and `OcrIncomplete` if any page's OCR fails.
    pub async fn extract_pages(&self, pdf: &[u8]) -> Result<Vec<PageRecord>> {
        let expected = validate_pdf(pdf)?;
        let started = Instant::now();

        let images = self.rasterizer.rasterize(pdf).await?;
        if images.len() != expected {
            return Err(Error::rasterize(format!(
                "{} produced {} images for a {}-page PDF",
                self.rasterizer.name(),
                images.len(),
                expected
            )));
        }

        let total = images.len();
        tracing::info!(
            "OCR started: {} pages via {} ({} concurrent)",
            total,
            self.ocr.name(),
            self.max_concurrent_pages
        );

        let results: Vec<(u32, Result<String>)> = stream::iter(images)
            .map(|PageImage { page_number, png }| async move {
                let result = self.ocr.recognize(page_number, &png).await;
                (page_number, result)
            })
            .buffer_unordered(self.max_concurrent_pages)
            .collect()
            .await;

        let mut pages = Vec::with_capacity(total);
        for (page_number, result) in results {
            match result {
                Ok(text) if !text.trim().is_empty() => {
                    pages.push(PageRecord::new(page_number, text));
                }
                Ok(_) => tracing::warn!("Page {}/{} OCR returned no text", page_number, total),
                Err(e) => tracing::warn!("Page {}/{} OCR failed: {}", page_number, total, e),
            }
        }

        if pages.len() < total {
            tracing::error!(
                "OCR incomplete ({}/{} pages), rejecting document",
                pages.len(),
                total
            );
            return Err(Error::OcrIncomplete {
                succeeded: pages.len(),
                total,
            });
        }

        pages.sort_by_key(|p| p.page_number);
        tracing::info!(
            "OCR complete: {} pages in {:.1}s",
            total,
            started.elapsed().as_secs_f32()
        );
        Ok(pages)
    }
}
