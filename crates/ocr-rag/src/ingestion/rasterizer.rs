//! PDF validation and page rasterization
//!
//! Rasterization shells out to poppler's `pdftoppm`. Any failure is total:
//! either every page of the document becomes an image or none does.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::OcrConfig;
use crate::error::{Error, Result};

/// PDF magic bytes
const PDF_MAGIC: &[u8] = b"%PDF-";

/// One rasterized page
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based page number
    pub page_number: u32,
    /// PNG-encoded image
    pub png: Vec<u8>,
}

/// Trait for converting a PDF into ordered page images
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Rasterize every page, ordered by page number
    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<PageImage>>;

    /// Get rasterizer name for logging
    fn name(&self) -> &str;
}

/// Validate a PDF buffer and return its page count
///
/// Rejects buffers that lack the `%PDF-` header, fail to parse, or have no
/// pages. Runs before any external call.
pub fn validate_pdf(data: &[u8]) -> Result<usize> {
    if !data.starts_with(PDF_MAGIC) {
        return Err(Error::invalid_input("File is not a PDF (missing %PDF- header)"));
    }

    let document = lopdf::Document::load_mem(data)
        .map_err(|e| Error::invalid_input(format!("Unparseable PDF: {}", e)))?;

    let pages = document.get_pages().len();
    if pages == 0 {
        return Err(Error::invalid_input("PDF has no pages"));
    }

    Ok(pages)
}

/// Rasterizer backed by poppler's `pdftoppm`
pub struct PdftoppmRasterizer {
    dpi: u32,
    timeout: Duration,
}

impl PdftoppmRasterizer {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            dpi: config.dpi,
            timeout: config.rasterize_timeout(),
        }
    }

    /// Check if pdftoppm is available
    pub async fn is_available() -> bool {
        Command::new("pdftoppm")
            .arg("-v")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok()
    }

    async fn run_pdftoppm(&self, pdf_path: &Path, prefix: &Path) -> Result<()> {
        let mut command = Command::new("pdftoppm");
        command
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(pdf_path)
            .arg(prefix)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                Error::rasterize(format!("pdftoppm timed out after {:?}", self.timeout))
            })?
            .map_err(|e| Error::rasterize(format!("Failed to run pdftoppm: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::rasterize(format!("pdftoppm error: {}", stderr.trim())));
        }

        Ok(())
    }
}

/// Page number from a pdftoppm output name such as `page-07.png`
fn page_number_from_name(name: &str) -> Option<u32> {
    name.strip_suffix(".png")?
        .rsplit('-')
        .next()?
        .parse()
        .ok()
}

#[async_trait]
impl Rasterizer for PdftoppmRasterizer {
    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<PageImage>> {
        let temp_dir = tempfile::Builder::new()
            .prefix("ocr-rag-raster-")
            .tempdir()
            .map_err(|e| Error::rasterize(format!("Failed to create temp dir: {}", e)))?;

        let pdf_path = temp_dir.path().join("input.pdf");
        tokio::fs::write(&pdf_path, pdf).await?;

        self.run_pdftoppm(&pdf_path, &temp_dir.path().join("page"))
            .await?;

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(temp_dir.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(page_number) = name.to_str().and_then(page_number_from_name) else {
                continue;
            };
            let png = tokio::fs::read(entry.path()).await?;
            pages.push(PageImage { page_number, png });
        }

        if pages.is_empty() {
            return Err(Error::rasterize("pdftoppm produced no images"));
        }

        pages.sort_by_key(|p| p.page_number);
        tracing::debug!("Rasterized {} pages at {} dpi", pages.len(), self.dpi);
        Ok(pages)
    }

    fn name(&self) -> &str {
        "pdftoppm"
    }
}
