//! PDF upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::UploadResponse;

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// POST /api/upload - OCR, classify, and index one PDF
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let start = Instant::now();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid_input(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_default();
        if filename.trim().is_empty() {
            return Err(Error::invalid_input("Uploaded file has no filename"));
        }
        if !is_pdf_upload(field.content_type(), &filename) {
            return Err(Error::invalid_input(format!(
                "Only PDF uploads are accepted, got {}",
                field.content_type().unwrap_or("no content type")
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::invalid_input(format!("Failed to read file: {}", e)))?;

        tracing::info!("Processing upload: {} ({} bytes)", filename, data.len());

        let report = state.service().index_document(&data, &filename).await.map_err(|e| {
            tracing::error!("Upload of {} failed: {}", filename, e);
            e
        })?;

        tracing::info!(
            "Indexed {} in {:?} ({} pages, {} units)",
            filename,
            start.elapsed(),
            report.pages,
            report.units
        );

        return Ok(Json(UploadResponse {
            success: true,
            message: format!(
                "Indexed {} pages into {} chunks",
                report.pages, report.units
            ),
            filename: report.file_name,
            extracted_metadata: Some(report.metadata),
            pages_indexed: report.pages,
            chunks_indexed: report.units,
            indexed_at: Some(report.indexed_at),
        }));
    }

    Err(Error::invalid_input("Missing multipart field `file`"))
}

/// Declared PDF, or an undeclared type with a `.pdf` name
fn is_pdf_upload(content_type: Option<&str>, filename: &str) -> bool {
    match content_type {
        Some(ct) => ct
            .split(';')
            .next()
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE)),
        None => filename.to_lowercase().ends_with(".pdf"),
    }
}
