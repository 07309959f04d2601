//! Document ingestion: validation, rasterization, OCR, classification, chunking, indexing

pub mod chunker;
pub mod metadata;
pub mod ocr;
pub mod pipeline;
pub mod rasterizer;
pub mod sparse;

pub use chunker::TextChunker;
pub use metadata::MetadataExtractor;
pub use ocr::DocumentOcr;
pub use pipeline::{IndexReport, Indexer};
pub use rasterizer::{validate_pdf, PageImage, PdftoppmRasterizer, Rasterizer};
pub use sparse::SparseEncoder;
