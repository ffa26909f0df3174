//! Opaque collaborators for the document-analysis gateway: the blob store
//! holding uploaded documents and the content-generation service that
//! performs the structured extraction. Both are trait seams so the gateway
//! can be tested without either dependency.

pub mod analyzer;
pub mod error;
pub mod storage;

pub use analyzer::{Analyzer, HttpAnalyzer};
pub use error::{AnalysisError, Result};
pub use storage::{BlobStore, HttpBlobStore};
