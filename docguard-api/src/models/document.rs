//! Uploaded document records and extraction output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::ClassificationResult;

/// Document lifecycle status
///
/// uploaded → preprocessed → classified → reviewed, or failed at any point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Preprocessed,
    Classified,
    Reviewed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Preprocessed => "preprocessed",
            DocumentStatus::Classified => "classified",
            DocumentStatus::Reviewed => "reviewed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(DocumentStatus::Uploaded),
            "preprocessed" => Some(DocumentStatus::Preprocessed),
            "classified" => Some(DocumentStatus::Classified),
            "reviewed" => Some(DocumentStatus::Reviewed),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }
}

/// Image pulled out of a document, base64 encoded for model calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// Page the image was found on, when known
    pub page: Option<u32>,
    pub index: usize,
    /// Base64 payload
    pub data: String,
    /// File extension (jpg, png)
    pub ext: String,
    /// Raw size in bytes
    pub size: usize,
}

impl ExtractedImage {
    pub fn mime_type(&self) -> &'static str {
        match self.ext.as_str() {
            "png" => "image/png",
            _ => "image/jpeg",
        }
    }
}

/// Text and images extracted from one document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// 1-based page number → page text
    pub pages: BTreeMap<u32, String>,
    pub images: Vec<ExtractedImage>,
    /// Share of printable characters (0.0 - 1.0); None when there is no text
    pub legibility_score: Option<f64>,
}

impl ExtractedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// True when at least one page has non-whitespace text or an image was found
    pub fn has_content(&self) -> bool {
        self.pages.values().any(|text| !text.trim().is_empty()) || !self.images.is_empty()
    }
}

/// Stored document metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub doc_id: Uuid,
    pub filename: String,
    pub source_path: String,
    pub status: DocumentStatus,
    pub page_count: usize,
    pub image_count: usize,
    pub legibility_score: Option<f64>,
    pub uploaded_at: DateTime<Utc>,
    /// Latest classification, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationResult>,
}

impl DocumentRecord {
    pub fn new(filename: String, source_path: String) -> Self {
        Self {
            doc_id: Uuid::new_v4(),
            filename,
            source_path,
            status: DocumentStatus::Uploaded,
            page_count: 0,
            image_count: 0,
            legibility_score: None,
            uploaded_at: Utc::now(),
            classification: None,
        }
    }
}

/// POST /upload response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub doc_id: Uuid,
    pub filename: String,
    pub page_count: usize,
    pub image_count: usize,
    pub legibility_score: Option<f64>,
    pub status: DocumentStatus,
}
