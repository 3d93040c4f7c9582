// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Photosort contributors

//! Error types for Photosort

use thiserror::Error;

/// Result type alias for Photosort operations
pub type Result<T> = std::result::Result<T, PhotosortError>;

/// Photosort error types
#[derive(Error, Debug)]
pub enum PhotosortError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Inference service error: {0}")]
    Inference(String),

    #[error("Malformed model response: {0}")]
    Parse(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Tagging error: {0}")]
    Tagging(String),
}
