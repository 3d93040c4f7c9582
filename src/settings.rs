// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Photosort contributors

//! User input validation and the per-run settings object
//!
//! All validation happens before any image is touched. `Settings` is
//! built once from validated input and never mutated afterwards.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::{PhotosortError, Result};

/// How to resolve images with multiple candidate categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbiguityMode {
    /// Collapse to the single highest-confidence category
    Single,
    /// Keep the full candidate list
    Multi,
}

impl AmbiguityMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match validate_mode(raw, &["single", "multi"], "multi")?.as_str() {
            "single" => Ok(Self::Single),
            _ => Ok(Self::Multi),
        }
    }
}

impl fmt::Display for AmbiguityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Multi => write!(f, "multi"),
        }
    }
}

/// What to do with each classified image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Move,
    Copy,
    Tag,
    Report,
}

impl OutputMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match validate_mode(raw, &["move", "copy", "tag", "report"], "report")?.as_str() {
            "move" => Ok(Self::Move),
            "copy" => Ok(Self::Copy),
            "tag" => Ok(Self::Tag),
            _ => Ok(Self::Report),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move => write!(f, "move"),
            Self::Copy => write!(f, "copy"),
            Self::Tag => write!(f, "tag"),
            Self::Report => write!(f, "report"),
        }
    }
}

/// Validated, immutable settings for one sorting run
#[derive(Debug, Clone)]
pub struct Settings {
    pub photo_dir: PathBuf,
    pub categories: Vec<String>,
    pub priority: Vec<String>,
    /// None means the threshold is derived from the score distribution
    pub threshold: Option<f64>,
    pub ambiguity_mode: AmbiguityMode,
    pub output_mode: OutputMode,
    pub scan_subfolders: bool,
}

impl Settings {
    /// Build settings from raw user input, failing fast on anything invalid
    pub fn from_input(
        photo_dir: &Path,
        categories_raw: &str,
        priority_raw: &str,
        threshold_raw: &str,
        ambiguity_raw: &str,
        output_raw: &str,
        scan_subfolders: bool,
    ) -> Result<Self> {
        let photo_dir = validate_photo_dir(photo_dir)?;
        let categories = validate_categories(categories_raw)?;
        let priority = validate_priority(priority_raw, &categories)?;
        let threshold = validate_threshold(threshold_raw)?;
        let ambiguity_mode = AmbiguityMode::parse(ambiguity_raw)?;
        let output_mode = OutputMode::parse(output_raw)?;

        Ok(Self {
            photo_dir,
            categories,
            priority,
            threshold,
            ambiguity_mode,
            output_mode,
            scan_subfolders,
        })
    }

    pub fn has_priority(&self) -> bool {
        !self.priority.is_empty()
    }

    pub fn is_priority(&self, category: &str) -> bool {
        self.priority.iter().any(|p| p == category)
    }
}

/// Check that the photo directory exists and is a directory
pub fn validate_photo_dir(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(PhotosortError::Validation(format!(
            "Directory does not exist: {}",
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(PhotosortError::Validation(format!(
            "Path is not a directory: {}",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

/// Parse a comma-separated category list: trim entries, drop empties
pub fn validate_categories(raw: &str) -> Result<Vec<String>> {
    let categories: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();

    if categories.is_empty() {
        return Err(PhotosortError::Validation(
            "No valid categories provided".to_string(),
        ));
    }

    Ok(categories)
}

/// Parse the priority list; every entry must be one of `categories`
pub fn validate_priority(raw: &str, categories: &[String]) -> Result<Vec<String>> {
    let priority: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();

    for entry in &priority {
        if !categories.contains(entry) {
            return Err(PhotosortError::Validation(format!(
                "Priority category '{}' is not in the category list",
                entry
            )));
        }
    }

    Ok(priority)
}

/// Parse the confidence threshold; empty input selects the adaptive mode
pub fn validate_threshold(raw: &str) -> Result<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let value: f64 = raw.parse().map_err(|_| {
        PhotosortError::Validation(format!(
            "Threshold must be a valid number between 0 and 1, got '{}'",
            raw
        ))
    })?;

    if !(0.0..=1.0).contains(&value) {
        return Err(PhotosortError::Validation(format!(
            "Threshold must be between 0 and 1, got {}",
            value
        )));
    }

    Ok(Some(value))
}

/// Validate a mode string against an allowed set; empty input picks the default
pub fn validate_mode(raw: &str, allowed: &[&str], default: &str) -> Result<String> {
    let mode = raw.trim().to_lowercase();
    if mode.is_empty() {
        return Ok(default.to_string());
    }
    if !allowed.contains(&mode.as_str()) {
        return Err(PhotosortError::Validation(format!(
            "Mode must be one of: {}",
            allowed.join(", ")
        )));
    }
    Ok(mode)
}
