// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Photosort contributors

//! Disposition policy: where each classified image ends up
//!
//! `decide` is pure path-and-score logic; `apply` touches the filesystem.
//! Per-image failures during actuation divert the image to the Uncertain
//! bucket (move/copy) or are logged and skipped (tag), so one bad image
//! never stops the run.

use chrono::Local;
use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::classify::{CategoryScore, Classification};
use crate::settings::{AmbiguityMode, OutputMode, Settings};
use crate::{PhotosortError, Result};

/// Reserved directory for images no category claimed
pub const UNCERTAIN_DIR: &str = "Uncertain";

/// Resolved outcome for one image
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Route to this category's directory (move/copy modes)
    Assigned { category: String, confidence: f64 },
    /// Write these category scores into the image's metadata (tag mode)
    Tagged { scores: Vec<CategoryScore> },
    /// No category met the threshold, or the result was missing/empty
    Uncertain,
    /// Destination check failed; nothing will be done
    Rejected { reason: String },
    /// Report mode: informational only, no file mutation
    Report,
}

/// Per-image disposition, computed once and immediately actuated
#[derive(Debug, Clone)]
pub struct Disposition {
    pub image: PathBuf,
    pub outcome: Outcome,
}

/// What actually happened when a disposition was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Assigned,
    Uncertain,
    Tagged,
    Skipped,
    Failed,
}

/// Decide the outcome for one image. Pure; no filesystem access beyond
/// path arithmetic.
pub fn decide(
    image: &Path,
    result: Option<&Classification>,
    settings: &Settings,
    threshold: f64,
) -> Disposition {
    let outcome = match settings.output_mode {
        OutputMode::Report => Outcome::Report,
        OutputMode::Tag => decide_tag(result, settings, threshold),
        OutputMode::Move | OutputMode::Copy => decide_target(image, result, settings, threshold),
    };

    Disposition {
        image: image.to_path_buf(),
        outcome,
    }
}

/// Ambiguity collapse: single mode keeps only the top-confidence entry
fn effective_scores(result: &Classification, mode: AmbiguityMode) -> Vec<CategoryScore> {
    match mode {
        AmbiguityMode::Single => result.top_score().cloned().into_iter().collect(),
        AmbiguityMode::Multi => result.scores.clone(),
    }
}

fn decide_target(
    image: &Path,
    result: Option<&Classification>,
    settings: &Settings,
    threshold: f64,
) -> Outcome {
    let Some(result) = result else {
        return Outcome::Uncertain;
    };

    let scores = effective_scores(result, settings.ambiguity_mode);
    if scores.is_empty() {
        return Outcome::Uncertain;
    }

    // Priority categories pre-empt the standard scan in move mode: the
    // highest-confidence qualifying priority category wins outright.
    if settings.output_mode == OutputMode::Move && settings.has_priority() {
        let mut best: Option<&CategoryScore> = None;
        for score in scores
            .iter()
            .filter(|s| settings.is_priority(&s.name) && s.confidence >= threshold)
        {
            match best {
                Some(b) if score.confidence <= b.confidence => {}
                _ => best = Some(score),
            }
        }
        if let Some(score) = best {
            return check_destination(image, settings, score);
        }
    }

    // Standard pass: first category meeting the threshold wins. One
    // destination per image, in multi mode too.
    for score in &scores {
        if score.confidence >= threshold && settings.categories.contains(&score.name) {
            return check_destination(image, settings, score);
        }
    }

    Outcome::Uncertain
}

/// Reject the disposition when the target directory equals or contains
/// the image's current directory, so a file is never moved into its own
/// ancestry chain (or pointlessly onto itself).
fn check_destination(image: &Path, settings: &Settings, score: &CategoryScore) -> Outcome {
    let target_dir = settings.photo_dir.join(&score.name);

    if let Some(parent) = image.parent() {
        if parent.starts_with(&target_dir) {
            return Outcome::Rejected {
                reason: format!(
                    "target directory {} already contains the image's location",
                    target_dir.display()
                ),
            };
        }
    }

    Outcome::Assigned {
        category: score.name.clone(),
        confidence: score.confidence,
    }
}

fn decide_tag(result: Option<&Classification>, settings: &Settings, threshold: f64) -> Outcome {
    let Some(result) = result else {
        return Outcome::Uncertain;
    };

    let qualifying: Vec<CategoryScore> = effective_scores(result, settings.ambiguity_mode)
        .into_iter()
        .filter(|s| s.confidence >= threshold)
        .collect();

    if qualifying.is_empty() {
        return Outcome::Uncertain;
    }

    Outcome::Tagged { scores: qualifying }
}

/// Actuate a disposition. Never returns an error: per-image failures are
/// logged and, for move/copy, the image is diverted to Uncertain.
pub fn apply(disposition: &Disposition, settings: &Settings, dry_run: bool) -> Applied {
    match &disposition.outcome {
        Outcome::Report => Applied::Skipped,

        Outcome::Rejected { reason } => {
            warn!("Skipping {:?}: {}", disposition.image, reason);
            Applied::Skipped
        }

        Outcome::Assigned { category, confidence } => {
            info!(
                "{:?} -> {} ({:.0}%)",
                disposition.image,
                category,
                confidence * 100.0
            );
            let target_dir = settings.photo_dir.join(category);
            match transfer(&disposition.image, &target_dir, settings.output_mode, dry_run) {
                Ok(()) => Applied::Assigned,
                Err(e) => {
                    warn!(
                        "Failed to route {:?} to '{}': {}, diverting to {}",
                        disposition.image, category, e, UNCERTAIN_DIR
                    );
                    divert_to_uncertain(&disposition.image, settings, dry_run)
                }
            }
        }

        Outcome::Uncertain => match settings.output_mode {
            OutputMode::Move | OutputMode::Copy => {
                info!("{:?} -> {}", disposition.image, UNCERTAIN_DIR);
                divert_to_uncertain(&disposition.image, settings, dry_run)
            }
            _ => {
                debug!("No qualifying category for {:?}, skipping", disposition.image);
                Applied::Skipped
            }
        },

        Outcome::Tagged { scores } => match write_category_tag(&disposition.image, scores, dry_run) {
            Ok(()) => Applied::Tagged,
            Err(e) => {
                warn!("Failed to tag {:?}: {}", disposition.image, e);
                Applied::Failed
            }
        },
    }
}

fn divert_to_uncertain(image: &Path, settings: &Settings, dry_run: bool) -> Applied {
    let uncertain_dir = settings.photo_dir.join(UNCERTAIN_DIR);

    // Already there; nothing to do
    if image.parent().is_some_and(|p| p.starts_with(&uncertain_dir)) {
        debug!("{:?} is already under {}", image, UNCERTAIN_DIR);
        return Applied::Uncertain;
    }

    match transfer(image, &uncertain_dir, settings.output_mode, dry_run) {
        Ok(()) => Applied::Uncertain,
        Err(e) => {
            warn!("Failed to route {:?} to {}: {}", image, UNCERTAIN_DIR, e);
            Applied::Failed
        }
    }
}

/// Move or copy a file into `target_dir`, creating the directory first.
/// An existing file of the same name gets a timestamp suffix rather than
/// being overwritten.
fn transfer(image: &Path, target_dir: &Path, mode: OutputMode, dry_run: bool) -> Result<()> {
    let file_name = image.file_name().ok_or_else(|| {
        PhotosortError::Validation(format!("Image has no file name: {}", image.display()))
    })?;

    if dry_run {
        info!(
            "DRY RUN: would {} {:?} -> {:?}",
            mode,
            image,
            target_dir.join(file_name)
        );
        return Ok(());
    }

    std::fs::create_dir_all(target_dir)?;

    let mut dest = target_dir.join(file_name);
    if dest.exists() {
        let stem = image
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        let ext = image.extension().and_then(|e| e.to_str()).unwrap_or("");
        let timestamp = Local::now().format("%H%M%S");
        dest = if ext.is_empty() {
            target_dir.join(format!("{}_{}", stem, timestamp))
        } else {
            target_dir.join(format!("{}_{}.{}", stem, timestamp, ext))
        };
    }

    match mode {
        OutputMode::Move => std::fs::rename(image, &dest)?,
        OutputMode::Copy => {
            std::fs::copy(image, &dest)?;
        }
        _ => {}
    }

    debug!("{:?} -> {:?}", image, dest);
    Ok(())
}

/// Serialize category scores as `Name(0.00)` pairs and write them into
/// the image's metadata.
fn write_category_tag(image: &Path, scores: &[CategoryScore], dry_run: bool) -> Result<()> {
    let tag_string = scores
        .iter()
        .map(|s| format!("{}({:.2})", s.name, s.confidence))
        .collect::<Vec<_>>()
        .join(",");

    if dry_run {
        info!("DRY RUN: would tag {:?} with '{}'", image, tag_string);
        return Ok(());
    }

    let mut metadata = Metadata::new_from_path(image)
        .map_err(|e| PhotosortError::Tagging(format!("{}: {}", image.display(), e)))?;
    metadata.set_tag(ExifTag::ImageDescription(tag_string.clone()));
    metadata
        .write_to_file(image)
        .map_err(|e| PhotosortError::Tagging(format!("{}: {}", image.display(), e)))?;

    info!("Tagged {:?} with '{}'", image, tag_string);
    Ok(())
}
