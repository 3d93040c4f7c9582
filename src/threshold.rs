// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Photosort contributors

//! Adaptive confidence threshold
//!
//! When the user supplies no fixed threshold, one is derived from the
//! empirical score distribution: sort all confidences descending and cut
//! at the steepest single-step drop. A simple unsupervised knee finder,
//! no smoothing; noisy distributions will produce noisy cuts.

use tracing::{debug, info};

use crate::batch::ResultSet;
use crate::settings::Settings;

/// Fallback when no scores are available to derive a threshold from
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Resolve the threshold for a run: the user-supplied fixed value, or one
/// computed from the result set. Called once, at disposition time.
pub fn resolve_threshold(settings: &Settings, results: &ResultSet) -> f64 {
    match settings.threshold {
        Some(value) => value,
        None => {
            let value = compute_adaptive_threshold(results, &settings.priority);
            info!("Adaptive threshold resolved to {:.2}", value);
            value
        }
    }
}

/// Derive a threshold from the confidence distribution of a result set.
///
/// With priority categories, only their confidences participate. The cut
/// lands on the score *above* the steepest drop, so everything at or above
/// the cliff counts as confident. Ties go to the first (highest-value)
/// occurrence. A distribution with no drop at all keeps every score, i.e.
/// the lowest one becomes the threshold; no scores at all falls back to
/// the default.
pub fn compute_adaptive_threshold(results: &ResultSet, priority: &[String]) -> f64 {
    let mut scores: Vec<f64> = results
        .iter()
        .filter_map(|(_, result)| result)
        .flat_map(|c| c.scores.iter())
        .filter(|s| priority.is_empty() || priority.iter().any(|p| p == &s.name))
        .map(|s| s.confidence)
        .collect();

    if scores.is_empty() {
        debug!("No confidences to derive a threshold from, using default");
        return DEFAULT_THRESHOLD;
    }

    scores.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    if scores.len() == 1 {
        return scores[0];
    }

    let mut best_index = 0;
    let mut best_drop = 0.0;
    for i in 0..scores.len() - 1 {
        let drop = scores[i] - scores[i + 1];
        if drop > best_drop {
            best_drop = drop;
            best_index = i;
        }
    }

    if best_drop <= 0.0 {
        // Flat distribution: keep everything
        return scores[scores.len() - 1];
    }

    scores[best_index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{CategoryScore, Classification};
    use std::path::PathBuf;

    fn result_set(scores: &[(&str, f64)]) -> ResultSet {
        let mut results = ResultSet::new();
        results.push(
            PathBuf::from("/photos/a.jpg"),
            Some(Classification {
                scores: scores
                    .iter()
                    .map(|(name, confidence)| CategoryScore {
                        name: name.to_string(),
                        confidence: *confidence,
                    })
                    .collect(),
            }),
        );
        results
    }

    #[test]
    fn test_steepest_drop() {
        let results = result_set(&[("A", 0.9), ("B", 0.85), ("C", 0.4), ("D", 0.35)]);
        assert_eq!(compute_adaptive_threshold(&results, &[]), 0.85);
    }

    #[test]
    fn test_empty_returns_default() {
        let results = ResultSet::new();
        assert_eq!(compute_adaptive_threshold(&results, &[]), DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_failed_entries_are_ignored() {
        let mut results = ResultSet::new();
        results.push(PathBuf::from("/photos/broken.jpg"), None);
        assert_eq!(compute_adaptive_threshold(&results, &[]), DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_priority_restricts_scores() {
        // Without restriction the biggest drop is 0.95 -> 0.3; the
        // priority subset only contains 0.6 and 0.55.
        let results = result_set(&[("A", 0.95), ("B", 0.6), ("A", 0.3), ("B", 0.55)]);
        let priority = vec!["B".to_string()];
        assert_eq!(compute_adaptive_threshold(&results, &priority), 0.6);
    }

    #[test]
    fn test_priority_with_no_matching_scores_falls_back() {
        let results = result_set(&[("A", 0.9)]);
        let priority = vec!["B".to_string()];
        assert_eq!(compute_adaptive_threshold(&results, &priority), DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_single_score_returns_itself() {
        let results = result_set(&[("A", 0.42)]);
        assert_eq!(compute_adaptive_threshold(&results, &[]), 0.42);
    }

    #[test]
    fn test_plateau_returns_lowest() {
        let results = result_set(&[("A", 0.5), ("B", 0.5), ("C", 0.5)]);
        assert_eq!(compute_adaptive_threshold(&results, &[]), 0.5);
    }

    #[test]
    fn test_tie_takes_first_occurrence() {
        // Drops: 0.2, 0.2, 0.1 -- the first 0.2 wins, cut at 0.9
        let results = result_set(&[("A", 0.9), ("B", 0.7), ("C", 0.5), ("D", 0.4)]);
        assert_eq!(compute_adaptive_threshold(&results, &[]), 0.9);
    }

    #[test]
    fn test_fixed_threshold_wins_over_adaptive() {
        use crate::settings::{AmbiguityMode, OutputMode, Settings};
        let settings = Settings {
            photo_dir: PathBuf::from("/photos"),
            categories: vec!["A".to_string()],
            priority: vec![],
            threshold: Some(0.25),
            ambiguity_mode: AmbiguityMode::Multi,
            output_mode: OutputMode::Report,
            scan_subfolders: true,
        };
        let results = result_set(&[("A", 0.9), ("A", 0.2)]);
        assert_eq!(resolve_threshold(&settings, &results), 0.25);
    }
}
