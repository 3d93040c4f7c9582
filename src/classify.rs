// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Photosort contributors

//! Image classification via the vision model
//!
//! Wraps one inference round-trip per image: build the prompt, ship the
//! encoded image, and turn the model's reply into a filtered list of
//! category scores. Category names the model invents are dropped here so
//! they can never become folder names downstream.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::lmstudio::LmStudioClient;
use crate::settings::Settings;
use crate::Result;

/// One (category, confidence) pair from the model
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore {
    pub name: String,
    pub confidence: f64,
}

/// Ordered classification scores for a single image.
///
/// Empty scores mean the model's reply was unusable; downstream treats
/// that the same as "no category was confident enough".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub scores: Vec<CategoryScore>,
}

impl Classification {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Highest-confidence entry; ties broken by first occurrence
    pub fn top_score(&self) -> Option<&CategoryScore> {
        let mut best: Option<&CategoryScore> = None;
        for score in &self.scores {
            match best {
                Some(b) if score.confidence <= b.confidence => {}
                _ => best = Some(score),
            }
        }
        best
    }
}

/// A classifier that maps one image to category scores
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn classify(&self, image: &Path) -> Result<Classification>;
}

/// Classifier backed by the LM Studio vision endpoint
pub struct VisionClassifier<'a> {
    client: &'a LmStudioClient,
    model: String,
    categories: Vec<String>,
    prompt: String,
}

impl<'a> VisionClassifier<'a> {
    pub fn new(client: &'a LmStudioClient, model: String, settings: &Settings) -> Self {
        let prompt = build_prompt(&settings.categories, &settings.priority);
        Self {
            client,
            model,
            categories: settings.categories.clone(),
            prompt,
        }
    }

    /// Downscale oversized photos and re-encode as JPEG before upload.
    /// Falls back to the raw file bytes when the image cannot be decoded.
    fn prepare_image(path: &Path) -> Result<Vec<u8>> {
        let img = image::open(path)?;

        let img = if img.width() > 1024 || img.height() > 1024 {
            img.resize(1024, 1024, image::imageops::FilterType::Triangle)
        } else {
            img
        };

        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        img.write_to(&mut cursor, image::ImageFormat::Jpeg)?;

        Ok(buffer)
    }

    fn encode_image(path: &Path) -> Result<String> {
        let data = match Self::prepare_image(path) {
            Ok(data) => data,
            Err(e) => {
                debug!("Could not re-encode {:?} ({}), sending raw bytes", path, e);
                std::fs::read(path)?
            }
        };
        Ok(general_purpose::STANDARD.encode(&data))
    }
}

#[async_trait]
impl ImageClassifier for VisionClassifier<'_> {
    async fn classify(&self, image: &Path) -> Result<Classification> {
        let image_base64 = Self::encode_image(image)?;

        let content = self
            .client
            .chat_with_image(&self.model, &self.prompt, &image_base64)
            .await?;

        debug!("Model reply for {:?}: {}", image, content);

        Ok(parse_classification(&content, &self.categories))
    }
}

/// Build the classification prompt, listing priority categories first to
/// bias the model toward them.
pub fn build_prompt(categories: &[String], priority: &[String]) -> String {
    let mut ordered: Vec<&str> = priority.iter().map(String::as_str).collect();
    for cat in categories {
        if !priority.contains(cat) {
            ordered.push(cat);
        }
    }

    format!(
        "Analyze this image and assign it to one or more of these categories: {}.\n\
         Use ONLY these exact category names. Do not invent new categories.\n\
         Return the category(ies) and a confidence score (0-1) for each.\n\
         Format your response as JSON: {{\"categories\": [{{\"name\": \"category\", \"confidence\": 0.9}}]}}",
        ordered.join(", ")
    )
}

#[derive(Deserialize)]
struct RawClassification {
    categories: Vec<RawScore>,
}

#[derive(Deserialize)]
struct RawScore {
    name: String,
    confidence: f64,
}

/// Strip a surrounding markdown code fence, if any, from the model reply
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the language hint on the opening fence line ("json")
    match inner.split_once('\n') {
        Some((first, rest)) if first.trim().eq_ignore_ascii_case("json") || first.trim().is_empty() => {
            rest.trim()
        }
        _ => inner.trim(),
    }
}

/// Parse the model reply into a `Classification`.
///
/// A malformed reply degrades to an empty classification; names outside
/// the requested category set are filtered out with a warning.
pub fn parse_classification(content: &str, categories: &[String]) -> Classification {
    let json_str = strip_code_fence(content);

    let raw: RawClassification = match serde_json::from_str(json_str) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Unparseable model response ({}), treating as uncertain", e);
            return Classification::empty();
        }
    };

    let mut scores = Vec::with_capacity(raw.categories.len());
    for entry in raw.categories {
        if !categories.iter().any(|c| *c == entry.name) {
            warn!(
                "Model suggested unknown category '{}', dropping it",
                entry.name
            );
            continue;
        }
        scores.push(CategoryScore {
            name: entry.name,
            confidence: entry.confidence.clamp(0.0, 1.0),
        });
    }

    Classification { scores }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prompt_lists_priority_first() {
        let prompt = build_prompt(&cats(&["Cats", "Dogs", "Birds"]), &cats(&["Dogs"]));
        assert!(prompt.contains("Dogs, Cats, Birds"));
        assert!(prompt.contains("ONLY these exact category names"));
    }

    #[test]
    fn test_prompt_without_priority_keeps_order() {
        let prompt = build_prompt(&cats(&["Cats", "Dogs"]), &[]);
        assert!(prompt.contains("Cats, Dogs"));
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```json\n{\"a\":1}\n```  "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_classification() {
        let content = r#"{"categories": [{"name": "Cats", "confidence": 0.9}]}"#;
        let result = parse_classification(content, &cats(&["Cats", "Dogs"]));
        assert_eq!(result.scores.len(), 1);
        assert_eq!(result.scores[0].name, "Cats");
        assert_eq!(result.scores[0].confidence, 0.9);
    }

    #[test]
    fn test_parse_fenced_response() {
        let content = "```json\n{\"categories\": [{\"name\": \"Dogs\", \"confidence\": 0.7}]}\n```";
        let result = parse_classification(content, &cats(&["Cats", "Dogs"]));
        assert_eq!(result.scores[0].name, "Dogs");
    }

    #[test]
    fn test_hallucination_filter() {
        let content = r#"{"categories": [{"name": "Sunset", "confidence": 0.99}]}"#;
        let result = parse_classification(content, &cats(&["Cats", "Dogs"]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_hallucination_filter_is_case_sensitive() {
        let content = r#"{"categories": [{"name": "cats", "confidence": 0.9}]}"#;
        let result = parse_classification(content, &cats(&["Cats"]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_malformed_response_degrades_to_empty() {
        let result = parse_classification("I think this is a cat!", &cats(&["Cats"]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_confidence_clamped() {
        let content = r#"{"categories": [{"name": "Cats", "confidence": 1.7}]}"#;
        let result = parse_classification(content, &cats(&["Cats"]));
        assert_eq!(result.scores[0].confidence, 1.0);
    }

    #[test]
    fn test_top_score_tie_first_wins() {
        let c = Classification {
            scores: vec![
                CategoryScore { name: "A".into(), confidence: 0.8 },
                CategoryScore { name: "B".into(), confidence: 0.8 },
            ],
        };
        assert_eq!(c.top_score().unwrap().name, "A");
    }

    #[test]
    fn test_top_score_picks_highest() {
        let c = Classification {
            scores: vec![
                CategoryScore { name: "A".into(), confidence: 0.6 },
                CategoryScore { name: "B".into(), confidence: 0.9 },
            ],
        };
        assert_eq!(c.top_score().unwrap().name, "B");
    }
}
