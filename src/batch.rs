// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Photosort contributors

//! Sequential batch processing of the image list
//!
//! One image is classified at a time; the local server typically runs a
//! single model on a single GPU, so there is no parallel fan-out. A failed
//! inference is recorded and the batch continues.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::classify::{Classification, ImageClassifier};

/// Ordered per-image classification results for one run.
///
/// Insertion order is scan order. `None` marks an image whose inference
/// call failed outright (as opposed to an unparseable reply, which is an
/// empty classification).
#[derive(Debug, Default)]
pub struct ResultSet {
    entries: Vec<(PathBuf, Option<Classification>)>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, image: PathBuf, result: Option<Classification>) {
        self.entries.push((image, result));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, Option<&Classification>)> {
        self.entries
            .iter()
            .map(|(path, result)| (path.as_path(), result.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of images with a usable (non-failed) classification
    pub fn classified_count(&self) -> usize {
        self.entries.iter().filter(|(_, r)| r.is_some()).count()
    }
}

/// Classify every image in order, isolating per-image failures.
///
/// An inference error never aborts the batch: the image is recorded with
/// no result and processing moves on.
pub async fn process_all(images: &[PathBuf], classifier: &dyn ImageClassifier) -> ResultSet {
    let mut results = ResultSet::new();
    let total = images.len();

    for (i, image) in images.iter().enumerate() {
        info!("Processing image {}/{}: {:?}", i + 1, total, image);

        match classifier.classify(image).await {
            Ok(classification) => {
                results.push(image.clone(), Some(classification));
            }
            Err(e) => {
                warn!("Failed to classify {:?}: {}", image, e);
                results.push(image.clone(), None);
            }
        }
    }

    info!(
        "Classified {}/{} images",
        results.classified_count(),
        results.len()
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::CategoryScore;
    use crate::{PhotosortError, Result};
    use async_trait::async_trait;

    struct StubClassifier {
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl ImageClassifier for StubClassifier {
        async fn classify(&self, image: &Path) -> Result<Classification> {
            let name = image.file_name().unwrap().to_str().unwrap();
            if Some(name) == self.fail_on {
                return Err(PhotosortError::Inference("connection reset".to_string()));
            }
            Ok(Classification {
                scores: vec![CategoryScore {
                    name: "Cats".to_string(),
                    confidence: 0.9,
                }],
            })
        }
    }

    fn image_list(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/photos/{}", n))).collect()
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_batch() {
        let images = image_list(&["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"]);
        let classifier = StubClassifier { fail_on: Some("c.jpg") };

        let results = process_all(&images, &classifier).await;

        assert_eq!(results.len(), 5);
        assert_eq!(results.classified_count(), 4);

        let failed: Vec<_> = results
            .iter()
            .filter(|(_, r)| r.is_none())
            .map(|(p, _)| p.to_path_buf())
            .collect();
        assert_eq!(failed, vec![PathBuf::from("/photos/c.jpg")]);
    }

    #[tokio::test]
    async fn test_results_keep_scan_order() {
        let images = image_list(&["a.jpg", "b.jpg", "c.jpg"]);
        let classifier = StubClassifier { fail_on: None };

        let results = process_all(&images, &classifier).await;
        let order: Vec<_> = results.iter().map(|(p, _)| p.to_path_buf()).collect();
        assert_eq!(order, images);
    }
}
