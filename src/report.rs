// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Photosort contributors

//! CSV report writer
//!
//! One row per processed image, in processing order, failed
//! classifications included as error rows.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::batch::ResultSet;
use crate::Result;

/// Write the analysis report for a run.
///
/// Columns: `Image, Categories, Confidences, Threshold`. Returns the path
/// of the written file.
pub fn write_report(
    results: &ResultSet,
    threshold: f64,
    photo_dir: &Path,
    file_name: &str,
) -> Result<PathBuf> {
    let report_path = photo_dir.join(file_name);
    let file = File::create(&report_path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "Image,Categories,Confidences,Threshold")?;

    for (image, result) in results.iter() {
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| image.display().to_string());

        let (categories, confidences) = match result {
            Some(classification) => {
                let categories = classification
                    .scores
                    .iter()
                    .map(|s| s.name.clone())
                    .collect::<Vec<_>>()
                    .join(", ");
                let confidences = classification
                    .scores
                    .iter()
                    .map(|s| format!("{:.2}", s.confidence))
                    .collect::<Vec<_>>()
                    .join(", ");
                (categories, confidences)
            }
            None => ("Error: classification failed".to_string(), String::new()),
        };

        writeln!(
            writer,
            "{},{},{},{:.2}",
            csv_field(&name),
            csv_field(&categories),
            csv_field(&confidences),
            threshold
        )?;
    }

    writer.flush()?;
    info!("Report written to {:?}", report_path);
    Ok(report_path)
}

/// Quote a CSV field when it contains a delimiter, quote, or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
