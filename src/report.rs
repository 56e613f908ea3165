use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::AssistantResult;

pub const REPORT_TITLE: &str = "Your Academics & Career Assistant - Recommendation Report";
const WIDTH: usize = 80;

/// Renders a single-page plain text report. Depends only on its inputs.
pub fn export(summary: &str, recommendation: &str) -> Vec<u8> {
    let mut doc = String::new();
    doc.push_str(REPORT_TITLE);
    doc.push_str("\n\n");
    doc.push_str("Your Inputs:\n");
    doc.push_str(&textwrap::fill(summary, WIDTH));
    doc.push_str("\n\nRecommendation:\n");
    for paragraph in recommendation.trim().split("\n\n") {
        doc.push_str(&textwrap::fill(paragraph.trim(), WIDTH));
        doc.push_str("\n\n");
    }
    doc.truncate(doc.trim_end().len());
    doc.push('\n');
    doc.into_bytes()
}

pub fn write_report(path: &Path, summary: &str, recommendation: &str) -> AssistantResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, export(summary, recommendation))?;
    info!(path = %path.display(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;

    #[test]
    fn test_export_layout() {
        let doc = String::from_utf8(export("Age Group: 18 - 22", "Consider IT.")).unwrap();
        let lines: Vec<&str> = doc.lines().collect();
        assert_eq!(lines[0], REPORT_TITLE);
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "Your Inputs:");
        assert_eq!(lines[3], "Age Group: 18 - 22");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "Recommendation:");
        assert_eq!(lines[6], "Consider IT.");
        assert!(doc.ends_with("Consider IT.\n"));
    }

    #[test]
    fn test_export_wraps_long_text() {
        let long = "word ".repeat(60);
        let doc = String::from_utf8(export("summary", &long)).unwrap();
        assert!(doc.lines().all(|line| line.len() <= WIDTH));
    }

    #[test]
    fn test_export_is_pure() {
        assert_eq!(export("a", "b"), export("a", "b"));
    }

    #[test]
    fn test_write_report_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("career.txt");
        write_report(&path, "summary", "advice").unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, export("summary", "advice"));
    }

    #[test]
    fn test_write_report_failure_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let err = write_report(&blocker.join("career.txt"), "s", "r").unwrap_err();
        assert!(matches!(err, AssistantError::ExportFailed(_)));
    }
}
