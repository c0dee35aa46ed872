//! FFMETADATA1 chapter markers for the final video.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One chapter marker on the final video timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterMarker {
    pub title: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Lay chapters end to end from their durations in seconds.
///
/// With a ceiling, markers past it are dropped and the last one is cut at it.
pub fn build_markers(chapters: &[(String, f64)], ceiling: Option<f64>) -> Vec<ChapterMarker> {
    let limit_ms = ceiling.map(seconds_to_ms);
    let mut markers = Vec::with_capacity(chapters.len());
    let mut elapsed = 0.0;

    for (title, duration) in chapters {
        let start_ms = seconds_to_ms(elapsed);
        elapsed += duration.max(0.0);
        let mut end_ms = seconds_to_ms(elapsed);

        if let Some(limit) = limit_ms {
            if start_ms >= limit {
                break;
            }
            end_ms = end_ms.min(limit);
        }

        markers.push(ChapterMarker {
            title: title.clone(),
            start_ms,
            end_ms,
        });
    }

    markers
}

/// Write an FFMETADATA1 file with a global title and the chapter markers.
pub fn write_metadata(title: &str, markers: &[ChapterMarker], output_path: &Path) -> Result<()> {
    let mut file = File::create(output_path).context("Failed to create metadata file")?;

    writeln!(file, ";FFMETADATA1")?;
    writeln!(file, "title={}", escape_metadata_value(title))?;
    writeln!(file, "genre=Lesson")?;
    writeln!(file)?;

    for marker in markers {
        writeln!(file, "[CHAPTER]")?;
        writeln!(file, "TIMEBASE=1/1000")?;
        writeln!(file, "START={}", marker.start_ms)?;
        writeln!(file, "END={}", marker.end_ms)?;
        writeln!(file, "title={}", escape_metadata_value(&marker.title))?;
        writeln!(file)?;
    }

    Ok(())
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0).round() as u64
}

/// Escape `= ; # \` and newlines for FFMETADATA values.
fn escape_metadata_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '=' | ';' | '#' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chapters() -> Vec<(String, f64)> {
        vec![
            ("Intro".to_string(), 5.0),
            ("Details".to_string(), 7.5),
            ("Summary".to_string(), 4.0),
        ]
    }

    #[test]
    fn test_markers_are_contiguous() {
        let markers = build_markers(&chapters(), None);
        assert_eq!(markers.len(), 3);
        assert_eq!((markers[0].start_ms, markers[0].end_ms), (0, 5000));
        assert_eq!((markers[1].start_ms, markers[1].end_ms), (5000, 12500));
        assert_eq!((markers[2].start_ms, markers[2].end_ms), (12500, 16500));
    }

    #[test]
    fn test_markers_clamped_to_ceiling() {
        let markers = build_markers(&chapters(), Some(10.0));
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[1].end_ms, 10000);

        let markers = build_markers(&chapters(), Some(5.0));
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn test_escape_metadata_value() {
        assert_eq!(escape_metadata_value("Simple"), "Simple");
        assert_eq!(escape_metadata_value("a=b;c#d"), r"a\=b\;c\#d");
        assert_eq!(escape_metadata_value("back\\slash"), "back\\\\slash");
        assert_eq!(escape_metadata_value("Line1\r\nLine2"), "Line1\\nLine2");
    }

    #[test]
    fn test_write_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chapters.txt");
        let markers = build_markers(&chapters(), None);

        write_metadata("Photosynthesis", &markers, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(";FFMETADATA1\n"));
        assert!(content.contains("title=Photosynthesis"));
        assert_eq!(content.matches("[CHAPTER]").count(), 3);
        assert!(content.contains("START=5000\nEND=12500\ntitle=Details"));
    }
}
