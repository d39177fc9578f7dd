use std::fs;
use std::path::Path;

use chrono::Utc;
use regex::Regex;
use tracing::info;

use crate::error::NotebenchError;
use crate::report::{COMPARISON_GRAPH_FILE, README_FILE};

/// One run section in the regenerated README.
#[derive(Debug, Clone)]
pub struct ReadmeEntry {
    pub name: String,
    /// Root-relative link to the run's chart image, forward slashes.
    pub image: String,
}

/// Next cache-busting version: one past the highest `?v=N` token found in
/// the existing document, or 1 when there is none.
pub fn next_version(existing: &str) -> u64 {
    let pattern = Regex::new(r"\?v=(\d+)").expect("version token pattern should compile");
    pattern
        .captures_iter(existing)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse::<u64>().ok())
        .max()
        .map_or(1, |v| v + 1)
}

/// Render the README body with every image link carrying the same version
/// token, so browsers refetch charts after each regeneration.
pub fn render(entries: &[ReadmeEntry], version: u64) -> String {
    let stamp = Utc::now().format("%Y-%m-%d %H:%M UTC");
    let mut out = String::new();
    out.push_str("# Benchmark Results\n\n");
    out.push_str(&format!("Last generated: {stamp}\n\n"));
    out.push_str("## Comparison\n\n");
    out.push_str(&format!(
        "![Benchmark comparison]({COMPARISON_GRAPH_FILE}?v={version})\n\n"
    ));
    out.push_str("## Runs\n");
    for entry in entries {
        out.push_str(&format!(
            "\n### {}\n\n![{}]({}?v={})\n",
            entry.name, entry.name, entry.image, version
        ));
    }
    out
}

/// Regenerate the README at the results root, bumping the version token past
/// whatever the previous document carried. Returns the version used.
pub fn write_readme(root: &Path, entries: &[ReadmeEntry]) -> Result<u64, NotebenchError> {
    let path = root.join(README_FILE);
    let existing = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err.into()),
    };
    let version = next_version(&existing);
    fs::write(&path, render(entries, version))?;
    info!(path = %path.display(), version, "regenerated readme");
    Ok(version)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entries() -> Vec<ReadmeEntry> {
        vec![
            ReadmeEntry {
                name: "rust actix web".to_string(),
                image: "backends/rust/actix-web/tests/graph.png".to_string(),
            },
            ReadmeEntry {
                name: "python fastapi".to_string(),
                image: "backends/python/fast-api/tests/graph.png".to_string(),
            },
        ]
    }

    // -----------------------------------------------------------------------
    // next_version
    // -----------------------------------------------------------------------

    #[test]
    fn first_version_is_one() {
        assert_eq!(next_version(""), 1);
        assert_eq!(next_version("# Results\n\nno images here\n"), 1);
    }

    #[test]
    fn version_is_one_past_the_highest_token() {
        let doc = "![a](a.png?v=3)\n![b](b.png?v=7)\n![c](c.png?v=2)\n";
        assert_eq!(next_version(doc), 8);
    }

    #[test]
    fn malformed_tokens_are_ignored() {
        assert_eq!(next_version("![a](a.png?v=abc)"), 1);
        assert_eq!(next_version("![a](a.png?v=99999999999999999999999)"), 1);
    }

    // -----------------------------------------------------------------------
    // render
    // -----------------------------------------------------------------------

    #[test]
    fn render_links_every_image_with_the_version_token() {
        let body = render(&make_entries(), 4);
        assert!(body.contains("comparison.png?v=4"));
        assert!(body.contains("backends/rust/actix-web/tests/graph.png?v=4"));
        assert!(body.contains("backends/python/fast-api/tests/graph.png?v=4"));
    }

    #[test]
    fn render_has_one_section_per_run() {
        let body = render(&make_entries(), 1);
        assert!(body.contains("### rust actix web"));
        assert!(body.contains("### python fastapi"));
    }

    // -----------------------------------------------------------------------
    // write_readme
    // -----------------------------------------------------------------------

    #[test]
    fn regeneration_bumps_the_version() {
        let root = tempfile::tempdir().expect("tempdir");
        let entries = make_entries();

        let first = write_readme(root.path(), &entries).expect("first write");
        assert_eq!(first, 1);

        let second = write_readme(root.path(), &entries).expect("second write");
        assert_eq!(second, 2);

        let body = std::fs::read_to_string(root.path().join(README_FILE)).expect("read");
        assert!(body.contains("?v=2"));
        assert!(!body.contains("?v=1"));
    }

    #[test]
    fn existing_document_seeds_the_version() {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            root.path().join(README_FILE),
            "# Old\n\n![x](comparison.png?v=41)\n",
        )
        .expect("seed");

        let version = write_readme(root.path(), &make_entries()).expect("write");
        assert_eq!(version, 42);
    }
}
