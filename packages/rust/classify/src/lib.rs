//! Law-page classification of captured snapshots.
//!
//! Decides whether a snapshot contains actual statutory text rather than a
//! portal or informational page. The decision is lexical and deterministic:
//! the same bytes and URL always classify the same way.
//!
//! - HTML: strip script/style/nav, then require a law-vocabulary marker in
//!   URL+title+body plus at least two distinct structure patterns in the body.
//! - PDF: read the cached text sidecar (running OCR once if configured); a
//!   law-shaped URL can stand in for a missing text marker, and one structure
//!   hit suffices since OCR output is lossy.
//! - URL paths carrying press/news/blog style tokens are rejected before any
//!   content is read.

pub mod markers;
pub mod pdf;

use std::path::PathBuf;

use lexhound_shared::config::{AppConfig, DataDirs, OcrConfig};
use lexhound_shared::html;
use lexhound_shared::types::Reason;
use serde::Serialize;
use tracing::{debug, instrument};

/// Structure-pattern floor for HTML documents. One stray "Article" mention
/// is not legislation.
const HTML_STRUCTURE_FLOOR: usize = 2;
/// PDFs only need one hit; extracted text is often partial.
const PDF_STRUCTURE_FLOOR: usize = 1;

/// Outcome of classifying one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct LawCheck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    pub law_marker: bool,
    pub drug_marker: bool,
    pub structure_hits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub is_pdf: bool,
    pub ocr_ran: bool,
}

impl LawCheck {
    fn rejected(reason: Reason) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
            law_marker: false,
            drug_marker: false,
            structure_hits: 0,
            title: None,
            is_pdf: false,
            ocr_ran: false,
        }
    }
}

pub struct LawPageClassifier {
    data_root: PathBuf,
    ocr: OcrConfig,
}

impl LawPageClassifier {
    pub fn new(dirs: &DataDirs, config: &AppConfig) -> Self {
        Self {
            data_root: dirs.root().to_path_buf(),
            ocr: config.ocr.clone(),
        }
    }

    /// Classifies the snapshot at `storage_path` (relative to the data root)
    /// that was captured from `url`.
    #[instrument(skip_all, fields(path = storage_path, url))]
    pub fn classify(&self, storage_path: &str, url: &str) -> LawCheck {
        let absolute = self.data_root.join(storage_path);
        if !absolute.exists() {
            return LawCheck::rejected(Reason::SnapshotMissing);
        }
        if markers::is_denied_url(url) {
            return LawCheck::rejected(Reason::DeniedUrl);
        }
        let is_pdf = storage_path.to_ascii_lowercase().ends_with(".pdf");
        let check = if is_pdf {
            self.classify_pdf(&absolute, url)
        } else {
            self.classify_html(&absolute, url)
        };
        debug!(
            ok = check.ok,
            structure_hits = check.structure_hits,
            law_marker = check.law_marker,
            drug_marker = check.drug_marker,
            "classified snapshot"
        );
        check
    }

    fn classify_html(&self, path: &std::path::Path, url: &str) -> LawCheck {
        let raw = match std::fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => return LawCheck::rejected(Reason::SnapshotMissing),
        };
        let cleaned = html::strip_noise(&raw);
        let title = html::extract_title(&cleaned);
        let text = html::visible_text(&raw);
        let haystack = format!("{url} {} {text}", title.as_deref().unwrap_or_default());

        let law_marker = markers::has_law_marker(&haystack);
        let drug_marker = markers::has_drug_marker(&haystack);
        let structure_hits = markers::structure_hits(&text);

        let reason = if !law_marker {
            Some(Reason::NoLawMarker)
        } else if structure_hits < HTML_STRUCTURE_FLOOR {
            Some(Reason::NoLawStructure)
        } else {
            None
        };
        LawCheck {
            ok: reason.is_none(),
            reason,
            law_marker,
            drug_marker,
            structure_hits,
            title,
            is_pdf: false,
            ocr_ran: false,
        }
    }

    fn classify_pdf(&self, path: &std::path::Path, url: &str) -> LawCheck {
        let extracted = pdf::pdf_text(path, &self.ocr);
        let text = normalize(&extracted.text);

        let law_marker = markers::is_law_shaped_url(url) || markers::has_law_marker(&text);
        let drug_marker = markers::has_drug_marker(&text);
        let structure_hits = markers::structure_hits(&text);

        let reason = if !law_marker {
            Some(Reason::NoLawMarker)
        } else if structure_hits < PDF_STRUCTURE_FLOOR {
            Some(Reason::NoLawStructure)
        } else {
            None
        };
        LawCheck {
            ok: reason.is_none(),
            reason,
            law_marker,
            drug_marker,
            structure_hits,
            title: None,
            is_pdf: true,
            ocr_ran: extracted.ocr_ran,
        }
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    struct TestTree {
        root: PathBuf,
        classifier: LawPageClassifier,
    }

    impl TestTree {
        fn new() -> Self {
            let root = std::env::temp_dir().join(format!("lexhound-classify-{}", Uuid::now_v7()));
            let dirs = DataDirs::new(&root);
            let classifier = LawPageClassifier::new(&dirs, &AppConfig::default());
            Self { root, classifier }
        }

        fn write(&self, relative: &str, body: &str) {
            let path = self.root.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("parents");
            }
            std::fs::write(&path, body).expect("write");
        }
    }

    impl Drop for TestTree {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    const LAW_HTML: &str = r#"<html><head><title>Act No. 15 on Narcotic Substances</title></head>
<body><h1>Act on Narcotic Substances</h1>
<p>Article 1. The cultivation of cannabis is prohibited.</p>
<p>Section 4. Licensing by the ministry of health.</p>
<p>Published in the Official Gazette, entered into force 1 March 2020.</p>
</body></html>"#;

    #[test]
    fn missing_snapshot_is_reported_before_anything_else() {
        let tree = TestTree::new();
        let check = tree
            .classifier
            .classify("snapshots/AA/20260101/missing.html", "https://example.gov/laws");
        assert!(!check.ok);
        assert_eq!(check.reason, Some(Reason::SnapshotMissing));
    }

    #[test]
    fn denied_url_tokens_short_circuit_content_inspection() {
        let tree = TestTree::new();
        tree.write("snapshots/AA/20260101/a.html", LAW_HTML);
        let check = tree
            .classifier
            .classify("snapshots/AA/20260101/a.html", "https://example.gov/news/law-passed");
        assert!(!check.ok);
        assert_eq!(check.reason, Some(Reason::DeniedUrl));
    }

    #[test]
    fn statute_like_html_is_accepted() {
        let tree = TestTree::new();
        tree.write("snapshots/AA/20260101/a.html", LAW_HTML);
        let check = tree
            .classifier
            .classify("snapshots/AA/20260101/a.html", "https://example.gov/laws/15");
        assert!(check.ok, "reason: {:?}", check.reason);
        assert!(check.law_marker);
        assert!(check.drug_marker);
        assert!(check.structure_hits >= 2);
        assert_eq!(check.title.as_deref(), Some("Act No. 15 on Narcotic Substances"));
    }

    #[test]
    fn a_single_structure_term_is_not_legislation() {
        let tree = TestTree::new();
        tree.write(
            "snapshots/AA/20260101/a.html",
            "<html><body><p>Read this article about our city.</p></body></html>",
        );
        let check = tree
            .classifier
            .classify("snapshots/AA/20260101/a.html", "https://example.gov/about");
        assert!(!check.ok);
        assert_eq!(check.reason, Some(Reason::NoLawStructure));
        assert!(check.law_marker);
        assert_eq!(check.structure_hits, 1);
        assert!(!check.drug_marker);
    }

    #[test]
    fn pages_without_legal_vocabulary_lack_the_marker() {
        let tree = TestTree::new();
        tree.write(
            "snapshots/AA/20260101/a.html",
            "<html><body><p>Welcome to the municipal tourist portal.</p></body></html>",
        );
        let check = tree
            .classifier
            .classify("snapshots/AA/20260101/a.html", "https://example.gov/welcome");
        assert!(!check.ok);
        assert_eq!(check.reason, Some(Reason::NoLawMarker));
    }

    #[test]
    fn classification_is_deterministic() {
        let tree = TestTree::new();
        tree.write("snapshots/AA/20260101/a.html", LAW_HTML);
        let first = tree
            .classifier
            .classify("snapshots/AA/20260101/a.html", "https://example.gov/laws/15");
        let second = tree
            .classifier
            .classify("snapshots/AA/20260101/a.html", "https://example.gov/laws/15");
        assert_eq!(first.ok, second.ok);
        assert_eq!(first.reason, second.reason);
        assert_eq!(first.structure_hits, second.structure_hits);
    }

    #[test]
    fn pdf_with_sidecar_text_is_classified_from_the_sidecar() {
        let tree = TestTree::new();
        tree.write("snapshots/AA/20260101/doc.pdf", "%PDF-1.4 binary");
        tree.write(
            "snapshots/AA/20260101/doc.txt",
            "Official Gazette No. 12. Article 3: possession of narkotike is punishable.",
        );
        let check = tree
            .classifier
            .classify("snapshots/AA/20260101/doc.pdf", "https://example.gov/files/doc.pdf");
        assert!(check.ok, "reason: {:?}", check.reason);
        assert!(check.is_pdf);
        assert!(!check.ocr_ran);
        assert!(check.drug_marker);
    }

    #[test]
    fn text_free_pdf_with_law_shaped_url_still_needs_structure() {
        let tree = TestTree::new();
        tree.write("snapshots/AA/20260101/doc.pdf", "%PDF-1.4 binary");
        let check = tree
            .classifier
            .classify("snapshots/AA/20260101/doc.pdf", "https://example.gov/gazeta/15.pdf");
        assert!(!check.ok);
        assert!(check.law_marker, "url shape supplies the marker");
        assert_eq!(check.reason, Some(Reason::NoLawStructure));
    }

    #[test]
    fn text_free_pdf_without_law_shaped_url_lacks_the_marker() {
        let tree = TestTree::new();
        tree.write("snapshots/AA/20260101/doc.pdf", "%PDF-1.4 binary");
        let check = tree
            .classifier
            .classify("snapshots/AA/20260101/doc.pdf", "https://example.gov/files/annual.pdf");
        assert!(!check.ok);
        assert_eq!(check.reason, Some(Reason::NoLawMarker));
    }
}
