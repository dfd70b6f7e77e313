//! Plan building: deterministic destination folder and filename
//!
//! Category inference is the inexact, heuristic part of folder naming, so
//! it lives behind [`CategoryStrategy`] and stays out of the move state
//! machine. Filename derivation is fully deterministic: the same
//! title/author always yields the same `Author-Title.pdf`.

use crate::config::{CategoryRule, Config};
use crate::extract::ExtractedMetadata;
use crate::journal::PlanEntry;
use std::path::Path;

/// Pluggable destination-folder inference
pub trait CategoryStrategy {
    /// Infer destination path segments for the given metadata
    fn infer(&self, metadata: &ExtractedMetadata) -> Vec<String>;
}

/// Keyword-driven category inference from the config rule table
///
/// The extracted subject hint (falling back to the title) is matched
/// case-insensitively against each rule's keywords, in order; the first
/// matching rule's path wins. Files no rule matches go to the fallback
/// bucket.
pub struct KeywordCategories {
    rules: Vec<CategoryRule>,
    fallback: String,
}

impl KeywordCategories {
    pub fn new(rules: Vec<CategoryRule>, fallback: String) -> Self {
        Self { rules, fallback }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.categories.clone(), config.fallback_category.clone())
    }
}

impl CategoryStrategy for KeywordCategories {
    fn infer(&self, metadata: &ExtractedMetadata) -> Vec<String> {
        let haystack = format!(
            "{} {}",
            metadata.subject.as_deref().unwrap_or_default(),
            metadata.title
        )
        .to_lowercase();

        for rule in &self.rules {
            if rule
                .keywords
                .iter()
                .any(|kw| !kw.is_empty() && haystack.contains(&kw.to_lowercase()))
            {
                return split_path_segments(&rule.path);
            }
        }

        split_path_segments(&self.fallback)
    }
}

/// Split a forward-slash rule path into sanitized segments
fn split_path_segments(path: &str) -> Vec<String> {
    path.split('/')
        .map(sanitize_component)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Sanitize a path component: spaces become underscores, then only
/// alphanumeric characters plus `._-` survive.
pub fn sanitize_component(component: &str) -> String {
    component
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// Collapse a metadata field into a filename fragment: whitespace is
/// removed entirely and illegal characters are dropped, so
/// "Quantum Theory" becomes "QuantumTheory".
fn filename_fragment(text: &str) -> String {
    text.split_whitespace()
        .collect::<String>()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// Builds placement plans for extracted files
pub struct PlanBuilder {
    strategy: Box<dyn CategoryStrategy>,
}

impl PlanBuilder {
    pub fn new(strategy: Box<dyn CategoryStrategy>) -> Self {
        Self { strategy }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Box::new(KeywordCategories::from_config(config)))
    }

    /// Build the plan entry for an extracted file.
    ///
    /// The destination filename is `Author-Title.ext` with the author
    /// reduced to the surname when the model returned "Surname, Given".
    /// When author or title sanitize to nothing, the original filename
    /// stem is kept so the output is never empty.
    pub fn build(&self, source_path: &Path, metadata: &ExtractedMetadata) -> PlanEntry {
        let dest_folder = self.strategy.infer(metadata);

        let surname = metadata
            .author
            .split(',')
            .next()
            .unwrap_or(&metadata.author);
        let author = filename_fragment(surname);
        let title = filename_fragment(&metadata.title);

        let extension = source_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        let stem = if author.is_empty() || title.is_empty() {
            let fallback = source_path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(sanitize_component)
                .unwrap_or_default();
            if fallback.is_empty() {
                "unnamed".to_string()
            } else {
                fallback
            }
        } else {
            format!("{}-{}", author, title)
        };

        PlanEntry {
            source_path: source_path.to_path_buf(),
            dest_folder,
            dest_filename: format!("{}{}", stem, extension),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn meta(title: &str, author: &str, subject: Option<&str>) -> ExtractedMetadata {
        ExtractedMetadata {
            title: title.into(),
            author: author.into(),
            subject: subject.map(Into::into),
        }
    }

    fn builder_with_rules() -> PlanBuilder {
        PlanBuilder::new(Box::new(KeywordCategories::new(
            vec![
                CategoryRule {
                    keywords: vec!["quantum".into()],
                    path: "Physics/Quantum".into(),
                },
                CategoryRule {
                    keywords: vec!["physics".into()],
                    path: "Physics".into(),
                },
            ],
            "Uncategorized".into(),
        )))
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("a b c.pdf"), "a_b_c.pdf");
        assert_eq!(sanitize_component("weird/|:*name"), "weirdname");
        assert_eq!(sanitize_component("keep-this_1.2"), "keep-this_1.2");
    }

    #[test]
    fn test_sample_scenario() {
        let builder = builder_with_rules();
        let entry = builder.build(
            Path::new("/papers/paper1.pdf"),
            &meta("Quantum Theory", "Einstein", Some("quantum")),
        );

        assert_eq!(entry.dest_folder, vec!["Physics", "Quantum"]);
        assert_eq!(entry.dest_filename, "Einstein-QuantumTheory.pdf");
        assert_eq!(entry.source_path, PathBuf::from("/papers/paper1.pdf"));
    }

    #[test]
    fn test_hyphenated_title_keeps_hyphens() {
        let builder = builder_with_rules();
        let entry = builder.build(
            Path::new("/papers/paper2.pdf"),
            &meta("Spin-Orbit Coupling", "Dirac", Some("quantum")),
        );

        assert_eq!(entry.dest_filename, "Dirac-Spin-OrbitCoupling.pdf");
    }

    #[test]
    fn test_determinism() {
        let builder = builder_with_rules();
        let m = meta("Quantum Theory", "Einstein", Some("quantum"));
        let a = builder.build(Path::new("/papers/x.pdf"), &m);
        let b = builder.build(Path::new("/papers/x.pdf"), &m);
        assert_eq!(a, b);
    }

    #[test]
    fn test_surname_taken_from_comma_form() {
        let builder = builder_with_rules();
        let entry = builder.build(
            Path::new("/papers/x.pdf"),
            &meta("General Relativity", "Einstein, Albert", Some("physics")),
        );
        assert_eq!(entry.dest_filename, "Einstein-GeneralRelativity.pdf");
        assert_eq!(entry.dest_folder, vec!["Physics"]);
    }

    #[test]
    fn test_title_match_when_no_subject() {
        let builder = builder_with_rules();
        let entry = builder.build(
            Path::new("/papers/x.pdf"),
            &meta("Introduction to Quantum Field Theory", "Peskin", None),
        );
        assert_eq!(entry.dest_folder, vec!["Physics", "Quantum"]);
    }

    #[test]
    fn test_fallback_category() {
        let builder = builder_with_rules();
        let entry = builder.build(
            Path::new("/papers/x.pdf"),
            &meta("A History of Rome", "Gibbon", Some("history")),
        );
        assert_eq!(entry.dest_folder, vec!["Uncategorized"]);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let builder = builder_with_rules();
        let entry = builder.build(
            Path::new("/papers/x.pdf"),
            &meta("Quantum Physics", "Someone", None),
        );
        assert_eq!(entry.dest_folder, vec!["Physics", "Quantum"]);
    }

    #[test]
    fn test_fallback_to_source_stem_when_metadata_empty() {
        let builder = builder_with_rules();
        let entry = builder.build(
            Path::new("/papers/draft notes.pdf"),
            &meta("???///", "", None),
        );
        assert_eq!(entry.dest_filename, "draft_notes.pdf");
    }

    #[test]
    fn test_never_empty_filename() {
        let builder = builder_with_rules();
        let entry = builder.build(Path::new("/papers/###.pdf"), &meta("", "", None));
        assert_eq!(entry.dest_filename, "unnamed.pdf");
    }

    #[test]
    fn test_illegal_characters_stripped_from_filename() {
        let builder = builder_with_rules();
        let entry = builder.build(
            Path::new("/papers/x.pdf"),
            &meta("What is Life?", "Schrödinger", Some("quantum")),
        );
        assert_eq!(entry.dest_filename, "Schrödinger-WhatisLife.pdf");
    }
}
