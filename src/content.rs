//! Portfolio copy: titles, write-ups and image paths.
//!
//! Content is loaded once, before any scene is built, and validated up
//! front so a malformed file fails with a field path instead of producing a
//! half-built scene.
//!
//! ```json
//! {
//!   "splash": { "title": "Hi, welcome in" },
//!   "projects": [
//!     { "title": "Ray tracer", "writeup": "...", "images": ["shots/rt.png"] }
//!   ],
//!   "tuning": { "transition_duration": 1.5 }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::animations::Tuning;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid content at `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SplashContent {
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ProjectContent {
    pub title: String,
    #[serde(default)]
    pub writeup: String,
    pub images: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Content {
    pub splash: SplashContent,
    pub projects: Vec<ProjectContent>,
    #[serde(default)]
    pub tuning: Option<Tuning>,
}

impl Default for Content {
    fn default() -> Self {
        let project = |title: &str, writeup: &str, images: &[&str]| ProjectContent {
            title: title.to_string(),
            writeup: writeup.to_string(),
            images: images.iter().map(|s| s.to_string()).collect(),
        };
        Self {
            splash: SplashContent {
                title: "Hi, welcome in".to_string(),
            },
            projects: vec![
                project(
                    "Portal renderer",
                    "Scenes composed through the stencil buffer. Every window is a mask; \
                     stepping through one opens its gate and the content behind it becomes the world.",
                    &["assets/portal-1.png", "assets/portal-2.png"],
                ),
                project(
                    "Tween engine",
                    "Keyed property animation with overwrite semantics and completion payloads.",
                    &["assets/tween-1.png"],
                ),
                project(
                    "Ray picking",
                    "Nearest-first ray casts against an explicit interactable set.",
                    &["assets/picking-1.png", "assets/picking-2.png", "assets/picking-3.png"],
                ),
            ],
            tuning: None,
        }
    }
}

impl Content {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str, origin: &Path) -> Result<Self, ContentError> {
        let content: Content =
            serde_json::from_str(json).map_err(|source| ContentError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
        content.validate()?;
        Ok(content)
    }

    /// Read, parse and validate a content file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content = Self::from_json(&json, path)?;
        tracing::info!(path = %path.display(), projects = content.projects.len(), "content loaded");
        Ok(content)
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        if self.splash.title.trim().is_empty() {
            return Err(invalid("splash.title", "must not be empty"));
        }
        if self.projects.is_empty() {
            return Err(invalid("projects", "at least one project is required"));
        }
        for (i, project) in self.projects.iter().enumerate() {
            if project.title.trim().is_empty() {
                return Err(invalid(format!("projects[{i}].title"), "must not be empty"));
            }
            if project.images.is_empty() {
                return Err(invalid(format!("projects[{i}].images"), "at least one image is required"));
            }
            if let Some(j) = project.images.iter().position(|p| p.trim().is_empty()) {
                return Err(invalid(format!("projects[{i}].images[{j}]"), "must not be empty"));
            }
        }
        Ok(())
    }
}

fn invalid(field: impl Into<String>, reason: &str) -> ContentError {
    ContentError::Invalid {
        field: field.into(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Content, ContentError> {
        Content::from_json(json, Path::new("test.json"))
    }

    fn invalid_field(result: Result<Content, ContentError>) -> String {
        match result {
            Err(ContentError::Invalid { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn builtin_content_is_valid() {
        Content::default().validate().unwrap();
    }

    #[test]
    fn parses_minimal_document_with_tuning() {
        let content = parse(
            r#"{
                "splash": { "title": "Hello" },
                "projects": [{ "title": "One", "images": ["a.png"] }],
                "tuning": { "carousel_spacing": 3.0 }
            }"#,
        )
        .unwrap();
        assert_eq!(content.projects[0].writeup, "");
        let tuning = content.tuning.unwrap();
        assert_eq!(tuning.carousel_spacing, 3.0);
        assert_eq!(tuning.transition_duration, 2.0);
    }

    #[test]
    fn rejects_missing_pieces_with_field_path() {
        assert_eq!(
            invalid_field(parse(r#"{ "splash": { "title": " " }, "projects": [] }"#)),
            "splash.title"
        );
        assert_eq!(
            invalid_field(parse(r#"{ "splash": { "title": "x" }, "projects": [] }"#)),
            "projects"
        );
        assert_eq!(
            invalid_field(parse(
                r#"{ "splash": { "title": "x" }, "projects": [
                    { "title": "ok", "images": ["a.png"] },
                    { "title": "bad", "images": [] }
                ] }"#
            )),
            "projects[1].images"
        );
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            parse(r#"{ "splash": { "title": 4 } }"#),
            Err(ContentError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Content::load("no/such/content.json").unwrap_err();
        assert!(matches!(err, ContentError::Io { .. }));
        assert!(err.to_string().contains("no/such/content.json"));
    }
}
