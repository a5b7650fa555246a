//! YAML front matter in Markdown documents.
//!
//! Front matter is the text between an opening `---` line and the next `---`
//! line. A document whose first line is not `---` has no front matter, which
//! is distinct from malformed front matter (unterminated block, invalid YAML,
//! or a block that is not a mapping).

use serde_yaml::{Mapping, Value as Yaml};
use thiserror::Error;

const DELIMITER: &str = "---";

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("front matter opened with '---' but never closed")]
    Unterminated,
    #[error("invalid YAML front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("front matter must be a mapping of fields")]
    NotMapping,
}

/// Parsed front matter plus the document body that follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    pub fields: Mapping,
    pub body: String,
}

impl FrontMatter {
    /// Extract front matter from `content`.
    ///
    /// Returns `Ok(None)` when the document does not start with a delimiter.
    pub fn extract(content: &str) -> Result<Option<FrontMatter>, FrontMatterError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut lines = content.split_inclusive('\n');
        let first = match lines.next() {
            Some(l) => l,
            None => return Ok(None),
        };
        if first.trim_end() != DELIMITER {
            return Ok(None);
        }
        let yaml_start = first.len();
        let mut offset = yaml_start;
        for line in lines {
            if line.trim_end() == DELIMITER {
                let yaml = &content[yaml_start..offset];
                let body = &content[offset + line.len()..];
                return Ok(Some(FrontMatter {
                    fields: parse_mapping(yaml)?,
                    body: body.to_string(),
                }));
            }
            offset += line.len();
        }
        Err(FrontMatterError::Unterminated)
    }

    /// Serialize back to `---\n<yaml>---\n<body>`.
    pub fn render(&self) -> Result<String, serde_yaml::Error> {
        let yaml = serde_yaml::to_string(&self.fields)?;
        Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{}", self.body))
    }

    /// Fields as JSON for schema validation.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.fields)
    }

    pub fn get(&self, key: &str) -> Option<&Yaml> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }
}

fn parse_mapping(yaml: &str) -> Result<Mapping, FrontMatterError> {
    match serde_yaml::from_str::<Yaml>(yaml)? {
        Yaml::Mapping(m) => Ok(m),
        Yaml::Null => Ok(Mapping::new()),
        _ => Err(FrontMatterError::NotMapping),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_front_matter() {
        assert!(FrontMatter::extract("# Title\n\ntext\n").unwrap().is_none());
        assert!(FrontMatter::extract("").unwrap().is_none());
        // delimiter not on the first line
        assert!(FrontMatter::extract("\n---\na: 1\n---\n").unwrap().is_none());
    }

    #[test]
    fn test_extracts_fields_and_body() {
        let doc = "---\ntitle: Notes\ntags: [a, b]\n---\n# Notes\nbody\n";
        let fm = FrontMatter::extract(doc).unwrap().unwrap();
        assert_eq!(fm.get("title").and_then(Yaml::as_str), Some("Notes"));
        assert!(fm.contains("tags"));
        assert_eq!(fm.body, "# Notes\nbody\n");
    }

    #[test]
    fn test_crlf_and_empty_block() {
        let fm = FrontMatter::extract("---\r\ntitle: x\r\n---\r\nbody").unwrap().unwrap();
        assert_eq!(fm.get("title").and_then(Yaml::as_str), Some("x"));
        assert_eq!(fm.body, "body");
        let empty = FrontMatter::extract("---\n---\n").unwrap().unwrap();
        assert!(empty.fields.is_empty());
    }

    #[test]
    fn test_malformed_front_matter() {
        assert!(matches!(
            FrontMatter::extract("---\ntitle: x\nno end\n"),
            Err(FrontMatterError::Unterminated)
        ));
        assert!(matches!(
            FrontMatter::extract("---\ntitle: [unclosed\n---\n"),
            Err(FrontMatterError::Yaml(_))
        ));
        assert!(matches!(
            FrontMatter::extract("---\n- a\n- b\n---\n"),
            Err(FrontMatterError::NotMapping)
        ));
    }

    #[test]
    fn test_render_then_extract_round_trips() {
        let docs = [
            "---\ntitle: Deep Work\nstatus: draft\ntags:\n  - focus\n  - habits\nmeta:\n  pages: 12\n---\nBody text.\n",
            "---\n---\n",
            "---\ntitle: 'a: b'\n---\n\n# H\n",
        ];
        for doc in docs {
            let first = FrontMatter::extract(doc).unwrap().unwrap();
            let rendered = first.render().unwrap();
            let second = FrontMatter::extract(&rendered).unwrap().unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_to_json() {
        let fm = FrontMatter::extract("---\ntitle: x\ncount: 3\n---\n").unwrap().unwrap();
        let json = fm.to_json().unwrap();
        assert_eq!(json["title"], "x");
        assert_eq!(json["count"], 3);
    }
}
