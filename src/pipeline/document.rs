//! Pipeline file documents.
//!
//! The on-disk format is JSON:
//!
//! ```json
//! {
//!   "transformers": [
//!     { "type": "Texture", "flavor": "*", "extensions": ["png", "jpg"],
//!       "pattern": "^ui/", "config": { "max_size": 1024 } }
//!   ],
//!   "dependencies": ["../common.assetpipeline"]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PipelineError;

/// One transformer declaration, before type resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformerDecl {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flavor: String,
    /// Lowercase extensions without dot; empty accepts every extension.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    /// Regex matched against the asset's resource name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub config: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDocument {
    #[serde(default)]
    pub transformers: Vec<TransformerDecl>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Turns raw pipeline file bytes into a document.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<PipelineDocument, PipelineError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocumentParser;

impl DocumentParser for JsonDocumentParser {
    fn parse(&self, bytes: &[u8]) -> Result<PipelineDocument, PipelineError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(PipelineDocument::default());
        }
        serde_json::from_slice(bytes).map_err(PipelineError::Parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_document() {
        let doc = JsonDocumentParser
            .parse(
                br#"{
                    "transformers": [
                        { "type": "Texture", "flavor": "mobile", "extensions": ["png"],
                          "pattern": "^ui/", "config": { "max_size": 512 } },
                        { "type": "Copy" }
                    ],
                    "dependencies": ["../common.assetpipeline"]
                }"#,
            )
            .unwrap();

        assert_eq!(doc.transformers.len(), 2);
        assert_eq!(doc.transformers[0].type_name, "Texture");
        assert_eq!(doc.transformers[0].flavor, "mobile");
        assert_eq!(doc.transformers[0].config, json!({ "max_size": 512 }));
        assert_eq!(doc.transformers[1].config, Value::Null);
        assert_eq!(doc.dependencies, vec!["../common.assetpipeline"]);
    }

    #[test]
    fn test_empty_file_is_empty_document() {
        assert_eq!(
            JsonDocumentParser.parse(b"  \n").unwrap(),
            PipelineDocument::default()
        );
    }

    #[test]
    fn test_malformed_and_unknown_fields() {
        assert!(JsonDocumentParser.parse(b"{ not json").is_err());
        assert!(JsonDocumentParser.parse(br#"{ "transformer": [] }"#).is_err());
    }
}
