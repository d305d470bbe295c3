use serde::Deserialize;

use super::output_for_template;
use crate::transformer::{TransformError, TransformInput, TransformOutput, Transformer};

/// Copies the source verbatim.
///
/// ```json
/// { "type": "Copy", "config": { "output": "{stem}.bin" } }
/// ```
///
/// `output` defaults to `{name}`. A leading `/` places the file relative to
/// the cache root instead of the asset's output directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CopyTransformer {
    pub output: String,
}

impl Default for CopyTransformer {
    fn default() -> Self {
        Self {
            output: "{name}".to_string(),
        }
    }
}

impl Transformer for CopyTransformer {
    fn validate(&self) -> Result<(), String> {
        if self.output.trim_matches('/').is_empty() {
            return Err("`output` must name a file".into());
        }
        Ok(())
    }

    fn execute(
        &self,
        input: &TransformInput<'_>,
        output: &mut TransformOutput,
    ) -> Result<(), TransformError> {
        let bytes = input.read()?;
        output.write(&output_for_template(&self.output, input), &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Flavor;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_copy_default_and_template() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, "hello").unwrap();
        let cache = dir.path().join("cache");

        let flavor = Flavor::default();
        let input = TransformInput {
            resource_name: "docs/a.txt",
            input_file: &source,
            cache_dir: &cache,
            flavor: &flavor,
        };

        let mut output = TransformOutput::new(&cache);
        CopyTransformer::default().execute(&input, &mut output).unwrap();
        CopyTransformer {
            output: "/shared/{stem}.bin".into(),
        }
        .execute(&input, &mut output)
        .unwrap();

        assert_eq!(output.outputs(), ["docs/a.txt.d/a.txt", "shared/a.bin"]);
        assert_eq!(fs::read_to_string(cache.join("docs/a.txt.d/a.txt")).unwrap(), "hello");
        assert_eq!(fs::read_to_string(cache.join("shared/a.bin")).unwrap(), "hello");
    }

    #[test]
    fn test_copy_missing_source() {
        let dir = TempDir::new().unwrap();
        let flavor = Flavor::default();
        let input = TransformInput {
            resource_name: "gone.txt",
            input_file: &dir.path().join("gone.txt"),
            cache_dir: dir.path(),
            flavor: &flavor,
        };

        let mut output = TransformOutput::new(dir.path());
        let err = CopyTransformer::default()
            .execute(&input, &mut output)
            .unwrap_err();
        assert!(matches!(err, TransformError::Io { .. }));
    }

    #[test]
    fn test_copy_rejects_empty_output() {
        let copy = CopyTransformer { output: "/".into() };
        assert!(copy.validate().is_err());
    }
}
