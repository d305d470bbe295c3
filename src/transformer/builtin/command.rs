//! External tool transformer.
//!
//! Runs a command once per asset. Arguments and outputs accept the
//! `{name}`/`{stem}`/`{ext}`/`{dir}` templates; arguments, outputs and
//! environment values may reference:
//!
//! | Variable         | Value                                   |
//! |------------------|-----------------------------------------|
//! | `$INPUT`         | absolute path of the source file        |
//! | `$OUTPUT_DIR`    | absolute path of the asset output dir   |
//! | `$CACHE_DIR`     | absolute path of the cache directory    |
//! | `$RESOURCE_NAME` | resource name of the source             |
//! | `$FLAVOR`        | comma-separated flavor tags             |

use std::collections::BTreeMap;
use std::path::Path;
use std::time::SystemTime;

use jwalk::WalkDir;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use super::expand_template;
use crate::transformer::{TransformError, TransformInput, TransformOutput, Transformer};
use crate::utils::exec::Cmd;
use crate::utils::path::resource::extension;
use crate::utils::path::to_resource_name;

/// ```json
/// { "type": "Command", "config": {
///     "command": ["texconv", "-o", "$OUTPUT_DIR", "$INPUT"],
///     "outputs": ["{stem}.dds"],
///     "extensions": ["png", "tga"] } }
/// ```
///
/// Without `outputs`, every file the tool created or rewrote in the output
/// directory is recorded. Files left untouched from earlier runs are not.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandTransformer {
    pub command: Vec<String>,
    /// Output templates relative to the asset output directory.
    pub outputs: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Restrict to these lowercase extensions; empty accepts everything.
    pub extensions: Vec<String>,
}

impl CommandTransformer {
    fn vars(&self, input: &TransformInput<'_>) -> FxHashMap<&'static str, String> {
        let mut vars = FxHashMap::default();
        vars.insert("INPUT", input.input_file.display().to_string());
        vars.insert("OUTPUT_DIR", input.output_dir().display().to_string());
        vars.insert("CACHE_DIR", input.cache_dir.display().to_string());
        vars.insert("RESOURCE_NAME", input.resource_name.to_string());
        vars.insert("FLAVOR", input.flavor.to_string());
        vars
    }
}

/// Files below `dir` as cache-relative names with their size and mtime.
fn snapshot(dir: &Path, cache_dir: &Path) -> BTreeMap<String, (u64, Option<SystemTime>)> {
    WalkDir::new(dir)
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.path();
            let meta = path.metadata().ok()?;
            let name = to_resource_name(cache_dir, &path)?;
            Some((name, (meta.len(), meta.modified().ok())))
        })
        .collect()
}

/// Replace `$VAR` occurrences with their values.
fn resolve(arg: &str, vars: &FxHashMap<&'static str, String>) -> String {
    vars.iter().fold(arg.to_string(), |acc, (key, value)| {
        acc.replace(&format!("${key}"), value)
    })
}

impl Transformer for CommandTransformer {
    fn validate(&self) -> Result<(), String> {
        if self.command.first().is_none_or(|program| program.trim().is_empty()) {
            return Err("`command` must name a program".into());
        }
        Ok(())
    }

    fn is_applicable(&self, resource_name: &str) -> bool {
        self.extensions.is_empty()
            || extension(resource_name)
                .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    }

    fn execute(
        &self,
        input: &TransformInput<'_>,
        output: &mut TransformOutput,
    ) -> Result<(), TransformError> {
        let vars = self.vars(input);
        let out_dir = input.output_dir();
        std::fs::create_dir_all(&out_dir).map_err(|e| TransformError::io(&out_dir, e))?;
        let before = if self.outputs.is_empty() {
            snapshot(&out_dir, input.cache_dir)
        } else {
            BTreeMap::new()
        };

        let args: Vec<String> = self
            .command
            .iter()
            .map(|a| resolve(&expand_template(a, input), &vars))
            .collect();
        let envs = self
            .env
            .iter()
            .map(|(k, v)| (k.clone(), resolve(v, &vars)));

        let result = Cmd::from_slice(&args)
            .cwd(&out_dir)
            .envs(vars.iter().map(|(k, v)| (format!("ASSET_{k}"), v.clone())))
            .envs(envs)
            .run()
            .map_err(|e| TransformError::Failed(format!("{e:#}")))?;

        let stderr = String::from_utf8_lossy(&result.stderr);
        if !stderr.trim().is_empty() {
            crate::debug!("process"; "{}: {}", input.resource_name, stderr.trim());
        }

        if self.outputs.is_empty() {
            let written = snapshot(&out_dir, input.cache_dir)
                .into_iter()
                .filter(|(name, stamp)| before.get(name) != Some(stamp))
                .map(|(name, _)| name);
            for name in written {
                output.add(&name)?;
            }
            return Ok(());
        }

        for template in &self.outputs {
            let name = input.output_name(&resolve(&expand_template(template, input), &vars));
            let path = output.resolve(&name)?;
            if !path.is_file() {
                return Err(TransformError::Failed(format!(
                    "`{}` did not produce {name}",
                    self.command[0]
                )));
            }
            output.add(&name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Flavor;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_validate_requires_program() {
        assert!(CommandTransformer::default().validate().is_err());
        let cmd = CommandTransformer {
            command: vec!["true".into()],
            ..Default::default()
        };
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn test_extension_filter() {
        let cmd = CommandTransformer {
            command: vec!["true".into()],
            extensions: vec!["png".into(), "TGA".into()],
            ..Default::default()
        };
        assert!(cmd.is_applicable("a/b.PNG"));
        assert!(cmd.is_applicable("a/b.tga"));
        assert!(!cmd.is_applicable("a/b.jpg"));
    }

    #[test]
    fn test_resolve_vars() {
        let mut vars = FxHashMap::default();
        vars.insert("INPUT", "/in/a.png".to_string());
        vars.insert("OUTPUT_DIR", "/out".to_string());
        assert_eq!(resolve("$OUTPUT_DIR/x:$INPUT", &vars), "/out/x:/in/a.png");
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_declared_and_discovered_outputs() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, "data").unwrap();
        let cache = dir.path().join("cache");
        let flavor = Flavor::default();
        let input = TransformInput {
            resource_name: "a.txt",
            input_file: &source,
            cache_dir: &cache,
            flavor: &flavor,
        };

        let declared = CommandTransformer {
            command: vec!["cp".into(), "$INPUT".into(), "$OUTPUT_DIR/{stem}.out".into()],
            outputs: vec!["{stem}.out".into()],
            ..Default::default()
        };
        let mut output = TransformOutput::new(&cache);
        declared.execute(&input, &mut output).unwrap();
        assert_eq!(output.outputs(), ["a.txt.d/a.out"]);

        let discovered = CommandTransformer {
            command: vec!["sh".into(), "-c".into(), "echo $ASSET_RESOURCE_NAME > extra.txt".into()],
            ..Default::default()
        };
        let mut output = TransformOutput::new(&cache);
        discovered.execute(&input, &mut output).unwrap();
        // a.out is left over from the other run and stays unclaimed.
        assert_eq!(output.outputs(), ["a.txt.d/extra.txt"]);
        assert_eq!(
            fs::read_to_string(cache.join("a.txt.d/extra.txt")).unwrap().trim(),
            "a.txt"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_discovery_skips_stale_files() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, "data").unwrap();
        let cache = dir.path().join("cache");
        fs::create_dir_all(cache.join("a.txt.d/old")).unwrap();
        fs::write(cache.join("a.txt.d/old/stale.bin"), "stale").unwrap();
        fs::write(cache.join("a.txt.d/kept.txt"), "old").unwrap();
        let flavor = Flavor::default();
        let input = TransformInput {
            resource_name: "a.txt",
            input_file: &source,
            cache_dir: &cache,
            flavor: &flavor,
        };

        let cmd = CommandTransformer {
            command: vec![
                "sh".into(),
                "-c".into(),
                "echo rewritten > kept.txt && echo new > fresh.txt".into(),
            ],
            ..Default::default()
        };
        let mut output = TransformOutput::new(&cache);
        cmd.execute(&input, &mut output).unwrap();
        assert_eq!(output.outputs(), ["a.txt.d/fresh.txt", "a.txt.d/kept.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_missing_declared_output_fails() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, "data").unwrap();
        let flavor = Flavor::default();
        let input = TransformInput {
            resource_name: "a.txt",
            input_file: &source,
            cache_dir: dir.path(),
            flavor: &flavor,
        };

        let cmd = CommandTransformer {
            command: vec!["true".into()],
            outputs: vec!["never.bin".into()],
            ..Default::default()
        };
        let mut output = TransformOutput::new(dir.path());
        assert!(matches!(
            cmd.execute(&input, &mut output),
            Err(TransformError::Failed(_))
        ));
    }
}
