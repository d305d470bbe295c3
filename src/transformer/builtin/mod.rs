//! Built-in transformers.
//!
//! | Type      | Input            | Output                                  |
//! |-----------|------------------|-----------------------------------------|
//! | `Copy`    | any              | verbatim copy (templated name)          |
//! | `Command` | any              | whatever an external tool writes        |
//! | `Minify`  | `.js`, `.css`    | `<stem>.min.<ext>`                      |
//! | `Texture` | `.png` `.jpg` `.jpeg` `.webp` | resized / re-encoded image |

mod command;
mod copy;
mod minify;
mod texture;

pub use command::CommandTransformer;
pub use copy::CopyTransformer;
pub use minify::MinifyTransformer;
pub use texture::TextureTransformer;

use super::{TransformInput, TransformerRegistry};

pub(super) fn register_all(registry: &mut TransformerRegistry) {
    registry.register_typed::<CopyTransformer>("Copy");
    registry.register_typed::<CommandTransformer>("Command");
    registry.register_typed::<MinifyTransformer>("Minify");
    registry.register_typed::<TextureTransformer>("Texture");
}

/// Expand `{name}`, `{stem}`, `{ext}` and `{dir}` in an output template.
fn expand_template(template: &str, input: &TransformInput<'_>) -> String {
    let name = input.file_name();
    let stem = input.file_stem();
    let ext = name.strip_prefix(stem).map_or("", |rest| rest.trim_start_matches('.'));
    let dir = crate::utils::path::parent_dir(input.resource_name);

    template
        .replace("{name}", name)
        .replace("{stem}", stem)
        .replace("{ext}", ext)
        .replace("{dir}", dir)
}

/// Resolve a templated output: relative to the asset's output directory,
/// or to the cache root when it starts with `/`.
fn output_for_template(template: &str, input: &TransformInput<'_>) -> String {
    let expanded = expand_template(template, input);
    match expanded.strip_prefix('/') {
        Some(rooted) => rooted.to_string(),
        None => input.output_name(&expanded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Flavor;
    use std::path::Path;

    #[test]
    fn test_expand_template() {
        let flavor = Flavor::default();
        let input = TransformInput {
            resource_name: "ui/icons/play.png",
            input_file: Path::new("/unused"),
            cache_dir: Path::new("/cache"),
            flavor: &flavor,
        };

        assert_eq!(expand_template("{stem}.dds", &input), "play.dds");
        assert_eq!(expand_template("{dir}/{name}", &input), "ui/icons/play.png");
        assert_eq!(expand_template("{stem}-{ext}", &input), "play-png");

        assert_eq!(output_for_template("{stem}.dds", &input), "ui/icons/play.png.d/play.dds");
        assert_eq!(output_for_template("/atlas/{stem}", &input), "atlas/play");
    }
}
