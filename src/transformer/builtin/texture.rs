//! Texture import: decode, clamp dimensions, re-encode.

use std::collections::BTreeMap;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use serde::Deserialize;

use crate::transformer::{TransformError, TransformInput, TransformOutput, Transformer};
use crate::utils::path::resource::extension;

/// Encoded format of the imported texture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl TextureFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// ```json
/// { "type": "Texture", "config": {
///     "max_size": 2048,
///     "max_size_by_flavor": { "mobile": 512 },
///     "format": "jpeg", "quality": 85 } }
/// ```
///
/// Output: `<stem>.<format>` in the asset's output directory. Images larger
/// than `max_size` on either axis are downscaled preserving aspect ratio.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextureTransformer {
    pub max_size: Option<u32>,
    /// Per-flavor-tag limits; the smallest matching limit wins.
    pub max_size_by_flavor: BTreeMap<String, u32>,
    pub format: TextureFormat,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for TextureTransformer {
    fn default() -> Self {
        Self {
            max_size: None,
            max_size_by_flavor: BTreeMap::new(),
            format: TextureFormat::Png,
            quality: 90,
        }
    }
}

impl TextureTransformer {
    fn size_limit(&self, input: &TransformInput<'_>) -> Option<u32> {
        self.max_size_by_flavor
            .iter()
            .filter(|(tag, _)| input.flavor.contains(tag))
            .map(|(_, size)| *size)
            .chain(self.max_size)
            .min()
    }

    fn encode(&self, img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
        let mut bytes = Cursor::new(Vec::new());
        match self.format {
            TextureFormat::Png => img.write_to(&mut bytes, ImageFormat::Png)?,
            TextureFormat::Webp => {
                DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut bytes, ImageFormat::WebP)?;
            }
            // JPEG has no alpha channel
            TextureFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, self.quality))?,
        }
        Ok(bytes.into_inner())
    }
}

impl Transformer for TextureTransformer {
    fn validate(&self) -> Result<(), String> {
        if self.max_size == Some(0) || self.max_size_by_flavor.values().any(|s| *s == 0) {
            return Err("size limits must be positive".into());
        }
        if !(1..=100).contains(&self.quality) {
            return Err(format!("quality {} is outside 1-100", self.quality));
        }
        Ok(())
    }

    fn is_applicable(&self, resource_name: &str) -> bool {
        matches!(
            extension(resource_name).as_deref(),
            Some("png" | "jpg" | "jpeg" | "webp")
        )
    }

    fn execute(
        &self,
        input: &TransformInput<'_>,
        output: &mut TransformOutput,
    ) -> Result<(), TransformError> {
        let bytes = input.read()?;
        let failed = |e: image::ImageError| {
            TransformError::Failed(format!("{}: {e}", input.resource_name))
        };

        let mut img = image::load_from_memory(&bytes).map_err(failed)?;
        if let Some(limit) = self.size_limit(input)
            && (img.width() > limit || img.height() > limit)
        {
            img = img.resize(limit, limit, FilterType::Lanczos3);
        }

        let encoded = self.encode(&img).map_err(failed)?;
        let name = input.output_name(&format!("{}.{}", input.file_stem(), self.format.extension()));
        output.write(&name, &encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Flavor;
    use image::{Rgba, RgbaImage};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255]))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    fn run(texture: &TextureTransformer, flavor: &Flavor, dir: &Path) -> Vec<String> {
        let source = dir.join("hero.png");
        let cache = dir.join("cache");
        let input = TransformInput {
            resource_name: "textures/hero.png",
            input_file: &source,
            cache_dir: &cache,
            flavor,
        };
        let mut output = TransformOutput::new(&cache);
        texture.execute(&input, &mut output).unwrap();
        output.into_outputs()
    }

    #[test]
    fn test_downscale_preserves_aspect() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("hero.png"), 64, 32);

        let texture = TextureTransformer {
            max_size: Some(16),
            ..Default::default()
        };
        let outputs = run(&texture, &Flavor::default(), dir.path());

        assert_eq!(outputs, ["textures/hero.png.d/hero.png"]);
        let dims = image::image_dimensions(dir.path().join("cache/textures/hero.png.d/hero.png"));
        assert_eq!(dims.unwrap(), (16, 8));
    }

    #[test]
    fn test_flavor_limit_and_jpeg() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("hero.png"), 40, 40);

        let texture = TextureTransformer {
            max_size: Some(32),
            max_size_by_flavor: BTreeMap::from([("mobile".to_string(), 8)]),
            format: TextureFormat::Jpeg,
            ..Default::default()
        };
        let outputs = run(&texture, &Flavor::from_tags(["mobile"]), dir.path());

        assert_eq!(outputs, ["textures/hero.png.d/hero.jpg"]);
        let path = dir.path().join("cache/textures/hero.png.d/hero.jpg");
        assert_eq!(image::image_dimensions(&path).unwrap(), (8, 8));
    }

    #[test]
    fn test_small_image_untouched() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("hero.png"), 4, 2);

        let texture = TextureTransformer {
            max_size: Some(16),
            ..Default::default()
        };
        run(&texture, &Flavor::default(), dir.path());
        let path = dir.path().join("cache/textures/hero.png.d/hero.png");
        assert_eq!(image::image_dimensions(&path).unwrap(), (4, 2));
    }

    #[test]
    fn test_corrupt_source_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hero.png"), "not a png").unwrap();
        let cache = dir.path().join("cache");
        let flavor = Flavor::default();
        let source = dir.path().join("hero.png");
        let input = TransformInput {
            resource_name: "textures/hero.png",
            input_file: &source,
            cache_dir: &cache,
            flavor: &flavor,
        };

        let mut output = TransformOutput::new(&cache);
        let err = TextureTransformer::default()
            .execute(&input, &mut output)
            .unwrap_err();
        assert!(matches!(err, TransformError::Failed(_)));
    }

    #[test]
    fn test_validate() {
        assert!(TextureTransformer::default().validate().is_ok());
        let zero = TextureTransformer {
            max_size: Some(0),
            ..Default::default()
        };
        assert!(zero.validate().is_err());
        let quality = TextureTransformer {
            quality: 0,
            ..Default::default()
        };
        assert!(quality.validate().is_err());
    }
}
