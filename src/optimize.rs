//! Lossless-ish shrinking of image assets before they are bundled.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageEncoder;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Svg,
    Webp,
}

impl ImageKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "png" => Some(ImageKind::Png),
            "svg" => Some(ImageKind::Svg),
            "webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }
}

/// Returns the smaller of the original and the optimized encoding.
pub fn optimize_image(kind: ImageKind, content: &[u8]) -> Vec<u8> {
    let optimized = match kind {
        ImageKind::Png => match recompress_png(content) {
            Ok(png) => png,
            Err(e) => {
                tracing::warn!(error = %e, "could not decode PNG, keeping original");
                return content.to_vec();
            }
        },
        ImageKind::Svg => match std::str::from_utf8(content) {
            Ok(svg) => minify_svg(svg).into_bytes(),
            Err(_) => {
                tracing::warn!("SVG is not valid UTF-8, keeping original");
                return content.to_vec();
            }
        },
        // Re-encoding WebP would be lossy
        ImageKind::Webp => return content.to_vec(),
    };

    if optimized.len() < content.len() {
        optimized
    } else {
        content.to_vec()
    }
}

fn recompress_png(content: &[u8]) -> image::ImageResult<Vec<u8>> {
    let image = image::load_from_memory_with_format(content, image::ImageFormat::Png)?;

    let mut png_data = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut png_data, CompressionType::Best, FilterType::Adaptive);
    encoder.write_image(image.as_bytes(), image.width(), image.height(), image.color())?;

    Ok(png_data)
}

pub fn minify_svg(svg: &str) -> String {
    static COMMENTS: OnceLock<Regex> = OnceLock::new();
    static BETWEEN_TAGS: OnceLock<Regex> = OnceLock::new();
    static RUNS: OnceLock<Regex> = OnceLock::new();

    let comments = COMMENTS.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
    let between_tags = BETWEEN_TAGS.get_or_init(|| Regex::new(r">\s+<").expect("valid regex"));
    let runs = RUNS.get_or_init(|| Regex::new(r"[ \t\r\n]{2,}").expect("valid regex"));

    let svg = comments.replace_all(svg, "");
    let svg = between_tags.replace_all(&svg, "><");
    let svg = runs.replace_all(&svg, " ");
    svg.trim().to_string()
}
