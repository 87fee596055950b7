//! Image format gate and dimension decoding

use image::{ImageReader, ImageResult};
use std::io::{BufReader, Read, Seek};

/// Extensions accepted by the pixel-size rules.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "gif", "png"];

/// Lower-cased text after the last `.` of `name`, or an empty string.
pub fn file_extension(name: &str) -> String {
    name.rfind('.')
        .map(|pos| name[pos + 1..].to_lowercase())
        .unwrap_or_default()
}

/// Cheap check on the client-supplied name. Anyone can name a file `x.jpg`,
/// the decode step is what actually rejects non-images.
pub fn has_image_extension(name: &str) -> bool {
    let ext = file_extension(name);
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// Fully decodes a PNG, JPEG or GIF stream and returns `(width, height)`.
/// Truncated data fails the same way as an unknown format.
pub fn decode_dimensions<R: Read + Seek>(reader: R) -> ImageResult<(u32, u32)> {
    let image = ImageReader::new(BufReader::new(reader))
        .with_guessed_format()?
        .decode()?;
    Ok((image.width(), image.height()))
}
