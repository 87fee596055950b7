#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, format)
        .expect("Failed to encode test image");
    cursor.into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([34, 139, 34]));
    encode(DynamicImage::ImageRgb8(image), ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([0, 0, 255]));
    encode(DynamicImage::ImageRgb8(image), ImageFormat::Jpeg)
}

pub fn gif(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
    encode(DynamicImage::ImageRgba8(image), ImageFormat::Gif)
}

/// A gzip member header followed by junk, enough for sniffing.
pub fn gzip_like(len: usize) -> Vec<u8> {
    let mut data = vec![0x1F, 0x8B, 0x08, 0x00];
    data.resize(len.max(4), 0x42);
    data
}
