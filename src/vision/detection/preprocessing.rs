// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for YOLOv8

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::Array4;

/// Default square input size of the exported model
pub const YOLO_INPUT_SIZE: u32 = 640;

/// Padding color used by the ultralytics letterbox
pub const PAD_COLOR: Rgb<u8> = Rgb([114, 114, 114]);

/// Scale and offsets applied by `letterbox`
///
/// Used to map boxes predicted on the padded square back onto the original
/// image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Resize ratio (new / original)
    pub gain: f32,
    /// Left padding in pixels
    pub pad_x: f32,
    /// Top padding in pixels
    pub pad_y: f32,
    /// Original image width
    pub orig_width: u32,
    /// Original image height
    pub orig_height: u32,
}

impl Letterbox {
    /// Map an `[x1, y1, x2, y2]` box from model space to original pixels,
    /// clipped to the image bounds
    ///
    /// The result always satisfies `x1 <= x2` and `y1 <= y2`.
    pub fn unmap_box(&self, bbox: [f32; 4]) -> [f32; 4] {
        let w = self.orig_width as f32;
        let h = self.orig_height as f32;
        let x1 = ((bbox[0] - self.pad_x) / self.gain).clamp(0.0, w);
        let y1 = ((bbox[1] - self.pad_y) / self.gain).clamp(0.0, h);
        let x2 = ((bbox[2] - self.pad_x) / self.gain).clamp(0.0, w);
        let y2 = ((bbox[3] - self.pad_y) / self.gain).clamp(0.0, h);
        [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)]
    }
}

/// Resize with aspect ratio preservation and pad to a `size` x `size` square
///
/// The resized image is centred; padding is split evenly between the two
/// sides the same way ultralytics rounds it.
pub fn letterbox(image: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let (orig_w, orig_h) = image.dimensions();

    let gain = (size as f32 / orig_w as f32).min(size as f32 / orig_h as f32);
    let new_w = ((orig_w as f32 * gain).round() as u32).clamp(1, size);
    let new_h = ((orig_h as f32 * gain).round() as u32).clamp(1, size);

    let pad_x = ((size - new_w) as f32 / 2.0 - 0.1).round().max(0.0);
    let pad_y = ((size - new_h) as f32 / 2.0 - 0.1).round().max(0.0);

    let mut canvas = RgbImage::from_pixel(size, size, PAD_COLOR);
    if (new_w, new_h) == (orig_w, orig_h) {
        imageops::replace(&mut canvas, image, pad_x as i64, pad_y as i64);
    } else {
        let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
        imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);
    }

    let info = Letterbox {
        gain,
        pad_x,
        pad_y,
        orig_width: orig_w,
        orig_height: orig_h,
    };

    (canvas, info)
}

/// Convert an RGB image into a normalized NCHW tensor `[1, 3, H, W]`
///
/// Pixels are scaled to `[0, 1]`; YOLOv8 uses no mean/std normalization.
pub fn to_nchw_tensor(image: &RgbImage) -> Array4<f32> {
    let (w, h) = image.dimensions();
    let mut tensor = Array4::zeros((1, 3, h as usize, w as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    tensor
}

/// Letterbox and convert in one step
pub fn preprocess(image: &RgbImage, size: u32) -> (Array4<f32>, Letterbox) {
    let (padded, info) = letterbox(image, size);
    (to_nchw_tensor(&padded), info)
}
