// 该文件是 Beifeng （北风） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};
use thiserror::Error;
use tracing::debug;

use crate::{
  detector::{DetectResult, Detection},
  geometry::BBox,
};

const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const BOX_THICKNESS: i32 = 2;
const LABEL_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const TIME_COLOR: [u8; 3] = [0, 0, 0];
const FONT_SIZE: f32 = 16.0;

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效")]
  InvalidFont,
}

/// 在原图副本上绘制检测框和文字
///
/// 没有配置字体时只画框。
pub struct Draw {
  font: Option<FontVec>,
  font_size: f32,
  box_color: [u8; 3],
  label_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: FONT_SIZE,
      box_color: BOX_COLOR,
      label_color: LABEL_COLOR,
    }
  }
}

impl Draw {
  pub fn with_font_file(path: impl AsRef<Path>) -> Result<Self, DrawError> {
    let data = std::fs::read(path.as_ref())?;
    let font = FontVec::try_from_vec(data).map_err(|_| DrawError::InvalidFont)?;
    debug!("加载字体: {:?}", path.as_ref());
    Ok(Self::default().with_font(font))
  }

  pub fn with_font(mut self, font: FontVec) -> Self {
    self.font = Some(font);
    self
  }

  pub fn with_font_size(mut self, font_size: f32) -> Self {
    self.font_size = font_size;
    self
  }

  pub fn with_box_color(mut self, color: [u8; 3]) -> Self {
    self.box_color = color;
    self
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  /// 返回绘制后的新图像，输入图像不变
  pub fn annotate(&self, image: &RgbImage, result: &DetectResult) -> RgbImage {
    let mut canvas = image.clone();

    for detection in result.iter() {
      self.draw_detection(&mut canvas, detection);
    }

    if let Some(font) = &self.font {
      let text = format!("Inference Time: {}ms", result.inference_time.as_millis());
      draw_text_mut(
        &mut canvas,
        Rgb(TIME_COLOR),
        5,
        20,
        PxScale::from(self.font_size),
        font,
        &text,
      );
    }

    canvas
  }

  fn draw_detection(&self, canvas: &mut RgbImage, detection: &Detection) {
    let Some(bbox) = clamp_to_image(&detection.bbox, canvas.width(), canvas.height()) else {
      return;
    };

    // 向内加粗
    for t in 0..BOX_THICKNESS {
      let width = bbox.width() - 2 * t as i64 + 1;
      let height = bbox.height() - 2 * t as i64 + 1;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(bbox.x1 + t, bbox.y1 + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(canvas, rect, Rgb(self.box_color));
    }

    let Some(font) = &self.font else {
      return;
    };

    let scale = PxScale::from(self.font_size);
    let lines = [
      (format!("Class: {}", detection.label), 20),
      (format!("Confidence: {:.2}", detection.confidence), 35),
    ];
    for (text, dy) in lines {
      draw_text_mut(
        canvas,
        Rgb(self.label_color),
        bbox.x1 + 10,
        bbox.y1 + dy,
        scale,
        font,
        &text,
      );
    }
  }
}

/// 裁剪到图像范围内，完全在外或退化时返回 None
fn clamp_to_image(bbox: &BBox, width: u32, height: u32) -> Option<BBox> {
  if width == 0 || height == 0 {
    return None;
  }
  let max_x = width as i32 - 1;
  let max_y = height as i32 - 1;
  let clamped = BBox::new(
    bbox.x1.clamp(0, max_x),
    bbox.y1.clamp(0, max_y),
    bbox.x2.clamp(0, max_x),
    bbox.y2.clamp(0, max_y),
  );
  (!clamped.is_degenerate()).then_some(clamped)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{geometry::InputShape, letterbox::Letterbox};
  use std::time::Duration;

  fn result_with(bbox: BBox) -> DetectResult {
    let target = InputShape::new(64, 64).unwrap();
    DetectResult {
      items: vec![Detection {
        bbox,
        confidence: 0.9,
        class_id: 0,
        label: "person".to_string(),
      }]
      .into_boxed_slice(),
      letterbox: Letterbox::compute(40, 40, target, true).unwrap(),
      inference_time: Duration::from_millis(12),
    }
  }

  #[test]
  fn draws_two_pixel_red_border_on_a_copy() {
    let image = RgbImage::from_pixel(40, 40, Rgb([255, 255, 255]));
    let annotated = Draw::default().annotate(&image, &result_with(BBox::new(10, 10, 30, 30)));

    assert_eq!(*image.get_pixel(10, 10), Rgb([255, 255, 255]));
    assert_eq!(*annotated.get_pixel(10, 10), Rgb(BOX_COLOR));
    assert_eq!(*annotated.get_pixel(11, 20), Rgb(BOX_COLOR));
    assert_eq!(*annotated.get_pixel(30, 30), Rgb(BOX_COLOR));
    assert_eq!(*annotated.get_pixel(12, 20), Rgb([255, 255, 255]));
    assert_eq!(*annotated.get_pixel(20, 20), Rgb([255, 255, 255]));
  }

  #[test]
  fn boxes_outside_the_image_are_clamped_or_skipped() {
    let image = RgbImage::new(40, 40);
    let annotated = Draw::default().annotate(&image, &result_with(BBox::new(-10, -10, 100, 100)));
    assert_eq!(*annotated.get_pixel(0, 0), Rgb(BOX_COLOR));
    assert_eq!(*annotated.get_pixel(39, 39), Rgb(BOX_COLOR));

    let annotated = Draw::default().annotate(&image, &result_with(BBox::new(50, 50, 80, 80)));
    assert_eq!(annotated, image);
  }

  #[test]
  fn invalid_font_file_is_reported() {
    let path = std::env::temp_dir().join("beifeng-not-a-font.ttf");
    std::fs::write(&path, b"definitely not a font").unwrap();
    assert!(matches!(
      Draw::with_font_file(&path),
      Err(DrawError::InvalidFont)
    ));
    let _ = std::fs::remove_file(path);
  }
}
