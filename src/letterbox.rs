// 该文件是 Beifeng （北风） 项目的一部分。
// src/letterbox.rs - 保持长宽比的缩放与填充
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

use image::{RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

use crate::geometry::InputShape;

mod resize;

pub use self::resize::resize_area;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LetterboxError {
  #[error("输入图像为空: {width}x{height}")]
  EmptyImage { width: u32, height: u32 },
  #[error("缩放失败: {0}")]
  ResizeError(String),
}

/// 缩放插值方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interpolation {
  /// 盒式卷积，缩小时取覆盖区域的平均值
  #[default]
  Area,
  Nearest,
  Triangle,
  CatmullRom,
}

impl Interpolation {
  fn filter_type(self) -> Option<FilterType> {
    match self {
      Interpolation::Area => None,
      Interpolation::Nearest => Some(FilterType::Nearest),
      Interpolation::Triangle => Some(FilterType::Triangle),
      Interpolation::CatmullRom => Some(FilterType::CatmullRom),
    }
  }
}

/// Letterbox 变换参数
///
/// 记录原图尺寸、内容区域尺寸和左上填充量，用于把网络输入坐标还原到原图。
/// 构造时保证 `1 <= new_h <= target.height()`，`1 <= new_w <= target.width()`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letterbox {
  src_h: u32,
  src_w: u32,
  new_h: u32,
  new_w: u32,
  pad_top: u32,
  pad_left: u32,
  target: InputShape,
}

impl Letterbox {
  /// 只计算变换参数，不处理像素
  pub fn compute(
    src_h: u32,
    src_w: u32,
    target: InputShape,
    keep_ratio: bool,
  ) -> Result<Self, LetterboxError> {
    if src_h == 0 || src_w == 0 {
      return Err(LetterboxError::EmptyImage {
        width: src_w,
        height: src_h,
      });
    }

    let (target_h, target_w) = (target.height(), target.width());

    // 只有正方形原图直接缩放，其余按长宽比计算内容区域
    if !keep_ratio || src_h == src_w {
      return Ok(Self {
        src_h,
        src_w,
        new_h: target_h,
        new_w: target_w,
        pad_top: 0,
        pad_left: 0,
        target,
      });
    }

    let hw_scale = src_h as f64 / src_w as f64;
    let (new_h, new_w, pad_top, pad_left) = if hw_scale > 1.0 {
      let new_w = clamp_dim((target_w as f64 / hw_scale).round(), target_w);
      (target_h, new_w, 0, (target_w - new_w) / 2)
    } else {
      let new_h = clamp_dim((target_h as f64 * hw_scale).round(), target_h);
      (new_h, target_w, (target_h - new_h) / 2, 0)
    };

    Ok(Self {
      src_h,
      src_w,
      new_h,
      new_w,
      pad_top,
      pad_left,
      target,
    })
  }

  pub fn src_h(&self) -> u32 {
    self.src_h
  }

  pub fn src_w(&self) -> u32 {
    self.src_w
  }

  pub fn new_h(&self) -> u32 {
    self.new_h
  }

  pub fn new_w(&self) -> u32 {
    self.new_w
  }

  pub fn pad_top(&self) -> u32 {
    self.pad_top
  }

  pub fn pad_left(&self) -> u32 {
    self.pad_left
  }

  pub fn pad_bottom(&self) -> u32 {
    self.target.height() - self.new_h - self.pad_top
  }

  pub fn pad_right(&self) -> u32 {
    self.target.width() - self.new_w - self.pad_left
  }

  pub fn target(&self) -> InputShape {
    self.target
  }
}

fn clamp_dim(value: f64, target: u32) -> u32 {
  (value as u32).clamp(1, target)
}

pub struct LetterboxResult {
  /// 网络输入尺寸的图像
  pub image: RgbImage,
  pub params: Letterbox,
}

/// 将任意尺寸的图像缩放并填充到网络输入尺寸，填充值为 0（黑色）
pub fn letterbox(
  image: &RgbImage,
  target: InputShape,
  keep_ratio: bool,
  interpolation: Interpolation,
) -> Result<LetterboxResult, LetterboxError> {
  let params = Letterbox::compute(image.height(), image.width(), target, keep_ratio)?;
  debug!(
    "letterbox: {}x{} -> {}x{}, 填充 top={} left={}",
    params.src_w, params.src_h, params.new_w, params.new_h, params.pad_top, params.pad_left
  );

  let resized = resize(image, params.new_w, params.new_h, interpolation)?;

  if params.new_h == target.height() && params.new_w == target.width() {
    return Ok(LetterboxResult {
      image: resized,
      params,
    });
  }

  let mut canvas = RgbImage::new(target.width(), target.height());
  image::imageops::replace(
    &mut canvas,
    &resized,
    params.pad_left as i64,
    params.pad_top as i64,
  );

  Ok(LetterboxResult {
    image: canvas,
    params,
  })
}

fn resize(
  image: &RgbImage,
  width: u32,
  height: u32,
  interpolation: Interpolation,
) -> Result<RgbImage, LetterboxError> {
  if image.width() == width && image.height() == height {
    return Ok(image.clone());
  }
  match interpolation.filter_type() {
    Some(filter) => Ok(image::imageops::resize(image, width, height, filter)),
    None => resize_area(image, width, height),
  }
}
