// 该文件是 Beifeng （北风） 项目的一部分。
// src/geometry.rs - 尺寸与边界框
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

use crate::config::ConfigError;

/// 网络输入尺寸（高, 宽），两个维度都大于 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
  height: u32,
  width: u32,
}

impl InputShape {
  pub fn new(height: u32, width: u32) -> Result<Self, ConfigError> {
    if height == 0 || width == 0 {
      return Err(ConfigError::InvalidInputShape {
        height: height as i64,
        width: width as i64,
      });
    }
    Ok(Self { height, width })
  }

  /// 从模型声明的维度构造，动态维度（<= 0）视为非法
  pub fn from_dims(height: i64, width: i64) -> Result<Self, ConfigError> {
    if height <= 0 || width <= 0 || height > u32::MAX as i64 || width > u32::MAX as i64 {
      return Err(ConfigError::InvalidInputShape { height, width });
    }
    Self::new(height as u32, width as u32)
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn width(&self) -> u32 {
    self.width
  }
}

/// 原图坐标系下的整数边界框
///
/// 网络输入坐标只出现在 [`crate::decode::RawDetection`] 中，
/// 经过 [`crate::remap::Remapper`] 映射之后才会成为 `BBox`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BBox {
  pub x1: i32,
  pub y1: i32,
  pub x2: i32,
  pub y2: i32,
}

impl BBox {
  pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
    Self { x1, y1, x2, y2 }
  }

  pub fn width(&self) -> i64 {
    self.x2 as i64 - self.x1 as i64
  }

  pub fn height(&self) -> i64 {
    self.y2 as i64 - self.y1 as i64
  }

  /// 面积，翻转或退化的框为 0
  pub fn area(&self) -> i64 {
    if self.is_degenerate() {
      0
    } else {
      self.width() * self.height()
    }
  }

  pub fn is_degenerate(&self) -> bool {
    self.width() <= 0 || self.height() <= 0
  }

  pub fn intersection(&self, other: &BBox) -> i64 {
    let x_left = self.x1.max(other.x1) as i64;
    let y_top = self.y1.max(other.y1) as i64;
    let x_right = self.x2.min(other.x2) as i64;
    let y_bottom = self.y2.min(other.y2) as i64;

    if x_right <= x_left || y_bottom <= y_top {
      0
    } else {
      (x_right - x_left) * (y_bottom - y_top)
    }
  }

  /// 交并比，任一框退化时为 0
  pub fn iou(&self, other: &BBox) -> f32 {
    if self.is_degenerate() || other.is_degenerate() {
      return 0.0;
    }

    let inter = self.intersection(other);
    if inter == 0 {
      return 0.0;
    }

    let union = self.area() + other.area() - inter;
    (inter as f64 / union as f64) as f32
  }
}
