// 该文件是 Beifeng （北风） 项目的一部分。
// src/remap.rs - 网络输入坐标到原图坐标的映射
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

use crate::{geometry::BBox, letterbox::Letterbox};

/// Letterbox 的逆变换
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Remapper {
  ratio_h: f32,
  ratio_w: f32,
  pad_top: f32,
  pad_left: f32,
}

impl Remapper {
  pub fn new(letterbox: &Letterbox) -> Self {
    // new_h, new_w 至少为 1
    Self {
      ratio_h: letterbox.src_h() as f32 / letterbox.new_h() as f32,
      ratio_w: letterbox.src_w() as f32 / letterbox.new_w() as f32,
      pad_top: letterbox.pad_top() as f32,
      pad_left: letterbox.pad_left() as f32,
    }
  }

  pub fn ratio_h(&self) -> f32 {
    self.ratio_h
  }

  pub fn ratio_w(&self) -> f32 {
    self.ratio_w
  }

  pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
    (
      (x - self.pad_left) * self.ratio_w,
      (y - self.pad_top) * self.ratio_h,
    )
  }

  /// 映射两个角点并向零截断为整数像素
  pub fn map_box(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> BBox {
    let (x1, y1) = self.map_point(x1, y1);
    let (x2, y2) = self.map_point(x2, y2);
    BBox::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32)
  }
}
