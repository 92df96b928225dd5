// 该文件是 Beifeng （北风） 项目的一部分。
// src/tensor.rs - 网络输入张量预处理
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

use image::RgbImage;
use ndarray::Array4;

/// 送入网络的通道顺序
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelOrder {
  #[default]
  Rgb,
  Bgr,
}

/// 缩放到 [0, 1] 之后的归一化方式
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Normalization {
  #[default]
  UnitRange,
  MeanStd { mean: [f32; 3], std: [f32; 3] },
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TensorOptions {
  pub channel_order: ChannelOrder,
  pub normalization: Normalization,
}

impl TensorOptions {
  pub fn with_channel_order(mut self, channel_order: ChannelOrder) -> Self {
    self.channel_order = channel_order;
    self
  }

  pub fn with_normalization(mut self, normalization: Normalization) -> Self {
    self.normalization = normalization;
    self
  }
}

/// HWC u8 图像转为 (1, 3, H, W) 的 f32 张量
pub fn to_tensor(image: &RgbImage, options: &TensorOptions) -> Array4<f32> {
  let (width, height) = image.dimensions();
  let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

  let (mean, std) = match options.normalization {
    Normalization::UnitRange => ([0.0; 3], [1.0; 3]),
    Normalization::MeanStd { mean, std } => (mean, std),
  };

  for (x, y, pixel) in image.enumerate_pixels() {
    for c in 0..3 {
      let src_c = match options.channel_order {
        ChannelOrder::Rgb => c,
        ChannelOrder::Bgr => 2 - c,
      };
      let value = pixel[src_c] as f32 / 255.0;
      tensor[[0, c, y as usize, x as usize]] = (value - mean[c]) / std[c];
    }
  }

  tensor
}
