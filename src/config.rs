// 该文件是 Beifeng （北风） 项目的一部分。
// src/config.rs - 检测器配置
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

use thiserror::Error;

use crate::{
  decode::HeadLayout,
  geometry::InputShape,
  label::LabelError,
  letterbox::Interpolation,
  tensor::{Normalization, TensorOptions},
};

pub const DEFAULT_CONF_THRESHOLD: f32 = 0.5;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("{name} 阈值必须位于 (0, 1) 区间内, 实际为 {value}")]
  InvalidThreshold { name: &'static str, value: f32 },
  #[error("输入尺寸必须为正数, 实际为 {height}x{width}")]
  InvalidInputShape { height: i64, width: i64 },
  #[error("推理引擎未声明固定的输入尺寸, 且未在配置中指定")]
  MissingInputShape,
  #[error("类别数量必须大于 0")]
  InvalidClassCount,
  #[error("模型输出 {classes} 个类别, 但只有 {labels} 个标签")]
  ClassCountMismatch { classes: usize, labels: usize },
  #[error("第 {channel} 通道的标准差必须为有限的非零值, 实际为 {value}")]
  InvalidNormalization { channel: usize, value: f32 },
  #[error("标签错误: {0}")]
  LabelError(#[from] LabelError),
}

/// 构造期配置，检测过程中只读
#[derive(Debug, Clone)]
pub struct DetectorConfig {
  /// 置信度阈值，解码和 NMS 共用
  pub conf_threshold: f32,
  /// NMS IoU 阈值
  pub nms_threshold: f32,
  /// 是否保持长宽比（letterbox）
  pub keep_ratio: bool,
  pub interpolation: Interpolation,
  pub tensor: TensorOptions,
  pub head: HeadLayout,
  /// 覆盖引擎声明的输入尺寸
  pub input_shape: Option<InputShape>,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      conf_threshold: DEFAULT_CONF_THRESHOLD,
      nms_threshold: DEFAULT_NMS_THRESHOLD,
      keep_ratio: true,
      interpolation: Interpolation::default(),
      tensor: TensorOptions::default(),
      head: HeadLayout::default(),
      input_shape: None,
    }
  }
}

impl DetectorConfig {
  pub fn with_conf_threshold(mut self, threshold: f32) -> Self {
    self.conf_threshold = threshold;
    self
  }

  pub fn with_nms_threshold(mut self, threshold: f32) -> Self {
    self.nms_threshold = threshold;
    self
  }

  pub fn with_keep_ratio(mut self, keep_ratio: bool) -> Self {
    self.keep_ratio = keep_ratio;
    self
  }

  pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
    self.interpolation = interpolation;
    self
  }

  pub fn with_tensor_options(mut self, tensor: TensorOptions) -> Self {
    self.tensor = tensor;
    self
  }

  pub fn with_head(mut self, head: HeadLayout) -> Self {
    self.head = head;
    self
  }

  pub fn with_input_shape(mut self, input_shape: InputShape) -> Self {
    self.input_shape = Some(input_shape);
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    check_threshold("置信度", self.conf_threshold)?;
    check_threshold("NMS", self.nms_threshold)?;
    if let HeadLayout::ClassScores { num_classes: 0 } = self.head {
      return Err(ConfigError::InvalidClassCount);
    }
    if let Normalization::MeanStd { std, .. } = self.tensor.normalization {
      if let Some((channel, &value)) = std
        .iter()
        .enumerate()
        .find(|&(_, v)| !v.is_finite() || *v == 0.0)
      {
        return Err(ConfigError::InvalidNormalization { channel, value });
      }
    }
    Ok(())
  }
}

fn check_threshold(name: &'static str, value: f32) -> Result<(), ConfigError> {
  if value.is_nan() || value <= 0.0 || value >= 1.0 {
    return Err(ConfigError::InvalidThreshold { name, value });
  }
  Ok(())
}
