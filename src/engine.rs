// 该文件是 Beifeng （北风） 项目的一部分。
// src/engine.rs - 推理引擎接口
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

use ndarray::{Array4, ArrayD};

use crate::geometry::InputShape;

/// 推理引擎
///
/// 输入为 `(1, 3, H, W)` 的归一化张量，输出为原始检测张量，
/// 形状通常是 `(N, 6)` 或 `(1, N, 6)`，由解码阶段负责校验。
/// `infer` 只借用 `&self`，不可重入的引擎需在内部加锁。
pub trait InferenceEngine {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 模型声明的固定输入尺寸，动态尺寸返回 `None`
  fn input_shape(&self) -> Option<InputShape>;

  fn infer(&self, input: &Array4<f32>) -> Result<ArrayD<f32>, Self::Error>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for &E {
  type Error = E::Error;

  fn input_shape(&self) -> Option<InputShape> {
    (**self).input_shape()
  }

  fn infer(&self, input: &Array4<f32>) -> Result<ArrayD<f32>, Self::Error> {
    (**self).infer(input)
  }
}

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxEngine, OnnxEngineBuilder, OnnxEngineError};
