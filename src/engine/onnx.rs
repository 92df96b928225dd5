// 该文件是 Beifeng （北风） 项目的一部分。
// src/engine/onnx.rs - ONNX Runtime 推理引擎
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

use std::sync::Mutex;

use ndarray::{Array4, ArrayD, IxDyn};
use ort::{
  inputs,
  session::{Session, builder::GraphOptimizationLevel},
  value::Tensor,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, engine::InferenceEngine, geometry::InputShape};

const DEFAULT_INTRA_THREADS: usize = 4;

#[derive(Error, Debug)]
pub enum OnnxEngineError {
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型没有输入")]
  NoInput,
  #[error("模型没有输出")]
  NoOutput,
  #[error("输出形状无效: {0:?}")]
  InvalidOutputShape(Vec<i64>),
  #[error("张量形状错误: {0}")]
  ShapeError(#[from] ndarray::ShapeError),
  #[error("推理会话锁已损坏")]
  Poisoned,
}

pub struct OnnxEngineBuilder {
  model_path: String,
  intra_threads: usize,
}

impl FromUrlWithScheme for OnnxEngineBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxEngineBuilder {
  type Error = OnnxEngineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxEngineError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let intra_threads = url
      .query_pairs()
      .find(|(k, _)| k == "threads")
      .and_then(|(_, v)| v.parse().ok())
      .unwrap_or(DEFAULT_INTRA_THREADS);

    Ok(OnnxEngineBuilder {
      model_path: url.path().to_string(),
      intra_threads,
    })
  }
}

impl OnnxEngineBuilder {
  pub fn new(model_path: impl Into<String>) -> Self {
    Self {
      model_path: model_path.into(),
      intra_threads: DEFAULT_INTRA_THREADS,
    }
  }

  pub fn intra_threads(mut self, threads: usize) -> Self {
    self.intra_threads = threads;
    self
  }

  pub fn build(self) -> Result<OnnxEngine, OnnxEngineError> {
    info!("加载模型文件: {}", self.model_path);
    let session = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)?
      .with_intra_threads(self.intra_threads)?
      .commit_from_file(&self.model_path)?;
    info!("模型加载完成");

    let input = session.inputs.first().ok_or(OnnxEngineError::NoInput)?;
    if session.outputs.is_empty() {
      return Err(OnnxEngineError::NoOutput);
    }

    let input_name = input.name.clone();
    let input_shape = input
      .input_type
      .tensor_shape()
      .filter(|dims| dims.len() == 4)
      .and_then(|dims| InputShape::from_dims(dims[2], dims[3]).ok());

    match input_shape {
      Some(shape) => debug!(
        "模型输入 {}: {}x{}",
        input_name,
        shape.width(),
        shape.height()
      ),
      None => warn!("模型输入 {} 的尺寸为动态尺寸", input_name),
    }

    Ok(OnnxEngine {
      session: Mutex::new(session),
      input_name,
      input_shape,
    })
  }
}

/// 基于 ONNX Runtime 的推理引擎，会话运行需要独占访问，因此放在锁内
pub struct OnnxEngine {
  session: Mutex<Session>,
  input_name: String,
  input_shape: Option<InputShape>,
}

impl InferenceEngine for OnnxEngine {
  type Error = OnnxEngineError;

  fn input_shape(&self) -> Option<InputShape> {
    self.input_shape
  }

  fn infer(&self, input: &Array4<f32>) -> Result<ArrayD<f32>, Self::Error> {
    let (n, c, h, w) = input.dim();
    let data: Vec<f32> = input.iter().copied().collect();
    let tensor = Tensor::from_array(([n, c, h, w], data))?;

    let mut session = self.session.lock().map_err(|_| OnnxEngineError::Poisoned)?;
    let outputs = session.run(inputs![self.input_name.as_str() => tensor])?;

    let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
    let dims = shape
      .iter()
      .map(|&d| usize::try_from(d))
      .collect::<Result<Vec<_>, _>>()
      .map_err(|_| OnnxEngineError::InvalidOutputShape(shape.to_vec()))?;
    debug!("模型输出形状: {:?}", dims);

    Ok(ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())?)
  }
}
