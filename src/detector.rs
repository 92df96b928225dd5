// 该文件是 Beifeng （北风） 项目的一部分。
// src/detector.rs - 单张图像目标检测
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

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  config::{ConfigError, DetectorConfig},
  decode::{DecodeError, HeadLayout, RawDetections},
  engine::InferenceEngine,
  geometry::{BBox, InputShape},
  label::LabelSet,
  letterbox::{Letterbox, LetterboxError, letterbox},
  nms::nms,
  remap::Remapper,
  tensor::to_tensor,
};

const UNKNOWN_LABEL: &str = "unknown";

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("预处理错误: {0}")]
  LetterboxError(#[from] LetterboxError),
  #[error("解码错误: {0}")]
  DecodeError(#[from] DecodeError),
  #[error("推理引擎错误: {0}")]
  EngineError(Box<dyn std::error::Error + Send + Sync>),
}

/// 原图坐标系下的一个检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub bbox: BBox,
  pub confidence: f32,
  pub class_id: usize,
  pub label: String,
}

#[derive(Debug, Clone)]
pub struct DetectResult {
  /// 按置信度降序排列
  pub items: Box<[Detection]>,
  pub letterbox: Letterbox,
  pub inference_time: Duration,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Detection> {
    self.items.iter()
  }
}

/// 检测器
///
/// 构造后配置只读，`detect` 的所有中间数据都在调用内部分配，
/// 因此引擎可共享时检测器也可以跨线程共享。
pub struct Detector<E> {
  engine: E,
  config: DetectorConfig,
  input_shape: InputShape,
  labels: Arc<LabelSet>,
}

impl<E: InferenceEngine> Detector<E> {
  /// 校验配置；输入尺寸优先取配置中的覆盖值，其次取引擎声明的尺寸
  pub fn new(
    engine: E,
    labels: impl Into<Arc<LabelSet>>,
    config: DetectorConfig,
  ) -> Result<Self, ConfigError> {
    config.validate()?;

    let input_shape = config
      .input_shape
      .or_else(|| engine.input_shape())
      .ok_or(ConfigError::MissingInputShape)?;

    let labels = labels.into();
    if labels.is_empty() {
      return Err(ConfigError::LabelError(crate::label::LabelError::Empty));
    }
    if let HeadLayout::ClassScores { num_classes } = config.head {
      if num_classes > labels.len() {
        return Err(ConfigError::ClassCountMismatch {
          classes: num_classes,
          labels: labels.len(),
        });
      }
    }

    info!(
      "检测器就绪: 输入 {}x{}, {} 个类别, 置信度阈值 {}, NMS 阈值 {}",
      input_shape.width(),
      input_shape.height(),
      labels.len(),
      config.conf_threshold,
      config.nms_threshold
    );

    Ok(Self {
      engine,
      config,
      input_shape,
      labels,
    })
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }

  pub fn input_shape(&self) -> InputShape {
    self.input_shape
  }

  pub fn labels(&self) -> &Arc<LabelSet> {
    &self.labels
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }

  pub fn detect(&self, image: &RgbImage) -> Result<DetectResult, DetectError> {
    let boxed = letterbox(
      image,
      self.input_shape,
      self.config.keep_ratio,
      self.config.interpolation,
    )?;
    let tensor = to_tensor(&boxed.image, &self.config.tensor);

    let now = Instant::now();
    let output = self
      .engine
      .infer(&tensor)
      .map_err(|e| DetectError::EngineError(Box::new(e)))?;
    let inference_time = now.elapsed();
    debug!("推理耗时: {:.2?}", inference_time);

    let raw = RawDetections::from_output(output, self.config.head)?;
    let remapper = Remapper::new(&boxed.params);
    let candidates = raw.decode(self.config.conf_threshold, &remapper);

    let keep = nms(
      &candidates.boxes,
      &candidates.scores,
      self.config.conf_threshold,
      self.config.nms_threshold,
    );

    let items = keep
      .into_iter()
      .map(|i| {
        let class_id = candidates.class_ids[i];
        Detection {
          bbox: candidates.boxes[i],
          confidence: candidates.scores[i],
          class_id,
          label: self.label_of(class_id),
        }
      })
      .collect();

    Ok(DetectResult {
      items,
      letterbox: boxed.params,
      inference_time,
    })
  }

  #[cfg(feature = "render")]
  pub fn detect_annotated(
    &self,
    image: &RgbImage,
    draw: &crate::output::draw::Draw,
  ) -> Result<(DetectResult, RgbImage), DetectError> {
    let result = self.detect(image)?;
    let annotated = draw.annotate(image, &result);
    Ok((result, annotated))
  }

  fn label_of(&self, class_id: usize) -> String {
    match self.labels.get(class_id) {
      Some(label) => label.to_string(),
      None => {
        warn!(
          "类别编号 {} 超出标签范围 ({} 个)",
          class_id,
          self.labels.len()
        );
        UNKNOWN_LABEL.to_string()
      }
    }
  }
}
