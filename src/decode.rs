// 该文件是 Beifeng （北风） 项目的一部分。
// src/decode.rs - 检测头输出解码
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

use ndarray::{Array2, ArrayD, ArrayView1, ArrayView2, Axis, Ix2};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{geometry::BBox, remap::Remapper};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
  #[error("模型输出形状不匹配: 期望 {expected}, 实际 {actual:?}")]
  ShapeMismatch { expected: String, actual: Vec<usize> },
}

/// 检测头每行的布局
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeadLayout {
  /// `[x1, y1, x2, y2, confidence, class_id]`
  #[default]
  SingleClass,
  /// `[x1, y1, x2, y2, score_0, .., score_{n-1}]`，取最大得分的类别
  ClassScores { num_classes: usize },
}

impl HeadLayout {
  pub fn columns(&self) -> usize {
    match self {
      HeadLayout::SingleClass => 6,
      HeadLayout::ClassScores { num_classes } => 4 + num_classes,
    }
  }
}

/// 网络输入坐标系下的一行原始检测
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
  pub confidence: f32,
  /// 仍是模型给出的浮点值，可能为负数或 NaN
  pub class_id: f32,
}

impl RawDetection {
  pub fn from_row(row: ArrayView1<f32>, head: HeadLayout) -> Option<Self> {
    if row.len() < head.columns() {
      return None;
    }

    let (confidence, class_id) = match head {
      HeadLayout::SingleClass => (row[4], row[5]),
      HeadLayout::ClassScores { num_classes } => {
        let mut best: Option<(usize, f32)> = None;
        for (index, &score) in row.iter().skip(4).take(num_classes).enumerate() {
          // NaN 与无穷得分不参与比较
          if !score.is_finite() {
            continue;
          }
          if best.is_none_or(|(_, current)| score > current) {
            best = Some((index, score));
          }
        }
        let (index, score) = best?;
        (score, index as f32)
      }
    };

    Some(Self {
      x1: row[0],
      y1: row[1],
      x2: row[2],
      y2: row[3],
      confidence,
      class_id,
    })
  }
}

/// 经过形状校验的模型输出，形状为 `[N, C]`
#[derive(Debug, Clone)]
pub struct RawDetections {
  rows: Array2<f32>,
  head: HeadLayout,
}

impl RawDetections {
  /// 接受 `[N, C]` 或 `[1, N, C]`，`C` 由检测头布局决定
  pub fn from_output(output: ArrayD<f32>, head: HeadLayout) -> Result<Self, DecodeError> {
    let columns = head.columns();
    let actual = output.shape().to_vec();
    let mismatch = || DecodeError::ShapeMismatch {
      expected: format!("[N, {columns}] 或 [1, N, {columns}]"),
      actual: actual.clone(),
    };

    let rows = match output.ndim() {
      2 => output.into_dimensionality::<Ix2>().map_err(|_| mismatch())?,
      3 if actual[0] == 1 => output
        .index_axis_move(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .map_err(|_| mismatch())?,
      _ => return Err(mismatch()),
    };

    if rows.ncols() != columns {
      return Err(mismatch());
    }

    Ok(Self { rows, head })
  }

  pub fn len(&self) -> usize {
    self.rows.nrows()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.nrows() == 0
  }

  pub fn head(&self) -> HeadLayout {
    self.head
  }

  pub fn rows(&self) -> ArrayView2<'_, f32> {
    self.rows.view()
  }

  pub fn decode(&self, conf_threshold: f32, remapper: &Remapper) -> Candidates {
    decode(self.rows.view(), self.head, conf_threshold, remapper)
  }
}

/// 解码后的候选框，三个向量长度一致、顺序对应
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
  pub boxes: Vec<BBox>,
  pub scores: Vec<f32>,
  pub class_ids: Vec<usize>,
}

impl Candidates {
  pub fn len(&self) -> usize {
    self.boxes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.boxes.is_empty()
  }

  fn push(&mut self, bbox: BBox, score: f32, class_id: usize) {
    self.boxes.push(bbox);
    self.scores.push(score);
    self.class_ids.push(class_id);
  }
}

/// 按置信度过滤（严格大于阈值），并把角点映射回原图坐标
pub fn decode(
  rows: ArrayView2<f32>,
  head: HeadLayout,
  conf_threshold: f32,
  remapper: &Remapper,
) -> Candidates {
  let mut candidates = Candidates::default();

  for (index, row) in rows.outer_iter().enumerate() {
    let Some(raw) = RawDetection::from_row(row, head) else {
      continue;
    };

    if raw.confidence.is_nan() || raw.confidence <= conf_threshold {
      continue;
    }

    if !raw.class_id.is_finite() || raw.class_id < 0.0 {
      warn!("第 {} 行类别编号无效: {}，已丢弃", index, raw.class_id);
      continue;
    }

    let bbox = remapper.map_box(raw.x1, raw.y1, raw.x2, raw.y2);
    candidates.push(bbox, raw.confidence, raw.class_id as usize);
  }

  debug!(
    "解码 {} 行，保留 {} 个候选框 (阈值 {})",
    rows.nrows(),
    candidates.len(),
    conf_threshold
  );

  candidates
}
