// 该文件是 Beifeng （北风） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Datelike, Utc};
use image::RgbImage;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme,
  detector::DetectResult,
  output::{
    Render,
    draw::{Draw, DrawError},
  },
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("字体错误: {0}")]
  DrawError(#[from] DrawError),
}

/// 按日期分目录保存结果图像
///
/// `folder:///data/records?record&always&font=/path/font.ttf`
///
/// * `record` - 同时写出同名 `.json` 检测记录
/// * `always` - 没有检测结果时也保存
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: Draw,
  record: bool,
  always: bool,
  frame_counter: Mutex<u16>,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let record = uri.query_pairs().any(|(k, _)| k == "record");
    let always = uri.query_pairs().any(|(k, _)| k == "always");
    let draw = match uri.query_pairs().find(|(k, _)| k == "font") {
      Some((_, font)) => Draw::with_font_file(font.into_owned())?,
      None => Draw::default(),
    };

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      draw,
      record,
      always,
      frame_counter: Mutex::new(0),
    })
  }
}

impl DirectoryRecordOutput {
  pub fn directory(&self) -> &Path {
    &self.directory
  }

  fn frame_id(&self) -> u16 {
    let mut counter = self
      .frame_counter
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    *counter = counter.wrapping_add(1);
    *counter
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }

  fn write_record(&self, path: &Path, result: &DetectResult) -> Result<(), DirectoryRecordOutputError> {
    let detections: Vec<_> = result
      .iter()
      .map(|d| {
        json!({
          "label": d.label,
          "class_id": d.class_id,
          "confidence": d.confidence,
          "bbox": [d.bbox.x1, d.bbox.y1, d.bbox.x2, d.bbox.y2],
        })
      })
      .collect();
    let record = json!({
      "image": path.file_name().map(|n| n.to_string_lossy().into_owned()),
      "inference_time_ms": result.inference_time.as_secs_f64() * 1000.0,
      "detections": detections,
    });

    let record_path = path.with_extension("json");
    std::fs::write(&record_path, serde_json::to_string_pretty(&record)?)?;
    debug!("写入检测记录: {:?}", record_path);
    Ok(())
  }
}

impl Render<RgbImage, DetectResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbImage, result: &DetectResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      debug!("没有检测结果，跳过保存");
      return Ok(());
    }

    let path = self.frame_path()?;
    self.draw.annotate(frame, result).save(&path)?;
    if self.record {
      self.write_record(&path, result)?;
    }
    info!("保存检测结果到: {:?}", path);
    Ok(())
  }
}
