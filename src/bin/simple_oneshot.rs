// 该文件是 Beifeng （北风） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图像检测
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use beifeng::{
  Detector, DetectorConfig, FromUrl, LabelSet,
  engine::OnnxEngineBuilder,
  input::InputWrapper,
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

/// Beifeng 单张图像检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型，例如 onnx:///path/to/model.onnx
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 image:///path/to/input.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 image:///path/to/output.jpg 或 folder:///path/to/records?record
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 类别标签文件，每行一个
  #[arg(long, value_name = "LABELS")]
  pub labels: PathBuf,
  /// 置信度阈值
  #[arg(long, default_value_t = 0.5)]
  pub confidence: f32,
  /// NMS IoU 阈值
  #[arg(long, default_value_t = 0.6)]
  pub nms_threshold: f32,
  /// 直接拉伸到网络输入尺寸，不保持长宽比
  #[arg(long)]
  pub no_keep_ratio: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let labels = LabelSet::from_file(&args.labels)?;
  let engine = OnnxEngineBuilder::from_url(&args.model)?.build()?;
  let config = DetectorConfig::default()
    .with_conf_threshold(args.confidence)
    .with_nms_threshold(args.nms_threshold)
    .with_keep_ratio(!args.no_keep_ratio);
  let detector = Detector::new(engine, labels, config)?;

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask.run_task(input, &detector, output)?;

  Ok(())
}
