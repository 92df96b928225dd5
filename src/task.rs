// 该文件是 Beifeng （北风） 项目的一部分。
// src/task.rs - 任务
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
use tracing::info;

use crate::{
  detector::{DetectResult, Detector},
  engine::InferenceEngine,
  output::Render,
};

pub trait Task<I, D, O>: Sized {
  type Error;
  fn run_task(self, input: I, detector: D, output: O) -> Result<(), Self::Error>;
}

/// 取第一帧，检测一次并渲染
pub struct OneShotTask;

impl<E, I, O> Task<I, &Detector<E>, O> for OneShotTask
where
  E: InferenceEngine,
  I: Iterator<Item = RgbImage>,
  O: Render<RgbImage, DetectResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, detector: &Detector<E>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!(
      "输入帧获取成功 ({}x{})，开始检测...",
      frame.width(),
      frame.height()
    );

    let now = std::time::Instant::now();
    let result = detector.detect(&frame)?;
    let elapsed = now.elapsed();
    info!(
      "检测完成，{} 个目标，推理耗时: {:.2?}，总耗时: {:.2?}",
      result.len(),
      result.inference_time,
      elapsed
    );
    for item in result.iter() {
      info!(
        "  {} ({}) {:.2} [{}, {}, {}, {}]",
        item.label,
        item.class_id,
        item.confidence,
        item.bbox.x1,
        item.bbox.y1,
        item.bbox.x2,
        item.bbox.y2
      );
    }

    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}
