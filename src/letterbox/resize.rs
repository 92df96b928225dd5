// 该文件是 Beifeng （北风） 项目的一部分。
// src/letterbox/resize.rs - 面积插值缩放
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

use fast_image_resize as fr;
use image::RgbImage;

use super::LetterboxError;

/// 盒式卷积缩放，缩小时每个目标像素取其覆盖的源像素的平均值
///
/// 源图像以借用方式交给 `fast_image_resize`，不复制像素。
pub fn resize_area(image: &RgbImage, width: u32, height: u32) -> Result<RgbImage, LetterboxError> {
  let (src_w, src_h) = image.dimensions();
  if width == 0 || height == 0 || src_w == 0 || src_h == 0 {
    return Ok(RgbImage::new(width, height));
  }

  let src = fr::images::ImageRef::new(src_w, src_h, image.as_raw(), fr::PixelType::U8x3)
    .map_err(|e| LetterboxError::ResizeError(e.to_string()))?;
  let mut dst = fr::images::Image::new(width, height, fr::PixelType::U8x3);

  let options =
    fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Box));
  fr::Resizer::new()
    .resize(&src, &mut dst, &options)
    .map_err(|e| LetterboxError::ResizeError(e.to_string()))?;

  RgbImage::from_raw(width, height, dst.into_vec()).ok_or_else(|| {
    LetterboxError::ResizeError(format!("缓冲区长度与 {width}x{height} 不符"))
  })
}
