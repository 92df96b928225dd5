// 该文件是 Beifeng （北风） 项目的一部分。
// src/nms.rs - 非极大值抑制
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

use tracing::debug;

use crate::geometry::BBox;

/// 贪心 NMS
///
/// * `boxes`, `scores` - 一一对应，长度不一致时只使用公共前缀
/// * `score_threshold` - 得分严格大于该值才参与
/// * `iou_threshold` - 与已选框的 IoU 严格大于该值的框被抑制
///
/// 返回保留框在输入中的下标，按得分降序排列，得分相同保持输入顺序。
/// 退化框（面积为 0）不会被选中，也不会抑制其他框。
pub fn nms(boxes: &[BBox], scores: &[f32], score_threshold: f32, iou_threshold: f32) -> Vec<usize> {
  let len = boxes.len().min(scores.len());

  let mut order: Vec<usize> = (0..len)
    .filter(|&i| scores[i] > score_threshold && !boxes[i].is_degenerate())
    .collect();
  // sort_by 是稳定排序
  order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

  let mut suppressed = vec![false; order.len()];
  let mut keep = Vec::new();

  for i in 0..order.len() {
    if suppressed[i] {
      continue;
    }

    let current = &boxes[order[i]];
    keep.push(order[i]);

    for j in (i + 1)..order.len() {
      if suppressed[j] {
        continue;
      }
      if current.iou(&boxes[order[j]]) > iou_threshold {
        suppressed[j] = true;
      }
    }
  }

  debug!("NMS: {} 个候选框保留 {} 个", len, keep.len());

  keep
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  #[test]
  fn empty_input_gives_empty_output() {
    assert!(nms(&[], &[], 0.5, 0.5).is_empty());
  }

  #[test]
  fn overlapping_lower_score_is_suppressed() {
    // IoU = 70 / 100 = 0.7
    let boxes = [BBox::new(0, 0, 10, 10), BBox::new(0, 0, 10, 7)];
    let scores = [0.6, 0.9];
    assert_relative_eq!(boxes[0].iou(&boxes[1]), 0.7);
    assert_eq!(nms(&boxes, &scores, 0.5, 0.5), vec![1]);
  }

  #[test]
  fn non_overlapping_boxes_all_kept_in_score_order() {
    let boxes = [
      BBox::new(0, 0, 10, 10),
      BBox::new(20, 20, 30, 30),
      BBox::new(40, 40, 50, 50),
    ];
    let scores = [0.6, 0.95, 0.8];
    assert_eq!(nms(&boxes, &scores, 0.5, 0.5), vec![1, 2, 0]);
  }

  #[test]
  fn iou_equal_to_threshold_is_not_suppressed() {
    // IoU = 50 / 100 = 0.5
    let boxes = [BBox::new(0, 0, 10, 10), BBox::new(0, 0, 10, 5)];
    let scores = [0.9, 0.8];
    assert_eq!(nms(&boxes, &scores, 0.1, 0.5), vec![0, 1]);
  }

  #[test]
  fn ties_keep_input_order() {
    let boxes = [
      BBox::new(0, 0, 10, 10),
      BBox::new(100, 100, 110, 110),
      BBox::new(1, 1, 10, 10),
    ];
    let scores = [0.7, 0.7, 0.7];
    assert_eq!(nms(&boxes, &scores, 0.5, 0.5), vec![0, 1]);
  }

  #[test]
  fn scores_at_or_below_threshold_are_ignored() {
    let boxes = [BBox::new(0, 0, 10, 10), BBox::new(0, 0, 10, 10)];
    let scores = [0.5, 0.3];
    assert!(nms(&boxes, &scores, 0.5, 0.5).is_empty());
  }

  #[test]
  fn degenerate_boxes_are_never_kept() {
    let boxes = [
      BBox::new(5, 5, 5, 50),
      BBox::new(0, 0, 10, 10),
      BBox::new(30, 30, 20, 20),
    ];
    let scores = [0.99, 0.6, 0.95];
    assert_eq!(nms(&boxes, &scores, 0.5, 0.5), vec![1]);
  }

  #[test]
  fn mismatched_lengths_use_common_prefix() {
    let boxes = [
      BBox::new(0, 0, 10, 10),
      BBox::new(50, 50, 60, 60),
      BBox::new(80, 80, 90, 90),
    ];
    assert_eq!(nms(&boxes, &[0.9, 0.8], 0.5, 0.5), vec![0, 1]);
    assert_eq!(nms(&boxes[..1], &[0.9, 0.8, 0.7], 0.5, 0.5), vec![0]);
  }

  #[test]
  fn iou_threshold_of_one_keeps_everything() {
    let boxes = [BBox::new(0, 0, 10, 10), BBox::new(0, 0, 10, 10)];
    let scores = [0.9, 0.8];
    assert_eq!(nms(&boxes, &scores, 0.5, 1.0), vec![0, 1]);
  }

  #[test]
  fn applying_twice_changes_nothing() {
    let boxes = [
      BBox::new(0, 0, 100, 100),
      BBox::new(5, 5, 105, 105),
      BBox::new(200, 200, 300, 300),
      BBox::new(60, 0, 160, 100),
      BBox::new(210, 190, 310, 290),
    ];
    let scores = [0.9, 0.85, 0.7, 0.8, 0.75];
    let first = nms(&boxes, &scores, 0.5, 0.45);

    let kept_boxes: Vec<BBox> = first.iter().map(|&i| boxes[i]).collect();
    let kept_scores: Vec<f32> = first.iter().map(|&i| scores[i]).collect();
    let second = nms(&kept_boxes, &kept_scores, 0.5, 0.45);
    assert_eq!(second, (0..first.len()).collect::<Vec<_>>());
  }
}
