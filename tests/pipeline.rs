// 该文件是 Beifeng （北风） 项目的一部分。
// tests/pipeline.rs - 检测流程测试
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

use approx::assert_relative_eq;

use beifeng::{
  BBox, DetectError, Detector, DetectorConfig, InferenceEngine, InputShape, LabelSet,
  decode::{DecodeError, HeadLayout},
};
use image::{Rgb, RgbImage};
use ndarray::{Array4, ArrayD, IxDyn};

#[derive(Debug, thiserror::Error)]
#[error("引擎故障")]
struct StubError;

/// 返回固定输出，并记录收到的输入形状
struct StubEngine {
  shape: InputShape,
  dims: Vec<usize>,
  rows: Vec<f32>,
  seen: Mutex<Vec<Vec<usize>>>,
  fail: bool,
}

impl StubEngine {
  fn new(dims: &[usize], rows: Vec<f32>) -> Self {
    Self {
      shape: InputShape::new(640, 640).unwrap(),
      dims: dims.to_vec(),
      rows,
      seen: Mutex::new(Vec::new()),
      fail: false,
    }
  }

  fn rows(rows: &[[f32; 6]]) -> Self {
    Self::new(&[1, rows.len(), 6], rows.iter().flatten().copied().collect())
  }
}

impl InferenceEngine for StubEngine {
  type Error = StubError;

  fn input_shape(&self) -> Option<InputShape> {
    Some(self.shape)
  }

  fn infer(&self, input: &Array4<f32>) -> Result<ArrayD<f32>, Self::Error> {
    self.seen.lock().unwrap().push(input.shape().to_vec());
    if self.fail {
      return Err(StubError);
    }
    Ok(ArrayD::from_shape_vec(IxDyn(&self.dims), self.rows.clone()).unwrap())
  }
}

fn labels() -> LabelSet {
  "person\nbicycle\ncar\n".parse().unwrap()
}

fn image(width: u32, height: u32) -> RgbImage {
  RgbImage::from_pixel(width, height, Rgb([90, 120, 150]))
}

#[test]
fn wide_image_box_is_mapped_back_through_the_letterbox() {
  let engine = StubEngine::rows(&[[100.0, 100.0, 200.0, 200.0, 0.9, 0.0]]);
  let detector = Detector::new(engine, labels(), DetectorConfig::default()).unwrap();

  let result = detector.detect(&image(640, 480)).unwrap();

  assert_eq!(result.letterbox.pad_top(), 80);
  assert_eq!(result.letterbox.pad_left(), 0);
  assert_eq!(result.len(), 1);
  let item = &result.items[0];
  assert_eq!(item.bbox, BBox::new(100, 20, 200, 120));
  assert_eq!(item.class_id, 0);
  assert_eq!(item.label, "person");
  assert_relative_eq!(item.confidence, 0.9);
}

#[test]
fn engine_receives_a_single_normalized_nchw_tensor() {
  let engine = StubEngine::rows(&[]);
  let detector = Detector::new(engine, labels(), DetectorConfig::default()).unwrap();
  detector.detect(&image(1280, 720)).unwrap();
  detector.detect(&image(300, 900)).unwrap();

  let seen = detector.engine().seen.lock().unwrap();
  assert_eq!(*seen, vec![vec![1, 3, 640, 640], vec![1, 3, 640, 640]]);
}

#[test]
fn duplicate_detection_is_suppressed() {
  // IoU = 0.7
  let engine = StubEngine::rows(&[
    [0.0, 100.0, 100.0, 200.0, 0.8, 2.0],
    [0.0, 100.0, 100.0, 170.0, 0.95, 2.0],
  ]);
  let config = DetectorConfig::default().with_nms_threshold(0.5);
  let detector = Detector::new(engine, labels(), config).unwrap();

  let result = detector.detect(&image(640, 640)).unwrap();

  assert_eq!(result.len(), 1);
  assert_eq!(result.items[0].bbox, BBox::new(0, 100, 100, 170));
  assert_eq!(result.items[0].label, "car");
}

#[test]
fn confidence_threshold_is_strict() {
  let engine = StubEngine::rows(&[
    [10.0, 10.0, 50.0, 50.0, 0.5, 0.0],
    [300.0, 300.0, 350.0, 350.0, 0.500_001, 1.0],
  ]);
  let detector = Detector::new(engine, labels(), DetectorConfig::default()).unwrap();

  let result = detector.detect(&image(640, 640)).unwrap();

  assert_eq!(result.len(), 1);
  assert_eq!(result.items[0].label, "bicycle");
}

#[test]
fn results_are_in_descending_confidence() {
  let engine = StubEngine::rows(&[
    [0.0, 0.0, 50.0, 50.0, 0.6, 0.0],
    [100.0, 100.0, 150.0, 150.0, 0.9, 1.0],
    [200.0, 200.0, 250.0, 250.0, 0.75, 2.0],
  ]);
  let detector = Detector::new(engine, labels(), DetectorConfig::default()).unwrap();

  let result = detector.detect(&image(640, 640)).unwrap();

  let labels: Vec<&str> = result.iter().map(|d| d.label.as_str()).collect();
  assert_eq!(labels, vec!["bicycle", "car", "person"]);
}

#[test]
fn unknown_class_id_is_kept_with_placeholder_label() {
  let engine = StubEngine::rows(&[[10.0, 10.0, 50.0, 50.0, 0.9, 42.0]]);
  let detector = Detector::new(engine, labels(), DetectorConfig::default()).unwrap();

  let result = detector.detect(&image(640, 640)).unwrap();

  assert_eq!(result.items[0].class_id, 42);
  assert_eq!(result.items[0].label, "unknown");
}

#[test]
fn empty_output_gives_empty_result() {
  let engine = StubEngine::new(&[0, 6], Vec::new());
  let detector = Detector::new(engine, labels(), DetectorConfig::default()).unwrap();

  let result = detector.detect(&image(200, 100)).unwrap();

  assert!(result.is_empty());
}

#[test]
fn wrong_output_shape_is_reported() {
  let engine = StubEngine::new(&[1, 2, 7], vec![0.0; 14]);
  let detector = Detector::new(engine, labels(), DetectorConfig::default()).unwrap();

  match detector.detect(&image(64, 64)) {
    Err(DetectError::DecodeError(DecodeError::ShapeMismatch { actual, .. })) => {
      assert_eq!(actual, vec![1, 2, 7]);
    }
    other => panic!("unexpected result: {other:?}"),
  }
}

#[test]
fn engine_failure_is_propagated() {
  let mut engine = StubEngine::rows(&[]);
  engine.fail = true;
  let detector = Detector::new(engine, labels(), DetectorConfig::default()).unwrap();

  let err = detector.detect(&image(64, 64)).unwrap_err();
  assert!(matches!(err, DetectError::EngineError(_)));
  assert!(err.to_string().contains("引擎故障"));
}

#[test]
fn empty_image_is_rejected() {
  let engine = StubEngine::rows(&[]);
  let detector = Detector::new(engine, labels(), DetectorConfig::default()).unwrap();

  assert!(matches!(
    detector.detect(&RgbImage::new(0, 10)),
    Err(DetectError::LetterboxError(_))
  ));
}

#[test]
fn stretch_mode_scales_each_axis() {
  let engine = StubEngine::rows(&[[64.0, 64.0, 320.0, 320.0, 0.9, 0.0]]);
  let config = DetectorConfig::default().with_keep_ratio(false);
  let detector = Detector::new(engine, labels(), config).unwrap();

  let result = detector.detect(&image(1280, 320)).unwrap();

  assert_eq!(result.letterbox.pad_top(), 0);
  assert_eq!(result.items[0].bbox, BBox::new(128, 32, 640, 160));
}

#[test]
fn class_score_head_is_decoded_by_argmax() {
  let engine = StubEngine::new(
    &[2, 7],
    vec![
      10.0, 10.0, 60.0, 60.0, 0.1, 0.2, 0.85, //
      300.0, 300.0, 360.0, 360.0, 0.3, 0.2, 0.1,
    ],
  );
  let config = DetectorConfig::default().with_head(HeadLayout::ClassScores { num_classes: 3 });
  let detector = Detector::new(engine, labels(), config).unwrap();

  let result = detector.detect(&image(640, 640)).unwrap();

  assert_eq!(result.len(), 1);
  assert_eq!(result.items[0].label, "car");
  assert_eq!(result.items[0].bbox, BBox::new(10, 10, 60, 60));
}
