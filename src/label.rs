// 该文件是 Beifeng （北风） 项目的一部分。
// src/label.rs - 类别标签
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
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("无法读取标签文件 {path:?}: {source}")]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("标签文件为空")]
  Empty,
  #[error("标签文件第 {line} 行为空")]
  BlankLabel { line: usize },
}

/// 按类别 ID 排列的类别名称，加载后只读
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
  names: Box<[String]>,
}

impl LabelSet {
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| LabelError::IoError {
      path: path.to_path_buf(),
      source,
    })?;
    let labels: LabelSet = content.parse()?;
    debug!("从 {:?} 加载了 {} 个标签", path, labels.len());
    Ok(labels)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }
}

impl FromStr for LabelSet {
  type Err = LabelError;

  /// 每行一个类别名，去掉行尾空白；文件末尾的空行会被忽略
  fn from_str(content: &str) -> Result<Self, Self::Err> {
    let mut names: Vec<String> = content
      .lines()
      .map(|line| line.trim_end().to_string())
      .collect();

    while names.last().is_some_and(|name| name.is_empty()) {
      names.pop();
    }

    if names.is_empty() {
      return Err(LabelError::Empty);
    }

    if let Some(index) = names.iter().position(|name| name.is_empty()) {
      return Err(LabelError::BlankLabel { line: index + 1 });
    }

    Ok(Self {
      names: names.into_boxed_slice(),
    })
  }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self {
      names: iter.into_iter().map(Into::into).collect(),
    }
  }
}
