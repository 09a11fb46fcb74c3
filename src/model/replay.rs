// 该文件是 Guanlan （观澜） 项目的一部分。
// src/model/replay.rs - 回放模型
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

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::{Model, RawDetection};
use crate::{FromUrl, FromUrlWithScheme, tile::Tile, utils::url_file_path};

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("预测文件解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 预测文件中的一项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilePrediction {
  pub tile: usize,
  pub detections: Vec<RawDetection>,
}

/// 回放事先记录的逐块模型输出
///
/// 文件格式为 `[{"tile": 0, "detections": [...]}, ...]`，未出现的分块视为无目标。
#[derive(Debug, Clone, Default)]
pub struct ReplayModel {
  predictions: BTreeMap<usize, Vec<RawDetection>>,
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ReplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayError::SchemeMismatch(format!(
        "期望方案 '{}', 实际方案 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Self::load(&url_file_path(url))
  }
}

impl ReplayModel {
  pub fn load(path: &Path) -> Result<Self, ReplayError> {
    info!("加载预测文件: {}", path.display());
    let contents = std::fs::read_to_string(path)?;
    Self::from_json(&contents)
  }

  pub fn from_json(json: &str) -> Result<Self, ReplayError> {
    let entries: Vec<TilePrediction> = serde_json::from_str(json)?;
    Ok(Self::from_predictions(entries))
  }

  /// 同一分块出现多次时按出现顺序合并
  pub fn from_predictions(entries: impl IntoIterator<Item = TilePrediction>) -> Self {
    let mut predictions: BTreeMap<usize, Vec<RawDetection>> = BTreeMap::new();
    for entry in entries {
      predictions
        .entry(entry.tile)
        .or_default()
        .extend(entry.detections);
    }
    Self { predictions }
  }
}

impl Model for ReplayModel {
  type Input = Tile;
  type Output = Vec<RawDetection>;
  type Error = ReplayError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let detections = self
      .predictions
      .get(&input.index)
      .cloned()
      .unwrap_or_default();
    debug!("回放第 {} 块: {} 个目标", input.index, detections.len());
    Ok(detections)
  }
}
