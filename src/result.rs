// 该文件是 Guanlan （观澜） 项目的一部分。
// src/result.rs - 检测结果汇总
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

use serde::{Deserialize, Serialize};

use crate::model::{Detection, Geometry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileStatus {
  Success,
  NoDefects,
}

impl TileStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      TileStatus::Success => "success",
      TileStatus::NoDefects => "no_defects",
    }
  }
}

impl std::fmt::Display for TileStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 单个分块的检测结果，保持模型输出顺序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileResult {
  pub status: TileStatus,
  pub detections: Vec<Detection>,
}

impl TileResult {
  pub fn new(detections: Vec<Detection>) -> Self {
    let status = if detections.is_empty() {
      TileStatus::NoDefects
    } else {
      TileStatus::Success
    };
    Self { status, detections }
  }

  pub fn empty() -> Self {
    Self::new(Vec::new())
  }
}

/// 整幅全景图的结果，下标与分块下标一一对应
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PanoramaResult {
  pub tiles: Vec<TileResult>,
}

/// 按分块顺序汇总，不做跨块去重或合并
pub fn aggregate(tiles: Vec<TileResult>) -> PanoramaResult {
  PanoramaResult { tiles }
}

impl PanoramaResult {
  pub fn tile_count(&self) -> usize {
    self.tiles.len()
  }

  pub fn has_defects(&self) -> bool {
    self.tiles.iter().any(|t| t.status == TileStatus::Success)
  }

  pub fn status(&self) -> TileStatus {
    if self.has_defects() {
      TileStatus::Success
    } else {
      TileStatus::NoDefects
    }
  }

  pub fn detection_count(&self) -> usize {
    self.tiles.iter().map(|t| t.detections.len()).sum()
  }

  /// 展开为 (分块下标, 检测) 序列
  pub fn flatten(&self) -> impl Iterator<Item = (usize, &Detection)> {
    self
      .tiles
      .iter()
      .enumerate()
      .flat_map(|(i, t)| t.detections.iter().map(move |d| (i, d)))
  }

  pub fn to_report(&self, source: &str) -> PanoramaReport {
    PanoramaReport {
      source: source.to_string(),
      status: self.status(),
      has_defects: self.has_defects(),
      tile_count: self.tile_count(),
      processed_at: chrono::Utc::now().to_rfc3339(),
      tiles: self.tiles.iter().map(TileReport::from).collect(),
      defects: self
        .flatten()
        .map(|(tile, d)| LocatedDefectReport {
          tile,
          class_name: d.class_name.clone(),
          confidence: format_confidence(d.confidence),
          geometry: d.geometry.clone(),
        })
        .collect(),
    }
  }
}

/// 置信度转为两位小数的百分比字符串，例如 `0.8765` → `"87.65%"`
pub fn format_confidence(confidence: f32) -> String {
  format!("{:.2}%", confidence as f64 * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectReport {
  #[serde(rename = "class")]
  pub class_name: String,
  pub confidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileReport {
  pub status: TileStatus,
  pub defects: Vec<DefectReport>,
}

impl From<&TileResult> for TileReport {
  fn from(result: &TileResult) -> Self {
    Self {
      status: result.status,
      defects: result
        .detections
        .iter()
        .map(|d| DefectReport {
          class_name: d.class_name.clone(),
          confidence: format_confidence(d.confidence),
        })
        .collect(),
    }
  }
}

/// 全景图范围内的一个缺陷，坐标仍为所在分块的像素坐标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedDefectReport {
  pub tile: usize,
  #[serde(rename = "class")]
  pub class_name: String,
  pub confidence: String,
  pub geometry: Geometry,
}

/// 对外输出的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanoramaReport {
  pub source: String,
  pub status: TileStatus,
  pub has_defects: bool,
  pub tile_count: usize,
  pub processed_at: String,
  pub tiles: Vec<TileReport>,
  /// 按分块顺序展开的全部缺陷
  pub defects: Vec<LocatedDefectReport>,
}
