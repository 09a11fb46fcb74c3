// 该文件是 Guanlan （观澜） 项目的一部分。
// src/model/detector.rs - 缺陷检测适配器
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

use thiserror::Error;
use tracing::debug;

use super::{ClassNames, Detection, Geometry, RawDetection, TileModel};
use crate::{result::TileResult, tile::Tile};

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("第 {tile_index} 块检测失败: {source}")]
  DetectionFailure {
    tile_index: usize,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl DetectError {
  pub fn tile_index(&self) -> usize {
    match self {
      DetectError::DetectionFailure { tile_index, .. } => *tile_index,
    }
  }
}

/// 持有模型与类别表，把模型原始输出转换为 [`TileResult`]
pub struct DefectDetector<M> {
  model: M,
  names: ClassNames,
}

impl<M> DefectDetector<M> {
  pub fn new(model: M, names: ClassNames) -> Self {
    Self { model, names }
  }

  pub fn model(&self) -> &M {
    &self.model
  }

  pub fn names(&self) -> &ClassNames {
    &self.names
  }

  /// 单个原始目标的归一化；掩码存在且首环非空时使用多边形
  pub fn normalize(&self, raw: RawDetection) -> Detection {
    let RawDetection {
      class_id,
      confidence,
      bbox,
      mask,
    } = raw;

    let geometry = match mask.and_then(|rings| rings.into_iter().next()) {
      Some(ring) if !ring.is_empty() => Geometry::Polygon(ring),
      _ => Geometry::Box(bbox),
    };

    Detection {
      class_id,
      class_name: self.names.name_of(class_id).into_owned(),
      confidence,
      geometry,
    }
  }
}

impl<M> DefectDetector<M>
where
  M: TileModel,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  /// 对单个分块推理并过滤低于阈值的目标
  pub fn detect(&self, tile: &Tile, confidence_threshold: f32) -> Result<TileResult, DetectError> {
    let raw = self
      .model
      .infer(tile)
      .map_err(|e| DetectError::DetectionFailure {
        tile_index: tile.index,
        source: Box::new(e),
      })?;
    let total = raw.len();

    // NaN 置信度也被丢弃
    let detections: Vec<Detection> = raw
      .into_iter()
      .filter(|d| d.confidence >= confidence_threshold)
      .map(|d| self.normalize(d))
      .collect();

    debug!(
      "第 {} 块: 模型输出 {} 个目标，保留 {} 个",
      tile.index,
      total,
      detections.len()
    );

    Ok(TileResult::new(detections))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Model;
  use crate::result::TileStatus;
  use image::RgbImage;

  struct Canned(Vec<RawDetection>);

  impl Model for Canned {
    type Input = Tile;
    type Output = Vec<RawDetection>;
    type Error = std::io::Error;

    fn infer(&self, _input: &Tile) -> Result<Vec<RawDetection>, std::io::Error> {
      Ok(self.0.clone())
    }
  }

  struct Broken;

  impl Model for Broken {
    type Input = Tile;
    type Output = Vec<RawDetection>;
    type Error = std::io::Error;

    fn infer(&self, _input: &Tile) -> Result<Vec<RawDetection>, std::io::Error> {
      Err(std::io::Error::other("npu timeout"))
    }
  }

  fn raw(class_id: u32, confidence: f32) -> RawDetection {
    RawDetection {
      class_id,
      confidence,
      bbox: [1.0, 2.0, 10.0, 20.0],
      mask: None,
    }
  }

  fn tile(index: usize) -> Tile {
    Tile {
      index,
      image: RgbImage::new(16, 16),
    }
  }

  fn names() -> ClassNames {
    ClassNames::from_yaml("names: {0: crack, 1: dent}").unwrap()
  }

  #[test]
  fn test_below_threshold_is_no_defects() {
    let detector = DefectDetector::new(Canned(vec![raw(0, 0.10)]), names());
    let result = detector.detect(&tile(0), 0.15).unwrap();
    assert_eq!(result.status, TileStatus::NoDefects);
    assert!(result.detections.is_empty());
  }

  #[test]
  fn test_threshold_is_inclusive_and_order_kept() {
    let detector = DefectDetector::new(
      Canned(vec![
        raw(1, 0.9),
        raw(0, 0.149),
        raw(0, 0.15),
        raw(7, 0.5),
        raw(0, f32::NAN),
      ]),
      names(),
    );
    let result = detector.detect(&tile(3), 0.15).unwrap();
    assert_eq!(result.status, TileStatus::Success);

    let kept: Vec<_> = result
      .detections
      .iter()
      .map(|d| (d.class_name.as_str(), d.confidence))
      .collect();
    assert_eq!(kept, vec![("dent", 0.9), ("crack", 0.15), ("7", 0.5)]);
  }

  #[test]
  fn test_mask_uses_first_ring() {
    let mut detection = raw(0, 0.8);
    detection.mask = Some(vec![
      vec![[1.0, 1.0], [5.0, 1.0], [5.0, 5.0]],
      vec![[9.0, 9.0], [12.0, 9.0]],
    ]);
    let detector = DefectDetector::new(Canned(vec![detection]), names());
    let result = detector.detect(&tile(0), 0.15).unwrap();
    assert_eq!(
      result.detections[0].geometry,
      Geometry::Polygon(vec![[1.0, 1.0], [5.0, 1.0], [5.0, 5.0]])
    );
  }

  #[test]
  fn test_empty_mask_falls_back_to_box() {
    let mut detection = raw(0, 0.8);
    detection.mask = Some(vec![vec![]]);
    let detector = DefectDetector::new(Canned(vec![detection]), names());
    let result = detector.detect(&tile(0), 0.15).unwrap();
    assert_eq!(
      result.detections[0].geometry,
      Geometry::Box([1.0, 2.0, 10.0, 20.0])
    );
  }

  #[test]
  fn test_detect_is_repeatable() {
    let detector = DefectDetector::new(Canned(vec![raw(0, 0.4), raw(1, 0.05)]), names());
    let first = detector.detect(&tile(1), 0.15).unwrap();
    let second = detector.detect(&tile(1), 0.15).unwrap();
    assert_eq!(first, second);
  }

  #[test]
  fn test_model_failure_carries_tile_index() {
    let detector = DefectDetector::new(Broken, names());
    let err = detector.detect(&tile(5), 0.15).unwrap_err();
    assert_eq!(err.tile_index(), 5);
    assert!(err.to_string().contains("npu timeout"));
  }
}
