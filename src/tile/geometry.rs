// 该文件是 Guanlan （观澜） 项目的一部分。
// src/tile/geometry.rs - 全景图几何查找表
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

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// 已知的全景图几何：(宽, 高, 分块数)
const BUILTIN_GEOMETRIES: [(u32, u32, u32); 3] = [
  (31920, 1152, 28),
  (30780, 1152, 27),
  (18144, 1142, 16),
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GeometryError {
  #[error("分块数必须大于 0: {width}×{height}")]
  ZeroTiles { width: u32, height: u32 },
  #[error("分块数 {tiles} 超过宽度 {width}")]
  TooManyTiles { width: u32, tiles: u32 },
  #[error("全景图尺寸无效: {width}×{height}")]
  EmptyDimension { width: u32, height: u32 },
  #[error("宽度 {width} 不能被分块数 {tiles} 整除，将丢弃 {remainder} 列")]
  Indivisible { width: u32, tiles: u32, remainder: u32 },
  #[error("尺寸 {width}×{height} 重复定义: 分块数 {existing} 与 {conflicting} 冲突")]
  Conflict {
    width: u32,
    height: u32,
    existing: u32,
    conflicting: u32,
  },
}

/// 一种全景图尺寸及其分块数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanoramaGeometry {
  pub width: u32,
  pub height: u32,
  #[serde(rename = "tiles")]
  pub tile_count: u32,
}

impl PanoramaGeometry {
  pub fn new(width: u32, height: u32, tile_count: u32) -> Self {
    Self {
      width,
      height,
      tile_count,
    }
  }

  /// 单块宽度（整除）
  pub fn tile_width(&self) -> u32 {
    self.width / self.tile_count
  }

  /// 所有分块覆盖的列数，即 `tile_count * tile_width`
  pub fn covered_width(&self) -> u32 {
    self.tile_count * self.tile_width()
  }

  /// 不会被任何分块覆盖的尾部列数
  pub fn remainder(&self) -> u32 {
    self.width - self.covered_width()
  }

  pub fn is_exact(&self) -> bool {
    self.remainder() == 0
  }

  /// 校验单个条目；`require_exact` 为真时拒绝无法整除的宽度
  pub fn validate(&self, require_exact: bool) -> Result<(), GeometryError> {
    if self.width == 0 || self.height == 0 {
      return Err(GeometryError::EmptyDimension {
        width: self.width,
        height: self.height,
      });
    }
    if self.tile_count == 0 {
      return Err(GeometryError::ZeroTiles {
        width: self.width,
        height: self.height,
      });
    }
    if self.tile_count > self.width {
      return Err(GeometryError::TooManyTiles {
        width: self.width,
        tiles: self.tile_count,
      });
    }
    if !self.is_exact() {
      if require_exact {
        return Err(GeometryError::Indivisible {
          width: self.width,
          tiles: self.tile_count,
          remainder: self.remainder(),
        });
      }
      warn!(
        "全景图 {}×{} 按 {} 块切分时尾部 {} 列不会被处理",
        self.width,
        self.height,
        self.tile_count,
        self.remainder()
      );
    }
    Ok(())
  }
}

/// 不可变的 (宽, 高) → 几何 查找表，构造后传入分块器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryTable {
  entries: BTreeMap<(u32, u32), PanoramaGeometry>,
}

impl Default for GeometryTable {
  fn default() -> Self {
    let entries = BUILTIN_GEOMETRIES
      .iter()
      .map(|&(w, h, n)| ((w, h), PanoramaGeometry::new(w, h, n)))
      .collect();
    Self { entries }
  }
}

impl GeometryTable {
  pub fn new(
    entries: impl IntoIterator<Item = PanoramaGeometry>,
    require_exact: bool,
  ) -> Result<Self, GeometryError> {
    let mut table = Self {
      entries: BTreeMap::new(),
    };
    table.extend(entries, require_exact)?;
    Ok(table)
  }

  /// 在内置表基础上追加条目；与内置条目同尺寸的新条目会覆盖内置值
  ///
  /// 追加的条目之间仍不允许冲突。
  pub fn with_builtin(
    extra: impl IntoIterator<Item = PanoramaGeometry>,
    require_exact: bool,
  ) -> Result<Self, GeometryError> {
    let extra = Self::new(extra, require_exact)?;
    let mut table = Self::default();
    if require_exact {
      for geometry in table.entries.values() {
        geometry.validate(true)?;
      }
    }
    table.entries.extend(extra.entries);
    Ok(table)
  }

  fn extend(
    &mut self,
    entries: impl IntoIterator<Item = PanoramaGeometry>,
    require_exact: bool,
  ) -> Result<(), GeometryError> {
    for geometry in entries {
      geometry.validate(require_exact)?;
      let key = (geometry.width, geometry.height);
      if let Some(existing) = self.entries.get(&key)
        && existing.tile_count != geometry.tile_count
      {
        return Err(GeometryError::Conflict {
          width: geometry.width,
          height: geometry.height,
          existing: existing.tile_count,
          conflicting: geometry.tile_count,
        });
      }
      self.entries.insert(key, geometry);
    }
    Ok(())
  }

  pub fn lookup(&self, width: u32, height: u32) -> Option<&PanoramaGeometry> {
    self.entries.get(&(width, height))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &PanoramaGeometry> {
    self.entries.values()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_builtin_entries_are_exact() {
    let table = GeometryTable::default();
    assert_eq!(table.len(), 3);
    for geometry in table.iter() {
      assert!(geometry.is_exact(), "{:?}", geometry);
      assert_eq!(geometry.validate(true), Ok(()));
    }
  }

  #[test]
  fn test_largest_panorama_geometry() {
    let table = GeometryTable::default();
    let geometry = table.lookup(31920, 1152).unwrap();
    assert_eq!(geometry.tile_count, 28);
    assert_eq!(geometry.tile_width(), 1140);
    assert_eq!(geometry.remainder(), 0);
  }

  #[test]
  fn test_lookup_is_keyed_by_width_then_height() {
    let table = GeometryTable::default();
    assert!(table.lookup(1152, 31920).is_none());
  }

  #[test]
  fn test_remainder_columns() {
    let geometry = PanoramaGeometry::new(103, 10, 4);
    assert_eq!(geometry.tile_width(), 25);
    assert_eq!(geometry.covered_width(), 100);
    assert_eq!(geometry.remainder(), 3);
    assert!(!geometry.is_exact());
  }

  #[test]
  fn test_validation_rejects_bad_entries() {
    assert_eq!(
      PanoramaGeometry::new(100, 10, 0).validate(false),
      Err(GeometryError::ZeroTiles {
        width: 100,
        height: 10
      })
    );
    assert_eq!(
      PanoramaGeometry::new(3, 10, 4).validate(false),
      Err(GeometryError::TooManyTiles { width: 3, tiles: 4 })
    );
    assert_eq!(
      PanoramaGeometry::new(0, 10, 1).validate(false),
      Err(GeometryError::EmptyDimension {
        width: 0,
        height: 10
      })
    );
  }

  #[test]
  fn test_indivisible_only_rejected_when_exact_required() {
    let geometry = PanoramaGeometry::new(103, 10, 4);
    assert_eq!(geometry.validate(false), Ok(()));
    assert_eq!(
      geometry.validate(true),
      Err(GeometryError::Indivisible {
        width: 103,
        tiles: 4,
        remainder: 3
      })
    );
    assert!(GeometryTable::new([geometry], true).is_err());
    assert!(GeometryTable::new([geometry], false).is_ok());
  }

  #[test]
  fn test_conflicting_duplicates_rejected() {
    let result = GeometryTable::new(
      [
        PanoramaGeometry::new(100, 10, 4),
        PanoramaGeometry::new(100, 10, 5),
      ],
      false,
    );
    assert_eq!(
      result,
      Err(GeometryError::Conflict {
        width: 100,
        height: 10,
        existing: 4,
        conflicting: 5
      })
    );
  }

  #[test]
  fn test_with_builtin_overrides() {
    let table =
      GeometryTable::with_builtin([PanoramaGeometry::new(18144, 1142, 8)], false).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.lookup(18144, 1142).unwrap().tile_count, 8);
  }

  #[test]
  fn test_with_builtin_rejects_conflicting_extra_entries() {
    let result = GeometryTable::with_builtin(
      [
        PanoramaGeometry::new(2400, 600, 4),
        PanoramaGeometry::new(2400, 600, 6),
      ],
      false,
    );
    assert_eq!(
      result,
      Err(GeometryError::Conflict {
        width: 2400,
        height: 600,
        existing: 4,
        conflicting: 6
      })
    );

    // 重复但一致的条目可以接受
    let table = GeometryTable::with_builtin(
      [
        PanoramaGeometry::new(2400, 600, 4),
        PanoramaGeometry::new(2400, 600, 4),
      ],
      false,
    )
    .unwrap();
    assert_eq!(table.len(), 4);
  }
}
