// 该文件是 Guanlan （观澜） 项目的一部分。
// src/tile.rs - 全景图分块与拼接
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

use image::{RgbImage, imageops};
use thiserror::Error;
use tracing::{debug, warn};

mod geometry;
pub use self::geometry::{GeometryError, GeometryTable, PanoramaGeometry};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TileError {
  #[error("不支持的全景图尺寸: {width}×{height}")]
  UnsupportedPanoramaSize { width: u32, height: u32 },
  #[error("没有可拼接的分块")]
  NoTiles,
  #[error("第 {index} 块高度为 {actual}，与首块高度 {expected} 不一致")]
  HeightMismatch {
    index: usize,
    expected: u32,
    actual: u32,
  },
}

/// 全景图的一个竖直条带，覆盖列 `[index * width, (index + 1) * width)`
#[derive(Debug, Clone)]
pub struct Tile {
  pub index: usize,
  pub image: RgbImage,
}

impl Tile {
  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }
}

/// 按几何查找表切分全景图
#[derive(Debug, Clone, Default)]
pub struct TileSplitter {
  table: GeometryTable,
}

impl TileSplitter {
  pub fn new(table: GeometryTable) -> Self {
    Self { table }
  }

  pub fn table(&self) -> &GeometryTable {
    &self.table
  }

  /// 查找图像对应的几何；不在表中时报告实际尺寸
  pub fn geometry_of(&self, image: &RgbImage) -> Result<PanoramaGeometry, TileError> {
    let (width, height) = image.dimensions();
    self
      .table
      .lookup(width, height)
      .copied()
      .ok_or(TileError::UnsupportedPanoramaSize { width, height })
  }

  /// 切分为 `tile_count` 个等宽分块，按从左到右的顺序返回
  ///
  /// 宽度不能整除时，尾部 `width - tile_count * tile_width` 列不属于任何分块。
  pub fn split(&self, image: &RgbImage) -> Result<Vec<Tile>, TileError> {
    let geometry = self.geometry_of(image)?;
    let tile_width = geometry.tile_width();
    let height = image.height();

    debug!(
      "切分全景图 {}×{}: {} 块，每块宽 {}",
      geometry.width, geometry.height, geometry.tile_count, tile_width
    );
    if !geometry.is_exact() {
      warn!(
        "全景图宽度 {} 不能被 {} 整除，丢弃尾部 {} 列",
        geometry.width,
        geometry.tile_count,
        geometry.remainder()
      );
    }

    let tiles = (0..geometry.tile_count)
      .map(|i| Tile {
        index: i as usize,
        image: imageops::crop_imm(image, i * tile_width, 0, tile_width, height).to_image(),
      })
      .collect();

    Ok(tiles)
  }
}

/// 沿宽度方向按给定顺序拼接分块，结果宽度为各块宽度之和
pub fn join_tiles(tiles: &[RgbImage]) -> Result<RgbImage, TileError> {
  let first = tiles.first().ok_or(TileError::NoTiles)?;
  let height = first.height();

  let mut width = 0u32;
  for (index, tile) in tiles.iter().enumerate() {
    if tile.height() != height {
      return Err(TileError::HeightMismatch {
        index,
        expected: height,
        actual: tile.height(),
      });
    }
    width += tile.width();
  }

  let mut panorama = RgbImage::new(width, height);
  let mut x = 0i64;
  for tile in tiles {
    imageops::replace(&mut panorama, tile, x, 0);
    x += tile.width() as i64;
  }

  Ok(panorama)
}
