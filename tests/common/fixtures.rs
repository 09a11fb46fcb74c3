// 该文件是 Guanlan （观澜） 项目的一部分。
// tests/common/fixtures.rs - 测试用模型、全景图与流水线
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

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
  sync::atomic::{AtomicUsize, Ordering},
};

use image::{Rgb, RgbImage};
use url::Url;

use guanlan::{
  input::Panorama,
  model::{ClassNames, DefectDetector, Model, RawDetection},
  output::Draw,
  pipeline::Pipeline,
  tile::{GeometryTable, PanoramaGeometry, Tile, TileSplitter},
};

/// 测试用全景图：300×60，切成 3 块，每块 100 列
pub const WIDTH: u32 = 300;
pub const HEIGHT: u32 = 60;
pub const TILES: u32 = 3;
pub const BACKGROUND: Rgb<u8> = Rgb([128, 128, 128]);

pub fn geometry_table() -> GeometryTable {
  GeometryTable::new([PanoramaGeometry::new(WIDTH, HEIGHT, TILES)], true).unwrap()
}

pub fn names() -> ClassNames {
  ClassNames::from_yaml("names:\n  0: crack\n  1: spall\n").unwrap()
}

pub fn panorama(name: &str, width: u32, height: u32) -> Panorama {
  Panorama::new(name, RgbImage::from_pixel(width, height, BACKGROUND))
}

pub fn write_panorama(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
  let path = dir.join(name);
  RgbImage::from_pixel(width, height, BACKGROUND)
    .save(&path)
    .unwrap();
  path
}

/// 把文件路径转换为给定方案的 URL，例如 image:///tmp/x/pano.png
pub fn scheme_url(scheme: &str, path: &Path) -> Url {
  let url = Url::from_file_path(path).unwrap();
  Url::parse(&url.as_str().replacen("file:", &format!("{scheme}:"), 1)).unwrap()
}

pub fn raw_box(class_id: u32, confidence: f32, bbox: [f32; 4]) -> RawDetection {
  RawDetection {
    class_id,
    confidence,
    bbox,
    mask: None,
  }
}

#[derive(Debug, thiserror::Error)]
#[error("fake model failure on tile {0}")]
pub struct FakeFailure(pub usize);

/// 按分块下标返回预设结果，可指定一个分块报错
#[derive(Default)]
pub struct FakeModel {
  pub per_tile: BTreeMap<usize, Vec<RawDetection>>,
  pub fail_on: Option<usize>,
  pub calls: AtomicUsize,
}

impl FakeModel {
  pub fn with_tile(mut self, index: usize, detections: Vec<RawDetection>) -> Self {
    self.per_tile.insert(index, detections);
    self
  }

  pub fn failing_on(mut self, index: usize) -> Self {
    self.fail_on = Some(index);
    self
  }

  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Model for FakeModel {
  type Input = Tile;
  type Output = Vec<RawDetection>;
  type Error = FakeFailure;

  fn infer(&self, tile: &Tile) -> Result<Vec<RawDetection>, FakeFailure> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_on == Some(tile.index) {
      return Err(FakeFailure(tile.index));
    }
    Ok(self.per_tile.get(&tile.index).cloned().unwrap_or_default())
  }
}

pub fn pipeline<M>(model: M) -> Pipeline<M> {
  Pipeline::new(
    TileSplitter::new(geometry_table()),
    DefectDetector::new(model, names()),
    Draw::default(),
    0.15,
  )
}
