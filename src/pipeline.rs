// 该文件是 Guanlan （观澜） 项目的一部分。
// src/pipeline.rs - 分块、检测、汇总与标注流水线
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

use std::time::Instant;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  config::{ConfigError, PipelineConfig},
  input::{InputError, Panorama},
  model::{ClassNames, DefectDetector, DetectError, TileModel},
  output::Draw,
  result::{PanoramaResult, aggregate},
  tile::{Tile, TileError, TileSplitter, join_tiles},
};

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error(transparent)]
  Tile(#[from] TileError),
  #[error(transparent)]
  Input(#[from] InputError),
  #[error(transparent)]
  Detect(#[from] DetectError),
}

/// 一幅全景图的处理结果
#[derive(Debug, Clone)]
pub struct PanoramaOutcome {
  pub result: PanoramaResult,
  /// 重新拼接的标注图像，宽度为各分块宽度之和
  pub annotated: RgbImage,
}

pub struct Pipeline<M> {
  splitter: TileSplitter,
  detector: DefectDetector<M>,
  draw: Draw,
  confidence: f32,
  parallel: bool,
}

impl<M> Pipeline<M> {
  pub fn new(
    splitter: TileSplitter,
    detector: DefectDetector<M>,
    draw: Draw,
    confidence: f32,
  ) -> Self {
    Self {
      splitter,
      detector,
      draw,
      confidence,
      parallel: false,
    }
  }

  /// 仅在启用 `parallel` 特性时生效
  pub fn with_parallel(mut self, parallel: bool) -> Self {
    self.parallel = parallel;
    self
  }

  pub fn is_parallel(&self) -> bool {
    self.parallel
  }

  pub fn from_config(
    config: &PipelineConfig,
    model: M,
    names: ClassNames,
  ) -> Result<Self, ConfigError> {
    config.validate()?;
    Ok(Self::new(
      TileSplitter::new(config.geometry_table()?),
      DefectDetector::new(model, names),
      Draw::with_font_path(config.font.path.as_deref(), config.font.size),
      config.confidence,
    ))
  }

  pub fn confidence(&self) -> f32 {
    self.confidence
  }

  pub fn splitter(&self) -> &TileSplitter {
    &self.splitter
  }

  pub fn detector(&self) -> &DefectDetector<M> {
    &self.detector
  }

  fn annotate_and_join(
    &self,
    tiles: &[Tile],
    result: &PanoramaResult,
  ) -> Result<RgbImage, TileError> {
    let annotated: Vec<RgbImage> = tiles
      .iter()
      .zip(result.tiles.iter())
      .map(|(tile, tile_result)| self.draw.annotate(tile, tile_result))
      .collect();
    join_tiles(&annotated)
  }
}

impl<M> Pipeline<M>
where
  M: TileModel,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  /// 逐块检测，第一个失败的分块终止整幅全景图
  pub fn detect_tiles(&self, tiles: &[Tile]) -> Result<PanoramaResult, DetectError> {
    let mut results = Vec::with_capacity(tiles.len());
    for tile in tiles {
      let now = Instant::now();
      let result = self.detector.detect(tile, self.confidence)?;
      debug!(
        "第 {} 块检测完成，{} 个缺陷，耗时: {:.2?}",
        tile.index,
        result.detections.len(),
        now.elapsed()
      );
      results.push(result);
    }
    Ok(aggregate(results))
  }

  pub fn process(&self, panorama: &Panorama) -> Result<PanoramaOutcome, PipelineError> {
    let now = Instant::now();
    let tiles = self.splitter.split(&panorama.image)?;
    info!("{}: 切分为 {} 块", panorama.name, tiles.len());

    let result = self.detect_tiles(&tiles)?;
    let annotated = self.annotate_and_join(&tiles, &result)?;

    info!(
      "{}: 检测到 {} 个缺陷，耗时: {:.2?}",
      panorama.name,
      result.detection_count(),
      now.elapsed()
    );
    Ok(PanoramaOutcome { result, annotated })
  }

  /// 先解码再处理；解码失败时不会进行任何分块
  pub fn process_bytes(
    &self,
    name: &str,
    bytes: &[u8],
  ) -> Result<(Panorama, PanoramaOutcome), PipelineError> {
    let panorama = Panorama::from_bytes(name, bytes)?;
    let outcome = self.process(&panorama)?;
    Ok((panorama, outcome))
  }
}

impl<M> Pipeline<M>
where
  M: TileModel + Sync,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  /// 按 `with_parallel` 的设置选择顺序或并行处理
  pub fn run(&self, panorama: &Panorama) -> Result<PanoramaOutcome, PipelineError> {
    #[cfg(feature = "parallel")]
    {
      if self.parallel {
        return self.process_parallel(panorama);
      }
    }
    self.process(panorama)
  }

  /// 各分块并行检测与标注，结果仍按分块下标排列
  #[cfg(feature = "parallel")]
  pub fn process_parallel(&self, panorama: &Panorama) -> Result<PanoramaOutcome, PipelineError> {
    use rayon::prelude::*;

    let now = Instant::now();
    let tiles = self.splitter.split(&panorama.image)?;
    info!("{}: 切分为 {} 块（并行）", panorama.name, tiles.len());

    let results = tiles
      .par_iter()
      .map(|tile| self.detector.detect(tile, self.confidence))
      .collect::<Result<Vec<_>, _>>()?;
    let result = aggregate(results);

    let annotated: Vec<RgbImage> = tiles
      .par_iter()
      .zip(result.tiles.par_iter())
      .map(|(tile, tile_result)| self.draw.annotate(tile, tile_result))
      .collect();
    let annotated = join_tiles(&annotated)?;

    info!(
      "{}: 检测到 {} 个缺陷，耗时: {:.2?}",
      panorama.name,
      result.detection_count(),
      now.elapsed()
    );
    Ok(PanoramaOutcome { result, annotated })
  }
}
