// 该文件是 Guanlan （观澜） 项目的一部分。
// src/bin/split.rs - 全景图切分，用于准备训练数据
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

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use url::Url;

use guanlan::{FromUrl, config::PipelineConfig, input::InputWrapper, tile::TileSplitter};

/// Guanlan 全景图切分参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源，image:///pano.jpg 或 folder:///panoramas
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 分块输出目录
  #[arg(long, value_name = "DIR")]
  pub output: PathBuf,
  /// 流水线配置 YAML 文件，用于扩展几何表
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,
}

fn tile_file_name(source_name: &str, index: usize) -> String {
  let stem = Path::new(source_name)
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| source_name.to_string());
  format!("{stem}_tile_{index:02}.png")
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let config = match &args.config {
    Some(path) => PipelineConfig::load(path)
      .with_context(|| format!("无法读取配置文件 {}", path.display()))?,
    None => PipelineConfig::default(),
  };
  let splitter = TileSplitter::new(config.geometry_table()?);

  std::fs::create_dir_all(&args.output)
    .with_context(|| format!("无法创建目录 {}", args.output.display()))?;

  let mut written = 0;
  for panorama in InputWrapper::from_url(&args.input)? {
    let panorama = panorama?;
    let tiles = splitter
      .split(&panorama.image)
      .with_context(|| format!("无法切分 {}", panorama.name))?;
    for tile in &tiles {
      let path = args.output.join(tile_file_name(&panorama.name, tile.index));
      tile
        .image
        .save(&path)
        .with_context(|| format!("无法写入 {}", path.display()))?;
      written += 1;
    }
    info!("{}: 写出 {} 块", panorama.name, tiles.len());
  }

  info!("共写出 {} 个分块到 {}", written, args.output.display());
  Ok(())
}
