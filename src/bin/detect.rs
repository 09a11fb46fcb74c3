// 该文件是 Guanlan （观澜） 项目的一部分。
// src/bin/detect.rs - 全景图缺陷检测
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

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use url::Url;

use guanlan::{
  FromUrl, FromUrlWithScheme,
  config::PipelineConfig,
  input::{ImageFileInput, InputWrapper},
  model::{ClassNames, ModelWrapper},
  output::SaveImageFileOutput,
  pipeline::Pipeline,
  task::{BatchTask, OneShotTask, Task},
  utils::query_value,
};

/// Guanlan 全景图缺陷检测参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型，例如 replay:///data/predictions.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，image:///pano.jpg 或 folder:///panoramas
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出目录，例如 folder:///results?report
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 类别名称 YAML 文件（含 names 键）
  #[arg(long, value_name = "FILE")]
  pub names: Option<PathBuf>,
  /// 流水线配置 YAML 文件
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,
  /// 置信度阈值 (0.0 - 1.0)，覆盖配置文件
  #[arg(long, value_name = "THRESHOLD")]
  pub confidence: Option<f32>,
  /// 批量处理时跳过失败的全景图
  #[arg(long)]
  pub keep_going: bool,
  /// 各分块并行检测
  #[cfg(feature = "parallel")]
  #[arg(long)]
  pub parallel: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let mut config = match &args.config {
    Some(path) => PipelineConfig::load(path)
      .with_context(|| format!("无法读取配置文件 {}", path.display()))?,
    None => PipelineConfig::default(),
  };
  if let Some(confidence) = args.confidence {
    config.confidence = confidence;
  }

  let names = match (&args.names, config.class_names()) {
    (Some(path), _) => ClassNames::load(path)?,
    (None, Some(names)) => names,
    (None, None) => {
      warn!("未提供类别名称，标签将显示类别编号");
      ClassNames::default()
    }
  };
  info!("类别数: {}，置信度阈值: {}", names.len(), config.confidence);

  let model = ModelWrapper::from_url(&args.model)?;
  let input = InputWrapper::from_url(&args.input)?;
  let mut output = SaveImageFileOutput::from_url(&args.output)?;
  if query_value(&args.output, "prefix").is_none() {
    output = output.with_prefix(config.output_prefix.clone());
  }

  let pipeline = Pipeline::from_config(&config, model, names)?;
  #[cfg(feature = "parallel")]
  let pipeline = pipeline.with_parallel(args.parallel);

  let summary = if args.input.scheme() == ImageFileInput::SCHEME {
    OneShotTask.run_task(input, pipeline, output)?
  } else {
    BatchTask::default()
      .with_keep_going(args.keep_going)
      .run_task(input, pipeline, output)?
  };

  info!(
    "完成: 成功 {}，失败 {}，缺陷 {}",
    summary.processed, summary.failed, summary.detections
  );
  if summary.failed > 0 {
    anyhow::bail!("{} 幅全景图处理失败", summary.failed);
  }
  Ok(())
}
