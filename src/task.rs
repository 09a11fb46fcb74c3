// 该文件是 Guanlan （观澜） 项目的一部分。
// src/task.rs - 单张与批量任务
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

use anyhow::Context;
use tracing::{error, info, warn};

use crate::{
  input::Panorama,
  model::TileModel,
  output::Render,
  pipeline::{PanoramaOutcome, Pipeline},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, pipeline: Pipeline<M>, output: O) -> Result<TaskSummary, Self::Error>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
  pub processed: usize,
  pub failed: usize,
  pub detections: usize,
}

fn process_one<M, O>(pipeline: &Pipeline<M>, output: &O, panorama: &Panorama) -> anyhow::Result<usize>
where
  M: TileModel + Sync,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render<Panorama, PanoramaOutcome>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  let outcome = pipeline
    .run(panorama)
    .with_context(|| format!("处理 {} 失败", panorama.name))?;
  output
    .render_result(panorama, &outcome)
    .with_context(|| format!("输出 {} 失败", panorama.name))?;
  Ok(outcome.result.detection_count())
}

pub struct OneShotTask;

impl<I, IE, M, O, RE> Task<I, M, O> for OneShotTask
where
  IE: std::error::Error + Send + Sync + 'static,
  I: Iterator<Item = Result<Panorama, IE>>,
  M: TileModel + Sync,
  M::Error: std::error::Error + Send + Sync + 'static,
  RE: std::error::Error + Send + Sync + 'static,
  O: Render<Panorama, PanoramaOutcome, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    pipeline: Pipeline<M>,
    output: O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let panorama = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))??;
    info!("输入图像 {} 读取成功，开始检测...", panorama.name);

    let now = Instant::now();
    let detections = process_one(&pipeline, &output, &panorama)?;
    info!("处理完成，耗时: {:.2?}", now.elapsed());

    Ok(TaskSummary {
      processed: 1,
      failed: 0,
      detections,
    })
  }
}

/// 依次处理输入中的每幅全景图
#[derive(Default, Debug)]
pub struct BatchTask {
  keep_going: bool,
}

impl BatchTask {
  /// 为真时记录失败并继续处理下一幅，否则在第一个失败处终止
  pub fn with_keep_going(mut self, keep_going: bool) -> Self {
    self.keep_going = keep_going;
    self
  }
}

impl<I, IE, M, O, RE> Task<I, M, O> for BatchTask
where
  IE: std::error::Error + Send + Sync + 'static,
  I: Iterator<Item = Result<Panorama, IE>>,
  M: TileModel + Sync,
  M::Error: std::error::Error + Send + Sync + 'static,
  RE: std::error::Error + Send + Sync + 'static,
  O: Render<Panorama, PanoramaOutcome, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, pipeline: Pipeline<M>, output: O) -> Result<TaskSummary, Self::Error> {
    info!("开始批量任务...");
    let mut summary = TaskSummary::default();
    let now = Instant::now();

    for (index, item) in input.enumerate() {
      let result = item
        .map_err(anyhow::Error::from)
        .and_then(|panorama| process_one(&pipeline, &output, &panorama));

      match result {
        Ok(detections) => {
          summary.processed += 1;
          summary.detections += detections;
        }
        Err(e) if self.keep_going => {
          error!("第 {} 个输入失败，跳过: {:#}", index + 1, e);
          summary.failed += 1;
        }
        Err(e) => return Err(e),
      }
    }

    if summary.processed + summary.failed == 0 {
      warn!("输入为空，没有处理任何图像");
    }
    info!(
      "批量任务完成: 成功 {}，失败 {}，缺陷 {}，耗时: {:.2?}",
      summary.processed,
      summary.failed,
      summary.detections,
      now.elapsed()
    );
    Ok(summary)
  }
}
