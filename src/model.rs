// 该文件是 Guanlan （观澜） 项目的一部分。
// src/model.rs - 模型
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
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, tile::Tile};

/// 推理模型：对单个输入做一次同步推理
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 模型原始输出中的一个目标，坐标为分块像素坐标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
  pub class_id: u32,
  pub confidence: f32,
  pub bbox: [f32; 4], // [x1, y1, x2, y2]
  /// 分割掩码轮廓，可能包含多个环，只使用第一个
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mask: Option<Vec<Vec<[f32; 2]>>>,
}

/// 检测区域：轴对齐矩形或多边形轮廓
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "points")]
pub enum Geometry {
  Box([f32; 4]),
  Polygon(Vec<[f32; 2]>),
}

impl Geometry {
  /// 标签锚点：多边形首点或矩形左上角
  pub fn anchor(&self) -> Option<(f32, f32)> {
    match self {
      Geometry::Box([x1, y1, _, _]) => Some((*x1, *y1)),
      Geometry::Polygon(points) => points.first().map(|[x, y]| (*x, *y)),
    }
  }
}

/// 归一化后的检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub class_id: u32,
  pub class_name: String,
  pub confidence: f32,
  pub geometry: Geometry,
}

mod detector;
mod labels;
mod replay;

pub use self::detector::{DefectDetector, DetectError};
pub use self::labels::{ClassNames, LabelError, NamesField};
pub use self::replay::{ReplayError, ReplayModel};

/// 推理模型的输入输出约定
pub trait TileModel: Model<Input = Tile, Output = Vec<RawDetection>> {}

impl<M: Model<Input = Tile, Output = Vec<RawDetection>>> TileModel for M {}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("回放模型错误: {0}")]
  ReplayError(#[from] ReplayError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 根据 URL 方案选择的模型
pub enum ModelWrapper {
  Replay(ReplayModel),
}

impl FromUrl for ModelWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ReplayModel::SCHEME => Ok(ModelWrapper::Replay(ReplayModel::from_url(url)?)),
      other => Err(ModelError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Model for ModelWrapper {
  type Input = Tile;
  type Output = Vec<RawDetection>;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    match self {
      ModelWrapper::Replay(model) => model.infer(input).map_err(ModelError::from),
    }
  }
}
