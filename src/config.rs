// 该文件是 Guanlan （观澜） 项目的一部分。
// src/config.rs - 流水线配置
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

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  model::{ClassNames, NamesField},
  output::{DEFAULT_OUTPUT_PREFIX, draw::LABEL_FONT_SIZE},
  tile::{GeometryError, GeometryTable, PanoramaGeometry},
};

pub const DEFAULT_CONFIDENCE: f32 = 0.15;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("配置解析错误: {0}")]
  ParseError(#[from] serde_yaml::Error),
  #[error("置信度阈值必须在 [0, 1] 之间: {0}")]
  InvalidConfidence(f32),
  #[error("字体大小必须为正数: {0}")]
  InvalidFontSize(f32),
  #[error("几何表错误: {0}")]
  GeometryError(#[from] GeometryError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSection {
  /// 首选字体文件，缺省时查找系统字体
  pub path: Option<PathBuf>,
  pub size: f32,
}

impl Default for FontSection {
  fn default() -> Self {
    Self {
      path: None,
      size: LABEL_FONT_SIZE,
    }
  }
}

/// YAML 配置文件，所有字段均可省略
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub confidence: f32,
  pub output_prefix: String,
  pub font: FontSection,
  /// 为真时拒绝宽度不能被分块数整除的几何
  pub require_exact_tiling: bool,
  /// 追加到内置几何表，同尺寸时覆盖内置值
  pub geometries: Vec<PanoramaGeometry>,
  /// 内联的类别名称
  pub names: Option<NamesField>,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      confidence: DEFAULT_CONFIDENCE,
      output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
      font: FontSection::default(),
      require_exact_tiling: false,
      geometries: Vec::new(),
      names: None,
    }
  }
}

impl PipelineConfig {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Self::from_yaml(&contents)
  }

  pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
    let config: Self = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&self.confidence) {
      return Err(ConfigError::InvalidConfidence(self.confidence));
    }
    if !(self.font.size > 0.0) {
      return Err(ConfigError::InvalidFontSize(self.font.size));
    }
    Ok(())
  }

  pub fn geometry_table(&self) -> Result<GeometryTable, ConfigError> {
    Ok(GeometryTable::with_builtin(
      self.geometries.iter().copied(),
      self.require_exact_tiling,
    )?)
  }

  pub fn class_names(&self) -> Option<ClassNames> {
    self.names.clone().map(ClassNames::from)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_config_uses_defaults() {
    let config = PipelineConfig::from_yaml("{}").unwrap();
    assert_eq!(config.confidence, DEFAULT_CONFIDENCE);
    assert_eq!(config.output_prefix, "processed_");
    assert_eq!(config.font.size, LABEL_FONT_SIZE);
    assert!(config.class_names().is_none());
    assert_eq!(config.geometry_table().unwrap().len(), 3);
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
confidence: 0.25
output_prefix: done_
font:
  path: /opt/fonts/Arial.ttf
  size: 18
require_exact_tiling: true
geometries:
  - { width: 2400, height: 600, tiles: 4 }
names:
  0: crack
  1: spall
"#;
    let config = PipelineConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.confidence, 0.25);
    assert_eq!(config.font.path, Some(PathBuf::from("/opt/fonts/Arial.ttf")));
    assert_eq!(config.font.size, 18.0);

    let table = config.geometry_table().unwrap();
    assert_eq!(table.len(), 4);
    assert_eq!(table.lookup(2400, 600).unwrap().tile_width(), 600);

    let names = config.class_names().unwrap();
    assert_eq!(names.get(1), Some("spall"));
  }

  #[test]
  fn test_rejects_confidence_out_of_range() {
    assert!(matches!(
      PipelineConfig::from_yaml("confidence: 1.5"),
      Err(ConfigError::InvalidConfidence(_))
    ));
  }

  #[test]
  fn test_exact_tiling_rejects_indivisible_geometry() {
    let yaml = "require_exact_tiling: true\ngeometries: [{ width: 1001, height: 10, tiles: 4 }]";
    let config = PipelineConfig::from_yaml(yaml).unwrap();
    assert!(matches!(
      config.geometry_table(),
      Err(ConfigError::GeometryError(GeometryError::Indivisible { .. }))
    ));
  }
}
