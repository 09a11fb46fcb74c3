// 该文件是 Guanlan （观澜） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像与结果报告
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

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::Panorama,
  output::Render,
  pipeline::PanoramaOutcome,
  utils::{has_query_flag, query_value, url_file_path},
};

pub const DEFAULT_OUTPUT_PREFIX: &str = "processed_";

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("报告序列化错误: {0}")]
  ReportError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 把标注后的全景图写入目录，文件名为 `<前缀><原文件名>`
///
/// URL 形如 `folder:///results?report&prefix=processed_`，`report` 额外写出 JSON 报告。
#[derive(Debug, Clone)]
pub struct SaveImageFileOutput {
  directory: PathBuf,
  prefix: String,
  report: bool,
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput {
      directory: url_file_path(uri),
      prefix: query_value(uri, "prefix").unwrap_or_else(|| DEFAULT_OUTPUT_PREFIX.to_string()),
      report: has_query_flag(uri, "report"),
    })
  }
}

impl SaveImageFileOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
      report: false,
    }
  }

  pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.prefix = prefix.into();
    self
  }

  pub fn with_report(mut self, report: bool) -> Self {
    self.report = report;
    self
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  /// 标注图像的输出路径
  pub fn image_path(&self, source_name: &str) -> PathBuf {
    self.directory.join(format!("{}{}", self.prefix, source_name))
  }

  /// JSON 报告的输出路径
  pub fn report_path(&self, source_name: &str) -> PathBuf {
    let stem = Path::new(source_name)
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| source_name.to_string());
    self.directory.join(format!("{}{}.json", self.prefix, stem))
  }

  fn ensure_directory(&self) -> Result<(), SaveImageFileError> {
    if !self.directory.as_os_str().is_empty() {
      std::fs::create_dir_all(&self.directory)?;
    }
    Ok(())
  }
}

impl Render<Panorama, PanoramaOutcome> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(
    &self,
    panorama: &Panorama,
    outcome: &PanoramaOutcome,
  ) -> Result<(), Self::Error> {
    self.ensure_directory()?;

    let image_path = self.image_path(&panorama.name);
    outcome.annotated.save(&image_path)?;
    info!("保存标注图像到文件: {}", image_path.display());

    if self.report {
      let report_path = self.report_path(&panorama.name);
      let report = outcome.result.to_report(&panorama.name);
      std::fs::write(&report_path, serde_json::to_vec_pretty(&report)?)?;
      info!("保存检测报告到文件: {}", report_path.display());
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_url_defaults() {
    let url = Url::parse("folder:///srv/results").unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert_eq!(output.directory(), Path::new("/srv/results"));
    assert_eq!(
      output.image_path("pano_01.jpg"),
      PathBuf::from("/srv/results/processed_pano_01.jpg")
    );
    assert!(!output.report);
  }

  #[test]
  fn test_from_url_with_query() {
    let url = Url::parse("folder:///srv/results?report&prefix=done_").unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert!(output.report);
    assert_eq!(
      output.report_path("pano_01.jpg"),
      PathBuf::from("/srv/results/done_pano_01.json")
    );
  }

  #[test]
  fn test_scheme_mismatch() {
    let url = Url::parse("image:///srv/results").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }
}
