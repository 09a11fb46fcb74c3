// 该文件是 Guanlan （观澜） 项目的一部分。
// src/input/read_directory.rs - 目录批量输入
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

use std::{path::Path, path::PathBuf, vec::IntoIter};

use tracing::info;
use url::Url;

use super::{InputError, Panorama};
use crate::{FromUrl, FromUrlWithScheme, utils::url_file_path};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// 目录中的全部图像文件，按文件名排序，逐个解码
pub struct DirectoryInput {
  files: IntoIter<PathBuf>,
}

impl FromUrlWithScheme for DirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(InputError::SchemeMismatch(url.scheme().to_string()));
    }
    Self::open(&url_file_path(url))
  }
}

impl DirectoryInput {
  pub fn open(directory: &Path) -> Result<Self, InputError> {
    let io_error = |e| InputError::IoError(directory.to_path_buf(), e);

    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(io_error)? {
      let path = entry.map_err(io_error)?.path();
      if path.is_file() && is_image_file(&path) {
        files.push(path);
      }
    }
    files.sort();

    info!("目录 {} 中有 {} 张图像", directory.display(), files.len());
    Ok(Self {
      files: files.into_iter(),
    })
  }
}

fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .map(|ext| ext.to_string_lossy().to_lowercase())
    .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

impl Iterator for DirectoryInput {
  type Item = Result<Panorama, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.files.next().map(|path| Panorama::open(&path))
  }
}
