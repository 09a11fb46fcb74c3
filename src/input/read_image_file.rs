// 该文件是 Guanlan （观澜） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use tracing::error;
use url::Url;

use super::{InputError, Panorama};
use crate::{FromUrl, FromUrlWithScheme, utils::url_file_path};

/// 单张全景图，构造时即完成解码
pub struct ImageFileInput {
  panorama: Option<Panorama>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch(url.scheme().to_string()));
    }

    let panorama = Panorama::open(&url_file_path(url))?;
    Ok(ImageFileInput {
      panorama: Some(panorama),
    })
  }
}

impl From<Panorama> for ImageFileInput {
  fn from(panorama: Panorama) -> Self {
    Self {
      panorama: Some(panorama),
    }
  }
}

impl Iterator for ImageFileInput {
  type Item = Result<Panorama, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.panorama.take().map(Ok)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn test_reads_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pano 1.png");
    RgbImage::from_pixel(8, 2, Rgb([9, 9, 9])).save(&path).unwrap();

    let url = Url::from_file_path(&path).unwrap();
    let url = Url::parse(&url.as_str().replacen("file:", "image:", 1)).unwrap();

    let mut input = ImageFileInput::from_url(&url).unwrap();
    let panorama = input.next().unwrap().unwrap();
    assert_eq!(panorama.name, "pano 1.png");
    assert_eq!(panorama.dimensions(), (8, 2));
    assert!(input.next().is_none());
  }
}
