// 该文件是 Guanlan （观澜） 项目的一部分。
// src/input.rs - 全景图输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::debug;

use crate::{FromUrl, FromUrlWithScheme};

mod read_directory;
mod read_image_file;

pub use self::read_directory::DirectoryInput;
pub use self::read_image_file::ImageFileInput;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("无法解码图像 {name}: {source}")]
  ImageDecodeFailure {
    name: String,
    #[source]
    source: image::ImageError,
  },
  #[error("I/O 错误 {0}: {1}")]
  IoError(PathBuf, std::io::Error),
  #[error("路径没有文件名: {0}")]
  NoFileName(PathBuf),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 已解码的全景图及其原始文件名
#[derive(Debug, Clone)]
pub struct Panorama {
  pub name: String,
  pub image: RgbImage,
}

impl Panorama {
  pub fn new(name: impl Into<String>, image: RgbImage) -> Self {
    Self {
      name: name.into(),
      image,
    }
  }

  /// 从文件读取并解码，格式按内容猜测
  pub fn open(path: &Path) -> Result<Self, InputError> {
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .ok_or_else(|| InputError::NoFileName(path.to_path_buf()))?;

    let image = ImageReader::open(path)
      .and_then(|reader| reader.with_guessed_format())
      .map_err(|e| InputError::IoError(path.to_path_buf(), e))?
      .decode()
      .map_err(|source| InputError::ImageDecodeFailure {
        name: name.clone(),
        source,
      })?
      .to_rgb8();

    debug!("读取全景图 {}: {}×{}", name, image.width(), image.height());
    Ok(Self { name, image })
  }

  /// 解码内存中的图像数据，例如上传的文件内容
  pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, InputError> {
    let name = name.into();
    let image = image::load_from_memory(bytes)
      .map_err(|source| InputError::ImageDecodeFailure {
        name: name.clone(),
        source,
      })?
      .to_rgb8();
    Ok(Self { name, image })
  }

  pub fn dimensions(&self) -> (u32, u32) {
    self.image.dimensions()
  }
}

pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
  ReadDirectory(DirectoryInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ImageFileInput::SCHEME => Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?)),
      DirectoryInput::SCHEME => Ok(InputWrapper::ReadDirectory(DirectoryInput::from_url(url)?)),
      other => Err(InputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = Result<Panorama, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ReadImageFile(input) => input.next(),
      InputWrapper::ReadDirectory(input) => input.next(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn test_from_bytes_decodes_png() {
    let image = RgbImage::from_pixel(6, 3, Rgb([1, 2, 3]));
    let mut bytes = Vec::new();
    image
      .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
      .unwrap();

    let panorama = Panorama::from_bytes("upload.png", &bytes).unwrap();
    assert_eq!(panorama.name, "upload.png");
    assert_eq!(panorama.dimensions(), (6, 3));
    assert_eq!(*panorama.image.get_pixel(5, 2), Rgb([1, 2, 3]));
  }

  #[test]
  fn test_from_bytes_rejects_garbage() {
    let err = Panorama::from_bytes("upload.jpg", b"definitely not an image").unwrap_err();
    assert!(matches!(err, InputError::ImageDecodeFailure { ref name, .. } if name == "upload.jpg"));
  }

  #[test]
  fn test_open_missing_file_is_io_error() {
    let err = Panorama::open(Path::new("/nonexistent/pano.jpg")).unwrap_err();
    assert!(matches!(err, InputError::IoError(_, _)));
  }

  #[test]
  fn test_wrapper_rejects_unknown_scheme() {
    let url = url::Url::parse("rtsp://camera/stream").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&url),
      Err(InputError::SchemeMismatch(s)) if s == "rtsp"
    ));
  }
}
