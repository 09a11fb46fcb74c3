// 该文件是 Guanlan （观澜） 项目的一部分。
// src/output/font.rs - 标签字体查找
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

use ab_glyph::{FontArc, InvalidFont};
use thiserror::Error;
use tracing::{debug, warn};

// 常见系统中 DejaVu Sans / Arial 的位置
const SYSTEM_FONT_CANDIDATES: [&str; 7] = [
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
  "/System/Library/Fonts/Supplemental/Arial.ttf",
  "/Library/Fonts/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

#[derive(Error, Debug)]
pub(crate) enum FontLoadError {
  #[error("无法读取字体文件 {0}: {1}")]
  Io(PathBuf, std::io::Error),
  #[error("字体文件无效 {0}: {1}")]
  Invalid(PathBuf, InvalidFont),
  #[error("系统中未找到可用字体")]
  NotFound,
}

fn load_font_file(path: &Path) -> Result<FontArc, FontLoadError> {
  let data = std::fs::read(path).map_err(|e| FontLoadError::Io(path.to_path_buf(), e))?;
  FontArc::try_from_vec(data).map_err(|e| FontLoadError::Invalid(path.to_path_buf(), e))
}

fn find_system_font() -> Result<FontArc, FontLoadError> {
  for candidate in SYSTEM_FONT_CANDIDATES {
    let path = Path::new(candidate);
    if !path.exists() {
      continue;
    }
    match load_font_file(path) {
      Ok(font) => {
        debug!("使用系统字体: {}", candidate);
        return Ok(font);
      }
      Err(e) => debug!("跳过字体: {}", e),
    }
  }
  Err(FontLoadError::NotFound)
}

pub fn embedded_font() -> FontArc {
  FontArc::try_from_slice(EMBEDDED_FONT).expect("无法加载嵌入的字体文件")
}

/// 依次尝试指定字体、系统字体、内嵌字体；任何加载失败都不会向上传递
pub fn load_font_or_default(preferred: Option<&Path>) -> FontArc {
  if let Some(path) = preferred {
    match load_font_file(path) {
      Ok(font) => return font,
      Err(e) => warn!("{}，改用系统字体", e),
    }
  }

  match find_system_font() {
    Ok(font) => font,
    Err(e) => {
      warn!("{}，使用内嵌字体", e);
      embedded_font()
    }
  }
}
