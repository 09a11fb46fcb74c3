// 该文件是 Guanlan （观澜） 项目的一部分。
// src/utils.rs - URL 辅助函数
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

use url::Url;

/// 取出 URL 中的文件系统路径，并做百分号解码
///
/// 全景图文件名常含空格或非 ASCII 字符，`Url::path()` 返回的是编码后的形式。
pub fn url_file_path(url: &Url) -> PathBuf {
  let raw = url.path();
  match urlencoding::decode(raw) {
    Ok(decoded) => PathBuf::from(decoded.into_owned()),
    Err(_) => PathBuf::from(raw),
  }
}

/// 查询参数是否存在（不关心取值）
pub fn has_query_flag(url: &Url, key: &str) -> bool {
  url.query_pairs().any(|(k, _)| k == key)
}

/// 读取查询参数的取值
pub fn query_value(url: &Url, key: &str) -> Option<String> {
  url
    .query_pairs()
    .find(|(k, _)| k == key)
    .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_url_file_path_decodes_percent_escapes() {
    let url = Url::parse("image:///data/pano%20one/%D0%BF%D0%B0%D0%BD%D0%BE.jpg").unwrap();
    assert_eq!(url_file_path(&url), PathBuf::from("/data/pano one/пано.jpg"));
  }

  #[test]
  fn test_query_helpers() {
    let url = Url::parse("folder:///out?report&prefix=done_").unwrap();
    assert!(has_query_flag(&url, "report"));
    assert!(!has_query_flag(&url, "always"));
    assert_eq!(query_value(&url, "prefix").as_deref(), Some("done_"));
    assert_eq!(query_value(&url, "missing"), None);
  }
}
