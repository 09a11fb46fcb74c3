// 该文件是 Guanlan （观澜） 项目的一部分。
// src/model/labels.rs - 类别名称表
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

use std::{borrow::Cow, collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("类别文件解析错误: {0}")]
  ParseError(#[from] serde_yaml::Error),
}

/// `names` 字段的两种写法：`{0: crack}` 或 `[crack, ...]`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum NamesField {
  Map(BTreeMap<u32, String>),
  List(Vec<String>),
}

impl From<NamesField> for ClassNames {
  fn from(field: NamesField) -> Self {
    match field {
      NamesField::Map(map) => ClassNames { names: map },
      NamesField::List(list) => ClassNames {
        names: list
          .into_iter()
          .enumerate()
          .map(|(i, name)| (i as u32, name))
          .collect(),
      },
    }
  }
}

#[derive(Debug, Deserialize)]
struct DatasetFile {
  names: NamesField,
}

/// 类别 id → 名称，加载后只读
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassNames {
  names: BTreeMap<u32, String>,
}

impl ClassNames {
  pub fn new(names: BTreeMap<u32, String>) -> Self {
    Self { names }
  }

  /// 从数据集描述文件（含 `names` 字段的 YAML）加载
  pub fn load(path: &Path) -> Result<Self, LabelError> {
    let contents = std::fs::read_to_string(path)?;
    let names = Self::from_yaml(&contents)?;
    info!("从 {} 加载了 {} 个类别", path.display(), names.len());
    Ok(names)
  }

  pub fn from_yaml(yaml: &str) -> Result<Self, LabelError> {
    let file: DatasetFile = serde_yaml::from_str(yaml)?;
    Ok(file.names.into())
  }

  pub fn get(&self, class_id: u32) -> Option<&str> {
    self.names.get(&class_id).map(String::as_str)
  }

  /// 未知 id 使用其十进制形式
  pub fn name_of(&self, class_id: u32) -> Cow<'_, str> {
    match self.get(class_id) {
      Some(name) => Cow::Borrowed(name),
      None => Cow::Owned(class_id.to_string()),
    }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}
