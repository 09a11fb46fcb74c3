// 该文件是 Guanlan （观澜） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
  draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;

use super::font::load_font_or_default;
use crate::{
  model::{Detection, Geometry},
  result::TileResult,
  tile::Tile,
};

// 文本渲染常量
pub const LABEL_FONT_SIZE: f32 = 14.0;
const LABEL_PADDING: i32 = 2;
const LINE_WIDTH: i32 = 2;

pub const POLYGON_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
pub const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色
pub const LABEL_BACKGROUND: [u8; 3] = [0, 0, 0];
pub const LABEL_TEXT_COLOR: [u8; 3] = [255, 255, 255];

pub struct Draw {
  font: FontArc,
  scale: PxScale,
  polygon_color: Rgb<u8>,
  box_color: Rgb<u8>,
  label_background: Rgb<u8>,
  label_text_color: Rgb<u8>,
}

impl Default for Draw {
  fn default() -> Self {
    Self::new(load_font_or_default(None), LABEL_FONT_SIZE)
  }
}

impl Draw {
  pub fn new(font: FontArc, font_size: f32) -> Self {
    Self {
      font,
      scale: PxScale::from(font_size),
      polygon_color: Rgb(POLYGON_COLOR),
      box_color: Rgb(BOX_COLOR),
      label_background: Rgb(LABEL_BACKGROUND),
      label_text_color: Rgb(LABEL_TEXT_COLOR),
    }
  }

  /// 按配置加载字体；找不到时回退到系统或内嵌字体
  pub fn with_font_path(font_path: Option<&Path>, font_size: f32) -> Self {
    Self::new(load_font_or_default(font_path), font_size)
  }

  /// 返回标注后的分块副本
  pub fn annotate(&self, tile: &Tile, result: &TileResult) -> RgbImage {
    let mut image = tile.image.clone();
    self.draw_detections_on_image(&mut image, result);
    image
  }

  // 闭合折线，线宽 2 像素
  fn draw_polygon(&self, image: &mut RgbImage, points: &[[f32; 2]]) {
    let bounds = canvas_bounds(image);
    for (i, start) in points.iter().enumerate() {
      let end = &points[(i + 1) % points.len()];
      if let Some((start, end)) = clip_segment((start[0], start[1]), (end[0], end[1]), bounds) {
        self.draw_thick_segment(image, start, end, self.polygon_color);
      }
    }
  }

  fn draw_thick_segment(
    &self,
    image: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    color: Rgb<u8>,
  ) {
    // 沿与线段主方向垂直的轴平移
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let (ox, oy) = if dx.abs() >= dy.abs() {
      (0.0, 1.0)
    } else {
      (1.0, 0.0)
    };
    for t in 0..LINE_WIDTH {
      let t = t as f32;
      draw_line_segment_mut(
        image,
        (start.0 + ox * t, start.1 + oy * t),
        (end.0 + ox * t, end.1 + oy * t),
        color,
      );
    }
  }

  // 矩形边框向内加粗；角点先收缩到画布附近，画布外的边不可见
  fn draw_box(&self, image: &mut RgbImage, bbox: &[f32; 4]) {
    let (width, height) = image.dimensions();
    let x_min = clamp_to_canvas(bbox[0].min(bbox[2]), width);
    let y_min = clamp_to_canvas(bbox[1].min(bbox[3]), height);
    let x_max = clamp_to_canvas(bbox[0].max(bbox[2]), width);
    let y_max = clamp_to_canvas(bbox[1].max(bbox[3]), height);

    for t in 0..LINE_WIDTH {
      let width = x_max - x_min + 1 - 2 * t;
      let height = y_max - y_min + 1 - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, self.box_color);
    }
  }

  /// 在锚点上方绘制标签；上方空间不足时放在锚点下方
  fn draw_label(&self, image: &mut RgbImage, anchor: (f32, f32), label: &str) {
    let (text_width, text_height) = text_size(self.scale, &self.font, label);
    let background_width = text_width as i32 + 2 * LABEL_PADDING;
    let background_height = text_height as i32 + LABEL_PADDING;

    // 锚点在画布外时贴边绘制
    let (width, height) = image.dimensions();
    let x = anchor.0.clamp(0.0, width.saturating_sub(1) as f32).round() as i32;
    let y = anchor.1.clamp(0.0, height as f32).round() as i32;
    let label_y = match y.saturating_sub(background_height) {
      above if above >= 0 => above,
      _ => y,
    };

    let rect = Rect::at(x, label_y).of_size(background_width as u32, background_height as u32);
    draw_filled_rect_mut(image, rect, self.label_background);

    draw_text_mut(
      image,
      self.label_text_color,
      x.saturating_add(LABEL_PADDING),
      label_y.saturating_add(1),
      self.scale,
      &self.font,
      label,
    );
  }

  fn draw_detection(&self, image: &mut RgbImage, detection: &Detection) {
    match &detection.geometry {
      Geometry::Polygon(points) if !points.is_empty() => self.draw_polygon(image, points),
      Geometry::Polygon(_) => return,
      Geometry::Box(bbox) => self.draw_box(image, bbox),
    }

    if let Some(anchor) = detection.geometry.anchor() {
      self.draw_label(image, anchor, &detection.class_name);
    }
  }
}

// 画布外留出的边距，越界的线段在其中截断
const CLIP_MARGIN: f64 = LINE_WIDTH as f64;

fn canvas_bounds(image: &RgbImage) -> [f64; 4] {
  let (width, height) = image.dimensions();
  [
    -CLIP_MARGIN,
    -CLIP_MARGIN,
    width as f64 + CLIP_MARGIN,
    height as f64 + CLIP_MARGIN,
  ]
}

fn clamp_to_canvas(value: f32, extent: u32) -> i32 {
  let margin = CLIP_MARGIN as f32;
  value.clamp(-margin, extent as f32 + margin).round() as i32
}

/// Liang-Barsky 裁剪；线段与区域不相交或坐标非有限值时返回 `None`
///
/// 以 f64 计算，远离画布的端点（如 3e9）裁剪后仍落在正确的像素上。
fn clip_segment(
  start: (f32, f32),
  end: (f32, f32),
  [x_min, y_min, x_max, y_max]: [f64; 4],
) -> Option<((f32, f32), (f32, f32))> {
  let (x0, y0) = (start.0 as f64, start.1 as f64);
  let (dx, dy) = (end.0 as f64 - x0, end.1 as f64 - y0);
  if ![x0, y0, dx, dy].iter().all(|v| v.is_finite()) {
    return None;
  }

  let (mut t0, mut t1) = (0.0f64, 1.0f64);
  for (p, q) in [
    (-dx, x0 - x_min),
    (dx, x_max - x0),
    (-dy, y0 - y_min),
    (dy, y_max - y0),
  ] {
    if p == 0.0 {
      if q < 0.0 {
        return None;
      }
      continue;
    }
    let r = q / p;
    if p < 0.0 {
      if r > t1 {
        return None;
      }
      t0 = t0.max(r);
    } else {
      if r < t0 {
        return None;
      }
      t1 = t1.min(r);
    }
  }

  let point = |t: f64| ((x0 + t * dx) as f32, (y0 + t * dy) as f32);
  Some((point(t0), point(t1)))
}

pub trait DrawDetectionOnImage {
  fn draw_detections_on_image(&self, image: &mut RgbImage, result: &TileResult);
}

impl DrawDetectionOnImage for Draw {
  fn draw_detections_on_image(&self, image: &mut RgbImage, result: &TileResult) {
    for detection in result.detections.iter() {
      self.draw_detection(image, detection);
    }
  }
}
