use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use esx_config::AnnotatorConfig;
use esx_core::project::{EntityId, FloorPlan};
use esx_engine::index::ProjectIndex;
use esx_io::ArchiveSource;
use glam::DVec2;
use image::{ImageError, ImageFormat, ImageReader, Rgba, RgbaImage};
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::glyphs::{self, GLYPH_HEIGHT, GLYPH_SPACING, GLYPH_WIDTH};
use crate::resource_locator::{OutputLayout, ensure_parent};

/// 标签距图片上边缘与左边缘的像素偏移。
const LABEL_TOP: u32 = 15;
const LABEL_LEFT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
    pub columns: u32,
    pub line_width: u32,
    pub marker_radius: u32,
    pub label_scale: u32,
    pub color: Rgba<u8>,
}

impl AnnotationStyle {
    pub fn from_config(config: &AnnotatorConfig) -> Self {
        let [r, g, b] = config.color;
        Self {
            columns: config.grid_columns.max(1),
            line_width: config.line_width.max(1),
            marker_radius: config.marker_radius,
            label_scale: config.label_scale.max(1),
            color: Rgba([r, g, b, 255]),
        }
    }
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self::from_config(&AnnotatorConfig::default())
    }
}

/// 平面图网格划分。列宽为整数像素，行高尽量接近列宽并使整幅高度被整行数覆盖。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub columns: u32,
    pub column_width: u32,
    pub rows: u32,
    pub row_height: f64,
}

impl GridLayout {
    pub fn compute(width: u32, height: u32, columns: u32) -> Self {
        let requested = columns.max(1) as f64;
        let column_width = ((width as f64 / requested).round() as u32).max(1);
        let cw = column_width as f64;

        let estimated_rows = (height as f64 / cw).round().max(1.0);
        let remainder = (height % column_width) as f64;
        let row_height = if remainder > cw / 2.0 {
            cw - ((cw - remainder) / estimated_rows).round()
        } else {
            cw + remainder / estimated_rows
        }
        .max(1.0);

        Self {
            columns: ((width as f64 / cw).round() as u32).max(1),
            column_width,
            rows: ((height as f64 / row_height).round() as u32).max(1),
            row_height,
        }
    }

    #[inline]
    pub fn column_x(&self, index: u32) -> u32 {
        index.saturating_mul(self.column_width)
    }

    #[inline]
    pub fn row_y(&self, index: u32) -> u32 {
        (index as f64 * self.row_height).round() as u32
    }
}

/// 填充矩形 `[x0, x1) × [y0, y1)`，超出图片的部分被裁剪。
fn fill_rect(image: &mut RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgba<u8>) {
    let x1 = x1.min(image.width());
    let y1 = y1.min(image.height());
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x, y, color);
        }
    }
}

fn vertical_line(image: &mut RgbaImage, x: u32, width: u32, color: Rgba<u8>) {
    let start = x.saturating_sub(width / 2);
    let height = image.height();
    fill_rect(image, start, 0, start + width, height, color);
}

fn horizontal_line(image: &mut RgbaImage, y: u32, width: u32, color: Rgba<u8>) {
    let start = y.saturating_sub(width / 2);
    let image_width = image.width();
    fill_rect(image, 0, start, image_width, start + width, color);
}

/// 以左上角 `(x, y)` 绘制点阵文本。
pub fn draw_text(image: &mut RgbaImage, text: &str, x: u32, y: u32, scale: u32, color: Rgba<u8>) {
    let advance = (GLYPH_WIDTH + GLYPH_SPACING) * scale;
    for (position, ch) in text.chars().enumerate() {
        let Some(glyph) = glyphs::glyph(ch) else {
            continue;
        };
        let origin_x = x + position as u32 * advance;
        for row in 0..GLYPH_HEIGHT {
            for col in 0..GLYPH_WIDTH {
                if glyphs::is_set(glyph, col, row) {
                    let px = origin_x + col * scale;
                    let py = y + row * scale;
                    fill_rect(image, px, py, px + scale, py + scale, color);
                }
            }
        }
    }
}

/// 绘制网格线、闭合边框以及行列标签，返回所用的网格划分。
pub fn draw_grid(image: &mut RgbaImage, style: &AnnotationStyle) -> GridLayout {
    let (width, height) = image.dimensions();
    let layout = GridLayout::compute(width, height, style.columns);
    if width == 0 || height == 0 {
        return layout;
    }

    for i in 0..=layout.columns {
        let x = layout.column_x(i);
        if x < width {
            vertical_line(image, x, style.line_width, style.color);
        }
    }
    for i in 0..=layout.rows {
        let y = layout.row_y(i);
        if y < height {
            horizontal_line(image, y, style.line_width, style.color);
        }
    }
    // 闭合右边与下边
    vertical_line(image, width - 1, style.line_width, style.color);
    horizontal_line(image, height - 1, style.line_width, style.color);

    let scale = style.label_scale;
    for i in 0..layout.columns {
        let label = glyphs::column_label(i);
        let center = layout.column_x(i) + layout.column_width / 2;
        let x = center.saturating_sub(glyphs::text_width(&label, scale) / 2);
        draw_text(image, &label, x, LABEL_TOP, scale, style.color);
    }
    for i in 0..layout.rows {
        let center = (i as f64 * layout.row_height + layout.row_height / 2.0).round() as u32;
        let y = center.saturating_sub(GLYPH_HEIGHT * scale / 2);
        draw_text(image, &i.to_string(), LABEL_LEFT, y, scale, style.color);
    }
    layout
}

/// 在 `center` 处绘制实心圆标记。
pub fn draw_marker(image: &mut RgbaImage, center: DVec2, radius: u32, color: Rgba<u8>) {
    let r = radius as f64;
    let (width, height) = image.dimensions();
    let min_x = (center.x - r).floor().max(0.0) as u32;
    let min_y = (center.y - r).floor().max(0.0) as u32;
    let max_x = ((center.x + r).ceil().max(0.0) as u32).min(width.saturating_sub(1));
    let max_y = ((center.y + r).ceil().max(0.0) as u32).min(height.saturating_sub(1));
    if width == 0 || height == 0 || min_x > max_x || min_y > max_y {
        return;
    }
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let offset = DVec2::new(x as f64, y as f64) - center;
            if offset.length_squared() <= r * r {
                image.put_pixel(x, y, color);
            }
        }
    }
}

/// 平面图坐标 → 图片像素坐标。图片尺寸与平面图尺寸一致时为恒等变换。
fn image_scale(floor: &FloorPlan, image: &RgbaImage) -> DVec2 {
    let axis = |pixels: u32, units: f64| {
        if units > 0.0 { pixels as f64 / units } else { 1.0 }
    };
    DVec2::new(
        axis(image.width(), floor.width.get()),
        axis(image.height(), floor.height.get()),
    )
}

pub fn decode_image(image_id: &str, bytes: Vec<u8>) -> Result<RgbaImage, FrontendError> {
    let image_error = |source| FrontendError::Image {
        image_id: image_id.to_string(),
        source,
    };
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| image_error(ImageError::IoError(err)))?
        .decode()
        .map(|image| image.to_rgba8())
        .map_err(image_error)
}

fn save_png(image: &RgbaImage, path: &Path) -> Result<(), FrontendError> {
    ensure_parent(path)?;
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| FrontendError::Encode {
            path: path.to_path_buf(),
            source,
        })
}

/// 一次标注运行写出的文件。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationReport {
    pub grid_images: Vec<PathBuf>,
    pub location_images: Vec<(EntityId, PathBuf)>,
    pub skipped_floors: Vec<String>,
}

impl AnnotationReport {
    /// AP ID → 位置图路径，用于回填安装记录。
    pub fn location_image_map(&self) -> HashMap<EntityId, String> {
        self.location_images
            .iter()
            .map(|(id, path)| (id.clone(), path.to_string_lossy().into_owned()))
            .collect()
    }
}

/// 为每个楼层生成网格图，再为每个有位置且未删除的 AP 生成位置图。
///
/// 缺少底图的楼层记录在 `skipped_floors` 中并跳过，不影响其他楼层。
pub fn annotate_project(
    index: &ProjectIndex<'_>,
    archive: &mut dyn ArchiveSource,
    layout: &OutputLayout,
    style: &AnnotationStyle,
) -> Result<AnnotationReport, FrontendError> {
    let mut report = AnnotationReport::default();
    let mut gridded: HashMap<&str, RgbaImage> = HashMap::new();

    for floor in &index.project().floor_plans {
        let image_id = floor.image_id.as_str();
        let Some(bytes) = archive.read_image(image_id)? else {
            warn!(floor = %floor.name, image = image_id, "平面图底图缺失，跳过该楼层");
            report.skipped_floors.push(floor.name.clone());
            continue;
        };
        let mut image = decode_image(image_id, bytes)?;
        let grid = draw_grid(&mut image, style);
        let path = layout.grid_image_path(image_id);
        save_png(&image, &path)?;
        info!(
            floor = %floor.name,
            columns = grid.columns,
            rows = grid.rows,
            path = %path.display(),
            "已生成网格平面图"
        );
        report.grid_images.push(path);
        gridded.insert(floor.id.as_str(), image);
    }

    for ap in index.project().access_points.iter() {
        if ap.is_deleted() {
            continue;
        }
        let Some(location) = ap.location.as_ref() else {
            continue;
        };
        let Some(base) = gridded.get(location.floor_plan_id.as_str()) else {
            continue;
        };
        let Some(floor) = index.floor_plan(location.floor_plan_id.as_str()) else {
            continue;
        };
        let mut image = base.clone();
        let center = location.point().as_vec2() * image_scale(floor, &image);
        draw_marker(&mut image, center, style.marker_radius, style.color);
        let path = layout.location_image_path(&floor.name, &ap.name);
        save_png(&image, &path)?;
        info!(access_point = %ap.name, path = %path.display(), "已生成 AP 位置图");
        report.location_images.push((ap.id.clone(), path));
    }
    Ok(report)
}
