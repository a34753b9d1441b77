use esx_core::project::EntityId;
use esx_io::{DocumentKind, Requirements};
use tracing::debug;

use crate::index::ProjectIndex;

/// 单张照片的复制计划：源图片 ID 与目标 `{楼层}/{文件名}`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoCopy {
    pub access_point_id: EntityId,
    pub image_id: EntityId,
    pub floor_name: String,
    pub file_name: String,
}

pub fn requirements() -> Requirements {
    Requirements::new([
        DocumentKind::AccessPoints,
        DocumentKind::FloorPlans,
        DocumentKind::Notes,
    ])
}

/// 去掉文件名中的路径分隔符，避免写出目标目录之外。
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() || trimmed.chars().all(|ch| ch == '.') {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 为每个有位置、有备注的 AP 规划照片导出。
///
/// AP 仅有一条备注且该备注只有一张图片时命名为 `{ap}.png`，否则为 `{ap}-{n}.png`，
/// `n` 从 1 开始并跨备注连续编号。
pub fn plan_photo_extraction(index: &ProjectIndex<'_>) -> Vec<PhotoCopy> {
    let mut plan = Vec::new();
    for ap in index.project().access_points.iter() {
        if ap.is_deleted() || ap.note_ids.is_empty() {
            continue;
        }
        let Some(floor) = index.floor_plan_for(ap) else {
            continue;
        };
        let floor_name = sanitize_file_name(&floor.name);
        let ap_name = sanitize_file_name(&ap.name);
        let several_notes = ap.note_ids.len() > 1;

        let mut counter = 0usize;
        for note_id in &ap.note_ids {
            let Some(note) = index.note(note_id.as_str()) else {
                debug!(access_point = %ap.name, note = %note_id, "AP 引用的备注不存在，跳过");
                continue;
            };
            if note.is_deleted() {
                continue;
            }
            let numbered = several_notes || note.image_ids.len() > 1;
            for image_id in &note.image_ids {
                counter += 1;
                let file_name = if numbered {
                    format!("{ap_name}-{counter}.png")
                } else {
                    format!("{ap_name}.png")
                };
                plan.push(PhotoCopy {
                    access_point_id: ap.id.clone(),
                    image_id: image_id.clone(),
                    floor_name: floor_name.clone(),
                    file_name,
                });
            }
        }
    }
    debug!(photos = plan.len(), "照片导出计划生成完成");
    plan
}
