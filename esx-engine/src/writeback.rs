//! 回写阶段：基于索引生成新的 `accessPoints.json` / `notes.json` 文档，不修改已加载的项目。

use std::collections::HashMap;

use esx_core::project::{AccessPoint, Collection, EntityId, Note, Tag};
use tracing::{info, warn};

use crate::errors::EngineError;
use crate::index::{AntennaClass, ProjectIndex, tag_keys};
use crate::matching::{TelecomRoomPolicy, link_cable};

pub const EXTERNAL: &str = "External";
pub const INTERNAL: &str = "Internal";

/// 回写结果：新文档与实际发生变化的实体数量。
#[derive(Debug, Clone, PartialEq)]
pub struct Rewritten<T> {
    pub document: Collection<T>,
    pub changed: usize,
}

/// 设置标签；同一键已存在时替换其值。返回值表示是否发生变化。
fn upsert_tag(access_point: &mut AccessPoint, tag_key_id: &EntityId, value: &str) -> bool {
    if !access_point.tags.iter().any(|tag| &tag.tag_key_id == tag_key_id) {
        access_point.tags.push(Tag::new(tag_key_id.clone(), value));
        return true;
    }
    let mut changed = false;
    for tag in access_point
        .tags
        .iter_mut()
        .filter(|tag| &tag.tag_key_id == tag_key_id)
    {
        if tag.value != value {
            tag.value = value.to_string();
            changed = true;
        }
    }
    changed
}

/// 按 5 GHz 射频的天线耦合方式为 AP 写入天线标签。
pub fn tag_antennas(index: &ProjectIndex<'_>) -> Result<Rewritten<AccessPoint>, EngineError> {
    let name_key = index.tag_key_id_for(tag_keys::ANTENNA_NAME)?;
    let type_key = index.tag_key_id_for(tag_keys::ANTENNA_TYPE)?;
    let vendor_key = index.tag_key_id_for(tag_keys::ANTENNA_VENDOR)?;

    let mut document = index.project().access_points.clone();
    let mut changed = 0;
    for ap in document.items.iter_mut().filter(|ap| !ap.is_deleted()) {
        let Some(original) = index.access_point(ap.id.as_str()) else {
            continue;
        };
        let mut touched = false;
        for (_, antenna) in index.five_ghz_antennas(original.id.as_str()) {
            match index.classify_antenna(original, antenna) {
                AntennaClass::External(external) => {
                    touched |= upsert_tag(ap, name_key, &external.model);
                    touched |= upsert_tag(ap, type_key, EXTERNAL);
                    touched |= upsert_tag(ap, vendor_key, &external.vendor);
                    info!(
                        access_point = %ap.name,
                        antenna_name = %external.model,
                        antenna_vendor = %external.vendor,
                        "天线标签设置为外接"
                    );
                }
                AntennaClass::Internal => {
                    touched |= upsert_tag(ap, type_key, INTERNAL);
                    info!(access_point = %ap.name, "天线标签设置为内置");
                }
            }
        }
        if touched {
            changed += 1;
        }
    }
    Ok(Rewritten { document, changed })
}

/// 型号中 `" +"` 之前的部分。
fn base_model(model: &str) -> &str {
    model.split(" +").next().unwrap_or(model)
}

/// 将外接天线拼接进 AP 型号：`"{base} + {vendor} {model}"`。
pub fn splice_antenna_models(index: &ProjectIndex<'_>) -> Rewritten<AccessPoint> {
    let mut document = index.project().access_points.clone();
    let mut changed = 0;
    for ap in document.items.iter_mut().filter(|ap| !ap.is_deleted()) {
        let Some(external) = index.external_antenna_for(ap.id.as_str()) else {
            continue;
        };
        let model = format!(
            "{} + {} {}",
            base_model(&ap.model),
            external.vendor,
            external.model
        );
        if model != ap.model {
            info!(access_point = %ap.name, model = %model, "AP 型号已更新");
            ap.model = model;
            changed += 1;
        }
    }
    Rewritten { document, changed }
}

/// 线缆标注首条备注重命名为 `"From {room} to {AP}"`。
pub fn rename_cable_notes(
    index: &ProjectIndex<'_>,
    policy: &TelecomRoomPolicy,
) -> Result<Rewritten<Note>, EngineError> {
    let mut renames: HashMap<&str, String> = HashMap::new();
    for cable in &index.project().cable_notes {
        let Some(note_id) = cable.note_ids.first() else {
            continue;
        };
        let link = match link_cable(index, policy, cable) {
            Ok(Some(link)) => link,
            Ok(None) => continue,
            Err(err) if err.is_per_entity() => {
                warn!(cable = %cable.id, error = %err, "线缆标注无法匹配，保留原备注");
                continue;
            }
            Err(err) => return Err(err),
        };
        if index.note(note_id.as_str()).is_none() {
            warn!(cable = %cable.id, note = %note_id, "线缆标注引用的备注不存在");
            continue;
        }
        renames.insert(
            note_id.as_str(),
            format!("From {} to {}", link.room.name(), link.access_point.name),
        );
    }

    let mut document = index.project().notes.clone();
    let mut changed = 0;
    for note in &mut document.items {
        let Some(text) = renames.remove(note.id.as_str()) else {
            continue;
        };
        if note.text != text {
            info!(note = %note.id, text = %text, "线缆备注已重命名");
            note.text = text;
            changed += 1;
        }
    }
    Ok(Rewritten { document, changed })
}
