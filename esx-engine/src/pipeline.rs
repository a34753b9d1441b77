use std::collections::HashMap;

use esx_core::project::{AccessPoint, EntityId, Scalar};
use esx_io::{DocumentKind, Requirements};
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::EngineError;
use crate::index::{ProjectIndex, tag_keys};
use crate::matching::{TelecomRoomPolicy, link_cable};

/// 富化阶段的默认值与匹配策略。
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentOptions {
    pub not_applicable: String,
    pub default_bracket: String,
    pub default_service_loop: String,
    pub default_idf: String,
    pub room_policy: TelecomRoomPolicy,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self {
            not_applicable: "N/A".to_string(),
            default_bracket: "Standard".to_string(),
            default_service_loop: "5m".to_string(),
            default_idf: String::new(),
            room_policy: TelecomRoomPolicy::default(),
        }
    }
}

/// 单个 AP 的安装信息记录。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApRecord {
    pub access_point_id: EntityId,
    pub name: String,
    pub floor_name: String,
    pub floor_scale: Option<f64>,
    pub vendor: String,
    pub model: String,
    pub antenna_model: String,
    pub antenna_vendor: String,
    pub installation_type: String,
    pub height: Option<f64>,
    pub tilt: Option<f64>,
    pub bracket: String,
    pub service_loop: String,
    pub idf: String,
    pub room_name: Option<String>,
    pub cable_length_m: Option<u64>,
    pub location_image: Option<String>,
}

impl ApRecord {
    /// 报表中的 MDF/IDF 名称：优先使用 IDF 标签，其次为线缆匹配到的机房。
    pub fn telecom_room(&self) -> &str {
        match (&self.room_name, self.idf.is_empty()) {
            (Some(room), true) => room.as_str(),
            _ => self.idf.as_str(),
        }
    }
}

/// 导出操作所需的文档。
pub fn requirements() -> Requirements {
    Requirements::new([
        DocumentKind::AccessPoints,
        DocumentKind::FloorPlans,
        DocumentKind::SimulatedRadios,
        DocumentKind::AntennaTypes,
        DocumentKind::TagKeys,
    ])
}

struct CableSummary {
    room_name: String,
    length_m: u64,
}

/// 按文档顺序匹配全部线缆；同一 AP 被多条线缆连接时以最后一条为准。
fn summarize_cables<'a>(
    index: &ProjectIndex<'a>,
    policy: &TelecomRoomPolicy,
) -> Result<HashMap<&'a str, CableSummary>, EngineError> {
    let mut summaries = HashMap::new();
    for cable in &index.project().cable_notes {
        match link_cable(index, policy, cable) {
            Ok(Some(link)) => {
                summaries.insert(
                    link.access_point.id.as_str(),
                    CableSummary {
                        room_name: link.room.name().to_string(),
                        length_m: link.rounded_length(),
                    },
                );
            }
            Ok(None) => {}
            Err(err) if err.is_per_entity() => {
                warn!(cable = %cable.id, error = %err, "线缆标注无法匹配，跳过");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(summaries)
}

#[inline]
fn is_eligible(access_point: &AccessPoint) -> bool {
    access_point.mine && !access_point.is_deleted()
}

/// 为每个自有且未删除的 AP 生成安装记录，按名称升序排列。
pub fn enrich(
    index: &ProjectIndex<'_>,
    options: &EnrichmentOptions,
) -> Result<Vec<ApRecord>, EngineError> {
    let installation_key = index.tag_key_id_for(tag_keys::INSTALLATION_TYPE)?;
    let bracket_key = index.tag_key_id_for(tag_keys::BRACKET)?;
    let service_loop_key = index.tag_key_id_for(tag_keys::SERVICE_LOOP)?;
    let idf_key = index.tag_key_id_for(tag_keys::IDF)?;

    let cables = summarize_cables(index, &options.room_policy)?;

    let mut records = Vec::new();
    for ap in index.project().access_points.iter().filter(|ap| is_eligible(ap)) {
        let id = ap.id.as_str();
        let floor = index.floor_plan_for(ap);
        let radio = index.radios_for(id).last().copied();
        let external = index.external_antenna_for(id);
        let cable = cables.get(id);

        let tag_or = |key: &EntityId, default: &str| {
            index
                .tag_value(id, key)
                .map(str::to_string)
                .unwrap_or_else(|| default.to_string())
        };
        let mounting = radio
            .and_then(|radio| radio.antenna_mounting.as_deref())
            .unwrap_or(options.not_applicable.as_str());

        records.push(ApRecord {
            access_point_id: ap.id.clone(),
            name: ap.name.clone(),
            floor_name: floor.map(|floor| floor.name.clone()).unwrap_or_default(),
            floor_scale: floor.map(|floor| floor.meters_per_unit.get()),
            vendor: ap.vendor.clone(),
            model: ap.model.split_whitespace().next().unwrap_or_default().to_string(),
            antenna_model: external
                .as_ref()
                .map(|antenna| antenna.model.clone())
                .unwrap_or_else(|| options.not_applicable.clone()),
            antenna_vendor: external
                .as_ref()
                .map(|antenna| antenna.vendor.clone())
                .unwrap_or_else(|| options.not_applicable.clone()),
            installation_type: tag_or(installation_key, mounting),
            height: radio.and_then(|radio| radio.antenna_height).map(Scalar::get),
            tilt: radio.and_then(|radio| radio.antenna_tilt).map(Scalar::get),
            bracket: tag_or(bracket_key, &options.default_bracket),
            service_loop: tag_or(service_loop_key, &options.default_service_loop),
            idf: tag_or(idf_key, &options.default_idf),
            room_name: cable.map(|summary| summary.room_name.clone()),
            cable_length_m: cable.map(|summary| summary.length_m),
            location_image: None,
        });
    }

    records.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(records = records.len(), linked_cables = cables.len(), "AP 安装记录生成完成");
    Ok(records)
}

/// 将标注阶段生成的位置图路径回填到记录中。
pub fn attach_location_images(records: &mut [ApRecord], images: &HashMap<EntityId, String>) {
    for record in records {
        if let Some(path) = images.get(&record.access_point_id) {
            record.location_image = Some(path.clone());
        }
    }
}
