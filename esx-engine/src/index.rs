use std::collections::HashMap;

use esx_core::project::{
    AccessPoint, AntennaType, ApCoupling, CableNote, Collection, Entity, EntityId, EntityKind,
    FloorPlan, FrequencyBand, Note, PictureNote, Project, Radio, TagKey,
};
use tracing::{debug, warn};

use crate::errors::EngineError;

/// 受控词表中的标签键。
pub mod tag_keys {
    pub const ANTENNA_NAME: &str = "antenna-name";
    pub const ANTENNA_VENDOR: &str = "antenna-vendor";
    pub const ANTENNA_TYPE: &str = "antenna-type";
    pub const INSTALLATION_TYPE: &str = "installation-type";
    pub const BRACKET: &str = "bracket";
    pub const SERVICE_LOOP: &str = "service-loop";
    pub const IDF: &str = "IDF";
}

/// 判定 AP 型号是否属于集成天线机型。
///
/// 部分机型在厂商目录中标记为外接天线耦合，但实际为内置天线，按型号中的标记子串排除。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntennaPolicy {
    pub integrated_model_markers: Vec<String>,
}

impl AntennaPolicy {
    pub fn new(markers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            integrated_model_markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn excludes(&self, model: &str) -> bool {
        self.integrated_model_markers
            .iter()
            .any(|marker| !marker.is_empty() && model.contains(marker.as_str()))
    }
}

impl Default for AntennaPolicy {
    fn default() -> Self {
        Self::new(["802i"])
    }
}

/// 外接天线的厂商与型号，由天线类型名称的前两个空白分隔词得出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalAntenna {
    pub vendor: String,
    pub model: String,
}

impl ExternalAntenna {
    pub fn parse(name: &str) -> Option<Self> {
        let mut tokens = name.split_whitespace();
        let vendor = tokens.next()?;
        let model = tokens.next()?;
        Some(Self {
            vendor: vendor.to_string(),
            model: model.to_string(),
        })
    }
}

/// 单个 5 GHz 射频的天线归类。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AntennaClass {
    External(ExternalAntenna),
    Internal,
}

/// 项目实体的交叉引用索引。构建时校验引用完整性，之后所有查询均为 O(1)。
#[derive(Debug)]
pub struct ProjectIndex<'a> {
    project: &'a Project,
    antenna_policy: AntennaPolicy,
    access_points: HashMap<&'a str, &'a AccessPoint>,
    floor_plans: HashMap<&'a str, &'a FloorPlan>,
    radios: HashMap<&'a str, &'a Radio>,
    antenna_types: HashMap<&'a str, &'a AntennaType>,
    tag_keys: HashMap<&'a str, &'a TagKey>,
    notes: HashMap<&'a str, &'a Note>,
    cable_notes: HashMap<&'a str, &'a CableNote>,
    picture_notes: HashMap<&'a str, &'a PictureNote>,
    tag_key_ids: HashMap<&'a str, &'a EntityId>,
    radios_by_access_point: HashMap<&'a str, Vec<&'a Radio>>,
    access_points_by_floor: HashMap<&'a str, Vec<&'a AccessPoint>>,
    picture_notes_by_floor: HashMap<&'a str, Vec<&'a PictureNote>>,
}

fn index_by_id<T: Entity>(collection: &Collection<T>) -> Result<HashMap<&str, &T>, EngineError> {
    let mut index = HashMap::with_capacity(collection.len());
    for item in collection {
        let id = item.id();
        if index.insert(id.as_str(), item).is_some() {
            return Err(EngineError::DuplicateId {
                kind: T::KIND,
                id: id.clone(),
            });
        }
    }
    Ok(index)
}

impl<'a> ProjectIndex<'a> {
    pub fn build(project: &'a Project) -> Result<Self, EngineError> {
        let access_points = index_by_id(&project.access_points)?;
        let floor_plans = index_by_id(&project.floor_plans)?;
        let radios = index_by_id(&project.radios)?;
        let antenna_types = index_by_id(&project.antenna_types)?;
        let tag_keys = index_by_id(&project.tag_keys)?;
        let notes = index_by_id(&project.notes)?;
        let cable_notes = index_by_id(&project.cable_notes)?;
        let picture_notes = index_by_id(&project.picture_notes)?;

        for floor in &project.floor_plans {
            let scale = floor.meters_per_unit.get();
            if scale.is_nan() || scale <= 0.0 {
                return Err(EngineError::InvalidScale {
                    id: floor.id.clone(),
                    name: floor.name.clone(),
                    scale,
                });
            }
        }

        let mut tag_key_ids: HashMap<&str, &EntityId> = HashMap::new();
        for tag_key in &project.tag_keys {
            if let Some(previous) = tag_key_ids.insert(tag_key.key.as_str(), &tag_key.id) {
                warn!(key = %tag_key.key, previous = %previous, current = %tag_key.id, "标签键重复，使用最后一个定义");
            }
        }

        let mut access_points_by_floor: HashMap<&str, Vec<&AccessPoint>> = HashMap::new();
        for ap in &project.access_points {
            let Some(location) = ap.location.as_ref() else {
                continue;
            };
            if !floor_plans.contains_key(location.floor_plan_id.as_str()) {
                return Err(EngineError::unresolved(
                    EntityKind::FloorPlan,
                    &location.floor_plan_id,
                    format!("access point `{}`", ap.name),
                ));
            }
            access_points_by_floor
                .entry(location.floor_plan_id.as_str())
                .or_default()
                .push(ap);
        }

        let mut radios_by_access_point: HashMap<&str, Vec<&Radio>> = HashMap::new();
        for radio in project.radios.iter().filter(|radio| !radio.is_deleted()) {
            let referrer = || format!("simulated radio {}", radio.id);
            if !access_points.contains_key(radio.access_point_id.as_str()) {
                return Err(EngineError::unresolved(
                    EntityKind::AccessPoint,
                    &radio.access_point_id,
                    referrer(),
                ));
            }
            if !antenna_types.contains_key(radio.antenna_type_id.as_str()) {
                return Err(EngineError::unresolved(
                    EntityKind::AntennaType,
                    &radio.antenna_type_id,
                    referrer(),
                ));
            }
            radios_by_access_point
                .entry(radio.access_point_id.as_str())
                .or_default()
                .push(radio);
        }

        for cable in &project.cable_notes {
            if !floor_plans.contains_key(cable.floor_plan_id.as_str()) {
                return Err(EngineError::unresolved(
                    EntityKind::FloorPlan,
                    &cable.floor_plan_id,
                    format!("cable note {}", cable.id),
                ));
            }
        }

        let mut picture_notes_by_floor: HashMap<&str, Vec<&PictureNote>> = HashMap::new();
        for picture in &project.picture_notes {
            if let Some(location) = picture.location.as_ref() {
                picture_notes_by_floor
                    .entry(location.floor_plan_id.as_str())
                    .or_default()
                    .push(picture);
            }
        }

        debug!(
            access_points = access_points.len(),
            floor_plans = floor_plans.len(),
            radios = radios.len(),
            tag_keys = tag_key_ids.len(),
            cable_notes = cable_notes.len(),
            picture_notes = picture_notes.len(),
            "交叉引用索引构建完成"
        );

        Ok(Self {
            project,
            antenna_policy: AntennaPolicy::default(),
            access_points,
            floor_plans,
            radios,
            antenna_types,
            tag_keys,
            notes,
            cable_notes,
            picture_notes,
            tag_key_ids,
            radios_by_access_point,
            access_points_by_floor,
            picture_notes_by_floor,
        })
    }

    /// 替换集成天线判定策略。
    pub fn with_antenna_policy(mut self, policy: AntennaPolicy) -> Self {
        self.antenna_policy = policy;
        self
    }

    #[inline]
    pub fn project(&self) -> &'a Project {
        self.project
    }

    #[inline]
    pub fn antenna_policy(&self) -> &AntennaPolicy {
        &self.antenna_policy
    }

    #[inline]
    pub fn access_point(&self, id: &str) -> Option<&'a AccessPoint> {
        self.access_points.get(id).copied()
    }

    #[inline]
    pub fn floor_plan(&self, id: &str) -> Option<&'a FloorPlan> {
        self.floor_plans.get(id).copied()
    }

    #[inline]
    pub fn radio(&self, id: &str) -> Option<&'a Radio> {
        self.radios.get(id).copied()
    }

    #[inline]
    pub fn antenna_type(&self, id: &str) -> Option<&'a AntennaType> {
        self.antenna_types.get(id).copied()
    }

    #[inline]
    pub fn tag_key(&self, id: &str) -> Option<&'a TagKey> {
        self.tag_keys.get(id).copied()
    }

    #[inline]
    pub fn note(&self, id: &str) -> Option<&'a Note> {
        self.notes.get(id).copied()
    }

    #[inline]
    pub fn cable_note(&self, id: &str) -> Option<&'a CableNote> {
        self.cable_notes.get(id).copied()
    }

    #[inline]
    pub fn picture_note(&self, id: &str) -> Option<&'a PictureNote> {
        self.picture_notes.get(id).copied()
    }

    /// 受控词表键 → TagKey ID。项目未配置该键时返回 `UnknownTagKey`。
    pub fn tag_key_id_for(&self, key: &str) -> Result<&'a EntityId, EngineError> {
        self.tag_key_ids
            .get(key)
            .copied()
            .ok_or_else(|| EngineError::UnknownTagKey(key.to_string()))
    }

    /// AP 的未删除射频，按文档顺序。
    pub fn radios_for(&self, access_point_id: &str) -> &[&'a Radio] {
        self.radios_by_access_point
            .get(access_point_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// AP 上某个标签键的取值；同一键出现多次时以最后一个为准。
    pub fn tag_value(&self, access_point_id: &str, tag_key_id: &EntityId) -> Option<&'a str> {
        self.access_point(access_point_id)?
            .tags
            .iter()
            .rev()
            .find(|tag| &tag.tag_key_id == tag_key_id)
            .map(|tag| tag.value.as_str())
    }

    /// AP 所在楼层；无位置信息时为 `None`。
    pub fn floor_plan_for(&self, access_point: &AccessPoint) -> Option<&'a FloorPlan> {
        let location = access_point.location.as_ref()?;
        self.floor_plan(location.floor_plan_id.as_str())
    }

    /// 位于指定楼层的 AP（含已删除，调用方自行过滤）。
    pub fn access_points_on(&self, floor_plan_id: &str) -> &[&'a AccessPoint] {
        self.access_points_by_floor
            .get(floor_plan_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn picture_notes_on(&self, floor_plan_id: &str) -> &[&'a PictureNote] {
        self.picture_notes_by_floor
            .get(floor_plan_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// AP 的 5 GHz 射频及其天线类型。
    pub fn five_ghz_antennas(&self, access_point_id: &str) -> Vec<(&'a Radio, &'a AntennaType)> {
        self.radios_for(access_point_id)
            .iter()
            .filter_map(|radio| {
                let antenna = self.antenna_type(radio.antenna_type_id.as_str())?;
                (antenna.frequency_band == FrequencyBand::Five).then_some((*radio, antenna))
            })
            .collect()
    }

    /// 按耦合方式与集成天线策略为天线归类。
    pub fn classify_antenna(&self, access_point: &AccessPoint, antenna: &AntennaType) -> AntennaClass {
        if antenna.ap_coupling != ApCoupling::ExternalAntenna
            || self.antenna_policy.excludes(&access_point.model)
        {
            return AntennaClass::Internal;
        }
        match ExternalAntenna::parse(&antenna.name) {
            Some(external) => AntennaClass::External(external),
            None => {
                warn!(
                    access_point = %access_point.name,
                    antenna = %antenna.name,
                    "外接天线名称无法拆分为厂商与型号，按内置天线处理"
                );
                AntennaClass::Internal
            }
        }
    }

    /// AP 的外接天线；有多个 5 GHz 射频时以最后一个为准。
    pub fn external_antenna_for(&self, access_point_id: &str) -> Option<ExternalAntenna> {
        let access_point = self.access_point(access_point_id)?;
        match self
            .five_ghz_antennas(access_point_id)
            .into_iter()
            .map(|(_, antenna)| self.classify_antenna(access_point, antenna))
            .last()?
        {
            AntennaClass::External(external) => Some(external),
            AntennaClass::Internal => None,
        }
    }
}
