use esx_core::geometry::{self, Point2};
use esx_core::project::{AccessPoint, CableNote, EntityKind, FloorPlan, Note, PictureNote};
use tracing::debug;

use crate::errors::EngineError;
use crate::index::ProjectIndex;

/// 机房识别规则：图片标注首条备注包含任一标记即视为 IDF/MDF/机柜。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelecomRoomPolicy {
    pub markers: Vec<String>,
}

impl TelecomRoomPolicy {
    pub fn new(markers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.markers
            .iter()
            .any(|marker| !marker.is_empty() && text.contains(marker.as_str()))
    }
}

impl Default for TelecomRoomPolicy {
    fn default() -> Self {
        Self::new(["IDF", "MDF", "Rack"])
    }
}

/// 被识别为机房的图片标注及其命名备注。
#[derive(Debug, Clone, Copy)]
pub struct TelecomRoom<'a> {
    pub picture_note: &'a PictureNote,
    pub note: &'a Note,
}

impl<'a> TelecomRoom<'a> {
    #[inline]
    pub fn name(&self) -> &'a str {
        self.note.text.as_str()
    }
}

fn floor_name(index: &ProjectIndex<'_>, floor_plan_id: &str) -> String {
    index
        .floor_plan(floor_plan_id)
        .map(|floor| floor.name.clone())
        .unwrap_or_else(|| floor_plan_id.to_string())
}

/// 同楼层、未删除且有位置的 AP 中距离 `point` 最近者。
pub fn nearest_access_point<'a>(
    index: &ProjectIndex<'a>,
    floor_plan_id: &str,
    point: Point2,
) -> Option<&'a AccessPoint> {
    let candidates = index
        .access_points_on(floor_plan_id)
        .iter()
        .filter(|ap| !ap.is_deleted())
        .filter_map(|ap| ap.location.as_ref().map(|location| (location.point(), *ap)));
    geometry::nearest(point, candidates)
}

/// 图片标注的首条有效备注；备注已删除或不存在时跳过。
fn first_note<'a>(index: &ProjectIndex<'a>, picture: &PictureNote) -> Option<&'a Note> {
    picture
        .note_ids
        .iter()
        .filter_map(|id| index.note(id.as_str()))
        .find(|note| !note.is_deleted())
}

/// 同楼层中距离 `point` 最近的机房图片标注。
pub fn nearest_telecom_room<'a>(
    index: &ProjectIndex<'a>,
    policy: &TelecomRoomPolicy,
    floor_plan_id: &str,
    point: Point2,
) -> Option<TelecomRoom<'a>> {
    let candidates = index
        .picture_notes_on(floor_plan_id)
        .iter()
        .filter(|picture| !picture.is_deleted())
        .filter_map(|picture| {
            let location = picture.location.as_ref()?;
            let note = first_note(index, picture)?;
            policy.matches(&note.text).then_some((
                location.point(),
                TelecomRoom {
                    picture_note: *picture,
                    note,
                },
            ))
        });
    geometry::nearest(point, candidates)
}

/// 一条线缆标注的两端匹配结果：终点对应 AP，起点对应机房。
#[derive(Debug, Clone, Copy)]
pub struct CableLink<'a> {
    pub cable: &'a CableNote,
    pub floor_plan: &'a FloorPlan,
    pub access_point: &'a AccessPoint,
    pub room: TelecomRoom<'a>,
    /// 按楼层比例尺换算的物理长度（米，未取整）。
    pub length_m: f64,
}

impl CableLink<'_> {
    #[inline]
    pub fn rounded_length(&self) -> u64 {
        geometry::round_meters(self.length_m)
    }
}

/// 匹配单条线缆标注。
///
/// 已删除或没有点的线缆返回 `Ok(None)`；楼层上找不到 AP 或机房时返回 `NoCandidates`。
pub fn link_cable<'a>(
    index: &ProjectIndex<'a>,
    policy: &TelecomRoomPolicy,
    cable: &'a CableNote,
) -> Result<Option<CableLink<'a>>, EngineError> {
    if cable.is_deleted() {
        return Ok(None);
    }
    let (Some(start), Some(end)) = (cable.start(), cable.end()) else {
        debug!(cable = %cable.id, "线缆标注没有坐标点，跳过");
        return Ok(None);
    };
    let floor_plan = index.floor_plan(cable.floor_plan_id.as_str()).ok_or_else(|| {
        EngineError::unresolved(
            EntityKind::FloorPlan,
            &cable.floor_plan_id,
            format!("cable note {}", cable.id),
        )
    })?;

    let subject = || format!("cable note {}", cable.id);
    let access_point = nearest_access_point(index, floor_plan.id.as_str(), end).ok_or_else(|| {
        EngineError::NoCandidates {
            kind: EntityKind::AccessPoint,
            subject: subject(),
            floor_plan_id: floor_plan.id.clone(),
        }
    })?;
    let room = nearest_telecom_room(index, policy, floor_plan.id.as_str(), start).ok_or_else(|| {
        EngineError::NoCandidates {
            kind: EntityKind::PictureNote,
            subject: subject(),
            floor_plan_id: floor_plan.id.clone(),
        }
    })?;

    let length_m = geometry::physical_length(&cable.polyline(), floor_plan.meters_per_unit.get());
    debug!(
        cable = %cable.id,
        floor = %floor_name(index, floor_plan.id.as_str()),
        access_point = %access_point.name,
        room = %room.name(),
        length_m,
        "线缆匹配完成"
    );
    Ok(Some(CableLink {
        cable,
        floor_plan,
        access_point,
        room,
        length_m,
    }))
}
