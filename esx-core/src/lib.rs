pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 平面图坐标系中的二维点（单位为编辑器像素），内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn distance_squared(self, other: Point2) -> f64 {
            self.vector_to(other).length_squared()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 单段线缆长度（编辑器单位）。
    ///
    /// 两个坐标都变化时视为斜线，取欧氏距离；只有一个坐标变化时取该轴上的绝对差。
    pub fn segment_length(start: Point2, end: Point2) -> f64 {
        let delta = Vector2::from_points(start, end);
        let dx = delta.x().abs();
        let dy = delta.y().abs();
        if dx > 0.0 && dy > 0.0 {
            delta.length()
        } else {
            dx + dy
        }
    }

    /// 折线总长度（编辑器单位）。少于两个点时长度为 0。
    pub fn path_length(points: &[Point2]) -> f64 {
        points
            .windows(2)
            .map(|pair| segment_length(pair[0], pair[1]))
            .sum()
    }

    /// 按平面图比例尺（米/单位）换算出的物理长度。
    #[inline]
    pub fn physical_length(points: &[Point2], meters_per_unit: f64) -> f64 {
        path_length(points) * meters_per_unit
    }

    /// 四舍五入到整米，用于展示。
    #[inline]
    pub fn round_meters(length: f64) -> u64 {
        if length.is_finite() && length > 0.0 {
            length.round() as u64
        } else {
            0
        }
    }

    /// 在候选集合中查找与 `query` 平方欧氏距离最小的元素。
    ///
    /// 距离相同时保留最先出现的候选；非有限距离的候选被忽略。候选为空时返回 `None`。
    pub fn nearest<T, I>(query: Point2, candidates: I) -> Option<T>
    where
        I: IntoIterator<Item = (Point2, T)>,
    {
        let mut best: Option<(f64, T)> = None;
        for (point, item) in candidates {
            let distance = query.distance_squared(point);
            if !distance.is_finite() {
                continue;
            }
            match &best {
                Some((best_distance, _)) if distance >= *best_distance => {}
                _ => best = Some((distance, item)),
            }
        }
        best.map(|(_, item)| item)
    }

}

pub mod project {
    use std::borrow::Borrow;
    use std::collections::{BTreeMap, BTreeSet};
    use std::fmt;

    use serde::{Deserialize, Serialize};
    use serde_json::{Map, Value};

    use crate::geometry::Point2;

    /// 文档中未建模的字段，原样保留以便回写。
    pub type Extra = Map<String, Value>;

    /// 项目文件中的实体 ID（通常为 UUID 字符串）。
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct EntityId(String);

    impl EntityId {
        #[inline]
        pub fn new(raw: impl Into<String>) -> Self {
            Self(raw.into())
        }

        #[inline]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl Borrow<str> for EntityId {
        fn borrow(&self) -> &str {
            &self.0
        }
    }

    impl fmt::Display for EntityId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<&str> for EntityId {
        fn from(value: &str) -> Self {
            Self::new(value)
        }
    }

    /// 以字符串形式存储的枚举：已知取值映射为变体，未知取值原样保留。
    macro_rules! string_enum {
        ($(#[$meta:meta])* $name:ident { $($variant:ident => $raw:literal),+ $(,)? }) => {
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
            #[serde(from = "String", into = "String")]
            pub enum $name {
                $($variant,)+
                Other(String),
            }

            impl $name {
                pub fn as_str(&self) -> &str {
                    match self {
                        $(Self::$variant => $raw,)+
                        Self::Other(raw) => raw.as_str(),
                    }
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    match value.as_str() {
                        $($raw => Self::$variant,)+
                        _ => Self::Other(value),
                    }
                }
            }

            impl From<$name> for String {
                fn from(value: $name) -> Self {
                    match value {
                        $name::Other(raw) => raw,
                        known => known.as_str().to_string(),
                    }
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        };
    }

    string_enum! {
        /// 实体状态，`DELETED` 的实体在所有匹配与导出中被忽略。
        EntityStatus {
            Created => "CREATED",
            Deleted => "DELETED",
        }
    }

    string_enum! {
        FrequencyBand {
            Two => "TWO",
            Five => "FIVE",
            Six => "SIX",
        }
    }

    string_enum! {
        /// AP 与天线的耦合方式。
        ApCoupling {
            Internal => "INTERNAL",
            ExternalAntenna => "EXTERNAL_ANTENNA",
        }
    }

    #[inline]
    fn status_is_deleted(status: &Option<EntityStatus>) -> bool {
        matches!(status, Some(EntityStatus::Deleted))
    }

    /// 实体类别，用于错误信息与索引统计。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum EntityKind {
        AccessPoint,
        FloorPlan,
        Radio,
        AntennaType,
        TagKey,
        Note,
        CableNote,
        PictureNote,
    }

    impl EntityKind {
        pub fn describe(self) -> &'static str {
            match self {
                EntityKind::AccessPoint => "access point",
                EntityKind::FloorPlan => "floor plan",
                EntityKind::Radio => "simulated radio",
                EntityKind::AntennaType => "antenna type",
                EntityKind::TagKey => "tag key",
                EntityKind::Note => "note",
                EntityKind::CableNote => "cable note",
                EntityKind::PictureNote => "picture note",
            }
        }
    }

    impl fmt::Display for EntityKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.describe())
        }
    }

    /// 所有带 ID 的实体共享的访问接口。
    pub trait Entity {
        const KIND: EntityKind;

        fn id(&self) -> &EntityId;
    }

    macro_rules! impl_entity {
        ($($ty:ident => $kind:ident),+ $(,)?) => {
            $(
                impl Entity for $ty {
                    const KIND: EntityKind = EntityKind::$kind;

                    #[inline]
                    fn id(&self) -> &EntityId {
                        &self.id
                    }
                }
            )+
        };
    }

    /// 文档中的数值，保留整数与浮点两种写法，回写时 `1500` 不会变成 `1500.0`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum Scalar {
        Int(i64),
        Float(f64),
    }

    impl Scalar {
        #[inline]
        pub fn get(self) -> f64 {
            match self {
                Scalar::Int(value) => value as f64,
                Scalar::Float(value) => value,
            }
        }
    }

    impl Default for Scalar {
        fn default() -> Self {
            Scalar::Float(0.0)
        }
    }

    impl From<f64> for Scalar {
        fn from(value: f64) -> Self {
            Scalar::Float(value)
        }
    }

    impl From<i64> for Scalar {
        fn from(value: i64) -> Self {
            Scalar::Int(value)
        }
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
    pub struct Coord {
        pub x: Scalar,
        pub y: Scalar,
    }

    impl Coord {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self {
                x: x.into(),
                y: y.into(),
            }
        }

        #[inline]
        pub fn to_point(self) -> Point2 {
            Point2::new(self.x.get(), self.y.get())
        }
    }

    impl From<Coord> for Point2 {
        fn from(value: Coord) -> Self {
            value.to_point()
        }
    }

    /// 平面图上的位置：所在楼层 + 像素坐标。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Location {
        pub floor_plan_id: EntityId,
        pub coord: Coord,
        #[serde(flatten)]
        pub extra: Extra,
    }

    impl Location {
        pub fn new(floor_plan_id: impl Into<String>, x: f64, y: f64) -> Self {
            Self {
                floor_plan_id: EntityId::new(floor_plan_id),
                coord: Coord::new(x, y),
                extra: Extra::new(),
            }
        }

        #[inline]
        pub fn point(&self) -> Point2 {
            self.coord.to_point()
        }
    }

    /// AP 上的标签赋值，引用 `TagKey`。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Tag {
        pub tag_key_id: EntityId,
        pub value: String,
        #[serde(flatten)]
        pub extra: Extra,
    }

    impl Tag {
        pub fn new(tag_key_id: EntityId, value: impl Into<String>) -> Self {
            Self {
                tag_key_id,
                value: value.into(),
                extra: Extra::new(),
            }
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccessPoint {
        pub id: EntityId,
        pub name: String,
        #[serde(default)]
        pub vendor: String,
        #[serde(default)]
        pub model: String,
        #[serde(default)]
        pub mine: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub status: Option<EntityStatus>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub location: Option<Location>,
        #[serde(default)]
        pub tags: Vec<Tag>,
        #[serde(default)]
        pub note_ids: Vec<EntityId>,
        #[serde(flatten)]
        pub extra: Extra,
    }

    impl AccessPoint {
        #[inline]
        pub fn is_deleted(&self) -> bool {
            status_is_deleted(&self.status)
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct FloorPlan {
        pub id: EntityId,
        pub name: String,
        pub width: Scalar,
        pub height: Scalar,
        pub meters_per_unit: Scalar,
        pub image_id: EntityId,
        #[serde(flatten)]
        pub extra: Extra,
    }

    /// 仿真射频（`simulatedRadios.json`），每个频段一条，归属于某个 AP。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Radio {
        pub id: EntityId,
        pub access_point_id: EntityId,
        pub antenna_type_id: EntityId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub antenna_mounting: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub antenna_height: Option<Scalar>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub antenna_tilt: Option<Scalar>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub status: Option<EntityStatus>,
        #[serde(flatten)]
        pub extra: Extra,
    }

    impl Radio {
        #[inline]
        pub fn is_deleted(&self) -> bool {
            status_is_deleted(&self.status)
        }
    }

    /// 天线型号。`name` 以空格分隔厂商与型号，例如 `"Vendor ModelX"`。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AntennaType {
        pub id: EntityId,
        pub name: String,
        pub frequency_band: FrequencyBand,
        pub ap_coupling: ApCoupling,
        #[serde(flatten)]
        pub extra: Extra,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct TagKey {
        pub id: EntityId,
        pub key: String,
        #[serde(flatten)]
        pub extra: Extra,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Note {
        pub id: EntityId,
        #[serde(default)]
        pub text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub status: Option<EntityStatus>,
        #[serde(default)]
        pub image_ids: Vec<EntityId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub location: Option<Location>,
        #[serde(flatten)]
        pub extra: Extra,
    }

    impl Note {
        #[inline]
        pub fn is_deleted(&self) -> bool {
            status_is_deleted(&self.status)
        }
    }

    /// 线缆标注：以折线表示的一段实际布线。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CableNote {
        pub id: EntityId,
        pub floor_plan_id: EntityId,
        #[serde(default)]
        pub points: Vec<Coord>,
        #[serde(default)]
        pub note_ids: Vec<EntityId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub status: Option<EntityStatus>,
        #[serde(flatten)]
        pub extra: Extra,
    }

    impl CableNote {
        #[inline]
        pub fn is_deleted(&self) -> bool {
            status_is_deleted(&self.status)
        }

        pub fn polyline(&self) -> Vec<Point2> {
            self.points.iter().map(|coord| coord.to_point()).collect()
        }

        #[inline]
        pub fn start(&self) -> Option<Point2> {
            self.points.first().map(|coord| coord.to_point())
        }

        #[inline]
        pub fn end(&self) -> Option<Point2> {
            self.points.last().map(|coord| coord.to_point())
        }
    }

    /// 图片标注：平面图上的一个点（例如机柜照片）。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PictureNote {
        pub id: EntityId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub location: Option<Location>,
        #[serde(default)]
        pub note_ids: Vec<EntityId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub status: Option<EntityStatus>,
        #[serde(flatten)]
        pub extra: Extra,
    }

    impl PictureNote {
        #[inline]
        pub fn is_deleted(&self) -> bool {
            status_is_deleted(&self.status)
        }
    }

    impl_entity! {
        AccessPoint => AccessPoint,
        FloorPlan => FloorPlan,
        Radio => Radio,
        AntennaType => AntennaType,
        TagKey => TagKey,
        Note => Note,
        CableNote => CableNote,
        PictureNote => PictureNote,
    }

    /// `project.json` 中的项目元数据。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProjectMeta {
        #[serde(default)]
        pub title: String,
        #[serde(default)]
        pub customer: String,
        #[serde(default)]
        pub location: String,
        #[serde(default)]
        pub responsible_person: String,
        #[serde(flatten)]
        pub extra: Extra,
    }

    /// 输入文档中每个实体实际出现的成员名。
    ///
    /// 反序列化会为缺失的成员补默认值；回写时仍为默认值的这类成员会被省略。
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct MemberPresence(BTreeMap<EntityId, BTreeSet<String>>);

    impl MemberPresence {
        /// 从原始实体数组记录成员名，没有字符串 `id` 的条目不记录。
        pub fn record(items: &[Value]) -> Self {
            let mut presence = BTreeMap::new();
            for item in items {
                let Some(object) = item.as_object() else {
                    continue;
                };
                let Some(id) = object.get("id").and_then(Value::as_str) else {
                    continue;
                };
                presence.insert(EntityId::new(id), object.keys().cloned().collect());
            }
            Self(presence)
        }

        /// 删除输入中不存在且仍为空默认值的成员。未记录的实体保持不变。
        pub fn strip_defaults(&self, item: &mut Value) {
            let Some(object) = item.as_object_mut() else {
                return;
            };
            let Some(present) = object
                .get("id")
                .and_then(Value::as_str)
                .and_then(|id| self.0.get(id))
            else {
                return;
            };
            object.retain(|key, value| present.contains(key) || !is_empty_default(value));
        }
    }

    fn is_empty_default(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::Bool(flag) => !flag,
            Value::String(text) => text.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Number(_) => false,
        }
    }

    /// 单个 JSON 文档：顶层实体数组 + 其余顶层字段。
    #[derive(Debug, Clone, PartialEq)]
    pub struct Collection<T> {
        pub items: Vec<T>,
        pub extra: Extra,
        pub presence: MemberPresence,
    }

    impl<T> Collection<T> {
        pub fn new(items: Vec<T>) -> Self {
            Self {
                items,
                extra: Extra::new(),
                presence: MemberPresence::default(),
            }
        }

        #[inline]
        pub fn iter(&self) -> std::slice::Iter<'_, T> {
            self.items.iter()
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.items.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }

    impl<T> Default for Collection<T> {
        fn default() -> Self {
            Self::new(Vec::new())
        }
    }

    impl<'a, T> IntoIterator for &'a Collection<T> {
        type Item = &'a T;
        type IntoIter = std::slice::Iter<'a, T>;

        fn into_iter(self) -> Self::IntoIter {
            self.items.iter()
        }
    }

    /// 一次运行中加载的完整项目快照。
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Project {
        pub meta: Option<ProjectMeta>,
        pub access_points: Collection<AccessPoint>,
        pub floor_plans: Collection<FloorPlan>,
        pub radios: Collection<Radio>,
        pub antenna_types: Collection<AntennaType>,
        pub tag_keys: Collection<TagKey>,
        pub notes: Collection<Note>,
        pub cable_notes: Collection<CableNote>,
        pub picture_notes: Collection<PictureNote>,
    }

}
