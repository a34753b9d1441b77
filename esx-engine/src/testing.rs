//! 引擎单元测试共用的样例项目。

use esx_core::project::{
    AntennaType, ApCoupling, Collection, EntityId, Extra, FrequencyBand, Project, ProjectMeta,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

fn collection<T: DeserializeOwned>(items: Value) -> Collection<T> {
    Collection::new(serde_json::from_value(items).expect("样例数据无法反序列化"))
}

pub fn antenna_type(
    id: &str,
    name: &str,
    frequency_band: FrequencyBand,
    ap_coupling: ApCoupling,
) -> AntennaType {
    AntennaType {
        id: EntityId::new(id),
        name: name.to_string(),
        frequency_band,
        ap_coupling,
        extra: Extra::new(),
    }
}

/// 两层楼、四个 AP、一条线缆与一个机柜图片标注。
pub fn sample_project() -> Project {
    Project {
        meta: Some(ProjectMeta {
            title: "Head Office Wi-Fi".to_string(),
            customer: "Example Corp".to_string(),
            location: "1 Main Street".to_string(),
            responsible_person: "Jordan Lee".to_string(),
            extra: Extra::new(),
        }),
        access_points: collection(json!([
            {
                "id": "ap-1", "name": "AP-02", "vendor": "Cisco",
                "model": "AIR-AP3802E-B-K9 +AIR-ANT2524V4C-R", "mine": true,
                "status": "CREATED",
                "location": { "floorPlanId": "floor-1", "coord": { "x": 400.0, "y": 300.0 } },
                "tags": [
                    { "tagKeyId": "tk-install", "value": "Wall" },
                    { "tagKeyId": "tk-bracket", "value": "AIR-AP-BRACKET-2" },
                    { "tagKeyId": "tk-idf", "value": "IDF-1" }
                ],
                "noteIds": ["note-ap1"]
            },
            {
                "id": "ap-2", "name": "AP-01", "vendor": "Cisco", "model": "AP3802i",
                "mine": true, "status": "CREATED",
                "location": { "floorPlanId": "floor-1", "coord": { "x": 1200.0, "y": 700.0 } },
                "tags": [], "noteIds": []
            },
            {
                "id": "ap-3", "name": "AP-03", "vendor": "Cisco", "model": "AP3802i",
                "mine": true, "status": "DELETED",
                "location": { "floorPlanId": "floor-1", "coord": { "x": 110.0, "y": 100.0 } },
                "tags": [], "noteIds": []
            },
            {
                "id": "ap-4", "name": "Neighbor-AP", "vendor": "Aruba", "model": "AP-515",
                "mine": false, "status": "CREATED",
                "location": { "floorPlanId": "floor-2", "coord": { "x": 50.0, "y": 60.0 } },
                "tags": [], "noteIds": []
            }
        ])),
        floor_plans: collection(json!([
            {
                "id": "floor-1", "name": "Level 1", "width": 1500.0, "height": 1000.0,
                "metersPerUnit": 0.05, "imageId": "img-floor-1"
            },
            {
                "id": "floor-2", "name": "Level 2", "width": 1200.0, "height": 800.0,
                "metersPerUnit": 0.04, "imageId": "img-floor-2"
            }
        ])),
        radios: collection(json!([
            {
                "id": "radio-1-5", "accessPointId": "ap-1", "antennaTypeId": "at-ext-5",
                "antennaMounting": "CEILING", "antennaHeight": 3.0, "antennaTilt": -10.4,
                "status": "CREATED"
            },
            {
                "id": "radio-1-2", "accessPointId": "ap-1", "antennaTypeId": "at-int-2",
                "antennaMounting": "CEILING", "antennaHeight": 3.0, "antennaTilt": -10.4,
                "status": "CREATED"
            },
            {
                "id": "radio-2-5", "accessPointId": "ap-2", "antennaTypeId": "at-802-5",
                "antennaMounting": "WALL", "antennaHeight": 2.5, "antennaTilt": 0.0,
                "status": "CREATED"
            },
            {
                "id": "radio-4-5", "accessPointId": "ap-4", "antennaTypeId": "at-int-5",
                "antennaMounting": "CEILING", "antennaHeight": 2.7, "antennaTilt": 0.0,
                "status": "CREATED"
            }
        ])),
        antenna_types: Collection::new(vec![
            antenna_type(
                "at-ext-5",
                "Cisco AIR-ANT2524V4C-R 5GHz",
                FrequencyBand::Five,
                ApCoupling::ExternalAntenna,
            ),
            antenna_type(
                "at-int-2",
                "Cisco AIR-AP3802E-2.4GHz",
                FrequencyBand::Two,
                ApCoupling::Internal,
            ),
            antenna_type(
                "at-802-5",
                "Cisco AP3802i-5GHz",
                FrequencyBand::Five,
                ApCoupling::ExternalAntenna,
            ),
            antenna_type(
                "at-int-5",
                "Aruba AP-515-5GHz",
                FrequencyBand::Five,
                ApCoupling::Internal,
            ),
        ]),
        tag_keys: collection(json!([
            { "id": "tk-ant-name", "key": "antenna-name" },
            { "id": "tk-ant-vendor", "key": "antenna-vendor" },
            { "id": "tk-ant-type", "key": "antenna-type" },
            { "id": "tk-install", "key": "installation-type" },
            { "id": "tk-bracket", "key": "bracket" },
            { "id": "tk-loop", "key": "service-loop" },
            { "id": "tk-idf", "key": "IDF" }
        ])),
        notes: collection(json!([
            {
                "id": "note-ap1", "text": "Mount above the door frame", "status": "CREATED",
                "imageIds": ["img-ap1-a", "img-ap1-b"]
            },
            { "id": "note-idf", "text": "IDF-1", "status": "CREATED", "imageIds": ["img-rack"] },
            { "id": "note-cable", "text": "Cable run", "status": "CREATED", "imageIds": [] }
        ])),
        cable_notes: collection(json!([
            {
                "id": "cable-1", "floorPlanId": "floor-1",
                "points": [
                    { "x": 100.0, "y": 100.0 },
                    { "x": 100.0, "y": 300.0 },
                    { "x": 400.0, "y": 300.0 }
                ],
                "noteIds": ["note-cable"], "status": "CREATED"
            }
        ])),
        picture_notes: collection(json!([
            {
                "id": "pic-1",
                "location": { "floorPlanId": "floor-1", "coord": { "x": 90.0, "y": 95.0 } },
                "noteIds": ["note-idf"], "status": "CREATED"
            }
        ])),
    }
}
