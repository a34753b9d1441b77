use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use esx_core::project::ProjectMeta;
use esx_engine::pipeline::ApRecord;
use tracing::info;

use crate::errors::FrontendError;
use crate::resource_locator::ensure_parent;

/// 安装信息表的固定列。
pub const COLUMNS: [&str; 15] = [
    "AP Name",
    "AP Location",
    "Location Image",
    "AP Vendor",
    "AP Model",
    "Antenna Model",
    "Antenna Vendor",
    "Installation Type",
    "Installation Height",
    "Antenna Tilt",
    "AP Bracket",
    "Service Loop",
    "MDF/IDF Name",
    "Distance to MDF/IDF",
    "Status",
];

/// 安装进度，对应表格中的下拉选项。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstallStatus {
    #[default]
    ToBeInstalled,
    ApInstalled,
    ApProvisioned,
}

impl InstallStatus {
    pub const ALL: [InstallStatus; 3] = [
        InstallStatus::ToBeInstalled,
        InstallStatus::ApInstalled,
        InstallStatus::ApProvisioned,
    ];

    pub fn label(self) -> &'static str {
        match self {
            InstallStatus::ToBeInstalled => "To be installed",
            InstallStatus::ApInstalled => "AP installed",
            InstallStatus::ApProvisioned => "AP provisionned",
        }
    }
}

/// 表格输出的协作边界。
pub trait TableSink {
    fn write_row(&mut self, cells: &[String]) -> Result<(), FrontendError>;

    fn finish(&mut self) -> Result<(), FrontendError> {
        Ok(())
    }
}

impl TableSink for Vec<Vec<String>> {
    fn write_row(&mut self, cells: &[String]) -> Result<(), FrontendError> {
        self.push(cells.to_vec());
        Ok(())
    }
}

/// 制表符分隔的文本输出，可直接粘贴到电子表格。
pub struct TsvSink<W: Write> {
    writer: W,
    path: PathBuf,
}

impl TsvSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self, FrontendError> {
        ensure_parent(path)?;
        let file = File::create(path).map_err(|source| FrontendError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file), path))
    }
}

impl<W: Write> TsvSink<W> {
    pub fn new(writer: W, path: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            path: path.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_error(&self, source: std::io::Error) -> FrontendError {
        FrontendError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

fn escape_cell(cell: &str) -> String {
    cell.chars()
        .map(|ch| match ch {
            '\t' | '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

impl<W: Write> TableSink for TsvSink<W> {
    fn write_row(&mut self, cells: &[String]) -> Result<(), FrontendError> {
        let line = cells
            .iter()
            .map(|cell| escape_cell(cell))
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(self.writer, "{line}").map_err(|err| self.write_error(err))
    }

    fn finish(&mut self) -> Result<(), FrontendError> {
        self.writer.flush().map_err(|err| self.write_error(err))
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

pub fn format_height(height: Option<f64>) -> String {
    height
        .map(|h| format!("{}m", format_number(h)))
        .unwrap_or_default()
}

/// 倾角取整后附加度数符号。
pub fn format_tilt(tilt: Option<f64>) -> String {
    tilt.map(|t| format!("{}°", t.round() as i64))
        .unwrap_or_default()
}

pub fn format_distance(distance: Option<u64>) -> String {
    distance.map(|d| format!("{d}m")).unwrap_or_default()
}

/// 单条记录对应的表格行，列顺序与 [`COLUMNS`] 一致。
pub fn record_row(record: &ApRecord, status: InstallStatus) -> Vec<String> {
    vec![
        record.name.clone(),
        record.floor_name.clone(),
        record.location_image.clone().unwrap_or_default(),
        record.vendor.clone(),
        record.model.clone(),
        record.antenna_model.clone(),
        record.antenna_vendor.clone(),
        record.installation_type.clone(),
        format_height(record.height),
        format_tilt(record.tilt),
        record.bracket.clone(),
        record.service_loop.clone(),
        record.telecom_room().to_string(),
        format_distance(record.cable_length_m),
        status.label().to_string(),
    ]
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

/// 输出项目信息头、表头与全部记录。
pub fn render_report(
    sink: &mut dyn TableSink,
    meta: Option<&ProjectMeta>,
    records: &[ApRecord],
) -> Result<(), FrontendError> {
    if let Some(meta) = meta {
        sink.write_row(&row(&["Customer", meta.customer.as_str()]))?;
        sink.write_row(&row(&["Project", meta.title.as_str()]))?;
        sink.write_row(&row(&["Site Address", meta.location.as_str()]))?;
        sink.write_row(&[])?;
        sink.write_row(&row(&["Wi-Fi Designer", meta.responsible_person.as_str()]))?;
        sink.write_row(&[])?;
    }
    sink.write_row(&row(&["Wi-Fi Design Information"]))?;
    sink.write_row(&row(&COLUMNS))?;
    for record in records {
        sink.write_row(&record_row(record, InstallStatus::default()))?;
    }
    sink.finish()?;
    info!(rows = records.len(), "安装信息表已输出");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use esx_core::project::EntityId;

    fn record() -> ApRecord {
        ApRecord {
            access_point_id: EntityId::new("ap-1"),
            name: "AP-02".to_string(),
            floor_name: "Level 1".to_string(),
            floor_scale: Some(0.05),
            vendor: "Cisco".to_string(),
            model: "AIR-AP3802E-B-K9".to_string(),
            antenna_model: "AIR-ANT2524V4C-R".to_string(),
            antenna_vendor: "Cisco".to_string(),
            installation_type: "Wall".to_string(),
            height: Some(3.0),
            tilt: Some(-10.4),
            bracket: "Standard".to_string(),
            service_loop: "5m".to_string(),
            idf: "IDF-1".to_string(),
            room_name: Some("IDF-1".to_string()),
            cable_length_m: Some(25),
            location_image: None,
        }
    }

    #[test]
    fn row_matches_column_contract() {
        let cells = record_row(&record(), InstallStatus::default());
        assert_eq!(cells.len(), COLUMNS.len());
        assert_eq!(cells[0], "AP-02");
        assert_eq!(cells[2], "");
        assert_eq!(cells[8], "3m");
        assert_eq!(cells[9], "-10°");
        assert_eq!(cells[12], "IDF-1");
        assert_eq!(cells[13], "25m");
        assert_eq!(cells[14], "To be installed");
    }

    #[test]
    fn value_formatting() {
        assert_eq!(format_height(Some(2.5)), "2.5m");
        assert_eq!(format_height(None), "");
        assert_eq!(format_tilt(Some(0.0)), "0°");
        assert_eq!(format_tilt(Some(7.6)), "8°");
        assert_eq!(format_distance(None), "");
        let labels: Vec<&str> = InstallStatus::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["To be installed", "AP installed", "AP provisionned"]);
    }

    #[test]
    fn report_starts_with_project_header() {
        let meta = ProjectMeta {
            title: "Head Office Wi-Fi".to_string(),
            customer: "Example Corp".to_string(),
            location: "1 Main Street".to_string(),
            responsible_person: "Jordan Lee".to_string(),
            ..ProjectMeta::default()
        };
        let mut rows: Vec<Vec<String>> = Vec::new();
        render_report(&mut rows, Some(&meta), &[record()]).unwrap();
        assert_eq!(rows[0], vec!["Customer", "Example Corp"]);
        assert_eq!(rows[4], vec!["Wi-Fi Designer", "Jordan Lee"]);
        assert_eq!(rows[7].len(), COLUMNS.len());
        assert_eq!(rows.len(), 9);

        let mut headless: Vec<Vec<String>> = Vec::new();
        render_report(&mut headless, None, &[]).unwrap();
        assert_eq!(headless.len(), 2);
    }

    #[test]
    fn tsv_sink_escapes_separators() {
        let mut sink = TsvSink::new(Vec::new(), "memory.tsv");
        sink.write_row(&["a\tb".to_string(), "line\nbreak".to_string()])
            .unwrap();
        sink.finish().unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "a b\tline break\n");
    }
}
