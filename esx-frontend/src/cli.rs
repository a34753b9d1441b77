use std::fs;
use std::path::{Path, PathBuf};

use esx_config::AppConfig;
use esx_engine::command::{CommandBus, CommandContext, CommandRequest, WriteBack};
use esx_engine::index::ProjectIndex;
use esx_engine::{photos, pipeline};
use esx_io::{DocumentKind, Requirements};
use tracing::{info, warn};

use crate::annotator::{AnnotationStyle, annotate_project};
use crate::errors::FrontendError;
use crate::loader::{
    LoadedProject, ProjectSource, antenna_policy, enrichment_options, load_project, room_policy,
};
use crate::resource_locator::{OutputLayout, ensure_parent, same_file};
use crate::sheet::{TsvSink, render_report};

/// 命令行支持的子命令。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliCommand {
    Export,
    Grid,
    TagAntenna,
    UpdateModel,
    RenameCableNotes,
    ExtractImages,
}

impl CliCommand {
    pub const ALL: [CliCommand; 6] = [
        CliCommand::Export,
        CliCommand::Grid,
        CliCommand::TagAntenna,
        CliCommand::UpdateModel,
        CliCommand::RenameCableNotes,
        CliCommand::ExtractImages,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CliCommand::Export => "export",
            CliCommand::Grid => "grid",
            CliCommand::TagAntenna => "tag-antenna",
            CliCommand::UpdateModel => "update-model",
            CliCommand::RenameCableNotes => "rename-cable-notes",
            CliCommand::ExtractImages => "extract-images",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.name() == name)
    }

    /// 是否生成新的 `.esx` 归档。
    pub fn is_write_back(self) -> bool {
        matches!(
            self,
            CliCommand::TagAntenna | CliCommand::UpdateModel | CliCommand::RenameCableNotes
        )
    }
}

/// 一次命令行调用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: CliCommand,
    pub archive: PathBuf,
    pub out_dir: Option<PathBuf>,
}

/// 命令执行结果：摘要信息与写出的文件。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub messages: Vec<String>,
    pub written: Vec<PathBuf>,
}

impl Outcome {
    fn note(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }
}

fn requirements(command: CliCommand, bus: &CommandBus) -> Result<Requirements, FrontendError> {
    match command {
        CliCommand::Export => Ok(pipeline::requirements()),
        CliCommand::Grid => Ok(Requirements::new([
            DocumentKind::AccessPoints,
            DocumentKind::FloorPlans,
        ])),
        CliCommand::ExtractImages => Ok(photos::requirements()),
        write_back => bus
            .requirements_for(write_back.name())
            .ok_or_else(|| FrontendError::UnknownCommand(write_back.name().to_string())),
    }
}

/// 执行一次调用。
pub fn run(invocation: &Invocation, config: &AppConfig) -> Result<Outcome, FrontendError> {
    let bus = CommandBus::new();
    let command = invocation.command;
    if command.is_write_back() && invocation.archive.is_dir() {
        return Err(FrontendError::RepackRequiresArchive(invocation.archive.clone()));
    }

    let requirements = requirements(command, &bus)?;
    let loaded = load_project(&invocation.archive, &requirements)?;
    let layout = OutputLayout::from_config(invocation.out_dir.as_deref(), config);
    info!(command = command.name(), output = %layout.root().display(), "开始执行命令");

    match command {
        CliCommand::Export => run_export(loaded, &layout, config),
        CliCommand::Grid => run_grid(loaded, &layout, config),
        CliCommand::ExtractImages => run_extract_images(loaded, &layout),
        write_back => run_write_back(&bus, write_back, loaded, &layout, config),
    }
}

fn run_export(
    mut loaded: LoadedProject,
    layout: &OutputLayout,
    config: &AppConfig,
) -> Result<Outcome, FrontendError> {
    let index = ProjectIndex::build(&loaded.project)?.with_antenna_policy(antenna_policy(config));
    // 图片不依赖标签，先于表格生成
    let style = AnnotationStyle::from_config(&config.annotator);
    let annotation = annotate_project(&index, loaded.archive.as_mut(), layout, &style)?;

    let mut records = pipeline::enrich(&index, &enrichment_options(config)).inspect_err(|err| {
        warn!(
            error = %err,
            grid_images = annotation.grid_images.len(),
            location_images = annotation.location_images.len(),
            "无法生成安装信息表，已写出的图片保留"
        );
    })?;
    pipeline::attach_location_images(&mut records, &annotation.location_image_map());

    let report_path = layout.report_path();
    let mut sink = TsvSink::create(&report_path)?;
    render_report(&mut sink, loaded.project.meta.as_ref(), &records)?;

    let mut outcome = Outcome::default();
    outcome.note(format!("已导出 {} 个 AP 的安装信息", records.len()));
    for floor in &annotation.skipped_floors {
        outcome.note(format!("楼层 {floor} 缺少底图，未生成网格"));
    }
    outcome.written.extend(annotation.grid_images);
    outcome
        .written
        .extend(annotation.location_images.into_iter().map(|(_, path)| path));
    outcome.written.push(report_path);
    Ok(outcome)
}

fn run_grid(
    mut loaded: LoadedProject,
    layout: &OutputLayout,
    config: &AppConfig,
) -> Result<Outcome, FrontendError> {
    let index = ProjectIndex::build(&loaded.project)?;
    let style = AnnotationStyle::from_config(&config.annotator);
    let annotation = annotate_project(&index, loaded.archive.as_mut(), layout, &style)?;

    let mut outcome = Outcome::default();
    outcome.note(format!(
        "已生成 {} 张网格平面图、{} 张 AP 位置图",
        annotation.grid_images.len(),
        annotation.location_images.len()
    ));
    outcome.written.extend(annotation.grid_images);
    outcome
        .written
        .extend(annotation.location_images.into_iter().map(|(_, path)| path));
    Ok(outcome)
}

fn run_extract_images(
    mut loaded: LoadedProject,
    layout: &OutputLayout,
) -> Result<Outcome, FrontendError> {
    let index = ProjectIndex::build(&loaded.project)?;
    let plan = photos::plan_photo_extraction(&index);

    let mut outcome = Outcome::default();
    for copy in &plan {
        let Some(bytes) = loaded.archive.read_image(copy.image_id.as_str())? else {
            warn!(image = %copy.image_id, file = %copy.file_name, "归档中缺少图片，跳过");
            outcome.note(format!("缺少图片 {}", copy.image_id));
            continue;
        };
        let path = layout.photo_path(&copy.floor_name, &copy.file_name);
        ensure_parent(&path)?;
        fs::write(&path, bytes).map_err(|source| FrontendError::Write {
            path: path.clone(),
            source,
        })?;
        info!(access_point = %copy.access_point_id, path = %path.display(), "已导出 AP 照片");
        outcome.written.push(path);
    }
    outcome.note(format!("已导出 {} 张 AP 照片", outcome.written.len()));
    Ok(outcome)
}

fn run_write_back(
    bus: &CommandBus,
    command: CliCommand,
    loaded: LoadedProject,
    layout: &OutputLayout,
    config: &AppConfig,
) -> Result<Outcome, FrontendError> {
    let archive_path = match &loaded.source {
        ProjectSource::Archive(path) => path.clone(),
        ProjectSource::Directory(path) => {
            return Err(FrontendError::RepackRequiresArchive(path.clone()));
        }
    };
    let index = ProjectIndex::build(&loaded.project)?.with_antenna_policy(antenna_policy(config));
    let policy = room_policy(config);
    let mut output = WriteBack::default();
    let mut context = CommandContext {
        index: &index,
        room_policy: &policy,
        output: &mut output,
    };

    let message = dispatch_cli_command(bus, command.name(), &mut context).map_err(|message| {
        FrontendError::CommandFailed {
            name: command.name().to_string(),
            message,
        }
    })?;

    let destination = layout.modified_archive_path(&archive_path);
    write_modified_archive(&archive_path, &output, &destination)?;

    let mut outcome = Outcome::default();
    outcome.note(message);
    outcome.written.push(destination);
    Ok(outcome)
}

fn dispatch_cli_command(
    bus: &CommandBus,
    name: &str,
    context: &mut CommandContext<'_, '_>,
) -> Result<String, String> {
    let response = bus.dispatch(&CommandRequest::new(name), context);
    if response.success {
        let message = response.message.unwrap_or_default();
        println!("[命令] {message}");
        Ok(message)
    } else {
        Err(response.message.unwrap_or_else(|| "未知错误".to_string()))
    }
}

fn write_modified_archive(
    original: &Path,
    output: &WriteBack,
    destination: &Path,
) -> Result<(), FrontendError> {
    if same_file(original, destination) {
        return Err(FrontendError::WouldOverwriteSource(destination.to_path_buf()));
    }
    let replacements = output.replacements()?;
    ensure_parent(destination)?;
    esx_io::repack(original, &replacements, destination)?;
    info!(
        destination = %destination.display(),
        documents = replacements.len(),
        "已生成修改后的项目文件"
    );
    Ok(())
}

/// 打印命令摘要。
pub fn print_outcome(command: CliCommand, outcome: &Outcome) {
    println!("[{}]", command.name());
    for message in &outcome.messages {
        println!("  {message}");
    }
    if !outcome.written.is_empty() {
        println!("写出的文件：");
        for path in &outcome.written {
            println!("  - {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use esx_io::{ArchiveSource, EsxFacade, ProjectLoader, ZipArchiveSource};

    fn invocation(command: CliCommand, archive: &Path, out: &Path) -> Invocation {
        Invocation {
            command,
            archive: archive.to_path_buf(),
            out_dir: Some(out.to_path_buf()),
        }
    }

    #[test]
    fn command_names_round_trip() {
        for command in CliCommand::ALL {
            assert_eq!(CliCommand::from_name(command.name()), Some(command));
        }
        assert_eq!(CliCommand::from_name("upload"), None);
        assert!(CliCommand::TagAntenna.is_write_back());
        assert!(!CliCommand::Export.is_write_back());
    }

    #[test]
    fn export_writes_report_and_images() {
        let workspace = tempfile::tempdir().expect("创建临时目录失败");
        let project_dir = fixtures::write_project_dir(workspace.path());
        let out = workspace.path().join("out");

        let outcome = run(
            &invocation(CliCommand::Export, &project_dir, &out),
            &AppConfig::default(),
        )
        .expect("导出失败");

        let report = fs::read_to_string(out.join("ap-install-details.tsv")).expect("报表缺失");
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "Customer\tExample Corp");
        assert!(lines[7].starts_with("AP Name\tAP Location\tLocation Image"));
        assert!(lines[8].starts_with("AP-01\tLevel 1\t"));
        let ap02: Vec<&str> = lines[9].split('\t').collect();
        assert_eq!(ap02[0], "AP-02");
        assert!(ap02[2].ends_with("AP-02-location.png"));
        assert_eq!(ap02[5], "AIR-ANT2524V4C-R");
        assert_eq!(ap02[9], "-10°");
        assert_eq!(ap02[13], "25m");
        assert_eq!(ap02[14], "To be installed");

        assert!(out.join("image-img-floor-1-grid.png").is_file());
        assert!(outcome.written.contains(&out.join("ap-install-details.tsv")));
    }

    #[test]
    fn export_keeps_images_when_report_tag_key_is_missing() {
        let workspace = tempfile::tempdir().unwrap();
        let project_dir = fixtures::write_project_dir(workspace.path());
        let tag_keys = serde_json::json!({ "tagKeys": [
            { "id": "tk-install", "key": "installation-type" },
            { "id": "tk-loop", "key": "service-loop" },
            { "id": "tk-idf", "key": "IDF" }
        ] });
        fs::write(project_dir.join("tagKeys.json"), tag_keys.to_string()).unwrap();
        let out = workspace.path().join("out");

        let err = run(
            &invocation(CliCommand::Export, &project_dir, &out),
            &AppConfig::default(),
        )
        .expect_err("缺少 bracket 标签键时表格应失败");
        assert!(err.to_string().contains("bracket"));
        assert!(out.join("image-img-floor-1-grid.png").is_file());
        assert!(!out.join("ap-install-details.tsv").exists());
    }

    #[test]
    fn extract_images_copies_note_photos() {
        let workspace = tempfile::tempdir().unwrap();
        let project_dir = fixtures::write_project_dir(workspace.path());
        let out = workspace.path().join("out");

        let outcome = run(
            &invocation(CliCommand::ExtractImages, &project_dir, &out),
            &AppConfig::default(),
        )
        .expect("导出照片失败");

        let photo_dir = out.join("AP-Images").join("Level 1");
        assert_eq!(
            fs::read(photo_dir.join("AP-02-1.png")).unwrap(),
            fixtures::PHOTO_A.to_vec()
        );
        assert!(photo_dir.join("AP-02-2.png").is_file());
        assert_eq!(outcome.written.len(), 2);
    }

    #[test]
    fn write_back_requires_an_archive_file() {
        let workspace = tempfile::tempdir().unwrap();
        let project_dir = fixtures::write_project_dir(workspace.path());
        let err = run(
            &invocation(CliCommand::TagAntenna, &project_dir, workspace.path()),
            &AppConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FrontendError::RepackRequiresArchive(_)));
    }

    #[test]
    fn rename_cable_notes_produces_modified_archive() {
        let workspace = tempfile::tempdir().unwrap();
        let archive = fixtures::write_project_zip(workspace.path(), "Office.esx");
        let out = workspace.path().join("out");

        let outcome = run(
            &invocation(CliCommand::RenameCableNotes, &archive, &out),
            &AppConfig::default(),
        )
        .expect("重命名线缆备注失败");

        let modified = out.join("Office_modified.esx");
        assert_eq!(outcome.written, vec![modified.clone()]);
        let mut source = ZipArchiveSource::open(&modified).expect("打开修改后的归档失败");
        assert!(source.read_image("img-floor-1").unwrap().is_some());
        let project = EsxFacade::new()
            .load(&mut source, &Requirements::all())
            .expect("加载修改后的归档失败");
        let note = project
            .notes
            .iter()
            .find(|note| note.id.as_str() == "note-cable")
            .unwrap();
        assert_eq!(note.text, "From IDF-1 to AP-02");
    }

    #[test]
    fn tag_antenna_honours_configured_suffix() {
        let workspace = tempfile::tempdir().unwrap();
        let archive = fixtures::write_project_zip(workspace.path(), "Office.esx");
        let mut config = AppConfig::default();
        config.output.modified_suffix = "_tagged".to_string();

        let outcome = run(
            &invocation(CliCommand::TagAntenna, &archive, workspace.path()),
            &config,
        )
        .expect("写入天线标签失败");
        assert_eq!(outcome.written, vec![workspace.path().join("Office_tagged.esx")]);
        assert!(outcome.messages[0].contains('3'));
    }

    #[test]
    fn write_back_refuses_to_overwrite_input_archive() {
        let workspace = tempfile::tempdir().unwrap();
        let archive = fixtures::write_project_zip(workspace.path(), "Office.esx");
        let before = fs::read(&archive).unwrap();
        let mut config = AppConfig::default();
        config.output.modified_suffix = String::new();

        let err = run(
            &invocation(CliCommand::RenameCableNotes, &archive, workspace.path()),
            &config,
        )
        .expect_err("输出与输入相同时应拒绝");
        assert!(matches!(err, FrontendError::WouldOverwriteSource(_)));
        assert_eq!(fs::read(&archive).unwrap(), before);
    }
}
