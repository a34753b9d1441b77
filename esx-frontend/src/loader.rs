use std::path::{Path, PathBuf};

use esx_config::AppConfig;
use esx_core::project::Project;
use esx_engine::index::AntennaPolicy;
use esx_engine::matching::TelecomRoomPolicy;
use esx_engine::pipeline::EnrichmentOptions;
use esx_io::{ArchiveSource, EsxFacade, ProjectLoader, Requirements};
use tracing::info;

use crate::errors::FrontendError;

/// 项目来源，便于前端呈现加载信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSource {
    Archive(PathBuf),
    Directory(PathBuf),
}

impl ProjectSource {
    pub fn path(&self) -> &Path {
        match self {
            ProjectSource::Archive(path) | ProjectSource::Directory(path) => path,
        }
    }
}

/// 加载后的项目与仍可读取图片的归档句柄。
pub struct LoadedProject {
    pub project: Project,
    pub source: ProjectSource,
    pub archive: Box<dyn ArchiveSource>,
}

/// 打开 `.esx` 归档（或已解压目录）并加载操作所需的文档。
pub fn load_project(path: &Path, requirements: &Requirements) -> Result<LoadedProject, FrontendError> {
    let source = if path.is_dir() {
        ProjectSource::Directory(path.to_path_buf())
    } else {
        ProjectSource::Archive(path.to_path_buf())
    };
    let mut archive = EsxFacade::open_source(path)?;
    let project = EsxFacade::new().load(archive.as_mut(), requirements)?;
    info!(
        path = %source.path().display(),
        access_points = project.access_points.len(),
        floor_plans = project.floor_plans.len(),
        "项目加载成功"
    );
    Ok(LoadedProject {
        project,
        source,
        archive,
    })
}

pub fn antenna_policy(config: &AppConfig) -> AntennaPolicy {
    AntennaPolicy::new(config.enrichment.integrated_antenna_markers.iter().cloned())
}

pub fn room_policy(config: &AppConfig) -> TelecomRoomPolicy {
    TelecomRoomPolicy::new(config.enrichment.telecom_room_markers.iter().cloned())
}

pub fn enrichment_options(config: &AppConfig) -> EnrichmentOptions {
    let enrichment = &config.enrichment;
    EnrichmentOptions {
        not_applicable: enrichment.not_applicable.clone(),
        default_bracket: enrichment.default_bracket.clone(),
        default_service_loop: enrichment.default_service_loop.clone(),
        default_idf: enrichment.default_idf.clone(),
        room_policy: room_policy(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_mirror_configuration() {
        let mut config = AppConfig::default();
        config.enrichment.default_bracket = "Rail".to_string();
        config.enrichment.telecom_room_markers = vec!["Comms".to_string()];
        config.enrichment.integrated_antenna_markers = vec!["AP-5".to_string()];

        let options = enrichment_options(&config);
        assert_eq!(options.default_bracket, "Rail");
        assert_eq!(options.not_applicable, "N/A");
        assert!(options.room_policy.matches("Comms room 2"));
        assert!(!options.room_policy.matches("IDF-1"));
        assert!(antenna_policy(&config).excludes("AP-515"));
        assert!(!antenna_policy(&config).excludes("AP3802i"));
    }

    #[test]
    fn missing_archive_reports_read_error() {
        let err = load_project(Path::new("/nonexistent/site.esx"), &Requirements::default())
            .err()
            .expect("不存在的文件应加载失败");
        assert!(matches!(err, FrontendError::Io(esx_io::IoError::ReadError { .. })));
    }
}
