use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use esx_config::AppConfig;
use esx_engine::photos::sanitize_file_name;
use esx_io::modified_archive_path;
use tracing::{debug, trace};

use crate::errors::FrontendError;

/// 所有输出文件的目录布局。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    location_dir: PathBuf,
    photo_dir: PathBuf,
    report_name: String,
    modified_suffix: String,
}

impl OutputLayout {
    /// 输出根目录优先级：命令行 `--out` > 配置 `output.root` > 当前工作目录。
    pub fn from_config(out_override: Option<&Path>, config: &AppConfig) -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let root = match out_override.or(config.output.root.as_deref()) {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => cwd.join(path),
            None => cwd,
        };
        trace!(root = %root.display(), "输出目录已确定");
        Self {
            location_dir: root.join(&config.output.location_dir),
            photo_dir: root.join(&config.output.photo_dir),
            report_name: config.output.report_name.clone(),
            modified_suffix: config.output.modified_suffix.clone(),
            root,
        }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 叠加网格后的平面图：`image-{imageId}-grid.png`。
    pub fn grid_image_path(&self, image_id: &str) -> PathBuf {
        self.root
            .join(format!("image-{}-grid.png", sanitize_file_name(image_id)))
    }

    /// AP 位置图：`{locationDir}/{楼层}/{AP}-location.png`。
    pub fn location_image_path(&self, floor_name: &str, ap_name: &str) -> PathBuf {
        self.location_dir
            .join(sanitize_file_name(floor_name))
            .join(format!("{}-location.png", sanitize_file_name(ap_name)))
    }

    /// AP 照片：`{photoDir}/{楼层}/{文件名}`。
    pub fn photo_path(&self, floor_name: &str, file_name: &str) -> PathBuf {
        self.photo_dir
            .join(sanitize_file_name(floor_name))
            .join(sanitize_file_name(file_name))
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(sanitize_file_name(&self.report_name))
    }

    /// 回写后的归档：`{stem}{suffix}.esx`，位于输出根目录。
    pub fn modified_archive_path(&self, archive: &Path) -> PathBuf {
        let modified = modified_archive_path(archive, &self.modified_suffix);
        match modified.file_name() {
            Some(name) => self.root.join(name),
            None => modified,
        }
    }
}

/// 确保文件的父目录存在。
pub fn ensure_parent(path: &Path) -> Result<(), FrontendError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(parent).map_err(|source| FrontendError::Write {
        path: parent.to_path_buf(),
        source,
    })?;
    debug!(path = %parent.display(), "已创建输出目录");
    Ok(())
}

/// 两个路径是否指向同一文件；目标文件可以尚不存在。
pub fn same_file(left: &Path, right: &Path) -> bool {
    match (resolve(left), resolve(right)) {
        (Some(left), Some(right)) => left == right,
        _ => left == right,
    }
}

fn resolve(path: &Path) -> Option<PathBuf> {
    if let Ok(resolved) = path.canonicalize() {
        return Some(resolved);
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Some(parent.canonicalize().ok()?.join(path.file_name()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(root: &Path) -> OutputLayout {
        OutputLayout::from_config(Some(root), &AppConfig::default())
    }

    #[test]
    fn paths_follow_default_layout() {
        let layout = layout(Path::new("/srv/out"));
        assert_eq!(layout.root(), Path::new("/srv/out"));
        assert_eq!(
            layout.grid_image_path("img-floor-1"),
            PathBuf::from("/srv/out/image-img-floor-1-grid.png")
        );
        assert_eq!(
            layout.location_image_path("Level 1", "AP-02"),
            PathBuf::from("/srv/out/AP-Location-Images/Level 1/AP-02-location.png")
        );
        assert_eq!(
            layout.photo_path("Level 1", "AP-02-1.png"),
            PathBuf::from("/srv/out/AP-Images/Level 1/AP-02-1.png")
        );
        assert_eq!(
            layout.report_path(),
            PathBuf::from("/srv/out/ap-install-details.tsv")
        );
        assert_eq!(
            layout.modified_archive_path(Path::new("/data/Office.esx")),
            PathBuf::from("/srv/out/Office_modified.esx")
        );
    }

    #[test]
    fn names_cannot_escape_output_directory() {
        let layout = layout(Path::new("/srv/out"));
        let path = layout.location_image_path("../etc", "a/b");
        assert_eq!(
            path,
            PathBuf::from("/srv/out/AP-Location-Images/.._etc/a_b-location.png")
        );
    }

    #[test]
    fn relative_override_is_resolved_against_cwd() {
        let layout = layout(Path::new("reports"));
        assert!(layout.root().is_absolute());
        assert!(layout.root().ends_with("reports"));
    }

    #[test]
    fn ensure_parent_creates_nested_directories() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let target = dir.path().join("a").join("b").join("file.png");
        ensure_parent(&target).expect("创建父目录失败");
        assert!(dir.path().join("a").join("b").is_dir());
        ensure_parent(&target).expect("重复创建应成功");
    }

    #[test]
    fn same_file_sees_through_relative_segments() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("Office.esx");
        fs::write(&archive, b"zip").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        assert!(same_file(&archive, &dir.path().join("sub").join("..").join("Office.esx")));
        assert!(!same_file(&archive, &dir.path().join("Office_modified.esx")));
    }
}
