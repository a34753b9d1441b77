use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use esx_core::project::{Collection, Extra, MemberPresence, Project, ProjectMeta};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;
use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("malformed archive: document `{document}` {reason}")]
    MalformedArchive { document: String, reason: String },
    #[error("failed to read {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode document `{document}`: {source}")]
    EncodeError {
        document: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("zip archive error: {0}")]
    Archive(#[from] ZipError),
}

impl IoError {
    fn malformed(kind: DocumentKind, reason: impl Into<String>) -> Self {
        Self::MalformedArchive {
            document: kind.file_name().to_string(),
            reason: reason.into(),
        }
    }
}

/// 项目归档中的 JSON 文档。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    AccessPoints,
    FloorPlans,
    SimulatedRadios,
    AntennaTypes,
    TagKeys,
    Notes,
    CableNotes,
    PictureNotes,
    Project,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 9] = [
        DocumentKind::AccessPoints,
        DocumentKind::FloorPlans,
        DocumentKind::SimulatedRadios,
        DocumentKind::AntennaTypes,
        DocumentKind::TagKeys,
        DocumentKind::Notes,
        DocumentKind::CableNotes,
        DocumentKind::PictureNotes,
        DocumentKind::Project,
    ];

    /// 顶层键名，同时也是文件名去掉 `.json` 的部分。
    pub fn root_key(self) -> &'static str {
        match self {
            DocumentKind::AccessPoints => "accessPoints",
            DocumentKind::FloorPlans => "floorPlans",
            DocumentKind::SimulatedRadios => "simulatedRadios",
            DocumentKind::AntennaTypes => "antennaTypes",
            DocumentKind::TagKeys => "tagKeys",
            DocumentKind::Notes => "notes",
            DocumentKind::CableNotes => "cableNotes",
            DocumentKind::PictureNotes => "pictureNotes",
            DocumentKind::Project => "project",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            DocumentKind::AccessPoints => "accessPoints.json",
            DocumentKind::FloorPlans => "floorPlans.json",
            DocumentKind::SimulatedRadios => "simulatedRadios.json",
            DocumentKind::AntennaTypes => "antennaTypes.json",
            DocumentKind::TagKeys => "tagKeys.json",
            DocumentKind::Notes => "notes.json",
            DocumentKind::CableNotes => "cableNotes.json",
            DocumentKind::PictureNotes => "pictureNotes.json",
            DocumentKind::Project => "project.json",
        }
    }
}

/// 某个操作必须存在的文档集合；其余文档缺失时按空集合处理。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    required: Vec<DocumentKind>,
}

impl Requirements {
    pub fn new(kinds: impl IntoIterator<Item = DocumentKind>) -> Self {
        let mut required: Vec<DocumentKind> = Vec::new();
        for kind in kinds {
            if !required.contains(&kind) {
                required.push(kind);
            }
        }
        Self { required }
    }

    pub fn all() -> Self {
        Self::new(DocumentKind::ALL)
    }

    #[inline]
    pub fn requires(&self, kind: DocumentKind) -> bool {
        self.required.contains(&kind)
    }

    #[inline]
    pub fn kinds(&self) -> impl Iterator<Item = DocumentKind> + '_ {
        self.required.iter().copied()
    }
}

/// 归档内图片条目的命名规则：`image-{id}`。
pub fn image_entry_name(image_id: &str) -> String {
    format!("image-{image_id}")
}

/// 按名称读取归档条目的协作边界。条目不存在时返回 `Ok(None)`。
pub trait ArchiveSource {
    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, IoError>;

    fn read_document(&mut self, kind: DocumentKind) -> Result<Option<Vec<u8>>, IoError> {
        self.read_entry(kind.file_name())
    }

    fn read_image(&mut self, image_id: &str) -> Result<Option<Vec<u8>>, IoError> {
        self.read_entry(&image_entry_name(image_id))
    }
}

/// 条目头声明的大小不可信，预分配最多 16 MiB。
const MAX_PREALLOCATED_ENTRY: u64 = 16 * 1024 * 1024;

fn preallocation_hint(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOCATED_ENTRY)).unwrap_or(0)
}

/// 直接读取 `.esx` zip 归档。
pub struct ZipArchiveSource<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl ZipArchiveSource<File> {
    pub fn open(path: &Path) -> Result<Self, IoError> {
        let file = File::open(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file)
    }
}

impl ZipArchiveSource<Cursor<Vec<u8>>> {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, IoError> {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> ZipArchiveSource<R> {
    pub fn new(reader: R) -> Result<Self, IoError> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.archive.file_names()
    }
}

impl<R: Read + Seek> ArchiveSource for ZipArchiveSource<R> {
    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, IoError> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut buffer = Vec::with_capacity(preallocation_hint(entry.size()));
        entry
            .read_to_end(&mut buffer)
            .map_err(|source| IoError::ReadError {
                path: PathBuf::from(name),
                source,
            })?;
        Ok(Some(buffer))
    }
}

/// 已解压的项目目录。
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArchiveSource for DirectorySource {
    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, IoError> {
        let path = self.root.join(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(IoError::ReadError { path, source }),
        }
    }
}

/// 内存中的条目表，便于测试与嵌入调用。
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(name.into(), bytes.into());
    }

    pub fn with_document(mut self, kind: DocumentKind, document: &Value) -> Self {
        self.insert(kind.file_name(), document.to_string());
        self
    }

    pub fn with_image(mut self, image_id: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(image_entry_name(image_id), bytes);
        self
    }
}

impl ArchiveSource for MemorySource {
    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, IoError> {
        Ok(self.entries.get(name).cloned())
    }
}

pub trait ProjectLoader {
    fn load(
        &self,
        source: &mut dyn ArchiveSource,
        requirements: &Requirements,
    ) -> Result<Project, IoError>;
}

/// `.esx` 项目文件的加载入口。
pub struct EsxFacade;

impl EsxFacade {
    pub fn new() -> Self {
        Self
    }

    /// 打开路径：目录视为已解压的项目，其余按 zip 归档处理。
    pub fn open_source(path: &Path) -> Result<Box<dyn ArchiveSource>, IoError> {
        if path.is_dir() {
            Ok(Box::new(DirectorySource::new(path)))
        } else {
            Ok(Box::new(ZipArchiveSource::open(path)?))
        }
    }
}

impl Default for EsxFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectLoader for EsxFacade {
    fn load(
        &self,
        source: &mut dyn ArchiveSource,
        requirements: &Requirements,
    ) -> Result<Project, IoError> {
        let mut project = Project::default();
        for kind in DocumentKind::ALL {
            let Some(bytes) = source.read_document(kind)? else {
                if requirements.requires(kind) {
                    return Err(IoError::malformed(kind, "is missing"));
                }
                debug!(document = kind.file_name(), "可选文档缺失，按空集合处理");
                continue;
            };
            match kind {
                DocumentKind::AccessPoints => {
                    project.access_points = parse_collection(kind, &bytes)?
                }
                DocumentKind::FloorPlans => project.floor_plans = parse_collection(kind, &bytes)?,
                DocumentKind::SimulatedRadios => project.radios = parse_collection(kind, &bytes)?,
                DocumentKind::AntennaTypes => {
                    project.antenna_types = parse_collection(kind, &bytes)?
                }
                DocumentKind::TagKeys => project.tag_keys = parse_collection(kind, &bytes)?,
                DocumentKind::Notes => project.notes = parse_collection(kind, &bytes)?,
                DocumentKind::CableNotes => project.cable_notes = parse_collection(kind, &bytes)?,
                DocumentKind::PictureNotes => {
                    project.picture_notes = parse_collection(kind, &bytes)?
                }
                DocumentKind::Project => project.meta = Some(parse_meta(&bytes)?),
            }
        }
        debug!(
            access_points = project.access_points.len(),
            floor_plans = project.floor_plans.len(),
            radios = project.radios.len(),
            cable_notes = project.cable_notes.len(),
            "项目文档加载完成"
        );
        Ok(project)
    }
}

fn parse_root(kind: DocumentKind, bytes: &[u8]) -> Result<(Value, Extra), IoError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|err| IoError::malformed(kind, format!("is not valid JSON: {err}")))?;
    let Value::Object(mut root) = value else {
        return Err(IoError::malformed(kind, "top level is not an object"));
    };
    let key = kind.root_key();
    let payload = root
        .remove(key)
        .ok_or_else(|| IoError::malformed(kind, format!("lacks top-level `{key}` member")))?;
    Ok((payload, root))
}

/// 解析单个实体文档：顶层对象中以复数实体名为键的数组。
pub fn parse_collection<T: DeserializeOwned>(
    kind: DocumentKind,
    bytes: &[u8],
) -> Result<Collection<T>, IoError> {
    let (payload, extra) = parse_root(kind, bytes)?;
    let Value::Array(raw_items) = payload else {
        return Err(IoError::malformed(
            kind,
            format!("member `{}` is not an array", kind.root_key()),
        ));
    };
    let presence = MemberPresence::record(&raw_items);
    let items: Vec<T> = serde_json::from_value(Value::Array(raw_items))
        .map_err(|err| IoError::malformed(kind, format!("has an invalid entry: {err}")))?;
    Ok(Collection {
        items,
        extra,
        presence,
    })
}

fn parse_meta(bytes: &[u8]) -> Result<ProjectMeta, IoError> {
    let kind = DocumentKind::Project;
    let (payload, _) = parse_root(kind, bytes)?;
    serde_json::from_value(payload)
        .map_err(|err| IoError::malformed(kind, format!("has invalid metadata: {err}")))
}

/// 将集合重新序列化为文档（四空格缩进）。输入中缺失且未被修改的成员不会写出。
pub fn serialize_collection<T: Serialize>(
    kind: DocumentKind,
    collection: &Collection<T>,
) -> Result<Vec<u8>, IoError> {
    let encode_error = |source| IoError::EncodeError {
        document: kind.file_name().to_string(),
        source,
    };
    let mut items = serde_json::to_value(&collection.items).map_err(encode_error)?;
    if let Value::Array(entries) = &mut items {
        for entry in entries {
            collection.presence.strip_defaults(entry);
        }
    }
    let mut root = collection.extra.clone();
    root.insert(kind.root_key().to_string(), items);

    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    Value::Object(root)
        .serialize(&mut serializer)
        .map_err(encode_error)?;
    Ok(buffer)
}

/// 回写产物的默认文件名：`{stem}{suffix}.esx`，与原文件同目录。
pub fn modified_archive_path(original: &Path, suffix: &str) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    original.with_file_name(format!("{stem}{suffix}.esx"))
}

/// 复制归档全部条目，并以 `replacements` 中的内容替换（或新增）同名条目。
pub fn repack_into<R, W>(
    original: R,
    replacements: &BTreeMap<String, Vec<u8>>,
    output: W,
) -> Result<W, IoError>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let mut archive = ZipArchive::new(original)?;
    let mut writer = ZipWriter::new(output);
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        if replacements.contains_key(entry.name()) {
            continue;
        }
        writer.raw_copy_file(entry)?;
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in replacements {
        writer.start_file(name.as_str(), options)?;
        writer
            .write_all(bytes)
            .map_err(|source| IoError::WriteError {
                path: PathBuf::from(name),
                source,
            })?;
    }
    Ok(writer.finish()?)
}

pub fn repack(
    original: &Path,
    replacements: &BTreeMap<String, Vec<u8>>,
    destination: &Path,
) -> Result<(), IoError> {
    let input = File::open(original).map_err(|source| IoError::ReadError {
        path: original.to_path_buf(),
        source,
    })?;
    let output = File::create(destination).map_err(|source| IoError::WriteError {
        path: destination.to_path_buf(),
        source,
    })?;
    repack_into(input, replacements, output)?;
    debug!(
        original = %original.display(),
        destination = %destination.display(),
        replaced = replacements.len(),
        "已重新打包项目文件"
    );
    Ok(())
}
