use std::path::PathBuf;

use esx_engine::errors::EngineError;
use esx_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("无法解码图片 `{image_id}`: {source}")]
    Image {
        image_id: String,
        #[source]
        source: image::ImageError,
    },
    #[error("写入 {path:?} 失败: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("保存图片 {path:?} 失败: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("未知命令: {0}")]
    UnknownCommand(String),
    #[error("命令 `{name}` 执行失败: {message}")]
    CommandFailed { name: String, message: String },
    #[error("回写需要 .esx 归档文件，{0:?} 是目录")]
    RepackRequiresArchive(PathBuf),
    #[error("输出路径 {0:?} 与输入归档相同，拒绝覆盖")]
    WouldOverwriteSource(PathBuf),
}
