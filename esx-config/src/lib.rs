use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "ESX_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub annotator: AnnotatorConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `ESX_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 平面图网格与 AP 标记的绘制参数。
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotatorConfig {
    #[serde(default = "AnnotatorConfig::default_grid_columns")]
    pub grid_columns: u32,
    #[serde(default = "AnnotatorConfig::default_line_width")]
    pub line_width: u32,
    #[serde(default = "AnnotatorConfig::default_marker_radius")]
    pub marker_radius: u32,
    /// 标签字形的放大倍数（每个字形为 5×7 点阵）。
    #[serde(default = "AnnotatorConfig::default_label_scale")]
    pub label_scale: u32,
    #[serde(default = "AnnotatorConfig::default_color")]
    pub color: [u8; 3],
}

impl AnnotatorConfig {
    fn default_grid_columns() -> u32 {
        15
    }

    fn default_line_width() -> u32 {
        3
    }

    fn default_marker_radius() -> u32 {
        20
    }

    fn default_label_scale() -> u32 {
        6
    }

    fn default_color() -> [u8; 3] {
        [255, 0, 0]
    }
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            grid_columns: Self::default_grid_columns(),
            line_width: Self::default_line_width(),
            marker_radius: Self::default_marker_radius(),
            label_scale: Self::default_label_scale(),
            color: Self::default_color(),
        }
    }
}

/// 安装信息富化的默认取值与匹配规则。
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "EnrichmentConfig::default_not_applicable")]
    pub not_applicable: String,
    #[serde(default = "EnrichmentConfig::default_bracket")]
    pub default_bracket: String,
    #[serde(default = "EnrichmentConfig::default_service_loop")]
    pub default_service_loop: String,
    #[serde(default)]
    pub default_idf: String,
    #[serde(default = "EnrichmentConfig::default_integrated_antenna_markers")]
    pub integrated_antenna_markers: Vec<String>,
    #[serde(default = "EnrichmentConfig::default_telecom_room_markers")]
    pub telecom_room_markers: Vec<String>,
}

impl EnrichmentConfig {
    fn default_not_applicable() -> String {
        "N/A".to_string()
    }

    fn default_bracket() -> String {
        "Standard".to_string()
    }

    fn default_service_loop() -> String {
        "5m".to_string()
    }

    fn default_integrated_antenna_markers() -> Vec<String> {
        vec!["802i".to_string()]
    }

    fn default_telecom_room_markers() -> Vec<String> {
        ["IDF", "MDF", "Rack"].map(String::from).to_vec()
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            not_applicable: Self::default_not_applicable(),
            default_bracket: Self::default_bracket(),
            default_service_loop: Self::default_service_loop(),
            default_idf: String::new(),
            integrated_antenna_markers: Self::default_integrated_antenna_markers(),
            telecom_room_markers: Self::default_telecom_room_markers(),
        }
    }
}

/// 输出目录布局。相对路径以 `root` 为基准。
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "OutputConfig::default_location_dir")]
    pub location_dir: PathBuf,
    #[serde(default = "OutputConfig::default_photo_dir")]
    pub photo_dir: PathBuf,
    #[serde(default = "OutputConfig::default_report_name")]
    pub report_name: String,
    #[serde(default = "OutputConfig::default_modified_suffix")]
    pub modified_suffix: String,
}

impl OutputConfig {
    fn default_location_dir() -> PathBuf {
        PathBuf::from("AP-Location-Images")
    }

    fn default_photo_dir() -> PathBuf {
        PathBuf::from("AP-Images")
    }

    fn default_report_name() -> String {
        "ap-install-details.tsv".to_string()
    }

    fn default_modified_suffix() -> String {
        "_modified".to_string()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: None,
            location_dir: Self::default_location_dir(),
            photo_dir: Self::default_photo_dir(),
            report_name: Self::default_report_name(),
            modified_suffix: Self::default_modified_suffix(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
