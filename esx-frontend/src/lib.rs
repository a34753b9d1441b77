pub mod annotator;
pub mod cli;
pub mod errors;
pub mod glyphs;
pub mod loader;
pub mod resource_locator;
pub mod sheet;

use esx_config::AppConfig;
use errors::FrontendError;
use tracing::info;

pub use cli::{CliCommand, Invocation, Outcome};

/// 执行一次命令行调用并打印摘要。
pub fn run_cli(invocation: &Invocation, config: &AppConfig) -> Result<(), FrontendError> {
    info!(
        command = invocation.command.name(),
        archive = %invocation.archive.display(),
        "启动命令行前端"
    );
    let outcome = cli::run(invocation, config)?;
    cli::print_outcome(invocation.command, &outcome);
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::io::{Cursor, Write};
    use std::path::{Path, PathBuf};

    use esx_core::project::Project;
    use esx_io::{
        DirectorySource, EsxFacade, MemorySource, ProjectLoader, Requirements, image_entry_name,
    };
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use zip::write::SimpleFileOptions;

    pub const SAMPLE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../esx-io/tests/data/sample");
    pub const PHOTO_A: &[u8] = b"photo-a";
    pub const PHOTO_B: &[u8] = b"photo-b";

    pub fn sample_project() -> Project {
        let mut source = DirectorySource::new(SAMPLE_DIR);
        EsxFacade::new()
            .load(&mut source, &Requirements::all())
            .expect("加载示例项目失败")
    }

    pub fn white_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("编码 PNG 失败");
        bytes
    }

    pub fn image_source(images: &[(&str, u32, u32)]) -> MemorySource {
        images
            .iter()
            .fold(MemorySource::new(), |source, (id, width, height)| {
                source.with_image(id, white_png(*width, *height))
            })
    }

    /// 示例文档与图片条目：平面图 150×100，两张 AP 照片。
    fn sample_entries() -> Vec<(String, Vec<u8>)> {
        let mut entries: Vec<(String, Vec<u8>)> = fs::read_dir(SAMPLE_DIR)
            .expect("读取示例目录失败")
            .map(|entry| {
                let path = entry.expect("读取目录项失败").path();
                let name = path
                    .file_name()
                    .expect("缺少文件名")
                    .to_string_lossy()
                    .into_owned();
                (name, fs::read(&path).expect("读取示例文件失败"))
            })
            .collect();
        entries.sort();
        entries.push((image_entry_name("img-floor-1"), white_png(150, 100)));
        entries.push((image_entry_name("img-ap1-a"), PHOTO_A.to_vec()));
        entries.push((image_entry_name("img-ap1-b"), PHOTO_B.to_vec()));
        entries
    }

    pub fn write_project_dir(root: &Path) -> PathBuf {
        let dir = root.join("project");
        fs::create_dir_all(&dir).expect("创建项目目录失败");
        for (name, bytes) in sample_entries() {
            fs::write(dir.join(name), bytes).expect("写入项目文件失败");
        }
        dir
    }

    pub fn write_project_zip(root: &Path, file_name: &str) -> PathBuf {
        let path = root.join(file_name);
        let file = fs::File::create(&path).expect("创建归档失败");
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, bytes) in sample_entries() {
            writer.start_file(name, options).expect("写入条目头失败");
            writer.write_all(&bytes).expect("写入条目失败");
        }
        writer.finish().expect("完成归档失败");
        path
    }
}
