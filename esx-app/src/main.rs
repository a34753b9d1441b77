use std::path::PathBuf;

use esx_config::{AppConfig, ConfigError};
use esx_frontend::{CliCommand, Invocation};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const USAGE: &str = "用法: esx [--config PATH] <command> <archive> [--out DIR]";

#[derive(Debug, PartialEq, Eq)]
struct Arguments {
    config: Option<PathBuf>,
    invocation: Invocation,
}

fn main() {
    let arguments = match parse_arguments(std::env::args().skip(1)) {
        Ok(arguments) => arguments,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            let commands: Vec<&str> = CliCommand::ALL.iter().map(|c| c.name()).collect();
            eprintln!("可用命令: {}", commands.join(", "));
            std::process::exit(1);
        }
    };

    let config = load_configuration(arguments.config);
    init_logging(&config);
    info!("启动 ESX 工具");

    if let Err(err) = esx_frontend::run_cli(&arguments.invocation, &config) {
        error!(
            command = arguments.invocation.command.name(),
            error = %err,
            "命令执行失败"
        );
        std::process::exit(1);
    }
}

fn parse_arguments(args: impl IntoIterator<Item = String>) -> Result<Arguments, String> {
    let mut args = args.into_iter();
    let mut config = None;
    let mut out_dir = None;
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("`--config` 需要提供配置文件路径")?;
                config = Some(PathBuf::from(path));
            }
            "--out" => {
                let path = args.next().ok_or("`--out` 需要提供输出目录")?;
                out_dir = Some(PathBuf::from(path));
            }
            other if other.starts_with("--") => return Err(format!("未知参数：{other}")),
            _ => positional.push(arg),
        }
    }

    let [command, archive] = <[String; 2]>::try_from(positional)
        .map_err(|found| format!("需要命令与项目文件两个参数，实际为 {}", found.len()))?;
    let command =
        CliCommand::from_name(&command).ok_or_else(|| format!("未知命令：{command}"))?;
    Ok(Arguments {
        config,
        invocation: Invocation {
            command,
            archive: PathBuf::from(archive),
            out_dir,
        },
    })
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Arguments, String> {
        parse_arguments(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn options_may_surround_positionals() {
        let arguments = parse(&["--config", "esx.toml", "export", "site.esx", "--out", "out"])
            .expect("参数解析失败");
        assert_eq!(arguments.config, Some(PathBuf::from("esx.toml")));
        assert_eq!(arguments.invocation.command, CliCommand::Export);
        assert_eq!(arguments.invocation.archive, PathBuf::from("site.esx"));
        assert_eq!(arguments.invocation.out_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        assert!(parse(&["export"]).unwrap_err().contains("两个参数"));
        assert!(parse(&["upload", "site.esx"]).unwrap_err().contains("upload"));
        assert!(parse(&["grid", "site.esx", "--out"]).is_err());
        assert!(parse(&["--verbose", "grid", "site.esx"]).is_err());
    }
}
