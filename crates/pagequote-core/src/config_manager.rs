//! 설정 파일 관리.
//!
//! 플랫폼 설정 디렉토리(또는 지정 경로)의 `config.json`을 읽고 쓴다.
//! 파일이 없으면 기본 설정으로 새로 만든다.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::CoreError;

const CONFIG_FILE_NAME: &str = "config.json";

/// JSON 설정 파일과 현재 설정 스냅샷
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
    config_path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 기본 위치의 설정 파일 사용
    pub fn new() -> Result<Self, CoreError> {
        Self::with_path(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// 지정 경로의 설정 파일 사용 (상위 디렉토리까지 생성)
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| config_error("설정 디렉토리 생성 실패", parent, e))?;
                info!(dir = %parent.display(), "설정 디렉토리 생성");
            }
        }

        let config = if config_path.exists() {
            read_config(&config_path)?
        } else {
            let config = AppConfig::default_config();
            write_config(&config_path, &config)?;
            info!(path = %config_path.display(), "기본 설정 파일 생성");
            config
        };

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// 현재 설정 복제본
    pub fn get(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// 검증을 통과한 설정만 파일과 메모리에 반영
    pub fn update(&self, new_config: AppConfig) -> Result<(), CoreError> {
        new_config.validate()?;
        write_config(&self.config_path, &new_config)?;
        *self.config.write() = new_config;
        debug!(path = %self.config_path.display(), "설정 저장");
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Linux `~/.config/pagequote`, macOS `~/Library/Application Support/dev.pagequote.pagequote`,
    /// Windows `%APPDATA%\pagequote\pagequote\config`
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        ProjectDirs::from("dev", "pagequote", "pagequote")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }
}

fn read_config(path: &Path) -> Result<AppConfig, CoreError> {
    let content = fs::read_to_string(path).map_err(|e| config_error("설정 파일 읽기 실패", path, e))?;
    let config: AppConfig =
        serde_json::from_str(&content).map_err(|e| config_error("설정 파일 파싱 실패", path, e))?;
    config.validate()?;
    debug!(path = %path.display(), "설정 파일 로드");
    Ok(config)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| CoreError::Config(format!("설정 직렬화 실패: {e}")))?;
    fs::write(path, content).map_err(|e| config_error("설정 파일 저장 실패", path, e))
}

fn config_error(context: &str, path: &Path, err: impl std::fmt::Display) -> CoreError {
    CoreError::Config(format!("{context}: {}: {err}", path.display()))
}
