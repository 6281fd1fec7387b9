// ==========================================
// 生产排程甘特图 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 来源优先级: 环境变量 > 配置文件 > 默认值
// 存储: JSON 文件（默认 <config_dir>/production-gantt/config.json）
// ==========================================

use crate::config::engine_config::{EngineConfig, ImportConfig, LayoutConfig, ViewportConfig};
use crate::config::import_config_trait::EngineConfigReader;
use crate::importer::error::{ImportError, ImporterResult};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// 配置键（点号路径，与 JSON 结构一致）
pub mod config_keys {
    pub const CHUNK_SIZE: &str = "import.chunk_size";
    pub const MAX_ROWS: &str = "import.max_rows";
    pub const PROGRESS_THROTTLE_MS: &str = "import.progress_throttle_ms";
    pub const YEAR_MIN: &str = "import.year_min";
    pub const YEAR_MAX: &str = "import.year_max";
    pub const LOCALE: &str = "import.locale";
    pub const MIN_PX_PER_HOUR: &str = "viewport.min_px_per_hour";
    pub const MAX_PX_PER_HOUR: &str = "viewport.max_px_per_hour";
    pub const VIRTUALIZATION_THRESHOLD: &str = "viewport.virtualization_threshold";
    pub const OVERSCAN_PX: &str = "viewport.overscan_px";
}

/// 环境变量 → 配置键
pub const ENV_OVERRIDES: [(&str, &str); 5] = [
    ("PRODUCTION_GANTT_CHUNK_SIZE", config_keys::CHUNK_SIZE),
    ("PRODUCTION_GANTT_MAX_ROWS", config_keys::MAX_ROWS),
    ("PRODUCTION_GANTT_YEAR_MIN", config_keys::YEAR_MIN),
    ("PRODUCTION_GANTT_YEAR_MAX", config_keys::YEAR_MAX),
    ("PRODUCTION_GANTT_LOCALE", config_keys::LOCALE),
];

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Debug, Clone)]
pub struct ConfigManager {
    source: Option<PathBuf>,
    config: Arc<RwLock<EngineConfig>>,
}

impl ConfigManager {
    /// 从 JSON 文件加载（文件不存在 → 默认值），随后应用环境变量覆写并校验
    pub fn new<P: AsRef<Path>>(path: P) -> ImporterResult<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str::<EngineConfig>(&raw).map_err(|e| ImportError::ConfigReadError {
                key: path.display().to_string(),
                message: e.to_string(),
            })?
        } else {
            tracing::debug!(path = %path.display(), "配置文件不存在，使用默认配置");
            EngineConfig::default()
        };

        apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
        config.validate()?;

        tracing::info!(
            path = %path.display(),
            chunk_size = config.import.chunk_size,
            max_rows = config.import.max_rows,
            year_min = config.import.year_min,
            year_max = config.import.year_max,
            "配置加载完成"
        );
        Ok(Self {
            source: Some(path.to_path_buf()),
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// 从默认位置加载；无法确定系统配置目录时使用默认值
    pub fn from_default_location() -> ImporterResult<Self> {
        match Self::default_path() {
            Some(path) => Self::new(path),
            None => Self::with_config(EngineConfig::default()),
        }
    }

    /// 直接使用给定配置（测试/嵌入场景），同样校验
    pub fn with_config(config: EngineConfig) -> ImporterResult<Self> {
        config.validate()?;
        Ok(Self {
            source: None,
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("production-gantt").join("config.json"))
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn read(&self) -> ImporterResult<EngineConfig> {
        self.config
            .read()
            .map(|c| c.clone())
            .map_err(|e| ImportError::InternalError(format!("配置锁获取失败: {}", e)))
    }

    /// 当前配置副本
    pub fn snapshot(&self) -> ImporterResult<EngineConfig> {
        self.read()
    }

    /// 按点号路径读取配置值（文本形式）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 键不存在
    pub fn get_config_value(&self, key: &str) -> ImporterResult<Option<String>> {
        let json = serde_json::to_value(self.read()?)?;
        Ok(lookup(&json, key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    /// 按点号路径覆写配置值（校验失败时不生效）
    pub fn set_config_value(&self, key: &str, value: &str) -> ImporterResult<()> {
        let mut next = self.read()?;
        set_by_key(&mut next, key, value)?;
        next.validate()?;

        let mut guard = self
            .config
            .write()
            .map_err(|e| ImportError::InternalError(format!("配置锁获取失败: {}", e)))?;
        *guard = next;
        tracing::info!(key, value, "配置已覆写");
        Ok(())
    }

    /// 获取所有配置的快照（JSON 格式）
    pub fn get_config_snapshot(&self) -> ImporterResult<String> {
        Ok(serde_json::to_string_pretty(&self.read()?)?)
    }

    /// 从快照恢复配置
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ImporterResult<()> {
        let restored: EngineConfig = serde_json::from_str(snapshot_json)?;
        restored.validate()?;
        let mut guard = self
            .config
            .write()
            .map_err(|e| ImportError::InternalError(format!("配置锁获取失败: {}", e)))?;
        *guard = restored;
        Ok(())
    }
}

fn lookup<'a>(json: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(json, |node, part| node.get(part))
}

/// 按点号路径写入（值按目标字段类型解析）
fn set_by_key(config: &mut EngineConfig, key: &str, raw: &str) -> ImporterResult<()> {
    let mut json = serde_json::to_value(&*config)?;
    let slot = key
        .split('.')
        .try_fold(&mut json, |node, part| node.get_mut(part))
        .ok_or_else(|| ImportError::ConfigValueError {
            key: key.to_string(),
            value: raw.to_string(),
            message: "unknown config key".to_string(),
        })?;

    let parsed = match &*slot {
        Value::String(_) => Value::String(raw.trim().to_string()),
        _ => serde_json::from_str::<Value>(raw.trim()).map_err(|e| ImportError::ConfigValueError {
            key: key.to_string(),
            value: raw.to_string(),
            message: e.to_string(),
        })?,
    };
    *slot = parsed;

    *config = serde_json::from_value(json).map_err(|e| ImportError::ConfigValueError {
        key: key.to_string(),
        value: raw.to_string(),
        message: e.to_string(),
    })?;
    Ok(())
}

/// 应用环境变量覆写
pub fn apply_env_overrides<F>(config: &mut EngineConfig, env: F) -> ImporterResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    for (name, key) in ENV_OVERRIDES {
        if let Some(value) = env(name) {
            tracing::debug!(env = name, key, value = value.as_str(), "环境变量覆写配置");
            set_by_key(config, key, &value)?;
        }
    }
    Ok(())
}

// ==========================================
// EngineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn get_import_config(&self) -> ImporterResult<ImportConfig> {
        Ok(self.read()?.import)
    }

    async fn get_viewport_config(&self) -> ImporterResult<ViewportConfig> {
        Ok(self.read()?.viewport)
    }

    async fn get_layout_config(&self) -> ImporterResult<LayoutConfig> {
        Ok(self.read()?.layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::new(dir.path().join("config.json")).unwrap();
        assert_eq!(manager.snapshot().unwrap().import.chunk_size, 500);
    }

    #[test]
    fn test_load_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"import":{"year_min":1990,"locale":"pl"}}"#).unwrap();

        let manager = ConfigManager::new(&path).unwrap();
        let config = manager.snapshot().unwrap();
        assert_eq!(config.import.year_min, 1990);
        assert_eq!(config.import.locale, "pl");
        assert_eq!(manager.source(), Some(path.as_path()));
    }

    #[test]
    fn test_malformed_json_is_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            ConfigManager::new(&path),
            Err(ImportError::ConfigReadError { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PRODUCTION_GANTT_CHUNK_SIZE", "250"),
            ("PRODUCTION_GANTT_LOCALE", "pl"),
        ]
        .into_iter()
        .collect();
        let mut config = EngineConfig::default();
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.import.chunk_size, 250);
        assert_eq!(config.import.locale, "pl");

        let bad = |name: &str| (name == "PRODUCTION_GANTT_MAX_ROWS").then(|| "many".to_string());
        assert!(apply_env_overrides(&mut config, bad).is_err());
    }

    #[test]
    fn test_get_and_set_by_key() {
        let manager = ConfigManager::with_config(EngineConfig::default()).unwrap();
        assert_eq!(
            manager.get_config_value(config_keys::YEAR_MAX).unwrap(),
            Some("2050".to_string())
        );
        assert_eq!(manager.get_config_value("import.nope").unwrap(), None);

        manager.set_config_value(config_keys::YEAR_MAX, "2060").unwrap();
        assert_eq!(manager.snapshot().unwrap().import.year_max, 2060);

        // 校验失败不生效
        assert!(manager.set_config_value(config_keys::YEAR_MIN, "2100").is_err());
        assert_eq!(manager.snapshot().unwrap().import.year_min, 2000);
        assert!(manager.set_config_value("import.unknown", "1").is_err());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let manager = ConfigManager::with_config(EngineConfig::default()).unwrap();
        manager.set_config_value(config_keys::OVERSCAN_PX, "300").unwrap();
        let snapshot = manager.get_config_snapshot().unwrap();

        let other = ConfigManager::with_config(EngineConfig::default()).unwrap();
        other.restore_config_from_snapshot(&snapshot).unwrap();
        assert_eq!(other.snapshot().unwrap().viewport.overscan_px, 300.0);
    }

    #[tokio::test]
    async fn test_reader_trait() {
        let manager = ConfigManager::with_config(EngineConfig::default()).unwrap();
        let reader: &dyn EngineConfigReader = &manager;
        assert_eq!(reader.get_import_config().await.unwrap().max_rows, 50_000);
        assert_eq!(reader.get_layout_config().await.unwrap().row_gap, 16.0);
    }
}
