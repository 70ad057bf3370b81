use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// 配置文件的磁盘结构：两个段（window / alarm），值一律以字符串存储，
/// 布尔量写作 "0"/"1"，颜色写作十六进制串。
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConfigStore {
    #[serde(default)]
    pub window: BTreeMap<String, String>,
    #[serde(default)]
    pub alarm: BTreeMap<String, String>,
}

/// 获取配置文件路径：~/.config/clock_overlay/config.toml (Linux)
/// 或 %APPDATA%\clock_overlay\config.toml (Windows)
pub fn config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("clock_overlay").join("config.toml")
}

/// 用户自定义闹钟铃声的路径（与配置文件同目录）
pub fn chime_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("clock_overlay").join("alarm.wav")
}

/// 完整读取配置文件，文件不存在或解析失败时返回空配置
pub fn read_store(path: &Path) -> ConfigStore {
    if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<ConfigStore>(&content) {
                Ok(store) => return store,
                Err(e) => log::warn!("配置解析失败，按空配置处理: {}", e),
            },
            Err(e) => log::warn!("配置读取失败，按空配置处理: {}", e),
        }
    }
    ConfigStore::default()
}

/// 整体重写配置文件
pub fn write_store(path: &Path, store: &ConfigStore) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(store)?;
    fs::write(path, content)?;
    Ok(())
}

/// 读-改-写循环：完整读取当前文件，套用修改，整体重写。
/// 写入失败仅记录日志，不中断程序。
pub fn update_store(path: &Path, apply: impl FnOnce(&mut ConfigStore)) {
    let mut store = read_store(path);
    apply(&mut store);
    if let Err(e) = write_store(path, &store) {
        log::warn!("配置写入失败: {}", e);
    }
}
