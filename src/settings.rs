use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{NaiveTime, Timelike};

use crate::config;

/// 悬浮窗外框尺寸（逻辑像素）
pub const OUTER_WIDTH: f32 = 66.0;
pub const OUTER_HEIGHT: f32 = 24.0;
/// 外框与内层面板之间的边框宽度
pub const BORDER_WIDTH: f32 = 2.0;

pub const FONT_SIZE_MIN: i32 = 10;
pub const FONT_SIZE_MAX: i32 = 20;
pub const DEFAULT_FONT_SIZE: i32 = 11;
pub const DEFAULT_ALPHA: i32 = 100;

pub const DEFAULT_BG_COLOR: &str = "#f9c289";
pub const DEFAULT_INNER_COLOR: &str = "#fcd5ac";
pub const DEFAULT_FG_COLOR: &str = "#85674e";

pub const DEFAULT_HOTKEY: &str = "F12";
pub const DEFAULT_ALARM_MESSAGE: &str = "Time's up!";

/// 首次运行的默认位置：距屏幕右侧 42px、底部 260px
pub fn default_position(screen_width: f32, screen_height: f32) -> (i32, i32) {
    (
        screen_width as i32 - OUTER_WIDTH as i32 - 42,
        screen_height as i32 - OUTER_HEIGHT as i32 - 260,
    )
}

/// 窗口/显示设置（对应配置文件 [window] 段）
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSettings {
    /// 屏幕坐标；None 表示尚未保存过（首帧按屏幕尺寸推导）
    pub position: Option<(i32, i32)>,
    pub font_size: i32,
    /// 不透明度百分比，0-100
    pub alpha: i32,
    pub bg_color: String,
    pub inner_color: String,
    pub fg_color: String,
    /// 锁定后拖动失效
    pub locked: bool,
    pub hotkey: String,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            position: None,
            font_size: DEFAULT_FONT_SIZE,
            alpha: DEFAULT_ALPHA,
            bg_color: DEFAULT_BG_COLOR.to_string(),
            inner_color: DEFAULT_INNER_COLOR.to_string(),
            fg_color: DEFAULT_FG_COLOR.to_string(),
            locked: false,
            hotkey: DEFAULT_HOTKEY.to_string(),
        }
    }
}

impl WindowSettings {
    /// 整窗不透明度系数，0.0-1.0
    pub fn alpha_factor(&self) -> f32 {
        self.alpha.clamp(0, 100) as f32 / 100.0
    }
}

/// 闹钟设置（对应配置文件 [alarm] 段）
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSettings {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
    pub message: String,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            hour: 0,
            minute: 0,
            message: String::new(),
        }
    }
}

impl AlarmSettings {
    /// 判断当前时间是否命中闹钟（精确到分钟）
    pub fn matches_now(&self, now: &NaiveTime) -> bool {
        self.enabled && now.hour() == self.hour && now.minute() == self.minute
    }

    /// 触发时展示的文案，留空则使用固定回退串
    pub fn display_message(&self) -> &str {
        if self.message.is_empty() {
            DEFAULT_ALARM_MESSAGE
        } else {
            &self.message
        }
    }
}

/// 全部持久化设置。启动时加载一次，之后每次变更同步写回磁盘。
#[derive(Debug, Clone)]
pub struct Settings {
    pub window: WindowSettings,
    pub alarm: AlarmSettings,
    path: PathBuf,
}

impl Settings {
    pub fn load() -> Self {
        Self::load_from(config::config_path())
    }

    /// 从指定路径加载；缺失的键回退默认值，数值键统一夹取到合法区间
    pub fn load_from(path: PathBuf) -> Self {
        let store = config::read_store(&path);
        let w = &store.window;
        let a = &store.alarm;
        let defaults = WindowSettings::default();

        let window = WindowSettings {
            position: match (get_int(w, "x"), get_int(w, "y")) {
                (Some(x), Some(y)) => Some((x as i32, y as i32)),
                _ => None,
            },
            font_size: get_int(w, "font_size")
                .map(|v| v as i32)
                .unwrap_or(DEFAULT_FONT_SIZE)
                .clamp(FONT_SIZE_MIN, FONT_SIZE_MAX),
            alpha: get_int(w, "alpha")
                .map(|v| v as i32)
                .unwrap_or(DEFAULT_ALPHA)
                .clamp(0, 100),
            bg_color: get_str(w, "bg_color").unwrap_or(defaults.bg_color),
            inner_color: get_str(w, "inner_color").unwrap_or(defaults.inner_color),
            fg_color: get_str(w, "fg_color").unwrap_or(defaults.fg_color),
            locked: get_bool(w, "locked").unwrap_or(false),
            hotkey: get_str(w, "hotkey").unwrap_or(defaults.hotkey),
        };

        let alarm = AlarmSettings {
            enabled: get_bool(a, "enabled").unwrap_or(false),
            hour: get_int(a, "hour").unwrap_or(0).clamp(0, 23) as u32,
            minute: get_int(a, "minute").unwrap_or(0).clamp(0, 59) as u32,
            message: a.get("message").cloned().unwrap_or_default(),
        };

        Self {
            window,
            alarm,
            path,
        }
    }

    pub fn set_font_size(&mut self, size: i32) {
        self.window.font_size = size.clamp(FONT_SIZE_MIN, FONT_SIZE_MAX);
        self.save_font_size();
    }

    pub fn set_alpha(&mut self, alpha: i32) {
        self.window.alpha = alpha.clamp(0, 100);
        self.save_alpha();
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.window.locked = locked;
        self.save_locked();
    }

    pub fn set_alarm(&mut self, alarm: AlarmSettings) {
        self.alarm = alarm;
        self.save_alarm();
    }

    pub fn save_position(&self) {
        let Some((x, y)) = self.window.position else {
            return;
        };
        config::update_store(&self.path, |store| {
            store.window.insert("x".to_string(), x.to_string());
            store.window.insert("y".to_string(), y.to_string());
        });
    }

    fn save_font_size(&self) {
        let size = self.window.font_size;
        config::update_store(&self.path, |store| {
            store
                .window
                .insert("font_size".to_string(), size.to_string());
        });
    }

    fn save_alpha(&self) {
        let alpha = self.window.alpha;
        config::update_store(&self.path, |store| {
            store.window.insert("alpha".to_string(), alpha.to_string());
        });
    }

    fn save_locked(&self) {
        let locked = self.window.locked;
        config::update_store(&self.path, |store| {
            store.window.insert("locked".to_string(), flag(locked));
        });
    }

    fn save_alarm(&self) {
        let alarm = &self.alarm;
        config::update_store(&self.path, |store| {
            store
                .alarm
                .insert("enabled".to_string(), flag(alarm.enabled));
            store.alarm.insert("hour".to_string(), alarm.hour.to_string());
            store
                .alarm
                .insert("minute".to_string(), alarm.minute.to_string());
            store
                .alarm
                .insert("message".to_string(), alarm.message.clone());
        });
    }

    /// 完整写回所有键。首次运行时调用，保证磁盘上存在一份齐全的配置。
    pub fn save_all(&self) {
        let window = &self.window;
        let alarm = &self.alarm;
        config::update_store(&self.path, |store| {
            if let Some((x, y)) = window.position {
                store.window.insert("x".to_string(), x.to_string());
                store.window.insert("y".to_string(), y.to_string());
            }
            store
                .window
                .insert("font_size".to_string(), window.font_size.to_string());
            store
                .window
                .insert("alpha".to_string(), window.alpha.to_string());
            store
                .window
                .insert("bg_color".to_string(), window.bg_color.clone());
            store
                .window
                .insert("inner_color".to_string(), window.inner_color.clone());
            store
                .window
                .insert("fg_color".to_string(), window.fg_color.clone());
            store
                .window
                .insert("locked".to_string(), flag(window.locked));
            store
                .window
                .insert("hotkey".to_string(), window.hotkey.clone());
            store
                .alarm
                .insert("enabled".to_string(), flag(alarm.enabled));
            store.alarm.insert("hour".to_string(), alarm.hour.to_string());
            store
                .alarm
                .insert("minute".to_string(), alarm.minute.to_string());
            store
                .alarm
                .insert("message".to_string(), alarm.message.clone());
        });
    }
}

/// 解析 "#rrggbb" 或 "rrggbb" 形式的颜色串
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let clean = value.trim().trim_start_matches('#');
    if clean.len() != 6 || !clean.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&clean[0..2], 16).ok()?;
    let g = u8::from_str_radix(&clean[2..4], 16).ok()?;
    let b = u8::from_str_radix(&clean[4..6], 16).ok()?;
    Some((r, g, b))
}

fn get_str(section: &BTreeMap<String, String>, key: &str) -> Option<String> {
    section.get(key).filter(|v| !v.is_empty()).cloned()
}

fn get_int(section: &BTreeMap<String, String>, key: &str) -> Option<i64> {
    section.get(key).and_then(|v| v.trim().parse().ok())
}

/// 布尔量按 "0"/"1" 存储
fn get_bool(section: &BTreeMap<String, String>, key: &str) -> Option<bool> {
    get_int(section, key).map(|v| v != 0)
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings() -> (tempfile::TempDir, Settings) {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(dir.path().join("config.toml"));
        (dir, settings)
    }

    #[test]
    fn defaults_when_file_missing() {
        let (_dir, settings) = temp_settings();
        assert_eq!(settings.window.position, None);
        assert_eq!(settings.window.font_size, DEFAULT_FONT_SIZE);
        assert_eq!(settings.window.alpha, DEFAULT_ALPHA);
        assert_eq!(settings.window.bg_color, DEFAULT_BG_COLOR);
        assert_eq!(settings.window.inner_color, DEFAULT_INNER_COLOR);
        assert_eq!(settings.window.fg_color, DEFAULT_FG_COLOR);
        assert!(!settings.window.locked);
        assert_eq!(settings.window.hotkey, DEFAULT_HOTKEY);
        assert!(!settings.alarm.enabled);
    }

    #[test]
    fn default_position_is_derived_from_screen_size() {
        assert_eq!(default_position(1920.0, 1080.0), (1812, 796));
        assert_eq!(default_position(1920.0, 1080.0), (1920 - 108, 1080 - 284));
    }

    #[test]
    fn first_run_writes_fresh_config() {
        let (dir, mut settings) = temp_settings();
        settings.window.position = Some(default_position(1920.0, 1080.0));
        settings.save_all();

        let reloaded = Settings::load_from(dir.path().join("config.toml"));
        assert_eq!(reloaded.window, settings.window);
        assert_eq!(reloaded.alarm, settings.alarm);
    }

    #[test]
    fn font_size_and_alpha_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        config::update_store(&path, |store| {
            store
                .window
                .insert("font_size".to_string(), "99".to_string());
            store.window.insert("alpha".to_string(), "500".to_string());
        });

        let settings = Settings::load_from(path);
        assert_eq!(settings.window.font_size, FONT_SIZE_MAX);
        assert_eq!(settings.window.alpha, 100);
    }

    #[test]
    fn alarm_time_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        config::update_store(&path, |store| {
            store.alarm.insert("hour".to_string(), "99".to_string());
            store.alarm.insert("minute".to_string(), "-3".to_string());
        });

        let settings = Settings::load_from(path);
        assert_eq!(settings.alarm.hour, 23);
        assert_eq!(settings.alarm.minute, 0);
    }

    #[test]
    fn set_font_size_clamps_and_is_idempotent() {
        let (dir, mut settings) = temp_settings();
        settings.set_font_size(7);
        assert_eq!(settings.window.font_size, FONT_SIZE_MIN);
        settings.set_font_size(25);
        assert_eq!(settings.window.font_size, FONT_SIZE_MAX);
        settings.set_font_size(14);
        settings.set_font_size(14);
        assert_eq!(settings.window.font_size, 14);

        let reloaded = Settings::load_from(dir.path().join("config.toml"));
        assert_eq!(reloaded.window.font_size, 14);
    }

    #[test]
    fn set_alpha_clamps() {
        let (_dir, mut settings) = temp_settings();
        settings.set_alpha(-20);
        assert_eq!(settings.window.alpha, 0);
        settings.set_alpha(130);
        assert_eq!(settings.window.alpha, 100);
    }

    #[test]
    fn locked_round_trips_as_zero_one() {
        let (dir, mut settings) = temp_settings();
        let path = dir.path().join("config.toml");
        settings.set_locked(true);

        let raw = config::read_store(&path);
        assert_eq!(raw.window.get("locked").map(String::as_str), Some("1"));

        let reloaded = Settings::load_from(path);
        assert!(reloaded.window.locked);
    }

    #[test]
    fn position_round_trips() {
        let (dir, mut settings) = temp_settings();
        settings.window.position = Some((123, -45));
        settings.save_position();

        let reloaded = Settings::load_from(dir.path().join("config.toml"));
        assert_eq!(reloaded.window.position, Some((123, -45)));
    }

    #[test]
    fn colors_and_hotkey_round_trip_verbatim() {
        let (dir, mut settings) = temp_settings();
        settings.window.bg_color = "#102030".to_string();
        settings.window.inner_color = "#405060".to_string();
        settings.window.fg_color = "#708090".to_string();
        settings.window.hotkey = "F9".to_string();
        settings.save_all();

        let reloaded = Settings::load_from(dir.path().join("config.toml"));
        assert_eq!(reloaded.window.bg_color, "#102030");
        assert_eq!(reloaded.window.inner_color, "#405060");
        assert_eq!(reloaded.window.fg_color, "#708090");
        assert_eq!(reloaded.window.hotkey, "F9");
    }

    #[test]
    fn alarm_round_trips() {
        let (dir, mut settings) = temp_settings();
        settings.set_alarm(AlarmSettings {
            enabled: true,
            hour: 14,
            minute: 30,
            message: "Break".to_string(),
        });

        let reloaded = Settings::load_from(dir.path().join("config.toml"));
        assert!(reloaded.alarm.enabled);
        assert_eq!(reloaded.alarm.hour, 14);
        assert_eq!(reloaded.alarm.minute, 30);
        assert_eq!(reloaded.alarm.message, "Break");
    }

    #[test]
    fn alarm_matches_only_exact_minute_when_enabled() {
        let alarm = AlarmSettings {
            enabled: true,
            hour: 14,
            minute: 30,
            message: String::new(),
        };
        assert!(alarm.matches_now(&NaiveTime::from_hms_opt(14, 30, 0).unwrap()));
        assert!(alarm.matches_now(&NaiveTime::from_hms_opt(14, 30, 59).unwrap()));
        assert!(!alarm.matches_now(&NaiveTime::from_hms_opt(14, 31, 0).unwrap()));
        assert!(!alarm.matches_now(&NaiveTime::from_hms_opt(15, 30, 0).unwrap()));

        let disabled = AlarmSettings {
            enabled: false,
            ..alarm
        };
        assert!(!disabled.matches_now(&NaiveTime::from_hms_opt(14, 30, 0).unwrap()));
    }

    #[test]
    fn empty_alarm_message_falls_back() {
        let alarm = AlarmSettings::default();
        assert_eq!(alarm.display_message(), DEFAULT_ALARM_MESSAGE);

        let named = AlarmSettings {
            message: "Break".to_string(),
            ..AlarmSettings::default()
        };
        assert_eq!(named.display_message(), "Break");
    }

    #[test]
    fn parse_hex_color_accepts_both_forms() {
        assert_eq!(parse_hex_color("#85674e"), Some((0x85, 0x67, 0x4e)));
        assert_eq!(parse_hex_color("fcd5ac"), Some((0xfc, 0xd5, 0xac)));
        assert_eq!(parse_hex_color(" #f9c289 "), Some((0xf9, 0xc2, 0x89)));
        assert_eq!(parse_hex_color("red"), None);
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color(""), None);
    }
}
