use std::time::Duration;

use chrono::{NaiveDateTime, Timelike};

/// 刷新延迟的安全区间：下限防止零/负延迟空转，上限防止时钟异常导致饿死
pub const MIN_DELAY_MS: i64 = 50;
pub const MAX_DELAY_MS: i64 = 60_000;

/// 悬浮窗显示文本：零填充的 HH:MM
pub fn format_display(now: &NaiveDateTime) -> String {
    now.format("%H:%M").to_string()
}

/// 下一个整分钟时刻。秒与纳秒截断后加一分钟，
/// 23:59 跨日、月末跨月均由 chrono 的日历加法处理。
pub fn next_minute_boundary(now: NaiveDateTime) -> NaiveDateTime {
    let truncated = now
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    truncated + chrono::Duration::minutes(1)
}

/// 距下一个整分钟的延迟，夹取到 [MIN_DELAY_MS, MAX_DELAY_MS]
pub fn delay_to_next_minute(now: NaiveDateTime) -> Duration {
    let delay_ms = (next_minute_boundary(now) - now).num_milliseconds();
    Duration::from_millis(delay_ms.clamp(MIN_DELAY_MS, MAX_DELAY_MS) as u64)
}

/// 时钟刷新的到期点句柄。同一时刻至多存在一个待触发的到期点；
/// 重新武装时直接覆盖旧值，等价于"先取消再排定"。
pub struct ClockTicker {
    deadline: Option<NaiveDateTime>,
}

impl ClockTicker {
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// 是否到达刷新点。尚未武装过时视为到期（首帧立即刷新）。
    pub fn due(&self, now: NaiveDateTime) -> bool {
        self.deadline.map_or(true, |d| now >= d)
    }

    /// 覆盖旧到期点，按下一个整分钟重新武装，返回本次延迟
    pub fn rearm(&mut self, now: NaiveDateTime) -> Duration {
        let delay = delay_to_next_minute(now);
        let delta = chrono::Duration::from_std(delay)
            .unwrap_or_else(|_| chrono::Duration::milliseconds(MAX_DELAY_MS));
        self.deadline = Some(now + delta);
        delay
    }

    /// 距当前到期点还需等待的时长，已过期返回零
    pub fn until_deadline(&self, now: NaiveDateTime) -> Option<Duration> {
        self.deadline
            .map(|d| (d - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// 撤销待触发的到期点（退出时调用）
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
