use chrono::{NaiveTime, Timelike};

use crate::settings::AlarmSettings;

/// 闹钟触发防重复守卫。
///
/// 每个 tick 都会带着当前时间询问一次；命中分钟内只放行第一次，
/// 离开命中分钟后解除记录，保证次日同一时刻仍能触发。
pub struct AlarmGuard {
    /// 上次触发的分钟 key：hour * 60 + minute
    last_fired_minute: Option<u32>,
}

impl AlarmGuard {
    pub fn new() -> Self {
        Self {
            last_fired_minute: None,
        }
    }

    /// 本次 tick 是否应触发闹钟
    pub fn should_fire(&mut self, now: &NaiveTime, alarm: &AlarmSettings) -> bool {
        let minute_key = now.hour() * 60 + now.minute();

        // 同一分钟内已触发过
        if self.last_fired_minute == Some(minute_key) {
            return false;
        }

        if !alarm.matches_now(now) {
            // 走出命中分钟即解除防重复记录
            self.last_fired_minute = None;
            return false;
        }

        self.last_fired_minute = Some(minute_key);
        true
    }
}
