use std::fs;
use std::io::Cursor;
use std::time::Duration;

use rodio::source::{SineWave, Source};
use rodio::{Decoder, OutputStream, Sink};

use crate::config;

/// 播放闹钟铃声（在单独线程中，不阻塞 UI 线程）。
/// 优先使用配置目录下用户放置的 alarm.wav，文件缺失或解码失败时
/// 回退到内置的双音提示音。
pub fn play_chime() {
    std::thread::spawn(move || match OutputStream::try_default() {
        Ok((_stream, handle)) => {
            let sink = Sink::try_new(&handle).unwrap();
            match load_custom_chime() {
                Some(source) => sink.append(source),
                None => sink.append(fallback_tone()),
            }
            sink.sleep_until_end();
        }
        Err(e) => log::warn!("音频输出设备初始化失败: {}", e),
    });
}

fn load_custom_chime() -> Option<Decoder<Cursor<Vec<u8>>>> {
    let path = config::chime_path();
    let data = fs::read(&path).ok()?;
    match Decoder::new(Cursor::new(data)) {
        Ok(source) => {
            log::info!("使用自定义铃声: {:?}", path);
            Some(source)
        }
        Err(e) => {
            log::warn!("铃声解码失败，回退内置提示音: {}", e);
            None
        }
    }
}

/// 内置提示音：两个音高交替的短促双音
fn fallback_tone() -> impl Source<Item = f32> + Send {
    let note = Duration::from_millis(250);
    let high = SineWave::new(880.0).take_duration(note).amplify(0.5);
    let low = SineWave::new(659.3).take_duration(note).amplify(0.5);
    high.clone()
        .mix(low.delay(note))
        .mix(high.delay(note * 2))
}

/// 发送系统桌面通知
pub fn send_notification(title: &str, body: &str) {
    let title = title.to_string();
    let body = body.to_string();
    std::thread::spawn(move || {
        #[cfg(any(target_os = "windows", target_os = "linux", target_os = "macos"))]
        {
            use notify_rust::Notification;
            // macOS 不需要 icon() 调用，否则某些版本会报错
            #[cfg(target_os = "macos")]
            let result = Notification::new()
                .summary(&title)
                .body(&body)
                .timeout(notify_rust::Timeout::Milliseconds(5000))
                .show();

            #[cfg(not(target_os = "macos"))]
            let result = Notification::new()
                .summary(&title)
                .body(&body)
                .icon("dialog-information")
                .timeout(notify_rust::Timeout::Milliseconds(5000))
                .show();

            if let Err(e) = result {
                log::warn!("系统通知发送失败: {}", e);
            }
        }
    });
}
