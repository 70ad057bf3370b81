#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod alarm;
mod app;
mod config;
mod hotkey;
mod notifier;
mod settings;
mod tick;

use app::ClockApp;
use settings::Settings;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("时钟悬浮窗启动中...");

    // 加载持久化设置（缺失键回退默认值，数值键夹取到合法区间）
    let settings = Settings::load();
    log::info!("已加载配置: {:?}", config::config_path());

    // 在专用线程中注册全局热键并监听按键事件。
    // 监听线程通过原子标志 + egui 重绘唤醒与 UI 线程通信；
    // 注册失败只禁用热键，不影响其余功能。
    let hotkey = {
        // 使用 SyncSender（容量=1），监听线程在注册完成后立即发送结果，
        // 然后继续保持事件分发。主线程收到信号后即可继续启动 eframe。
        let (init_tx, init_rx) = std::sync::mpsc::sync_channel::<bool>(1);

        let (handle, thread_state) =
            hotkey::HotkeyHandle::new_split(settings.window.hotkey.clone(), init_tx);

        std::thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                // run() 内部：注册热键 → 立即通过 init_tx 通知主线程 → 保持监听
                thread_state.run();
            })
            .expect("无法创建热键监听线程");

        match init_rx.recv() {
            Ok(true) => {
                log::info!("显示/隐藏热键已启用: {}", settings.window.hotkey);
                Some(handle)
            }
            Ok(false) => {
                log::warn!("热键注册失败，将不启用显示/隐藏热键");
                None
            }
            Err(_) => {
                log::warn!("热键线程异常退出，将不启用显示/隐藏热键");
                None
            }
        }
    };

    // 无边框、置顶、透明的小窗口；有保存过的位置则直接按其放置，
    // 否则首帧按屏幕尺寸推导默认位置
    let mut viewport = egui::ViewportBuilder::default()
        .with_title("Clock Overlay")
        .with_inner_size([settings::OUTER_WIDTH, settings::OUTER_HEIGHT])
        .with_decorations(false)
        .with_always_on_top()
        .with_transparent(true)
        .with_resizable(false)
        .with_taskbar(false);
    if let Some((x, y)) = settings.window.position {
        viewport = viewport.with_position([x as f32, y as f32]);
    }

    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Clock Overlay",
        native_options,
        Box::new(move |cc| Ok(Box::new(ClockApp::new(cc, settings, hotkey)))),
    )
}
