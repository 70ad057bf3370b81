use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use eframe::egui;

#[derive(Default)]
struct HotkeySignals {
    toggle_requested: AtomicBool,
}

impl HotkeySignals {
    fn request_toggle(&self) {
        self.toggle_requested.store(true, Ordering::Release);
    }

    fn take_toggle_request(&self) -> bool {
        self.toggle_requested.swap(false, Ordering::AcqRel)
    }
}

/// 主线程持有的热键句柄。
///
/// 只包含 `Arc` 包裹的共享状态，均实现了 `Send + Sync`。
/// 实际的 `GlobalHotKeyManager` 留在监听线程中。
pub struct HotkeyHandle {
    signals: Arc<HotkeySignals>,
    repaint_ctx: Arc<Mutex<Option<egui::Context>>>,
}

impl HotkeyHandle {
    /// 创建共享信号对，返回 `(HotkeyHandle, HotkeyThreadState)`。
    ///
    /// - `HotkeyHandle`：传给主线程，用于消费显示/隐藏切换请求。
    /// - `HotkeyThreadState`：在监听线程中调用 [`HotkeyThreadState::run`]
    ///   完成热键注册并保持事件分发。
    ///
    /// `init_tx` 用于在注册完成后立即通知主线程（成功/失败），
    /// 通知发出后监听线程继续运行，主线程不再阻塞。
    pub fn new_split(
        hotkey: String,
        init_tx: std::sync::mpsc::SyncSender<bool>,
    ) -> (HotkeyHandle, HotkeyThreadState) {
        let signals = Arc::new(HotkeySignals::default());
        let repaint_ctx = Arc::new(Mutex::new(None::<egui::Context>));

        let handle = HotkeyHandle {
            signals: Arc::clone(&signals),
            repaint_ctx: Arc::clone(&repaint_ctx),
        };

        let state = HotkeyThreadState {
            hotkey,
            signals,
            repaint_ctx,
            init_tx,
        };

        (handle, state)
    }

    pub fn bind_egui_ctx(&self, ctx: &egui::Context) {
        if let Ok(mut slot) = self.repaint_ctx.lock() {
            *slot = Some(ctx.clone());
        }
    }

    pub fn take_toggle_request(&self) -> bool {
        self.signals.take_toggle_request()
    }
}

/// 热键监听线程状态，持有注册热键所需的全部数据。
pub struct HotkeyThreadState {
    /// 配置的热键串，如 "F12"、"ctrl+shift+F12"
    hotkey: String,
    signals: Arc<HotkeySignals>,
    repaint_ctx: Arc<Mutex<Option<egui::Context>>>,
    /// 注册完成后立即通过此 channel 通知主线程，然后继续保持监听。
    init_tx: std::sync::mpsc::SyncSender<bool>,
}

impl HotkeyThreadState {
    /// 在监听线程中调用：
    /// 1. 解析并注册全局热键
    /// 2. 通过 `init_tx` 立即通知主线程注册结果
    /// 3. 若注册成功，保持线程存活以分发热键事件
    ///    （Windows 上运行 Win32 消息泵，其余平台由 crate 内部机制分发）
    pub fn run(self) {
        let init_ok = self.register();
        let _ = self.init_tx.send(init_ok);
        if !init_ok {
            return;
        }

        #[cfg(target_os = "windows")]
        self.run_message_pump_windows();

        #[cfg(not(target_os = "windows"))]
        self.keep_alive();
    }

    fn register(&self) -> bool {
        use anyhow::Context as _;
        use global_hotkey::hotkey::HotKey;
        use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};

        let result: anyhow::Result<()> = (|| {
            let hotkey: HotKey = self
                .hotkey
                .parse()
                .map_err(|e| anyhow::anyhow!("热键解析失败: {e}"))?;
            let hotkey_id = hotkey.id();

            let manager = GlobalHotKeyManager::new().context("热键管理器初始化失败")?;
            manager.register(hotkey).context("热键注册失败")?;

            let signals = Arc::clone(&self.signals);
            let repaint_ctx = Arc::clone(&self.repaint_ctx);
            GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
                if event.id == hotkey_id && event.state == HotKeyState::Pressed {
                    signals.request_toggle();
                    wake_main_window(&repaint_ctx);
                }
            }));

            // 注意：manager 必须保持存活，否则热键会被注销。
            // 用 Box::leak 将其泄漏到 'static，确保在监听线程中永久存活。
            Box::leak(Box::new(manager));

            Ok(())
        })();

        match result {
            Ok(()) => {
                log::info!("全局热键注册成功: {}", self.hotkey);
                true
            }
            Err(e) => {
                log::warn!("热键注册失败，显示/隐藏热键不可用: {e:#}");
                false
            }
        }
    }

    /// Windows 上热键事件经由创建 manager 的线程的消息队列分发，
    /// 必须在本线程运行 GetMessage/DispatchMessage 循环。
    #[cfg(target_os = "windows")]
    fn run_message_pump_windows(&self) {
        log::info!("热键消息泵线程启动");
        unsafe {
            use windows_sys::Win32::UI::WindowsAndMessaging::{
                DispatchMessageW, GetMessageW, MSG, TranslateMessage,
            };
            let mut msg: MSG = std::mem::zeroed();
            while GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) > 0 {
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        log::info!("热键消息泵线程退出");
    }

    /// Linux / macOS 上事件由 global-hotkey 内部机制分发，
    /// 此处只需保持线程存活（manager 已 leak，不会被 drop）。
    #[cfg(not(target_os = "windows"))]
    fn keep_alive(&self) {
        loop {
            std::thread::sleep(std::time::Duration::from_secs(60));
        }
    }
}

fn wake_main_window(repaint_ctx: &Arc<Mutex<Option<egui::Context>>>) {
    if let Ok(slot) = repaint_ctx.lock() {
        if let Some(ctx) = slot.as_ref() {
            ctx.request_repaint();
        }
    }
}
