use chrono::Local;
use eframe::egui;
use eframe::egui::{Align2, Color32, FontId, Pos2, RichText, Sense, Vec2, ViewportCommand};

use crate::alarm::AlarmGuard;
use crate::hotkey::HotkeyHandle;
use crate::notifier;
use crate::settings::{self, AlarmSettings, Settings};
use crate::tick::{self, ClockTicker};

pub struct ClockApp {
    settings: Settings,
    ticker: ClockTicker,
    alarm_guard: AlarmGuard,
    hotkey: Option<HotkeyHandle>,
    time_text: String,
    visible: bool,
    /// 拖动起点：按下时指针在窗口内的位置
    drag_anchor: Option<Pos2>,
    /// 闹钟对话框的编辑表单，None 表示对话框关闭
    alarm_form: Option<AlarmForm>,
    about_open: bool,
    position_applied: bool,
}

impl ClockApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: Settings,
        hotkey: Option<HotkeyHandle>,
    ) -> Self {
        if let Some(handle) = &hotkey {
            handle.bind_egui_ctx(&cc.egui_ctx);
        }
        let now = Local::now().naive_local();
        Self {
            time_text: tick::format_display(&now),
            settings,
            ticker: ClockTicker::new(),
            alarm_guard: AlarmGuard::new(),
            hotkey,
            visible: true,
            drag_anchor: None,
            alarm_form: None,
            about_open: false,
            position_applied: false,
        }
    }

    /// 消费热键线程发来的显示/隐藏切换请求
    fn handle_hotkey(&mut self, ctx: &egui::Context) {
        let Some(handle) = &self.hotkey else {
            return;
        };
        if handle.take_toggle_request() {
            self.visible = !self.visible;
            log::info!("热键切换可见性: {}", if self.visible { "显示" } else { "隐藏" });
            ctx.send_viewport_cmd(ViewportCommand::Visible(self.visible));
        }
    }

    /// 没有保存过位置时按屏幕右下角偏移放置，并写回完整配置
    /// （首次运行据此生成全新的配置文件）。
    /// 位置确定之前每帧重试，确定后不再执行。
    fn ensure_position(&mut self, ctx: &egui::Context) {
        if self.position_applied {
            return;
        }

        if self.settings.window.position.is_none() {
            if let Some(size) = ctx.input(|i| i.viewport().monitor_size) {
                let (x, y) = settings::default_position(size.x, size.y);
                self.settings.window.position = Some((x, y));
                ctx.send_viewport_cmd(ViewportCommand::OuterPosition(Pos2::new(
                    x as f32, y as f32,
                )));
            } else if let Some(outer) = ctx.input(|i| i.viewport().outer_rect) {
                // 部分平台（如 Wayland）拿不到 monitor_size，
                // 退回记录系统实际摆放的窗口位置
                self.settings.window.position =
                    Some((outer.min.x.round() as i32, outer.min.y.round() as i32));
            } else {
                // 两者都尚不可用，下一帧再试
                return;
            }
        }
        self.position_applied = true;
        self.settings.save_all();
    }

    fn draw_widget(&mut self, ctx: &egui::Context) {
        let alpha = self.settings.window.alpha_factor();
        let bg = color_or_default(&self.settings.window.bg_color, settings::DEFAULT_BG_COLOR)
            .gamma_multiply(alpha);
        let inner = color_or_default(
            &self.settings.window.inner_color,
            settings::DEFAULT_INNER_COLOR,
        )
        .gamma_multiply(alpha);
        let fg = color_or_default(&self.settings.window.fg_color, settings::DEFAULT_FG_COLOR)
            .gamma_multiply(alpha);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(bg))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                ui.painter()
                    .rect_filled(rect.shrink(settings::BORDER_WIDTH), 0.0, inner);
                ui.painter().text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    &self.time_text,
                    FontId::proportional(self.settings.window.font_size as f32),
                    fg,
                );

                let response =
                    ui.interact(rect, egui::Id::new("clock_surface"), Sense::click_and_drag());
                self.handle_drag(ctx, &response);
                response.context_menu(|ui| self.context_menu_ui(ui));
            });
    }

    /// 拖动移动窗口：窗口位置 = 原位置 + (当前指针 - 按下时指针)。
    /// 锁定状态下全部拖动处理为空操作。
    fn handle_drag(&mut self, ctx: &egui::Context, response: &egui::Response) {
        if self.settings.window.locked {
            self.drag_anchor = None;
            return;
        }
        if response.drag_started() {
            self.drag_anchor = response.interact_pointer_pos();
        }
        if response.dragged() {
            if let (Some(anchor), Some(pointer)) =
                (self.drag_anchor, response.interact_pointer_pos())
            {
                let delta = pointer - anchor;
                if delta != Vec2::ZERO {
                    if let Some(outer) = ctx.input(|i| i.viewport().outer_rect) {
                        let new_pos = outer.min + delta;
                        self.settings.window.position =
                            Some((new_pos.x.round() as i32, new_pos.y.round() as i32));
                        ctx.send_viewport_cmd(ViewportCommand::OuterPosition(new_pos));
                    }
                }
            }
        }
        // 松开时落盘一次
        if response.drag_stopped() && self.drag_anchor.take().is_some() {
            self.settings.save_position();
        }
    }

    fn context_menu_ui(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("Font size", |ui| {
            for size in (settings::FONT_SIZE_MIN..=settings::FONT_SIZE_MAX).rev() {
                let checked = size == self.settings.window.font_size;
                if ui.selectable_label(checked, size.to_string()).clicked() {
                    self.settings.set_font_size(size);
                    ui.close_menu();
                }
            }
        });
        ui.menu_button("Alpha", |ui| {
            for alpha in (0..=100).rev().step_by(5) {
                let checked = alpha == self.settings.window.alpha;
                if ui.selectable_label(checked, format!("{alpha}%")).clicked() {
                    self.settings.set_alpha(alpha);
                    ui.close_menu();
                }
            }
        });
        ui.menu_button("Lock / Unlock", |ui| {
            if ui.selectable_label(self.settings.window.locked, "Lock").clicked() {
                self.settings.set_locked(true);
                ui.close_menu();
            }
            if ui
                .selectable_label(!self.settings.window.locked, "Unlock")
                .clicked()
            {
                self.settings.set_locked(false);
                ui.close_menu();
            }
        });
        ui.separator();
        if ui.button("Alarm...").clicked() {
            self.alarm_form = Some(AlarmForm::from_settings(&self.settings.alarm));
            ui.close_menu();
        }
        if ui.button("About").clicked() {
            self.about_open = true;
            ui.close_menu();
        }
        ui.separator();
        if ui.button("Exit").clicked() {
            ui.ctx().send_viewport_cmd(ViewportCommand::Close);
        }
    }

    /// 闹钟配置对话框（独立视口）。
    /// 时/分在保存前就地校验，校验不通过不落盘。
    fn show_alarm_dialog(&mut self, ctx: &egui::Context) {
        let anchor = ctx
            .input(|i| i.viewport().outer_rect)
            .map(|r| r.min)
            .unwrap_or(Pos2::ZERO);
        let Some(form) = self.alarm_form.as_mut() else {
            return;
        };

        let mut keep_open = true;
        let mut saved: Option<AlarmSettings> = None;

        ctx.show_viewport_immediate(
            egui::ViewportId::from_hash_of("alarm_dialog"),
            egui::ViewportBuilder::default()
                .with_title("Alarm")
                .with_inner_size([230.0, 130.0])
                .with_position(anchor + Vec2::new(0.0, settings::OUTER_HEIGHT + 8.0))
                .with_resizable(false)
                .with_always_on_top(),
            |ctx, _class| {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Hour");
                        ui.add(egui::TextEdit::singleline(&mut form.hour).desired_width(28.0));
                        ui.label("Minute");
                        ui.add(egui::TextEdit::singleline(&mut form.minute).desired_width(28.0));
                    });
                    ui.horizontal(|ui| {
                        ui.label("Message");
                        ui.text_edit_singleline(&mut form.message);
                    });
                    ui.checkbox(&mut form.enabled, "Enabled");
                    if let Some(error) = &form.error {
                        ui.colored_label(Color32::RED, error);
                    }
                    ui.horizontal(|ui| {
                        if ui.button("Save").clicked() {
                            match form.validate() {
                                Ok(alarm) => saved = Some(alarm),
                                Err(msg) => form.error = Some(msg),
                            }
                        }
                        if ui.button("Cancel").clicked() {
                            keep_open = false;
                        }
                    });
                });
                if ctx.input(|i| i.viewport().close_requested()) {
                    keep_open = false;
                }
            },
        );

        if let Some(alarm) = saved {
            log::info!(
                "闹钟设置已更新: {:02}:{:02} enabled={}",
                alarm.hour,
                alarm.minute,
                alarm.enabled
            );
            self.settings.set_alarm(alarm);
            keep_open = false;
        }
        if !keep_open {
            self.alarm_form = None;
        }
    }

    /// About 框：无边框独立视口，锚定到悬浮窗右下角，
    /// 点击或 Esc 关闭
    fn show_about(&mut self, ctx: &egui::Context) {
        if !self.about_open {
            return;
        }

        const ABOUT_SIZE: Vec2 = Vec2::new(190.0, 96.0);
        let pos = ctx
            .input(|i| i.viewport().outer_rect)
            .map(|r| r.max - ABOUT_SIZE)
            .unwrap_or(Pos2::ZERO);

        let bg = color_or_default(&self.settings.window.bg_color, settings::DEFAULT_BG_COLOR);
        let inner = color_or_default(
            &self.settings.window.inner_color,
            settings::DEFAULT_INNER_COLOR,
        );
        let fg = color_or_default(&self.settings.window.fg_color, settings::DEFAULT_FG_COLOR);

        let mut open = true;
        ctx.show_viewport_immediate(
            egui::ViewportId::from_hash_of("about_box"),
            egui::ViewportBuilder::default()
                .with_title("About")
                .with_inner_size(ABOUT_SIZE)
                .with_position(pos)
                .with_decorations(false)
                .with_resizable(false)
                .with_always_on_top(),
            |ctx, _class| {
                egui::CentralPanel::default()
                    .frame(egui::Frame::NONE.fill(bg))
                    .show(ctx, |ui| {
                        let rect = ui.max_rect();
                        ui.painter()
                            .rect_filled(rect.shrink(settings::BORDER_WIDTH), 0.0, inner);
                        ui.vertical_centered(|ui| {
                            ui.add_space(10.0);
                            ui.label(RichText::new("Clock Overlay").size(14.0).color(fg));
                            let y = ui.cursor().min.y + 2.0;
                            ui.painter().hline(
                                egui::Rangef::new(rect.left() + 14.0, rect.right() - 14.0),
                                y,
                                egui::Stroke::new(1.0, fg),
                            );
                            ui.add_space(8.0);
                            ui.label(
                                RichText::new(format!("Ver. {}", env!("CARGO_PKG_VERSION")))
                                    .size(12.0)
                                    .color(fg),
                            );
                            ui.label(RichText::new("©2026 Free").size(12.0).color(fg));
                        });
                        let response =
                            ui.interact(rect, egui::Id::new("about_surface"), Sense::click());
                        if response.clicked() {
                            open = false;
                        }
                    });
                if ctx.input(|i| i.key_pressed(egui::Key::Escape) || i.viewport().close_requested())
                {
                    open = false;
                }
            },
        );
        if !open {
            self.about_open = false;
        }
    }
}

impl eframe::App for ClockApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_hotkey(ctx);
        self.ensure_position(ctx);

        let now = Local::now().naive_local();
        if self.ticker.due(now) {
            self.time_text = tick::format_display(&now);
            if self.alarm_guard.should_fire(&now.time(), &self.settings.alarm) {
                let message = self.settings.alarm.display_message().to_string();
                log::info!(
                    "闹钟触发: {:02}:{:02} {}",
                    self.settings.alarm.hour,
                    self.settings.alarm.minute,
                    message
                );
                notifier::play_chime();
                notifier::send_notification("⏰ Alarm", &message);
            }
            self.ticker.rearm(now);
        }

        self.draw_widget(ctx);
        self.show_alarm_dialog(ctx);
        self.show_about(ctx);

        // 按到期点安排下一次唤醒；其余刷新由输入事件驱动
        if let Some(wait) = self.ticker.until_deadline(now) {
            ctx.request_repaint_after(wait);
        }
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        // 外框之外完全透明
        Color32::TRANSPARENT.to_normalized_gamma_f32()
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.ticker.cancel();
        log::info!("时钟悬浮窗退出");
    }
}

/// 闹钟对话框的临时表单
struct AlarmForm {
    hour: String,
    minute: String,
    message: String,
    enabled: bool,
    error: Option<String>,
}

impl AlarmForm {
    fn from_settings(alarm: &AlarmSettings) -> Self {
        Self {
            hour: format!("{:02}", alarm.hour),
            minute: format!("{:02}", alarm.minute),
            message: alarm.message.clone(),
            enabled: alarm.enabled,
            error: None,
        }
    }

    fn validate(&self) -> Result<AlarmSettings, String> {
        let hour = self
            .hour
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|h| *h <= 23)
            .ok_or_else(|| "Hour must be 0-23".to_string())?;
        let minute = self
            .minute
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|m| *m <= 59)
            .ok_or_else(|| "Minute must be 0-59".to_string())?;
        Ok(AlarmSettings {
            enabled: self.enabled,
            hour,
            minute,
            message: self.message.clone(),
        })
    }
}

fn color_or_default(value: &str, fallback: &str) -> Color32 {
    let (r, g, b) = settings::parse_hex_color(value)
        .or_else(|| settings::parse_hex_color(fallback))
        .unwrap_or((0, 0, 0));
    Color32::from_rgb(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_form_round_trips_settings() {
        let alarm = AlarmSettings {
            enabled: true,
            hour: 14,
            minute: 30,
            message: "Break".to_string(),
        };
        let form = AlarmForm::from_settings(&alarm);
        assert_eq!(form.hour, "14");
        assert_eq!(form.minute, "30");
        assert_eq!(form.validate(), Ok(alarm));
    }

    #[test]
    fn alarm_form_rejects_out_of_range_input() {
        let mut form = AlarmForm::from_settings(&AlarmSettings::default());
        form.hour = "24".to_string();
        assert!(form.validate().is_err());

        form.hour = "23".to_string();
        form.minute = "60".to_string();
        assert!(form.validate().is_err());

        form.minute = "59".to_string();
        assert!(form.validate().is_ok());
    }

    #[test]
    fn alarm_form_rejects_non_numeric_input() {
        let mut form = AlarmForm::from_settings(&AlarmSettings::default());
        form.hour = "noon".to_string();
        assert!(form.validate().is_err());

        form.hour = String::new();
        assert!(form.validate().is_err());
    }

    #[test]
    fn unknown_color_string_falls_back_to_default() {
        let fallback = color_or_default("chartreuse", settings::DEFAULT_BG_COLOR);
        assert_eq!(fallback, Color32::from_rgb(0xf9, 0xc2, 0x89));

        let parsed = color_or_default("#010203", settings::DEFAULT_BG_COLOR);
        assert_eq!(parsed, Color32::from_rgb(1, 2, 3));
    }
}
