use chrono::Utc;
use client_core::{time_ago, BatteryBand, PointerEvent, ScreenRect, SortMode, Viewport};
use eframe::egui;
use shared::domain::{Point, RobotControl, TaskStatus};

use super::app::DesktopGuiApp;
use super::canvas::EguiCanvas;
use crate::backend_bridge::commands::BackendCommand;

const SORT_MODES: [SortMode; 2] = [SortMode::Priority, SortMode::Time];

fn battery_color(band: BatteryBand) -> egui::Color32 {
    match band {
        BatteryBand::Green => egui::Color32::from_rgb(40, 167, 69),
        BatteryBand::Yellow => egui::Color32::from_rgb(255, 193, 7),
        BatteryBand::Orange => egui::Color32::from_rgb(253, 126, 20),
        BatteryBand::Red => egui::Color32::from_rgb(220, 53, 69),
    }
}

fn to_point(pos: egui::Pos2) -> Point {
    Point::new(pos.x as f64, pos.y as f64)
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

impl DesktopGuiApp {
    pub(super) fn show_dashboard(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("robot_status_panel")
            .resizable(false)
            .default_width(240.0)
            .show(ctx, |ui| {
                self.show_robot_status(ui);
                ui.separator();
                self.show_robot_controls(ui);
                ui.separator();
                self.show_current_task(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_map(ui);
        });
    }

    fn show_robot_status(&self, ui: &mut egui::Ui) {
        ui.heading("Robot");
        let pose = self.telemetry.pose();
        egui::Grid::new("robot_status_grid")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                ui.label("Status");
                ui.label(pose.status.map_or("unknown", |s| s.label()));
                ui.end_row();

                ui.label("Battery");
                match (pose.battery, self.telemetry.battery_band()) {
                    (Some(level), Some(band)) => {
                        ui.colored_label(battery_color(band), format!("{level:.0}%"));
                    }
                    _ => {
                        ui.label("-");
                    }
                }
                ui.end_row();

                ui.label("Load");
                ui.label(self.telemetry.load_label());
                ui.end_row();

                ui.label("Floor");
                ui.label(optional(pose.floor.as_deref()));
                ui.end_row();

                ui.label("Speed");
                ui.label(pose.speed.map_or_else(|| "-".to_string(), |s| format!("{s:.1} m/s")));
                ui.end_row();

                ui.label("Link");
                ui.label(match pose.connected {
                    Some(true) => "online",
                    Some(false) => "offline",
                    None => "-",
                });
                ui.end_row();

                ui.label("Position");
                ui.label(format!("({:.0}, {:.0})", pose.position.x, pose.position.y));
                ui.end_row();
            });
    }

    fn show_robot_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for (action, label) in [
                (RobotControl::Pause, "Pause"),
                (RobotControl::Resume, "Resume"),
                (RobotControl::Stop, "Stop"),
            ] {
                let enabled = self.telemetry.can_apply(action);
                if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                    let now_ms = Utc::now().timestamp_millis();
                    if let Some(command) = self.telemetry.apply_control(action, now_ms) {
                        self.dispatch(BackendCommand::SendRobotControl(command));
                    }
                }
            }
        });
    }

    fn show_current_task(&self, ui: &mut egui::Ui) {
        ui.heading("Current task");
        let Some(task) = self.map_view.scene().task() else {
            ui.weak("No active delivery");
            return;
        };
        let status = match task.status {
            TaskStatus::InProgress => "in progress",
            TaskStatus::InQueue => "in queue",
        };
        ui.label(format!(
            "From ({:.0}, {:.0}) to ({:.0}, {:.0})",
            task.source.x, task.source.y, task.destination.x, task.destination.y
        ));
        ui.label(format!("Status: {status}"));
    }

    fn show_map(&mut self, ui: &mut egui::Ui) {
        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::hover());
        self.map_view.layout(ScreenRect {
            min: to_point(rect.min),
            size: Viewport::new(rect.width() as f64, rect.height() as f64),
        });

        let (pressed, released, pos) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.latest_pos(),
            )
        });
        if let Some(pos) = pos {
            if pressed {
                self.map_view.pointer(PointerEvent::Down(to_point(pos)));
            } else if self.map_view.is_dragging() {
                self.map_view.pointer(PointerEvent::Move(to_point(pos)));
            }
        }
        if released {
            self.map_view.pointer(PointerEvent::Up);
        }
        if self.map_view.is_dragging() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        }

        let painter = ui.painter_at(rect);
        if rect.width() >= 1.0 && rect.height() >= 1.0 {
            let mut canvas = EguiCanvas::new(painter.clone(), rect);
            self.map_view.draw(Some(&mut canvas));
        }

        let overlay = if self.map_view.is_loading() {
            Some("Loading map...")
        } else if !self.map_view.scene().is_drawable() {
            Some("Waiting for map")
        } else {
            None
        };
        if let Some(text) = overlay {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                text,
                egui::FontId::proportional(18.0),
                egui::Color32::DARK_GRAY,
            );
        }
    }

    pub(super) fn show_tasks(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("add_task_panel")
            .resizable(false)
            .default_width(280.0)
            .show(ctx, |ui| {
                self.show_add_task_form(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Delivery queue");
                ui.separator();
                ui.label("Sort by");
                let mut mode = self.queue.sort_mode();
                for candidate in SORT_MODES {
                    ui.selectable_value(&mut mode, candidate, candidate.label());
                }
                if mode != self.queue.sort_mode() {
                    self.queue.set_sort_mode(mode);
                }
            });
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                egui::Grid::new("task_queue_grid")
                    .num_columns(4)
                    .striped(true)
                    .show(ui, |ui| {
                        ui.strong("#");
                        ui.strong("Task");
                        ui.strong("Priority");
                        ui.strong("Added");
                        ui.end_row();

                        for task in self.queue.sorted() {
                            ui.label(task.id.to_string());
                            ui.label(&task.name);
                            ui.label(task.priority.label());
                            ui.label(time_ago(&task.time_added))
                                .on_hover_text(&task.time_added);
                            ui.end_row();
                        }
                    });
            });
        });
    }

    fn show_add_task_form(&mut self, ui: &mut egui::Ui) {
        ui.heading("Add task");
        let form = &mut self.delivery_form;
        ui.label("Nurse name");
        ui.text_edit_singleline(&mut form.nurse_name);
        ui.label("Supplies (comma separated)");
        ui.text_edit_singleline(&mut form.supplies);
        ui.label("Source location");
        ui.text_edit_singleline(&mut form.source_location);
        ui.label("Destination rooms (comma separated)");
        ui.text_edit_singleline(&mut form.destination_rooms);
        ui.checkbox(&mut form.urgent, "Urgent");
        ui.label("Notes");
        ui.text_edit_multiline(&mut form.notes);
        ui.add_space(6.0);
        if ui.button("Add to queue").clicked() {
            self.submit_delivery();
        }
    }

    pub(super) fn show_voice(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Voice commands");
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.voice_input)
                        .hint_text("Transcribed command")
                        .desired_width(360.0),
                );
                let submitted =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Record").clicked() || submitted {
                    self.record_voice_command();
                }
            });
            ui.separator();

            let mut mark_sent = None;
            egui::ScrollArea::vertical().show(ui, |ui| {
                if self.voice_commands.is_empty() {
                    ui.weak("No voice commands yet");
                }
                for command in &self.voice_commands {
                    ui.horizontal(|ui| {
                        let when = chrono::DateTime::from_timestamp_millis(command.timestamp)
                            .map(|at| time_ago(&at.to_rfc3339()))
                            .unwrap_or_default();
                        ui.label(&command.command);
                        ui.weak(when);
                        if command.sent_to_bot {
                            ui.weak("sent");
                        } else if ui.small_button("Mark sent").clicked() {
                            mark_sent = Some(command.id.clone());
                        }
                    });
                }
            });
            if let Some(id) = mark_sent {
                self.dispatch(BackendCommand::MarkVoiceCommandSent(id));
            }
        });
    }
}
