//! `Canvas` over an egui painter clipped to the map rect.

use client_core::{Canvas, Color, Viewport};
use eframe::egui;
use shared::domain::Point;

const BACKGROUND: egui::Color32 = egui::Color32::WHITE;

pub struct EguiCanvas {
    painter: egui::Painter,
    rect: egui::Rect,
}

impl EguiCanvas {
    pub fn new(painter: egui::Painter, rect: egui::Rect) -> Self {
        Self { painter, rect }
    }

    fn to_screen(&self, point: Point) -> egui::Pos2 {
        egui::pos2(
            self.rect.min.x + point.x as f32,
            self.rect.min.y + point.y as f32,
        )
    }
}

pub fn color32(color: Color) -> egui::Color32 {
    egui::Color32::from_rgb(color.r, color.g, color.b)
}

impl Canvas for EguiCanvas {
    fn viewport(&self) -> Viewport {
        Viewport::new(self.rect.width() as f64, self.rect.height() as f64)
    }

    fn clear(&mut self) {
        self.painter
            .rect_filled(self.rect, egui::CornerRadius::ZERO, BACKGROUND);
    }

    fn line(&mut self, from: Point, to: Point, width: f64, color: Color) {
        self.painter.line_segment(
            [self.to_screen(from), self.to_screen(to)],
            egui::Stroke::new(width as f32, color32(color)),
        );
    }

    fn polyline(&mut self, points: &[Point], width: f64, color: Color) {
        let points = points.iter().map(|p| self.to_screen(*p)).collect();
        self.painter.add(egui::Shape::line(
            points,
            egui::Stroke::new(width as f32, color32(color)),
        ));
    }

    fn fill_rect(&mut self, min: Point, width: f64, height: f64, color: Color) {
        let rect = egui::Rect::from_min_size(
            self.to_screen(min),
            egui::vec2(width as f32, height as f32),
        );
        self.painter
            .rect_filled(rect, egui::CornerRadius::ZERO, color32(color));
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        self.painter
            .circle_filled(self.to_screen(center), radius as f32, color32(color));
    }
}
