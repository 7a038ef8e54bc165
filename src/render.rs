//! Overlay renderer drawing tracks, trails, groups and alerts.
//!
//! Shapes are always drawn. Text labels (track ids, group ids and the alert list)
//! need a font, loaded from [`RenderConfig::font_path`].

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_text_mut,
};
use imageproc::rect::Rect;
use tracing::debug;

use crate::config::{AnalyticsConfig, RenderConfig};
use crate::entity::FrameData;
use crate::error::RenderError;
use crate::integration::Renderer;

const NORMAL: Rgb<u8> = Rgb([0, 255, 0]);
const RUNNING: Rgb<u8> = Rgb([255, 0, 0]);
const TRAIL: Rgb<u8> = Rgb([255, 255, 0]);
const GROUP: Rgb<u8> = Rgb([255, 0, 255]);
const BANNER_HEIGHT: u32 = 12;
const GROUP_MARKER_RADIUS: i32 = 10;
const ALERT_HEADER: &str = "WARNING / ALERTS:";

/// A piece of text and where its top-left corner goes.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub color: Rgb<u8>,
}

/// Read a font file for [`OverlayRenderer::with_font`].
pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc, RenderError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| RenderError::FontIo {
        path: path.to_path_buf(),
        source,
    })?;
    FontArc::try_from_vec(bytes).map_err(|source| RenderError::InvalidFont {
        path: path.to_path_buf(),
        source,
    })
}

/// Draws analytics overlays onto a copy of the frame's RGB buffer.
#[derive(Clone)]
pub struct OverlayRenderer {
    running_speed_threshold: f64,
    draw_trails: bool,
    font: Option<FontArc>,
    label_scale: f32,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(15.0)
    }
}

impl OverlayRenderer {
    /// Boxes of tracks faster than `running_speed_threshold` are drawn in red.
    pub fn new(running_speed_threshold: f64) -> Self {
        Self {
            running_speed_threshold,
            draw_trails: true,
            font: None,
            label_scale: RenderConfig::default().label_scale,
        }
    }

    /// Build from configuration, loading the label font if one is configured.
    pub fn from_config(
        analytics: &AnalyticsConfig,
        render: &RenderConfig,
    ) -> Result<Self, RenderError> {
        let mut renderer = Self::new(analytics.running_speed_threshold)
            .with_trails(render.draw_trails)
            .with_label_scale(render.label_scale);
        if let Some(path) = &render.font_path {
            renderer = renderer.with_font(load_font(path)?);
            debug!(path = %path.display(), "label font loaded");
        }
        Ok(renderer)
    }

    pub fn with_trails(mut self, draw_trails: bool) -> Self {
        self.draw_trails = draw_trails;
        self
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_label_scale(mut self, label_scale: f32) -> Self {
        self.label_scale = label_scale;
        self
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn is_running(&self, speed: f64) -> bool {
        speed > self.running_speed_threshold
    }

    /// Text drawn for `data`: an id above each box, a tag beside each group
    /// centroid, and the alert list under a header in the top-left corner.
    pub fn labels(&self, data: &FrameData) -> Vec<Label> {
        let line = self.label_scale.ceil() as i32;
        let mut labels = Vec::new();

        for track in &data.tracks {
            let color = if self.is_running(track.speed()) {
                RUNNING
            } else {
                NORMAL
            };
            labels.push(Label {
                x: track.bbox.x1,
                y: track.bbox.y1.saturating_sub(line + 2),
                text: format!("ID: {}", track.track_id),
                color,
            });
        }

        for group in &data.groups {
            let (cx, cy) = group.centroid;
            labels.push(Label {
                x: cx.saturating_add(GROUP_MARKER_RADIUS + 5),
                y: cy.saturating_sub(line / 2),
                text: format!("GRP {}", group.group_id),
                color: GROUP,
            });
        }

        if !data.alerts.is_empty() {
            let mut y = BANNER_HEIGHT as i32 + 4;
            let lines = std::iter::once(ALERT_HEADER).chain(data.alerts.iter().map(String::as_str));
            for text in lines {
                labels.push(Label {
                    x: 10,
                    y,
                    text: text.to_string(),
                    color: RUNNING,
                });
                y += line + 4;
            }
        }

        labels
    }
}

impl std::fmt::Debug for OverlayRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayRenderer")
            .field("running_speed_threshold", &self.running_speed_threshold)
            .field("draw_trails", &self.draw_trails)
            .field("font", &self.font.is_some())
            .field("label_scale", &self.label_scale)
            .finish()
    }
}

impl Renderer for OverlayRenderer {
    type Image = RgbImage;
    type Error = RenderError;

    fn annotate(&mut self, data: &FrameData) -> Result<RgbImage, RenderError> {
        let frame = &data.image;
        let expected = frame.width as usize * frame.height as usize * 3;
        let invalid = || RenderError::InvalidBuffer {
            width: frame.width,
            height: frame.height,
            expected,
            got: frame.data.len(),
        };
        if frame.data.len() != expected {
            return Err(invalid());
        }
        let mut canvas =
            RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or_else(invalid)?;

        for track in &data.tracks {
            if self.draw_trails {
                for (a, b) in track.history.iter().zip(track.history.iter().skip(1)) {
                    draw_line_segment_mut(
                        &mut canvas,
                        (a.0 as f32, a.1 as f32),
                        (b.0 as f32, b.1 as f32),
                        TRAIL,
                    );
                }
            }

            let bbox = track.bbox;
            if bbox.width() > 0 && bbox.height() > 0 {
                let color = if self.is_running(track.speed()) {
                    RUNNING
                } else {
                    NORMAL
                };
                let rect = Rect::at(bbox.x1, bbox.y1)
                    .of_size(bbox.width() as u32, bbox.height() as u32);
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }
        }

        for group in &data.groups {
            draw_filled_circle_mut(&mut canvas, group.centroid, GROUP_MARKER_RADIUS, GROUP);
        }

        if !data.alerts.is_empty() && frame.width > 0 && frame.height > 0 {
            let banner = Rect::at(0, 0).of_size(frame.width, BANNER_HEIGHT.min(frame.height));
            draw_filled_rect_mut(&mut canvas, banner, RUNNING);
        }

        if let Some(font) = &self.font {
            let scale = PxScale::from(self.label_scale);
            for label in self.labels(data) {
                draw_text_mut(
                    &mut canvas,
                    label.color,
                    label.x,
                    label.y,
                    scale,
                    font,
                    &label.text,
                );
            }
        }

        Ok(canvas)
    }
}
