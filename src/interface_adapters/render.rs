// Headless renderer: reports what a real renderer would draw through tracing.

use crate::domain::ports::Renderer;
use crate::domain::view::RenderView;
use crate::domain::{Lobby, Winner};
use crate::interface_adapters::utils::throttle::{log_epoch, should_log};
use std::time::Instant;
use tracing::{debug, info};

pub struct TraceRenderer {
    last_frame_log: Instant,
    last_lobby: Option<Lobby>,
    last_winner: Option<Winner>,
    frames: u64,
}

impl Default for TraceRenderer {
    fn default() -> Self {
        Self {
            last_frame_log: log_epoch(),
            last_lobby: None,
            last_winner: None,
            frames: 0,
        }
    }
}

impl TraceRenderer {
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for TraceRenderer {
    fn render(&mut self, view: &RenderView) {
        self.frames += 1;

        if self.last_lobby != Some(view.lobby) {
            info!(lobby = ?view.lobby, "now viewing");
            self.last_lobby = Some(view.lobby);
        }
        if self.last_winner != view.summary.winner {
            if let Some(winner) = view.summary.winner {
                info!(?winner, "match result");
            }
            self.last_winner = view.summary.winner;
        }

        if should_log(&mut self.last_frame_log) {
            let local = view.entities.iter().find(|e| e.is_local);
            debug!(
                frame = self.frames,
                entities = view.entities.len(),
                x = local.map(|e| e.position.x),
                y = local.map(|e| e.position.y),
                animation = local.map(|e| e.animation.as_str()),
                portal = view.summary.portal_population,
                countdown_s = view.summary.countdown_seconds,
                time_left_ms = view.summary.time_left.map(|d| d.as_millis() as u64),
                "frame"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_render_counts_as_a_frame() {
        let mut renderer = TraceRenderer::default();
        renderer.render(&RenderView::default());
        renderer.render(&RenderView::default());
        assert_eq!(renderer.frames(), 2);
    }
}
