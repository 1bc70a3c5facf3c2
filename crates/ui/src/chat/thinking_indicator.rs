use std::time::Duration;

use gpui::*;
use gpui_component::{ActiveTheme, h_flex};

const DOT_COUNT: usize = 3;
const DOT_SIZE: Pixels = px(6.);
const PULSE_DURATION: Duration = Duration::from_millis(1200);
/// Phase lag between neighbouring dots, as a fraction of one pulse.
const DOT_PHASE_OFFSET: f32 = 0.125;
const MIN_DOT_OPACITY: f32 = 0.25;
const MAX_DOT_OPACITY: f32 = 1.0;

/// Three pulsing dots shown while the assistant works without streamed text.
#[derive(IntoElement, Default)]
pub struct ThinkingIndicator;

impl ThinkingIndicator {
    pub fn new() -> Self {
        Self
    }
}

impl RenderOnce for ThinkingIndicator {
    fn render(self, _window: &mut Window, cx: &mut App) -> impl IntoElement {
        let color = cx.theme().primary;

        h_flex()
            .id("thinking-indicator")
            .w_full()
            .p_2()
            .gap_2()
            .items_center()
            .justify_center()
            .children((0..DOT_COUNT).map(move |index| {
                div()
                    .size(DOT_SIZE)
                    .rounded_full()
                    .bg(color)
                    .with_animation(
                        ("thinking-dot", index),
                        Animation::new(PULSE_DURATION).repeat(),
                        move |dot, delta| dot.opacity(dot_opacity(delta, index)),
                    )
            }))
    }
}

/// Opacity of dot `index` at animation progress `delta` in `[0, 1]`.
///
/// Each dot follows a triangle wave shifted by `DOT_PHASE_OFFSET` per index.
pub fn dot_opacity(delta: f32, index: usize) -> f32 {
    let phase = (delta - index as f32 * DOT_PHASE_OFFSET).rem_euclid(1.0);
    let wave = 1.0 - (2.0 * phase - 1.0).abs();
    MIN_DOT_OPACITY + (MAX_DOT_OPACITY - MIN_DOT_OPACITY) * wave
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_stays_within_bounds() {
        for step in 0..=100 {
            let delta = step as f32 / 100.0;
            for index in 0..DOT_COUNT {
                let opacity = dot_opacity(delta, index);
                assert!((MIN_DOT_OPACITY..=MAX_DOT_OPACITY).contains(&opacity));
            }
        }
    }

    #[test]
    fn dots_peak_one_after_another() {
        assert!((dot_opacity(0.5, 0) - MAX_DOT_OPACITY).abs() < 1e-6);
        assert!((dot_opacity(0.5 + DOT_PHASE_OFFSET, 1) - MAX_DOT_OPACITY).abs() < 1e-6);
        assert!((dot_opacity(0.5 + 2.0 * DOT_PHASE_OFFSET, 2) - MAX_DOT_OPACITY).abs() < 1e-6);
        assert!(dot_opacity(0.5, 0) > dot_opacity(0.5, 2));
    }
}
