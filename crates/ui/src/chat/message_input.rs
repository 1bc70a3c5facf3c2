use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    input::{Input, InputEvent, InputState},
    v_flex,
};

use crate::chat::events::{Stop, Submit};

/// Prompt box with a Send button that turns into Stop while a turn runs.
pub struct MessageInput {
    input_state: Entity<InputState>,
    is_processing: bool,
    pending_newline: bool,
}

impl EventEmitter<Submit> for MessageInput {}
impl EventEmitter<Stop> for MessageInput {}

impl MessageInput {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let input_state = cx.new(|cx| {
            InputState::new(window, cx)
                .placeholder("Ask a question...")
                .clean_on_escape()
                .auto_grow(1, 6)
        });

        cx.subscribe_in(
            &input_state,
            window,
            |this, _, event: &InputEvent, window, cx| {
                let InputEvent::PressEnter { secondary } = event else {
                    return;
                };

                if *secondary || this.pending_newline {
                    // Shift+Enter already inserted its newline; the trailing PressEnter is not a submit.
                    this.pending_newline = false;
                    return;
                }

                this.handle_submit(window, cx);
            },
        )
        .detach();

        Self {
            input_state,
            is_processing: false,
            pending_newline: false,
        }
    }

    pub fn set_processing(&mut self, is_processing: bool, cx: &mut Context<Self>) {
        if self.is_processing == is_processing {
            return;
        }

        self.is_processing = is_processing;
        self.pending_newline = false;
        cx.notify();
    }

    pub fn clear(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            state.set_value("", window, cx);
        });
        self.pending_newline = false;
    }

    fn handle_shift_enter(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        if self.is_processing {
            return;
        }

        self.pending_newline = true;
        self.input_state.update(cx, |state, cx| {
            state.insert("\n", window, cx);
        });
        cx.notify();
    }

    fn handle_submit(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        if self.is_processing {
            return;
        }

        let value = self.input_state.read(cx).value().to_string();
        let Some(prompt) = prepare_prompt(&value) else {
            return;
        };

        cx.emit(Submit::new(prompt));
        self.clear(window, cx);
    }

    fn handle_stop(&mut self, cx: &mut Context<Self>) {
        if !self.is_processing {
            return;
        }

        cx.emit(Stop);
    }
}

/// Strips the newline left by Enter and rejects blank prompts.
pub fn prepare_prompt(value: &str) -> Option<String> {
    let value = value.strip_suffix('\n').unwrap_or(value);
    if value.trim().is_empty() {
        return None;
    }

    Some(value.to_string())
}

impl Render for MessageInput {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let action = if self.is_processing {
            Button::new("stop")
                .small()
                .danger()
                .icon(IconName::CircleX)
                .child("Stop")
                .on_click(cx.listener(|this, _, _window, cx| {
                    this.handle_stop(cx);
                }))
                .into_any_element()
        } else {
            Button::new("send")
                .small()
                .primary()
                .icon(IconName::ArrowUp)
                .child("Send")
                .on_click(cx.listener(|this, _, window, cx| {
                    this.handle_submit(window, cx);
                }))
                .into_any_element()
        };

        v_flex()
            .bg(theme.background)
            .gap_2()
            .p_3()
            .child(
                div()
                    .w_full()
                    .px_3()
                    .py_2()
                    .rounded_lg()
                    .border_1()
                    .border_color(theme.border)
                    .on_key_down(cx.listener(|this, event: &KeyDownEvent, window, cx| {
                        if event.keystroke.key == "enter" && event.keystroke.modifiers.shift {
                            this.handle_shift_enter(window, cx);
                        }
                    }))
                    .child(
                        Input::new(&self.input_state)
                            .w_full()
                            .disabled(self.is_processing),
                    ),
            )
            .child(div().w_full().flex().justify_end().child(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_preparation() {
        assert_eq!(prepare_prompt("hello\n").as_deref(), Some("hello"));
        assert_eq!(prepare_prompt("two\nlines").as_deref(), Some("two\nlines"));
        assert_eq!(prepare_prompt("  \n"), None);
        assert_eq!(prepare_prompt(""), None);
    }
}
