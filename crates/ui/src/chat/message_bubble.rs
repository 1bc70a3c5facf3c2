use chatpane_protocol::ToolDetails;
use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{
    ActiveTheme, Icon, IconName, Sizable, h_flex, label::Label, text::TextView, v_flex,
};
use serde_json::Value;

use crate::chat::layout::{BubbleKind, BubbleProps};

const USER_BUBBLE_MAX_WIDTH: Pixels = px(540.);
const USER_BUBBLE_PADDING_X: Pixels = px(14.);
const USER_BUBBLE_PADDING_Y: Pixels = px(10.);
const MARKDOWN_SAFE_FALLBACK_THRESHOLD_BYTES: usize = 128 * 1024;
const MAX_TOOL_DETAIL_CHARS: usize = 400;

/// Renders one message as a user, tool or assistant bubble.
#[derive(IntoElement)]
pub struct MessageBubble {
    id: ElementId,
    kind: BubbleKind,
    content: SharedString,
    is_streaming: bool,
    tool_lines: Vec<SharedString>,
}

impl MessageBubble {
    pub fn new(
        id: impl Into<ElementId>,
        kind: BubbleKind,
        content: impl Into<SharedString>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            content: content.into(),
            is_streaming: false,
            tool_lines: Vec::new(),
        }
    }

    pub fn from_props(props: &BubbleProps<'_>) -> Self {
        let id = ElementId::Name(SharedString::from(format!("message-{}", props.key)));
        let mut bubble = Self::new(id, props.kind, props.content.to_string())
            .streaming(props.is_streaming.unwrap_or(false));
        if let Some(details) = &props.tool {
            bubble = bubble.tool(details);
        }
        bubble
    }

    pub fn streaming(mut self, is_streaming: bool) -> Self {
        self.is_streaming = is_streaming;
        self
    }

    pub fn tool(mut self, details: &ToolDetails<'_>) -> Self {
        self.tool_lines = tool_detail_lines(details)
            .into_iter()
            .map(SharedString::from)
            .collect();
        self
    }

    fn render_user(self, cx: &App) -> AnyElement {
        let theme = cx.theme();
        let content = if self.content.is_empty() {
            SharedString::from(" ")
        } else {
            self.content
        };

        v_flex()
            .w_full()
            .items_end()
            .child(
                div()
                    .max_w(USER_BUBBLE_MAX_WIDTH)
                    .px(USER_BUBBLE_PADDING_X)
                    .py(USER_BUBBLE_PADDING_Y)
                    .rounded_lg()
                    .bg(theme.accent)
                    .text_color(theme.accent_foreground)
                    .child(Label::new(content).text_sm()),
            )
            .into_any_element()
    }

    fn render_tool(self, cx: &App) -> AnyElement {
        let theme = cx.theme();

        v_flex()
            .w_full()
            .gap_1()
            .px_3()
            .py_2()
            .rounded_lg()
            .border_1()
            .border_color(theme.border)
            .bg(theme.muted)
            .child(
                h_flex()
                    .gap_2()
                    .items_center()
                    .child(Icon::new(IconName::Search).small())
                    .child(
                        Label::new(self.content)
                            .text_sm()
                            .text_color(theme.muted_foreground),
                    ),
            )
            .children(self.tool_lines.into_iter().map(|line| {
                Label::new(line)
                    .text_xs()
                    .text_color(theme.muted_foreground)
            }))
            .into_any_element()
    }

    fn render_assistant(self, cx: &App) -> AnyElement {
        let theme = cx.theme();
        let is_streaming = self.is_streaming;

        let content = if self.content.trim().is_empty() {
            let empty_label = if is_streaming {
                "Waiting for response..."
            } else {
                "(empty response)"
            };
            Label::new(empty_label).text_sm().into_any_element()
        } else if self.content.len() > MARKDOWN_SAFE_FALLBACK_THRESHOLD_BYTES {
            // Oversized payloads skip markdown parsing.
            Label::new(self.content).text_sm().into_any_element()
        } else {
            TextView::markdown(self.id, self.content)
                .selectable(true)
                .into_any_element()
        };

        v_flex()
            .w_full()
            .gap_2()
            .child(
                Label::new("Assistant")
                    .text_xs()
                    .text_color(theme.foreground.opacity(0.5)),
            )
            .child(content)
            .when(is_streaming, |column| {
                column.child(
                    h_flex()
                        .w_full()
                        .gap_2()
                        .items_center()
                        .child(div().size(px(8.)).rounded_full().bg(theme.primary))
                        .child(
                            Label::new("Streaming")
                                .text_xs()
                                .text_color(theme.foreground.opacity(0.65)),
                        ),
                )
            })
            .into_any_element()
    }
}

impl RenderOnce for MessageBubble {
    fn render(self, _window: &mut Window, cx: &mut App) -> impl IntoElement {
        match self.kind {
            BubbleKind::User => self.render_user(cx),
            BubbleKind::Tool => self.render_tool(cx),
            BubbleKind::Assistant => self.render_assistant(cx),
        }
    }
}

/// Human-readable lines describing a tool call, JSON rendered compactly.
pub fn tool_detail_lines(details: &ToolDetails<'_>) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(name) = details.name.filter(|name| !name.trim().is_empty()) {
        lines.push(format!("Tool: {name}"));
    }

    if let Some(arguments) = details.arguments.filter(|arguments| !arguments.is_empty()) {
        let arguments = Value::Object(arguments.clone()).to_string();
        lines.push(format!("Arguments: {}", truncate_detail(&arguments)));
    }

    if let Some(result) = details.result {
        lines.push(format!("Result: {}", truncate_detail(&result.to_string())));
    }

    lines
}

fn truncate_detail(text: &str) -> String {
    if text.chars().count() <= MAX_TOOL_DETAIL_CHARS {
        return text.to_string();
    }

    let mut truncated = text.chars().take(MAX_TOOL_DETAIL_CHARS).collect::<String>();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;

    #[test]
    fn lists_name_arguments_and_result() {
        let mut arguments = Map::new();
        arguments.insert("customer_id".to_string(), json!("c-42"));
        let result = json!({ "plan": "gold" });
        let details = ToolDetails {
            name: Some("lookup_account"),
            arguments: Some(&arguments),
            result: Some(&result),
        };

        assert_eq!(
            tool_detail_lines(&details),
            vec![
                "Tool: lookup_account".to_string(),
                r#"Arguments: {"customer_id":"c-42"}"#.to_string(),
                r#"Result: {"plan":"gold"}"#.to_string(),
            ]
        );
    }

    #[test]
    fn skips_missing_or_empty_fields() {
        let arguments = Map::new();
        let details = ToolDetails {
            name: Some(" "),
            arguments: Some(&arguments),
            result: None,
        };
        assert!(tool_detail_lines(&details).is_empty());
    }

    #[test]
    fn long_results_are_truncated() {
        let result = json!("x".repeat(MAX_TOOL_DETAIL_CHARS * 2));
        let details = ToolDetails {
            name: None,
            arguments: None,
            result: Some(&result),
        };

        let lines = tool_detail_lines(&details);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with('…'));
        assert_eq!(
            lines[0].chars().count(),
            "Result: ".len() + MAX_TOOL_DETAIL_CHARS + 1
        );
    }
}
