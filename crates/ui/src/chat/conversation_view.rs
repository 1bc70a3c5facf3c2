use std::rc::Rc;

use chatpane_protocol::Message;
use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{ActiveTheme, Icon, IconName, Sizable, h_flex, label::Label, v_flex};

use crate::chat::layout::{
    BubbleProps, ConversationLayout, SUGGESTED_QUESTIONS, SuggestedQuestion, WELCOME_BODY,
    WELCOME_TITLE,
};
use crate::chat::message_bubble::MessageBubble;
use crate::chat::scroll_manager::ScrollManager;
use crate::chat::thinking_indicator::ThinkingIndicator;

const WELCOME_BODY_MAX_WIDTH: Pixels = px(448.);

type SuggestedQuestionHandler = Rc<dyn Fn(&'static str, &mut Window, &mut App)>;

/// Scrollable conversation: the welcome panel while empty, otherwise one
/// bubble per message followed by the thinking indicator when appropriate.
///
/// The view only reads its inputs. Its sole side effect is keeping the end
/// of the list in view when the messages change.
pub struct ConversationView {
    messages: Vec<Message>,
    is_processing: bool,
    scroll_manager: ScrollManager,
    on_suggested_question: Option<SuggestedQuestionHandler>,
}

impl ConversationView {
    pub fn new(smooth_scroll: bool, _cx: &mut Context<Self>) -> Self {
        Self {
            messages: Vec::new(),
            is_processing: false,
            scroll_manager: ScrollManager::new(smooth_scroll),
            on_suggested_question: None,
        }
    }

    /// Installs the callback receiving suggested-question prompts.
    pub fn on_suggested_question(
        mut self,
        handler: impl Fn(&'static str, &mut Window, &mut App) + 'static,
    ) -> Self {
        self.on_suggested_question = Some(Rc::new(handler));
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn set_messages(&mut self, messages: Vec<Message>, cx: &mut Context<Self>) {
        self.messages = messages;
        self.scroll_manager.observe(&self.messages);
        cx.notify();
    }

    pub fn set_processing(&mut self, is_processing: bool, cx: &mut Context<Self>) {
        self.is_processing = is_processing;
        cx.notify();
    }

    /// Replaces both inputs at once, as the owner of the conversation does after each event.
    pub fn set_conversation(
        &mut self,
        messages: Vec<Message>,
        is_processing: bool,
        cx: &mut Context<Self>,
    ) {
        self.is_processing = is_processing;
        self.set_messages(messages, cx);
    }

    pub fn set_smooth_scroll(&mut self, smooth: bool) {
        self.scroll_manager.set_smooth(smooth);
    }

    pub fn reset_scroll_tracking(&mut self, cx: &mut Context<Self>) {
        self.scroll_manager.reset();
        cx.notify();
    }

    fn select_suggestion(&mut self, index: usize, window: &mut Window, cx: &mut Context<Self>) {
        let Some(question) = SuggestedQuestion::get(index) else {
            return;
        };

        let handler = self.on_suggested_question.clone();
        tracing::debug!(
            prompt = question.prompt,
            handled = handler.is_some(),
            "suggested question clicked"
        );
        question.send_to(
            handler.map(|handler| move |prompt: &'static str| handler(prompt, window, cx)),
        );
    }

    fn render_welcome(&self, cx: &Context<Self>) -> AnyElement {
        let theme = cx.theme();
        let icons = [IconName::Info, IconName::CircleUser];

        v_flex()
            .size_full()
            .items_center()
            .justify_center()
            .text_center()
            .p_8()
            .child(
                div()
                    .rounded_full()
                    .bg(theme.accent)
                    .p_4()
                    .mb_4()
                    .child(Icon::new(IconName::Bot).text_color(theme.primary)),
            )
            .child(
                Label::new(WELCOME_TITLE)
                    .text_lg()
                    .font_medium()
                    .mb_2()
                    .text_color(theme.foreground),
            )
            .child(
                Label::new(WELCOME_BODY)
                    .text_sm()
                    .max_w(WELCOME_BODY_MAX_WIDTH)
                    .mb_6()
                    .text_color(theme.muted_foreground),
            )
            .child(
                v_flex().mt_4().gap_3().children(
                    SUGGESTED_QUESTIONS
                        .iter()
                        .zip(icons)
                        .enumerate()
                        .map(|(index, (question, icon))| {
                            let hover_bg = theme.accent;
                            h_flex()
                                .id(("suggested-question", index))
                                .items_center()
                                .gap_2()
                                .p_3()
                                .rounded_sm()
                                .text_sm()
                                .text_color(theme.muted_foreground)
                                .border_l_2()
                                .border_color(theme.primary)
                                .cursor_pointer()
                                .hover(move |row| row.bg(hover_bg))
                                .child(Icon::new(icon).xsmall().text_color(theme.primary))
                                .child(Label::new(question.label))
                                .on_click(cx.listener(move |this, _: &ClickEvent, window, cx| {
                                    this.select_suggestion(index, window, cx);
                                }))
                        }),
                ),
            )
            .into_any_element()
    }

    fn render_thread(
        &self,
        bubbles: &[BubbleProps<'_>],
        show_thinking_indicator: bool,
    ) -> AnyElement {
        v_flex()
            .w_full()
            .gap_1()
            .px_1()
            .children(bubbles.iter().map(MessageBubble::from_props))
            .when(show_thinking_indicator, |list| {
                list.child(ThinkingIndicator::new())
            })
            .into_any_element()
    }
}

impl Render for ConversationView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        if self.scroll_manager.apply_pending_scroll() {
            window.request_animation_frame();
        }

        let body = match ConversationLayout::build(&self.messages, self.is_processing) {
            ConversationLayout::Welcome => self.render_welcome(cx),
            ConversationLayout::Thread {
                bubbles,
                show_thinking_indicator,
            } => self.render_thread(&bubbles, show_thinking_indicator),
        };

        div()
            .id("conversation-view")
            .flex_1()
            .size_full()
            .min_h_0()
            .p_2()
            .bg(cx.theme().background)
            .overflow_y_scroll()
            .track_scroll(self.scroll_manager.handle())
            .child(body)
    }
}
