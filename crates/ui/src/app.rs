use std::sync::Arc;

use chatpane_backend::{
    BackendConfig, BackendEventStream, BackendStreamHandle, BackendWorker, ChatBackend, ScriptedBackend,
    create_backend,
};
use chatpane_protocol::{ChatEvent, ChatSession};
use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    label::Label,
    v_flex,
};
use gpui_tokio_bridge::Tokio;

use crate::chat::{ConversationView, MessageInput, Stop, Submit};
use crate::settings::{ChatSettings, SettingsChanged, SettingsState};

pub const APP_TITLE: &str = "Chatpane";
/// Shown when the backend stream closes before finishing the turn.
pub const STREAM_CLOSED_MESSAGE: &str = "The assistant stopped responding before finishing.";
#[cfg(target_os = "macos")]
const WINDOW_TOOLBAR_LEFT_SAFE_PADDING: f32 = 78.0;
#[cfg(not(target_os = "macos"))]
const WINDOW_TOOLBAR_LEFT_SAFE_PADDING: f32 = 16.0;

gpui::actions!(shell, [NewChat, ToggleTheme, Quit]);

fn window_toolbar_height(window: &Window) -> Pixels {
    (1.75 * window.rem_size()).max(px(34.0))
}

/// Builds the backend named by the settings, falling back to the built-in script.
pub fn initialize_backend(settings: &ChatSettings) -> Arc<dyn ChatBackend> {
    let config = settings.to_backend_config();
    match create_backend(config.clone()) {
        Ok(backend) => {
            tracing::info!(backend = backend.id(), "chat backend ready");
            backend
        }
        Err(error) => {
            tracing::error!(%error, "failed to create chat backend, using built-in script");
            Arc::new(ScriptedBackend::new(config.chunk_delay))
        }
    }
}

/// Whether saved settings describe a different backend than the running one.
pub fn backend_config_changed(current: &BackendConfig, settings: &ChatSettings) -> bool {
    settings.to_backend_config() != *current
}

/// Window root: owns the conversation state, the backend and the stream tasks,
/// and feeds the conversation view and input box.
pub struct ChatAppShell {
    session: ChatSession,
    backend: Arc<dyn ChatBackend>,
    backend_config: BackendConfig,
    conversation_view: Entity<ConversationView>,
    message_input: Entity<MessageInput>,
    settings_state: Entity<SettingsState>,
    stream_generation: u64,
    stream_worker_task: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
    stream_reader_task: Option<Task<()>>,
    title_bar_should_move: bool,
}

impl ChatAppShell {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let settings_state = SettingsState::new(cx);
        let settings = settings_state.read(cx).settings();
        let backend = initialize_backend(&settings);

        let shell = cx.weak_entity();
        let conversation_view = cx.new(|cx| {
            ConversationView::new(settings.smooth_scroll, cx).on_suggested_question(
                move |prompt, _window, cx| {
                    let shell = shell.clone();
                    // The click arrives while the view is being updated; submit once it is released.
                    cx.defer(move |cx| {
                        let _ = shell.update(cx, |shell, cx| shell.submit_prompt(prompt, cx));
                    });
                },
            )
        });
        let message_input = cx.new(|cx| MessageInput::new(window, cx));

        cx.subscribe(&message_input, |this, _, event: &Submit, cx| {
            this.submit_prompt(&event.content, cx);
        })
        .detach();

        cx.subscribe(&message_input, |this, _, _event: &Stop, cx| {
            this.stop(cx);
        })
        .detach();

        cx.subscribe(&settings_state, |this, _, event: &SettingsChanged, cx| {
            this.handle_settings_changed(event, cx);
        })
        .detach();

        Self {
            session: ChatSession::new(settings.customer_id.clone()),
            backend,
            backend_config: settings.to_backend_config(),
            conversation_view,
            message_input,
            settings_state,
            stream_generation: 0,
            stream_worker_task: None,
            stream_reader_task: None,
            title_bar_should_move: false,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn submit_prompt(&mut self, prompt: &str, cx: &mut Context<Self>) {
        let Some(request) = self.session.submit(prompt) else {
            return;
        };

        tracing::info!(
            backend = self.backend.id(),
            session_id = ?request.session_id,
            customer_id = %request.customer_id,
            "starting assistant turn"
        );

        match self.backend.stream_chat(request) {
            Ok(handle) => self.spawn_stream_pipeline(handle, cx),
            Err(error) => {
                tracing::error!(%error, "backend rejected the request");
                self.session.apply(ChatEvent::error(error.to_string()));
            }
        }

        self.sync_conversation(cx);
    }

    fn spawn_stream_pipeline(&mut self, handle: BackendStreamHandle, cx: &mut Context<Self>) {
        self.stream_generation += 1;
        self.spawn_stream_worker(handle.worker, cx);
        self.spawn_stream_reader(handle.stream, cx);
    }

    fn spawn_stream_worker(&mut self, worker: BackendWorker, cx: &mut Context<Self>) {
        self.stream_worker_task = Some(Tokio::spawn(cx, worker));
    }

    fn spawn_stream_reader(&mut self, mut stream: BackendEventStream, cx: &mut Context<Self>) {
        let generation = self.stream_generation;

        self.stream_reader_task = Some(cx.spawn(async move |this, cx| {
            while let Some(event) = stream.recv().await {
                let _ = this.update(cx, |this, cx| {
                    this.handle_stream_event(generation, event, cx);
                });
            }

            let _ = this.update(cx, |this, cx| {
                this.handle_stream_closed(generation, cx);
            });
        }));
    }

    fn handle_stream_event(&mut self, generation: u64, event: ChatEvent, cx: &mut Context<Self>) {
        if generation != self.stream_generation {
            return;
        }

        tracing::debug!(?event, "applying chat event");
        self.session.apply(event);
        self.sync_conversation(cx);
    }

    fn handle_stream_closed(&mut self, generation: u64, cx: &mut Context<Self>) {
        if generation != self.stream_generation {
            return;
        }

        self.stream_worker_task = None;
        self.stream_reader_task = None;

        if self.session.is_processing() {
            tracing::warn!(
                backend = self.backend.id(),
                "backend stream ended before a terminal event"
            );
            self.session.apply(ChatEvent::error(STREAM_CLOSED_MESSAGE));
            self.sync_conversation(cx);
        }
    }

    /// Drops the stream tasks; dropping the reader drops the stream, which cancels the worker.
    fn abandon_stream(&mut self) {
        self.stream_generation += 1;
        self.stream_worker_task = None;
        self.stream_reader_task = None;
    }

    fn stop(&mut self, cx: &mut Context<Self>) {
        if !self.session.is_processing() {
            return;
        }

        tracing::info!(session_id = ?self.session.session_id(), "stopping assistant turn");
        self.abandon_stream();
        self.session.cancel();
        self.sync_conversation(cx);
    }

    fn new_chat(&mut self, cx: &mut Context<Self>) {
        self.abandon_stream();

        let settings = self.settings_state.read(cx).settings();
        if settings.customer_id == self.session.customer_id() {
            self.session.reset();
        } else {
            self.session = ChatSession::new(settings.customer_id.clone());
        }

        self.conversation_view
            .update(cx, |view, cx| view.reset_scroll_tracking(cx));
        self.sync_conversation(cx);
    }

    fn toggle_theme(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let settings = self
            .settings_state
            .read(cx)
            .settings()
            .as_ref()
            .clone()
            .with_toggled_theme();
        settings.apply_theme(Some(window), cx);

        if let Err(error) = self
            .settings_state
            .update(cx, |state, cx| state.update_settings(settings, cx))
        {
            tracing::error!(%error, "failed to save theme preference");
        }
    }

    fn handle_settings_changed(&mut self, event: &SettingsChanged, cx: &mut Context<Self>) {
        let settings = &event.settings;
        self.conversation_view
            .update(cx, |view, _| view.set_smooth_scroll(settings.smooth_scroll));

        if backend_config_changed(&self.backend_config, settings) {
            self.backend = initialize_backend(settings);
            self.backend_config = settings.to_backend_config();
        }
        cx.notify();
    }

    fn sync_conversation(&mut self, cx: &mut Context<Self>) {
        let messages = self.session.messages().to_vec();
        let is_processing = self.session.is_processing();

        self.conversation_view.update(cx, |view, cx| {
            view.set_conversation(messages, is_processing, cx);
        });
        self.message_input.update(cx, |input, cx| {
            input.set_processing(is_processing, cx);
        });
        cx.notify();
    }

    fn render_top_bar(&self, window: &Window, cx: &Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let theme_icon = if theme.mode.is_dark() {
            IconName::Sun
        } else {
            IconName::Moon
        };

        h_flex()
            .id("app-top-bar")
            .window_control_area(WindowControlArea::Drag)
            .on_mouse_down(
                MouseButton::Left,
                cx.listener(|this, _, _window, _cx| {
                    this.title_bar_should_move = true;
                }),
            )
            .on_mouse_up(
                MouseButton::Left,
                cx.listener(|this, _, _window, _cx| {
                    this.title_bar_should_move = false;
                }),
            )
            .on_mouse_move(cx.listener(|this, _, window, _cx| {
                if this.title_bar_should_move {
                    this.title_bar_should_move = false;
                    window.start_window_move();
                }
            }))
            .w_full()
            .h(window_toolbar_height(window))
            .flex_shrink_0()
            .pl(px(WINDOW_TOOLBAR_LEFT_SAFE_PADDING))
            .pr_4()
            .items_center()
            .justify_between()
            .bg(theme.background)
            .border_b_1()
            .border_color(theme.border)
            .child(
                Label::new(APP_TITLE)
                    .text_sm()
                    .font_medium()
                    .text_color(theme.foreground),
            )
            .child(
                h_flex()
                    .gap_2()
                    .items_center()
                    .on_mouse_down(MouseButton::Left, |_, _, cx| cx.stop_propagation())
                    .child(
                        div()
                            .id("chat-backend-id")
                            .px_2()
                            .py_1()
                            .rounded_full()
                            .bg(theme.muted)
                            .border_1()
                            .border_color(theme.border)
                            .text_xs()
                            .text_color(theme.muted_foreground)
                            .child(SharedString::from(self.backend.name().to_string())),
                    )
                    .child(
                        Button::new("new-chat")
                            .ghost()
                            .small()
                            .icon(IconName::Plus)
                            .tooltip("New chat")
                            .on_click(cx.listener(|this, _, _window, cx| {
                                this.new_chat(cx);
                            })),
                    )
                    .child(
                        Button::new("toggle-theme")
                            .ghost()
                            .small()
                            .icon(theme_icon)
                            .tooltip("Toggle theme")
                            .on_click(cx.listener(|this, _, window, cx| {
                                this.toggle_theme(window, cx);
                            })),
                    ),
            )
    }
}

impl Render for ChatAppShell {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .id("app-shell")
            .size_full()
            .bg(theme.background)
            .on_action(cx.listener(|this, _: &NewChat, _window, cx| {
                this.new_chat(cx);
            }))
            .on_action(cx.listener(|this, _: &ToggleTheme, window, cx| {
                this.toggle_theme(window, cx);
            }))
            .child(self.render_top_bar(window, cx))
            .child(
                v_flex()
                    .id("main-content")
                    .flex_1()
                    .w_full()
                    .min_h_0()
                    .overflow_hidden()
                    .child(self.conversation_view.clone()),
            )
            .child(
                div()
                    .w_full()
                    .flex_shrink_0()
                    .border_t_1()
                    .border_color(theme.border)
                    .child(self.message_input.clone()),
            )
    }
}
