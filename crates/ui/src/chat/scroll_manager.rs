use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::io;

use chatpane_protocol::Message;
use gpui::{Pixels, ScrollHandle, point, px};
use serde::Serialize;

/// Fraction of the remaining distance covered per frame while smooth scrolling.
const SMOOTH_SCROLL_STEP: f32 = 0.35;
/// Distance below which the scroll snaps to its target.
const SCROLL_SNAP_EPSILON: f32 = 1.0;
/// Frames to keep a request alive so freshly laid out content is reached.
const SETTLE_FRAMES: u8 = 2;

/// Why the end of the list should be brought into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollReason {
    SequenceChanged,
    StreamingContentChanged,
}

/// Detects message-list changes that warrant a scroll request.
///
/// Each observed change yields at most one reason. Observing identical input
/// again yields nothing, and an empty list has no end to scroll to.
#[derive(Debug, Default)]
pub struct ScrollTrigger {
    sequence_fingerprint: Option<u64>,
    streaming_fingerprint: Option<u64>,
}

impl ScrollTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, messages: &[Message]) -> Option<ScrollReason> {
        let sequence = sequence_fingerprint(messages);
        let streaming = streaming_fingerprint(messages);

        let sequence_changed = self.sequence_fingerprint != Some(sequence);
        let streaming_changed = self.streaming_fingerprint != Some(streaming);
        self.sequence_fingerprint = Some(sequence);
        self.streaming_fingerprint = Some(streaming);

        if messages.is_empty() || !sequence_changed {
            return None;
        }

        if streaming_changed && messages.iter().any(Message::is_streaming) {
            Some(ScrollReason::StreamingContentChanged)
        } else {
            Some(ScrollReason::SequenceChanged)
        }
    }

    /// Forgets the last observation so the next non-empty list scrolls again.
    pub fn reset(&mut self) {
        self.sequence_fingerprint = None;
        self.streaming_fingerprint = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingScroll {
    settle_frames: u8,
}

/// Owns the list scroll handle and applies requested scrolls frame by frame.
pub struct ScrollManager {
    scroll_handle: ScrollHandle,
    trigger: ScrollTrigger,
    pending: Option<PendingScroll>,
    smooth: bool,
    requests: u64,
}

impl ScrollManager {
    pub fn new(smooth: bool) -> Self {
        Self {
            scroll_handle: ScrollHandle::new(),
            trigger: ScrollTrigger::new(),
            pending: None,
            smooth,
            requests: 0,
        }
    }

    pub fn handle(&self) -> &ScrollHandle {
        &self.scroll_handle
    }

    pub fn set_smooth(&mut self, smooth: bool) {
        self.smooth = smooth;
    }

    /// Number of scroll requests issued since creation.
    pub fn request_count(&self) -> u64 {
        self.requests
    }

    pub fn has_pending_scroll(&self) -> bool {
        self.pending.is_some()
    }

    /// Feeds the current messages to the trigger and queues a scroll on change.
    pub fn observe(&mut self, messages: &[Message]) -> Option<ScrollReason> {
        let reason = self.trigger.observe(messages)?;
        tracing::debug!(?reason, message_count = messages.len(), "requesting scroll to end");
        self.request_scroll_to_bottom();
        Some(reason)
    }

    pub fn request_scroll_to_bottom(&mut self) {
        self.requests += 1;
        self.pending = Some(PendingScroll {
            settle_frames: SETTLE_FRAMES,
        });
    }

    pub fn reset(&mut self) {
        self.trigger.reset();
        self.pending = None;
        self.scroll_handle.set_offset(point(px(0.), px(0.)));
    }

    /// Moves toward the end of the list and returns whether another frame is needed.
    pub fn apply_pending_scroll(&mut self) -> bool {
        let Some(mut pending) = self.pending else {
            return false;
        };

        let offset = self.scroll_handle.offset();
        let max_offset = self.scroll_handle.max_offset().height;
        // GPUI scrolls down with negative Y offsets, so the end sits at `-max_offset`.
        let target = if max_offset > Pixels::ZERO {
            -f32::from(max_offset)
        } else {
            0.0
        };

        let next = if self.smooth {
            smooth_step(f32::from(offset.y), target)
        } else {
            target
        };
        self.scroll_handle.set_offset(point(offset.x, px(next)));

        let arrived = (next - target).abs() <= SCROLL_SNAP_EPSILON;
        if arrived {
            if pending.settle_frames == 0 {
                self.pending = None;
                return false;
            }
            pending.settle_frames -= 1;
        }

        self.pending = Some(pending);
        true
    }
}

/// Next offset of an exponential approach from `current` to `target`.
pub fn smooth_step(current: f32, target: f32) -> f32 {
    let distance = target - current;
    if distance.abs() <= SCROLL_SNAP_EPSILON {
        return target;
    }

    current + distance * SMOOTH_SCROLL_STEP
}

fn sequence_fingerprint(messages: &[Message]) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write_usize(messages.len());

    for message in messages {
        hasher.write(message.id.as_str().as_bytes());
        hasher.write(message.kind.as_str().as_bytes());
        hasher.write(message.content.as_bytes());
        hasher.write_u8(match message.is_streaming {
            None => 0,
            Some(false) => 1,
            Some(true) => 2,
        });
        if let Some(tool) = &message.tool {
            hasher.write(tool.as_bytes());
        }
        if let Some(arguments) = &message.arguments {
            hash_json(&mut hasher, arguments);
        }
        if let Some(result) = &message.result {
            hash_json(&mut hasher, result);
        }
    }

    hasher.finish()
}

/// Feeds serialized JSON to a hasher without building an intermediate string.
struct HashWriter<'a, H>(&'a mut H);

impl<H: Hasher> io::Write for HashWriter<'_, H> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.0.write(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn hash_json<H: Hasher>(hasher: &mut H, value: &impl Serialize) {
    if let Err(error) = serde_json::to_writer(HashWriter(hasher), value) {
        tracing::debug!(%error, "failed to hash tool payload");
    }
}

/// Hash of the streaming messages' concatenated content.
fn streaming_fingerprint(messages: &[Message]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for message in messages.iter().filter(|message| message.is_streaming()) {
        hasher.write(message.content.as_bytes());
    }
    hasher.finish()
}
