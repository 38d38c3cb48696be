use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEvent {
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
    HardDrop,
    Pause,
    Start,
}

impl InputEvent {
    pub const ALL: [InputEvent; 7] = [
        InputEvent::MoveLeft,
        InputEvent::MoveRight,
        InputEvent::SoftDrop,
        InputEvent::Rotate,
        InputEvent::HardDrop,
        InputEvent::Pause,
        InputEvent::Start,
    ];

    /// Browser-style key codes: arrows, space, and Esc/P for pause.
    pub fn from_key_code(code: u32) -> Option<InputEvent> {
        match code {
            37 => Some(InputEvent::MoveLeft),
            39 => Some(InputEvent::MoveRight),
            40 => Some(InputEvent::SoftDrop),
            38 => Some(InputEvent::Rotate),
            32 => Some(InputEvent::HardDrop),
            27 | 80 => Some(InputEvent::Pause),
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            InputEvent::MoveLeft => "left",
            InputEvent::MoveRight => "right",
            InputEvent::SoftDrop => "down",
            InputEvent::Rotate => "rotate",
            InputEvent::HardDrop => "drop",
            InputEvent::Pause => "pause",
            InputEvent::Start => "start",
        }
    }

    pub fn from_id(id: &str) -> Option<InputEvent> {
        InputEvent::ALL.into_iter().find(|event| event.id() == id)
    }

    /// Events accepted while paused or after game over.
    pub fn is_control(self) -> bool {
        matches!(self, InputEvent::Pause | InputEvent::Start)
    }
}

pub const DEFAULT_INPUT_CAPACITY: usize = 64;

/// Inputs received between ticks, applied in arrival order at the start of
/// the next tick. Oldest entries are dropped once `capacity` is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputQueue {
    pending: VecDeque<InputEvent>,
    capacity: usize,
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_INPUT_CAPACITY)
    }
}

impl InputQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Returns false when an older input had to be dropped.
    pub fn push(&mut self, event: InputEvent) -> bool {
        let mut kept_all = true;
        if self.pending.len() >= self.capacity {
            self.pending.pop_front();
            kept_all = false;
        }
        self.pending.push_back(event);
        kept_all
    }

    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.pending.drain(..)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
