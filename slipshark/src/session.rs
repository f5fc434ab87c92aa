// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

// Chat session state.
//
// Holds the conversation shown to the user: user questions and the system
// answers streamed back for them. Each question after the first opens a new
// section; `sections()` groups the flat message list for display.

use uuid::Uuid;

use crate::client::{ClientError, StreamingCallbacks};

pub const UNAVAILABLE_MESSAGE: &str =
    "Sorry, the research service is currently unavailable. Please try again later.";

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Set once the answer stops changing.
    pub completed: bool,
    /// First message of a new section.
    pub new_section: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSection {
    pub id: String,
    pub index: usize,
    pub messages: Vec<ChatMessage>,
    pub is_new_section: bool,
    pub is_active: bool,
}

/// Turn a client error into text fit for the conversation.
pub fn user_friendly_error(error: &ClientError) -> String {
    let message = error.to_string();
    if message.contains("404") {
        UNAVAILABLE_MESSAGE.to_string()
    } else {
        format!("Error: {message}")
    }
}

/// Notice shown in place of an answer when the daily quota is spent.
pub fn limit_reached_message(daily_limit: u32) -> String {
    format!(
        "You've reached your daily limit of {daily_limit} queries. Please try again tomorrow \
         or join our waitlist to get notified when we launch the app."
    )
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    /// Id of the system message currently receiving chunks.
    streaming: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Record a question. Returns `None` for blank input.
    pub fn submit_user_message(&mut self, text: &str) -> Option<&ChatMessage> {
        let content = text.trim();
        if content.is_empty() {
            return None;
        }
        let new_section = !self.messages.is_empty();
        self.messages.push(ChatMessage {
            id: format!("user-{}", Uuid::new_v4()),
            role: Role::User,
            content: content.to_string(),
            completed: true,
            new_section,
        });
        self.messages.last()
    }

    /// Add the empty system message that the next stream fills in.
    pub fn begin_response(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        self.messages.push(ChatMessage {
            id: id.clone(),
            role: Role::System,
            content: String::new(),
            completed: false,
            new_section: false,
        });
        self.streaming = Some(id.clone());
        id
    }

    pub fn record_limit_reached(&mut self, daily_limit: u32) {
        self.messages.push(ChatMessage {
            id: Uuid::new_v4().to_string(),
            role: Role::System,
            content: limit_reached_message(daily_limit),
            completed: true,
            new_section: false,
        });
    }

    fn streaming_message(&mut self) -> Option<&mut ChatMessage> {
        let id = self.streaming.as_deref()?;
        self.messages.iter_mut().rev().find(|m| m.id == id)
    }

    fn finish_response(&mut self, content: String) {
        if let Some(message) = self.streaming_message() {
            message.content = content;
            message.completed = true;
        }
        self.streaming = None;
    }

    /// Group messages for display.
    ///
    /// A message flagged `new_section` closes the running section and starts
    /// an active one; everything else joins the running section. Only the
    /// last new section stays active.
    pub fn sections(&self) -> Vec<MessageSection> {
        let mut sections: Vec<MessageSection> = Vec::new();
        let mut current = MessageSection {
            id: "section-0".to_string(),
            index: 0,
            messages: Vec::new(),
            is_new_section: false,
            is_active: false,
        };

        for message in &self.messages {
            if message.new_section {
                if !current.messages.is_empty() {
                    current.is_active = false;
                    sections.push(current);
                }
                let index = sections.len();
                current = MessageSection {
                    id: format!("section-{index}"),
                    index,
                    messages: vec![message.clone()],
                    is_new_section: true,
                    is_active: true,
                };
            } else {
                current.messages.push(message.clone());
            }
        }

        if !current.messages.is_empty() {
            sections.push(current);
        }
        sections
    }
}

impl StreamingCallbacks for ChatSession {
    fn on_chunk(&mut self, chunk: &str) {
        if let Some(message) = self.streaming_message() {
            message.content.push_str(chunk);
        }
    }

    fn on_error(&mut self, error: ClientError) {
        self.finish_response(user_friendly_error(&error));
    }

    fn on_complete(&mut self, full_response: String) {
        self.finish_response(full_response);
    }
}
