//! System prompt construction.
//!
//! The template may contain `{now}`, `{user}`, `{roles}` and `{company}`.
//! Caller context that is absent renders as nothing. A template that leaves
//! out `{user}` or `{company}` gets a sentence about each appended, only when
//! the context supplies it.

use chrono::{DateTime, Utc};

use erpchat_common::api::chat::RequestContext;

const DEFAULT_TEMPLATE: &str = "You are an AI assistant integrated with ERPNext. \
Please provide accurate and helpful responses based on the following questions \
and data provided by the user. The current date is {now}.";

/// Renders the conversation-seeding system message.
#[derive(Clone, Debug)]
pub struct SystemPrompt {
    template: String,
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl SystemPrompt {
    /// Use `template` when given and non-blank, else the built-in one.
    pub fn new(template: Option<&str>) -> Self {
        match template.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => Self {
                template: t.to_string(),
            },
            None => Self::default(),
        }
    }

    /// Render for a request arriving at `now`.
    pub fn render(&self, now: DateTime<Utc>, context: Option<&RequestContext>) -> String {
        let user = context.and_then(|c| c.user.as_deref()).unwrap_or_default();
        let roles = context.map(|c| c.roles.join(", ")).unwrap_or_default();
        let company = context.and_then(|c| c.company.as_deref()).unwrap_or_default();

        let mut prompt = self
            .template
            .replace("{now}", &now.format("%Y-%m-%d %H:%M:%S").to_string())
            .replace("{user}", user)
            .replace("{roles}", &roles)
            .replace("{company}", company);

        if !user.is_empty() && !self.template.contains("{user}") {
            prompt.push_str(&format!(" You are assisting {}", user));
            if !roles.is_empty() {
                prompt.push_str(&format!(" (roles: {})", roles));
            }
            prompt.push('.');
        }
        if !company.is_empty() && !self.template.contains("{company}") {
            prompt.push_str(&format!(" Their default company is {}.", company));
        }

        prompt
    }
}
