//! Recipient mention formatting.
//!
//! Recipients arrive as a comma-separated string. Each platform tells a
//! structured id (open id, member id, mobile number) apart from a plain
//! username and writes each class with its own mention syntax.

/// Placeholder substituted with the recipient token in mention templates.
const ID_PLACEHOLDER: &str = "{id}";

/// Mention syntax for one platform.
#[derive(Debug, Clone, Copy)]
pub struct MentionStyle {
    /// Returns true when the token is a structured platform id
    pub recognize: fn(&str) -> bool,
    /// Template for structured ids
    pub structured: &'static str,
    /// Template for plain usernames
    pub username: &'static str,
}

impl MentionStyle {
    /// Render `raw` as a space-separated mention string.
    ///
    /// Blank input yields an empty string. Order is kept and duplicates are
    /// not removed.
    #[must_use]
    pub fn format(&self, raw: &str) -> String {
        tokens(raw)
            .map(|token| self.mention(token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Format a single recipient token.
    #[must_use]
    pub fn mention(&self, token: &str) -> String {
        let template = if (self.recognize)(token) {
            self.structured
        } else {
            self.username
        };
        template.replace(ID_PLACEHOLDER, token)
    }

    /// Structured ids in `raw`, in input order.
    #[must_use]
    pub fn structured_ids(&self, raw: &str) -> Vec<String> {
        tokens(raw)
            .filter(|token| (self.recognize)(token))
            .map(str::to_string)
            .collect()
    }

    /// Plain usernames in `raw`, in input order.
    #[must_use]
    pub fn usernames(&self, raw: &str) -> Vec<String> {
        tokens(raw)
            .filter(|token| !(self.recognize)(token))
            .map(str::to_string)
            .collect()
    }
}

fn tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty())
}

/// Lark open ids start with `ou_`.
pub const LARK_OPEN_ID_PREFIX: &str = "ou_";

fn is_lark_open_id(token: &str) -> bool {
    token.starts_with(LARK_OPEN_ID_PREFIX)
}

/// Slack member ids: `U` or `W` followed by uppercase alphanumerics.
fn is_slack_member_id(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some('U' | 'W'))
        && token.len() >= 9
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn is_mobile_number(token: &str) -> bool {
    let digits = token.strip_prefix('+').unwrap_or(token);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

pub const LARK: MentionStyle = MentionStyle {
    recognize: is_lark_open_id,
    structured: "<at id={id}></at>",
    username: "<at email={id}></at>",
};

pub const SLACK: MentionStyle = MentionStyle {
    recognize: is_slack_member_id,
    structured: "<@{id}>",
    username: "@{id}",
};

pub const DINGTALK: MentionStyle = MentionStyle {
    recognize: is_mobile_number,
    structured: "@{id}",
    username: "@{id}",
};

pub const WECOM: MentionStyle = MentionStyle {
    recognize: is_mobile_number,
    structured: "@{id}",
    username: "<@{id}>",
};
