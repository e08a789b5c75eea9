//! Message rendering for alarm and change notifications using Handlebars.
//!
//! Every platform ships a [`TemplateSet`]: one alarm template and one change
//! template, registered under versioned names such as `lark/alarm/v1`.
//! Templates reference event fields by name. Rendering runs in strict mode,
//! so a field the template needs but the event lacks is an error rather
//! than a blank.

use chrono::{DateTime, TimeZone};
use handlebars::{
    Context as HbsContext, Handlebars, Helper, HelperResult, JsonRender, Output, RenderContext,
    RenderErrorReason,
};
use serde::Serialize;

use crate::error::NotifyError;
use crate::events::{AlarmEvent, ChangeEvent, CHANGE_SEPARATOR};

/// Timestamp format used for the `sent_at` field.
pub const SENT_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which of the two templates of a set to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Alarm,
    Change,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Alarm => "alarm",
            Self::Change => "change",
        }
    }
}

/// Versioned pair of templates owned by one platform.
#[derive(Debug, Clone, Copy)]
pub struct TemplateSet {
    pub platform: &'static str,
    pub version: u32,
    pub alarm: &'static str,
    pub change: &'static str,
}

impl TemplateSet {
    /// Registry name of one template, e.g. `lark/change/v1`.
    #[must_use]
    pub fn template_name(&self, kind: EventKind) -> String {
        format!(
            "{}/{}/v{}",
            self.platform.to_ascii_lowercase(),
            kind.as_str(),
            self.version
        )
    }
}

/// `{{change field}}` renders a `{before, now}` pair as `before  ➲  now`.
fn change_helper(
    h: &Helper,
    _: &Handlebars,
    _: &HbsContext,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param = h
        .param(0)
        .filter(|p| !p.is_value_missing())
        .ok_or(RenderErrorReason::ParamNotFoundForIndex("change", 0))?;

    let value = param.value();
    let (Some(before), Some(now)) = (value.get("before"), value.get("now")) else {
        return Err(RenderErrorReason::Other(format!(
            "'{}' is not a before/now pair",
            param.relative_path().map_or("<expr>", String::as_str)
        ))
        .into());
    };

    if before.is_null() || now.is_null() {
        return Err(RenderErrorReason::Other("change pair has a null side".to_string()).into());
    }

    out.write(&before.render())?;
    out.write(CHANGE_SEPARATOR)?;
    out.write(&now.render())?;
    Ok(())
}

#[derive(Serialize)]
struct AlarmContext<'a> {
    #[serde(flatten)]
    event: &'a AlarmEvent,
    mentions: &'a str,
    sent_at: String,
    // Serialized after the flattened event, so it replaces the event's own value.
    interval: u64,
}

#[derive(Serialize)]
struct ChangeContext<'a> {
    #[serde(flatten)]
    event: &'a ChangeEvent,
    mentions: &'a str,
    sent_at: String,
}

/// Compiled templates for one platform.
pub struct MessageRenderer {
    handlebars: Handlebars<'static>,
    alarm_name: String,
    change_name: String,
}

impl MessageRenderer {
    /// Compile both templates of `set`.
    pub fn new(set: &TemplateSet) -> Result<Self, NotifyError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // Payloads are markdown or plain text; HTML escaping would mangle mentions.
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_helper("change", Box::new(change_helper));

        let alarm_name = set.template_name(EventKind::Alarm);
        let change_name = set.template_name(EventKind::Change);

        for (name, source) in [(&alarm_name, set.alarm), (&change_name, set.change)] {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| NotifyError::TemplateSyntax {
                    template: name.clone(),
                    reason: e.to_string(),
                })?;
            tracing::debug!(template = %name, "Registered notification template");
        }

        Ok(Self {
            handlebars,
            alarm_name,
            change_name,
        })
    }

    /// Render the `kind` template against an arbitrary serializable context.
    pub fn render<T: Serialize>(&self, kind: EventKind, context: &T) -> Result<String, NotifyError> {
        let name = match kind {
            EventKind::Alarm => &self.alarm_name,
            EventKind::Change => &self.change_name,
        };

        self.handlebars
            .render(name, context)
            .map_err(|e| NotifyError::TemplateField {
                template: name.clone(),
                reason: e.to_string(),
            })
    }

    /// Render an alarm with its resolved mention string and interval.
    pub fn render_alarm<Tz>(
        &self,
        event: &AlarmEvent,
        mentions: &str,
        interval: u64,
        sent_at: &DateTime<Tz>,
    ) -> Result<String, NotifyError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let context = AlarmContext {
            event,
            mentions,
            sent_at: sent_at.format(SENT_AT_FORMAT).to_string(),
            interval,
        };
        self.render(EventKind::Alarm, &context)
    }

    /// Render a change notice with its resolved mention string.
    pub fn render_change<Tz>(
        &self,
        event: &ChangeEvent,
        mentions: &str,
        sent_at: &DateTime<Tz>,
    ) -> Result<String, NotifyError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let context = ChangeContext {
            event,
            mentions,
            sent_at: sent_at.format(SENT_AT_FORMAT).to_string(),
        };
        self.render(EventKind::Change, &context)
    }

    /// Name under which the `kind` template is registered.
    #[must_use]
    pub fn template_name(&self, kind: EventKind) -> &str {
        match kind {
            EventKind::Alarm => &self.alarm_name,
            EventKind::Change => &self.change_name,
        }
    }
}
