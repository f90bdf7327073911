//! Calculator plugin.
//!
//! Evaluates arithmetic as you type, either inline (any input that parses
//! as an expression) or behind the `calc` keyword. Entering a result copies
//! it to the clipboard.

use std::sync::Arc;

use async_trait::async_trait;
use evalexpr::Value;
use steward_core::{Command, CommandType, KeyStatus, ResultItem};
use steward_plugin_api::{EngineContext, EnterOutcome, Host, Plugin, PluginMeta, PluginResult};

const NAME: &str = "calculate";
const ICON: &str = "iconfont/calc.svg";

pub struct Calculator {
    meta: PluginMeta,
    commands: Vec<Command>,
    subtitle: String,
    host: Arc<dyn Host>,
}

impl Calculator {
    pub fn new(host: Arc<dyn Host>) -> Self {
        let title = host.localized(&format!("{}_title", NAME), &[]);
        let subtitle = host.localized(&format!("{}_subtitle", NAME), &[]);

        let commands = vec![
            Command::new("calc", CommandType::Keyword)
                .with_title(title.clone())
                .with_subtitle(subtitle.clone())
                .with_icon(ICON)
                .with_editable(false),
            Command::new("expr", CommandType::Always)
                .with_title(title.clone())
                .with_subtitle(subtitle.clone())
                .with_icon(ICON)
                .with_editable(false),
        ];

        Self {
            meta: PluginMeta::new("Calculator", 4)
                .with_category("other")
                .with_icon(ICON)
                .with_title(title),
            commands,
            subtitle,
            host,
        }
    }
}

pub fn factory(ctx: &EngineContext) -> Arc<dyn Plugin> {
    Arc::new(Calculator::new(Arc::clone(ctx.host())))
}

/// Evaluate an arithmetic expression, `None` if it is not one.
///
/// Integer literals are evaluated as floats so `1/2` is `0.5`.
pub fn evaluate(expr: &str) -> Option<String> {
    let expr = expr.trim();
    if !expr.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    match evalexpr::eval(&floatify(expr)) {
        Ok(Value::Float(value)) if value.is_finite() => Some(format_number(value)),
        Ok(Value::Int(value)) => Some(value.to_string()),
        _ => None,
    }
}

/// Append `.0` to bare integer literals.
fn floatify(expr: &str) -> String {
    let chars: Vec<char> = expr.chars().collect();
    let mut out = String::with_capacity(expr.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let in_word = i > 0 && (chars[i - 1].is_alphanumeric() || matches!(chars[i - 1], '_' | '.'));
        if chars[i].is_ascii_digit() && !in_word {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            out.extend(&chars[start..i]);

            let continues = chars
                .get(i)
                .is_some_and(|&c| c.is_alphanumeric() || matches!(c, '_' | '.'));
            if !continues {
                out.push_str(".0");
            }
            continue;
        }

        out.push(chars[i]);
        i += 1;
    }

    out
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }

    let text = format!("{:.10}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[async_trait]
impl Plugin for Calculator {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn commands(&self) -> &[Command] {
        &self.commands
    }

    async fn accepts(&self, _command: &Command, input: &str) -> bool {
        evaluate(input).is_some()
    }

    async fn on_input(
        &self,
        query: &str,
        _command: &Command,
    ) -> PluginResult<Option<Vec<ResultItem>>> {
        let Some(result) = evaluate(query) else {
            return Ok(None);
        };

        let mut item = ResultItem::new("copy", result.clone())
            .with_icon(ICON)
            .with_desc(self.subtitle.clone())
            .with_content(serde_json::Value::String(result));
        item.universal = true;

        Ok(Some(vec![item]))
    }

    async fn on_enter(
        &self,
        item: &ResultItem,
        _command: &Command,
        _query: &str,
        _key_status: &KeyStatus,
    ) -> PluginResult<EnterOutcome> {
        self.host.write_clipboard(&item.title).await?;
        tracing::debug!("Copied calculation result {}", item.title);
        Ok(EnterOutcome::Done)
    }
}
