//! Log formatting and subscriber setup.
//!
//! Lines look like `[timestamp] [component] [level] message`. Events logged
//! through the `component_*!` macros carry a `component` field that picks
//! the bracketed name; everything else is attributed to the client.

use anyhow::{anyhow, Result};
use std::fmt;
use std::io::IsTerminal;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

const RESET: &str = "\x1b[0m";
const TIMESTAMP_COLOR: &str = "\x1b[36m";

const COMPONENT_WIDTH: usize = 20;
const LOG_LEVEL_WIDTH: usize = 7;

/// Crates whose events follow the configured level
const CRATES: [&str; 6] = [
    "meshtastic_proto",
    "meshtastic_wire",
    "meshtastic_crypto",
    "meshtastic_session",
    "meshtastic_receive",
    "meshtastic_client",
];

/// Label and ANSI color per level
fn level_style(level: &Level) -> (&'static str, &'static str) {
    match *level {
        Level::ERROR => ("✗ ERROR", "\x1b[91m"),
        Level::WARN => ("⚠ WARN", "\x1b[93m"),
        Level::INFO => ("ℹ INFO", "\x1b[32m"),
        Level::DEBUG => ("◦ DEBUG", "\x1b[90m"),
        Level::TRACE => ("◦ TRACE", "\x1b[90m"),
    }
}

/// Formatter producing `[timestamp] [component] [level] message`
pub struct MeshLogFormatter {
    service_name: String,
    color_enabled: bool,
}

/// Log at info level on behalf of a component
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(component = $component, $($arg)*)
    };
}

/// Log at warn level on behalf of a component
#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(component = $component, $($arg)*)
    };
}

/// Log at debug level on behalf of a component
#[macro_export]
macro_rules! component_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::debug!(component = $component, $($arg)*)
    };
}

/// Log at error level on behalf of a component
#[macro_export]
macro_rules! component_error {
    ($component:expr, $($arg:tt)*) => {
        tracing::error!(component = $component, $($arg)*)
    };
}

impl MeshLogFormatter {
    /// Formatter for `service_name`, colored when stderr is a terminal
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            color_enabled: is_terminal(),
        }
    }

    /// Force colors on or off
    pub fn with_color(mut self, enabled: bool) -> Self {
        self.color_enabled = enabled;
        self
    }

    fn format_component(&self, component: Option<&str>) -> String {
        let name = match component {
            Some(comp) => format!("{}-{}", self.service_name, comp),
            None => self.service_name.clone(),
        };

        if name.chars().count() > COMPONENT_WIDTH {
            let truncated: String = name.chars().take(COMPONENT_WIDTH - 1).collect();
            format!("{}…", truncated)
        } else {
            format!("{:<width$}", name, width = COMPONENT_WIDTH)
        }
    }

    fn format_log_level(&self, level: &Level) -> String {
        // icons take two columns
        format!("{:<width$}", level_style(level).0, width = LOG_LEVEL_WIDTH + 2)
    }

    fn color_for_level(&self, level: &Level) -> &'static str {
        if self.color_enabled {
            level_style(level).1
        } else {
            ""
        }
    }

    /// Render one line; used by the `FormatEvent` impl
    fn render(
        &self,
        writer: &mut dyn fmt::Write,
        level: &Level,
        component: Option<&str>,
        message: &str,
    ) -> fmt::Result {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let color = self.color_for_level(level);
        let reset = if self.color_enabled { RESET } else { "" };
        let cyan = if self.color_enabled { TIMESTAMP_COLOR } else { "" };

        writeln!(
            writer,
            "{}[{}] [{}] [{}{}{}] {}{}",
            cyan,
            timestamp,
            self.format_component(component),
            color,
            self.format_log_level(level),
            reset,
            message,
            reset
        )
    }
}

impl<S, N> FormatEvent<S, N> for MeshLogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.render(
            &mut writer,
            event.metadata().level(),
            visitor.component.as_deref(),
            &visitor.message,
        )
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    component: Option<String>,
}

fn unquote(debug: String) -> String {
    match debug.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.to_string(),
        None => debug,
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = unquote(format!("{:?}", value)),
            "component" => self.component = Some(unquote(format!("{:?}", value))),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "component" => self.component = Some(value.to_string()),
            _ => {}
        }
    }
}

fn is_terminal() -> bool {
    if std::env::var("TERM").unwrap_or_default() == "dumb" {
        return false;
    }
    std::io::stderr().is_terminal()
}

/// Filter at `info` for foreign crates and `level` for ours
pub fn env_filter(level: &str) -> Result<EnvFilter> {
    let mut filter = EnvFilter::new("info");
    for krate in CRATES {
        filter = filter.add_directive(format!("{}={}", krate, level).parse()?);
    }
    Ok(filter)
}

/// Install the global subscriber
pub fn init_logging(level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level)?)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .event_format(MeshLogFormatter::new("meshtastic"))
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_without_color() {
        let formatter = MeshLogFormatter::new("meshtastic").with_color(false);
        let mut line = String::new();
        formatter
            .render(&mut line, &tracing::Level::WARN, Some("serial"), "radio rebooted")
            .unwrap();

        assert!(line.starts_with('['));
        assert!(line.contains("[meshtastic-serial   ]"));
        assert!(line.contains("⚠ WARN"));
        assert!(line.ends_with("radio rebooted\n"));
        assert!(!line.contains('\x1b'));
    }

    #[test]
    fn test_long_component_is_truncated() {
        let formatter = MeshLogFormatter::new("meshtastic").with_color(false);
        let name = formatter.format_component(Some("a-very-long-component"));
        assert_eq!(name.chars().count(), COMPONENT_WIDTH);
        assert!(name.ends_with('…'));
    }

    #[test]
    fn test_env_filter_accepts_levels() {
        assert!(env_filter("debug").is_ok());
        assert!(env_filter("trace").is_ok());
    }
}
