//! Logging bootstrap for the succession binaries.
//!
//! Human-readable output goes through the `tracing-subscriber` fmt layer. With JSON enabled
//! every event becomes one [`LogRecord`] line on stderr, carrying the enclosing span names so
//! `#[instrument]` context (migration id, agent id) survives into log shippers.

use anyhow::anyhow;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::time::Instant;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// One JSON log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
    /// Enclosing spans, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessContext {
    pub version: String,
    pub hostname: String,
    pub pid: u32,
}

impl ProcessContext {
    pub fn current() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            hostname,
            pid: std::process::id(),
        }
    }
}

/// Layer emitting [`LogRecord`] lines
pub struct JsonLogLayer {
    process: ProcessContext,
}

impl JsonLogLayer {
    pub fn new() -> Self {
        Self {
            process: ProcessContext::current(),
        }
    }
}

impl Default for JsonLogLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for JsonLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let spans = ctx
            .event_scope(event)
            .map(|scope| scope.from_root().map(|span| span.name().to_string()).collect())
            .unwrap_or_default();

        let meta = event.metadata();
        let record = LogRecord {
            timestamp: Utc::now().to_rfc3339(),
            level: meta.level().to_string(),
            target: meta.target().to_string(),
            message: fields.message.unwrap_or_default(),
            spans,
            fields: fields.values,
            process: Some(self.process.clone()),
        };

        if let Ok(line) = serde_json::to_string(&record) {
            let _ = writeln!(io::stderr().lock(), "{line}");
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: Map<String, Value>,
}

impl FieldCollector {
    fn put(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(text) => text,
                other => other.to_string(),
            });
        } else {
            self.values.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // NaN and infinities have no JSON form
        self.put(field, serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::Bool(value));
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is unset
    pub level: Level,
    pub json_output: bool,
    pub color_output: bool,
    pub include_line_numbers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_output: false,
            color_output: true,
            include_line_numbers: cfg!(debug_assertions),
        }
    }
}

impl LoggingConfig {
    /// Unknown names keep the current level
    pub fn with_level_name(mut self, level: &str) -> Self {
        if let Ok(parsed) = level.trim().parse::<Level>() {
            self.level = parsed;
        }
        self
    }

    pub fn with_json(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_string().to_lowercase()))
    }
}

/// Install the process-wide subscriber. Fails if one is already set.
pub fn init_structured_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let output: Box<dyn Layer<Registry> + Send + Sync> = if config.json_output {
        Box::new(JsonLogLayer::new())
    } else {
        Box::new(
            fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(config.color_output)
                .with_line_number(config.include_line_numbers)
                .with_span_events(FmtSpan::CLOSE),
        )
    };

    let subscriber = Registry::default().with(output).with(config.filter());
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("logging already initialised: {e}"))
}

/// Logs how long an operation took once its result is known
pub struct OperationTimer {
    operation: String,
    started: Instant,
    fields: Map<String, Value>,
}

impl OperationTimer {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            started: Instant::now(),
            fields: Map::new(),
        }
    }

    pub fn add_field(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(value) = serde_json::to_value(value) {
            self.fields.insert(key.into(), value);
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn finish_with_result<T, E: std::fmt::Display>(self, result: &Result<T, E>) {
        let duration_ms = self.elapsed_ms();
        let fields = Value::Object(self.fields);
        match result {
            Ok(_) => tracing::info!(
                operation = %self.operation,
                duration_ms,
                fields = %fields,
                "{} finished",
                self.operation
            ),
            Err(e) => tracing::error!(
                operation = %self.operation,
                duration_ms,
                fields = %fields,
                error = %e,
                "{} failed",
                self.operation
            ),
        }
    }
}
