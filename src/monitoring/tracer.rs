/*!
 * Structured Tracing
 * Subscriber setup and operation spans for the memory subsystem
 */

use crate::core::types::Size;
use crate::memory::types::Category;
use std::time::Instant;
use tracing::{debug, info, span, warn, Level, Span};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable switching the subscriber to JSON output
pub const TRACE_JSON_ENV_VAR: &str = "ENGINE_MEMORY_TRACE_JSON";

/// Resets slower than this are reported at warn level
const SLOW_RESET_MS: u128 = 10;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - ENGINE_MEMORY_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns false when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json_requested() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!("Memory tracing initialized");
    }
    installed
}

fn json_requested() -> bool {
    std::env::var(TRACE_JSON_ENV_VAR)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false)
}

/// Span covering one arena reset
pub struct ResetSpan {
    span: Span,
    start: Instant,
    category: Category,
}

impl ResetSpan {
    pub fn new(category: Category, used: Size) -> Self {
        let span = span!(
            Level::DEBUG,
            "arena_reset",
            category = %category,
            used,
            duration_us = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            category,
        }
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for ResetSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        if duration.as_millis() > SLOW_RESET_MS {
            warn!(
                category = %self.category,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "Slow arena reset"
            );
        } else {
            debug!(
                category = %self.category,
                duration_us = duration.as_micros() as u64,
                "Arena reset completed"
            );
        }
    }
}

/// Open a span for resetting `category`'s arena
pub fn span_reset(category: Category, used: Size) -> ResetSpan {
    ResetSpan::new(category, used)
}
