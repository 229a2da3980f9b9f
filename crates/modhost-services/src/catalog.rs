//! Static service table and the fallback configuration that lists it.

use modhost_core::{Config, ServiceDescriptor, ServiceSettings};
use serde_json::json;

use crate::{echo, reverse, word_stream};
use crate::{EchoService, ReverseService, WordStreamService};

/// Every built-in service, in registration order.
pub fn builtin_catalog() -> Vec<ServiceDescriptor> {
    vec![
        ServiceDescriptor::new(echo::NAME, EchoService::factory),
        ServiceDescriptor::new(word_stream::NAME, WordStreamService::factory),
        ServiceDescriptor::new(reverse::NAME, ReverseService::factory),
    ]
}

/// Configuration used when the config file cannot be loaded.
///
/// Built fresh on every call.
pub fn default_config() -> Config {
    let text_param = |label: &str| json!({ "name": "text", "type": "text", "label": label });

    Config::default()
        .with_service(
            "echo",
            ServiceSettings::default().with_parameter(text_param("Text")),
        )
        .with_service(
            "word-stream",
            ServiceSettings::default()
                .streamable(true)
                .with_parameter(text_param("Text"))
                .with_parameter(json!({
                    "name": "delay_ms",
                    "type": "number",
                    "label": "Delay (ms)",
                    "default": 0
                })),
        )
        .with_service(
            "reverse",
            ServiceSettings::default()
                .streamable(true)
                .with_parameter(text_param("Lines")),
        )
}
