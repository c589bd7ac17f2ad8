//! Embedding contract: script attributes and API base derivation.
//!
//! A host page embeds the widget with a script tag carrying `data-*`
//! attributes; the API base is derived from the script's own resolved URL
//! by stripping the known resource suffix.

use anyhow::{Context, Result};

/// Resource suffix under which the widget script is served.
pub const WIDGET_SCRIPT_SUFFIX: &str = "/widget.js";

/// Raw embedding attributes from the script tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedAttrs {
    /// `data-agent-id` (required downstream)
    pub agent_id: Option<String>,
    /// `data-color` (optional hex)
    pub color: Option<String>,
    /// `data-position` (optional, `bottom-left` | `bottom-right`)
    pub position: Option<String>,
}

impl EmbedAttrs {
    /// Collects the known `data-*` attributes from name/value pairs.
    /// Unknown attributes are ignored.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut attrs = Self::default();
        for (name, value) in pairs {
            match name {
                "data-agent-id" => attrs.agent_id = Some(value.to_string()),
                "data-color" => attrs.color = Some(value.to_string()),
                "data-position" => attrs.position = Some(value.to_string()),
                _ => {}
            }
        }
        attrs
    }
}

/// Derives the API base URL from the widget script's resolved URL.
///
/// # Errors
/// Returns an error if the URL is malformed or does not end in the widget
/// script suffix; either is a configuration error that aborts initialization.
pub fn derive_api_base(script_src: &str) -> Result<String> {
    url::Url::parse(script_src)
        .with_context(|| format!("Invalid widget script URL: {script_src}"))?;

    let base = script_src
        .strip_suffix(WIDGET_SCRIPT_SUFFIX)
        .with_context(|| {
            format!("Widget script URL does not end in {WIDGET_SCRIPT_SUFFIX}: {script_src}")
        })?;
    Ok(base.to_string())
}
