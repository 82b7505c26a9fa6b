use ammonia::Builder;
use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

lazy_static! {
    static ref LANGUAGE_CLASS: Regex = Regex::new(r"^language-[A-Za-z0-9_+#.-]+$")
        .expect("Invalid LANGUAGE_CLASS regex pattern");
}

/// Strips executable or otherwise unsafe content from markup.
pub trait MarkupSanitizer {
    fn sanitize(&self, markup: &str) -> String;
}

/// ammonia-backed sanitizer tuned for rendered markdown.
pub struct AmmoniaSanitizer {
    builder: Builder<'static>,
}

impl AmmoniaSanitizer {
    pub fn new() -> Self {
        Self {
            builder: create_secure_sanitizer(),
        }
    }
}

impl Default for AmmoniaSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupSanitizer for AmmoniaSanitizer {
    fn sanitize(&self, markup: &str) -> String {
        self.builder.clean(markup).to_string()
    }
}

#[cfg(test)]
pub(crate) fn sanitize_html(html: &str) -> String {
    create_secure_sanitizer().clean(html).to_string()
}

fn create_secure_sanitizer() -> Builder<'static> {
    // ammonia's defaults already drop scripts, event handlers and
    // javascript: URLs. On top of that keep code language classes and
    // task list checkboxes. Every surviving input is forced into a
    // disabled checkbox.
    let mut builder = Builder::default();
    builder
        .add_tags(&["input"])
        .add_tag_attributes("input", &["type", "checked", "disabled"])
        .set_tag_attribute_value("input", "type", "checkbox")
        .set_tag_attribute_value("input", "disabled", "")
        .add_tag_attributes("code", &["class"])
        .attribute_filter(filter_attribute);
    builder
}

fn filter_attribute<'u>(element: &str, attribute: &str, value: &'u str) -> Option<Cow<'u, str>> {
    match (element, attribute) {
        ("code", "class") => {
            let kept: Vec<&str> = value
                .split_whitespace()
                .filter(|class| LANGUAGE_CLASS.is_match(class))
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(Cow::Owned(kept.join(" ")))
            }
        }
        _ => Some(Cow::Borrowed(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_class_keeps_only_language() {
        let html = r#"<pre><code class="language-rust evil">fn main() {}</code></pre>"#;
        let sanitized = sanitize_html(html);
        assert!(sanitized.contains(r#"class="language-rust""#));
        assert!(!sanitized.contains("evil"));
    }

    #[test]
    fn test_code_class_without_language_is_dropped() {
        let sanitized = sanitize_html(r#"<code class="highlight">x</code>"#);
        assert_eq!(sanitized, "<code>x</code>");
    }

    #[test]
    fn test_task_checkbox_is_unchanged() {
        let html = r#"<input type="checkbox" checked="" disabled="">"#;
        assert_eq!(sanitize_html(html), html);
    }

    #[test]
    fn test_inputs_become_disabled_checkboxes() {
        let sanitized = sanitize_html(r#"<input type="password">"#);
        assert!(!sanitized.contains("password"));
        assert!(sanitized.contains(r#"type="checkbox""#));
        assert!(sanitized.contains(r#"disabled="""#));
    }

    #[test]
    fn test_enabled_checkbox_and_text_field_are_disabled() {
        let sanitized = sanitize_html(r#"<input type="checkbox"> <input name="pw">"#);
        assert!(!sanitized.contains("pw"));
        assert_eq!(sanitized.matches("<input").count(), 2);
        assert_eq!(sanitized.matches(r#"type="checkbox""#).count(), 2);
        assert_eq!(sanitized.matches(r#"disabled="""#).count(), 2);
    }

    #[test]
    fn test_sanitizer_struct_matches_free_function() {
        let html = r#"<p onclick="steal()">Hi <img src="x.png" onerror="boom()"></p>"#;
        assert_eq!(AmmoniaSanitizer::new().sanitize(html), sanitize_html(html));
    }
}
