#[cfg(test)]
mod unit_tests {
    use super::super::*;

    struct FailingConverter {
        partial: Option<&'static str>,
    }

    impl MarkupConverter for FailingConverter {
        fn convert(&self, _source: &str) -> Result<String, RenderError> {
            match self.partial {
                Some(markup) => Err(RenderError::Partial {
                    markup: markup.to_string(),
                    reason: "unterminated construct".to_string(),
                }),
                None => Err(RenderError::Panicked("boom".to_string())),
            }
        }
    }

    #[test]
    fn test_sanitize_html_removes_scripts() {
        let html = r#"<p>Hello</p><script>alert('XSS')</script><p>World</p>"#;
        let sanitized = sanitize::sanitize_html(html);
        assert!(!sanitized.contains("<script"));
        assert!(!sanitized.contains("alert"));
        assert!(sanitized.contains("Hello"));
        assert!(sanitized.contains("World"));
    }

    #[test]
    fn test_sanitize_removes_dangerous_attributes() {
        let html = r#"<a href="javascript:alert('XSS')">Click me</a>"#;
        let sanitized = sanitize::sanitize_html(html);
        assert!(!sanitized.contains("javascript:"));
        assert!(sanitized.contains("Click me"));
    }

    #[test]
    fn test_sanitize_removes_event_handlers() {
        let html = r#"<img src="cat.png" alt="cat" onerror="alert(1)">"#;
        let sanitized = sanitize::sanitize_html(html);
        assert!(!sanitized.contains("onerror"));
        assert!(sanitized.contains(r#"src="cat.png""#));
    }

    #[test]
    fn test_render_safe_strips_embedded_script() {
        let renderer = Renderer::new();
        let source = "Hello\n\n<script>alert('x')</script>\n\n**World**";
        let safe = renderer.render_safe(source);
        assert!(!safe.contains("<script"));
        assert!(!safe.contains("alert"));
        assert!(safe.contains("<p>Hello</p>"));
        assert!(safe.contains("<strong>World</strong>"));
    }

    #[test]
    fn test_render_unsafe_keeps_full_fidelity() {
        let renderer = Renderer::new();
        let source = "Hello\n\n<script>alert('x')</script>";
        let rendered = renderer.render(source);
        assert!(rendered.unsafe_markup.contains("<script>"));
        assert!(!rendered.safe.contains("<script"));
        assert_eq!(rendered.unsafe_markup, renderer.render_unsafe(source));
        assert_eq!(rendered.safe, renderer.render_safe(source));
    }

    #[test]
    fn test_render_empty_source() {
        let renderer = Renderer::new();
        assert_eq!(renderer.render_safe(""), "");
        assert_eq!(renderer.render_unsafe(""), "");
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = Renderer::new();
        let source = "# Title\n\n- a\n- b\n\n| x | y |\n|---|:-:|\n| 1 | 2 |";
        assert_eq!(renderer.render(source), renderer.render(source));
    }

    #[test]
    fn test_safe_markup_preserves_structure() {
        let renderer = Renderer::new();
        let source = "# H1\n\n## H2\n\n_em_ **strong** ~~del~~ `code`\n\n> quote\n\n1. one\n2. two\n\n[Google](https://google.com)\n\n![logo](https://example.com/logo.png)";
        let safe = renderer.render_safe(source);
        for needle in [
            "<h1>", "<h2>", "<em>", "<strong>", "<del>", "<code>", "<blockquote>", "<ol>",
            r#"href="https://google.com""#,
            r#"src="https://example.com/logo.png""#,
        ] {
            assert!(safe.contains(needle), "missing {needle} in {safe}");
        }
    }

    #[test]
    fn test_safe_markup_keeps_table_alignment() {
        let renderer = Renderer::new();
        let safe = renderer.render_safe("| a | b |\n| :--- | :---: |\n| 1 | 2 |");
        assert!(safe.contains("<table>"));
        assert!(safe.contains(r#"align="center""#));
    }

    #[test]
    fn test_safe_markup_keeps_code_language() {
        let renderer = Renderer::new();
        let safe = renderer.render_safe("```javascript\nconsole.log(1);\n```");
        assert!(safe.contains(r#"<code class="language-javascript">"#));
    }

    #[test]
    fn test_safe_markup_keeps_task_checkbox() {
        let renderer = Renderer::new();
        let safe = renderer.render_safe("- [x] done\n- [ ] todo");
        assert!(safe.contains(r#"type="checkbox""#));
    }

    #[test]
    fn test_safe_markup_only_keeps_disabled_checkboxes() {
        let renderer = Renderer::new();
        let safe = renderer.render_safe("<input type=\"checkbox\"> <input name=\"pw\">");
        assert!(!safe.contains("pw"));
        assert_eq!(safe.matches("<input").count(), 2);
        assert_eq!(safe.matches(r#"disabled="""#).count(), 2);
    }

    #[test]
    fn test_safe_markup_line_breaks() {
        let renderer = Renderer::new();
        let safe = renderer.render_safe("one\ntwo");
        assert!(safe.contains("one<br>"));
    }

    #[test]
    fn test_javascript_link_is_neutralized() {
        let renderer = Renderer::new();
        let safe = renderer.render_safe("[click](javascript:alert(1))");
        assert!(!safe.contains("javascript:"));
        assert!(safe.contains("click"));
    }

    #[test]
    fn test_converter_failure_yields_empty_sanitized_markup() {
        let renderer = Renderer::with_parts(FailingConverter { partial: None }, AmmoniaSanitizer::new());
        assert_eq!(renderer.render_safe("anything"), "");
        assert_eq!(renderer.render_unsafe("anything"), "");
    }

    #[test]
    fn test_converter_partial_output_is_still_sanitized() {
        let renderer = Renderer::with_parts(
            FailingConverter {
                partial: Some("<p>kept</p><script>alert(1)</script>"),
            },
            AmmoniaSanitizer::new(),
        );
        let rendered = renderer.render("whatever");
        assert_eq!(rendered.safe, "<p>kept</p>");
        assert!(rendered.unsafe_markup.contains("<script>"));
    }

    #[test]
    fn test_sanitize_is_idempotent_on_rendered_markup() {
        let renderer = Renderer::new();
        let source = "# T\n\n<div onclick=\"x()\">raw <b>html</b></div>\n\n- [ ] task\n\n```rust\nlet a = 1;\n```\n\n[l](https://a.b \"title\")";
        let once = renderer.render_safe(source);
        assert_eq!(renderer.sanitize(&once), once);
    }

    mod property_tests {
        use super::super::super::*;
        use proptest::prelude::*;

        const FRAGMENTS: &[&str] = &[
            "plain text ",
            "<p>para</p>",
            "<strong>bold</strong>",
            "<em>it</em>",
            "<del>gone</del>",
            "<h1>head</h1>",
            "<blockquote><p>q</p></blockquote>",
            "<ul><li>item</li></ul>",
            "<pre><code class=\"language-rust\">let x;</code></pre>",
            "<code class=\"nope\">c</code>",
            "<a href=\"https://example.com\">link</a>",
            "<a href=\"javascript:alert(1)\">bad</a>",
            "<img src=\"x.png\" onerror=\"alert(1)\">",
            "<script>alert(1)</script>",
            "<style>body{}</style>",
            "<div onclick=\"x()\">div</div>",
            "<table><thead><tr><th align=\"left\">h</th></tr></thead><tbody><tr><td>d</td></tr></tbody></table>",
            "<input type=\"checkbox\" disabled=\"\">",
            "<iframe src=\"https://evil\"></iframe>",
            "&lt;escaped&gt; &amp; ",
        ];

        fn markup() -> impl Strategy<Value = String> {
            prop::collection::vec(prop::sample::select(FRAGMENTS), 0..12).prop_map(|parts| parts.concat())
        }

        proptest! {
            #[test]
            fn sanitize_twice_equals_sanitize_once(m in markup()) {
                let once = sanitize_html(&m);
                prop_assert_eq!(sanitize_html(&once), once);
            }

            #[test]
            fn safe_render_never_contains_script(source in "[a-z *_#>\\n-]{0,80}", tail in markup()) {
                let renderer = Renderer::new();
                let safe = renderer.render_safe(&format!("{source}\n\n{tail}"));
                prop_assert!(!safe.contains("<script"));
                prop_assert!(!safe.contains("javascript:"));
                prop_assert!(!safe.contains("onerror"));
            }
        }
    }
}

mod snapshot_tests {
    use super::super::*;
    use insta::assert_snapshot;

    #[test]
    fn snapshot_inline_formatting() {
        let safe = Renderer::new().render_safe("**bold** and _em_ and ~~gone~~");
        assert_snapshot!(safe.trim_end(), @"<p><strong>bold</strong> and <em>em</em> and <del>gone</del></p>");
    }

    #[test]
    fn snapshot_event_handler_is_stripped() {
        let safe = Renderer::new().render_safe("Hi <span onclick=\"x()\">there</span>");
        assert_snapshot!(safe.trim_end(), @r#"<p>Hi <span>there</span></p>"#);
    }
}
