use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::Html;
use url::Url;

/// Elements removed outright, text content included.
const DROPPED_TAGS: [&str; 5] = ["img", "script", "embed", "iframe", "hr"];

/// Structural wrappers that would collide with the clipping document;
/// their children are kept, the tags themselves are not.
const UNWRAPPED_TAGS: [&str; 4] = ["html", "body", "div", "span"];

/// Reduces raw HTML to a fragment safe to embed in a larger document.
///
/// Dropped elements vanish with their content, every attribute except
/// `href` is stripped, elements left without visible text are pruned,
/// `h1`/`h2` are demoted to `h3` and whitespace runs are collapsed.
/// The input is parsed once and serialized once; nothing is mutated
/// in place.
pub fn sanitize_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    render_node(fragment.tree.root(), &mut out);
    collapse_whitespace(&out).trim().to_string()
}

/// Canonicalizes an entry URL into its dedup key by clearing the query
/// string. Scheme, host, path and fragment are preserved. Unparseable
/// input passes through unchanged.
pub fn normalize_link(link: &str) -> String {
    match Url::parse(link) {
        Ok(mut url) => {
            url.set_query(None);
            String::from(url)
        }
        Err(_) => link.to_string(),
    }
}

fn render_node(node: NodeRef<Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => escape_text(&text.text, out),
        Node::Element(element) => {
            let name = element.name();
            if DROPPED_TAGS.contains(&name) {
                return;
            }

            let mut text = String::new();
            visible_text(node, &mut text);
            if text.trim().is_empty() {
                return;
            }

            if UNWRAPPED_TAGS.contains(&name) {
                for child in node.children() {
                    render_node(child, out);
                }
                return;
            }

            let tag = match name {
                "h1" | "h2" => "h3",
                other => other,
            };
            out.push('<');
            out.push_str(tag);
            if let Some(href) = element.attr("href") {
                out.push_str(" href=\"");
                escape_attr(href, out);
                out.push('"');
            }
            out.push('>');
            for child in node.children() {
                render_node(child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        // Fragment and document roots carry no markup of their own;
        // comments, doctypes and processing instructions are dropped.
        _ => {
            for child in node.children() {
                render_node(child, out);
            }
        }
    }
}

/// Collects the text a reader would see under `node`, skipping dropped
/// subtrees so that e.g. a paragraph holding only an image counts as empty.
fn visible_text(node: NodeRef<Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(&text.text),
        Node::Element(element) => {
            if DROPPED_TAGS.contains(&element.name()) {
                return;
            }
            for child in node.children() {
                visible_text(child, out);
            }
        }
        _ => {
            for child in node.children() {
                visible_text(child, out);
            }
        }
    }
}

/// Collapses each run of whitespace to its first character.
fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    for c in input.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(c);
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

pub(crate) fn escape_text(input: &str, out: &mut String) {
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

pub(crate) fn escape_attr(input: &str, out: &mut String) {
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(sanitize_html(""), "");
        assert_eq!(sanitize_html("   \n "), "");
    }

    #[test]
    fn removes_dropped_elements_entirely() {
        let output = sanitize_html("<p>Text</p><img src='x'>");
        assert_eq!(output, "<p>Text</p>");

        let output = sanitize_html("<p>Keep</p><script>alert(1)</script><iframe src='y'></iframe>");
        assert!(output.contains("<p>Keep</p>"));
        assert!(!output.contains("script"));
        assert!(!output.contains("iframe"));
        assert!(!output.contains("alert"));
    }

    #[test]
    fn strips_all_attributes_except_href() {
        let output = sanitize_html("<a href='u' onclick='x'>t</a>");
        assert_eq!(output, r#"<a href="u">t</a>"#);

        let output = sanitize_html("<p class='big' style='color:red'>t</p>");
        assert_eq!(output, "<p>t</p>");
    }

    #[test]
    fn prunes_elements_without_visible_text() {
        let output = sanitize_html("<p></p><p>Kept</p>");
        assert_eq!(output, "<p>Kept</p>");
    }

    #[test]
    fn prunes_elements_emptied_by_a_removed_child() {
        // The paragraph held only an image, so it goes too.
        let output = sanitize_html("<p><img src='x'></p><p>Rest</p>");
        assert_eq!(output, "<p>Rest</p>");
    }

    #[test]
    fn demotes_top_level_headings() {
        let output = sanitize_html("<h1>One</h1><h2>Two</h2><h3>Three</h3>");
        assert_eq!(output, "<h3>One</h3><h3>Two</h3><h3>Three</h3>");
    }

    #[test]
    fn unwraps_structural_elements() {
        let output = sanitize_html("<div><span>a</span> b</div>");
        assert_eq!(output, "a b");
    }

    #[test]
    fn collapses_whitespace_runs() {
        let output = sanitize_html("<p>a   b\n\n\tc</p>");
        assert_eq!(output, "<p>a b\nc</p>");
    }

    #[test]
    fn escapes_text_content() {
        let output = sanitize_html("<p>1 &lt; 2 &amp; 3</p>");
        assert_eq!(output, "<p>1 &lt; 2 &amp; 3</p>");
    }

    #[test]
    fn normalize_strips_query_only() {
        assert_eq!(normalize_link("https://x/a?b=1#c"), "https://x/a#c");
        assert_eq!(normalize_link("https://x/a?b=2#c"), "https://x/a#c");
        assert_eq!(
            normalize_link("https://x/a?b=1#c"),
            normalize_link("https://x/a?b=2#c")
        );
    }

    #[test]
    fn normalize_preserves_query_free_urls() {
        assert_eq!(
            normalize_link("https://example.com/post/1"),
            "https://example.com/post/1"
        );
    }

    #[test]
    fn normalize_passes_through_unparseable_input() {
        assert_eq!(normalize_link("not a url"), "not a url");
    }
}
