use crate::models::FeedEntry;
use crate::sanitize::{escape_attr, escape_text};

const STYLE: &str = r#"body {
  max-width: 1000px;
  margin: auto;
  padding: 1em;
  line-height: 20px;
  background-color: hsl(25, 75%, 85%);
  color: #000000;
  font-family: sans-serif;
  font-size: 13px;
}
hr {
  color: #000000;
  height: 0px;
  border-top: 2px dashed;
  border-bottom: none;
  max-width: 90%;
}
h1 {
  text-align: center;
  font-size: 2.2em;
  border: 5px solid #000000;
  padding: 20px;
  border-radius: 25px;
  background-color: hsl(25, 70%, 50%);
}
h2 {
  font-size: 1.5em;
  text-align: center;
  text-decoration: underline;
  padding-top: 5px;
  padding-bottom: 5px;
}
"#;

/// Renders a complete static clipping document. Entries are embedded
/// in the order given, so callers pass them newest-first.
pub fn render_clipping(title: &str, patterns: &[String], entries: &[FeedEntry]) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<title>");
    escape_text(title, &mut out);
    out.push_str("</title>\n<style type=\"text/css\">\n");
    out.push_str(STYLE);
    out.push_str("</style>\n</head>\n<body>\n<h1>");
    escape_text(title, &mut out);
    out.push_str("</h1>\n<p>Pattern = ");
    escape_text(&patterns.join(", "), &mut out);
    out.push_str("</p>\n<hr>\n");
    for entry in entries {
        render_entry(entry, &mut out);
        out.push_str("<hr>\n");
    }
    out.push_str("</body></html>\n");
    out
}

/// One entry as a self-contained fragment: heading, timestamp, feed
/// name, link, then the already-sanitized summary embedded as-is.
fn render_entry(entry: &FeedEntry, out: &mut String) {
    out.push_str("<span class=\"entry\">\n<h2>");
    escape_text(&entry.title, out);
    out.push_str("</h2>\n<ul>\n<li>Time: ");
    escape_text(&entry.time.to_rfc3339(), out);
    out.push_str("</li>\n<li>Feed: ");
    escape_text(&entry.feed, out);
    out.push_str("</li>\n<li>Link: <a href=\"");
    escape_attr(&entry.link, out);
    out.push_str("\">Link</a></li>\n</ul>\n");
    out.push_str(&entry.summary);
    out.push_str("\n</span>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(title: &str, link: &str, summary: &str) -> FeedEntry {
        FeedEntry {
            title: title.to_string(),
            summary: summary.to_string(),
            link: link.to_string(),
            time: Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap(),
            feed: "Test Feed".to_string(),
            source: "https://example.com/rss".to_string(),
        }
    }

    #[test]
    fn renders_entries_in_given_order() {
        let entries = vec![
            entry("Newest", "https://x/b", "<p>b</p>"),
            entry("Oldest", "https://x/a", "<p>a</p>"),
        ];
        let html = render_clipping("Digest", &["Foo".to_string()], &entries);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>Digest</h1>"));
        assert!(html.contains("Pattern = Foo"));
        let newest = html.find("Newest").unwrap();
        let oldest = html.find("Oldest").unwrap();
        assert!(newest < oldest);
    }

    #[test]
    fn escapes_metadata_but_embeds_summary_raw() {
        let entries = vec![entry("A & B", "https://x/a?b=\"c\"", "<p>kept</p>")];
        let html = render_clipping("T", &[], &entries);

        assert!(html.contains("<h2>A &amp; B</h2>"));
        assert!(html.contains("href=\"https://x/a?b=&quot;c&quot;\""));
        assert!(html.contains("<p>kept</p>"));
    }
}
