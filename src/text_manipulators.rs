use scraper::ElementRef;

// Elements whose boundaries start a new line of visible text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "section", "table", "tbody",
    "td", "th", "thead", "tr", "ul",
];

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Visible text of an element, one line per block. Inline markup such as
/// `<strong>` or `<span>` stays on its line, whitespace runs (including
/// non-breaking spaces) collapse to a single space and empty lines are
/// dropped. Script and style contents are skipped.
pub fn flatten_text(element: ElementRef) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            // Source line breaks are ordinary whitespace; only blocks break lines.
            out.push_str(&text.replace(['\n', '\r'], " "));
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if HIDDEN_ELEMENTS.contains(&name) {
                continue;
            }
            let block = BLOCK_ELEMENTS.contains(&name);
            if block {
                out.push('\n');
            }
            collect_text(child, out);
            if block {
                out.push('\n');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::*;

    fn flatten(html: &str, selector: &str) -> String {
        let document = Html::parse_document(html);
        let selector = Selector::parse(selector).unwrap();
        flatten_text(document.select(&selector).next().unwrap())
    }

    #[test]
    fn blocks_start_new_lines() {
        let text = flatten(
            "<div id=\"x\"><dt>Sollzinssatz:</dt>\n   <dd>3,45&nbsp;%</dd></div>",
            "#x",
        );
        assert_eq!(text, "Sollzinssatz:\n3,45 %");
    }

    #[test]
    fn inline_markup_stays_on_its_line() {
        let text = flatten(
            "<div id=\"x\"><p>Sollzinssatz: <strong>3,45</strong> %</p>\
             <p>Nettokreditbetrag: <b>10.000</b> Euro</p>\
             <p><b>effektiver</b> Jahreszins: 4,12&nbsp;%</p></div>",
            "#x",
        );
        assert_eq!(
            text,
            "Sollzinssatz: 3,45 %\nNettokreditbetrag: 10.000 Euro\neffektiver Jahreszins: 4,12 %"
        );
    }

    #[test]
    fn source_line_breaks_collapse_and_br_breaks_lines() {
        let text = flatten(
            "<div id=\"x\"><p>Bei einem <span>Kreditbetrag</span>\n      von € 10.000<br>Laufzeit von 60 Monaten</p></div>",
            "#x",
        );
        assert_eq!(text, "Bei einem Kreditbetrag von € 10.000\nLaufzeit von 60 Monaten");
    }

    #[test]
    fn skips_scripts_and_styles() {
        let text = flatten(
            "<div id=\"x\"><style>.a{}</style><p>Laufzeit von 84 Monaten</p><script>var a = 1;</script></div>",
            "#x",
        );
        assert_eq!(text, "Laufzeit von 84 Monaten");
    }

    #[test]
    fn empty_region_flattens_to_empty_string() {
        assert_eq!(flatten("<div id=\"x\">   </div>", "#x"), "");
    }
}
