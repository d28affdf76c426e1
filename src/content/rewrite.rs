use scraper::{Html, Selector};

/// Per-feed content rewriting.
///
/// Total by contract: rules that are unknown or cannot be applied leave the
/// content as it was.
pub trait Rewriter: Send + Sync {
    fn rewrite(&self, url: &str, content: &str, rules: &str) -> String;
}

/// Default [`Rewriter`] understanding a comma-separated list of rule names.
///
/// - `add_image_title`: wrap `<img title="...">` in a `<figure>` whose
///   `<figcaption>` shows the title (comic feeds hide the punchline there)
/// - `nl2br`: turn newlines into `<br>` for feeds publishing plain text
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleRewriter;

impl Rewriter for RuleRewriter {
    fn rewrite(&self, url: &str, content: &str, rules: &str) -> String {
        let mut output = content.to_string();

        for rule in rules.split(',').map(str::trim).filter(|r| !r.is_empty()) {
            output = match rule.to_ascii_lowercase().as_str() {
                "add_image_title" => add_image_title(&output),
                "nl2br" => output.replace("\r\n", "\n").replace('\n', "<br>"),
                unknown => {
                    tracing::debug!(url = %url, rule = %unknown, "Ignoring unknown rewrite rule");
                    output
                }
            };
        }

        output
    }
}

fn add_image_title(content: &str) -> String {
    let Ok(selector) = Selector::parse("img[title]") else {
        return content.to_string();
    };
    let fragment = Html::parse_fragment(content);

    let mut images: Vec<(String, String)> = fragment
        .select(&selector)
        .filter_map(|img| {
            let title = img.value().attr("title")?.trim();
            (!title.is_empty()).then(|| (img.html(), title.to_string()))
        })
        .collect();
    if images.is_empty() {
        return content.to_string();
    }
    images.sort();
    images.dedup();

    // Work on the serialized tree so the img markup matches byte for byte.
    let mut output = fragment.root_element().inner_html();
    for (img_html, title) in images {
        let figure = format!(
            "<figure>{img_html}<figcaption><p>{}</p></figcaption></figure>",
            escape_text(&title)
        );
        output = output.replace(&img_html, &figure);
    }
    output
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
