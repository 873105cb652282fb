/// Text transform applied to raw page content before WikiWord linking.
/// Swappable through `WikiSettings`; the default wraps paragraphs and
/// links bare URLs.
pub type ContentPreprocessor = fn(&str) -> String;

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', '"', '\''];

/// Default preprocessor. Blank-line separated blocks become `<p>`
/// paragraphs, single newlines inside a block become `<br />`, and
/// whitespace-delimited `http(s)://` or `www.` tokens become anchors.
/// Markup escaping of the surrounding text stays with the caller.
pub fn paragraphs_and_links(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let mut paragraphs = Vec::new();

    for block in normalized.split("\n\n") {
        let block = block.trim_matches('\n');
        if block.trim().is_empty() {
            continue;
        }
        let lines = block.lines().map(link_bare_urls).collect::<Vec<_>>();
        paragraphs.push(format!("<p>{}</p>", lines.join("<br />")));
    }

    paragraphs.join("\n\n")
}

fn link_bare_urls(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for (index, token) in line.split(' ').enumerate() {
        if index > 0 {
            out.push(' ');
        }
        out.push_str(&link_token(token));
    }
    out
}

fn link_token(token: &str) -> String {
    let body_len = token.trim_end_matches(TRAILING_PUNCTUATION).len();
    let (body, trailing) = token.split_at(body_len);

    if body.starts_with("http://") || body.starts_with("https://") {
        format!(r#"<a href="{body}">{body}</a>{trailing}"#)
    } else if body.starts_with("www.") && body.len() > "www.".len() {
        format!(r#"<a href="http://{body}">{body}</a>{trailing}"#)
    } else {
        token.to_string()
    }
}
