use crate::config::WikiSettings;
use crate::error::WikiError;
use crate::routes::RouteMap;
use crate::store::WikiStore;

/// Rewrite every whole-word WikiWord in `text` into a hyperlink. Words
/// naming an existing page link to the page view with the canonical stored
/// slug as anchor text; unknown words link to the edit form and carry the
/// `doesnotexist` class so callers can style them. Everything between
/// matches passes through untouched.
pub fn replace_wikiwords(
    store: &WikiStore,
    settings: &WikiSettings,
    routes: &impl RouteMap,
    text: &str,
) -> Result<String, WikiError> {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;

    for found in settings.word_regex().find_iter(text) {
        out.push_str(&text[cursor..found.start()]);
        let word = found.as_str();
        match store.find_page(word)? {
            Some(page) => {
                out.push_str(&format!(
                    r#"<a href="{}">{}</a>"#,
                    routes.page_path(&page.slug),
                    page.slug
                ));
            }
            None => {
                out.push_str(&format!(
                    r#"<a class="doesnotexist" href="{}">{}</a>"#,
                    routes.edit_path(word),
                    word
                ));
            }
        }
        cursor = found.end();
    }

    out.push_str(&text[cursor..]);
    Ok(out)
}
