/// Maps logical targets to externally visible addresses. The core never
/// assembles raw paths beyond asking this trait; an embedding application
/// substitutes its own URL scheme here.
pub trait RouteMap {
    fn page_path(&self, slug: &str) -> String;
    fn edit_path(&self, slug: &str) -> String;
    fn index_path(&self) -> String;
}

/// Default address scheme: `/{slug}/`, `/{slug}/edit/`, `/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SitePaths;

impl RouteMap for SitePaths {
    fn page_path(&self, slug: &str) -> String {
        format!("/{slug}/")
    }

    fn edit_path(&self, slug: &str) -> String {
        format!("/{slug}/edit/")
    }

    fn index_path(&self) -> String {
        "/".to_string()
    }
}
