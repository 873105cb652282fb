use serde::Serialize;
use tracing::{debug, warn};

use crate::config::WikiSettings;
use crate::diff;
use crate::error::WikiError;
use crate::linker;
use crate::permissions::{Caller, Permission, PermissionChecker};
use crate::routes::RouteMap;
use crate::store::{Page, Revision, RevisionDraft, WikiStore};

pub const NEW_PAGE_MESSAGE: &str = "Initial revision";

fn new_page_template(slug: &str) -> String {
    format!("Describe your new page {slug} here...")
}

/// Where the caller should be sent after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Destination {
    Page { slug: String },
    Edit { slug: String },
    Index,
}

impl Destination {
    pub fn path(&self, routes: &impl RouteMap) -> String {
        match self {
            Self::Page { slug } => routes.page_path(slug),
            Self::Edit { slug } => routes.edit_path(slug),
            Self::Index => routes.index_path(),
        }
    }
}

/// A revision plus the display-only currency flag. The flag lives in this
/// wrapper, never in the stored row.
#[derive(Debug, Clone, Serialize)]
pub struct RevisionRef {
    pub revision: Revision,
    pub is_current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub page: Page,
    pub revision: Revision,
    pub is_current: bool,
    pub rendered_content: String,
}

#[derive(Debug, Clone, Serialize)]
pub enum PageOutcome {
    View(PageView),
    /// The page does not exist; an authenticated caller is sent to the
    /// edit form instead. Anonymous callers get `NotFound` so a missing
    /// page is indistinguishable from a forbidden one.
    StartEdit { slug: String },
}

/// Raw content to displayable markup: the configured preprocessor first,
/// then WikiWord linking.
pub fn render_content(
    store: &WikiStore,
    settings: &WikiSettings,
    routes: &impl RouteMap,
    content: &str,
) -> Result<String, WikiError> {
    let prepared = (settings.preprocessor)(content);
    linker::replace_wikiwords(store, settings, routes, &prepared)
}

/// Display a page, optionally pinned to a specific revision id. A pinned
/// revision that is not the page's current one is flagged `is_current:
/// false`; nothing is persisted.
pub fn view_page(
    store: &WikiStore,
    settings: &WikiSettings,
    routes: &impl RouteMap,
    caller: &Caller,
    slug: &str,
    revision_id: Option<i64>,
) -> Result<PageOutcome, WikiError> {
    let page = match store.find_page(slug)? {
        Some(page) => page,
        None => {
            if caller.is_authenticated() {
                return Ok(PageOutcome::StartEdit {
                    slug: slug.to_string(),
                });
            }
            return Err(WikiError::NotFound);
        }
    };

    let current = store.current_revision(&page)?;
    let (revision, is_current) = match revision_id {
        Some(id) if id != current.id => (store.get_revision(id)?, false),
        _ => (current, true),
    };
    let rendered_content = render_content(store, settings, routes, &revision.content)?;

    Ok(PageOutcome::View(PageView {
        page,
        revision,
        is_current,
        rendered_content,
    }))
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteChoices {
    pub can_delete_revision: bool,
    pub can_delete_page: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditScreen {
    pub slug: String,
    /// None while the page only exists as an unsaved placeholder.
    pub page: Option<Page>,
    pub revision: Option<RevisionRef>,
    pub initial_content: String,
    pub initial_message: String,
    pub delete_choices: Option<DeleteChoices>,
}

struct EditContext {
    page: Option<Page>,
    working: Option<RevisionRef>,
    initial_content: String,
    initial_message: String,
}

/// Shared resolution for the edit form and its submission: look the page
/// up, apply the permission gates, and compute the pre-filled form values
/// (revert pre-fill included).
fn prepare_edit(
    store: &WikiStore,
    checker: &impl PermissionChecker,
    caller: &Caller,
    slug: &str,
    revision_id: Option<i64>,
) -> Result<EditContext, WikiError> {
    match store.find_page(slug)? {
        Some(page) => {
            if !checker.has_all(&[Permission::ChangePage, Permission::ChangeRevision]) {
                warn!("{} may not edit {}", caller.display_name(), slug);
                return Err(WikiError::forbidden(
                    "You don't have permission to edit pages.",
                ));
            }

            let current = store.current_revision(&page)?;
            let mut initial_content = current.content.clone();
            let mut initial_message = String::new();
            let working = match revision_id {
                Some(id) if id != current.id => {
                    let revision = store.get_revision(id)?;
                    initial_content = revision.content.clone();
                    initial_message = format!("Reverted to \"{}\"", revision.message);
                    RevisionRef {
                        revision,
                        is_current: false,
                    }
                }
                _ => RevisionRef {
                    revision: current,
                    is_current: true,
                },
            };

            Ok(EditContext {
                page: Some(page),
                working: Some(working),
                initial_content,
                initial_message,
            })
        }
        None => {
            // A missing page never turns into a permission prompt for
            // anonymous callers.
            if !caller.is_authenticated() {
                return Err(WikiError::NotFound);
            }
            if !checker.has_all(&[Permission::AddPage, Permission::AddRevision]) {
                warn!("{} may not create {}", caller.display_name(), slug);
                return Err(WikiError::forbidden(
                    "You don't have permission to add wiki pages.",
                ));
            }

            Ok(EditContext {
                page: None,
                working: None,
                initial_content: new_page_template(slug),
                initial_message: NEW_PAGE_MESSAGE.to_string(),
            })
        }
    }
}

/// Build the edit form for `slug`, pre-filled for a revert when an older
/// revision id is given. Never creates a revision.
pub fn edit_screen(
    store: &WikiStore,
    checker: &impl PermissionChecker,
    caller: &Caller,
    slug: &str,
    revision_id: Option<i64>,
) -> Result<EditScreen, WikiError> {
    let context = prepare_edit(store, checker, caller, slug, revision_id)?;
    Ok(EditScreen {
        slug: slug.to_string(),
        page: context.page,
        revision: context.working,
        initial_content: context.initial_content,
        initial_message: context.initial_message,
        delete_choices: delete_choices(checker),
    })
}

fn delete_choices(checker: &impl PermissionChecker) -> Option<DeleteChoices> {
    let can_delete_revision = checker.has(Permission::DeleteRevision);
    let can_delete_page = checker.has(Permission::DeletePage);
    if !can_delete_revision && !can_delete_page {
        return None;
    }
    Some(DeleteChoices {
        can_delete_revision,
        can_delete_page: can_delete_page && can_delete_revision,
    })
}

#[derive(Debug, Clone, Default)]
pub struct EditSubmission {
    pub content: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedEdit {
    pub page: Page,
    pub revision: Revision,
    pub notice: String,
    pub destination: Destination,
}

/// Handle a submitted edit form. The no-change guard fires unless the
/// submission targets a non-current revision (a revert), so a revert
/// always saves while re-submitting the current content is rejected.
pub fn submit_edit(
    store: &mut WikiStore,
    checker: &impl PermissionChecker,
    caller: &Caller,
    slug: &str,
    revision_id: Option<i64>,
    submission: &EditSubmission,
) -> Result<SavedEdit, WikiError> {
    let context = prepare_edit(store, checker, caller, slug, revision_id)?;

    if submission.content.trim().is_empty() {
        return Err(WikiError::validation("content", "This field is required."));
    }

    let reverts_old_revision =
        matches!(&context.working, Some(working) if !working.is_current);
    if !reverts_old_revision && submission.content == context.initial_content {
        return Err(WikiError::validation("content", "You have made no changes!"));
    }

    let draft = RevisionDraft {
        content: submission.content.clone(),
        message: submission.message.clone(),
        creator: caller.username.clone(),
        creator_ip: caller.address.clone(),
    };
    let (page, revision) = store.create_revision(slug, &draft)?;
    debug!(
        "{} saved revision {} for {}",
        caller.display_name(),
        revision.id,
        page.slug
    );

    Ok(SavedEdit {
        notice: format!("Your changes to {} were saved", page.slug),
        destination: Destination::Page {
            slug: page.slug.clone(),
        },
        page,
        revision,
    })
}

/// Deletion choice submitted by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteIntent {
    Revision,
    Page,
}

impl DeleteIntent {
    /// Choice values carried by the delete form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rev" => Some(Self::Revision),
            "page" => Some(Self::Page),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Revision => "rev",
            Self::Page => "page",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum DeleteOutcome {
    RevisionDeleted {
        notice: String,
        destination: Destination,
    },
    PageDeleted {
        notice: String,
        destination: Destination,
    },
    /// Unknown intent or missing capability: nothing was mutated and the
    /// caller goes back to the edit view.
    Ignored { destination: Destination },
}

/// Decide what a delete submission removes. Removing the last revision of
/// a page removes the page itself, which is why that path demands the
/// page-deletion capability on top of the revision one; lacking it, the
/// request is ignored rather than partially applied.
pub fn delete_wiki(
    store: &mut WikiStore,
    checker: &impl PermissionChecker,
    intent: Option<DeleteIntent>,
    page: &Page,
    revision: &Revision,
) -> Result<DeleteOutcome, WikiError> {
    let back_to_edit = DeleteOutcome::Ignored {
        destination: Destination::Edit {
            slug: page.slug.clone(),
        },
    };

    let Some(intent) = intent else {
        return Ok(back_to_edit);
    };

    match intent {
        DeleteIntent::Revision => {
            if !checker.has(Permission::DeleteRevision) {
                warn!("revision delete on {} refused: missing capability", page.slug);
                return Ok(back_to_edit);
            }
            if store.count_revisions(page)? <= 1 {
                if !checker.has(Permission::DeletePage) {
                    warn!(
                        "last revision of {} kept: page deletion not permitted",
                        page.slug
                    );
                    return Ok(back_to_edit);
                }
                store.delete_page(page)?;
                return Ok(DeleteOutcome::PageDeleted {
                    notice: format!(
                        "The page {} was deleted, it had no other revisions",
                        page.slug
                    ),
                    destination: Destination::Index,
                });
            }
            store.delete_revision(revision)?;
            Ok(DeleteOutcome::RevisionDeleted {
                notice: format!("The revision {} was deleted", revision.id),
                destination: Destination::Page {
                    slug: page.slug.clone(),
                },
            })
        }
        DeleteIntent::Page => {
            if !checker.has_all(&[Permission::DeletePage, Permission::DeleteRevision]) {
                warn!("page delete on {} refused: missing capability", page.slug);
                return Ok(back_to_edit);
            }
            store.delete_page(page)?;
            Ok(DeleteOutcome::PageDeleted {
                notice: format!("The page {} was deleted", page.slug),
                destination: Destination::Index,
            })
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffView {
    pub page: Page,
    pub revision_a: Revision,
    pub revision_b: Revision,
    pub text: String,
}

/// Diff two revisions addressed by id; `revision_a` is shown as the
/// current side, `revision_b` as the original. Both ids are required, and
/// the revisions may belong to different pages.
pub fn changes(
    store: &WikiStore,
    slug: &str,
    revision_a: Option<i64>,
    revision_b: Option<i64>,
) -> Result<DiffView, WikiError> {
    let (Some(a_id), Some(b_id)) = (revision_a, revision_b) else {
        return Err(WikiError::BadRequest(
            "both revision ids are required".to_string(),
        ));
    };

    let page = store.get_page(slug)?;
    let revision_a = store.get_revision(a_id)?;
    let revision_b = store.get_revision(b_id)?;
    let text = diff::unified_changes(&revision_a.content, &revision_b.content);

    Ok(DiffView {
        page,
        revision_a,
        revision_b,
        text,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct PageIndex {
    pub pages: Vec<Page>,
    pub index_slug: String,
}

/// All pages ordered by slug, with the configured home slug attached.
pub fn page_list(store: &WikiStore, settings: &WikiSettings) -> Result<PageIndex, WikiError> {
    Ok(PageIndex {
        pages: store.list_pages()?,
        index_slug: settings.default_index_slug.clone(),
    })
}

/// All revisions newest-first, optionally narrowed to one page's history.
pub fn revision_list(
    store: &WikiStore,
    slug: Option<&str>,
) -> Result<Vec<Revision>, WikiError> {
    match slug {
        Some(slug) => {
            let page = store.get_page(slug)?;
            store.list_revisions(Some(&page))
        }
        None => store.list_revisions(None),
    }
}

/// Where a bare visit to the site lands: the configured index page.
pub fn index_destination(settings: &WikiSettings) -> Destination {
    Destination::Page {
        slug: settings.default_index_slug.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::{TempDir, tempdir};

    use super::{
        DeleteIntent, DeleteOutcome, Destination, EditSubmission, PageOutcome, changes,
        delete_wiki, edit_screen, index_destination, page_list, revision_list, submit_edit,
        view_page,
    };
    use crate::config::{WikiConfig, WikiSettings};
    use crate::diff::NO_CHANGES_MESSAGE;
    use crate::error::WikiError;
    use crate::migrate::run_migrations;
    use crate::permissions::{Caller, Permission, PermissionSet};
    use crate::routes::SitePaths;
    use crate::store::WikiStore;

    fn open_store() -> (TempDir, WikiStore) {
        let temp = tempdir().expect("tempdir");
        let db_path: PathBuf = temp.path().join("camwiki.db");
        run_migrations(&db_path).expect("run migrations");
        let store = WikiStore::open(&db_path).expect("open store");
        (temp, store)
    }

    fn settings() -> WikiSettings {
        WikiConfig::default().settings().expect("settings")
    }

    fn editor() -> Caller {
        Caller::named("editor", Some("127.0.0.1"))
    }

    fn submission(content: &str, message: &str) -> EditSubmission {
        EditSubmission {
            content: content.to_string(),
            message: message.to_string(),
        }
    }

    fn save(store: &mut WikiStore, slug: &str, content: &str) -> super::SavedEdit {
        submit_edit(
            store,
            &PermissionSet::all(),
            &editor(),
            slug,
            None,
            &submission(content, ""),
        )
        .expect("save")
    }

    #[test]
    fn first_save_creates_page_and_revision() {
        let (_temp, mut store) = open_store();

        let saved = save(&mut store, "CarrotCake", "First content");
        assert_eq!(saved.page.slug, "CarrotCake");
        assert_eq!(saved.notice, "Your changes to CarrotCake were saved");
        assert_eq!(
            saved.destination,
            Destination::Page {
                slug: "CarrotCake".to_string()
            }
        );
        assert_eq!(store.count_pages().expect("count"), 1);
    }

    #[test]
    fn repeated_saves_reuse_the_page_row() {
        let (_temp, mut store) = open_store();

        save(&mut store, "CarrotCake", "one");
        save(&mut store, "CarrotCake", "two");
        assert_eq!(store.count_pages().expect("count"), 1);

        let page = store.get_page("CarrotCake").expect("page");
        assert_eq!(store.count_revisions(&page).expect("count"), 2);
    }

    #[test]
    fn identical_resave_is_rejected_without_a_new_revision() {
        let (_temp, mut store) = open_store();

        save(&mut store, "CarrotCake", "Stable content");
        let error = submit_edit(
            &mut store,
            &PermissionSet::all(),
            &editor(),
            "CarrotCake",
            None,
            &submission("Stable content", "noop"),
        )
        .expect_err("must reject");

        assert!(
            matches!(&error, WikiError::ValidationFailed { field, message }
                if *field == "content" && message == "You have made no changes!")
        );
        let page = store.get_page("CarrotCake").expect("page");
        assert_eq!(store.count_revisions(&page).expect("count"), 1);
    }

    #[test]
    fn empty_content_fails_validation() {
        let (_temp, mut store) = open_store();

        let error = submit_edit(
            &mut store,
            &PermissionSet::all(),
            &editor(),
            "CarrotCake",
            None,
            &submission("   \n", ""),
        )
        .expect_err("must reject");
        assert!(matches!(error, WikiError::ValidationFailed { .. }));
        assert_eq!(store.count_pages().expect("count"), 0);
    }

    #[test]
    fn current_revision_wins_the_view() {
        let (_temp, mut store) = open_store();

        let first = save(&mut store, "CarrotCake", "one").revision;
        let second = save(&mut store, "CarrotCake", "two").revision;

        let outcome = view_page(&store, &settings(), &SitePaths, &editor(), "CarrotCake", None)
            .expect("view");
        let PageOutcome::View(view) = outcome else {
            panic!("expected a page view");
        };
        assert_eq!(view.revision.id, second.id);
        assert!(view.is_current);
        assert!(view.rendered_content.contains("two"));

        let outcome = view_page(
            &store,
            &settings(),
            &SitePaths,
            &editor(),
            "CarrotCake",
            Some(first.id),
        )
        .expect("view older");
        let PageOutcome::View(view) = outcome else {
            panic!("expected a page view");
        };
        assert_eq!(view.revision.id, first.id);
        assert!(!view.is_current);
        assert!(view.rendered_content.contains("one"));
    }

    #[test]
    fn missing_page_routes_by_authentication() {
        let (_temp, store) = open_store();

        let outcome = view_page(
            &store,
            &settings(),
            &SitePaths,
            &editor(),
            "NewPage",
            None,
        )
        .expect("authenticated view");
        assert!(matches!(outcome, PageOutcome::StartEdit { slug } if slug == "NewPage"));

        let error = view_page(
            &store,
            &settings(),
            &SitePaths,
            &Caller::anonymous(),
            "NewPage",
            None,
        )
        .expect_err("anonymous view");
        assert!(matches!(error, WikiError::NotFound));
    }

    #[test]
    fn edit_screen_requires_change_capabilities() {
        let (_temp, mut store) = open_store();
        save(&mut store, "CarrotCake", "content");

        let checker = PermissionSet::none().grant(Permission::ChangePage);
        let error = edit_screen(&store, &checker, &editor(), "CarrotCake", None)
            .expect_err("must refuse");
        assert!(matches!(error, WikiError::Forbidden(_)));

        let screen = edit_screen(&store, &PermissionSet::all(), &editor(), "CarrotCake", None)
            .expect("edit screen");
        assert_eq!(screen.initial_content, "content");
        assert_eq!(screen.initial_message, "");
        assert!(screen.delete_choices.is_some());
    }

    #[test]
    fn new_page_edit_screen_prefills_the_template() {
        let (_temp, store) = open_store();

        let screen = edit_screen(&store, &PermissionSet::all(), &editor(), "NewPage", None)
            .expect("edit screen");
        assert!(screen.page.is_none());
        assert!(screen.revision.is_none());
        assert_eq!(
            screen.initial_content,
            "Describe your new page NewPage here..."
        );
        assert_eq!(screen.initial_message, "Initial revision");
    }

    #[test]
    fn anonymous_caller_sees_not_found_for_missing_page() {
        let (_temp, store) = open_store();
        let error = edit_screen(
            &store,
            &PermissionSet::all(),
            &Caller::anonymous(),
            "NewPage",
            None,
        )
        .expect_err("must refuse");
        assert!(matches!(error, WikiError::NotFound));
    }

    #[test]
    fn missing_add_capability_is_forbidden_for_named_caller() {
        let (_temp, store) = open_store();
        let checker = PermissionSet::none().grant(Permission::AddPage);
        let error = edit_screen(&store, &checker, &editor(), "NewPage", None)
            .expect_err("must refuse");
        assert!(matches!(error, WikiError::Forbidden(_)));
    }

    #[test]
    fn revert_prefill_does_not_create_revisions() {
        let (_temp, mut store) = open_store();

        let first = save(&mut store, "CarrotCake", "one").revision;
        save(&mut store, "CarrotCake", "two");

        let screen = edit_screen(
            &store,
            &PermissionSet::all(),
            &editor(),
            "CarrotCake",
            Some(first.id),
        )
        .expect("edit screen");
        assert_eq!(screen.initial_content, "one");
        assert_eq!(screen.initial_message, "Reverted to \"\"");
        let revision = screen.revision.expect("working revision");
        assert!(!revision.is_current);

        let page = store.get_page("CarrotCake").expect("page");
        assert_eq!(store.count_revisions(&page).expect("count"), 2);
    }

    #[test]
    fn revert_submit_saves_even_without_changes() {
        let (_temp, mut store) = open_store();

        let first = save(&mut store, "CarrotCake", "one").revision;
        save(&mut store, "CarrotCake", "two");

        let saved = submit_edit(
            &mut store,
            &PermissionSet::all(),
            &editor(),
            "CarrotCake",
            Some(first.id),
            &submission("one", "Reverted to \"\""),
        )
        .expect("revert save");
        assert_eq!(saved.revision.content, "one");

        let page = store.get_page("CarrotCake").expect("page");
        assert_eq!(store.count_revisions(&page).expect("count"), 3);

        let current = store.current_revision(&page).expect("current");
        assert_eq!(current.id, saved.revision.id);
    }

    #[test]
    fn submitting_the_current_revision_unchanged_is_a_noop() {
        let (_temp, mut store) = open_store();

        save(&mut store, "CarrotCake", "one");
        let second = save(&mut store, "CarrotCake", "two").revision;

        let error = submit_edit(
            &mut store,
            &PermissionSet::all(),
            &editor(),
            "CarrotCake",
            Some(second.id),
            &submission("two", ""),
        )
        .expect_err("must reject");
        assert!(matches!(error, WikiError::ValidationFailed { .. }));
    }

    #[test]
    fn deleting_the_last_revision_needs_both_capabilities() {
        let (_temp, mut store) = open_store();

        let saved = save(&mut store, "CarrotCake", "only");
        let checker = PermissionSet::none().grant(Permission::DeleteRevision);
        let outcome = delete_wiki(
            &mut store,
            &checker,
            Some(DeleteIntent::Revision),
            &saved.page,
            &saved.revision,
        )
        .expect("delete attempt");
        assert!(matches!(outcome, DeleteOutcome::Ignored { .. }));
        assert_eq!(store.count_pages().expect("count"), 1);

        let checker = PermissionSet::none()
            .grant(Permission::DeleteRevision)
            .grant(Permission::DeletePage);
        let outcome = delete_wiki(
            &mut store,
            &checker,
            Some(DeleteIntent::Revision),
            &saved.page,
            &saved.revision,
        )
        .expect("delete");
        assert!(matches!(outcome, DeleteOutcome::PageDeleted { destination, .. }
            if destination == Destination::Index));
        assert_eq!(store.count_pages().expect("count"), 0);
    }

    #[test]
    fn deleting_one_of_many_revisions_keeps_the_page() {
        let (_temp, mut store) = open_store();

        let first = save(&mut store, "CarrotCake", "one");
        save(&mut store, "CarrotCake", "two");

        let checker = PermissionSet::none().grant(Permission::DeleteRevision);
        let outcome = delete_wiki(
            &mut store,
            &checker,
            Some(DeleteIntent::Revision),
            &first.page,
            &first.revision,
        )
        .expect("delete");
        match outcome {
            DeleteOutcome::RevisionDeleted { destination, .. } => assert_eq!(
                destination,
                Destination::Page {
                    slug: "CarrotCake".to_string()
                }
            ),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let page = store.get_page("CarrotCake").expect("page");
        assert_eq!(store.count_revisions(&page).expect("count"), 1);
    }

    #[test]
    fn whole_page_deletion_requires_both_capabilities() {
        let (_temp, mut store) = open_store();

        let saved = save(&mut store, "CarrotCake", "one");
        save(&mut store, "CarrotCake", "two");

        let checker = PermissionSet::none().grant(Permission::DeletePage);
        let outcome = delete_wiki(
            &mut store,
            &checker,
            Some(DeleteIntent::Page),
            &saved.page,
            &saved.revision,
        )
        .expect("refused delete");
        assert!(matches!(outcome, DeleteOutcome::Ignored { .. }));
        assert_eq!(store.count_pages().expect("count"), 1);

        let outcome = delete_wiki(
            &mut store,
            &PermissionSet::all(),
            Some(DeleteIntent::Page),
            &saved.page,
            &saved.revision,
        )
        .expect("delete");
        assert!(matches!(outcome, DeleteOutcome::PageDeleted { .. }));
        assert_eq!(store.count_pages().expect("count"), 0);
    }

    #[test]
    fn unknown_intent_is_ignored() {
        let (_temp, mut store) = open_store();
        let saved = save(&mut store, "CarrotCake", "one");

        assert_eq!(DeleteIntent::parse("nonsense"), None);
        assert_eq!(DeleteIntent::parse("rev"), Some(DeleteIntent::Revision));
        assert_eq!(DeleteIntent::parse("page"), Some(DeleteIntent::Page));

        let outcome = delete_wiki(
            &mut store,
            &PermissionSet::all(),
            None,
            &saved.page,
            &saved.revision,
        )
        .expect("noop");
        match outcome {
            DeleteOutcome::Ignored { destination } => assert_eq!(
                destination,
                Destination::Edit {
                    slug: "CarrotCake".to_string()
                }
            ),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.count_pages().expect("count"), 1);
    }

    #[test]
    fn changes_requires_both_revision_ids() {
        let (_temp, mut store) = open_store();
        let first = save(&mut store, "CarrotCake", "one").revision;

        let error = changes(&store, "CarrotCake", Some(first.id), None)
            .expect_err("must reject");
        assert!(matches!(error, WikiError::BadRequest(_)));
    }

    #[test]
    fn changes_labels_current_and_original_sides() {
        let (_temp, mut store) = open_store();

        let first = save(&mut store, "CarrotCake", "old line\n").revision;
        let second = save(&mut store, "CarrotCake", "new line\n").revision;

        let view = changes(&store, "CarrotCake", Some(second.id), Some(first.id))
            .expect("diff");
        let lines = view.text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "--- Original");
        assert_eq!(lines[1], "+++ Current");
        assert!(lines.contains(&"-old line"));
        assert!(lines.contains(&"+new line"));

        let view = changes(&store, "CarrotCake", Some(second.id), Some(second.id))
            .expect("self diff");
        assert_eq!(view.text, NO_CHANGES_MESSAGE);
    }

    #[test]
    fn rendered_view_links_wikiwords() {
        let (_temp, mut store) = open_store();

        save(&mut store, "CarrotCake", "body");
        save(
            &mut store,
            "WikiIndex",
            "See CarrotCake and FrostyIcing and Carrotcake",
        );

        let outcome = view_page(&store, &settings(), &SitePaths, &editor(), "WikiIndex", None)
            .expect("view");
        let PageOutcome::View(view) = outcome else {
            panic!("expected a page view");
        };
        assert!(
            view.rendered_content
                .contains("<a href=\"/CarrotCake/\">CarrotCake</a>")
        );
        assert!(
            view.rendered_content
                .contains("<a class=\"doesnotexist\" href=\"/FrostyIcing/edit/\">FrostyIcing</a>")
        );
        assert!(view.rendered_content.contains("and Carrotcake"));
    }

    #[test]
    fn listings_and_index_destination() {
        let (_temp, mut store) = open_store();

        save(&mut store, "WikiIndex", "home");
        save(&mut store, "CarrotCake", "one");
        save(&mut store, "CarrotCake", "two");

        let index = page_list(&store, &settings()).expect("page list");
        assert_eq!(index.index_slug, "WikiIndex");
        assert_eq!(index.pages.len(), 2);
        assert_eq!(index.pages[0].slug, "CarrotCake");

        let history = revision_list(&store, Some("CarrotCake")).expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "two");

        let everything = revision_list(&store, None).expect("all revisions");
        assert_eq!(everything.len(), 3);

        assert!(matches!(
            revision_list(&store, Some("NoSuchPage")).expect_err("must miss"),
            WikiError::NotFound
        ));

        assert_eq!(
            index_destination(&settings()),
            Destination::Page {
                slug: "WikiIndex".to_string()
            }
        );
    }
}
