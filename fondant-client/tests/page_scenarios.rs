use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fondant_client::{
    Dispatch, Dom, DomHooks, Event, FetchError, Fragment, FragmentLoad, FragmentSource,
    FragmentStatus, MemoryDom, Page,
};
use tokio::sync::Notify;

const PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<div id="header-placeholder"><p id="loading">Loading…</p></div>
<main>
  <div class="form-success">Thanks! We'll be in touch.</div>
  <section class="contact-form">
    <form id="contact" name="contact" method="POST">
      <div class="form-group"><label>Name</label><input id="name" name="name" type="text" required><span class="form-error"></span></div>
      <div class="form-group"><input id="email" name="email" type="email" required><span class="form-error"></span></div>
      <div class="form-group"><input id="phone" name="phone" type="tel"><span class="form-error"></span></div>
      <button type="submit">Send</button>
    </form>
  </section>
  <p id="outside">Fine chocolates since 1971.</p>
</main>
<div id="footer-placeholder"></div>
</body></html>"#;

const HEADER: &str = r#"<header class="header">
  <a class="logo" href="/">Golden Ticket</a>
  <button class="nav-toggle" aria-expanded="false">Menu</button>
  <ul class="nav-list"><li><a href="/shop/">Shop</a></li></ul>
</header>"#;

const FOOTER: &str = r#"<footer class="footer">© Golden Ticket Chocolates</footer>"#;

/// Serves canned fragments. Paths listed in `gated` wait for `release`.
#[derive(Default)]
struct CannedSource {
    bodies: HashMap<String, String>,
    gated: Vec<String>,
    release: Arc<Notify>,
}

impl CannedSource {
    fn site() -> Self {
        let mut bodies = HashMap::new();
        bodies.insert("/includes/header.html".to_string(), HEADER.to_string());
        bodies.insert("/includes/footer.html".to_string(), FOOTER.to_string());
        Self {
            bodies,
            ..Default::default()
        }
    }
}

#[async_trait]
impl FragmentSource for CannedSource {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        if self.gated.iter().any(|p| p == path) {
            self.release.notified().await;
        }
        self.bodies.get(path).cloned().ok_or(FetchError::Status {
            path: path.to_string(),
            status: 404,
        })
    }
}

fn id(page: &Page<MemoryDom>, id: &str) -> fondant_client::NodeId {
    page.dom().by_id(id).unwrap()
}

#[tokio::test]
async fn form_works_while_header_is_still_loading() {
    let mut source = CannedSource::site();
    source.gated.push("/includes/header.html".into());
    let release = Arc::clone(&source.release);

    let (mut page, mut tasks) = Page::boot(
        MemoryDom::parse(PAGE),
        DomHooks::default(),
        "",
        Arc::new(source),
    );
    let ready = page.navigation_ready();
    assert!(!*ready.borrow());
    assert!(page.nav().is_none());

    // footer arrives first, header is held back
    let footer = tasks.next().await.unwrap();
    assert_eq!(footer.fragment, Fragment::Footer);
    page.apply_fragment(footer);

    let email = id(&page, "email");
    let phone = id(&page, "phone");
    page.dom_mut().set_value(email, "charlie@bucket.co");
    page.dom_mut().set_value(phone, "(555) 123-4567");
    let form = id(&page, "contact");

    assert_eq!(page.dispatch(Event::Submit { form }), Dispatch::PreventDefault);
    let name = id(&page, "name");
    assert_eq!(page.dom().focused(), Some(name));
    let name_group = page.dom().parent(name).unwrap();
    assert!(page.dom().has_class(name_group, "has-error"));
    let error = page.dom().first_with_class(name_group, "form-error").unwrap();
    assert_eq!(page.dom().text(error), "This field is required");

    release.notify_one();
    let report = page.settle(tasks).await;
    assert_eq!(
        report.status(Fragment::Header),
        Some(&FragmentStatus::Loaded { bytes: HEADER.len() })
    );

    tokio::time::timeout(Duration::from_secs(1), page.wait_navigation_ready())
        .await
        .expect("navigation should be armed once the header is in");
    assert!(page.dom().by_id("loading").is_none());
}

#[tokio::test]
async fn toggle_laws_through_dispatch() {
    let (mut page, tasks) = Page::boot(
        MemoryDom::parse(PAGE),
        DomHooks::default(),
        "",
        Arc::new(CannedSource::site()),
    );
    let report = page.settle(tasks).await;
    assert!(report.all_loaded());

    let nav = page.nav().unwrap().elements();
    let outside = id(&page, "outside");

    // outside click while closed changes nothing
    let before = page.dom().mutation_count();
    page.dispatch(Event::Click { target: outside });
    assert_eq!(page.dom().mutation_count(), before);

    page.dispatch(Event::Click { target: nav.toggle });
    assert!(page.dom().has_class(nav.list, "nav-open"));
    assert!(page.dom().has_class(nav.header, "nav-mobile-open"));
    assert_eq!(page.dom().attribute(nav.toggle, "aria-expanded").as_deref(), Some("true"));

    page.dispatch(Event::KeyDown { key: "Escape".into() });
    assert!(!page.nav().unwrap().is_open());
    assert!(page.nav().unwrap().is_consistent(page.dom()));
    assert_eq!(page.dom().focused(), Some(nav.toggle));

    page.dispatch(Event::Click { target: nav.toggle });
    page.dispatch(Event::Click { target: outside });
    assert!(!page.nav().unwrap().is_open());
    assert_eq!(page.dom().attribute(nav.toggle, "aria-expanded").as_deref(), Some("false"));
}

#[tokio::test]
async fn failed_header_leaves_placeholder_and_nav_unarmed() {
    let mut source = CannedSource::site();
    source.bodies.remove("/includes/header.html");

    let (mut page, tasks) = Page::boot(
        MemoryDom::parse(PAGE),
        DomHooks::default(),
        "",
        Arc::new(source),
    );
    let report = page.settle(tasks).await;

    assert!(matches!(
        report.status(Fragment::Header),
        Some(FragmentStatus::Failed(_))
    ));
    assert!(matches!(
        report.status(Fragment::Footer),
        Some(FragmentStatus::Loaded { .. })
    ));
    assert!(page.dom().by_id("loading").is_some());
    assert!(page.nav().is_none());
    assert!(!*page.navigation_ready().borrow());

    let footer = id(&page, "footer-placeholder");
    assert!(page.dom().text(footer).contains("Golden Ticket"));
}

#[tokio::test]
async fn reloading_header_rearms_once() {
    let (mut page, tasks) = Page::boot(
        MemoryDom::parse(PAGE),
        DomHooks::default(),
        "",
        Arc::new(CannedSource::site()),
    );
    page.settle(tasks).await;

    let placeholder = id(&page, "header-placeholder");
    page.apply_fragment(FragmentLoad {
        fragment: Fragment::Header,
        placeholder,
        result: Ok(HEADER.to_string()),
    });

    let nav = page.nav().unwrap().elements();
    assert!(page.dom().contains(placeholder, nav.toggle));
    assert_eq!(page.nav_generation(), Some(2));

    page.dispatch(Event::Click { target: nav.toggle });
    assert!(page.nav().unwrap().is_open());
    assert_eq!(page.dom().attribute(nav.toggle, "aria-expanded").as_deref(), Some("true"));
}

#[tokio::test]
async fn success_query_reveals_banner() {
    let (page, _tasks) = Page::boot(
        MemoryDom::parse(PAGE),
        DomHooks::default(),
        "?success=true",
        Arc::new(CannedSource::site()),
    );

    let banner = page.dom().first_with_class(page.dom().root(), "form-success").unwrap();
    assert!(page.banner_shown());
    assert!(page.dom().has_class(banner, "show"));
    assert_eq!(page.dom().scrolls().len(), 1);
}

#[tokio::test]
async fn absent_query_leaves_banner_untouched() {
    let (page, _tasks) = Page::boot(
        MemoryDom::parse(PAGE),
        DomHooks::default(),
        "",
        Arc::new(CannedSource::site()),
    );

    let banner = page.dom().first_with_class(page.dom().root(), "form-success").unwrap();
    assert!(!page.banner_shown());
    assert!(!page.dom().has_class(banner, "show"));
    assert!(page.dom().scrolls().is_empty());
}

#[tokio::test]
async fn page_without_placeholders_or_form_is_inert() {
    let (mut page, tasks) = Page::boot(
        MemoryDom::parse("<main><p id=\"p\">Plain page</p></main>"),
        DomHooks::default(),
        "",
        Arc::new(CannedSource::site()),
    );
    assert_eq!(tasks.pending(), 0);
    let report = page.settle(tasks).await;
    assert_eq!(report.status(Fragment::Header), Some(&FragmentStatus::Skipped));

    let p = id(&page, "p");
    assert_eq!(page.dispatch(Event::Click { target: p }), Dispatch::Default);
    assert_eq!(page.dispatch(Event::Submit { form: p }), Dispatch::Default);
    assert!(page.form().is_none());
}

#[tokio::test]
async fn fallback_nav_in_placeholder_waits_for_the_header() {
    let fallback = PAGE.replace(
        r#"<p id="loading">Loading…</p>"#,
        r#"<nav><button id="stub-toggle" class="nav-toggle">Menu</button><ul class="nav-list"></ul></nav>"#,
    );
    let mut source = CannedSource::site();
    source.gated.push("/includes/header.html".into());

    let (mut page, mut tasks) = Page::boot(
        MemoryDom::parse(&fallback),
        DomHooks::default(),
        "",
        Arc::new(source),
    );

    let footer = tasks.next().await.unwrap();
    page.apply_fragment(footer);
    assert_eq!(tasks.pending(), 1);
    assert!(page.nav().is_none());
    assert!(!*page.navigation_ready().borrow());

    let stub = id(&page, "stub-toggle");
    let before = page.dom().mutation_count();
    page.dispatch(Event::Click { target: stub });
    assert_eq!(page.dom().mutation_count(), before);
    assert!(
        tokio::time::timeout(Duration::from_millis(50), page.wait_navigation_ready())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn header_reload_without_nav_clears_readiness() {
    let (mut page, tasks) = Page::boot(
        MemoryDom::parse(PAGE),
        DomHooks::default(),
        "",
        Arc::new(CannedSource::site()),
    );
    page.settle(tasks).await;
    let ready = page.navigation_ready();
    assert!(*ready.borrow());

    let placeholder = id(&page, "header-placeholder");
    page.apply_fragment(FragmentLoad {
        fragment: Fragment::Header,
        placeholder,
        result: Ok("<header class=\"header\"><a href=\"/\">Home</a></header>".to_string()),
    });

    assert!(page.nav().is_none());
    assert_eq!(page.nav_generation(), None);
    assert!(!*ready.borrow());
}

#[tokio::test]
async fn inline_nav_without_placeholder_is_armed_at_boot() {
    let (page, tasks) = Page::boot(
        MemoryDom::parse(HEADER),
        DomHooks::default(),
        "",
        Arc::new(CannedSource::site()),
    );

    assert_eq!(tasks.pending(), 0);
    assert!(page.nav().is_some());
    assert_eq!(page.nav_generation(), Some(0));
    assert!(*page.navigation_ready().borrow());
}
