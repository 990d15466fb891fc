//! Wires the behaviours to one page and routes events to them.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::banner::SuccessBanner;
use crate::dom::{Dom, NodeId};
use crate::form::{FormValidator, SubmitOutcome};
use crate::hooks::DomHooks;
use crate::include::{Fragment, FragmentLoad, FragmentSource, IncludeLoader, IncludeTasks};
use crate::nav::{NavElements, NavToggle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Click { target: NodeId },
    KeyDown { key: String },
    Blur { target: NodeId },
    Input { target: NodeId },
    Submit { form: NodeId },
}

/// What the browser should do with the event after we handled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Default,
    PreventDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentStatus {
    Loaded { bytes: usize },
    Failed(String),
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeReport {
    pub outcomes: Vec<(Fragment, FragmentStatus)>,
}

impl IncludeReport {
    pub fn status(&self, fragment: Fragment) -> Option<&FragmentStatus> {
        self.outcomes
            .iter()
            .find(|(f, _)| *f == fragment)
            .map(|(_, s)| s)
    }

    pub fn all_loaded(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, s)| matches!(s, FragmentStatus::Loaded { .. }))
    }
}

#[derive(Debug)]
struct ArmedNav {
    toggle: NavToggle,
    /// Header fragment load this toggle was armed for.
    generation: u64,
}

pub struct Page<D: Dom> {
    dom: D,
    hooks: DomHooks,
    nav: Option<ArmedNav>,
    form: Option<FormValidator>,
    header_generation: u64,
    nav_ready: watch::Sender<bool>,
    banner_shown: bool,
}

impl<D: Dom> Page<D> {
    /// Wire up a page without starting any fetches. A page with no header
    /// placeholder carries its navigation inline, so the toggle is armed right
    /// away. Otherwise it waits for the header fragment: whatever the
    /// placeholder holds until then is never armed.
    pub fn new(mut dom: D, hooks: DomHooks) -> Self {
        let form = FormValidator::attach(&dom, &hooks);
        let (nav_ready, _) = watch::channel(false);
        let inline_header = dom.by_id(Fragment::Header.placeholder_id(&hooks)).is_none();
        let nav = NavElements::locate(&dom, &hooks)
            .filter(|_| inline_header)
            .map(|elements| ArmedNav {
                toggle: NavToggle::new(&mut dom, elements, &hooks),
                generation: 0,
            });
        if nav.is_some() {
            nav_ready.send_replace(true);
        }

        Self {
            dom,
            hooks,
            nav,
            form,
            header_generation: 0,
            nav_ready,
            banner_shown: false,
        }
    }

    /// Page-load sequence: kick off the fragment fetches first, then wire the
    /// contact form and check for the success marker. Neither waits on the
    /// fetches; drive the returned tasks with [`Page::apply_fragment`] or
    /// [`Page::settle`].
    pub fn boot(dom: D, hooks: DomHooks, query: &str, source: Arc<dyn FragmentSource>) -> (Self, IncludeTasks) {
        let tasks = IncludeLoader::start(&dom, &hooks, source);
        let mut page = Self::new(dom, hooks);
        page.banner_shown = SuccessBanner::detect(&mut page.dom, &page.hooks, query);
        info!(
            fetching = tasks.pending(),
            form = page.form.is_some(),
            banner = page.banner_shown,
            "page booted"
        );
        (page, tasks)
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn into_dom(self) -> D {
        self.dom
    }

    pub fn hooks(&self) -> &DomHooks {
        &self.hooks
    }

    pub fn nav(&self) -> Option<&NavToggle> {
        self.nav.as_ref().map(|n| &n.toggle)
    }

    pub fn form(&self) -> Option<&FormValidator> {
        self.form.as_ref()
    }

    pub fn banner_shown(&self) -> bool {
        self.banner_shown
    }

    /// Header fragment load the current toggle was armed for. `0` is inline
    /// navigation present from the start.
    pub fn nav_generation(&self) -> Option<u64> {
        self.nav.as_ref().map(|n| n.generation)
    }

    /// `true` while a navigation toggle is armed.
    pub fn navigation_ready(&self) -> watch::Receiver<bool> {
        self.nav_ready.subscribe()
    }

    /// Splice a finished fetch into the page. A failed fetch is logged and
    /// leaves the placeholder as it was. A loaded header re-arms navigation.
    pub fn apply_fragment(&mut self, load: FragmentLoad) -> FragmentStatus {
        let FragmentLoad {
            fragment,
            placeholder,
            result,
        } = load;

        let markup = match result {
            Ok(markup) => markup,
            Err(e) => {
                warn!(%fragment, error = %e, "error loading fragment");
                return FragmentStatus::Failed(e.to_string());
            }
        };

        self.dom.set_inner_html(placeholder, &markup);
        debug!(%fragment, bytes = markup.len(), "fragment injected");

        if fragment == Fragment::Header {
            self.header_generation += 1;
            self.arm_navigation();
        }

        FragmentStatus::Loaded {
            bytes: markup.len(),
        }
    }

    /// Drain every outstanding fetch, applying each as it completes.
    pub async fn settle(&mut self, mut tasks: IncludeTasks) -> IncludeReport {
        let mut report = IncludeReport::default();
        for fragment in tasks.skipped() {
            report.outcomes.push((*fragment, FragmentStatus::Skipped));
        }
        while let Some(load) = tasks.next().await {
            let fragment = load.fragment;
            let status = self.apply_fragment(load);
            report.outcomes.push((fragment, status));
        }
        report
    }

    /// Resolves once the navigation toggle is usable. Never resolves if the
    /// header never loads.
    pub async fn wait_navigation_ready(&self) {
        let mut ready = self.navigation_ready();
        // the sender lives in self, so the channel cannot close under us
        let _ = ready.wait_for(|armed| *armed).await;
    }

    pub fn dispatch(&mut self, event: Event) -> Dispatch {
        match event {
            Event::Click { target } => {
                if let Some(nav) = self.nav.as_mut() {
                    nav.toggle.handle_click(&mut self.dom, target);
                }
                Dispatch::Default
            }
            Event::KeyDown { key } => {
                if let Some(nav) = self.nav.as_mut() {
                    nav.toggle.handle_key(&mut self.dom, &key);
                }
                Dispatch::Default
            }
            Event::Blur { target } => {
                if let Some(form) = self.form.as_mut() {
                    form.blur(&mut self.dom, target);
                }
                Dispatch::Default
            }
            Event::Input { target } => {
                if let Some(form) = self.form.as_mut() {
                    form.input(&mut self.dom, target);
                }
                Dispatch::Default
            }
            Event::Submit { form } => match self.form.as_mut() {
                Some(validator) if validator.form() == form => match validator.submit(&mut self.dom) {
                    SubmitOutcome::Allowed => Dispatch::Default,
                    SubmitOutcome::Blocked { .. } => Dispatch::PreventDefault,
                },
                _ => Dispatch::Default,
            },
        }
    }

    /// Set up the navigation toggle for the header fragment just loaded. The
    /// previous toggle is dropped first so its handlers can never fire
    /// alongside the new one.
    fn arm_navigation(&mut self) {
        self.nav = None;

        let Some(elements) = NavElements::locate(&self.dom, &self.hooks) else {
            debug!("header loaded without navigation controls");
            self.nav_ready.send_replace(false);
            return;
        };

        self.nav = Some(ArmedNav {
            toggle: NavToggle::new(&mut self.dom, elements, &self.hooks),
            generation: self.header_generation,
        });
        self.nav_ready.send_replace(true);
        debug!(generation = self.header_generation, "navigation armed");
    }
}
