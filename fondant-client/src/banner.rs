use tracing::debug;
use url::form_urlencoded;

use crate::dom::{Dom, ScrollBehavior, ScrollBlock, ScrollOptions};
use crate::hooks::DomHooks;

/// Shows the "thanks, we got your message" banner after the form handler
/// redirects back with `?success=true`.
pub struct SuccessBanner;

impl SuccessBanner {
    /// Whether `query` (with or without the leading `?`) carries the success
    /// marker. Only the exact literal `true` counts.
    pub fn requested(query: &str, hooks: &DomHooks) -> bool {
        form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .find(|(name, _)| *name == hooks.success_param)
            .is_some_and(|(_, value)| value == "true")
    }

    /// Reveal the banner and scroll to it. Returns whether it was revealed.
    pub fn detect<D: Dom + ?Sized>(dom: &mut D, hooks: &DomHooks, query: &str) -> bool {
        if !Self::requested(query, hooks) {
            return false;
        }
        let Some(banner) = dom.first_with_class(dom.root(), &hooks.success_banner_class) else {
            debug!("success marker present but page has no banner");
            return false;
        };

        dom.add_class(banner, &hooks.success_visible_class);
        dom.scroll_into_view(
            banner,
            ScrollOptions {
                behavior: ScrollBehavior::Smooth,
                block: ScrollBlock::Center,
            },
        );
        true
    }
}
