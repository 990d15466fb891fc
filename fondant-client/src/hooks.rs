use serde::{Deserialize, Serialize};

/// The names the page markup and the behaviours agree on.
///
/// Every field has a default matching the shipped templates, so a
/// `[client]` table only needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DomHooks {
    /// Class of the button that opens the mobile menu.
    pub nav_toggle_class: String,
    pub nav_list_class: String,
    pub header_class: String,
    /// Added to the nav list while the menu is open.
    pub nav_open_class: String,
    /// Added to the header while the menu is open.
    pub header_open_class: String,

    /// Class of the element wrapping the contact `<form>`.
    pub form_container_class: String,
    pub field_group_class: String,
    pub field_error_class: String,
    /// Marker added to a field group that failed validation.
    pub error_marker_class: String,

    pub success_banner_class: String,
    pub success_visible_class: String,
    /// Query parameter set by the form handler after a good submission.
    pub success_param: String,

    pub header_placeholder_id: String,
    pub footer_placeholder_id: String,
    pub header_fragment_path: String,
    pub footer_fragment_path: String,
}

impl Default for DomHooks {
    fn default() -> Self {
        Self {
            nav_toggle_class: "nav-toggle".into(),
            nav_list_class: "nav-list".into(),
            header_class: "header".into(),
            nav_open_class: "nav-open".into(),
            header_open_class: "nav-mobile-open".into(),
            form_container_class: "contact-form".into(),
            field_group_class: "form-group".into(),
            field_error_class: "form-error".into(),
            error_marker_class: "has-error".into(),
            success_banner_class: "form-success".into(),
            success_visible_class: "show".into(),
            success_param: "success".into(),
            header_placeholder_id: "header-placeholder".into(),
            footer_placeholder_id: "footer-placeholder".into(),
            header_fragment_path: "/includes/header.html".into(),
            footer_fragment_path: "/includes/footer.html".into(),
        }
    }
}
