//! Contact form validation.

use tracing::debug;

use crate::dom::{Dom, NodeId};
use crate::hooks::DomHooks;
use crate::rules::{self, FieldKind, FieldValidation};

const CONTROL_TAGS: &[&str] = &["input", "select", "textarea"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldState {
    #[default]
    Untouched,
    Valid,
    Invalid,
}

#[derive(Debug, Clone)]
struct FieldBinding {
    control: NodeId,
    group: Option<NodeId>,
    error: Option<NodeId>,
    state: FieldState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Allowed,
    /// Native submission must be cancelled. Focus has moved to `first_invalid`.
    Blocked { first_invalid: Option<NodeId> },
}

#[derive(Debug, Clone)]
pub struct FormValidator {
    form: NodeId,
    fields: Vec<FieldBinding>,
    error_marker: String,
}

impl FormValidator {
    /// Bind to the contact form. `None` when the page has no such form.
    pub fn attach<D: Dom + ?Sized>(dom: &D, hooks: &DomHooks) -> Option<Self> {
        let container = dom.first_with_class(dom.root(), &hooks.form_container_class)?;
        let form = if dom.tag(container) == "form" {
            container
        } else {
            dom.first_with_tag(container, "form")?
        };

        let fields: Vec<FieldBinding> = dom
            .descendants(form)
            .into_iter()
            .filter(|n| CONTROL_TAGS.contains(&dom.tag(*n).as_str()))
            .map(|control| {
                let group = dom
                    .closest_with_class(control, &hooks.field_group_class)
                    .filter(|g| dom.contains(form, *g));
                let error = group.and_then(|g| dom.first_with_class(g, &hooks.field_error_class));
                FieldBinding {
                    control,
                    group,
                    error,
                    state: FieldState::Untouched,
                }
            })
            .collect();

        debug!(fields = fields.len(), "contact form attached");
        Some(Self {
            form,
            fields,
            error_marker: hooks.error_marker_class.clone(),
        })
    }

    pub fn form(&self) -> NodeId {
        self.form
    }

    pub fn controls(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.fields.iter().map(|f| f.control)
    }

    pub fn state(&self, control: NodeId) -> Option<FieldState> {
        self.fields
            .iter()
            .find(|f| f.control == control)
            .map(|f| f.state)
    }

    /// Focus left a control: validate it and show the result.
    pub fn blur<D: Dom + ?Sized>(&mut self, dom: &mut D, control: NodeId) -> Option<FieldValidation> {
        let index = self.index_of(control)?;
        Some(self.validate_field(dom, index))
    }

    /// The user typed into a control. An error shown on its group is cleared
    /// as soon as the trimmed value is non-empty, without re-validating.
    pub fn input<D: Dom + ?Sized>(&mut self, dom: &mut D, control: NodeId) {
        let Some(index) = self.index_of(control) else {
            return;
        };
        let field = &self.fields[index];
        let Some(group) = field.group else {
            return;
        };
        if !dom.has_class(group, &self.error_marker) || dom.value(control).trim().is_empty() {
            return;
        }

        dom.remove_class(group, &self.error_marker);
        if let Some(error) = field.error {
            dom.set_text(error, "");
        }
        self.fields[index].state = FieldState::Untouched;
    }

    /// Validate every required field. When any fails, focus the first
    /// control, in document order, whose group carries the error marker.
    pub fn submit<D: Dom + ?Sized>(&mut self, dom: &mut D) -> SubmitOutcome {
        let mut all_valid = true;
        for index in 0..self.fields.len() {
            if dom.has_attribute(self.fields[index].control, "required")
                && !self.validate_field(dom, index).is_valid
            {
                all_valid = false;
            }
        }

        if all_valid {
            return SubmitOutcome::Allowed;
        }

        let first_invalid = self
            .fields
            .iter()
            .find(|f| f.group.is_some_and(|g| dom.has_class(g, &self.error_marker)))
            .map(|f| f.control);
        if let Some(control) = first_invalid {
            dom.focus(control);
        }
        debug!(?first_invalid, "submission blocked");
        SubmitOutcome::Blocked { first_invalid }
    }

    fn index_of(&self, control: NodeId) -> Option<usize> {
        self.fields.iter().position(|f| f.control == control)
    }

    fn validate_field<D: Dom + ?Sized>(&mut self, dom: &mut D, index: usize) -> FieldValidation {
        let control = self.fields[index].control;
        let kind = FieldKind::from_type_attr(dom.attribute(control, "type").as_deref());
        let required = dom.has_attribute(control, "required");
        let result = rules::validate(kind, required, &dom.value(control));

        let field = &mut self.fields[index];
        field.state = if result.is_valid {
            FieldState::Valid
        } else {
            FieldState::Invalid
        };

        if let Some(group) = field.group {
            if result.is_valid {
                dom.remove_class(group, &self.error_marker);
            } else {
                dom.add_class(group, &self.error_marker);
            }
            if let Some(error) = field.error {
                dom.set_text(error, &result.error_message);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;
    use crate::rules::{EMAIL_MESSAGE, PHONE_MESSAGE, REQUIRED_MESSAGE};

    const CONTACT: &str = r#"
<section class="contact-form">
  <form name="contact" method="POST">
    <div class="form-group"><input id="name" type="text" required><span id="name-err" class="form-error"></span></div>
    <div class="form-group"><input id="email" type="email" required><span id="email-err" class="form-error"></span></div>
    <div class="form-group"><input id="phone" type="tel"><span id="phone-err" class="form-error"></span></div>
    <div class="form-group"><textarea id="message" required></textarea><span class="form-error"></span></div>
    <button type="submit">Send</button>
  </form>
</section>"#;

    fn setup() -> (MemoryDom, FormValidator) {
        let dom = MemoryDom::parse(CONTACT);
        let form = FormValidator::attach(&dom, &DomHooks::default()).unwrap();
        (dom, form)
    }

    fn node(dom: &MemoryDom, id: &str) -> NodeId {
        dom.by_id(id).unwrap()
    }

    fn group_of(dom: &MemoryDom, id: &str) -> NodeId {
        dom.parent(node(dom, id)).unwrap()
    }

    #[test]
    fn test_missing_form_disables_validator() {
        let dom = MemoryDom::parse("<main><form></form></main>");
        assert!(FormValidator::attach(&dom, &DomHooks::default()).is_none());
    }

    #[test]
    fn test_blur_marks_and_clears() {
        let (mut dom, mut form) = setup();
        let email = node(&dom, "email");

        dom.set_value(email, "nope");
        let result = form.blur(&mut dom, email).unwrap();
        assert!(!result.is_valid);
        assert!(dom.has_class(group_of(&dom, "email"), "has-error"));
        assert_eq!(dom.text(node(&dom, "email-err")), EMAIL_MESSAGE);
        assert_eq!(form.state(email), Some(FieldState::Invalid));

        dom.set_value(email, "a@b.co");
        assert!(form.blur(&mut dom, email).unwrap().is_valid);
        assert!(!dom.has_class(group_of(&dom, "email"), "has-error"));
        assert_eq!(dom.text(node(&dom, "email-err")), "");
        assert_eq!(form.state(email), Some(FieldState::Valid));
    }

    #[test]
    fn test_optional_phone_checked_on_blur_only_when_filled() {
        let (mut dom, mut form) = setup();
        let phone = node(&dom, "phone");

        assert!(form.blur(&mut dom, phone).unwrap().is_valid);
        dom.set_value(phone, "555-123");
        assert!(!form.blur(&mut dom, phone).unwrap().is_valid);
        assert_eq!(dom.text(node(&dom, "phone-err")), PHONE_MESSAGE);
    }

    #[test]
    fn test_revalidating_valid_field_changes_nothing() {
        let (mut dom, mut form) = setup();
        let name = node(&dom, "name");
        dom.set_value(name, "Charlie");

        form.blur(&mut dom, name);
        let after_first = dom.mutation_count();
        form.blur(&mut dom, name);

        assert_eq!(dom.mutation_count(), after_first);
        assert_eq!(dom.inner_html(node(&dom, "name-err")), "");
    }

    #[test]
    fn test_input_clears_on_first_real_character() {
        let (mut dom, mut form) = setup();
        let name = node(&dom, "name");
        form.blur(&mut dom, name);
        assert!(dom.has_class(group_of(&dom, "name"), "has-error"));

        dom.set_value(name, "   ");
        form.input(&mut dom, name);
        assert!(dom.has_class(group_of(&dom, "name"), "has-error"));
        assert_eq!(dom.text(node(&dom, "name-err")), REQUIRED_MESSAGE);

        dom.set_value(name, "C");
        form.input(&mut dom, name);
        assert!(!dom.has_class(group_of(&dom, "name"), "has-error"));
        assert_eq!(dom.text(node(&dom, "name-err")), "");
        assert_eq!(form.state(name), Some(FieldState::Untouched));
    }

    #[test]
    fn test_input_clears_format_error_even_if_still_malformed() {
        let (mut dom, mut form) = setup();
        let email = node(&dom, "email");
        dom.set_value(email, "a@b");
        form.blur(&mut dom, email);

        dom.set_value(email, "a@bx");
        form.input(&mut dom, email);
        assert!(!dom.has_class(group_of(&dom, "email"), "has-error"));
    }

    #[test]
    fn test_submit_blocks_and_focuses_first_invalid() {
        let (mut dom, mut form) = setup();
        dom.set_value(node(&dom, "email"), "a@b.co");
        dom.set_value(node(&dom, "phone"), "(555) 123-4567");
        dom.set_value(node(&dom, "message"), "Hello");

        let outcome = form.submit(&mut dom);

        let name = node(&dom, "name");
        assert_eq!(outcome, SubmitOutcome::Blocked { first_invalid: Some(name) });
        assert_eq!(dom.focused(), Some(name));
        assert_eq!(dom.text(node(&dom, "name-err")), REQUIRED_MESSAGE);
        assert!(!dom.has_class(group_of(&dom, "email"), "has-error"));
    }

    #[test]
    fn test_submit_skips_optional_fields() {
        let (mut dom, mut form) = setup();
        dom.set_value(node(&dom, "name"), "Charlie");
        dom.set_value(node(&dom, "email"), "charlie@factory.com");
        dom.set_value(node(&dom, "message"), "Golden ticket?");
        dom.set_value(node(&dom, "phone"), "555");

        assert_eq!(form.submit(&mut dom), SubmitOutcome::Allowed);
        assert!(!dom.has_class(group_of(&dom, "phone"), "has-error"));
    }

    #[test]
    fn test_focus_prefers_document_order_over_validation_order() {
        let (mut dom, mut form) = setup();
        // an optional field already showing an error from a blur
        let phone = node(&dom, "phone");
        dom.set_value(phone, "12");
        form.blur(&mut dom, phone);
        dom.set_value(node(&dom, "name"), "Charlie");
        dom.set_value(node(&dom, "email"), "charlie@factory.com");

        let outcome = form.submit(&mut dom);
        assert_eq!(outcome, SubmitOutcome::Blocked { first_invalid: Some(phone) });
    }
}
