//! Page behaviours for the marketing site: the mobile navigation toggle,
//! contact form validation, header/footer include loading and the
//! submission success banner.
//!
//! Everything operates on an injected [`Dom`]. [`MemoryDom`] is the in-process
//! implementation used for tests and for resolving includes ahead of time.

pub mod banner;
pub mod dom;
pub mod form;
pub mod hooks;
pub mod include;
pub mod nav;
pub mod page;
pub mod rules;

pub use banner::SuccessBanner;
pub use dom::{Dom, El, MemoryDom, NodeId};
pub use form::{FieldState, FormValidator, SubmitOutcome};
pub use hooks::DomHooks;
pub use include::{
    DirFragmentSource, FetchError, Fragment, FragmentLoad, FragmentSource, HttpFragmentSource,
    IncludeLoader, IncludeTasks,
};
pub use nav::{NavElements, NavToggle};
pub use page::{Dispatch, Event, FragmentStatus, IncludeReport, Page};
pub use rules::{FieldKind, FieldValidation};
