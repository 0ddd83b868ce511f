pub mod catalog;
pub mod draft;
pub mod service;
pub mod staff;

pub use catalog::{Catalog, UnavailabilityRule};
pub use draft::{BookingDraft, WizardStep};
pub use service::Service;
pub use staff::Staff;
