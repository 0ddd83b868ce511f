pub mod availability;
pub mod crm;
pub mod eligibility;
pub mod wizard;
