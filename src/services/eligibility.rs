use crate::models::{Catalog, Staff};

/// Staff qualified to perform a service, in catalog order.
///
/// Permissive by default: an unknown service id, or a service with no
/// required role, yields the whole staff catalog.
pub fn eligible_staff<'a>(catalog: &'a Catalog, service_id: &str) -> Vec<&'a Staff> {
    let required = catalog
        .service(service_id)
        .and_then(|s| s.required_role.as_deref());

    match required {
        Some(role) => catalog.staff.iter().filter(|m| m.has_role(role)).collect(),
        None => catalog.staff.iter().collect(),
    }
}

pub fn is_eligible(catalog: &Catalog, service_id: &str, staff_id: &str) -> bool {
    eligible_staff(catalog, service_id)
        .iter()
        .any(|m| m.id == staff_id)
}
