//! Plan and course catalog.
//!
//! The catalog is the admin-edited table of subscription plans (per role)
//! and purchasable courses. It is loaded once - from TOML or built in
//! code - validated, and then shared read-only across the service.

mod plan;

use std::collections::HashSet;

use serde::Deserialize;

pub use plan::{Course, CourseId, LimitPeriod, Plan, PlanId, ResourceKind, Role, UsageLimit};

use crate::error::{EntitlementError, Result};

/// Validated, read-only table of plans and courses.
///
/// # Examples
///
/// ```
/// use entitlement_gate::catalog::PlanCatalog;
///
/// let toml = r#"
///     [[plans]]
///     id = "astro-basic"
///     role = "astrologer"
///     name = "Astrologer Basic"
///     price = "499.00"
///     currency = "INR"
///     duration_days = 30
///     features = ["3 posts per month"]
///
///     [plans.usage_limits]
///     post = 3
/// "#;
///
/// let catalog = PlanCatalog::from_toml(toml).unwrap();
/// assert_eq!(catalog.plans().len(), 1);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanCatalog {
    #[serde(default)]
    plans: Vec<Plan>,
    #[serde(default)]
    courses: Vec<Course>,
}

impl PlanCatalog {
    /// Builds a catalog from plan and course definitions.
    ///
    /// # Errors
    ///
    /// Returns error if any definition fails validation, ids are not
    /// unique, or the table mixes currencies.
    pub fn new(plans: Vec<Plan>, courses: Vec<Course>) -> Result<Self> {
        let catalog = Self { plans, courses };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parses and validates a catalog from TOML.
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed or validation fails.
    pub fn from_toml(input: &str) -> Result<Self> {
        let catalog: Self = toml::from_str(input)
            .map_err(|e| EntitlementError::CatalogError(format!("malformed catalog: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Validates every entry plus the cross-entry invariants.
    ///
    /// # Errors
    ///
    /// Returns error on duplicate ids, invalid entries, or more than one
    /// currency across the whole table.
    pub fn validate(&self) -> Result<()> {
        let mut plan_ids = HashSet::new();
        for plan in &self.plans {
            plan.validate()?;
            if !plan_ids.insert(plan.id.as_str()) {
                return Err(EntitlementError::CatalogError(format!(
                    "duplicate plan id: {}",
                    plan.id
                )));
            }
        }

        let mut course_ids = HashSet::new();
        for course in &self.courses {
            course.validate()?;
            if !course_ids.insert(course.id.as_str()) {
                return Err(EntitlementError::CatalogError(format!(
                    "duplicate course id: {}",
                    course.id
                )));
            }
        }

        let currencies: HashSet<&str> = self
            .plans
            .iter()
            .map(|p| p.currency.as_str())
            .chain(self.courses.iter().map(|c| c.currency.as_str()))
            .collect();
        if currencies.len() > 1 {
            return Err(EntitlementError::CatalogError(format!(
                "catalog must use a single currency, found {}",
                currencies.len()
            )));
        }

        Ok(())
    }

    /// Looks up a plan by id.
    #[must_use]
    pub fn plan(&self, id: &PlanId) -> Option<&Plan> {
        self.plans.iter().find(|p| &p.id == id)
    }

    /// Looks up a course by id.
    #[must_use]
    pub fn course(&self, id: &CourseId) -> Option<&Course> {
        self.courses.iter().find(|c| &c.id == id)
    }

    /// All plans scoped to the given role.
    #[must_use]
    pub fn plans_for_role(&self, role: Role) -> Vec<&Plan> {
        self.plans.iter().filter(|p| p.role == role).collect()
    }

    /// All plans.
    #[must_use]
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    /// All courses.
    #[must_use]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn plan(id: &str, role: Role, currency: &str) -> Plan {
        Plan {
            id: PlanId::new(id).unwrap(),
            role,
            name: id.to_owned(),
            price: Decimal::new(9900, 2),
            yearly_price: None,
            currency: currency.to_owned(),
            duration_days: 30,
            features: Vec::new(),
            usage_limits: Default::default(),
        }
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = PlanCatalog::new(
            vec![plan("teach-1", Role::Teacher, "INR"), plan("astro-1", Role::Astrologer, "INR")],
            Vec::new(),
        )
        .unwrap();

        assert!(catalog.plan(&PlanId::new("teach-1").unwrap()).is_some());
        assert!(catalog.plan(&PlanId::new("missing").unwrap()).is_none());
        assert_eq!(catalog.plans_for_role(Role::Astrologer).len(), 1);
    }

    #[test]
    fn test_catalog_rejects_duplicate_ids() {
        let result = PlanCatalog::new(
            vec![plan("p1", Role::Teacher, "INR"), plan("p1", Role::Doctor, "INR")],
            Vec::new(),
        );
        assert!(matches!(result.unwrap_err(), EntitlementError::CatalogError(_)));
    }

    #[test]
    fn test_catalog_rejects_mixed_currencies() {
        let result = PlanCatalog::new(
            vec![plan("p1", Role::Teacher, "INR"), plan("p2", Role::Doctor, "USD")],
            Vec::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_catalog_from_toml() {
        let toml = r#"
            [[plans]]
            id = "doc-pro"
            role = "doctor"
            name = "Doctor Pro"
            price = "999.00"
            currency = "INR"
            duration_days = 30

            [plans.usage_limits]
            article = 10

            [[courses]]
            id = "astro-cert"
            name = "Astrology Certification"
            price = "2499.00"
            currency = "INR"
            grants_role = "astrologer"
        "#;

        let catalog = PlanCatalog::from_toml(toml).unwrap();
        let plan = catalog.plan(&PlanId::new("doc-pro").unwrap()).unwrap();
        assert_eq!(plan.limit_for(ResourceKind::Article), UsageLimit::Limited(10));

        let course = catalog.course(&CourseId::new("astro-cert").unwrap()).unwrap();
        assert_eq!(course.grants_role, Some(Role::Astrologer));
    }

    #[test]
    fn test_catalog_from_toml_malformed() {
        let result = PlanCatalog::from_toml("plans = 3");
        assert!(matches!(result.unwrap_err(), EntitlementError::CatalogError(_)));
    }
}
