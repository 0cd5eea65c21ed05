//! Plan and course definitions.
//!
//! Plans are role-scoped subscription offerings with per-period usage
//! limits; courses are one-off purchases that may unlock an additional
//! role on the buyer's account.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EntitlementError, Result};

/// Professional roles available on the platform.
///
/// Every plan is scoped to exactly one role; every resource kind belongs
/// to one or more roles via [`Role::resource_kinds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Education: publishes courses and lessons.
    Teacher,
    /// Music creation: generates tracks, publishes albums.
    Artist,
    /// Music direction: publishes albums, manages tracks.
    Director,
    /// Therapy: publishes articles, runs sessions.
    Doctor,
    /// Astrology: publishes posts, offers consultations.
    Astrologer,
}

impl Role {
    /// All roles, in display order.
    pub const ALL: [Self; 5] =
        [Self::Teacher, Self::Artist, Self::Director, Self::Doctor, Self::Astrologer];

    /// Returns the wire/storage name of this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Artist => "artist",
            Self::Director => "director",
            Self::Doctor => "doctor",
            Self::Astrologer => "astrologer",
        }
    }

    /// Resource kinds this role may author.
    ///
    /// This is the single role-to-kind mapping table; quota enforcement is
    /// parameterized on `(user, kind)` and reused across roles instead of
    /// being duplicated per role surface.
    #[must_use]
    pub const fn resource_kinds(&self) -> &'static [ResourceKind] {
        match self {
            Self::Teacher => &[ResourceKind::Course, ResourceKind::Lesson],
            Self::Artist => &[ResourceKind::Track, ResourceKind::Album],
            Self::Director => &[ResourceKind::Album, ResourceKind::Track],
            Self::Doctor => &[ResourceKind::Article, ResourceKind::Session],
            Self::Astrologer => &[ResourceKind::Post, ResourceKind::Consultation],
        }
    }

    /// Returns true if this role may author the given kind.
    #[must_use]
    pub fn allows_kind(&self, kind: ResourceKind) -> bool {
        self.resource_kinds().contains(&kind)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of countable resources a professional can create or publish.
///
/// Each kind carries a period granularity (how its usage counter is
/// windowed) and a published-content classification (whether the content
/// safety validator runs before quota commit).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A published course (teacher).
    Course,
    /// A lesson within a course (teacher).
    Lesson,
    /// An AI-generated music track (artist, director).
    Track,
    /// A published album (artist, director).
    Album,
    /// A published therapy article (doctor).
    Article,
    /// A therapy session slot (doctor).
    Session,
    /// A published astrology post (astrologer).
    Post,
    /// A consultation offering (astrologer).
    Consultation,
}

impl ResourceKind {
    /// Period granularity for this kind's usage counter.
    ///
    /// Track generation is metered per UTC day; everything else is metered
    /// per UTC month.
    #[must_use]
    pub const fn period(&self) -> LimitPeriod {
        match self {
            Self::Track => LimitPeriod::Daily,
            _ => LimitPeriod::Monthly,
        }
    }

    /// Whether this kind is published content.
    ///
    /// Published kinds pass through the content safety validator before
    /// any quota is consumed.
    #[must_use]
    pub const fn is_published_content(&self) -> bool {
        matches!(self, Self::Course | Self::Album | Self::Article | Self::Post)
    }

    /// Returns the wire/storage name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Lesson => "lesson",
            Self::Track => "track",
            Self::Album => "album",
            Self::Article => "article",
            Self::Session => "session",
            Self::Post => "post",
            Self::Consultation => "consultation",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Window over which a usage limit applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitPeriod {
    /// Counter windowed per UTC day.
    Daily,
    /// Counter windowed per UTC month.
    Monthly,
}

impl LimitPeriod {
    /// Human-readable window name for user-facing messages.
    #[must_use]
    pub const fn display(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        }
    }
}

/// Validates an identifier string shared by all id newtypes.
fn validate_id(id: &str, what: &str) -> Result<()> {
    if id.is_empty() {
        return Err(EntitlementError::InvalidId(format!("{what} cannot be empty")));
    }
    if id.len() > 64 {
        return Err(EntitlementError::InvalidId(format!(
            "{what} must be 64 characters or less"
        )));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(EntitlementError::InvalidId(format!(
            "{what} can only contain alphanumeric characters, hyphens, and underscores"
        )));
    }
    Ok(())
}

/// Unique identifier for a subscription plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(String);

impl PlanId {
    /// Creates a new plan id after validation.
    ///
    /// # Errors
    ///
    /// Returns error if the id is empty, exceeds 64 characters, or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn new<S: Into<String>>(id: S) -> Result<Self> {
        let id = id.into();
        validate_id(&id, "plan_id")?;
        Ok(Self(id))
    }

    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a purchasable course.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId(String);

impl CourseId {
    /// Creates a new course id after validation.
    ///
    /// # Errors
    ///
    /// Returns error if the id is empty, exceeds 64 characters, or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn new<S: Into<String>>(id: S) -> Result<Self> {
        let id = id.into();
        validate_id(&id, "course_id")?;
        Ok(Self(id))
    }

    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CourseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved usage limit for one resource kind under a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageLimit {
    /// At most this many units per period.
    Limited(u64),
    /// No cap. Unconfigured kinds resolve to this.
    Unbounded,
}

impl UsageLimit {
    /// Returns true if a user who has already used `used` units may
    /// consume one more.
    #[must_use]
    pub fn allows(&self, used: u64) -> bool {
        match self {
            Self::Limited(max) => used < *max,
            Self::Unbounded => true,
        }
    }
}

/// A role-scoped subscription plan.
///
/// Admin-edited; edits are forward-looking only and never retroactively
/// change the expiry or counters of existing subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique plan identifier.
    pub id: PlanId,
    /// Role this plan applies to.
    pub role: Role,
    /// Display name.
    pub name: String,
    /// Monthly price, minor-unit precision. Zero means a free plan that
    /// skips the payment lifecycle entirely.
    pub price: Decimal,
    /// Yearly price override. Absent means yearly = 12 x monthly; the
    /// discount policy lives in plan data, never in code.
    #[serde(default)]
    pub yearly_price: Option<Decimal>,
    /// Currency code (ISO 4217). At most one currency per catalog.
    pub currency: String,
    /// Entitlement duration granted per settled monthly purchase.
    pub duration_days: u32,
    /// Display strings describing the plan. Informational only.
    #[serde(default)]
    pub features: Vec<String>,
    /// Per-kind usage caps. A kind absent from this map is unbounded.
    #[serde(default)]
    pub usage_limits: BTreeMap<ResourceKind, u64>,
}

impl Plan {
    /// Resolves the configured limit for a resource kind.
    #[must_use]
    pub fn limit_for(&self, kind: ResourceKind) -> UsageLimit {
        match self.usage_limits.get(&kind) {
            Some(max) => UsageLimit::Limited(*max),
            None => UsageLimit::Unbounded,
        }
    }

    /// Returns true for free plans (`price == 0`).
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }

    /// Yearly charge for this plan.
    #[must_use]
    pub fn yearly_amount(&self) -> Decimal {
        self.yearly_price.unwrap_or_else(|| self.price * Decimal::from(12))
    }

    /// Validates the plan definition.
    ///
    /// # Errors
    ///
    /// Returns error if `duration_days` is zero or any price is negative.
    pub fn validate(&self) -> Result<()> {
        if self.duration_days == 0 {
            return Err(EntitlementError::CatalogError(format!(
                "plan {}: duration_days must be greater than zero",
                self.id
            )));
        }
        if self.price.is_sign_negative() {
            return Err(EntitlementError::CatalogError(format!(
                "plan {}: price cannot be negative",
                self.id
            )));
        }
        if let Some(yearly) = self.yearly_price
            && yearly.is_sign_negative()
        {
            return Err(EntitlementError::CatalogError(format!(
                "plan {}: yearly_price cannot be negative",
                self.id
            )));
        }
        Ok(())
    }
}

/// A one-off purchasable course.
///
/// Settling a course order may unlock an additional role on the buyer's
/// account when `grants_role` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Unique course identifier.
    pub id: CourseId,
    /// Display name.
    pub name: String,
    /// One-off price, minor-unit precision.
    pub price: Decimal,
    /// Currency code (ISO 4217).
    pub currency: String,
    /// Role unlocked on the buyer's account after a verified purchase.
    #[serde(default)]
    pub grants_role: Option<Role>,
}

impl Course {
    /// Validates the course definition.
    ///
    /// # Errors
    ///
    /// Returns error if the price is negative.
    pub fn validate(&self) -> Result<()> {
        if self.price.is_sign_negative() {
            return Err(EntitlementError::CatalogError(format!(
                "course {}: price cannot be negative",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_id_valid() {
        let id = PlanId::new("astro-pro_1").unwrap();
        assert_eq!(id.as_str(), "astro-pro_1");
    }

    #[test]
    fn test_plan_id_empty_rejected() {
        let result = PlanId::new("");
        assert!(matches!(result.unwrap_err(), EntitlementError::InvalidId(_)));
    }

    #[test]
    fn test_plan_id_too_long_rejected() {
        let result = PlanId::new("a".repeat(65));
        assert!(result.is_err());
    }

    #[test]
    fn test_plan_id_rejects_path_traversal() {
        let result = PlanId::new("../etc/passwd");
        assert!(result.is_err());
    }

    #[test]
    fn test_course_id_rejects_special_chars() {
        assert!(CourseId::new("course@1").is_err());
        assert!(CourseId::new("course 1").is_err());
        assert!(CourseId::new("course-1").is_ok());
    }

    #[test]
    fn test_role_kind_mapping() {
        assert!(Role::Astrologer.allows_kind(ResourceKind::Post));
        assert!(!Role::Astrologer.allows_kind(ResourceKind::Track));
        assert!(Role::Artist.allows_kind(ResourceKind::Track));
        assert!(Role::Director.allows_kind(ResourceKind::Album));
    }

    #[test]
    fn test_kind_periods() {
        assert_eq!(ResourceKind::Track.period(), LimitPeriod::Daily);
        assert_eq!(ResourceKind::Post.period(), LimitPeriod::Monthly);
    }

    #[test]
    fn test_published_content_classification() {
        assert!(ResourceKind::Post.is_published_content());
        assert!(ResourceKind::Article.is_published_content());
        assert!(!ResourceKind::Track.is_published_content());
        assert!(!ResourceKind::Session.is_published_content());
    }

    #[test]
    fn test_usage_limit_allows() {
        assert!(UsageLimit::Limited(3).allows(2));
        assert!(!UsageLimit::Limited(3).allows(3));
        assert!(UsageLimit::Unbounded.allows(u64::MAX));
    }

    fn sample_plan() -> Plan {
        Plan {
            id: PlanId::new("astro-basic").unwrap(),
            role: Role::Astrologer,
            name: "Astrologer Basic".to_owned(),
            price: Decimal::new(49900, 2),
            yearly_price: None,
            currency: "INR".to_owned(),
            duration_days: 30,
            features: vec!["3 posts per month".to_owned()],
            usage_limits: BTreeMap::from([(ResourceKind::Post, 3)]),
        }
    }

    #[test]
    fn test_plan_limit_resolution() {
        let plan = sample_plan();
        assert_eq!(plan.limit_for(ResourceKind::Post), UsageLimit::Limited(3));
        assert_eq!(plan.limit_for(ResourceKind::Consultation), UsageLimit::Unbounded);
    }

    #[test]
    fn test_plan_yearly_defaults_to_twelve_months() {
        let plan = sample_plan();
        assert_eq!(plan.yearly_amount(), Decimal::new(49900, 2) * Decimal::from(12));
    }

    #[test]
    fn test_plan_yearly_override() {
        let mut plan = sample_plan();
        plan.yearly_price = Some(Decimal::new(499000, 2));
        assert_eq!(plan.yearly_amount(), Decimal::new(499000, 2));
    }

    #[test]
    fn test_plan_validation_rejects_zero_duration() {
        let mut plan = sample_plan();
        plan.duration_days = 0;
        assert!(matches!(plan.validate().unwrap_err(), EntitlementError::CatalogError(_)));
    }

    #[test]
    fn test_free_plan() {
        let mut plan = sample_plan();
        plan.price = Decimal::ZERO;
        assert!(plan.is_free());
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Astrologer).unwrap(), "\"astrologer\"");
        let parsed: Role = serde_json::from_str("\"doctor\"").unwrap();
        assert_eq!(parsed, Role::Doctor);
    }

    #[test]
    fn test_resource_kind_as_map_key() {
        let plan = sample_plan();
        let json = serde_json::to_string(&plan).unwrap();
        assert!(json.contains("\"post\":3"));
        let parsed: Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.limit_for(ResourceKind::Post), UsageLimit::Limited(3));
    }
}
