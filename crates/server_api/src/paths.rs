//! Per-resource path templates of the remote activity API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared::{
    domain::{ActivityId, EntityKind, ParentPath, PublisherId},
    error::{ApiError, ErrorCode},
};

const ACTIVITY: &str = "/api/activities/{activity}";
const RESULT: &str = "/api/activities/{activity}/results/{result}";
const INDICATOR: &str = "/api/activities/{activity}/results/{result}/indicators/{indicator}";
const PERIOD: &str =
    "/api/activities/{activity}/results/{result}/indicators/{indicator}/periods/{period}";

/// Collection paths keyed by entity kind. Placeholders: `{publisher}`, `{activity}`, `{result}`,
/// `{indicator}`, `{period}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTemplates {
    pub activities: String,
    pub codelists: String,
    pub collections: BTreeMap<EntityKind, String>,
    /// Read paths for kinds listed under a shallower parent than they are written under.
    pub reads: BTreeMap<EntityKind, String>,
}

impl Default for PathTemplates {
    fn default() -> Self {
        let collections = EntityKind::ALL
            .into_iter()
            .filter_map(|kind| default_collection(kind).map(|path| (kind, path)))
            .collect();
        let reads = [
            (EntityKind::IndicatorTargetLocation, "target_locations"),
            (EntityKind::IndicatorActualLocation, "actual_locations"),
            (EntityKind::IndicatorTargetDimension, "target_dimensions"),
            (EntityKind::IndicatorActualDimension, "actual_dimensions"),
        ]
        .into_iter()
        .map(|(kind, leaf)| (kind, format!("{INDICATOR}/{leaf}/")))
        .collect();
        Self {
            activities: "/api/activities/".to_string(),
            codelists: "/api/codelists/".to_string(),
            collections,
            reads,
        }
    }
}

fn default_collection(kind: EntityKind) -> Option<String> {
    let (parent, leaf) = match kind {
        EntityKind::Activity => return None,
        EntityKind::Description => (ACTIVITY, "descriptions"),
        EntityKind::Date => (ACTIVITY, "activity_dates"),
        EntityKind::Contact => (ACTIVITY, "contact_info"),
        EntityKind::Transaction => (ACTIVITY, "transactions"),
        EntityKind::Budget => (ACTIVITY, "budgets"),
        EntityKind::PlannedDisbursement => (ACTIVITY, "planned_disbursements"),
        EntityKind::RecipientCountry => (ACTIVITY, "recipient_countries"),
        EntityKind::RecipientRegion => (ACTIVITY, "recipient_regions"),
        EntityKind::Location => (ACTIVITY, "locations"),
        EntityKind::Sector => (ACTIVITY, "sectors"),
        EntityKind::PolicyMarker => (ACTIVITY, "policy_markers"),
        EntityKind::ParticipatingOrganisation => (ACTIVITY, "participating_organisations"),
        EntityKind::DocumentLink => (ACTIVITY, "document_links"),
        EntityKind::LegacyData => (ACTIVITY, "legacy_data"),
        EntityKind::CountryBudgetItem => (ACTIVITY, "country_budget_items"),
        EntityKind::HumanitarianScope => (ACTIVITY, "humanitarian_scopes"),
        EntityKind::Relation => (ACTIVITY, "related_activities"),
        EntityKind::PerformanceCondition => (ACTIVITY, "conditions"),
        EntityKind::Result => (ACTIVITY, "results"),
        EntityKind::ResultIndicator => (RESULT, "indicators"),
        EntityKind::IndicatorPeriod => (INDICATOR, "periods"),
        EntityKind::IndicatorReference => (INDICATOR, "references"),
        EntityKind::IndicatorTargetLocation => (PERIOD, "target/locations"),
        EntityKind::IndicatorActualLocation => (PERIOD, "actual/locations"),
        EntityKind::IndicatorTargetDimension => (PERIOD, "target/dimensions"),
        EntityKind::IndicatorActualDimension => (PERIOD, "actual/dimensions"),
    };
    Some(format!("{parent}/{leaf}/"))
}

impl PathTemplates {
    pub fn activity(&self, activity: i64) -> String {
        format!("{}{activity}/", self.activities)
    }

    pub fn code_list(&self, code_list: &str) -> String {
        format!("{}{code_list}/", self.codelists)
    }

    pub fn collection(&self, kind: EntityKind, path: &ParentPath) -> Result<String, ApiError> {
        let template = self.collections.get(&kind).ok_or_else(|| unknown(kind))?;
        render(template, path)
    }

    /// Collection of an activity-scoped kind when only the activity is known.
    pub fn activity_collection(&self, kind: EntityKind, activity: ActivityId) -> Result<String, ApiError> {
        // Activity-scoped templates never reference the publisher.
        let path = ParentPath::new(PublisherId(0)).activity(activity);
        self.collection(kind, &path)
    }

    pub fn item(&self, kind: EntityKind, path: &ParentPath, id: i64) -> Result<String, ApiError> {
        Ok(format!("{}{id}/", self.collection(kind, path)?))
    }

    pub fn read(&self, kind: EntityKind, path: &ParentPath) -> Result<String, ApiError> {
        match self.reads.get(&kind) {
            Some(template) => render(template, path),
            None => self.collection(kind, path),
        }
    }
}

/// Fills every placeholder from `path`; an unknown ancestor is a validation error.
pub fn render(template: &str, path: &ParentPath) -> Result<String, ApiError> {
    let slots = [
        ("{publisher}", Some(path.publisher.0)),
        ("{activity}", path.activity.map(|id| id.0)),
        ("{result}", path.result.map(|id| id.0)),
        ("{indicator}", path.indicator.map(|id| id.0)),
        ("{period}", path.period.map(|id| id.0)),
    ];
    let mut rendered = template.to_string();
    for (placeholder, id) in slots {
        if !rendered.contains(placeholder) {
            continue;
        }
        let id = id.ok_or_else(|| {
            ApiError::new(
                ErrorCode::Validation,
                format!("path {template} needs {placeholder}"),
            )
        })?;
        rendered = rendered.replace(placeholder, &id.to_string());
    }
    Ok(rendered)
}

fn unknown(kind: EntityKind) -> ApiError {
    ApiError::new(
        ErrorCode::Internal,
        format!("no path template configured for {kind}"),
    )
}
