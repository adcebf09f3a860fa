use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(PublisherId);
id_newtype!(ActivityId);
id_newtype!(ResultId);
id_newtype!(IndicatorId);
id_newtype!(PeriodId);
id_newtype!(RecordId);

/// How many ancestor ids a remote call needs to be routed, publisher first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Depth {
    Publisher,
    Activity,
    Result,
    Indicator,
    Period,
}

impl Depth {
    /// Number of leading id arguments (publisher included).
    pub fn arity(self) -> usize {
        match self {
            Depth::Publisher => 1,
            Depth::Activity => 2,
            Depth::Result => 3,
            Depth::Indicator => 4,
            Depth::Period => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Activity,
    Description,
    Date,
    Contact,
    Transaction,
    Budget,
    PlannedDisbursement,
    RecipientCountry,
    RecipientRegion,
    Location,
    Sector,
    PolicyMarker,
    ParticipatingOrganisation,
    DocumentLink,
    LegacyData,
    CountryBudgetItem,
    HumanitarianScope,
    Relation,
    PerformanceCondition,
    Result,
    ResultIndicator,
    IndicatorPeriod,
    IndicatorReference,
    IndicatorTargetLocation,
    IndicatorActualLocation,
    IndicatorTargetDimension,
    IndicatorActualDimension,
}

impl EntityKind {
    pub const ALL: [EntityKind; 27] = [
        EntityKind::Activity,
        EntityKind::Description,
        EntityKind::Date,
        EntityKind::Contact,
        EntityKind::Transaction,
        EntityKind::Budget,
        EntityKind::PlannedDisbursement,
        EntityKind::RecipientCountry,
        EntityKind::RecipientRegion,
        EntityKind::Location,
        EntityKind::Sector,
        EntityKind::PolicyMarker,
        EntityKind::ParticipatingOrganisation,
        EntityKind::DocumentLink,
        EntityKind::LegacyData,
        EntityKind::CountryBudgetItem,
        EntityKind::HumanitarianScope,
        EntityKind::Relation,
        EntityKind::PerformanceCondition,
        EntityKind::Result,
        EntityKind::ResultIndicator,
        EntityKind::IndicatorPeriod,
        EntityKind::IndicatorReference,
        EntityKind::IndicatorTargetLocation,
        EntityKind::IndicatorActualLocation,
        EntityKind::IndicatorTargetDimension,
        EntityKind::IndicatorActualDimension,
    ];

    /// Top-level key of this kind in the normalized store.
    pub fn store_key(self) -> &'static str {
        match self {
            EntityKind::Activity => "activities",
            EntityKind::Description => "descriptions",
            EntityKind::Date => "dates",
            EntityKind::Contact => "contacts",
            EntityKind::Transaction => "transactions",
            EntityKind::Budget => "budgets",
            EntityKind::PlannedDisbursement => "plannedDisbursements",
            EntityKind::RecipientCountry => "recipientCountries",
            EntityKind::RecipientRegion => "recipientRegions",
            EntityKind::Location => "locations",
            EntityKind::Sector => "sectors",
            EntityKind::PolicyMarker => "policyMarkers",
            EntityKind::ParticipatingOrganisation => "participatingOrganisations",
            EntityKind::DocumentLink => "documentLinks",
            EntityKind::LegacyData => "legacyData",
            EntityKind::CountryBudgetItem => "countryBudgetItems",
            EntityKind::HumanitarianScope => "humanitarianScopes",
            EntityKind::Relation => "relations",
            EntityKind::PerformanceCondition => "performanceConditions",
            EntityKind::Result => "results",
            EntityKind::ResultIndicator => "resultIndicators",
            EntityKind::IndicatorPeriod => "indicatorPeriods",
            EntityKind::IndicatorReference => "indicatorReferences",
            EntityKind::IndicatorTargetLocation => "indicatorTargetLocations",
            EntityKind::IndicatorActualLocation => "indicatorActualLocations",
            EntityKind::IndicatorTargetDimension => "indicatorTargetDimensions",
            EntityKind::IndicatorActualDimension => "indicatorActualDimensions",
        }
    }

    pub fn from_store_key(key: &str) -> Option<EntityKind> {
        Self::ALL.into_iter().find(|kind| kind.store_key() == key)
    }

    /// Suffix of the remote `create*`/`update*`/`delete*` procedures.
    pub fn endpoint_stem(self) -> &'static str {
        match self {
            EntityKind::Activity => "",
            EntityKind::Description => "Description",
            EntityKind::Date => "Date",
            EntityKind::Contact => "Contact",
            EntityKind::Transaction => "Transaction",
            EntityKind::Budget => "Budget",
            EntityKind::PlannedDisbursement => "PlannedDisbursement",
            EntityKind::RecipientCountry => "RecipientCountry",
            EntityKind::RecipientRegion => "Region",
            EntityKind::Location => "Location",
            EntityKind::Sector => "Sector",
            EntityKind::PolicyMarker => "Policy",
            EntityKind::ParticipatingOrganisation => "ParticipatingOrganisation",
            EntityKind::DocumentLink => "DocumentLink",
            EntityKind::LegacyData => "LegacyData",
            EntityKind::CountryBudgetItem => "CountryBudgetItem",
            EntityKind::HumanitarianScope => "HumanitarianScope",
            EntityKind::Relation => "Relation",
            EntityKind::PerformanceCondition => "PerformanceConditions",
            EntityKind::Result => "PerformanceResult",
            EntityKind::ResultIndicator => "ResultIndicator",
            EntityKind::IndicatorPeriod => "IndicatorPeriod",
            EntityKind::IndicatorReference => "IndicatorReference",
            EntityKind::IndicatorTargetLocation => "IndicatorTargetLocation",
            EntityKind::IndicatorActualLocation => "IndicatorActualLocation",
            EntityKind::IndicatorTargetDimension => "IndicatorTargetDimension",
            EntityKind::IndicatorActualDimension => "IndicatorActualDimension",
        }
    }

    /// Suffix of the remote collection read; several differ from the mutation stem.
    pub fn get_stem(self) -> &'static str {
        match self {
            EntityKind::Activity => "",
            EntityKind::Description => "Descriptions",
            EntityKind::Date => "Dates",
            EntityKind::Contact => "Contacts",
            EntityKind::Transaction => "Transaction",
            EntityKind::Budget => "Budgets",
            EntityKind::PlannedDisbursement => "PlannedDisbursements",
            EntityKind::RecipientCountry => "RecipientCountries",
            EntityKind::RecipientRegion => "Regions",
            EntityKind::Location => "Locations",
            EntityKind::Sector => "Sectors",
            EntityKind::PolicyMarker => "Policy",
            EntityKind::ParticipatingOrganisation => "ParticipatingOrganisations",
            EntityKind::DocumentLink => "DocumentLinks",
            EntityKind::LegacyData => "LegacyData",
            EntityKind::CountryBudgetItem => "CountryBudgetItems",
            EntityKind::HumanitarianScope => "HumanitarianScope",
            EntityKind::Relation => "Relation",
            EntityKind::PerformanceCondition => "PerformanceConditions",
            EntityKind::Result => "PerformanceResult",
            EntityKind::ResultIndicator => "ResultIndicator",
            EntityKind::IndicatorPeriod => "IndicatorPeriod",
            EntityKind::IndicatorReference => "IndicatorReference",
            EntityKind::IndicatorTargetLocation => "IndicatorTargetLocation",
            EntityKind::IndicatorActualLocation => "IndicatorActualLocation",
            EntityKind::IndicatorTargetDimension => "IndicatorTargetDimension",
            EntityKind::IndicatorActualDimension => "IndicatorActualDimension",
        }
    }

    /// SCREAMING_SNAKE fragment used in action type names.
    pub fn action_name(self) -> &'static str {
        match self {
            EntityKind::Activity => "ACTIVITY",
            EntityKind::Description => "DESCRIPTION",
            EntityKind::Date => "DATE",
            EntityKind::Contact => "CONTACT",
            EntityKind::Transaction => "TRANSACTION",
            EntityKind::Budget => "BUDGET",
            EntityKind::PlannedDisbursement => "PLANNED_DISBURSEMENT",
            EntityKind::RecipientCountry => "RECIPIENT_COUNTRY",
            EntityKind::RecipientRegion => "REGION",
            EntityKind::Location => "LOCATION",
            EntityKind::Sector => "SECTOR",
            EntityKind::PolicyMarker => "POLICY",
            EntityKind::ParticipatingOrganisation => "PARTICIPATING_ORGANISATION",
            EntityKind::DocumentLink => "DOCUMENT_LINK",
            EntityKind::LegacyData => "LEGACY_DATA",
            EntityKind::CountryBudgetItem => "COUNTRY_BUDGET_ITEM",
            EntityKind::HumanitarianScope => "HUMANITARIAN_SCOPE",
            EntityKind::Relation => "RELATION",
            EntityKind::PerformanceCondition => "PERFORMANCE_CONDITION",
            EntityKind::Result => "PERFORMANCE_RESULT",
            EntityKind::ResultIndicator => "RESULT_INDICATOR",
            EntityKind::IndicatorPeriod => "INDICATOR_PERIOD",
            EntityKind::IndicatorReference => "INDICATOR_REFERENCE",
            EntityKind::IndicatorTargetLocation => "INDICATOR_TARGET_LOCATION",
            EntityKind::IndicatorActualLocation => "INDICATOR_ACTUAL_LOCATION",
            EntityKind::IndicatorTargetDimension => "INDICATOR_TARGET_DIMENSION",
            EntityKind::IndicatorActualDimension => "INDICATOR_ACTUAL_DIMENSION",
        }
    }

    /// Ancestors needed to create, update or delete a record of this kind.
    pub fn mutation_depth(self) -> Depth {
        match self {
            EntityKind::Activity => Depth::Publisher,
            EntityKind::ResultIndicator => Depth::Result,
            EntityKind::IndicatorPeriod | EntityKind::IndicatorReference => Depth::Indicator,
            EntityKind::IndicatorTargetLocation
            | EntityKind::IndicatorActualLocation
            | EntityKind::IndicatorTargetDimension
            | EntityKind::IndicatorActualDimension => Depth::Period,
            _ => Depth::Activity,
        }
    }

    /// Ancestors needed to read the collection of this kind.
    ///
    /// Period-scoped locations and dimensions are listed per indicator.
    pub fn read_depth(self) -> Depth {
        match self.mutation_depth() {
            Depth::Period => Depth::Indicator,
            depth => depth,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.store_key())
    }
}

/// Publisher plus the chain of parent ids that routes a nested remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentPath {
    pub publisher: PublisherId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator: Option<IndicatorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<PeriodId>,
}

impl ParentPath {
    pub fn new(publisher: PublisherId) -> Self {
        Self {
            publisher,
            activity: None,
            result: None,
            indicator: None,
            period: None,
        }
    }

    pub fn activity(mut self, activity: ActivityId) -> Self {
        self.activity = Some(activity);
        self
    }

    pub fn result(mut self, result: ResultId) -> Self {
        self.result = Some(result);
        self
    }

    pub fn indicator(mut self, indicator: IndicatorId) -> Self {
        self.indicator = Some(indicator);
        self
    }

    pub fn period(mut self, period: PeriodId) -> Self {
        self.period = Some(period);
        self
    }

    /// Deepest level reachable without a gap in the id chain.
    pub fn depth(&self) -> Depth {
        let Some(_) = self.activity else {
            return Depth::Publisher;
        };
        let Some(_) = self.result else {
            return Depth::Activity;
        };
        let Some(_) = self.indicator else {
            return Depth::Result;
        };
        match self.period {
            Some(_) => Depth::Period,
            None => Depth::Indicator,
        }
    }

    /// Leading id arguments for a call at `depth`, or `None` when an ancestor is unknown.
    ///
    /// Ids deeper than `depth` are ignored.
    pub fn ids_to(&self, depth: Depth) -> Option<Vec<i64>> {
        if self.depth() < depth {
            return None;
        }
        let chain = [
            Some(self.publisher.0),
            self.activity.map(|id| id.0),
            self.result.map(|id| id.0),
            self.indicator.map(|id| id.0),
            self.period.map(|id| id.0),
        ];
        chain.into_iter().take(depth.arity()).collect()
    }

    /// Rebuilds a path from leading integer arguments, publisher first.
    pub fn from_ids(ids: &[i64]) -> Option<Self> {
        let (&publisher, rest) = ids.split_first()?;
        if rest.len() > 4 {
            return None;
        }
        let mut path = ParentPath::new(PublisherId(publisher));
        path.activity = rest.first().copied().map(ActivityId);
        path.result = rest.get(1).copied().map(ResultId);
        path.indicator = rest.get(2).copied().map(IndicatorId);
        path.period = rest.get(3).copied().map(PeriodId);
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_keys_round_trip_for_every_kind() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_store_key(kind.store_key()), Some(kind));
        }
    }

    #[test]
    fn period_scoped_kinds_read_by_indicator() {
        assert_eq!(
            EntityKind::IndicatorTargetLocation.mutation_depth(),
            Depth::Period
        );
        assert_eq!(
            EntityKind::IndicatorTargetLocation.read_depth(),
            Depth::Indicator
        );
        assert_eq!(EntityKind::Sector.read_depth(), Depth::Activity);
    }

    #[test]
    fn path_depth_stops_at_first_gap() {
        let mut path = ParentPath::new(PublisherId(1)).activity(ActivityId(2));
        path.indicator = Some(IndicatorId(4));
        assert_eq!(path.depth(), Depth::Activity);
        assert_eq!(path.ids_to(Depth::Activity), Some(vec![1, 2]));
        assert_eq!(path.ids_to(Depth::Indicator), None);
    }

    #[test]
    fn ids_to_truncates_deeper_ancestors() {
        let path = ParentPath::new(PublisherId(1))
            .activity(ActivityId(2))
            .result(ResultId(3))
            .indicator(IndicatorId(4))
            .period(PeriodId(5));
        assert_eq!(path.ids_to(Depth::Indicator), Some(vec![1, 2, 3, 4]));
        assert_eq!(ParentPath::from_ids(&[1, 2, 3, 4, 5]), Some(path));
    }
}
