//! Order of the editing steps, and which of them the current path can already reach.

use shared::domain::{EntityKind, ParentPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardStep {
    Identification,
    BasicInformation,
    Descriptions,
    Dates,
    Contacts,
    ParticipatingOrganisations,
    RecipientCountries,
    RecipientRegions,
    Locations,
    Sectors,
    PolicyMarkers,
    HumanitarianScopes,
    CountryBudgetItems,
    Budgets,
    PlannedDisbursements,
    Transactions,
    DocumentLinks,
    Relations,
    PerformanceConditions,
    Results,
    Indicators,
    IndicatorReferences,
    Periods,
    PeriodTargetLocations,
    PeriodTargetDimensions,
    PeriodActualLocations,
    PeriodActualDimensions,
    LegacyData,
}

impl WizardStep {
    pub const ORDER: [WizardStep; 28] = [
        WizardStep::Identification,
        WizardStep::BasicInformation,
        WizardStep::Descriptions,
        WizardStep::Dates,
        WizardStep::Contacts,
        WizardStep::ParticipatingOrganisations,
        WizardStep::RecipientCountries,
        WizardStep::RecipientRegions,
        WizardStep::Locations,
        WizardStep::Sectors,
        WizardStep::PolicyMarkers,
        WizardStep::HumanitarianScopes,
        WizardStep::CountryBudgetItems,
        WizardStep::Budgets,
        WizardStep::PlannedDisbursements,
        WizardStep::Transactions,
        WizardStep::DocumentLinks,
        WizardStep::Relations,
        WizardStep::PerformanceConditions,
        WizardStep::Results,
        WizardStep::Indicators,
        WizardStep::IndicatorReferences,
        WizardStep::Periods,
        WizardStep::PeriodTargetLocations,
        WizardStep::PeriodTargetDimensions,
        WizardStep::PeriodActualLocations,
        WizardStep::PeriodActualDimensions,
        WizardStep::LegacyData,
    ];

    /// Entity kind the step edits. Identification creates the activity itself.
    pub fn kind(self) -> EntityKind {
        match self {
            WizardStep::Identification | WizardStep::BasicInformation => EntityKind::Activity,
            WizardStep::Descriptions => EntityKind::Description,
            WizardStep::Dates => EntityKind::Date,
            WizardStep::Contacts => EntityKind::Contact,
            WizardStep::ParticipatingOrganisations => EntityKind::ParticipatingOrganisation,
            WizardStep::RecipientCountries => EntityKind::RecipientCountry,
            WizardStep::RecipientRegions => EntityKind::RecipientRegion,
            WizardStep::Locations => EntityKind::Location,
            WizardStep::Sectors => EntityKind::Sector,
            WizardStep::PolicyMarkers => EntityKind::PolicyMarker,
            WizardStep::HumanitarianScopes => EntityKind::HumanitarianScope,
            WizardStep::CountryBudgetItems => EntityKind::CountryBudgetItem,
            WizardStep::Budgets => EntityKind::Budget,
            WizardStep::PlannedDisbursements => EntityKind::PlannedDisbursement,
            WizardStep::Transactions => EntityKind::Transaction,
            WizardStep::DocumentLinks => EntityKind::DocumentLink,
            WizardStep::Relations => EntityKind::Relation,
            WizardStep::PerformanceConditions => EntityKind::PerformanceCondition,
            WizardStep::Results => EntityKind::Result,
            WizardStep::Indicators => EntityKind::ResultIndicator,
            WizardStep::IndicatorReferences => EntityKind::IndicatorReference,
            WizardStep::Periods => EntityKind::IndicatorPeriod,
            WizardStep::PeriodTargetLocations => EntityKind::IndicatorTargetLocation,
            WizardStep::PeriodTargetDimensions => EntityKind::IndicatorTargetDimension,
            WizardStep::PeriodActualLocations => EntityKind::IndicatorActualLocation,
            WizardStep::PeriodActualDimensions => EntityKind::IndicatorActualDimension,
            WizardStep::LegacyData => EntityKind::LegacyData,
        }
    }

    pub fn first() -> WizardStep {
        WizardStep::ORDER[0]
    }

    pub fn next(self) -> Option<WizardStep> {
        let index = Self::ORDER.iter().position(|step| *step == self)?;
        Self::ORDER.get(index + 1).copied()
    }

    pub fn previous(self) -> Option<WizardStep> {
        let index = Self::ORDER.iter().position(|step| *step == self)?;
        index.checked_sub(1).map(|index| Self::ORDER[index])
    }

    /// A step is usable once every ancestor id its records are routed by is known. Basic
    /// information edits an existing activity, so it needs the activity id too.
    pub fn is_enabled(self, path: &ParentPath) -> bool {
        match self {
            WizardStep::Identification => true,
            WizardStep::BasicInformation => path.activity.is_some(),
            step => path.depth() >= step.kind().mutation_depth(),
        }
    }

    /// The step after `self` that `path` can reach, skipping nested steps whose parents are
    /// still unsaved.
    pub fn next_enabled(self, path: &ParentPath) -> Option<WizardStep> {
        let mut step = self.next()?;
        while !step.is_enabled(path) {
            step = step.next()?;
        }
        Some(step)
    }
}

#[cfg(test)]
mod tests {
    use shared::domain::{ActivityId, IndicatorId, PeriodId, PublisherId, ResultId};

    use super::*;

    #[test]
    fn order_walks_forward_and_back() {
        assert_eq!(WizardStep::first().next(), Some(WizardStep::BasicInformation));
        assert_eq!(WizardStep::Results.next(), Some(WizardStep::Indicators));
        assert_eq!(WizardStep::Indicators.previous(), Some(WizardStep::Results));
        assert_eq!(WizardStep::LegacyData.next(), None);
        assert_eq!(WizardStep::Identification.previous(), None);
    }

    #[test]
    fn nested_steps_wait_for_their_parents() {
        let unsaved = ParentPath::new(PublisherId(1));
        assert!(WizardStep::Identification.is_enabled(&unsaved));
        assert!(!WizardStep::Sectors.is_enabled(&unsaved));

        let activity = unsaved.activity(ActivityId(5));
        assert!(WizardStep::Sectors.is_enabled(&activity));
        assert!(WizardStep::Results.is_enabled(&activity));
        assert!(!WizardStep::Indicators.is_enabled(&activity));

        let indicator = activity.result(ResultId(9)).indicator(IndicatorId(11));
        assert!(WizardStep::Periods.is_enabled(&indicator));
        assert!(!WizardStep::PeriodTargetLocations.is_enabled(&indicator));
        assert!(WizardStep::PeriodTargetLocations.is_enabled(&indicator.period(PeriodId(21))));
    }

    #[test]
    fn next_enabled_skips_unreachable_result_steps() {
        let activity = ParentPath::new(PublisherId(1)).activity(ActivityId(5));
        assert_eq!(
            WizardStep::Results.next_enabled(&activity),
            Some(WizardStep::LegacyData)
        );
    }

    #[test]
    fn every_step_is_listed_once() {
        for step in WizardStep::ORDER {
            assert_eq!(
                WizardStep::ORDER.iter().filter(|other| **other == step).count(),
                1
            );
        }
    }
}
