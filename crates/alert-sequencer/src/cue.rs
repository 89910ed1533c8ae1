//! Named cues and chain construction

use hazard_store::{HazardCategory, RoadClass};

/// Identifier of one audio cue asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueId {
    CategoryGeneral,
    CategoryExpressway,
    Distance2000,
    Distance1000,
    Distance500,
    Distance2000Transient,
    Distance1000Transient,
    AlarmLoop,
    Passed,
}

impl CueId {
    /// Asset name handed to the platform playback capability.
    pub fn asset_name(self) -> &'static str {
        match self {
            Self::CategoryGeneral => "category-general",
            Self::CategoryExpressway => "category-expressway",
            Self::Distance2000 => "distance-2000",
            Self::Distance1000 => "distance-1000",
            Self::Distance500 => "distance-500",
            Self::Distance2000Transient => "distance-2000-transient",
            Self::Distance1000Transient => "distance-1000-transient",
            Self::AlarmLoop => "alarm-loop",
            Self::Passed => "passed",
        }
    }

    fn for_road_class(road_class: RoadClass) -> Self {
        match road_class {
            RoadClass::General => Self::CategoryGeneral,
            RoadClass::Expressway => Self::CategoryExpressway,
        }
    }

    fn for_distance(threshold_m: u32, category: HazardCategory) -> Option<Self> {
        match (threshold_m, category) {
            (2000, HazardCategory::FixedDirectional) => Some(Self::Distance2000),
            (1000, HazardCategory::FixedDirectional) => Some(Self::Distance1000),
            (500, HazardCategory::FixedDirectional) => Some(Self::Distance500),
            (2000, HazardCategory::Transient) => Some(Self::Distance2000Transient),
            (1000, HazardCategory::Transient) => Some(Self::Distance1000Transient),
            // Transient hazards have no 500 m cue; the state machine never
            // fires that threshold for them
            _ => None,
        }
    }
}

/// Build the ordered cue chain for one threshold notification: category cue
/// first, then the distance cue.
pub fn notification_chain(
    threshold_m: u32,
    category: HazardCategory,
    road_class: RoadClass,
) -> Vec<CueId> {
    let mut chain = vec![CueId::for_road_class(road_class)];
    chain.extend(CueId::for_distance(threshold_m, category));
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_orders_category_before_distance() {
        let chain = notification_chain(2000, HazardCategory::FixedDirectional, RoadClass::General);
        assert_eq!(chain, vec![CueId::CategoryGeneral, CueId::Distance2000]);

        let chain =
            notification_chain(1000, HazardCategory::Transient, RoadClass::Expressway);
        assert_eq!(
            chain,
            vec![CueId::CategoryExpressway, CueId::Distance1000Transient]
        );
    }

    #[test]
    fn test_unknown_threshold_yields_category_only() {
        let chain = notification_chain(500, HazardCategory::Transient, RoadClass::General);
        assert_eq!(chain, vec![CueId::CategoryGeneral]);
    }

    #[test]
    fn test_asset_names() {
        assert_eq!(CueId::AlarmLoop.asset_name(), "alarm-loop");
        assert_eq!(CueId::Distance500.asset_name(), "distance-500");
    }
}
