use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

/// Mission stage. Each is entered once per game, in declaration order.
#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Cinematic,
    Intro,
    Repair1,
    Confirm1,
    Repair2,
    Confirm2,
    Repair3,
    Confirm3,
    Boss,
    Final,
}

impl Phase {
    /// Phase entered when this one completes. `None` after `Final`, which ends the mission.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Cinematic => Some(Phase::Intro),
            Phase::Intro => Some(Phase::Repair1),
            Phase::Repair1 => Some(Phase::Confirm1),
            Phase::Confirm1 => Some(Phase::Repair2),
            Phase::Repair2 => Some(Phase::Confirm2),
            Phase::Confirm2 => Some(Phase::Repair3),
            Phase::Repair3 => Some(Phase::Confirm3),
            Phase::Confirm3 => Some(Phase::Boss),
            Phase::Boss => Some(Phase::Final),
            Phase::Final => None,
        }
    }

    pub fn is_repair(self) -> bool {
        matches!(
            self,
            Phase::Repair1 | Phase::Repair2 | Phase::Repair3 | Phase::Final
        )
    }

    pub fn is_confirm(self) -> bool {
        matches!(self, Phase::Confirm1 | Phase::Confirm2 | Phase::Confirm3)
    }

    /// Simulation is frozen while the opening cinematic plays.
    pub fn simulates(self) -> bool {
        self != Phase::Cinematic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn next_follows_declaration_order() {
        let all: Vec<_> = Phase::iter().collect();
        for pair in all.windows(2) {
            assert_eq!(pair[0].next(), Some(pair[1]));
        }
        assert_eq!(Phase::Final.next(), None);
    }

    #[test]
    fn repair_and_confirm_alternate() {
        let objectives: Vec<_> = Phase::iter()
            .filter(|p| p.is_repair() || p.is_confirm())
            .collect();
        assert_eq!(objectives.len(), 7);
        for pair in objectives[..6].chunks(2) {
            assert!(pair[0].is_repair());
            assert!(pair[1].is_confirm());
        }
    }

    #[test]
    fn wire_tags() {
        assert_eq!(serde_json::to_string(&Phase::Confirm2).unwrap(), "\"confirm2\"");
        assert_eq!(serde_json::to_string(&Phase::Final).unwrap(), "\"final\"");
    }
}
