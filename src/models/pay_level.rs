use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compensation tier of an employment contract.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
#[serde(try_from = "u8", into = "u8")]
pub enum PayLevel {
    #[sea_orm(num_value = 0)]
    Apprentice,
    #[sea_orm(num_value = 1)]
    Operator,
    #[sea_orm(num_value = 2)]
    SkilledOperator,
    #[sea_orm(num_value = 3)]
    Specialist,
    #[sea_orm(num_value = 4)]
    Supervisor,
}

impl PayLevel {
    pub const ALL: [PayLevel; 5] = [
        PayLevel::Apprentice,
        PayLevel::Operator,
        PayLevel::SkilledOperator,
        PayLevel::Specialist,
        PayLevel::Supervisor,
    ];

    pub fn code(self) -> u8 {
        match self {
            PayLevel::Apprentice => 0,
            PayLevel::Operator => 1,
            PayLevel::SkilledOperator => 2,
            PayLevel::Specialist => 3,
            PayLevel::Supervisor => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PayLevel::Apprentice => "Apprentice",
            PayLevel::Operator => "Operator",
            PayLevel::SkilledOperator => "Skilled operator",
            PayLevel::Specialist => "Specialist",
            PayLevel::Supervisor => "Supervisor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pay level: {0}")]
pub struct InvalidPayLevel(pub u8);

impl TryFrom<u8> for PayLevel {
    type Error = InvalidPayLevel;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        PayLevel::ALL
            .into_iter()
            .find(|level| level.code() == code)
            .ok_or(InvalidPayLevel(code))
    }
}

impl From<PayLevel> for u8 {
    fn from(level: PayLevel) -> Self {
        level.code()
    }
}

impl fmt::Display for PayLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_fixed() {
        let labels: Vec<&str> = PayLevel::ALL.iter().map(|l| l.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Apprentice",
                "Operator",
                "Skilled operator",
                "Specialist",
                "Supervisor"
            ]
        );
    }

    #[test]
    fn out_of_range_level_is_rejected() {
        assert_eq!(PayLevel::try_from(5), Err(InvalidPayLevel(5)));
        assert!(serde_json::from_str::<PayLevel>("5").is_err());
        assert_eq!(serde_json::to_string(&PayLevel::Specialist).unwrap(), "3");
    }
}
