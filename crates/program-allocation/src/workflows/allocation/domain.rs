use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a capacity-limited program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferingId(pub u64);

impl fmt::Display for OfferingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable applicant key, e.g. a student number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub String);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentId(pub u64);

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generation counter for the assignment set produced by one allocation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochId(pub u64);

impl EpochId {
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A program applicants compete for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    pub id: OfferingId,
    pub name: String,
    pub category: String,
    pub capacity: u32,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Catalog input for a new offering; the repository assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOffering {
    pub name: String,
    pub category: String,
    pub capacity: u32,
    #[serde(default)]
    pub description: String,
}

/// Position of an offering within an applicant's stated preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChoiceRank {
    First,
    Second,
    Third,
}

impl ChoiceRank {
    /// Allocation passes run in this order.
    pub const ALL: [ChoiceRank; 3] = [ChoiceRank::First, ChoiceRank::Second, ChoiceRank::Third];

    pub const fn number(self) -> u8 {
        match self {
            ChoiceRank::First => 1,
            ChoiceRank::Second => 2,
            ChoiceRank::Third => 3,
        }
    }

    const fn index(self) -> usize {
        self.number() as usize - 1
    }
}

/// Rank recorded on an assignment. Manual placements outside the stated choices are `Unranked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Rank {
    Preferred(ChoiceRank),
    Unranked,
}

impl Rank {
    /// Wire and export rendering: 1, 2, 3, or 0 for unranked.
    pub const fn as_number(self) -> u8 {
        match self {
            Rank::Preferred(choice) => choice.number(),
            Rank::Unranked => 0,
        }
    }
}

impl From<Rank> for u8 {
    fn from(value: Rank) -> Self {
        value.as_number()
    }
}

impl TryFrom<u8> for Rank {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Rank::Unranked),
            1 => Ok(Rank::Preferred(ChoiceRank::First)),
            2 => Ok(Rank::Preferred(ChoiceRank::Second)),
            3 => Ok(Rank::Preferred(ChoiceRank::Third)),
            other => Err(format!("rank must be between 0 and 3, got {other}")),
        }
    }
}

/// Ordered first, second, and third choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferenceTriple(pub [OfferingId; 3]);

impl PreferenceTriple {
    pub const fn new(first: OfferingId, second: OfferingId, third: OfferingId) -> Self {
        Self([first, second, third])
    }

    pub const fn at(&self, rank: ChoiceRank) -> OfferingId {
        self.0[rank.index()]
    }

    /// Rank of `offering` among the stated choices, or `Unranked` when absent.
    pub fn rank_of(&self, offering: OfferingId) -> Rank {
        ChoiceRank::ALL
            .into_iter()
            .find(|rank| self.at(*rank) == offering)
            .map(Rank::Preferred)
            .unwrap_or(Rank::Unranked)
    }

    /// First offering referenced more than once, if any.
    pub fn duplicate(&self) -> Option<OfferingId> {
        let [first, second, third] = self.0;
        if first == second || first == third {
            Some(first)
        } else if second == third {
            Some(second)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChoiceRank, OfferingId)> + '_ {
        ChoiceRank::ALL.into_iter().map(|rank| (rank, self.at(rank)))
    }
}

/// Raw submission as received from an applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantSubmission {
    pub applicant_id: ApplicantId,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub birthdate: Option<String>,
    pub choices: PreferenceTriple,
}

/// Stored preference record, one per applicant id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub applicant_id: ApplicantId,
    pub name: String,
    pub phone: Option<String>,
    pub birthdate: Option<String>,
    pub choices: PreferenceTriple,
    pub submission_count: u32,
    pub first_submitted_at: DateTime<Utc>,
    pub last_submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMethod {
    Automatic,
    Manual,
}

impl AssignmentMethod {
    pub const fn label(self) -> &'static str {
        match self {
            AssignmentMethod::Automatic => "automatic",
            AssignmentMethod::Manual => "manual",
        }
    }
}

/// Placement of one applicant in one offering within an epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub epoch: EpochId,
    pub applicant_id: ApplicantId,
    pub offering_id: OfferingId,
    pub rank: Rank,
    pub method: AssignmentMethod,
    pub assigned_at: DateTime<Utc>,
}

/// Assignment awaiting an id and epoch from the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    pub applicant_id: ApplicantId,
    pub offering_id: OfferingId,
    pub rank: Rank,
    pub method: AssignmentMethod,
    pub assigned_at: DateTime<Utc>,
}
