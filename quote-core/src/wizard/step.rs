use std::fmt;

use serde::{Deserialize, Serialize};

use crate::wizard::StepBlocked;

/// The five ordinal steps of the quote wizard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WizardStep {
    #[default]
    Service = 1,
    Details = 2,
    Files = 3,
    Tier = 4,
    Review = 5,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        Self::Service,
        Self::Details,
        Self::Files,
        Self::Tier,
        Self::Review,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Service),
            2 => Some(Self::Details),
            3 => Some(Self::Files),
            4 => Some(Self::Tier),
            5 => Some(Self::Review),
            _ => None,
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn prev(self) -> Option<Self> {
        Self::from_number(self.number().checked_sub(1)?)
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Service => "Service",
            Self::Details => "Details",
            Self::Files => "Files",
            Self::Tier => "Tier",
            Self::Review => "Review",
        }
    }

    /// Steps that must be valid before `self` can be entered, in order.
    pub fn prerequisites(self) -> impl Iterator<Item = WizardStep> {
        Self::ALL.into_iter().take_while(move |step| *step < self)
    }
}

impl fmt::Display for WizardStep {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.title())
    }
}

impl From<WizardStep> for u8 {
    fn from(step: WizardStep) -> Self {
        step.number()
    }
}

impl TryFrom<u8> for WizardStep {
    type Error = StepBlocked;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Self::from_number(number).ok_or(StepBlocked::UnknownStep(number))
    }
}
