use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a stored or submitted string is not a known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{value:?} is not a valid {kind}")]
pub struct ParseKindError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed, string-backed enum.
/// The same spelling is used on the wire, in the database, and in logs.
macro_rules! kind {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseKindError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    other => Err(ParseKindError {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

kind! {
    /// What a user is allowed to do
    Role {
        Student => "student",
        Warden => "warden",
        Admin => "admin",
    }
}

kind! {
    /// The gender of a student or a room
    Gender {
        Male => "male",
        Female => "female",
    }
}

kind! {
    /// The gender restriction of a hostel block
    HostelGender {
        Male => "male",
        Female => "female",
        Coed => "coed",
    }
}

kind! {
    RoomType {
        Single => "single",
        Double => "double",
        Triple => "triple",
        Quad => "quad",
    }
}

kind! {
    AcPreference {
        Ac => "ac",
        NonAc => "non-ac",
    }
}

kind! {
    MaintenanceStatus {
        Good => "good",
        NeedsRepair => "needs_repair",
        UnderMaintenance => "under_maintenance",
    }
}

kind! {
    /// What a mess serves
    MenuType {
        Veg => "veg",
        NonVeg => "non-veg",
        Both => "both",
    }
}

kind! {
    /// What a student wants to eat
    FoodPreference {
        Veg => "veg",
        NonVeg => "non-veg",
    }
}

kind! {
    /// The outcome a warden or admin picks for a pending request
    Decision {
        Approved => "approved",
        Rejected => "rejected",
    }
}

kind! {
    /// Lifecycle of hostel requests and mess applications.
    /// `Approved` and `Rejected` are terminal.
    RequestStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

impl HostelGender {
    /// Returns true if a room of the given gender may exist in this block
    pub fn admits(&self, gender: Gender) -> bool {
        match self {
            Self::Coed => true,
            Self::Male => gender == Gender::Male,
            Self::Female => gender == Gender::Female,
        }
    }
}

impl RoomType {
    /// The number of beds a room of this type has unless edited
    pub fn capacity(&self) -> i32 {
        match self {
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
            Self::Quad => 4,
        }
    }
}

impl AcPreference {
    pub fn has_ac(&self) -> bool {
        matches!(self, Self::Ac)
    }
}

impl FoodPreference {
    /// `veg` eats at `veg` or `both`, `non-veg` eats at `non-veg` or `both`
    pub fn compatible_with(&self, menu: MenuType) -> bool {
        match (self, menu) {
            (_, MenuType::Both) => true,
            (Self::Veg, MenuType::Veg) => true,
            (Self::NonVeg, MenuType::NonVeg) => true,
            _ => false,
        }
    }
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl From<Decision> for RequestStatus {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Approved => Self::Approved,
            Decision::Rejected => Self::Rejected,
        }
    }
}
