use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            /// Every accepted spelling, in declaration order.
            pub fn allowed_values() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Unit {
    Grams => "grams",
    Millilitres => "ml",
    Pieces => "pieces",
    Dozen => "Dozen",
});

str_enum!(BuiltinCategory {
    Dairy => "Dairy",
    Produce => "Produce",
    Meat => "Meat",
    Seafood => "Seafood",
    Bakery => "Bakery",
    Frozen => "Frozen",
    Pantry => "Pantry",
    Beverages => "Beverages",
    Snacks => "Snacks",
});

impl Unit {
    /// Case-insensitive lookup used when pre-filling drafts from noisy
    /// extraction output. Commit-time validation stays exact.
    pub fn from_loose(s: &str) -> Option<Unit> {
        let needle = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|u| u.as_str().eq_ignore_ascii_case(needle))
    }
}
