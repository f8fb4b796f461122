// src/models/mod.rs

/// Declares a string-backed status enum stored as a VARCHAR column.
///
/// Parsing is forgiving about case, surrounding whitespace and `_`/space
/// separators, so `"In Progress"` and `"in_progress"` both read as `in-progress`.
macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let normalized = crate::models::normalize_token(raw);
                match normalized.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!(
                        "expected one of {}",
                        $name::ALL.iter().map($name::as_str).collect::<Vec<_>>().join(", ")
                    )),
                }
            }
        }
    };
}

/// Lowercases and turns `_`/space runs into single dashes.
pub fn normalize_token(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

pub mod user;
pub mod session;
pub mod admin;
pub mod employee;
pub mod client;
pub mod project;
pub mod task;
pub mod attendance;
pub mod meeting;
pub mod feedback;
pub mod notification;

status_enum!(
    /// Shared by projects and tasks.
    Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("In Progress", "in-progress")]
    #[case("  in_progress ", "in-progress")]
    #[case("HALF--DAY", "half-day")]
    #[case("", "")]
    fn normalizes_tokens(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_token(raw), expected);
    }

    #[test]
    fn priority_parses_loosely_and_prints_canonically() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(Priority::Urgent.to_string(), "urgent");
        assert!("critical".parse::<Priority>().is_err());
        assert_eq!(Priority::ALL.len(), 4);
    }
}
