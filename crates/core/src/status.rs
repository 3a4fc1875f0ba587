//! Text-backed status enums.
//!
//! Status columns are stored as `TEXT` with a `CHECK` constraint listing the
//! exact wire values. [`define_text_status!`] generates the enum plus the
//! string conversions used by serde, sqlx (`try_from = "String"`) and
//! query-string filters.

/// Define a status enum whose variants map one-to-one onto wire strings.
#[macro_export]
macro_rules! define_text_status {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// The value stored in the database and sent over the wire.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::error::CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    other => Err($crate::error::CoreError::Validation(format!(
                        "Invalid {} '{}'. Must be one of: {}",
                        stringify!($name),
                        other,
                        [$( $text ),+].join(", ")
                    ))),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::error::CoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                raw.parse().map_err(::serde::de::Error::custom)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::leave::LeaveStatus;
    use crate::project::ProjectStatus;

    #[test]
    fn parses_and_prints_wire_values() {
        assert_eq!("In Progress".parse::<ProjectStatus>().unwrap(), ProjectStatus::InProgress);
        assert_eq!(ProjectStatus::ToDo.to_string(), "To Do");
        assert_eq!(LeaveStatus::Pending.as_str(), "pending");
    }

    #[test]
    fn unknown_value_lists_accepted_values() {
        let err = "archived".parse::<LeaveStatus>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("pending, approved, rejected"), "got: {msg}");
    }

    #[test]
    fn serde_uses_wire_strings() {
        let json = serde_json::to_string(&ProjectStatus::Done).unwrap();
        assert_eq!(json, "\"Done\"");
        let back: ProjectStatus = serde_json::from_str("\"Review\"").unwrap();
        assert_eq!(back, ProjectStatus::Review);
        assert!(serde_json::from_str::<ProjectStatus>("\"done\"").is_err());
    }
}
