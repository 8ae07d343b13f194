//! Role names understood by the Lightdash API

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! role_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(format!(
                        "unknown {} '{}', expected one of: {}",
                        stringify!($name),
                        other,
                        Self::ALL.join(", ")
                    )),
                }
            }
        }
    };
}

role_enum!(
    /// Role granted on a single project
    ProjectMemberRole {
        Viewer => "viewer",
        InteractiveViewer => "interactive_viewer",
        Editor => "editor",
        Developer => "developer",
        Admin => "admin",
    }
);

role_enum!(
    /// Organization-wide role; `member` carries no implicit project access
    OrganizationMemberRole {
        Member => "member",
        Viewer => "viewer",
        InteractiveViewer => "interactive_viewer",
        Editor => "editor",
        Developer => "developer",
        Admin => "admin",
    }
);

role_enum!(
    SpaceMemberRole {
        Viewer => "viewer",
        Editor => "editor",
        Admin => "admin",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_and_display_wire_names() {
        let role: ProjectMemberRole = "interactive_viewer".parse().unwrap();
        assert_eq!(role, ProjectMemberRole::InteractiveViewer);
        assert_eq!(role.to_string(), "interactive_viewer");

        let role: OrganizationMemberRole = "member".parse().unwrap();
        assert_eq!(role, OrganizationMemberRole::Member);
    }

    #[test]
    fn unknown_roles_list_alternatives() {
        let err = "owner".parse::<SpaceMemberRole>().unwrap_err();
        assert!(err.contains("viewer, editor, admin"));
        assert!("member".parse::<ProjectMemberRole>().is_err());
    }

    #[test]
    fn roles_serialize_as_wire_names() {
        assert_eq!(
            serde_json::to_string(&SpaceMemberRole::Editor).unwrap(),
            r#""editor""#
        );
        let role: ProjectMemberRole = serde_json::from_str(r#""developer""#).unwrap();
        assert_eq!(role, ProjectMemberRole::Developer);
    }
}
