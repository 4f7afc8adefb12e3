use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, VariantNames};

/// Privilege levels, declared from lowest to highest.
///
/// The derived `Ord` follows declaration order, so comparisons between roles
/// are comparisons of privilege.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    VariantNames,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Staff,
    Coord,
    Concelho,
    Admin,
}

impl Role {
    pub const TOP: Role = Role::Admin;

    pub fn has_at_least(self, required: Role) -> bool {
        self >= required
    }

    pub fn is_any_of(self, allowed: &[Role]) -> bool {
        allowed.contains(&self)
    }

    /// Whether an actor holding `self` may move a target from `current` to
    /// `new_role`; `is_self` is set when the actor is changing their own
    /// account. Only the top role may change its own role, and nobody may
    /// grant a role above their own or touch an account ranked above them.
    pub fn may_assign(self, is_self: bool, current: Role, new_role: Role) -> bool {
        if is_self && self != Role::TOP {
            return false;
        }
        self.has_at_least(current) && self.has_at_least(new_role)
    }
}

/// Authorization rule attached to an endpoint or UI section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    AtLeast(Role),
    AnyOf(&'static [Role]),
}

impl Access {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            Access::AtLeast(required) => role.has_at_least(*required),
            Access::AnyOf(allowed) => role.is_any_of(allowed),
        }
    }
}

pub mod policy {
    use super::{Access, Role};

    pub const BROWSE_EVENTS: Access = Access::AtLeast(Role::User);
    pub const MANAGE_EVENTS: Access = Access::AtLeast(Role::Coord);
    pub const DELETE_EVENTS: Access = Access::AtLeast(Role::Admin);
    pub const MANAGE_REGISTRATIONS: Access = Access::AtLeast(Role::Staff);
    pub const MANAGE_USERS_ROLE: Role = Role::Concelho;
    pub const MANAGE_USERS: Access = Access::AtLeast(MANAGE_USERS_ROLE);
}

/// Regions of the portal UI whose visibility depends on the caller's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumIter, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Section {
    Events,
    MyRegistrations,
    EventManagement,
    RegistrationManagement,
    UserManagement,
    Reports,
}

impl Section {
    pub fn access(self) -> Access {
        match self {
            Section::Events | Section::MyRegistrations => policy::BROWSE_EVENTS,
            Section::EventManagement => policy::MANAGE_EVENTS,
            Section::RegistrationManagement => policy::MANAGE_REGISTRATIONS,
            Section::UserManagement => policy::MANAGE_USERS,
            // 集計画面は運営側の特定ロールのみに公開する
            Section::Reports => Access::AnyOf(&[Role::Admin, Role::Concelho]),
        }
    }

    pub fn visible_to(role: Role) -> Vec<Section> {
        use strum::IntoEnumIterator;
        Section::iter().filter(|s| s.access().permits(role)).collect()
    }
}
