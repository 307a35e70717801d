/// What happens when a child is inserted under a name already in use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum CollisionPolicy {
    /// The existing member is replaced, last write wins.
    #[default]
    Overwrite,
    /// The insert fails with a duplicate name error and nothing is written.
    Reject,
}

/// What happens when a deprecated field, child or class is accessed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DeprecationPolicy {
    Allow,
    #[default]
    Warn,
    Deny,
}

/// Behaviour shared by every accessor bound through one registry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AccessorSettings {
    pub collision_policy: CollisionPolicy,
    pub deprecation_policy: DeprecationPolicy,
}

impl AccessorSettings {
    pub fn new(collision_policy: CollisionPolicy, deprecation_policy: DeprecationPolicy) -> Self {
        Self {
            collision_policy,
            deprecation_policy,
        }
    }
}
