//! Enumeration types

use crate::annotations::{Annotations, impl_annotatable};
use crate::data_type::PrimitiveKind;
use crate::ids::SchemaId;
use crate::names::{NamedItem, QualifiedName, impl_name_identity};

/// Named enumeration with an integral underlying type
#[derive(Clone, Debug)]
pub struct EnumType {
    name: QualifiedName,
    pub members: Vec<EnumMember>,
    /// `None` when the schema leaves the flag unspecified
    pub is_flags: Option<bool>,
    pub underlying_type: Option<PrimitiveKind>,
    pub(crate) model: Option<SchemaId>,
    pub annotations: Annotations,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: QualifiedName::new(name),
            members: Vec::new(),
            is_flags: None,
            underlying_type: None,
            model: None,
            annotations: Annotations::new(),
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.name = self.name.in_namespace(namespace);
        self
    }

    #[must_use]
    pub fn with_member(mut self, member: EnumMember) -> Self {
        self.members.push(member);
        self
    }

    #[must_use]
    pub const fn with_flags(mut self, is_flags: bool) -> Self {
        self.is_flags = Some(is_flags);
        self
    }

    #[must_use]
    pub const fn with_underlying_type(mut self, kind: PrimitiveKind) -> Self {
        self.underlying_type = Some(kind);
        self
    }

    /// Schema this type is registered in
    #[must_use]
    pub const fn model(&self) -> Option<SchemaId> {
        self.model
    }

    /// Member values with positional defaults filled in.
    ///
    /// A member without an explicit value takes the previous member's value
    /// plus one; the first member defaults to zero.
    #[must_use]
    pub fn effective_values(&self) -> Vec<(&str, i64)> {
        let mut next = 0_i64;
        self.members
            .iter()
            .map(|member| {
                let value = member.value.unwrap_or(next);
                next = value.saturating_add(1);
                (member.name.as_str(), value)
            })
            .collect()
    }
}

impl NamedItem for EnumType {
    fn name(&self) -> &str {
        self.name.name()
    }

    fn namespace(&self) -> Option<&str> {
        self.name.namespace()
    }
}

/// One named member of an enum type
#[derive(Clone, Debug)]
pub struct EnumMember {
    pub name: String,
    pub value: Option<i64>,
    pub annotations: Annotations,
}

impl EnumMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            annotations: Annotations::new(),
        }
    }

    #[must_use]
    pub const fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }
}

impl NamedItem for EnumMember {
    fn name(&self) -> &str {
        &self.name
    }
}

impl_name_identity!(EnumType, EnumMember);
impl_annotatable!(EnumType, EnumMember);
