//! Two-sided relationship view of an association set
//!
//! The view is plain data: arena ids copied out of a resolved schema. It is
//! derived outside the model and memoized on the association set it
//! describes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::association::{EndMultiplicity, OperationAction};
use crate::container::AssociationSetEnd;
use crate::error::{EdmError, Result};
use crate::ids::{
    AssociationEndId, AssociationSetId, AssociationTypeId, EntitySetId, EntityTypeId,
    MemberPropertyId, NavigationPropertyId,
};
use crate::schema::EntityModelSchema;

/// Symmetric classification of the two end multiplicities
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MultiplicityPattern {
    ManyToMany,
    ManyToOne,
    ManyToZeroOne,
    OneToOne,
    OneToZeroOne,
    ZeroOneToZeroOne,
}

impl MultiplicityPattern {
    /// Classify an unordered pair of multiplicities
    #[must_use]
    pub const fn classify(end1: EndMultiplicity, end2: EndMultiplicity) -> Self {
        use EndMultiplicity::{Many, One, ZeroOne};

        match (end1, end2) {
            (Many, Many) => Self::ManyToMany,
            (Many, One) | (One, Many) => Self::ManyToOne,
            (Many, ZeroOne) | (ZeroOne, Many) => Self::ManyToZeroOne,
            (One, One) => Self::OneToOne,
            (One, ZeroOne) | (ZeroOne, One) => Self::OneToZeroOne,
            (ZeroOne, ZeroOne) => Self::ZeroOneToZeroOne,
        }
    }
}

impl fmt::Display for MultiplicityPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which of the two sides
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SideIndex {
    First,
    Second,
}

impl SideIndex {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

/// Everything one side of the relationship starts from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationshipSide {
    pub association_end: AssociationEndId,
    /// Position of the matching end in the association set
    pub association_set_end: usize,
    pub delete_behavior: OperationAction,
    pub entity_set: EntitySetId,
    pub entity_type: EntityTypeId,
    pub multiplicity: EndMultiplicity,
    pub navigation_property: Option<NavigationPropertyId>,
    pub role_name: String,
}

/// Principal/dependent assignment taken from a referential constraint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstraintSides {
    pub principal: SideIndex,
    pub dependent: SideIndex,
    pub principal_properties: Vec<MemberPropertyId>,
    pub dependent_properties: Vec<MemberPropertyId>,
    /// Every dependent property is a primary key property
    pub dependent_properties_are_keys: bool,
}

/// Derived view over one association set
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationshipType {
    association_set: AssociationSetId,
    association_type: AssociationTypeId,
    sides: [RelationshipSide; 2],
    multiplicity_pattern: MultiplicityPattern,
    constraint: Option<ConstraintSides>,
}

impl RelationshipType {
    /// Assemble a view; the multiplicity pattern is classified from the sides
    #[must_use]
    pub fn new(
        association_set: AssociationSetId,
        association_type: AssociationTypeId,
        sides: [RelationshipSide; 2],
        constraint: Option<ConstraintSides>,
    ) -> Self {
        let multiplicity_pattern =
            MultiplicityPattern::classify(sides[0].multiplicity, sides[1].multiplicity);
        Self {
            association_set,
            association_type,
            sides,
            multiplicity_pattern,
            constraint,
        }
    }

    #[must_use]
    pub const fn association_set(&self) -> AssociationSetId {
        self.association_set
    }

    #[must_use]
    pub const fn association_type(&self) -> AssociationTypeId {
        self.association_type
    }

    #[must_use]
    pub const fn multiplicity_pattern(&self) -> MultiplicityPattern {
        self.multiplicity_pattern
    }

    #[must_use]
    pub const fn side(&self, index: SideIndex) -> RelationshipSideView<'_> {
        RelationshipSideView {
            relationship: self,
            index,
        }
    }

    /// Both sides in association-set order
    #[must_use]
    pub const fn sides(&self) -> [RelationshipSideView<'_>; 2] {
        [self.side(SideIndex::First), self.side(SideIndex::Second)]
    }

    /// The side whose association end is `end`
    #[must_use]
    pub fn side_for_end(&self, end: AssociationEndId) -> Option<RelationshipSideView<'_>> {
        self.sides()
            .into_iter()
            .find(|side| side.from_association_end() == end)
    }

    /// Side of the constraint's principal end; `None` without a constraint
    #[must_use]
    pub fn principal_side(&self) -> Option<RelationshipSideView<'_>> {
        self.constraint.as_ref().map(|c| self.side(c.principal))
    }

    /// Side of the constraint's dependent end; `None` without a constraint
    #[must_use]
    pub fn dependent_side(&self) -> Option<RelationshipSideView<'_>> {
        self.constraint.as_ref().map(|c| self.side(c.dependent))
    }

    /// Constraint's principal properties, empty without a constraint
    #[must_use]
    pub fn principal_properties(&self) -> &[MemberPropertyId] {
        self.constraint
            .as_ref()
            .map_or(&[], |c| c.principal_properties.as_slice())
    }

    /// Constraint's dependent properties, empty without a constraint
    #[must_use]
    pub fn dependent_properties(&self) -> &[MemberPropertyId] {
        self.constraint
            .as_ref()
            .map_or(&[], |c| c.dependent_properties.as_slice())
    }

    /// A constraint exists and all of its dependent properties are keys
    #[must_use]
    pub fn is_identifying_relationship(&self) -> bool {
        self.constraint
            .as_ref()
            .is_some_and(|c| c.dependent_properties_are_keys)
    }

    #[must_use]
    pub const fn has_referential_constraint(&self) -> bool {
        self.constraint.is_some()
    }
}

/// One side of a [`RelationshipType`]; `to_*` accessors read the other side
#[derive(Clone, Copy, Debug)]
pub struct RelationshipSideView<'a> {
    relationship: &'a RelationshipType,
    index: SideIndex,
}

impl<'a> RelationshipSideView<'a> {
    fn data(&self) -> &'a RelationshipSide {
        &self.relationship.sides[self.index.slot()]
    }

    #[must_use]
    pub const fn index(&self) -> SideIndex {
        self.index
    }

    #[must_use]
    pub const fn relationship(&self) -> &'a RelationshipType {
        self.relationship
    }

    #[must_use]
    pub const fn other_side(&self) -> Self {
        Self {
            relationship: self.relationship,
            index: self.index.other(),
        }
    }

    #[must_use]
    pub fn from_association_end(&self) -> AssociationEndId {
        self.data().association_end
    }

    /// Position of this side's end in the association set
    #[must_use]
    pub fn from_association_set_end_index(&self) -> usize {
        self.data().association_set_end
    }

    /// The association set end this side starts from
    ///
    /// # Errors
    ///
    /// `UnknownItem` when `schema` does not own the association set and
    /// `InvariantViolation` when the set no longer has an end at the
    /// recorded position.
    pub fn from_association_set_end<'s>(
        &self,
        schema: &'s EntityModelSchema,
    ) -> Result<&'s AssociationSetEnd> {
        let set = self.relationship.association_set();
        let index = self.from_association_set_end_index();
        schema.get(set)?.ends.get(index).ok_or_else(|| {
            EdmError::invariant(format!("association set {set} has no end at position {index}"))
        })
    }

    #[must_use]
    pub fn from_delete_behavior(&self) -> OperationAction {
        self.data().delete_behavior
    }

    #[must_use]
    pub fn from_entity_set(&self) -> EntitySetId {
        self.data().entity_set
    }

    #[must_use]
    pub fn from_entity_type(&self) -> EntityTypeId {
        self.data().entity_type
    }

    #[must_use]
    pub fn from_multiplicity(&self) -> EndMultiplicity {
        self.data().multiplicity
    }

    #[must_use]
    pub fn from_navigation_property(&self) -> Option<NavigationPropertyId> {
        self.data().navigation_property
    }

    #[must_use]
    pub fn from_role_name(&self) -> &'a str {
        &self.data().role_name
    }

    #[must_use]
    pub fn to_association_end(&self) -> AssociationEndId {
        self.other_side().from_association_end()
    }

    /// The association set end of the other side
    ///
    /// # Errors
    ///
    /// See [`RelationshipSideView::from_association_set_end`].
    pub fn to_association_set_end<'s>(
        &self,
        schema: &'s EntityModelSchema,
    ) -> Result<&'s AssociationSetEnd> {
        self.other_side().from_association_set_end(schema)
    }

    #[must_use]
    pub fn to_entity_set(&self) -> EntitySetId {
        self.other_side().from_entity_set()
    }

    #[must_use]
    pub fn to_entity_type(&self) -> EntityTypeId {
        self.other_side().from_entity_type()
    }

    #[must_use]
    pub fn to_multiplicity(&self) -> EndMultiplicity {
        self.other_side().from_multiplicity()
    }

    #[must_use]
    pub fn to_navigation_property(&self) -> Option<NavigationPropertyId> {
        self.other_side().from_navigation_property()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EndMultiplicity::{Many, One, ZeroOne};
    use proptest::prelude::*;

    #[test]
    fn classification_table() {
        let table = [
            (Many, Many, MultiplicityPattern::ManyToMany),
            (Many, One, MultiplicityPattern::ManyToOne),
            (Many, ZeroOne, MultiplicityPattern::ManyToZeroOne),
            (One, Many, MultiplicityPattern::ManyToOne),
            (One, One, MultiplicityPattern::OneToOne),
            (One, ZeroOne, MultiplicityPattern::OneToZeroOne),
            (ZeroOne, Many, MultiplicityPattern::ManyToZeroOne),
            (ZeroOne, One, MultiplicityPattern::OneToZeroOne),
            (ZeroOne, ZeroOne, MultiplicityPattern::ZeroOneToZeroOne),
        ];
        for (end1, end2, expected) in table {
            assert_eq!(
                MultiplicityPattern::classify(end1, end2),
                expected,
                "({end1}, {end2})"
            );
        }
    }

    fn multiplicity() -> impl Strategy<Value = EndMultiplicity> {
        prop_oneof![Just(One), Just(ZeroOne), Just(Many)]
    }

    proptest! {
        #[test]
        fn classification_is_symmetric(a in multiplicity(), b in multiplicity()) {
            prop_assert_eq!(
                MultiplicityPattern::classify(a, b),
                MultiplicityPattern::classify(b, a)
            );
        }
    }

    #[test]
    fn side_other_is_involutive() {
        assert_eq!(SideIndex::First.other(), SideIndex::Second);
        assert_eq!(SideIndex::Second.other().other(), SideIndex::Second);
    }
}
