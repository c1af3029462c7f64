//! Category partitioning and the [`ChangeSet`] value type.
//!
//! The status model is split into independently diffable categories. A
//! mutation names the categories it touched via a [`ChangeSet`]; the set is
//! always supplied by the caller, never inferred from the model.

use core::ops::BitOr;

/// One independently diffable partition of the status model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Scene/mode identity and version strings.
    Session,
    /// Metadata of the currently loaded map, absent when nothing is loaded.
    Content,
    /// Live score, combo, and counters; absent until the session clock starts.
    Performance,
    /// Last discrete cut detail, fully overwritten on every cut event.
    EventDetail,
    /// Behavior-modifying settings plus their derived maxima.
    Modifiers,
    /// Presentation and accessibility preferences.
    PlayerSettings,
    /// Opaque simulation-authored timeline event payload.
    GenericEvent,
}

impl Category {
    /// Every category, in wire order.
    pub const ALL: [Self; 7] = [
        Self::Session,
        Self::Content,
        Self::Performance,
        Self::EventDetail,
        Self::Modifiers,
        Self::PlayerSettings,
        Self::GenericEvent,
    ];

    /// The JSON key this category is published under.
    ///
    /// The first five live inside the `status` object; `EventDetail` and
    /// `GenericEvent` are top-level keys on the push envelope.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Content => "content",
            Self::Performance => "performance",
            Self::EventDetail => "eventDetail",
            Self::Modifiers => "modifiers",
            Self::PlayerSettings => "playerSettings",
            Self::GenericEvent => "genericEvent",
        }
    }

    /// Whether this category is published inside the `status` object.
    ///
    /// `EventDetail` and `GenericEvent` travel as their own top-level keys
    /// on the push envelope instead.
    pub const fn in_status(self) -> bool {
        !matches!(self, Self::EventDetail | Self::GenericEvent)
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Session => 1,
            Self::Content => 1 << 1,
            Self::Performance => 1 << 2,
            Self::EventDetail => 1 << 3,
            Self::Modifiers => 1 << 4,
            Self::PlayerSettings => 1 << 5,
            Self::GenericEvent => 1 << 6,
        }
    }
}

/// The set of categories touched by one mutation.
///
/// A small copy-on-use bitset. One instance accompanies every publish call
/// and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeSet {
    bits: u8,
}

impl ChangeSet {
    /// The empty set.
    pub const EMPTY: Self = Self { bits: 0 };

    /// Only [`Category::Session`].
    pub const SESSION: Self = Self::of(Category::Session);
    /// Only [`Category::Content`].
    pub const CONTENT: Self = Self::of(Category::Content);
    /// Only [`Category::Performance`].
    pub const PERFORMANCE: Self = Self::of(Category::Performance);
    /// Only [`Category::EventDetail`].
    pub const EVENT_DETAIL: Self = Self::of(Category::EventDetail);
    /// Only [`Category::Modifiers`].
    pub const MODIFIERS: Self = Self::of(Category::Modifiers);
    /// Only [`Category::PlayerSettings`].
    pub const PLAYER_SETTINGS: Self = Self::of(Category::PlayerSettings);
    /// Only [`Category::GenericEvent`].
    pub const GENERIC_EVENT: Self = Self::of(Category::GenericEvent);

    /// Everything except the high-frequency event categories.
    ///
    /// Used at scene transitions, where all durable state is refreshed at
    /// once but no cut or timeline event accompanies the change.
    pub const SESSION_REFRESH: Self = Self::SESSION
        .union(Self::CONTENT)
        .union(Self::PERFORMANCE)
        .union(Self::MODIFIERS)
        .union(Self::PLAYER_SETTINGS);

    /// A set containing exactly one category.
    pub const fn of(category: Category) -> Self {
        Self {
            bits: category.bit(),
        }
    }

    /// The union of two sets.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Whether the set contains the given category.
    pub const fn contains(self, category: Category) -> bool {
        self.bits & category.bit() != 0
    }

    /// Whether the set contains every category in `other`.
    pub const fn contains_all(self, other: Self) -> bool {
        self.bits & other.bits == other.bits
    }

    /// Whether no category is set.
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Iterate the categories present in the set, in wire order.
    pub fn iter(self) -> impl Iterator<Item = Category> {
        Category::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl BitOr for ChangeSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_contains_nothing() {
        for category in Category::ALL {
            assert!(!ChangeSet::EMPTY.contains(category));
        }
        assert!(ChangeSet::EMPTY.is_empty());
    }

    #[test]
    fn union_accumulates() {
        let set = ChangeSet::PERFORMANCE | ChangeSet::EVENT_DETAIL;
        assert!(set.contains(Category::Performance));
        assert!(set.contains(Category::EventDetail));
        assert!(!set.contains(Category::Session));
    }

    #[test]
    fn contains_all_requires_every_bit() {
        let full = ChangeSet::SESSION
            | ChangeSet::CONTENT
            | ChangeSet::PERFORMANCE
            | ChangeSet::MODIFIERS;
        assert!(full.contains_all(ChangeSet::SESSION | ChangeSet::MODIFIERS));
        assert!(!ChangeSet::SESSION.contains_all(full));
    }

    #[test]
    fn session_refresh_excludes_event_categories() {
        assert!(ChangeSet::SESSION_REFRESH.contains(Category::Session));
        assert!(ChangeSet::SESSION_REFRESH.contains(Category::PlayerSettings));
        assert!(!ChangeSet::SESSION_REFRESH.contains(Category::EventDetail));
        assert!(!ChangeSet::SESSION_REFRESH.contains(Category::GenericEvent));
    }

    #[test]
    fn iter_yields_wire_order() {
        let set = ChangeSet::GENERIC_EVENT | ChangeSet::SESSION | ChangeSet::MODIFIERS;
        let categories: Vec<Category> = set.iter().collect();
        assert_eq!(
            categories,
            vec![Category::Session, Category::Modifiers, Category::GenericEvent]
        );
    }
}
