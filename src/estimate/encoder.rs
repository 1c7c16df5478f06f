//! Stable integer codes for categorical route features.
//!
//! The regression model treats categories as plain numeric inputs, so the one
//! hard requirement is stability: the code minted for "Ryanair" during
//! training must mean "Ryanair" at prediction time. The encoder is therefore
//! an explicit object constructed once per fit and passed to both phases,
//! never process-global state.
//!
//! After fitting, the encoder is frozen: predictions run on a worker pool
//! over a shared model, and minting new codes there would mutate shared
//! state. Frozen lookups map unseen categories to the reserved
//! [`UNKNOWN_CODE`] instead.

use std::collections::HashMap;

/// Reserved code for categories first seen after the encoder was frozen.
///
/// Minted codes start at 1, so 0 never collides with a trained category.
pub const UNKNOWN_CODE: u32 = 0;

/// One scope per categorical feature; codes are independent across scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryScope {
    Origin,
    Destination,
    Airline,
    RouteClass,
    Aircraft,
}

impl CategoryScope {
    pub const ALL: [CategoryScope; 5] = [
        CategoryScope::Origin,
        CategoryScope::Destination,
        CategoryScope::Airline,
        CategoryScope::RouteClass,
        CategoryScope::Aircraft,
    ];

    fn index(self) -> usize {
        match self {
            CategoryScope::Origin => 0,
            CategoryScope::Destination => 1,
            CategoryScope::Airline => 2,
            CategoryScope::RouteClass => 3,
            CategoryScope::Aircraft => 4,
        }
    }
}

/// Append-only `string → id` maps, one per scope.
#[derive(Debug, Clone, Default)]
pub struct CategoryEncoder {
    maps: [HashMap<String, u32>; 5],
    frozen: bool,
}

impl CategoryEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the code for `key`, minting the next unused id on first sight.
    ///
    /// On a frozen encoder, unseen keys return [`UNKNOWN_CODE`] instead of
    /// minting.
    pub fn encode(&mut self, scope: CategoryScope, key: &str) -> u32 {
        let map = &mut self.maps[scope.index()];
        if let Some(&id) = map.get(key) {
            return id;
        }
        if self.frozen {
            return UNKNOWN_CODE;
        }
        let id = map.len() as u32 + 1;
        map.insert(key.to_string(), id);
        id
    }

    /// Read-only lookup; unseen keys return [`UNKNOWN_CODE`].
    ///
    /// This is the prediction-time path: it takes `&self`, so concurrent
    /// predictions share the encoder without synchronization.
    pub fn code(&self, scope: CategoryScope, key: &str) -> u32 {
        self.maps[scope.index()]
            .get(key)
            .copied()
            .unwrap_or(UNKNOWN_CODE)
    }

    /// Stop minting. Called once fitting has produced its coefficient vector.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of distinct categories seen in `scope`.
    pub fn len(&self, scope: CategoryScope) -> usize {
        self.maps[scope.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.iter().all(|m| m.is_empty())
    }
}
