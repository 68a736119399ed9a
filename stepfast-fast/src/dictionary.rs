/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session dictionary for FAST operators.
//!
//! Entries are keyed by scope and field key. Writes made while a message is
//! being decoded are staged and only become visible to later messages once
//! the message decodes completely ([`Dictionary::commit`]); a failed message
//! is discarded with [`Dictionary::rollback`]. Reads during a message see its
//! own staged writes first.

use crate::operators::{DictionaryScope, DictionaryValue};
use crate::value::ScalarValue;
use std::collections::HashMap;
use std::sync::Arc;

static UNDEFINED: DictionaryValue = DictionaryValue::Undefined;

/// Resolved dictionary scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    /// Shared by every template.
    Global,
    /// Private to one template id.
    Template(u32),
    /// Shared by templates with the same application type.
    Type(Arc<str>),
}

/// Full dictionary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DictionaryKey {
    /// Resolved scope.
    pub scope: ScopeKey,
    /// Field key within the scope.
    pub key: Arc<str>,
}

/// Scope information of the template currently being decoded.
#[derive(Debug, Clone)]
pub struct TemplateScope {
    /// Template id.
    pub template_id: u32,
    /// Application type name, used by [`DictionaryScope::Type`].
    pub type_name: Arc<str>,
}

impl TemplateScope {
    /// Creates a scope for a template.
    #[must_use]
    pub fn new(template_id: u32, type_name: Arc<str>) -> Self {
        Self {
            template_id,
            type_name,
        }
    }

    /// Builds the dictionary key for a field in this template.
    #[must_use]
    pub fn key(&self, scope: DictionaryScope, key: &Arc<str>) -> DictionaryKey {
        let scope = match scope {
            DictionaryScope::Global => ScopeKey::Global,
            DictionaryScope::Template => ScopeKey::Template(self.template_id),
            DictionaryScope::Type => ScopeKey::Type(Arc::clone(&self.type_name)),
        };
        DictionaryKey {
            scope,
            key: Arc::clone(key),
        }
    }
}

/// Previous-value store for one decoding session.
#[derive(Debug, Default, Clone)]
pub struct Dictionary {
    committed: HashMap<DictionaryKey, DictionaryValue>,
    staged: HashMap<DictionaryKey, DictionaryValue>,
}

impl Dictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current value for `key`, [`DictionaryValue::Undefined`]
    /// if it was never set.
    #[must_use]
    pub fn get(&self, key: &DictionaryKey) -> &DictionaryValue {
        self.staged
            .get(key)
            .or_else(|| self.committed.get(key))
            .unwrap_or(&UNDEFINED)
    }

    /// Stages a value for `key`.
    pub fn set(&mut self, key: DictionaryKey, value: DictionaryValue) {
        self.staged.insert(key, value);
    }

    /// Stages an assigned value for `key`.
    pub fn assign(&mut self, key: DictionaryKey, value: ScalarValue) {
        self.set(key, DictionaryValue::Assigned(value));
    }

    /// Makes staged writes permanent.
    pub fn commit(&mut self) {
        self.committed.extend(self.staged.drain());
    }

    /// Discards staged writes.
    pub fn rollback(&mut self) {
        self.staged.clear();
    }

    /// Clears every entry, staged or committed.
    pub fn reset(&mut self) {
        self.committed.clear();
        self.staged.clear();
    }

    /// Returns the number of committed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    /// Returns true if nothing has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}
