//! Title bridging.
//!
//! Title-prefixed mentions ("President Biden", "Dr. Smith") are remembered
//! as `title -> (entity, last position)`. A later definite description
//! ("the president") resolves to the remembered entity. When a pronoun
//! resolves to an entity, its titles are reinforced by moving their last
//! positions up to the pronoun site.

use std::collections::HashMap;

use crate::entity::EntitySpan;
use crate::ident::EntityId;
use crate::wordlists;

/// One remembered title binding.
#[derive(Debug, Clone, Copy)]
pub struct TitleBinding {
    pub entity_id: EntityId,
    /// Character position of the most recent supporting mention.
    pub last_position: usize,
}

/// Rolling title table for one document.
#[derive(Debug, Default)]
pub struct TitleBridge {
    bindings: HashMap<String, TitleBinding>,
}

impl TitleBridge {
    /// Build the bridge from minted entity spans.
    pub fn from_spans(spans: &[EntitySpan]) -> Self {
        let mut bridge = Self::default();
        for span in spans {
            let Some(text) = &span.text else { continue };
            let Some(first) = text.split_whitespace().next() else {
                continue;
            };
            let title = first.trim_end_matches('.').to_lowercase();
            // A bare title is not a bridge ("Professor" alone binds nothing).
            if !wordlists::TITLE_PREFIXES.contains(title.as_str())
                || text.split_whitespace().nth(1).is_none()
            {
                continue;
            }
            bridge.record(&title, span.entity_id, span.start);
        }
        bridge
    }

    /// Record (or refresh) a title binding.
    pub fn record(&mut self, title: &str, entity_id: EntityId, position: usize) {
        let entry = self
            .bindings
            .entry(title.to_lowercase())
            .or_insert(TitleBinding {
                entity_id,
                last_position: position,
            });
        // Later mentions win.
        if position >= entry.last_position {
            *entry = TitleBinding {
                entity_id,
                last_position: position,
            };
        }
    }

    /// Resolve "the <title>" at `position`: the remembered holder, provided
    /// the supporting mention came earlier in the document.
    pub fn resolve(&self, title: &str, position: usize) -> Option<EntityId> {
        let binding = self.bindings.get(&title.to_lowercase())?;
        (binding.last_position < position).then_some(binding.entity_id)
    }

    /// Reinforce all titles bound to `entity_id`: a pronoun at `position`
    /// just referred to the holder, so the titles stay fresh.
    pub fn reinforce(&mut self, entity_id: EntityId, position: usize) {
        for binding in self.bindings.values_mut() {
            if binding.entity_id == entity_id && position > binding.last_position {
                binding.last_position = position;
            }
        }
    }

    /// Number of distinct bound titles.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
