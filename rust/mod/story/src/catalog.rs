//! StoryCatalog: the grouped, ordered view of playable stories.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{AuthorGroup, Cursor, Profile, StoryItem};

/// Author groups ordered by most recent activity, newest first.
///
/// Immutable once built; a refresh builds a new catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoryCatalog {
    groups: Vec<AuthorGroup>,
}

impl StoryCatalog {
    /// Build a catalog from raw story records.
    ///
    /// Expired items are dropped, the rest grouped by author (oldest
    /// first within a group) and groups sorted by their newest item.
    pub fn build(
        raw_stories: Vec<StoryItem>,
        profiles: &HashMap<String, Profile>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut order: Vec<String> = Vec::new();
        let mut by_author: HashMap<String, Vec<StoryItem>> = HashMap::new();

        for item in raw_stories.into_iter().filter(|s| s.is_active_at(now)) {
            let bucket = by_author.entry(item.author_id.clone()).or_insert_with(|| {
                order.push(item.author_id.clone());
                Vec::new()
            });
            bucket.push(item);
        }

        let mut groups: Vec<AuthorGroup> = order
            .into_iter()
            .filter_map(|author_id| {
                let mut items = by_author.remove(&author_id)?;
                if items.is_empty() {
                    return None;
                }
                items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
                let profile = profiles
                    .get(&author_id)
                    .cloned()
                    .unwrap_or_else(|| Profile::unknown(&author_id));
                Some(AuthorGroup {
                    author_id,
                    profile,
                    items,
                })
            })
            .collect();

        // Stable: equal activity keeps first-seen author order.
        groups.sort_by(|a, b| b.latest_activity().cmp(&a.latest_activity()));

        Self { groups }
    }

    /// Build a catalog and resolve the initial cursor for `focus_author`.
    ///
    /// The cursor points at the first story of the focused author, or of
    /// the first group when the author is absent. `None` for an empty
    /// catalog, which must not be opened.
    pub fn build_focused(
        raw_stories: Vec<StoryItem>,
        profiles: &HashMap<String, Profile>,
        now: DateTime<Utc>,
        focus_author: Option<&str>,
    ) -> (Self, Option<Cursor>) {
        let catalog = Self::build(raw_stories, profiles, now);
        let cursor = catalog.initial_cursor(focus_author);
        (catalog, cursor)
    }

    pub fn initial_cursor(&self, focus_author: Option<&str>) -> Option<Cursor> {
        if self.groups.is_empty() {
            return None;
        }
        let author_index = focus_author
            .and_then(|id| self.index_of(id))
            .unwrap_or(0);
        Some(Cursor::new(author_index, 0))
    }

    pub fn groups(&self) -> &[AuthorGroup] {
        &self.groups
    }

    pub fn group(&self, author_index: usize) -> Option<&AuthorGroup> {
        self.groups.get(author_index)
    }

    pub fn item(&self, cursor: Cursor) -> Option<&StoryItem> {
        self.group(cursor.author_index)?.items.get(cursor.story_index)
    }

    pub fn is_valid(&self, cursor: Cursor) -> bool {
        self.item(cursor).is_some()
    }

    pub fn index_of(&self, author_id: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.author_id == author_id)
    }

    /// Locate a story by id.
    pub fn find_story(&self, story_id: &str) -> Option<Cursor> {
        self.groups.iter().enumerate().find_map(|(a, group)| {
            group
                .items
                .iter()
                .position(|item| item.id == story_id)
                .map(|s| Cursor::new(a, s))
        })
    }

    /// Nearest valid cursor: indices beyond the end are pulled back to the
    /// last group / last story. `None` only for an empty catalog.
    pub fn clamp(&self, cursor: Cursor) -> Option<Cursor> {
        let last_group = self.groups.len().checked_sub(1)?;
        let author_index = cursor.author_index.min(last_group);
        let last_story = self.groups[author_index].items.len().saturating_sub(1);
        Some(Cursor::new(author_index, cursor.story_index.min(last_story)))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn story_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }
}
