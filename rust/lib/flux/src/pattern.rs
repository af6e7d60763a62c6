//! MQTT-style topic patterns.
//!
//! Levels are separated by `/`. `+` matches exactly one level; `#` must be
//! the final level and matches zero or more remaining levels, so
//! `viewer/#` matches `viewer`, `viewer/state` and `viewer/social/x`.

/// A parsed subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    levels: Vec<Level>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Level {
    Exact(String),
    Single,
    Rest,
}

impl Pattern {
    /// Parse a pattern. A `#` anywhere but the last level is treated as a
    /// literal level, matching only a topic level spelled `#`.
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split('/').collect();
        let last = parts.len() - 1;
        let levels = parts
            .iter()
            .enumerate()
            .map(|(i, part)| match *part {
                "+" => Level::Single,
                "#" if i == last => Level::Rest,
                other => Level::Exact(other.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            levels,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the concrete topic `topic` is matched by this pattern.
    pub fn matches(&self, topic: &str) -> bool {
        let mut topic_levels = topic.split('/');
        for level in &self.levels {
            match level {
                Level::Rest => return true,
                Level::Single => {
                    if topic_levels.next().is_none() {
                        return false;
                    }
                }
                Level::Exact(expected) => match topic_levels.next() {
                    Some(actual) if actual == expected => {}
                    _ => return false,
                },
            }
        }
        topic_levels.next().is_none()
    }
}
