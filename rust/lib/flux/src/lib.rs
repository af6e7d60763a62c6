//! Reel Flux: observable state for headless engines.
//!
//! The engine owns all state and logic and publishes render-facing
//! values at well-known paths; each host surface (web, mobile, terminal)
//! only subscribes and renders.
//!
//! # Primitives
//!
//! - `set(path, value)`: publish, notifying matching subscribers
//! - `get(path)`: read the current value (Arc clone, no data copy)
//! - `subscribe(pattern)`: observe writes, MQTT-style pattern matched
//!
//! # Example
//!
//! ```ignore
//! use reel_flux::{State, StateStore};
//!
//! let store = StateStore::new();
//! store.subscribe("viewer/#", |path, _value| println!("{} changed", path));
//! store.set_state(ProgressView { story_id: "s1".into(), progress: 0.5 });
//! ```

pub mod pattern;
pub mod store;
pub mod value;

pub use pattern::Pattern;
pub use store::{ChangeHandler, StateStore};
pub use value::{State, StateValue, SubscriptionId};
