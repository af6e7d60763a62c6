//! Flux proc macro for render-facing state types.
//!
//! `#[state("path")]` marks a struct as a Flux state type. It generates
//! `impl reel_flux::State for StructName { const PATH: &'static str = "the/path"; }`
//! and adds `#[derive(Debug, Clone, PartialEq)]` for whichever of those
//! the struct does not already derive.

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod state;

/// Define a Flux state type.
///
/// ```ignore
/// #[state("viewer/progress")]
/// pub struct ProgressView {
///     pub story_id: String,
///     pub progress: f64,
/// }
/// ```
///
/// Generates:
/// - `#[derive(Debug, Clone, PartialEq)]` (if not already present)
/// - `impl ::reel_flux::State for ProgressView { const PATH: &'static str = "viewer/progress"; }`
#[proc_macro_attribute]
pub fn state(attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as syn::ItemStruct);
    state::expand(attr.into(), item)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
