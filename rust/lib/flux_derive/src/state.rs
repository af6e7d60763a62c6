//! `#[state("path")]` macro expansion.

use proc_macro2::TokenStream;
use quote::quote;
use syn::ItemStruct;

const IMPLIED: [&str; 3] = ["Debug", "Clone", "PartialEq"];

pub fn expand(attr: TokenStream, item: ItemStruct) -> syn::Result<TokenStream> {
    let path = parse_path(attr)?;

    let user_derives = collect_derives(&item);
    let extra_derives: Vec<syn::Ident> = IMPLIED
        .iter()
        .filter(|name| !user_derives.iter().any(|d| d == *name))
        .map(|name| syn::Ident::new(name, proc_macro2::Span::call_site()))
        .collect();

    let struct_name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();

    // Derives must precede helper attributes such as `#[serde(...)]`, so
    // the extra derive goes in front of everything the user wrote.
    let derive_attr = if extra_derives.is_empty() {
        quote! {}
    } else {
        quote! { #[derive(#(#extra_derives),*)] }
    };

    Ok(quote! {
        #derive_attr
        #item

        impl #impl_generics ::reel_flux::State for #struct_name #ty_generics #where_clause {
            const PATH: &'static str = #path;
        }
    })
}

fn parse_path(attr: TokenStream) -> syn::Result<String> {
    let lit: syn::LitStr = syn::parse2(attr)?;
    let path = lit.value();
    if path.is_empty() {
        return Err(syn::Error::new(lit.span(), "state path cannot be empty"));
    }
    if path.split('/').any(|level| level == "+" || level == "#") {
        return Err(syn::Error::new(lit.span(), "state path cannot contain wildcards"));
    }
    Ok(path)
}

fn collect_derives(item: &ItemStruct) -> Vec<String> {
    let mut derives = Vec::new();
    for attr in &item.attrs {
        if attr.path().is_ident("derive") {
            if let Ok(meta) = attr.parse_args_with(
                syn::punctuated::Punctuated::<syn::Path, syn::Token![,]>::parse_terminated,
            ) {
                for path in meta {
                    if let Some(ident) = path.get_ident() {
                        derives.push(ident.to_string());
                    }
                }
            }
        }
    }
    derives
}
