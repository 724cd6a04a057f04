use proc_macro_crate::{FoundCrate, crate_name};
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, ExprLit, Lit, Meta, Token};

pub fn import_arangraph() -> proc_macro2::TokenStream {
    // This finds the arangraph crate in the user's dependencies
    let found_crate = crate_name("arangraph").unwrap_or(FoundCrate::Itself);

    match found_crate {
        FoundCrate::Itself => quote! { ::arangraph },
        FoundCrate::Name(name) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote! { ::#ident }
        }
    }
}

/// Flattened arguments of every `#[arangraph(...)]` on an item.
pub fn arangraph_args(attrs: &[Attribute]) -> syn::Result<Vec<Meta>> {
    let mut out = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("arangraph")) {
        let nested = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        out.extend(nested);
    }
    Ok(out)
}

/// Value of `key = "..."`.
pub fn string_value(meta: &Meta) -> syn::Result<String> {
    match meta {
        Meta::NameValue(nv) => match &nv.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(s), ..
            }) => Ok(s.value()),
            other => Err(syn::Error::new_spanned(other, "expected a string literal")),
        },
        other => Err(syn::Error::new_spanned(other, "expected `name = \"value\"`")),
    }
}

pub fn meta_name(meta: &Meta) -> String {
    meta.path()
        .get_ident()
        .map(|i| i.to_string())
        .unwrap_or_default()
}
