mod entity;
mod shared;

use proc_macro::TokenStream;

/// Implements `arangraph::EntityDecl` for a struct with named fields.
///
/// ```rust,ignore
/// #[derive(Entity)]
/// #[arangraph(type_name = "Book", collection = "books")]
/// struct Book {
///     id: String,
///     title: String,
///     #[arangraph(default = 0)]
///     pages: i64,
///     #[arangraph(relation = "Author", related_name = "books")]
///     author: Option<DocumentHandle>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(arangraph))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive(input)
}
