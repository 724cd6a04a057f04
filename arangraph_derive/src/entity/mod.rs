use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Expr, Field, Fields, Meta, parse_macro_input};

use crate::shared::{arangraph_args, import_arangraph, meta_name, string_value};

/// Field name mapped onto the document `_key` instead of an attribute.
const KEY_FIELD: &str = "id";

struct RelationArgs {
    target: String,
    graph: Option<String>,
    related_name: Option<String>,
    edge_collection: Option<String>,
    many: bool,
}

enum FieldDecl {
    Skip,
    Attribute { default: Option<Expr> },
    Relation(RelationArgs),
}

pub fn derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let arangraph = import_arangraph();
    let ident = &input.ident;

    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "Entity only supports structs with named fields",
                ));
            }
        },
        _ => return Err(syn::Error::new_spanned(ident, "Entity only supports structs")),
    };

    let mut type_name = ident.to_string();
    let mut collection = None;
    for meta in arangraph_args(&input.attrs)? {
        match meta_name(&meta).as_str() {
            "type_name" => type_name = string_value(&meta)?,
            "collection" => collection = Some(string_value(&meta)?),
            _ => return Err(syn::Error::new_spanned(meta, "unknown entity option")),
        }
    }

    let mut members = Vec::new();
    for field in fields {
        let Some(name) = field.ident.as_ref().map(|i| i.to_string()) else {
            continue;
        };
        let ty = &field.ty;
        match parse_field(field, &name)? {
            FieldDecl::Skip => {}
            FieldDecl::Attribute { default } => {
                let default = default.map(|expr| quote! { .with_default(#expr) });
                members.push(quote! {
                    .attribute(#arangraph::Attribute::of::<#ty>(#name) #default)
                });
            }
            FieldDecl::Relation(args) => {
                let target = &args.target;
                let graph = args.graph.map(|g| quote! { .graph(#g) });
                let related = args.related_name.map(|r| quote! { .related_name(#r) });
                let edges = args.edge_collection.map(|e| quote! { .edge_collection(#e) });
                let many = args.many.then(|| quote! { .many() });
                members.push(quote! {
                    .relationship(
                        #arangraph::Relationship::new(#name, #target) #graph #related #edges #many
                    )
                });
            }
        }
    }

    let collection = collection.map(|c| quote! { .collection(#c) });
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #arangraph::EntityDecl for #ident #ty_generics #where_clause {
            const TYPE: &'static str = #type_name;

            fn entity_type() -> #arangraph::EntityType {
                #arangraph::EntityType::new(#type_name)
                    #collection
                    #(#members)*
            }
        }
    })
}

fn parse_field(field: &Field, name: &str) -> syn::Result<FieldDecl> {
    let args = arangraph_args(&field.attrs)?;

    let mut skip = name == KEY_FIELD;
    let mut default = None;
    let mut relation: Option<RelationArgs> = None;
    let mut graph = None;
    let mut related_name = None;
    let mut edge_collection = None;
    let mut many = false;

    for meta in &args {
        match (meta_name(meta).as_str(), meta) {
            ("skip", Meta::Path(_)) => skip = true,
            ("many", Meta::Path(_)) => many = true,
            ("default", Meta::NameValue(nv)) => default = Some(nv.value.clone()),
            ("relation", _) => {
                relation = Some(RelationArgs {
                    target: string_value(meta)?,
                    graph: None,
                    related_name: None,
                    edge_collection: None,
                    many: false,
                })
            }
            ("graph", _) => graph = Some(string_value(meta)?),
            ("related_name", _) => related_name = Some(string_value(meta)?),
            ("edge_collection", _) => edge_collection = Some(string_value(meta)?),
            _ => return Err(syn::Error::new_spanned(meta, "unknown field option")),
        }
    }

    match relation {
        Some(mut args) => {
            args.graph = graph;
            args.related_name = related_name;
            args.edge_collection = edge_collection;
            args.many = many;
            Ok(FieldDecl::Relation(args))
        }
        None if graph.is_some() || related_name.is_some() || edge_collection.is_some() || many => {
            Err(syn::Error::new_spanned(
                field,
                "relationship options need `relation = \"Target\"`",
            ))
        }
        None if skip => Ok(FieldDecl::Skip),
        None => Ok(FieldDecl::Attribute { default }),
    }
}
