//! Derive macro for service-container
//!
//! `#[derive(Service)]` generates the `Service` impl for a struct with named
//! fields: the `#[dep]` fields become the constructor parameters, in field
//! order, and every other field is filled with `Default::default()`.
//! A `#[provides(dyn Trait, ...)]` attribute on the struct additionally binds
//! it to trait-object contracts.
//!
//! # Example
//!
//! ```rust,ignore
//! use service_container::{Container, Service};
//! use std::sync::Arc;
//!
//! trait Repository: Send + Sync {}
//! trait Metrics: Send + Sync {}
//!
//! struct Config;
//!
//! #[derive(Service)]
//! #[provides(dyn Repository)]
//! struct SqlRepository {
//!     #[dep]
//!     config: Arc<Config>,
//!     #[dep(optional)]
//!     metrics: Option<Arc<dyn Metrics>>,
//!     // Non-dep fields use Default
//!     queries: std::sync::atomic::AtomicU64,
//! }
//!
//! impl Repository for SqlRepository {}
//!
//! let container = Container::new();
//! container.register_singleton::<Config>(|b| b.factory(|| Ok(Arc::new(Config)))).unwrap();
//! container
//!     .register_scoped::<dyn Repository>(|b| b.implementation::<SqlRepository>())
//!     .unwrap();
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Token, Type};

/// Tuples of dependencies are implemented up to this arity
const MAX_DEPENDENCIES: usize = 8;

/// Kinds of `#[dep]` attribute
enum DepAttr {
    Required,
    Optional,
}

/// Find and parse the `#[dep]` attribute of a field
fn find_dep_attr(attrs: &[Attribute]) -> syn::Result<Option<DepAttr>> {
    for attr in attrs {
        if !attr.path().is_ident("dep") {
            continue;
        }
        if attr.meta.require_path_only().is_ok() {
            return Ok(Some(DepAttr::Required));
        }

        let nested: syn::Ident = attr.parse_args()?;
        if nested == "optional" {
            return Ok(Some(DepAttr::Optional));
        }
        return Err(syn::Error::new_spanned(
            nested,
            "expected `#[dep]` or `#[dep(optional)]`",
        ));
    }
    Ok(None)
}

/// Collect the contract types listed in `#[provides(...)]` attributes
fn find_provides(attrs: &[Attribute]) -> syn::Result<Vec<Type>> {
    let mut contracts = Vec::new();
    for attr in attrs {
        if attr.path().is_ident("provides") {
            let list = attr.parse_args_with(Punctuated::<Type, Token![,]>::parse_terminated)?;
            contracts.extend(list);
        }
    }
    Ok(contracts)
}

/// Extract T from Arc<T>
fn extract_arc_inner_type(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        let segment = type_path.path.segments.last()?;
        if segment.ident == "Arc" {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                    return Some(inner);
                }
            }
        }
    }
    None
}

/// Extract T from Option<Arc<T>>
fn extract_option_arc_inner_type(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        let segment = type_path.path.segments.last()?;
        if segment.ident == "Option" {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                    return extract_arc_inner_type(inner);
                }
            }
        }
    }
    None
}

/// Derive macro for the `Service` trait.
///
/// # Attributes
///
/// - `#[dep]` - Required constructor parameter. The field must be `Arc<T>`.
/// - `#[dep(optional)]` - Optional parameter, `None` when `T` is not
///   registered. The field must be `Option<Arc<T>>`.
/// - `#[provides(dyn A, dyn B)]` - On the struct: implement `Provides` for
///   each listed contract.
///
/// # Generated Code
///
/// ```rust,ignore
/// impl Service for UserService {
///     type Dependencies = (Arc<Config>, Option<Arc<dyn Cache>>);
///
///     fn create((__dep_0, __dep_1): Self::Dependencies) -> Result<Self> {
///         Ok(Self { config: __dep_0, cache: __dep_1, hits: Default::default() })
///     }
/// }
/// ```
#[proc_macro_derive(Service, attributes(dep, provides))]
pub fn derive_service(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_service(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_service(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Only support structs with named fields
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Service can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Service can only be derived for structs",
            ));
        }
    };

    let mut dep_types: Vec<&Type> = Vec::new();
    let mut dep_names: Vec<syn::Ident> = Vec::new();
    let mut field_inits: Vec<proc_macro2::TokenStream> = Vec::new();

    for field in fields.iter() {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let field_type = &field.ty;

        let invalid = match find_dep_attr(&field.attrs)? {
            Some(DepAttr::Required) if extract_arc_inner_type(field_type).is_none() => {
                Some("Fields marked with #[dep] must have type Arc<T>")
            }
            Some(DepAttr::Optional) if extract_option_arc_inner_type(field_type).is_none() => {
                Some("Fields marked with #[dep(optional)] must have type Option<Arc<T>>")
            }
            Some(_) => None,
            None => {
                // Non-dependency field - use Default
                field_inits.push(quote! {
                    #field_name: ::std::default::Default::default()
                });
                continue;
            }
        };
        if let Some(message) = invalid {
            return Err(syn::Error::new_spanned(field_type, message));
        }

        let dep_name = syn::Ident::new(&format!("__dep_{}", dep_types.len()), field_name.span());
        field_inits.push(quote! { #field_name: #dep_name });
        dep_types.push(field_type);
        dep_names.push(dep_name);
    }

    if dep_types.len() > MAX_DEPENDENCIES {
        return Err(syn::Error::new_spanned(
            name,
            format!("Service supports at most {MAX_DEPENDENCIES} #[dep] fields"),
        ));
    }

    let (deps_type, deps_pattern) = match dep_types.len() {
        0 => (quote! { () }, quote! { _ }),
        1 => {
            let ty = dep_types[0];
            let name = &dep_names[0];
            (quote! { #ty }, quote! { #name })
        }
        _ => (
            quote! { (#(#dep_types),*) },
            quote! { (#(#dep_names),*) },
        ),
    };

    let provides = find_provides(&input.attrs)?.into_iter().map(|contract| {
        quote! {
            impl #impl_generics ::service_container::Provides<#contract> for #name #ty_generics #where_clause {
                #[inline]
                fn provide(
                    self: ::std::sync::Arc<Self>,
                ) -> ::std::sync::Arc<#contract> {
                    self
                }
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::service_container::Service for #name #ty_generics #where_clause {
            type Dependencies = #deps_type;

            fn create(
                #deps_pattern: Self::Dependencies,
            ) -> ::service_container::Result<Self> {
                ::std::result::Result::Ok(Self {
                    #(#field_inits),*
                })
            }
        }

        #(#provides)*
    })
}
