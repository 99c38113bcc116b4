//! `#[derive(Component)]`
//!
//! Generates an `attrdi::Component` impl: a constructor filling `#[inject]`
//! fields from resolved dependencies (and every other field with
//! `Default::default()`), one cast per contract listed in
//! `#[component(implements(...))]`, and for non-generic types a named
//! registration so configuration can refer to the type.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse::Parse;
use syn::{
    parenthesized, parse_macro_input, parse_quote, Data, DeriveInput, Field, Fields, GenericArgument,
    GenericParam, LitStr, PathArguments, Token, Type,
};

use crate::type_ref::type_ref;

struct Injection {
    inner: Type,
    optional: bool,
    key: Option<LitStr>,
}

pub fn component_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input).unwrap_or_else(syn::Error::into_compile_error).into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => Some(named.named.iter().collect::<Vec<_>>()),
            Fields::Unit => None,
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Component does not support tuple structs. Use named fields instead.",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Component can only be derived for structs",
            ))
        }
    };

    let mut type_params = Vec::new();
    for param in &input.generics.params {
        match param {
            GenericParam::Type(param) => type_params.push(param.ident.clone()),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "Component types may only have type parameters",
                ))
            }
        }
    }

    let interfaces = parse_implements(input)?;

    let mut generics = input.generics.clone();
    {
        let where_clause = generics.make_where_clause();
        for param in &type_params {
            where_clause
                .predicates
                .push(parse_quote!(#param: ::std::marker::Send + ::std::marker::Sync + 'static));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let self_ty: Type = parse_quote!(#name #ty_generics);
    let self_ref = type_ref(&self_ty, &[]);

    let mut dependencies = Vec::new();
    let construct = match &fields {
        None => quote!(Self),
        Some(fields) => {
            let mut initializers = Vec::new();
            for field in fields {
                let ident = &field.ident;
                match injection(field)? {
                    Some(injection) => {
                        let index = dependencies.len();
                        let inner = &injection.inner;
                        let take = if injection.optional {
                            quote!(arguments.optional::<#inner>(#index)?)
                        } else {
                            quote!(arguments.required::<#inner>(#index)?)
                        };
                        initializers.push(quote!(#ident: #take));
                        dependencies.push(injection);
                    }
                    None => initializers.push(quote!(#ident: ::std::default::Default::default())),
                }
            }
            quote!(Self { #(#initializers),* })
        }
    };

    let arguments = if dependencies.is_empty() {
        quote!(_arguments)
    } else {
        quote!(arguments)
    };

    let depends_on = dependencies.iter().map(|dependency| {
        let dependency_ref = type_ref(&dependency.inner, &[]);
        let optional = dependency.optional;
        let key = match &dependency.key {
            Some(key) => quote!(::std::option::Option::Some(#key)),
            None => quote!(::std::option::Option::None),
        };
        quote! {
            .depends_on(::attrdi::Dependency::new(#dependency_ref, #optional, #key))
        }
    });

    let implements = interfaces.iter().map(|interface| {
        let interface_ref = type_ref(interface, &[]);
        quote! {
            .implements(#interface_ref, |value: ::attrdi::Erased| {
                let concrete = value.downcast::<Self>().ok()?;
                let contract: ::std::sync::Arc<#interface> = concrete;
                ::std::option::Option::Some(::attrdi::Instance::new(contract))
            })
        }
    });

    let named_registration = if type_params.is_empty() {
        quote! {
            ::attrdi::inventory::submit! {
                ::attrdi::discovery::ComponentEntry {
                    module: ::std::module_path!(),
                    component: <#name as ::attrdi::Component>::component,
                }
            }
        }
    } else {
        quote!()
    };

    Ok(quote! {
        impl #impl_generics ::attrdi::Component for #name #ty_generics #where_clause {
            fn component() -> ::attrdi::ComponentDescriptor {
                ::attrdi::ComponentDescriptor::new::<Self>(
                    #self_ref,
                    |#arguments: &mut ::attrdi::Arguments| -> ::attrdi::Result<::attrdi::Erased> {
                        ::std::result::Result::Ok(::std::sync::Arc::new(#construct) as ::attrdi::Erased)
                    },
                )
                #(#implements)*
                #(#depends_on)*
            }
        }

        #named_registration
    })
}

/// Contracts from `#[component(implements(A, B))]`, in order
fn parse_implements(input: &DeriveInput) -> syn::Result<Vec<Type>> {
    let mut interfaces = Vec::new();
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("component")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("implements") {
                let content;
                parenthesized!(content in meta.input);
                let types = content.parse_terminated(Type::parse, Token![,])?;
                interfaces.extend(types);
                Ok(())
            } else {
                Err(meta.error("unknown component option, expected 'implements'"))
            }
        })?;
    }
    Ok(interfaces)
}

fn injection(field: &Field) -> syn::Result<Option<Injection>> {
    let Some(attr) = field.attrs.iter().find(|attr| attr.path().is_ident("inject")) else {
        return Ok(None);
    };

    let mut key = None;
    if let syn::Meta::List(_) = &attr.meta {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("key") {
                key = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("unknown inject option, expected 'key'"))
            }
        })?;
    }

    if let Some(arc) = single_argument(&field.ty, "Option") {
        if let Some(inner) = single_argument(arc, "Arc") {
            return Ok(Some(Injection {
                inner: inner.clone(),
                optional: true,
                key,
            }));
        }
    }
    if let Some(inner) = single_argument(&field.ty, "Arc") {
        return Ok(Some(Injection {
            inner: inner.clone(),
            optional: false,
            key,
        }));
    }

    Err(syn::Error::new_spanned(
        &field.ty,
        "#[inject] fields must be `Arc<T>` or `Option<Arc<T>>`",
    ))
}

/// `T` when `ty` is written `Wrapper<T>` with the last path segment `wrapper`
fn single_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    match arguments.args.iter().collect::<Vec<_>>().as_slice() {
        [GenericArgument::Type(inner)] => Some(inner),
        _ => None,
    }
}
