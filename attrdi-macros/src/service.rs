//! `#[service]` attribute macro
//!
//! Re-emits the annotated struct and submits an `attrdi::discovery::ServiceEntry`
//! describing how to register it.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, ItemStruct};

use crate::args::Args;
use crate::type_ref::type_ref;

const LIFETIMES: [&str; 3] = ["Transient", "Scoped", "Singleton"];

pub fn service_impl(attr: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as Args);
    let item = parse_macro_input!(input as ItemStruct);

    match expand(&args, &item) {
        Ok(registration) => quote! {
            #item
            #registration
        }
        .into(),
        Err(error) => {
            let error = error.to_compile_error();
            quote! {
                #item
                #error
            }
            .into()
        }
    }
}

fn expand(args: &Args, item: &ItemStruct) -> syn::Result<TokenStream2> {
    args.check(&["contract", "lifetime", "key", "feature", "options"], &[])?;

    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "#[service] cannot register a generic type; register closed types with ServiceDeclaration",
        ));
    }

    let name = &item.ident;

    let lifetime = match args.ident("lifetime") {
        Some(lifetime) if LIFETIMES.iter().any(|known| lifetime == known) => quote!(#lifetime),
        Some(lifetime) => {
            return Err(syn::Error::new_spanned(
                lifetime,
                format!("unknown lifetime '{}', expected one of: {}", lifetime, LIFETIMES.join(", ")),
            ))
        }
        None => quote!(Transient),
    };

    let contract = contract_fn(args.ty("contract").map(|ty| type_ref(ty, &[])));
    let key = key_literal(args);
    let feature = feature_fn(args);
    let options = match args.ty("options") {
        Some(options) => quote! {
            ::std::option::Option::Some(
                ::attrdi::OptionsBinding::of::<#options> as fn() -> ::attrdi::OptionsBinding
            )
        },
        None => quote!(::std::option::Option::None),
    };

    Ok(quote! {
        ::attrdi::inventory::submit! {
            ::attrdi::discovery::ServiceEntry {
                module: ::std::module_path!(),
                component: <#name as ::attrdi::Component>::component,
                contract: #contract,
                lifetime: ::attrdi::Lifetime::#lifetime,
                key: #key,
                feature: #feature,
                options: #options,
            }
        }
    })
}

/// `Option<fn() -> TypeRef>` for an optional contract expression
pub(crate) fn contract_fn(contract: Option<TokenStream2>) -> TokenStream2 {
    match contract {
        Some(contract) => quote! {
            ::std::option::Option::Some({
                fn contract() -> ::attrdi::TypeRef {
                    #contract
                }
                contract as fn() -> ::attrdi::TypeRef
            })
        },
        None => quote!(::std::option::Option::None),
    }
}

pub(crate) fn key_literal(args: &Args) -> TokenStream2 {
    match args.string("key") {
        Some(key) => quote!(::std::option::Option::Some(#key)),
        None => quote!(::std::option::Option::None),
    }
}

pub(crate) fn feature_fn(args: &Args) -> TokenStream2 {
    match args.expr("feature") {
        Some(feature) => quote! {{
            fn feature() -> ::attrdi::Feature {
                ::attrdi::Feature::of(#feature)
            }
            feature as fn() -> ::attrdi::Feature
        }},
        None => quote!(::attrdi::Feature::none as fn() -> ::attrdi::Feature),
    }
}
