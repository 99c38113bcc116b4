//! `#[decorator]` attribute macro

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, GenericParam, ItemStruct};

use crate::args::Args;
use crate::service::{contract_fn, feature_fn, key_literal};
use crate::type_ref::type_ref;

pub fn decorator_impl(attr: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as Args);
    let item = parse_macro_input!(input as ItemStruct);

    let registration = expand(&args, &item).unwrap_or_else(syn::Error::into_compile_error);
    quote! {
        #item
        #registration
    }
    .into()
}

fn expand(args: &Args, item: &ItemStruct) -> syn::Result<TokenStream2> {
    args.check(&["contract", "order", "key", "feature"], &["open_generics_as_wildcard"])?;

    let name = &item.ident;

    let mut type_params = Vec::new();
    for param in &item.generics.params {
        match param {
            GenericParam::Type(param) => type_params.push(param.ident.clone()),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "decorators may only have type parameters",
                ))
            }
        }
    }

    // A generic decorator is registered through its open form; the closed
    // instances come from `close_generic!`.
    let component = if type_params.is_empty() {
        quote!(<#name as ::attrdi::Component>::component)
    } else {
        let open = type_params.iter().map(|_| quote!(::attrdi::Open));
        quote!(<#name<#(#open),*> as ::attrdi::Component>::component)
    };

    let order = match args.int("order") {
        Some(order) => order.base10_parse::<u32>()?,
        None => 1,
    };

    let contract = contract_fn(args.ty("contract").map(|ty| type_ref(ty, &type_params)));
    let key = key_literal(args);
    let feature = feature_fn(args);
    let open_generics_as_wildcard = args.flag("open_generics_as_wildcard");

    Ok(quote! {
        ::attrdi::inventory::submit! {
            ::attrdi::discovery::DecoratorEntry {
                module: ::std::module_path!(),
                component: #component,
                contract: #contract,
                order: #order,
                key: #key,
                feature: #feature,
                open_generics_as_wildcard: #open_generics_as_wildcard,
            }
        }
    })
}
