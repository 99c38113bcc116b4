//! Generating `attrdi::TypeRef` expressions for written types

use proc_macro2::TokenStream;
use quote::quote;
use syn::{parse_quote, GenericArgument, Ident, PathArguments, Type, TypeParamBound};

fn open_type() -> Type {
    parse_quote!(::attrdi::Open)
}

fn head_arguments_mut(ty: &mut Type) -> Option<&mut PathArguments> {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => {
            type_path.path.segments.last_mut().map(|segment| &mut segment.arguments)
        }
        Type::TraitObject(object) => object.bounds.iter_mut().find_map(|bound| match bound {
            TypeParamBound::Trait(bound) => bound.path.segments.last_mut().map(|segment| &mut segment.arguments),
            _ => None,
        }),
        Type::Paren(inner) => head_arguments_mut(&mut inner.elem),
        Type::Group(inner) => head_arguments_mut(&mut inner.elem),
        _ => None,
    }
}

fn is_open_argument(ty: &Type, open_params: &[Ident]) -> bool {
    match ty {
        Type::Infer(_) => true,
        Type::Path(path) if path.qself.is_none() => path
            .path
            .get_ident()
            .is_some_and(|ident| open_params.contains(ident)),
        _ => false,
    }
}

/// Expression building the `TypeRef` of `ty`
///
/// Types with generic arguments carry their definition (every argument
/// replaced by `Open`) and argument handles. `_` and any identifier in
/// `open_params` written as a direct argument stand for `Open`.
pub fn type_ref(ty: &Type, open_params: &[Ident]) -> TokenStream {
    let mut closed = ty.clone();
    let arguments: Vec<Type> = match head_arguments_mut(&mut closed) {
        Some(PathArguments::AngleBracketed(generic)) => generic
            .args
            .iter_mut()
            .filter_map(|argument| match argument {
                GenericArgument::Type(inner) => {
                    if is_open_argument(inner, open_params) {
                        *inner = open_type();
                    }
                    Some(inner.clone())
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    if arguments.is_empty() {
        return quote!(::attrdi::TypeRef::of::<#ty>());
    }

    let mut definition = ty.clone();
    if let Some(PathArguments::AngleBracketed(generic)) = head_arguments_mut(&mut definition) {
        for argument in generic.args.iter_mut() {
            if let GenericArgument::Type(inner) = argument {
                *inner = open_type();
            }
        }
    }

    let argument_refs = arguments.iter().map(|argument| type_ref(argument, &[]));
    quote! {
        ::attrdi::TypeRef::generic::<#closed, #definition>(::std::vec![#(#argument_refs),*])
    }
}
