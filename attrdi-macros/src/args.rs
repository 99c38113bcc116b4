//! Named attribute arguments shared by `#[service]` and `#[decorator]`

use syn::parse::{Parse, ParseStream};
use syn::{Expr, Ident, LitBool, LitInt, LitStr, Token, Type};

pub enum ArgValue {
    Type(Type),
    Ident(Ident),
    Str(LitStr),
    Int(LitInt),
    Bool(LitBool),
    Expr(Expr),
}

pub struct Arg {
    pub name: Ident,
    pub value: Option<ArgValue>,
}

/// `name = value` pairs and bare flags, comma separated
pub struct Args {
    args: Vec<Arg>,
}

impl Parse for Args {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = Vec::new();

        while !input.is_empty() {
            let name: Ident = input.parse()?;
            let value = if input.peek(Token![=]) {
                input.parse::<Token![=]>()?;
                Some(match name.to_string().as_str() {
                    "contract" | "options" => ArgValue::Type(input.parse()?),
                    "lifetime" => ArgValue::Ident(input.parse()?),
                    "key" => ArgValue::Str(input.parse()?),
                    "order" => ArgValue::Int(input.parse()?),
                    "open_generics_as_wildcard" => ArgValue::Bool(input.parse()?),
                    "feature" => ArgValue::Expr(input.parse()?),
                    _ => {
                        return Err(syn::Error::new(
                            name.span(),
                            format!("unknown parameter '{}'", name),
                        ))
                    }
                })
            } else {
                None
            };
            args.push(Arg { name, value });

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            } else if !input.is_empty() {
                return Err(input.error("expected ','"));
            }
        }

        Ok(Args { args })
    }
}

impl Args {
    /// Reject parameters outside `valued` and `flags`, duplicates, and
    /// valued parameters written without a value
    pub fn check(&self, valued: &[&str], flags: &[&str]) -> syn::Result<()> {
        for (index, arg) in self.args.iter().enumerate() {
            let name = arg.name.to_string();
            let is_valued = valued.contains(&name.as_str());
            let is_flag = flags.contains(&name.as_str());

            if !is_valued && !is_flag {
                let mut expected: Vec<&str> = valued.to_vec();
                expected.extend_from_slice(flags);
                return Err(syn::Error::new(
                    arg.name.span(),
                    format!("unknown parameter '{}', expected one of: {}", name, expected.join(", ")),
                ));
            }
            if is_valued && arg.value.is_none() {
                return Err(syn::Error::new(
                    arg.name.span(),
                    format!("parameter '{}' needs a value", name),
                ));
            }
            if self.args[..index].iter().any(|earlier| earlier.name == arg.name) {
                return Err(syn::Error::new(
                    arg.name.span(),
                    format!("duplicate parameter '{}'", name),
                ));
            }
        }
        Ok(())
    }

    fn value(&self, name: &str) -> Option<&ArgValue> {
        self.args
            .iter()
            .find(|arg| arg.name == name)
            .and_then(|arg| arg.value.as_ref())
    }

    pub fn ty(&self, name: &str) -> Option<&Type> {
        match self.value(name) {
            Some(ArgValue::Type(ty)) => Some(ty),
            _ => None,
        }
    }

    pub fn ident(&self, name: &str) -> Option<&Ident> {
        match self.value(name) {
            Some(ArgValue::Ident(ident)) => Some(ident),
            _ => None,
        }
    }

    pub fn string(&self, name: &str) -> Option<&LitStr> {
        match self.value(name) {
            Some(ArgValue::Str(lit)) => Some(lit),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<&LitInt> {
        match self.value(name) {
            Some(ArgValue::Int(lit)) => Some(lit),
            _ => None,
        }
    }

    pub fn expr(&self, name: &str) -> Option<&Expr> {
        match self.value(name) {
            Some(ArgValue::Expr(expr)) => Some(expr),
            _ => None,
        }
    }

    /// A bare flag, or a flag set with `= true`
    pub fn flag(&self, name: &str) -> bool {
        self.args.iter().any(|arg| {
            arg.name == name
                && match &arg.value {
                    None => true,
                    Some(ArgValue::Bool(lit)) => lit.value,
                    Some(_) => false,
                }
        })
    }
}
