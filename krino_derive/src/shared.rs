use proc_macro_crate::{FoundCrate, crate_name};
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Expr, ExprLit, Field, Fields, Lit, LitStr, Meta, Type,
    ext::IdentExt, punctuated::Punctuated, spanned::Spanned,
};

pub fn import_krino() -> proc_macro2::TokenStream {
    // Finds the krino crate in the user's dependencies
    let found_crate = crate_name("krino").unwrap_or(FoundCrate::Itself);

    match found_crate {
        FoundCrate::Itself => quote! { ::krino },
        FoundCrate::Name(name) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote! { ::#ident }
        }
    }
}

/// Named fields of a struct, or an error naming the derive.
pub fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> syn::Result<&'a Punctuated<Field, syn::Token![,]>> {
    match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(f) => Ok(&f.named),
            _ => Err(syn::Error::new(
                input.ident.span(),
                format!("{} only supports structs with named fields", derive),
            )),
        },
        _ => Err(syn::Error::new(
            input.ident.span(),
            format!("{} only supports structs", derive),
        )),
    }
}

/// All arguments of every `#[<name>(...)]` attribute, in order.
pub fn parse_args(attrs: &[Attribute], name: &str) -> syn::Result<Vec<Meta>> {
    let mut args = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident(name)) {
        if let Meta::List(meta_list) = &attr.meta {
            let nested = meta_list
                .parse_args_with(Punctuated::<Meta, syn::Token![,]>::parse_terminated)?;
            args.extend(nested);
        } else {
            return Err(syn::Error::new(
                attr.span(),
                format!("expected #[{}(...)]", name),
            ));
        }
    }
    Ok(args)
}

/// Checks every argument is one of `known`.
pub fn reject_unknown(args: &[Meta], known: &[&str]) -> syn::Result<()> {
    for meta in args {
        let known_arg = known.iter().any(|k| meta.path().is_ident(k));
        if !known_arg {
            return Err(syn::Error::new(
                meta.span(),
                format!("unknown argument, expected one of: {}", known.join(", ")),
            ));
        }
    }
    Ok(())
}

pub fn has_flag(args: &[Meta], flag: &str) -> bool {
    args.iter()
        .any(|meta| matches!(meta, Meta::Path(path) if path.is_ident(flag)))
}

/// Value of `key = "..."`, when present.
pub fn string_arg(args: &[Meta], key: &str) -> syn::Result<Option<LitStr>> {
    for meta in args {
        if let Meta::NameValue(nv) = meta {
            if nv.path.is_ident(key) {
                if let Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) = &nv.value
                {
                    return Ok(Some(s.clone()));
                }
                return Err(syn::Error::new(
                    nv.value.span(),
                    format!("{} must be a string literal", key),
                ));
            }
        }
    }
    Ok(None)
}

/// Field name as seen by criteria and records: `rename` or the identifier
/// with any `r#` prefix removed.
pub fn field_name(field: &Field, rename: Option<LitStr>) -> syn::Result<String> {
    if let Some(rename) = rename {
        return Ok(rename.value());
    }
    field
        .ident
        .as_ref()
        .map(|ident| ident.unraw().to_string())
        .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))
}

/// Syntactic check for `Option<_>` (also `std::option::Option<_>`).
pub fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}
