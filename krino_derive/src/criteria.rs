use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, ExprPath, LitStr, parse_macro_input};

use crate::shared::{
    field_name, has_flag, import_krino, is_option, named_fields, parse_args, reject_unknown,
    string_arg,
};

const STRUCT_ARGS: &[&str] = &["name", "init", "validate"];
const FIELD_ARGS: &[&str] = &[
    "flatten",
    "nested",
    "skip",
    "rename",
    "includes",
    "includes_limitation",
];

pub fn derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate_criteria_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn hook_path(lit: Option<LitStr>) -> syn::Result<Option<ExprPath>> {
    lit.map(|lit| lit.parse::<ExprPath>()).transpose()
}

fn generate_criteria_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let krino = import_krino();
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // --- struct attributes ---
    let struct_args = parse_args(&input.attrs, "criteria")?;
    reject_unknown(&struct_args, STRUCT_ARGS)?;
    let name = string_arg(&struct_args, "name")?
        .map(|lit| lit.value())
        .unwrap_or_else(|| ident.to_string());
    let init = hook_path(string_arg(&struct_args, "init")?)?;
    let validate = hook_path(string_arg(&struct_args, "validate")?)?;

    // --- fields ---
    let mut registrations = Vec::new();
    let mut includes = None;
    let mut limitation = None;
    let mut first_flattened = None;

    for field in named_fields(input, "Criteria")? {
        let args = parse_args(&field.attrs, "criteria")?;
        reject_unknown(&args, FIELD_ARGS)?;
        if has_flag(&args, "skip") {
            continue;
        }

        let Some(member) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;

        if has_flag(&args, "includes") {
            includes = Some(member);
            continue;
        }
        if has_flag(&args, "includes_limitation") {
            limitation = Some(member);
            continue;
        }

        if has_flag(&args, "flatten") {
            registrations.push(quote! {
                table.flatten::<#ty>(|c: &Self| &c.#member);
            });
            first_flattened.get_or_insert(member);
            continue;
        }

        let field_name = field_name(field, string_arg(&args, "rename")?)?;

        if has_flag(&args, "nested") {
            let getter = if is_option(ty) {
                quote! { c.#member.as_ref().map(|n| n as &dyn #krino::CriteriaNode) }
            } else {
                quote! { Some(&c.#member as &dyn #krino::CriteriaNode) }
            };
            registrations.push(quote! {
                table.nested(#field_name, |c: &Self| #getter);
            });
        } else {
            let getter = if is_option(ty) {
                quote! { c.#member.as_ref().map(|f| f as &dyn #krino::FieldFilter) }
            } else {
                quote! { Some(&c.#member as &dyn #krino::FieldFilter) }
            };
            registrations.push(quote! {
                table.filter(#field_name, |c: &Self| #getter);
            });
        }
    }

    // --- projection: own fields first, else the first embedded criteria ---
    let includes_fn = match (includes, first_flattened) {
        (Some(member), _) => Some(quote! {
            fn includes(&self) -> Option<&::std::collections::BTreeSet<String>> {
                self.#member.as_ref()
            }
        }),
        (None, Some(member)) => Some(quote! {
            fn includes(&self) -> Option<&::std::collections::BTreeSet<String>> {
                #krino::Criteria::includes(&self.#member)
            }
        }),
        (None, None) => None,
    };
    let limitation_fn = match (limitation, first_flattened) {
        (Some(member), _) => Some(quote! {
            fn includes_limitation(&self) -> Option<&::std::collections::BTreeSet<String>> {
                self.#member.as_ref()
            }
        }),
        (None, Some(member)) => Some(quote! {
            fn includes_limitation(&self) -> Option<&::std::collections::BTreeSet<String>> {
                #krino::Criteria::includes_limitation(&self.#member)
            }
        }),
        (None, None) => None,
    };

    let init_fn = init.map(|path| {
        quote! {
            fn init(&mut self) {
                #path(self)
            }
        }
    });
    let validate_fn = validate.map(|path| {
        quote! {
            fn validate(&self) -> Result<(), #krino::Error> {
                #path(self)
            }
        }
    });

    Ok(quote! {
        impl #impl_generics #krino::Criteria for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;

            fn accessor_table() -> #krino::AccessorTable<Self> {
                let mut table = #krino::AccessorTable::new(<Self as #krino::Criteria>::NAME);
                #(#registrations)*
                table
            }

            #includes_fn
            #limitation_fn
            #init_fn
            #validate_fn
        }
    })
}
