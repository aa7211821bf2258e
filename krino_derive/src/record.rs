use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

use crate::shared::{
    field_name, has_flag, import_krino, is_option, named_fields, parse_args, reject_unknown,
    string_arg,
};

const FIELD_ARGS: &[&str] = &["nested", "opaque", "skip", "rename"];

pub fn derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate_record_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn generate_record_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let krino = import_krino();
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut arms = Vec::new();
    for field in named_fields(input, "Record")? {
        let args = parse_args(&field.attrs, "record")?;
        reject_unknown(&args, FIELD_ARGS)?;
        if has_flag(&args, "skip") {
            continue;
        }
        let Some(member) = field.ident.as_ref() else {
            continue;
        };
        let optional = is_option(&field.ty);

        let value = if has_flag(&args, "nested") {
            if optional {
                quote! { self.#member.as_ref().map(|r| #krino::FieldRef::Record(r)) }
            } else {
                quote! { Some(#krino::FieldRef::Record(&self.#member)) }
            }
        } else if has_flag(&args, "opaque") {
            if optional {
                quote! { self.#member.as_ref().map(|_| #krino::FieldRef::Opaque) }
            } else {
                quote! { Some(#krino::FieldRef::Opaque) }
            }
        } else if optional {
            quote! {
                self.#member
                    .as_ref()
                    .map(|v| #krino::FieldRef::Value(#krino::ToValue::to_value(v)))
            }
        } else {
            quote! { Some(#krino::FieldRef::Value(#krino::ToValue::to_value(&self.#member))) }
        };

        // answer to the camelCase spelling too, for FieldNaming::CamelCase
        let name = field_name(field, string_arg(&args, "rename")?)?;
        let camel = name.to_case(Case::Camel);
        let pattern = if camel != name {
            quote! { #name | #camel }
        } else {
            quote! { #name }
        };
        arms.push(quote! { #pattern => #value });
    }

    Ok(quote! {
        impl #impl_generics #krino::Record for #ident #ty_generics #where_clause {
            fn field(&self, name: &str) -> Option<#krino::FieldRef<'_>> {
                match name {
                    #(#arms,)*
                    _ => None,
                }
            }
        }
    })
}
