mod criteria;
mod record;
mod shared;

use proc_macro::TokenStream;

/// Implements `krino::Criteria` with an accessor table built from the
/// struct's fields.
///
/// Fields default to filters (`FilterValue<T>` or `Option<FilterValue<T>>`).
/// Field arguments: `flatten`, `nested`, `skip`, `rename = "..."`,
/// `includes`, `includes_limitation`. Struct arguments: `name = "..."`,
/// `init = "path"`, `validate = "path"`.
#[proc_macro_derive(Criteria, attributes(criteria))]
pub fn derive_criteria(input: TokenStream) -> TokenStream {
    criteria::derive(input)
}

/// Implements `krino::Record` over the struct's fields.
///
/// Fields default to scalars implementing `ToValue`. Field arguments:
/// `nested`, `opaque`, `skip`, `rename = "..."`.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive(input)
}
