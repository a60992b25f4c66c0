use crate::injectable::expand_injectable;
use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, Error};

mod attributes;
mod injectable;

/// Derives `Injectable` for a struct. Fields marked with `#[inject]` or `#[inject("...")]` are
/// injected in declaration order; `#[inject(init)]` on the struct runs `Initializable::init`
/// afterwards.
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn generate_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_injectable(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}
