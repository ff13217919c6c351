//! `#[derive(BusinessObject)]` registers `bo` as a helper attribute so
//! declaration files compile as ordinary Rust. The attributes themselves are
//! read by the boforge generator, not by the compiler.

use proc_macro::TokenStream;

#[proc_macro_derive(BusinessObject, attributes(bo))]
pub fn business_object(_input: TokenStream) -> TokenStream {
    TokenStream::new()
}
