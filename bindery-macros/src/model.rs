//! `#[derive(ModelState)]`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Index, LitStr, parse_macro_input};

/// Implementation of the `ModelState` derive.
pub(crate) fn derive_model_state_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return syn::Error::new_spanned(&input.ident, "ModelState can only be derived for structs")
            .to_compile_error()
            .into();
    };

    let (accessors, names): (Vec<_>, Vec<_>) = match &data.fields {
        Fields::Named(fields) => fields
            .named
            .iter()
            .filter_map(|f| f.ident.as_ref())
            .map(|ident| {
                let name = LitStr::new(&ident.to_string(), ident.span());
                (quote! { #ident }, name)
            })
            .unzip(),
        Fields::Unnamed(fields) => fields
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let index = Index::from(i);
                let name = LitStr::new(&i.to_string(), proc_macro2::Span::call_site());
                (quote! { #index }, name)
            })
            .unzip(),
        Fields::Unit => (Vec::new(), Vec::new()),
    };

    let expanded = quote! {
        impl #impl_generics ::bindery::ModelState for #name #ty_generics #where_clause {
            #[allow(unused_mut)]
            fn changed_fields(&self, previous: &Self) -> ::bindery::ChangeSet {
                let mut changed = ::bindery::ChangeSet::new();
                #(
                    if self.#accessors != previous.#accessors {
                        changed.insert(#names);
                    }
                )*
                changed
            }

            fn field(&self, name: &str) -> ::bindery::Value {
                match name {
                    #(#names => ::bindery::ToValue::to_value(&self.#accessors),)*
                    _ => ::bindery::Value::Undefined,
                }
            }
        }
    };

    TokenStream::from(expanded)
}
