//! Derive macros for `scim-marshal`.
//!
//! `#[derive(Encode)]` and `#[derive(Decode)]` generate the field descriptors the codec walks.
//! Each field may carry a mapping declaration, `#[scim("emails.value,mV")]`; a field without
//! one maps to its identifier in lowerCamelCase. `#[scim(custom)]` on the type defers the
//! whole value to its `Marshal` / `Unmarshal` implementation instead.

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, parse_quote, Data, DataStruct, DeriveInput, Fields, Ident, LitStr};

#[proc_macro_derive(Encode, attributes(scim))]
pub fn encode_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    impl_encode(&ast)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[proc_macro_derive(Decode, attributes(scim))]
pub fn decode_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    impl_decode(&ast)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn is_custom(ast: &DeriveInput) -> syn::Result<bool> {
    let mut custom = false;
    for attr in ast.attrs.iter().filter(|a| a.path().is_ident("scim")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("custom") {
                custom = true;
                Ok(())
            } else {
                Err(meta.error("expected `custom`"))
            }
        })?;
    }
    Ok(custom)
}

struct MappedField<'a> {
    ident: &'a Ident,
    decl: TokenStream2,
}

fn mapped_fields(ast: &DeriveInput) -> syn::Result<Vec<MappedField<'_>>> {
    let named = match &ast.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(named),
            ..
        }) => &named.named,
        Data::Struct(DataStruct {
            fields: Fields::Unit,
            ..
        }) => return Ok(Vec::new()),
        _ => {
            return Err(syn::Error::new_spanned(
                &ast.ident,
                "only structs with named fields can be mapped; use #[scim(custom)] otherwise",
            ))
        }
    };
    let mut out = Vec::new();
    for field in named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let mut tag: Option<LitStr> = None;
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("scim")) {
            tag = Some(attr.parse_args::<LitStr>()?);
        }
        let name = ident.to_string();
        let decl = match tag {
            Some(tag) => quote! { (#name, ::core::option::Option::Some(#tag)) },
            None => quote! { (#name, ::core::option::Option::None) },
        };
        out.push(MappedField { ident, decl });
    }
    Ok(out)
}

fn impl_encode(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &ast.ident;
    let mut generics = ast.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::scim_marshal::Encode));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    if is_custom(ast)? {
        return Ok(quote! {
            impl #impl_generics ::scim_marshal::Encode for #name #ty_generics #where_clause {
                fn node(&self) -> ::scim_marshal::Node<'_> {
                    ::scim_marshal::Node::Custom(self)
                }
            }
        });
    }

    let fields = mapped_fields(ast)?;
    let decls = fields.iter().map(|f| &f.decl);
    let idx = 0..fields.len();
    let ident = fields.iter().map(|f| f.ident);
    Ok(quote! {
        impl #impl_generics ::scim_marshal::Encode for #name #ty_generics #where_clause {
            fn node(&self) -> ::scim_marshal::Node<'_> {
                ::scim_marshal::Node::Record(self)
            }
        }

        impl #impl_generics ::scim_marshal::Record for #name #ty_generics #where_clause {
            fn fields(
                &self,
            ) -> ::core::result::Result<::std::vec::Vec<::scim_marshal::Field<'_>>, ::scim_marshal::Error> {
                static SPECS: ::scim_marshal::tag::SpecCell = ::scim_marshal::tag::SpecCell::new();
                #[allow(unused_variables)]
                let specs = ::scim_marshal::tag::cached(&SPECS, &[#(#decls),*])?;
                ::core::result::Result::Ok(::std::vec![
                    #( ::scim_marshal::Field::new(&specs[#idx], &self.#ident) ),*
                ])
            }
        }
    })
}

fn impl_decode(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &ast.ident;
    let mut generics = ast.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::scim_marshal::Decode));
        param.bounds.push(parse_quote!(::core::default::Default));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let decode_value = quote! {
        fn decode_value(
            &mut self,
            value: &::scim_marshal::Value,
            field: &str,
        ) -> ::core::result::Result<(), ::scim_marshal::Error> {
            ::scim_marshal::decode::decode_record(self, value, field)
        }
    };

    if is_custom(ast)? {
        return Ok(quote! {
            impl #impl_generics ::scim_marshal::Decode for #name #ty_generics #where_clause {
                #decode_value

                fn decode_resource(
                    &mut self,
                    resource: &::scim_marshal::Resource,
                ) -> ::core::result::Result<(), ::scim_marshal::Error> {
                    ::scim_marshal::Unmarshal::unmarshal_scim(self, resource)
                }
            }
        });
    }

    let fields = mapped_fields(ast)?;
    let decls = fields.iter().map(|f| &f.decl);
    let idx = 0..fields.len();
    let ident = fields.iter().map(|f| f.ident);
    Ok(quote! {
        impl #impl_generics ::scim_marshal::Decode for #name #ty_generics #where_clause {
            #decode_value

            fn decode_resource(
                &mut self,
                resource: &::scim_marshal::Resource,
            ) -> ::core::result::Result<(), ::scim_marshal::Error> {
                static SPECS: ::scim_marshal::tag::SpecCell = ::scim_marshal::tag::SpecCell::new();
                #[allow(unused_variables)]
                let specs = ::scim_marshal::tag::cached(&SPECS, &[#(#decls),*])?;
                #( ::scim_marshal::decode::decode_field(&specs[#idx], resource, &mut self.#ident)?; )*
                ::core::result::Result::Ok(())
            }
        }
    })
}
