use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, Lit, LitStr, Meta, Token, Visibility};

const ENV_KEY: &str = "env";

/// One argument of `#[env(...)]`: either the bare tag string or `key = literal`
enum EnvArg {
    Tag(LitStr),
    Pair(syn::Ident, Lit),
}

impl Parse for EnvArg {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitStr) {
            return Ok(EnvArg::Tag(input.parse()?));
        }

        let key = syn::Ident::parse_any(input)?;
        input.parse::<Token![=]>()?;
        let value: Lit = input.parse()?;
        Ok(EnvArg::Pair(key, value))
    }
}

/// Derives `Record` and `EnvValue` for a struct with named fields
///
/// Fields are configured with `#[env(...)]`:
///
/// ```ignore
/// #[derive(Env, Default)]
/// pub struct Config {
///     /// Shown in the generated documentation
///     #[env("PORT,noprefix", default = 8080)]
///     pub port: u16,
///     #[env(",inline")]
///     pub database: Database,
///     #[env("-")]
///     pub ignored: String,
/// }
/// ```
///
/// The leading string is the tag: a variable name followed by the options
/// `inline`, `include` and `noprefix`. Any other `key = literal` pair is kept
/// as a tag under that key, `default` and `doc` are understood by the
/// library.
#[proc_macro_derive(Env, attributes(env))]
pub fn derive_env(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_env(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_env(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Extract fields from the struct
    let fields: Vec<&syn::Field> = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields.named.iter().collect(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "#[derive(Env)] only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "#[derive(Env)] only supports structs",
            ));
        }
    };

    let mut field_defs = Vec::new();
    let mut field_refs = Vec::new();
    let mut field_muts = Vec::new();

    for (idx, field) in fields.iter().enumerate() {
        let Some(field_ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "field must be named"));
        };

        let config = parse_field_config(&field.attrs)?;
        let name = field_ident.unraw().to_string();
        let field_type = &field.ty;
        let ty = quote!(#field_type).to_string().replace(' ', "");
        let exported = !matches!(field.vis, Visibility::Inherited);
        let docs = config.docs;
        let keys = config.tags.iter().map(|(k, _)| k);
        let values = config.tags.iter().map(|(_, v)| v);

        field_defs.push(quote! {
            ::env_loadr::FieldDef {
                name: #name,
                ty: #ty,
                exported: #exported,
                tags: &[#((#keys, #values)),*],
                docs: #docs,
            }
        });
        field_refs.push(quote! {
            ::env_loadr::Field::new(&defs[#idx], ::env_loadr::EnvValue::env_ref(&self.#field_ident))
        });
        field_muts.push(quote! {
            ::env_loadr::Field::new(&defs[#idx], ::env_loadr::EnvValue::env_mut(&mut self.#field_ident))
        });
    }

    Ok(quote! {
        impl #impl_generics ::env_loadr::Record for #struct_name #ty_generics #where_clause {
            fn type_name(&self) -> &'static str {
                ::core::any::type_name::<Self>()
            }

            fn field_defs(&self) -> &'static [::env_loadr::FieldDef] {
                static FIELDS: &[::env_loadr::FieldDef] = &[#(#field_defs),*];
                FIELDS
            }

            #[allow(unused_variables)]
            fn fields(&self) -> ::std::vec::Vec<::env_loadr::Field<::env_loadr::ValueRef<'_>>> {
                let defs = ::env_loadr::Record::field_defs(self);
                ::std::vec![#(#field_refs),*]
            }

            #[allow(unused_variables)]
            fn fields_mut(&mut self) -> ::std::vec::Vec<::env_loadr::Field<::env_loadr::ValueMut<'_>>> {
                let defs = ::env_loadr::Record::field_defs(self);
                ::std::vec![#(#field_muts),*]
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }
        }

        impl #impl_generics ::env_loadr::EnvValue for #struct_name #ty_generics #where_clause {
            fn env_ref(&self) -> ::env_loadr::ValueRef<'_> {
                ::env_loadr::ValueRef::Record(self)
            }

            fn env_mut(&mut self) -> ::env_loadr::ValueMut<'_> {
                ::env_loadr::ValueMut::Record(self)
            }
        }
    })
}

#[derive(Debug, Default)]
struct FieldConfig {
    tags: Vec<(String, String)>,
    docs: String,
}

impl FieldConfig {
    fn insert(&mut self, attr: &Attribute, key: String, value: String) -> syn::Result<()> {
        if self.tags.iter().any(|(k, _)| *k == key) {
            return Err(syn::Error::new_spanned(
                attr,
                format!("duplicate `{}` in #[env(...)]", key),
            ));
        }
        self.tags.push((key, value));
        Ok(())
    }
}

/// Parse #[env("NAME,opts", default = "x", doc = "...")] and doc comments
fn parse_field_config(attrs: &[Attribute]) -> syn::Result<FieldConfig> {
    let mut config = FieldConfig::default();
    let mut docs = Vec::new();

    for attr in attrs {
        if attr.path().is_ident("doc") {
            if let Meta::NameValue(nv) = &attr.meta {
                if let Expr::Lit(syn::ExprLit {
                    lit: Lit::Str(s), ..
                }) = &nv.value
                {
                    docs.push(s.value().trim().to_string());
                }
            }
            continue;
        }
        if !attr.path().is_ident(ENV_KEY) {
            continue;
        }

        match &attr.meta {
            // #[env] marks the field as tagged, for strict mode
            Meta::Path(_) => config.insert(attr, ENV_KEY.to_string(), String::new())?,
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(syn::ExprLit {
                    lit: Lit::Str(s), ..
                }) => config.insert(attr, ENV_KEY.to_string(), s.value())?,
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "expected a string literal: #[env = \"NAME\"]",
                    ));
                }
            },
            Meta::List(list) => {
                let args = list.parse_args_with(Punctuated::<EnvArg, Token![,]>::parse_terminated)?;
                for arg in args {
                    match arg {
                        EnvArg::Tag(s) => config.insert(attr, ENV_KEY.to_string(), s.value())?,
                        EnvArg::Pair(key, value) => {
                            let key = key.unraw().to_string();
                            config.insert(attr, key, lit_text(&value)?)?;
                        }
                    }
                }
            }
        }
    }

    config.docs = docs.join("\n").trim().to_string();
    Ok(config)
}

fn lit_text(lit: &Lit) -> syn::Result<String> {
    match lit {
        Lit::Str(s) => Ok(s.value()),
        Lit::Int(i) => Ok(i.base10_digits().to_string()),
        Lit::Float(f) => Ok(f.base10_digits().to_string()),
        Lit::Bool(b) => Ok(b.value.to_string()),
        Lit::Char(c) => Ok(c.value().to_string()),
        other => Err(syn::Error::new_spanned(
            other,
            "expected a string, number, bool or char literal",
        )),
    }
}
