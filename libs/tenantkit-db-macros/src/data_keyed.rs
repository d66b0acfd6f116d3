use heck::ToUpperCamelCase;
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{Data, DeriveInput, spanned::Spanned};

/// Configuration parsed from `#[data_key(...)]` attributes
#[derive(Default)]
struct DataKeyConfig {
    col: Option<(String, Span)>,
    unfiltered: Option<Span>,
}

pub fn expand_derive_data_keyed(input: &DeriveInput) -> syn::Result<TokenStream> {
    if !matches!(&input.data, Data::Struct(_)) {
        return Err(syn::Error::new(
            input.span(),
            "#[derive(DataKeyed)] can only be applied to structs",
        ));
    }

    let config = parse_data_key_attrs(input)?;
    let entity_ident = syn::Ident::new("Entity", input.ident.span());

    let tokens = match (config.col, config.unfiltered) {
        (Some((col_name, span)), None) => {
            let col_ident = syn::Ident::new(&snake_to_upper_camel(&col_name), span);
            quote! {
                impl ::tenantkit_db::secure::DataKeyEntity for #entity_ident {
                    const IS_UNFILTERED: bool = false;

                    fn data_key_col() -> ::core::option::Option<Self::Column> {
                        ::core::option::Option::Some(Self::Column::#col_ident)
                    }
                }
            }
        }
        (None, Some(_)) => quote! {
            impl ::tenantkit_db::secure::DataKeyEntity for #entity_ident {
                const IS_UNFILTERED: bool = true;

                fn data_key_col() -> ::core::option::Option<Self::Column> {
                    ::core::option::Option::None
                }
            }
        },
        (None, None) => {
            return Err(syn::Error::new(
                input.ident.span(),
                "data_key: missing explicit decision: use `#[data_key(col = \"column_name\")]` or `#[data_key(unfiltered)]`",
            ));
        }
        (Some(_), Some(span)) => {
            return Err(syn::Error::new(
                span,
                "data_key: specify either `col` or `unfiltered`, not both",
            ));
        }
    };

    Ok(tokens)
}

fn parse_data_key_attrs(input: &DeriveInput) -> syn::Result<DataKeyConfig> {
    let mut config = DataKeyConfig::default();

    for attr in &input.attrs {
        if !attr.path().is_ident("data_key") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let span = meta.path.span();

            if meta.path.is_ident("unfiltered") {
                if config.unfiltered.is_some() {
                    return Err(meta.error("duplicate attribute 'unfiltered'"));
                }
                config.unfiltered = Some(span);
                return Ok(());
            }

            if meta.path.is_ident("col") {
                if config.col.is_some() {
                    return Err(meta.error("duplicate attribute 'col'"));
                }
                let lit: syn::LitStr = meta.value()?.parse()?;
                let value = lit.value();
                if value.trim().is_empty() {
                    return Err(syn::Error::new(lit.span(), "data_key: `col` must not be empty"));
                }
                config.col = Some((value, lit.span()));
                return Ok(());
            }

            Err(meta.error("Unknown attribute. Valid attributes: col, unfiltered"))
        })?;
    }

    Ok(config)
}

/// Convert `snake_case` to `UpperCamelCase` for enum variant names
fn snake_to_upper_camel(s: &str) -> String {
    s.to_upper_camel_case()
}
