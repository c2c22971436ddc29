use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, parse_quote, Data, DeriveInput, Fields};

/// Derive macro implementing `copier::Mappable` for a struct.
///
/// Generates the static shape (field names, embedded flags, field shapes)
/// and the conversions into and out of `copier::Value`.
///
/// # Example
///
/// ```ignore
/// #[derive(Mappable, Default)]
/// pub struct Order {
///     pub id: String,
///     pub created_at: DateTime<Utc>,
///
///     /// Fields of `Audit` are promoted into `Order`.
///     #[copier(embed)]
///     pub audit: Audit,
///
///     /// Not visible to the copier; rebuilt with `Default`.
///     #[copier(skip)]
///     pub cache: Vec<u8>,
/// }
/// ```
///
/// Every non-skipped field type must implement `Mappable`.
#[proc_macro_derive(Mappable, attributes(copier))]
pub fn derive_mappable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;
    let name_str = name.to_string();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Mappable only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Mappable only supports structs",
            ))
        }
    };

    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "Mappable types must be 'static; lifetime parameters are not supported",
        ));
    }

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::copier::Mappable));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut shape_tokens = Vec::new();
    let mut to_value_tokens = Vec::new();
    let mut from_value_tokens = Vec::new();
    let mut take_tokens = Vec::new();
    let mut assign_tokens = Vec::new();

    for field in fields {
        let field_name = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new_spanned(field, "expected named field")
        })?;
        let field_name_str = field_name.to_string();
        let field_ty = &field.ty;

        // Parse #[copier(...)] attribute.
        let mut embed = false;
        let mut skip = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("copier") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("embed") {
                    embed = true;
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    skip = true;
                    Ok(())
                } else {
                    Err(meta.error("unknown copier attribute (expected 'embed' or 'skip')"))
                }
            })?;
        }

        if embed && skip {
            return Err(syn::Error::new_spanned(
                field_name,
                "a field cannot be both #[copier(embed)] and #[copier(skip)]",
            ));
        }

        if skip {
            from_value_tokens.push(quote! {
                #field_name: ::core::default::Default::default()
            });
            continue;
        }

        shape_tokens.push(quote! {
            ::copier::FieldShape::new(#field_name_str, #embed, <#field_ty as ::copier::Mappable>::shape)
        });

        to_value_tokens.push(quote! {
            ::copier::FieldValue::new(
                #field_name_str,
                #embed,
                ::copier::Mappable::to_value(&self.#field_name),
            )
        });

        let take = quote! {
            __fields.take(#field_name_str).ok_or_else(|| ::copier::CopyError::mismatch(
                format!("field '{}' of {}", #field_name_str, #name_str),
                "no such field",
            ))?
        };

        from_value_tokens.push(quote! {
            #field_name: <#field_ty as ::copier::Mappable>::from_value(#take)?
        });

        // Write-back takes every field first, so a missing one fails before
        // anything in `self` changes.
        let local = format_ident!("__field_{}", field_name);
        take_tokens.push(quote! {
            let #local = #take;
        });
        assign_tokens.push(quote! {
            ::copier::Mappable::assign(&mut self.#field_name, #local)?;
        });
    }

    let expanded = quote! {
        impl #impl_generics ::copier::Mappable for #name #ty_generics #where_clause {
            fn shape() -> ::copier::Shape {
                ::copier::Shape::Struct(::copier::StructShape::new(
                    ::copier::TypeKey::of::<Self>(),
                    vec![
                        #(#shape_tokens),*
                    ],
                ))
            }

            fn to_value(&self) -> ::copier::Value {
                ::copier::Value::Struct(::copier::StructValue::new(
                    ::copier::TypeKey::of::<Self>(),
                    vec![
                        #(#to_value_tokens),*
                    ],
                ))
            }

            #[allow(unused_mut, unused_variables)]
            fn from_value(__value: ::copier::Value) -> Result<Self, ::copier::CopyError> {
                let mut __fields = match __value {
                    ::copier::Value::Struct(s) => s,
                    other => {
                        return Err(::copier::CopyError::mismatch(
                            ::copier::TypeKey::of::<Self>().name(),
                            other.type_name(),
                        ))
                    }
                };
                Ok(Self {
                    #(#from_value_tokens),*
                })
            }

            /// Updates reflected fields in place; skipped fields keep their value.
            #[allow(unused_mut, unused_variables)]
            fn assign(&mut self, __value: ::copier::Value) -> Result<(), ::copier::CopyError> {
                let mut __fields = match __value {
                    ::copier::Value::Struct(s) => s,
                    other => {
                        return Err(::copier::CopyError::mismatch(
                            ::copier::TypeKey::of::<Self>().name(),
                            other.type_name(),
                        ))
                    }
                };
                #(#take_tokens)*
                #(#assign_tokens)*
                Ok(())
            }
        }
    };

    Ok(TokenStream::from(expanded))
}
