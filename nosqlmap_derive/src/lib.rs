use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, Fields, Ident, LitStr, Path, Type, parse_macro_input, spanned::Spanned,
};

/// Implements `nosqlmap::Entity` for a struct with named fields.
///
/// Every field is mapped unless marked `#[column(skip)]`; the struct must
/// implement `Default`.
///
/// Struct options, `#[entity(...)]`:
/// - `name = "..."` native record name, defaults to the struct name
/// - `parent = Type, discriminator = "..."` variant of a polymorphic parent,
///   lifted with `From<Self> for Type`
///
/// Field options, `#[column(...)]`:
/// - `id`, `name = "..."`
/// - `embedded`, `entity`, `embeddables`
/// - `converter = Type`
/// - `skip`
#[proc_macro_derive(Entity, attributes(entity, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct EntityOptions {
    name: Option<String>,
    parent: Option<Path>,
    discriminator: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Plain,
    Embedded,
    Entity,
    Embeddables,
}

impl FieldKind {
    fn label(self) -> &'static str {
        match self {
            FieldKind::Plain => "plain",
            FieldKind::Embedded => "embedded",
            FieldKind::Entity => "entity",
            FieldKind::Embeddables => "embeddables",
        }
    }
}

struct ColumnOptions {
    id: bool,
    name: Option<String>,
    kind: FieldKind,
    converter: Option<Type>,
    skip: bool,
}

impl Default for ColumnOptions {
    fn default() -> Self {
        Self {
            id: false,
            name: None,
            kind: FieldKind::Plain,
            converter: None,
            skip: false,
        }
    }
}

fn expand_entity(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "Entity does not support generic structs",
        ));
    }

    let options = parse_entity_options(&input.attrs)?;

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Entity can only be derived for structs; describe enums by hand",
            ));
        }
    };

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Entity requires named fields",
            ));
        }
    };

    let mut declarations = Vec::<TokenStream2>::new();
    let mut has_id = false;

    for field in named_fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Entity requires named fields"))?;
        let column = parse_column_options(&field.attrs)?;
        if column.skip {
            continue;
        }
        if column.id {
            if has_id {
                return Err(syn::Error::new(
                    field.span(),
                    "Only one field can be marked #[column(id)]",
                ));
            }
            has_id = true;
        }
        declarations.push(field_declaration(&ident, &column));
    }

    let record_name = options
        .name
        .clone()
        .unwrap_or_else(|| struct_name.to_string());

    let inheritance = match (&options.parent, &options.discriminator) {
        (Some(parent), Some(value)) => quote! {
            .inherits::<#parent, _>(#value, <#parent as ::core::convert::From<Self>>::from)
        },
        (None, None) => quote! {},
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "#[entity(parent = ..)] and #[entity(discriminator = \"..\")] must be used together",
            ));
        }
    };

    Ok(quote! {
        impl ::nosqlmap::mapping::Entity for #struct_name {
            fn descriptor() -> ::nosqlmap::mapping::EntityDescriptor {
                ::nosqlmap::mapping::EntityDescriptor::builder::<Self>(#record_name)
                    .with_default()
                    #(#declarations)*
                    #inheritance
                    .build()
            }
        }
    })
}

fn field_declaration(ident: &Ident, column: &ColumnOptions) -> TokenStream2 {
    let field_name = ident.to_string();
    let mut column_expr = quote! { ::nosqlmap::mapping::Column::new(#field_name) };
    if column.id {
        column_expr = quote! { #column_expr.id() };
    }
    if let Some(name) = &column.name {
        column_expr = quote! { #column_expr.named(#name) };
    }

    let get = quote! { |entity: &Self| &entity.#ident };
    let set = quote! { |entity, value| entity.#ident = value };

    if let Some(converter) = &column.converter {
        return quote! { .converted::<#converter, _, _>(#column_expr, #get, #set) };
    }

    match column.kind {
        FieldKind::Plain => quote! { .field(#column_expr, #get, #set) },
        FieldKind::Embedded => quote! { .embedded(#column_expr, #get, #set) },
        FieldKind::Entity => quote! { .entity(#column_expr, #get, #set) },
        FieldKind::Embeddables => quote! { .embeddables(#column_expr, #get, #set) },
    }
}

fn parse_entity_options(attrs: &[syn::Attribute]) -> syn::Result<EntityOptions> {
    let mut options = EntityOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                options.name = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("parent") {
                options.parent = Some(meta.value()?.parse()?);
                return Ok(());
            }

            if meta.path.is_ident("discriminator") {
                let lit: LitStr = meta.value()?.parse()?;
                options.discriminator = Some(lit.value());
                return Ok(());
            }

            Err(meta.error(
                "Unsupported entity attribute. Supported: name = \"...\", parent = Type, discriminator = \"...\"",
            ))
        })?;
    }

    Ok(options)
}

fn parse_column_options(attrs: &[syn::Attribute]) -> syn::Result<ColumnOptions> {
    let mut options = ColumnOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("column") {
            continue;
        }

        if let syn::Meta::Path(_) = &attr.meta {
            continue;
        }

        let mut set_kind = |kind: FieldKind, span: proc_macro2::Span| -> syn::Result<()> {
            if options.kind != FieldKind::Plain && options.kind != kind {
                return Err(syn::Error::new(
                    span,
                    format!(
                        "#[column({})] cannot be combined with #[column({})]",
                        kind.label(),
                        options.kind.label()
                    ),
                ));
            }
            options.kind = kind;
            Ok(())
        };

        let mut id = false;
        let mut name = None;
        let mut converter = None;
        let mut skip = false;

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                id = true;
                return Ok(());
            }

            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                name = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("embedded") {
                return set_kind(FieldKind::Embedded, meta.path.span());
            }

            if meta.path.is_ident("entity") {
                return set_kind(FieldKind::Entity, meta.path.span());
            }

            if meta.path.is_ident("embeddables") {
                return set_kind(FieldKind::Embeddables, meta.path.span());
            }

            if meta.path.is_ident("converter") {
                converter = Some(meta.value()?.parse::<Type>()?);
                return Ok(());
            }

            if meta.path.is_ident("skip") {
                skip = true;
                return Ok(());
            }

            Err(meta.error(
                "Unsupported #[column(...)] option. Supported: id, name = \"...\", embedded, entity, embeddables, converter = Type, skip",
            ))
        })?;

        options.id |= id;
        options.skip |= skip;
        if name.is_some() {
            options.name = name;
        }
        if converter.is_some() {
            options.converter = converter;
        }
    }

    if options.converter.is_some() && options.kind != FieldKind::Plain {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[column(converter = ..)] only applies to plain attributes",
        ));
    }

    if options.skip && (options.id || options.name.is_some()) {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[column(skip)] cannot be combined with other column options",
        ));
    }

    Ok(options)
}
