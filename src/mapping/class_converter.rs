//! Builds [`EntityMetadata`] from a declared [`EntityDescriptor`].

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use log::trace;

use crate::config::MappingConfig;
use crate::core::{MapperError, Result};
use crate::mapping::descriptor::{EntityDescriptor, FieldDescriptor, TypeRef};
use crate::mapping::field::{FieldMapping, MappingType};
use crate::mapping::metadata::{
    EntityMetadata, InheritanceMetadata, NativeMapping, PolymorphicMetadata,
};

#[derive(Debug, Clone, Default)]
pub struct ClassConverter {
    config: MappingConfig,
}

impl ClassConverter {
    pub fn new(config: MappingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    pub fn create(&self, descriptor: &EntityDescriptor) -> Result<EntityMetadata> {
        let start = Instant::now();
        let type_ref = descriptor.type_ref;

        let fields = self.to_mappings(descriptor)?;
        let mut record_keys = HashSet::new();
        self.check_record_keys(&fields, &mut record_keys, &mut vec![type_ref.type_id()])?;

        if descriptor.instance_supplier.is_none()
            && descriptor.constructor.is_none()
            && descriptor.polymorphic.is_none()
        {
            return Err(MapperError::Configuration(format!(
                "{} declares neither an instance supplier nor a constructor",
                type_ref.type_name()
            )));
        }

        if !descriptor.variants.is_empty() && descriptor.polymorphic.is_none() {
            return Err(MapperError::Configuration(format!(
                "{} registers variants but is not polymorphic",
                type_ref.type_name()
            )));
        }

        let mut name = descriptor.name.clone();
        let inheritance = match &descriptor.inheritance {
            Some(inheritance) => {
                let parent = inheritance.parent.descriptor();
                let Some(polymorphic) = &parent.polymorphic else {
                    return Err(MapperError::Configuration(format!(
                        "{} inherits from {} which is not polymorphic",
                        type_ref.type_name(),
                        inheritance.parent.type_name()
                    )));
                };
                // variants share the record name of their parent
                name = parent.name.clone();
                Some(InheritanceMetadata {
                    discriminator_column: self.discriminator_column(polymorphic.column.as_deref()),
                    discriminator_value: inheritance.value.clone(),
                    parent: inheritance.parent.type_id(),
                    entity: type_ref,
                    lift: Arc::clone(&inheritance.lift),
                })
            }
            None => None,
        };

        let polymorphic = descriptor
            .polymorphic
            .as_ref()
            .map(|polymorphic| PolymorphicMetadata {
                discriminator_column: self.discriminator_column(polymorphic.column.as_deref()),
                as_concrete: Arc::clone(&polymorphic.as_concrete),
                variants: descriptor.variants.clone(),
            });

        let mut native_paths = BTreeMap::new();
        let mut visiting = vec![type_ref.type_id()];
        self.index_paths(&fields, "", "", &mut native_paths, &mut visiting)?;

        let fields_by_name: HashMap<String, Arc<FieldMapping>> = fields
            .iter()
            .map(|field| (field.name.clone(), Arc::clone(field)))
            .collect();

        trace!(
            "Scanned {} as '{}' with {} fields in {:?}",
            type_ref.type_name(),
            name,
            fields.len(),
            start.elapsed()
        );

        Ok(EntityMetadata {
            name,
            type_ref,
            fields,
            fields_by_name,
            native_paths,
            instance_supplier: descriptor.instance_supplier.clone(),
            constructor: descriptor.constructor.clone(),
            inheritance,
            polymorphic,
        })
    }

    fn discriminator_column(&self, declared: Option<&str>) -> String {
        declared
            .map(str::to_string)
            .unwrap_or_else(|| self.config.default_discriminator_column.clone())
    }

    fn to_mapping(&self, field: &FieldDescriptor) -> FieldMapping {
        let column = &field.column;
        let name = match &column.name {
            Some(name) => name.clone(),
            None if column.id => self.config.default_id_column.clone(),
            None => column.field_name.clone(),
        };

        FieldMapping {
            name,
            field_name: column.field_name.clone(),
            kind: field.kind,
            id: column.id,
            converter: field.converter,
            element: field.element,
            coerce: field.coerce,
            reader: Arc::clone(&field.reader),
            writer: Arc::clone(&field.writer),
        }
    }

    fn to_mappings(&self, descriptor: &EntityDescriptor) -> Result<Vec<Arc<FieldMapping>>> {
        let type_name = descriptor.type_ref.type_name();
        let mut fields = Vec::with_capacity(descriptor.fields.len());
        let mut names = HashSet::new();
        let mut attributes = HashSet::new();
        let mut id: Option<String> = None;

        for field in &descriptor.fields {
            let mapping = self.to_mapping(field);

            if mapping.id {
                if let Some(existing) = &id {
                    return Err(MapperError::Configuration(format!(
                        "{} declares more than one id field: '{}' and '{}'",
                        type_name, existing, mapping.field_name
                    )));
                }
                id = Some(mapping.field_name.clone());
            }

            if !attributes.insert(mapping.field_name.clone()) {
                return Err(MapperError::Configuration(format!(
                    "{} declares attribute '{}' twice",
                    type_name, mapping.field_name
                )));
            }

            if !names.insert(mapping.name.clone()) {
                return Err(MapperError::Configuration(format!(
                    "{} maps more than one attribute to native key '{}'",
                    type_name, mapping.name
                )));
            }

            fields.push(Arc::new(mapping));
        }

        Ok(fields)
    }

    fn element_fields(&self, element: &TypeRef) -> Result<Vec<Arc<FieldMapping>>> {
        self.to_mappings(&element.descriptor())
    }

    /// Embedded attributes share the record level of their owner, so their
    /// keys must not collide with the owner's keys.
    fn check_record_keys(
        &self,
        fields: &[Arc<FieldMapping>],
        keys: &mut HashSet<String>,
        visiting: &mut Vec<TypeId>,
    ) -> Result<()> {
        for field in fields {
            match (field.kind, field.element) {
                (MappingType::Embedded, Some(element)) => {
                    if visiting.contains(&element.type_id()) {
                        return Err(MapperError::Configuration(format!(
                            "{} embeds itself through '{}'",
                            element.type_name(),
                            field.field_name
                        )));
                    }
                    visiting.push(element.type_id());
                    let children = self.element_fields(&element)?;
                    self.check_record_keys(&children, keys, visiting)?;
                    visiting.pop();
                }
                _ => {
                    if !keys.insert(field.name.clone()) {
                        return Err(MapperError::Configuration(format!(
                            "Native key '{}' is produced by more than one attribute",
                            field.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn index_paths(
        &self,
        fields: &[Arc<FieldMapping>],
        java_prefix: &str,
        native_prefix: &str,
        paths: &mut BTreeMap<String, NativeMapping>,
        visiting: &mut Vec<TypeId>,
    ) -> Result<()> {
        for field in fields {
            let java_path = format!("{}{}", java_prefix, field.field_name);

            let child_native_prefix = match (field.kind, field.element) {
                (MappingType::Embedded, Some(_)) => native_prefix.to_string(),
                (MappingType::Entity | MappingType::Collection, Some(_)) => {
                    format!("{}{}.", native_prefix, field.name)
                }
                _ => {
                    paths.insert(
                        java_path,
                        NativeMapping {
                            native_field: format!("{}{}", native_prefix, field.name),
                            field: Arc::clone(field),
                        },
                    );
                    continue;
                }
            };

            let Some(element) = field.element else {
                continue;
            };

            let mut children = BTreeMap::new();
            if !visiting.contains(&element.type_id()) {
                visiting.push(element.type_id());
                let element_fields = self.element_fields(&element)?;
                self.index_paths(
                    &element_fields,
                    &format!("{}.", java_path),
                    &child_native_prefix,
                    &mut children,
                    visiting,
                )?;
                visiting.pop();
            }

            let native_field = if children.is_empty() {
                format!("{}{}", native_prefix, field.name)
            } else {
                children
                    .values()
                    .map(|child: &NativeMapping| child.native_field.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            };
            paths.insert(
                java_path,
                NativeMapping {
                    native_field,
                    field: Arc::clone(field),
                },
            );
            paths.extend(children);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::descriptor::{Column, Entity};

    #[derive(Debug, Default)]
    struct ZipCode {
        zip: String,
        plus_four: String,
    }

    impl Entity for ZipCode {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::builder::<ZipCode>("ZipCode")
                .with_default()
                .field("zip", |z: &ZipCode| &z.zip, |z, v| z.zip = v)
                .field(
                    Column::new("plus_four").named("plusFour"),
                    |z: &ZipCode| &z.plus_four,
                    |z, v| z.plus_four = v,
                )
                .build()
        }
    }

    #[derive(Debug, Default)]
    struct Address {
        street: String,
        zip_code: ZipCode,
    }

    impl Entity for Address {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::builder::<Address>("Address")
                .with_default()
                .field("street", |a: &Address| &a.street, |a, v| a.street = v)
                .embedded(
                    "zipCode",
                    |a: &Address| &a.zip_code,
                    |a, v| a.zip_code = v,
                )
                .build()
        }
    }

    #[derive(Debug, Default)]
    struct Customer {
        id: i64,
        address: Address,
    }

    impl Entity for Customer {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::builder::<Customer>("Customer")
                .with_default()
                .field(Column::new("id").id(), |c: &Customer| &c.id, |c, v| c.id = v)
                .entity("address", |c: &Customer| &c.address, |c, v| c.address = v)
                .build()
        }
    }

    #[derive(Debug, Default)]
    struct TwoIds {
        first: i64,
        second: i64,
    }

    impl Entity for TwoIds {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::builder::<TwoIds>("TwoIds")
                .with_default()
                .field(Column::new("first").id(), |t: &TwoIds| &t.first, |t, v| t.first = v)
                .field(Column::new("second").id(), |t: &TwoIds| &t.second, |t, v| t.second = v)
                .build()
        }
    }

    #[derive(Debug)]
    struct NoConstructor {
        name: String,
    }

    impl Entity for NoConstructor {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::builder::<NoConstructor>("NoConstructor")
                .field("name", |n: &NoConstructor| &n.name, |n, v| n.name = v)
                .build()
        }
    }

    #[derive(Debug, Default)]
    struct Clash {
        zip: String,
        zip_code: ZipCode,
    }

    impl Entity for Clash {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::builder::<Clash>("Clash")
                .with_default()
                .field("zip", |c: &Clash| &c.zip, |c, v| c.zip = v)
                .embedded("zipCode", |c: &Clash| &c.zip_code, |c, v| c.zip_code = v)
                .build()
        }
    }

    fn create<T: Entity>() -> Result<EntityMetadata> {
        ClassConverter::default().create(&T::descriptor())
    }

    #[test]
    fn test_embedded_paths_are_flattened() {
        let metadata = create::<Address>().unwrap();
        assert_eq!(metadata.name(), "Address");
        assert_eq!(metadata.column_field("zipCode.zip"), "zip");
        assert_eq!(metadata.column_field("zipCode.plus_four"), "plusFour");
        assert_eq!(metadata.column_field("zipCode"), "plusFour,zip");
        assert_eq!(metadata.column_field("unknown.path"), "unknown.path");
    }

    #[test]
    fn test_entity_paths_are_prefixed() {
        let metadata = create::<Customer>().unwrap();
        assert_eq!(metadata.column_field("id"), "_id");
        assert_eq!(metadata.column_field("address.street"), "address.street");
        assert_eq!(metadata.column_field("address.zipCode.zip"), "address.zip");
        assert_eq!(
            metadata.find_native("address.zipCode.zip").unwrap().field().name(),
            "zip"
        );
        assert_eq!(metadata.id().unwrap().field_name(), "id");
    }

    #[test]
    fn test_field_kinds_and_names() {
        let metadata = create::<Customer>().unwrap();
        let address = metadata.field("address").unwrap();
        assert_eq!(address.kind(), MappingType::Entity);
        assert!(address.element().is_some());
        assert_eq!(metadata.field_names(), vec!["id", "address"]);
        assert!(metadata.is_default_constructor());
    }

    #[test]
    fn test_configured_id_column() {
        let converter = ClassConverter::new(MappingConfig::new().default_id_column("key"));
        let metadata = converter.create(&Customer::descriptor()).unwrap();
        assert!(metadata.field("key").unwrap().is_id());
    }

    #[test]
    fn test_duplicate_id_is_a_configuration_error() {
        let err = create::<TwoIds>().err().unwrap();
        assert!(matches!(err, MapperError::Configuration(msg) if msg.contains("more than one id")));
    }

    #[test]
    fn test_missing_constructor_is_a_configuration_error() {
        assert!(matches!(
            create::<NoConstructor>().err().unwrap(),
            MapperError::Configuration(_)
        ));
    }

    #[test]
    fn test_flattened_key_clash_is_a_configuration_error() {
        assert!(matches!(
            create::<Clash>().err().unwrap(),
            MapperError::Configuration(msg) if msg.contains("'zip'")
        ));
    }
}
