use std::any::Any;

use nosqlmap::prelude::*;
use nosqlmap::{MappingType, Result};

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[entity(name = "products")]
struct Product {
    #[column(id)]
    sku: String,
    #[column(name = "label")]
    title: String,
    price: Price,
    tags: Vec<String>,
    #[column(embedded)]
    dimensions: Dimensions,
    #[column(entity)]
    vendor: Vendor,
    #[column(embeddables)]
    reviews: Vec<Review>,
    #[column(skip)]
    cached_rank: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Price(i64);

struct CentsConverter;

impl AttributeConverter for CentsConverter {
    type Attribute = Price;

    fn to_native(&self, price: &Price) -> Result<Value> {
        Ok(Value::Text(format!("{}.{:02}", price.0 / 100, price.0 % 100)))
    }

    fn to_attribute(&self, native: Value) -> Result<Price> {
        let text = native.as_str().unwrap_or_default().replace('.', "");
        text.parse()
            .map(Price)
            .map_err(|e| MapperError::Converter(format!("{}: {}", text, e)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
struct Dimensions {
    width: f64,
    height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
struct Vendor {
    name: String,
    country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
struct Review {
    stars: i64,
    text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
struct Order {
    #[column(id)]
    number: i64,
    #[column(converter = CentsConverter)]
    total: Price,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[entity(parent = Payment, discriminator = "card")]
struct CardPayment {
    #[column(id)]
    id: i64,
    last_digits: String,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[entity(parent = Payment, discriminator = "pix")]
struct PixPayment {
    #[column(id)]
    id: i64,
    key: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Payment {
    Card(CardPayment),
    Pix(PixPayment),
}

impl From<CardPayment> for Payment {
    fn from(card: CardPayment) -> Self {
        Payment::Card(card)
    }
}

impl From<PixPayment> for Payment {
    fn from(pix: PixPayment) -> Self {
        Payment::Pix(pix)
    }
}

impl Entity for Payment {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::builder::<Payment>("Payment")
            .polymorphic(None, |payment| match payment {
                Payment::Card(card) => card as &dyn Any,
                Payment::Pix(pix) => pix as &dyn Any,
            })
            .variant::<CardPayment>()
            .variant::<PixPayment>()
            .build()
    }
}

impl nosqlmap::MappedValue for Price {
    const SHAPE: nosqlmap::mapping::ValueShape = nosqlmap::mapping::ValueShape::Scalar;

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Integer(self.0))
    }

    fn from_value(value: Value) -> Result<Self> {
        i64::from_value(value).map(Price)
    }
}

fn product() -> Product {
    Product {
        sku: "sku-1".to_string(),
        title: "Lamp".to_string(),
        price: Price(1999),
        tags: vec!["home".to_string(), "light".to_string()],
        dimensions: Dimensions {
            width: 20.0,
            height: 45.5,
        },
        vendor: Vendor {
            name: "Acme".to_string(),
            country: Some("BR".to_string()),
        },
        reviews: vec![
            Review {
                stars: 5,
                text: "Bright".to_string(),
            },
            Review {
                stars: 3,
                text: "Fine".to_string(),
            },
        ],
        cached_rank: 0,
    }
}

#[test]
fn test_derived_metadata() {
    let context = MappingContext::default();
    let metadata = context.load::<Product>().unwrap();

    assert_eq!(metadata.name(), "products");
    assert_eq!(metadata.id().unwrap().name(), "_id");
    assert_eq!(metadata.field("label").unwrap().field_name(), "title");
    assert!(metadata.field("cached_rank").is_none());
    assert_eq!(metadata.field("tags").unwrap().kind(), MappingType::Collection);
    assert_eq!(metadata.field("dimensions").unwrap().kind(), MappingType::Embedded);
    assert_eq!(metadata.field("vendor").unwrap().kind(), MappingType::Entity);
    assert_eq!(metadata.field("reviews").unwrap().kind(), MappingType::Collection);
    assert_eq!(metadata.column_field("dimensions.width"), "width");
    assert_eq!(metadata.column_field("vendor.name"), "vendor.name");
}

#[test]
fn test_derived_round_trip() {
    let converter = MappingContext::default().entity_converter();
    let product = product();

    let record = converter.to_record(&product).unwrap();
    assert_eq!(record.name(), "products");
    assert_eq!(record.find("_id"), Some(&Value::from("sku-1")));
    assert_eq!(record.find("label"), Some(&Value::from("Lamp")));
    assert_eq!(record.find("price"), Some(&Value::Integer(1999)));
    assert_eq!(record.find("width"), Some(&Value::Float(20.0)));
    assert_eq!(record.find_path("vendor.country"), Some(&Value::from("BR")));
    assert!(!record.contains("cached_rank"));

    let rebuilt: Product = converter.to_entity(&record).unwrap();
    assert_eq!(rebuilt, product);
}

#[test]
fn test_derived_converter_field() {
    let context = MappingContext::default();
    context.register_converter(CentsConverter).unwrap();
    let converter = context.entity_converter();

    let order = Order {
        number: 7,
        total: Price(1050),
    };
    let record = converter.to_record(&order).unwrap();
    assert_eq!(record.find("total"), Some(&Value::from("10.50")));
    assert_eq!(converter.to_entity::<Order>(&record).unwrap(), order);
}

#[test]
fn test_derived_variants() {
    let converter = MappingContext::default().entity_converter();
    let payment = Payment::Pix(PixPayment {
        id: 3,
        key: "ada@example.com".to_string(),
    });

    let record = converter.to_record(&payment).unwrap();
    assert_eq!(record.name(), "Payment");
    assert_eq!(record.find("dtype"), Some(&Value::from("pix")));
    assert_eq!(converter.to_entity::<Payment>(&record).unwrap(), payment);
}
