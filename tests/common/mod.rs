#![allow(dead_code)]

use std::any::Any;

use nosqlmap::prelude::*;
use nosqlmap::Result;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub phones: Vec<String>,
    pub nickname: Option<String>,
}

impl Person {
    pub fn new(id: i64, name: &str, age: i64) -> Self {
        Self {
            id,
            name: name.to_string(),
            age,
            ..Self::default()
        }
    }
}

impl Entity for Person {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::builder::<Person>("Person")
            .with_default()
            .field(Column::new("id").id(), |p: &Person| &p.id, |p, v| p.id = v)
            .field("name", |p: &Person| &p.name, |p, v| p.name = v)
            .field("age", |p: &Person| &p.age, |p, v| p.age = v)
            .field("phones", |p: &Person| &p.phones, |p, v| p.phones = v)
            .field("nickname", |p: &Person| &p.nickname, |p, v| p.nickname = v)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Money {
    pub currency: String,
    pub amount: i64,
}

impl Money {
    pub fn new(currency: &str, amount: i64) -> Self {
        Self {
            currency: currency.to_string(),
            amount,
        }
    }
}

pub struct MoneyConverter;

impl AttributeConverter for MoneyConverter {
    type Attribute = Money;

    fn to_native(&self, money: &Money) -> Result<Value> {
        Ok(Value::Text(format!("{} {}", money.currency, money.amount)))
    }

    fn to_attribute(&self, native: Value) -> Result<Money> {
        let text = native
            .as_str()
            .ok_or_else(|| MapperError::Converter(format!("Money expects text, got {}", native)))?;
        let (currency, amount) = text
            .split_once(' ')
            .ok_or_else(|| MapperError::Converter(format!("Malformed money '{}'", text)))?;
        let amount = amount
            .parse::<i64>()
            .map_err(|e| MapperError::Converter(e.to_string()))?;
        Ok(Money::new(currency, amount))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Job {
    pub city: String,
    pub description: String,
}

impl Entity for Job {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::builder::<Job>("Job")
            .with_default()
            .field("city", |j: &Job| &j.city, |j, v| j.city = v)
            .field("description", |j: &Job| &j.description, |j, v| j.description = v)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Worker {
    pub name: String,
    pub salary: Money,
    pub job: Job,
}

impl Entity for Worker {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::builder::<Worker>("Worker")
            .with_default()
            .field("name", |w: &Worker| &w.name, |w, v| w.name = v)
            .converted::<MoneyConverter, _, _>(
                Column::new("salary").named("money"),
                |w: &Worker| &w.salary,
                |w, v| w.salary = v,
            )
            .embedded("job", |w: &Worker| &w.job, |w, v| w.job = v)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZipCode {
    pub zip: String,
    pub plus_four: String,
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

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub zip_code: ZipCode,
}

impl Entity for Address {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::builder::<Address>("Address")
            .with_default()
            .field("street", |a: &Address| &a.street, |a, v| a.street = v)
            .field("city", |a: &Address| &a.city, |a, v| a.city = v)
            .embedded("zipCode", |a: &Address| &a.zip_code, |a, v| a.zip_code = v)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub address: Address,
}

impl Entity for Customer {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::builder::<Customer>("Customer")
            .with_default()
            .field(Column::new("id").id(), |c: &Customer| &c.id, |c, v| c.id = v)
            .field("name", |c: &Customer| &c.name, |c, v| c.name = v)
            .entity("address", |c: &Customer| &c.address, |c, v| c.address = v)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contact {
    pub kind: String,
    pub information: String,
}

impl Contact {
    pub fn new(kind: &str, information: &str) -> Self {
        Self {
            kind: kind.to_string(),
            information: information.to_string(),
        }
    }
}

impl Entity for Contact {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::builder::<Contact>("Contact")
            .with_default()
            .field("kind", |c: &Contact| &c.kind, |c, v| c.kind = v)
            .field("information", |c: &Contact| &c.information, |c, v| c.information = v)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentBook {
    pub id: String,
    pub contacts: Vec<Contact>,
}

impl Entity for AppointmentBook {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::builder::<AppointmentBook>("AppointmentBook")
            .with_default()
            .field(Column::new("id").id(), |b: &AppointmentBook| &b.id, |b, v| b.id = v)
            .embeddables("contacts", |b: &AppointmentBook| &b.contacts, |b, v| b.contacts = v)
            .build()
    }
}

/// Built through its constructor; there is no `Default`.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub edition: Option<i64>,
}

impl Entity for Book {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::builder::<Book>("Book")
            .field(Column::new("isbn").id(), |b: &Book| &b.isbn, |b, v| b.isbn = v)
            .field("title", |b: &Book| &b.title, |b, v| b.title = v)
            .field("edition", |b: &Book| &b.edition, |b, v| b.edition = v)
            .constructor(
                vec![
                    Parameter::new("_id"),
                    Parameter::new("title"),
                    Parameter::new("edition"),
                ],
                |args: &mut Arguments| {
                    Ok(Book {
                        isbn: args.get("_id")?,
                        title: args.get("title")?,
                        edition: args.optional("edition")?,
                    })
                },
            )
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Car {
    pub id: i64,
    pub model: String,
    pub doors: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Truck {
    pub id: i64,
    pub model: String,
    pub payload: f64,
}

/// Polymorphic parent stored under the discriminator column `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum Vehicle {
    Car(Car),
    Truck(Truck),
}

impl Entity for Vehicle {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::builder::<Vehicle>("Vehicle")
            .polymorphic(Some("type"), |vehicle| match vehicle {
                Vehicle::Car(car) => car as &dyn Any,
                Vehicle::Truck(truck) => truck as &dyn Any,
            })
            .variant::<Car>()
            .variant::<Truck>()
            .build()
    }
}

impl Entity for Car {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::builder::<Car>("Car")
            .with_default()
            .inherits::<Vehicle, _>("A", Vehicle::Car)
            .field(Column::new("id").id(), |c: &Car| &c.id, |c, v| c.id = v)
            .field("model", |c: &Car| &c.model, |c, v| c.model = v)
            .field("doors", |c: &Car| &c.doors, |c, v| c.doors = v)
            .build()
    }
}

impl Entity for Truck {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::builder::<Truck>("Truck")
            .with_default()
            .inherits::<Vehicle, _>("B", Vehicle::Truck)
            .field(Column::new("id").id(), |t: &Truck| &t.id, |t, v| t.id = v)
            .field("model", |t: &Truck| &t.model, |t, v| t.model = v)
            .field("payload", |t: &Truck| &t.payload, |t, v| t.payload = v)
            .build()
    }
}

pub fn context() -> MappingContext {
    let context = MappingContext::default();
    context
        .register_converter(MoneyConverter)
        .expect("register money converter");
    context
}
