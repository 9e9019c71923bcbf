mod common;

use common::*;
use nosqlmap::prelude::*;
use nosqlmap::query::{DeleteQuery, SelectQuery, Sort};

#[test]
fn test_select_all() {
    let query = context().select::<Person>().unwrap().build().unwrap();
    assert_eq!(query, SelectQuery::new("Person"));
}

#[test]
fn test_order_by_uses_native_names() {
    let context = context();

    let asc = context
        .select::<Worker>()
        .unwrap()
        .order_by("salary")
        .asc()
        .build()
        .unwrap();
    assert_eq!(asc, SelectQuery::new("Worker").with_sort(Sort::asc("money")));

    let desc = context
        .select::<Worker>()
        .unwrap()
        .order_by("salary")
        .desc()
        .build()
        .unwrap();
    assert_eq!(desc, SelectQuery::new("Worker").with_sort(Sort::desc("money")));
}

#[test]
fn test_skip_and_limit() {
    let context = context();
    let query = context
        .select::<Worker>()
        .unwrap()
        .skip(10)
        .limit(5)
        .build()
        .unwrap();
    assert_eq!(query, SelectQuery::new("Worker").with_skip(10).with_limit(5));
}

#[test]
fn test_comparisons_on_the_id_are_coerced() {
    let context = context();
    let cases = [
        (
            context.select::<Person>().unwrap().where_("id").gt(10).build(),
            Condition::gt("_id", 10),
        ),
        (
            context.select::<Person>().unwrap().where_("id").gte(10).build(),
            Condition::gte("_id", 10),
        ),
        (
            context.select::<Person>().unwrap().where_("id").lt(10).build(),
            Condition::lt("_id", 10),
        ),
        (
            context.select::<Person>().unwrap().where_("id").lte(10).build(),
            Condition::lte("_id", 10),
        ),
        (
            context.select::<Person>().unwrap().where_("id").eq("20").build(),
            Condition::eq("_id", 20),
        ),
        (
            context
                .select::<Person>()
                .unwrap()
                .where_("id")
                .between("10", 20)
                .build(),
            Condition::between("_id", 10, 20),
        ),
    ];

    for (query, expected) in cases {
        assert_eq!(query.unwrap().condition, Some(expected));
    }
}

#[test]
fn test_like_is_not_coerced_and_can_be_negated() {
    let context = context();

    let like = context
        .select::<Person>()
        .unwrap()
        .where_("name")
        .like("Ada")
        .build()
        .unwrap();
    assert_eq!(like.condition, Some(Condition::like("name", "Ada")));

    let not_like = context
        .select::<Person>()
        .unwrap()
        .where_("name")
        .not()
        .like("Ada")
        .build()
        .unwrap();
    assert_eq!(not_like.condition, Some(Condition::like("name", "Ada").negate()));
}

#[test]
fn test_and_or_chains() {
    let context = context();

    let and = context
        .select::<Person>()
        .unwrap()
        .where_("age")
        .between(10, 20)
        .and("name")
        .eq("Ada")
        .build()
        .unwrap();
    assert_eq!(
        and.condition,
        Some(Condition::between("age", 10, 20).and(Condition::eq("name", "Ada")))
    );

    let or = context
        .select::<Person>()
        .unwrap()
        .where_("id")
        .between(10, 20)
        .or("name")
        .eq("Ada")
        .build()
        .unwrap();
    assert_eq!(
        or.condition,
        Some(Condition::between("_id", 10, 20).or(Condition::eq("name", "Ada")))
    );
}

#[test]
fn test_in_list() {
    let query = context()
        .select::<Person>()
        .unwrap()
        .where_("id")
        .in_(["1", "2"])
        .build()
        .unwrap();
    assert_eq!(
        query.condition,
        Some(Condition::in_("_id", vec![Value::Integer(1), Value::Integer(2)]))
    );
}

#[test]
fn test_converter_applies_to_query_values() {
    let query = context()
        .select::<Worker>()
        .unwrap()
        .where_("salary")
        .eq(QueryArg::attribute(Money::new("USD", 10)))
        .build()
        .unwrap();
    assert_eq!(query.condition, Some(Condition::eq("money", "USD 10")));
}

#[test]
fn test_embedded_and_nested_paths() {
    let context = context();

    let worker = context
        .select::<Worker>()
        .unwrap()
        .where_("job.city")
        .eq("Salvador")
        .build()
        .unwrap();
    assert_eq!(worker.condition, Some(Condition::eq("city", "Salvador")));

    let address = context
        .select::<Address>()
        .unwrap()
        .where_("zipCode.zip")
        .eq("01312321")
        .build()
        .unwrap();
    assert_eq!(address.condition, Some(Condition::eq("zip", "01312321")));

    let customer = context
        .select::<Customer>()
        .unwrap()
        .where_("address.zipCode.zip")
        .eq("01312321")
        .build()
        .unwrap();
    assert_eq!(customer.condition, Some(Condition::eq("address.zip", "01312321")));
}

#[test]
fn test_unknown_paths_pass_through() {
    let query = context()
        .select::<Person>()
        .unwrap()
        .where_("nickname.first")
        .eq("Countess")
        .build()
        .unwrap();
    assert_eq!(query.condition, Some(Condition::eq("nickname.first", "Countess")));
}

#[test]
fn test_first_resolution_error_is_reported_by_build() {
    let context = context();

    let uncoercible = context
        .select::<Person>()
        .unwrap()
        .where_("id")
        .eq("twenty")
        .and("name")
        .eq("Ada")
        .build();
    assert!(uncoercible.is_err());

    let no_converter = context
        .select::<Person>()
        .unwrap()
        .where_("name")
        .eq(QueryArg::attribute(Money::new("USD", 10)))
        .build();
    assert!(matches!(no_converter, Err(MapperError::Mapping(_))));
}

#[test]
fn test_delete_builder() {
    let query = context()
        .delete::<Person>()
        .unwrap()
        .where_("id")
        .eq("7")
        .build()
        .unwrap();
    assert_eq!(
        query,
        DeleteQuery::new("Person").with_condition(Condition::eq("_id", 7))
    );
}

#[test]
fn test_variant_queries_filter_on_their_discriminator() {
    let context = context();

    let all = context.select::<Car>().unwrap().build().unwrap();
    assert_eq!(
        all,
        SelectQuery::new("Vehicle").with_condition(Condition::eq("type", "A"))
    );

    let by_model = context
        .select::<Truck>()
        .unwrap()
        .where_("model")
        .eq("Actros")
        .or("id")
        .eq("2")
        .build()
        .unwrap();
    assert_eq!(
        by_model.condition,
        Some(
            Condition::eq("model", "Actros")
                .or(Condition::eq("_id", 2))
                .and(Condition::eq("type", "B"))
        )
    );

    let delete = context.delete::<Car>().unwrap().build().unwrap();
    assert_eq!(
        delete,
        DeleteQuery::new("Vehicle").with_condition(Condition::eq("type", "A"))
    );

    let parent = context.select::<Vehicle>().unwrap().build().unwrap();
    assert_eq!(parent, SelectQuery::new("Vehicle"));
}
