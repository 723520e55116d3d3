#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Filter/sort/pagination engine integration tests.
//!
//! Exercises the composed query pipeline the way the listing endpoints use
//! it: descriptors + search + ordering + pagination over the registered
//! entities, asserting on the rendered SQL.

use offsetsdb_api::query::{
    CREDIT, FilterDescriptor, FilterOp, ListQuery, OrderingPlan, PROJECT, PageParams, Pagination,
    QueryParams, SearchSpec, StaticAliasTable, WeightedField, search_condition,
};

fn page(current_page: u32, per_page: u32) -> PageParams {
    PageParams {
        current_page,
        per_page,
    }
}

// -------------------------------------------------------------------------
// Composed listing queries
// -------------------------------------------------------------------------

#[test]
fn project_listing_composes_filters_search_sort_and_paging() {
    let descriptors = [
        FilterDescriptor::list(
            &PROJECT,
            "registry",
            FilterOp::ILike,
            vec!["verra".to_string(), "gold-standard".to_string()],
        ),
        FilterDescriptor::list(
            &PROJECT,
            "category",
            FilterOp::ContainsAny,
            vec!["forestry".to_string()],
        ),
        FilterDescriptor::scalar(&PROJECT, "issued", FilterOp::Gte, Some(1000i64)),
    ];

    let search = search_condition(
        &PROJECT,
        &SearchSpec::parse("mangrove"),
        &[
            WeightedField::unit("project_id"),
            WeightedField::unit("name"),
        ],
        0.7,
        &StaticAliasTable::with_defaults(),
    )
    .unwrap()
    .unwrap();

    let ordering = OrderingPlan::parse(&["-issued".to_string()], &PROJECT).unwrap();

    let sql = ListQuery::new(&PROJECT)
        .filters(&descriptors)
        .unwrap()
        .and_where(search)
        .order_by(ordering)
        .build_page(&[], page(3, 25));

    // Filters: OR within a descriptor's values, AND between descriptors.
    assert!(sql.contains("%verra%"), "{sql}");
    assert!(sql.contains("%gold-standard%"), "{sql}");
    assert!(sql.contains("@> ARRAY['forestry']"), "{sql}");
    assert!(sql.contains("\"project\".\"issued\" >= 1000"), "{sql}");

    // Search disjoins the identifier/name pair.
    assert!(sql.contains("\"project\".\"project_id\" ILIKE '%mangrove%'"), "{sql}");
    assert!(sql.contains("\"project\".\"name\" ILIKE '%mangrove%'"), "{sql}");

    // Ordering: requested key first, primary-key tie-break last, nulls last.
    let issued_pos = sql.find("\"project\".\"issued\" DESC NULLS LAST").unwrap();
    let pk_pos = sql.find("\"project\".\"project_id\" ASC NULLS LAST").unwrap();
    assert!(issued_pos < pk_pos, "{sql}");

    // Pagination: page 3 of 25.
    assert!(sql.contains("LIMIT 25"), "{sql}");
    assert!(sql.contains("OFFSET 50"), "{sql}");
}

#[test]
fn joined_listing_counts_distinct_base_rows() {
    let descriptors = [FilterDescriptor::list(
        &PROJECT,
        "country",
        FilterOp::ILike,
        vec!["Kenya".to_string()],
    )];

    let query = ListQuery::new(&CREDIT)
        .left_join(&PROJECT, "project_id", "project_id")
        .filters(&descriptors)
        .unwrap();

    let count_sql = query.build_count();

    // Joining credits to projects can multiply rows; the total must count
    // distinct credit ids.
    assert!(count_sql.contains("COUNT(DISTINCT \"credit\".\"id\")"), "{count_sql}");
    assert!(count_sql.contains("LEFT JOIN \"project\""), "{count_sql}");
    assert!(count_sql.contains("%Kenya%"), "{count_sql}");
    assert!(!count_sql.contains("ORDER BY"), "{count_sql}");
}

#[test]
fn absent_filters_add_no_predicates() {
    let descriptors = [
        FilterDescriptor::scalar::<i64>(&PROJECT, "issued", FilterOp::Gte, None),
        FilterDescriptor::list::<String>(&PROJECT, "registry", FilterOp::ILike, vec![]),
    ];

    let sql = ListQuery::new(&PROJECT)
        .filters(&descriptors)
        .unwrap()
        .build_page(&[], page(1, 100));

    assert!(!sql.contains("WHERE"), "{sql}");
}

#[test]
fn invalid_sort_field_fails_before_query_construction() {
    let err = OrderingPlan::parse(&["name".to_string(), "bogus_column".to_string()], &PROJECT)
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("bogus_column"), "{msg}");
    assert!(msg.contains("registry"), "{msg}");
}

// -------------------------------------------------------------------------
// Pagination round trip
// -------------------------------------------------------------------------

#[test]
fn next_page_round_trips_to_the_subsequent_page() {
    let raw = "registry=verra&country=US&country=PE&sort=-issued&current_page=1&per_page=50";
    let params = QueryParams::parse(Some(raw));
    let page_params = PageParams::from_query(&params).unwrap();

    let pagination = Pagination::new(120, page_params, "https://api.test", "/projects", &params);
    assert_eq!(pagination.total_pages, 3);
    let next = pagination.next_page.unwrap();

    // Re-submitting the link yields page 2 with identical filters.
    let (path, query) = next
        .strip_prefix("https://api.test")
        .unwrap()
        .split_once('?')
        .unwrap();
    assert_eq!(path, "/projects");

    let next_params = QueryParams::parse(Some(query));
    let next_page_params = PageParams::from_query(&next_params).unwrap();
    assert_eq!(next_page_params.current_page, 2);
    assert_eq!(next_page_params.per_page, 50);
    assert_eq!(next_params.all("country"), vec!["US", "PE"]);
    assert_eq!(next_params.first("sort"), Some("-issued"));

    // The page after the last one has no link.
    let last = Pagination::new(
        120,
        PageParams {
            current_page: 3,
            per_page: 50,
        },
        "https://api.test",
        "/projects",
        &params,
    );
    assert!(last.next_page.is_none());
}

#[test]
fn page_bounds_validated_before_querying() {
    for raw in ["current_page=0", "per_page=0", "per_page=500"] {
        let params = QueryParams::parse(Some(raw));
        assert!(PageParams::from_query(&params).is_err(), "{raw}");
    }
}

// -------------------------------------------------------------------------
// Search modes over the credit entity
// -------------------------------------------------------------------------

#[test]
fn beneficiary_weighted_search_expands_aliases() {
    let fields = vec![WeightedField {
        field: "retirement_beneficiary_harmonized".to_string(),
        weight: 0.9,
    }];
    let cond = search_condition(
        &CREDIT,
        &SearchSpec::parse("w:gm"),
        &fields,
        0.5,
        &StaticAliasTable::with_defaults(),
    )
    .unwrap()
    .unwrap();

    let sql = ListQuery::new(&CREDIT).and_where(cond).build_count();
    assert!(sql.contains("'gm'"), "{sql}");
    assert!(sql.contains("'general motors'"), "{sql}");
    assert!(sql.contains("word_similarity"), "{sql}");
    assert!(sql.contains("* 0.9"), "{sql}");
}
