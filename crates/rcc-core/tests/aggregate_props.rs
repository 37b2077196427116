use proptest::prelude::*;
use rcc_core::recompute_aggregates;
use rcc_view::Document;

fn container(id: &str, values: &[u32]) -> String {
    let spans: String = values
        .iter()
        .map(|v| format!(r#"<span class="contributing" data-val="{v}"></span>"#))
        .collect();
    format!(r#"<div id="{id}" class="aggregate"><b class="aggregate-total"></b>{spans}</div>"#)
}

proptest! {
    #[test]
    fn prop_sibling_totals_are_independent(
        left in proptest::collection::vec(0..10_000u32, 0..12),
        right in proptest::collection::vec(0..10_000u32, 0..12),
    ) {
        let html = format!("<div id=\"root\">{}{}</div>", container("left", &left), container("right", &right));
        let mut doc = Document::parse(&html);
        let updated = recompute_aggregates(doc.root_mut());
        prop_assert_eq!(updated, 2);

        let expect = |values: &[u32]| values.iter().map(|v| u64::from(*v)).sum::<u64>().to_string();
        let (expect_left, expect_right) = (expect(&left), expect(&right));
        prop_assert_eq!(doc.get("left").unwrap().attr("data-val"), Some(expect_left.as_str()));
        prop_assert_eq!(doc.get("right").unwrap().attr("data-val"), Some(expect_right.as_str()));
    }

    #[test]
    fn prop_recompute_is_idempotent(values in proptest::collection::vec(0..500u32, 1..8)) {
        let mut doc = Document::parse(&container("agg", &values));
        recompute_aggregates(doc.root_mut());
        let once = doc.to_html();
        recompute_aggregates(doc.root_mut());
        prop_assert_eq!(once, doc.to_html());
    }
}

#[test]
fn nested_contributing_aggregate_counts_once() {
    let mut doc = Document::parse(
        r#"<div id="outer" class="aggregate"><b class="aggregate-total"></b>
             <div id="inner" class="aggregate contributing"><b class="aggregate-total"></b>
               <span class="contributing" data-val="4"></span>
               <span class="contributing" data-val="6"></span>
             </div>
             <span class="contributing" data-val="1"></span>
           </div>"#,
    );
    recompute_aggregates(doc.root_mut());
    assert_eq!(doc.get("inner").unwrap().attr("data-val"), Some("10"));
    assert_eq!(doc.get("outer").unwrap().attr("data-val"), Some("11"));
}
