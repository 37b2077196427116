//! Aggregate recompute
//!
//! Each `.aggregate` container shows the sum of the `.contributing[data-val]`
//! elements in its own subtree. Containers are independent: a value inside
//! one container never reaches a sibling. A nested aggregate that is itself
//! contributing counts once, as its total, in the enclosing aggregate.

use rcc_view::{Element, Node};

/// Class of an aggregate container
pub const AGGREGATE_CLASS: &str = "aggregate";
/// Class of a value feeding its enclosing aggregate
pub const CONTRIBUTING_CLASS: &str = "contributing";
/// Class of the element that displays an aggregate total
pub const TOTAL_CLASS: &str = "aggregate-total";

/// Recompute every aggregate under `root` (inclusive)
///
/// Returns the number of containers updated.
pub fn recompute_aggregates(root: &mut Element) -> usize {
    let mut updated = 0;
    visit(root, &mut updated);
    if updated > 0 {
        tracing::trace!(updated, "recomputed aggregates");
    }
    updated
}

fn visit(el: &mut Element, updated: &mut usize) {
    for child in &mut el.children {
        if let Node::Element(child) = child {
            visit(child, updated);
        }
    }
    if el.has_class(AGGREGATE_CLASS) {
        let total = sum_contributions(el);
        let text = format_total(total);
        el.set_attr("data-val", text.clone());
        set_total_text(el, &text);
        *updated += 1;
    }
}

fn sum_contributions(el: &Element) -> f64 {
    el.child_elements()
        .map(|child| {
            if child.has_class(CONTRIBUTING_CLASS) {
                parse_value(child.attr("data-val"))
            } else {
                sum_contributions(child)
            }
        })
        .sum()
}

fn parse_value(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Whole numbers print without a fraction
#[must_use]
pub fn format_total(total: f64) -> String {
    if total.fract() == 0.0 && total.abs() < 1e15 {
        format!("{}", total as i64)
    } else {
        format!("{total}")
    }
}

/// Write the total into the first display slot not owned by a nested
/// aggregate
fn set_total_text(el: &mut Element, text: &str) -> bool {
    for child in &mut el.children {
        if let Node::Element(child) = child {
            if child.has_class(TOTAL_CLASS) {
                child.set_text(text);
                return true;
            }
            if !child.has_class(AGGREGATE_CLASS) && set_total_text(child, text) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rcc_view::Document;

    fn total_of(doc: &Document, id: &str) -> String {
        doc.get(id).unwrap().attr("data-val").unwrap_or_default().to_string()
    }

    #[test]
    fn sibling_containers_are_scoped() {
        let mut doc = Document::parse(
            r#"<div id="root">
                 <div id="a" class="aggregate"><span class="aggregate-total"></span>
                   <span class="contributing" data-val="10"></span>
                   <span class="contributing" data-val="20"></span>
                 </div>
                 <div id="b" class="aggregate"><span class="aggregate-total"></span>
                   <span class="contributing" data-val="5"></span>
                 </div>
               </div>"#,
        );
        assert_eq!(recompute_aggregates(doc.root_mut()), 2);
        assert_eq!(total_of(&doc, "a"), "30");
        assert_eq!(total_of(&doc, "b"), "5");
        let shown = doc.get("a").unwrap().select_first(&".aggregate-total".parse().unwrap()).unwrap();
        assert_eq!(shown.text_content(), "30");
    }

    #[test]
    fn nested_contributing_aggregate_counts_once() {
        let mut doc = Document::parse(
            r#"<div id="outer" class="aggregate">
                 <span class="contributing" data-val="1.5"></span>
                 <div id="inner" class="aggregate contributing">
                   <span class="aggregate-total"></span>
                   <span class="contributing" data-val="2"></span>
                   <span class="contributing" data-val="3"></span>
                 </div>
                 <span class="aggregate-total" id="outer-total"></span>
               </div>"#,
        );
        recompute_aggregates(doc.root_mut());
        assert_eq!(total_of(&doc, "inner"), "5");
        assert_eq!(total_of(&doc, "outer"), "6.5");
        assert_eq!(doc.get("outer-total").unwrap().text_content(), "6.5");
    }

    #[test]
    fn non_numeric_values_count_as_zero() {
        let mut doc = Document::parse(
            r#"<div id="x" class="aggregate"><i class="contributing" data-val="n/a"></i><i class="contributing"></i></div>"#,
        );
        recompute_aggregates(doc.root_mut());
        assert_eq!(total_of(&doc, "x"), "0");
    }

    #[test]
    fn recompute_is_stable() {
        let mut doc = Document::parse(
            r#"<div id="x" class="aggregate"><i class="contributing" data-val="4"></i></div>"#,
        );
        recompute_aggregates(doc.root_mut());
        let once = doc.clone();
        recompute_aggregates(doc.root_mut());
        assert_eq!(doc, once);
    }
}
