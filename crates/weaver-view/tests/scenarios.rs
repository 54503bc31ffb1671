use pretty_assertions::assert_eq;
use weaver_view::markup::{parse, stringify};
use weaver_view::{
    ElementKind, Item, Position, PositionRelation, Range, Selection, SelectionOptions, ViewTree,
    WalkerValueType,
};

#[test]
fn test_range_iteration_across_paragraphs() {
    let mut tree = ViewTree::new();
    let parsed = parse(
        &mut tree,
        "<container:p>fo{o</container:p><container:p>bar</container:p><container:p>xy}z</container:p>",
    );
    let range = parsed.selection.unwrap();

    let values: Vec<_> = range.iter(&tree).collect();
    let summary: Vec<(WalkerValueType, String)> = values
        .iter()
        .map(|value| {
            let label = match value.item {
                Item::Node(node) if tree.is_element(node) => tree.name(node).unwrap().to_string(),
                item => item.data(&tree).to_string(),
            };
            (value.kind, label)
        })
        .collect();

    assert_eq!(
        summary,
        vec![
            (WalkerValueType::Text, "o".to_string()),
            (WalkerValueType::ElementStart, "p".to_string()),
            (WalkerValueType::Text, "bar".to_string()),
            (WalkerValueType::ElementStart, "p".to_string()),
            (WalkerValueType::Text, "xy".to_string()),
        ]
    );

    let middle = tree.child(parsed.root, 1).unwrap();
    assert_eq!(values[1].item, Item::Node(middle));
}

#[test]
fn test_selection_direction_follows_latest_set() {
    let mut tree = ViewTree::new();
    let parsed = parse(&mut tree, "<container:p>fo{ob}ar</container:p>");
    let range = parsed.selection.unwrap();

    let mut selection = Selection::new();
    selection
        .set_to(&tree, range, SelectionOptions::backward())
        .unwrap();
    assert_eq!(selection.anchor(), Some(range.end()));
    assert_eq!(selection.focus(), Some(range.start()));

    selection
        .set_to(&tree, range, SelectionOptions::default())
        .unwrap();
    assert_eq!(selection.anchor(), Some(range.start()));
    assert_eq!(selection.focus(), Some(range.end()));
    assert!(!selection.is_backward());
}

#[test]
fn test_multi_range_direction_uses_last_range() {
    let mut tree = ViewTree::new();
    let parsed = parse(&mut tree, "<container:p>foobarbaz</container:p>");
    let p = tree.child(parsed.root, 0).unwrap();
    let text = tree.child(p, 0).unwrap();
    let first = Range::new(Position::new(text, 0), Position::new(text, 2));
    let last = Range::new(Position::new(text, 4), Position::new(text, 6));

    let mut selection = Selection::new();
    selection
        .set_to(&tree, vec![first, last], SelectionOptions::backward())
        .unwrap();
    assert!(selection.is_backward());
    assert_eq!(selection.range_count(), 2);
    assert_eq!(selection.anchor(), Some(Position::new(text, 6)));
    assert_eq!(selection.focus(), Some(Position::new(text, 4)));

    selection
        .set_to(&tree, vec![first, last], SelectionOptions::default())
        .unwrap();
    assert!(!selection.is_backward());
    assert_eq!(selection.anchor(), Some(Position::new(text, 4)));
    assert_eq!(selection.focus(), Some(Position::new(text, 6)));
}

#[test]
fn test_contains_range_is_strict_unless_loose() {
    let mut tree = ViewTree::new();
    let parsed = parse(&mut tree, "<container:p>[foo]</container:p>");
    let range = parsed.selection.unwrap();

    assert!(!range.contains_range(&tree, &range, false));
    assert!(range.contains_range(&tree, &range, true));
}

#[test]
fn test_contained_element_between_text_edges() {
    let mut tree = ViewTree::new();
    let parsed = parse(
        &mut tree,
        "<container:p>foo{<empty:img></empty:img>}bar</container:p>",
    );
    let range = parsed.selection.unwrap();
    let p = tree.child(parsed.root, 0).unwrap();
    let img = tree.child(p, 1).unwrap();

    assert_eq!(tree.element_kind(img), Some(ElementKind::Empty));
    assert_eq!(range.get_contained_element(&tree), Some(img));

    let selection = Selection::from_selectable(&tree, range, SelectionOptions::default()).unwrap();
    assert_eq!(selection.get_selected_element(&tree), Some(img));
}

#[test]
fn test_positions_in_different_trees_are_unrelated() {
    let mut tree = ViewTree::new();
    let first = parse(&mut tree, "<container:p>a</container:p>");
    let second = parse(&mut tree, "<container:p>a</container:p>");

    let a = Position::new(first.root, 0);
    let b = Position::new(second.root, 0);
    assert_eq!(a.compare_with(&tree, &b), PositionRelation::Different);
    assert_eq!(a.get_common_ancestor(&tree, &b), None);
    assert!(!a.is_before(&tree, &b) && !a.is_after(&tree, &b));
}

#[test]
fn test_enlarge_over_formatting_wrappers() {
    let mut tree = ViewTree::new();
    let parsed = parse(
        &mut tree,
        "<container:p>x<attribute:b><attribute:i>{foo}</attribute:i></attribute:b>y</container:p>",
    );
    let range = parsed.selection.unwrap();

    let enlarged = range.get_enlarged(&tree);
    assert_eq!(
        stringify(&tree, parsed.root, Some(&enlarged)),
        "<p>x[<b><i>foo</i></b>]y</p>"
    );
    assert_eq!(enlarged.get_trimmed(&tree), range);
    assert_eq!(
        Range::create_in(&tree, parsed.root).get_common_ancestor(&tree),
        Some(parsed.root)
    );
}
