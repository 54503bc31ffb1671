use weaver_view::ViewTree;
use weaver_view_dom::{
    BlockFillerMode, ConverterConfig, DomConverter, DomDocument, DomToViewOptions, RenderingMode,
};

fn paragraph(dom: &mut DomDocument, html: &str) -> weaver_view_dom::DomNodeId {
    let root = dom.create_element("div");
    dom.set_inner_html(root, html);
    dom.first_child(root).unwrap()
}

#[test]
fn test_marked_br_is_filler_in_br_mode() {
    let mut dom = DomDocument::new();
    let p = paragraph(&mut dom, "<p><br data-cke-filler=\"true\"></p>");
    let br = dom.first_child(p).unwrap();

    let converter = DomConverter::default();
    assert_eq!(converter.block_filler_mode(), BlockFillerMode::Br);
    assert!(converter.is_block_filler(&dom, br));

    // A plain <br> is content while editing.
    let plain = paragraph(&mut dom, "<p><br></p>");
    assert!(!converter.is_block_filler(&dom, dom.first_child(plain).unwrap()));
}

#[test]
fn test_lone_br_in_block_is_filler_in_nbsp_mode() {
    let mut dom = DomDocument::new();
    let converter = DomConverter::new(ConverterConfig::for_mode(RenderingMode::Data));
    assert_eq!(converter.block_filler_mode(), BlockFillerMode::Nbsp);

    let p = paragraph(&mut dom, "<p><br></p>");
    assert!(converter.is_block_filler(&dom, dom.first_child(p).unwrap()));

    let two = paragraph(&mut dom, "<p>a<br></p>");
    assert!(!converter.is_block_filler(&dom, dom.child(two, 1).unwrap()));

    let inline = paragraph(&mut dom, "<span><br></span>");
    assert!(!converter.is_block_filler(&dom, dom.first_child(inline).unwrap()));

    let nbsp = paragraph(&mut dom, "<p>&nbsp;</p>");
    assert!(converter.is_block_filler(&dom, dom.first_child(nbsp).unwrap()));

    let marked = paragraph(&mut dom, "<p><span data-cke-filler=\"true\">&nbsp;</span></p>");
    assert!(converter.is_block_filler(&dom, dom.first_child(marked).unwrap()));
}

#[test]
fn test_empty_paragraph_reads_back_empty() {
    let mut dom = DomDocument::new();
    let mut view = ViewTree::new();
    let mut converter = DomConverter::new(ConverterConfig::for_mode(RenderingMode::Data));

    let p = paragraph(&mut dom, "<p><br></p>");
    let view_p = converter
        .dom_to_view(&mut view, &dom, p, DomToViewOptions::default())
        .unwrap();
    assert_eq!(view.child_count(view_p), 0);
}
