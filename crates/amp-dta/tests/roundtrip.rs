//! Round-trip properties of the text and binary codecs.

use amp_dta::{
    Atom, DataList, DtaDocument, DtbVersion, DtbWriteOptions, ListKind, Node, parse_binary,
    parse_text, serialize_binary, serialize_text,
};
use proptest::prelude::*;

fn leaf() -> impl Strategy<Value = Node> {
    prop_oneof![
        any::<i32>().prop_map(Node::int),
        (-1.0e6f32..1.0e6f32).prop_map(Node::float),
        "[a-zA-Z_][a-zA-Z0-9_/.]{0,12}".prop_map(Node::symbol),
        "[ a-z]{0,6}".prop_map(Node::symbol),
        "[ -~\n]{0,16}".prop_map(Node::string),
        "[a-z_]{1,8}".prop_map(|name| Node::Atom(Atom::Variable(name))),
        "[a-zA-Z0-9_./]{1,20}".prop_map(Node::include),
        "[A-Z_]{1,8}".prop_map(|name| Node::Atom(Atom::IfNDef(name))),
        Just(Node::Atom(Atom::Else)),
        Just(Node::Atom(Atom::EndIf)),
        Just(Node::Atom(Atom::Unhandled)),
    ]
}

fn node() -> impl Strategy<Value = Node> {
    leaf().prop_recursive(4, 64, 6, |inner| {
        (
            prop_oneof![
                Just(ListKind::Array),
                Just(ListKind::Command),
                Just(ListKind::Property),
            ],
            prop::collection::vec(inner, 0..6),
        )
            .prop_map(|(kind, children)| {
                Node::List(DataList {
                    kind,
                    children,
                    ..DataList::default()
                })
            })
    })
}

fn root() -> impl Strategy<Value = DataList> {
    prop::collection::vec(node(), 0..6).prop_map(DataList::from_children)
}

fn version() -> impl Strategy<Value = DtbVersion> {
    prop_oneof![
        Just(DtbVersion::V1),
        Just(DtbVersion::V2),
        Just(DtbVersion::V3),
    ]
}

proptest! {
    #[test]
    fn text_roundtrip_preserves_structure(tree in root()) {
        let text = serialize_text(&tree);
        let back = parse_text(&text).expect("reparse");
        prop_assert_eq!(back, tree);
    }

    #[test]
    fn binary_roundtrip_preserves_structure(
        tree in root(),
        version in version(),
        obfuscate in any::<bool>(),
    ) {
        let options = DtbWriteOptions::new()
            .with_version(version)
            .with_obfuscation(obfuscate);
        let bytes = serialize_binary(&tree, options).expect("serialize");
        let doc = parse_binary(&bytes).expect("parse");
        prop_assert_eq!(doc.version, version);
        prop_assert_eq!(doc.obfuscated, obfuscate);
        prop_assert_eq!(&doc.root, &tree);

        let again = doc.to_binary(doc.write_options()).expect("reserialize");
        prop_assert_eq!(again, bytes);
    }

    #[test]
    fn binary_text_binary_is_byte_identical(tree in root(), version in version()) {
        let options = DtbWriteOptions::new().with_version(version);
        let bytes = serialize_binary(&tree, options).expect("serialize");
        let text = serialize_text(&parse_binary(&bytes).expect("parse").root);
        let reparsed = parse_text(&text).expect("reparse");
        prop_assert_eq!(serialize_binary(&reparsed, options).expect("serialize"), bytes);
    }
}

#[test]
fn text_to_binary_drops_only_formatting() {
    let source = "; song metadata\n(title \"Wetware\")   /* inline */\n(bpm\n 128)\n";
    let doc = DtaDocument::parse_text(source).expect("parse");
    let bytes = doc.to_binary(DtbWriteOptions::new()).expect("binary");
    let back = DtaDocument::parse_binary(&bytes).expect("binary back");
    assert_eq!(back.to_text(), "(title \"Wetware\")\n(bpm 128)\n");
}

#[test]
fn nested_lists_are_indented() {
    let doc = DtaDocument::parse_text(
        "(db (unlock_tokens (DREAMER \"Dreamer\" unlock_extra)) \
         (campaign (beat_num 0 kUnlockArena DREAMER))) (title \"Wetware\")",
    )
    .expect("parse");
    let expected = "(db\n\
                    \t(unlock_tokens\n\
                    \t\t(DREAMER \"Dreamer\" unlock_extra)\n\
                    \t)\n\
                    \t(campaign\n\
                    \t\t(beat_num 0 kUnlockArena DREAMER)\n\
                    \t)\n\
                    )\n\
                    (title \"Wetware\")\n";
    assert_eq!(doc.to_text(), expected);
}

#[test]
fn compiled_list_headers_survive_rewrite() {
    let options = DtbWriteOptions::new().with_version(DtbVersion::V2);
    let mut bytes = DtaDocument::parse_text("(a (b 1))")
        .expect("parse")
        .to_binary(options)
        .expect("binary");
    // outer list header: count u16 at 13, line u32 at 15, id u16 at 19
    bytes[15..19].copy_from_slice(&7u32.to_le_bytes());
    bytes[19..21].copy_from_slice(&3u16.to_le_bytes());

    let doc = DtaDocument::parse_binary(&bytes).expect("parse binary");
    let outer = doc.root.children[0].as_list().expect("list");
    assert_eq!((outer.line, outer.id), (7, 3));
    assert_eq!(doc.to_bytes().expect("rewrite"), bytes);

    // the text form has no list headers; structure is all that carries over
    let text = DtaDocument::parse_text(&doc.to_text()).expect("reparse");
    assert_eq!(text.root, doc.root);
}
