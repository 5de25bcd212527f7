// crates/xmlbind/tests/decoding.rs

#[macro_use]
mod common;

use common::init_logging;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use xmlbind::{
    Error, Field, ModelBinding, ModelBindingBuilder, ParsingError, SearchMode, ValidationError,
    ValidationInfo, Value, WriteOptions, XmlModel,
};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Abc {
    a: String,
    b: String,
    c: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct StrictAbc(Abc);
#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct OrderedAbc(Abc);
#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct UnorderedAbc(Abc);

fn abc(mode: SearchMode) -> ModelBindingBuilder {
    ModelBinding::builder("model")
        .search_mode(mode)
        .field(Field::element("a"))
        .field(Field::element("b"))
        .field(Field::element("c").optional())
}

xml_model!(StrictAbc, abc(SearchMode::Strict));
xml_model!(OrderedAbc, abc(SearchMode::Ordered));
xml_model!(UnorderedAbc, abc(SearchMode::Unordered));

fn expected_abc(c: Option<&str>) -> Abc {
    Abc {
        a: "1".to_string(),
        b: "2".to_string(),
        c: c.map(str::to_string),
    }
}

#[test]
fn test_strict_mode() {
    init_logging();
    let obj = StrictAbc::from_xml("<model><a>1</a><b>2</b><c>3</c></model>", None).unwrap();
    assert_eq!(obj.0, expected_abc(Some("3")));

    // Optional trailing element may be absent.
    let obj = StrictAbc::from_xml("<model><a>1</a><b>2</b></model>", None).unwrap();
    assert_eq!(obj.0, expected_abc(None));

    let err = StrictAbc::from_xml("<model><b>2</b><a>1</a></model>", None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "unexpected element at `a` (actual: b, expected: a)"
    );

    let err = StrictAbc::from_xml("<model><a>1</a><x/><b>2</b></model>", None).unwrap_err();
    assert!(matches!(
        err,
        Error::Parsing(ParsingError::UnexpectedElement { ref actual, .. }) if actual == "x"
    ));
}

#[test]
fn test_ordered_mode() {
    init_logging();
    let obj = OrderedAbc::from_xml(
        "<model><x/><a>1</a><y/><b>2</b><c>3</c><z/></model>",
        None,
    )
    .unwrap();
    assert_eq!(obj.0, expected_abc(Some("3")));

    // Matching never goes back before the last consumed element.
    let err = OrderedAbc::from_xml("<model><b>2</b><a>1</a></model>", None).unwrap_err();
    assert!(matches!(
        err,
        Error::Parsing(ParsingError::MissingField { ref path }) if path == "b"
    ));
}

#[test]
fn test_unordered_mode() {
    init_logging();
    let obj = UnorderedAbc::from_xml("<model><c>3</c><x/><b>2</b><a>1</a></model>", None).unwrap();
    assert_eq!(obj.0, expected_abc(Some("3")));

    let err = UnorderedAbc::from_xml("<model><c>3</c><a>1</a></model>", None).unwrap_err();
    assert!(matches!(
        err,
        Error::Parsing(ParsingError::MissingField { ref path }) if path == "b"
    ));
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Prefixed {
    attr1: String,
    element1: String,
}

xml_model!(
    Prefixed,
    ModelBinding::builder("model")
        .ns("tst")
        .nsmap([("tst", "urn:test")])
        .field(Field::attr("attr1"))
        .field(Field::element("element1"))
);

#[test]
fn test_namespaces_match_by_uri() {
    init_logging();
    let expected = Prefixed {
        attr1: "1".to_string(),
        element1: "value".to_string(),
    };

    let declared = r#"<tst:model xmlns:tst="urn:test" attr1="1"><tst:element1>value</tst:element1></tst:model>"#;
    assert_eq!(Prefixed::from_xml(declared, None).unwrap(), expected);

    let other_prefix = r#"<t:model xmlns:t="urn:test" attr1="1"><t:element1>value</t:element1></t:model>"#;
    assert_eq!(Prefixed::from_xml(other_prefix, None).unwrap(), expected);

    let as_default = r#"<model xmlns="urn:test" attr1="1"><element1>value</element1></model>"#;
    assert_eq!(Prefixed::from_xml(as_default, None).unwrap(), expected);

    let err = Prefixed::from_xml(
        r#"<tst:model xmlns:tst="urn:test" attr1="1"><element1>value</element1></tst:model>"#,
        None,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Parsing(ParsingError::UnexpectedElement { ref actual, .. }) if actual == "element1"
    ));
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct DefaultNs {
    element1: String,
    plain: Option<String>,
}

xml_model!(
    DefaultNs,
    ModelBinding::builder("model")
        .ns("")
        .nsmap([("", "urn:default")])
        .field(Field::element("element1"))
        .field(Field::element("plain").optional())
);

#[test]
fn test_default_namespace() {
    init_logging();
    let obj = DefaultNs::from_xml(
        r#"<model xmlns="urn:default"><element1>v</element1></model>"#,
        None,
    )
    .unwrap();
    assert_eq!(obj.element1, "v");

    // Not in the default namespace.
    let err = DefaultNs::from_xml("<model><element1>v</element1></model>", None).unwrap_err();
    assert!(matches!(err, Error::Parsing(ParsingError::RootNotFound { .. })));
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct NsAttrs {
    attr1: String,
}

xml_model!(
    NsAttrs,
    ModelBinding::builder("model")
        .ns("tst")
        .nsmap([("tst", "urn:test")])
        .ns_attrs(true)
        .field(Field::attr("attr1"))
);

#[test]
fn test_namespaced_attributes() {
    init_logging();
    let obj = NsAttrs::from_xml(r#"<tst:model xmlns:tst="urn:test" tst:attr1="1"/>"#, None).unwrap();
    assert_eq!(obj.attr1, "1");

    let err = NsAttrs::from_xml(r#"<tst:model xmlns:tst="urn:test" attr1="1"/>"#, None).unwrap_err();
    assert!(matches!(
        err,
        Error::Parsing(ParsingError::MissingField { ref path }) if path == "attr1"
    ));
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Undeclared {}

xml_model!(Undeclared, ModelBinding::builder("model").ns("missing"));

#[test]
fn test_unknown_prefix() {
    init_logging();
    let err = Undeclared::from_xml("<model/>", None).unwrap_err();
    assert!(matches!(
        err,
        Error::Parsing(ParsingError::UnknownPrefix { ref prefix }) if prefix == "missing"
    ));
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Leaf {
    value: String,
}

xml_model!(
    Leaf,
    ModelBinding::builder("sub").field(Field::element("value"))
);

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Tree {
    sub: Leaf,
    item: (u8, u8),
    tags: Vec<String>,
}

xml_model!(
    Tree,
    ModelBinding::builder("model")
        .field(Field::element("sub").model(Leaf::binding()))
        .field(Field::element("item").tuple(2))
        .field(Field::attr("tags").sequence())
);

#[test]
fn test_error_paths() {
    init_logging();
    let ok = Tree::from_xml(
        r#"<model tags="x  y"><sub><value>v</value></sub><item>1</item><item>2</item></model>"#,
        None,
    )
    .unwrap();
    assert_eq!(ok.item, (1, 2));
    assert_eq!(ok.tags, vec!["x".to_string(), "y".to_string()]);

    let err = Tree::from_xml("<model><sub/><item>1</item><item>2</item></model>", None).unwrap_err();
    assert_eq!(err.to_string(), "missing required field `sub.value`");

    let err = Tree::from_xml(
        "<model><sub><value>v</value></sub><item>1</item></model>",
        None,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "missing required field `item[1]`");

    let err = Tree::from_xml(
        "<model><sub><value>v</value><extra/></sub><item>1</item><item>2</item></model>",
        None,
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "unexpected element at `sub` (actual: extra, expected: end of element)"
    );

    let err = Tree::from_xml(
        r#"<model stray="1"><sub><value>v</value></sub><item>1</item><item>2</item></model>"#,
        None,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Parsing(ParsingError::UnexpectedElement { ref path, ref actual, expected: None })
            if path == "model" && actual == "@stray"
    ));
}

#[test]
fn test_malformed_documents() {
    init_logging();
    for xml in ["", "<model>", "<model></other>", "<model/><model/>", "<model>&bogus;</model>"] {
        let err = Leaf::from_xml(xml, None).unwrap_err();
        assert!(
            matches!(err, Error::Parsing(ParsingError::MalformedDocument { .. })),
            "{:?} gave {:?}",
            xml,
            err
        );
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Text {
    text: String,
}

xml_model!(Text, ModelBinding::builder("model").field(Field::text("text")));

#[test]
fn test_text_and_references() {
    init_logging();
    let obj = Text::from_xml("<model>a &amp; b &#65;<![CDATA[<c>]]></model>", None).unwrap();
    assert_eq!(obj.text, "a & b A<c>");

    let err = Text::from_xml("<model>   </model>", None).unwrap_err();
    assert!(matches!(
        err,
        Error::Parsing(ParsingError::MissingField { ref path }) if path == "text"
    ));
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Counted {
    count: u8,
}

xml_model!(
    Counted,
    ModelBinding::builder("model")
        .field(Field::attr("count"))
        .validator("count", |value: Value, _: &ValidationInfo<'_>| {
            match value.as_text() {
                Some("0") => Err(ValidationError::new("must be positive")),
                _ => Ok(value),
            }
        })
);

#[test]
fn test_validation_errors() {
    init_logging();
    assert_eq!(Counted::from_xml(r#"<model count="7"/>"#, None).unwrap().count, 7);

    let err = Counted::from_xml(r#"<model count="0"/>"#, None).unwrap_err();
    match err {
        Error::Validation(e) => {
            assert_eq!(e.field(), Some("count"));
            assert_eq!(e.message(), "must be positive");
        }
        other => panic!("unexpected error {:?}", other),
    }

    let err = Counted::from_xml(r#"<model count="300"/>"#, None).unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "{:?}", err);
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Attrs {
    id: String,
    extra: BTreeMap<String, String>,
}

xml_model!(
    Attrs,
    ModelBinding::builder("model")
        .field(Field::attr("id"))
        .field(Field::attr("extra").mapping().default(BTreeMap::<String, String>::new()))
);

#[test]
fn test_attribute_mapping() {
    init_logging();
    let obj = Attrs::from_xml(
        r#"<model xmlns:x="urn:x" a="1" id="7" x:b="2"/>"#,
        None,
    )
    .unwrap();

    assert_eq!(obj.id, "7");
    assert_eq!(
        obj.extra,
        BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("{urn:x}b".to_string(), "2".to_string()),
        ])
    );

    let xml = String::from_utf8(obj.to_xml(&WriteOptions::default()).unwrap()).unwrap();
    assert!(xml.contains(r#"xmlns:ns0="urn:x""#), "{}", xml);
    assert!(xml.contains(r#"ns0:b="2""#), "{}", xml);
    assert_eq!(Attrs::from_xml(&xml, None).unwrap(), obj);

    let bare = Attrs::from_xml(r#"<model id="7"/>"#, None).unwrap();
    assert!(bare.extra.is_empty());
}
